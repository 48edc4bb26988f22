use anyhow::{anyhow, Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::info;
use std::path::PathBuf;

use queue_tools::configure;
use queue_tools::console::{confirm, describe_count};
use queue_tools::logger;
use queue_tools::transfer::{
    LogProgress, QueueManager, QueueUri, TransferEngine, TransferMode, TransferPolicy,
};

/// Dumps messages from the given queue into a folder, one JSON file per
/// message, leaving the queue untouched
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// The queue uri where you are dumping the messages from
    #[clap(short, long)]
    source: String,
    /// The folder where the output messages will be created [default: dump.folder]
    #[clap(short, long)]
    folder: Option<PathBuf>,
    /// Dumps the given number of messages, or all when 0 [default: dump.count]
    #[clap(short, long, allow_negative_numbers = true)]
    count: Option<i64>,
    /// Quiet mode: no confirmation prompt
    #[clap(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let args = Args::parse();
    let config = configure::load_config().context("Failed to load config")?;
    logger::setup_logger(&config.logging).map_err(|e| anyhow!("Failed to set up logger: {e}"))?;

    let source_uri = QueueUri::parse(&args.source)?;
    let folder = args.folder.unwrap_or_else(|| PathBuf::from(&config.dump.folder));
    let destination_uri = QueueUri::Folder { path: folder };

    let policy = TransferPolicy::new(TransferMode::Copy, args.count.unwrap_or(config.dump.count), false)?;

    if !args.quiet {
        println!();
        println!("About to dump {}...", describe_count(policy.max_count()));
        println!();
        println!("Queue uri:");
        println!("   {source_uri}");
        println!("Folder:");
        println!("   {destination_uri}");
        println!();

        if !confirm("Are you sure that you want to continue?")? {
            println!("No messages dumped.");
            return Ok(());
        }
    }

    info!("[starting]");

    let mut manager = QueueManager::new();
    let source = manager.create_source(&source_uri)?;
    let destination = manager.create_sink(&destination_uri).await?;

    let engine = TransferEngine::new(policy, config.codec.build())
        .with_progress(Box::new(LogProgress::new("Dumped")));

    engine.run(source, destination).await?;

    Ok(())
}
