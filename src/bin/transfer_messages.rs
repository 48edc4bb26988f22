use anyhow::{anyhow, Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::info;

use queue_tools::configure;
use queue_tools::console::{confirm, describe_count};
use queue_tools::logger;
use queue_tools::transfer::{
    ensure_distinct, LogProgress, QueueManager, QueueUri, TransferEngine, TransferMode, TransferPolicy,
};

/// Transfers messages from the source queue to the destination queue
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// The queue uri where you are transferring the messages from
    #[clap(short, long)]
    source: String,
    /// The queue uri where you are transferring the messages to
    #[clap(short, long)]
    destination: String,
    /// Transfers the given number of messages, or all when 0
    #[clap(short, long, default_value_t = 0, allow_negative_numbers = true)]
    count: i64,
    /// Copies the messages, leaving the originals in the source queue
    #[clap(long)]
    copy: bool,
    /// Clears the failure history of every transferred message
    #[clap(long)]
    clear: bool,
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
    let destination_uri = QueueUri::parse(&args.destination)?;
    ensure_distinct(&source_uri, &destination_uri)?;

    let mode = if args.copy { TransferMode::Copy } else { TransferMode::Move };
    let policy = TransferPolicy::new(mode, args.count, args.clear)?;

    if !args.quiet {
        println!();
        println!("About to {} {}...", mode, describe_count(policy.max_count()));
        println!();
        println!("Source queue uri:");
        println!("   {source_uri}");
        println!("Destination queue uri:");
        println!("   {destination_uri}");
        println!();

        if !confirm("Are you sure that you want to continue?")? {
            println!("No messages transferred.");
            return Ok(());
        }
    }

    info!("[starting]");

    let mut manager = QueueManager::new();
    let source = manager.create_source(&source_uri)?;
    let destination = manager.create_sink(&destination_uri).await?;

    let engine = TransferEngine::new(policy, config.codec.build())
        .with_progress(Box::new(LogProgress::new("Transferred")));

    engine.run(source, destination).await?;

    Ok(())
}
