use anyhow::{anyhow, Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::{error, info};
use std::path::PathBuf;

use queue_tools::configure;
use queue_tools::console::confirm;
use queue_tools::logger;
use queue_tools::transfer::{Envelope, QueueManager, QueueUri};

/// Enqueues the contents of a file as a message into a queue
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// The queue uri the message is enqueued to
    #[clap(short, long)]
    destination: String,
    /// The full type name of the message
    #[clap(short, long)]
    message_type: String,
    /// The file containing the message body [default: enqueue.path]
    #[clap(short, long)]
    path: Option<PathBuf>,
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

    let destination_uri = QueueUri::parse(&args.destination)?;
    let path = args.path.unwrap_or_else(|| PathBuf::from(&config.enqueue.path));

    if !path.is_file() {
        error!("File '{}' could not be found.", path.display());
        return Ok(());
    }

    if !args.quiet {
        println!();
        println!("About to enqueue message...");
        println!();
        println!("Message type:");
        println!("   {}", args.message_type);
        println!("Destination queue uri:");
        println!("   {destination_uri}");
        println!("Message file path:");
        println!("   {}", path.display());
        println!();

        if !confirm("Are you sure that you want to continue?")? {
            println!("No message enqueued.");
            return Ok(());
        }
    }

    let body = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let envelope = Envelope::new(args.message_type, body).with_recipient(destination_uri.to_string());
    let raw = config.codec.build().encode(&envelope)?;

    let mut manager = QueueManager::new();
    let mut destination = manager.create_sink(&destination_uri).await?;
    destination.deliver(&envelope, &raw).await?;
    destination.close().await?;

    info!("Message {} enqueued to {}.", envelope.message_id, destination_uri);

    Ok(())
}
