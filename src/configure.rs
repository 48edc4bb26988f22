use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::transfer::codec::CodecKind;

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub to_file: bool,
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DumpConfig {
    pub folder: String,
    pub count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub codec: CodecKind,
    pub dump: DumpConfig,
    pub enqueue: EnqueueConfig,
}

fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Config::builder()
        // Set defaults
        .set_default("logging.level", "info")?
        .set_default("logging.to_file", false)?
        .set_default("logging.file", "log/queue_tools.log")?
        .set_default("codec", "json")?
        .set_default("dump.folder", "./messages")?
        .set_default("dump.count", 30_i64)?
        .set_default("enqueue.path", "message.esb")
}

pub fn load_config() -> Result<AppConfig, ConfigError> {
    let s = builder()?
        // Add configuration from a file
        .add_source(File::with_name("config/config.yaml").required(false))
        // Add configuration from environment variables
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    s.try_deserialize()
}
