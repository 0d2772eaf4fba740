use std::path::PathBuf;

use clap::Parser;

pub const MONGO_ENDPOINT: &str = "127.0.0.1:27017";

/// Batch size used by both query and getMore when the client asks for zero documents.
pub const DEFAULT_BATCH_SIZE: i32 = 1000;

pub const MAX_MESSAGE_SIZE_IN_BYTES: u32 = 48_000_000;
pub const MAX_BSON_OBJECT_SIZE: u32 = 16 * 1024 * 1024;
pub const MAX_WRITE_BATCH_SIZE: u32 = 100_000;
pub const LOGICAL_SESSION_TIMEOUT_MINUTES: i32 = 30;

// Advertising wire version 2 keeps drivers on OP_QUERY / OP_GET_MORE.
pub const MIN_MONGO_WIRE_VERSION: i32 = 2;
pub const MAX_MONGO_WIRE_VERSION: i32 = 2;

pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot parse command line: {0}")]
    CommandLine(#[from] clap::Error),

    #[error("cannot read data file {path}: {error}")]
    DataFileRead {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("cannot parse data file {path}: {error}")]
    DataFileParse {
        path: PathBuf,
        error: serde_json::Error,
    },

    #[error("data file {0} does not contain a JSON array")]
    DataFileNotArray(PathBuf),

    #[error("default batch size must be positive, got {0}")]
    NonPositiveBatchSize(i32),
}

#[derive(Debug, Clone, Parser)]
#[command(name = "mongoshim", about = "Serve any data source over the legacy MongoDB wire protocol")]
pub struct MongoShimConfiguration {
    /// Address the mongo wire listener binds to.
    #[arg(long, env = "MONGOSHIM_ENDPOINT", default_value = MONGO_ENDPOINT)]
    pub mongo_endpoint: String,

    /// Documents per batch when a query or getMore asks for zero.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub default_batch_size: i32,

    #[arg(long = "max-message-size-bytes", default_value_t = MAX_MESSAGE_SIZE_IN_BYTES)]
    pub max_message_size_in_bytes: u32,

    #[arg(long, default_value_t = MAX_BSON_OBJECT_SIZE)]
    pub max_bson_object_size: u32,

    #[arg(long, default_value_t = MAX_WRITE_BATCH_SIZE)]
    pub max_write_batch_size: u32,

    #[arg(long, default_value_t = LOGICAL_SESSION_TIMEOUT_MINUTES)]
    pub logical_session_timeout_minutes: i32,

    #[arg(long = "min-wire-version", default_value_t = MIN_MONGO_WIRE_VERSION)]
    pub min_mongo_wire_version: i32,

    #[arg(long = "max-wire-version", default_value_t = MAX_MONGO_WIRE_VERSION)]
    pub max_mongo_wire_version: i32,

    #[arg(skip = true)]
    pub is_master: bool,

    /// Report the server as writable in the handshake.
    #[arg(long = "writable", action = clap::ArgAction::SetFalse)]
    pub read_only: bool,

    /// JSON array served by the demo binary for every collection.
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// tracing-subscriber filter directive, RUST_LOG takes precedence.
    #[arg(long, default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
}

impl MongoShimConfiguration {
    pub fn compile_from_args(args: &[String]) -> Result<MongoShimConfiguration, ConfigError> {
        let config = MongoShimConfiguration::try_parse_from(args)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_batch_size <= 0 {
            return Err(ConfigError::NonPositiveBatchSize(self.default_batch_size));
        }
        Ok(())
    }
}

impl Default for MongoShimConfiguration {
    fn default() -> MongoShimConfiguration {
        MongoShimConfiguration {
            mongo_endpoint: MONGO_ENDPOINT.to_string(),
            default_batch_size: DEFAULT_BATCH_SIZE,
            max_message_size_in_bytes: MAX_MESSAGE_SIZE_IN_BYTES,
            max_bson_object_size: MAX_BSON_OBJECT_SIZE,
            max_write_batch_size: MAX_WRITE_BATCH_SIZE,
            logical_session_timeout_minutes: LOGICAL_SESSION_TIMEOUT_MINUTES,
            min_mongo_wire_version: MIN_MONGO_WIRE_VERSION,
            max_mongo_wire_version: MAX_MONGO_WIRE_VERSION,
            is_master: true,
            read_only: true,
            data: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}
