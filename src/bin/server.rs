use std::env;
use std::fs;
use std::path::Path;
use std::process;
use std::sync::Arc;

use bson::Document;
use serde_json::{json, Value};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use libmongoshim::config::{ConfigError, MongoShimConfiguration};
use libmongoshim::cursors::slice::SliceCursor;
use libmongoshim::handler::QueryResult;
use libmongoshim::run_mongoshim;

const GENERATED_DOCUMENT_COUNT: usize = 3000;

fn load_data(path: &Path) -> Result<Vec<Value>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|error| ConfigError::DataFileRead {
        path: path.to_path_buf(),
        error,
    })?;
    match serde_json::from_str(&text) {
        Err(error) => Err(ConfigError::DataFileParse {
            path: path.to_path_buf(),
            error,
        }),
        Ok(Value::Array(items)) => Ok(items),
        Ok(_) => Err(ConfigError::DataFileNotArray(path.to_path_buf())),
    }
}

fn generate_data() -> Vec<Value> {
    (0..GENERATED_DOCUMENT_COUNT)
        .map(|i| json!({ "foo": format!("bar_{}", i) }))
        .collect()
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let config = match MongoShimConfiguration::compile_from_args(&args) {
        Ok(config) => config,
        Err(ConfigError::CommandLine(error)) => error.exit(),
        Err(error) => {
            eprintln!("mongoshim: {}", error);
            process::exit(2);
        }
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data = match &config.data {
        None => generate_data(),
        Some(path) => match load_data(path) {
            Ok(data) => data,
            Err(error) => {
                error!(%error, "cannot load data");
                process::exit(1);
            }
        },
    };
    info!(documents = data.len(), "serving every collection from one sequence");
    let data: Arc<[Value]> = data.into();

    let handler = move |collection: &str, filter: &Document, _projection: &Document| -> QueryResult {
        info!(collection, %filter, "query");
        Ok(Box::new(SliceCursor::from_shared(data.clone())))
    };
    if let Err(error) = run_mongoshim(&config, handler) {
        error!(%error, "mongoshim failed");
        process::exit(1);
    }
}
