pub mod config;
pub mod cortices;
pub mod cursors;
pub mod declarations;
pub mod executor;
pub mod handler;
pub mod shim_core;

use std::sync::Arc;

use crate::config::MongoShimConfiguration;
use crate::cortices::tcp::MongoListener;
use crate::declarations::errors::MongoShimResult;
use crate::handler::QueryHandler;
use crate::shim_core::MongoShimCore;

/// Serve `handler` on the configured endpoint. Blocks for as long as the listener runs.
pub fn run_mongoshim<H>(config: &MongoShimConfiguration, handler: H) -> MongoShimResult<()>
where
    H: QueryHandler + 'static,
{
    config.validate()?;
    let core = Arc::new(MongoShimCore::new(config.clone(), handler));
    MongoListener::bind(core)?.serve()
}
