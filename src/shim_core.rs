use crate::config::MongoShimConfiguration;
use crate::cursors::CursorContext;
use crate::cursors::registry::CursorRegistry;
use crate::handler::QueryHandler;

/// State shared by every connection: configuration, the query handler and the
/// open cursors.
pub struct MongoShimCore {
    pub config: MongoShimConfiguration,
    pub handler: Box<dyn QueryHandler>,
    pub cursors: CursorRegistry,
    root_context: CursorContext,
}

impl MongoShimCore {
    pub fn new<H>(config: MongoShimConfiguration, handler: H) -> MongoShimCore
    where
        H: QueryHandler + 'static,
    {
        MongoShimCore::with_boxed_handler(config, Box::new(handler))
    }

    pub fn with_boxed_handler(
        config: MongoShimConfiguration,
        handler: Box<dyn QueryHandler>,
    ) -> MongoShimCore {
        MongoShimCore {
            config,
            handler,
            cursors: CursorRegistry::new(),
            root_context: CursorContext::background(),
        }
    }

    /// Context for one connection; cancelled when the connection ends or the core shuts down.
    pub fn session_context(&self) -> CursorContext {
        self.root_context.child()
    }

    /// Cancel every session context handed out so far.
    pub fn shutdown(&self) {
        self.root_context.cancel();
    }
}

#[cfg(test)]
mod shim_core_tests {
    use bson::Document;

    use crate::config::MongoShimConfiguration;
    use crate::cursors::Cursor;
    use crate::cursors::slice::SliceCursor;
    use crate::handler::HandlerError;
    use crate::shim_core::MongoShimCore;

    fn empty_handler(
        _collection: &str,
        _filter: &Document,
        _projection: &Document,
    ) -> Result<Box<dyn Cursor>, HandlerError> {
        Ok(Box::new(SliceCursor::<Document>::new(Vec::new())))
    }

    #[test]
    fn test_shutdown_cancels_sessions() {
        let core = MongoShimCore::new(MongoShimConfiguration::default(), empty_handler);
        let first = core.session_context();
        let second = core.session_context();
        first.cancel();
        assert!(!second.is_cancelled());
        core.shutdown();
        assert!(second.is_cancelled());
        assert!(core.session_context().is_cancelled());
        assert!(core.cursors.is_empty());
    }
}
