//! The seam between the wire server and whatever produces documents.

use std::error::Error;
use std::fmt;

use bson::Document;

use crate::cursors::Cursor;

/// Failure reported by a [`QueryHandler`]. Wraps whatever error the embedding
/// application produced.
pub struct HandlerError(Box<dyn Error + Send + Sync>);

impl HandlerError {
    pub fn new<E>(error: E) -> HandlerError
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        HandlerError(error.into())
    }

    pub fn into_inner(self) -> Box<dyn Error + Send + Sync> {
        self.0
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandlerError").field(&self.0).finish()
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.0.as_ref())
    }
}

pub type QueryResult = Result<Box<dyn Cursor>, HandlerError>;

/// Turns a query on a collection into a cursor over its results.
///
/// Called from connection threads concurrently. The filter and projection are
/// the decoded query documents; an absent projection arrives as an empty document.
pub trait QueryHandler: Send + Sync {
    fn query(
        &self,
        collection: &str,
        filter: &Document,
        projection: &Document,
    ) -> QueryResult;
}

impl<F> QueryHandler for F
where
    F: Fn(&str, &Document, &Document) -> QueryResult + Send + Sync,
{
    fn query(
        &self,
        collection: &str,
        filter: &Document,
        projection: &Document,
    ) -> QueryResult {
        self(collection, filter, projection)
    }
}

#[cfg(test)]
mod handler_tests {
    use std::error::Error;

    use bson::{doc, Document};

    use crate::cursors::slice::SliceCursor;
    use crate::cursors::CursorContext;
    use crate::handler::{HandlerError, QueryHandler, QueryResult};

    #[test]
    fn test_closure_is_a_handler() {
        let handler = |collection: &str, _filter: &Document, _projection: &Document| -> QueryResult {
            if collection == "foo.test" {
                Ok(Box::new(SliceCursor::new(vec![doc! {"foo": "bar"}])))
            } else {
                Err(HandlerError::new(format!("no collection {}", collection)))
            }
        };
        let ctx = CursorContext::background();
        let mut cursor = handler
            .query("foo.test", &Document::new(), &Document::new())
            .unwrap();
        assert!(cursor.next_item(&ctx).unwrap().is_some());
        match handler.query("foo.other", &Document::new(), &Document::new()) {
            Err(error) => {
                assert_eq!(error.to_string(), "no collection foo.other");
                assert!(error.source().is_some());
            }
            Ok(_) => panic!("Unexpected cursor"),
        }
    }
}
