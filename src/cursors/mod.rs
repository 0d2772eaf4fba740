//! Server-side cursors.
//!
//! A [`Cursor`] is whatever the query handler hands back: it produces result
//! items one at a time and can be skipped, asked for its position and closed.
//! Cursors that are not exhausted after their first batch live in the
//! [`registry::CursorRegistry`] until a getMore drains them or the client
//! kills them.

use bson::{Bson, Document};
use tokio_util::sync::CancellationToken;

use crate::cortices::mongo::error::MongoSerializeError;

pub mod registry;
pub mod slice;

#[derive(Debug, thiserror::Error)]
pub enum CursorError {
    #[error("cursor operation cancelled")]
    Cancelled,

    #[error("cannot encode cursor item: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("cursor source failed: {0}")]
    Source(Box<dyn std::error::Error + Send + Sync>),
}

/// Carries cancellation into cursor calls.
#[derive(Debug, Clone, Default)]
pub struct CursorContext {
    cancellation: CancellationToken,
}

impl CursorContext {
    pub fn new(cancellation: CancellationToken) -> CursorContext {
        CursorContext { cancellation }
    }

    /// A context nobody will cancel.
    pub fn background() -> CursorContext {
        CursorContext::default()
    }

    /// A context cancelled together with this one, or on its own.
    pub fn child(&self) -> CursorContext {
        CursorContext {
            cancellation: self.cancellation.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// One result produced by a cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum CursorItem {
    /// An already encoded bson document, passed to the client untouched.
    Raw(Vec<u8>),
    Document(Document),
    /// Any bson value; only documents can be sent, anything else is an encode error.
    Value(Bson),
}

impl CursorItem {
    pub fn into_document_bytes(self) -> Result<Vec<u8>, MongoSerializeError> {
        match self {
            CursorItem::Raw(bytes) => Ok(bytes),
            CursorItem::Document(document) | CursorItem::Value(Bson::Document(document)) => {
                let mut bytes = Vec::new();
                document.to_writer(&mut bytes)?;
                Ok(bytes)
            }
            CursorItem::Value(value) => Err(MongoSerializeError::NotADocument(value.element_type())),
        }
    }
}

impl From<Document> for CursorItem {
    fn from(document: Document) -> CursorItem {
        CursorItem::Document(document)
    }
}

impl From<Bson> for CursorItem {
    fn from(value: Bson) -> CursorItem {
        CursorItem::Value(value)
    }
}

impl From<Vec<u8>> for CursorItem {
    fn from(bytes: Vec<u8>) -> CursorItem {
        CursorItem::Raw(bytes)
    }
}

/// A result sequence the server can page through.
///
/// Cursors are driven by one session at a time; the registry hands out shared
/// handles but running two getMores on the same cursor id concurrently is not
/// supported.
pub trait Cursor: Send {
    /// The next item, or `Ok(None)` once the sequence is exhausted.
    fn next_item(&mut self, ctx: &CursorContext) -> Result<Option<CursorItem>, CursorError>;

    /// Move forward `n` items without producing them. Stops at the end of the
    /// sequence; a negative `n` does nothing.
    fn skip(&mut self, ctx: &CursorContext, n: i32) -> Result<(), CursorError>;

    /// Zero based offset of the next item.
    fn position(&self, ctx: &CursorContext) -> Result<i32, CursorError>;

    /// Release whatever backs the cursor. Called once, when the server is done with it.
    fn close(&mut self, ctx: &CursorContext) -> Result<(), CursorError>;
}
