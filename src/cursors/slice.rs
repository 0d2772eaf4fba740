use std::sync::Arc;

use serde::Serialize;

use crate::cursors::{Cursor, CursorContext, CursorError, CursorItem};

/// Cursor over an in-memory sequence. Elements are serialized through bson as they
/// are produced, so any `Serialize` type that maps to a document can be served.
pub struct SliceCursor<T> {
    items: Arc<[T]>,
    position: usize,
    closed: bool,
}

impl<T> SliceCursor<T> {
    pub fn new(items: Vec<T>) -> SliceCursor<T> {
        SliceCursor::from_shared(items.into())
    }

    /// Cursor over a sequence shared with other cursors, e.g. one per query.
    pub fn from_shared(items: Arc<[T]>) -> SliceCursor<T> {
        SliceCursor {
            items,
            position: 0,
            closed: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.items.len().saturating_sub(self.position)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

fn check_cancelled(ctx: &CursorContext) -> Result<(), CursorError> {
    if ctx.is_cancelled() {
        Err(CursorError::Cancelled)
    } else {
        Ok(())
    }
}

impl<T> Cursor for SliceCursor<T>
where
    T: Serialize + Send + Sync,
{
    fn next_item(&mut self, ctx: &CursorContext) -> Result<Option<CursorItem>, CursorError> {
        check_cancelled(ctx)?;
        if self.closed {
            return Ok(None);
        }
        match self.items.get(self.position) {
            None => Ok(None),
            Some(item) => {
                let value = bson::to_bson(item)?;
                self.position += 1;
                Ok(Some(CursorItem::Value(value)))
            }
        }
    }

    fn skip(&mut self, ctx: &CursorContext, n: i32) -> Result<(), CursorError> {
        check_cancelled(ctx)?;
        if n > 0 {
            self.position = (self.position + n as usize).min(self.items.len());
        }
        Ok(())
    }

    fn position(&self, _ctx: &CursorContext) -> Result<i32, CursorError> {
        Ok(self.position.min(i32::MAX as usize) as i32)
    }

    fn close(&mut self, _ctx: &CursorContext) -> Result<(), CursorError> {
        self.closed = true;
        Ok(())
    }
}
