use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::warn;

use crate::cursors::{Cursor, CursorContext, CursorError};

/// Cursor id that means "no cursor, the batch was the last one".
pub const NO_CURSOR_ID: i64 = 0;

pub type SharedCursor = Arc<Mutex<Box<dyn Cursor>>>;

/// Open cursors of the whole server, keyed by the id handed to clients.
///
/// Lookups share the read lock; store, remove and kill take the write lock.
/// Removing a cursor does not close it, callers close it right after (see
/// [`CursorRegistry::kill`]) so a closed cursor is never reachable by id.
pub struct CursorRegistry {
    last_cursor_id: AtomicI64,
    cursors: RwLock<HashMap<i64, SharedCursor>>,
}

impl Default for CursorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CursorRegistry {
    pub fn new() -> CursorRegistry {
        CursorRegistry {
            last_cursor_id: AtomicI64::new(NO_CURSOR_ID),
            cursors: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate the next id and store the cursor under it.
    pub fn store(&self, cursor: Box<dyn Cursor>) -> i64 {
        let cursor_id = self.last_cursor_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.cursors
            .write()
            .insert(cursor_id, Arc::new(Mutex::new(cursor)));
        cursor_id
    }

    pub fn get(&self, cursor_id: i64) -> Option<SharedCursor> {
        self.cursors.read().get(&cursor_id).cloned()
    }

    pub fn remove(&self, cursor_id: i64) -> Option<SharedCursor> {
        self.cursors.write().remove(&cursor_id)
    }

    /// Remove the cursor and close it. Returns whether the id was registered.
    pub fn kill(&self, cursor_id: i64, ctx: &CursorContext) -> Result<bool, CursorError> {
        match self.remove(cursor_id) {
            None => Ok(false),
            Some(cursor) => {
                cursor.lock().close(ctx)?;
                Ok(true)
            }
        }
    }

    pub fn contains(&self, cursor_id: i64) -> bool {
        self.cursors.read().contains_key(&cursor_id)
    }

    pub fn len(&self) -> usize {
        self.cursors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.read().is_empty()
    }
}

impl Drop for CursorRegistry {
    fn drop(&mut self) {
        let ctx = CursorContext::background();
        for (cursor_id, cursor) in self.cursors.get_mut().drain() {
            if let Err(error) = cursor.lock().close(&ctx) {
                warn!(cursor_id, %error, "failed to close cursor on shutdown");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod registry_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use crate::cursors::registry::{CursorRegistry, NO_CURSOR_ID};
    use crate::cursors::{Cursor, CursorContext, CursorError, CursorItem};

    /// Counts close calls so tests can check every cursor is released exactly once.
    pub struct CountingCursor {
        pub remaining: i32,
        pub position: i32,
        pub closes: Arc<AtomicUsize>,
        pub fail_close: bool,
    }

    impl Cursor for CountingCursor {
        fn next_item(&mut self, _ctx: &CursorContext) -> Result<Option<CursorItem>, CursorError> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            self.position += 1;
            Ok(Some(CursorItem::Document(bson::doc! {"n": self.position})))
        }

        fn skip(&mut self, _ctx: &CursorContext, n: i32) -> Result<(), CursorError> {
            let n = n.max(0).min(self.remaining);
            self.remaining -= n;
            self.position += n;
            Ok(())
        }

        fn position(&self, _ctx: &CursorContext) -> Result<i32, CursorError> {
            Ok(self.position)
        }

        fn close(&mut self, _ctx: &CursorContext) -> Result<(), CursorError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                return Err(CursorError::Source("backend refused to close".into()));
            }
            Ok(())
        }
    }

    pub fn counting_cursor(remaining: i32, closes: &Arc<AtomicUsize>) -> Box<dyn Cursor> {
        Box::new(CountingCursor {
            remaining,
            position: 0,
            closes: closes.clone(),
            fail_close: false,
        })
    }

    /// Like [`counting_cursor`], but every close reports a failure.
    pub fn failing_close_cursor(remaining: i32, closes: &Arc<AtomicUsize>) -> Box<dyn Cursor> {
        Box::new(CountingCursor {
            remaining,
            position: 0,
            closes: closes.clone(),
            fail_close: true,
        })
    }

    #[test]
    fn test_ids_are_monotonic_and_never_zero() {
        let registry = CursorRegistry::new();
        let closes = Arc::new(AtomicUsize::new(0));
        let first = registry.store(counting_cursor(1, &closes));
        let second = registry.store(counting_cursor(1, &closes));
        assert_ne!(first, NO_CURSOR_ID);
        assert!(second > first);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_get_does_not_remove() {
        let registry = CursorRegistry::new();
        let closes = Arc::new(AtomicUsize::new(0));
        let cursor_id = registry.store(counting_cursor(3, &closes));
        let ctx = CursorContext::background();
        let cursor = registry.get(cursor_id).unwrap();
        assert!(cursor.lock().next_item(&ctx).unwrap().is_some());
        assert!(registry.contains(cursor_id));
        assert_eq!(registry.get(cursor_id).unwrap().lock().position(&ctx).unwrap(), 1);
    }

    #[test]
    fn test_kill_closes_once() {
        let registry = CursorRegistry::new();
        let closes = Arc::new(AtomicUsize::new(0));
        let cursor_id = registry.store(counting_cursor(3, &closes));
        let ctx = CursorContext::background();
        assert!(registry.kill(cursor_id, &ctx).unwrap());
        assert!(!registry.kill(cursor_id, &ctx).unwrap());
        assert!(registry.get(cursor_id).is_none());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_leaves_closing_to_caller() {
        let registry = CursorRegistry::new();
        let closes = Arc::new(AtomicUsize::new(0));
        let cursor_id = registry.store(counting_cursor(3, &closes));
        let removed = registry.remove(cursor_id).unwrap();
        assert!(registry.is_empty());
        assert_eq!(closes.load(Ordering::SeqCst), 0);
        removed.lock().close(&CursorContext::background()).unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_closes_remaining() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let registry = CursorRegistry::new();
            registry.store(counting_cursor(3, &closes));
            registry.store(counting_cursor(3, &closes));
        }
        assert_eq!(closes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_store_allocates_unique_ids() {
        let registry = Arc::new(CursorRegistry::new());
        let closes = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let closes = closes.clone();
                thread::spawn(move || {
                    (0..100)
                        .map(|_| registry.store(counting_cursor(1, &closes)))
                        .collect::<Vec<i64>>()
                })
            })
            .collect();
        let mut ids: Vec<i64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 800);
        assert_eq!(registry.len(), 800);
        assert_eq!(ids[0], 1);
        assert_eq!(ids[799], 800);
    }
}
