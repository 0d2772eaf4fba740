use bson::Document;
use chrono::Utc;
use tracing::debug;

use crate::config::MongoShimConfiguration;
use crate::cortices::mongo::error::MongoSerializeError;
use crate::cortices::mongo::ops::op_query::OpQuery;
use crate::cortices::mongo::ops::op_reply::{OpReply, OpReplyResponseFlags};
use crate::cursors::registry::NO_CURSOR_ID;
use crate::cursors::{Cursor, CursorContext};
use crate::declarations::errors::MongoShimResult;
use crate::executor::shared::{
    batch_size, fill_batch, make_reply, release_cursor, should_close, Batch,
};
use crate::shim_core::MongoShimCore;

pub const ADMIN_QUERY: &str = "admin.$cmd";

pub fn make_bson_from_config(config: &MongoShimConfiguration) -> Document {
    let mut document = Document::new();
    document.insert("ismaster", config.is_master);
    document.insert("maxBsonObjectSize", config.max_bson_object_size as i32);
    document.insert(
        "maxMessageSizeBytes",
        config.max_message_size_in_bytes as i32,
    );
    document.insert("maxWriteBatchSize", config.max_write_batch_size as i32);
    document.insert("localTime", Utc::now());
    document.insert(
        "logicalSessionTimeoutMinutes",
        config.logical_session_timeout_minutes,
    );
    document.insert("minWireVersion", config.min_mongo_wire_version);
    document.insert("maxWireVersion", config.max_mongo_wire_version);
    document.insert("readOnly", config.read_only);
    document.insert("ok", 1.0);
    document
}

fn execute_handshake(
    op_query: &OpQuery,
    core: &MongoShimCore,
    request_id: i32,
) -> MongoShimResult<OpReply> {
    let mut bytes = Vec::new();
    make_bson_from_config(&core.config)
        .to_writer(&mut bytes)
        .map_err(MongoSerializeError::from)?;
    Ok(make_reply(
        request_id,
        op_query.message_header.request_id,
        OpReplyResponseFlags::default(),
        NO_CURSOR_ID,
        0,
        vec![bytes],
    ))
}

fn first_batch(
    cursor: &mut dyn Cursor,
    op_query: &OpQuery,
    core: &MongoShimCore,
    ctx: &CursorContext,
) -> MongoShimResult<Batch> {
    if op_query.number_to_skip > 0 {
        cursor.skip(ctx, op_query.number_to_skip)?;
    }
    let size = batch_size(op_query.number_to_return, core.config.default_batch_size);
    fill_batch(cursor, ctx, size)
}

/// Answer an OP_QUERY. The cursor is kept in the registry only when the first
/// batch filled up without exhausting it; otherwise it is closed here and a
/// failed close fails the request.
pub fn execute_query(
    op_query: &OpQuery,
    core: &MongoShimCore,
    ctx: &CursorContext,
    request_id: i32,
) -> MongoShimResult<OpReply> {
    if op_query.full_collection_name == ADMIN_QUERY {
        debug!(request_id = op_query.message_header.request_id, "handshake");
        return execute_handshake(op_query, core, request_id);
    }

    let filter = op_query.filter()?;
    let projection = op_query.projection()?;
    debug!(
        collection = %op_query.full_collection_name,
        skip = op_query.number_to_skip,
        number_to_return = op_query.number_to_return,
        flags = ?op_query.query_flags(),
        %filter,
        "query"
    );
    let mut cursor =
        core.handler
            .query(&op_query.full_collection_name, &filter, &projection)?;

    let batch = match first_batch(cursor.as_mut(), op_query, core, ctx) {
        Ok(batch) => batch,
        Err(error) => {
            release_cursor(cursor.as_mut(), ctx);
            return Err(error);
        }
    };

    let cursor_id = if should_close(op_query.number_to_return, &batch) {
        cursor.close(ctx)?;
        NO_CURSOR_ID
    } else {
        core.cursors.store(cursor)
    };

    Ok(make_reply(
        request_id,
        op_query.message_header.request_id,
        OpReplyResponseFlags::default(),
        cursor_id,
        0,
        batch.documents,
    ))
}

#[cfg(test)]
mod query_executor_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use bson::{doc, Bson, Document};

    use crate::config::MongoShimConfiguration;
    use crate::cursors::registry::registry_tests::{counting_cursor, failing_close_cursor};
    use crate::cursors::{CursorContext, CursorError};
    use crate::cursors::slice::SliceCursor;
    use crate::declarations::errors::MongoShimError;
    use crate::executor::query_executor::{execute_query, ADMIN_QUERY};
    use crate::executor::tests::fixture_core::{make_query, slice_core};
    use crate::handler::{HandlerError, QueryResult};
    use crate::shim_core::MongoShimCore;

    #[test]
    fn test_single_document_query() {
        let core = MongoShimCore::new(
            MongoShimConfiguration::default(),
            |collection: &str, filter: &Document, projection: &Document| -> QueryResult {
                assert_eq!(collection, "foo.test");
                assert_eq!(filter, &doc! {"test": true});
                assert!(projection.is_empty());
                Ok(Box::new(SliceCursor::new(vec![doc! {"foo": "bar"}])))
            },
        );
        let mut op_query = make_query("foo.test", 0, 0);
        op_query.query.clear();
        doc! {"test": true}.to_writer(&mut op_query.query).unwrap();

        let ctx = CursorContext::background();
        let reply = execute_query(&op_query, &core, &ctx, 7).unwrap();
        assert_eq!(reply.message_header.request_id, 7);
        assert_eq!(reply.message_header.response_to, 41);
        assert_eq!(reply.cursor_id, 0);
        assert_eq!(reply.starting_from, 0);
        assert_eq!(reply.decode_documents().unwrap(), vec![doc! {"foo": "bar"}]);
        assert!(core.cursors.is_empty());
    }

    #[test]
    fn test_default_batch_keeps_cursor_open() {
        let core = slice_core(3000);
        let ctx = CursorContext::background();
        let reply = execute_query(&make_query("foo.test", 0, 0), &core, &ctx, 1).unwrap();
        assert_eq!(reply.number_returned, 1000);
        assert_ne!(reply.cursor_id, 0);
        assert!(core.cursors.contains(reply.cursor_id));
    }

    #[test]
    fn test_negative_return_closes() {
        let core = slice_core(3000);
        let ctx = CursorContext::background();
        let reply = execute_query(&make_query("foo.test", 0, -10), &core, &ctx, 1).unwrap();
        assert_eq!(reply.number_returned, 10);
        assert_eq!(reply.cursor_id, 0);
        assert!(core.cursors.is_empty());
    }

    #[test]
    fn test_skip_is_applied() {
        let core = slice_core(3000);
        let ctx = CursorContext::background();
        let reply = execute_query(&make_query("foo.test", 2990, 0), &core, &ctx, 1).unwrap();
        assert_eq!(reply.number_returned, 10);
        assert_eq!(reply.cursor_id, 0);
        let documents = reply.decode_documents().unwrap();
        assert_eq!(documents[0], doc! {"foo": "bar_2990"});
    }

    #[test]
    fn test_closed_cursor_is_released() {
        let closes = Arc::new(AtomicUsize::new(0));
        let handler_closes = closes.clone();
        let core = MongoShimCore::new(
            MongoShimConfiguration::default(),
            move |_collection: &str, _filter: &Document, _projection: &Document| -> QueryResult {
                Ok(counting_cursor(4, &handler_closes))
            },
        );
        let ctx = CursorContext::background();
        execute_query(&make_query("foo.test", 0, 10), &core, &ctx, 1).unwrap();
        execute_query(&make_query("foo.test", 0, -2), &core, &ctx, 2).unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 2);
        assert!(core.cursors.is_empty());
    }

    #[test]
    fn test_close_failure_fails_the_request() {
        let closes = Arc::new(AtomicUsize::new(0));
        let handler_closes = closes.clone();
        let core = MongoShimCore::new(
            MongoShimConfiguration::default(),
            move |_collection: &str, _filter: &Document, _projection: &Document| -> QueryResult {
                Ok(failing_close_cursor(4, &handler_closes))
            },
        );
        let ctx = CursorContext::background();
        match execute_query(&make_query("foo.test", 0, 10), &core, &ctx, 1) {
            Err(MongoShimError::Cursor(CursorError::Source(_))) => {}
            other => panic!("Unexpected result {:?}", other),
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(core.cursors.is_empty());
    }

    #[test]
    fn test_handshake_skips_handler() {
        let core = MongoShimCore::new(
            MongoShimConfiguration::default(),
            |_collection: &str, _filter: &Document, _projection: &Document| -> QueryResult {
                Err(HandlerError::new("handler must not run"))
            },
        );
        let ctx = CursorContext::background();
        let reply = execute_query(&make_query(ADMIN_QUERY, 0, -1), &core, &ctx, 1).unwrap();
        assert_eq!(reply.number_returned, 1);
        assert_eq!(reply.cursor_id, 0);
        let handshake = &reply.decode_documents().unwrap()[0];
        assert_eq!(handshake.get("ismaster"), Some(&Bson::Boolean(true)));
        assert_eq!(handshake.get("minWireVersion"), Some(&Bson::Int32(2)));
        assert_eq!(handshake.get("maxWireVersion"), Some(&Bson::Int32(2)));
        assert_eq!(handshake.get("readOnly"), Some(&Bson::Boolean(true)));
        assert_eq!(handshake.get("ok"), Some(&Bson::Double(1.0)));
        assert!(matches!(handshake.get("localTime"), Some(Bson::DateTime(_))));
    }

    #[test]
    fn test_handler_error_ends_request() {
        let core = MongoShimCore::new(
            MongoShimConfiguration::default(),
            |_collection: &str, _filter: &Document, _projection: &Document| -> QueryResult {
                Err(HandlerError::new("backend down"))
            },
        );
        let ctx = CursorContext::background();
        match execute_query(&make_query("foo.test", 0, 0), &core, &ctx, 1) {
            Err(MongoShimError::Handler(error)) => assert_eq!(error.to_string(), "backend down"),
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_malformed_filter_fails_at_execution() {
        let core = slice_core(1);
        let mut op_query = make_query("foo.test", 0, 0);
        op_query.query = vec![5, 0, 0, 0, 1];
        let ctx = CursorContext::background();
        match execute_query(&op_query, &core, &ctx, 1) {
            Err(MongoShimError::MongoParser(_)) => {}
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_session_releases_cursor() {
        let core = slice_core(10);
        let ctx = core.session_context();
        ctx.cancel();
        match execute_query(&make_query("foo.test", 0, 0), &core, &ctx, 1) {
            Err(MongoShimError::Cursor(_)) => {}
            other => panic!("Unexpected result {:?}", other),
        }
        assert!(core.cursors.is_empty());
    }
}
