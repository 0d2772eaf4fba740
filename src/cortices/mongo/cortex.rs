use std::io::{Read, Write};
use std::sync::Arc;

use tracing::debug;

use crate::cortices::mongo::ops::op::MongoOp;
use crate::cortices::mongo::ops::op_reply::{serialize_op_reply, OpReply};
use crate::cortices::mongo::parser::read_mongo_op;
use crate::cortices::tcp::send_data_to_stream_with_flushing;
use crate::cursors::CursorContext;
use crate::declarations::errors::MongoShimResult;
use crate::executor::get_more_executor::execute_get_more;
use crate::executor::kill_cursors_executor::execute_kill_cursors;
use crate::executor::query_executor::execute_query;
use crate::shim_core::MongoShimCore;

/// One client connection: reads an operation, answers it, repeats.
///
/// Cursor calls made on behalf of this connection get a context that is
/// cancelled once the session is dropped.
pub struct MongoSession<S> {
    stream: S,
    core: Arc<MongoShimCore>,
    ctx: CursorContext,
    request_count: i32,
}

impl<S> MongoSession<S> {
    pub fn new(stream: S, core: Arc<MongoShimCore>) -> MongoSession<S> {
        let ctx = core.session_context();
        MongoSession {
            stream,
            core,
            ctx,
            request_count: 0,
        }
    }

    fn next_request_id(&mut self) -> i32 {
        self.request_count = self.request_count.wrapping_add(1);
        self.request_count
    }

    /// Execute one decoded operation. `Ok(None)` means the operation has no reply.
    pub fn process(&mut self, op: MongoOp) -> MongoShimResult<Option<OpReply>> {
        match op {
            MongoOp::Query(op_query) => {
                let request_id = self.next_request_id();
                let reply = execute_query(&op_query, &self.core, &self.ctx, request_id)?;
                Ok(Some(reply))
            }
            MongoOp::GetMore(op_get_more) => {
                let request_id = self.next_request_id();
                let reply = execute_get_more(&op_get_more, &self.core, &self.ctx, request_id)?;
                Ok(Some(reply))
            }
            MongoOp::KillCursors(op_kill_cursors) => {
                execute_kill_cursors(&op_kill_cursors, &self.core, &self.ctx)?;
                Ok(None)
            }
            MongoOp::Reply(op_reply) => {
                debug!(
                    request_id = op_reply.message_header.request_id,
                    "ignoring reply sent by client"
                );
                Ok(None)
            }
            MongoOp::Unknown(op_unknown) => {
                debug!(
                    op_code = op_unknown.message_header.op_code.code(),
                    request_id = op_unknown.message_header.request_id,
                    length = op_unknown.body.len(),
                    "ignoring unsupported operation"
                );
                Ok(None)
            }
        }
    }
}

impl<S: Read + Write> MongoSession<S> {
    /// Serve until the peer disconnects between two messages (`Ok`) or
    /// anything fails (`Err`). A failed request gets no reply.
    pub fn run(&mut self) -> MongoShimResult<()> {
        let max_message_size_in_bytes = self.core.config.max_message_size_in_bytes;
        loop {
            let op = match read_mongo_op(&mut self.stream, max_message_size_in_bytes)? {
                None => return Ok(()),
                Some(op) => op,
            };
            if let Some(reply) = self.process(op)? {
                let bytes = serialize_op_reply(&reply)?;
                send_data_to_stream_with_flushing(&mut self.stream, &bytes)?;
            }
        }
    }
}

impl<S> Drop for MongoSession<S> {
    fn drop(&mut self) {
        self.ctx.cancel();
    }
}
