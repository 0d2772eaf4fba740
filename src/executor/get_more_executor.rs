use tracing::{debug, warn};

use crate::cortices::mongo::ops::op_get_more::OpGetMore;
use crate::cortices::mongo::ops::op_reply::{OpReply, OpReplyResponseFlags};
use crate::cursors::registry::NO_CURSOR_ID;
use crate::cursors::{Cursor, CursorContext};
use crate::declarations::errors::MongoShimResult;
use crate::executor::shared::{
    batch_size, fill_batch, make_cursor_not_found_reply, make_reply, should_close, Batch,
};
use crate::shim_core::MongoShimCore;

fn next_batch(
    cursor: &mut dyn Cursor,
    op_get_more: &OpGetMore,
    core: &MongoShimCore,
    ctx: &CursorContext,
) -> MongoShimResult<(i32, Batch)> {
    let starting_from = cursor.position(ctx)?;
    let size = batch_size(op_get_more.number_to_return, core.config.default_batch_size);
    let batch = fill_batch(cursor, ctx, size)?;
    Ok((starting_from, batch))
}

/// Answer an OP_GET_MORE from a registered cursor.
///
/// An unknown id gets a reply flagged cursor-not-found. A cursor that is
/// exhausted, closed by a negative count or fails while advancing is dropped
/// from the registry and closed. A failed close fails the request.
pub fn execute_get_more(
    op_get_more: &OpGetMore,
    core: &MongoShimCore,
    ctx: &CursorContext,
    request_id: i32,
) -> MongoShimResult<OpReply> {
    let response_to = op_get_more.message_header.request_id;
    let cursor_id = op_get_more.cursor_id;
    let cursor = match core.cursors.get(cursor_id) {
        None => {
            debug!(cursor_id, "getMore on unknown cursor");
            return Ok(make_cursor_not_found_reply(request_id, response_to));
        }
        Some(cursor) => cursor,
    };

    let mut guard = cursor.lock();
    let result = next_batch(&mut **guard, op_get_more, core, ctx);
    let close = match &result {
        Err(_) => true,
        Ok((_, batch)) => should_close(op_get_more.number_to_return, batch),
    };
    // Whoever takes the entry out of the registry is the one that closes it.
    let closed = if close && core.cursors.remove(cursor_id).is_some() {
        guard.close(ctx)
    } else {
        Ok(())
    };
    drop(guard);

    let (starting_from, batch) = match result {
        Ok(result) => result,
        Err(error) => {
            if let Err(close_error) = closed {
                warn!(cursor_id, error = %close_error, "failed to close broken cursor");
            }
            return Err(error);
        }
    };
    closed?;
    debug!(
        cursor_id,
        starting_from,
        number_returned = batch.documents.len(),
        close,
        "getMore"
    );
    Ok(make_reply(
        request_id,
        response_to,
        OpReplyResponseFlags::default(),
        if close { NO_CURSOR_ID } else { cursor_id },
        starting_from,
        batch.documents,
    ))
}
