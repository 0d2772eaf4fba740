use tracing::warn;

use crate::cortices::mongo::ops::msg_header::MsgHeader;
use crate::cortices::mongo::ops::op_reply::{
    serialize_op_reply_response_flags, OpReply, OpReplyResponseFlags,
};
use crate::cortices::mongo::ops::opcodes::MongoOpCode;
use crate::cursors::registry::NO_CURSOR_ID;
use crate::cursors::{Cursor, CursorContext};
use crate::declarations::errors::MongoShimResult;

/// Documents produced for one reply.
#[derive(Debug, Default)]
pub struct Batch {
    pub documents: Vec<Vec<u8>>,
    /// The cursor reported the end of its sequence while the batch was filled.
    pub exhausted: bool,
}

/// How many documents a request for `number_to_return` gets per batch.
///
/// The sign only says whether the cursor closes after this batch; zero means
/// the server's default.
pub fn batch_size(number_to_return: i32, default_batch_size: i32) -> usize {
    match number_to_return {
        0 => default_batch_size.max(1) as usize,
        n => n.unsigned_abs() as usize,
    }
}

/// Whether the cursor must be closed once `batch` has been sent.
pub fn should_close(number_to_return: i32, batch: &Batch) -> bool {
    number_to_return < 0 || batch.exhausted
}

/// Pull up to `size` documents out of the cursor.
pub fn fill_batch(
    cursor: &mut dyn Cursor,
    ctx: &CursorContext,
    size: usize,
) -> MongoShimResult<Batch> {
    let mut batch = Batch {
        documents: Vec::with_capacity(size.min(1024)),
        exhausted: false,
    };
    while batch.documents.len() < size {
        match cursor.next_item(ctx)? {
            None => {
                batch.exhausted = true;
                break;
            }
            Some(item) => batch.documents.push(item.into_document_bytes()?),
        }
    }
    Ok(batch)
}

/// Close a cursor that is not (or no longer) in the registry. Failures are
/// logged since the caller has already decided what to answer.
pub fn release_cursor(cursor: &mut dyn Cursor, ctx: &CursorContext) {
    if let Err(error) = cursor.close(ctx) {
        warn!(%error, "failed to close cursor");
    }
}

pub fn make_reply(
    request_id: i32,
    response_to: i32,
    flags: OpReplyResponseFlags,
    cursor_id: i64,
    starting_from: i32,
    documents: Vec<Vec<u8>>,
) -> OpReply {
    OpReply {
        message_header: MsgHeader {
            message_length: 0,
            request_id,
            response_to,
            op_code: MongoOpCode::OpReply,
        },
        response_flags: serialize_op_reply_response_flags(&flags),
        cursor_id,
        starting_from,
        number_returned: documents.len() as i32,
        documents,
    }
}

pub fn make_cursor_not_found_reply(request_id: i32, response_to: i32) -> OpReply {
    make_reply(
        request_id,
        response_to,
        OpReplyResponseFlags {
            cursor_not_found: true,
            ..OpReplyResponseFlags::default()
        },
        NO_CURSOR_ID,
        0,
        Vec::new(),
    )
}
