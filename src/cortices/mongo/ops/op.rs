use bytes::{BufMut, BytesMut};

use crate::cortices::mongo::error::MongoSerializeError;
use crate::cortices::mongo::ops::msg_header::{serialize_msg_header, MsgHeader, MSG_HEADER_SIZE};
use crate::cortices::mongo::ops::op_get_more::{serialize_op_get_more, OpGetMore};
use crate::cortices::mongo::ops::op_kill_cursors::{serialize_op_kill_cursors, OpKillCursors};
use crate::cortices::mongo::ops::op_query::{serialize_op_query, OpQuery};
use crate::cortices::mongo::ops::op_reply::{serialize_op_reply, OpReply};
use crate::cortices::mongo::ops::op_unknown::{serialize_op_unknown, OpUnknown};
use crate::cortices::mongo::ops::opcodes::MongoOpCode;

#[derive(Debug)]
pub enum MongoOp {
    Reply(OpReply),
    Query(OpQuery),
    GetMore(OpGetMore),
    KillCursors(OpKillCursors),
    Unknown(OpUnknown),
}

impl MongoOp {
    /// The header as decoded off the wire; dispatch decisions are made on this.
    pub fn header(&self) -> &MsgHeader {
        match self {
            MongoOp::Reply(op) => &op.message_header,
            MongoOp::Query(op) => &op.message_header,
            MongoOp::GetMore(op) => &op.message_header,
            MongoOp::KillCursors(op) => &op.message_header,
            MongoOp::Unknown(op) => &op.message_header,
        }
    }

    /// Opcode written when this operation is encoded.
    pub fn op_code(&self) -> MongoOpCode {
        match self {
            MongoOp::Reply(_) => MongoOpCode::OpReply,
            MongoOp::Query(_) => MongoOpCode::OpQuery,
            MongoOp::GetMore(_) => MongoOpCode::OpGetMore,
            MongoOp::KillCursors(_) => MongoOpCode::OpKillCursors,
            MongoOp::Unknown(op) => op.message_header.op_code,
        }
    }

    pub fn serialize(&self) -> Result<BytesMut, MongoSerializeError> {
        match self {
            MongoOp::Reply(op) => serialize_op_reply(op),
            MongoOp::Query(op) => serialize_op_query(op),
            MongoOp::GetMore(op) => serialize_op_get_more(op),
            MongoOp::KillCursors(op) => serialize_op_kill_cursors(op),
            MongoOp::Unknown(op) => serialize_op_unknown(op),
        }
    }
}

/// Prefix an encoded body with a header whose length covers exactly header + body.
pub fn frame_message(
    message_header: &MsgHeader,
    op_code: MongoOpCode,
    body: &[u8],
) -> Result<BytesMut, MongoSerializeError> {
    let total_length = MSG_HEADER_SIZE + body.len();
    if total_length > i32::MAX as usize {
        return Err(MongoSerializeError::MessageTooLarge(total_length));
    }
    let header = MsgHeader {
        message_length: total_length as i32,
        request_id: message_header.request_id,
        response_to: message_header.response_to,
        op_code,
    };
    let mut buffer = BytesMut::with_capacity(total_length);
    serialize_msg_header(&header, &mut buffer);
    buffer.put_slice(body);
    Ok(buffer)
}
