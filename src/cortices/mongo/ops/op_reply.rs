use bytes::{BufMut, BytesMut};

use crate::cortices::mongo::error::{MongoParserError, MongoSerializeError};
use crate::cortices::mongo::ops::msg_header::{MsgHeader, MSG_HEADER_SIZE};
use crate::cortices::mongo::ops::op::frame_message;
use crate::cortices::mongo::ops::opcodes::MongoOpCode;
use crate::cortices::utils::{decode_document, parse_document_bytes, parse_i32, parse_i64};

/// responseFlags + cursorID + startingFrom + numberReturned
pub const OP_REPLY_FIXED_SIZE: usize = 4 + 8 + 4 + 4;

pub const REPLY_FLAG_CURSOR_NOT_FOUND: i32 = 1 << 0;
pub const REPLY_FLAG_QUERY_FAILURE: i32 = 1 << 1;
pub const REPLY_FLAG_SHARD_CONFIG_STALE: i32 = 1 << 2;
pub const REPLY_FLAG_AWAIT_CAPABLE: i32 = 1 << 3;

/// @see https://docs.mongodb.com/manual/reference/mongodb-wire-protocol/#op-reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpReply {
    // standard message header
    pub message_header: MsgHeader,

    // bit vector
    pub response_flags: i32,

    // cursor id if client needs to do get more's
    pub cursor_id: i64,

    // where in the cursor this reply is starting
    pub starting_from: i32,

    // number of documents in the reply
    pub number_returned: i32,

    // documents, each already bson encoded
    pub documents: Vec<Vec<u8>>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OpReplyResponseFlags {
    pub cursor_not_found: bool,
    pub query_failure: bool,
    pub shard_config_stale: bool,
    pub await_capable: bool,
}

pub fn serialize_op_reply_response_flags(flags: &OpReplyResponseFlags) -> i32 {
    let mut result = 0;
    if flags.cursor_not_found {
        result |= REPLY_FLAG_CURSOR_NOT_FOUND;
    }
    if flags.query_failure {
        result |= REPLY_FLAG_QUERY_FAILURE;
    }
    if flags.shard_config_stale {
        result |= REPLY_FLAG_SHARD_CONFIG_STALE;
    }
    if flags.await_capable {
        result |= REPLY_FLAG_AWAIT_CAPABLE;
    }
    result
}

pub fn parse_op_reply_response_flags(flags: i32) -> OpReplyResponseFlags {
    OpReplyResponseFlags {
        cursor_not_found: flags & REPLY_FLAG_CURSOR_NOT_FOUND != 0,
        query_failure: flags & REPLY_FLAG_QUERY_FAILURE != 0,
        shard_config_stale: flags & REPLY_FLAG_SHARD_CONFIG_STALE != 0,
        await_capable: flags & REPLY_FLAG_AWAIT_CAPABLE != 0,
    }
}

impl OpReply {
    pub fn flags(&self) -> OpReplyResponseFlags {
        parse_op_reply_response_flags(self.response_flags)
    }

    /// Length of the framed reply: header, fixed fields and every document.
    pub fn encoded_length(&self) -> usize {
        MSG_HEADER_SIZE
            + OP_REPLY_FIXED_SIZE
            + self.documents.iter().map(|document| document.len()).sum::<usize>()
    }

    pub fn decode_documents(&self) -> Result<Vec<bson::Document>, MongoParserError> {
        self.documents
            .iter()
            .map(|bytes| decode_document(bytes))
            .collect()
    }
}

pub fn parse_op_reply(message_header: MsgHeader, buffer: &[u8]) -> Result<OpReply, MongoParserError> {
    let mut index: usize = 0;
    let (response_flags, offset) = parse_i32(&buffer[index..])?;
    index += offset;
    let (cursor_id, offset) = parse_i64(&buffer[index..])?;
    index += offset;
    let (starting_from, offset) = parse_i32(&buffer[index..])?;
    index += offset;
    let (number_returned, offset) = parse_i32(&buffer[index..])?;
    index += offset;
    let mut documents = Vec::new();
    for _ in 0..number_returned {
        let (document, offset) = parse_document_bytes(&buffer[index..])?;
        index += offset;
        documents.push(document);
    }
    if index != buffer.len() {
        return Err(MongoParserError::TrailingBytes(buffer.len() - index));
    }
    Ok(OpReply {
        message_header,
        response_flags,
        cursor_id,
        starting_from,
        number_returned,
        documents,
    })
}

pub fn serialize_op_reply(op_reply: &OpReply) -> Result<BytesMut, MongoSerializeError> {
    if op_reply.number_returned < 0 || op_reply.number_returned as usize != op_reply.documents.len()
    {
        return Err(MongoSerializeError::DocumentCountMismatch {
            declared: op_reply.number_returned,
            actual: op_reply.documents.len(),
        });
    }
    let mut body = BytesMut::with_capacity(op_reply.encoded_length() - MSG_HEADER_SIZE);
    body.put_i32_le(op_reply.response_flags);
    body.put_i64_le(op_reply.cursor_id);
    body.put_i32_le(op_reply.starting_from);
    body.put_i32_le(op_reply.number_returned);
    for document in &op_reply.documents {
        body.put_slice(document);
    }
    frame_message(&op_reply.message_header, MongoOpCode::OpReply, &body)
}
