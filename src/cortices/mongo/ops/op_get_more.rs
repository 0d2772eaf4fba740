use bytes::{BufMut, BytesMut};

use crate::cortices::mongo::error::{MongoParserError, MongoSerializeError};
use crate::cortices::mongo::ops::msg_header::MsgHeader;
use crate::cortices::mongo::ops::op::frame_message;
use crate::cortices::mongo::ops::opcodes::MongoOpCode;
use crate::cortices::utils::{parse_cstring, parse_i32, parse_i64};

/// @see https://docs.mongodb.com/manual/reference/mongodb-wire-protocol/#op-get-more
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpGetMore {
    // standard message header
    pub message_header: MsgHeader,

    // 0 - reserved for future use
    pub zero: i32,

    // "dbname.collectionname"
    pub full_collection_name: String,

    // number of documents to return
    pub number_to_return: i32,

    // cursorID from the OP_REPLY
    pub cursor_id: i64,
}

pub fn parse_op_get_more(
    message_header: MsgHeader,
    buffer: &[u8],
) -> Result<OpGetMore, MongoParserError> {
    let mut index: usize = 0;
    let (zero, offset) = parse_i32(&buffer[index..])?;
    index += offset;
    let (full_collection_name, offset) = parse_cstring(&buffer[index..])?;
    index += offset;
    let (number_to_return, offset) = parse_i32(&buffer[index..])?;
    index += offset;
    let (cursor_id, offset) = parse_i64(&buffer[index..])?;
    index += offset;
    if index != buffer.len() {
        return Err(MongoParserError::TrailingBytes(buffer.len() - index));
    }
    Ok(OpGetMore {
        message_header,
        zero,
        full_collection_name,
        number_to_return,
        cursor_id,
    })
}

pub fn serialize_op_get_more(op_get_more: &OpGetMore) -> Result<BytesMut, MongoSerializeError> {
    let mut body = BytesMut::new();
    body.put_i32_le(op_get_more.zero);
    body.put_slice(op_get_more.full_collection_name.as_bytes());
    body.put_u8(0);
    body.put_i32_le(op_get_more.number_to_return);
    body.put_i64_le(op_get_more.cursor_id);
    frame_message(&op_get_more.message_header, MongoOpCode::OpGetMore, &body)
}
