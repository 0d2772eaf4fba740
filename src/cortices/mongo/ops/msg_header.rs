// @see https://docs.mongodb.com/manual/reference/mongodb-wire-protocol/#standard-message-header

use bytes::{BufMut, BytesMut};

use crate::cortices::mongo::error::MongoParserError;
use crate::cortices::mongo::ops::opcodes::{pick_op_code, MongoOpCode};
use crate::cortices::utils::parse_i32;

pub const MSG_HEADER_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgHeader {
    // total message size, including this
    pub message_length: i32,

    // identifier for this message
    pub request_id: i32,

    // requestID from the original request (used in responses from db)
    pub response_to: i32,

    // request type
    pub op_code: MongoOpCode,
}

impl MsgHeader {
    /// Bytes following the header. A declared length shorter than the header means no body.
    pub fn body_length(&self) -> usize {
        if self.message_length < MSG_HEADER_SIZE as i32 {
            0
        } else {
            self.message_length as usize - MSG_HEADER_SIZE
        }
    }
}

pub fn parse_msg_header(buffer: &[u8]) -> Result<(MsgHeader, usize), MongoParserError> {
    let mut index: usize = 0;
    let (message_length, offset) = parse_i32(&buffer[index..])?;
    index += offset;
    let (request_id, offset) = parse_i32(&buffer[index..])?;
    index += offset;
    let (response_to, offset) = parse_i32(&buffer[index..])?;
    index += offset;
    let (op_code, offset) = parse_i32(&buffer[index..])?;
    index += offset;
    Ok((
        MsgHeader {
            message_length,
            request_id,
            response_to,
            op_code: pick_op_code(op_code),
        },
        index,
    ))
}

pub fn serialize_msg_header(message_header: &MsgHeader, buffer: &mut BytesMut) {
    buffer.put_i32_le(message_header.message_length);
    buffer.put_i32_le(message_header.request_id);
    buffer.put_i32_le(message_header.response_to);
    buffer.put_i32_le(message_header.op_code.code());
}
