use std::mem::size_of;

use bytes::{BufMut, BytesMut};

use crate::cortices::mongo::error::{MongoParserError, MongoSerializeError};
use crate::cortices::mongo::ops::msg_header::MsgHeader;
use crate::cortices::mongo::ops::op::frame_message;
use crate::cortices::mongo::ops::opcodes::MongoOpCode;
use crate::cortices::utils::{parse_i32, parse_i64};

#[derive(Debug, Clone, PartialEq, Eq)]
/// @see https://docs.mongodb.com/manual/reference/mongodb-wire-protocol/#op-kill-cursors
pub struct OpKillCursors {
    // standard message header
    pub message_header: MsgHeader,

    // 0 - reserved for future use
    pub zero: i32,

    // sequence of cursorIDs to close
    pub cursor_ids: Vec<i64>,
}

pub fn parse_op_kill_cursors(
    message_header: MsgHeader,
    buffer: &[u8],
) -> Result<OpKillCursors, MongoParserError> {
    let mut index: usize = 0;
    let (zero, offset) = parse_i32(&buffer[index..])?;
    index += offset;
    let (number_of_cursor_ids, offset) = parse_i32(&buffer[index..])?;
    index += offset;
    if number_of_cursor_ids < 0 {
        return Err(MongoParserError::InvalidCursorCount(number_of_cursor_ids));
    }
    let needed = number_of_cursor_ids as usize * size_of::<i64>();
    if buffer.len() - index < needed {
        return Err(MongoParserError::NotEnoughBufferSize {
            needed,
            available: buffer.len() - index,
        });
    }
    let mut cursor_ids = Vec::with_capacity(number_of_cursor_ids as usize);
    for _ in 0..number_of_cursor_ids {
        let (cursor_id, offset) = parse_i64(&buffer[index..])?;
        index += offset;
        cursor_ids.push(cursor_id);
    }
    if index != buffer.len() {
        return Err(MongoParserError::TrailingBytes(buffer.len() - index));
    }
    Ok(OpKillCursors {
        message_header,
        zero,
        cursor_ids,
    })
}

pub fn serialize_op_kill_cursors(
    op_kill_cursors: &OpKillCursors,
) -> Result<BytesMut, MongoSerializeError> {
    let mut body = BytesMut::with_capacity(8 + op_kill_cursors.cursor_ids.len() * 8);
    body.put_i32_le(op_kill_cursors.zero);
    body.put_i32_le(op_kill_cursors.cursor_ids.len() as i32);
    for cursor_id in &op_kill_cursors.cursor_ids {
        body.put_i64_le(*cursor_id);
    }
    frame_message(
        &op_kill_cursors.message_header,
        MongoOpCode::OpKillCursors,
        &body,
    )
}

#[cfg(test)]
mod op_kill_cursors_tests {
    use crate::cortices::mongo::error::MongoParserError;
    use crate::cortices::mongo::ops::msg_header::{parse_msg_header, MsgHeader};
    use crate::cortices::mongo::ops::op_kill_cursors::{
        parse_op_kill_cursors, serialize_op_kill_cursors, OpKillCursors,
    };
    use crate::cortices::mongo::ops::opcodes::{MongoOpCode, MONGO_OP_KILL_CURSORS_CODE};

    fn kill_cursors(cursor_ids: Vec<i64>) -> OpKillCursors {
        OpKillCursors {
            message_header: MsgHeader {
                message_length: 0,
                request_id: 9,
                response_to: 0,
                op_code: MongoOpCode::OpKillCursors,
            },
            zero: 0,
            cursor_ids,
        }
    }

    #[test]
    fn test_serialize_then_parse() {
        let bytes = serialize_op_kill_cursors(&kill_cursors(vec![1, 2, i64::MAX])).unwrap();
        assert_eq!(bytes.len(), 16 + 8 + 3 * 8);
        let (header, offset) = parse_msg_header(&bytes).unwrap();
        assert_eq!(header.op_code.code(), MONGO_OP_KILL_CURSORS_CODE);
        let parsed = parse_op_kill_cursors(header, &bytes[offset..]).unwrap();
        assert_eq!(parsed.cursor_ids, vec![1, 2, i64::MAX]);
    }

    #[test]
    fn test_empty_list() {
        let bytes = serialize_op_kill_cursors(&kill_cursors(vec![])).unwrap();
        let (header, offset) = parse_msg_header(&bytes).unwrap();
        let parsed = parse_op_kill_cursors(header, &bytes[offset..]).unwrap();
        assert!(parsed.cursor_ids.is_empty());
    }

    #[test]
    fn test_count_larger_than_body() {
        let mut body = vec![0u8; 8];
        body[4] = 2;
        body.extend_from_slice(&7i64.to_le_bytes());
        let header = MsgHeader {
            message_length: 16 + body.len() as i32,
            request_id: 1,
            response_to: 0,
            op_code: MongoOpCode::OpKillCursors,
        };
        match parse_op_kill_cursors(header, &body) {
            Err(MongoParserError::NotEnoughBufferSize { needed, available }) => {
                assert_eq!(needed, 16);
                assert_eq!(available, 8);
            }
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_negative_count() {
        let mut body = vec![0u8; 4];
        body.extend_from_slice(&(-1i32).to_le_bytes());
        let header = MsgHeader {
            message_length: 24,
            request_id: 1,
            response_to: 0,
            op_code: MongoOpCode::OpKillCursors,
        };
        match parse_op_kill_cursors(header, &body) {
            Err(MongoParserError::InvalidCursorCount(-1)) => (),
            other => panic!("Unexpected result {:?}", other),
        }
    }
}
