use std::io::{self, Read};

use tracing::trace;

use crate::cortices::mongo::error::MongoParserError;
use crate::cortices::mongo::ops::msg_header::{parse_msg_header, MsgHeader, MSG_HEADER_SIZE};
use crate::cortices::mongo::ops::op::MongoOp;
use crate::cortices::mongo::ops::op_get_more::parse_op_get_more;
use crate::cortices::mongo::ops::op_kill_cursors::parse_op_kill_cursors;
use crate::cortices::mongo::ops::op_query::parse_op_query;
use crate::cortices::mongo::ops::op_reply::parse_op_reply;
use crate::cortices::mongo::ops::op_unknown::parse_op_unknown;
use crate::cortices::mongo::ops::opcodes::MongoOpCode;
use crate::cortices::tcp::TcpError;
use crate::cortices::utils::pretty_dump;
use crate::declarations::errors::MongoShimResult;

/// Decode the body that follows an already parsed header, dispatching on the header's opcode.
pub fn parse_mongo_op(header: MsgHeader, body: &[u8]) -> Result<MongoOp, MongoParserError> {
    match header.op_code {
        MongoOpCode::OpQuery => Ok(MongoOp::Query(parse_op_query(header, body)?)),
        MongoOpCode::OpGetMore => Ok(MongoOp::GetMore(parse_op_get_more(header, body)?)),
        MongoOpCode::OpKillCursors => {
            Ok(MongoOp::KillCursors(parse_op_kill_cursors(header, body)?))
        }
        MongoOpCode::OpReply => Ok(MongoOp::Reply(parse_op_reply(header, body)?)),
        MongoOpCode::Unknown(_) => Ok(MongoOp::Unknown(parse_op_unknown(header, body))),
    }
}

/// Decode one complete message held in memory.
pub fn parse_mongo_incoming_bytes(buffer: &[u8]) -> Result<MongoOp, MongoParserError> {
    let (header, offset) = parse_msg_header(buffer)?;
    let body_end = offset + header.body_length();
    if buffer.len() < body_end {
        return Err(MongoParserError::NotEnoughBufferSize {
            needed: body_end,
            available: buffer.len(),
        });
    }
    if buffer.len() > body_end {
        return Err(MongoParserError::TrailingBytes(buffer.len() - body_end));
    }
    parse_mongo_op(header, &buffer[offset..body_end])
}

/// Read the next message off a stream.
///
/// `Ok(None)` means the peer closed the stream cleanly between two messages.
/// Running out of bytes anywhere inside a message is an `UnexpectedEof` read error.
pub fn read_mongo_op<R: Read>(
    reader: &mut R,
    max_message_size_in_bytes: u32,
) -> MongoShimResult<Option<MongoOp>> {
    let mut header_buffer = [0u8; MSG_HEADER_SIZE];
    let mut filled = 0;
    while filled < MSG_HEADER_SIZE {
        match reader.read(&mut header_buffer[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(TcpError::TcpReadError(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside a message header",
                ))
                .into())
            }
            Ok(bytes_read) => filled += bytes_read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(TcpError::TcpReadError(error).into()),
        }
    }

    let (header, _) = parse_msg_header(&header_buffer)?;
    if header.message_length > 0 && header.message_length as u32 > max_message_size_in_bytes {
        return Err(MongoParserError::MessageTooLarge {
            declared: header.message_length,
            limit: max_message_size_in_bytes,
        }
        .into());
    }

    let mut body = vec![0u8; header.body_length()];
    reader
        .read_exact(&mut body)
        .map_err(TcpError::TcpReadError)?;
    trace!(
        request_id = header.request_id,
        op_code = header.op_code.code(),
        "incoming message\n{}\n{}",
        pretty_dump(&header_buffer),
        pretty_dump(&body)
    );

    Ok(Some(parse_mongo_op(header, &body)?))
}
