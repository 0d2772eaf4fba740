use bytes::BytesMut;

use crate::cortices::mongo::error::MongoSerializeError;
use crate::cortices::mongo::ops::msg_header::MsgHeader;
use crate::cortices::mongo::ops::op::frame_message;

/// Any message whose opcode this server does not handle, kept verbatim so the
/// stream stays framed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpUnknown {
    pub message_header: MsgHeader,
    pub body: Vec<u8>,
}

pub fn parse_op_unknown(message_header: MsgHeader, buffer: &[u8]) -> OpUnknown {
    OpUnknown {
        message_header,
        body: buffer.to_vec(),
    }
}

pub fn serialize_op_unknown(op_unknown: &OpUnknown) -> Result<BytesMut, MongoSerializeError> {
    frame_message(
        &op_unknown.message_header,
        op_unknown.message_header.op_code,
        &op_unknown.body,
    )
}
