use bson::Document;
use bytes::{BufMut, BytesMut};

use crate::cortices::mongo::error::{MongoParserError, MongoSerializeError};
use crate::cortices::mongo::ops::msg_header::MsgHeader;
use crate::cortices::mongo::ops::op::frame_message;
use crate::cortices::mongo::ops::opcodes::MongoOpCode;
use crate::cortices::utils::{decode_document, parse_cstring, parse_document_bytes, parse_i32};

pub const QUERY_FLAG_TAILABLE_CURSOR: i32 = 1 << 1;
pub const QUERY_FLAG_SLAVE_OK: i32 = 1 << 2;
pub const QUERY_FLAG_OPLOG_REPLAY: i32 = 1 << 3;
pub const QUERY_FLAG_NO_CURSOR_TIMEOUT: i32 = 1 << 4;
pub const QUERY_FLAG_AWAIT_DATA: i32 = 1 << 5;
pub const QUERY_FLAG_EXHAUST: i32 = 1 << 6;
pub const QUERY_FLAG_PARTIAL: i32 = 1 << 7;

/// @see https://docs.mongodb.com/manual/reference/mongodb-wire-protocol/#op-query
#[derive(Debug, Clone, PartialEq)]
pub struct OpQuery {
    // standard message header
    pub message_header: MsgHeader,

    // bit vector of query options.
    pub flags: i32,

    // "dbname.collectionname"
    pub full_collection_name: String,

    // number of documents to skip
    pub number_to_skip: i32,

    // number of documents to return in the first OP_REPLY batch
    pub number_to_return: i32,

    // query object, still encoded
    pub query: Vec<u8>,

    // Optional. Selector indicating the fields to return.
    pub return_fields_selector: Option<Vec<u8>>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OpQueryFlags {
    pub tailable_cursor: bool,
    pub slave_ok: bool,
    pub oplog_replay: bool,
    pub no_cursor_timeout: bool,
    pub await_data: bool,
    pub exhaust: bool,
    pub partial: bool,
}

pub fn parse_op_query_flags(flags: i32) -> OpQueryFlags {
    OpQueryFlags {
        tailable_cursor: flags & QUERY_FLAG_TAILABLE_CURSOR != 0,
        slave_ok: flags & QUERY_FLAG_SLAVE_OK != 0,
        oplog_replay: flags & QUERY_FLAG_OPLOG_REPLAY != 0,
        no_cursor_timeout: flags & QUERY_FLAG_NO_CURSOR_TIMEOUT != 0,
        await_data: flags & QUERY_FLAG_AWAIT_DATA != 0,
        exhaust: flags & QUERY_FLAG_EXHAUST != 0,
        partial: flags & QUERY_FLAG_PARTIAL != 0,
    }
}

impl OpQuery {
    pub fn query_flags(&self) -> OpQueryFlags {
        parse_op_query_flags(self.flags)
    }

    pub fn filter(&self) -> Result<Document, MongoParserError> {
        decode_document(&self.query)
    }

    /// The field selector, or an empty document when the client sent none.
    pub fn projection(&self) -> Result<Document, MongoParserError> {
        match &self.return_fields_selector {
            None => Ok(Document::new()),
            Some(bytes) => decode_document(bytes),
        }
    }
}

pub fn parse_op_query(message_header: MsgHeader, buffer: &[u8]) -> Result<OpQuery, MongoParserError> {
    let mut index: usize = 0;
    let (flags, offset) = parse_i32(&buffer[index..])?;
    index += offset;
    let (full_collection_name, offset) = parse_cstring(&buffer[index..])?;
    index += offset;
    let (number_to_skip, offset) = parse_i32(&buffer[index..])?;
    index += offset;
    let (number_to_return, offset) = parse_i32(&buffer[index..])?;
    index += offset;
    let (query, offset) = parse_document_bytes(&buffer[index..])?;
    index += offset;
    let return_fields_selector = if index == buffer.len() {
        None
    } else {
        let (selector, offset) = parse_document_bytes(&buffer[index..])?;
        index += offset;
        Some(selector)
    };
    if index != buffer.len() {
        return Err(MongoParserError::TrailingBytes(buffer.len() - index));
    }
    Ok(OpQuery {
        message_header,
        flags,
        full_collection_name,
        number_to_skip,
        number_to_return,
        query,
        return_fields_selector,
    })
}

pub fn serialize_op_query(op_query: &OpQuery) -> Result<BytesMut, MongoSerializeError> {
    let mut body = BytesMut::new();
    body.put_i32_le(op_query.flags);
    body.put_slice(op_query.full_collection_name.as_bytes());
    body.put_u8(0);
    body.put_i32_le(op_query.number_to_skip);
    body.put_i32_le(op_query.number_to_return);
    body.put_slice(&op_query.query);
    if let Some(selector) = &op_query.return_fields_selector {
        body.put_slice(selector);
    }
    frame_message(&op_query.message_header, MongoOpCode::OpQuery, &body)
}
