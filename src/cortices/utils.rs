use std::fmt::Write;
use std::mem::size_of;

use crate::cortices::mongo::error::MongoParserError;

/// Smallest well-formed BSON document: length prefix plus the trailing zero.
pub const MIN_BSON_DOCUMENT_SIZE: usize = 5;

pub fn parse_i32(buffer: &[u8]) -> Result<(i32, usize), MongoParserError> {
    let field_size = size_of::<i32>();
    if buffer.len() < field_size {
        return Err(MongoParserError::NotEnoughBufferSize {
            needed: field_size,
            available: buffer.len(),
        });
    }
    let bytes = [buffer[0], buffer[1], buffer[2], buffer[3]];
    Ok((i32::from_le_bytes(bytes), field_size))
}

pub fn parse_i64(buffer: &[u8]) -> Result<(i64, usize), MongoParserError> {
    let field_size = size_of::<i64>();
    if buffer.len() < field_size {
        return Err(MongoParserError::NotEnoughBufferSize {
            needed: field_size,
            available: buffer.len(),
        });
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buffer[..field_size]);
    Ok((i64::from_le_bytes(bytes), field_size))
}

pub fn parse_cstring(buffer: &[u8]) -> Result<(String, usize), MongoParserError> {
    match buffer.iter().position(|&r| r == b'\0') {
        None => Err(MongoParserError::NoZeroTrailingInCstringBuffer),
        Some(terminal_index) => match std::str::from_utf8(&buffer[..terminal_index]) {
            Err(_) => Err(MongoParserError::CstringInvalidUtf8),
            // the trailing zero is consumed as well
            Ok(value) => Ok((value.to_string(), terminal_index + 1)),
        },
    }
}

/// Slice one BSON document off the buffer by its own length prefix, without decoding it.
pub fn parse_document_bytes(buffer: &[u8]) -> Result<(Vec<u8>, usize), MongoParserError> {
    let (declared_size, _) = parse_i32(buffer)?;
    if declared_size < MIN_BSON_DOCUMENT_SIZE as i32 || declared_size as usize > buffer.len() {
        return Err(MongoParserError::InvalidDocumentLength {
            declared: declared_size,
            available: buffer.len(),
        });
    }
    let document_size = declared_size as usize;
    Ok((buffer[..document_size].to_vec(), document_size))
}

pub fn decode_document(bytes: &[u8]) -> Result<bson::Document, MongoParserError> {
    bson::Document::from_reader(&mut &bytes[..]).map_err(MongoParserError::ParseBsonError)
}

/**
Render a byte array like this:
0000 | 0d 01 00 00 00 00 00 00 00 00 00 00 d4 07 00 00
0010 | 00 00 00 00 61 64 6d 69 6e 2e 24 63 6d 64 00 00
**/
pub fn pretty_dump(buffer: &[u8]) -> String {
    let mut output = String::with_capacity(buffer.len() * 3 + buffer.len() / 16 * 8);
    for (i, byte) in buffer.iter().enumerate() {
        if i % 16 == 0 {
            if i > 0 {
                output.push('\n');
            }
            let _ = write!(output, "{:04x} | ", i);
        }
        let _ = write!(output, "{:02x} ", byte);
    }
    output
}
