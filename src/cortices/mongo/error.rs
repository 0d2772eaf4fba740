#[derive(Debug, thiserror::Error)]
pub enum MongoParserError {
    #[error("buffer too short: needed {needed} bytes, {available} available")]
    NotEnoughBufferSize { needed: usize, available: usize },

    #[error("cstring has no trailing zero")]
    NoZeroTrailingInCstringBuffer,

    #[error("cstring is not valid utf-8")]
    CstringInvalidUtf8,

    #[error("document declares {declared} bytes, {available} available")]
    InvalidDocumentLength { declared: i32, available: usize },

    #[error("cannot decode bson document: {0}")]
    ParseBsonError(#[from] bson::de::Error),

    #[error("message length {declared} exceeds the limit of {limit} bytes")]
    MessageTooLarge { declared: i32, limit: u32 },

    #[error("negative cursor id count {0}")]
    InvalidCursorCount(i32),

    #[error("{0} trailing bytes after the message body")]
    TrailingBytes(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum MongoSerializeError {
    #[error("reply declares {declared} documents but carries {actual}")]
    DocumentCountMismatch { declared: i32, actual: usize },

    #[error("cannot encode bson document: {0}")]
    SerializeBsonError(#[from] bson::ser::Error),

    #[error("cursor produced a {0:?} value, only documents can be returned")]
    NotADocument(bson::spec::ElementType),

    #[error("message of {0} bytes does not fit the length field")]
    MessageTooLarge(usize),
}
