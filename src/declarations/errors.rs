use crate::config::ConfigError;
use crate::cortices::mongo::error::{MongoParserError, MongoSerializeError};
use crate::cortices::tcp::TcpError;
use crate::cursors::CursorError;
use crate::handler::HandlerError;

#[derive(Debug, thiserror::Error)]
pub enum MongoShimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("tcp error: {0}")]
    Tcp(#[from] TcpError),

    #[error("mongo parser error: {0}")]
    MongoParser(#[from] MongoParserError),

    #[error("mongo serializer error: {0}")]
    MongoSerializer(#[from] MongoSerializeError),

    #[error("cursor error: {0}")]
    Cursor(#[from] CursorError),

    #[error("query handler failed: {0}")]
    Handler(#[from] HandlerError),
}

impl MongoShimError {
    /// Whether the error is the peer going away rather than a protocol fault.
    pub fn is_disconnect(&self) -> bool {
        match self {
            MongoShimError::Tcp(TcpError::TcpReadError(error))
            | MongoShimError::Tcp(TcpError::TcpWriteError(error))
            | MongoShimError::Tcp(TcpError::TcpFlushError(error)) => matches!(
                error.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

pub type MongoShimResult<T> = Result<T, MongoShimError>;
