use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use tracing::{error, info, warn};

use crate::cortices::mongo::cortex::MongoSession;
use crate::declarations::errors::MongoShimResult;
use crate::shim_core::MongoShimCore;

#[derive(Debug, thiserror::Error)]
pub enum TcpError {
    #[error("cannot bind: {0}")]
    TcpBindError(std::io::Error),

    #[error("connection failed: {0}")]
    TcpStreamError(std::io::Error),

    #[error("cannot read from stream: {0}")]
    TcpReadError(std::io::Error),

    #[error("cannot write to stream: {0}")]
    TcpWriteError(std::io::Error),

    #[error("cannot flush stream: {0}")]
    TcpFlushError(std::io::Error),
}

pub fn send_data_to_stream_with_flushing<W: Write>(
    stream: &mut W,
    data_to_client: &[u8],
) -> MongoShimResult<()> {
    stream
        .write_all(data_to_client)
        .map_err(TcpError::TcpWriteError)?;
    stream.flush().map_err(TcpError::TcpFlushError)?;
    Ok(())
}

fn handle_tcp_stream(stream: TcpStream, core: Arc<MongoShimCore>) {
    let peer = stream.peer_addr().ok();
    let mut session = MongoSession::new(stream, core);
    match session.run() {
        Ok(()) => info!(?peer, "connection closed"),
        Err(error) if error.is_disconnect() => info!(?peer, %error, "connection dropped"),
        Err(error) => warn!(?peer, %error, "connection ended with error"),
    }
}

/// Accepts mongo wire connections and runs each one on its own thread.
pub struct MongoListener {
    listener: TcpListener,
    core: Arc<MongoShimCore>,
}

impl MongoListener {
    /// Bind the endpoint from the core's configuration.
    pub fn bind(core: Arc<MongoShimCore>) -> MongoShimResult<MongoListener> {
        let listener =
            TcpListener::bind(&core.config.mongo_endpoint).map_err(TcpError::TcpBindError)?;
        let listener = MongoListener { listener, core };
        info!(endpoint = %listener.local_addr()?, "mongo wire listener bound");
        Ok(listener)
    }

    pub fn local_addr(&self) -> MongoShimResult<SocketAddr> {
        Ok(self
            .listener
            .local_addr()
            .map_err(TcpError::TcpBindError)?)
    }

    pub fn core(&self) -> &Arc<MongoShimCore> {
        &self.core
    }

    /// Accept connections forever. Failing to accept or to start a thread only
    /// loses that one connection.
    pub fn serve(self) -> MongoShimResult<()> {
        let mut connection_count: u64 = 0;
        for stream in self.listener.incoming() {
            let stream = match stream {
                Err(error) => {
                    warn!(error = %TcpError::TcpStreamError(error), "accept failed");
                    continue;
                }
                Ok(stream) => stream,
            };
            connection_count += 1;
            info!(peer = ?stream.peer_addr().ok(), connection = connection_count, "accepted");
            let core = self.core.clone();
            let spawned = thread::Builder::new()
                .name(format!("mongoshim-conn-{}", connection_count))
                .spawn(move || handle_tcp_stream(stream, core));
            if let Err(error) = spawned {
                error!(%error, "cannot start connection thread");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tcp_tests {
    use std::io::{self, Write};

    use crate::cortices::tcp::{send_data_to_stream_with_flushing, TcpError};
    use crate::declarations::errors::MongoShimError;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_send_writes_everything() {
        let mut sink = Vec::new();
        send_data_to_stream_with_flushing(&mut sink, &[1, 2, 3]).unwrap();
        assert_eq!(sink, vec![1, 2, 3]);
    }

    #[test]
    fn test_write_failure_is_a_disconnect() {
        match send_data_to_stream_with_flushing(&mut BrokenPipe, &[1]) {
            Err(error @ MongoShimError::Tcp(TcpError::TcpWriteError(_))) => {
                assert!(error.is_disconnect())
            }
            other => panic!("Unexpected result {:?}", other),
        }
    }
}
