use std::io;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;

use bson::Document;
use tracing::{info, warn};

use libmongoshim::config::MongoShimConfiguration;
use libmongoshim::cortices::mongo::error::MongoSerializeError;
use libmongoshim::cortices::mongo::ops::msg_header::MsgHeader;
use libmongoshim::cortices::mongo::ops::op::MongoOp;
use libmongoshim::cortices::mongo::ops::op_get_more::{serialize_op_get_more, OpGetMore};
use libmongoshim::cortices::mongo::ops::op_kill_cursors::{
    serialize_op_kill_cursors, OpKillCursors,
};
use libmongoshim::cortices::mongo::ops::op_query::{serialize_op_query, OpQuery};
use libmongoshim::cortices::mongo::ops::op_reply::OpReply;
use libmongoshim::cortices::mongo::ops::opcodes::MongoOpCode;
use libmongoshim::cortices::mongo::parser::read_mongo_op;
use libmongoshim::cortices::tcp::{send_data_to_stream_with_flushing, MongoListener, TcpError};
use libmongoshim::declarations::errors::MongoShimResult;
use libmongoshim::handler::QueryHandler;
use libmongoshim::shim_core::MongoShimCore;

/// A listener running on a background thread.
pub struct LaunchedServer {
    pub addr: SocketAddr,
    pub core: Arc<MongoShimCore>,
}

/// Bind `config.mongo_endpoint` (use port 0 for a free port) and serve in the
/// background. Returns once the socket is accepting connections.
pub fn launch_server<H>(config: MongoShimConfiguration, handler: H) -> MongoShimResult<LaunchedServer>
where
    H: QueryHandler + 'static,
{
    let core = Arc::new(MongoShimCore::new(config, handler));
    let listener = MongoListener::bind(core.clone())?;
    let addr = listener.local_addr()?;
    thread::spawn(move || {
        if let Err(error) = listener.serve() {
            warn!(%error, "test listener stopped");
        }
    });
    info!(%addr, "test server launched");
    Ok(LaunchedServer { addr, core })
}

/// Configuration bound to a free local port.
pub fn local_config() -> MongoShimConfiguration {
    MongoShimConfiguration {
        mongo_endpoint: "127.0.0.1:0".to_string(),
        ..MongoShimConfiguration::default()
    }
}

fn encode_document(document: &Document) -> MongoShimResult<Vec<u8>> {
    let mut bytes = Vec::new();
    document
        .to_writer(&mut bytes)
        .map_err(MongoSerializeError::from)?;
    Ok(bytes)
}

fn protocol_violation(message: String) -> TcpError {
    TcpError::TcpReadError(io::Error::new(io::ErrorKind::InvalidData, message))
}

/// Blocking legacy-protocol client: one request at a time, replies read in order.
pub struct WireClient {
    stream: TcpStream,
    request_count: i32,
}

impl WireClient {
    pub fn connect(addr: SocketAddr) -> MongoShimResult<WireClient> {
        let stream = TcpStream::connect(addr).map_err(TcpError::TcpStreamError)?;
        Ok(WireClient {
            stream,
            request_count: 0,
        })
    }

    fn next_header(&mut self, op_code: MongoOpCode) -> MsgHeader {
        self.request_count += 1;
        MsgHeader {
            message_length: 0,
            request_id: self.request_count,
            response_to: 0,
            op_code,
        }
    }

    pub fn send_raw(&mut self, bytes: &[u8]) -> MongoShimResult<()> {
        send_data_to_stream_with_flushing(&mut self.stream, bytes)
    }

    /// Read the next message and check it answers `request_id`.
    pub fn receive_reply(&mut self, request_id: i32) -> MongoShimResult<OpReply> {
        match read_mongo_op(&mut self.stream, u32::MAX)? {
            Some(MongoOp::Reply(reply)) if reply.message_header.response_to == request_id => {
                Ok(reply)
            }
            Some(MongoOp::Reply(reply)) => Err(protocol_violation(format!(
                "reply to {} while waiting for {}",
                reply.message_header.response_to, request_id
            ))
            .into()),
            Some(other) => {
                Err(protocol_violation(format!("expected a reply, got {:?}", other)).into())
            }
            None => Err(TcpError::TcpReadError(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            ))
            .into()),
        }
    }

    pub fn query_with_projection(
        &mut self,
        collection: &str,
        filter: &Document,
        projection: Option<&Document>,
        number_to_skip: i32,
        number_to_return: i32,
    ) -> MongoShimResult<OpReply> {
        let message_header = self.next_header(MongoOpCode::OpQuery);
        let request_id = message_header.request_id;
        let return_fields_selector = match projection {
            None => None,
            Some(projection) => Some(encode_document(projection)?),
        };
        let op_query = OpQuery {
            message_header,
            flags: 0,
            full_collection_name: collection.to_string(),
            number_to_skip,
            number_to_return,
            query: encode_document(filter)?,
            return_fields_selector,
        };
        self.send_raw(&serialize_op_query(&op_query)?)?;
        self.receive_reply(request_id)
    }

    pub fn query(
        &mut self,
        collection: &str,
        filter: &Document,
        number_to_skip: i32,
        number_to_return: i32,
    ) -> MongoShimResult<OpReply> {
        self.query_with_projection(collection, filter, None, number_to_skip, number_to_return)
    }

    pub fn get_more(
        &mut self,
        collection: &str,
        cursor_id: i64,
        number_to_return: i32,
    ) -> MongoShimResult<OpReply> {
        let message_header = self.next_header(MongoOpCode::OpGetMore);
        let request_id = message_header.request_id;
        let op_get_more = OpGetMore {
            message_header,
            zero: 0,
            full_collection_name: collection.to_string(),
            number_to_return,
            cursor_id,
        };
        self.send_raw(&serialize_op_get_more(&op_get_more)?)?;
        self.receive_reply(request_id)
    }

    /// Fire and forget, the server does not answer killCursors.
    pub fn kill_cursors(&mut self, cursor_ids: &[i64]) -> MongoShimResult<()> {
        let op_kill_cursors = OpKillCursors {
            message_header: self.next_header(MongoOpCode::OpKillCursors),
            zero: 0,
            cursor_ids: cursor_ids.to_vec(),
        };
        self.send_raw(&serialize_op_kill_cursors(&op_kill_cursors)?)
    }

    /// Query and follow the cursor to the end, the way a driver's `find` does.
    pub fn find_all(
        &mut self,
        collection: &str,
        filter: &Document,
        batch_size: i32,
    ) -> MongoShimResult<Vec<Document>> {
        let mut reply = self.query(collection, filter, 0, batch_size)?;
        let mut documents = reply.decode_documents()?;
        while reply.cursor_id != 0 {
            reply = self.get_more(collection, reply.cursor_id, batch_size)?;
            documents.extend(reply.decode_documents()?);
        }
        Ok(documents)
    }
}
