//! Blocking clients for the relay control channel and the mirror query channel.
//!
//! Both wrap a single ZeroMQ REQ socket with send and receive timeouts, so a
//! missing daemon shows up as an error instead of a hang.

use crate::error::{PaasError, Result};
use crate::protocol::{ControlReply, ControlRequest, Envelope, Record};
use tracing::debug;

/// Opens a REQ socket with timeouts that can recover from a lost reply
fn request_socket(context: &zmq::Context, endpoint: &str, timeout_ms: i32) -> Result<zmq::Socket> {
    let socket = context
        .socket(zmq::REQ)
        .map_err(|e| PaasError::transport(endpoint, e))?;

    // Without these a timed out request leaves the socket stuck in the
    // "awaiting reply" state forever
    socket.set_req_relaxed(true)?;
    socket.set_req_correlate(true)?;
    socket.set_rcvtimeo(timeout_ms)?;
    socket.set_sndtimeo(timeout_ms)?;
    socket.set_linger(0)?;

    socket
        .connect(endpoint)
        .map_err(|e| PaasError::transport(endpoint, e))?;
    Ok(socket)
}

/// Sends one request and waits for the single reply frame
fn round_trip(socket: &zmq::Socket, endpoint: &str, request: &[u8]) -> Result<Vec<u8>> {
    socket
        .send(request, 0)
        .map_err(|e| transport_error(endpoint, e))?;
    socket.recv_bytes(0).map_err(|e| transport_error(endpoint, e))
}

fn transport_error(endpoint: &str, error: zmq::Error) -> PaasError {
    match error {
        zmq::Error::EAGAIN => PaasError::transport(endpoint, "request timed out"),
        other => PaasError::transport(endpoint, other),
    }
}

/// Producer side of the relay control channel
pub struct ControlClient {
    endpoint: String,
    #[allow(dead_code)] // Context needs to be kept alive for the connection
    context: zmq::Context,
    socket: zmq::Socket,
}

impl ControlClient {
    /// Connects to the relay control channel
    ///
    /// # Arguments
    /// * `endpoint` - Control endpoint, e.g. `ipc:///tmp/paas/control.sock`
    /// * `timeout_ms` - Send and receive timeout in milliseconds
    pub fn connect(endpoint: &str, timeout_ms: i32) -> Result<Self> {
        let context = zmq::Context::new();
        let socket = request_socket(&context, endpoint, timeout_ms)?;
        Ok(ControlClient {
            endpoint: endpoint.to_string(),
            context,
            socket,
        })
    }

    /// Injects an envelope into the fabric and waits for the acknowledgement
    ///
    /// # Returns
    /// * `Result<ControlReply>` - The relay's reply; an `Error: ...` reply is
    ///   returned as is, only transport failures are errors
    pub fn inject(&mut self, envelope: &Envelope) -> Result<ControlReply> {
        let request = serde_json::to_vec(&ControlRequest::from(envelope))?;
        self.send_raw(&request)
    }

    /// Sends an already encoded control request
    pub fn send_raw(&mut self, request: &[u8]) -> Result<ControlReply> {
        let reply = round_trip(&self.socket, &self.endpoint, request)?;
        let reply = ControlReply::parse(&reply)?;
        debug!("Relay replied: {}", reply.message);
        Ok(reply)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Client of the mirror query channel
pub struct QueryClient {
    endpoint: String,
    #[allow(dead_code)] // Context needs to be kept alive for the connection
    context: zmq::Context,
    socket: zmq::Socket,
}

impl QueryClient {
    pub fn connect(endpoint: &str, timeout_ms: i32) -> Result<Self> {
        let context = zmq::Context::new();
        let socket = request_socket(&context, endpoint, timeout_ms)?;
        Ok(QueryClient {
            endpoint: endpoint.to_string(),
            context,
            socket,
        })
    }

    /// Asks the mirror for the record stored under `key`
    ///
    /// # Returns
    /// * `Result<Option<Record>>` - `None` when the mirror has never seen the key
    pub fn query(&mut self, key: &str) -> Result<Option<Record>> {
        let reply = self.query_raw(key)?;
        Ok(serde_json::from_str(&reply)?)
    }

    /// Asks the mirror for `key` and returns the reply text unparsed
    pub fn query_raw(&mut self, key: &str) -> Result<String> {
        let reply = round_trip(&self.socket, &self.endpoint, key.as_bytes())?;
        Ok(String::from_utf8(reply)?)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
