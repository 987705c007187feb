//! Server Module
//!
//! Socket loops of the paasd services. Each loop owns its sockets and its
//! state, suspends only on receive, and handles every message to completion
//! before polling again. Message handling itself lives in the `paas` library.
//!
//! - relay: control channel in, broadcast channel out
//! - mirror: broadcast subscription plus the query channel
//! - display: broadcast subscription driving a renderer

pub mod display;
pub mod mirror;
pub mod relay;

use crate::utils::endpoint::{prepare_bind, restrict_permissions};
use paas::{PaasError, Result};
use std::time::Duration;
use tracing::{error, info, warn};
use zeromq::prelude::*;
use zeromq::{SubSocket, ZmqMessage};

/// Maximum retry attempts for sending replies
const MAX_SEND_RETRIES: usize = 3;

/// Binds a socket, preparing ipc paths first
///
/// # Returns
/// * `Result<String>` - The endpoint actually bound (resolves `tcp://...:0`)
pub async fn bind<S: Socket>(socket: &mut S, endpoint: &str) -> Result<String> {
    prepare_bind(endpoint)?;
    let bound = socket
        .bind(endpoint)
        .await
        .map_err(|e| PaasError::transport(endpoint, e))?;
    restrict_permissions(endpoint);
    info!("Listening on {}", bound);
    Ok(bound.to_string())
}

/// Connects a subscriber to the broadcast channel with a byte-prefix filter
pub async fn subscribe(endpoint: &str, filter: &str) -> Result<SubSocket> {
    let mut socket = SubSocket::new();
    socket
        .connect(endpoint)
        .await
        .map_err(|e| PaasError::transport(endpoint, e))?;
    socket
        .subscribe(filter)
        .await
        .map_err(|e| PaasError::transport(endpoint, e))?;
    info!("Subscribed to '{}' on {}", filter, endpoint);
    Ok(socket)
}

/// First frame of a message, `None` for an empty message
pub fn first_frame(message: &ZmqMessage) -> Option<&[u8]> {
    message.get(0).map(|frame| frame.as_ref())
}

/// Sends a reply on a REP socket with retry logic
///
/// # Arguments
/// * `socket` - Socket the request came in on
/// * `reply` - The reply text
pub async fn send_reply<S: SocketSend>(socket: &mut S, reply: String) -> Result<()> {
    for attempt in 0..MAX_SEND_RETRIES {
        match socket.send(ZmqMessage::from(reply.clone())).await {
            Ok(_) => {
                if attempt > 0 {
                    info!("Reply sent successfully on attempt {}", attempt + 1);
                }
                return Ok(());
            }
            Err(e) if attempt < MAX_SEND_RETRIES - 1 => {
                warn!("Failed to send reply (attempt {}): {:?}", attempt + 1, e);
                async_std::task::sleep(Duration::from_millis(100 * (attempt as u64 + 1))).await;
            }
            Err(e) => {
                error!("Failed to send reply after {} attempts: {:?}", MAX_SEND_RETRIES, e);
                return Err(e.into());
            }
        }
    }
    Err(PaasError::Protocol("reply was never attempted".to_string()))
}

/// Server tests module - loopback tests for the socket loops
#[cfg(test)]
mod server_tests;
