//! Relay request handling.
//!
//! The relay does not look inside payloads. It only needs a topic to build
//! the broadcast frame; anything it cannot parse is acknowledged with an
//! error message and not broadcast.

use crate::protocol::{ControlReply, ControlRequest, MAX_FRAME_SIZE};
use tracing::{debug, warn};

/// What the relay does with one control request
#[derive(Debug, Clone, PartialEq)]
pub struct RelayDecision {
    /// Frame to publish on the broadcast channel, if any
    pub broadcast: Option<String>,
    /// Acknowledgement for the producer
    pub reply: ControlReply,
}

/// Single logical sequencer for every producer
#[derive(Debug, Default)]
pub struct Relay {
    relayed: u64,
    rejected: u64,
}

impl Relay {
    pub fn new() -> Self {
        Relay::default()
    }

    /// Handle one control request
    ///
    /// # Arguments
    /// * `frame` - Raw request bytes as received on the control channel
    ///
    /// # Returns
    /// * `RelayDecision` - Always carries a reply; carries a broadcast frame
    ///   only when the request had a usable topic
    pub fn handle_request(&mut self, frame: &[u8]) -> RelayDecision {
        if frame.len() > MAX_FRAME_SIZE {
            warn!("Request too large: {} bytes", frame.len());
            return self.reject(format!(
                "Message too large: {} bytes (max: {})",
                frame.len(),
                MAX_FRAME_SIZE
            ));
        }

        let request = match ControlRequest::parse(frame) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejected control request: {}", e);
                return self.reject(e);
            }
        };

        let reply = ControlReply::received(&request.topic);
        let broadcast = request.into_envelope().encode();
        self.relayed += 1;
        debug!("Relaying #{}: {}", self.relayed, broadcast);

        RelayDecision {
            broadcast: Some(broadcast),
            reply,
        }
    }

    fn reject(&mut self, reason: impl std::fmt::Display) -> RelayDecision {
        self.rejected += 1;
        RelayDecision {
            broadcast: None,
            reply: ControlReply::error(reason),
        }
    }

    /// Number of requests republished so far
    pub fn relayed(&self) -> u64 {
        self.relayed
    }

    /// Number of requests acknowledged with an error
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}
