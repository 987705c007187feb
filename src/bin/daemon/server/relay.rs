use super::{bind, first_frame, send_reply};
use crate::utils::endpoint::cleanup;
use async_std::channel::Receiver;
use futures::FutureExt;
use paas::relay::Relay;
use paas::{PaasError, Result};
use tracing::{error, info};
use zeromq::prelude::*;
use zeromq::{PubSocket, RepSocket, ZmqMessage};

/// Relay service: serializes every producer through one control socket and
/// republishes in receipt order
pub struct RelayServer {
    /// ZeroMQ reply socket for producers
    control: RepSocket,
    /// ZeroMQ publish socket for subscribers
    broadcast: PubSocket,
    /// Endpoints as bound, `tcp://...:0` resolved to the real port
    control_endpoint: String,
    broadcast_endpoint: String,
    /// Endpoints as configured, removed again on shutdown
    configured: [String; 2],
    relay: Relay,
}

impl RelayServer {
    /// Binds the control and broadcast channels
    ///
    /// # Arguments
    /// * `control_endpoint` - Where producers connect
    /// * `broadcast_endpoint` - Where subscribers connect
    ///
    /// # Returns
    /// * `Result<RelayServer>` - A bound relay or a transport error
    pub async fn bind(control_endpoint: &str, broadcast_endpoint: &str) -> Result<Self> {
        let configured = [control_endpoint.to_string(), broadcast_endpoint.to_string()];

        let mut broadcast = PubSocket::new();
        let broadcast_endpoint = bind(&mut broadcast, broadcast_endpoint).await?;

        let mut control = RepSocket::new();
        let control_endpoint = bind(&mut control, control_endpoint).await?;

        Ok(RelayServer {
            control,
            broadcast,
            control_endpoint,
            broadcast_endpoint,
            configured,
            relay: Relay::new(),
        })
    }

    #[cfg(test)]
    pub fn control_endpoint(&self) -> &str {
        &self.control_endpoint
    }

    #[cfg(test)]
    pub fn broadcast_endpoint(&self) -> &str {
        &self.broadcast_endpoint
    }

    /// Run the relay loop until the shutdown channel closes
    ///
    /// # Arguments
    /// * `shutdown_rx` - Receiver for shutdown signal
    pub async fn run(&mut self, shutdown_rx: Receiver<()>) -> Result<()> {
        loop {
            futures::select! {
                msg = self.control.recv().fuse() => {
                    match msg {
                        Ok(request) => {
                            if let Err(e) = self.process_message(request).await {
                                error!("Error processing request: {}", e);
                            }
                        }
                        Err(e) => {
                            error!("Error receiving request: {:?}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv().fuse() => {
                    info!("Shutdown signal received, stopping relay loop");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Publishes first, then acknowledges, so a producer that got its
    /// reply knows the envelope is already on the broadcast channel
    async fn process_message(&mut self, request: ZmqMessage) -> Result<()> {
        let frame = first_frame(&request).unwrap_or_default();
        let decision = self.relay.handle_request(frame);

        if let Some(broadcast) = decision.broadcast {
            if let Err(e) = self.broadcast.send(ZmqMessage::from(broadcast)).await {
                error!("Error publishing on {}: {:?}", self.broadcast_endpoint, e);
            }
        }

        let reply = serde_json::to_string(&decision.reply).map_err(PaasError::from)?;
        send_reply(&mut self.control, reply).await
    }

    /// Shutdown the relay, removing its socket files
    pub fn shutdown(self) {
        info!(
            "Relay on {} stopped after {} relayed and {} rejected requests",
            self.control_endpoint,
            self.relay.relayed(),
            self.relay.rejected()
        );
        for endpoint in &self.configured {
            cleanup(endpoint);
        }
    }
}
