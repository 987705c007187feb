use super::{first_frame, subscribe};
use async_std::channel::Receiver;
use futures::FutureExt;
use paas::display::{Renderer, Surface};
use paas::outcome::Outcome;
use paas::protocol::Envelope;
use paas::Result;
use tracing::{error, info};
use zeromq::prelude::*;
use zeromq::SubSocket;

/// Display service: feeds the broadcast subscription into a renderer
pub struct DisplayServer<S: Surface> {
    subscription: SubSocket,
    renderer: Renderer<S>,
}

impl<S: Surface> DisplayServer<S> {
    /// Subscribes the renderer to the broadcast channel
    pub async fn start(broadcast_endpoint: &str, topic_filter: &str, renderer: Renderer<S>) -> Result<Self> {
        let subscription = subscribe(broadcast_endpoint, topic_filter).await?;
        Ok(DisplayServer {
            subscription,
            renderer,
        })
    }

    /// Run the display loop until shutdown or a surface failure
    pub async fn run(&mut self, shutdown_rx: Receiver<()>) -> Result<()> {
        loop {
            futures::select! {
                msg = self.subscription.recv().fuse() => {
                    match msg {
                        Ok(message) => {
                            let frame = first_frame(&message).unwrap_or_default();
                            let outcome = match Envelope::decode(frame) {
                                Ok(envelope) => self.renderer.apply(&envelope),
                                Err(e) => Outcome::ignored(e.to_string()),
                            };
                            outcome.escalate("display")?;
                        }
                        Err(e) => error!("Error receiving broadcast: {:?}", e),
                    }
                }
                _ = shutdown_rx.recv().fuse() => {
                    info!("Shutdown signal received, stopping display loop");
                    break;
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn renderer(&self) -> &Renderer<S> {
        &self.renderer
    }

    pub fn shutdown(self) {
        info!(
            "Display stopped after {} frames, {} keys allocated",
            self.renderer.flush_count(),
            self.renderer.allocator().allocated()
        );
    }
}
