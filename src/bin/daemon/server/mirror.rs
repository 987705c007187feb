use super::{bind, first_frame, send_reply, subscribe};
use crate::utils::endpoint::cleanup;
use async_std::channel::Receiver;
use futures::FutureExt;
use paas::mirror::Mirror;
use paas::Result;
use tracing::{error, info};
use zeromq::prelude::*;
use zeromq::{RepSocket, SubSocket};

/// Mirror service: one loop over the broadcast subscription and the query
/// channel
pub struct MirrorServer {
    subscription: SubSocket,
    query: RepSocket,
    /// Query endpoint as bound
    query_endpoint: String,
    /// Query endpoint as configured, removed again on shutdown
    configured: String,
    mirror: Mirror,
}

impl MirrorServer {
    /// Subscribes to the broadcast channel and binds the query channel
    ///
    /// # Arguments
    /// * `broadcast_endpoint` - Relay broadcast channel
    /// * `topic_filter` - Byte prefix of the topics to mirror
    /// * `query_endpoint` - Where readers connect
    /// * `mirror` - Mirror over an already opened store
    pub async fn start(
        broadcast_endpoint: &str,
        topic_filter: &str,
        query_endpoint: &str,
        mirror: Mirror,
    ) -> Result<Self> {
        let subscription = subscribe(broadcast_endpoint, topic_filter).await?;
        let configured = query_endpoint.to_string();
        let mut query = RepSocket::new();
        let query_endpoint = bind(&mut query, query_endpoint).await?;
        info!("Mirror serving {} keys", mirror.store().len());

        Ok(MirrorServer {
            subscription,
            query,
            query_endpoint,
            configured,
            mirror,
        })
    }

    #[cfg(test)]
    pub fn query_endpoint(&self) -> &str {
        &self.query_endpoint
    }

    /// Run the mirror loop until shutdown or a store failure
    ///
    /// When an update and a query are both ready the poll order is left to
    /// `select!`, which picks among ready branches at random, so neither
    /// source can starve the other.
    pub async fn run(&mut self, shutdown_rx: Receiver<()>) -> Result<()> {
        loop {
            futures::select! {
                msg = self.subscription.recv().fuse() => {
                    match msg {
                        Ok(message) => {
                            let frame = first_frame(&message).unwrap_or_default();
                            self.mirror.handle_broadcast(frame).escalate("mirror")?;
                        }
                        Err(e) => error!("Error receiving broadcast: {:?}", e),
                    }
                }
                msg = self.query.recv().fuse() => {
                    match msg {
                        Ok(request) => {
                            let reply = self.mirror.handle_query(first_frame(&request).unwrap_or_default());
                            if let Err(e) = send_reply(&mut self.query, reply).await {
                                error!("Error answering query on {}: {}", self.query_endpoint, e);
                            }
                        }
                        Err(e) => error!("Error receiving query: {:?}", e),
                    }
                }
                _ = shutdown_rx.recv().fuse() => {
                    info!("Shutdown signal received, stopping mirror loop");
                    break;
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    /// Shutdown the mirror, writing the store one last time
    pub fn shutdown(self) -> Result<()> {
        cleanup(&self.configured);
        let store = self.mirror.into_store();
        if store.path().is_some() {
            store.persist()?;
        }
        info!("Mirror stopped with {} keys", store.len());
        Ok(())
    }
}
