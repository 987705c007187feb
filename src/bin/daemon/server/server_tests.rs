// Loopback test suite for the server module
// Every test binds on tcp://127.0.0.1:0 and drives the service loop and its
// clients concurrently on one task with `futures::join!`.

use crate::server::display::DisplayServer;
use crate::server::mirror::MirrorServer;
use crate::server::relay::RelayServer;
use crate::server::{bind, first_frame, subscribe};
use async_std::channel::{self, Sender};
use async_std::future::timeout;
use async_std::task;
use paas::display::{Allocator, AllocationPolicy, Geometry, Renderer, Surface};
use paas::mirror::{Mirror, Store};
use paas::protocol::{ControlReply, Envelope, Record, Rgb, TopicSet};
use serde_json::json;
use std::time::Duration;
use zeromq::prelude::*;
use zeromq::{PubSocket, ReqSocket, ZmqMessage};

const LOOPBACK: &str = "tcp://127.0.0.1:0";
const WAIT: Duration = Duration::from_secs(5);
/// Time for a fresh subscription to reach the publisher
const SETTLE: Duration = Duration::from_millis(300);

/// One request/reply exchange on a fresh REQ socket
async fn request(endpoint: &str, body: String) -> String {
    let mut socket = ReqSocket::new();
    socket.connect(endpoint).await.unwrap();
    socket.send(ZmqMessage::from(body)).await.unwrap();
    let reply = timeout(WAIT, socket.recv()).await.unwrap().unwrap();
    String::from_utf8(first_frame(&reply).unwrap().to_vec()).unwrap()
}

async fn query(endpoint: &str, key: &str) -> Option<Record> {
    serde_json::from_str(&request(endpoint, key.to_string()).await).unwrap()
}

async fn publish(socket: &mut PubSocket, frame: &str) {
    socket.send(ZmqMessage::from(frame.to_string())).await.unwrap();
}

fn stop(shutdown_tx: &Sender<()>) {
    shutdown_tx.close();
}

#[derive(Default)]
struct FrameCounter {
    frames: Vec<Vec<[u8; 3]>>,
}

impl Surface for FrameCounter {
    fn show(&mut self, _geometry: &Geometry, frame: &[[u8; 3]]) -> paas::Result<()> {
        self.frames.push(frame.to_vec());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "counter"
    }
}

#[cfg(test)]
mod relay_tests {
    use super::*;

    /// A request is published on the broadcast channel and acknowledged
    #[async_std::test]
    async fn test_relay_acknowledges_and_broadcasts() {
        let mut relay = RelayServer::bind(LOOPBACK, LOOPBACK).await.unwrap();
        let control = relay.control_endpoint().to_string();
        let mut subscriber = subscribe(relay.broadcast_endpoint(), "paas_").await.unwrap();
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);

        let producer = async {
            task::sleep(SETTLE).await;
            let body = json!({"topic": "paas_pixel", "data": {"key": "item_1", "rgb": [0, 0, 255]}});
            let reply = request(&control, body.to_string()).await;
            let broadcast = timeout(WAIT, subscriber.recv()).await.unwrap().unwrap();
            stop(&shutdown_tx);
            (reply, first_frame(&broadcast).unwrap().to_vec())
        };

        let (served, (reply, frame)) = futures::join!(relay.run(shutdown_rx), producer);
        served.unwrap();
        relay.shutdown();

        assert_eq!(ControlReply::parse(reply.as_bytes()).unwrap(), ControlReply::received("paas_pixel"));
        let envelope = Envelope::decode(&frame).unwrap();
        assert_eq!(envelope.topic, "paas_pixel");
        assert_eq!(envelope.payload["key"], "item_1");
    }

    /// A malformed request is acknowledged with an error and the relay keeps serving
    #[async_std::test]
    async fn test_relay_survives_malformed_request() {
        let mut relay = RelayServer::bind(LOOPBACK, LOOPBACK).await.unwrap();
        let control = relay.control_endpoint().to_string();
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);

        let producer = async {
            let bad = request(&control, "this is not json".to_string()).await;
            let good = request(&control, json!({"topic": "paas_showpixels"}).to_string()).await;
            stop(&shutdown_tx);
            (bad, good)
        };

        let (served, (bad, good)) = futures::join!(relay.run(shutdown_rx), producer);
        served.unwrap();

        assert!(ControlReply::parse(bad.as_bytes()).unwrap().is_error());
        assert_eq!(
            ControlReply::parse(good.as_bytes()).unwrap().message,
            "Received message on topic 'paas_showpixels'"
        );
    }

    /// Subscribers see broadcasts in the relay's receipt order
    #[async_std::test]
    async fn test_relay_preserves_order() {
        let mut relay = RelayServer::bind(LOOPBACK, LOOPBACK).await.unwrap();
        let control = relay.control_endpoint().to_string();
        let mut subscriber = subscribe(relay.broadcast_endpoint(), "paas_pixel").await.unwrap();
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);

        let producer = async {
            task::sleep(SETTLE).await;
            let mut socket = ReqSocket::new();
            socket.connect(&control).await.unwrap();
            for i in 0..20 {
                let body = json!({"topic": "paas_pixel", "data": {"key": format!("item_{}", i)}});
                socket.send(ZmqMessage::from(body.to_string())).await.unwrap();
                timeout(WAIT, socket.recv()).await.unwrap().unwrap();
            }

            let mut keys = Vec::new();
            for _ in 0..20 {
                let message = timeout(WAIT, subscriber.recv()).await.unwrap().unwrap();
                let envelope = Envelope::decode(first_frame(&message).unwrap()).unwrap();
                keys.push(envelope.payload["key"].as_str().unwrap().to_string());
            }
            stop(&shutdown_tx);
            keys
        };

        let (served, keys) = futures::join!(relay.run(shutdown_rx), producer);
        served.unwrap();

        let expected: Vec<String> = (0..20).map(|i| format!("item_{}", i)).collect();
        assert_eq!(keys, expected);
    }
}

#[cfg(test)]
mod mirror_tests {
    use super::*;

    async fn broadcaster() -> (PubSocket, String) {
        let mut socket = PubSocket::new();
        let endpoint = bind(&mut socket, LOOPBACK).await.unwrap();
        (socket, endpoint)
    }

    /// Published updates become queryable, unknown keys answer null
    #[async_std::test]
    async fn test_mirror_stores_and_answers() {
        let (mut publisher, broadcast) = broadcaster().await;
        let mut server = MirrorServer::start(&broadcast, "paas_pixel", LOOPBACK, Mirror::new(Store::in_memory()))
            .await
            .unwrap();
        let query_endpoint = server.query_endpoint().to_string();
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);

        let reader = async {
            task::sleep(SETTLE).await;
            publish(&mut publisher, r#"paas_pixel {"key": "item_1", "rgb": [10, 20, 30]}"#).await;
            publish(&mut publisher, r#"paas_allpixels {"rgb": [1, 1, 1]}"#).await;

            let mut stored = None;
            for _ in 0..50 {
                stored = query(&query_endpoint, "item_1").await;
                if stored.is_some() {
                    break;
                }
                task::sleep(Duration::from_millis(20)).await;
            }
            let missing = query(&query_endpoint, "item_404").await;
            stop(&shutdown_tx);
            (stored, missing)
        };

        let (served, (stored, missing)) = futures::join!(server.run(shutdown_rx), reader);
        served.unwrap();

        assert_eq!(stored.unwrap().color, Rgb::new(10, 20, 30));
        assert_eq!(missing, None);
        // allpixels carries no key and is outside the filter anyway
        assert_eq!(server.mirror().store().len(), 1);
        server.shutdown().unwrap();
    }

    /// Updates and queries arriving together are all eventually served
    #[async_std::test]
    async fn test_mirror_interleaved_updates_and_queries() {
        let (mut publisher, broadcast) = broadcaster().await;
        let mut server = MirrorServer::start(&broadcast, "paas_pixel", LOOPBACK, Mirror::new(Store::in_memory()))
            .await
            .unwrap();
        let query_endpoint = server.query_endpoint().to_string();
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);

        let reader = async {
            task::sleep(SETTLE).await;
            for i in 0..30 {
                let frame = json!({"key": format!("item_{}", i), "rgb": [i, i, i]});
                publish(&mut publisher, &format!("paas_pixel {}", frame)).await;
                query(&query_endpoint, &format!("item_{}", i)).await;
            }

            let mut found = 0;
            for _ in 0..50 {
                found = 0;
                for i in 0..30 {
                    if query(&query_endpoint, &format!("item_{}", i)).await.is_some() {
                        found += 1;
                    }
                }
                if found == 30 {
                    break;
                }
                task::sleep(Duration::from_millis(20)).await;
            }
            stop(&shutdown_tx);
            found
        };

        let (served, found) = futures::join!(server.run(shutdown_rx), reader);
        served.unwrap();
        assert_eq!(found, 30);
    }
}

#[cfg(test)]
mod display_tests {
    use super::*;

    /// Broadcast frames reach the renderer; foreign topics do not flush
    #[async_std::test]
    async fn test_display_renders_broadcasts() {
        let mut publisher = PubSocket::new();
        let broadcast = bind(&mut publisher, LOOPBACK).await.unwrap();

        let geometry = Geometry::Strip { length: 4 };
        let renderer = Renderer::new(
            TopicSet::default(),
            geometry,
            Allocator::new(&geometry, AllocationPolicy::Linear),
            FrameCounter::default(),
        );
        let mut server = DisplayServer::start(&broadcast, "paas_", renderer).await.unwrap();
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);

        let producer = async {
            task::sleep(SETTLE).await;
            publish(&mut publisher, r#"paas_other {"anything": 1}"#).await;
            publish(&mut publisher, r#"paas_pixel {"key": "a", "rgb": [255, 0, 0], "show": false}"#).await;
            publish(&mut publisher, r#"paas_showpixels """#).await;
            task::sleep(SETTLE).await;
            stop(&shutdown_tx);
        };

        let (served, ()) = futures::join!(server.run(shutdown_rx), producer);
        served.unwrap();

        let frames = &server.renderer().surface().frames;
        assert_eq!(frames.len(), 1);
        // linear allocation hands out the last position first
        assert_eq!(frames[0][3], [255, 0, 0]);
        assert_eq!(frames[0][0], [0, 0, 0]);
        server.shutdown();
    }
}

#[cfg(test)]
mod client_tests {
    use super::*;
    use paas::client::{ControlClient, QueryClient};

    /// The blocking clients drive a relay and a mirror end to end
    #[async_std::test]
    async fn test_clients_inject_and_query() {
        let mut relay = RelayServer::bind(LOOPBACK, LOOPBACK).await.unwrap();
        let control = relay.control_endpoint().to_string();
        let mut mirror = MirrorServer::start(
            relay.broadcast_endpoint(),
            "paas_pixel",
            LOOPBACK,
            Mirror::new(Store::in_memory()),
        )
        .await
        .unwrap();
        let query_endpoint = mirror.query_endpoint().to_string();
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);
        let relay_rx = shutdown_rx.clone();

        let clients = async move {
            task::sleep(SETTLE).await;
            let results = task::spawn_blocking(move || {
                let mut producer = ControlClient::connect(&control, 2000).unwrap();
                let ack = producer
                    .inject(&TopicSet::default().pixel("item_1", Rgb::new(1, 2, 3), true))
                    .unwrap();
                let rejected = producer.send_raw(b"garbage").unwrap();

                let mut reader = QueryClient::connect(&query_endpoint, 2000).unwrap();
                let mut stored = None;
                for _ in 0..50 {
                    stored = reader.query("item_1").unwrap();
                    if stored.is_some() {
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(20));
                }
                let missing = reader.query("nope").unwrap();
                (ack, rejected, stored, missing)
            })
            .await;
            stop(&shutdown_tx);
            results
        };

        let (relayed, mirrored, (ack, rejected, stored, missing)) =
            futures::join!(relay.run(relay_rx), mirror.run(shutdown_rx), clients);
        relayed.unwrap();
        mirrored.unwrap();
        relay.shutdown();
        mirror.shutdown().unwrap();

        assert_eq!(ack.message, "Received message on topic 'paas_pixel'");
        assert!(rejected.is_error());
        assert_eq!(stored.unwrap().color, Rgb::new(1, 2, 3));
        assert_eq!(missing, None);
    }
}
