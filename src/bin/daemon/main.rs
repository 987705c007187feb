#![cfg(feature = "daemon")]

//! paasd - the Pixels as a Service daemon
//!
//! One binary, one service per process: `paasd relay`, `paasd mirror` and
//! `paasd display` each run a single cooperative loop. `paasd all` runs the
//! three loops side by side for a single-host setup.

mod server;
mod utils;

use async_std::channel::Receiver;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use paas::config::{Config, DEFAULT_CONFIG_PATH};
use paas::display::{Allocator, Renderer, Surface, build_surface};
use paas::mirror::{Mirror, Store};
use paas::protocol::TopicSet;
use server::display::DisplayServer;
use server::mirror::MirrorServer;
use server::relay::RelayServer;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// paasd - Pixels as a Service daemon
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file; defaults apply when it does not exist
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    service: Service,
}

#[derive(Subcommand, Debug)]
enum Service {
    /// Run the relay (control channel in, broadcast channel out)
    Relay,
    /// Run the state mirror and its query channel
    Mirror,
    /// Run a renderer on the configured surface
    Display,
    /// Run relay, mirror and display in one process
    All,
    /// Print the effective configuration and exit
    Config,
    /// Inspect or edit the mirror store while the mirror is stopped
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand, Debug)]
enum StoreAction {
    /// Print every stored key with its color and time
    List,
    /// Remove one key
    Delete {
        /// Logical key to remove
        key: String,
    },
}

#[async_std::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = Config::load(&args.config)?;

    match &args.service {
        Service::Config => {
            print!("{}", config.to_toml()?);
            return Ok(());
        }
        Service::Store { action } => {
            run_store(&config, action, &mut std::io::stdout())?;
            return Ok(());
        }
        _ => {}
    }

    utils::tracing::setup_tracing(config.logging.file.as_deref())?;
    info!("Starting paasd {} ({:?})", env!("CARGO_PKG_VERSION"), args.service);

    let (shutdown_rx, signals) = utils::signals::shutdown_channel()?;

    let result = match args.service {
        Service::Relay => run_relay(&config, shutdown_rx).await,
        Service::Mirror => run_mirror(&config, shutdown_rx).await,
        Service::Display => run_display(&config, shutdown_rx).await,
        Service::All => run_all(&config, shutdown_rx).await,
        Service::Config | Service::Store { .. } => Ok(()),
    };

    signals.close();
    result?;
    info!("paasd stopped");
    Ok(())
}

async fn run_relay(config: &Config, shutdown_rx: Receiver<()>) -> paas::Result<()> {
    let mut relay = RelayServer::bind(&config.endpoints.control, &config.endpoints.broadcast).await?;
    let result = relay.run(shutdown_rx).await;
    relay.shutdown();
    result
}

async fn run_mirror(config: &Config, shutdown_rx: Receiver<()>) -> paas::Result<()> {
    let store = Store::open(&config.mirror.db_file)?;
    info!("Loaded {} keys from {}", store.len(), config.mirror.db_file.display());

    let mut server = MirrorServer::start(
        &config.endpoints.broadcast,
        &config.mirror.topic_filter,
        &config.endpoints.query,
        Mirror::new(store),
    )
    .await?;
    let result = server.run(shutdown_rx).await;
    let shutdown = server.shutdown();
    result.and(shutdown)
}

async fn run_display(config: &Config, shutdown_rx: Receiver<()>) -> paas::Result<()> {
    let display_config = &config.display;
    let surface = build_surface(display_config.surface);
    info!(
        "Rendering {} on the {} surface with {:?} allocation",
        display_config.geometry,
        surface.name(),
        display_config.allocation
    );

    let renderer = Renderer::new(
        TopicSet::new(display_config.namespace.clone()),
        display_config.geometry,
        Allocator::new(&display_config.geometry, display_config.allocation),
        surface,
    )
    .with_max_brightness(display_config.max_brightness);

    let mut server =
        DisplayServer::start(&config.endpoints.broadcast, &display_config.topic_filter, renderer).await?;
    let result = server.run(shutdown_rx).await;
    server.shutdown();
    result
}

/// Runs relay, mirror and display side by side
///
/// The first loop to fail stops the other two; the relay's ipc endpoints are
/// removed whichever loop ended the run.
async fn run_all(config: &Config, shutdown_rx: Receiver<()>) -> paas::Result<()> {
    // the relay binds before anyone subscribes to it
    let mut relay = RelayServer::bind(&config.endpoints.control, &config.endpoints.broadcast).await?;
    let relay_rx = shutdown_rx.clone();
    let mirror_rx = shutdown_rx.clone();
    let result = futures::try_join!(
        relay.run(relay_rx),
        run_mirror(config, mirror_rx),
        run_display(config, shutdown_rx),
    );
    relay.shutdown();
    result.map(|_| ())
}

/// Offline access to the mirror's store file
fn run_store(config: &Config, action: &StoreAction, out: &mut impl Write) -> paas::Result<()> {
    let mut store = Store::open(&config.mirror.db_file)?;
    match action {
        StoreAction::List => {
            for (key, record) in store.iter() {
                let when = DateTime::<Utc>::from_timestamp_micros((record.time * 1_000_000.0) as i64)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| record.time.to_string());
                writeln!(out, "{} {} {}", key, record.color, when)?;
            }
        }
        StoreAction::Delete { key } => {
            if store.delete(key)? {
                writeln!(out, "Deleted {}", key)?;
            } else {
                writeln!(out, "No record for {}", key)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_std::channel;
    use async_std::future::timeout;
    use async_std::task;
    use futures::FutureExt;
    use paas::display::SurfaceKind;
    use paas::protocol::{Record, Rgb};
    use serde_json::json;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;
    use zeromq::prelude::*;
    use zeromq::{ReqSocket, ZmqMessage};

    fn ipc(dir: &Path, name: &str) -> String {
        format!("ipc://{}", dir.join(name).display())
    }

    fn local_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.endpoints.control = ipc(dir, "control.sock");
        config.endpoints.broadcast = ipc(dir, "broadcast.sock");
        config.endpoints.query = ipc(dir, "query.sock");
        config.mirror.db_file = dir.join("pixels.json");
        config.display.surface = SurfaceKind::Log;
        config.logging.file = None;
        config
    }

    /// Injects one pixel, giving up quietly when nobody answers
    async fn inject_once(endpoint: &str) {
        let mut socket = ReqSocket::new();
        if socket.connect(endpoint).await.is_err() {
            return;
        }
        let body = json!({"topic": "paas_pixel", "data": {"key": "item_1", "rgb": [1, 2, 3]}});
        let wait = Duration::from_millis(500);
        if let Ok(Ok(())) = timeout(wait, socket.send(ZmqMessage::from(body.to_string()))).await {
            let _ = timeout(wait, socket.recv()).await;
        }
    }

    /// A failing mirror stops `all` and the relay still removes its sockets
    #[async_std::test]
    async fn test_all_cleans_up_after_mirror_failure() {
        let dir = TempDir::new().unwrap();
        let config = local_config(dir.path());
        // the store's temp file cannot be written over a directory
        std::fs::create_dir(dir.path().join("pixels.json.tmp")).unwrap();
        let (_shutdown_tx, shutdown_rx) = channel::bounded::<()>(1);

        let control = config.endpoints.control.clone();
        let producer = async move {
            loop {
                task::sleep(Duration::from_millis(200)).await;
                inject_once(&control).await;
            }
        };

        let result = timeout(Duration::from_secs(10), async {
            futures::select! {
                result = run_all(&config, shutdown_rx).fuse() => result,
                _ = producer.fuse() => Ok(()),
            }
        })
        .await
        .expect("all did not stop on a store failure");

        assert!(result.is_err());
        assert!(!dir.path().join("control.sock").exists());
        assert!(!dir.path().join("broadcast.sock").exists());
        assert!(!dir.path().join("query.sock").exists());
    }

    #[test]
    fn test_store_list_and_delete() {
        let dir = TempDir::new().unwrap();
        let config = local_config(dir.path());
        {
            let mut store = Store::open(&config.mirror.db_file).unwrap();
            store.set("item_2", Record::new(Rgb::new(4, 5, 6), 1488369600.0)).unwrap();
            store.set("item_1", Record::new(Rgb::new(1, 2, 3), 1488369600.0)).unwrap();
        }

        let mut out = Vec::new();
        run_store(&config, &StoreAction::List, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "item_1 [1, 2, 3] 2017-03-01T12:00:00+00:00\nitem_2 [4, 5, 6] 2017-03-01T12:00:00+00:00\n"
        );

        let mut out = Vec::new();
        let delete = StoreAction::Delete { key: "item_1".to_string() };
        run_store(&config, &delete, &mut out).unwrap();
        run_store(&config, &delete, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Deleted item_1\nNo record for item_1\n");

        let store = Store::open(&config.mirror.db_file).unwrap();
        assert!(store.get("item_1").is_none());
        assert_eq!(store.len(), 1);
    }
}
