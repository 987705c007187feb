#![cfg(feature = "cli")]

use clap::{Parser, Subcommand};
use paas::client::{ControlClient, QueryClient};
use paas::config::{Config, DEFAULT_CONFIG_PATH, DEFAULT_TIMEOUT_MS};
use paas::protocol::{ControlReply, Envelope, Rgb, TopicSet};
use paas::{PaasError, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use zeromq::SubSocket;
use zeromq::prelude::*; // traits

/// Global CLI arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Pixels as a Service command line client")]
struct Cli {
    /// Configuration file providing the endpoints and topic namespace
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the relay control endpoint
    #[arg(long)]
    control: Option<String>,

    /// Override the mirror query endpoint
    #[arg(long)]
    query: Option<String>,

    /// Override the relay broadcast endpoint
    #[arg(long)]
    broadcast: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout: i32,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// List of available subcommands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Set the color of one key
    Pixel {
        key: String,
        /// Color as r,g,b or #rrggbb
        rgb: Rgb,
        /// Update the buffer without showing it
        #[arg(long)]
        no_show: bool,
    },
    /// Set every position to one color
    All {
        rgb: Rgb,
        #[arg(long)]
        no_show: bool,
    },
    /// Set several keys at once, each given as key=r,g,b
    Multi {
        #[arg(required = true, value_parser = parse_keyed)]
        pixels: Vec<(String, Rgb)>,
        #[arg(long)]
        no_show: bool,
    },
    /// Push the current buffer to the display
    Show,
    /// Send an arbitrary topic with a JSON payload
    Send {
        topic: String,
        /// JSON payload, an empty string when omitted
        data: Option<String>,
    },
    /// Ask the mirror for the last color of a key
    Query {
        key: String,
    },
    /// Print every broadcast frame matching a topic prefix
    Listen {
        /// Topic prefix, everything when omitted
        #[arg(default_value = "")]
        filter: String,
        /// Stop after this many frames
        #[arg(long)]
        count: Option<usize>,
    },
    /// Feed random status colors to item_0..item_N
    Demo {
        /// Number of keys to cycle through
        #[arg(long, default_value_t = 64)]
        keys: usize,
        /// Number of passes over all keys
        #[arg(long, default_value_t = 10)]
        rounds: usize,
        /// Pause between passes in milliseconds
        #[arg(long, default_value_t = 200)]
        interval: u64,
        /// Seed for a reproducible sequence
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Parses `key=r,g,b`
fn parse_keyed(s: &str) -> Result<(String, Rgb)> {
    let (key, rgb) = s
        .split_once('=')
        .ok_or_else(|| PaasError::InvalidArguments(format!("Expected key=r,g,b, got '{}'", s)))?;
    if key.is_empty() {
        return Err(PaasError::InvalidArguments(format!("Missing key in '{}'", s)));
    }
    Ok((key.to_string(), rgb.parse()?))
}

/// Status colors of the demo generator
const DEMO_COLORS: [Rgb; 3] = [Rgb::BLUE, Rgb::WARNING, Rgb::RED];

/// Entry point
#[async_std::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Execute the command
    if let Err(e) = handle_command(&cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}

/// Execute the selected subcommand
async fn handle_command(cli: &Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;
    let topics = TopicSet::new(config.display.namespace.clone());
    let control = cli.control.as_deref().unwrap_or(&config.endpoints.control);

    let envelope = match &cli.command {
        Commands::Pixel { key, rgb, no_show } => topics.pixel(key, *rgb, !no_show),
        Commands::All { rgb, no_show } => topics.all_pixels(*rgb, !no_show),
        Commands::Multi { pixels, no_show } => {
            topics.multi_pixel(pixels.iter().map(|(key, rgb)| (key.as_str(), *rgb)), !no_show)
        }
        Commands::Show => topics.show_pixels(),
        Commands::Send { topic, data } => {
            let payload = match data {
                Some(data) => serde_json::from_str(data)?,
                None => Value::String(String::new()),
            };
            Envelope::new(topic.as_str(), payload)?
        }
        Commands::Query { key } => {
            let endpoint = cli.query.as_deref().unwrap_or(&config.endpoints.query);
            let mut client = QueryClient::connect(endpoint, cli.timeout)?;
            match client.query(key)? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("null"),
            }
            return Ok(());
        }
        Commands::Listen { filter, count } => {
            let endpoint = cli.broadcast.as_deref().unwrap_or(&config.endpoints.broadcast);
            return listen(endpoint, filter, *count).await;
        }
        Commands::Demo {
            keys,
            rounds,
            interval,
            seed,
        } => {
            let mut client = ControlClient::connect(control, cli.timeout)?;
            return demo(&mut client, &topics, *keys, *rounds, *interval, *seed).await;
        }
    };

    let mut client = ControlClient::connect(control, cli.timeout)?;
    print_reply(&client.inject(&envelope)?)
}

fn print_reply(reply: &ControlReply) -> Result<()> {
    if reply.is_error() {
        return Err(PaasError::Protocol(reply.message.clone()));
    }
    println!("{}", reply.message);
    Ok(())
}

/// Subscribe to the broadcast channel and print frames as they arrive
async fn listen(endpoint: &str, filter: &str, count: Option<usize>) -> Result<()> {
    let mut socket = SubSocket::new();
    socket
        .connect(endpoint)
        .await
        .map_err(|e| PaasError::transport(endpoint, e))?;
    socket.subscribe(filter).await?;

    let mut seen = 0;
    while count.is_none_or(|count| seen < count) {
        let message = socket.recv().await?;
        // Get the first frame as a UTF-8 string
        let frame = match message.get(0) {
            Some(frame) => String::from_utf8_lossy(frame).to_string(),
            None => continue,
        };
        println!("{}", frame);
        seen += 1;
    }
    Ok(())
}

/// Random status generator: every pass gives each key one of the demo colors
async fn demo(
    client: &mut ControlClient,
    topics: &TopicSet,
    keys: usize,
    rounds: usize,
    interval: u64,
    seed: Option<u64>,
) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };

    for round in 0..rounds {
        for (key, rgb) in demo_round(&mut rng, keys) {
            let reply = client.inject(&topics.pixel(&key, rgb, true))?;
            if reply.is_error() {
                return Err(PaasError::Protocol(reply.message));
            }
        }
        println!("Round {} of {} sent", round + 1, rounds);
        async_std::task::sleep(Duration::from_millis(interval)).await;
    }
    Ok(())
}

fn demo_round(rng: &mut fastrand::Rng, keys: usize) -> Vec<(String, Rgb)> {
    (0..keys)
        .map(|i| (format!("item_{}", i), DEMO_COLORS[rng.usize(..DEMO_COLORS.len())]))
        .collect()
}
