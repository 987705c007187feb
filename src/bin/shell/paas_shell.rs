//! Paas Shell - Interactive command line interface for the paas fabric
//!
//! This binary provides an interactive shell that injects envelopes through
//! the relay control channel and reads records back from the mirror query
//! channel, printing replies in a user-friendly format.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use paas::client::{ControlClient, QueryClient};
use paas::config::{Config, DEFAULT_CONFIG_PATH, DEFAULT_TIMEOUT_MS};
use paas::protocol::{Envelope, Rgb, TopicSet};
use paas::{PaasError, Result};
use serde_json::Value;

/// Paas Shell - REPL for the paas relay and mirror
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file providing the endpoints and topic namespace
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the relay control endpoint
    #[arg(long)]
    control: Option<String>,

    /// Override the mirror query endpoint
    #[arg(long)]
    query: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout: i32,
}

/// A line of input the shell sends somewhere
#[derive(Debug, PartialEq)]
enum Request {
    /// Goes to the relay
    Inject(Envelope),
    /// Goes to the mirror
    Query(String),
}

/// Turns a line of input into a request
///
/// # Arguments
/// * `topics` - Namespace used for the display shortcuts
/// * `line` - Trimmed, non-empty input line
fn parse_line(topics: &TopicSet, line: &str) -> Result<Request> {
    let (cmd, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let args: Vec<&str> = rest.split_whitespace().collect();
    let usage = |text: &str| PaasError::InvalidArguments(format!("usage: {}", text));

    match cmd {
        "pixel" => match args.as_slice() {
            [key, rgb] => Ok(Request::Inject(topics.pixel(key, rgb.parse()?, true))),
            [key, rgb, "noshow"] => Ok(Request::Inject(topics.pixel(key, rgb.parse()?, false))),
            _ => Err(usage("pixel <key> <r,g,b> [noshow]")),
        },
        "all" => match args.as_slice() {
            [rgb] => Ok(Request::Inject(topics.all_pixels(rgb.parse()?, true))),
            [rgb, "noshow"] => Ok(Request::Inject(topics.all_pixels(rgb.parse()?, false))),
            _ => Err(usage("all <r,g,b> [noshow]")),
        },
        "multi" => {
            if args.is_empty() {
                return Err(usage("multi <key>=<r,g,b> ..."));
            }
            let mut pixels = Vec::with_capacity(args.len());
            for arg in &args {
                let (key, rgb) = arg.split_once('=').ok_or_else(|| usage("multi <key>=<r,g,b> ..."))?;
                pixels.push((key, rgb.parse::<Rgb>()?));
            }
            Ok(Request::Inject(topics.multi_pixel(pixels, true)))
        }
        "show" => Ok(Request::Inject(topics.show_pixels())),
        "query" => match args.as_slice() {
            [key] => Ok(Request::Query(key.to_string())),
            _ => Err(usage("query <key>")),
        },
        "send" => {
            let (topic, data) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if topic.is_empty() {
                return Err(usage("send <topic> [json]"));
            }
            let payload = match data.trim() {
                "" => Value::String(String::new()),
                data => serde_json::from_str(data)?,
            };
            Ok(Request::Inject(Envelope::new(topic, payload)?))
        }
        other => Err(PaasError::InvalidArguments(format!(
            "Unknown command '{}', type 'help'",
            other
        ))),
    }
}

struct PaasShell {
    topics: TopicSet,
    control: ControlClient,
    query: QueryClient,
}

impl PaasShell {
    /// Initialize the PaasShell with connection parameters
    fn new(args: &Args) -> Result<Self> {
        let config = Config::load(&args.config)?;
        let control_endpoint = args.control.as_deref().unwrap_or(&config.endpoints.control);
        let query_endpoint = args.query.as_deref().unwrap_or(&config.endpoints.query);

        Ok(PaasShell {
            topics: TopicSet::new(config.display.namespace.clone()),
            control: ControlClient::connect(control_endpoint, args.timeout)?,
            query: QueryClient::connect(query_endpoint, args.timeout)?,
        })
    }

    /// Format and display a reply
    fn format_response(&self, text: &str, start_time: Instant) {
        println!("⏱️  Response time: {:.3}s", start_time.elapsed().as_secs_f64());

        // Check if response indicates an error
        if text.starts_with("Error:") {
            eprintln!("{}", text);
        } else if let Ok(json_value) = serde_json::from_str::<Value>(text) {
            // Pretty-print records, print everything else as-is
            println!(
                "{}",
                serde_json::to_string_pretty(&json_value).unwrap_or_else(|_| text.to_string())
            );
        } else {
            println!("{}", text);
        }
    }

    /// Show help information
    fn show_help(&self) {
        let help_text = r#"
🎮 Paas Shell Help
==================
Shell Commands:
  help                         - Show this help message
  clear                        - Clear the screen
  exit/quit/q                  - Exit the shell

Relay Commands (colors as r,g,b or #rrggbb):
  pixel <key> <rgb> [noshow]   - Set the color of one key
  all <rgb> [noshow]           - Set every position
  multi <key>=<rgb> ...        - Set several keys at once
  show                         - Push the buffer to the display
  send <topic> [json]          - Send any topic with a JSON payload

Mirror Commands:
  query <key>                  - Last color stored for a key
"#;
        println!("{}", help_text);
    }

    /// Handle internal shell commands
    ///
    /// # Returns
    /// * `Some(exit)` when the command was handled by the shell itself
    fn handle_internal_command(&self, cmd: &str) -> Option<bool> {
        match cmd.trim().to_lowercase().as_str() {
            "exit" | "quit" | "q" => Some(true),
            "help" | "h" | "?" => {
                self.show_help();
                Some(false)
            }
            "clear" => {
                // Clear screen using ANSI escape codes
                print!("\x1B[2J\x1B[1;1H");
                Some(false)
            }
            _ => None,
        }
    }

    /// Send a request and return the reply text
    fn execute(&mut self, request: Request) -> Result<String> {
        match request {
            Request::Inject(envelope) => Ok(self.control.inject(&envelope)?.message),
            Request::Query(key) => self.query.query_raw(&key),
        }
    }

    /// Run the main interactive command loop
    fn run(&mut self) -> Result<()> {
        println!("Use 'help' for shell commands.");
        println!("Enter a command or 'exit' to quit.");
        println!("💡 Relay at {}, mirror at {}", self.control.endpoint(), self.query.endpoint());
        println!("{}", "─".repeat(80));

        // Show hostname in prompt
        let prompt = format!("[{}]> ", get_hostname());

        loop {
            print!("{}", prompt);
            io::stdout().flush()?;

            let mut input = String::new();
            match io::stdin().read_line(&mut input) {
                Ok(0) => break, // EOF
                Ok(_) => {}
                Err(e) => {
                    eprintln!("\n🔴 Error reading input: {}", e);
                    continue;
                }
            }

            let cmd = input.trim();
            if cmd.is_empty() {
                continue;
            }

            match self.handle_internal_command(cmd) {
                Some(true) => break,
                Some(false) => continue,
                None => {}
            }

            let request = match parse_line(&self.topics, cmd) {
                Ok(request) => request,
                Err(e) => {
                    eprintln!("🔴 {}", e);
                    continue;
                }
            };

            let start_time = Instant::now();
            match self.execute(request) {
                Ok(reply) => self.format_response(&reply, start_time),
                Err(e) => {
                    eprintln!("🔴 {}", e);
                    eprintln!("💡 The request may have timed out or the daemon may not be running");
                }
            }

            println!("{}", "-".repeat(80));
        }

        Ok(())
    }
}

/// Get the hostname of the current machine
fn get_hostname() -> String {
    match hostname::get() {
        Ok(name) => name.to_string_lossy().to_string(),
        Err(_) => "localhost".to_string(),
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut shell = PaasShell::new(&args)?;
    shell.run()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_shortcuts() {
        let topics = TopicSet::default();
        assert_eq!(
            parse_line(&topics, "pixel item_1 255,0,0").unwrap(),
            Request::Inject(topics.pixel("item_1", Rgb::RED, true))
        );
        assert_eq!(
            parse_line(&topics, "all #00ff00 noshow").unwrap(),
            Request::Inject(topics.all_pixels(Rgb::GREEN, false))
        );
        assert_eq!(
            parse_line(&topics, "show").unwrap(),
            Request::Inject(topics.show_pixels())
        );
    }

    #[test]
    fn test_multi_and_query() {
        let topics = TopicSet::new("hat/");
        let request = parse_line(&topics, "multi a=1,1,1 b=2,2,2").unwrap();
        match request {
            Request::Inject(envelope) => {
                assert_eq!(envelope.topic, "hat/multipixel");
                assert_eq!(envelope.payload["pixels"][1]["key"], "b");
            }
            other => panic!("unexpected request {:?}", other),
        }
        assert_eq!(
            parse_line(&topics, "query item_7").unwrap(),
            Request::Query("item_7".to_string())
        );
    }

    #[test]
    fn test_send_keeps_json_with_spaces() {
        let topics = TopicSet::default();
        let request = parse_line(&topics, r#"send alerts {"key": "build 42", "rgb": [1, 2, 3]}"#).unwrap();
        let Request::Inject(envelope) = request else {
            panic!("expected an injection");
        };
        assert_eq!(envelope.topic, "alerts");
        assert_eq!(envelope.payload, json!({"key": "build 42", "rgb": [1, 2, 3]}));
    }

    #[test]
    fn test_bad_input_is_rejected() {
        let topics = TopicSet::default();
        assert!(parse_line(&topics, "pixel item_1").is_err());
        assert!(parse_line(&topics, "pixel item_1 red").is_err());
        assert!(parse_line(&topics, "multi a").is_err());
        assert!(parse_line(&topics, "send alerts {broken").is_err());
        assert!(parse_line(&topics, "frobnicate").is_err());
    }
}
