//! Envelope codec for the broadcast and control channels.
//!
//! Broadcast frames are a single ZeroMQ frame of the form
//! `"<topic> <payload-json>"`, so subscribers can filter on the topic by
//! byte prefix. Control requests are JSON objects `{"topic", "data"}` and are
//! answered with `{"message"}`.

use crate::error::{PaasError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum accepted frame size (1MB)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// The (topic, payload) unit exchanged on every channel
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub topic: String,
    pub payload: Value,
}

impl Envelope {
    /// Creates an envelope, refusing empty or whitespace-carrying topics
    /// since either would break the broadcast frame layout.
    pub fn new(topic: impl Into<String>, payload: Value) -> Result<Self> {
        let topic = topic.into();
        validate_topic(&topic)?;
        Ok(Envelope { topic, payload })
    }

    /// Encodes the envelope as a broadcast frame
    pub fn encode(&self) -> String {
        format!("{} {}", self.topic, self.payload)
    }

    /// Decodes a broadcast frame.
    ///
    /// A frame carrying only a topic decodes with a `Null` payload.
    ///
    /// # Arguments
    /// * `frame` - Raw bytes of the first ZeroMQ frame
    ///
    /// # Returns
    /// * `Result<Envelope>` - The envelope or a protocol error
    pub fn decode(frame: &[u8]) -> Result<Self> {
        if frame.len() > MAX_FRAME_SIZE {
            return Err(PaasError::Protocol(format!(
                "Frame too large: {} bytes (max: {})",
                frame.len(),
                MAX_FRAME_SIZE
            )));
        }

        let text = std::str::from_utf8(frame)?;
        let text = text.trim();
        let (topic, rest) = match text.split_once(char::is_whitespace) {
            Some((topic, rest)) => (topic, rest.trim()),
            None => (text, ""),
        };
        validate_topic(topic)?;

        let payload = if rest.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(rest)?
        };

        Ok(Envelope {
            topic: topic.to_string(),
            payload,
        })
    }
}

fn validate_topic(topic: &str) -> Result<()> {
    if topic.is_empty() {
        return Err(PaasError::Protocol("Topic must not be empty".to_string()));
    }
    if topic.chars().any(char::is_whitespace) {
        return Err(PaasError::Protocol(format!(
            "Topic must not contain whitespace: '{}'",
            topic
        )));
    }
    Ok(())
}

fn empty_payload() -> Value {
    Value::String(String::new())
}

/// Request accepted by the relay on the control channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlRequest {
    pub topic: String,
    #[serde(default = "empty_payload")]
    pub data: Value,
}

impl ControlRequest {
    pub fn new(topic: impl Into<String>, data: Value) -> Self {
        ControlRequest {
            topic: topic.into(),
            data,
        }
    }

    /// Parses a control request.
    ///
    /// Older producers send the request object JSON-encoded a second time
    /// (a JSON string whose content is the object); both forms are accepted.
    pub fn parse(frame: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(frame)?;
        let value = match value {
            Value::String(inner) => serde_json::from_str(&inner)?,
            other => other,
        };
        let request: ControlRequest = serde_json::from_value(value)?;
        validate_topic(&request.topic)?;
        Ok(request)
    }

    pub fn into_envelope(self) -> Envelope {
        Envelope {
            topic: self.topic,
            payload: self.data,
        }
    }
}

impl From<&Envelope> for ControlRequest {
    fn from(envelope: &Envelope) -> Self {
        ControlRequest::new(envelope.topic.clone(), envelope.payload.clone())
    }
}

/// Acknowledgement sent back on the control channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlReply {
    pub message: String,
}

impl ControlReply {
    pub fn received(topic: &str) -> Self {
        ControlReply {
            message: format!("Received message on topic '{}'", topic),
        }
    }

    pub fn error(reason: impl std::fmt::Display) -> Self {
        ControlReply {
            message: format!("Error: {}", reason),
        }
    }

    pub fn is_error(&self) -> bool {
        self.message.starts_with("Error:")
    }

    /// Parses a reply, accepting the double-encoded form as well
    pub fn parse(frame: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(frame)?;
        let value = match value {
            Value::String(inner) => serde_json::from_str(&inner)?,
            other => other,
        };
        Ok(serde_json::from_value(value)?)
    }
}
