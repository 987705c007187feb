//! Mirror message handling.
//!
//! Transport free: the daemon feeds subscription frames into
//! [`Mirror::handle_broadcast`] and query frames into
//! [`Mirror::handle_query`] in whatever order its poll loop sees them.

use super::store::Store;
use crate::outcome::Outcome;
use crate::protocol::{Envelope, KeyedColor, Record};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

pub struct Mirror {
    store: Store,
}

impl Mirror {
    pub fn new(store: Store) -> Self {
        Mirror { store }
    }

    /// Upserts the keyed color carried by a broadcast frame
    ///
    /// Frames without a `key` are discarded silently; frames with a key
    /// but no usable color are dropped as malformed.
    ///
    /// # Arguments
    /// * `frame` - Raw broadcast frame (`"<topic> <payload-json>"`)
    ///
    /// # Returns
    /// * `Outcome` - `Fatal` only when the store cannot be written
    pub fn handle_broadcast(&mut self, frame: &[u8]) -> Outcome {
        let envelope = match Envelope::decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => return Outcome::ignored(e.to_string()),
        };

        if envelope.payload.get("key").and_then(Value::as_str).is_none() {
            debug!("No key in '{}' message, not stored", envelope.topic);
            return Outcome::ignored("no key");
        }

        let keyed = match KeyedColor::deserialize(&envelope.payload) {
            Ok(keyed) => keyed,
            Err(e) => {
                return Outcome::ignored(format!("malformed '{}' payload: {}", envelope.topic, e));
            }
        };

        match self.store.set(keyed.key, Record::now(keyed.rgb)) {
            Ok(()) => Outcome::Applied,
            Err(e) => Outcome::Fatal(e),
        }
    }

    /// Answers a point query
    ///
    /// # Arguments
    /// * `request` - The bare key, surrounding whitespace ignored
    ///
    /// # Returns
    /// * `String` - The serialized record, or `null` when the key is unknown
    pub fn handle_query(&self, request: &[u8]) -> String {
        let key = String::from_utf8_lossy(request);
        let key = key.trim();
        let reply = match self.store.get(key) {
            Some(record) => serde_json::to_string(record),
            None => Ok("null".to_string()),
        };
        reply.unwrap_or_else(|_| "null".to_string())
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn into_store(self) -> Store {
        self.store
    }
}
