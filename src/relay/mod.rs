//! Relay Module
//!
//! Central injection point of the fabric: producers hand envelopes to the
//! relay over the control channel and the relay republishes them, in
//! receipt order, to every subscriber of the broadcast channel.

pub mod handler;

pub use handler::{Relay, RelayDecision};
