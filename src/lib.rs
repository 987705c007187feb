//! Pixels as a Service
//!
//! A small message fabric for addressable pixel displays. Producers inject
//! `(topic, payload)` envelopes into a central relay, which republishes them
//! to every subscriber. Two consumers ship with the crate: a state mirror
//! that remembers the last color of every key and answers point queries, and
//! a renderer that maps keys onto display positions and drives an output
//! surface.
//!
//! The library holds everything that does not touch a socket; the `paasd`
//! daemon, the `paas` command line tool and the `paas_shell` REPL are thin
//! transport layers around it.

pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod mirror;
pub mod outcome;
pub mod protocol;
pub mod relay;

pub use error::{PaasError, Result};
