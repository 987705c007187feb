//! Mirror Module
//!
//! The state mirror keeps the last color written for every logical key seen
//! on its slice of the broadcast stream and answers point queries about it.

pub mod service;
pub mod store;

pub use service::Mirror;
pub use store::Store;
