//! Utilities Module
//!
//! Process plumbing shared by every paasd service.

pub mod endpoint;
pub mod signals;
pub mod tracing;
