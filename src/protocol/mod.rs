//! Wire Protocol Module
//!
//! Types shared by every process on the fabric: envelopes and their frame
//! codec, control channel requests and replies, display topics and their
//! payloads, colors and stored records.

pub mod color;
pub mod envelope;
pub mod record;
pub mod topic;

pub use color::Rgb;
pub use envelope::{ControlReply, ControlRequest, Envelope, MAX_FRAME_SIZE};
pub use record::Record;
pub use topic::{
    AllPixelsUpdate, DEFAULT_NAMESPACE, DisplayTopic, KeyedColor, MultiPixelUpdate, PixelEntry,
    PixelUpdate, TopicSet,
};
