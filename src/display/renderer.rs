//! Renderer
//!
//! Applies display envelopes to an in-memory pixel buffer and pushes the
//! buffer to a [`Surface`] when a message asks for it. Single key updates go
//! through the [`Allocator`]; all-pixels updates bypass it.

use super::allocator::Allocator;
use super::geometry::{Geometry, Position};
use super::surface::Surface;
use crate::error::Result;
use crate::outcome::Outcome;
use crate::protocol::{
    AllPixelsUpdate, DisplayTopic, Envelope, MultiPixelUpdate, PixelUpdate, Rgb, TopicSet,
};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

/// Whether the buffer matches what is on the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// Buffer holds the last flushed values
    Idle,
    /// Buffer changed since the last flush
    Dirty,
}

/// Current color of every position, all black on creation
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    geometry: Geometry,
    pixels: Vec<Rgb>,
}

impl PixelBuffer {
    pub fn new(geometry: Geometry) -> Self {
        PixelBuffer {
            geometry,
            pixels: vec![Rgb::BLACK; geometry.len()],
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn get(&self, position: Position) -> Option<Rgb> {
        let index = self.geometry.index_of(position)?;
        self.pixels.get(index).copied()
    }

    /// Writes one position; returns false when it lies outside the geometry
    pub fn set(&mut self, position: Position, color: Rgb) -> bool {
        match self.geometry.index_of(position) {
            Some(index) => {
                self.pixels[index] = color;
                true
            }
            None => false,
        }
    }

    pub fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    pub fn as_slice(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Output frame in position order with brightness applied
    pub fn frame(&self, max_brightness: u8) -> Vec<[u8; 3]> {
        self.pixels
            .iter()
            .map(|color| color.to_output(max_brightness))
            .collect()
    }
}

pub struct Renderer<S: Surface> {
    topics: TopicSet,
    allocator: Allocator,
    buffer: PixelBuffer,
    surface: S,
    state: RenderState,
    max_brightness: u8,
    flushes: u64,
}

impl<S: Surface> Renderer<S> {
    /// Creates a renderer with an all-black buffer shaped like `geometry`
    ///
    /// # Arguments
    /// * `topics` - Namespace of the display topics to react to
    /// * `geometry` - Shape of the surface, shared by buffer and allocator
    /// * `allocator` - Owned allocation table, normally fresh
    /// * `surface` - Where flushed frames go
    pub fn new(topics: TopicSet, geometry: Geometry, allocator: Allocator, surface: S) -> Self {
        Renderer {
            topics,
            allocator,
            buffer: PixelBuffer::new(geometry),
            surface,
            state: RenderState::Idle,
            max_brightness: u8::MAX,
            flushes: 0,
        }
    }

    pub fn with_max_brightness(mut self, max_brightness: u8) -> Self {
        self.max_brightness = max_brightness;
        self
    }

    /// Applies one envelope
    ///
    /// Unknown topics and payloads of the wrong shape are ignored without
    /// touching the buffer. A message whose `show` flag is true (the
    /// default) or a show topic triggers a flush.
    ///
    /// # Returns
    /// * `Outcome` - `Fatal` only when the surface fails
    pub fn apply(&mut self, envelope: &Envelope) -> Outcome {
        let Some(topic) = self.topics.classify(&envelope.topic) else {
            return Outcome::ignored(format!("no display handling for topic '{}'", envelope.topic));
        };

        let show = match topic {
            DisplayTopic::Pixel => match parse::<PixelUpdate>(envelope) {
                Ok(update) => {
                    self.set_key(&update.key, update.rgb);
                    update.show
                }
                Err(reason) => return Outcome::Ignored(reason),
            },
            DisplayTopic::AllPixels => match parse::<AllPixelsUpdate>(envelope) {
                Ok(update) => {
                    self.buffer.fill(update.rgb);
                    self.state = RenderState::Dirty;
                    update.show
                }
                Err(reason) => return Outcome::Ignored(reason),
            },
            DisplayTopic::MultiPixel => match parse::<MultiPixelUpdate>(envelope) {
                Ok(update) => {
                    for entry in &update.pixels {
                        self.set_key(&entry.key, entry.rgb);
                    }
                    update.show
                }
                Err(reason) => return Outcome::Ignored(reason),
            },
            DisplayTopic::ShowPixels => true,
        };

        if show {
            if let Err(e) = self.flush() {
                return Outcome::Fatal(e);
            }
        }
        Outcome::Applied
    }

    /// Pushes the whole buffer to the surface and returns to `Idle`
    pub fn flush(&mut self) -> Result<()> {
        let frame = self.buffer.frame(self.max_brightness);
        self.surface.show(self.buffer.geometry(), &frame)?;
        self.flushes += 1;
        self.state = RenderState::Idle;
        trace!("Flushed frame {} to {}", self.flushes, self.surface.name());
        Ok(())
    }

    fn set_key(&mut self, key: &str, color: Rgb) {
        let position = self.allocator.resolve(key);
        if self.buffer.set(position, color) {
            self.state = RenderState::Dirty;
        }
        debug!("Key '{}' at {} set to {}", key, position, color);
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Number of frames pushed since creation
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }
}

fn parse<T: DeserializeOwned>(envelope: &Envelope) -> std::result::Result<T, String> {
    T::deserialize(&envelope.payload)
        .map_err(|e| format!("malformed '{}' payload: {}", envelope.topic, e))
}
