//! Display Module
//!
//! Consumer side of the fabric: the allocator that pins logical keys to
//! physical positions, the renderer that keeps the pixel buffer, and the
//! output surfaces frames are pushed to.

pub mod allocator;
pub mod geometry;
pub mod renderer;
pub mod surface;

pub use allocator::{AllocationPolicy, Allocator};
pub use geometry::{Geometry, Position};
pub use renderer::{PixelBuffer, RenderState, Renderer};
pub use surface::{AnsiSurface, LogSurface, Surface, SurfaceKind, build_surface};
