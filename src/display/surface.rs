//! Output Surface Abstraction
//!
//! A surface is whatever turns a finished frame into light. Hardware drivers
//! plug in here by implementing [`Surface`]; the crate ships a terminal
//! preview and a tracing-only sink.

use super::geometry::Geometry;
use crate::error::{PaasError, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::info;

/// Which built-in surface a renderer drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    /// Truecolor blocks on stdout
    #[default]
    Ansi,
    /// One log line per frame
    Log,
}

/// Central trait for output operations
pub trait Surface: Send {
    /// Pushes a complete frame, in position order, and commits it
    ///
    /// # Arguments
    /// * `geometry` - Shape the frame is laid out for
    /// * `frame` - One `[r, g, b]` triple per position, already clamped
    fn show(&mut self, geometry: &Geometry, frame: &[[u8; 3]]) -> Result<()>;

    /// Gets the surface name
    fn name(&self) -> &'static str;
}

impl<S: Surface + ?Sized> Surface for Box<S> {
    fn show(&mut self, geometry: &Geometry, frame: &[[u8; 3]]) -> Result<()> {
        (**self).show(geometry, frame)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Builds one of the built-in surfaces
pub fn build_surface(kind: SurfaceKind) -> Box<dyn Surface> {
    match kind {
        SurfaceKind::Ansi => Box::new(AnsiSurface::new(std::io::stdout())),
        SurfaceKind::Log => Box::new(LogSurface::default()),
    }
}

/// Renders frames as rows of colored blocks using 24-bit ANSI escapes
pub struct AnsiSurface<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> AnsiSurface<W> {
    pub fn new(out: W) -> Self {
        AnsiSurface { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(geometry: &Geometry, frame: &[[u8; 3]]) -> String {
        let (width, height) = geometry.extent();
        let mut text = String::new();
        for y in 0..height {
            for x in 0..width {
                let index = x as usize * height as usize + y as usize;
                let [r, g, b] = frame.get(index).copied().unwrap_or_default();
                text.push_str(&format!("\x1b[38;2;{};{};{}m\u{2588}\u{2588}", r, g, b));
            }
            text.push_str("\x1b[0m\n");
        }
        text
    }
}

impl<W: Write + Send> Surface for AnsiSurface<W> {
    fn show(&mut self, geometry: &Geometry, frame: &[[u8; 3]]) -> Result<()> {
        let text = AnsiSurface::<W>::render(geometry, frame);
        self.out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(|e| PaasError::Surface {
                surface: self.name().to_string(),
                message: e.to_string(),
            })
    }

    fn name(&self) -> &'static str {
        "ansi"
    }
}

/// Logs a hex dump of every frame
#[derive(Debug, Default)]
pub struct LogSurface {
    frames: u64,
}

impl Surface for LogSurface {
    fn show(&mut self, geometry: &Geometry, frame: &[[u8; 3]]) -> Result<()> {
        self.frames += 1;
        let hex = frame
            .iter()
            .map(|[r, g, b]| format!("{:02x}{:02x}{:02x}", r, g, b))
            .collect::<Vec<_>>()
            .join(" ");
        info!("frame {} ({}): {}", self.frames, geometry, hex);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
