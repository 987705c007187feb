use serde::{Deserialize, Serialize};
use std::fmt;

/// A physical output position.
///
/// Strips only use `x`. Ordering is `x` first then `y`, which is the order
/// positions are allocated in and the order a frame is pushed out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    pub fn new(x: u32, y: u32) -> Self {
        Position { x, y }
    }

    pub fn strip(index: u32) -> Self {
        Position { x: index, y: 0 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Shape of the physical output surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Geometry {
    /// A 1-D LED strip
    Strip { length: u32 },
    /// A 2-D LED matrix
    Grid { width: u32, height: u32 },
}

impl Geometry {
    pub fn len(&self) -> usize {
        match *self {
            Geometry::Strip { length } => length as usize,
            Geometry::Grid { width, height } => width as usize * height as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every position of the surface in ascending order
    pub fn positions(&self) -> impl Iterator<Item = Position> + use<> {
        let (width, height) = self.extent();
        (0..width).flat_map(move |x| (0..height).map(move |y| Position { x, y }))
    }

    /// Buffer index of a position, consistent with the ordering of [`Position`]
    pub fn index_of(&self, position: Position) -> Option<usize> {
        let (width, height) = self.extent();
        if position.x >= width || position.y >= height {
            return None;
        }
        Some(position.x as usize * height as usize + position.y as usize)
    }

    /// Position shared by every key that arrives once the pool is exhausted
    pub fn fallback(&self) -> Position {
        Position::ORIGIN
    }

    /// (columns, rows)
    pub fn extent(&self) -> (u32, u32) {
        match *self {
            Geometry::Strip { length } => (length, 1),
            Geometry::Grid { width, height } => (width, height),
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Geometry::Strip { length } => write!(f, "strip of {}", length),
            Geometry::Grid { width, height } => write!(f, "{}x{} grid", width, height),
        }
    }
}
