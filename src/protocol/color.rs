use crate::error::PaasError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A three channel color as it travels on the wire: `[r, g, b]`.
///
/// Channels are conceptually `0..=255` but nothing on the message path
/// validates that; out-of-range values are carried through unchanged and
/// only clamped when a frame is handed to an output surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgb(pub [i64; 3]);

impl Rgb {
    pub const BLACK: Rgb = Rgb([0, 0, 0]);
    pub const WHITE: Rgb = Rgb([255, 255, 255]);
    pub const RED: Rgb = Rgb([255, 0, 0]);
    pub const GREEN: Rgb = Rgb([0, 255, 0]);
    pub const BLUE: Rgb = Rgb([0, 0, 255]);
    /// Status colors used by monitoring producers
    pub const WARNING: Rgb = Rgb([255, 106, 0]);

    pub fn new(r: i64, g: i64, b: i64) -> Self {
        Rgb([r, g, b])
    }

    pub fn r(&self) -> i64 {
        self.0[0]
    }

    pub fn g(&self) -> i64 {
        self.0[1]
    }

    pub fn b(&self) -> i64 {
        self.0[2]
    }

    /// Converts to output bytes, clamping each channel into `0..=255` and
    /// scaling it so that 255 maps onto `max_brightness`.
    pub fn to_output(self, max_brightness: u8) -> [u8; 3] {
        let max = i64::from(max_brightness);
        self.0.map(|channel| (channel.clamp(0, 255) * max / 255) as u8)
    }
}

impl From<[i64; 3]> for Rgb {
    fn from(channels: [i64; 3]) -> Self {
        Rgb(channels)
    }
}

/// Parses `r,g,b` (decimal channels) or `#rrggbb`
impl FromStr for Rgb {
    type Err = PaasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || PaasError::InvalidArguments(format!("Invalid color '{}': expected r,g,b or #rrggbb", s));

        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(invalid());
            }
            let channel = |i: usize| i64::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
            return Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]));
        }

        let channels: Vec<i64> = s
            .split(',')
            .map(|part| part.trim().parse::<i64>().map_err(|_| invalid()))
            .collect::<Result<_, _>>()?;
        match channels.as_slice() {
            [r, g, b] => Ok(Rgb([*r, *g, *b])),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.r(), self.g(), self.b())
    }
}
