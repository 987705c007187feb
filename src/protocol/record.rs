use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::color::Rgb;

/// Last known state of a logical key as persisted by the mirror
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(alias = "colour")]
    pub color: Rgb,
    /// Unix epoch seconds, fractional
    pub time: f64,
}

impl Record {
    pub fn new(color: Rgb, time: f64) -> Self {
        Record { color, time }
    }

    /// Stamps `color` with the current wall clock time
    pub fn now(color: Rgb) -> Self {
        Record::at(color, Utc::now())
    }

    pub fn at(color: Rgb, when: DateTime<Utc>) -> Self {
        Record {
            color,
            time: when.timestamp_micros() as f64 / 1_000_000.0,
        }
    }
}
