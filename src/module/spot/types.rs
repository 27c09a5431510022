///! Core spot record types shared by every acquisition source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder for band/region fields that could not be resolved.
pub const UNKNOWN: &str = "UNKNOWN";

/// Which acquisition path produced a spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpotSource {
    /// Line-oriented DX cluster feed (telnet-style TCP).
    Cluster,
    /// Scraped cluster web page.
    Web,
}

impl fmt::Display for SpotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpotSource::Cluster => write!(f, "cluster"),
            SpotSource::Web => write!(f, "web"),
        }
    }
}

/// Transmission mode of a spotted station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Cw,
    Ssb,
    Digital,
    Unknown,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Cw => "CW",
            Mode::Ssb => "SSB",
            Mode::Digital => "DIGITAL",
            Mode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Mode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CW" => Ok(Mode::Cw),
            "SSB" => Ok(Mode::Ssb),
            "DIGITAL" => Ok(Mode::Digital),
            other => Err(UnknownModeError(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown mode: {0}")]
pub struct UnknownModeError(String);

/// A spot as extracted from a feed line or web page, before classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSpot {
    /// Reporting station, "Unknown" when the source does not carry it.
    pub spotter: String,
    /// Station being reported as heard.
    pub dx_call: String,
    /// Always kHz. Sources reporting MHz convert at extraction time.
    pub freq_khz: f64,
    pub comment: String,
    pub observed_at: DateTime<Utc>,
    pub source: SpotSource,
}

/// A spot after mode/band/region classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedSpot {
    pub raw: RawSpot,
    pub mode: Mode,
    pub band: String,
    pub region: String,
}
