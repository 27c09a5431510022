///! Heuristic parser turning one line of cluster feed text into a spot.
///!
///! Feeds disagree on announcement shape, so parsing is an ordered list of
///! independent pattern attempts with clear precedence: the canonical
///! `DX de` announcement, a couple of alternate textual forms, the
///! frequency-first rows produced by `sh/dx` history output, and finally a
///! last-resort probe for any frequency-like plus callsign-like token pair.

use chrono::Utc;
use regex::Regex;

use super::heuristics::{normalize_khz, SpotHeuristics};
use super::types::{RawSpot, SpotSource};

const UNKNOWN_SPOTTER: &str = "Unknown";

pub struct SpotLineParser {
    canonical: Regex,
    spots_verb: Regex,
    spot_prefix: Regex,
    freq_first: Regex,
    heuristics: SpotHeuristics,
}

impl SpotLineParser {
    pub fn new() -> Self {
        Self {
            // DX de ON4KST: 14205.0 JA1ABC CQ                1200Z
            canonical: Regex::new(
                r"DX\s+de\s+([\w/]+)[:,]?\s+(\d+\.?\d*)\s+([\w/]+)\s+(.*?)(?:\s+(\d{3,4}Z))?\s*$",
            )
            .expect("static pattern"),
            // W1AW spots JA1ABC on 14205.0 going strong
            spots_verb: Regex::new(
                r"([\w/]+)\s+spots\s+([\w/]+)\s+(?:on|at)\s+(\d+\.?\d*)\s*(?:MHz|kHz)?\s*(.*?)(?:\s+(\d{3,4}Z))?\s*$",
            )
            .expect("static pattern"),
            // Spot: W1AW 14205.0 JA1ABC strong into EU
            spot_prefix: Regex::new(r"Spot:\s+([\w/]+)\s+(\d+\.?\d*)\s+([\w/]+)\s*(.*)")
                .expect("static pattern"),
            // 14025.0 DL0WU        CQ at 1023Z   (sh/dx history rows)
            freq_first: Regex::new(r"^(\d+\.\d+)\s+([\w/]+)\s*(.*)$").expect("static pattern"),
            heuristics: SpotHeuristics::new(),
        }
    }

    /// Parse one feed line. Returns `None` when no rule yields both a
    /// frequency and a callsign; an unparsable line is not an error.
    pub fn parse(&self, line: &str) -> Option<RawSpot> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if line.starts_with("DX de ") {
            if let Some(spot) = self.parse_canonical(line) {
                return Some(spot);
            }
        }

        if let Some(spot) = self.parse_alternates(line) {
            return Some(spot);
        }

        if let Some(spot) = self.parse_freq_first(line) {
            return Some(spot);
        }

        self.parse_last_resort(line)
    }

    fn parse_canonical(&self, line: &str) -> Option<RawSpot> {
        let caps = self.canonical.captures(line)?;
        let freq = caps[2].parse::<f64>().ok()?;
        Some(self.build(
            caps[1].to_string(),
            caps[3].to_string(),
            freq,
            caps[4].trim().to_string(),
        ))
    }

    fn parse_alternates(&self, line: &str) -> Option<RawSpot> {
        if let Some(caps) = self.spots_verb.captures(line) {
            if let Ok(freq) = caps[3].parse::<f64>() {
                return Some(self.build(
                    caps[1].to_string(),
                    caps[2].to_string(),
                    normalize_khz(freq),
                    caps[4].trim().to_string(),
                ));
            }
        }
        if let Some(caps) = self.spot_prefix.captures(line) {
            if let Ok(freq) = caps[2].parse::<f64>() {
                return Some(self.build(
                    caps[1].to_string(),
                    caps[3].to_string(),
                    freq,
                    caps[4].trim().to_string(),
                ));
            }
        }
        None
    }

    fn parse_freq_first(&self, line: &str) -> Option<RawSpot> {
        let caps = self.freq_first.captures(line)?;
        let freq = caps[1].parse::<f64>().ok()?;
        // Spotter is not carried in sh/dx rows.
        Some(self.build(
            UNKNOWN_SPOTTER.to_string(),
            caps[2].to_string(),
            freq,
            caps[3].trim().to_string(),
        ))
    }

    /// Last resort: any frequency-like token plus any callsign-like token
    /// anywhere in the line, for feeds that omit the announcement marker.
    fn parse_last_resort(&self, line: &str) -> Option<RawSpot> {
        let freq = self.heuristics.find_frequency(line)?;
        let dx_call = self.heuristics.find_callsign(line)?;
        let freq = self.heuristics.refine_rounded(freq, line);
        Some(self.build(
            UNKNOWN_SPOTTER.to_string(),
            dx_call,
            freq,
            line.to_string(),
        ))
    }

    fn build(&self, spotter: String, dx_call: String, freq_khz: f64, comment: String) -> RawSpot {
        RawSpot {
            spotter,
            dx_call,
            freq_khz,
            comment,
            observed_at: Utc::now(),
            source: SpotSource::Cluster,
        }
    }
}

impl Default for SpotLineParser {
    fn default() -> Self {
        Self::new()
    }
}
