///! Time-windowed spot cache preventing repeated reports from being
///! counted twice, mainly across overlapping web polls.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Resightings inside this window are duplicates.
pub const DEDUP_WINDOW: Duration = Duration::from_secs(600);

/// Entries older than this are swept to bound memory. Deliberately wider
/// than the admission window; the two are independent knobs.
const ENTRY_EXPIRY: Duration = Duration::from_secs(3600);

/// Sweeps run at most this often.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Cache key: DX callsign plus frequency rounded to 0.1 kHz, so textual
/// variants of the same frequency collide.
pub type SpotKey = (String, i64);

pub fn spot_key(dx_call: &str, freq_khz: f64) -> SpotKey {
    (dx_call.to_ascii_uppercase(), (freq_khz * 10.0).round() as i64)
}

pub struct SpotCache {
    entries: HashMap<SpotKey, Instant>,
    last_cleanup: Instant,
}

impl SpotCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            last_cleanup: Instant::now(),
        }
    }

    /// Returns true when the spot is new (or stale enough) and records the
    /// sighting; false means duplicate inside the window. The timestamp is
    /// injected so the window is testable without waiting.
    pub fn admit(&mut self, key: SpotKey, now: Instant) -> bool {
        self.sweep(now);
        match self.entries.get(&key) {
            Some(&seen) if now.duration_since(seen) < DEDUP_WINDOW => false,
            _ => {
                self.entries.insert(key, now);
                true
            }
        }
    }

    fn sweep(&mut self, now: Instant) {
        if now.duration_since(self.last_cleanup) < CLEANUP_INTERVAL {
            return;
        }
        let before = self.entries.len();
        self.entries
            .retain(|_, seen| now.duration_since(*seen) <= ENTRY_EXPIRY);
        tracing::debug!(
            "Swept {} expired spot cache entries, {} remain",
            before - self.entries.len(),
            self.entries.len()
        );
        self.last_cleanup = now;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SpotCache {
    fn default() -> Self {
        Self::new()
    }
}
