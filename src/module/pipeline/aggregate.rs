///! Aggregate per-frequency spot counters.

use std::collections::HashMap;

use crate::module::spot::types::Mode;

/// Counter key: frequency in tenths of a kHz, matching the dedup rounding.
pub fn freq_key(freq_khz: f64) -> i64 {
    (freq_khz * 10.0).round() as i64
}

pub fn key_to_khz(key: i64) -> f64 {
    key as f64 / 10.0
}

/// Frequency → mode → count, plus the running total. Mutated only by the
/// pipeline; monotonically non-decreasing within a run.
#[derive(Debug, Default)]
pub struct FrequencyCounters {
    counts: HashMap<i64, HashMap<Mode, u64>>,
    total: u64,
}

impl FrequencyCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, freq_khz: f64, mode: Mode) {
        *self
            .counts
            .entry(freq_key(freq_khz))
            .or_default()
            .entry(mode)
            .or_insert(0) += 1;
        self.total += 1;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count(&self, freq_khz: f64, mode: Mode) -> u64 {
        self.counts
            .get(&freq_key(freq_khz))
            .and_then(|modes| modes.get(&mode))
            .copied()
            .unwrap_or(0)
    }

    /// All entries as (freq kHz, mode, count), sorted by frequency then
    /// mode for deterministic output.
    pub fn entries(&self) -> Vec<(f64, Mode, u64)> {
        let mut entries: Vec<(f64, Mode, u64)> = self
            .counts
            .iter()
            .flat_map(|(key, modes)| {
                let freq = key_to_khz(*key);
                modes.iter().map(move |(mode, count)| (freq, *mode, *count))
            })
            .collect();
        entries.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.as_str().cmp(b.1.as_str()))
        });
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_total() {
        let mut counters = FrequencyCounters::new();
        counters.record(14195.0, Mode::Ssb);
        counters.record(14195.0, Mode::Ssb);
        counters.record(14195.0, Mode::Cw);
        counters.record(7030.0, Mode::Cw);

        assert_eq!(counters.total(), 4);
        assert_eq!(counters.count(14195.0, Mode::Ssb), 2);
        assert_eq!(counters.count(14195.0, Mode::Cw), 1);
        assert_eq!(counters.count(7030.0, Mode::Cw), 1);
        assert_eq!(counters.count(7030.0, Mode::Ssb), 0);
    }

    #[test]
    fn test_textual_variants_of_same_frequency_collide() {
        let mut counters = FrequencyCounters::new();
        counters.record(14195.0, Mode::Ssb);
        counters.record(14195.001, Mode::Ssb);
        assert_eq!(counters.count(14195.0, Mode::Ssb), 2);
    }

    #[test]
    fn test_entries_sorted() {
        let mut counters = FrequencyCounters::new();
        counters.record(21020.0, Mode::Cw);
        counters.record(7030.0, Mode::Cw);
        counters.record(14195.0, Mode::Ssb);

        let freqs: Vec<f64> = counters.entries().iter().map(|e| e.0).collect();
        assert_eq!(freqs, vec![7030.0, 14195.0, 21020.0]);
    }
}
