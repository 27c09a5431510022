///! Frequency and callsign heuristics shared by the line parser and the
///! generic HTML table extractor.
///!
///! These are deliberately best-effort: cluster feeds and scraped pages use
///! heterogeneous formats, so each helper probes for the most common shapes
///! and gives up quietly rather than guessing.

use regex::Regex;

/// Decimal values below this are treated as MHz and converted to kHz.
const MHZ_CUTOFF: f64 = 30.0;

/// Plausible range for a bare integer kHz token (common HF allocations).
const BARE_KHZ_MIN: f64 = 1800.0;
const BARE_KHZ_MAX: f64 = 29_700.0;

/// Convert small decimal values (MHz notation like `14.195`) to kHz.
pub fn normalize_khz(value: f64) -> f64 {
    if value > 0.0 && value < MHZ_CUTOFF {
        value * 1000.0
    } else {
        value
    }
}

/// Compiled probe patterns. Build once and reuse; compilation is not free.
pub struct SpotHeuristics {
    decimal_freq: Regex,
    bare_khz: Regex,
    callsign: Regex,
}

impl SpotHeuristics {
    pub fn new() -> Self {
        Self {
            decimal_freq: Regex::new(r"(\d+\.\d+)").expect("static pattern"),
            bare_khz: Regex::new(r"\b(\d{4,5})\b").expect("static pattern"),
            callsign: Regex::new(
                r"\b([A-Z0-9]{1,3}/)?[A-Z0-9]{1,2}[0-9][A-Z0-9]{1,3}(/[A-Z0-9]+)?\b",
            )
            .expect("static pattern"),
        }
    }

    /// Search arbitrary text for a frequency. Decimal tokens win over bare
    /// integer kHz tokens; bare tokens are only accepted inside the common
    /// HF range so that years, times and zip-code-like numbers don't match.
    pub fn find_frequency(&self, text: &str) -> Option<f64> {
        if let Some(caps) = self.decimal_freq.captures(text) {
            if let Ok(value) = caps[1].parse::<f64>() {
                return Some(normalize_khz(value));
            }
        }

        for caps in self.bare_khz.captures_iter(text) {
            if let Ok(value) = caps[1].parse::<f64>() {
                if (BARE_KHZ_MIN..=BARE_KHZ_MAX).contains(&value) {
                    return Some(value);
                }
            }
        }

        None
    }

    /// Search arbitrary text for a callsign-shaped token: 3-7 alphanumeric
    /// characters containing a digit, with an optional `/` prefix or suffix.
    /// Purely numeric tokens are skipped so bare frequencies never
    /// self-match as callsigns.
    pub fn find_callsign(&self, text: &str) -> Option<String> {
        let upper = text.to_ascii_uppercase();
        for m in self.callsign.find_iter(&upper) {
            let candidate = m.as_str();
            let core = candidate.split('/').max_by_key(|part| part.len())?;
            if core.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            if !(3..=7).contains(&core.len()) {
                continue;
            }
            return Some(candidate.to_string());
        }
        None
    }

    /// Refine a suspiciously round frequency (exact multiple of 1000 kHz, a
    /// common artifact of sites that round to the band label) by searching
    /// the surrounding text for a more precise decimal value in the same
    /// band. Never fabricates: without a better candidate the input is
    /// returned unchanged.
    pub fn refine_rounded(&self, freq_khz: f64, context: &str) -> f64 {
        if freq_khz < 1000.0 || freq_khz % 1000.0 != 0.0 {
            return freq_khz;
        }

        for caps in self.decimal_freq.captures_iter(context) {
            let Ok(value) = caps[1].parse::<f64>() else {
                continue;
            };
            if (1.0..=MHZ_CUTOFF).contains(&value) {
                // MHz notation: accept when it lands in the same band.
                let khz = value * 1000.0;
                if (khz / 1000.0) as i64 == (freq_khz / 1000.0) as i64 {
                    return khz;
                }
            } else if (value - freq_khz).abs() < 1000.0 && value % 1000.0 != 0.0 {
                // Already kHz, close to the rounded value and not itself round.
                return value;
            }
        }

        freq_khz
    }
}

impl Default for SpotHeuristics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_khz() {
        assert_eq!(normalize_khz(14.195), 14.195 * 1000.0);
        assert_eq!(normalize_khz(14195.0), 14195.0);
        assert_eq!(normalize_khz(7.074), 7.074 * 1000.0);
    }

    #[test]
    fn test_find_frequency_decimal_wins() {
        let h = SpotHeuristics::new();
        let freq = h.find_frequency("QRV 14.195 on 20m").unwrap();
        assert!((freq - 14195.0).abs() < 1e-6);
    }

    #[test]
    fn test_find_frequency_bare_khz() {
        let h = SpotHeuristics::new();
        assert_eq!(h.find_frequency("JA1ABC 14195 loud"), Some(14195.0));
        // Outside the HF range: not a frequency.
        assert_eq!(h.find_frequency("since 1995 active"), None);
    }

    #[test]
    fn test_find_callsign() {
        let h = SpotHeuristics::new();
        assert_eq!(h.find_callsign("heard ja1abc calling"), Some("JA1ABC".to_string()));
        assert_eq!(h.find_callsign("KP5/NP3VI on the air"), Some("KP5/NP3VI".to_string()));
        // A bare frequency must not self-match as a callsign.
        assert_eq!(h.find_callsign("14195"), None);
        assert_eq!(h.find_callsign("nothing here"), None);
    }

    #[test]
    fn test_refine_rounded_mhz_same_band() {
        let h = SpotHeuristics::new();
        let refined = h.refine_rounded(14000.0, "listen for 14.195 around noon");
        assert!((refined - 14195.0).abs() < 1e-6);
    }

    #[test]
    fn test_refine_rounded_khz_candidate() {
        let h = SpotHeuristics::new();
        let refined = h.refine_rounded(7000.0, "really on 7030.5");
        assert!((refined - 7030.5).abs() < 1e-6);
    }

    #[test]
    fn test_refine_rounded_leaves_precise_input_alone() {
        let h = SpotHeuristics::new();
        assert_eq!(h.refine_rounded(14205.0, "14.195 elsewhere"), 14205.0);
    }

    #[test]
    fn test_refine_rounded_never_fabricates() {
        let h = SpotHeuristics::new();
        // Candidate is in a different band: keep the rounded value.
        assert_eq!(h.refine_rounded(14000.0, "also QRV 7.030"), 14000.0);
        assert_eq!(h.refine_rounded(14000.0, "no numbers at all"), 14000.0);
    }
}
