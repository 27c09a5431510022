///! Band plan - CSV-loaded classification rules, the mode/band/region
///! classifier, and the inclusion filter that keeps the statistics to
///! CW/SSB spots inside configured segments.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

use super::types::{Mode, UNKNOWN};

/// One row of the band configuration CSV, as written by the operator.
#[derive(Debug, Deserialize)]
struct BandRuleRow {
    #[serde(rename = "Band")]
    band: String,
    #[serde(rename = "Mode")]
    mode: String,
    #[serde(rename = "StartFreq")]
    start_freq: f64,
    #[serde(rename = "EndFreq")]
    end_freq: f64,
    #[serde(rename = "Region")]
    region: String,
}

/// A frequency-range classification rule. Rules are scanned in table order
/// and the first match wins, so overlapping ranges are resolved by position.
#[derive(Debug, Clone)]
pub struct BandRule {
    pub band: String,
    pub mode: Mode,
    pub start_khz: f64,
    pub end_khz: f64,
    pub region: String,
}

impl BandRule {
    fn contains(&self, freq_khz: f64) -> bool {
        (self.start_khz..=self.end_khz).contains(&freq_khz)
    }
}

/// Result of classifying a frequency/comment pair. Never an error: fields
/// that cannot be resolved come back as [`Mode::Unknown`] / [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub mode: Mode,
    pub band: String,
    pub region: String,
}

/// Immutable band plan: the ordered rule table plus the comment keyword
/// heuristics used to override the frequency-derived mode.
pub struct BandPlan {
    rules: Vec<BandRule>,
    cw_keywords: Regex,
    ssb_keywords: Regex,
    digital_keywords: Regex,
}

impl BandPlan {
    /// Build a plan from in-memory rules. Fails on an empty rule set: with
    /// no rules nothing could ever pass the inclusion filter.
    pub fn from_rules(rules: Vec<BandRule>) -> Result<Self> {
        if rules.is_empty() {
            anyhow::bail!("band plan contains no usable rules");
        }
        Ok(Self {
            rules,
            cw_keywords: Regex::new(r"(?i)\b(CW|QRS|MORSE)\b").expect("static pattern"),
            ssb_keywords: Regex::new(r"(?i)\b(SSB|LSB|USB|PHONE)\b").expect("static pattern"),
            digital_keywords: Regex::new(r"(?i)\b(FT8|FT4|PSK|RTTY|DIGITAL)\b")
                .expect("static pattern"),
        })
    }

    /// Load the band plan from its CSV file. A missing or empty file is an
    /// error: the pipeline cannot start without classification rules.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read band configuration {:?}", path))?;

        let rules = Self::parse_csv(&content)?;
        tracing::info!("Loaded {} band rules from {:?}", rules.len(), path);
        for rule in &rules {
            tracing::debug!(
                "Band: {}, Mode: {}, Range: {}-{} kHz, Region: {}",
                rule.band, rule.mode, rule.start_khz, rule.end_khz, rule.region
            );
        }
        Self::from_rules(rules)
    }

    /// Parse CSV content into rules, logging and skipping malformed rows.
    fn parse_csv(content: &str) -> Result<Vec<BandRule>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut rules = Vec::new();
        let mut row_count = 0;

        for result in reader.deserialize::<BandRuleRow>() {
            row_count += 1;
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!("Error parsing band config row {}: {}", row_count, e);
                    continue;
                }
            };
            let mode = match row.mode.parse::<Mode>() {
                Ok(mode) => mode,
                Err(e) => {
                    tracing::warn!("Skipping band config row {}: {}", row_count, e);
                    continue;
                }
            };
            if row.end_freq < row.start_freq {
                tracing::warn!(
                    "Skipping band config row {}: inverted range {}-{}",
                    row_count, row.start_freq, row.end_freq
                );
                continue;
            }
            rules.push(BandRule {
                band: row.band,
                mode,
                start_khz: row.start_freq,
                end_khz: row.end_freq,
                region: row.region,
            });
        }

        Ok(rules)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Classify a frequency/comment pair into (mode, band, region).
    ///
    /// The first matching rule supplies the initial answer; an explicit
    /// mode keyword in the comment always overrides the frequency-derived
    /// mode (operator annotation is trusted over inference); unmatched
    /// frequencies fall back to the standard band edges, band only.
    pub fn classify(&self, freq_khz: f64, comment: &str) -> Classification {
        let mut mode = Mode::Unknown;
        let mut band = UNKNOWN.to_string();
        let mut region = UNKNOWN.to_string();

        for rule in &self.rules {
            if rule.contains(freq_khz) {
                mode = rule.mode;
                band = rule.band.clone();
                region = rule.region.clone();
                break;
            }
        }

        if self.cw_keywords.is_match(comment) {
            mode = Mode::Cw;
        } else if self.ssb_keywords.is_match(comment) {
            mode = Mode::Ssb;
        } else if self.digital_keywords.is_match(comment) {
            mode = Mode::Digital;
        }

        if band == UNKNOWN {
            if let Some(fallback) = fallback_band(freq_khz) {
                band = fallback.to_string();
            }
        }

        Classification { mode, band, region }
    }

    /// Inclusion filter: true only for CW/SSB spots inside a configured
    /// segment of that exact mode. Stricter than `classify`: spots that
    /// only resolved through the fallback band edges are excluded.
    pub fn should_include(&self, freq_khz: f64, mode: Mode) -> bool {
        if !matches!(mode, Mode::Cw | Mode::Ssb) {
            return false;
        }
        self.rules
            .iter()
            .any(|rule| rule.mode == mode && rule.contains(freq_khz))
    }
}

/// Standard shortwave/VHF band edges, used only when no configured rule
/// matched. Region information is unavailable on this path.
fn fallback_band(freq_khz: f64) -> Option<&'static str> {
    let band = match freq_khz {
        f if (1800.0..=2000.0).contains(&f) => "160m",
        f if (3500.0..=4000.0).contains(&f) => "80m",
        f if (5330.0..=5406.0).contains(&f) => "60m",
        f if (7000.0..=7300.0).contains(&f) => "40m",
        f if (10_100.0..=10_150.0).contains(&f) => "30m",
        f if (14_000.0..=14_350.0).contains(&f) => "20m",
        f if (18_068.0..=18_168.0).contains(&f) => "17m",
        f if (21_000.0..=21_450.0).contains(&f) => "15m",
        f if (24_890.0..=24_990.0).contains(&f) => "12m",
        f if (28_000.0..=29_700.0).contains(&f) => "10m",
        f if (50_000.0..=54_000.0).contains(&f) => "6m",
        f if (144_000.0..=148_000.0).contains(&f) => "2m",
        _ => return None,
    };
    Some(band)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_plan() -> BandPlan {
        BandPlan::from_rules(vec![
            BandRule {
                band: "40m".to_string(),
                mode: Mode::Ssb,
                start_khz: 7000.0,
                end_khz: 7300.0,
                region: "Region1".to_string(),
            },
            BandRule {
                band: "20m".to_string(),
                mode: Mode::Cw,
                start_khz: 14000.0,
                end_khz: 14070.0,
                region: "Global".to_string(),
            },
            BandRule {
                band: "20m".to_string(),
                mode: Mode::Ssb,
                start_khz: 14150.0,
                end_khz: 14350.0,
                region: "Global".to_string(),
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_classify_by_rule() {
        let plan = test_plan();
        let c = plan.classify(14205.0, "loud here");
        assert_eq!(c.mode, Mode::Ssb);
        assert_eq!(c.band, "20m");
        assert_eq!(c.region, "Global");
    }

    #[test]
    fn test_first_rule_wins_on_overlap() {
        let plan = BandPlan::from_rules(vec![
            BandRule {
                band: "20m".to_string(),
                mode: Mode::Cw,
                start_khz: 14000.0,
                end_khz: 14350.0,
                region: "A".to_string(),
            },
            BandRule {
                band: "20m".to_string(),
                mode: Mode::Ssb,
                start_khz: 14000.0,
                end_khz: 14350.0,
                region: "B".to_string(),
            },
        ])
        .unwrap();
        let c = plan.classify(14200.0, "");
        assert_eq!(c.mode, Mode::Cw);
        assert_eq!(c.region, "A");
    }

    #[test]
    fn test_comment_keyword_overrides_frequency_mode() {
        let plan = test_plan();
        // 7030 sits in a segment configured as SSB, but the operator says CW.
        let c = plan.classify(7030.0, "CQ CW QRS");
        assert_eq!(c.mode, Mode::Cw);
        assert_eq!(c.band, "40m");

        let c = plan.classify(14020.0, "FT8 -12dB");
        assert_eq!(c.mode, Mode::Digital);
    }

    #[test]
    fn test_keyword_needs_word_boundary() {
        let plan = test_plan();
        // "SCWL" must not trigger the CW keyword.
        let c = plan.classify(14205.0, "via SCWL net");
        assert_eq!(c.mode, Mode::Ssb);
    }

    #[test]
    fn test_fallback_band_without_rule_match() {
        let plan = test_plan();
        let c = plan.classify(3750.0, "");
        assert_eq!(c.mode, Mode::Unknown);
        assert_eq!(c.band, "80m");
        assert_eq!(c.region, UNKNOWN);

        let c = plan.classify(145_500.0, "");
        assert_eq!(c.band, "2m");

        let c = plan.classify(500.0, "");
        assert_eq!(c.band, UNKNOWN);
    }

    #[test]
    fn test_should_include_mode_gate() {
        let plan = test_plan();
        assert!(plan.should_include(14205.0, Mode::Ssb));
        assert!(plan.should_include(14020.0, Mode::Cw));
        // Wrong mode for the segment.
        assert!(!plan.should_include(14205.0, Mode::Cw));
        // Digital and unknown are never included.
        assert!(!plan.should_include(14205.0, Mode::Digital));
        assert!(!plan.should_include(14205.0, Mode::Unknown));
        // Fallback-only band (no configured rule): excluded.
        assert!(!plan.should_include(3750.0, Mode::Ssb));
    }

    #[test]
    fn test_parse_csv_skips_bad_rows() {
        let csv = "Band,Mode,StartFreq,EndFreq,Region\n\
                   20m,SSB,14150,14350,Global\n\
                   junk,FM,1,2,Nowhere\n\
                   15m,CW,21000,21070,Global\n";
        let rules = BandPlan::parse_csv(csv).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].band, "20m");
        assert_eq!(rules[1].mode, Mode::Cw);
    }

    #[test]
    fn test_empty_plan_is_fatal() {
        assert!(BandPlan::from_rules(Vec::new()).is_err());
    }
}
