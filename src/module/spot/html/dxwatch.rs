///! DXWatch-style extractor: spots live in `div#spots`, one `div.spot`
///! per report, with dedicated freq/call elements.

use chrono::Utc;
use regex::Regex;
use scraper::{Html, Selector};

use super::HtmlSpotExtractor;
use crate::module::spot::heuristics::{normalize_khz, SpotHeuristics};
use crate::module::spot::types::{RawSpot, SpotSource};

pub struct DxWatchExtractor {
    spot_div: Selector,
    freq_span: Selector,
    call_link: Selector,
    number: Regex,
    heuristics: SpotHeuristics,
}

impl DxWatchExtractor {
    pub fn new() -> Self {
        Self {
            spot_div: Selector::parse("div#spots div.spot").expect("static selector"),
            freq_span: Selector::parse("span.freq").expect("static selector"),
            call_link: Selector::parse("a.call").expect("static selector"),
            number: Regex::new(r"(\d+\.?\d*)").expect("static pattern"),
            heuristics: SpotHeuristics::new(),
        }
    }
}

impl Default for DxWatchExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlSpotExtractor for DxWatchExtractor {
    fn name(&self) -> &'static str {
        "dxwatch"
    }

    fn extract(&self, html: &str) -> Vec<RawSpot> {
        let document = Html::parse_document(html);
        let mut spots = Vec::new();

        for spot_el in document.select(&self.spot_div) {
            let Some(freq_text) = spot_el
                .select(&self.freq_span)
                .next()
                .map(|el| el.text().collect::<String>())
            else {
                continue;
            };
            let Some(freq) = self
                .number
                .captures(&freq_text)
                .and_then(|caps| caps[1].parse::<f64>().ok())
            else {
                continue;
            };

            let Some(dx_call) = spot_el
                .select(&self.call_link)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .filter(|call| !call.is_empty())
            else {
                continue;
            };

            let comment = spot_el
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");

            let freq = normalize_khz(freq);
            let freq = self.heuristics.refine_rounded(freq, &comment);

            spots.push(RawSpot {
                spotter: "Unknown".to_string(),
                dx_call,
                freq_khz: freq,
                comment,
                observed_at: Utc::now(),
                source: SpotSource::Web,
            });
        }

        spots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <div id="spots">
          <div class="spot">
            <span class="freq">14195.0</span>
            <a class="call">JA1ABC</a>
            <span class="comment">CQ SSB loud</span>
          </div>
          <div class="spot">
            <span class="freq">7030.0</span>
            <a class="call">K2XYZ</a>
          </div>
          <div class="spot">
            <span class="freq"></span>
            <a class="call">NOFREQ1</a>
          </div>
        </div>"#;

    #[test]
    fn test_extracts_structured_spots() {
        let extractor = DxWatchExtractor::new();
        let spots = extractor.extract(PAGE);
        assert_eq!(spots.len(), 2);
        assert_eq!(spots[0].dx_call, "JA1ABC");
        assert!((spots[0].freq_khz - 14195.0).abs() < 1e-6);
        assert!(spots[0].comment.contains("CQ SSB loud"));
        assert_eq!(spots[1].dx_call, "K2XYZ");
    }

    #[test]
    fn test_ignores_spots_outside_container() {
        let extractor = DxWatchExtractor::new();
        let page = r#"<div class="spot"><span class="freq">14195.0</span>
            <a class="call">JA1ABC</a></div>"#;
        assert!(extractor.extract(page).is_empty());
    }
}
