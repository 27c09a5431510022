///! HamQTH-style extractor: a fixed-layout `table#dxc-table` with
///! positional columns (freq, DX call, comment, time, spotter).

use chrono::Utc;
use scraper::{Html, Selector};

use super::HtmlSpotExtractor;
use crate::module::spot::heuristics::{normalize_khz, SpotHeuristics};
use crate::module::spot::types::{RawSpot, SpotSource};

pub struct HamQthExtractor {
    row: Selector,
    cell: Selector,
    heuristics: SpotHeuristics,
}

impl HamQthExtractor {
    pub fn new() -> Self {
        Self {
            row: Selector::parse("table#dxc-table tr").expect("static selector"),
            cell: Selector::parse("td").expect("static selector"),
            heuristics: SpotHeuristics::new(),
        }
    }
}

impl Default for HamQthExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlSpotExtractor for HamQthExtractor {
    fn name(&self) -> &'static str {
        "hamqth"
    }

    fn extract(&self, html: &str) -> Vec<RawSpot> {
        let document = Html::parse_document(html);
        let mut spots = Vec::new();

        for row in document.select(&self.row) {
            let cells: Vec<String> = row
                .select(&self.cell)
                .map(|cell| cell.text().collect::<Vec<_>>().join(" ").trim().to_string())
                .collect();

            // Column layout: freq, DX call, comment, time, spotter.
            if cells.len() < 2 {
                continue;
            }
            let Ok(freq) = cells[0].parse::<f64>() else {
                continue;
            };
            let dx_call = cells[1].clone();
            if dx_call.is_empty() {
                continue;
            }
            let comment = cells.get(2).cloned().unwrap_or_default();
            let spotter = cells
                .get(4)
                .filter(|s| !s.is_empty())
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());

            let freq = normalize_khz(freq);
            let freq = self.heuristics.refine_rounded(freq, &comment);

            spots.push(RawSpot {
                spotter,
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
