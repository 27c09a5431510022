///! Generic fallback extractor: probes any table structure for rows that
///! contain a frequency-like and a callsign-like token.

use chrono::Utc;
use scraper::{Html, Selector};

use super::HtmlSpotExtractor;
use crate::module::spot::heuristics::SpotHeuristics;
use crate::module::spot::types::{RawSpot, SpotSource};

pub struct GenericTableExtractor {
    table: Selector,
    row: Selector,
    cell: Selector,
    heuristics: SpotHeuristics,
}

impl GenericTableExtractor {
    pub fn new() -> Self {
        Self {
            table: Selector::parse("table").expect("static selector"),
            row: Selector::parse("tr").expect("static selector"),
            cell: Selector::parse("td, th").expect("static selector"),
            heuristics: SpotHeuristics::new(),
        }
    }

    fn spot_from_row(&self, cells: &[String]) -> Option<RawSpot> {
        if cells.is_empty() {
            return None;
        }
        let row_text = cells.join(" ");

        let freq = self.heuristics.find_frequency(&row_text)?;
        let dx_call = self.heuristics.find_callsign(&row_text)?;
        // Sites that round to the band label are corrected from the same row.
        let freq = self.heuristics.refine_rounded(freq, &row_text);

        // With enough columns, the last one is usually the comment.
        let comment = if cells.len() > 2 {
            cells[cells.len() - 1].clone()
        } else {
            String::new()
        };

        Some(RawSpot {
            spotter: "Unknown".to_string(),
            dx_call,
            freq_khz: freq,
            comment,
            observed_at: Utc::now(),
            source: SpotSource::Web,
        })
    }
}

impl Default for GenericTableExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlSpotExtractor for GenericTableExtractor {
    fn name(&self) -> &'static str {
        "generic-table"
    }

    fn extract(&self, html: &str) -> Vec<RawSpot> {
        let document = Html::parse_document(html);
        let mut spots = Vec::new();

        for table in document.select(&self.table) {
            for row in table.select(&self.row) {
                let cells: Vec<String> = row
                    .select(&self.cell)
                    .map(|cell| {
                        cell.text().collect::<Vec<_>>().join(" ").trim().to_string()
                    })
                    .collect();
                if let Some(spot) = self.spot_from_row(&cells) {
                    spots.push(spot);
                }
            }
        }

        spots
    }
}
