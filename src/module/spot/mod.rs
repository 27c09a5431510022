///! Spot extraction and classification: record types, the band plan
///! classifier, the feed-line parser and the HTML extractor family.

pub mod band_plan;
pub mod heuristics;
pub mod html;
pub mod line_parser;
pub mod types;

pub use band_plan::{BandPlan, BandRule, Classification};
pub use line_parser::SpotLineParser;
pub use types::{ClassifiedSpot, Mode, RawSpot, SpotSource};
