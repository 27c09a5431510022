///! Structural HTML spot extractors.
///!
///! Each cluster website lays out its spot list differently, so extraction
///! is polymorphic: one implementation per known site family plus a generic
///! table walker as the fallback. Acquisition tries the paired extractor
///! for each URL and keeps the first non-empty result.

mod dxwatch;
mod generic_table;
mod hamqth;

pub use dxwatch::DxWatchExtractor;
pub use generic_table::GenericTableExtractor;
pub use hamqth::HamQthExtractor;

use super::types::RawSpot;

pub trait HtmlSpotExtractor: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Walk a page and return every spot it yields. A page this extractor
    /// does not understand yields an empty list, not an error.
    fn extract(&self, html: &str) -> Vec<RawSpot>;
}
