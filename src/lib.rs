//! DX cluster frequency analyzer.
//!
//! Continuously collects DX spot reports - announcements that a station
//! was heard transmitting on a frequency - from either a telnet-style
//! cluster feed or scraped cluster web pages, classifies each spot by
//! mode/band/region, deduplicates repeats, and accumulates per-frequency
//! popularity statistics.
//!
//! Data flow:
//!
//! ```text
//! cluster feed ──► line parser ──┐
//!                                ├─► pipeline (classify → dedup →
//! web pages ──► html extractors ─┘    filter → count) ──► CSV sink
//! ```

pub mod config;
pub mod logging;
pub mod module;
