///! The spot pipeline: classify → dedup → filter → count → buffer.
///!
///! Both acquisition paths feed this single ingestion point, so the dedup
///! cache and the counters only ever see one writer.

use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;

use super::aggregate::FrequencyCounters;
use super::dedup::{spot_key, SpotCache};
use super::sink::SpotSink;
use crate::module::spot::band_plan::BandPlan;
use crate::module::spot::types::{ClassifiedSpot, RawSpot};

/// Records are flushed to the sink in batches of this size.
const FLUSH_THRESHOLD: usize = 10;

/// Every Nth admitted spot triggers an aggregate snapshot.
const SNAPSHOT_EVERY: u64 = 1000;

/// Progress is logged every Nth admitted spot.
const PROGRESS_EVERY: u64 = 100;

/// What happened to one ingested spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Counted and buffered for the sink.
    Admitted,
    /// Same (callsign, frequency) seen inside the dedup window.
    Duplicate,
    /// Rejected by the inclusion filter (wrong mode or unconfigured slice).
    Excluded,
}

pub struct SpotPipeline<S: SpotSink> {
    band_plan: Arc<BandPlan>,
    cache: SpotCache,
    counters: FrequencyCounters,
    buffer: Vec<ClassifiedSpot>,
    sink: S,
    admitted: u64,
}

impl<S: SpotSink> SpotPipeline<S> {
    pub fn new(band_plan: Arc<BandPlan>, sink: S) -> Self {
        Self {
            band_plan,
            cache: SpotCache::new(),
            counters: FrequencyCounters::new(),
            buffer: Vec::with_capacity(FLUSH_THRESHOLD),
            sink,
            admitted: 0,
        }
    }

    pub fn ingest(&mut self, raw: RawSpot) -> Result<IngestOutcome> {
        self.ingest_at(raw, Instant::now())
    }

    /// Ingest with an injected timestamp so the dedup window is testable.
    pub fn ingest_at(&mut self, raw: RawSpot, now: Instant) -> Result<IngestOutcome> {
        let classification = self.band_plan.classify(raw.freq_khz, &raw.comment);

        // Every extracted spot is visible in diagnostics, counted or not.
        tracing::debug!(
            "Spot from {}: {} on {} kHz ({}) - {} spotted by {}",
            raw.source,
            raw.dx_call,
            raw.freq_khz,
            classification.band,
            classification.mode,
            raw.spotter
        );

        if !self.cache.admit(spot_key(&raw.dx_call, raw.freq_khz), now) {
            return Ok(IngestOutcome::Duplicate);
        }

        if !self
            .band_plan
            .should_include(raw.freq_khz, classification.mode)
        {
            return Ok(IngestOutcome::Excluded);
        }

        self.counters.record(raw.freq_khz, classification.mode);
        self.admitted += 1;
        self.buffer.push(ClassifiedSpot {
            raw,
            mode: classification.mode,
            band: classification.band,
            region: classification.region,
        });

        if self.admitted % PROGRESS_EVERY == 0 {
            tracing::info!("Processed {} spots", self.admitted);
        }
        if self.buffer.len() >= FLUSH_THRESHOLD {
            self.flush_buffer()?;
        }
        if self.admitted % SNAPSHOT_EVERY == 0 {
            self.sink.snapshot(&self.counters)?;
        }

        Ok(IngestOutcome::Admitted)
    }

    fn flush_buffer(&mut self) -> Result<()> {
        for spot in self.buffer.drain(..) {
            self.sink.append_record(&spot)?;
        }
        self.sink.flush()
    }

    /// Final flush + snapshot, called once on shutdown.
    pub fn finalize(&mut self) -> Result<()> {
        self.flush_buffer()?;
        self.sink.snapshot(&self.counters)
    }

    pub fn total_admitted(&self) -> u64 {
        self.admitted
    }

    pub fn counters(&self) -> &FrequencyCounters {
        &self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::spot::band_plan::BandRule;
    use crate::module::spot::line_parser::SpotLineParser;
    use crate::module::spot::types::{Mode, SpotSource};
    use chrono::Utc;
    use std::time::Duration;

    /// Sink that records every operation, for pipeline-level tests.
    #[derive(Default)]
    struct MemorySink {
        records: Vec<ClassifiedSpot>,
        flushes: usize,
        snapshots: usize,
    }

    impl SpotSink for MemorySink {
        fn append_record(&mut self, spot: &ClassifiedSpot) -> Result<()> {
            self.records.push(spot.clone());
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            self.flushes += 1;
            Ok(())
        }

        fn snapshot(&mut self, _counters: &FrequencyCounters) -> Result<()> {
            self.snapshots += 1;
            Ok(())
        }
    }

    fn test_plan() -> Arc<BandPlan> {
        Arc::new(
            BandPlan::from_rules(vec![
                BandRule {
                    band: "40m".to_string(),
                    mode: Mode::Cw,
                    start_khz: 7000.0,
                    end_khz: 7040.0,
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
            .unwrap(),
        )
    }

    fn raw(dx_call: &str, freq_khz: f64, comment: &str) -> RawSpot {
        RawSpot {
            spotter: "Unknown".to_string(),
            dx_call: dx_call.to_string(),
            freq_khz,
            comment: comment.to_string(),
            observed_at: Utc::now(),
            source: SpotSource::Web,
        }
    }

    #[test]
    fn test_admitted_spot_is_counted() {
        let mut pipeline = SpotPipeline::new(test_plan(), MemorySink::default());
        let outcome = pipeline.ingest(raw("JA1ABC", 14205.0, "CQ")).unwrap();
        assert_eq!(outcome, IngestOutcome::Admitted);
        assert_eq!(pipeline.counters().count(14205.0, Mode::Ssb), 1);
        assert_eq!(pipeline.total_admitted(), 1);
    }

    #[test]
    fn test_duplicate_within_window_counted_once() {
        let mut pipeline = SpotPipeline::new(test_plan(), MemorySink::default());
        let t0 = Instant::now();

        let first = pipeline.ingest_at(raw("JA1ABC", 14205.0, "CQ"), t0).unwrap();
        let second = pipeline
            .ingest_at(raw("JA1ABC", 14205.0, "CQ again"), t0 + Duration::from_secs(30))
            .unwrap();
        assert_eq!(first, IngestOutcome::Admitted);
        assert_eq!(second, IngestOutcome::Duplicate);
        assert_eq!(pipeline.counters().total(), 1);

        // Outside the window the same pair counts again.
        let third = pipeline
            .ingest_at(raw("JA1ABC", 14205.0, "CQ later"), t0 + Duration::from_secs(700))
            .unwrap();
        assert_eq!(third, IngestOutcome::Admitted);
        assert_eq!(pipeline.counters().total(), 2);
    }

    #[test]
    fn test_digital_and_unconfigured_spots_excluded() {
        let mut pipeline = SpotPipeline::new(test_plan(), MemorySink::default());

        let digital = pipeline.ingest(raw("JA1ABC", 14205.0, "FT8 -10dB")).unwrap();
        assert_eq!(digital, IngestOutcome::Excluded);

        // 80m is only reachable through the fallback band table: excluded.
        let fallback = pipeline.ingest(raw("K2XYZ", 3750.0, "SSB")).unwrap();
        assert_eq!(fallback, IngestOutcome::Excluded);

        assert_eq!(pipeline.counters().total(), 0);
    }

    #[test]
    fn test_buffer_flushes_at_threshold() {
        let mut pipeline = SpotPipeline::new(test_plan(), MemorySink::default());
        for i in 0..FLUSH_THRESHOLD {
            let call = format!("JA{}ABC", i);
            pipeline
                .ingest(raw(&call, 14205.0 + i as f64, "CQ"))
                .unwrap();
        }
        assert_eq!(pipeline.sink.records.len(), FLUSH_THRESHOLD);
        assert!(pipeline.sink.flushes >= 1);
    }

    #[test]
    fn test_finalize_flushes_partial_buffer_and_snapshots() {
        let mut pipeline = SpotPipeline::new(test_plan(), MemorySink::default());
        pipeline.ingest(raw("JA1ABC", 14205.0, "CQ")).unwrap();
        assert!(pipeline.sink.records.is_empty());

        pipeline.finalize().unwrap();
        assert_eq!(pipeline.sink.records.len(), 1);
        assert_eq!(pipeline.sink.snapshots, 1);
    }

    #[test]
    fn test_end_to_end_canonical_ssb_line() {
        let parser = SpotLineParser::new();
        let mut pipeline = SpotPipeline::new(test_plan(), MemorySink::default());

        let spot = parser
            .parse("DX de ON4KST: 14205.0 JA1ABC CQ SSB 1200Z")
            .unwrap();
        assert_eq!(pipeline.ingest(spot).unwrap(), IngestOutcome::Admitted);

        pipeline.finalize().unwrap();
        let record = &pipeline.sink.records[0];
        assert_eq!(record.mode, Mode::Ssb);
        assert_eq!(record.band, "20m");
        assert_eq!(record.raw.dx_call, "JA1ABC");
        assert_eq!(record.raw.spotter, "ON4KST");
    }

    #[test]
    fn test_end_to_end_comment_forces_cw() {
        let parser = SpotLineParser::new();
        // Configure the 7020-7040 slice as SSB; the comment keyword wins.
        let plan = Arc::new(
            BandPlan::from_rules(vec![
                BandRule {
                    band: "40m".to_string(),
                    mode: Mode::Ssb,
                    start_khz: 7000.0,
                    end_khz: 7040.0,
                    region: "Global".to_string(),
                },
                BandRule {
                    band: "40m".to_string(),
                    mode: Mode::Cw,
                    start_khz: 7000.0,
                    end_khz: 7040.0,
                    region: "Global".to_string(),
                },
            ])
            .unwrap(),
        );
        let mut pipeline = SpotPipeline::new(plan, MemorySink::default());

        let spot = parser.parse("DX de W1AW: 7030.0 K2XYZ CW QRS 0300Z").unwrap();
        assert_eq!(pipeline.ingest(spot).unwrap(), IngestOutcome::Admitted);
        assert_eq!(pipeline.counters().count(7030.0, Mode::Cw), 1);
        assert_eq!(pipeline.counters().count(7030.0, Mode::Ssb), 0);
    }
}
