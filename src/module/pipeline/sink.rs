///! Output sink interface and the CSV implementation.
///!
///! The pipeline never opens files on its own: it appends records, asks
///! for flushes, and requests aggregate snapshots through this trait.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::aggregate::FrequencyCounters;
use crate::module::spot::band_plan::BandPlan;
use crate::module::spot::types::ClassifiedSpot;

pub trait SpotSink {
    /// Append one admitted spot to the record stream.
    fn append_record(&mut self, spot: &ClassifiedSpot) -> Result<()>;

    /// Make appended records durable.
    fn flush(&mut self) -> Result<()>;

    /// Persist the current aggregate counters.
    fn snapshot(&mut self, counters: &FrequencyCounters) -> Result<()>;
}

const RAW_SPOTS_FILE: &str = "raw_spots.csv";
const FREQUENCY_COUNTS_FILE: &str = "frequency_counts.csv";
const SUMMARY_FILE: &str = "summary.csv";

/// CSV sink writing the three output files: an append-only raw record
/// stream, and per-frequency / per-band aggregates rewritten on snapshot.
pub struct CsvSink {
    band_plan: Arc<BandPlan>,
    counts_path: PathBuf,
    summary_path: PathBuf,
    raw_writer: csv::Writer<File>,
}

impl CsvSink {
    pub fn create(output_dir: impl AsRef<Path>, band_plan: Arc<BandPlan>) -> Result<Self> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("failed to create output directory {:?}", output_dir))?;

        let raw_path = output_dir.join(RAW_SPOTS_FILE);
        let mut raw_writer = csv::Writer::from_writer(
            File::create(&raw_path)
                .with_context(|| format!("failed to create {:?}", raw_path))?,
        );
        raw_writer.write_record([
            "Timestamp", "Frequency", "Callsign", "Spotter", "Mode", "Band", "Region",
        ])?;
        raw_writer.flush()?;

        tracing::info!("Output files created in {:?}", output_dir);

        Ok(Self {
            band_plan,
            counts_path: output_dir.join(FREQUENCY_COUNTS_FILE),
            summary_path: output_dir.join(SUMMARY_FILE),
            raw_writer,
        })
    }

    fn write_frequency_counts(&self, counters: &FrequencyCounters) -> Result<()> {
        let mut writer = csv::Writer::from_path(&self.counts_path)
            .with_context(|| format!("failed to write {:?}", self.counts_path))?;
        writer.write_record(["Frequency", "Mode", "Band", "Count", "Percentage"])?;

        let total = counters.total();
        for (freq, mode, count) in counters.entries() {
            let band = self.band_plan.classify(freq, "").band;
            let percentage = if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            writer.write_record([
                format!("{freq}"),
                mode.to_string(),
                band,
                count.to_string(),
                format!("{percentage:.2}%"),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_summary(&self, counters: &FrequencyCounters) -> Result<()> {
        let mut rollup: HashMap<String, HashMap<String, u64>> = HashMap::new();
        for (freq, mode, count) in counters.entries() {
            let band = self.band_plan.classify(freq, "").band;
            *rollup
                .entry(band)
                .or_default()
                .entry(mode.to_string())
                .or_insert(0) += count;
        }

        let mut writer = csv::Writer::from_path(&self.summary_path)
            .with_context(|| format!("failed to write {:?}", self.summary_path))?;
        writer.write_record(["Band", "Mode", "Total_Spots", "Percentage"])?;

        let total = counters.total();
        let mut bands: Vec<_> = rollup.into_iter().collect();
        bands.sort_by(|a, b| a.0.cmp(&b.0));
        for (band, modes) in bands {
            let mut modes: Vec<_> = modes.into_iter().collect();
            modes.sort_by(|a, b| a.0.cmp(&b.0));
            for (mode, count) in modes {
                let percentage = if total > 0 {
                    count as f64 / total as f64 * 100.0
                } else {
                    0.0
                };
                writer.write_record([
                    band.clone(),
                    mode,
                    count.to_string(),
                    format!("{percentage:.2}%"),
                ])?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

impl SpotSink for CsvSink {
    fn append_record(&mut self, spot: &ClassifiedSpot) -> Result<()> {
        self.raw_writer
            .write_record([
                spot.raw.observed_at.to_rfc3339(),
                format!("{}", spot.raw.freq_khz),
                spot.raw.dx_call.clone(),
                spot.raw.spotter.clone(),
                spot.mode.to_string(),
                spot.band.clone(),
                spot.region.clone(),
            ])
            .context("failed to append raw spot record")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.raw_writer.flush().context("failed to flush raw spots")?;
        Ok(())
    }

    fn snapshot(&mut self, counters: &FrequencyCounters) -> Result<()> {
        self.write_frequency_counts(counters)?;
        self.write_summary(counters)?;
        tracing::debug!(
            "Snapshot written: {} spots across {} frequency/mode pairs",
            counters.total(),
            counters.entries().len()
        );
        Ok(())
    }
}
