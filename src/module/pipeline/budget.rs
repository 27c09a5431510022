///! Wall-clock and output-size budget oracle.
///!
///! Long collection runs stop themselves: acquisition loops ask this
///! oracle at the top of each iteration and shut down gracefully (final
///! flush + snapshot) when either limit is reached. Budget exhaustion is
///! a normal exit, not an error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetExceeded {
    Runtime(Duration),
    OutputSize(u64),
}

impl fmt::Display for BudgetExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetExceeded::Runtime(limit) => {
                write!(f, "time limit reached ({} h)", limit.as_secs() / 3600)
            }
            BudgetExceeded::OutputSize(limit) => {
                write!(
                    f,
                    "size limit reached ({:.1} GB)",
                    *limit as f64 / (1024.0 * 1024.0 * 1024.0)
                )
            }
        }
    }
}

pub struct ResourceBudget {
    started_at: Instant,
    max_runtime: Duration,
    max_output_bytes: u64,
    output_dir: PathBuf,
}

impl ResourceBudget {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        max_runtime: Duration,
        max_output_bytes: u64,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            max_runtime,
            max_output_bytes,
            output_dir: output_dir.into(),
        }
    }

    /// Check both limits. The directory walk is cheap for the handful of
    /// output files this collector writes.
    pub fn exceeded(&self) -> Option<BudgetExceeded> {
        if self.started_at.elapsed() > self.max_runtime {
            return Some(BudgetExceeded::Runtime(self.max_runtime));
        }
        if dir_size(&self.output_dir) > self.max_output_bytes {
            return Some(BudgetExceeded::OutputSize(self.max_output_bytes));
        }
        None
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Total size of all files under a directory. Missing or unreadable
/// entries count as zero; budget checks must never fail the pipeline.
fn dir_size(path: &Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(path) else {
        return 0;
    };
    let mut total = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            total += dir_size(&path);
        } else if let Ok(metadata) = entry.metadata() {
            total += metadata.len();
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_budget_not_exceeded() {
        let dir = TempDir::new().unwrap();
        let budget = ResourceBudget::new(
            dir.path(),
            Duration::from_secs(3600),
            1024 * 1024,
        );
        assert_eq!(budget.exceeded(), None);
    }

    #[test]
    fn test_size_limit() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("raw_spots.csv"), vec![0u8; 2048]).unwrap();

        let budget = ResourceBudget::new(dir.path(), Duration::from_secs(3600), 1024);
        assert_eq!(budget.exceeded(), Some(BudgetExceeded::OutputSize(1024)));
    }

    #[test]
    fn test_time_limit() {
        let dir = TempDir::new().unwrap();
        let budget = ResourceBudget::new(dir.path(), Duration::ZERO, u64::MAX);
        std::thread::sleep(Duration::from_millis(5));
        assert!(matches!(
            budget.exceeded(),
            Some(BudgetExceeded::Runtime(_))
        ));
    }

    #[test]
    fn test_missing_directory_counts_as_empty() {
        let budget = ResourceBudget::new(
            "/definitely/not/a/real/path",
            Duration::from_secs(3600),
            1,
        );
        assert_eq!(budget.exceeded(), None);
    }
}
