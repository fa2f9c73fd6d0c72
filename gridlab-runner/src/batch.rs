//! Batch runs: one config applied to many data files in parallel.
//!
//! Runs are independent, so each gets its own books and a failure in one
//! file is reported without stopping the others.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::config::SimulationConfig;
use crate::runner::{run_simulation, RunError, RunOutcome};

/// Outcome of one file in a batch.
#[derive(Debug)]
pub struct BatchItem {
    pub path: PathBuf,
    pub symbol: String,
    pub outcome: Result<RunOutcome, RunError>,
}

/// Results in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = (&BatchItem, &RunOutcome)> {
        self.items
            .iter()
            .filter_map(|item| item.outcome.as_ref().ok().map(|o| (item, o)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&BatchItem, &RunError)> {
        self.items
            .iter()
            .filter_map(|item| item.outcome.as_ref().err().map(|e| (item, e)))
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }
}

/// Symbol for a data file: its stem, or "UNKNOWN".
pub fn symbol_for(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("UNKNOWN")
        .to_string()
}

/// Run `base` against every path. With `parallel`, files are spread across
/// the rayon pool; results keep input order either way.
pub fn run_batch(base: &SimulationConfig, paths: &[PathBuf], parallel: bool) -> BatchReport {
    let run_one = |path: &PathBuf| {
        let symbol = symbol_for(path);
        let mut config = base.clone();
        config.data.path = Some(path.clone());
        config.data.symbol = symbol.clone();
        let outcome = run_simulation(&config);
        if let Err(e) = &outcome {
            tracing::warn!(path = %path.display(), error = %e, "batch item failed");
        }
        BatchItem {
            path: path.clone(),
            symbol,
            outcome,
        }
    };

    let items: Vec<BatchItem> = if parallel {
        paths.par_iter().map(run_one).collect()
    } else {
        paths.iter().map(run_one).collect()
    };

    let report = BatchReport { items };
    tracing::info!(
        files = paths.len(),
        succeeded = report.success_count(),
        failed = report.failure_count(),
        "batch complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_from_file_stem() {
        assert_eq!(symbol_for(Path::new("data/EURUSD.csv")), "EURUSD");
        assert_eq!(symbol_for(Path::new("plain")), "plain");
        assert_eq!(symbol_for(Path::new("/")), "UNKNOWN");
    }

    #[test]
    fn missing_files_are_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![dir.path().join("a.csv"), dir.path().join("b.csv")];
        let report = run_batch(&SimulationConfig::default(), &paths, true);
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.failure_count(), 2);
        assert_eq!(report.items[0].symbol, "a");
        assert_eq!(report.items[1].symbol, "b");
    }
}
