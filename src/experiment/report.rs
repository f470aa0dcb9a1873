//! Round reports: STATS lines, human-readable summaries and results tables.

use crate::coordinator::{RoundMode, RoundResult};
use crate::core::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Column order of the results table.
pub const RESULTS_HEADER: &str =
    "mode,drop_prob,clients_expected,received,dropped,duration,global_n,global_mean,global_var";

/// One row of an experiment sweep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    /// Collection strategy
    pub mode: RoundMode,
    /// Drop probability the round ran with
    pub drop_prob: f64,
    /// Clients launched
    pub clients_expected: usize,
    /// Summaries received
    pub received: usize,
    /// Summaries missing
    pub dropped: usize,
    /// Round duration in seconds
    pub duration: f64,
    /// Observations aggregated
    pub global_n: u64,
    /// Global mean, `None` without data
    pub global_mean: Option<f64>,
    /// Global variance, `None` without data
    pub global_var: Option<f64>,
}

impl ExperimentRecord {
    /// Build a record from a finished round.
    pub fn from_result(drop_prob: f64, result: &RoundResult) -> Self {
        let (global_mean, global_var) = aggregate_stats(result);
        Self {
            mode: result.mode,
            drop_prob,
            clients_expected: result.expected,
            received: result.received(),
            dropped: result.dropped,
            duration: result.duration.as_secs_f64(),
            global_n: result.aggregate.n,
            global_mean,
            global_var,
        }
    }

    /// Render as a results table row.
    pub fn csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{:.4},{},{},{}",
            self.mode,
            self.drop_prob,
            self.clients_expected,
            self.received,
            self.dropped,
            self.duration,
            self.global_n,
            fmt_stat(self.global_mean),
            fmt_stat(self.global_var),
        )
    }
}

/// Global mean and variance, `None` when the round aggregated nothing.
fn aggregate_stats(result: &RoundResult) -> (Option<f64>, Option<f64>) {
    let agg = &result.aggregate;
    if agg.is_empty() {
        (None, None)
    } else {
        (Some(agg.mean), Some(agg.variance))
    }
}

fn fmt_stat(value: Option<f64>) -> String {
    value.map_or_else(|| "nan".to_string(), |v| format!("{v:.4}"))
}

/// Machine-readable single-line summary of a round.
pub fn stats_line(result: &RoundResult) -> String {
    let (mean, var) = aggregate_stats(result);
    format!(
        "STATS,mode={},clients_expected={},received={},dropped={},duration={:.4},global_n={},global_mean={},global_var={}",
        result.mode,
        result.expected,
        result.received(),
        result.dropped,
        result.duration.as_secs_f64(),
        result.aggregate.n,
        fmt_stat(mean),
        fmt_stat(var),
    )
}

/// Human-readable summary of a round.
pub fn summary_text(result: &RoundResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} round complete ({}) ===", result.mode, result.termination);
    let _ = writeln!(out, "Received: {} / Dropped: {}", result.received(), result.dropped);
    let _ = writeln!(out, "Duration: {:.3}s", result.duration.as_secs_f64());

    let agg = &result.aggregate;
    if agg.is_empty() {
        let _ = write!(out, "No summaries received; no aggregate computed.");
    } else {
        let _ = write!(
            out,
            "Global n={}, mean={:.4}, std={:.4}",
            agg.n,
            agg.mean,
            agg.std_dev()
        );
    }
    out
}

/// Write a results table with a header row.
pub fn write_results_csv(path: impl AsRef<Path>, records: &[ExperimentRecord]) -> Result<()> {
    let mut text = String::from(RESULTS_HEADER);
    text.push('\n');
    for record in records {
        text.push_str(&record.csv_row());
        text.push('\n');
    }
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::Termination;
    use crate::core::{now, RoundId};
    use crate::stats::{merge_summaries, ClientSummary, GlobalAggregate};
    use std::time::Duration;

    fn round(summaries: Vec<ClientSummary>, expected: usize) -> RoundResult {
        let aggregate = merge_summaries(&summaries).unwrap();
        RoundResult {
            round_id: RoundId::generate(),
            mode: RoundMode::Async,
            started_at: now(),
            expected,
            dropped: expected - summaries.len(),
            summaries,
            duration: Duration::from_millis(1234),
            termination: Termination::GraceElapsed,
            aggregate,
        }
    }

    fn full_round() -> RoundResult {
        let s = ClientSummary::from_values(1, &[1.0, 3.0], 2, Some((0.0, 4.0))).unwrap();
        round(vec![s], 3)
    }

    #[test]
    fn test_stats_line() {
        assert_eq!(
            stats_line(&full_round()),
            "STATS,mode=async,clients_expected=3,received=1,dropped=2,duration=1.2340,global_n=2,global_mean=2.0000,global_var=1.0000"
        );
    }

    #[test]
    fn test_stats_line_without_data() {
        let line = stats_line(&round(Vec::new(), 2));
        assert!(line.ends_with("global_n=0,global_mean=nan,global_var=nan"));
    }

    #[test]
    fn test_summary_text() {
        let text = summary_text(&full_round());
        assert!(text.contains("Received: 1 / Dropped: 2"));
        assert!(text.contains("mean=2.0000, std=1.0000"));

        let empty = summary_text(&round(Vec::new(), 2));
        assert!(empty.contains("No summaries received"));
    }

    #[test]
    fn test_record_from_empty_round() {
        let record = ExperimentRecord::from_result(0.8, &round(Vec::new(), 5));
        assert_eq!(record.global_mean, None);
        assert_eq!(record.dropped, 5);
        assert_eq!(GlobalAggregate::empty().n, record.global_n);
    }

    #[test]
    fn test_write_results_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let records = vec![
            ExperimentRecord::from_result(0.5, &full_round()),
            ExperimentRecord::from_result(0.8, &round(Vec::new(), 3)),
        ];
        write_results_csv(&path, &records).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], RESULTS_HEADER);
        assert_eq!(lines[1], "async,0.5,3,1,2,1.2340,2,2.0000,1.0000");
        assert_eq!(lines[2], "async,0.8,3,0,3,1.2340,0,nan,nan");
    }
}
