// src/eval/report.rs — Performance report parsing and summary

use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::infra::errors::QuickenError;

/// A record counts as accurate when both scores clear this bar.
const ACCURACY_THRESHOLD: f64 = 0.99;

/// One line of the evaluator's report.
#[derive(Debug, Clone, Deserialize)]
pub struct PerfRecord {
    #[serde(default)]
    pub final_attempt_code_acc: f64,
    #[serde(default)]
    pub input_acc: f64,
    #[serde(default)]
    pub final_attempt_code_time_mean: f64,
    #[serde(default)]
    pub reference_time_mean: f64,
    #[serde(default)]
    pub input_time_mean: f64,
}

impl PerfRecord {
    pub fn is_accurate(&self) -> bool {
        self.final_attempt_code_acc > ACCURACY_THRESHOLD && self.input_acc > ACCURACY_THRESHOLD
    }
}

/// Aggregate accuracy/speedup statistics for one run.
///
/// Improvement is counted against both available time baselines; the report
/// format carries a human-written reference solution (`reference_time_mean`)
/// and the unmodified input (`input_time_mean`), and which one "improved"
/// should mean is the caller's call. Both are surfaced; neither is picked
/// silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_programs: usize,
    pub total_programs_accurate: usize,
    pub not_accurate_programs: usize,
    pub accuracy_rate: f64,
    pub improved_vs_reference: usize,
    pub improvement_rate_vs_reference: f64,
    pub improved_vs_input: usize,
    pub improvement_rate_vs_input: f64,
}

pub fn load_report(path: &Path) -> Result<Vec<PerfRecord>, QuickenError> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|e| QuickenError::Dataset { line: i + 1, source: e })?;
        records.push(record);
    }
    Ok(records)
}

/// Summarize a report. An empty report is an error: it means the evaluator
/// produced nothing usable, which should not pass silently as 0%.
pub fn summarize(records: &[PerfRecord]) -> Result<RunSummary, QuickenError> {
    if records.is_empty() {
        return Err(QuickenError::Config("no valid run metrics found".into()));
    }

    let total = records.len();
    let accurate: Vec<&PerfRecord> = records.iter().filter(|r| r.is_accurate()).collect();

    let improved_vs_reference = accurate
        .iter()
        .filter(|r| r.final_attempt_code_time_mean < r.reference_time_mean)
        .count();
    let improved_vs_input = accurate
        .iter()
        .filter(|r| r.final_attempt_code_time_mean < r.input_time_mean)
        .count();

    let rate = |n: usize| n as f64 / total as f64 * 100.0;

    Ok(RunSummary {
        total_programs: total,
        total_programs_accurate: accurate.len(),
        not_accurate_programs: total - accurate.len(),
        accuracy_rate: rate(accurate.len()),
        improved_vs_reference,
        improvement_rate_vs_reference: rate(improved_vs_reference),
        improved_vs_input,
        improvement_rate_vs_input: rate(improved_vs_input),
    })
}

/// Write the summary as pretty JSON next to the other run artifacts.
pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<(), QuickenError> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json).map_err(|source| QuickenError::Persistence {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(
        attempt_acc: f64,
        input_acc: f64,
        attempt_time: f64,
        reference_time: f64,
        input_time: f64,
    ) -> PerfRecord {
        PerfRecord {
            final_attempt_code_acc: attempt_acc,
            input_acc,
            final_attempt_code_time_mean: attempt_time,
            reference_time_mean: reference_time,
            input_time_mean: input_time,
        }
    }

    #[test]
    fn test_accuracy_requires_both_scores() {
        assert!(record(1.0, 1.0, 0.0, 0.0, 0.0).is_accurate());
        assert!(!record(1.0, 0.5, 0.0, 0.0, 0.0).is_accurate());
        assert!(!record(0.5, 1.0, 0.0, 0.0, 0.0).is_accurate());
        // threshold is strict
        assert!(!record(0.99, 1.0, 0.0, 0.0, 0.0).is_accurate());
    }

    #[test]
    fn test_summarize_counts_both_baselines() {
        let records = vec![
            // accurate, beats reference but not input
            record(1.0, 1.0, 50.0, 80.0, 40.0),
            // accurate, beats both
            record(1.0, 1.0, 10.0, 80.0, 40.0),
            // inaccurate, times ignored
            record(0.3, 1.0, 1.0, 80.0, 40.0),
            // accurate, beats neither
            record(1.0, 1.0, 100.0, 80.0, 40.0),
        ];
        let s = summarize(&records).unwrap();
        assert_eq!(s.total_programs, 4);
        assert_eq!(s.total_programs_accurate, 3);
        assert_eq!(s.not_accurate_programs, 1);
        assert_eq!(s.accuracy_rate, 75.0);
        assert_eq!(s.improved_vs_reference, 2);
        assert_eq!(s.improvement_rate_vs_reference, 50.0);
        assert_eq!(s.improved_vs_input, 1);
        assert_eq!(s.improvement_rate_vs_input, 25.0);
    }

    #[test]
    fn test_summarize_empty_report_is_error() {
        assert!(summarize(&[]).is_err());
    }

    #[test]
    fn test_improvement_is_strict_less_than() {
        let records = vec![record(1.0, 1.0, 80.0, 80.0, 80.0)];
        let s = summarize(&records).unwrap();
        assert_eq!(s.improved_vs_reference, 0);
        assert_eq!(s.improved_vs_input, 0);
    }

    #[test]
    fn test_load_report_tolerates_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.jsonl");
        std::fs::write(&path, "{\"final_attempt_code_acc\":1.0,\"input_acc\":1.0}\n").unwrap();
        let records = load_report(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_accurate());
        assert_eq!(records[0].reference_time_mean, 0.0);
    }
}
