// src/batch/mod.rs — Dataset records and line-delimited JSON I/O

pub mod driver;

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::infra::errors::QuickenError;
use crate::refine::session::AttemptLog;

/// One slow-program sample from the dataset. Fields beyond the identity key
/// and the source text pass through load→store untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_id_v0: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Source text of the slow program.
    pub input: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProgramRecord {
    /// Identity key: `submission_id_v0` falling back to `id`.
    pub fn key(&self) -> Option<&str> {
        self.submission_id_v0
            .as_deref()
            .or(self.id.as_deref())
    }
}

/// A processed record: the input sample plus its session log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(flatten)]
    pub record: ProgramRecord,
    pub run_logs: Vec<AttemptLog>,
}

impl RunRecord {
    /// The final attempt's text, if any attempt was logged.
    pub fn final_attempt(&self) -> Option<&str> {
        self.run_logs.last().map(|l| l.feedback.as_str())
    }
}

/// Read an ordered dataset, one JSON object per line. Blank lines are
/// skipped; a malformed line is fatal (the dataset is a required input).
pub fn load_dataset(path: &Path) -> Result<Vec<ProgramRecord>, QuickenError> {
    read_jsonl(path)
}

/// Read a prior output/checkpoint file in the same line format.
pub fn load_run_records(path: &Path) -> Result<Vec<RunRecord>, QuickenError> {
    read_jsonl(path)
}

fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, QuickenError> {
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

/// Write records as line-delimited JSON. Any failure here is fatal; no
/// partial-write recovery is attempted.
pub fn write_run_records(path: &Path, records: &[RunRecord]) -> Result<(), QuickenError> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    std::fs::write(path, out).map_err(|source| QuickenError::Persistence {
        path: path.to_path_buf(),
        source,
    })
}

/// Output path for a run: `<stem>.fb_<mode>.temp_<temperature>.engine_<engine>.jsonl`.
/// The engine comes from the run configuration, passed by value.
pub fn output_path(stem: &Path, mode: &str, temperature: f32, engine: &str) -> PathBuf {
    PathBuf::from(format!(
        "{}.fb_{}.temp_{}.engine_{}.jsonl",
        stem.display(),
        mode,
        temperature,
        engine
    ))
}

/// If `path` already exists, append the first free `.vN` suffix so an earlier
/// run is never clobbered.
pub fn versioned(path: PathBuf) -> PathBuf {
    if !path.exists() {
        return path;
    }
    let mut v = 0;
    loop {
        let candidate = PathBuf::from(format!("{}.v{}", path.display(), v));
        if !candidate.exists() {
            tracing::info!(
                "Output file {} already exists, writing to {}",
                path.display(),
                candidate.display()
            );
            return candidate;
        }
        v += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_record(json: &str) -> ProgramRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_key_prefers_submission_id() {
        let r = sample_record(r#"{"submission_id_v0":"s1","id":"a","input":"x"}"#);
        assert_eq!(r.key(), Some("s1"));
    }

    #[test]
    fn test_key_falls_back_to_id() {
        let r = sample_record(r#"{"id":"a","input":"x"}"#);
        assert_eq!(r.key(), Some("a"));
    }

    #[test]
    fn test_key_missing() {
        let r = sample_record(r#"{"input":"x"}"#);
        assert_eq!(r.key(), None);
    }

    #[test]
    fn test_passthrough_fields_survive_roundtrip() {
        let r = sample_record(
            r#"{"id":"a","input":"def f(): pass","problem_id":"p007","cpu_time_v0":812}"#,
        );
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["problem_id"], "p007");
        assert_eq!(json["cpu_time_v0"], 812);
        assert_eq!(json["id"], "a");
    }

    #[test]
    fn test_run_record_serializes_flat() {
        let run = RunRecord {
            record: sample_record(r#"{"id":"a","input":"x"}"#),
            run_logs: vec![],
        };
        let json = serde_json::to_value(&run).unwrap();
        // record fields and run_logs share one flat object
        assert_eq!(json["id"], "a");
        assert_eq!(json["input"], "x");
        assert!(json["run_logs"].is_array());
    }

    #[test]
    fn test_final_attempt() {
        let run: RunRecord = serde_json::from_str(
            r#"{"id":"a","input":"x","run_logs":[
                {"attempt":0,"feedback":"first","feedback_on_feedback":"meh","prev_feedback":null},
                {"attempt":1,"feedback":"second","feedback_on_feedback":"looks good","prev_feedback":"first"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(run.final_attempt(), Some("second"));
    }

    #[test]
    fn test_load_dataset_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.jsonl");
        std::fs::write(
            &path,
            "{\"id\":\"a\",\"input\":\"1\"}\n\n{\"id\":\"b\",\"input\":\"2\"}\n",
        )
        .unwrap();
        let records = load_dataset(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].key(), Some("b"));
    }

    #[test]
    fn test_load_dataset_reports_bad_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.jsonl");
        std::fs::write(&path, "{\"id\":\"a\",\"input\":\"1\"}\nnot json\n").unwrap();
        let err = load_dataset(&path).unwrap_err();
        assert!(matches!(err, QuickenError::Dataset { line: 2, .. }));
    }

    #[test]
    fn test_output_path_naming() {
        let p = output_path(Path::new("out/run"), "self-refine", 0.7, "gpt-4.1-mini");
        assert_eq!(
            p,
            PathBuf::from("out/run.fb_self-refine.temp_0.7.engine_gpt-4.1-mini.jsonl")
        );
    }

    #[test]
    fn test_versioned_no_collision_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.jsonl");
        assert_eq!(versioned(path.clone()), path);
    }

    #[test]
    fn test_versioned_scans_past_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        std::fs::write(&path, "").unwrap();
        std::fs::write(format!("{}.v0", path.display()), "").unwrap();
        let next = versioned(path.clone());
        assert_eq!(next, PathBuf::from(format!("{}.v1", path.display())));
    }
}
