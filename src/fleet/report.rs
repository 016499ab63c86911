use super::outcome::{ReapRecord, WorkerOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Summary of a finished run, one record per launched worker.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub workers: Vec<ReapRecord>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>, workers: Vec<ReapRecord>) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            workers,
        }
    }

    pub fn persisted(&self) -> impl Iterator<Item = &ReapRecord> {
        self.workers.iter().filter(|r| r.outcome.is_persisted())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ReapRecord> {
        self.workers.iter().filter(|r| !r.outcome.is_persisted())
    }

    pub fn artifact_count(&self) -> usize {
        self.persisted().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        writeln!(
            f,
            "{} workers reaped in {}ms: {} artifacts, {} failures",
            self.workers.len(),
            elapsed.num_milliseconds(),
            self.artifact_count(),
            self.failure_count()
        )?;

        for record in &self.workers {
            match &record.outcome {
                WorkerOutcome::Persisted { artifact, .. } => writeln!(
                    f,
                    "  [{}] pid {} {} -> {}",
                    record.index,
                    record.handle,
                    record.input,
                    artifact.display()
                )?,
                WorkerOutcome::Failed { failure } => writeln!(
                    f,
                    "  [{}] pid {} {} failed: {}",
                    record.index, record.handle, record.input, failure
                )?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{InputSlot, WorkerFailure, WorkerHandle};
    use crate::histogram::Histogram;
    use std::path::PathBuf;

    fn sample() -> RunReport {
        RunReport::new(
            Utc::now(),
            vec![
                ReapRecord {
                    index: 0,
                    handle: WorkerHandle(501),
                    input: InputSlot::File(PathBuf::from("abc.txt")),
                    outcome: WorkerOutcome::Persisted {
                        artifact: PathBuf::from("file501.hist"),
                        histogram: Histogram::from_bytes(b"aabbcc"),
                    },
                },
                ReapRecord {
                    index: 1,
                    handle: WorkerHandle(502),
                    input: InputSlot::Cancel,
                    outcome: WorkerOutcome::failed(WorkerFailure::AbnormalExit { signal: 2 }),
                },
            ],
        )
    }

    #[test]
    fn test_counts() {
        let report = sample();
        assert_eq!(report.artifact_count(), 1);
        assert_eq!(report.failure_count(), 1);
    }

    #[test]
    fn test_display_lists_every_worker() {
        let text = sample().to_string();
        assert!(text.starts_with("2 workers reaped in "));
        assert!(text.contains("1 artifacts, 1 failures"));
        assert!(text.contains("[0] pid 501 abc.txt -> file501.hist"));
        assert!(text.contains("[1] pid 502 <cancel> failed: exited abnormally (SIGINT)"));
    }

    #[test]
    fn test_json_shape() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        let workers = json["workers"].as_array().unwrap();

        assert_eq!(workers[0]["status"], "persisted");
        assert_eq!(workers[0]["handle"], 501);
        assert_eq!(workers[0]["input"]["kind"], "file");
        assert_eq!(workers[0]["input"]["path"], "abc.txt");
        assert_eq!(workers[0]["histogram"]["counts"][1], 2);

        assert_eq!(workers[1]["status"], "failed");
        assert_eq!(workers[1]["input"]["kind"], "cancel");
        assert_eq!(workers[1]["failure"]["kind"], "abnormal_exit");
        assert_eq!(workers[1]["failure"]["signal"], 2);
    }
}
