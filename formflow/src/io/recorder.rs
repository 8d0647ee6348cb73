//! Recorder backends for submitted forms.
//!
//! The [`Recorder`] trait lives in the core so sessions stay free of I/O;
//! this module provides the implementations selected by configuration.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::core::session::Recorder;
use crate::core::types::FieldValues;
use crate::io::config::{RecorderConfig, RecorderKind};

/// One line of the submissions log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub form: String,
    /// RFC 3339 UTC timestamp.
    pub submitted_at: String,
    pub fields: FieldValues,
}

/// Appends submissions to a JSON Lines file.
#[derive(Debug, Clone)]
pub struct JsonlRecorder {
    path: PathBuf,
}

impl JsonlRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Recorder for JsonlRecorder {
    #[instrument(skip_all, fields(form = form_id, path = %self.path.display()))]
    fn record(&self, form_id: &str, fields: &FieldValues) -> Result<()> {
        let entry = Submission {
            form: form_id.to_string(),
            submitted_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            fields: fields.clone(),
        };
        let mut line = serde_json::to_string(&entry).context("serialize submission")?;
        line.push('\n');

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("append {}", self.path.display()))?;
        debug!("submission appended");
        Ok(())
    }
}

/// Logs submissions and keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRecorder;

impl Recorder for LogRecorder {
    fn record(&self, form_id: &str, fields: &FieldValues) -> Result<()> {
        info!(form = form_id, fields = ?fields, "submission recorded");
        Ok(())
    }
}

/// Build the recorder selected by configuration.
pub fn recorder_from_config(cfg: &RecorderConfig) -> Box<dyn Recorder + Send + Sync> {
    match cfg.kind {
        RecorderKind::Jsonl => Box::new(JsonlRecorder::new(cfg.path.clone())),
        RecorderKind::Log => Box::new(LogRecorder),
    }
}

/// Read every submission from a JSON Lines file. A missing file is empty.
pub fn read_submissions(path: &Path) -> Result<Vec<Submission>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("parse {} line {}", path.display(), idx + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn jsonl_recorder_appends_one_line_per_submission() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("out").join("submissions.jsonl");
        let recorder = JsonlRecorder::new(&path);

        recorder
            .record("login", &values(&[("username", "ada")]))
            .expect("first");
        recorder
            .record("book", &values(&[("isbn", "0306406152")]))
            .expect("second");

        let contents = fs::read_to_string(&path).expect("read");
        assert_eq!(contents.lines().count(), 2);

        let submissions = read_submissions(&path).expect("read submissions");
        assert_eq!(submissions[0].form, "login");
        assert_eq!(submissions[0].fields["username"], "ada");
        assert_eq!(submissions[1].form, "book");
        assert!(submissions[1].submitted_at.ends_with('Z'));
    }

    #[test]
    fn read_submissions_treats_missing_file_as_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let submissions = read_submissions(&temp.path().join("none.jsonl")).expect("read");
        assert!(submissions.is_empty());
    }

    #[test]
    fn read_submissions_reports_bad_line() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("bad.jsonl");
        fs::write(&path, "{not json}\n").expect("write");
        let err = read_submissions(&path).expect_err("parse error");
        assert!(format!("{err:#}").contains("line 1"));
    }

    #[test]
    fn jsonl_recorder_fails_when_path_is_a_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let recorder = JsonlRecorder::new(temp.path());
        assert!(recorder.record("login", &FieldValues::new()).is_err());
    }
}
