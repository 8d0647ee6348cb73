//! Configuration stored in `formflow.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::catalog::FormCatalog;
use crate::core::schema::{FormSchema, validate_schemas};
use crate::core::session::DEFAULT_SUBMIT_FAILURE;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "formflow.toml";

/// Top-level configuration (TOML).
///
/// Meant to be edited by hand. Missing fields fall back to defaults, and a
/// missing file is the same as an empty one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FormflowConfig {
    /// Extra forms; a form whose id matches a built-in one replaces it.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<FormSchema>,

    pub recorder: RecorderConfig,

    pub messages: MessagesConfig,
}

/// Where submitted snapshots go.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RecorderConfig {
    pub kind: RecorderKind,
    /// Output file for `kind = "jsonl"`.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecorderKind {
    /// Append one JSON object per submission to `path`.
    Jsonl,
    /// Only emit a tracing event.
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MessagesConfig {
    /// Stored under the `submit` error key when the recorder fails.
    pub submit_failure: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            kind: RecorderKind::Jsonl,
            path: PathBuf::from("submissions.jsonl"),
        }
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            submit_failure: DEFAULT_SUBMIT_FAILURE.to_string(),
        }
    }
}

impl FormflowConfig {
    pub fn validate(&self) -> Result<()> {
        if self.recorder.kind == RecorderKind::Jsonl && self.recorder.path.as_os_str().is_empty()
        {
            return Err(anyhow!("recorder.path must be set when recorder.kind = \"jsonl\""));
        }
        if self.messages.submit_failure.trim().is_empty() {
            return Err(anyhow!("messages.submit_failure must not be empty"));
        }
        let errors = validate_schemas(&self.forms);
        if !errors.is_empty() {
            return Err(anyhow!("invalid forms:\n- {}", errors.join("\n- ")));
        }
        Ok(())
    }

    /// Built-in forms overlaid with the forms declared here.
    pub fn catalog(&self) -> Result<FormCatalog> {
        FormCatalog::with_overrides(&self.forms)
            .map_err(|errors| anyhow!("invalid forms:\n- {}", errors.join("\n- ")))
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FormflowConfig::default()`.
pub fn load_config(path: &Path) -> Result<FormflowConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = FormflowConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FormflowConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    debug!(path = %path.display(), forms = cfg.forms.len(), "config loaded");
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &FormflowConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    if !buf.ends_with('\n') {
        buf.push('\n');
    }
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::Rule;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, FormflowConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("formflow.toml");
        let cfg = FormflowConfig::default();
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn parses_forms_and_recorder_sections() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("formflow.toml");
        fs::write(
            &path,
            r#"
[recorder]
kind = "log"

[messages]
submit_failure = "Try again later."

[[forms]]
id = "newsletter"
title = "Newsletter"

[[forms.steps]]
title = "Subscribe"

[[forms.steps.fields]]
name = "email"
label = "Email"

[[forms.steps.fields]]
name = "topics"
rule = { type = "one_of", options = ["rust", "web"] }
"#,
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.recorder.kind, RecorderKind::Log);
        assert_eq!(cfg.messages.submit_failure, "Try again later.");
        let catalog = cfg.catalog().expect("catalog");
        let form = catalog.get("newsletter").expect("newsletter form");
        assert_eq!(
            form.field("topics").map(|f| f.rule()),
            Some(Rule::OneOf {
                options: vec!["rust".to_string(), "web".to_string()]
            })
        );
        assert!(catalog.get("checkout").is_some());
    }

    #[test]
    fn rejects_invalid_forms() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("formflow.toml");
        fs::write(
            &path,
            "[[forms]]\nid = \"empty\"\ntitle = \"Empty\"\nsteps = []\n",
        )
        .expect("write");
        let err = load_config(&path).expect_err("invalid forms");
        assert!(format!("{err:#}").contains("empty: form must declare at least one step"));
    }

    #[test]
    fn rejects_blank_submit_failure_message() {
        let cfg = FormflowConfig {
            messages: MessagesConfig {
                submit_failure: "  ".to_string(),
            },
            ..FormflowConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
