//! Command-line front end for formflow sessions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use formflow::core::rules::validate;
use formflow::core::types::FieldValues;
use formflow::exit_codes;
use formflow::fill::{FillOutcome, fill_from_files};
use formflow::io::config::{
    DEFAULT_CONFIG_PATH, FormflowConfig, RecorderKind, load_config, write_config,
};
use formflow::io::input::parse_assignment;
use formflow::io::recorder::read_submissions;
use formflow::logging;

#[derive(Parser)]
#[command(
    name = "formflow",
    version,
    about = "Schema-driven form sessions with step-gated validation"
)]
struct Cli {
    /// Config file (missing file means defaults).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file if missing.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// List available forms and their steps.
    Forms,
    /// Validate one value with the rule for its field name.
    Check {
        field: String,
        value: String,
        /// Sibling values as name=value (e.g. `--with password=Secret1!`).
        #[arg(long = "with", value_name = "NAME=VALUE")]
        with: Vec<String>,
    },
    /// Fill a form from a TOML or JSON file and submit it.
    Fill {
        form: String,
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Print submissions recorded by the jsonl recorder.
    History {
        /// Only show submissions of this form.
        #[arg(long)]
        form: Option<String>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Forms => cmd_forms(&cli.config),
        Command::Check { field, value, with } => cmd_check(&field, &value, &with),
        Command::Fill { form, input } => cmd_fill(&cli.config, &form, &input),
        Command::History { form } => cmd_history(&cli.config, form.as_deref()),
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    if !force && config_path.exists() {
        println!("init: {} exists (use --force to overwrite)", config_path.display());
        return Ok(exit_codes::OK);
    }
    write_config(config_path, &FormflowConfig::default())
        .with_context(|| format!("write {}", config_path.display()))?;
    println!("init: wrote {}", config_path.display());
    Ok(exit_codes::OK)
}

fn cmd_forms(config_path: &Path) -> Result<i32> {
    let catalog = load_config(config_path)?.catalog()?;
    for form in catalog.iter() {
        let steps: Vec<&str> = form.steps.iter().map(|step| step.title.as_str()).collect();
        println!("{}\t{}\t{}", form.id, form.title, steps.join(" > "));
    }
    Ok(exit_codes::OK)
}

fn cmd_check(field: &str, value: &str, with: &[String]) -> Result<i32> {
    let mut context = FieldValues::new();
    for raw in with {
        let (name, sibling) = parse_assignment(raw)?;
        context.insert(name, sibling);
    }
    context.insert(field.to_string(), value.to_string());

    match validate(field, value, Some(&context)) {
        None => {
            println!("ok");
            Ok(exit_codes::OK)
        }
        Some(message) => {
            println!("{field}: {message}");
            Ok(exit_codes::REJECTED)
        }
    }
}

fn cmd_fill(config_path: &Path, form: &str, input: &Path) -> Result<i32> {
    match fill_from_files(config_path, form, input)? {
        FillOutcome::Submitted {
            fields,
            success_message,
        } => {
            println!("submitted: form={} fields={}", form, fields.len());
            if let Some(message) = success_message {
                println!("{message}");
            }
            Ok(exit_codes::OK)
        }
        FillOutcome::Rejected { step, errors } => {
            println!("rejected: form={} step={}", form, step);
            for (name, message) in errors {
                println!("  {name}: {message}");
            }
            Ok(exit_codes::REJECTED)
        }
        FillOutcome::SubmitFailed { message } => {
            println!("submit failed: form={} message={}", form, message);
            Ok(exit_codes::SUBMIT_FAILED)
        }
    }
}

fn cmd_history(config_path: &Path, form: Option<&str>) -> Result<i32> {
    let cfg = load_config(config_path)?;
    if cfg.recorder.kind != RecorderKind::Jsonl {
        bail!("history needs recorder.kind = \"jsonl\"");
    }
    let submissions = read_submissions(&cfg.recorder.path)?;
    for submission in submissions
        .iter()
        .filter(|submission| form.is_none_or(|form| submission.form == form))
    {
        let line = serde_json::to_string(&submission.fields).context("serialize fields")?;
        println!("{}\t{}\t{}", submission.submitted_at, submission.form, line);
    }
    Ok(exit_codes::OK)
}
