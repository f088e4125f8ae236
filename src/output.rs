//! Command results, rendered as a JSON document or as plain text.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: &str = "taskbox.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Plain-text rendering of a command result.
///
/// A headline, aligned `key: value` fields, free-form lines (one per
/// listed record, usually) and warnings. Warnings go to stderr so that
/// piping stdout only carries the result.
#[derive(Debug, Clone, Default)]
pub struct Report {
    headline: String,
    fields: Vec<(String, String)>,
    lines: Vec<String>,
    warnings: Vec<String>,
}

impl Report {
    pub fn new(headline: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            ..Self::default()
        }
    }

    pub fn field(&mut self, key: impl Into<String>, value: impl ToString) {
        self.fields.push((key.into(), value.to_string()));
    }

    pub fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.headline)?;
        let width = self.fields.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        for (key, value) in &self.fields {
            write!(f, "\n  {:<width$} {value}", format!("{key}:"), width = width + 1)?;
        }
        for line in &self.lines {
            write!(f, "\n  {line}")?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema: &'static str,
    command: &'a str,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "no_warnings")]
    warnings: &'a [String],
}

fn no_warnings(warnings: &&[String]) -> bool {
    warnings.is_empty()
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

/// Print a successful result: `data` as JSON, or `report` as text
pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    report: &Report,
) -> Result<()> {
    if options.json {
        let envelope = Envelope {
            schema: SCHEMA_VERSION,
            command,
            ok: true,
            data: Some(data),
            error: None,
            warnings: report.warnings(),
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    for warning in report.warnings() {
        eprintln!("warning: {warning}");
    }
    if !options.quiet {
        println!("{report}");
    }
    Ok(())
}

/// Print a failed command. JSON errors go to stdout like any other result.
pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hint = hint_for(err);
    if json {
        let envelope: Envelope<'_, ()> = Envelope {
            schema: SCHEMA_VERSION,
            command,
            ok: false,
            data: None,
            error: Some(ErrorBody {
                message: err.to_string(),
                code: err.exit_code(),
                details: err.details(),
                hint,
            }),
            warnings: &[],
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

fn hint_for(err: &Error) -> Option<&'static str> {
    match err {
        Error::InvalidConfig(_) | Error::TomlParse(_) => Some("fix .taskbox.toml then retry"),
        Error::LockFailed(_) => {
            Some("another taskbox process holds the collection; retry when it exits")
        }
        Error::ParseFailure(_) => Some("import expects a JSON array as produced by `export`"),
        Error::EntityNotFound { kind: "project", .. } => Some("see `taskbox project list`"),
        _ => None,
    }
}
