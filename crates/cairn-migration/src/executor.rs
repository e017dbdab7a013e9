//! Command-section execution.
//!
//! A section is run as one shell script so that state set up by one line
//! (working directory, exported variables, functions) is visible to the
//! lines that follow. The script lives in a private temporary file that is
//! removed on every exit path.

use crate::condition;
use crate::{Environment, Error, Result};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;

const SHELL: &str = "sh";

/// Result of a section that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    /// The condition evaluated to false. Nothing ran.
    Skipped,
    /// The condition held but the section has no commands.
    Empty,
    /// The commands ran and exited zero.
    Ran { output: String },
}

impl SectionOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// Combined stdout/stderr of the run, empty unless [`SectionOutcome::Ran`].
    pub fn output(&self) -> &str {
        match self {
            Self::Ran { output } => output,
            _ => "",
        }
    }
}

/// A section rendered without being executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedSection {
    /// The condition evaluated to false.
    Skipped,
    /// Command lines with variables substituted, in order.
    Lines(Vec<String>),
}

/// Runs command sections against a fixed environment.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    env: Environment,
    verbose: bool,
}

impl Executor {
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            verbose: false,
        }
    }

    /// Echo each script line as it executes.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Runs `commands` as one shell script if `condition` holds.
    ///
    /// A condition that cannot be evaluated is an error, never a skip. A
    /// non-zero exit yields [`Error::Execution`] carrying the captured output.
    pub fn run(&self, condition: &str, commands: &[String]) -> Result<SectionOutcome> {
        if !condition::evaluate(condition, &self.env)? {
            tracing::debug!(condition, "Condition is false, skipping section");
            return Ok(SectionOutcome::Skipped);
        }
        if commands.is_empty() {
            return Ok(SectionOutcome::Empty);
        }

        let body = self.script(commands);
        tracing::debug!(script = %body, "Executing section");

        let script = write_script(&body)?;
        let result = self.spawn(script.path());
        discard_script(script);

        let output = result?;
        Ok(SectionOutcome::Ran { output })
    }

    /// Renders `commands` with `$NAME` and `${NAME}` substituted, without running them.
    ///
    /// Values come from the process environment overlaid with the configured
    /// variables. A value that itself starts with `$` is not substituted.
    pub fn plan(&self, condition: &str, commands: &[String]) -> Result<PlannedSection> {
        if !condition::evaluate(condition, &self.env)? {
            return Ok(PlannedSection::Skipped);
        }
        let vars = self.env.merged_with_process();
        Ok(PlannedSection::Lines(
            commands.iter().map(|line| substitute(line, &vars)).collect(),
        ))
    }

    fn script(&self, commands: &[String]) -> String {
        let mut body = String::from("#!/bin/sh\nexec 2>&1\n");
        body.push_str(if self.verbose { "set -e -x\n" } else { "set -e\n" });
        for line in commands {
            body.push_str(line);
            body.push('\n');
        }
        body
    }

    fn spawn(&self, script: &Path) -> Result<String> {
        let output = Command::new(SHELL)
            .arg(script)
            .envs(self.env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        captured.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            tracing::debug!(output = %captured, "Section succeeded");
            Ok(captured)
        } else {
            Err(Error::Execution {
                code: output.status.code(),
                output: captured,
            })
        }
    }
}

fn write_script(body: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("cairn-")
        .suffix(".sh")
        .tempfile()?;
    file.write_all(body.as_bytes())?;
    file.flush()?;
    Ok(file)
}

fn discard_script(script: NamedTempFile) {
    if let Err(e) = script.close() {
        tracing::warn!(error = %e, "Failed to remove transient script");
    }
}

/// Replaces `$NAME` and `${NAME}` references that resolve in `vars`.
///
/// Unknown references are left as written.
fn substitute(line: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) if is_name(&braced[..end]) => (&braced[..end], end + 2),
                _ => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        let reference = &rest[pos..=pos + consumed];
        match vars.get(name).filter(|_| !name.is_empty()) {
            Some(value) if value.starts_with('$') => {
                tracing::warn!(
                    name,
                    value = %value,
                    "Not substituting a value that is itself a variable reference"
                );
                out.push_str(reference);
            }
            Some(value) => out.push_str(value),
            None => out.push_str(reference),
        }
        rest = &rest[pos + 1 + consumed..];
    }

    out.push_str(rest);
    out
}

fn is_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
