// src/tool.rs

//! External command runner with timeout
//!
//! Used for FITS and for format converters. A run that exceeds its timeout
//! is killed and reported as [`CommandOutcome::TimedOut`]; a non-zero exit is
//! reported as a completed run with `success == false`. Neither is an error:
//! callers record the outcome in PREMIS and carry on. Only failing to start
//! the program at all is an [`Error::Tool`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Default timeout for external tools (10 minutes)
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// How a command run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Completed {
        success: bool,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    TimedOut,
}

impl CommandOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Completed { success: true, .. })
    }

    /// One-line summary for logs and PREMIS outcome notes
    pub fn summary(&self) -> String {
        match self {
            Self::Completed {
                success: true,
                code,
                ..
            } => format!("completed with exit code {}", code.unwrap_or(0)),
            Self::Completed { code, stderr, .. } => {
                let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                match stderr.lines().last() {
                    Some(line) => format!("failed with exit code {}: {}", code, line.trim()),
                    None => format!("failed with exit code {}", code),
                }
            }
            Self::TimedOut => "timed out and was terminated".to_string(),
        }
    }
}

/// A fully rendered command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run to completion or until the timeout
    ///
    /// Output goes to anonymous temporary files rather than pipes, so a
    /// chatty tool can never block on a full pipe while we wait on it.
    pub fn run(&self) -> Result<CommandOutcome> {
        debug!("Running {} {:?}", self.program, self.args);

        let mut stdout_file = tempfile::tempfile()?;
        let mut stderr_file = tempfile::tempfile()?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file.try_clone()?))
            .stderr(Stdio::from(stderr_file.try_clone()?))
            .spawn()
            .map_err(|e| Error::Tool(format!("failed to start {}: {}", self.program, e)))?;

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                warn!(
                    "{} timed out after {} seconds, terminating",
                    self.program,
                    self.timeout.as_secs()
                );
                let _ = child.kill();
                let _ = child.wait();
                return Ok(CommandOutcome::TimedOut);
            }
        };

        Ok(CommandOutcome::Completed {
            success: status.success(),
            code: status.code(),
            stdout: read_back(&mut stdout_file)?,
            stderr: read_back(&mut stderr_file)?,
        })
    }
}

fn read_back(file: &mut std::fs::File) -> Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// A configured command with `{placeholder}` arguments
///
/// ```toml
/// [tools.converters.pdf]
/// program = "soffice"
/// args = ["--headless", "--convert-to", "pdf", "--outdir", "{outdir}", "{input}"]
/// output = "{outdir}/{stem}.pdf"
/// extension = ".pdf"
/// timeout_secs = 300
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Where the tool leaves its result, when that is not `{output}`
    #[serde(default)]
    pub output: Option<String>,
    /// Presform extension for converters, e.g. `.pdf`
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl CommandTemplate {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            output: None,
            extension: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Substitute `{name}` placeholders and build the command
    pub fn render(&self, values: &HashMap<&str, String>) -> ExternalCommand {
        let args = self.args.iter().map(|arg| substitute(arg, values)).collect();
        ExternalCommand::new(substitute(&self.program, values), args)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }

    /// Rendered output location, falling back to `{output}`
    pub fn render_output(&self, values: &HashMap<&str, String>) -> Option<String> {
        match &self.output {
            Some(template) => Some(substitute(template, values)),
            None => values.get("output").cloned(),
        }
    }
}

fn substitute(template: &str, values: &HashMap<&str, String>) -> String {
    values.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let template = CommandTemplate::new("fits", &["-i", "{input}", "-o", "{output}"]);
        let values = HashMap::from([
            ("input", "/data/a.txt".to_string()),
            ("output", "/tmp/a.fits.xml".to_string()),
        ]);
        let command = template.render(&values);
        assert_eq!(command.program, "fits");
        assert_eq!(command.args, vec!["-i", "/data/a.txt", "-o", "/tmp/a.fits.xml"]);
        assert_eq!(command.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(template.render_output(&values).as_deref(), Some("/tmp/a.fits.xml"));
    }

    #[test]
    fn test_run_success_and_failure() {
        let ok = ExternalCommand::new("sh", vec!["-c".into(), "echo hello".into()])
            .run()
            .unwrap();
        assert!(ok.succeeded());
        if let CommandOutcome::Completed { stdout, .. } = &ok {
            assert_eq!(stdout.trim(), "hello");
        }

        let failed = ExternalCommand::new("sh", vec!["-c".into(), "echo boom >&2; exit 3".into()])
            .run()
            .unwrap();
        assert!(!failed.succeeded());
        assert_eq!(failed.summary(), "failed with exit code 3: boom");
    }

    #[test]
    fn test_timeout_kills() {
        let outcome = ExternalCommand::new("sleep", vec!["5".into()])
            .with_timeout(Duration::from_millis(100))
            .run()
            .unwrap();
        assert_eq!(outcome, CommandOutcome::TimedOut);
    }

    #[test]
    fn test_missing_program() {
        let err = ExternalCommand::new("/nonexistent/tool", Vec::new()).run().unwrap_err();
        assert!(matches!(err, Error::Tool(_)));
    }
}
