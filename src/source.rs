// Status source: runs the status command and parses its JSON output
//
// The command is a black box. Failing to start it, a non-zero exit, and
// unparseable output are reported as distinct SourceError variants so the
// driver can log what went wrong before the next poll.

use std::fmt;
use std::io;
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use ts_status_stats_core::RawDocument;

/// Errors raised while obtaining a status document
#[derive(Debug, Error)]
pub enum SourceError {
    /// The program is not installed or not on PATH
    #[error("'{program}' command not found. Is Tailscale installed?")]
    NotFound { program: String },

    /// The program exists but could not be started
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The program ran and exited unsuccessfully
    #[error("Failed to run '{command}' ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The program's output is not a JSON document
    #[error("Failed to parse status JSON from '{command}': {source}")]
    Malformed {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SourceError {
    /// True when the command could not produce output at all.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, SourceError::Malformed { .. })
    }
}

/// Anything that can produce a status document on demand.
pub trait StatusSource {
    fn fetch(&self) -> Result<RawDocument, SourceError>;
}

/// Runs an external command and parses its stdout as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
}

impl CommandSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `tailscale status --json`
    pub fn tailscale() -> Self {
        Self::new("tailscale", vec!["status".to_string(), "--json".to_string()])
    }

    /// Build from an argv-style list. Returns `None` when `argv` is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

impl StatusSource for CommandSource {
    fn fetch(&self) -> Result<RawDocument, SourceError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => SourceError::NotFound {
                    program: self.program.clone(),
                },
                _ => SourceError::Spawn {
                    program: self.program.clone(),
                    source,
                },
            })?;

        if !output.status.success() {
            return Err(SourceError::CommandFailed {
                command: self.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|source| SourceError::Malformed {
            command: self.to_string(),
            source,
        })
    }
}
