//! Subprocess execution for the command-line backend.
//!
//! # Design
//! `CommandRunner` is the seam between the command backend and the host
//! process table, so tests can count spawns with a fake. `ShellRunner` runs
//! the assembled command through the host interpreter and drains its stdout
//! in fixed-size chunks into a `GrowableBuffer`.
//!
//! A command that exits without writing anything yields an empty buffer; only
//! a failure to start the interpreter is an error. The exit status is logged
//! and otherwise ignored, matching how curl without `--fail` behaves.

use std::process::{Command, Stdio};

use crate::buffer::{read_chunks, GrowableBuffer};
use crate::error::{HttpError, Result};

/// Runs a fully assembled command line and returns its standard output.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str) -> Result<GrowableBuffer>;
}

/// Runs commands through `sh -c` (`cmd /C` on Windows).
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    flag: String,
}

impl ShellRunner {
    pub fn new() -> Self {
        if cfg!(windows) {
            Self::with_shell("cmd", "/C")
        } else {
            Self::with_shell("sh", "-c")
        }
    }

    /// Use `shell flag <command>` instead of the platform interpreter.
    pub fn with_shell(shell: &str, flag: &str) -> Self {
        Self {
            shell: shell.to_string(),
            flag: flag.to_string(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> Result<GrowableBuffer> {
        tracing::debug!(command, "executing");
        let mut child = Command::new(&self.shell)
            .arg(&self.flag)
            .arg(command)
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| HttpError::Subprocess(format!("{}: {e}", self.shell)))?;

        // The pipe is dropped by `read_chunks` before the child is reaped.
        let output = match child.stdout.take() {
            Some(stdout) => read_chunks(stdout, |e| {
                HttpError::Subprocess(format!("reading command output: {e}"))
            }),
            None => Err(HttpError::Subprocess("stdout was not captured".to_string())),
        };

        match child.wait() {
            Ok(status) if !status.success() => {
                tracing::warn!(%status, "HTTP command exited unsuccessfully");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "failed to reap HTTP command"),
        }

        let output = output?;
        tracing::debug!(bytes = output.len(), "read command output");
        Ok(output)
    }
}
