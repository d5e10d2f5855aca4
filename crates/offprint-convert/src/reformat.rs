//! Best-effort source reformatting before rendering.
//!
//! Formatting is cosmetic: callers keep the original source when a
//! formatter fails, and a notebook in a language the formatter does not
//! understand is left alone entirely.

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

/// Errors from a formatter run. Callers log these at debug level and keep
/// the unformatted source.
#[derive(Debug, thiserror::Error)]
pub enum ReformatError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// A text-to-text source beautifier for one language.
pub trait SourceFormatter {
    /// Language the formatter understands. Reformatting is skipped for
    /// notebooks declaring any other language.
    fn language(&self) -> &str;

    /// Reformat the given source.
    fn reformat(&self, source: &str) -> Result<String, ReformatError>;
}

/// Pipes source through an external formatter process: the source goes to
/// stdin, the formatted text comes back on stdout.
pub struct CommandFormatter {
    language: String,
    program: String,
    args: Vec<String>,
}

impl CommandFormatter {
    pub fn new(language: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument to the formatter command line.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The conventional Python setup: `black` in quiet mode, reading from
    /// stdin, wrapping at 79 columns.
    pub fn black() -> Self {
        Self::new("python", "black")
            .arg("-q")
            .arg("-l")
            .arg("79")
            .arg("-")
    }

    fn spawn_error(&self, source: std::io::Error) -> ReformatError {
        ReformatError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl SourceFormatter for CommandFormatter {
    fn language(&self) -> &str {
        &self.language
    }

    fn reformat(&self, source: &str) -> Result<String, ReformatError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| self.spawn_error(err))?;

        // Same shape as the executor: the write runs on its own thread so
        // draining stdout cannot deadlock against an oversized cell.
        let writer = child.stdin.take().map(|mut stdin| {
            let source = source.as_bytes().to_vec();
            thread::spawn(move || stdin.write_all(&source))
        });

        let output = child.wait_with_output().map_err(|err| self.spawn_error(err))?;

        if let Some(writer) = writer {
            if let Ok(Err(err)) = writer.join() {
                // A formatter that bails before draining stdin reports its
                // failure through the exit status instead.
                if err.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(self.spawn_error(err));
                }
            }
        }

        if !output.status.success() {
            return Err(ReformatError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
