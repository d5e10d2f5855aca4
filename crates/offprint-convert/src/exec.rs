//! The execution seam: how cell source turns into output records.
//!
//! The driver never talks to an interpreter directly; it drives a
//! [`CellExecutor`] session handed in by the host. The bundled
//! [`CommandExecutor`] pipes cells through an external interpreter
//! process, which covers simple notebooks; hosts with a real kernel
//! protocol implement the trait themselves.

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use offprint_notebook::Output;

/// Errors surfaced by an execution session. Code *raising* an error is
/// not a session failure; that comes back as an [`Output::Error`] record
/// and the configuration decides what happens to it.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    /// The session's backing process could not be driven.
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The session itself reported a failure.
    #[error("Execution session failed: {0}")]
    Session(String),
}

/// A stateful execution session. One session serves one notebook: cells
/// run through it strictly in document order, and sessions must not be
/// shared across notebooks or interpreter state would leak between
/// unrelated documents.
pub trait CellExecutor {
    /// Run one cell's source and return its output records in order.
    fn execute(&mut self, source: &str) -> Result<Vec<Output>, ExecuteError>;
}

/// Runs each cell through an external interpreter process.
///
/// The program receives the cell source on stdin. Stdout and stderr
/// become stream records and a non-zero exit becomes an error record with
/// stderr as its traceback. Each cell spawns a fresh process, so state
/// carries across cells only if the configured command provides it; a
/// kernel-backed [`CellExecutor`] is the seam for real single-session
/// semantics.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
}

impl CommandExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument to the interpreter command line.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn spawn_error(&self, source: std::io::Error) -> ExecuteError {
        ExecuteError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl CellExecutor for CommandExecutor {
    fn execute(&mut self, source: &str) -> Result<Vec<Output>, ExecuteError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| self.spawn_error(err))?;

        // Stdin is written from its own thread while `wait_with_output`
        // drains the output pipes; a single-threaded write deadlocks once
        // both the cell and its output outgrow the pipe buffers.
        let writer = child.stdin.take().map(|mut stdin| {
            let source = source.as_bytes().to_vec();
            thread::spawn(move || stdin.write_all(&source))
        });

        let result = child.wait_with_output().map_err(|err| self.spawn_error(err))?;

        if let Some(writer) = writer {
            if let Ok(Err(err)) = writer.join() {
                // An interpreter that exits before draining stdin reports
                // its failure through the exit status instead.
                if err.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(self.spawn_error(err));
                }
            }
        }

        let mut outputs = Vec::new();
        let stdout = String::from_utf8_lossy(&result.stdout);
        if !stdout.is_empty() {
            outputs.push(Output::Stream {
                name: "stdout".to_string(),
                text: stdout.into_owned(),
            });
        }

        let stderr = String::from_utf8_lossy(&result.stderr);
        if result.status.success() {
            if !stderr.is_empty() {
                outputs.push(Output::Stream {
                    name: "stderr".to_string(),
                    text: stderr.into_owned(),
                });
            }
        } else {
            outputs.push(Output::Error {
                ename: self.program.clone(),
                evalue: result.status.to_string(),
                traceback: stderr.lines().map(str::to_string).collect(),
            });
        }

        Ok(outputs)
    }
}
