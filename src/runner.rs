//! Execution of non-builtin stages through a system command interpreter.

use crate::command::PipelineBuffer;
use crate::env::Environment;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use thiserror::Error;
use tracing::debug;

/// Failures that keep an external stage from running at all.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Pipe or process creation failed; nothing was executed.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    /// The child could not be reaped or its output could not be read.
    #[error("failed to collect output of `{command}`: {source}")]
    Collect {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Capability to run one external pipeline stage.
///
/// The runner receives the stage exactly as typed and replaces `buffer` with the
/// command's standard output. On error the buffer must be left untouched.
pub trait ProcessRunner {
    fn run(
        &self,
        command_line: &str,
        buffer: &mut PipelineBuffer,
        env: &Environment,
    ) -> Result<(), RunnerError>;
}

/// Runs stages with `<shell> -c <stage>`, feeding the buffer to stdin.
///
/// Input is written from a scoped thread while the output is drained, so a child
/// that produces a lot of output before reading its input cannot deadlock the
/// shell, and output is collected in full unless `output_limit` is set.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
    output_limit: Option<usize>,
}

impl ShellRunner {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            output_limit: None,
        }
    }

    /// Truncate every command's output to at most `limit` bytes.
    pub fn with_output_limit(mut self, limit: Option<usize>) -> Self {
        self.output_limit = limit;
        self
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("/bin/sh")
    }
}

impl ProcessRunner for ShellRunner {
    fn run(
        &self,
        command_line: &str,
        buffer: &mut PipelineBuffer,
        env: &Environment,
    ) -> Result<(), RunnerError> {
        debug!(command_line, input_len = buffer.len(), "spawning external command");
        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(command_line)
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                command: command_line.to_owned(),
                source,
            })?;

        let stdin = child.stdin.take();
        let input = buffer.as_slice();
        let output = thread::scope(|scope| {
            if let Some(mut stdin) = stdin {
                scope.spawn(move || {
                    // A child that exits without reading closes the pipe early.
                    if let Err(err) = stdin.write_all(input) {
                        debug!("stdin not fully consumed: {err}");
                    }
                });
            }
            child.wait_with_output()
        })
        .map_err(|source| RunnerError::Collect {
            command: command_line.to_owned(),
            source,
        })?;

        log_status(command_line, output.status);
        let mut stdout = output.stdout;
        if let Some(limit) = self.output_limit {
            stdout.truncate(limit);
        }
        *buffer = stdout;
        Ok(())
    }
}

fn log_status(command_line: &str, status: ExitStatus) {
    if !status.success() {
        debug!(command_line, %status, "external command failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_env() -> Environment {
        Environment {
            vars: std::env::vars().collect::<HashMap<_, _>>(),
            current_dir: std::env::temp_dir(),
            should_exit: false,
        }
    }

    fn run(command_line: &str, input: &str) -> Result<String, RunnerError> {
        let mut buffer = input.as_bytes().to_vec();
        ShellRunner::default().run(command_line, &mut buffer, &test_env())?;
        Ok(String::from_utf8(buffer).unwrap())
    }

    #[test]
    #[cfg(unix)]
    fn output_replaces_buffer() {
        assert_eq!(run("echo hi", "previous\n").unwrap(), "hi\n");
    }

    #[test]
    #[cfg(unix)]
    fn buffer_is_fed_to_stdin() {
        assert_eq!(run("cat", "a\nb\n").unwrap(), "a\nb\n");
        assert_eq!(run("wc -l | tr -d ' '", "a\nb\nc\n").unwrap(), "3\n");
    }

    #[test]
    #[cfg(unix)]
    fn quoting_is_left_to_the_shell() {
        assert_eq!(run("printf '%s|%s\\n' 'x y' z", "").unwrap(), "x y|z\n");
    }

    #[test]
    #[cfg(unix)]
    fn large_output_is_not_truncated() {
        let input: String = (0..20_000).map(|n| format!("line {n}\n")).collect();
        let out = run("cat", &input).unwrap();
        assert_eq!(out.len(), input.len());
    }

    #[test]
    #[cfg(unix)]
    fn output_limit_truncates() {
        let mut buffer = Vec::new();
        ShellRunner::default()
            .with_output_limit(Some(3))
            .run("echo hello", &mut buffer, &test_env())
            .unwrap();
        assert_eq!(buffer, b"hel");
    }

    #[test]
    #[cfg(unix)]
    fn failing_command_yields_its_output() {
        assert_eq!(run("echo partial; exit 3", "").unwrap(), "partial\n");
        assert_eq!(run("command_that_does_not_exist_pipesh 2>/dev/null", "in").unwrap(), "");
    }

    #[test]
    #[cfg(unix)]
    fn runs_in_session_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = test_env();
        env.current_dir = std::fs::canonicalize(dir.path()).unwrap();
        let mut buffer = Vec::new();
        ShellRunner::default().run("pwd", &mut buffer, &env).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap().trim_end(),
            env.current_dir.to_string_lossy()
        );
    }

    #[test]
    fn spawn_failure_leaves_buffer_untouched() {
        let mut buffer = b"keep".to_vec();
        let err = ShellRunner::new("/nonexistent/shell/for/pipesh")
            .run("echo hi", &mut buffer, &test_env())
            .unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }));
        assert_eq!(buffer, b"keep");
    }
}
