//! Synchronous child process execution with live echo.
//!
//! The [`CommandRunner`] trait decouples the session from real processes.
//! Tests use scripted runners that record every invocation without spawning.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use tracing::{debug, error, instrument, warn};

use crate::core::env::EnvMap;
use crate::error::BisectError;

/// An external command to run to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub argv: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// When set, the child gets exactly this environment.
    pub env: Option<EnvMap>,
}

impl CommandSpec {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            cwd: None,
            env: None,
        }
    }

    pub fn current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, env: EnvMap) -> Self {
        self.env = Some(env);
        self
    }

    /// Shell-ish rendering for logs and error messages.
    pub fn display(&self) -> String {
        self.argv.join(" ")
    }
}

/// Captured child process output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the child was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs external commands to completion.
///
/// A nonzero exit is reported in [`CommandOutput`], not as an error; only a
/// failure to start the process is an `Err`.
pub trait CommandRunner {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, BisectError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, BisectError> {
        (**self).execute(spec)
    }
}

/// Runner that spawns real processes and echoes their output to stderr.
///
/// There is no timeout: a hung build or test blocks until it exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner {
    /// Suppress the live echo (output is still captured).
    pub quiet: bool,
}

impl CommandRunner for SystemRunner {
    #[instrument(skip_all, fields(command = %spec.display()))]
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, BisectError> {
        let (program, args) = spec.argv.split_first().ok_or_else(|| BisectError::Spawn {
            command: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv"),
        })?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        if let Some(env) = &spec.env {
            cmd.env_clear().envs(env.iter());
        }

        debug!("spawning child process");
        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                error!(err = %e, "failed to spawn command");
                return Err(BisectError::Spawn {
                    command: spec.display(),
                    source: e,
                });
            }
        };

        let stdout = child.stdout.take().ok_or_else(|| {
            BisectError::io("capture stdout", std::io::Error::other("stdout was not piped"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            BisectError::io("capture stderr", std::io::Error::other("stderr was not piped"))
        })?;

        let quiet = self.quiet;
        let stdout_handle = thread::spawn(move || read_stream_with_echo(stdout, quiet));
        let stderr_handle = thread::spawn(move || read_stream_with_echo(stderr, quiet));

        let status = child
            .wait()
            .map_err(|e| BisectError::io(format!("wait for `{}`", spec.display()), e))?;

        let stdout = join_output(stdout_handle, "stdout")?;
        let stderr = join_output(stderr_handle, "stderr")?;

        debug!(exit_code = ?status.code(), "command finished");
        Ok(CommandOutput {
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}

fn join_output(
    handle: thread::JoinHandle<std::io::Result<Vec<u8>>>,
    stream: &str,
) -> Result<Vec<u8>, BisectError> {
    match handle.join() {
        Ok(result) => result.map_err(|e| BisectError::io(format!("read {stream}"), e)),
        Err(_) => Err(BisectError::io(
            format!("read {stream}"),
            std::io::Error::other("output reader thread panicked"),
        )),
    }
}

/// Read a stream to the end, echoing each line to stderr as it arrives.
fn read_stream_with_echo<R: Read>(reader: R, quiet: bool) -> std::io::Result<Vec<u8>> {
    let mut buf_reader = BufReader::new(reader);
    let mut collected = Vec::new();

    loop {
        let mut line = Vec::new();
        let n = buf_reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }
        if !quiet {
            let mut echo = std::io::stderr().lock();
            if let Err(e) = echo.write_all(&line).and_then(|()| echo.flush()) {
                warn!(err = %e, "failed to echo child output");
            }
        }
        collected.extend_from_slice(&line);
    }

    Ok(collected)
}

/// Collect an [`EnvMap`] from string pairs.
pub fn env_from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> EnvMap {
    pairs
        .into_iter()
        .map(|(k, v)| (OsString::from(k), OsString::from(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> SystemRunner {
        SystemRunner { quiet: true }
    }

    #[test]
    fn captures_exit_code_and_streams() {
        let spec = CommandSpec::new(["sh", "-c", "echo out; echo err >&2; exit 3"]);
        let output = quiet().execute(&spec).expect("execute");
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert!(!output.success());
    }

    #[test]
    fn runs_in_requested_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spec = CommandSpec::new(["pwd"]).current_dir(temp.path());
        let output = quiet().execute(&spec).expect("execute");
        let expected = temp.path().canonicalize().expect("canonicalize");
        let actual = std::path::Path::new(output.stdout.trim())
            .canonicalize()
            .expect("canonicalize");
        assert_eq!(actual, expected);
    }

    #[test]
    fn replaces_environment_when_given() {
        let path = std::env::var("PATH").unwrap_or_default();
        let env = env_from_pairs([("PATH", path.as_str()), ("ONLY_VAR", "yes")]);
        let spec = CommandSpec::new(["sh", "-c", "echo ${ONLY_VAR}-${HOME:-unset}"]).env(env);
        let output = quiet().execute(&spec).expect("execute");
        assert_eq!(output.stdout.trim(), "yes-unset");
    }

    #[test]
    fn missing_executable_is_spawn_error() {
        let spec = CommandSpec::new(["clang-bisect-definitely-missing-binary"]);
        let err = quiet().execute(&spec).expect_err("spawn should fail");
        assert!(matches!(err, BisectError::Spawn { .. }));
    }

    #[test]
    fn empty_argv_is_spawn_error() {
        let spec = CommandSpec::new(Vec::<String>::new());
        let err = quiet().execute(&spec).expect_err("empty argv");
        assert!(matches!(err, BisectError::Spawn { .. }));
    }
}
