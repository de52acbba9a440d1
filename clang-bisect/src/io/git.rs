//! Git adapter for bisection.
//!
//! Every invocation goes through a [`CommandRunner`] so the session can be
//! driven by scripted runners in tests.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::core::types::Commit;
use crate::error::BisectError;
use crate::io::process::{CommandOutput, CommandRunner, CommandSpec};

/// Wrapper for executing git commands in a repository.
#[derive(Debug, Clone)]
pub struct GitRepo {
    workdir: PathBuf,
}

impl GitRepo {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Run `git <args>` in the repository; a nonzero exit is fatal.
    #[instrument(skip_all, fields(args = %args.join(" ")))]
    pub fn run_checked<R: CommandRunner>(
        &self,
        runner: &R,
        args: &[&str],
    ) -> Result<CommandOutput, BisectError> {
        let spec = self.command(args);
        let output = runner.execute(&spec)?;
        if !output.success() {
            warn!(exit_code = ?output.exit_code, "git command failed");
            return Err(BisectError::Subcommand {
                command: spec.display(),
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        debug!("git command succeeded");
        Ok(output)
    }

    /// `git checkout <commit>`.
    pub fn checkout<R: CommandRunner>(&self, runner: &R, commit: &Commit) -> Result<(), BisectError> {
        self.run_checked(runner, &["checkout", commit.as_str()])?;
        Ok(())
    }

    /// `git bisect <subcommand>`, returning stdout.
    pub fn bisect<R: CommandRunner>(
        &self,
        runner: &R,
        subcommand: &str,
    ) -> Result<String, BisectError> {
        let output = self.run_checked(runner, &["bisect", subcommand])?;
        Ok(output.stdout)
    }

    /// Full hash of the current checkout.
    pub fn head<R: CommandRunner>(&self, runner: &R) -> Result<Commit, BisectError> {
        let output = self.run_checked(runner, &["rev-parse", "HEAD"])?;
        Ok(Commit::new(output.stdout.trim()))
    }

    fn command(&self, args: &[&str]) -> CommandSpec {
        let argv = std::iter::once("git").chain(args.iter().copied());
        CommandSpec::new(argv).current_dir(&self.workdir)
    }
}
