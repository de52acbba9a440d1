//! The bisection session: boundary validation and the build/test/label loop.
//!
//! git owns the search. The session builds whatever git checked out, runs the
//! caller's test command, reports the label back, and watches git's output for
//! the convergence announcement. It never predicts the next candidate.

use tracing::{info, instrument, warn};

use crate::core::bisect_output::{BisectOutput, classify_bisect_output};
use crate::core::types::{CandidateOutcome, Commit, CulpritReport, Label, SessionOutcome};
use crate::error::BisectError;
use crate::io::builder::Builder;
use crate::io::config::BisectConfig;
use crate::io::git::GitRepo;
use crate::io::lock::RepoLock;
use crate::io::process::{CommandOutput, CommandRunner, CommandSpec};

/// A bisection session holding exclusive ownership of one repository.
pub struct BisectSession<R: CommandRunner> {
    git: GitRepo,
    builder: Builder,
    runner: R,
    max_steps: u32,
    steps: u32,
    _lock: RepoLock,
}

impl<R: CommandRunner> BisectSession<R> {
    /// Open a session on `config.repo_dir`, failing if another session holds it.
    pub fn open(config: &BisectConfig, runner: R) -> Result<Self, BisectError> {
        Self::with_builder(config, Builder::from_config(config), runner)
    }

    pub fn with_builder(
        config: &BisectConfig,
        builder: Builder,
        runner: R,
    ) -> Result<Self, BisectError> {
        let lock = RepoLock::acquire(&config.repo_dir)?;
        info!(repo = %config.repo_dir.display(), "opened bisect session");
        Ok(Self {
            git: GitRepo::new(&config.repo_dir),
            builder,
            runner,
            max_steps: config.max_steps,
            steps: 0,
            _lock: lock,
        })
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Candidates tested so far, not counting boundaries.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Run `git <args>` against the repository; nonzero exit aborts.
    pub fn run_repo_command(&self, args: &[&str]) -> Result<CommandOutput, BisectError> {
        self.git.run_checked(&self.runner, args)
    }

    /// `git bisect <subcommand>`, returning its stdout.
    pub fn run_bisect_subcommand(&self, subcommand: &str) -> Result<String, BisectError> {
        self.git.bisect(&self.runner, subcommand)
    }

    /// Begin bisection and validate both boundaries, bad first.
    ///
    /// Adjacent boundaries converge immediately; the outcome of marking the
    /// good boundary is returned so the caller can stop early.
    #[instrument(skip_all, fields(good = %good, bad = %bad))]
    pub fn start(
        &mut self,
        good: &Commit,
        bad: &Commit,
        test_command: &[String],
    ) -> Result<CandidateOutcome, BisectError> {
        self.run_bisect_subcommand("start")?;
        self.validate_boundary(bad, Label::Bad, test_command)?;
        let output = self.validate_boundary(good, Label::Good, test_command)?;
        self.interpret(Label::Good, output)
    }

    /// Check out `commit`, build, test, and require the expected label.
    ///
    /// Returns the output of marking the boundary. On mismatch nothing is
    /// reported to git.
    #[instrument(skip_all, fields(commit = %commit, expected = %expected))]
    pub fn validate_boundary(
        &self,
        commit: &Commit,
        expected: Label,
        test_command: &[String],
    ) -> Result<String, BisectError> {
        self.git.checkout(&self.runner, commit)?;
        self.builder
            .build(&self.runner)
            .map_err(|err| attach_commit(err, commit.clone()))?;

        let (observed, exit_code) = self.run_test(test_command)?;
        if observed != expected {
            warn!(%observed, "boundary commit contradicts its label");
            return Err(BisectError::InvalidBoundary {
                commit: commit.clone(),
                expected,
                observed,
                command: test_command.join(" "),
                exit_code,
            });
        }
        info!(label = %observed, "boundary confirmed");
        self.run_bisect_subcommand(observed.as_subcommand())
    }

    /// Build and test the commit git checked out, then report its label.
    #[instrument(skip_all, fields(step = self.steps + 1))]
    pub fn test_candidate(
        &mut self,
        test_command: &[String],
    ) -> Result<CandidateOutcome, BisectError> {
        if let Err(err) = self.builder.build(&self.runner) {
            // Label nothing: a broken build says nothing about the regression.
            return Err(match self.git.head(&self.runner) {
                Ok(commit) => attach_commit(err, commit),
                Err(head_err) => {
                    warn!(err = %head_err, "could not resolve the candidate commit");
                    err
                }
            });
        }
        self.steps += 1;

        let (label, _) = self.run_test(test_command)?;
        info!(%label, "candidate tested");
        let output = self.run_bisect_subcommand(label.as_subcommand())?;
        self.interpret(label, output)
    }

    /// Drive the search from `start` until git names a culprit.
    #[instrument(skip_all)]
    pub fn run(
        &mut self,
        good: &Commit,
        bad: &Commit,
        test_command: &[String],
    ) -> Result<SessionOutcome, BisectError> {
        let mut outcome = self.start(good, bad, test_command)?;
        loop {
            outcome = match outcome {
                CandidateOutcome::Culprit(report) => {
                    info!(commit = %report.commit, steps = report.steps, "culprit found");
                    return Ok(SessionOutcome::Culprit(report));
                }
                CandidateOutcome::Exhausted => {
                    warn!(steps = self.steps, "no testable commits left");
                    return Ok(SessionOutcome::Exhausted { steps: self.steps });
                }
                CandidateOutcome::Continue if self.steps >= self.max_steps => {
                    warn!(
                        max_steps = self.max_steps,
                        "step limit reached without convergence"
                    );
                    return Ok(SessionOutcome::Exhausted { steps: self.steps });
                }
                CandidateOutcome::Continue => self.test_candidate(test_command)?,
            };
        }
    }

    /// Return the repository to its pre-bisect state.
    pub fn reset(&self) -> Result<(), BisectError> {
        self.run_bisect_subcommand("reset")?;
        Ok(())
    }

    fn run_test(&self, test_command: &[String]) -> Result<(Label, Option<i32>), BisectError> {
        let output = self
            .runner
            .execute(&CommandSpec::new(test_command.iter().cloned()))?;
        Ok((Label::from_exit_code(output.exit_code), output.exit_code))
    }

    fn interpret(&self, label: Label, output: String) -> Result<CandidateOutcome, BisectError> {
        match classify_bisect_output(&output) {
            BisectOutput::Culprit(commit) => Ok(CandidateOutcome::Culprit(CulpritReport {
                commit,
                confirmation: output,
                steps: self.steps,
            })),
            BisectOutput::Progress { remaining } => {
                info!(remaining, "bisect continues");
                Ok(CandidateOutcome::Continue)
            }
            BisectOutput::MergeBase => {
                info!("bisect continues with the merge base");
                Ok(CandidateOutcome::Continue)
            }
            BisectOutput::SkipExhausted => Ok(CandidateOutcome::Exhausted),
            BisectOutput::Unrecognized => Err(BisectError::UnrecognizedOutput {
                subcommand: label.as_subcommand().to_string(),
                output,
            }),
        }
    }
}

fn attach_commit(err: BisectError, commit: Commit) -> BisectError {
    match err {
        BisectError::BuildFailure {
            stage,
            command,
            exit_code,
            commit: None,
        } => BisectError::BuildFailure {
            stage,
            command,
            exit_code,
            commit: Some(commit),
        },
        other => other,
    }
}
