//! Test-only helpers: a scripted command runner and a throwaway git repository.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};

use crate::error::BisectError;
use crate::io::config::{BisectConfig, FileConfig};
use crate::io::process::{CommandOutput, CommandRunner, CommandSpec};

/// Output with the given exit code and no text.
pub fn exit(code: i32) -> CommandOutput {
    CommandOutput {
        exit_code: Some(code),
        ..CommandOutput::default()
    }
}

/// Successful output with the given stdout.
pub fn stdout(text: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(0),
        stdout: text.to_string(),
        stderr: String::new(),
    }
}

#[derive(Debug)]
enum Matcher {
    Args(Vec<String>),
    Program(String),
    SpawnFailure(String),
}

#[derive(Debug)]
struct Rule {
    matcher: Matcher,
    /// Popped per call; the last response repeats.
    responses: RefCell<VecDeque<CommandOutput>>,
}

/// [`CommandRunner`] that records invocations and replays scripted outputs.
///
/// Exact argv rules win over program rules. Unmatched commands succeed with
/// empty output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    calls: RefCell<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_args(self, argv: &[&str], output: CommandOutput) -> Self {
        self.on_args_seq(argv, vec![output])
    }

    pub fn on_args_seq(mut self, argv: &[&str], outputs: Vec<CommandOutput>) -> Self {
        self.rules.push(Rule {
            matcher: Matcher::Args(argv.iter().map(|s| s.to_string()).collect()),
            responses: RefCell::new(outputs.into()),
        });
        self
    }

    pub fn on_program(mut self, program: &str, output: CommandOutput) -> Self {
        self.rules.push(Rule {
            matcher: Matcher::Program(program.to_string()),
            responses: RefCell::new(VecDeque::from([output])),
        });
        self
    }

    /// Make spawning `program` fail as if the executable were missing.
    pub fn missing_program(mut self, program: &str) -> Self {
        self.rules.push(Rule {
            matcher: Matcher::SpawnFailure(program.to_string()),
            responses: RefCell::new(VecDeque::new()),
        });
        self
    }

    pub fn specs(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.calls
            .borrow()
            .iter()
            .map(|spec| spec.argv.clone())
            .collect()
    }

    fn find_rule(&self, argv: &[String]) -> Option<&Rule> {
        let program = argv.first().map(String::as_str).unwrap_or_default();
        self.rules
            .iter()
            .find(|rule| matches!(&rule.matcher, Matcher::Args(expected) if expected == argv))
            .or_else(|| {
                self.rules.iter().find(|rule| match &rule.matcher {
                    Matcher::Program(p) | Matcher::SpawnFailure(p) => p == program,
                    Matcher::Args(_) => false,
                })
            })
    }
}

impl CommandRunner for ScriptedRunner {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, BisectError> {
        self.calls.borrow_mut().push(spec.clone());
        let Some(rule) = self.find_rule(&spec.argv) else {
            return Ok(exit(0));
        };
        if let Matcher::SpawnFailure(_) = rule.matcher {
            return Err(BisectError::Spawn {
                command: spec.display(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted missing"),
            });
        }
        let mut responses = rule.responses.borrow_mut();
        let output = if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        };
        Ok(output.unwrap_or_else(|| exit(0)))
    }
}

pub fn config_at(src: &Path, work: &Path, file: FileConfig) -> BisectConfig {
    BisectConfig::resolve(Some(src.to_path_buf()), Some(work.to_path_buf()), file)
        .expect("test config resolves")
}

/// Temporary git repository with a linear history.
///
/// Commit `i` writes `state.txt`; commits at or after `regress_at` contain the
/// word `regression`.
pub struct TestRepo {
    // Keep the tempdir alive for the repo lifetime.
    _temp: tempfile::TempDir,
    src: PathBuf,
    commits: Vec<String>,
}

impl TestRepo {
    pub const SUBDIR: &'static str = "llvm-project";

    pub fn with_history(len: usize, regress_at: usize) -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        let src = temp.path().join("src");
        let root = src.join(Self::SUBDIR);
        fs::create_dir_all(&root).with_context(|| format!("create {}", root.display()))?;

        run_git(&root, &["init", "--quiet"])?;
        run_git(&root, &["config", "user.name", "Bisect Test"])?;
        run_git(&root, &["config", "user.email", "bisect-test@local.invalid"])?;
        run_git(&root, &["config", "commit.gpgsign", "false"])?;

        let mut commits = Vec::with_capacity(len);
        for i in 0..len {
            let state = if i >= regress_at { "regression" } else { "ok" };
            fs::write(root.join("state.txt"), format!("{i} {state}\n"))
                .context("write state.txt")?;
            run_git(&root, &["add", "state.txt"])?;
            run_git(&root, &["commit", "--quiet", "-m", &format!("commit {i}")])?;
            commits.push(run_git(&root, &["rev-parse", "HEAD"])?);
        }

        Ok(Self {
            _temp: temp,
            src,
            commits,
        })
    }

    pub fn src(&self) -> &Path {
        &self.src
    }

    pub fn root(&self) -> PathBuf {
        self.src.join(Self::SUBDIR)
    }

    pub fn commit(&self, index: usize) -> &str {
        &self.commits[index]
    }

    pub fn head(&self) -> Result<String> {
        run_git(&self.root(), &["rev-parse", "HEAD"])
    }

    /// Commit on a new branch forked from commit `from`, leaving the original
    /// branch checked out. `state.txt` keeps its content at `from`.
    pub fn side_branch(&self, from: usize) -> Result<String> {
        let root = self.root();
        run_git(&root, &["checkout", "--quiet", "-b", "side", self.commit(from)])?;
        fs::write(root.join("side.txt"), "side\n").context("write side.txt")?;
        run_git(&root, &["add", "side.txt"])?;
        run_git(&root, &["commit", "--quiet", "-m", "side commit"])?;
        let hash = run_git(&root, &["rev-parse", "HEAD"])?;
        run_git(&root, &["checkout", "--quiet", "-"])?;
        Ok(hash)
    }
}

fn run_git(root: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
