//! Fatal conditions that abort a bisection session.
//!
//! Every variant is terminal. Nothing in this crate catches a [`BisectError`]
//! and retries: a culprit report is only as trustworthy as each build and test
//! outcome that led to it.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::{Commit, Label};

#[derive(Debug, Error)]
pub enum BisectError {
    /// Required configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The external command could not be started at all.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The checkout or build-install step exited nonzero.
    #[error("{stage} step `{command}` failed with exit code {exit_code:?}{}", describe_commit(.commit))]
    BuildFailure {
        stage: BuildStage,
        command: String,
        exit_code: Option<i32>,
        /// Commit under test, when known.
        commit: Option<Commit>,
    },

    /// A boundary commit's test outcome contradicts the label it was given.
    #[error(
        "test command `{command}` returned {exit_code:?} on the {expected} boundary commit {commit} (observed {observed})"
    )]
    InvalidBoundary {
        commit: Commit,
        expected: Label,
        observed: Label,
        command: String,
        exit_code: Option<i32>,
    },

    /// A git invocation exited nonzero.
    #[error("`{command}` failed with exit code {exit_code:?}: {}", .stderr.trim())]
    Subcommand {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// `git bisect` printed something that is neither progress nor convergence.
    #[error("unrecognized `git bisect {subcommand}` output: {}", .output.trim())]
    UnrecognizedOutput { subcommand: String, output: String },

    /// Another session holds the repository lock.
    #[error("repository {} is already being bisected (lock {} is held)", .repo.display(), .lock_path.display())]
    RepositoryBusy { repo: PathBuf, lock_path: PathBuf },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Step of [`crate::io::builder::Builder::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Checkout,
    Install,
}

impl std::fmt::Display for BuildStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildStage::Checkout => f.write_str("checkout"),
            BuildStage::Install => f.write_str("build-install"),
        }
    }
}

fn describe_commit(commit: &Option<Commit>) -> String {
    match commit {
        Some(commit) => format!(" at commit {commit}"),
        None => String::new(),
    }
}

impl BisectError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BisectError::Io {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_failure_names_stage_and_commit() {
        let err = BisectError::BuildFailure {
            stage: BuildStage::Install,
            command: "ninja -C /work/llvm-stage2 install".to_string(),
            exit_code: Some(1),
            commit: Some(Commit::new("abc123")),
        };
        let msg = err.to_string();
        assert!(msg.contains("build-install step"));
        assert!(msg.ends_with("at commit abc123"));
    }

    #[test]
    fn invalid_boundary_names_labels() {
        let err = BisectError::InvalidBoundary {
            commit: Commit::new("good_commit"),
            expected: Label::Good,
            observed: Label::Bad,
            command: "testcommand".to_string(),
            exit_code: Some(1),
        };
        let msg = err.to_string();
        assert!(msg.contains("good boundary commit good_commit"));
        assert!(msg.contains("observed bad"));
    }
}
