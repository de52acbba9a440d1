//! Shared deterministic types for the bisection core.
//!
//! These types carry no I/O. The search state itself lives in git; nothing
//! here duplicates it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque revision identifier handed to git.
///
/// Usually a full hash, but any revision git accepts works for boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commit(String);

impl Commit {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classification of a tested commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Regression absent.
    Good,
    /// Regression present.
    Bad,
}

impl Label {
    /// Exit code 0 is good; any other code, or death by signal, is bad.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Label::Good,
            _ => Label::Bad,
        }
    }

    /// The `git bisect` subcommand that records this label.
    pub fn as_subcommand(self) -> &'static str {
        match self {
            Label::Good => "good",
            Label::Bad => "bad",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_subcommand())
    }
}

/// The first commit exhibiting the regression, as announced by git.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CulpritReport {
    pub commit: Commit,
    /// Raw `git bisect` output the commit was extracted from.
    pub confirmation: String,
    /// Candidate commits built and tested after the boundaries.
    pub steps: u32,
}

/// Result of one labeling step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    /// git announced convergence.
    Culprit(CulpritReport),
    /// git checked out another candidate.
    Continue,
    /// git ran out of testable commits without naming a culprit.
    Exhausted,
}

/// Terminal state of a completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Culprit(CulpritReport),
    /// The search stopped without a convergence announcement.
    Exhausted { steps: u32 },
}
