//! Interpretation of `git bisect` announcements.
//!
//! The text format belongs to git, so matching is line-anchored and narrow:
//! a 40-character hash only counts when it opens the convergence line.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::Commit;

static CULPRIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([0-9a-f]{40}) is the first (?:good|bad) commit\s*$")
        .expect("culprit regex compiles")
});

static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Bisecting: (\d+) revisions? left to test after this")
        .expect("progress regex compiles")
});

static MERGE_BASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Bisecting: a merge base must be tested\s*$")
        .expect("merge base regex compiles")
});

const SKIP_EXHAUSTED_MARKER: &str = "There are only 'skip'ped commits left to test.";

/// Classified output of one `git bisect good|bad` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BisectOutput {
    /// Search converged on this commit.
    Culprit(Commit),
    /// git checked out a new candidate; `remaining` is its own estimate.
    Progress { remaining: u64 },
    /// The good commit is not an ancestor of the bad one; git checked out
    /// their merge base for testing.
    MergeBase,
    /// Only skipped commits remain; no single culprit can be named.
    SkipExhausted,
    Unrecognized,
}

/// Extract the culprit hash from a convergence announcement, if present.
pub fn find_culprit(text: &str) -> Option<Commit> {
    CULPRIT_RE
        .captures(text)
        .map(|caps| Commit::new(&caps[1]))
}

pub fn classify_bisect_output(text: &str) -> BisectOutput {
    if let Some(commit) = find_culprit(text) {
        return BisectOutput::Culprit(commit);
    }
    if let Some(caps) = PROGRESS_RE.captures(text) {
        // The group is all digits; only overflow can fail.
        let remaining = caps[1].parse().unwrap_or(u64::MAX);
        return BisectOutput::Progress { remaining };
    }
    if MERGE_BASE_RE.is_match(text) {
        return BisectOutput::MergeBase;
    }
    if text.lines().any(|line| line.trim() == SKIP_EXHAUSTED_MARKER) {
        return BisectOutput::SkipExhausted;
    }
    BisectOutput::Unrecognized
}

#[cfg(test)]
mod tests {
    use super::*;

    const CULPRIT_TEXT: &str = include_str!("../../tests/data/culprit-commit.txt");
    const PROGRESS_TEXT: &str = include_str!("../../tests/data/bisect-progress.txt");

    #[test]
    fn finds_culprit_commit() {
        assert_eq!(
            find_culprit(CULPRIT_TEXT),
            Some(Commit::new("ac9ee01fcbfac745aaedca0393a8e1c8a33acd8d"))
        );
    }

    #[test]
    fn no_culprit_in_unrelated_text() {
        assert_eq!(find_culprit("hello"), None);
    }

    #[test]
    fn find_culprit_is_idempotent() {
        assert_eq!(find_culprit(CULPRIT_TEXT), find_culprit(CULPRIT_TEXT));
    }

    #[test]
    fn bare_hash_without_marker_does_not_match() {
        let text = "commit ac9ee01fcbfac745aaedca0393a8e1c8a33acd8d\n\
                    ac9ee01fcbfac745aaedca0393a8e1c8a33acd8d\n";
        assert_eq!(find_culprit(text), None);
    }

    #[test]
    fn marker_must_start_the_line() {
        let text = "note: ac9ee01fcbfac745aaedca0393a8e1c8a33acd8d is the first bad commit\n";
        assert_eq!(find_culprit(text), None);
    }

    #[test]
    fn short_hash_does_not_match() {
        assert_eq!(find_culprit("ac9ee01 is the first bad commit\n"), None);
    }

    #[test]
    fn culprit_found_after_leading_lines() {
        let text = format!("Previous HEAD position was 1234567\n{CULPRIT_TEXT}");
        assert_eq!(
            find_culprit(&text).map(|c| c.to_string()),
            Some("ac9ee01fcbfac745aaedca0393a8e1c8a33acd8d".to_string())
        );
    }

    #[test]
    fn first_good_commit_also_converges() {
        let text = "0123456789abcdef0123456789abcdef01234567 is the first good commit\n";
        assert_eq!(
            find_culprit(text),
            Some(Commit::new("0123456789abcdef0123456789abcdef01234567"))
        );
    }

    #[test]
    fn classifies_progress() {
        assert_eq!(
            classify_bisect_output(PROGRESS_TEXT),
            BisectOutput::Progress { remaining: 675 }
        );
    }

    #[test]
    fn classifies_single_revision_progress() {
        let text = "Bisecting: 1 revision left to test after this (roughly 1 step)\n";
        assert_eq!(
            classify_bisect_output(text),
            BisectOutput::Progress { remaining: 1 }
        );
    }

    #[test]
    fn classifies_merge_base_check() {
        let text = "Bisecting: a merge base must be tested\n\
                    [3f440dd0a8c4c1e5bb6fd2e0a4b3e1f1c0d2a9b7] commit 1\n";
        assert_eq!(classify_bisect_output(text), BisectOutput::MergeBase);
    }

    #[test]
    fn merge_base_phrase_must_start_the_line() {
        let text = "note: Bisecting: a merge base must be tested\n";
        assert_eq!(classify_bisect_output(text), BisectOutput::Unrecognized);
    }

    #[test]
    fn classifies_skip_exhaustion() {
        let text = "There are only 'skip'ped commits left to test.\n\
                    The first bad commit could be any of:\n\
                    4c1d1b2a7e0f2f44ad5d2fba1bd0b19ef7ab2fa4\n";
        assert_eq!(classify_bisect_output(text), BisectOutput::SkipExhausted);
    }

    #[test]
    fn unknown_text_is_unrecognized() {
        assert_eq!(classify_bisect_output("hello"), BisectOutput::Unrecognized);
        assert_eq!(classify_bisect_output(""), BisectOutput::Unrecognized);
    }
}
