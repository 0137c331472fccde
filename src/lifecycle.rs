// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Pure classification of an issue into its next lifecycle transition.
//!
//! An issue without the stale label becomes stale once its last activity is
//! strictly older than `daysUntilStale` days. An issue carrying the label is
//! closed once the mark comment is still the latest comment and strictly
//! older than `daysUntilClose` days, and is unmarked as soon as someone else
//! commented after it. Classification reads no clock: callers pass `now`.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{config::StaleConfig, issue::IssueSnapshot};

/// Transition selected for a single issue.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash,)]
#[serde(rename_all = "snake_case")]
pub enum Decision
{
    /// Apply the stale label and post the mark comment.
    MarkStale,
    /// Remove the stale label, optionally posting the unmark comment.
    UnmarkStale,
    /// Optionally post the close comment, then close the issue.
    Close,
    /// Leave the issue untouched.
    NoOp,
}

impl Decision
{
    /// Returns `true` for decisions that change the issue.
    pub fn is_mutation(self,) -> bool
    {
        !matches!(self, Self::NoOp,)
    }
}

impl std::fmt::Display for Decision
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        let label = match self {
            Self::MarkStale => "mark stale",
            Self::UnmarkStale => "unmark stale",
            Self::Close => "close",
            Self::NoOp => "no-op",
        };
        f.write_str(label,)
    }
}

/// Instant `days` days before `now`.
///
/// Returns `None` when the instant falls outside the representable range,
/// in which case nothing can be older than it.
pub fn cutoff(now: DateTime<Utc,>, days: u32,) -> Option<DateTime<Utc,>,>
{
    Duration::try_days(i64::from(days,),).and_then(|window| now.checked_sub_signed(window,),)
}

/// Maps an issue snapshot to the transition it should undergo at `now`.
///
/// Exemptions are not evaluated here; callers filter exempt issues first.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use stale_issues::{Decision, IssueSnapshot, IssueState, StaleConfig, classify};
///
/// let now = Utc::now();
/// let config = StaleConfig {
///     days_until_stale: Some(30,), days_until_close: Some(7,), ..StaleConfig::default()
/// };
/// let issue = IssueSnapshot {
///     number:     1,
///     title:      "Old".to_owned(),
///     url:        "https://github.com/octocat/hello-world/issues/1".to_owned(),
///     state:      IssueState::Open,
///     labels:     Vec::new(),
///     assignees:  Vec::new(),
///     milestone:  None,
///     updated_at: now - Duration::days(31,),
///     comments:   Vec::new(),
/// };
/// assert_eq!(classify(&issue, &config, now,), Decision::MarkStale);
/// ```
pub fn classify(issue: &IssueSnapshot, config: &StaleConfig, now: DateTime<Utc,>,) -> Decision
{
    if issue.has_label(config.stale_label(),) {
        classify_stale(issue, config, now,)
    } else {
        classify_active(issue, config, now,)
    }
}

fn classify_active(issue: &IssueSnapshot, config: &StaleConfig, now: DateTime<Utc,>,) -> Decision
{
    match cutoff(now, config.days_until_stale(),) {
        Some(stale_cutoff,) if issue.updated_at < stale_cutoff => Decision::MarkStale,
        _ => Decision::NoOp,
    }
}

fn classify_stale(issue: &IssueSnapshot, config: &StaleConfig, now: DateTime<Utc,>,) -> Decision
{
    let Some(days_until_close,) = config.days_until_close() else {
        return Decision::NoOp;
    };

    // A missing mark comment counts as activity since marking.
    let Some(latest,) = issue.latest_comment() else {
        return Decision::UnmarkStale;
    };

    if !is_mark_comment(&latest.body, config.mark_comment(),) {
        return Decision::UnmarkStale;
    }

    match cutoff(now, days_until_close,) {
        Some(close_cutoff,) if latest.updated_at < close_cutoff => Decision::Close,
        _ => Decision::NoOp,
    }
}

/// Compares a posted comment with the configured mark comment, ignoring
/// surrounding whitespace and line ending style.
fn is_mark_comment(body: &str, mark_comment: &str,) -> bool
{
    body.trim().lines().eq(mark_comment.trim().lines(),)
}
