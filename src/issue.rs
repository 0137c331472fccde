// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Tracker-agnostic issue snapshots consumed by the decision engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Open/closed state of an issue.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash,)]
#[serde(rename_all = "snake_case")]
pub enum IssueState
{
    /// Issue accepts activity.
    Open,
    /// Issue was closed.
    Closed,
}

/// Single comment left on an issue.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq,)]
pub struct IssueComment
{
    /// Markdown body of the comment.
    pub body:       String,
    /// Last edit time of the comment.
    pub updated_at: DateTime<Utc,>,
}

/// Immutable view of an issue fetched once per scan.
///
/// Listing endpoints return snapshots without comments. The coordinator
/// attaches them through [`IssueSnapshot::with_comments`] when the classifier
/// needs them.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq,)]
pub struct IssueSnapshot
{
    /// Issue number within the repository.
    pub number:     u64,
    /// Issue title.
    pub title:      String,
    /// Browser URL of the issue.
    pub url:        String,
    /// Current state.
    pub state:      IssueState,
    /// Names of the labels applied to the issue.
    pub labels:     Vec<String,>,
    /// Logins of the assigned users.
    pub assignees:  Vec<String,>,
    /// Title of the milestone the issue belongs to.
    pub milestone:  Option<String,>,
    /// Time of the last activity of any kind.
    pub updated_at: DateTime<Utc,>,
    /// Comments in ascending update order.
    #[serde(default)]
    pub comments:   Vec<IssueComment,>,
}

impl IssueSnapshot
{
    /// Returns `true` when the issue carries `label`.
    pub fn has_label(&self, label: &str,) -> bool
    {
        self.labels.iter().any(|name| name == label,)
    }

    /// Returns `true` when at least one user is assigned.
    pub fn is_assigned(&self,) -> bool
    {
        !self.assignees.is_empty()
    }

    /// Most recently updated comment, if any.
    ///
    /// Ties resolve to the comment appearing last in the sequence.
    pub fn latest_comment(&self,) -> Option<&IssueComment,>
    {
        self.comments.iter().max_by_key(|comment| comment.updated_at,)
    }

    /// Replaces the comment list.
    pub fn with_comments(mut self, comments: Vec<IssueComment,>,) -> Self
    {
        self.comments = comments;
        self
    }
}

impl std::fmt::Display for IssueSnapshot
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        write!(f, "#{} ({})", self.number, self.title)
    }
}
