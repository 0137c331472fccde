// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Capability the run coordinator needs from an issue tracker.
//!
//! Implementations own transport, authentication and pagination details. The
//! coordinator drives calls strictly one at a time.

use async_trait::async_trait;

use crate::{
    error::Error,
    issue::{IssueComment, IssueSnapshot, IssueState},
};

/// Filter applied when listing open issues.
///
/// Results are always open issues in ascending `updated_at` order.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct IssueQuery
{
    /// Labels every returned issue must carry. Empty means no restriction.
    pub labels: Vec<String,>,
}

impl IssueQuery
{
    /// Query restricted to issues carrying every label in `labels`.
    pub fn with_labels<I, S,>(labels: I,) -> Self
    where
        I: IntoIterator<Item = S,>,
        S: Into<String,>,
    {
        Self {
            labels: labels.into_iter().map(Into::into,).collect(),
        }
    }
}

/// One page of listed issues.
#[derive(Debug, Clone, Default,)]
pub struct IssuePage
{
    /// Issues on this page.
    pub issues:    Vec<IssueSnapshot,>,
    /// Page number to request next, `None` when this page is the last.
    pub next_page: Option<u32,>,
}

/// Issue tracker operations consumed by the run coordinator.
#[async_trait]
pub trait IssueTracker: Send + Sync
{
    /// Reads a file from the managed repository.
    async fn config_file(&self, path: &str,) -> Result<Vec<u8,>, Error,>;

    /// Lists one page of open issues, oldest activity first. Pages are
    /// numbered from 1.
    async fn list_open_issues(&self, query: &IssueQuery, page: u32,) -> Result<IssuePage, Error,>;

    /// Fetches every comment of an issue in ascending update order.
    async fn issue_comments(&self, number: u64,) -> Result<Vec<IssueComment,>, Error,>;

    /// Adds a label to an issue.
    async fn add_label(&self, number: u64, label: &str,) -> Result<(), Error,>;

    /// Removes a label from an issue.
    async fn remove_label(&self, number: u64, label: &str,) -> Result<(), Error,>;

    /// Posts a comment on an issue.
    async fn post_comment(&self, number: u64, body: &str,) -> Result<(), Error,>;

    /// Changes the state of an issue.
    async fn set_state(&self, number: u64, state: IssueState,) -> Result<(), Error,>;
}
