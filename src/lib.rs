//! Lifecycle automation for abandoned GitHub issues.
//!
//! The library walks the open issues of one repository and decides for each
//! whether it should be marked stale, unmarked, closed, or left alone. The
//! decision rules ([`is_exempt`], [`classify`]) are pure functions of an
//! [`IssueSnapshot`], a [`StaleConfig`] and the current time. The
//! [`Coordinator`] drives the scan order and the per-run limit and applies
//! decisions through any [`IssueTracker`], with [`GitHubTracker`] as the
//! production implementation.

mod config;
mod coordinator;
mod error;
mod exemption;
mod github;
mod issue;
mod lifecycle;
mod retry;
mod tracker;

pub use config::{
    CONFIG_PATH, DEFAULT_DAYS_UNTIL_STALE, DEFAULT_MARK_COMMENT, DEFAULT_STALE_LABEL, StaleConfig,
};
pub use coordinator::{Coordinator, Phase, ReportEntry, RunReport, RunState};
pub use error::{Error, io_error};
pub use exemption::{Exemption, exemption, is_exempt};
pub use github::{DEFAULT_BASE_URL, GitHubTracker, RepositoryRef, api_base_uri};
pub use issue::{IssueComment, IssueSnapshot, IssueState};
pub use lifecycle::{Decision, classify, cutoff};
pub use retry::{RetryConfig, retry_with_backoff};
pub use tracker::{IssuePage, IssueQuery, IssueTracker};
