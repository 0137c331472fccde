// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Configuration document consumed by the stale issue run.
//!
//! The document lives at [`CONFIG_PATH`] inside the managed repository and
//! uses camelCase keys. Unknown keys are ignored so repositories can share a
//! single file with other automation. Optional values keep their raw form on
//! the struct; accessors resolve the documented defaults.

use std::{fs, path::Path};

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::{
    error::{self, Error},
    tracker::IssueTracker,
};

/// Repository path of the configuration document.
pub const CONFIG_PATH: &str = ".github/stale.yml";

/// Label applied to stale issues when none is configured.
pub const DEFAULT_STALE_LABEL: &str = "stale";

/// Inactivity window, in days, used when `daysUntilStale` is omitted.
pub const DEFAULT_DAYS_UNTIL_STALE: u32 = 60;

/// Comment posted when an issue is marked stale and none is configured.
pub const DEFAULT_MARK_COMMENT: &str = "\
This issue has been automatically marked as stale because it has not
had recent activity. It will be closed if no further activity occurs.
";

/// Typed view over `.github/stale.yml`.
///
/// # Examples
///
/// ```
/// use stale_issues::StaleConfig;
///
/// let yaml = r#"
/// daysUntilStale: 30
/// daysUntilClose: 7
/// exemptLabels: [pinned]
/// "#;
/// let config = StaleConfig::from_yaml(yaml.as_bytes(),).expect("valid configuration",);
/// assert_eq!(config.days_until_stale(), 30);
/// assert_eq!(config.stale_label(), "stale");
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq,)]
#[serde(rename_all = "camelCase")]
pub struct StaleConfig
{
    /// Label marking an issue as stale.
    #[serde(default = "default_stale_label")]
    pub stale_label: String,

    /// Days of inactivity before an issue is marked stale.
    #[serde(default)]
    pub days_until_stale: Option<u32,>,

    /// Days after the mark comment before a stale issue is closed. Absence
    /// disables closing.
    #[serde(default)]
    pub days_until_close: Option<u32,>,

    /// Labels restricting the all-issues scan. Empty means unrestricted.
    #[serde(default)]
    pub only_labels: Vec<String,>,

    /// Labels that exempt an issue from any automated change.
    #[serde(default)]
    pub exempt_labels: Vec<String,>,

    /// Whether assigned issues are exempt.
    #[serde(default = "default_true")]
    pub exempt_assignees: bool,

    /// Whether issues in a milestone are exempt.
    #[serde(default = "default_true")]
    pub exempt_milestones: bool,

    /// Cap on mutating actions per run. Zero behaves like no cap.
    #[serde(default)]
    pub limit_per_run: Option<u32,>,

    /// Comment posted when marking an issue stale.
    #[serde(default = "default_mark_comment")]
    pub mark_comment: String,

    /// Optional comment posted when removing the stale label. `false`
    /// disables it.
    #[serde(default, deserialize_with = "optional_comment")]
    pub unmark_comment: Option<String,>,

    /// Optional comment posted right before closing. `false` disables it.
    #[serde(default, deserialize_with = "optional_comment")]
    pub close_comment: Option<String,>,
}

impl Default for StaleConfig
{
    fn default() -> Self
    {
        Self {
            stale_label:       default_stale_label(),
            days_until_stale:  None,
            days_until_close:  None,
            only_labels:       Vec::new(),
            exempt_labels:     Vec::new(),
            exempt_assignees:  true,
            exempt_milestones: true,
            limit_per_run:     None,
            mark_comment:      default_mark_comment(),
            unmark_comment:    None,
            close_comment:     None,
        }
    }
}

impl StaleConfig
{
    /// Decodes the configuration from raw YAML bytes.
    ///
    /// An empty document yields [`StaleConfig::default`], which then fails
    /// [`validate`](Self::validate).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] when the YAML cannot be decoded.
    pub fn from_yaml(bytes: &[u8],) -> Result<Self, Error,>
    {
        if bytes.iter().all(u8::is_ascii_whitespace,) {
            return Ok(Self::default(),);
        }

        let value: serde_yaml::Value = serde_yaml::from_slice(bytes,)?;
        if value.is_null() {
            return Ok(Self::default(),);
        }

        Ok(serde_yaml::from_value(value,)?,)
    }

    /// Reads and decodes a configuration file from the local filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read and
    /// [`Error::Parse`] when its contents are not valid YAML.
    pub fn load(path: &Path,) -> Result<Self, Error,>
    {
        let contents = fs::read(path,).map_err(|source| error::io_error(path, source,),)?;
        Self::from_yaml(&contents,)
    }

    /// Fetches and decodes [`CONFIG_PATH`] from the managed repository.
    ///
    /// # Errors
    ///
    /// Propagates tracker failures and returns [`Error::Parse`] when the
    /// document is not valid YAML.
    pub async fn fetch<T,>(tracker: &T,) -> Result<Self, Error,>
    where
        T: IssueTracker + ?Sized,
    {
        tracing::debug!("Fetching {} content", CONFIG_PATH);
        let contents = tracker.config_file(CONFIG_PATH,).await?;
        Self::from_yaml(&contents,)
    }

    /// Checks the run-level invariant: at least one threshold must be set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when both `daysUntilStale` and
    /// `daysUntilClose` are absent.
    pub fn validate(&self,) -> Result<(), Error,>
    {
        if self.days_until_stale.is_none() && self.days_until_close.is_none() {
            return Err(Error::validation(format!(
                "specify daysUntilStale or daysUntilClose in {CONFIG_PATH}"
            ),),);
        }
        if self.stale_label.trim().is_empty() {
            return Err(Error::validation("staleLabel cannot be empty",),);
        }
        Ok((),)
    }

    /// Label marking an issue as stale.
    pub fn stale_label(&self,) -> &str
    {
        &self.stale_label
    }

    /// Inactivity window in days, falling back to
    /// [`DEFAULT_DAYS_UNTIL_STALE`].
    pub fn days_until_stale(&self,) -> u32
    {
        self.days_until_stale.unwrap_or(DEFAULT_DAYS_UNTIL_STALE,)
    }

    /// Close window in days, if closing is enabled.
    pub fn days_until_close(&self,) -> Option<u32,>
    {
        self.days_until_close
    }

    /// Effective per-run cap. `None` when unset or zero.
    pub fn limit_per_run(&self,) -> Option<u32,>
    {
        self.limit_per_run.filter(|limit| *limit > 0,)
    }

    /// Comment posted when marking an issue stale.
    pub fn mark_comment(&self,) -> &str
    {
        &self.mark_comment
    }

    /// Optional comment posted when removing the stale label.
    pub fn unmark_comment(&self,) -> Option<&str,>
    {
        non_blank(self.unmark_comment.as_deref(),)
    }

    /// Optional comment posted before closing.
    pub fn close_comment(&self,) -> Option<&str,>
    {
        non_blank(self.close_comment.as_deref(),)
    }

    /// Returns `true` when `label` is listed in `exemptLabels`.
    pub fn is_exempt_label(&self, label: &str,) -> bool
    {
        self.exempt_labels.iter().any(|exempt| exempt == label,)
    }
}

fn non_blank(value: Option<&str,>,) -> Option<&str,>
{
    value.filter(|text| !text.trim().is_empty(),)
}

/// Raw value of an optional comment key.
#[derive(Deserialize,)]
#[serde(untagged)]
enum CommentSetting
{
    Text(String,),
    Flag(bool,),
}

/// Accepts a comment body, `false` or null; the latter two disable the
/// comment.
fn optional_comment<'de, D,>(deserializer: D,) -> Result<Option<String,>, D::Error,>
where
    D: Deserializer<'de,>,
{
    match Option::<CommentSetting,>::deserialize(deserializer,)? {
        Some(CommentSetting::Text(text,),) => Ok(Some(text,),),
        Some(CommentSetting::Flag(false,),) | None => Ok(None,),
        Some(CommentSetting::Flag(true,),) => {
            Err(de::Error::custom("expected a comment body or false, found true",),)
        }
    }
}

fn default_stale_label() -> String
{
    DEFAULT_STALE_LABEL.to_owned()
}

fn default_mark_comment() -> String
{
    DEFAULT_MARK_COMMENT.to_owned()
}

fn default_true() -> bool
{
    true
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::tempdir;

    use super::{DEFAULT_DAYS_UNTIL_STALE, DEFAULT_MARK_COMMENT, StaleConfig};
    use crate::{Error, tracker::memory::MemoryTracker};

    #[test]
    fn empty_document_resolves_defaults()
    {
        let config = StaleConfig::from_yaml(b"\n",).expect("empty document should parse",);

        assert_eq!(config, StaleConfig::default());
        assert_eq!(config.stale_label(), "stale");
        assert_eq!(config.days_until_stale(), DEFAULT_DAYS_UNTIL_STALE);
        assert_eq!(config.days_until_close(), None);
        assert_eq!(config.mark_comment(), DEFAULT_MARK_COMMENT);
        assert!(config.exempt_assignees);
        assert!(config.exempt_milestones);
    }

    #[test]
    fn camel_case_keys_are_decoded()
    {
        let yaml = r"
staleLabel: wontfix
daysUntilStale: 30
daysUntilClose: 7
onlyLabels: [bug]
exemptLabels: [pinned, security]
exemptAssignees: false
exemptMilestones: false
limitPerRun: 5
markComment: Marked.
unmarkComment: Unmarked.
closeComment: Closed.
";

        let config = StaleConfig::from_yaml(yaml.as_bytes(),).expect("valid configuration",);

        assert_eq!(config.stale_label(), "wontfix");
        assert_eq!(config.days_until_stale(), 30);
        assert_eq!(config.days_until_close(), Some(7));
        assert_eq!(config.only_labels, vec!["bug".to_owned()]);
        assert!(config.is_exempt_label("security"));
        assert!(!config.exempt_assignees);
        assert!(!config.exempt_milestones);
        assert_eq!(config.limit_per_run(), Some(5));
        assert_eq!(config.mark_comment(), "Marked.");
        assert_eq!(config.unmark_comment(), Some("Unmarked."));
        assert_eq!(config.close_comment(), Some("Closed."));
    }

    #[test]
    fn unknown_keys_are_ignored()
    {
        let yaml = r"
daysUntilStale: 10
pulls:
  daysUntilStale: 2
";

        let config = StaleConfig::from_yaml(yaml.as_bytes(),).expect("valid configuration",);
        assert_eq!(config.days_until_stale(), 10);
    }

    #[test]
    fn zero_limit_behaves_like_no_cap()
    {
        let config = StaleConfig::from_yaml(b"daysUntilClose: 7\nlimitPerRun: 0\n",)
            .expect("valid configuration",);
        assert_eq!(config.limit_per_run(), None);
    }

    #[test]
    fn blank_optional_comments_are_treated_as_absent()
    {
        let config = StaleConfig::from_yaml(b"daysUntilStale: 1\ncloseComment: '  '\n",)
            .expect("valid configuration",);
        assert_eq!(config.close_comment(), None);
        assert_eq!(config.unmark_comment(), None);
    }

    #[test]
    fn false_disables_optional_comments()
    {
        let yaml = b"daysUntilStale: 60\ndaysUntilClose: 7\nunmarkComment: false\ncloseComment: false\n";

        let config = StaleConfig::from_yaml(yaml,).expect("valid configuration",);
        assert_eq!(config.unmark_comment(), None);
        assert_eq!(config.close_comment(), None);
        assert_eq!(config.days_until_close(), Some(7));
    }

    #[test]
    fn null_optional_comments_are_absent()
    {
        let config = StaleConfig::from_yaml(b"daysUntilStale: 60\ncloseComment:\nunmarkComment: ~\n",)
            .expect("valid configuration",);
        assert_eq!(config.close_comment(), None);
        assert_eq!(config.unmark_comment(), None);
    }

    #[test]
    fn true_is_not_a_comment_body()
    {
        let error = StaleConfig::from_yaml(b"daysUntilStale: 60\ncloseComment: true\n",)
            .expect_err("expected parse error",);
        assert!(matches!(error, Error::Parse { .. }));
    }

    #[test]
    fn validate_rejects_missing_thresholds()
    {
        let error = StaleConfig::default().validate().expect_err("expected validation error",);

        match error {
            Error::Validation {
                message,
            } => {
                assert!(message.contains("daysUntilStale"));
                assert!(message.contains("daysUntilClose"));
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn validate_accepts_a_single_threshold()
    {
        let only_stale = StaleConfig {
            days_until_stale: Some(30,), ..StaleConfig::default()
        };
        let only_close = StaleConfig {
            days_until_close: Some(7,), ..StaleConfig::default()
        };

        assert!(only_stale.validate().is_ok());
        assert!(only_close.validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_stale_label()
    {
        let config = StaleConfig {
            stale_label: "  ".to_owned(),
            days_until_stale: Some(30,),
            ..StaleConfig::default()
        };

        assert!(matches!(config.validate(), Err(Error::Validation { .. })));
    }

    #[test]
    fn malformed_yaml_maps_to_parse_error()
    {
        let error = StaleConfig::from_yaml(b"daysUntilStale: [not, a, number]\n",)
            .expect_err("expected parse error",);
        assert!(matches!(error, Error::Parse { .. }));
    }

    #[tokio::test]
    async fn fetch_reads_document_from_tracker()
    {
        let tracker = MemoryTracker::new(Vec::new(),)
            .with_config("daysUntilStale: 45\ndaysUntilClose: 10\nlimitPerRun: 30\n",);

        let config = StaleConfig::fetch(&tracker,).await.expect("config should be fetched",);
        assert_eq!(config.days_until_stale(), 45);
        assert_eq!(config.limit_per_run(), Some(30));
    }

    #[tokio::test]
    async fn fetch_propagates_missing_document()
    {
        let tracker = MemoryTracker::new(Vec::new(),);

        let error = StaleConfig::fetch(&tracker,).await.expect_err("expected service error",);
        assert!(matches!(error, Error::Service { .. }));
    }

    #[test]
    fn load_reads_local_file()
    {
        let temp = tempdir().expect("failed to create tempdir",);
        let path = temp.path().join("stale.yml",);
        fs::write(&path, "daysUntilStale: 14\ndaysUntilClose: 3\n",)
            .expect("failed to write config",);

        let config = StaleConfig::load(&path,).expect("config should load",);
        assert_eq!(config.days_until_stale(), 14);
        assert_eq!(config.days_until_close(), Some(3));
    }

    #[test]
    fn load_reports_missing_file()
    {
        let temp = tempdir().expect("failed to create tempdir",);
        let path = temp.path().join("missing.yml",);

        let error = StaleConfig::load(&path,).expect_err("expected io error",);
        assert!(matches!(error, Error::Io { .. }));
    }
}
