// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Rules excluding issues from any automated change.
//!
//! Rules are checked in a fixed order and the first match wins: exempt
//! labels, then assignees, then milestones.

use crate::{config::StaleConfig, issue::IssueSnapshot};

/// Reason an issue was exempted.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub enum Exemption
{
    /// The issue carries a label listed in `exemptLabels`.
    Label(String,),
    /// The issue has assignees and `exemptAssignees` is enabled.
    Assigned,
    /// The issue is in a milestone and `exemptMilestones` is enabled.
    Milestone(String,),
}

impl std::fmt::Display for Exemption
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        match self {
            Self::Label(label,) => write!(f, "exempt label '{label}'"),
            Self::Assigned => f.write_str("has assignees",),
            Self::Milestone(title,) => write!(f, "in milestone '{title}'"),
        }
    }
}

/// Returns the first rule exempting `issue`, if any.
pub fn exemption(issue: &IssueSnapshot, config: &StaleConfig,) -> Option<Exemption,>
{
    if let Some(label,) = issue.labels.iter().find(|label| config.is_exempt_label(label,),) {
        return Some(Exemption::Label(label.clone(),),);
    }

    if issue.is_assigned() && config.exempt_assignees {
        return Some(Exemption::Assigned,);
    }

    issue
        .milestone
        .as_ref()
        .filter(|_| config.exempt_milestones,)
        .map(|title| Exemption::Milestone(title.clone(),),)
}

/// Returns `true` when `issue` must be skipped entirely.
pub fn is_exempt(issue: &IssueSnapshot, config: &StaleConfig,) -> bool
{
    exemption(issue, config,).is_some()
}

#[cfg(test)]
mod tests
{
    use chrono::{TimeZone, Utc};

    use super::{Exemption, exemption, is_exempt};
    use crate::{IssueSnapshot, IssueState, StaleConfig};

    fn issue() -> IssueSnapshot
    {
        IssueSnapshot {
            number:     7,
            title:      "Feature request".to_owned(),
            url:        "https://github.com/octocat/hello-world/issues/7".to_owned(),
            state:      IssueState::Open,
            labels:     Vec::new(),
            assignees:  Vec::new(),
            milestone:  None,
            updated_at: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0,).unwrap(),
            comments:   Vec::new(),
        }
    }

    fn config() -> StaleConfig
    {
        StaleConfig {
            days_until_stale: Some(30,),
            days_until_close: Some(7,),
            exempt_labels: vec!["pinned".to_owned(), "security".to_owned()],
            ..StaleConfig::default()
        }
    }

    #[test]
    fn plain_issue_is_not_exempt()
    {
        assert!(!is_exempt(&issue(), &config()));
    }

    #[test]
    fn exempt_label_exempts()
    {
        let mut candidate = issue();
        candidate.labels = vec!["bug".to_owned(), "security".to_owned()];

        assert_eq!(
            exemption(&candidate, &config()),
            Some(Exemption::Label("security".to_owned()))
        );
    }

    #[test]
    fn label_check_takes_precedence_over_assignees()
    {
        let mut candidate = issue();
        candidate.labels = vec!["pinned".to_owned()];
        candidate.assignees = vec!["octocat".to_owned()];

        for exempt_assignees in [true, false] {
            let settings = StaleConfig {
                exempt_assignees, ..config()
            };
            assert_eq!(
                exemption(&candidate, &settings),
                Some(Exemption::Label("pinned".to_owned()))
            );
        }
    }

    #[test]
    fn assignees_exempt_only_when_enabled()
    {
        let mut candidate = issue();
        candidate.assignees = vec!["octocat".to_owned()];

        assert_eq!(exemption(&candidate, &config()), Some(Exemption::Assigned));

        let settings = StaleConfig {
            exempt_assignees: false, ..config()
        };
        assert!(!is_exempt(&candidate, &settings));
    }

    #[test]
    fn milestone_exempts_only_when_enabled()
    {
        let mut candidate = issue();
        candidate.milestone = Some("v1.0".to_owned(),);

        assert_eq!(exemption(&candidate, &config()), Some(Exemption::Milestone("v1.0".to_owned())));

        let settings = StaleConfig {
            exempt_milestones: false, ..config()
        };
        assert!(!is_exempt(&candidate, &settings));
    }

    #[test]
    fn assignee_rule_runs_before_milestone_rule()
    {
        let mut candidate = issue();
        candidate.assignees = vec!["octocat".to_owned()];
        candidate.milestone = Some("v2.0".to_owned(),);

        assert_eq!(exemption(&candidate, &config()), Some(Exemption::Assigned));
    }

    #[test]
    fn exemption_reason_is_readable()
    {
        assert_eq!(Exemption::Label("pinned".to_owned()).to_string(), "exempt label 'pinned'");
        assert_eq!(Exemption::Assigned.to_string(), "has assignees");
    }
}
