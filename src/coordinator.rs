// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Drives a single run over the open issues of a repository.
//!
//! A run scans two phases in order. [`Phase::StaleFirst`] visits issues that
//! already carry the stale label, since they may be due for closing.
//! [`Phase::AllOthers`] then visits open issues restricted to `onlyLabels`.
//! Within each phase issues arrive oldest activity first. Every issue is
//! filtered through the exemption rules, classified, and the resulting
//! transition is applied through the tracker unless the run is a dry run.
//! The run ends early once `limitPerRun` transitions were applied.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{Instrument, Span, debug, info, warn};

use crate::{
    config::StaleConfig,
    error::Error,
    exemption::exemption,
    issue::{IssueSnapshot, IssueState},
    lifecycle::{Decision, classify, cutoff},
    tracker::{IssueQuery, IssueTracker},
};

/// Scan phase of a run.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash,)]
#[serde(rename_all = "snake_case")]
pub enum Phase
{
    /// Issues already carrying the stale label.
    StaleFirst,
    /// All open issues matching `onlyLabels`.
    AllOthers,
}

impl Phase
{
    /// Phases in scan order.
    pub const ORDER: [Self; 2] = [Self::StaleFirst, Self::AllOthers,];

    /// Listing filter used by this phase.
    pub fn query(self, config: &StaleConfig,) -> IssueQuery
    {
        match self {
            Self::StaleFirst => IssueQuery::with_labels([config.stale_label()],),
            Self::AllOthers => IssueQuery::with_labels(config.only_labels.iter().cloned(),),
        }
    }
}

impl std::fmt::Display for Phase
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        match self {
            Self::StaleFirst => f.write_str("stale issues",),
            Self::AllOthers => f.write_str("remaining issues",),
        }
    }
}

/// Counter of transitions applied during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct RunState
{
    processed: u32,
    limit:     Option<u32,>,
}

impl RunState
{
    /// Creates an empty state bounded by `limit`.
    pub fn new(limit: Option<u32,>,) -> Self
    {
        Self {
            processed: 0, limit,
        }
    }

    /// Number of transitions applied so far.
    pub fn processed(&self,) -> u32
    {
        self.processed
    }

    /// Returns `true` once the configured cap has been reached.
    pub fn limit_reached(&self,) -> bool
    {
        self.limit.is_some_and(|limit| self.processed >= limit,)
    }

    /// Counts one applied transition.
    pub fn record(&mut self,)
    {
        self.processed = self.processed.saturating_add(1,);
    }
}

/// Classified issue recorded in the run report.
#[derive(Debug, Serialize, Clone, PartialEq, Eq,)]
pub struct ReportEntry
{
    /// Issue number.
    pub number:   u64,
    /// Issue title.
    pub title:    String,
    /// Browser URL of the issue.
    pub url:      String,
    /// Phase during which the issue was classified.
    pub phase:    Phase,
    /// Transition selected for the issue.
    pub decision: Decision,
}

/// Outcome of a run.
#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq,)]
pub struct RunReport
{
    /// Whether mutating calls were suppressed.
    pub dry_run:       bool,
    /// Number of transitions applied (or logged, in a dry run).
    pub processed:     u32,
    /// Whether the run stopped because `limitPerRun` was reached.
    pub limit_reached: bool,
    /// Numbers of issues skipped by exemption rules.
    pub exempt:        Vec<u64,>,
    /// Classified issues in scan order.
    pub entries:       Vec<ReportEntry,>,
}

impl RunReport
{
    /// Entries whose decision equals `decision`.
    pub fn with_decision(&self, decision: Decision,) -> impl Iterator<Item = &ReportEntry,>
    {
        self.entries.iter().filter(move |entry| entry.decision == decision,)
    }
}

/// Whether the scan continues within the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
enum Flow
{
    Continue,
    /// Remaining issues of the phase are newer and cannot be stale.
    EndPhase,
}

/// Bookkeeping shared by both phases of one run.
#[derive(Debug,)]
struct ScanState
{
    run:           RunState,
    evaluated:     HashSet<u64,>,
    /// Set once an issue left the stale listing mid-scan, which can push
    /// unvisited stale issues past its last page.
    stale_shifted: bool,
}

/// How a phase finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
enum PhaseOutcome
{
    Exhausted,
    LimitReached,
}

/// Runs the stale lifecycle over a repository through an [`IssueTracker`].
///
/// # Example
///
/// ```no_run
/// use chrono::Utc;
/// use stale_issues::{Coordinator, GitHubTracker, StaleConfig};
///
/// # async fn example() -> Result<(), stale_issues::Error> {
/// let tracker = GitHubTracker::connect("octocat/hello-world", "api.github.com", None,)?;
/// let config = StaleConfig::fetch(&tracker,).await?;
/// let report = Coordinator::new(&tracker, &config,).dry_run(true,).run(Utc::now(),).await?;
/// println!("{} issues processed", report.processed);
/// # Ok(())
/// # }
/// ```
pub struct Coordinator<'a, T: ?Sized,>
{
    tracker: &'a T,
    config:  &'a StaleConfig,
    dry_run: bool,
    span:    Span,
}

impl<'a, T,> Coordinator<'a, T,>
where
    T: IssueTracker + ?Sized,
{
    /// Creates a coordinator applying changes through `tracker`.
    pub fn new(tracker: &'a T, config: &'a StaleConfig,) -> Self
    {
        Self {
            tracker,
            config,
            dry_run: false,
            span: tracing::info_span!("stale_run"),
        }
    }

    /// Suppresses every mutating call when `dry_run` is `true`.
    pub fn dry_run(mut self, dry_run: bool,) -> Self
    {
        self.dry_run = dry_run;
        self
    }

    /// Span under which all run events are recorded.
    pub fn with_span(mut self, span: Span,) -> Self
    {
        self.span = span;
        self
    }

    /// Executes one run at instant `now`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] before touching any issue when neither
    /// threshold is configured, and propagates the first tracker failure.
    /// Transitions applied before a failure are not rolled back.
    pub async fn run(&self, now: DateTime<Utc,>,) -> Result<RunReport, Error,>
    {
        self.run_phases(now,).instrument(self.span.clone(),).await
    }

    async fn run_phases(&self, now: DateTime<Utc,>,) -> Result<RunReport, Error,>
    {
        self.config.validate()?;

        if self.dry_run {
            info!("Dry run: no issue will be modified");
        }
        debug!("Current time: {}", now.to_rfc3339());

        let mut scan = ScanState {
            run:           RunState::new(self.config.limit_per_run(),),
            evaluated:     HashSet::new(),
            stale_shifted: false,
        };
        let mut report = RunReport {
            dry_run: self.dry_run, ..RunReport::default()
        };

        for phase in Phase::ORDER {
            let outcome = if scan.run.limit_reached() {
                PhaseOutcome::LimitReached
            } else {
                self.scan_phase(phase, now, &mut scan, &mut report,).await?
            };
            if outcome == PhaseOutcome::LimitReached {
                warn!("Processed {} issues already, ending", scan.run.processed());
                report.limit_reached = true;
                break;
            }
        }

        report.processed = scan.run.processed();
        info!(
            "Run finished: {} processed, {} exempt, {} classified",
            report.processed,
            report.exempt.len(),
            report.entries.len()
        );

        Ok(report,)
    }

    async fn scan_phase(
        &self,
        phase: Phase,
        now: DateTime<Utc,>,
        scan: &mut ScanState,
        report: &mut RunReport,
    ) -> Result<PhaseOutcome, Error,>
    {
        let query = phase.query(self.config,);
        info!("Scanning {}", phase);
        debug!("Label filter: {:?}", query.labels);

        let mut page = 1;
        loop {
            let listing = self.tracker.list_open_issues(&query, page,).await?;

            for issue in listing.issues {
                if scan.run.limit_reached() {
                    return Ok(PhaseOutcome::LimitReached,);
                }

                if !scan.evaluated.insert(issue.number,) {
                    debug!("Issue #{} already evaluated in this run", issue.number);
                    continue;
                }

                if self.process_issue(phase, issue, now, scan, report,).await? == Flow::EndPhase {
                    return Ok(PhaseOutcome::Exhausted,);
                }
            }

            match listing.next_page {
                Some(next,) => page = next,
                None => return Ok(PhaseOutcome::Exhausted,),
            }
        }
    }

    async fn process_issue(
        &self,
        phase: Phase,
        issue: IssueSnapshot,
        now: DateTime<Utc,>,
        scan: &mut ScanState,
        report: &mut RunReport,
    ) -> Result<Flow, Error,>
    {
        info!("Processing #{} ({})", issue.number, issue.title);

        if let Some(reason,) = exemption(&issue, self.config,) {
            info!("Issue #{} is exempt: {}", issue.number, reason);
            report.exempt.push(issue.number,);
            return Ok(Flow::Continue,);
        }

        let labelled = issue.has_label(self.config.stale_label(),);
        // Comments only matter when a labelled issue may be closed.
        let issue = if labelled && self.config.days_until_close().is_some() {
            let comments = self.tracker.issue_comments(issue.number,).await?;
            issue.with_comments(comments,)
        } else {
            issue
        };

        self.log_cutoffs(&issue, labelled, now,);
        let decision = classify(&issue, self.config, now,);
        self.apply(&issue, decision,).await?;
        if decision.is_mutation() {
            scan.run.record();
        }
        if phase == Phase::StaleFirst
            && !self.dry_run
            && matches!(decision, Decision::Close | Decision::UnmarkStale)
        {
            scan.stale_shifted = true;
        }

        report.entries.push(ReportEntry {
            number: issue.number,
            title: issue.title.clone(),
            url: issue.url.clone(),
            phase,
            decision,
        },);

        if decision == Decision::NoOp && !labelled {
            info!("Issue #{} has recent activity, skipping", issue.number);
            if phase == Phase::AllOthers {
                if scan.stale_shifted {
                    debug!("Stale issues may remain unvisited, continuing scan of {}", phase);
                } else {
                    debug!("Remaining issues were updated later, ending scan of {}", phase);
                    return Ok(Flow::EndPhase,);
                }
            }
        }

        Ok(Flow::Continue,)
    }

    fn log_cutoffs(&self, issue: &IssueSnapshot, labelled: bool, now: DateTime<Utc,>,)
    {
        if labelled {
            let close_cutoff = self
                .config
                .days_until_close()
                .and_then(|days| cutoff(now, days,),)
                .map(|instant| instant.to_rfc3339(),);
            debug!("Close stale if older than: {:?}", close_cutoff);
            if let Some(latest,) = issue.latest_comment() {
                debug!("Last comment at: {}", latest.updated_at.to_rfc3339());
            }
        } else {
            let stale_cutoff =
                cutoff(now, self.config.days_until_stale(),).map(|instant| instant.to_rfc3339(),);
            debug!("Stale if older than: {:?}", stale_cutoff);
            debug!("Last update at: {}", issue.updated_at.to_rfc3339());
        }
    }

    /// Issues the tracker calls for `decision`, or only logs them in a dry run.
    async fn apply(&self, issue: &IssueSnapshot, decision: Decision,) -> Result<(), Error,>
    {
        let number = issue.number;
        let label = self.config.stale_label();

        match decision {
            Decision::NoOp => {
                if issue.has_label(label,) {
                    info!("Issue #{} is not stale enough", number);
                }
            }
            Decision::MarkStale => {
                info!("Marking issue #{} stale", number);
                if self.suppressed(number,) {
                    return Ok((),);
                }
                self.tracker.add_label(number, label,).await?;
                self.tracker.post_comment(number, self.config.mark_comment(),).await?;
            }
            Decision::UnmarkStale => {
                info!("New activity on issue #{}, removing stale label", number);
                if self.suppressed(number,) {
                    return Ok((),);
                }
                self.tracker.remove_label(number, label,).await?;
                if let Some(comment,) = self.config.unmark_comment() {
                    self.tracker.post_comment(number, comment,).await?;
                }
            }
            Decision::Close => {
                info!("Closing issue #{}", number);
                if self.suppressed(number,) {
                    return Ok((),);
                }
                if let Some(comment,) = self.config.close_comment() {
                    debug!("Adding close comment to issue #{}", number);
                    self.tracker.post_comment(number, comment,).await?;
                }
                self.tracker.set_state(number, IssueState::Closed,).await?;
            }
        }

        Ok((),)
    }

    fn suppressed(&self, number: u64,) -> bool
    {
        if self.dry_run {
            info!("Dry run: issue #{} left unchanged", number);
        }
        self.dry_run
    }
}
