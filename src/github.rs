// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! GitHub implementation of [`IssueTracker`] backed by Octocrab.
//!
//! Listing, comment and content reads are retried with exponential backoff.
//! Label, comment and state changes are single attempts.

use async_trait::async_trait;
use octocrab::{Octocrab, models, params};
use tracing::{debug, info};

use crate::{
    error::Error,
    issue::{IssueComment, IssueSnapshot, IssueState},
    retry::{RetryConfig, retry_with_backoff},
    tracker::{IssuePage, IssueQuery, IssueTracker},
};

/// API host used when none is supplied.
pub const DEFAULT_BASE_URL: &str = "api.github.com";

/// Issues requested per listing page.
const PER_PAGE: u8 = 100;

/// Repository identifier in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct RepositoryRef
{
    /// Account owning the repository.
    pub owner: String,
    /// Repository name.
    pub name:  String,
}

impl RepositoryRef
{
    /// Parses an `owner/name` identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when either part is missing, blank or
    /// contains whitespace, or when more than one `/` is present.
    ///
    /// # Examples
    ///
    /// ```
    /// use stale_issues::RepositoryRef;
    ///
    /// let repository = RepositoryRef::parse(" octocat/hello-world ",)?;
    /// assert_eq!(repository.owner, "octocat");
    /// assert_eq!(repository.to_string(), "octocat/hello-world");
    /// # Ok::<(), stale_issues::Error>(())
    /// ```
    pub fn parse(input: &str,) -> Result<Self, Error,>
    {
        let trimmed = input.trim();
        let mut parts = trimmed.split('/',);
        let (Some(owner,), Some(name,), None,) = (parts.next(), parts.next(), parts.next(),) else {
            return Err(Error::validation(format!(
                "repository '{trimmed}' must be in owner/name form"
            ),),);
        };

        for (field, value,) in [("owner", owner,), ("name", name,),] {
            if value.is_empty() {
                return Err(Error::validation(format!("repository {field} cannot be empty"),),);
            }
            if value.chars().any(char::is_whitespace,) {
                return Err(Error::validation(format!(
                    "repository {field} cannot contain whitespace"
                ),),);
            }
        }

        Ok(Self {
            owner: owner.to_owned(), name: name.to_owned(),
        },)
    }
}

impl std::fmt::Display for RepositoryRef
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Turns a `--base-url` value into an absolute API URI.
///
/// Values without a scheme are served over HTTPS; trailing slashes are
/// dropped.
///
/// # Examples
///
/// ```
/// use stale_issues::api_base_uri;
///
/// assert_eq!(api_base_uri("api.github.com",), "https://api.github.com");
/// assert_eq!(api_base_uri("http://localhost:8080/",), "http://localhost:8080");
/// ```
pub fn api_base_uri(base_url: &str,) -> String
{
    let trimmed = base_url.trim().trim_end_matches('/',);
    if trimmed.starts_with("https://",) || trimmed.starts_with("http://",) {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    }
}

/// Issue tracker talking to the GitHub REST API for one repository.
#[derive(Clone,)]
pub struct GitHubTracker
{
    client:     Octocrab,
    repository: RepositoryRef,
    retry:      RetryConfig,
}

impl GitHubTracker
{
    /// Builds an authenticated client for `repository` at `base_url`.
    ///
    /// Requests are anonymous when `token` is `None`, which only allows
    /// dry runs against public repositories.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a malformed repository identifier and
    /// [`Error::Service`] when the client cannot be initialized.
    pub fn connect(repository: &str, base_url: &str, token: Option<String,>,) -> Result<Self, Error,>
    {
        let repository = RepositoryRef::parse(repository,)?;
        let base_uri = api_base_uri(base_url,);
        info!("Connecting to {}", base_uri);

        let mut builder = Octocrab::builder().base_uri(base_uri.as_str(),).map_err(|e| {
            Error::service(format!("invalid GitHub API URL {base_uri}: {e}"),)
        },)?;
        if let Some(token,) = token {
            builder = builder.personal_token(token,);
        }
        let client = builder
            .build()
            .map_err(|e| Error::service(format!("failed to initialize GitHub client: {e}"),),)?;

        info!("Using repo {}", repository);
        Ok(Self::new(client, repository,),)
    }

    /// Wraps an existing Octocrab client.
    pub fn new(client: Octocrab, repository: RepositoryRef,) -> Self
    {
        Self {
            client,
            repository,
            retry: RetryConfig::default(),
        }
    }

    /// Overrides the retry policy for read calls.
    pub fn with_retry(mut self, retry: RetryConfig,) -> Self
    {
        self.retry = retry;
        self
    }

    /// Repository managed by this tracker.
    pub fn repository(&self,) -> &RepositoryRef
    {
        &self.repository
    }

    fn issues(&self,) -> octocrab::issues::IssueHandler<'_,>
    {
        self.client.issues(&self.repository.owner, &self.repository.name,)
    }

    async fn fetch_page(&self, labels: &[String], page: u32,) -> Result<IssuePage, Error,>
    {
        let handler = self.issues();
        let mut request = handler
            .list()
            .state(params::State::Open,)
            .sort(params::issues::Sort::Updated,)
            .direction(params::Direction::Ascending,)
            .per_page(PER_PAGE,)
            .page(page,);
        if !labels.is_empty() {
            request = request.labels(labels,);
        }

        let listing = request.send().await?;
        let next_page = listing.next.is_some().then_some(page + 1,);
        let issues = listing.items.into_iter().map(snapshot,).collect();

        Ok(IssuePage {
            issues,
            next_page,
        },)
    }

    async fn fetch_comments(&self, number: u64,) -> Result<Vec<IssueComment,>, Error,>
    {
        let first = self.issues().list_comments(number,).per_page(PER_PAGE,).send().await?;
        let mut comments: Vec<IssueComment,> =
            self.client.all_pages(first,).await?.into_iter().map(comment,).collect();
        comments.sort_by_key(|comment| comment.updated_at,);
        Ok(comments,)
    }

    async fn fetch_content(&self, path: &str,) -> Result<Vec<u8,>, Error,>
    {
        let mut contents = self
            .client
            .repos(&self.repository.owner, &self.repository.name,)
            .get_content()
            .path(path,)
            .send()
            .await?;

        contents
            .take_items()
            .into_iter()
            .next()
            .and_then(|item| item.decoded_content(),)
            .map(String::into_bytes,)
            .ok_or_else(|| Error::service(format!("{path} has no decodable content"),),)
    }
}

#[async_trait]
impl IssueTracker for GitHubTracker
{
    async fn config_file(&self, path: &str,) -> Result<Vec<u8,>, Error,>
    {
        debug!("Fetching {} content", path);
        retry_with_backoff(&self.retry, &format!("fetch {path}"), || self.fetch_content(path,),)
            .await
    }

    async fn list_open_issues(&self, query: &IssueQuery, page: u32,) -> Result<IssuePage, Error,>
    {
        debug!("Listing open issues page {} with labels {:?}", page, query.labels);
        retry_with_backoff(&self.retry, &format!("list issues page {page}"), || {
            self.fetch_page(&query.labels, page,)
        },)
        .await
    }

    async fn issue_comments(&self, number: u64,) -> Result<Vec<IssueComment,>, Error,>
    {
        retry_with_backoff(&self.retry, &format!("list comments of #{number}"), || {
            self.fetch_comments(number,)
        },)
        .await
    }

    async fn add_label(&self, number: u64, label: &str,) -> Result<(), Error,>
    {
        self.issues().add_labels(number, &[label.to_owned()],).await?;
        Ok((),)
    }

    async fn remove_label(&self, number: u64, label: &str,) -> Result<(), Error,>
    {
        self.issues().remove_label(number, label,).await?;
        Ok((),)
    }

    async fn post_comment(&self, number: u64, body: &str,) -> Result<(), Error,>
    {
        self.issues().create_comment(number, body,).await?;
        Ok((),)
    }

    async fn set_state(&self, number: u64, state: IssueState,) -> Result<(), Error,>
    {
        let state = match state {
            IssueState::Open => models::IssueState::Open,
            IssueState::Closed => models::IssueState::Closed,
        };
        self.issues().update(number,).state(state,).send().await?;
        Ok((),)
    }
}

fn snapshot(issue: models::issues::Issue,) -> IssueSnapshot
{
    let state = match issue.state {
        models::IssueState::Closed => IssueState::Closed,
        _ => IssueState::Open,
    };

    IssueSnapshot {
        number: issue.number,
        title: issue.title,
        url: issue.html_url.to_string(),
        state,
        labels: issue.labels.into_iter().map(|label| label.name,).collect(),
        assignees: issue.assignees.into_iter().map(|user| user.login,).collect(),
        milestone: issue.milestone.map(|milestone| milestone.title,),
        updated_at: issue.updated_at,
        comments: Vec::new(),
    }
}

fn comment(comment: models::issues::Comment,) -> IssueComment
{
    IssueComment {
        body:       comment.body.unwrap_or_default(),
        updated_at: comment.updated_at.unwrap_or(comment.created_at,),
    }
}
