use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReviewError;

/// A validated `owner/name` repository identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoName {
    pub owner: String,
    pub name: String,
}

impl RepoName {
    pub fn parse(full: &str) -> Result<Self, ReviewError> {
        let full = full.trim();
        if full.is_empty() {
            return Err(ReviewError::InvalidParam(
                "repo_name must not be empty".to_string(),
            ));
        }
        let (owner, name) = full.split_once('/').ok_or_else(|| {
            ReviewError::InvalidParam(format!(
                "repo_name must look like owner/repo, got '{}'",
                full
            ))
        })?;
        sanitize_github_name(owner, "owner")?;
        sanitize_github_name(name, "repo")?;
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Validate that a GitHub owner/repo name doesn't contain characters that
/// could be used for URL injection in raw API routes.
fn sanitize_github_name(name: &str, field: &str) -> Result<(), ReviewError> {
    if name.is_empty() {
        return Err(ReviewError::InvalidParam(format!(
            "{} must not be empty",
            field
        )));
    }
    for ch in ['/', '?', '#', '%', '\0', ' ', '\n', '\t'] {
        if name.contains(ch) {
            return Err(ReviewError::InvalidParam(format!(
                "{} contains invalid character '{}'",
                field,
                ch.escape_default()
            )));
        }
    }
    Ok(())
}

/// Reject a blank credential before any client is built.
pub fn require_credential(token: &str) -> Result<(), ReviewError> {
    if token.trim().is_empty() {
        return Err(ReviewError::Configuration(
            "a GitHub access token is required".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullSummary {
    pub number: u64,
    pub title: String,
}

#[derive(Debug, Clone, Default)]
pub struct ChangedFile {
    pub filename: String,
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    /// Absent for binary files and very large diffs.
    pub patch: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PullRequestDetails {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub state: String,
    pub head: String,
    pub base: String,
    pub body: String,
    pub files: Vec<ChangedFile>,
}

impl PullRequestDetails {
    /// Render the changed files as a unified diff.
    pub fn diff(&self) -> String {
        let mut out = String::new();
        for file in &self.files {
            out.push_str(&format!(
                "diff --git a/{0} b/{0} ({1}, +{2} -{3})\n",
                file.filename, file.status, file.additions, file.deletions
            ));
            match &file.patch {
                Some(patch) => {
                    out.push_str(patch);
                    if !patch.ends_with('\n') {
                        out.push('\n');
                    }
                }
                None => out.push_str("[no textual diff available]\n"),
            }
        }
        out
    }
}

/// A comment as GitHub reports it right after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: u64,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub author_login: String,
}

#[derive(Deserialize)]
struct CreatedComment {
    id: u64,
    #[serde(default)]
    body: Option<String>,
    created_at: DateTime<Utc>,
    html_url: String,
    user: CommentAuthor,
}

#[derive(Deserialize)]
struct CommentAuthor {
    login: String,
}

impl From<CreatedComment> for CommentRecord {
    fn from(c: CreatedComment) -> Self {
        Self {
            id: c.id,
            body: c.body.unwrap_or_default(),
            created_at: c.created_at,
            url: c.html_url,
            author_login: c.user.login,
        }
    }
}

/// The slice of the GitHub API the reviewer relies on.
#[async_trait]
pub trait PullRequestGateway: Send + Sync {
    async fn list_open_pulls(&self, repo: &RepoName) -> Result<Vec<PullSummary>, ReviewError>;

    async fn pull_request(
        &self,
        repo: &RepoName,
        number: u64,
    ) -> Result<PullRequestDetails, ReviewError>;

    /// Create one issue-style comment on a pull request. Not idempotent.
    async fn create_comment(
        &self,
        repo: &RepoName,
        number: u64,
        body: &str,
    ) -> Result<CommentRecord, ReviewError>;
}

pub fn build_client(token: &str, api_url: Option<&str>) -> Result<octocrab::Octocrab, ReviewError> {
    let mut builder = octocrab::OctocrabBuilder::new().personal_token(token.to_string());
    if let Some(url) = api_url {
        builder = builder.base_uri(url).map_err(|e| {
            ReviewError::Configuration(format!("Invalid GitHub API URL '{}': {}", url, e))
        })?;
    }
    builder
        .build()
        .map_err(|e| ReviewError::Configuration(format!("Failed to create GitHub client: {}", e)))
}

#[derive(Clone)]
pub struct OctocrabGateway {
    github: Arc<octocrab::Octocrab>,
}

impl OctocrabGateway {
    pub fn new(github: octocrab::Octocrab) -> Self {
        Self {
            github: Arc::new(github),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        route: &str,
        target: &str,
    ) -> Result<T, ReviewError> {
        self.github
            .get(route, None::<&()>)
            .await
            .map_err(|e| ReviewError::from_github(e, target))
    }
}

#[async_trait]
impl PullRequestGateway for OctocrabGateway {
    async fn list_open_pulls(&self, repo: &RepoName) -> Result<Vec<PullSummary>, ReviewError> {
        let route = format!(
            "/repos/{}/{}/pulls?state=open&sort=created&direction=desc&per_page=100",
            repo.owner, repo.name
        );
        let response: Vec<serde_json::Value> = self.get_json(&route, &repo.to_string()).await?;

        Ok(response
            .iter()
            .filter_map(|p| {
                Some(PullSummary {
                    number: p.get("number")?.as_u64()?,
                    title: p
                        .get("title")
                        .and_then(|t| t.as_str())
                        .unwrap_or("")
                        .to_string(),
                })
            })
            .collect())
    }

    async fn pull_request(
        &self,
        repo: &RepoName,
        number: u64,
    ) -> Result<PullRequestDetails, ReviewError> {
        let target = format!("{}#{}", repo, number);
        let pr: serde_json::Value = self
            .get_json(
                &format!("/repos/{}/{}/pulls/{}", repo.owner, repo.name, number),
                &target,
            )
            .await?;
        let files: Vec<serde_json::Value> = self
            .get_json(
                &format!(
                    "/repos/{}/{}/pulls/{}/files?per_page=100",
                    repo.owner, repo.name, number
                ),
                &target,
            )
            .await?;

        let text = |v: &serde_json::Value, pointer: &str| {
            v.pointer(pointer)
                .and_then(|s| s.as_str())
                .unwrap_or("")
                .to_string()
        };
        let count = |v: &serde_json::Value, key: &str| v.get(key).and_then(|n| n.as_u64()).unwrap_or(0);

        Ok(PullRequestDetails {
            number,
            title: text(&pr, "/title"),
            author: text(&pr, "/user/login"),
            state: text(&pr, "/state"),
            head: text(&pr, "/head/ref"),
            base: text(&pr, "/base/ref"),
            body: text(&pr, "/body"),
            files: files
                .iter()
                .map(|f| ChangedFile {
                    filename: text(f, "/filename"),
                    status: text(f, "/status"),
                    additions: count(f, "additions"),
                    deletions: count(f, "deletions"),
                    patch: f.get("patch").and_then(|p| p.as_str()).map(String::from),
                })
                .collect(),
        })
    }

    async fn create_comment(
        &self,
        repo: &RepoName,
        number: u64,
        body: &str,
    ) -> Result<CommentRecord, ReviewError> {
        let target = format!("{}#{}", repo, number);

        // The issues endpoint also accepts plain issues, so confirm the PR first.
        let _: serde_json::Value = self
            .get_json(
                &format!("/repos/{}/{}/pulls/{}", repo.owner, repo.name, number),
                &target,
            )
            .await
            .inspect_err(|e| tracing::error!(resource = %target, error = %e, "Pull request lookup failed"))?;

        let route = format!(
            "/repos/{}/{}/issues/{}/comments",
            repo.owner, repo.name, number
        );
        let created: CreatedComment = self
            .github
            .post(route, Some(&serde_json::json!({ "body": body })))
            .await
            .map_err(|e| {
                let err = ReviewError::from_github(e, &target);
                tracing::error!(resource = %target, error = %err, "Failed to post pull request comment");
                err
            })?;

        let record = CommentRecord::from(created);
        tracing::info!(resource = %target, comment_id = record.id, "Posted review comment");
        Ok(record)
    }
}

/// Post a single comment on `repository`'s pull request `pr_number`.
pub async fn post_comment(
    token: &str,
    repository: &str,
    pr_number: u64,
    body: &str,
    api_url: Option<&str>,
) -> Result<CommentRecord, ReviewError> {
    require_credential(token)?;
    let repo = RepoName::parse(repository)?;
    let gateway = OctocrabGateway::new(build_client(token, api_url)?);
    gateway.create_comment(&repo, pr_number, body).await
}
