//! The two-pass security review of a pull request.
//!
//! Pass one asks the model for security findings on the PR diff, pass two
//! turns those findings into a single review comment which is optionally
//! posted back to GitHub. Every request builds its own delegates through a
//! [`Delegates`] factory.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ReviewConfig;
use crate::error::ReviewError;
use crate::github::{
    build_client, require_credential, CommentRecord, OctocrabGateway, PullRequestGateway,
    PullSummary, RepoName,
};
use crate::model::{ChatModel, OllamaChat};
use crate::prompts;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub repository: String,
    /// `None` selects the open pull request with the highest number.
    pub pr_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis: String,
    pub comment: String,
    #[serde(rename = "repo_name")]
    pub repository: String,
    /// Echoed from the request.
    pub pr_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_pr: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_comment: Option<CommentRecord>,
}

/// Builds the per-request GitHub and model delegates.
pub trait Delegates: Send + Sync {
    fn github(&self, token: &str) -> Result<Arc<dyn PullRequestGateway>, ReviewError>;
    fn model(&self) -> Result<Arc<dyn ChatModel>, ReviewError>;
    fn config(&self) -> &ReviewConfig;
}

/// Delegates talking to GitHub through octocrab and to a local Ollama.
pub struct LiveDelegates {
    config: ReviewConfig,
}

impl LiveDelegates {
    pub fn new(config: ReviewConfig) -> Self {
        Self { config }
    }
}

impl Delegates for LiveDelegates {
    fn github(&self, token: &str) -> Result<Arc<dyn PullRequestGateway>, ReviewError> {
        let client = build_client(token, self.config.github_api_url.as_deref())?;
        Ok(Arc::new(OctocrabGateway::new(client)))
    }

    fn model(&self) -> Result<Arc<dyn ChatModel>, ReviewError> {
        Ok(Arc::new(OllamaChat::new(&self.config.model)))
    }

    fn config(&self) -> &ReviewConfig {
        &self.config
    }
}

/// Return the text after the first `marker`, or all of `text` when the
/// marker is absent.
pub fn extract_after_marker<'a>(text: &'a str, marker: &str) -> &'a str {
    if marker.is_empty() {
        return text;
    }
    match text.split_once(marker) {
        Some((_, after)) => after,
        None => text,
    }
}

/// Pick the pull request with the highest number.
pub fn select_latest(pulls: &[PullSummary]) -> Option<u64> {
    pulls.iter().map(|p| p.number).max()
}

/// Run the full review for `request` using `token` against GitHub.
pub async fn run_security_analysis(
    delegates: &dyn Delegates,
    token: &str,
    request: AnalysisRequest,
) -> Result<AnalysisResult, ReviewError> {
    require_credential(token)?;
    let repo = RepoName::parse(&request.repository)?;
    if request.pr_number == Some(0) {
        return Err(ReviewError::InvalidParam(
            "pr_number must be a positive integer".to_string(),
        ));
    }

    let github = delegates.github(token)?;
    let model = delegates.model()?;
    let config = delegates.config();

    let number = match request.pr_number {
        Some(n) => n,
        None => {
            let pulls = github.list_open_pulls(&repo).await?;
            select_latest(&pulls).ok_or_else(|| {
                ReviewError::NotFound(format!("no open pull requests in {}", repo))
            })?
        }
    };
    tracing::info!(repo = %repo, pr = number, model = model.id(), "Starting security review");

    let pr = github.pull_request(&repo, number).await?;
    let think = config.model.think;

    let raw_findings = model
        .complete(
            &prompts::analysis_system(&repo, model.id(), think),
            &prompts::analysis_prompt(&pr, config.max_diff_chars, think),
        )
        .await?;
    let analysis = extract_after_marker(&raw_findings, &config.reasoning_marker)
        .trim()
        .to_string();
    tracing::debug!(repo = %repo, pr = number, chars = analysis.len(), "Analysis pass finished");

    let raw_comment = model
        .complete(
            &prompts::comment_system(&repo, model.id(), think),
            &prompts::comment_prompt(number, &analysis, think),
        )
        .await?;
    let comment = extract_after_marker(&raw_comment, &config.reasoning_marker)
        .trim()
        .to_string();

    let posted_comment = if config.post_comments {
        Some(github.create_comment(&repo, number, &comment).await?)
    } else {
        tracing::info!(repo = %repo, pr = number, "Comment posting disabled, returning draft only");
        None
    };

    Ok(AnalysisResult {
        analysis,
        comment,
        repository: request.repository,
        pr_number: request.pr_number,
        reviewed_pr: Some(number),
        posted_comment,
    })
}
