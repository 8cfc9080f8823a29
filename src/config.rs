//! Runtime configuration shared by every review request.
//!
//! The server builds one [`ReviewConfig`] at startup from CLI flags and hands
//! it to the delegate factory; each request constructs its own GitHub and
//! model clients from it.

use crate::error::ReviewError;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "qwen3";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_REASONING_MARKER: &str = "</think>";
pub const DEFAULT_MAX_DIFF_CHARS: usize = 60_000;

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// When false, prompts carry the `/nothink` directive.
    pub think: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            think: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReviewConfig {
    pub model: ModelConfig,
    /// Override for GitHub Enterprise, e.g. `https://github.example.com/api/v3`.
    pub github_api_url: Option<String>,
    /// Publish the drafted comment on the pull request.
    pub post_comments: bool,
    pub reasoning_marker: String,
    pub max_diff_chars: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            github_api_url: None,
            post_comments: true,
            reasoning_marker: DEFAULT_REASONING_MARKER.to_string(),
            max_diff_chars: DEFAULT_MAX_DIFF_CHARS,
        }
    }
}

pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Resolve the GitHub token: `explicit` > `env_name` > `GITHUB_TOKEN`.
pub fn resolve_github_token(
    explicit: Option<&str>,
    env_name: Option<&str>,
) -> Result<String, ReviewError> {
    resolve_github_token_with(explicit, env_name, |name| std::env::var(name).ok())
}

fn resolve_github_token_with(
    explicit: Option<&str>,
    env_name: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ReviewError> {
    if let Some(token) = explicit.filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }
    let env_name = env_name.unwrap_or(DEFAULT_TOKEN_ENV);
    match lookup(env_name) {
        Some(token) if !token.is_empty() => {
            tracing::info!(env = env_name, "Read GitHub token from environment variable");
            Ok(token)
        }
        _ => Err(ReviewError::Configuration(format!(
            "{} environment variable is not set",
            env_name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_explicit_token_wins() {
        let token =
            resolve_github_token_with(Some("ghp_flag"), None, env(&[("GITHUB_TOKEN", "ghp_env")]))
                .unwrap();
        assert_eq!(token, "ghp_flag");
    }

    #[test]
    fn test_custom_env_name_then_default() {
        let vars = env(&[("REVIEW_TOKEN", "ghp_custom"), ("GITHUB_TOKEN", "ghp_env")]);
        assert_eq!(
            resolve_github_token_with(None, Some("REVIEW_TOKEN"), &vars).unwrap(),
            "ghp_custom"
        );
        assert_eq!(resolve_github_token_with(Some(""), None, &vars).unwrap(), "ghp_env");
    }

    #[test]
    fn test_missing_token_is_configuration_error() {
        let err = resolve_github_token_with(None, Some("REVIEW_TOKEN"), env(&[("REVIEW_TOKEN", "")]))
            .unwrap_err();
        match err {
            ReviewError::Configuration(msg) => assert!(msg.contains("REVIEW_TOKEN")),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }
}
