//! MCP server that runs an LLM security review on GitHub pull requests.
//!
//! Exposes a single `github_security_analysis` tool: fetch a PR and its diff,
//! ask a local Ollama model for security findings, draft a review comment
//! with a merge recommendation, and post it back to the PR. A matching
//! client calls the tool over streamable HTTP.

pub mod analysis;
pub mod client;
pub mod config;
pub mod error;
pub mod github;
pub mod model;
pub mod prompts;
pub mod server;
