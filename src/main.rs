use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mcp_security_review::analysis::{run_security_analysis, AnalysisRequest, LiveDelegates};
use mcp_security_review::client::{self, DEFAULT_ENDPOINT};
use mcp_security_review::config::{
    resolve_github_token, ModelConfig, ReviewConfig, DEFAULT_MAX_DIFF_CHARS, DEFAULT_MODEL,
    DEFAULT_OLLAMA_URL, DEFAULT_REASONING_MARKER, DEFAULT_TEMPERATURE,
};
use mcp_security_review::server::{self, SecurityReviewServer};
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::EnvFilter;

/// MCP security reviewer for GitHub pull requests
#[derive(Parser)]
#[command(name = "mcp-security-review", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the MCP server exposing the github_security_analysis tool
    Serve(ServeArgs),
    /// Call a running server once and print the result
    Analyze(AnalyzeArgs),
    /// Run the review in-process, without an MCP server
    Review(ReviewArgs),
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    Stdio,
    Http,
}

#[derive(clap::Args)]
struct ServeArgs {
    /// Transport to serve on
    #[arg(long, value_enum, default_value = "http")]
    transport: Transport,

    /// Listen address for the HTTP transport
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    #[command(flatten)]
    review: ReviewOptions,
}

/// Model and GitHub settings shared by `serve` and `review`.
#[derive(clap::Args)]
struct ReviewOptions {
    /// Base URL of the Ollama API
    #[arg(long, default_value = DEFAULT_OLLAMA_URL)]
    ollama_url: String,

    /// Model used for both review passes
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Let the model think (omit the /nothink directive)
    #[arg(long)]
    think: bool,

    /// Text separating the model's reasoning from its answer
    #[arg(long, default_value = DEFAULT_REASONING_MARKER)]
    reasoning_marker: String,

    /// GitHub API base URL (GitHub Enterprise)
    #[arg(long)]
    github_api_url: Option<String>,

    /// Draft the comment without posting it
    #[arg(long)]
    no_post: bool,

    /// Maximum diff characters sent to the model
    #[arg(long, default_value_t = DEFAULT_MAX_DIFF_CHARS)]
    max_diff_chars: usize,
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// Repository to analyze, as owner/repo
    #[arg(long)]
    repo: String,

    /// Pull request number (default: the open PR with the highest number)
    #[arg(long)]
    pr: Option<u64>,

    /// MCP endpoint of a running server
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    #[command(flatten)]
    token: TokenArgs,
}

#[derive(clap::Args)]
struct TokenArgs {
    /// GitHub personal access token.
    /// Can also be set via GITHUB_TOKEN environment variable.
    #[arg(long)]
    token: Option<String>,

    /// Read GitHub token from an environment variable.
    /// Default: GITHUB_TOKEN
    #[arg(long = "token-env")]
    token_env: Option<String>,
}

impl TokenArgs {
    fn resolve(&self) -> Result<String> {
        Ok(resolve_github_token(
            self.token.as_deref(),
            self.token_env.as_deref(),
        )?)
    }
}

#[derive(clap::Args)]
struct ReviewArgs {
    /// Repository to analyze, as owner/repo
    #[arg(long)]
    repo: String,

    /// Pull request number (default: the open PR with the highest number)
    #[arg(long)]
    pr: Option<u64>,

    #[command(flatten)]
    token: TokenArgs,

    #[command(flatten)]
    review: ReviewOptions,
}

impl ReviewOptions {
    fn into_config(self) -> ReviewConfig {
        ReviewConfig {
            model: ModelConfig {
                base_url: self.ollama_url,
                model: self.model,
                temperature: self.temperature,
                think: self.think,
            },
            github_api_url: self.github_api_url,
            post_comments: !self.no_post,
            reasoning_marker: self.reasoning_marker,
            max_diff_chars: self.max_diff_chars,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Analyze(args) => analyze(args).await,
        Command::Review(args) => review(args).await,
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = args.review.into_config();

    tracing::info!(
        ollama = %config.model.base_url,
        model = %config.model.model,
        post_comments = config.post_comments,
        "Starting mcp-security-review server"
    );

    let service = SecurityReviewServer::new(Arc::new(LiveDelegates::new(config)));

    match args.transport {
        Transport::Stdio => {
            let running = service.serve(stdio()).await?;
            running.waiting().await?;
        }
        Transport::Http => {
            let listener = tokio::net::TcpListener::bind(args.bind)
                .await
                .with_context(|| format!("Failed to bind {}", args.bind))?;
            server::serve_http(listener, service, shutdown_signal()).await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl+c");
        }
    };

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(_) => ctrl_c.await,
        }
    }
    #[cfg(not(unix))]
    ctrl_c.await;

    tracing::info!("Shutdown signal received, stopping server");
}

async fn analyze(args: AnalyzeArgs) -> Result<()> {
    // Resolve token: --token > --token-env > GITHUB_TOKEN
    let token = args.token.resolve()?;

    println!("Connecting to MCP server at {}...", args.endpoint);
    println!("Running security analysis on {}...", args.repo);

    let response = client::call_security_analysis(&args.endpoint, &token, &args.repo, args.pr)
        .await
        .with_context(|| format!("Make sure the MCP server is running at {}", args.endpoint))?;

    println!("\nSecurity Analysis Result:");
    println!("{}", serde_json::to_string_pretty(&response.envelope)?);

    let result = &response.result;
    println!("\nSummary:");
    println!("Repository: {}", result.repository);
    match result.pr_number.or(result.reviewed_pr) {
        Some(n) => println!("PR Number: {}", n),
        None => println!("PR Number: Latest"),
    }
    println!("Analysis length: {} characters", result.analysis.chars().count());
    println!("Comment length: {} characters", result.comment.chars().count());
    if let Some(posted) = &result.posted_comment {
        println!("Comment posted: {}", posted.url);
    }

    Ok(())
}

async fn review(args: ReviewArgs) -> Result<()> {
    let token = args.token.resolve()?;
    let config = args.review.into_config();
    tracing::info!(
        repo = %args.repo,
        model = %config.model.model,
        post_comments = config.post_comments,
        "Running in-process security review"
    );

    let delegates = LiveDelegates::new(config);
    let result = run_security_analysis(
        &delegates,
        &token,
        AnalysisRequest {
            repository: args.repo,
            pr_number: args.pr,
        },
    )
    .await?;

    if let Some(n) = result.reviewed_pr {
        println!("Reviewed {}#{}", result.repository, n);
    }
    println!("\nSecurity Analysis:\n{}", result.analysis);
    println!("\nComment:\n{}", result.comment);
    match &result.posted_comment {
        Some(posted) => println!("\nComment posted: {}", posted.url),
        None => println!("\nComment not posted (--no-post)"),
    }

    Ok(())
}
