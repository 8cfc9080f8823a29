use std::future::Future;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ServerHandler};
use serde::Deserialize;

use crate::analysis::{run_security_analysis, AnalysisRequest, Delegates};

pub const TOOL_NAME: &str = "github_security_analysis";

/// Path the streamable HTTP service is mounted under.
pub const MCP_PATH: &str = "/mcp";

#[derive(Clone)]
pub struct SecurityReviewServer {
    delegates: Arc<dyn Delegates>,
    tool_router: ToolRouter<Self>,
}

// -- Tool parameter types --

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SecurityAnalysisParams {
    #[schemars(description = "GitHub access token used to read the pull request and post the comment")]
    pub github_token: String,

    #[schemars(description = "Repository name in the format owner/repo")]
    pub repo_name: String,

    #[schemars(description = "Pull request number. If omitted, the open pull request with the highest number is analyzed")]
    #[serde(default)]
    pub pr_number: Option<u64>,
}

impl SecurityReviewServer {
    pub fn new(delegates: Arc<dyn Delegates>) -> Self {
        Self {
            delegates,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl SecurityReviewServer {
    #[tool(
        name = "github_security_analysis",
        description = "Run a security analysis on a GitHub pull request and generate a review comment. \
                       Returns the analysis, the comment, and the echoed repository and PR number as JSON"
    )]
    async fn github_security_analysis(
        &self,
        Parameters(params): Parameters<SecurityAnalysisParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = AnalysisRequest {
            repository: params.repo_name,
            pr_number: params.pr_number,
        };

        let result = run_security_analysis(self.delegates.as_ref(), &params.github_token, request)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Security analysis failed");
                e.to_mcp_error()
            })?;

        let text = serde_json::to_string(&result)
            .map_err(|e| ErrorData::internal_error(format!("Failed to encode result: {}", e), None))?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for SecurityReviewServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mcp-security-review".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "GitHub pull request security reviewer. Call github_security_analysis with a \
                 GitHub token and an owner/repo name, optionally a PR number."
                    .to_string(),
            ),
        }
    }
}

/// Serve `server` over streamable HTTP on `listener` until `shutdown` resolves.
pub async fn serve_http(
    listener: tokio::net::TcpListener,
    server: SecurityReviewServer,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );
    let router = axum::Router::new().nest_service(MCP_PATH, service);

    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, path = MCP_PATH, "Streamable HTTP transport listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
