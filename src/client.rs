//! Client side of the `github_security_analysis` tool.
//!
//! Opens one streamable HTTP connection, performs the MCP handshake, calls
//! the tool once and decodes the double-encoded result envelope.

use rmcp::model::{CallToolRequestParams, ClientInfo, Implementation};
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::service::ServiceError;
use rmcp::ServiceExt;
use serde_json::Value;

use crate::analysis::AnalysisResult;
use crate::error::ClientError;
use crate::server::TOOL_NAME;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/mcp";

/// What the client got back: the raw envelope and its decoded payload.
#[derive(Debug, Clone)]
pub struct AnalysisResponse {
    pub envelope: Value,
    pub result: AnalysisResult,
}

/// Extract the [`AnalysisResult`] from `content[0].text` of a tool result envelope.
pub fn decode_envelope(envelope: &Value) -> Result<AnalysisResult, ClientError> {
    let text = envelope
        .pointer("/content/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::Protocol("expected content[0].text in tool result".to_string()))?;

    if envelope.get("isError").and_then(Value::as_bool) == Some(true) {
        return Err(ClientError::Remote(text.to_string()));
    }

    serde_json::from_str(text)
        .map_err(|e| ClientError::Protocol(format!("tool result text is not an analysis result: {}", e)))
}

pub async fn call_security_analysis(
    endpoint: &str,
    github_token: &str,
    repo_name: &str,
    pr_number: Option<u64>,
) -> Result<AnalysisResponse, ClientError> {
    let connection_error = |reason: String| ClientError::Connection {
        endpoint: endpoint.to_string(),
        reason,
    };

    let transport = StreamableHttpClientTransport::from_uri(endpoint.to_string());
    let client_info = ClientInfo {
        client_info: Implementation {
            name: "mcp-security-review-client".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Default::default()
        },
        ..Default::default()
    };

    let client = client_info
        .serve(transport)
        .await
        .map_err(|e| connection_error(e.to_string()))?;
    if let Some(info) = client.peer_info() {
        tracing::info!(server = %info.server_info.name, version = %info.server_info.version, "Connected to MCP server");
    }

    let params: CallToolRequestParams = serde_json::from_value(serde_json::json!({
        "name": TOOL_NAME,
        "arguments": {
            "github_token": github_token,
            "repo_name": repo_name,
            "pr_number": pr_number,
        },
    }))
    .map_err(|e| ClientError::Protocol(format!("could not build tool call: {}", e)))?;

    let outcome = client.call_tool(params).await;
    if let Err(e) = client.cancel().await {
        tracing::debug!(error = %e, "Closing MCP session failed");
    }

    let call_result = outcome.map_err(|e| match e {
        ServiceError::McpError(data) => ClientError::Remote(data.message.to_string()),
        other => connection_error(other.to_string()),
    })?;

    let envelope = serde_json::to_value(&call_result)
        .map_err(|e| ClientError::Protocol(format!("could not re-encode tool result: {}", e)))?;
    let result = decode_envelope(&envelope)?;
    Ok(AnalysisResponse { envelope, result })
}
