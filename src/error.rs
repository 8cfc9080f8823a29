use rmcp::model::ErrorData;

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("GitHub rejected the credential: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl ReviewError {
    pub fn to_mcp_error(&self) -> ErrorData {
        match self {
            ReviewError::Configuration(_)
            | ReviewError::InvalidParam(_)
            | ReviewError::Auth(_)
            | ReviewError::NotFound(_) => ErrorData::invalid_params(self.to_string(), None),
            ReviewError::Upstream(_) => ErrorData::internal_error(self.to_string(), None),
        }
    }

    /// Convert an octocrab failure for `target` into the review taxonomy.
    pub fn from_github(err: octocrab::Error, target: &str) -> Self {
        match err {
            octocrab::Error::GitHub { source, .. } => {
                classify_status(source.status_code.as_u16(), &source.message, target)
            }
            other => ReviewError::Upstream(format!("GitHub request for {} failed: {}", target, other)),
        }
    }
}

/// Classify a failed GitHub call by its HTTP status.
pub fn classify_status(status: u16, message: &str, target: &str) -> ReviewError {
    match status {
        401 | 403 => ReviewError::Auth(format!("{} ({})", message, target)),
        404 => ReviewError::NotFound(target.to_string()),
        _ => ReviewError::Upstream(format!("GitHub API error {} on {}: {}", status, target, message)),
    }
}

/// Failures seen by the remote-invocation client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Could not connect to {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("Malformed response envelope: {0}")]
    Protocol(String),

    #[error("Server reported an error: {0}")]
    Remote(String),
}
