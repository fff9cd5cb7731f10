use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server rejected the bearer token. The session has already been
    /// invalidated by the time a caller sees this.
    #[error("session expired or not signed in")]
    Unauthorized,

    #[error("request failed with HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request rejected by server: {message}")]
    Rejected { message: String },

    #[error("request failed: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid API URL: {url}")]
    InvalidUrl { url: String },

    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}
