pub mod error;
pub mod resources;

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use error::ApiError;
pub use resources::*;

use crate::session::Session;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Loosely-typed filter bag sent as query parameters.
pub type Filters = BTreeMap<String, String>;

pub fn filters<I, K, V>(pairs: I) -> Filters
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
            error: None,
        }
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Body<T> {
    Envelope(ApiResponse<T>),
    Bare(T),
}

/// Thin JSON-over-HTTP wrapper. Injects the session's bearer token and
/// invalidates the session on 401. No retries and no caching.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, session: Session) -> Result<Self, ApiError> {
        let base = base_url.trim().trim_end_matches('/').to_string();
        if reqwest::Url::parse(&base).is_err() {
            return Err(ApiError::InvalidUrl {
                url: base_url.to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|source| ApiError::ClientBuild { source })?;

        Ok(Self {
            http,
            base_url: base,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&Filters>,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send::<T, ()>(Method::GET, path, query, None).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send(Method::POST, path, None, body).await
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send(Method::PUT, path, None, Some(body)).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send::<T, ()>(Method::DELETE, path, None, None).await
    }

    async fn send<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: Option<&Filters>,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "api request");

        let mut req = self.http.request(method.clone(), &url);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            req = req.query(query);
        }
        if let Some(token) = self.session.token() {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|source| ApiError::Transport { source })?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|source| ApiError::Transport { source })?;

        if status == StatusCode::UNAUTHORIZED {
            warn!(%method, path, "api returned 401");
            self.session.invalidate();
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let message = error_message(&bytes).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("API request failed")
                    .to_string()
            });
            debug!(status = status.as_u16(), %message, "api error response");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        decode_body(path, &bytes)
    }
}

fn decode_body<T: DeserializeOwned>(path: &str, bytes: &[u8]) -> Result<ApiResponse<T>, ApiError> {
    let value: serde_json::Value = if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(bytes).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })?
    };

    if value.get("success").and_then(|s| s.as_bool()) == Some(false) {
        let message = value
            .get("error")
            .or_else(|| value.get("message"))
            .and_then(|m| m.as_str())
            .unwrap_or("API request failed")
            .to_string();
        return Err(ApiError::Rejected { message });
    }

    match serde_json::from_value::<Body<T>>(value) {
        Ok(Body::Envelope(envelope)) => Ok(envelope),
        Ok(Body::Bare(data)) => Ok(ApiResponse::ok(data)),
        Err(source) => Err(ApiError::Decode {
            path: path.to_string(),
            source,
        }),
    }
}

fn error_message(bytes: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    ["message", "detail", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|m| m.as_str()))
        .map(|m| m.to_string())
}
