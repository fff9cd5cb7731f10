use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read asset {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch asset {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("asset {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid asset location: {location}")]
    InvalidLocation { location: String },
}

/// Where the static CSV fallback files live: a local directory or a public
/// HTTP path.
#[derive(Clone, Debug)]
pub enum AssetSource {
    Dir(PathBuf),
    Http {
        base: reqwest::Url,
        client: reqwest::Client,
    },
}

impl AssetSource {
    /// `location` is either an `http(s)://` base URL or a filesystem path.
    pub fn from_location(location: &str, timeout: Duration) -> Result<Self, AssetError> {
        let trimmed = location.trim();
        if trimmed.is_empty() {
            return Err(AssetError::InvalidLocation {
                location: location.to_string(),
            });
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let base = reqwest::Url::parse(trimmed).map_err(|_| AssetError::InvalidLocation {
                location: location.to_string(),
            })?;
            if base.cannot_be_a_base() {
                return Err(AssetError::InvalidLocation {
                    location: location.to_string(),
                });
            }
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|source| AssetError::Fetch {
                    url: trimmed.to_string(),
                    source,
                })?;
            return Ok(Self::Http { base, client });
        }
        Ok(Self::Dir(crate::config::expand_tilde(trimmed)))
    }

    pub fn dir(path: impl AsRef<Path>) -> Self {
        Self::Dir(path.as_ref().to_path_buf())
    }

    pub async fn fetch_text(&self, name: &str) -> Result<String, AssetError> {
        match self {
            Self::Dir(dir) => {
                let path = dir.join(name);
                debug!(path = %path.display(), "reading fallback asset");
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|source| AssetError::Read {
                        path: path.display().to_string(),
                        source,
                    })
            }
            Self::Http { base, client } => {
                let url = asset_url(base, name);
                debug!(%url, "fetching fallback asset");
                let resp = client
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(|source| AssetError::Fetch {
                        url: url.to_string(),
                        source,
                    })?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(AssetError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                resp.text().await.map_err(|source| AssetError::Fetch {
                    url: url.to_string(),
                    source,
                })
            }
        }
    }
}

fn asset_url(base: &reqwest::Url, name: &str) -> reqwest::Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(name);
    }
    url
}
