//! HTTP-backed peer getter

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::peers::PeerGetter;

/// Fetches values from one remote peer over HTTP.
///
/// Requests `GET {base_url}{group}/{key}` and expects the raw value bytes
/// on a 200 response. Any connection failure, non-success status, or body
/// read error is reported as a transport failure; the caller never falls
/// back to its local loader for a peer-owned key.
pub struct HttpGetter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGetter {
    /// Create a getter for the peer behind `base_url`
    /// (peer address plus pool base path, e.g. `http://10.0.0.2:8001/_dawncache/`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a getter reusing an existing HTTP client's connection pool
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PeerGetter for HttpGetter {
    async fn get(&self, group: &str, key: &str) -> Result<Vec<u8>> {
        let url = format!("{}{group}/{key}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| Error::PeerTransport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::PeerTransport(format!(
                "peer returned status {status} for {url}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| Error::PeerTransport(format!("reading peer response: {err}")))?;
        Ok(body.to_vec())
    }
}
