//! # Remote Snapshot Transport
//!
//! Moves whole-dataset snapshots to and from the remote store. Each call
//! is all-or-nothing; there is no partial sync.
//!
//! ## HTTP Contract
//! ```text
//!   push:  PUT  <url>   Authorization: Bearer <secret>   body: snapshot JSON
//!          2xx → ok            anything else → RemoteRejected { status }
//!
//!   pull:  GET  <url>   Authorization: Bearer <secret>
//!          200 + object → Some(snapshot)
//!          200 + null, 204, 404 → None (remote has nothing yet)
//!          200 + non-object → InvalidSnapshot
//! ```

use futures_util::future::BoxFuture;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{SyncError, SyncResult};

/// Where the remote store lives, as read from `Settings.cloudSync`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    pub url: String,
    pub secret: Option<String>,
}

impl RemoteEndpoint {
    pub fn new(url: impl Into<String>, secret: Option<String>) -> Self {
        RemoteEndpoint {
            url: url.into(),
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// Parses the URL; only http and https are accepted.
    pub fn parsed_url(&self) -> SyncResult<Url> {
        let url = Url::parse(self.url.trim())?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(SyncError::InvalidUrl(format!(
                "expected http or https, got {other}://"
            ))),
        }
    }
}

/// Full-snapshot exchange with the remote store.
pub trait RemoteTransport: Send + Sync {
    fn push_snapshot<'a>(
        &'a self,
        endpoint: &'a RemoteEndpoint,
        snapshot: &'a Value,
    ) -> BoxFuture<'a, SyncResult<()>>;

    /// `Ok(None)` when the remote holds no snapshot yet.
    fn pull_snapshot<'a>(
        &'a self,
        endpoint: &'a RemoteEndpoint,
    ) -> BoxFuture<'a, SyncResult<Option<Value>>>;
}

// =============================================================================
// HTTP Transport
// =============================================================================

/// [`RemoteTransport`] over plain HTTP(S) JSON.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpRemote {
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tally-station/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Internal(format!("HTTP client: {e}")))?;
        Ok(HttpRemote { client, timeout })
    }

    fn request(&self, method: reqwest::Method, endpoint: &RemoteEndpoint) -> SyncResult<reqwest::RequestBuilder> {
        let url = endpoint.parsed_url()?;
        let mut req = self.client.request(method, url);
        if let Some(secret) = &endpoint.secret {
            req = req.bearer_auth(secret);
        }
        Ok(req)
    }

    fn map_send_error(&self, err: reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout(self.timeout.as_secs())
        } else {
            err.into()
        }
    }
}

impl RemoteTransport for HttpRemote {
    fn push_snapshot<'a>(
        &'a self,
        endpoint: &'a RemoteEndpoint,
        snapshot: &'a Value,
    ) -> BoxFuture<'a, SyncResult<()>> {
        Box::pin(async move {
            let resp = self
                .request(reqwest::Method::PUT, endpoint)?
                .json(snapshot)
                .send()
                .await
                .map_err(|e| self.map_send_error(e))?;

            let status = resp.status();
            debug!(status = status.as_u16(), "Snapshot pushed");
            if !status.is_success() {
                return Err(SyncError::RemoteRejected {
                    status: status.as_u16(),
                });
            }
            Ok(())
        })
    }

    fn pull_snapshot<'a>(
        &'a self,
        endpoint: &'a RemoteEndpoint,
    ) -> BoxFuture<'a, SyncResult<Option<Value>>> {
        Box::pin(async move {
            let resp = self
                .request(reqwest::Method::GET, endpoint)?
                .send()
                .await
                .map_err(|e| self.map_send_error(e))?;

            let status = resp.status();
            debug!(status = status.as_u16(), "Snapshot pulled");
            if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
                return Ok(None);
            }
            if !status.is_success() {
                return Err(SyncError::RemoteRejected {
                    status: status.as_u16(),
                });
            }

            let body: Value = resp.json().await.map_err(|e| self.map_send_error(e))?;
            snapshot_from_body(body)
        })
    }
}

/// Accepts an object, maps `null` to "nothing stored", rejects the rest.
fn snapshot_from_body(body: Value) -> SyncResult<Option<Value>> {
    match body {
        Value::Null => Ok(None),
        Value::Object(_) => Ok(Some(body)),
        other => Err(SyncError::InvalidSnapshot(format!(
            "expected an object, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_url_validation() {
        assert!(RemoteEndpoint::new("https://sync.example.test/store/1", None)
            .parsed_url()
            .is_ok());
        assert!(matches!(
            RemoteEndpoint::new("ftp://example.test", None).parsed_url(),
            Err(SyncError::InvalidUrl(_))
        ));
        assert!(matches!(
            RemoteEndpoint::new("not a url", None).parsed_url(),
            Err(SyncError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_empty_secret_is_dropped() {
        let endpoint = RemoteEndpoint::new("https://x.test", Some(String::new()));
        assert_eq!(endpoint.secret, None);
    }

    #[test]
    fn test_snapshot_body_shapes() {
        assert_eq!(snapshot_from_body(Value::Null).unwrap(), None);
        assert!(snapshot_from_body(json!({ "products": [] })).unwrap().is_some());
        assert!(matches!(
            snapshot_from_body(json!([1, 2])),
            Err(SyncError::InvalidSnapshot(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_any_request() {
        let remote = HttpRemote::new(Duration::from_secs(1)).unwrap();
        let endpoint = RemoteEndpoint::new("mailto:someone@example.test", None);
        let err = remote.pull_snapshot(&endpoint).await.unwrap_err();
        assert!(err.is_config_error());
    }
}
