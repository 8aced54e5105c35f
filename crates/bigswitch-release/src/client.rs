//! Connection handling shared by the status and promote calls.

use std::time::Duration;

use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HOST, USER_AGENT};
use http::{Method, Request, Uri};
use http_body_util::{BodyExt, Full};
use tracing::debug;

use bigswitch_core::config::DEFAULT_REQUEST_TIMEOUT;
use bigswitch_core::{ReleaseError, ReleaseManagerConfig, ReleaseResult};

const CALLER_HEADER: &str = "x-caller-email";

/// Client for the release manager's status and release endpoints.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    /// `host:port` to connect to.
    authority: String,
    /// Base path without a trailing slash (usually empty).
    base_path: String,
    token: String,
    caller: String,
    timeout: Duration,
}

impl ReleaseClient {
    /// Create a client for `base_url`, e.g. `http://release-manager:8080/api`.
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        caller: impl Into<String>,
    ) -> ReleaseResult<Self> {
        let uri: Uri = base_url
            .trim()
            .parse()
            .map_err(|e: http::uri::InvalidUri| ReleaseError::InvalidUrl(e.to_string()))?;

        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => return Err(ReleaseError::UnsupportedScheme(other.to_string())),
            None => return Err(ReleaseError::InvalidUrl(base_url.to_string())),
        }

        let authority = uri
            .authority()
            .ok_or_else(|| ReleaseError::InvalidUrl(base_url.to_string()))?;
        let port = authority.port_u16().unwrap_or(80);

        Ok(Self {
            authority: format!("{}:{port}", authority.host()),
            base_path: uri.path().trim_end_matches('/').to_string(),
            token: token.into(),
            caller: caller.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Build a client from the `[release_manager]` config section.
    pub fn from_config(config: &ReleaseManagerConfig, timeout: Duration) -> ReleaseResult<Self> {
        Ok(Self::new(&config.url, &config.token, &config.caller)?.with_timeout(timeout))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn caller(&self) -> &str {
        &self.caller
    }

    pub(crate) fn path(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_path)
    }

    /// Send one request and return the body of a 2xx response.
    pub(crate) async fn send(
        &self,
        method: Method,
        path_and_query: &str,
        json_body: Option<Vec<u8>>,
    ) -> ReleaseResult<Bytes> {
        match tokio::time::timeout(self.timeout, self.exchange(method, path_and_query, json_body))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                debug!(path = %path_and_query, "release manager request timed out");
                Err(ReleaseError::Timeout(self.timeout))
            }
        }
    }

    async fn exchange(
        &self,
        method: Method,
        path_and_query: &str,
        json_body: Option<Vec<u8>>,
    ) -> ReleaseResult<Bytes> {
        let stream = tokio::net::TcpStream::connect(self.authority.as_str())
            .await
            .map_err(|e| ReleaseError::Connect(e.to_string()))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| ReleaseError::Connect(e.to_string()))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "release manager connection closed with error");
            }
        });

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(path_and_query)
            .header(HOST, self.authority.as_str())
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(CALLER_HEADER, self.caller.as_str())
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, "big-switch/0.1");
        if json_body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let req = builder
            .body(Full::new(Bytes::from(json_body.unwrap_or_default())))
            .map_err(|e| ReleaseError::Request(e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| ReleaseError::Request(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ReleaseError::Request(e.to_string()))?
            .to_bytes();

        debug!(%method, path = %path_and_query, %status, bytes = body.len(), "release manager responded");

        if !status.is_success() {
            return Err(ReleaseError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_port_and_path() {
        let c = ReleaseClient::new("http://rm.local:9090/api/", "t", "me@local.com").unwrap();
        assert_eq!(c.authority, "rm.local:9090");
        assert_eq!(c.path("status"), "/api/status");
        assert_eq!(c.caller(), "me@local.com");
    }

    #[test]
    fn default_port_is_80() {
        let c = ReleaseClient::new("http://rm.local", "t", "c").unwrap();
        assert_eq!(c.authority, "rm.local:80");
        assert_eq!(c.path("release"), "/release");
    }

    #[test]
    fn https_is_rejected() {
        let err = ReleaseClient::new("https://rm.local", "t", "c").unwrap_err();
        assert!(matches!(err, ReleaseError::UnsupportedScheme(s) if s == "https"));
    }

    #[test]
    fn relative_url_is_rejected() {
        let err = ReleaseClient::new("/status", "t", "c").unwrap_err();
        assert!(matches!(err, ReleaseError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn connection_refused_is_connect_error() {
        let c = ReleaseClient::new("http://127.0.0.1:1", "t", "c")
            .unwrap()
            .with_timeout(Duration::from_millis(500));
        let err = c.send(Method::GET, "/status", None).await.unwrap_err();
        assert!(matches!(err, ReleaseError::Connect(_) | ReleaseError::Timeout(_)));
    }
}
