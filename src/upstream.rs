//! External resolution over a JSON DNS API.
//!
//! Speaks the `GET /resolve?name=...` dialect served by Google Public DNS:
//!
//! ```text
//! {"Status": 0, "Answer": [{"name": "...", "type": 1, "TTL": 300, "data": "93.184.216.34"}]}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::debug;

use crate::error::ResolveError;

/// Default JSON resolution endpoint.
pub const DEFAULT_UPSTREAM_URL: &str = "https://dns.google.com/resolve";

/// Resolves names that are not known locally.
#[async_trait]
pub trait ExternalResolver: Send + Sync {
    /// Resolve `domain` to a single address. One attempt, no retry.
    async fn resolve(&self, domain: &str) -> Result<String, ResolveError>;
}

/// Body returned by the resolution service.
///
/// Only the status and the answers' data are read. A missing status counts
/// as success.
#[derive(Debug, Deserialize)]
pub struct UpstreamResponse {
    #[serde(rename = "Status", default)]
    pub status: i64,
    #[serde(rename = "Answer", default)]
    pub answer: Vec<UpstreamAnswer>,
}

#[derive(Debug, Deserialize)]
pub struct UpstreamAnswer {
    pub data: String,
}

impl UpstreamResponse {
    /// Take the first answer's data, checking the query status first.
    pub fn into_address(self) -> Result<String, ResolveError> {
        if self.status != 0 {
            return Err(ResolveError::UpstreamStatus(self.status));
        }

        self.answer
            .into_iter()
            .next()
            .map(|answer| answer.data)
            .ok_or(ResolveError::NoAnswer)
    }
}

/// HTTP client for the JSON resolution API.
pub struct HttpResolver {
    client: reqwest::Client,
    url: String,
}

impl HttpResolver {
    /// Create a resolver for `url`. `timeout` bounds each request.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()?;

        Ok(Self::with_client(client, url))
    }

    /// Use an already configured client.
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ExternalResolver for HttpResolver {
    async fn resolve(&self, domain: &str) -> Result<String, ResolveError> {
        debug!(url = %self.url, domain, "querying upstream");

        let response = self
            .client
            .get(&self.url)
            .query(&[("name", domain)])
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ResolveError::HttpStatus(status));
        }

        let body = response.bytes().await?;
        let parsed: UpstreamResponse = serde_json::from_slice(&body)?;

        parsed.into_address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP/1.1 response and hand back the raw request head.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let mut total = 0;
            loop {
                let n = stream.read(&mut buf[total..]).await.unwrap();
                if n == 0 {
                    break;
                }
                total += n;
                if buf[..total].windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }

            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;

            String::from_utf8_lossy(&buf[..total]).into_owned()
        });

        (format!("http://{addr}/resolve"), handle)
    }

    fn resolver(url: &str) -> HttpResolver {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        HttpResolver::with_client(client, url)
    }

    #[test]
    fn new_keeps_url() {
        let resolver = HttpResolver::new(DEFAULT_UPSTREAM_URL, Duration::from_secs(1)).unwrap();

        assert_eq!(resolver.url(), "https://dns.google.com/resolve");
    }

    #[test]
    fn into_address_takes_first_answer() {
        let parsed: UpstreamResponse = serde_json::from_str(
            r#"{"Status":0,"Answer":[
                {"name":"a.example.","type":1,"TTL":60,"data":"10.0.0.1"},
                {"name":"a.example.","type":1,"TTL":60,"data":"10.0.0.2"}]}"#,
        )
        .unwrap();

        assert_eq!(parsed.into_address().unwrap(), "10.0.0.1");
    }

    #[test]
    fn missing_status_counts_as_success() {
        let parsed: UpstreamResponse =
            serde_json::from_str(r#"{"Answer":[{"data":"1.2.3.4"}]}"#).unwrap();

        assert_eq!(parsed.status, 0);
        assert_eq!(parsed.into_address().unwrap(), "1.2.3.4");
    }

    #[test]
    fn unused_answer_fields_are_not_validated() {
        let parsed: UpstreamResponse = serde_json::from_str(
            r#"{"Status":0,"Answer":[{"name":null,"type":-5,"TTL":-1,"data":"10.0.0.9"}]}"#,
        )
        .unwrap();

        assert_eq!(parsed.into_address().unwrap(), "10.0.0.9");
    }

    #[test]
    fn into_address_rejects_error_status() {
        let parsed: UpstreamResponse = serde_json::from_str(r#"{"Status":3}"#).unwrap();

        assert!(matches!(
            parsed.into_address(),
            Err(ResolveError::UpstreamStatus(3))
        ));
    }

    #[test]
    fn into_address_rejects_empty_answer() {
        let parsed: UpstreamResponse = serde_json::from_str(r#"{"Status":0,"Answer":[]}"#).unwrap();

        assert!(matches!(parsed.into_address(), Err(ResolveError::NoAnswer)));
    }

    #[tokio::test]
    async fn resolve_sends_name_and_parses_answer() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"Status":0,"Answer":[{"name":"www.google.com.","type":1,"TTL":300,"data":"142.250.0.1"}]}"#,
        )
        .await;

        let address = resolver(&url).resolve("www.google.com.").await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(address, "142.250.0.1");
        assert!(request.starts_with("GET /resolve?name=www.google.com. HTTP/1.1"));
    }

    #[tokio::test]
    async fn resolve_reports_http_status() {
        let (url, server) = serve_once("HTTP/1.1 503 Service Unavailable", "{}").await;

        let result = resolver(&url).resolve("www.google.com.").await;
        server.await.unwrap();

        match result {
            Err(ResolveError::HttpStatus(status)) => assert_eq!(status.as_u16(), 503),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn resolve_rejects_non_ok_success_status() {
        let (url, server) = serve_once(
            "HTTP/1.1 203 Non-Authoritative Information",
            r#"{"Status":0,"Answer":[{"data":"10.0.0.1"}]}"#,
        )
        .await;

        let result = resolver(&url).resolve("www.google.com.").await;
        server.await.unwrap();

        match result {
            Err(ResolveError::HttpStatus(status)) => assert_eq!(status.as_u16(), 203),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn resolve_reports_upstream_status() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", r#"{"Status":2,"Answer":[]}"#).await;

        let result = resolver(&url).resolve("broken.example.").await;
        server.await.unwrap();

        assert!(matches!(result, Err(ResolveError::UpstreamStatus(2))));
    }

    #[tokio::test]
    async fn resolve_reports_invalid_body() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", "not json").await;

        let result = resolver(&url).resolve("www.google.com.").await;
        server.await.unwrap();

        assert!(matches!(result, Err(ResolveError::InvalidBody(_))));
    }

    #[tokio::test]
    async fn resolve_reports_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = resolver(&format!("http://{addr}/resolve"))
            .resolve("www.google.com.")
            .await;

        assert!(matches!(result, Err(ResolveError::Transport(_))));
    }
}
