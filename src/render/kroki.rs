//! HTTP client for a Kroki instance.
//!
//! Kroki accepts the diagram source as the plain request body:
//!
//! ```text
//! POST {base_url}/graphviz/svg
//! Content-Type: text/plain
//!
//! digraph D { ... }
//! ```
//!
//! and answers with the SVG document. No retries: a local Kroki container
//! either answers or is down, and a down service is reported once per EBD
//! through the error ledger.

use super::SvgRenderer;
use crate::config::Settings;
use crate::error::KrokiError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

/// Renders DOT to SVG through Kroki.
#[derive(Debug, Clone)]
pub struct KrokiClient {
    client: reqwest::Client,
    endpoint: String,
    timeout_secs: u64,
}

impl KrokiClient {
    pub fn new(settings: &Settings, timeout_secs: u64) -> Result<Self, KrokiError> {
        Self::with_base_url(&settings.base_url(), timeout_secs)
    }

    pub fn with_base_url(base_url: &str, timeout_secs: u64) -> Result<Self, KrokiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| KrokiError::Unclassified(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/graphviz/svg", base_url.trim_end_matches('/')),
            timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, e: reqwest::Error) -> KrokiError {
        if e.is_timeout() {
            KrokiError::Timeout {
                url: self.endpoint.clone(),
                secs: self.timeout_secs,
            }
        } else if e.is_connect() || e.is_request() {
            KrokiError::Unreachable {
                url: self.endpoint.clone(),
                reason: e.to_string(),
            }
        } else {
            KrokiError::Unclassified(e.to_string())
        }
    }
}

#[async_trait]
impl SvgRenderer for KrokiClient {
    async fn render_svg(&self, dot: &str) -> Result<String, KrokiError> {
        debug!("POST {} ({} bytes)", self.endpoint, dot.len());
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/plain")
            .body(dot.to_owned())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;
        if !status.is_success() {
            return Err(KrokiError::HttpStatus {
                status: status.as_u16(),
                body: body.trim().chars().take(200).collect(),
            });
        }
        if !body.contains("<svg") {
            return Err(KrokiError::InvalidResponse);
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one request with the given status line and body, returning the
    /// request (head + body) that was received.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length || n == 0 {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let reply = format!(
                "HTTP/1.1 {status}\r\nContent-Type: image/svg+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (base, handle)
    }

    #[tokio::test]
    async fn posts_dot_and_returns_svg() {
        let (base, server) = serve_once("200 OK", "<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>").await;
        let client = KrokiClient::with_base_url(&base, 5).unwrap();
        let svg = client.render_svg("digraph D { a -> b }").await.unwrap();
        assert!(svg.starts_with("<svg"));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /graphviz/svg HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("content-type: text/plain"));
        assert!(request.ends_with("digraph D { a -> b }"));
    }

    #[tokio::test]
    async fn http_error_status() {
        let (base, _server) = serve_once("400 Bad Request", "Error 400: syntax error in line 1").await;
        let client = KrokiClient::with_base_url(&base, 5).unwrap();
        match client.render_svg("digraph {").await {
            Err(KrokiError::HttpStatus { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("syntax error"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_svg_body_is_invalid() {
        let (base, _server) = serve_once("200 OK", "hello").await;
        let client = KrokiClient::with_base_url(&base, 5).unwrap();
        let err = client.render_svg("digraph D {}").await.unwrap_err();
        assert_eq!(err.kind(), "KrokiInvalidResponseError");
    }

    #[tokio::test]
    async fn unreachable_service() {
        let client = KrokiClient::with_base_url("http://127.0.0.1:1", 5).unwrap();
        let err = client.render_svg("digraph D {}").await.unwrap_err();
        assert_eq!(err.kind(), "KrokiUnreachableError");
        assert!(err.to_string().contains("127.0.0.1:1/graphviz/svg"));
    }

    #[tokio::test]
    async fn silent_service_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let client = KrokiClient::with_base_url(&base, 1).unwrap();
        match client.render_svg("digraph D {}").await {
            Err(KrokiError::Timeout { url, secs }) => {
                assert_eq!(url, format!("{base}/graphviz/svg"));
                assert_eq!(secs, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        server.abort();
    }

    #[test]
    fn endpoint_from_settings() {
        let settings = Settings {
            kroki_host: "localhost".into(),
            kroki_port: 8125,
        };
        let client = KrokiClient::new(&settings, 30).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8125/graphviz/svg");
    }
}
