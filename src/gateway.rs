//! Remote quote source.
//!
//! The remote side is a plain JSON endpoint: `GET` returns an array of
//! records carrying at least a `title`, `POST` accepts the full local list.
//! Neither direction ever fails the caller; problems are logged and, for
//! fetches, reported through [`FetchOutcome::Failed`] so they are never
//! mistaken for an empty remote list.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::config::RemoteConfig;
use crate::quote::Quote;

/// Result of asking the remote for its quotes.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The remote answered; the list may legitimately be empty.
    Fetched(Vec<Quote>),
    /// Network, status or decode failure. Carries a description for logs.
    Failed(String),
}

#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Retrieve the remote list, mapped into quotes.
    async fn fetch(&self) -> FetchOutcome;

    /// Best-effort one-way send of the full local list.
    async fn push(&self, quotes: &[Quote]);
}

/// reqwest-backed client for the remote endpoint
pub struct HttpGateway {
    client: reqwest::Client,
    endpoint: String,
    default_category: String,
    max_records: Option<usize>,
}

impl HttpGateway {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("quotesync/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            default_category: config.default_category.clone(),
            max_records: config.max_records,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn try_fetch(&self) -> Result<Vec<Quote>> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .context("request failed")?
            .error_for_status()?;

        let records: Vec<Value> = response
            .json()
            .await
            .context("response is not a JSON array")?;

        Ok(self.map_records(&records))
    }

    async fn try_push(&self, quotes: &[Quote]) -> Result<reqwest::StatusCode> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(quotes)
            .send()
            .await
            .context("request failed")?
            .error_for_status()?;
        Ok(response.status())
    }

    /// Map remote records into quotes. Records without a string `title` are skipped.
    fn map_records(&self, records: &[Value]) -> Vec<Quote> {
        let quotes = records
            .iter()
            .filter_map(|record| record.get("title")?.as_str())
            .map(|title| Quote::new(title, self.default_category.as_str()));

        match self.max_records {
            Some(max) => quotes.take(max).collect(),
            None => quotes.collect(),
        }
    }
}

#[async_trait]
impl RemoteSource for HttpGateway {
    async fn fetch(&self) -> FetchOutcome {
        match self.try_fetch().await {
            Ok(quotes) => {
                tracing::debug!(endpoint = %self.endpoint, count = quotes.len(), "fetched remote quotes");
                FetchOutcome::Fetched(quotes)
            }
            Err(e) => {
                let reason = format!("{e:#}");
                tracing::warn!(endpoint = %self.endpoint, err = %reason, "remote fetch failed");
                FetchOutcome::Failed(reason)
            }
        }
    }

    async fn push(&self, quotes: &[Quote]) {
        match self.try_push(quotes).await {
            Ok(status) => {
                tracing::info!(endpoint = %self.endpoint, count = quotes.len(), %status, "pushed local quotes");
            }
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, err = ?e, "remote push failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn gateway_at(endpoint: &str, max_records: Option<usize>) -> HttpGateway {
        HttpGateway::new(&RemoteConfig {
            endpoint: endpoint.to_string(),
            default_category: "Server".to_string(),
            timeout_secs: 2,
            max_records,
        })
        .unwrap()
    }

    fn gateway(max_records: Option<usize>) -> HttpGateway {
        gateway_at("http://127.0.0.1:9/posts", max_records)
    }

    /// Read one HTTP/1.1 request: headers, then `content-length` bytes of body.
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.trim().eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8(buf).unwrap()
    }

    /// Serve a single request with a canned response. The task yields the raw
    /// request it answered.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let task = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });

        (format!("http://{addr}/posts"), task)
    }

    fn request_body(request: &str) -> Value {
        let (_, body) = request.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_records_map_title_to_text_with_default_category() {
        let records = vec![
            json!({"userId": 1, "id": 1, "title": "sunt aut facere", "body": "..."}),
            json!({"id": 2, "title": "qui est esse"}),
        ];

        let quotes = gateway(None).map_records(&records);
        assert_eq!(
            quotes,
            vec![
                Quote::new("sunt aut facere", "Server"),
                Quote::new("qui est esse", "Server"),
            ]
        );
    }

    #[test]
    fn test_records_without_title_are_skipped() {
        let records = vec![
            json!({"id": 1}),
            json!({"title": 42}),
            json!("bare string"),
            json!({"title": "kept"}),
        ];

        assert_eq!(gateway(None).map_records(&records), vec![Quote::new("kept", "Server")]);
    }

    #[test]
    fn test_max_records_truncates() {
        let records: Vec<Value> = (0..10).map(|i| json!({"title": format!("t{i}")})).collect();

        let quotes = gateway(Some(3)).map_records(&records);
        assert_eq!(quotes.len(), 3);
        assert_eq!(quotes[2].text, "t2");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_failed_not_empty() {
        let outcome = gateway(None).fetch().await;
        assert!(matches!(outcome, FetchOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_fetch_decodes_server_response() {
        let (endpoint, server) = serve_once(
            "200 OK",
            r#"[{"userId":1,"id":1,"title":"first"},{"id":2},{"id":3,"title":"second"}]"#,
        )
        .await;

        let outcome = gateway_at(&endpoint, None).fetch().await;
        assert_eq!(
            outcome,
            FetchOutcome::Fetched(vec![
                Quote::new("first", "Server"),
                Quote::new("second", "Server"),
            ])
        );

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /posts HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_fetch_empty_array_is_fetched_not_failed() {
        let (endpoint, server) = serve_once("200 OK", "[]").await;

        assert_eq!(gateway_at(&endpoint, None).fetch().await, FetchOutcome::Fetched(vec![]));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_failed() {
        let (endpoint, server) = serve_once("500 Internal Server Error", "[]").await;

        match gateway_at(&endpoint, None).fetch().await {
            FetchOutcome::Failed(reason) => assert!(reason.contains("500"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_non_array_body_is_failed() {
        let (endpoint, server) = serve_once("200 OK", r#"{"title":"not a list"}"#).await;

        match gateway_at(&endpoint, None).fetch().await {
            FetchOutcome::Failed(reason) => assert!(reason.contains("not a JSON array"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_push_posts_full_list_as_json_array() {
        let (endpoint, server) = serve_once("201 Created", r#"{"id":101}"#).await;
        let quotes = vec![Quote::new("A", "c1"), Quote::new("B", "c2")];

        gateway_at(&endpoint, None).push(&quotes).await;

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /posts HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        assert_eq!(
            request_body(&request),
            json!([
                {"text": "A", "category": "c1"},
                {"text": "B", "category": "c2"},
            ])
        );
    }

    #[tokio::test]
    async fn test_push_rejected_by_server_is_swallowed() {
        let (endpoint, server) = serve_once("500 Internal Server Error", "{}").await;

        // Returns normally even though the server refused the list
        gateway_at(&endpoint, None).push(&[Quote::new("A", "c")]).await;

        let request = server.await.unwrap();
        assert_eq!(request_body(&request), json!([{"text": "A", "category": "c"}]));
    }
}
