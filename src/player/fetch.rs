use async_trait::async_trait;
use std::time::Duration;

use crate::{
    config::FetchCfg,
    error::{FetchError, FetchResult},
};

/// Retrieves remote caption content as text.
#[async_trait]
pub trait CaptionFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult<String>;
}

/// Plain HTTP GET; any non-2xx status counts as a failure.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(cfg: &FetchCfg) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(cfg.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CaptionFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;
        tracing::debug!(url, bytes = body.len(), "fetched remote captions");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await;
            let reply = format!(
                "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(reply.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
        });
        format!("http://{addr}/captions.srt")
    }

    #[tokio::test]
    async fn returns_body_on_success() {
        let url = serve_once("200 OK", "1\n00:00:00,000 --> 00:00:01,000\nhi\n").await;
        let fetcher = HttpFetcher::new(&FetchCfg::default()).unwrap();
        let body = fetcher.fetch(&url).await.unwrap();
        assert!(body.contains("hi"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let url = serve_once("404 Not Found", "gone").await;
        let fetcher = HttpFetcher::new(&FetchCfg::default()).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new(&FetchCfg::default()).unwrap();
        let err = fetcher.fetch(&format!("http://{addr}/x")).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
