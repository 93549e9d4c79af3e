use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use once_cell::sync::OnceCell;
use thiserror::Error;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(300);
const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Failure to reach the backend at all. A non-2xx HTTP status is NOT a
/// transport error; callers decide how to treat each status code.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// Stream type for HTTP response bodies.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// A fully-buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Trait over the HTTP layer (for mocking). Implementations return
/// `Ok` for every HTTP status; `Err` is reserved for transport-level
/// failures such as timeouts or refused connections.
#[async_trait]
pub trait GenerationTransport: Send + Sync + std::fmt::Debug {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, TransportError>;

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<(u16, ByteStream), TransportError>;
}

/// Real transport backed by a lazily-built, shared reqwest client.
/// The pool is created on first use and reused for the process
/// lifetime.
#[derive(Debug)]
pub struct ReqwestTransport {
    client: OnceCell<reqwest::Client>,
    read_timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(read_timeout: Duration) -> Self {
        Self {
            client: OnceCell::new(),
            read_timeout,
        }
    }

    fn client(&self) -> Result<&reqwest::Client, TransportError> {
        self.client.get_or_try_init(|| {
            reqwest::Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(self.read_timeout)
                .pool_idle_timeout(POOL_IDLE_TIMEOUT)
                .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
                .build()
                .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {}", e)))
        })
    }
}

#[async_trait]
impl GenerationTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.client()?.post(url);
        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.json(body).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<(u16, ByteStream), TransportError> {
        let mut request = self.client()?.post(url);
        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.json(body).send().await?;
        let status = response.status().as_u16();

        use futures::StreamExt;
        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(TransportError::from));

        Ok((status, Box::pin(stream)))
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// One scripted reply. `Transport` simulates a network-level
    /// failure; the other variants simulate a response with a status.
    #[derive(Debug)]
    pub enum MockReply {
        Response(u16, String),
        StreamResponse(u16, Vec<Bytes>),
        Transport(TransportError),
    }

    /// Replies are consumed front-to-back, one per call, so tests can
    /// script "fail, fail, succeed" retry sequences. Exhausting the
    /// script yields transport errors.
    #[derive(Debug)]
    pub struct MockTransport {
        replies: Mutex<Vec<MockReply>>,
        calls: AtomicUsize,
    }

    impl MockTransport {
        pub fn new(replies: Vec<MockReply>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next_reply(&self) -> MockReply {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                MockReply::Transport(TransportError::Other("no scripted reply".to_string()))
            } else {
                replies.remove(0)
            }
        }
    }

    #[async_trait]
    impl GenerationTransport for MockTransport {
        async fn post_json(
            &self,
            _url: &str,
            _headers: Vec<(&str, &str)>,
            _body: &serde_json::Value,
        ) -> Result<HttpResponse, TransportError> {
            match self.next_reply() {
                MockReply::Response(status, body) => Ok(HttpResponse { status, body }),
                MockReply::StreamResponse(status, chunks) => Ok(HttpResponse {
                    status,
                    body: chunks
                        .iter()
                        .map(|b| String::from_utf8_lossy(b).into_owned())
                        .collect(),
                }),
                MockReply::Transport(error) => Err(error),
            }
        }

        async fn post_json_stream(
            &self,
            _url: &str,
            _headers: Vec<(&str, &str)>,
            _body: &serde_json::Value,
        ) -> Result<(u16, ByteStream), TransportError> {
            match self.next_reply() {
                MockReply::Response(status, body) => {
                    let chunks = vec![Bytes::from(body)];
                    let stream = stream::iter(chunks.into_iter().map(Ok));
                    Ok((status, Box::pin(stream) as ByteStream))
                }
                MockReply::StreamResponse(status, chunks) => {
                    let stream = stream::iter(chunks.into_iter().map(Ok));
                    Ok((status, Box::pin(stream) as ByteStream))
                }
                MockReply::Transport(error) => Err(error),
            }
        }
    }
}
