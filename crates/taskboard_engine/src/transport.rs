use std::collections::VecDeque;

use bytes::Bytes;
use engine_logging::engine_debug;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use taskboard_core::JobHandle;
use url::Url;

use crate::settings::endpoint;
use crate::sse::SseDecoder;
use crate::stream::{Connector, Transport};
use crate::{EngineError, EngineSettings, StreamError};

/// Connects to `GET {base}/logfiles/stream?logfile=<id>`.
#[derive(Debug, Clone)]
pub struct ReqwestConnector {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestConnector {
    pub fn new(settings: &EngineSettings) -> Result<Self, EngineError> {
        let base_url = settings.parsed_base_url()?;
        // No overall timeout: the stream stays open for the whole job.
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| EngineError::Client(err.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn stream_url(&self, handle: &JobHandle) -> Url {
        let mut url = endpoint(&self.base_url, &["logfiles", "stream"]);
        url.query_pairs_mut()
            .append_pair("logfile", &handle.log_stream_id);
        url
    }
}

#[async_trait::async_trait]
impl Connector for ReqwestConnector {
    type Transport = SseTransport;

    async fn connect(&self, handle: &JobHandle) -> Result<SseTransport, StreamError> {
        let url = self.stream_url(handle);
        engine_debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|err| StreamError::ConnectionFailed(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::ConnectionFailed(format!("http status {status}")));
        }
        Ok(SseTransport::new(response.bytes_stream().boxed()))
    }
}

/// Server-sent-events transport over a streamed response body.
pub struct SseTransport {
    body: Option<BoxStream<'static, reqwest::Result<Bytes>>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
}

impl SseTransport {
    fn new(body: BoxStream<'static, reqwest::Result<Bytes>>) -> Self {
        Self {
            body: Some(body),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        }
    }
}

#[async_trait::async_trait]
impl Transport for SseTransport {
    async fn next_message(&mut self) -> Option<Result<String, StreamError>> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Some(Ok(message));
            }
            let body = self.body.as_mut()?;
            match body.next().await {
                Some(Ok(chunk)) => match self.decoder.feed(&chunk) {
                    Ok(messages) => self.pending.extend(messages),
                    Err(err) => return Some(Err(err)),
                },
                Some(Err(err)) => return Some(Err(StreamError::AbortedByServer(err.to_string()))),
                // An unterminated trailing event is discarded, as browsers do.
                None => return None,
            }
        }
    }

    fn release(&mut self) {
        self.body = None;
        self.pending.clear();
    }
}
