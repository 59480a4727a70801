use engine_logging::{engine_debug, engine_info};
use reqwest::header::ACCEPT;
use serde_json::Value;
use taskboard_core::{JobHandle, JobRequest};
use url::Url;

use crate::settings::endpoint;
use crate::{DispatchError, EngineError, EngineSettings};

const MAX_BODY_IN_ERROR: usize = 512;

#[async_trait::async_trait]
pub trait Dispatcher: Send + Sync {
    /// Ask the backend to start `request`. Never retries and never opens the stream.
    async fn start_job(&self, request: &JobRequest) -> Result<JobHandle, DispatchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestDispatcher {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestDispatcher {
    pub fn new(settings: &EngineSettings) -> Result<Self, EngineError> {
        let base_url = settings.parsed_base_url()?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| EngineError::Client(err.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn job_url(&self, request: &JobRequest) -> Url {
        endpoint(
            &self.base_url,
            &["tasks", &request.source, request.job_type.route_segment()],
        )
    }
}

#[async_trait::async_trait]
impl Dispatcher for ReqwestDispatcher {
    async fn start_job(&self, request: &JobRequest) -> Result<JobHandle, DispatchError> {
        let url = self.job_url(request);
        engine_debug!("POST {} body={}", url, request.body());

        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .json(&request.body())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(DispatchError::BackendRejected {
                status: status.as_u16(),
                body: truncate(&body, MAX_BODY_IN_ERROR),
            });
        }

        let handle = parse_handle(&body)?;
        engine_info!(
            "Started {}/{} with logfile {}",
            request.source,
            request.job_type,
            handle.log_stream_id
        );
        Ok(handle)
    }
}

/// Extract the `logfile` field of a successful dispatch response.
pub(crate) fn parse_handle(body: &str) -> Result<JobHandle, DispatchError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|err| DispatchError::MalformedResponse(format!("body is not json: {err}")))?;
    match value.get("logfile") {
        Some(Value::String(logfile)) if !logfile.trim().is_empty() => Ok(JobHandle::new(logfile.as_str())),
        Some(Value::String(_)) => Err(DispatchError::MalformedResponse(
            "empty `logfile` field".to_string(),
        )),
        Some(other) => Err(DispatchError::MalformedResponse(format!(
            "`logfile` is not a string: {other}"
        ))),
        None => Err(DispatchError::MalformedResponse(
            "missing `logfile` field".to_string(),
        )),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> DispatchError {
    if err.is_timeout() {
        return DispatchError::Transport(format!("timeout: {err}"));
    }
    DispatchError::Transport(err.to_string())
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_handle_reads_logfile() {
        assert_eq!(
            parse_handle(r#"{"logfile": "fbref_cleaner.log"}"#),
            Ok(JobHandle::new("fbref_cleaner.log"))
        );
    }

    #[test]
    fn parse_handle_rejects_missing_or_bad_logfile() {
        for body in ["{}", r#"{"logfile": ""}"#, r#"{"logfile": 42}"#, "ok", ""] {
            assert!(
                matches!(parse_handle(body), Err(DispatchError::MalformedResponse(_))),
                "body {body:?} should be malformed"
            );
        }
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("München", 3), "Mün...");
        assert_eq!(truncate("short", 10), "short");
    }
}
