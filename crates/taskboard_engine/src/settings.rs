use std::time::Duration;

use url::Url;

use crate::EngineError;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Root of the backend, e.g. `http://localhost:8000`.
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Whole-request limit for dispatch calls. Streams are long-lived and only
    /// bounded by `stream_idle_timeout`.
    pub request_timeout: Duration,
    /// Fail a stream when no message arrives for this long. `None` waits forever.
    pub stream_idle_timeout: Option<Duration>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            stream_idle_timeout: None,
        }
    }
}

impl EngineSettings {
    pub fn parsed_base_url(&self) -> Result<Url, EngineError> {
        let invalid = |reason: String| EngineError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason,
        };
        let url = Url::parse(&self.base_url).map_err(|err| invalid(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("url cannot be a base".to_string()));
        }
        Ok(url)
    }
}

/// Appends path segments to `base`, percent-encoding each one.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
