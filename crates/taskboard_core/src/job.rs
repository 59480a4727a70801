use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

/// Provider namespace used when a request does not name one.
pub const DEFAULT_SOURCE: &str = "fbref";

/// Identifies one `RunJob` lifecycle inside a view state.
pub type RunId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobType {
    Crawl,
    Scrape,
    Clean,
    Prepare,
    Train,
}

impl JobType {
    pub const ALL: [JobType; 5] = [
        JobType::Crawl,
        JobType::Scrape,
        JobType::Clean,
        JobType::Prepare,
        JobType::Train,
    ];

    /// Operator-facing name, as typed on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::Crawl => "crawl",
            JobType::Scrape => "scrape",
            JobType::Clean => "clean",
            JobType::Prepare => "prepare",
            JobType::Train => "train",
        }
    }

    /// Path segment of the job-trigger endpoint. Preparation is served at `process`.
    pub fn route_segment(self) -> &'static str {
        match self {
            JobType::Prepare => "process",
            other => other.as_str(),
        }
    }

    /// Progressive phrase shown while the job streams, e.g. "Cleaning data".
    pub fn progress_phrase(self) -> &'static str {
        match self {
            JobType::Crawl => "Crawling data",
            JobType::Scrape => "Scraping data",
            JobType::Clean => "Cleaning data",
            JobType::Prepare => "Preparing data",
            JobType::Train => "Training model",
        }
    }

    /// Past-tense phrase shown on success, e.g. "Data cleaned".
    pub fn done_phrase(self) -> &'static str {
        match self {
            JobType::Crawl => "Data crawled",
            JobType::Scrape => "Data scraped",
            JobType::Clean => "Data cleaned",
            JobType::Prepare => "Data prepared",
            JobType::Train => "Model trained",
        }
    }

    /// Noun phrase for failure messages, e.g. "data cleaning".
    pub fn activity(self) -> &'static str {
        match self {
            JobType::Crawl => "data crawling",
            JobType::Scrape => "data scraping",
            JobType::Clean => "data cleaning",
            JobType::Prepare => "data preparation",
            JobType::Train => "model training",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job type '{0}' (expected crawl, scrape, clean, prepare or train)")]
pub struct UnknownJobType(pub String);

impl FromStr for JobType {
    type Err = UnknownJobType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crawl" => Ok(JobType::Crawl),
            "scrape" => Ok(JobType::Scrape),
            "clean" => Ok(JobType::Clean),
            "prepare" | "process" => Ok(JobType::Prepare),
            "train" => Ok(JobType::Train),
            _ => Err(UnknownJobType(s.to_string())),
        }
    }
}

/// A job-start request. Parameters are forwarded to the backend unvalidated.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub source: String,
    pub job_type: JobType,
    pub parameters: BTreeMap<String, Value>,
}

impl JobRequest {
    pub fn new(job_type: JobType) -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            job_type,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Parameters as the JSON object sent in the dispatch body.
    pub fn body(&self) -> Value {
        Value::Object(
            self.parameters
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }
}

/// Handle to the log stream of one dispatched job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub log_stream_id: String,
}

impl JobHandle {
    pub fn new(log_stream_id: impl Into<String>) -> Self {
        Self {
            log_stream_id: log_stream_id.into(),
        }
    }
}

/// One line of job output. `sequence` is the arrival position, assigned locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub sequence: u64,
    pub payload: String,
}
