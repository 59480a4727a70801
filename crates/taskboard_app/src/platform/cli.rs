use std::path::PathBuf;

use anyhow::{anyhow, bail};
use serde_json::Value;
use taskboard_core::{JobRequest, JobType};

pub const USAGE: &str = "\
usage: taskboard <crawl|scrape|clean|prepare|train> [key=value ...] [--source NAME] [--config PATH]

Starts a backend job and follows its log stream until it finishes.
Values parse as JSON when they can (seasons_to_crawl=3), otherwise as text.
Type `c` and Enter while the job runs to cancel it.

examples:
  taskboard clean competition=Bundesliga
  taskboard crawl competition_stats_href=/en/comps/20/history seasons_to_crawl=3";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Run {
        request: JobRequest,
        config_path: Option<PathBuf>,
    },
}

pub fn parse_args<I>(args: I) -> anyhow::Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut job_type: Option<JobType> = None;
    let mut source: Option<String> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut parameters: Vec<(String, Value)> = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--source" => {
                source = Some(args.next().ok_or_else(|| anyhow!("--source needs a value"))?);
            }
            "--config" => {
                let path = args.next().ok_or_else(|| anyhow!("--config needs a path"))?;
                config_path = Some(PathBuf::from(path));
            }
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            _ if job_type.is_none() => job_type = Some(arg.parse()?),
            _ => parameters.push(parse_parameter(&arg)?),
        }
    }

    let job_type = job_type.ok_or_else(|| anyhow!("missing job type"))?;
    let mut request = JobRequest::new(job_type);
    if let Some(source) = source {
        request = request.with_source(source);
    }
    for (key, value) in parameters {
        request = request.with_parameter(key, value);
    }
    Ok(Command::Run {
        request,
        config_path,
    })
}

fn parse_parameter(arg: &str) -> anyhow::Result<(String, Value)> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("parameter '{arg}' must look like key=value"))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("parameter '{arg}' has an empty key");
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
