use std::time::Duration;

use pretty_assertions::assert_eq;
use taskboard_core::{JobHandle, JobRequest, JobType};
use taskboard_engine::{DispatchError, Dispatcher, EngineSettings, ReqwestDispatcher};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn dispatcher_for(server: &MockServer) -> ReqwestDispatcher {
    let settings = EngineSettings {
        base_url: server.uri(),
        ..EngineSettings::default()
    };
    ReqwestDispatcher::new(&settings).expect("dispatcher")
}

fn clean_bundesliga() -> JobRequest {
    JobRequest::new(JobType::Clean).with_parameter("competition", "Bundesliga")
}

#[tokio::test]
async fn start_job_posts_parameters_and_returns_handle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/fbref/clean"))
        .and(body_json(serde_json::json!({ "competition": "Bundesliga" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "logfile": "run-42.log" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let handle = dispatcher_for(&server)
        .start_job(&clean_bundesliga())
        .await
        .expect("dispatch ok");

    assert_eq!(handle, JobHandle::new("run-42.log"));
}

#[tokio::test]
async fn start_job_uses_request_source_in_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/football_data_co_uk/scrape"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "logfile": "fdcu.log" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = JobRequest::new(JobType::Scrape).with_source("football_data_co_uk");
    let handle = dispatcher_for(&server).start_job(&request).await.unwrap();

    assert_eq!(handle.log_stream_id, "fdcu.log");
}

#[tokio::test]
async fn prepare_job_posts_to_process_route() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/fbref/process"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "logfile": "prep.log" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = "prepare".parse::<JobType>().map(JobRequest::new).unwrap();
    let handle = dispatcher_for(&server).start_job(&request).await.unwrap();

    assert_eq!(handle, JobHandle::new("prep.log"));
}

#[tokio::test]
async fn server_error_is_backend_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/fbref/clean"))
        .respond_with(ResponseTemplate::new(500).set_body_string("worker pool exhausted"))
        .mount(&server)
        .await;

    let err = dispatcher_for(&server)
        .start_job(&clean_bundesliga())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DispatchError::BackendRejected {
            status: 500,
            body: "worker pool exhausted".to_string(),
        }
    );
}

#[tokio::test]
async fn missing_logfile_is_malformed_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/fbref/clean"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .mount(&server)
        .await;

    let err = dispatcher_for(&server)
        .start_job(&clean_bundesliga())
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::MalformedResponse(_)), "{err:?}");
}

#[tokio::test]
async fn slow_backend_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/fbref/train"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(serde_json::json!({ "logfile": "train.log" })),
        )
        .mount(&server)
        .await;

    let settings = EngineSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..EngineSettings::default()
    };
    let dispatcher = ReqwestDispatcher::new(&settings).unwrap();

    let err = dispatcher
        .start_job(&JobRequest::new(JobType::Train))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Transport(_)), "{err:?}");
}
