use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::{AppState, Effect, JobStatus, JobType, Msg, Notification, RunId};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::RunJob(request) => {
            if state.status() != JobStatus::Idle {
                engine_warn!(
                    "RunJob ignored: run {} is {:?}; reset first",
                    state.run_id(),
                    state.status()
                );
                return (state, Vec::new());
            }
            let run_id = state.begin_run(request.job_type);
            engine_info!(
                "Run {} dispatching {}/{}",
                run_id,
                request.source,
                request.job_type
            );
            vec![Effect::Dispatch { run_id, request }]
        }
        Msg::DispatchSucceeded { run_id, handle } => {
            let Some(job_type) = accepting(&state, run_id, JobStatus::Pending) else {
                return (state, Vec::new());
            };
            engine_info!("Run {} streaming logfile {}", run_id, handle.log_stream_id);
            state.attach_stream(handle.clone());
            let pending = Notification::streaming(run_id, job_type);
            state.set_notification(pending.clone());
            vec![
                Effect::Notify(pending),
                Effect::OpenStream { run_id, handle },
            ]
        }
        Msg::DispatchFailed { run_id, reason } => {
            let Some(job_type) = accepting(&state, run_id, JobStatus::Pending) else {
                return (state, Vec::new());
            };
            engine_warn!("Run {} dispatch failed: {}", run_id, reason);
            state.finish(JobStatus::Failed);
            notify(&mut state, Notification::dispatch_failed(run_id, job_type))
        }
        Msg::LogReceived {
            run_id,
            payload,
            terminal,
        } => {
            let Some(job_type) = accepting(&state, run_id, JobStatus::Streaming) else {
                return (state, Vec::new());
            };
            // The terminal event's data is the final log line, so it is kept too.
            state.append_record(payload);
            if terminal {
                engine_info!(
                    "Run {} completed after {} records",
                    run_id,
                    state.records().len()
                );
                state.finish(JobStatus::Completed);
                notify(&mut state, Notification::completed(run_id, job_type))
            } else {
                Vec::new()
            }
        }
        Msg::StreamFailed { run_id, reason } => {
            let Some(job_type) = accepting(&state, run_id, JobStatus::Streaming) else {
                return (state, Vec::new());
            };
            engine_warn!(
                "Run {} stream failed after {} records: {}",
                run_id,
                state.records().len(),
                reason
            );
            state.finish(JobStatus::Failed);
            notify(&mut state, Notification::stream_failed(run_id, job_type))
        }
        Msg::CancelRequested => {
            let status = state.status();
            let Some(job_type) = state.job_type().filter(|_| status.is_active()) else {
                return (state, Vec::new());
            };
            let run_id = state.run_id();
            engine_info!("Run {} cancelled while {:?}", run_id, status);
            let mut effects = Vec::with_capacity(2);
            if status == JobStatus::Streaming {
                effects.push(Effect::CloseStream { run_id });
            }
            state.finish(JobStatus::Failed);
            effects.extend(notify(&mut state, Notification::cancelled(run_id, job_type)));
            effects
        }
        Msg::Reset => {
            let mut effects = Vec::new();
            if state.status() == JobStatus::Streaming {
                effects.push(Effect::CloseStream {
                    run_id: state.run_id(),
                });
            }
            if state.status() != JobStatus::Idle {
                state.reset();
            }
            effects
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}

/// Returns the run's job type when `run_id` is current and the state is in `expected`.
fn accepting(state: &AppState, run_id: RunId, expected: JobStatus) -> Option<JobType> {
    if !state.is_current(run_id) || state.status() != expected {
        engine_debug!(
            "Dropping message for run {} (current run {}, status {:?})",
            run_id,
            state.run_id(),
            state.status()
        );
        return None;
    }
    state.job_type()
}

fn notify(state: &mut AppState, notification: Notification) -> Vec<Effect> {
    state.set_notification(notification.clone());
    vec![Effect::Notify(notification)]
}
