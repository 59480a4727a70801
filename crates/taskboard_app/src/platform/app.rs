use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use engine_logging::{engine_debug, engine_info};
use taskboard_core::{update, AppState, Effect, JobRequest, JobStatus, Msg};
use taskboard_engine::EngineHandle;

use super::cli::{self, Command};
use super::config::AppConfig;
use super::effects::EffectRunner;
use super::render::TerminalRenderer;

const POLL_INTERVAL: Duration = Duration::from_millis(75);

pub fn run_app() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let (request, config_path) = match cli::parse_args(std::env::args().skip(1))? {
        Command::Help => {
            println!("{}", cli::USAGE);
            return Ok(ExitCode::SUCCESS);
        }
        Command::Run {
            request,
            config_path,
        } => (request, config_path),
    };

    let config = AppConfig::load(config_path.as_deref())?;
    engine_logging::initialize(config.destination()?, config.level_filter()?, &config.log_file);
    engine_info!("Backend {}", config.base_url);

    let engine = EngineHandle::new(config.engine_settings()).context("starting engine")?;
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    spawn_input_reader(msg_tx);

    let mut app = App::new(EffectRunner::new(engine), TerminalRenderer::new(io::stdout()));
    let status = app.run_job(request, &msg_rx)?;
    Ok(match status {
        JobStatus::Completed => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

/// Forwards operator commands typed on stdin. `c` / `cancel` cancels the run.
fn spawn_input_reader(msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let msg = match line.trim().to_ascii_lowercase().as_str() {
                "c" | "cancel" => Msg::CancelRequested,
                _ => continue,
            };
            if msg_tx.send(msg).is_err() {
                break;
            }
        }
    });
}

/// Owns the view state and drives it with user and engine messages.
pub struct App<W: Write> {
    state: AppState,
    runner: EffectRunner,
    renderer: TerminalRenderer<W>,
}

impl<W: Write> App<W> {
    pub fn new(runner: EffectRunner, renderer: TerminalRenderer<W>) -> Self {
        Self {
            state: AppState::new(),
            runner,
            renderer,
        }
    }

    /// Runs one job to a terminal status. Any previous run is reset first.
    pub fn run_job(
        &mut self,
        request: JobRequest,
        user_rx: &mpsc::Receiver<Msg>,
    ) -> anyhow::Result<JobStatus> {
        self.dispatch_msg(Msg::Reset)?;
        self.dispatch_msg(Msg::RunJob(request))?;

        while !self.state.status().is_terminal() {
            while let Ok(msg) = user_rx.try_recv() {
                self.dispatch_msg(msg)?;
            }
            let msg = self.runner.next_msg(POLL_INTERVAL).unwrap_or(Msg::Tick);
            self.dispatch_msg(msg)?;
        }
        Ok(self.state.status())
    }

    fn dispatch_msg(&mut self, msg: Msg) -> io::Result<()> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        self.state = state;

        if was_dirty {
            self.renderer.render(&self.state.view())?;
        }
        for effect in effects {
            if let Some(Effect::Notify(notification)) = self.runner.run(effect) {
                engine_debug!("Toast {:?}: {}", notification.kind, notification.message);
                self.renderer.toast(&notification)?;
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn state(&self) -> &AppState {
        &self.state
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.renderer.into_inner()
    }
}
