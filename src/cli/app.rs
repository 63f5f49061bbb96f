//! Replay harness runner

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::application::ports::{ConfigStore, NativeAudio, Transcriber, TranscriptionError};
use crate::application::{
    ControllerError, ControllerHandle, GestureAdapter, HostHooks, ResourceGateway,
    SessionController, UiIntent,
};
use crate::domain::config::AppConfig;
use crate::domain::gesture::PointerSample;
use crate::domain::recording::Duration;
use crate::infrastructure::{
    CpalAudio, HttpTranscriber, MemoryAudio, PlaceholderTranscriber, XdgConfigStore,
};

use super::args::{Backend, ReplayOptions};
use super::logging::init_logging;
use super::presenter::Presenter;
use super::script::GestureScript;
use super::signals::InterruptSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Load the config file and layer `cli_config` over it: defaults < file < env/cli
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %store.path().display(), error = %e, "ignoring unreadable config file");
            AppConfig::empty()
        }
    };

    AppConfig::defaults().merge(file_config).merge(cli_config)
}

/// Run `holdtalk replay`
pub async fn run_replay(options: ReplayOptions, log_level: Option<String>) -> ExitCode {
    let mut presenter = Presenter::new();

    if let Some(max) = options.max_duration.as_deref() {
        if let Err(e) = max.parse::<Duration>() {
            presenter.error(&format!("Invalid max-duration: {}", e));
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    }
    if let Some(width) = options.surface_width {
        if !(width.is_finite() && width > 0.0) {
            presenter.error("Invalid surface-width: must be a positive number of points");
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    }

    let cli_config = AppConfig {
        max_duration: options.max_duration.clone(),
        surface_width: options.surface_width,
        transcribe_url: options.transcribe_url.clone(),
        ..Default::default()
    };
    let config = load_merged_config(cli_config).await;
    init_logging(log_level.as_deref(), config.log_level_or_default());

    let script = match GestureScript::load(&options.script).await {
        Ok(script) => script,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    let mut signals = match InterruptSignal::install() {
        Ok(signals) => signals,
        Err(e) => {
            presenter.error(&format!("Failed to setup signal handler: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let limits = config.capture_limits();
    presenter = Presenter::with_limit(limits.max_duration.as_secs());

    let native = native_backend(options.backend, config.recordings_dir_or_default());
    let transcriber = match transcriber_for(config.transcribe_url.as_deref()) {
        Ok(transcriber) => transcriber,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let (ready_tx, ready_rx) = mpsc::unbounded_channel();
    let hooks = ReplayHooks {
        disabled: script.disabled,
        has_text: script.has_text,
        ready: ready_tx,
    };

    info!(
        script = %options.script.display(),
        steps = script.steps.len(),
        backend = ?options.backend,
        "starting replay"
    );

    let gateway = Arc::new(ResourceGateway::new(native));
    let (controller, handle, intents) =
        SessionController::new(gateway, transcriber, hooks, limits);
    let task = controller.spawn();

    let mut replay = Replay {
        presenter,
        handle,
        adapter: GestureAdapter::new(limits),
        intents,
        ready: ready_rx,
        transcripts: 0,
    };

    let outcome = replay.play(&script, &mut signals).await;
    replay.finish(task).await;

    match outcome {
        Ok(Outcome::Completed) => {
            debug!(transcripts = replay.transcripts, "replay completed");
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(Outcome::Interrupted) => {
            replay.presenter.warn("Replay interrupted");
            ExitCode::from(EXIT_ERROR)
        }
        Err(e) => {
            replay.presenter.error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn native_backend(backend: Backend, recordings_dir: PathBuf) -> Box<dyn NativeAudio> {
    match backend {
        Backend::Memory => Box::new(MemoryAudio::new(recordings_dir)),
        Backend::Cpal => Box::new(CpalAudio::new(recordings_dir)),
    }
}

fn transcriber_for(url: Option<&str>) -> Result<Box<dyn Transcriber>, TranscriptionError> {
    Ok(match url {
        Some(url) => Box::new(HttpTranscriber::new(url)?),
        None => Box::new(PlaceholderTranscriber::new()),
    })
}

/// Host side of the replayed control
struct ReplayHooks {
    disabled: bool,
    has_text: bool,
    ready: mpsc::UnboundedSender<String>,
}

impl HostHooks for ReplayHooks {
    fn on_ready(&self, text: String) {
        let _ = self.ready.send(text);
    }

    fn on_recording_state_changed(&self, is_recording: bool) {
        debug!(is_recording, "recording state changed");
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn has_pending_text(&self) -> bool {
        self.has_text
    }
}

enum Outcome {
    Completed,
    Interrupted,
}

struct Replay {
    presenter: Presenter,
    handle: ControllerHandle,
    adapter: GestureAdapter,
    intents: mpsc::UnboundedReceiver<UiIntent>,
    ready: mpsc::UnboundedReceiver<String>,
    transcripts: usize,
}

impl Replay {
    /// Feed every step at its offset, then wait for the controller to go idle
    async fn play(
        &mut self,
        script: &GestureScript,
        signals: &mut InterruptSignal,
    ) -> Result<Outcome, ControllerError> {
        let origin = Instant::now();

        for step in &script.steps {
            let due = sleep_until(origin + step.at);
            tokio::pin!(due);
            loop {
                tokio::select! {
                    _ = &mut due => break,
                    Some(intent) = self.intents.recv() => self.presenter.intent(&intent),
                    Some(text) = self.ready.recv() => self.transcript(text),
                    Some(_) = signals.recv() => return self.interrupt().await,
                }
            }

            debug!(phase = %step.sample.phase, x = step.sample.x, "replaying step");
            if self.adapter.forward(step.sample, &self.handle)?.is_some() {
                self.handle.settled().await?;
                let view = self.adapter.view(&self.handle.snapshot());
                self.presenter.view(&view);
            }
        }

        if self.wait_idle(Some(signals)).await? {
            return self.interrupt().await;
        }
        Ok(Outcome::Completed)
    }

    /// Deliver a forced termination and let the session wind down
    async fn interrupt(&mut self) -> Result<Outcome, ControllerError> {
        self.adapter.feed(PointerSample::terminate());
        self.handle.terminate()?;
        self.wait_idle(None).await?;
        Ok(Outcome::Interrupted)
    }

    /// Render intents until idle. Returns true if a signal arrived first.
    async fn wait_idle(
        &mut self,
        mut signals: Option<&mut InterruptSignal>,
    ) -> Result<bool, ControllerError> {
        let handle = self.handle.clone();
        let idle = async move { handle.idle().await };
        tokio::pin!(idle);

        loop {
            tokio::select! {
                result = &mut idle => {
                    result?;
                    return Ok(false);
                }
                Some(intent) = self.intents.recv() => self.presenter.intent(&intent),
                Some(text) = self.ready.recv() => self.transcript(text),
                Some(_) = async {
                    match signals.as_mut() {
                        Some(signals) => signals.recv().await,
                        None => std::future::pending().await,
                    }
                } => return Ok(true),
            }
        }
    }

    /// Stop the controller and render whatever it emitted on the way out
    async fn finish(&mut self, task: tokio::task::JoinHandle<()>) {
        if let Err(e) = self.handle.shutdown().await {
            debug!(error = %e, "controller already stopped");
        }
        if let Err(e) = task.await {
            warn!(error = %e, "controller task failed");
        }
        while let Some(intent) = self.intents.recv().await {
            self.presenter.intent(&intent);
        }
        while let Ok(text) = self.ready.try_recv() {
            self.transcript(text);
        }
        self.presenter.stop_spinner();
    }

    fn transcript(&mut self, text: String) {
        self.transcripts += 1;
        self.presenter.spinner_success("Transcribed");
        self.presenter.output(&text);
    }
}
