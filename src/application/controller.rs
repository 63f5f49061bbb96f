//! Session controller
//!
//! The press-and-hold state machine. Gesture events and timer ticks are
//! handled synchronously, one at a time, on the controller's own task. Calls
//! into the resource gateway and the transcriber run on spawned tasks that
//! post their completion back into the same inbox, so a release (or a second
//! press) can arrive while an acquire is still in flight. Gesture decisions
//! therefore consult the session's intended state, never the confirmed one.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::gesture::GestureEvent;
use crate::domain::recording::{ArtifactRef, CaptureLimits, RecordingHandle};
use crate::domain::session::{DragOutcome, RecordingSession, SessionId, SessionState};

use super::gateway::{AcquisitionError, FinalizeError, ResourceGateway};
use super::intent::{ControllerSnapshot, HapticPulse, HostHooks, Notice, UiIntent};
use super::ports::{NativeAudio, Transcriber, TranscriptionError};

/// Errors from the controller handle
#[derive(Debug, Clone, Error)]
pub enum ControllerError {
    #[error("Session controller has shut down")]
    Closed,
}

enum Input {
    Event(Event),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

enum Event {
    Gesture(GestureEvent),
    Acquired {
        session: SessionId,
        result: Result<RecordingHandle, AcquisitionError>,
    },
    Tick(SessionId),
    Watchdog(SessionId),
    Discarded(SessionId),
    Finalized {
        session: SessionId,
        result: Result<ArtifactRef, FinalizeError>,
    },
    Transcribed {
        session: SessionId,
        result: Result<String, TranscriptionError>,
    },
}

/// Cloneable entry point into a running controller
#[derive(Clone)]
pub struct ControllerHandle {
    inbox: mpsc::UnboundedSender<Input>,
    snapshot: watch::Receiver<ControllerSnapshot>,
}

impl ControllerHandle {
    /// Deliver a gesture event
    pub fn send(&self, event: GestureEvent) -> Result<(), ControllerError> {
        self.inbox
            .send(Input::Event(Event::Gesture(event)))
            .map_err(|_| ControllerError::Closed)
    }

    pub fn press(&self) -> Result<(), ControllerError> {
        self.send(GestureEvent::Press)
    }

    pub fn drag(&self, dx: f32) -> Result<(), ControllerError> {
        self.send(GestureEvent::Drag { dx })
    }

    pub fn release(&self, dx: f32) -> Result<(), ControllerError> {
        self.send(GestureEvent::Release { dx })
    }

    pub fn terminate(&self) -> Result<(), ControllerError> {
        self.send(GestureEvent::Terminate)
    }

    /// Latest published state
    pub fn snapshot(&self) -> ControllerSnapshot {
        *self.snapshot.borrow()
    }

    /// Receiver for published state changes
    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshot.clone()
    }

    /// Wait until every event sent so far has been handled
    pub async fn settled(&self) -> Result<(), ControllerError> {
        let (tx, rx) = oneshot::channel();
        self.inbox
            .send(Input::Flush(tx))
            .map_err(|_| ControllerError::Closed)?;
        rx.await.map_err(|_| ControllerError::Closed)
    }

    /// Wait until the published state satisfies `predicate`
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&ControllerSnapshot) -> bool,
    ) -> Result<ControllerSnapshot, ControllerError> {
        let mut rx = self.snapshot.clone();
        let snapshot = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| ControllerError::Closed)?;
        Ok(*snapshot)
    }

    /// Wait for pending events to be handled and the session to return to idle
    pub async fn idle(&self) -> Result<ControllerSnapshot, ControllerError> {
        self.settled().await?;
        self.wait_for(ControllerSnapshot::is_idle).await
    }

    /// Stop the controller. A held recording is discarded first.
    pub async fn shutdown(&self) -> Result<(), ControllerError> {
        let (tx, rx) = oneshot::channel();
        self.inbox
            .send(Input::Shutdown(tx))
            .map_err(|_| ControllerError::Closed)?;
        rx.await.map_err(|_| ControllerError::Closed)
    }
}

struct ActiveSession {
    session: RecordingSession,
    ticker: Option<JoinHandle<()>>,
    watchdog: Option<JoinHandle<()>>,
}

impl ActiveSession {
    fn new(session: RecordingSession) -> Self {
        Self {
            session,
            ticker: None,
            watchdog: None,
        }
    }

    fn cancel_watchdog(&mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
    }

    fn stop_timers(&mut self) {
        self.cancel_watchdog();
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.stop_timers();
    }
}

fn now() -> Instant {
    time::Instant::now().into_std()
}

/// Press-and-hold session controller
pub struct SessionController<N, T, H>
where
    N: NativeAudio + 'static,
    T: Transcriber + 'static,
    H: HostHooks + 'static,
{
    gateway: Arc<ResourceGateway<N>>,
    transcriber: Arc<T>,
    hooks: H,
    limits: CaptureLimits,
    active: Option<ActiveSession>,
    last_session: u64,
    recording: bool,
    inbox: mpsc::UnboundedSender<Input>,
    inbox_rx: mpsc::UnboundedReceiver<Input>,
    intents: mpsc::UnboundedSender<UiIntent>,
    snapshot: watch::Sender<ControllerSnapshot>,
}

impl<N, T, H> SessionController<N, T, H>
where
    N: NativeAudio + 'static,
    T: Transcriber + 'static,
    H: HostHooks + 'static,
{
    /// Create a controller, the handle that drives it, and its intent stream
    pub fn new(
        gateway: Arc<ResourceGateway<N>>,
        transcriber: T,
        hooks: H,
        limits: CaptureLimits,
    ) -> (Self, ControllerHandle, mpsc::UnboundedReceiver<UiIntent>) {
        let (inbox, inbox_rx) = mpsc::unbounded_channel();
        let (intents, intents_rx) = mpsc::unbounded_channel();
        let (snapshot, snapshot_rx) = watch::channel(ControllerSnapshot::idle());

        let handle = ControllerHandle {
            inbox: inbox.clone(),
            snapshot: snapshot_rx,
        };
        let controller = Self {
            gateway,
            transcriber: Arc::new(transcriber),
            hooks,
            limits,
            active: None,
            last_session: 0,
            recording: false,
            inbox,
            inbox_rx,
            intents,
            snapshot,
        };
        (controller, handle, intents_rx)
    }

    pub fn limits(&self) -> &CaptureLimits {
        &self.limits
    }

    /// Run the controller on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Handle events until shut down
    pub async fn run(mut self) {
        debug!("session controller started");
        loop {
            let input = match self.inbox_rx.recv().await {
                Some(input) => input,
                None => break,
            };
            match input {
                Input::Event(event) => self.handle(event),
                Input::Flush(done) => {
                    let _ = done.send(());
                }
                Input::Shutdown(done) => {
                    self.shut_down().await;
                    let _ = done.send(());
                    break;
                }
            }
        }
        debug!("session controller stopped");
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Gesture(GestureEvent::Press) => self.on_press(),
            Event::Gesture(GestureEvent::Drag { dx }) => self.on_drag(dx),
            Event::Gesture(GestureEvent::Release { dx }) => self.on_release(dx),
            Event::Gesture(GestureEvent::Terminate) => self.on_terminate(),
            Event::Acquired { session, result } => self.on_acquired(session, result),
            Event::Tick(session) => self.on_tick(session),
            Event::Watchdog(session) => self.on_watchdog(session),
            Event::Discarded(session) => self.on_discarded(session),
            Event::Finalized { session, result } => self.on_finalized(session, result),
            Event::Transcribed { session, result } => self.on_transcribed(session, result),
        }
    }

    fn on_press(&mut self) {
        if self.hooks.is_disabled() {
            debug!(reason = "disabled", "press rejected");
            return;
        }
        if self.hooks.has_pending_text() {
            debug!(reason = "pending text", "press rejected");
            return;
        }

        if let Some(active) = &self.active {
            let stale = &active.session;
            if stale.intended() == SessionState::StoppingAndProcessing {
                debug!(reason = "processing", session = %stale.id(), "press rejected");
                return;
            }
            info!(
                session = %stale.id(),
                state = %stale.state(),
                intended = %stale.intended(),
                "press over a stale session; aborting it"
            );
        }
        self.active = None;

        self.last_session += 1;
        let id = SessionId::new(self.last_session);
        self.gateway.claim(id);

        let mut active = ActiveSession::new(RecordingSession::begin(id, now()));
        active.watchdog = Some(self.spawn_watchdog(id));
        self.active = Some(active);

        info!(session = %id, "press accepted");
        self.emit(UiIntent::Haptic(HapticPulse::PressAccepted));
        self.set_recording(true);
        self.publish();
        self.spawn_acquire(id);
    }

    fn on_drag(&mut self, dx: f32) {
        let past = self.limits.is_past_cancel_threshold(dx);
        let Some(active) = self.active.as_mut() else {
            return;
        };
        match active.session.update_drag(past) {
            DragOutcome::EnteredCancelZone => {
                debug!(session = %active.session.id(), dx, "entered cancel zone");
                self.emit(UiIntent::Haptic(HapticPulse::EnteredCancelZone));
                self.publish();
            }
            DragOutcome::LeftCancelZone => {
                debug!(session = %active.session.id(), dx, "left cancel zone");
                self.publish();
            }
            DragOutcome::Unchanged => {}
        }
    }

    fn on_release(&mut self, dx: f32) {
        let at = now();
        let past = self.limits.is_past_cancel_threshold(dx);
        let short_press = self.limits.short_press.as_std();
        let Some(active) = self.active.as_mut() else {
            debug!(dx, "release without a session ignored");
            return;
        };

        let next = match active.session.resolve_release(at, past, short_press) {
            Ok(next) => next,
            Err(e) => {
                debug!(error = %e, "release ignored");
                return;
            }
        };
        active.cancel_watchdog();
        info!(
            session = %active.session.id(),
            decision = %next,
            elapsed_ms = active.session.held_for(at).as_millis() as u64,
            dx,
            "release resolved"
        );

        self.set_recording(false);
        self.execute_decision();
    }

    fn on_terminate(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if let Err(e) = active.session.resolve_termination() {
            debug!(error = %e, "termination ignored");
            return;
        }
        active.cancel_watchdog();
        info!(session = %active.session.id(), "gesture terminated by the platform");

        self.set_recording(false);
        self.execute_decision();
    }

    // Act on the intended state once the hardware has confirmed recording.
    // Until then the decision waits for the acquire to settle.
    fn execute_decision(&mut self) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        if active.session.state() != SessionState::Recording {
            debug!(
                session = %active.session.id(),
                intended = %active.session.intended(),
                "decision recorded; waiting for acquisition"
            );
            self.publish();
            return;
        }
        match active.session.intended() {
            SessionState::Cancelling => self.begin_discard(),
            SessionState::StoppingAndProcessing => self.begin_finalize(),
            _ => self.publish(),
        }
    }

    fn on_acquired(&mut self, id: SessionId, result: Result<RecordingHandle, AcquisitionError>) {
        if !self.is_current(id) {
            debug!(session = %id, "stale acquisition settled");
            if let Ok(handle) = result {
                self.spawn_release_orphan(handle);
            }
            return;
        }

        let handle = match result {
            Ok(handle) => handle,
            Err(e) => {
                warn!(session = %id, error = %e, "acquisition failed");
                let notice = if e.is_permission() {
                    Notice::PermissionRequired
                } else {
                    Notice::RecordingUnavailable
                };
                self.emit(UiIntent::Notice(notice));
                self.finish();
                return;
            }
        };

        let Some(active) = self.active.as_mut() else {
            return;
        };
        if let Err(e) = active.session.confirm_acquired(handle) {
            warn!(session = %id, error = %e, "unexpected acquisition");
            self.spawn_release_orphan(handle);
            self.finish();
            return;
        }
        info!(session = %id, %handle, "recording");

        match active.session.intended() {
            SessionState::Recording => {
                let started_at = active.session.started_at();
                let ticker = self.spawn_ticker(id, started_at);
                if let Some(active) = self.active.as_mut() {
                    active.ticker = Some(ticker);
                }
                self.publish();
            }
            _ => self.execute_decision(),
        }
    }

    fn on_tick(&mut self, id: SessionId) {
        let at = now();
        let limits = self.limits;
        let max = limits.max_duration;
        let Some(active) = self.current_mut(id) else {
            return;
        };
        if !active.session.is_live() {
            return;
        }
        let elapsed_seconds = active.session.tick(at);
        let reached = limits.has_reached_max(active.session.held_for(at));
        self.emit(UiIntent::Tick { elapsed_seconds });

        if !reached {
            self.publish();
            return;
        }

        info!(session = %id, max = %max, "maximum duration reached");
        self.emit(UiIntent::Notice(Notice::LimitReached {
            max_secs: max.as_secs(),
        }));
        self.emit(UiIntent::Haptic(HapticPulse::LimitReached));
        if let Some(active) = self.active.as_mut() {
            if let Err(e) = active.session.resolve_limit() {
                warn!(error = %e, "limit could not be applied");
                return;
            }
            active.cancel_watchdog();
        }
        self.set_recording(false);
        self.begin_finalize();
    }

    // Diagnostic only: never changes state
    fn on_watchdog(&mut self, id: SessionId) {
        let Some(active) = self.active.as_ref().filter(|a| a.session.id() == id) else {
            return;
        };
        let session = &active.session;
        debug!(
            session = %id,
            state = %session.state(),
            intended = %session.intended(),
            "watchdog fired with gesture unresolved"
        );
        if session.state() == SessionState::Recording
            && self.gateway.active_handle() != session.handle()
        {
            warn!(
                session = %id,
                expected = ?session.handle(),
                actual = ?self.gateway.active_handle(),
                "session and gateway disagree about the recording handle"
            );
        }
    }

    fn begin_discard(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.stop_timers();
        let id = active.session.id();
        let handle = match active.session.enter_cancelling() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(session = %id, error = %e, "cannot discard");
                self.finish();
                return;
            }
        };
        debug!(session = %id, %handle, "discarding recording");
        self.emit(UiIntent::Haptic(HapticPulse::Cancelled));
        self.publish();

        let gateway = Arc::clone(&self.gateway);
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            gateway.discard(handle).await;
            let _ = inbox.send(Input::Event(Event::Discarded(id)));
        });
    }

    fn on_discarded(&mut self, id: SessionId) {
        let Some(active) = self.current_mut(id) else {
            debug!(session = %id, "stale discard settled");
            return;
        };
        active.session.mark_released();
        debug!(session = %id, "recording discarded");
        self.finish();
    }

    fn begin_finalize(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.stop_timers();
        let id = active.session.id();
        let handle = match active.session.enter_processing() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(session = %id, error = %e, "cannot finalize");
                self.finish();
                return;
            }
        };
        debug!(session = %id, %handle, "finalizing recording");
        self.publish();

        let gateway = Arc::clone(&self.gateway);
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let result = gateway.finalize(handle).await;
            let unsent = inbox.send(Input::Event(Event::Finalized {
                session: id,
                result,
            }));
            if let Err(mpsc::error::SendError(Input::Event(Event::Finalized {
                result: Ok(artifact),
                ..
            }))) = unsent
            {
                gateway.dispose(&artifact).await;
            }
        });
    }

    fn on_finalized(&mut self, id: SessionId, result: Result<ArtifactRef, FinalizeError>) {
        if !self.is_current(id) {
            debug!(session = %id, "stale finalize settled");
            if let Ok(artifact) = result {
                let gateway = Arc::clone(&self.gateway);
                tokio::spawn(async move { gateway.dispose(&artifact).await });
            }
            return;
        }

        let artifact = match result {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(session = %id, error = %e, "finalize produced no artifact");
                self.emit(UiIntent::Notice(Notice::FinalizeFailed));
                self.finish();
                return;
            }
        };

        if let Some(active) = self.active.as_mut() {
            if let Err(e) = active.session.record_artifact(artifact.clone()) {
                warn!(session = %id, error = %e, "artifact arrived out of order");
            }
        }
        info!(session = %id, artifact = %artifact, "transcribing");

        let gateway = Arc::clone(&self.gateway);
        let transcriber = Arc::clone(&self.transcriber);
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let result = transcriber.transcribe(&artifact).await;
            gateway.dispose(&artifact).await;
            let _ = inbox.send(Input::Event(Event::Transcribed {
                session: id,
                result,
            }));
        });
    }

    fn on_transcribed(&mut self, id: SessionId, result: Result<String, TranscriptionError>) {
        if !self.is_current(id) {
            debug!(session = %id, "stale transcription dropped");
            return;
        }
        match result {
            Ok(text) if !text.trim().is_empty() => {
                info!(session = %id, chars = text.chars().count(), "transcript ready");
                self.hooks.on_ready(text);
            }
            Ok(_) => {
                warn!(session = %id, "transcript was empty");
                self.emit(UiIntent::Notice(Notice::TranscriptionFailed));
            }
            Err(e) => {
                warn!(session = %id, error = %e, "transcription failed");
                self.emit(UiIntent::Notice(Notice::TranscriptionFailed));
            }
        }
        self.finish();
    }

    async fn shut_down(&mut self) {
        self.gateway.claim(SessionId::NONE);
        if let Some(active) = self.active.take() {
            info!(session = %active.session.id(), "shutting down with a session in flight");
        }
        if let Some(handle) = self.gateway.abort_active(SessionId::NONE).await {
            debug!(%handle, "recording discarded at shutdown");
        }
        self.set_recording(false);
        self.publish();
    }

    // The session ends here; its timers are aborted when it drops
    fn finish(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(session = %active.session.id(), "session closed");
        }
        self.set_recording(false);
        self.publish();
    }

    fn is_current(&self, id: SessionId) -> bool {
        self.active.as_ref().map(|a| a.session.id()) == Some(id)
    }

    fn current_mut(&mut self, id: SessionId) -> Option<&mut ActiveSession> {
        self.active.as_mut().filter(|a| a.session.id() == id)
    }

    fn set_recording(&mut self, recording: bool) {
        if self.recording != recording {
            self.recording = recording;
            self.hooks.on_recording_state_changed(recording);
        }
    }

    fn emit(&self, intent: UiIntent) {
        let _ = self.intents.send(intent);
    }

    fn publish(&self) {
        let next = self
            .active
            .as_ref()
            .map(|a| ControllerSnapshot::of(&a.session))
            .unwrap_or_default();
        let changed = self.snapshot.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            self.emit(UiIntent::State(next));
        }
    }

    fn spawn_acquire(&self, id: SessionId) {
        let gateway = Arc::clone(&self.gateway);
        let inbox = self.inbox.clone();
        let grace = self.limits.stale_release_grace.as_std();
        tokio::spawn(async move {
            if let Some(stale) = gateway.abort_active(id).await {
                debug!(session = %id, %stale, "waiting for stale recording to settle");
                time::sleep(grace).await;
            }
            let result = if gateway.ensure_permission().await {
                gateway.acquire(id).await
            } else {
                Err(AcquisitionError::PermissionDenied)
            };
            let unsent = inbox.send(Input::Event(Event::Acquired {
                session: id,
                result,
            }));
            if let Err(mpsc::error::SendError(Input::Event(Event::Acquired {
                result: Ok(handle),
                ..
            }))) = unsent
            {
                gateway.discard(handle).await;
            }
        });
    }

    // Release a handle that no live session owns
    fn spawn_release_orphan(&self, handle: RecordingHandle) {
        let gateway = Arc::clone(&self.gateway);
        tokio::spawn(async move { gateway.discard(handle).await });
    }

    fn spawn_watchdog(&self, id: SessionId) -> JoinHandle<()> {
        let inbox = self.inbox.clone();
        let delay = self.limits.short_press.as_std();
        tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = inbox.send(Input::Event(Event::Watchdog(id)));
        })
    }

    // Ticks are aligned to the press, not to when acquisition settled
    fn spawn_ticker(&self, id: SessionId, started_at: Instant) -> JoinHandle<()> {
        let inbox = self.inbox.clone();
        let period = self.limits.tick_interval.as_std();
        let start = time::Instant::from_std(started_at) + period;
        tokio::spawn(async move {
            let mut interval = time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if inbox.send(Input::Event(Event::Tick(id))).is_err() {
                    break;
                }
            }
        })
    }
}
