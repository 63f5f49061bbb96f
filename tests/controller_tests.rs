//! Session controller integration tests
//!
//! Drives the controller through its public handle with a scripted native
//! audio backend that can delay, refuse, or fail on demand. All tests run on
//! tokio's paused clock, so hold times are exact.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use holdtalk::application::ports::{
    NativeAudio, NativeAudioError, Transcriber, TranscriptionError,
};
use holdtalk::application::{
    ControllerHandle, HapticPulse, HostHooks, Notice, ResourceGateway, SessionController,
    UiIntent,
};
use holdtalk::domain::recording::{ArtifactRef, AudioMimeType, CaptureLimits};
use holdtalk::domain::session::{SessionId, SessionState};

const WIDTH: f32 = 100.0;
const TRANSCRIPT: &str = "hello world";

#[derive(Default)]
struct ScriptedNative {
    deny_permission: AtomicBool,
    refuse_start: AtomicBool,
    capture_nothing: AtomicBool,
    start_delay_ms: AtomicU64,
    failing_stops: AtomicU32,
    permission_requests: AtomicU32,
    starts: AtomicU32,
    stops: AtomicU32,
    deletes: AtomicU32,
    open: AtomicU32,
    peak_open: AtomicU32,
    start_times: Mutex<Vec<Instant>>,
    stop_times: Mutex<Vec<Instant>>,
}

impl ScriptedNative {
    fn count(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NativeAudio for ScriptedNative {
    async fn request_permission(&self) -> Result<bool, NativeAudioError> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        Ok(!self.deny_permission.load(Ordering::SeqCst))
    }

    async fn start(&self) -> Result<(), NativeAudioError> {
        let delay = self.start_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            time::sleep(Duration::from_millis(delay)).await;
        }
        if self.refuse_start.load(Ordering::SeqCst) {
            return Err(NativeAudioError::DeviceBusy);
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        let open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_open.fetch_max(open, Ordering::SeqCst);
        self.start_times.lock().unwrap().push(Instant::now());
        Ok(())
    }

    async fn stop(&self) -> Result<Option<ArtifactRef>, NativeAudioError> {
        let n = self.stops.fetch_add(1, Ordering::SeqCst) + 1;
        self.stop_times.lock().unwrap().push(Instant::now());
        let failing = self
            .failing_stops
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| f.checked_sub(1))
            .is_ok();
        if failing {
            return Err(NativeAudioError::StopFailed("injected".to_string()));
        }
        self.open.fetch_sub(1, Ordering::SeqCst);
        if self.capture_nothing.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(ArtifactRef::new(
            format!("/tmp/holdtalk-test-{}.flac", n),
            AudioMimeType::Flac,
            2048,
        )))
    }

    async fn delete(&self, _artifact: &ArtifactRef) -> Result<(), NativeAudioError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct TranscriberState {
    calls: AtomicU32,
    delay_ms: AtomicU64,
    text: Mutex<Option<String>>,
}

#[derive(Clone)]
struct CountingTranscriber(Arc<TranscriberState>);

impl CountingTranscriber {
    fn new() -> Self {
        let state = TranscriberState::default();
        *state.text.lock().unwrap() = Some(TRANSCRIPT.to_string());
        state.delay_ms.store(500, Ordering::SeqCst);
        Self(Arc::new(state))
    }

    fn calls(&self) -> u32 {
        self.0.calls.load(Ordering::SeqCst)
    }

    fn respond_with(&self, text: Option<&str>) {
        *self.0.text.lock().unwrap() = text.map(str::to_string);
    }
}

#[async_trait]
impl Transcriber for CountingTranscriber {
    async fn transcribe(&self, _artifact: &ArtifactRef) -> Result<String, TranscriptionError> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        time::sleep(Duration::from_millis(self.0.delay_ms.load(Ordering::SeqCst))).await;
        self.0
            .text
            .lock()
            .unwrap()
            .clone()
            .ok_or(TranscriptionError::NoSpeech)
    }
}

#[derive(Default)]
struct Host {
    disabled: AtomicBool,
    has_text: AtomicBool,
    ready: Mutex<Vec<String>>,
    flags: Mutex<Vec<bool>>,
}

impl HostHooks for Host {
    fn on_ready(&self, text: String) {
        self.ready.lock().unwrap().push(text);
    }

    fn on_recording_state_changed(&self, is_recording: bool) {
        self.flags.lock().unwrap().push(is_recording);
    }

    fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    fn has_pending_text(&self) -> bool {
        self.has_text.load(Ordering::SeqCst)
    }
}

struct Harness {
    handle: ControllerHandle,
    intents: mpsc::UnboundedReceiver<UiIntent>,
    gateway: Arc<ResourceGateway<ScriptedNative>>,
    transcriber: CountingTranscriber,
    host: Arc<Host>,
    seen: Vec<UiIntent>,
}

impl Harness {
    fn new() -> Self {
        Self::with(ScriptedNative::default())
    }

    fn with(native: ScriptedNative) -> Self {
        let gateway = Arc::new(ResourceGateway::new(native));
        let transcriber = CountingTranscriber::new();
        let host = Arc::new(Host::default());
        let (controller, handle, intents) = SessionController::new(
            Arc::clone(&gateway),
            transcriber.clone(),
            Arc::clone(&host),
            CaptureLimits::for_surface(WIDTH),
        );
        controller.spawn();
        Self {
            handle,
            intents,
            gateway,
            transcriber,
            host,
            seen: Vec::new(),
        }
    }

    fn native(&self) -> &ScriptedNative {
        self.gateway.native()
    }

    async fn press_and_wait_recording(&self) {
        self.handle.press().unwrap();
        self.handle
            .wait_for(|s| s.state == SessionState::Recording)
            .await
            .unwrap();
    }

    async fn idle(&mut self) {
        self.handle.idle().await.unwrap();
        self.collect();
    }

    fn collect(&mut self) {
        while let Ok(intent) = self.intents.try_recv() {
            self.seen.push(intent);
        }
    }

    fn notices(&self) -> Vec<Notice> {
        self.seen
            .iter()
            .filter_map(|i| match i {
                UiIntent::Notice(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    fn pulses(&self) -> Vec<HapticPulse> {
        self.seen
            .iter()
            .filter_map(|i| match i {
                UiIntent::Haptic(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    fn ready(&self) -> Vec<String> {
        self.host.ready.lock().unwrap().clone()
    }

    fn flags(&self) -> Vec<bool> {
        self.host.flags.lock().unwrap().clone()
    }
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

// Scenarios

#[tokio::test(start_paused = true)]
async fn hold_and_release_transcribes() {
    let mut h = Harness::new();

    h.press_and_wait_recording().await;
    time::sleep(ms(1500)).await;
    h.handle.release(0.0).unwrap();
    h.idle().await;

    assert_eq!(h.transcriber.calls(), 1);
    assert_eq!(h.ready(), vec![TRANSCRIPT.to_string()]);
    assert_eq!(ScriptedNative::count(&h.native().starts), 1);
    assert_eq!(ScriptedNative::count(&h.native().stops), 1);
    // the consumed artifact is deleted after transcription
    assert_eq!(ScriptedNative::count(&h.native().deletes), 1);
    assert!(!h.gateway.holds_handle());
    assert!(h.handle.snapshot().is_idle());
    assert_eq!(h.flags(), vec![true, false]);
    assert!(h.notices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn slide_to_cancel_discards() {
    let mut h = Harness::new();

    h.press_and_wait_recording().await;
    time::sleep(ms(1000)).await;
    h.handle.drag(-0.7 * WIDTH).unwrap();
    h.handle.settled().await.unwrap();
    assert!(h.handle.snapshot().over_cancel_zone);

    h.handle.release(-0.7 * WIDTH).unwrap();
    h.idle().await;

    assert_eq!(h.transcriber.calls(), 0);
    assert!(h.ready().is_empty());
    assert_eq!(ScriptedNative::count(&h.native().stops), 1);
    assert_eq!(ScriptedNative::count(&h.native().deletes), 1);
    assert!(!h.gateway.holds_handle());
    assert_eq!(
        h.pulses(),
        vec![
            HapticPulse::PressAccepted,
            HapticPulse::EnteredCancelZone,
            HapticPulse::Cancelled
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn short_press_discards() {
    let mut h = Harness::new();

    h.handle.press().unwrap();
    time::sleep(ms(100)).await;
    h.handle.release(0.0).unwrap();
    h.idle().await;

    assert_eq!(h.transcriber.calls(), 0);
    assert!(h.ready().is_empty());
    assert_eq!(ScriptedNative::count(&h.native().deletes), 1);
    assert!(!h.gateway.holds_handle());
    assert!(h.pulses().contains(&HapticPulse::Cancelled));
}

// Properties

#[tokio::test(start_paused = true)]
async fn short_press_cancels_regardless_of_drag() {
    let mut h = Harness::new();

    h.handle.press().unwrap();
    time::sleep(ms(300)).await;
    h.handle.drag(40.0).unwrap();
    h.handle.release(150.0).unwrap();
    h.idle().await;

    assert_eq!(h.transcriber.calls(), 0);
    assert_eq!(ScriptedNative::count(&h.native().deletes), 1);
}

#[tokio::test(start_paused = true)]
async fn release_just_past_short_press_finalizes() {
    let mut h = Harness::new();

    h.handle.press().unwrap();
    time::sleep(ms(500)).await;
    h.handle.release(0.0).unwrap();
    h.idle().await;

    assert_eq!(h.transcriber.calls(), 1);
    assert_eq!(h.ready(), vec![TRANSCRIPT.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn cancel_threshold_is_exclusive() {
    let mut h = Harness::new();
    let threshold = CaptureLimits::for_surface(WIDTH).cancel_threshold();

    h.press_and_wait_recording().await;
    h.handle.drag(-threshold).unwrap();
    h.handle.settled().await.unwrap();
    assert!(!h.handle.snapshot().over_cancel_zone);

    h.handle.drag(-threshold - 1.0).unwrap();
    h.handle.settled().await.unwrap();
    assert!(h.handle.snapshot().over_cancel_zone);

    h.handle.drag(-threshold).unwrap();
    h.handle.settled().await.unwrap();
    assert!(!h.handle.snapshot().over_cancel_zone);

    time::sleep(ms(1000)).await;
    h.handle.release(-threshold).unwrap();
    h.idle().await;

    // released exactly on the threshold: sent, not cancelled
    assert_eq!(h.transcriber.calls(), 1);
    let entered = h
        .pulses()
        .into_iter()
        .filter(|p| *p == HapticPulse::EnteredCancelZone)
        .count();
    assert_eq!(entered, 1);
}

#[tokio::test(start_paused = true)]
async fn release_past_threshold_without_drag_cancels() {
    let mut h = Harness::new();

    h.press_and_wait_recording().await;
    time::sleep(ms(1000)).await;
    h.handle
        .release(-CaptureLimits::for_surface(WIDTH).cancel_threshold() - 1.0)
        .unwrap();
    h.idle().await;

    assert_eq!(h.transcriber.calls(), 0);
    assert_eq!(ScriptedNative::count(&h.native().deletes), 1);
}

#[tokio::test(start_paused = true)]
async fn max_duration_forces_finalize_once() {
    let mut h = Harness::new();

    h.press_and_wait_recording().await;
    time::sleep(Duration::from_secs(125)).await;
    // the user finally lets go, long after the limit stopped the recording
    h.handle.release(0.0).unwrap();
    h.idle().await;

    let limits: Vec<_> = h
        .notices()
        .into_iter()
        .filter(|n| matches!(n, Notice::LimitReached { .. }))
        .collect();
    assert_eq!(limits, vec![Notice::LimitReached { max_secs: 120 }]);
    assert!(h.pulses().contains(&HapticPulse::LimitReached));
    assert_eq!(h.transcriber.calls(), 1);
    assert_eq!(h.ready().len(), 1);
    assert_eq!(ScriptedNative::count(&h.native().stops), 1);

    let last_tick = h
        .seen
        .iter()
        .filter_map(|i| match i {
            UiIntent::Tick { elapsed_seconds } => Some(*elapsed_seconds),
            _ => None,
        })
        .last();
    assert_eq!(last_tick, Some(120));
}

#[tokio::test(start_paused = true)]
async fn ticker_counts_whole_seconds_from_press() {
    let mut h = Harness::new();

    h.press_and_wait_recording().await;
    time::sleep(ms(3500)).await;
    h.handle.settled().await.unwrap();
    assert_eq!(h.handle.snapshot().elapsed_seconds, 3);
    assert_eq!(h.handle.snapshot().elapsed_label(), "0:03");

    h.handle.terminate().unwrap();
    h.idle().await;

    let ticks: Vec<u64> = h
        .seen
        .iter()
        .filter_map(|i| match i {
            UiIntent::Tick { elapsed_seconds } => Some(*elapsed_seconds),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn forced_termination_always_discards() {
    let mut h = Harness::new();

    h.press_and_wait_recording().await;
    time::sleep(ms(2000)).await;
    h.handle.terminate().unwrap();
    h.idle().await;

    assert_eq!(h.transcriber.calls(), 0);
    assert!(h.ready().is_empty());
    assert_eq!(ScriptedNative::count(&h.native().deletes), 1);
    assert!(!h.gateway.holds_handle());
}

#[tokio::test(start_paused = true)]
async fn termination_while_acquiring_discards_after_acquire() {
    let native = ScriptedNative::default();
    native.start_delay_ms.store(1000, Ordering::SeqCst);
    let mut h = Harness::with(native);

    h.handle.press().unwrap();
    time::sleep(ms(700)).await;
    h.handle.terminate().unwrap();
    h.handle.settled().await.unwrap();

    let snapshot = h.handle.snapshot();
    assert_eq!(snapshot.state, SessionState::Acquiring);
    assert_eq!(snapshot.intended, SessionState::Cancelling);

    h.idle().await;
    assert_eq!(ScriptedNative::count(&h.native().starts), 1);
    assert_eq!(ScriptedNative::count(&h.native().deletes), 1);
    assert_eq!(h.transcriber.calls(), 0);
    assert!(!h.gateway.holds_handle());
}

#[tokio::test(start_paused = true)]
async fn release_while_acquiring_is_decided_at_release_time() {
    let native = ScriptedNative::default();
    native.start_delay_ms.store(1000, Ordering::SeqCst);
    let mut h = Harness::with(native);

    h.handle.press().unwrap();
    time::sleep(ms(600)).await;
    h.handle.release(0.0).unwrap();
    h.handle.settled().await.unwrap();

    let snapshot = h.handle.snapshot();
    assert_eq!(snapshot.state, SessionState::Acquiring);
    assert_eq!(snapshot.intended, SessionState::StoppingAndProcessing);
    assert_eq!(h.flags(), vec![true, false]);

    h.idle().await;
    assert_eq!(h.transcriber.calls(), 1);
    assert_eq!(h.ready(), vec![TRANSCRIPT.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn short_release_while_acquiring_discards() {
    let native = ScriptedNative::default();
    native.start_delay_ms.store(1000, Ordering::SeqCst);
    let mut h = Harness::with(native);

    h.handle.press().unwrap();
    time::sleep(ms(100)).await;
    h.handle.release(0.0).unwrap();
    h.idle().await;

    assert_eq!(h.transcriber.calls(), 0);
    assert_eq!(ScriptedNative::count(&h.native().deletes), 1);
    assert!(!h.gateway.holds_handle());
}

#[tokio::test(start_paused = true)]
async fn drag_while_acquiring_does_not_arm_cancel_zone() {
    let native = ScriptedNative::default();
    native.start_delay_ms.store(1000, Ordering::SeqCst);
    let mut h = Harness::with(native);

    h.handle.press().unwrap();
    time::sleep(ms(200)).await;
    h.handle.drag(-80.0).unwrap();
    h.handle.settled().await.unwrap();

    let snapshot = h.handle.snapshot();
    assert_eq!(snapshot.state, SessionState::Acquiring);
    assert!(!snapshot.over_cancel_zone);

    // the release sample itself is still past the threshold
    time::sleep(ms(500)).await;
    h.handle.release(-80.0).unwrap();
    h.idle().await;

    assert_eq!(h.pulses(), vec![HapticPulse::PressAccepted, HapticPulse::Cancelled]);
    assert_eq!(h.transcriber.calls(), 0);
    assert_eq!(ScriptedNative::count(&h.native().deletes), 1);
}

#[tokio::test(start_paused = true)]
async fn watchdog_leaves_held_session_recording() {
    let mut h = Harness::new();

    h.press_and_wait_recording().await;
    time::sleep(ms(600)).await;
    h.handle.settled().await.unwrap();
    h.collect();

    let snapshot = h.handle.snapshot();
    assert_eq!(snapshot.state, SessionState::Recording);
    assert_eq!(snapshot.intended, SessionState::Recording);
    assert_eq!(ScriptedNative::count(&h.native().stops), 0);
    assert_eq!(ScriptedNative::count(&h.native().deletes), 0);
    assert!(h.gateway.holds_handle());
    assert!(h.notices().is_empty());
    assert_eq!(h.pulses(), vec![HapticPulse::PressAccepted]);

    h.handle.release(0.0).unwrap();
    h.idle().await;
    assert_eq!(h.ready(), vec![TRANSCRIPT.to_string()]);
}

// Release totality under fault injection

#[tokio::test(start_paused = true)]
async fn finalize_releases_even_when_stop_keeps_failing() {
    let native = ScriptedNative::default();
    native.failing_stops.store(2, Ordering::SeqCst);
    let mut h = Harness::with(native);

    h.press_and_wait_recording().await;
    time::sleep(ms(1000)).await;
    h.handle.release(0.0).unwrap();
    h.idle().await;

    assert_eq!(ScriptedNative::count(&h.native().stops), 2);
    assert!(!h.gateway.holds_handle());
    assert_eq!(h.notices(), vec![Notice::FinalizeFailed]);
    assert_eq!(h.transcriber.calls(), 0);
    assert!(h.ready().is_empty());

    // the next press gets a fresh handle
    h.press_and_wait_recording().await;
    time::sleep(ms(1000)).await;
    h.handle.release(0.0).unwrap();
    h.idle().await;
    assert_eq!(ScriptedNative::count(&h.native().starts), 2);
    assert_eq!(h.ready(), vec![TRANSCRIPT.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn stop_failing_once_is_retried() {
    let native = ScriptedNative::default();
    native.failing_stops.store(1, Ordering::SeqCst);
    let mut h = Harness::with(native);

    h.press_and_wait_recording().await;
    time::sleep(ms(1000)).await;
    h.handle.release(0.0).unwrap();
    h.idle().await;

    assert_eq!(ScriptedNative::count(&h.native().stops), 2);
    assert_eq!(h.ready(), vec![TRANSCRIPT.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn discard_releases_even_when_stop_keeps_failing() {
    let native = ScriptedNative::default();
    native.failing_stops.store(2, Ordering::SeqCst);
    let mut h = Harness::with(native);

    h.press_and_wait_recording().await;
    h.handle.terminate().unwrap();
    h.idle().await;

    assert_eq!(ScriptedNative::count(&h.native().stops), 2);
    assert_eq!(ScriptedNative::count(&h.native().deletes), 0);
    assert!(!h.gateway.holds_handle());
    // release errors are never surfaced
    assert!(h.notices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn empty_capture_surfaces_finalize_failure() {
    let native = ScriptedNative::default();
    native.capture_nothing.store(true, Ordering::SeqCst);
    let mut h = Harness::with(native);

    h.press_and_wait_recording().await;
    time::sleep(ms(1000)).await;
    h.handle.release(0.0).unwrap();
    h.idle().await;

    assert_eq!(h.notices(), vec![Notice::FinalizeFailed]);
    assert_eq!(h.transcriber.calls(), 0);
    assert!(!h.gateway.holds_handle());
}

// Acquisition failures

#[tokio::test(start_paused = true)]
async fn permission_denied_is_reported_per_press_and_cached() {
    let native = ScriptedNative::default();
    native.deny_permission.store(true, Ordering::SeqCst);
    let mut h = Harness::with(native);

    h.handle.press().unwrap();
    h.idle().await;
    h.handle.press().unwrap();
    h.idle().await;

    assert_eq!(
        h.notices(),
        vec![Notice::PermissionRequired, Notice::PermissionRequired]
    );
    assert_eq!(ScriptedNative::count(&h.native().permission_requests), 1);
    assert_eq!(ScriptedNative::count(&h.native().starts), 0);
    assert!(!h.gateway.holds_handle());
    assert_eq!(h.flags(), vec![true, false, true, false]);
}

#[tokio::test(start_paused = true)]
async fn hardware_refusal_is_reported() {
    let native = ScriptedNative::default();
    native.refuse_start.store(true, Ordering::SeqCst);
    let mut h = Harness::with(native);

    h.handle.press().unwrap();
    h.idle().await;

    assert_eq!(h.notices(), vec![Notice::RecordingUnavailable]);
    assert!(!h.gateway.holds_handle());

    // a release arriving after the failure is ignored
    h.handle.release(0.0).unwrap();
    h.idle().await;
    assert_eq!(h.transcriber.calls(), 0);
}

// Transcription

#[tokio::test(start_paused = true)]
async fn transcription_failure_returns_to_idle() {
    let mut h = Harness::new();
    h.transcriber.respond_with(None);

    h.press_and_wait_recording().await;
    time::sleep(ms(1000)).await;
    h.handle.release(0.0).unwrap();
    h.idle().await;

    assert_eq!(h.notices(), vec![Notice::TranscriptionFailed]);
    assert!(h.ready().is_empty());
    assert_eq!(h.transcriber.calls(), 1);
    // the artifact is still cleaned up
    assert_eq!(ScriptedNative::count(&h.native().deletes), 1);
}

#[tokio::test(start_paused = true)]
async fn blank_transcript_is_a_failure() {
    let mut h = Harness::new();
    h.transcriber.respond_with(Some("   "));

    h.press_and_wait_recording().await;
    time::sleep(ms(1000)).await;
    h.handle.release(0.0).unwrap();
    h.idle().await;

    assert_eq!(h.notices(), vec![Notice::TranscriptionFailed]);
    assert!(h.ready().is_empty());
}

#[tokio::test(start_paused = true)]
async fn on_ready_fires_once_per_session() {
    let mut h = Harness::new();

    for _ in 0..3 {
        h.press_and_wait_recording().await;
        time::sleep(ms(800)).await;
        h.handle.release(0.0).unwrap();
        h.idle().await;
    }

    assert_eq!(h.ready().len(), 3);
    assert_eq!(h.transcriber.calls(), 3);
}

// Guards and stale sessions

#[tokio::test(start_paused = true)]
async fn pending_text_rejects_press() {
    let mut h = Harness::new();
    h.host.has_text.store(true, Ordering::SeqCst);

    h.handle.press().unwrap();
    h.idle().await;

    assert!(h.seen.is_empty());
    assert_eq!(ScriptedNative::count(&h.native().permission_requests), 0);
    assert!(h.flags().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stale_session_is_released_before_new_acquire() {
    let mut h = Harness::new();

    h.press_and_wait_recording().await;
    // the end of the first gesture never arrived
    h.handle.press().unwrap();
    h.handle
        .wait_for(|s| s.session == Some(SessionId::new(2)) && s.state == SessionState::Recording)
        .await
        .unwrap();

    let starts = h.native().start_times.lock().unwrap().clone();
    let stops = h.native().stop_times.lock().unwrap().clone();
    assert_eq!(starts.len(), 2);
    assert_eq!(stops.len(), 1);
    assert!(starts[1] >= stops[0] + ms(100));
    assert_eq!(ScriptedNative::count(&h.native().deletes), 1);
    assert_eq!(ScriptedNative::count(&h.native().peak_open), 1);

    time::sleep(ms(1000)).await;
    h.handle.release(0.0).unwrap();
    h.idle().await;
    assert_eq!(h.ready().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn rapid_presses_never_hold_two_handles() {
    let native = ScriptedNative::default();
    native.start_delay_ms.store(30, Ordering::SeqCst);
    let mut h = Harness::with(native);

    for i in 0..24u64 {
        h.handle.press().unwrap();
        time::sleep(ms((i * 37) % 700)).await;
        match i % 4 {
            0 => h.handle.terminate().unwrap(),
            1 => {
                h.handle.drag(-80.0).unwrap();
                h.handle.release(-80.0).unwrap();
            }
            2 => h.handle.release(0.0).unwrap(),
            // no release: the next press finds a stale session
            _ => {}
        }
        time::sleep(ms((i * 13) % 50)).await;
        assert!(ScriptedNative::count(&h.native().open) <= 1);
    }
    h.handle.release(0.0).unwrap();
    h.idle().await;

    assert_eq!(ScriptedNative::count(&h.native().peak_open), 1);
    assert_eq!(ScriptedNative::count(&h.native().open), 0);
    assert_eq!(
        ScriptedNative::count(&h.native().starts),
        ScriptedNative::count(&h.native().stops)
    );
    assert!(!h.gateway.holds_handle());
    assert!(h.handle.snapshot().is_idle());
}

#[tokio::test(start_paused = true)]
async fn shutdown_discards_in_flight_session() {
    let mut h = Harness::new();

    h.press_and_wait_recording().await;
    h.handle.shutdown().await.unwrap();
    h.collect();

    assert!(!h.gateway.holds_handle());
    assert_eq!(ScriptedNative::count(&h.native().deletes), 1);
    assert!(h.handle.snapshot().is_idle());
    assert!(h.handle.press().is_err());
}

#[tokio::test(start_paused = true)]
async fn disabled_control_rejects_press() {
    let mut h = Harness::new();
    h.host.disabled.store(true, Ordering::SeqCst);

    h.handle.press().unwrap();
    time::sleep(ms(1000)).await;
    h.handle.release(0.0).unwrap();
    h.idle().await;

    assert!(h.seen.is_empty());
    assert_eq!(ScriptedNative::count(&h.native().starts), 0);

    h.host.disabled.store(false, Ordering::SeqCst);
    h.press_and_wait_recording().await;
    assert_eq!(h.handle.snapshot().session, Some(SessionId::new(1)));
}
