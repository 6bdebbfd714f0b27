//! Recording coordinator
//!
//! Orchestrates target lookup, the fixed-rate capture loop, and the video
//! sink, and manages the recording lifecycle.

use super::state::{
    format_elapsed, RecordingConfig, RecordingResult, RecordingSession, RecordingState,
    RecordingStatus,
};
use crate::capture::{
    CaptureError, FrameSize, FrameSource, LocateError, RecordingTarget, WindowLocator,
};
use crate::error::{RecorderError, RecorderResult};
use crate::output;
use crate::sink::{FrameSink, SinkError, SinkFactory};
use chrono::Utc;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Events emitted during recording
#[derive(Debug, Clone)]
pub enum RecordingEvent {
    /// Recording started
    Started {
        session_id: Uuid,
        output_path: PathBuf,
    },
    /// Recording paused
    Paused,
    /// Recording resumed
    Resumed,
    /// Recording stopped and the output file was finalized
    Stopped { result: RecordingResult },
    /// A tick produced no frame; the next tick retries
    FrameSkipped { reason: String },
    /// One more second of footage recorded
    Elapsed { seconds: u64 },
    /// The session was aborted
    Error { message: String },
}

/// State shared between the coordinator and its background tasks.
struct SharedState {
    state: RwLock<RecordingState>,
    message: RwLock<String>,
    elapsed_seconds: AtomicU64,
    frames_written: AtomicU64,
}

impl SharedState {
    fn new() -> Self {
        Self {
            state: RwLock::new(RecordingState::Idle),
            message: RwLock::new(RecordingState::Idle.status_label().to_string()),
            elapsed_seconds: AtomicU64::new(0),
            frames_written: AtomicU64::new(0),
        }
    }

    fn state(&self) -> RecordingState {
        *self.state.read()
    }

    /// Moves to `state` and resets the status line to its label.
    fn set_state(&self, state: RecordingState) {
        *self.state.write() = state;
        *self.message.write() = state.status_label().to_string();
    }

    fn set_message(&self, message: impl Into<String>) {
        *self.message.write() = message.into();
    }
}

/// Why one capture tick produced no frame.
#[derive(Debug, Error)]
enum TickError {
    #[error("{0}")]
    Locate(#[from] LocateError),

    #[error("{0}")]
    Capture(#[from] CaptureError),

    #[error("{0}")]
    Sink(#[from] SinkError),
}

impl TickError {
    /// Locate and capture failures are retried on the next tick; only a
    /// dead sink ends the session.
    fn is_fatal(&self) -> bool {
        match self {
            Self::Sink(err) => err.is_fatal(),
            _ => false,
        }
    }
}

/// Runs one tick: re-locate the target, grab a frame, rescale it to the
/// session's frame size, and hand it to the sink.
fn capture_tick(
    locator: &dyn WindowLocator,
    source: &dyn FrameSource,
    sink: &dyn FrameSink,
    target: &RecordingTarget,
    frame_size: FrameSize,
) -> Result<(), TickError> {
    let region = locator.locate(target)?;
    let frame = source.capture(region)?;
    let frame = frame.into_resized(frame_size);
    sink.write(&frame)?;
    Ok(())
}

/// Capture side of an active session; runs on its own task until the
/// shared state leaves Recording/Paused.
struct CaptureWorker {
    shared: Arc<SharedState>,
    locator: Arc<dyn WindowLocator>,
    source: Arc<dyn FrameSource>,
    sink: Arc<dyn FrameSink>,
    target: RecordingTarget,
    frame_size: FrameSize,
    fps: u32,
    event_tx: broadcast::Sender<RecordingEvent>,
}

impl CaptureWorker {
    async fn run(self) {
        let frame_interval = Duration::from_millis(1000 / self.fps as u64);

        while self.shared.state().is_active() {
            let start = Instant::now();

            if self.shared.state() == RecordingState::Recording {
                match capture_tick(
                    self.locator.as_ref(),
                    self.source.as_ref(),
                    self.sink.as_ref(),
                    &self.target,
                    self.frame_size,
                ) {
                    Ok(()) => {
                        let count = self.shared.frames_written.fetch_add(1, Ordering::Relaxed) + 1;
                        if count % 60 == 0 {
                            tracing::debug!(
                                "Captured {} frames ({:.1}s) at {}",
                                count,
                                count as f64 / self.fps as f64,
                                self.frame_size
                            );
                        }
                    }
                    Err(err) if err.is_fatal() => {
                        tracing::error!("Recording aborted: {}", err);
                        self.shared.set_state(RecordingState::Idle);
                        self.shared.set_message(format!("Recording failed: {}", err));
                        let _ = self.event_tx.send(RecordingEvent::Error {
                            message: err.to_string(),
                        });
                        if let Err(close_err) = self.sink.close() {
                            tracing::warn!("Sink close after abort failed: {}", close_err);
                        }
                        break;
                    }
                    Err(err) => {
                        tracing::warn!("Frame skipped: {}", err);
                        let _ = self.event_tx.send(RecordingEvent::FrameSkipped {
                            reason: err.to_string(),
                        });
                    }
                }
            }

            // Paused and skipped ticks keep the same cadence as written
            // ones, so resuming stays aligned to the frame interval.
            let elapsed = start.elapsed();
            if elapsed < frame_interval {
                tokio::time::sleep(frame_interval - elapsed).await;
            }
        }
    }
}

/// Counts recorded seconds while the session is live; paused seconds do
/// not count.
async fn run_clock(
    shared: Arc<SharedState>,
    event_tx: broadcast::Sender<RecordingEvent>,
    interval: Duration,
) {
    loop {
        tokio::time::sleep(interval).await;
        if !shared.state().is_active() {
            break;
        }
        if shared.state() == RecordingState::Recording {
            let seconds = shared.elapsed_seconds.fetch_add(1, Ordering::Relaxed) + 1;
            let _ = event_tx.send(RecordingEvent::Elapsed { seconds });
        }
    }
}

/// Tasks and sink belonging to the recording in progress.
struct ActiveSession {
    session: RecordingSession,
    sink: Arc<dyn FrameSink>,
    capture_task: JoinHandle<()>,
    clock_task: JoinHandle<()>,
}

/// Drives recordings against a window locator, a frame source, and a
/// sink factory.
pub struct RecordingCoordinator {
    /// State visible to background tasks
    shared: Arc<SharedState>,

    /// Finds windows and resolves capture regions
    locator: Arc<dyn WindowLocator>,

    /// Grabs frames for a capture region
    source: Arc<dyn FrameSource>,

    /// Opens one sink per recording
    sink_factory: Arc<dyn SinkFactory>,

    /// The recording in progress, if any
    active: Option<ActiveSession>,

    /// Event broadcaster
    event_tx: broadcast::Sender<RecordingEvent>,

    /// Elapsed-clock tick interval; one second outside of tests
    clock_interval: Duration,
}

impl RecordingCoordinator {
    /// Create a new recording coordinator
    pub fn new(
        locator: Arc<dyn WindowLocator>,
        source: Arc<dyn FrameSource>,
        sink_factory: Arc<dyn SinkFactory>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            shared: Arc::new(SharedState::new()),
            locator,
            source,
            sink_factory,
            active: None,
            event_tx,
            clock_interval: Duration::from_secs(1),
        }
    }

    /// Get the current recording state
    pub fn state(&self) -> RecordingState {
        self.shared.state()
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    /// Titles of windows currently available for capture
    pub fn list_targets(&self) -> Vec<String> {
        self.locator.list_targets()
    }

    /// The session in progress, if any
    pub fn session(&self) -> Option<&RecordingSession> {
        self.active.as_ref().map(|active| &active.session)
    }

    /// Snapshot of the recorder for display.
    pub fn status(&self) -> RecordingStatus {
        let elapsed_seconds = self.shared.elapsed_seconds.load(Ordering::Relaxed);
        RecordingStatus {
            state: self.shared.state(),
            message: self.shared.message.read().clone(),
            elapsed_seconds,
            elapsed: format_elapsed(elapsed_seconds),
            frames_written: self.shared.frames_written.load(Ordering::Relaxed),
            output_path: self
                .active
                .as_ref()
                .map(|active| active.session.output_path.clone()),
        }
    }

    /// Start recording.
    ///
    /// Resolves the target, opens the sink at the located size, and spawns
    /// the capture and clock tasks. Nothing is created on disk when the
    /// target cannot be resolved.
    pub async fn start(&mut self, config: RecordingConfig) -> RecorderResult<RecordingSession> {
        // A session that aborted in the background still holds its task
        // handles; reap it before checking state.
        if self.active.is_some() && !self.shared.state().is_active() {
            let _ = self.stop().await;
        }

        if self.shared.state().is_active() {
            return Err(RecorderError::AlreadyRecording);
        }
        if config.fps == 0 {
            return Err(RecorderError::InvalidFrameRate);
        }

        let region = self.locator.locate(&config.target)?;
        let frame_size = region.size();

        output::ensure_output_dir(&config.output_dir)?;
        let output_path = output::resolve_output_path(&config.output_dir, config.file_name.as_deref());

        let sink = self.sink_factory.open(&output_path, frame_size, config.fps)?;

        let session = RecordingSession {
            id: Uuid::new_v4(),
            target: config.target.clone(),
            output_path: output_path.clone(),
            frame_size,
            fps: config.fps,
            started_at: Utc::now(),
        };

        self.shared.frames_written.store(0, Ordering::Relaxed);
        self.shared.elapsed_seconds.store(0, Ordering::Relaxed);
        self.shared.set_state(RecordingState::Recording);

        let worker = CaptureWorker {
            shared: self.shared.clone(),
            locator: self.locator.clone(),
            source: self.source.clone(),
            sink: sink.clone(),
            target: config.target,
            frame_size,
            fps: config.fps,
            event_tx: self.event_tx.clone(),
        };
        let capture_task = tokio::spawn(worker.run());
        let clock_task = tokio::spawn(run_clock(
            self.shared.clone(),
            self.event_tx.clone(),
            self.clock_interval,
        ));

        self.active = Some(ActiveSession {
            session: session.clone(),
            sink,
            capture_task,
            clock_task,
        });

        let _ = self.event_tx.send(RecordingEvent::Started {
            session_id: session.id,
            output_path,
        });

        tracing::info!(
            "Recording started: {} at {} @ {}fps to {:?}",
            session.target,
            frame_size,
            session.fps,
            session.output_path
        );
        Ok(session)
    }

    /// Stop recording and finalize the output file.
    ///
    /// Returns `None` when no recording is in progress. The capture task
    /// is joined before the sink is closed, so every captured frame lands
    /// in the file.
    pub async fn stop(&mut self) -> Option<RecordingResult> {
        let active = self.active.take()?;

        tracing::info!("Stopping recording");
        self.shared.set_state(RecordingState::Stopped);

        let _ = active.capture_task.await;
        active.clock_task.abort();

        let result = RecordingResult {
            session_id: active.session.id,
            output_path: active.session.output_path.clone(),
            frames_written: self.shared.frames_written.load(Ordering::Relaxed),
            elapsed_seconds: self.shared.elapsed_seconds.load(Ordering::Relaxed),
            stopped_at: Utc::now(),
        };

        match active.sink.close() {
            Ok(()) => {
                self.shared.set_state(RecordingState::Idle);
                tracing::info!(
                    "Recording saved: {:?} ({} frames, {})",
                    result.output_path,
                    result.frames_written,
                    format_elapsed(result.elapsed_seconds)
                );
            }
            Err(err) => {
                tracing::error!("Failed to finalize recording: {}", err);
                self.shared.set_state(RecordingState::Idle);
                self.shared.set_message(format!("Save failed: {}", err));
                let _ = self.event_tx.send(RecordingEvent::Error {
                    message: err.to_string(),
                });
            }
        }

        let _ = self.event_tx.send(RecordingEvent::Stopped {
            result: result.clone(),
        });
        Some(result)
    }

    /// Pause recording; the capture loop keeps its cadence but writes
    /// nothing until resumed.
    pub fn pause(&mut self) -> RecorderResult<()> {
        if self.shared.state() != RecordingState::Recording {
            return Err(RecorderError::NotRecording);
        }
        self.shared.set_state(RecordingState::Paused);
        let _ = self.event_tx.send(RecordingEvent::Paused);
        tracing::info!("Recording paused");
        Ok(())
    }

    /// Resume a paused recording.
    pub fn resume(&mut self) -> RecorderResult<()> {
        if self.shared.state() != RecordingState::Paused {
            return Err(RecorderError::NotPaused);
        }
        self.shared.set_state(RecordingState::Recording);
        let _ = self.event_tx.send(RecordingEvent::Resumed);
        tracing::info!("Recording resumed");
        Ok(())
    }

    /// Pause when recording, resume when paused; returns the new state.
    pub fn toggle_pause(&mut self) -> RecorderResult<RecordingState> {
        match self.shared.state() {
            RecordingState::Recording => self.pause()?,
            RecordingState::Paused => self.resume()?,
            _ => return Err(RecorderError::NotRecording),
        }
        Ok(self.shared.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureRegion, Frame};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::io;
    use std::path::Path;
    use std::sync::atomic::AtomicBool;
    use tempfile::tempdir;

    fn region(width: u32, height: u32) -> CaptureRegion {
        CaptureRegion {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    fn config(dir: &Path, fps: u32) -> RecordingConfig {
        RecordingConfig {
            target: RecordingTarget::window("Notepad"),
            output_dir: dir.to_path_buf(),
            file_name: Some("capture".to_string()),
            fps,
        }
    }

    /// Locator answering from a script, then repeating a default.
    struct ScriptedLocator {
        script: Mutex<VecDeque<Result<CaptureRegion, LocateError>>>,
        default: Result<CaptureRegion, LocateError>,
    }

    impl ScriptedLocator {
        fn always(region: CaptureRegion) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(VecDeque::new()),
                default: Ok(region),
            })
        }

        fn failing(error: LocateError) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(VecDeque::new()),
                default: Err(error),
            })
        }

        fn scripted(
            script: Vec<Result<CaptureRegion, LocateError>>,
            default: CaptureRegion,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                default: Ok(default),
            })
        }
    }

    impl WindowLocator for ScriptedLocator {
        fn list_targets(&self) -> Vec<String> {
            vec!["Notepad".to_string()]
        }

        fn locate(&self, _target: &RecordingTarget) -> Result<CaptureRegion, LocateError> {
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| self.default.clone())
        }
    }

    /// Source stamping each frame's first byte with a capture counter.
    struct ScriptedSource {
        sizes: Mutex<VecDeque<FrameSize>>,
        captured: AtomicU64,
    }

    impl ScriptedSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sizes: Mutex::new(VecDeque::new()),
                captured: AtomicU64::new(0),
            })
        }

        fn with_sizes(sizes: Vec<FrameSize>) -> Arc<Self> {
            Arc::new(Self {
                sizes: Mutex::new(sizes.into()),
                captured: AtomicU64::new(0),
            })
        }
    }

    impl FrameSource for ScriptedSource {
        fn capture(&self, region: CaptureRegion) -> Result<Frame, CaptureError> {
            let size = self
                .sizes
                .lock()
                .pop_front()
                .unwrap_or_else(|| region.size());
            let stamp = self.captured.fetch_add(1, Ordering::Relaxed) as u8;
            Ok(Frame::filled(size, [stamp, 0, 0, 255]))
        }
    }

    /// Sink recording every write so tests can inspect order and sizes.
    #[derive(Default)]
    struct SinkSpy {
        sizes: Mutex<Vec<FrameSize>>,
        first_bytes: Mutex<Vec<u8>>,
        script: Mutex<VecDeque<Result<(), SinkError>>>,
        write_delay: Mutex<Option<Duration>>,
        closed: AtomicBool,
        wrote_after_close: AtomicBool,
    }

    impl SinkSpy {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn slow(delay: Duration) -> Arc<Self> {
            let spy = Self::default();
            *spy.write_delay.lock() = Some(delay);
            Arc::new(spy)
        }

        fn scripted(script: Vec<Result<(), SinkError>>) -> Arc<Self> {
            let spy = Self::default();
            *spy.script.lock() = script.into();
            Arc::new(spy)
        }

        fn write_count(&self) -> usize {
            self.sizes.lock().len()
        }

        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    impl FrameSink for SinkSpy {
        fn write(&self, frame: &Frame) -> Result<(), SinkError> {
            if self.closed.load(Ordering::SeqCst) {
                self.wrote_after_close.store(true, Ordering::SeqCst);
                return Err(SinkError::Closed);
            }
            if let Some(delay) = *self.write_delay.lock() {
                std::thread::sleep(delay);
            }
            if let Some(result) = self.script.lock().pop_front() {
                result?;
            }
            self.sizes.lock().push(frame.size());
            self.first_bytes.lock().push(frame.data()[0]);
            Ok(())
        }

        fn close(&self) -> Result<(), SinkError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Factory handing out queued spies, or fresh ones when the queue is
    /// empty.
    #[derive(Default)]
    struct SpySinkFactory {
        queued: Mutex<VecDeque<Arc<SinkSpy>>>,
        open_args: Mutex<Vec<(PathBuf, FrameSize, u32)>>,
        fail_open: bool,
    }

    impl SpySinkFactory {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn with_sink(sink: Arc<SinkSpy>) -> Arc<Self> {
            let factory = Self::default();
            factory.queued.lock().push_back(sink);
            Arc::new(factory)
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail_open: true,
                ..Self::default()
            })
        }

        fn open_count(&self) -> usize {
            self.open_args.lock().len()
        }
    }

    impl SinkFactory for SpySinkFactory {
        fn open(
            &self,
            path: &Path,
            frame_size: FrameSize,
            fps: u32,
        ) -> Result<Arc<dyn FrameSink>, SinkError> {
            if self.fail_open {
                return Err(SinkError::EncoderMissing);
            }
            self.open_args
                .lock()
                .push((path.to_path_buf(), frame_size, fps));
            let sink = self.queued.lock().pop_front().unwrap_or_default();
            Ok(sink)
        }
    }

    fn drain_events(events: &mut broadcast::Receiver<RecordingEvent>) -> Vec<RecordingEvent> {
        let mut drained = Vec::new();
        loop {
            match events.try_recv() {
                Ok(event) => drained.push(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => break,
            }
        }
        drained
    }

    #[test]
    fn test_tick_writes_frame_at_session_size() {
        let locator = ScriptedLocator::always(region(800, 600));
        let source = ScriptedSource::new();
        let sink = SinkSpy::new();
        let target = RecordingTarget::window("Notepad");

        capture_tick(
            locator.as_ref(),
            source.as_ref(),
            sink.as_ref(),
            &target,
            FrameSize::new(800, 600),
        )
        .unwrap();

        assert_eq!(*sink.sizes.lock(), vec![FrameSize::new(800, 600)]);
    }

    #[test]
    fn test_tick_rescales_when_window_size_changes() {
        let session_size = FrameSize::new(800, 600);
        let source = ScriptedSource::with_sizes(vec![
            FrameSize::new(1000, 700),
            FrameSize::new(640, 480),
        ]);
        let locator = ScriptedLocator::always(region(800, 600));
        let sink = SinkSpy::new();
        let target = RecordingTarget::window("Notepad");

        for _ in 0..3 {
            capture_tick(
                locator.as_ref(),
                source.as_ref(),
                sink.as_ref(),
                &target,
                session_size,
            )
            .unwrap();
        }

        let sizes = sink.sizes.lock();
        assert_eq!(sizes.len(), 3);
        assert!(sizes.iter().all(|size| *size == session_size));
    }

    #[test]
    fn test_ninety_ticks_land_in_order_at_initial_size() {
        // The window grows a third of the way in; every written frame
        // still has the size the sink was opened with.
        let initial = FrameSize::new(800, 600);
        let sizes: Vec<FrameSize> = (0..90)
            .map(|i| {
                if i < 30 {
                    initial
                } else {
                    FrameSize::new(1000, 700)
                }
            })
            .collect();
        let source = ScriptedSource::with_sizes(sizes);
        let locator = ScriptedLocator::always(region(800, 600));
        let sink = SinkSpy::new();
        let target = RecordingTarget::window("Notepad");

        for _ in 0..90 {
            capture_tick(
                locator.as_ref(),
                source.as_ref(),
                sink.as_ref(),
                &target,
                initial,
            )
            .unwrap();
        }

        assert_eq!(sink.write_count(), 90);
        assert!(sink.sizes.lock().iter().all(|size| *size == initial));
        let expected: Vec<u8> = (0..90).collect();
        assert_eq!(*sink.first_bytes.lock(), expected);
    }

    #[test]
    fn test_tick_locate_failure_reaches_no_sink() {
        let locator = ScriptedLocator::failing(LocateError::NotFound {
            title: "Ghost".to_string(),
        });
        let source = ScriptedSource::new();
        let sink = SinkSpy::new();
        let target = RecordingTarget::window("Ghost");

        let err = capture_tick(
            locator.as_ref(),
            source.as_ref(),
            sink.as_ref(),
            &target,
            FrameSize::new(800, 600),
        )
        .unwrap_err();

        assert!(!err.is_fatal());
        assert_eq!(sink.write_count(), 0);
    }

    #[test]
    fn test_tick_broken_pipe_is_fatal() {
        let locator = ScriptedLocator::always(region(800, 600));
        let source = ScriptedSource::new();
        let sink = SinkSpy::scripted(vec![Err(SinkError::Io(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "pipe",
        )))]);
        let target = RecordingTarget::window("Notepad");

        let err = capture_tick(
            locator.as_ref(),
            source.as_ref(),
            sink.as_ref(),
            &target,
            FrameSize::new(800, 600),
        )
        .unwrap_err();

        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_start_opens_sink_at_located_size() {
        let dir = tempdir().unwrap();
        let locator = ScriptedLocator::always(region(800, 600));
        let factory = SpySinkFactory::new();
        let mut coordinator =
            RecordingCoordinator::new(locator, ScriptedSource::new(), factory.clone());

        let session = coordinator.start(config(dir.path(), 30)).await.unwrap();

        assert_eq!(session.frame_size, FrameSize::new(800, 600));
        assert_eq!(coordinator.state(), RecordingState::Recording);
        assert_eq!(coordinator.status().message, "Recording...");
        {
            let opens = factory.open_args.lock();
            assert_eq!(opens.len(), 1);
            assert_eq!(opens[0].0, dir.path().join("capture.mp4"));
            assert_eq!(opens[0].1, FrameSize::new(800, 600));
            assert_eq!(opens[0].2, 30);
        }

        coordinator.stop().await;
    }

    #[tokio::test]
    async fn test_start_unknown_window_creates_nothing() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let locator = ScriptedLocator::failing(LocateError::NotFound {
            title: "Ghost".to_string(),
        });
        let factory = SpySinkFactory::new();
        let mut coordinator =
            RecordingCoordinator::new(locator, ScriptedSource::new(), factory.clone());

        let err = coordinator.start(config(&out, 30)).await.unwrap_err();

        assert!(matches!(err, RecorderError::TargetUnavailable(_)));
        assert_eq!(coordinator.state(), RecordingState::Idle);
        assert_eq!(factory.open_count(), 0);
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_start_minimized_window_fails() {
        let dir = tempdir().unwrap();
        let locator = ScriptedLocator::failing(LocateError::Minimized {
            title: "Notepad".to_string(),
        });
        let mut coordinator =
            RecordingCoordinator::new(locator, ScriptedSource::new(), SpySinkFactory::new());

        let err = coordinator.start(config(dir.path(), 30)).await.unwrap_err();

        assert!(matches!(
            err,
            RecorderError::TargetUnavailable(LocateError::Minimized { .. })
        ));
    }

    #[tokio::test]
    async fn test_start_rejects_zero_fps() {
        let dir = tempdir().unwrap();
        let locator = ScriptedLocator::always(region(800, 600));
        let mut coordinator =
            RecordingCoordinator::new(locator, ScriptedSource::new(), SpySinkFactory::new());

        let err = coordinator.start(config(dir.path(), 0)).await.unwrap_err();

        assert!(matches!(err, RecorderError::InvalidFrameRate));
    }

    #[tokio::test]
    async fn test_start_surfaces_sink_open_failure() {
        let dir = tempdir().unwrap();
        let locator = ScriptedLocator::always(region(800, 600));
        let mut coordinator =
            RecordingCoordinator::new(locator, ScriptedSource::new(), SpySinkFactory::failing());

        let err = coordinator.start(config(dir.path(), 30)).await.unwrap_err();

        assert!(matches!(
            err,
            RecorderError::SinkOpenFailed(SinkError::EncoderMissing)
        ));
        assert_eq!(coordinator.state(), RecordingState::Idle);
    }

    #[tokio::test]
    async fn test_start_surfaces_directory_failure() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let locator = ScriptedLocator::always(region(800, 600));
        let factory = SpySinkFactory::new();
        let mut coordinator =
            RecordingCoordinator::new(locator, ScriptedSource::new(), factory.clone());

        let err = coordinator
            .start(config(&blocker.join("sub"), 30))
            .await
            .unwrap_err();

        assert!(matches!(err, RecorderError::DirectoryCreationFailed { .. }));
        assert_eq!(factory.open_count(), 0);
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let dir = tempdir().unwrap();
        let locator = ScriptedLocator::always(region(800, 600));
        let mut coordinator =
            RecordingCoordinator::new(locator, ScriptedSource::new(), SpySinkFactory::new());

        coordinator.start(config(dir.path(), 30)).await.unwrap();
        let err = coordinator.start(config(dir.path(), 30)).await.unwrap_err();

        assert!(matches!(err, RecorderError::AlreadyRecording));
        coordinator.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_records_frames_until_stopped() {
        let dir = tempdir().unwrap();
        let locator = ScriptedLocator::always(region(320, 240));
        let sink = SinkSpy::new();
        let factory = SpySinkFactory::with_sink(sink.clone());
        let mut coordinator =
            RecordingCoordinator::new(locator, ScriptedSource::new(), factory);

        coordinator.start(config(dir.path(), 100)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        let result = coordinator.stop().await.unwrap();

        assert!(result.frames_written >= 3);
        assert_eq!(result.frames_written, sink.write_count() as u64);
        assert!(sink.is_closed());
        assert!(!sink.wrote_after_close.load(Ordering::SeqCst));
        assert_eq!(coordinator.state(), RecordingState::Idle);

        // Stopping again is a no-op.
        assert!(coordinator.stop().await.is_none());
        assert_eq!(coordinator.state(), RecordingState::Idle);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_transient_locate_failure_keeps_recording() {
        let dir = tempdir().unwrap();
        let locator = ScriptedLocator::scripted(
            vec![
                Ok(region(320, 240)),
                Ok(region(320, 240)),
                Err(LocateError::NotFound {
                    title: "Notepad".to_string(),
                }),
            ],
            region(320, 240),
        );
        let sink = SinkSpy::new();
        let factory = SpySinkFactory::with_sink(sink.clone());
        let mut coordinator =
            RecordingCoordinator::new(locator, ScriptedSource::new(), factory);
        let mut events = coordinator.subscribe();

        coordinator.start(config(dir.path(), 100)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(coordinator.state(), RecordingState::Recording);
        let result = coordinator.stop().await.unwrap();

        // The failed tick is skipped, later ticks keep writing.
        assert!(result.frames_written >= 3);
        let drained = drain_events(&mut events);
        assert!(drained
            .iter()
            .any(|event| matches!(event, RecordingEvent::FrameSkipped { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_joins_writer_before_closing_sink() {
        let dir = tempdir().unwrap();
        let locator = ScriptedLocator::always(region(320, 240));
        let sink = SinkSpy::slow(Duration::from_millis(30));
        let factory = SpySinkFactory::with_sink(sink.clone());
        let mut coordinator =
            RecordingCoordinator::new(locator, ScriptedSource::new(), factory);

        coordinator.start(config(dir.path(), 100)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        coordinator.stop().await.unwrap();

        // A write was likely in flight at stop; it must have completed
        // before close, never after.
        assert!(sink.is_closed());
        assert!(!sink.wrote_after_close.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pause_freezes_frames_and_clock() {
        let dir = tempdir().unwrap();
        let locator = ScriptedLocator::always(region(320, 240));
        let sink = SinkSpy::new();
        let factory = SpySinkFactory::with_sink(sink.clone());
        let mut coordinator =
            RecordingCoordinator::new(locator, ScriptedSource::new(), factory.clone());
        coordinator.clock_interval = Duration::from_millis(20);

        coordinator.start(config(dir.path(), 100)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        coordinator.pause().unwrap();
        assert_eq!(coordinator.state(), RecordingState::Paused);
        assert_eq!(coordinator.status().message, "Paused");

        // Let any in-flight tick settle, then verify nothing moves.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let frames_at_pause = sink.write_count();
        let elapsed_at_pause = coordinator.status().elapsed_seconds;
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(sink.write_count(), frames_at_pause);
        assert_eq!(coordinator.status().elapsed_seconds, elapsed_at_pause);

        coordinator.resume().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(sink.write_count() > frames_at_pause);

        let result = coordinator.stop().await.unwrap();
        assert!(result.frames_written > frames_at_pause as u64);
        // Pause and resume reuse the sink opened at start.
        assert_eq!(factory.open_count(), 1);
    }

    #[tokio::test]
    async fn test_pause_and_resume_outside_their_states() {
        let dir = tempdir().unwrap();
        let locator = ScriptedLocator::always(region(320, 240));
        let mut coordinator =
            RecordingCoordinator::new(locator, ScriptedSource::new(), SpySinkFactory::new());

        assert!(matches!(
            coordinator.pause().unwrap_err(),
            RecorderError::NotRecording
        ));
        assert!(matches!(
            coordinator.resume().unwrap_err(),
            RecorderError::NotPaused
        ));

        coordinator.start(config(dir.path(), 30)).await.unwrap();
        assert!(matches!(
            coordinator.resume().unwrap_err(),
            RecorderError::NotPaused
        ));
        coordinator.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_toggle_pause_cycles_states() {
        let dir = tempdir().unwrap();
        let locator = ScriptedLocator::always(region(320, 240));
        let mut coordinator =
            RecordingCoordinator::new(locator, ScriptedSource::new(), SpySinkFactory::new());

        coordinator.start(config(dir.path(), 30)).await.unwrap();
        assert_eq!(coordinator.toggle_pause().unwrap(), RecordingState::Paused);
        assert_eq!(
            coordinator.toggle_pause().unwrap(),
            RecordingState::Recording
        );
        coordinator.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fatal_sink_error_stops_session() {
        let dir = tempdir().unwrap();
        let locator = ScriptedLocator::always(region(320, 240));
        let sink = SinkSpy::scripted(vec![
            Ok(()),
            Ok(()),
            Err(SinkError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "pipe",
            ))),
        ]);
        let factory = SpySinkFactory::with_sink(sink.clone());
        let mut coordinator =
            RecordingCoordinator::new(locator, ScriptedSource::new(), factory.clone());
        let mut events = coordinator.subscribe();

        coordinator.start(config(dir.path(), 100)).await.unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while coordinator.state() != RecordingState::Idle && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(coordinator.state(), RecordingState::Idle);
        assert!(sink.is_closed());
        let drained = drain_events(&mut events);
        assert!(drained
            .iter()
            .any(|event| matches!(event, RecordingEvent::Error { .. })));

        // A later start reaps the aborted session and opens a new sink.
        coordinator.start(config(dir.path(), 100)).await.unwrap();
        assert_eq!(factory.open_count(), 2);
        coordinator.stop().await;
    }
}
