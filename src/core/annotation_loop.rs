// Live frame annotation loop - pulls frames from a capture device, obscures
// detected regions and keeps the result on a render surface

use crate::core::capture::{CaptureDevice, FramePoll, StreamHandle};
use crate::core::config::AnnotationConfig;
use crate::core::detector::{RandomRegionDetector, RegionDetector};
use crate::core::pipeline::FramePipeline;
use crate::core::redactor::Redactor;
use crate::core::surface::RenderSurface;
use crate::models::capture::AccessError;
use crate::models::status::{quality_label, AnnotationStatus, LoopState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("Annotation loop is already streaming")]
    AlreadyStreaming,
}

impl LoopError {
    /// Human-readable message for the presentation layer
    pub fn user_message(&self) -> String {
        match self {
            LoopError::Access(err) => err.user_message(),
            LoopError::AlreadyStreaming => self.to_string(),
        }
    }
}

pub type LoopResult<T> = Result<T, LoopError>;

/// Outcome of one scheduled tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was drawn and annotated
    Rendered,
    /// The source had no frame ready; try again next tick
    Skipped,
    /// The source failed and the loop went idle
    SourceEnded,
    /// The loop is no longer streaming this session
    Cancelled,
}

impl TickOutcome {
    fn reschedule(self) -> bool {
        matches!(self, TickOutcome::Rendered | TickOutcome::Skipped)
    }
}

struct LoopInner<S: RenderSurface> {
    state: LoopState,
    config: AnnotationConfig,
    stream: Option<StreamHandle>,
    scheduled: Option<JoinHandle<()>>,
    pipeline: FramePipeline<S>,
    frames_rendered: u64,
    frames_skipped: u64,
    regions_detected: usize,
    resolution: Option<(u32, u32)>,
    last_error: Option<String>,
}

impl<S: RenderSurface> LoopInner<S> {
    fn session_id(&self) -> Option<Uuid> {
        self.stream.as_ref().map(StreamHandle::id)
    }

    fn tick(&mut self, session: Uuid) -> TickOutcome {
        if self.state != LoopState::Streaming || self.session_id() != Some(session) {
            return TickOutcome::Cancelled;
        }
        let Some(stream) = self.stream.as_mut() else {
            return TickOutcome::Cancelled;
        };

        match stream.poll_frame() {
            FramePoll::Pending => {
                self.frames_skipped += 1;
                tracing::trace!(%session, "No frame ready yet");
                TickOutcome::Skipped
            }
            FramePoll::Ended(reason) => {
                tracing::warn!(%session, %reason, "Video source ended; going idle");
                self.last_error = Some(reason);
                self.teardown();
                TickOutcome::SourceEnded
            }
            FramePoll::Ready(frame) => {
                let Some(report) = self.pipeline.process(&frame) else {
                    self.frames_skipped += 1;
                    tracing::debug!(%session, "Frame could not be drawn; skipped");
                    return TickOutcome::Skipped;
                };
                self.frames_rendered += 1;
                self.regions_detected = report.regions.len();
                self.resolution = Some((report.width, report.height));
                tracing::trace!(
                    %session,
                    regions = report.regions.len(),
                    obscured = report.obscured,
                    "Frame annotated"
                );
                TickOutcome::Rendered
            }
        }
    }

    /// Release the stream, cancel the pending tick and clear the surface
    fn teardown(&mut self) {
        if let Some(task) = self.scheduled.take() {
            task.abort();
        }
        if let Some(stream) = self.stream.take() {
            stream.release();
        }
        self.pipeline.clear();
        self.state = LoopState::Idle;
        self.regions_detected = 0;
    }
}

/// Clears the in-flight start marker however `start()` exits, including when
/// its future is dropped mid-acquire
struct StartingGuard<'a>(&'a AtomicBool);

impl Drop for StartingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives a [`FramePipeline`] from a capture device at a fixed cadence.
///
/// The loop owns the device stream, the surface and the scheduled task.
/// Dropping the loop releases the device; if a tick is running at that
/// moment the release happens as soon as that tick returns.
pub struct AnnotationLoop<S: RenderSurface + 'static> {
    inner: Arc<Mutex<LoopInner<S>>>,
    device: Arc<dyn CaptureDevice>,
    starting: AtomicBool,
    random_detector: bool,
}

impl<S: RenderSurface + 'static> AnnotationLoop<S> {
    /// Create a loop using the random region detector described by `config`
    pub fn new(device: Arc<dyn CaptureDevice>, surface: S, config: AnnotationConfig) -> Self {
        let detector = RandomRegionDetector::new(config.regions.clone());
        let mut annotation = Self::with_detector(device, surface, Box::new(detector), config);
        annotation.random_detector = true;
        annotation
    }

    /// Create a loop with a caller-supplied detector
    pub fn with_detector(
        device: Arc<dyn CaptureDevice>,
        surface: S,
        detector: Box<dyn RegionDetector>,
        config: AnnotationConfig,
    ) -> Self {
        let mut pipeline = FramePipeline::new(surface, detector, Redactor::new(config.style.clone()));
        pipeline.set_obscure(config.obscure_enabled);

        Self {
            inner: Arc::new(Mutex::new(LoopInner {
                state: LoopState::Idle,
                config,
                stream: None,
                scheduled: None,
                pipeline,
                frames_rendered: 0,
                frames_skipped: 0,
                regions_detected: 0,
                resolution: None,
                last_error: None,
            })),
            device,
            starting: AtomicBool::new(false),
            random_detector: false,
        }
    }

    pub async fn config(&self) -> AnnotationConfig {
        self.inner.lock().await.config.clone()
    }

    /// Apply a new configuration.
    ///
    /// Obscuring, style and region policy apply from the next tick; capture
    /// constraints and frame rate apply from the next `start()`. A detector
    /// supplied through [`AnnotationLoop::with_detector`] is kept as is.
    pub async fn reconfigure(&self, config: AnnotationConfig) {
        let mut inner = self.inner.lock().await;
        inner.pipeline.set_obscure(config.obscure_enabled);
        inner.pipeline.set_redactor(Redactor::new(config.style.clone()));
        if self.random_detector {
            inner
                .pipeline
                .set_detector(Box::new(RandomRegionDetector::new(config.regions.clone())));
        }
        inner.config = config;
        tracing::info!(obscure_enabled = inner.pipeline.obscure_enabled(), "Configuration applied");
    }

    /// Acquire the capture device and begin ticking
    pub async fn start(&self) -> LoopResult<()> {
        let constraints = {
            let inner = self.inner.lock().await;
            if inner.state == LoopState::Streaming || self.starting.swap(true, Ordering::SeqCst) {
                return Err(LoopError::AlreadyStreaming);
            }
            inner.config.capture.clone()
        };
        let _starting = StartingGuard(&self.starting);

        // Wrapped at once so a cancelled start still stops the tracks
        let acquired = self
            .device
            .acquire(&constraints)
            .await
            .map(StreamHandle::new);

        let mut inner = self.inner.lock().await;
        let handle = match acquired {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(error = %err, "Camera access failed");
                inner.last_error = Some(err.user_message());
                return Err(err.into());
            }
        };

        let session = handle.id();
        let dimensions = handle.dimensions();
        let period = inner.config.frame_interval();

        inner.stream = Some(handle);
        inner.state = LoopState::Streaming;
        inner.frames_rendered = 0;
        inner.frames_skipped = 0;
        inner.regions_detected = 0;
        inner.resolution = dimensions;
        inner.last_error = None;
        inner.scheduled = Some(Self::schedule(
            Arc::downgrade(&self.inner),
            session,
            period,
        ));

        tracing::info!(%session, ?dimensions, "Annotation loop streaming");
        Ok(())
    }

    /// Release the device and stop ticking. Does nothing when idle.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state == LoopState::Idle {
            return;
        }

        let session = inner.session_id();
        inner.teardown();
        tracing::info!(session = ?session, "Annotation loop stopped");
    }

    /// Enable or disable obscuring from the next tick on
    pub async fn toggle_obscure(&self, enabled: bool) {
        let mut inner = self.inner.lock().await;
        inner.pipeline.set_obscure(enabled);
        tracing::info!(enabled, "Obscuring toggled");
    }

    pub async fn state(&self) -> LoopState {
        self.inner.lock().await.state
    }

    pub async fn status(&self) -> AnnotationStatus {
        let inner = self.inner.lock().await;
        AnnotationStatus {
            state: inner.state,
            session_id: inner.session_id().map(|id| id.to_string()),
            obscure_enabled: inner.pipeline.obscure_enabled(),
            regions_detected: inner.regions_detected,
            frames_rendered: inner.frames_rendered,
            frames_skipped: inner.frames_skipped,
            resolution: inner.resolution,
            stream_quality: inner.resolution.map(|(_, h)| quality_label(h)),
            last_error: inner.last_error.clone(),
        }
    }

    /// Inspect the render surface, e.g. to snapshot the annotated frame
    pub async fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let inner = self.inner.lock().await;
        f(inner.pipeline.surface())
    }

    fn schedule(inner: Weak<Mutex<LoopInner<S>>>, session: Uuid, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let outcome = inner.lock().await.tick(session);
                if !outcome.reschedule() {
                    tracing::debug!(%session, ?outcome, "Tick loop finished");
                    break;
                }
            }
        })
    }
}

impl<S: RenderSurface + 'static> Drop for AnnotationLoop<S> {
    fn drop(&mut self) {
        // A running tick holds the lock; its strong reference then drops the
        // stream handle once the tick returns.
        if let Ok(mut inner) = self.inner.try_lock() {
            inner.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::surface::ImageSurface;
    use crate::platform::capture::SyntheticCamera;

    fn small_config() -> AnnotationConfig {
        let mut config = AnnotationConfig::default();
        config.capture.width = 64;
        config.capture.height = 48;
        config
    }

    fn new_loop(camera: &SyntheticCamera) -> AnnotationLoop<ImageSurface> {
        AnnotationLoop::new(Arc::new(camera.clone()), ImageSurface::new(), small_config())
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_renders_first_frame() {
        let camera = SyntheticCamera::new();
        let annotation = new_loop(&camera);

        annotation.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let status = annotation.status().await;
        assert_eq!(status.state, LoopState::Streaming);
        assert_eq!(status.frames_rendered, 1);
        assert_eq!(status.resolution, Some((64, 48)));
        assert_eq!(status.stream_quality.as_deref(), Some("48p"));
        assert!((1..=3).contains(&status.regions_detected));
        assert_eq!(annotation.with_surface(|s| s.dimensions()).await, (64, 48));

        annotation.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_rejected() {
        let camera = SyntheticCamera::new();
        let annotation = new_loop(&camera);

        annotation.start().await.unwrap();
        assert!(matches!(annotation.start().await, Err(LoopError::AlreadyStreaming)));
        assert_eq!(camera.acquisitions(), 1);

        annotation.stop().await;
        assert_eq!(camera.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warmup_ticks_are_skipped_then_rendered() {
        let camera = SyntheticCamera::new().with_warmup(3);
        let annotation = new_loop(&camera);

        annotation.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let status = annotation.status().await;
        assert_eq!(status.frames_skipped, 3);
        assert!(status.frames_rendered >= 1);
        annotation.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_end_returns_to_idle() {
        let camera = SyntheticCamera::new().ending_after(2);
        let annotation = new_loop(&camera);

        annotation.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        let status = annotation.status().await;
        assert_eq!(status.state, LoopState::Idle);
        assert_eq!(status.frames_rendered, 2);
        assert!(status.last_error.unwrap().contains("ended"));
        assert_eq!(camera.releases(), 1);
        assert!(!camera.is_in_use());

        // Can be started again after the source failure
        annotation.start().await.unwrap();
        annotation.stop().await;
        assert_eq!(camera.releases(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_obscure_updates_status() {
        let camera = SyntheticCamera::new();
        let annotation = new_loop(&camera);
        assert!(annotation.status().await.obscure_enabled);

        annotation.toggle_obscure(false).await;
        assert!(!annotation.status().await.obscure_enabled);
        annotation.toggle_obscure(true).await;
        assert!(annotation.status().await.obscure_enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_device() {
        let camera = SyntheticCamera::new();
        {
            let annotation = new_loop(&camera);
            annotation.start().await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(camera.releases(), 1);
        assert!(!camera.is_in_use());
    }

    #[tokio::test]
    async fn test_failed_start_records_message() {
        let camera = SyntheticCamera::denied("blocked");
        let annotation = new_loop(&camera);

        let err = annotation.start().await.unwrap_err();
        assert!(err.user_message().contains("grant camera permissions"));

        let status = annotation.status().await;
        assert_eq!(status.state, LoopState::Idle);
        assert!(status.session_id.is_none());
        assert!(status.last_error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconfigure_defers_capture_to_next_start() {
        let camera = SyntheticCamera::new();
        let annotation = new_loop(&camera);
        annotation.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut config = small_config();
        config.capture.width = 32;
        config.capture.height = 24;
        config.obscure_enabled = false;
        annotation.reconfigure(config).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let status = annotation.status().await;
        assert!(!status.obscure_enabled);
        assert_eq!(status.resolution, Some((64, 48)));

        annotation.stop().await;
        annotation.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(annotation.status().await.resolution, Some((32, 24)));
        annotation.stop().await;
    }
}
