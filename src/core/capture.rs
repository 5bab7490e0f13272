// Capture device abstraction - one exclusive stream per loop instance

use crate::models::capture::{AccessResult, CaptureConstraints, RawFrame};
use async_trait::async_trait;
use uuid::Uuid;

/// Result of asking a stream for its next frame
#[derive(Debug)]
pub enum FramePoll {
    /// A frame is available
    Ready(RawFrame),
    /// The source has not produced a frame yet; try again next tick
    Pending,
    /// The source stopped producing frames and cannot recover
    Ended(String),
}

/// A device that can be opened as a live video stream
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Request the device with the given constraints
    async fn acquire(&self, constraints: &CaptureConstraints) -> AccessResult<Box<dyn VideoStream>>;
}

/// An open stream from a capture device
pub trait VideoStream: Send {
    /// Current frame dimensions, if known yet
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Pull the latest frame without blocking
    fn poll_frame(&mut self) -> FramePoll;

    /// Stop every underlying capture track
    fn stop_tracks(&mut self);
}

/// Exclusive owner of an open stream.
///
/// Tracks are stopped exactly once, either through [`StreamHandle::release`]
/// or when the handle is dropped.
pub struct StreamHandle {
    id: Uuid,
    stream: Box<dyn VideoStream>,
    active: bool,
}

impl StreamHandle {
    pub fn new(stream: Box<dyn VideoStream>) -> Self {
        Self {
            id: Uuid::new_v4(),
            stream,
            active: true,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.stream.dimensions()
    }

    pub fn poll_frame(&mut self) -> FramePoll {
        if !self.active {
            return FramePoll::Ended("stream released".to_string());
        }
        self.stream.poll_frame()
    }

    /// Stop the tracks and consume the handle
    pub fn release(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.stream.stop_tracks();
            tracing::debug!(stream_id = %self.id, "Capture tracks stopped");
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingStream {
        stops: Arc<AtomicUsize>,
    }

    impl VideoStream for CountingStream {
        fn dimensions(&self) -> Option<(u32, u32)> {
            Some((4, 4))
        }

        fn poll_frame(&mut self) -> FramePoll {
            FramePoll::Ready(RawFrame::solid(4, 4, [0, 0, 0, 255]))
        }

        fn stop_tracks(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_release_stops_tracks_once() {
        let stops = Arc::new(AtomicUsize::new(0));
        let handle = StreamHandle::new(Box::new(CountingStream { stops: stops.clone() }));
        assert!(handle.is_active());
        handle.release();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_stops_tracks() {
        let stops = Arc::new(AtomicUsize::new(0));
        {
            let _handle = StreamHandle::new(Box::new(CountingStream { stops: stops.clone() }));
        }
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handles_get_distinct_ids() {
        let stops = Arc::new(AtomicUsize::new(0));
        let a = StreamHandle::new(Box::new(CountingStream { stops: stops.clone() }));
        let b = StreamHandle::new(Box::new(CountingStream { stops: stops.clone() }));
        assert_ne!(a.id(), b.id());
    }
}
