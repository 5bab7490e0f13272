// Loop status reported to the presentation layer

use serde::{Deserialize, Serialize};

/// Lifecycle state of the annotation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Idle,
    Streaming,
}

/// Snapshot of the annotation loop for UI display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationStatus {
    pub state: LoopState,
    pub session_id: Option<String>,
    pub obscure_enabled: bool,
    /// Regions found in the most recent rendered frame
    pub regions_detected: usize,
    pub frames_rendered: u64,
    pub frames_skipped: u64,
    pub resolution: Option<(u32, u32)>,
    pub stream_quality: Option<String>,
    pub last_error: Option<String>,
}

impl AnnotationStatus {
    pub fn is_streaming(&self) -> bool {
        self.state == LoopState::Streaming
    }
}

/// Quality label for a frame height, e.g. 720 -> "720p"
pub fn quality_label(height: u32) -> String {
    match height {
        0 => "unknown".to_string(),
        h if h >= 2160 => "4K".to_string(),
        h => format!("{}p", h),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_label() {
        assert_eq!(quality_label(720), "720p");
        assert_eq!(quality_label(1080), "1080p");
        assert_eq!(quality_label(2160), "4K");
        assert_eq!(quality_label(0), "unknown");
    }

    #[test]
    fn test_status_serializes_snake_case_state() {
        let status = AnnotationStatus {
            state: LoopState::Streaming,
            session_id: None,
            obscure_enabled: true,
            regions_detected: 2,
            frames_rendered: 10,
            frames_skipped: 1,
            resolution: Some((1280, 720)),
            stream_quality: Some("720p".to_string()),
            last_error: None,
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"state\":\"streaming\""));
        let back: AnnotationStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }
}
