pub mod core;
pub mod models;
pub mod platform;

use crate::core::annotation_loop::AnnotationLoop;
use crate::core::capture::CaptureDevice;
use crate::core::config::AnnotationConfig;
use crate::core::surface::ImageSurface;
use models::status::AnnotationStatus;
use std::sync::{Arc, Mutex};

// Application state shared by the user-facing controls
pub struct AppState {
    pub config: Mutex<AnnotationConfig>,
    pub camera: AnnotationLoop<ImageSurface>,
}

impl AppState {
    pub fn new(device: Arc<dyn CaptureDevice>, config: AnnotationConfig) -> Self {
        Self {
            camera: AnnotationLoop::new(device, ImageSurface::new(), config.clone()),
            config: Mutex::new(config),
        }
    }
}

// Camera controls: each maps 1:1 to a button in the presentation layer

pub async fn start_camera(state: &AppState) -> Result<(), String> {
    state.camera.start().await.map_err(|e| e.user_message())
}

pub async fn stop_camera(state: &AppState) -> Result<(), String> {
    state.camera.stop().await;
    Ok(())
}

pub async fn toggle_obscure(enabled: bool, state: &AppState) -> Result<(), String> {
    state.camera.toggle_obscure(enabled).await;
    Ok(())
}

pub async fn get_camera_status(state: &AppState) -> Result<AnnotationStatus, String> {
    Ok(state.camera.status().await)
}

// Configuration commands

pub fn get_config(state: &AppState) -> Result<AnnotationConfig, String> {
    let config = state
        .config
        .lock()
        .map_err(|e| format!("Failed to lock config: {}", e))?;

    Ok(config.clone())
}

/// Validate, persist and apply a new configuration.
///
/// Capture constraints and frame rate are used from the next camera start;
/// everything else applies to the running camera straight away.
pub async fn update_config(config: AnnotationConfig, state: &AppState) -> Result<(), String> {
    config
        .validate()
        .map_err(|e| format!("Invalid configuration: {}", e))?;

    config
        .save()
        .map_err(|e| format!("Failed to save config: {}", e))?;

    apply_config(config, state).await
}

async fn apply_config(config: AnnotationConfig, state: &AppState) -> Result<(), String> {
    {
        let mut current_config = state
            .config
            .lock()
            .map_err(|e| format!("Failed to lock config: {}", e))?;
        *current_config = config.clone();
    }

    state.camera.reconfigure(config).await;
    Ok(())
}

/// Log directives used when `RUST_LOG` is unset: the library and the demo
pub const DEFAULT_LOG_FILTER: &str = "glimpse_lib=info,camera_simulation=info";

/// Install the tracing subscriber, honouring `RUST_LOG` when set
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // A subscriber may already be installed (tests, embedding apps)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
