// Capture device implementations
// Each device provides the interface defined in core/capture.rs

pub mod synthetic;

pub use synthetic::SyntheticCamera;
