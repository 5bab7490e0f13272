// Data models for camera capture, regions of interest and loop status

pub mod capture;
pub mod region;
pub mod status;
