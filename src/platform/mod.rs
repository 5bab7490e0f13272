// Platform-facing capture device implementations

pub mod capture;
