pub mod annotation_loop;
pub mod capture;
pub mod config;
pub mod detector;
pub mod pipeline;
pub mod redactor;
pub mod surface;
