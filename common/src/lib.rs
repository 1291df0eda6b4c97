//! Shared infrastructure for the raw restoration workspace.

pub mod buffer2;
pub mod log_setup;
pub mod parallel;

pub use buffer2::Buffer2;
