// Library module for blobsync
// Re-exports modules for use in integration tests and external crates

pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod sync;
