// This file makes the crate a library and declares modules for use
// by the binary (main.rs) and integration tests.

pub mod config;
pub mod copilot;
pub mod error;
pub mod history;
pub mod notify;
pub mod refresh;
pub mod scheduler;
pub mod zspace;
