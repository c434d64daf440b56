// src/refresh/mod.rs

// Declare sub-modules for the refresh workflow
pub mod categories;
pub mod orchestrator;
pub mod poll;

pub use categories::{determine_categories, determine_categories_at, CategorySelection};
pub use orchestrator::{
    CategoryFailure, RefreshOrchestrator, RemoteCommand, RunReport, RunStatus, REFRESH_ACTION,
};
pub use poll::{refresh_category, RefreshOutcome, Sleeper, TokioSleeper};
