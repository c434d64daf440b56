// src/zspace/mod.rs

// NAS media index API: wire types, session credentials and the HTTP client.
pub mod client;
pub mod session;
pub mod types;

pub use client::{generate_nonce, MediaIndexApi, ZspaceClient};
pub use session::Session;
pub use types::{Classification, TaskStatusReply};
