//! Service layer for the draft-room coordinator
//!
//! Application state wiring and background task management.

pub mod app;

pub use app::{AppState, ServiceError};
