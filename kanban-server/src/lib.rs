//! Kanban mock API server library.
//!
//! Exposes the HTTP API for use in tests and embedding. The server keeps the
//! task list in memory, optionally mirrors it to a JSON file, and fails a
//! configurable share of requests to exercise client-side rollback.

pub mod api;
pub mod config;
pub mod store;
