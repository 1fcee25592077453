//! Kanban task board client: an optimistic task-state manager over a
//! pluggable task store, plus a small line-oriented shell.

pub mod board;
pub mod config;
pub mod shell;
pub mod store;
