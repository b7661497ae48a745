//! CLI command handlers

pub mod ask;
pub mod cleanup;
pub mod history;
pub mod status;
pub mod thread;
