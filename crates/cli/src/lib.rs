//! `helpdesk-cli` library crate.
//!
//! Re-exports the command layer for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod commands;
pub mod config;
