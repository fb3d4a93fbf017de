//! Shared utilities for the Cascade simulator.
//!
//! This crate provides cross-cutting concerns used by all other Cascade crates:
//! error types, include-path file search, and terminal status and progress
//! indicators.

pub mod errors;
pub mod fs;
pub mod progress;
