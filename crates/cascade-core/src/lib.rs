//! Core data types for the Cascade simulator.
//!
//! This crate defines the types shared by every layer of the simulator:
//! arbitrary-width [`bits::Bits`] values, the global configuration, and the
//! march targets with their standard library prelude.
//!
//! This crate is intentionally free of async code and simulation state.

/// Name of the implicit module that owns every top-level item.
pub const ROOT_MODULE: &str = "Root";

pub mod bits;
pub mod config;
pub mod march;
