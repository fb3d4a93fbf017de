//! Simulation runtime for Cascade.
//!
//! The [`runtime::Runtime`] owns one engine per standard component plus a
//! single software logic engine for all user code. Engines exchange port
//! values through the [`data_plane::DataPlane`] and report system tasks back
//! to the runtime, which executes them as interrupts between time steps.
//! Controllers interact with a running simulation only through a
//! [`handle::RuntimeHandle`].

pub mod board;
pub mod compiler;
pub mod data_plane;
pub mod engine;
pub mod handle;
pub mod runtime;
pub mod state;
pub mod sw;
pub mod view;

pub use board::Board;
pub use handle::{EvalSource, Interrupt, RuntimeHandle};
pub use runtime::{format_frequency, Runtime, RuntimeOptions};
pub use view::{RecordingView, View};
