//! Terminal front ends for Cascade.
//!
//! Views render runtime output; controllers feed Verilog text into a running
//! simulation through a [`cascade_runtime::RuntimeHandle`].

pub mod many_view;
pub mod stream;
pub mod term;
pub mod term_view;

pub use many_view::ManyView;
pub use stream::StreamController;
pub use term::TermController;
pub use term_view::TermView;
