use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for Cascade operations outside of the simulation loop.
#[derive(Debug, Error, Diagnostic)]
pub enum CascadeError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Source text could not be parsed.
    #[error("Parse error: {message}")]
    #[diagnostic(help("Check the Verilog source for syntax errors"))]
    Parse { message: String },

    /// Source text parsed but failed type checking.
    #[error("Typechecker error: {message}")]
    Typecheck { message: String },

    /// A well-typed program could not be flattened into a design.
    #[error("Elaboration failed: {message}")]
    Elaboration { message: String },

    /// Invalid or unreadable configuration.
    #[error("Config error: {message}")]
    #[diagnostic(help("Check ~/.cascade/config.toml for syntax errors"))]
    Config { message: String },

    /// The simulation runtime stopped unexpectedly.
    #[error("Runtime error: {message}")]
    Runtime { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type CascadeResult<T> = miette::Result<T>;
