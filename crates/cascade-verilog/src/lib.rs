pub mod ast;
pub mod elaborate;
pub mod eval;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod printf;
pub mod program;
pub mod source;
pub mod typecheck;

pub use elaborate::{elaborate, ElabError};
pub use parser::{parse, ParseError};
pub use program::Program;
pub use source::{SourceFile, Span};
pub use typecheck::{Issue, Severity, TypeError};
