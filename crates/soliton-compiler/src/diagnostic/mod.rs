//! Diagnostic types for error reporting.

mod error;
mod span;

pub use error::{CompilerError, RelationValidationError};
pub use span::Span;
