//! Error types for pgcraft

use thiserror::Error;

/// Result type alias for pgcraft operations
pub type CraftResult<T> = Result<T, CraftError>;

/// Error types for statement construction and record access
#[derive(Debug, Error)]
pub enum CraftError {
    /// Invalid field descriptor or object definition
    #[error("Schema error: {0}")]
    Schema(String),

    /// Statement rendering failed; the output buffer must be discarded
    #[error("Render error: {0}")]
    Render(String),

    /// A handle was used as the wrong shape
    #[error("Handle error: {0}")]
    Handle(String),

    /// Field name not present in the object
    #[error("'{name}' is not a field of this object")]
    UnknownField { name: String },

    /// Slice index out of bounds
    #[error("index {index} is out of range for slice of length {len}")]
    OutOfRange { index: usize, len: usize },

    /// Named or positional parameter could not be resolved
    #[error("Parameter resolution error: {0}")]
    Unresolved(String),

    /// Row decode/mapping error
    #[error("Decode error on field '{column}': {message}")]
    Decode { column: String, message: String },
}

impl CraftError {
    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Create a render error
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    /// Create a handle-misuse error
    pub fn handle(message: impl Into<String>) -> Self {
        Self::Handle(message.into())
    }

    /// Create a decode error for a specific field
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an unknown-field error
    pub fn unknown_field(name: impl Into<String>) -> Self {
        Self::UnknownField { name: name.into() }
    }

    /// Check if this is an unknown-field error
    pub fn is_unknown_field(&self) -> bool {
        matches!(self, Self::UnknownField { .. })
    }

    /// Check if this is an out-of-range error
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. })
    }
}
