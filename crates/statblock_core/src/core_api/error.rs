use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    /// Invalid rating, template label, column or operation code.
    Configuration,
    /// Malformed or unrecognized macro directive.
    Parse,
    /// A reference query matched no rows.
    NotFound,
    /// The structured document could not be read or written.
    Serialization,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code:?}: {message}")]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Configuration, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Parse, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::NotFound, message)
    }
}
