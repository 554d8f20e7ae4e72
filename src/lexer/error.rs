use std::fmt;

use crate::source::SourcePosition;

#[derive(Debug, Clone, PartialEq)]
pub struct LexerError {
    pub message: String,
    pub position: SourcePosition,
}

impl LexerError {
    pub fn new(message: impl Into<String>, position: SourcePosition) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LexerError: {} at line {} col {}",
            self.message, self.position.line, self.position.column
        )
    }
}

impl std::error::Error for LexerError {}
