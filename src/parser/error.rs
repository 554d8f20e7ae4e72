use std::fmt;

use crate::lexer::TokenKind;
use crate::source::SourcePosition;

#[derive(Debug, Clone, PartialEq)]
pub struct ParserError {
    pub position: SourcePosition,
    pub actual: TokenKind,
    pub expected: Vec<TokenKind>,
    pub message: Option<String>,
}

impl ParserError {
    pub fn new(position: SourcePosition, actual: TokenKind, expected: Vec<TokenKind>) -> Self {
        Self {
            position,
            actual,
            expected,
            message: None,
        }
    }

    pub fn with_message(
        position: SourcePosition,
        actual: TokenKind,
        expected: Vec<TokenKind>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            position,
            actual,
            expected,
            message: Some(message.into()),
        }
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ParserError: unexpected {:?} at line {} col {}",
            self.actual, self.position.line, self.position.column
        )?;
        if !self.expected.is_empty() {
            write!(f, ", expected one of {:?}", self.expected)?;
        }
        if let Some(message) = &self.message {
            write!(f, " ({message})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParserError {}
