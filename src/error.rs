use std::fmt;

use crate::evaluator::EvalError;
use crate::lexer::LexerError;
use crate::parser::ParserError;

/// Everything that can go wrong end to end, folded into one type so
/// `runner::run_file` has a single `Result` to match on.
///
/// Grounded on the teacher's hand-written `Display`/`Error` impls for
/// `ParseError` and `RuntimeError` — no `thiserror` here either, since
/// the teacher never reaches for one.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpreterError {
    Lexer(LexerError),
    Parser(ParserError),
    Eval(EvalError),
}

impl fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpreterError::Lexer(e) => write!(f, "{e}"),
            InterpreterError::Parser(e) => write!(f, "{e}"),
            InterpreterError::Eval(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for InterpreterError {}

impl From<LexerError> for InterpreterError {
    fn from(e: LexerError) -> Self {
        InterpreterError::Lexer(e)
    }
}

impl From<ParserError> for InterpreterError {
    fn from(e: ParserError) -> Self {
        InterpreterError::Parser(e)
    }
}

impl From<EvalError> for InterpreterError {
    fn from(e: EvalError) -> Self {
        InterpreterError::Eval(e)
    }
}

impl InterpreterError {
    /// BSD-sysexits-style exit code: 65 for anything caught before
    /// execution starts (lexing, parsing, or the semantic/type checks
    /// folded into evaluation), 70 for a runtime failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            InterpreterError::Lexer(_) | InterpreterError::Parser(_) => 65,
            InterpreterError::Eval(EvalError::Semantic(_) | EvalError::Type(_)) => 65,
            InterpreterError::Eval(EvalError::Runtime(_)) => 70,
        }
    }
}
