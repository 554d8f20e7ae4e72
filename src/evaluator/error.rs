use std::fmt;

use crate::source::SourcePosition;

/// `spec.md` §7's five semantic-error kinds, grounded on
/// `original_source/interpreter/environment/environment_errors.py`'s
/// `SemanticErrorCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    FunIdNotFound,
    VarIdNotFound,
    CurrIdNotFound,
    DuplicateId,
    WrongNumberOfParams,
}

impl fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SemanticErrorKind::FunIdNotFound => "Function identifier not found",
            SemanticErrorKind::VarIdNotFound => "Variable identifier not found",
            SemanticErrorKind::CurrIdNotFound => "Currency identifier not found",
            SemanticErrorKind::DuplicateId => "Duplicate declaration found",
            SemanticErrorKind::WrongNumberOfParams => "Wrong number of params passed to the function",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub position: SourcePosition,
    pub name: String,
}

impl SemanticError {
    pub fn new(kind: SemanticErrorKind, position: SourcePosition, name: impl Into<String>) -> Self {
        Self {
            kind,
            position,
            name: name.into(),
        }
    }
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Semantic error: {} at line {} col {} for id named {}",
            self.kind, self.position.line, self.position.column, self.name
        )
    }
}

impl std::error::Error for SemanticError {}

/// A type mismatch anywhere the evaluator checks a value against a
/// declared or expected type. Kept separate from `SemanticError`
/// because its text form carries the two type names rather than a
/// single identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticTypeError {
    pub position: SourcePosition,
    pub expected: String,
    pub actual: String,
}

impl SemanticTypeError {
    pub fn new(
        position: SourcePosition,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            position,
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl fmt::Display for SemanticTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wrong type: Expected {}, got {}", self.expected, self.actual)
    }
}

impl std::error::Error for SemanticTypeError {}

/// `spec.md` §7's runtime-error kinds, raised only once evaluation is
/// well past parsing and static type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    InfiniteLoop,
    InfiniteRecursion,
    VarNotInitializedWithValue,
    /// Not one of `spec.md` §7's named kinds — the original interpreter
    /// lets an integer divide/modulo by zero crash with an unhandled
    /// Python exception. Turning it into a reported `RuntimeError`
    /// instead of a panic is a supplemented behavior, not a deviation
    /// from any documented semantics.
    DivisionByZero,
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RuntimeErrorKind::InfiniteLoop => "Infinite loop found",
            RuntimeErrorKind::InfiniteRecursion => "Infinite recursion found",
            RuntimeErrorKind::VarNotInitializedWithValue => "Variable not initialized with a value",
            RuntimeErrorKind::DivisionByZero => "Division by zero",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub position: SourcePosition,
    pub name: String,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, position: SourcePosition, name: impl Into<String>) -> Self {
        Self {
            kind,
            position,
            name: name.into(),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Runtime error: {} at line {} col {} for id named {}",
            self.kind, self.position.line, self.position.column, self.name
        )
    }
}

impl std::error::Error for RuntimeError {}

/// Everything the evaluator can fail with, folded into one type so
/// callers don't need three separate `Result` arms.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    Semantic(SemanticError),
    Type(SemanticTypeError),
    Runtime(RuntimeError),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Semantic(e) => write!(f, "{e}"),
            EvalError::Type(e) => write!(f, "{e}"),
            EvalError::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EvalError {}

impl From<SemanticError> for EvalError {
    fn from(e: SemanticError) -> Self {
        EvalError::Semantic(e)
    }
}

impl From<SemanticTypeError> for EvalError {
    fn from(e: SemanticTypeError) -> Self {
        EvalError::Type(e)
    }
}

impl From<RuntimeError> for EvalError {
    fn from(e: RuntimeError) -> Self {
        EvalError::Runtime(e)
    }
}
