use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

use crate::source::SourcePosition;

/// All token kinds the lexer can produce. Identifiers, currency type
/// names, type keywords, control keywords, literal values, operators,
/// punctuation and `Eof` each get their own variant, mirroring
/// `spec.md` §3's partition of the Token kind space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // identifiers and currency type names
    Identifier,
    CurrencyType,

    // type keywords
    Int,
    Float,
    String,
    Bool,
    Void,

    // control keywords
    If,
    Else,
    While,
    Return,
    Currency,

    // literal values
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    BoolLiteral,
    CurrencyLiteral,

    // operators
    Plus,
    Minus,
    Star,
    Percent,
    Slash,
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    ColonEqual,

    // punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Semicolon,
    Comma,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("if", TokenKind::If);
    m.insert("else", TokenKind::Else);
    m.insert("return", TokenKind::Return);
    m.insert("while", TokenKind::While);
    m.insert("int", TokenKind::Int);
    m.insert("float", TokenKind::Float);
    m.insert("string", TokenKind::String);
    m.insert("void", TokenKind::Void);
    m.insert("bool", TokenKind::Bool);
    m.insert("currency", TokenKind::Currency);
    m.insert("true", TokenKind::BoolLiteral);
    m.insert("false", TokenKind::BoolLiteral);
    m
});

/// The payload a token carries alongside its kind. Only literal-bearing
/// tokens carry a non-unit value; everything else is `Unit`.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    Int(i64),
    Float(f64),
    String(std::string::String),
    Bool(bool),
    /// `(amount, three-letter currency name)`, e.g. `3.5USD`.
    Currency(f64, std::string::String),
    Unit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: std::string::String,
    pub value: TokenValue,
    /// Position of the token's *last* character, per `spec.md` §4.2 — an
    /// observable difference from many lexers that tag the first.
    pub position: SourcePosition,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        lexeme: impl Into<std::string::String>,
        value: TokenValue,
        position: SourcePosition,
    ) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            value,
            position,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' at {}", self.kind, self.lexeme, self.position)
    }
}
