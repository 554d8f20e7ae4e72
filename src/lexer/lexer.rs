use crate::config::Limits;
use crate::source::{SourcePosition, SourceReader};

use super::error::LexerError;
use super::token::{Token, TokenKind, TokenValue, KEYWORDS};

/// Pull-based scanner: one call to `next_token` produces one token. The
/// scanner has no buffering obligation beyond the token currently being
/// built, per `spec.md` §5.
pub struct Lexer<R: SourceReader> {
    source: R,
    limits: Limits,
    eof_reached: bool,
}

impl<R: SourceReader> Lexer<R> {
    pub fn new(source: R, limits: Limits) -> Self {
        Self {
            source,
            limits,
            eof_reached: false,
        }
    }

    pub fn eof_reached(&self) -> bool {
        self.eof_reached
    }

    /// Consume and return the current character.
    fn bump(&mut self) -> char {
        let c = self
            .source
            .peek()
            .expect("bump called with no current character");
        self.source.advance();
        c
    }

    fn peek(&self) -> Option<char> {
        self.source.peek()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.peek_next()
    }

    fn position(&self) -> SourcePosition {
        self.source.position()
    }

    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace_and_comments()?;

        match self.peek() {
            None => {
                self.eof_reached = true;
                Ok(Token::new(TokenKind::Eof, "", TokenValue::Unit, self.position()))
            }
            Some(c) if c.is_ascii_digit() => self.scan_number(),
            Some('"') => self.scan_string(),
            Some(c) if is_identifier_start(c) => self.scan_identifier(),
            Some(c) if c.is_ascii_uppercase() => self.scan_currency_type(),
            Some(_) => self.scan_operator_or_punctuation(),
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexerError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_next() == Some('*') => {
                    self.skip_block_comment()?;
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexerError> {
        let start = self.position();
        self.bump(); // '/'
        self.bump(); // '*'

        let mut scanned = 0usize;
        loop {
            if scanned > self.limits.max_comment_scan_length {
                return Err(LexerError::new("Unterminated comment", start));
            }
            match self.peek() {
                None => return Err(LexerError::new("Unterminated comment", start)),
                Some('*') if self.peek_next() == Some('/') => {
                    self.bump();
                    self.bump();
                    return Ok(());
                }
                Some(_) => {
                    self.bump();
                    scanned += 1;
                }
            }
        }
    }

    fn scan_number(&mut self) -> Result<Token, LexerError> {
        let mut digits = String::new();
        let mut last_position = self.position();

        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            if digits.len() >= self.limits.max_integer_literal_digits {
                return Err(LexerError::new(
                    format!(
                        "Integer literal exceeds the maximum of {} digits",
                        self.limits.max_integer_literal_digits
                    ),
                    self.position(),
                ));
            }
            last_position = self.position();
            digits.push(self.bump());
        }

        if self.peek() == Some('.') {
            return self.scan_float_or_currency(digits);
        }

        let value: i64 = digits
            .parse()
            .map_err(|_| LexerError::new("Invalid integer literal", last_position))?;

        if matches!(self.peek(), Some(c) if c.is_ascii_uppercase()) {
            return self.scan_currency_suffix(value as f64, digits, last_position);
        }

        Ok(Token::new(
            TokenKind::IntLiteral,
            digits,
            TokenValue::Int(value),
            last_position,
        ))
    }

    fn scan_float_or_currency(&mut self, int_part: String) -> Result<Token, LexerError> {
        let dot_position = self.position();
        self.bump(); // '.'

        if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            return Err(LexerError::new(
                "Expected at least one digit after '.'",
                dot_position,
            ));
        }

        let mut frac_part = String::new();
        let mut last_position = dot_position;
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            last_position = self.position();
            frac_part.push(self.bump());
        }

        let lexeme = format!("{int_part}.{frac_part}");
        let amount: f64 = lexeme
            .parse()
            .map_err(|_| LexerError::new("Invalid float literal", last_position))?;

        if matches!(self.peek(), Some(c) if c.is_ascii_uppercase()) {
            return self.scan_currency_suffix(amount, lexeme, last_position);
        }

        Ok(Token::new(
            TokenKind::FloatLiteral,
            lexeme,
            TokenValue::Float(amount),
            last_position,
        ))
    }

    fn scan_currency_suffix(
        &mut self,
        amount: f64,
        amount_lexeme: String,
        fallback_position: SourcePosition,
    ) -> Result<Token, LexerError> {
        let mut name = String::new();
        let mut last_position = fallback_position;
        for _ in 0..3 {
            match self.peek() {
                Some(c) if c.is_ascii_uppercase() => {
                    last_position = self.position();
                    name.push(self.bump());
                }
                _ => {
                    return Err(LexerError::new(
                        "Currency literal requires exactly three uppercase letters",
                        self.position(),
                    ));
                }
            }
        }
        let lexeme = format!("{amount_lexeme}{name}");
        Ok(Token::new(
            TokenKind::CurrencyLiteral,
            lexeme,
            TokenValue::Currency(amount, name),
            last_position,
        ))
    }

    fn scan_string(&mut self) -> Result<Token, LexerError> {
        let start = self.position();
        self.bump(); // opening quote

        let mut value = String::new();
        loop {
            if value.len() > self.limits.max_string_literal_length {
                return Err(LexerError::new(
                    format!(
                        "String literal exceeds the maximum of {} characters",
                        self.limits.max_string_literal_length
                    ),
                    start,
                ));
            }
            match self.peek() {
                None => return Err(LexerError::new("Unterminated string literal", start)),
                Some('"') => {
                    let last_position = self.position();
                    self.bump();
                    return Ok(Token::new(
                        TokenKind::StringLiteral,
                        value.clone(),
                        TokenValue::String(value),
                        last_position,
                    ));
                }
                Some(_) => value.push(self.bump()),
            }
        }
    }

    fn scan_identifier(&mut self) -> Result<Token, LexerError> {
        let mut lexeme = String::new();
        let mut last_position = self.position();
        while let Some(c) = self.peek() {
            if !is_identifier_continue(c) {
                break;
            }
            last_position = self.position();
            lexeme.push(self.bump());
        }

        if let Some(kind) = KEYWORDS.get(lexeme.as_str()).copied() {
            let value = match kind {
                TokenKind::BoolLiteral => TokenValue::Bool(lexeme == "true"),
                _ => TokenValue::Unit,
            };
            return Ok(Token::new(kind, lexeme, value, last_position));
        }

        Ok(Token::new(
            TokenKind::Identifier,
            lexeme,
            TokenValue::Unit,
            last_position,
        ))
    }

    fn scan_currency_type(&mut self) -> Result<Token, LexerError> {
        let mut name = String::new();
        let mut last_position = self.position();
        for _ in 0..3 {
            match self.peek() {
                Some(c) if c.is_ascii_uppercase() => {
                    last_position = self.position();
                    name.push(self.bump());
                }
                _ => {
                    return Err(LexerError::new(
                        "Currency type name must be exactly three uppercase letters",
                        self.position(),
                    ));
                }
            }
        }
        if matches!(self.peek(), Some(c) if c.is_ascii_uppercase()) {
            return Err(LexerError::new(
                "Currency type name must be exactly three uppercase letters",
                self.position(),
            ));
        }
        Ok(Token::new(
            TokenKind::CurrencyType,
            name.clone(),
            TokenValue::String(name),
            last_position,
        ))
    }

    fn scan_operator_or_punctuation(&mut self) -> Result<Token, LexerError> {
        let start = self.position();
        let c = self.bump();

        macro_rules! one_or_two {
            ($second:expr, $two:expr, $one:expr) => {{
                if self.peek() == Some($second) {
                    let pos = self.position();
                    self.bump();
                    Ok(Token::new($two, "", TokenValue::Unit, pos))
                } else {
                    Ok(Token::new($one, "", TokenValue::Unit, start))
                }
            }};
        }

        match c {
            '&' if self.peek() == Some('&') => {
                let pos = self.position();
                self.bump();
                Ok(Token::new(TokenKind::And, "&&", TokenValue::Unit, pos))
            }
            '|' if self.peek() == Some('|') => {
                let pos = self.position();
                self.bump();
                Ok(Token::new(TokenKind::Or, "||", TokenValue::Unit, pos))
            }
            ':' if self.peek() == Some('=') => {
                let pos = self.position();
                self.bump();
                Ok(Token::new(TokenKind::ColonEqual, ":=", TokenValue::Unit, pos))
            }
            ':' => Err(LexerError::new("Expected '=' after ':'", self.position())),
            '!' => one_or_two!('=', TokenKind::BangEqual, TokenKind::Bang),
            '=' => one_or_two!('=', TokenKind::EqualEqual, TokenKind::Equal),
            '<' => one_or_two!('=', TokenKind::LessEqual, TokenKind::Less),
            '>' => one_or_two!('=', TokenKind::GreaterEqual, TokenKind::Greater),
            '/' => Ok(Token::new(TokenKind::Slash, "/", TokenValue::Unit, start)),
            '+' => Ok(Token::new(TokenKind::Plus, "+", TokenValue::Unit, start)),
            '-' => Ok(Token::new(TokenKind::Minus, "-", TokenValue::Unit, start)),
            '*' => Ok(Token::new(TokenKind::Star, "*", TokenValue::Unit, start)),
            '%' => Ok(Token::new(TokenKind::Percent, "%", TokenValue::Unit, start)),
            '(' => Ok(Token::new(TokenKind::LeftParen, "(", TokenValue::Unit, start)),
            ')' => Ok(Token::new(TokenKind::RightParen, ")", TokenValue::Unit, start)),
            '{' => Ok(Token::new(TokenKind::LeftBrace, "{", TokenValue::Unit, start)),
            '}' => Ok(Token::new(TokenKind::RightBrace, "}", TokenValue::Unit, start)),
            ';' => Ok(Token::new(TokenKind::Semicolon, ";", TokenValue::Unit, start)),
            ',' => Ok(Token::new(TokenKind::Comma, ",", TokenValue::Unit, start)),
            other => Err(LexerError::new(format!("Unexpected character '{other}'"), start)),
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_lowercase() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StrSource;

    fn lex_all(src: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(StrSource::new(src), Limits::default());
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token().expect("lexing should not fail");
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    #[test]
    fn lexes_two_char_operators() {
        let tokens = lex_all("&& || := == != <= >=");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::And,
                TokenKind::Or,
                TokenKind::ColonEqual,
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_currency_literal() {
        let tokens = lex_all("3.5USD");
        assert_eq!(tokens[0].kind, TokenKind::CurrencyLiteral);
        assert_eq!(tokens[0].value, TokenValue::Currency(3.5, "USD".to_string()));
    }

    #[test]
    fn lexes_integer_currency_literal() {
        let tokens = lex_all("5USD");
        assert_eq!(tokens[0].kind, TokenKind::CurrencyLiteral);
        assert_eq!(tokens[0].value, TokenValue::Currency(5.0, "USD".to_string()));
    }

    #[test]
    fn lexes_currency_type_alone() {
        let tokens = lex_all("EUR");
        assert_eq!(tokens[0].kind, TokenKind::CurrencyType);
    }

    #[test]
    fn rejects_currency_type_with_wrong_letter_count() {
        let mut lexer = Lexer::new(StrSource::new("EURO"), Limits::default());
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn skips_block_comments() {
        let tokens = lex_all("/* hello\nworld */ 1");
        assert_eq!(tokens[0].kind, TokenKind::IntLiteral);
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let mut lexer = Lexer::new(StrSource::new("/* never closes"), Limits::default());
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn token_position_is_last_character() {
        let tokens = lex_all("abc");
        assert_eq!(tokens[0].position, SourcePosition::new(1, 3));
    }

    #[test]
    fn keywords_and_bool_literals() {
        let tokens = lex_all("if else while return true false currency int float string bool void");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::Return,
                TokenKind::BoolLiteral,
                TokenKind::BoolLiteral,
                TokenKind::Currency,
                TokenKind::Int,
                TokenKind::Float,
                TokenKind::String,
                TokenKind::Bool,
                TokenKind::Void,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn rejects_integer_literal_over_the_digit_limit() {
        let limits = Limits {
            max_integer_literal_digits: 3,
            ..Limits::default()
        };
        let mut lexer = Lexer::new(StrSource::new("1234"), limits);
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn accepts_integer_literal_at_the_digit_limit() {
        let limits = Limits {
            max_integer_literal_digits: 3,
            ..Limits::default()
        };
        let mut lexer = Lexer::new(StrSource::new("123"), limits);
        let token = lexer.next_token().unwrap();
        assert_eq!(token.value, TokenValue::Int(123));
    }

    #[test]
    fn rejects_string_literal_over_the_length_limit() {
        let limits = Limits {
            max_string_literal_length: 3,
            ..Limits::default()
        };
        let mut lexer = Lexer::new(StrSource::new("\"abcd\""), limits);
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut lexer = Lexer::new(StrSource::new("\"abc"), Limits::default());
        assert!(lexer.next_token().is_err());
    }
}
