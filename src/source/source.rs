use std::fmt;

/// A 1-indexed line, 0-indexed-until-the-first-char column.
///
/// Columns start at zero and are bumped to 1 on the first character of a
/// line; this mirrors the reference implementation's `SourcePosition`,
/// which starts a fresh line at column 1 rather than 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn start() -> Self {
        Self { line: 1, column: 0 }
    }

    fn advance(self) -> Self {
        Self {
            line: self.line,
            column: self.column + 1,
        }
    }

    fn next_line(self) -> Self {
        Self {
            line: self.line + 1,
            column: 1,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Character-stream contract the lexer needs: peek the current character,
/// advance past it, and report the position of the character currently
/// under the cursor (i.e. the one `peek` would return). Kept as a trait
/// so the lexer never depends on how the characters were produced (file,
/// string, REPL line, ...).
pub trait SourceReader {
    /// The current character, or `None` at end of input.
    fn peek(&self) -> Option<char>;
    /// The character after the current one, or `None` if there isn't one.
    /// Needed for the lexer's handful of two-character lookaheads
    /// (`&&`, `||`, `:=`, `/*`, `==`, ...).
    fn peek_next(&self) -> Option<char>;
    /// Consume the current character and move the cursor to the next one.
    fn advance(&mut self);
    /// Position of the character `peek` currently returns.
    fn position(&self) -> SourcePosition;
}

/// An in-memory `SourceReader` over a `String`. This is the only
/// implementation the core needs; a CLI or REPL front end is free to
/// provide another one (e.g. streaming from a file) as long as it
/// satisfies the same peek/advance/position contract.
pub struct StrSource {
    chars: Vec<char>,
    index: usize,
    current_char: Option<char>,
    current_position: SourcePosition,
    next_position: SourcePosition,
}

impl StrSource {
    pub fn new(source: impl Into<String>) -> Self {
        let chars: Vec<char> = source.into().chars().collect();
        let current_char = chars.first().copied();
        let current_position = if current_char.is_some() {
            SourcePosition::new(1, 1)
        } else {
            SourcePosition::new(2, 0)
        };
        Self {
            chars,
            index: if current_char.is_some() { 1 } else { 0 },
            current_char,
            current_position,
            next_position: current_position.advance(),
        }
    }
}

impl SourceReader for StrSource {
    fn peek(&self) -> Option<char> {
        self.current_char
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn advance(&mut self) {
        match self.chars.get(self.index) {
            None => {
                // one past the last line, as spec.md §4.1 requires
                self.current_char = None;
                self.current_position = SourcePosition::new(self.next_position.line + 1, 0);
            }
            Some('\n') => {
                self.current_char = Some('\n');
                self.current_position = self.next_position;
                self.next_position = self.current_position.next_line();
                self.index += 1;
            }
            Some(&c) => {
                self.current_char = Some(c);
                self.current_position = self.next_position;
                self.next_position = self.current_position.advance();
                self.index += 1;
            }
        }
    }

    fn position(&self) -> SourcePosition {
        self.current_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_line_and_column() {
        let mut src = StrSource::new("ab\ncd");
        assert_eq!(src.peek(), Some('a'));
        assert_eq!(src.position(), SourcePosition::new(1, 1));
        src.advance();
        assert_eq!(src.peek(), Some('b'));
        assert_eq!(src.position(), SourcePosition::new(1, 2));
        src.advance(); // now at '\n'
        assert_eq!(src.peek(), Some('\n'));
        src.advance(); // now at 'c', line 2
        assert_eq!(src.peek(), Some('c'));
        assert_eq!(src.position(), SourcePosition::new(2, 1));
        src.advance();
        assert_eq!(src.peek(), Some('d'));
    }

    #[test]
    fn reports_eof() {
        let mut src = StrSource::new("a");
        assert_eq!(src.peek(), Some('a'));
        src.advance();
        assert_eq!(src.peek(), None);
        assert_eq!(src.position().line, 2);
    }

    #[test]
    fn empty_source_is_immediately_eof() {
        let src = StrSource::new("");
        assert_eq!(src.peek(), None);
    }
}
