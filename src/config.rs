/// Bounded-computation guards shared by the lexer and the evaluator.
///
/// `spec.md` calls these "implementation-defined limits, not language
/// semantics" and asks for them to be configurable rather than baked in
/// as constants. The CLI always constructs `Limits::default()`, which
/// reproduces the exact bounds from `spec.md` §5; tests construct
/// tighter limits to exercise boundary behavior without needing to
/// actually type out a 100-digit integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum digit count for an integer literal's whole-number part.
    pub max_integer_literal_digits: usize,
    /// Maximum length, in characters, of a string literal's body.
    pub max_string_literal_length: usize,
    /// Maximum number of characters scanned while looking for `*/`.
    pub max_comment_scan_length: usize,
    /// Maximum number of times a single `while` loop body may execute.
    pub max_while_iterations: u32,
    /// Maximum number of simultaneously active call frames.
    pub max_call_stack_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_integer_literal_digits: 100,
            max_string_literal_length: 1000,
            max_comment_scan_length: 1000,
            max_while_iterations: 100,
            max_call_stack_depth: 10,
        }
    }
}
