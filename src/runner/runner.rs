use std::fs::File;
use std::io::Read;
use std::path::Path;

use encoding_rs::UTF_8;
use encoding_rs_io::DecodeReaderBytesBuilder;
use log::info;

use crate::config::Limits;
use crate::error::InterpreterError;
use crate::evaluator::{Evaluator, Value};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::source::StrSource;

/// The result of running a single source file: whatever value `main`
/// produced (`None` for a `void` `main`).
pub struct RunOutcome {
    pub value: Option<Value>,
}

/// Reads `path`, decodes it as UTF-8, and drives lex → parse → evaluate.
///
/// Grounded on the teacher's `run_file`/`run` pair in `src/runner/
/// runner.rs`; the teacher declared `encoding_rs`/`encoding_rs_io` but
/// never wired them to an actual reader — this is their first real use.
pub fn run_file(path: impl AsRef<Path>) -> Result<RunOutcome, InterpreterError> {
    let path = path.as_ref();
    info!("running {}", path.display());
    let source = read_source(path)?;
    run_source(&source, Limits::default())
}

fn read_source(path: &Path) -> Result<String, InterpreterError> {
    let file = File::open(path).expect("failed to open source file");
    let mut decoder = DecodeReaderBytesBuilder::new()
        .encoding(Some(UTF_8))
        .build(file);
    let mut source = String::new();
    decoder
        .read_to_string(&mut source)
        .expect("failed to decode source file as UTF-8");
    Ok(source)
}

/// Lexes, parses, and evaluates `source` against a given set of
/// bounded-computation limits, returning the value `main` produced.
pub fn run_source(source: &str, limits: Limits) -> Result<RunOutcome, InterpreterError> {
    let lexer = Lexer::new(StrSource::new(source), limits);
    let mut parser = Parser::new(lexer)?;
    let tree = parser.parse_program()?;

    let mut evaluator = Evaluator::new(&tree, limits)?;
    let value = evaluator.run()?;
    Ok(RunOutcome { value })
}

/// Renders a result value the way the CLI prints it to standard output.
pub fn stringify(value: &Option<Value>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_a_trivial_program() {
        let outcome = run_source("int main(){return 3;}", Limits::default()).unwrap();
        assert_eq!(stringify(&outcome.value), "3");
    }

    #[test]
    fn propagates_lexer_errors() {
        let err = run_source("int main(){return 3 # ;}", Limits::default()).unwrap_err();
        assert!(matches!(err, InterpreterError::Lexer(_)));
    }

    #[test]
    fn propagates_parser_errors() {
        let err = run_source("int main(){ return }", Limits::default()).unwrap_err();
        assert!(matches!(err, InterpreterError::Parser(_)));
    }

    #[test]
    fn void_main_stringifies_to_empty_output() {
        let outcome = run_source("void main(){ return; }", Limits::default()).unwrap();
        assert_eq!(stringify(&outcome.value), "");
    }
}
