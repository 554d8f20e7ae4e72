mod source;

pub use source::{SourcePosition, SourceReader, StrSource};
