mod error;
mod evaluator;
mod frame;
mod value;

pub use error::{
    EvalError, RuntimeError, RuntimeErrorKind, SemanticError, SemanticErrorKind, SemanticTypeError,
};
pub use evaluator::Evaluator;
pub use frame::Frame;
pub use value::{type_tag_name, CurrencyValue, Value};
