use std::collections::HashMap;

use crate::parser::ast::{FunctionDeclaration, TypeTag};
use crate::source::SourcePosition;

use super::error::{EvalError, SemanticError, SemanticErrorKind, SemanticTypeError};
use super::value::{type_tag_name, Value};

/// A per-call activation record: the callee's local variables, its
/// declared return type, and its name (kept for diagnostics, e.g. the
/// infinite-loop error names the function the loop lives in).
///
/// Grounded directly on `original_source/interpreter/environment/
/// frame.py`'s constructor: arity check first, then a positional,
/// type-checked parameter bind.
pub struct Frame {
    /// `None` marks a local that's been declared but never given a
    /// value yet; see `Evaluator::get_variable`.
    pub locals: HashMap<String, Option<Value>>,
    pub return_type: TypeTag,
    pub function_name: String,
}

impl Frame {
    pub fn new(
        declaration: &FunctionDeclaration,
        call_position: SourcePosition,
        args: Vec<Value>,
    ) -> Result<Self, EvalError> {
        if declaration.params.len() != args.len() {
            return Err(SemanticError::new(
                SemanticErrorKind::WrongNumberOfParams,
                call_position,
                declaration.id.clone(),
            )
            .into());
        }

        let mut locals = HashMap::with_capacity(declaration.params.len());
        for (param, value) in declaration.params.iter().zip(args.into_iter()) {
            if !value.matches_type(&param.type_tag) {
                return Err(SemanticTypeError::new(
                    call_position,
                    type_tag_name(&param.type_tag),
                    value.type_name(),
                )
                .into());
            }
            locals.insert(param.id.clone(), Some(value));
        }

        Ok(Self {
            locals,
            return_type: declaration.return_type.clone(),
            function_name: declaration.id.clone(),
        })
    }

    /// Checks a return value (or its absence) against the frame's
    /// declared return type. `void` functions must return nothing;
    /// every other type must return a matching value.
    pub fn check_return_value(
        &self,
        value: Option<&Value>,
        position: SourcePosition,
    ) -> Result<(), EvalError> {
        match (&self.return_type, value) {
            (TypeTag::Void, None) => Ok(()),
            (TypeTag::Void, Some(v)) => Err(SemanticTypeError::new(
                position,
                "void",
                v.type_name(),
            )
            .into()),
            (expected, None) => Err(SemanticTypeError::new(
                position,
                type_tag_name(expected),
                "void",
            )
            .into()),
            (expected, Some(v)) => {
                if v.matches_type(expected) {
                    Ok(())
                } else {
                    Err(SemanticTypeError::new(
                        position,
                        type_tag_name(expected),
                        v.type_name(),
                    )
                    .into())
                }
            }
        }
    }
}
