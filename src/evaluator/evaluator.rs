use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::config::Limits;
use crate::parser::ast::{
    AndExpression, Assignment, ConstantValue, Declaration, Expression, Factor, FunctionDeclaration,
    IfStatement, MulOp, MultiplyExpression, NegationFactor, ParseTree, RelOp,
    RelationshipExpression, ReturnStatement, Statement, Statements, SumExpression, SumOp,
    TypeCastingFactor, TypeTag, VariableDeclaration, WhileStatement,
};
use crate::source::SourcePosition;

use super::error::{
    EvalError, RuntimeError, RuntimeErrorKind, SemanticError, SemanticErrorKind, SemanticTypeError,
};
use super::frame::Frame;
use super::value::{type_tag_name, CurrencyValue, Value};

/// Whether a statement block ran to completion or produced a value to
/// hand back to the caller. Distinct from `Option<Value>` so that a
/// `void` function's explicit `return;` (carries `None` but *did*
/// return) is distinguishable from a block that never hit a `return`
/// at all.
enum Flow {
    Continue,
    Return(Option<Value>, SourcePosition),
}

/// Walks the parse tree once, maintaining global scope, a currency
/// rate table, a function table, and a call-stack of frames.
///
/// Grounded on `original_source/interpreter/environment/environment.py`;
/// `spec.md` §9 replaces its `accept(visitor)` double dispatch with the
/// single recursive `evaluate_expression`/`execute_statement` pair below.
pub struct Evaluator {
    /// `None` for a declared-but-never-initialized global; `spec.md`
    /// §4.4's Factor rule locates the "uninitialized" error at variable
    /// *read* time, not at declaration time, so the slot itself has to
    /// be able to represent "declared, no value yet".
    global_vars: HashMap<String, Option<Value>>,
    currencies: HashMap<String, f64>,
    functions: HashMap<String, Rc<FunctionDeclaration>>,
    frame_stack: Vec<Frame>,
    current_frame: Option<Frame>,
    limits: Limits,
}

impl Evaluator {
    pub fn new(tree: &ParseTree, limits: Limits) -> Result<Self, EvalError> {
        let mut evaluator = Self {
            global_vars: HashMap::new(),
            currencies: HashMap::new(),
            functions: HashMap::new(),
            frame_stack: Vec::new(),
            current_frame: None,
            limits,
        };

        for declaration in &tree.declarations {
            evaluator.declare(declaration)?;
        }

        if !evaluator.functions.contains_key("main") {
            return Err(SemanticError::new(
                SemanticErrorKind::FunIdNotFound,
                SourcePosition::start(),
                "main",
            )
            .into());
        }

        Ok(evaluator)
    }

    /// Evaluates `main()` with no arguments and returns the value it
    /// produces.
    pub fn run(&mut self) -> Result<Option<Value>, EvalError> {
        self.call_function("main", &[], SourcePosition::start())
    }

    fn declare(&mut self, declaration: &Declaration) -> Result<(), EvalError> {
        match declaration {
            Declaration::Currency(decl) => {
                if self.currencies.contains_key(&decl.name) {
                    return Err(SemanticError::new(
                        SemanticErrorKind::DuplicateId,
                        decl.position,
                        decl.name.clone(),
                    )
                    .into());
                }
                self.currencies.insert(decl.name.clone(), decl.rate);
                Ok(())
            }
            Declaration::Function(decl) => {
                if self.functions.contains_key(&decl.id) {
                    return Err(SemanticError::new(
                        SemanticErrorKind::DuplicateId,
                        decl.position,
                        decl.id.clone(),
                    )
                    .into());
                }
                self.functions.insert(decl.id.clone(), Rc::new(decl.clone()));
                Ok(())
            }
            Declaration::Variable(decl) => {
                if self.global_vars.contains_key(&decl.id) {
                    return Err(SemanticError::new(
                        SemanticErrorKind::DuplicateId,
                        decl.position,
                        decl.id.clone(),
                    )
                    .into());
                }
                let slot = match &decl.initializer {
                    Some(expr) => {
                        let value = self.evaluate_expression(expr)?;
                        if !value.matches_type(&decl.type_tag) {
                            return Err(SemanticTypeError::new(
                                decl.position,
                                type_tag_name(&decl.type_tag),
                                value.type_name(),
                            )
                            .into());
                        }
                        Some(value)
                    }
                    None => None,
                };
                self.global_vars.insert(decl.id.clone(), slot);
                Ok(())
            }
        }
    }

    // ---- statements -----------------------------------------------

    fn execute_statements(&mut self, statements: &Statements) -> Result<Flow, EvalError> {
        for statement in &statements.statements {
            match self.execute_statement(statement)? {
                Flow::Continue => {}
                returned @ Flow::Return(..) => return Ok(returned),
            }
        }
        Ok(Flow::Continue)
    }

    fn execute_statement(&mut self, statement: &Statement) -> Result<Flow, EvalError> {
        match statement {
            Statement::VariableDeclaration(decl) => {
                self.execute_local_variable_declaration(decl)?;
                Ok(Flow::Continue)
            }
            Statement::Assignment(assignment) => {
                self.execute_assignment(assignment)?;
                Ok(Flow::Continue)
            }
            Statement::Call(call) => {
                self.call_function(&call.id, &call.args, call.position)?;
                Ok(Flow::Continue)
            }
            Statement::Return(stmt) => self.execute_return_statement(stmt),
            Statement::If(stmt) => self.execute_if_statement(stmt),
            Statement::While(stmt) => self.execute_while_statement(stmt),
        }
    }

    fn execute_local_variable_declaration(
        &mut self,
        decl: &VariableDeclaration,
    ) -> Result<(), EvalError> {
        let frame = self.current_frame_mut();
        if frame.locals.contains_key(&decl.id) {
            return Err(SemanticError::new(
                SemanticErrorKind::DuplicateId,
                decl.position,
                decl.id.clone(),
            )
            .into());
        }
        let slot = match &decl.initializer {
            Some(expr) => {
                let value = self.evaluate_expression(expr)?;
                if !value.matches_type(&decl.type_tag) {
                    return Err(SemanticTypeError::new(
                        decl.position,
                        type_tag_name(&decl.type_tag),
                        value.type_name(),
                    )
                    .into());
                }
                Some(value)
            }
            None => None,
        };
        self.current_frame_mut().locals.insert(decl.id.clone(), slot);
        Ok(())
    }

    /// Looks up the variable (frame-local first, then global), then
    /// writes the new value to the *frame-local* map regardless of
    /// where it was found — see `DESIGN.md`'s open-question decision on
    /// assignment scoping.
    fn execute_assignment(&mut self, assignment: &Assignment) -> Result<(), EvalError> {
        let current = self.get_variable(&assignment.id, assignment.position)?.clone();
        let new_value = self.evaluate_expression(&assignment.expression)?;
        check_same_type(&current, &new_value, assignment.position)?;
        self.current_frame_mut()
            .locals
            .insert(assignment.id.clone(), Some(new_value));
        Ok(())
    }

    fn execute_if_statement(&mut self, stmt: &IfStatement) -> Result<Flow, EvalError> {
        let condition = self.evaluate_expression(&stmt.condition)?;
        let condition = expect_bool(condition, stmt.condition.position)?;
        if condition {
            self.execute_statements(&stmt.body)
        } else {
            Ok(Flow::Continue)
        }
    }

    fn execute_while_statement(&mut self, stmt: &WhileStatement) -> Result<Flow, EvalError> {
        let mut condition = {
            let value = self.evaluate_expression(&stmt.condition)?;
            expect_bool(value, stmt.condition.position)?
        };
        let mut iterations: u32 = 0;
        while condition {
            if iterations >= self.limits.max_while_iterations {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::InfiniteLoop,
                    stmt.position,
                    self.current_frame_ref().function_name.clone(),
                )
                .into());
            }
            iterations += 1;

            match self.execute_statements(&stmt.body)? {
                Flow::Continue => {}
                returned @ Flow::Return(..) => return Ok(returned),
            }

            let value = self.evaluate_expression(&stmt.condition)?;
            condition = expect_bool(value, stmt.condition.position)?;
        }
        Ok(Flow::Continue)
    }

    fn execute_return_statement(&mut self, stmt: &ReturnStatement) -> Result<Flow, EvalError> {
        let value = match &stmt.expression {
            Some(expr) => Some(self.evaluate_expression(expr)?),
            None => None,
        };
        self.current_frame_ref()
            .check_return_value(value.as_ref(), stmt.position)?;
        Ok(Flow::Return(value, stmt.position))
    }

    // ---- expressions ------------------------------------------------

    fn evaluate_expression(&mut self, expression: &Expression) -> Result<Value, EvalError> {
        if expression.and_expressions.len() == 1 {
            return self.evaluate_and_expression(&expression.and_expressions[0]);
        }
        let mut acc: Option<bool> = None;
        for and_expr in &expression.and_expressions {
            let position = and_expr.position;
            let value = self.evaluate_and_expression(and_expr)?;
            let b = expect_bool(value, position)?;
            acc = Some(match acc {
                Some(prev) => prev || b,
                None => b,
            });
        }
        Ok(Value::Bool(acc.unwrap_or(false)))
    }

    fn evaluate_and_expression(&mut self, expression: &AndExpression) -> Result<Value, EvalError> {
        if expression.relationships.len() == 1 {
            return self.evaluate_relationship_expression(&expression.relationships[0]);
        }
        let mut acc: Option<bool> = None;
        for rel in &expression.relationships {
            let position = rel.position;
            let value = self.evaluate_relationship_expression(rel)?;
            let b = expect_bool(value, position)?;
            acc = Some(match acc {
                Some(prev) => prev && b,
                None => b,
            });
        }
        Ok(Value::Bool(acc.unwrap_or(true)))
    }

    fn evaluate_relationship_expression(
        &mut self,
        expression: &RelationshipExpression,
    ) -> Result<Value, EvalError> {
        let left = self.evaluate_sum_expression(&expression.left)?;
        let Some((op, right_expr)) = &expression.right else {
            return Ok(left);
        };
        let right = self.evaluate_sum_expression(right_expr)?;
        check_same_type(&left, &right, right_expr.position)?;
        Ok(Value::Bool(apply_relational_op(*op, &left, &right)))
    }

    fn evaluate_sum_expression(&mut self, expression: &SumExpression) -> Result<Value, EvalError> {
        let mut acc = self.evaluate_multiply_expression(&expression.left)?;
        for (op, right_expr) in &expression.rest {
            let right = self.evaluate_multiply_expression(right_expr)?;
            check_arithmetic_types(&acc, &right, right_expr.position)?;
            acc = apply_sum_op(*op, acc, right, right_expr.position)?;
        }
        Ok(acc)
    }

    fn evaluate_multiply_expression(
        &mut self,
        expression: &MultiplyExpression,
    ) -> Result<Value, EvalError> {
        let mut acc = self.evaluate_type_casting_factor(&expression.left)?;
        for (op, right_expr) in &expression.rest {
            let right = self.evaluate_type_casting_factor(right_expr)?;
            check_arithmetic_types(&acc, &right, right_expr.position)?;
            acc = apply_mul_op(*op, acc, right, right_expr.position)?;
        }
        Ok(acc)
    }

    fn evaluate_type_casting_factor(
        &mut self,
        factor: &TypeCastingFactor,
    ) -> Result<Value, EvalError> {
        let value = self.evaluate_negation_factor(&factor.negation_factor)?;
        match &factor.cast_type {
            None => Ok(value),
            Some(target) => self.cast(target, value, factor.position),
        }
    }

    fn evaluate_negation_factor(&mut self, factor: &NegationFactor) -> Result<Value, EvalError> {
        let value = self.evaluate_factor(&factor.factor)?;
        if factor.negated {
            let b = expect_bool(value, factor.position)?;
            Ok(Value::Bool(!b))
        } else {
            Ok(value)
        }
    }

    fn evaluate_factor(&mut self, factor: &Factor) -> Result<Value, EvalError> {
        match factor {
            Factor::Constant(value, _) => Ok(constant_to_value(value)),
            Factor::Variable(id, position) => self.get_variable(id, *position).cloned(),
            Factor::FunctionCall(call) => {
                let value = self.call_function(&call.id, &call.args, call.position)?;
                match value {
                    Some(value) => Ok(value),
                    None => Err(RuntimeError::new(
                        RuntimeErrorKind::VarNotInitializedWithValue,
                        call.position,
                        call.id.clone(),
                    )
                    .into()),
                }
            }
            Factor::Grouped(expr) => self.evaluate_expression(expr),
        }
    }

    fn call_function(
        &mut self,
        id: &str,
        args: &[Expression],
        position: SourcePosition,
    ) -> Result<Option<Value>, EvalError> {
        let declaration = self
            .functions
            .get(id)
            .ok_or_else(|| {
                EvalError::from(SemanticError::new(
                    SemanticErrorKind::FunIdNotFound,
                    position,
                    id.to_string(),
                ))
            })?
            .clone();

        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.evaluate_expression(arg)?);
        }

        let new_frame = Frame::new(&declaration, position, arg_values)?;

        if let Some(caller) = self.current_frame.take() {
            self.frame_stack.push(caller);
            if self.frame_stack.len() >= self.limits.max_call_stack_depth {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::InfiniteRecursion,
                    position,
                    id.to_string(),
                )
                .into());
            }
        }
        debug!(
            "entering frame for `{id}` at depth {}",
            self.frame_stack.len() + 1
        );

        self.current_frame = Some(new_frame);
        let flow = self.execute_statements(&declaration.body);
        let flow = match flow {
            Ok(flow) => flow,
            Err(err) => {
                // the call halted evaluation entirely; no recovery, no
                // need to restore the caller's frame.
                return Err(err);
            }
        };

        let return_value = match flow {
            Flow::Return(value, _) => value,
            Flow::Continue => {
                self.current_frame_ref()
                    .check_return_value(None, declaration.position)?;
                None
            }
        };

        debug!("leaving frame for `{id}`");
        self.current_frame = self.frame_stack.pop();
        Ok(return_value)
    }

    fn cast(
        &mut self,
        target: &TypeTag,
        value: Value,
        position: SourcePosition,
    ) -> Result<Value, EvalError> {
        match target {
            TypeTag::Int => match value {
                Value::Int(i) => Ok(Value::Int(i)),
                Value::Float(f) => Ok(Value::Int(f as i64)),
                Value::Bool(b) => Ok(Value::Int(b as i64)),
                Value::String(s) => s
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| SemanticTypeError::new(position, "int", "string").into()),
                Value::Currency(c) => Ok(Value::Int(c.amount as i64)),
            },
            TypeTag::Float => match value {
                Value::Int(i) => Ok(Value::Float(i as f64)),
                Value::Float(f) => Ok(Value::Float(f)),
                Value::Bool(b) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
                Value::String(s) => s
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| SemanticTypeError::new(position, "float", "string").into()),
                Value::Currency(c) => Ok(Value::Float(c.amount)),
            },
            TypeTag::String => Ok(Value::String(value.to_string())),
            TypeTag::Bool => match value {
                Value::Bool(b) => Ok(Value::Bool(b)),
                Value::Int(i) => Ok(Value::Bool(i != 0)),
                Value::Float(f) => Ok(Value::Bool(f != 0.0)),
                Value::String(s) => Ok(Value::Bool(!s.is_empty())),
                Value::Currency(c) => Ok(Value::Bool(c.amount != 0.0)),
            },
            TypeTag::Void => Err(SemanticTypeError::new(
                position,
                "void",
                value.type_name(),
            )
            .into()),
            TypeTag::Currency(name) => match value {
                Value::Float(amount) => Ok(Value::Currency(CurrencyValue::new(name.clone(), amount))),
                Value::Currency(source) => {
                    let source_rate = self.get_currency_rate(&source.name, position)?;
                    let target_rate = self.get_currency_rate(name, position)?;
                    Ok(Value::Currency(CurrencyValue::new(
                        name.clone(),
                        source.amount * source_rate / target_rate,
                    )))
                }
                other => Err(SemanticTypeError::new(position, "float", other.type_name()).into()),
            },
        }
    }

    fn get_currency_rate(&self, name: &str, position: SourcePosition) -> Result<f64, EvalError> {
        self.currencies.get(name).copied().ok_or_else(|| {
            EvalError::from(SemanticError::new(
                SemanticErrorKind::CurrIdNotFound,
                position,
                name.to_string(),
            ))
        })
    }

    /// Resolves `id` (frame-local first, then global) and unwraps its
    /// slot. A name that isn't bound anywhere is `VarIdNotFound`; a name
    /// that's bound but was declared without an initializer is
    /// `VarNotInitializedWithValue` — raised here, at read time, per
    /// `spec.md` §4.4's Factor rule rather than at declaration time.
    fn get_variable(&self, id: &str, position: SourcePosition) -> Result<&Value, EvalError> {
        let slot = if let Some(frame) = &self.current_frame {
            match frame.locals.get(id) {
                Some(slot) => Some(slot),
                None => self.global_vars.get(id),
            }
        } else {
            self.global_vars.get(id)
        };

        match slot {
            Some(Some(value)) => Ok(value),
            Some(None) => Err(RuntimeError::new(
                RuntimeErrorKind::VarNotInitializedWithValue,
                position,
                id.to_string(),
            )
            .into()),
            None => Err(SemanticError::new(SemanticErrorKind::VarIdNotFound, position, id.to_string()).into()),
        }
    }

    fn current_frame_ref(&self) -> &Frame {
        self.current_frame
            .as_ref()
            .expect("statement executed outside any call frame")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.current_frame
            .as_mut()
            .expect("statement executed outside any call frame")
    }
}

fn constant_to_value(value: &ConstantValue) -> Value {
    match value {
        ConstantValue::Int(i) => Value::Int(*i),
        ConstantValue::Float(f) => Value::Float(*f),
        ConstantValue::String(s) => Value::String(s.clone()),
        ConstantValue::Bool(b) => Value::Bool(*b),
        ConstantValue::Currency(amount, name) => {
            Value::Currency(CurrencyValue::new(name.clone(), *amount))
        }
    }
}

fn expect_bool(value: Value, position: SourcePosition) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(SemanticTypeError::new(position, "bool", other.type_name()).into()),
    }
}

/// True when `a` and `b` carry the same runtime type — for currencies,
/// the tag names must agree too. Used for relational comparisons and
/// assignment, where the types must line up exactly.
fn check_same_type(a: &Value, b: &Value, position: SourcePosition) -> Result<(), EvalError> {
    let matches = match (a, b) {
        (Value::Int(_), Value::Int(_)) => true,
        (Value::Float(_), Value::Float(_)) => true,
        (Value::String(_), Value::String(_)) => true,
        (Value::Bool(_), Value::Bool(_)) => true,
        (Value::Currency(x), Value::Currency(y)) => x.name == y.name,
        _ => false,
    };
    if matches {
        Ok(())
    } else {
        Err(SemanticTypeError::new(position, a.type_name(), b.type_name()).into())
    }
}

/// Sum/mul type compatibility. Two currencies require matching tags,
/// same as `check_same_type` — but a currency paired with a bare `int`
/// or `float` is also allowed: the scalar scales the currency's
/// amount, tag preserved. This is what lets `capital * power(...)`
/// multiply a `USD` value by a plain `float` growth factor (see the
/// compound-interest scenario); `CurrencyValue`'s `__float__`/`__int__`
/// conversions in `original_source/interpreter/environment/types.py`
/// are the same affordance in the reference implementation.
fn check_arithmetic_types(a: &Value, b: &Value, position: SourcePosition) -> Result<(), EvalError> {
    let compatible = match (a, b) {
        (Value::Currency(_), Value::Int(_) | Value::Float(_)) => true,
        (Value::Int(_) | Value::Float(_), Value::Currency(_)) => true,
        _ => return check_same_type(a, b, position),
    };
    if compatible {
        Ok(())
    } else {
        Err(SemanticTypeError::new(position, a.type_name(), b.type_name()).into())
    }
}

fn scalar_of(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn apply_relational_op(op: RelOp, left: &Value, right: &Value) -> bool {
    use std::cmp::Ordering;
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => a.partial_cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
        (Value::Currency(a), Value::Currency(b)) => a.amount.partial_cmp(&b.amount),
        _ => None,
    };
    match op {
        RelOp::Eq => left == right,
        RelOp::Ne => left != right,
        RelOp::Lt => ordering == Some(Ordering::Less),
        RelOp::Gt => ordering == Some(Ordering::Greater),
        RelOp::Le => matches!(ordering, Some(Ordering::Less) | Some(Ordering::Equal)),
        RelOp::Ge => matches!(ordering, Some(Ordering::Greater) | Some(Ordering::Equal)),
    }
}

fn apply_sum_op(op: SumOp, left: Value, right: Value, position: SourcePosition) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(match op {
            SumOp::Add => a + b,
            SumOp::Sub => a - b,
        })),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(match op {
            SumOp::Add => a + b,
            SumOp::Sub => a - b,
        })),
        (Value::String(a), Value::String(b)) => match op {
            SumOp::Add => Ok(Value::String(a + &b)),
            SumOp::Sub => Err(SemanticTypeError::new(position, "string (+ only)", "string (-)").into()),
        },
        (Value::Bool(_), Value::Bool(_)) => {
            Err(SemanticTypeError::new(position, "int, float, string, or currency", "bool").into())
        }
        (Value::Currency(a), Value::Currency(b)) => Ok(Value::Currency(CurrencyValue::new(
            a.name,
            match op {
                SumOp::Add => a.amount + b.amount,
                SumOp::Sub => a.amount - b.amount,
            },
        ))),
        (Value::Currency(a), scalar @ (Value::Int(_) | Value::Float(_))) => {
            let b = scalar_of(&scalar).expect("scalar_of called on an int or float");
            Ok(Value::Currency(CurrencyValue::new(
                a.name,
                match op {
                    SumOp::Add => a.amount + b,
                    SumOp::Sub => a.amount - b,
                },
            )))
        }
        (scalar @ (Value::Int(_) | Value::Float(_)), Value::Currency(b)) => {
            let a = scalar_of(&scalar).expect("scalar_of called on an int or float");
            Ok(Value::Currency(CurrencyValue::new(
                b.name,
                match op {
                    SumOp::Add => a + b.amount,
                    SumOp::Sub => a - b.amount,
                },
            )))
        }
        _ => unreachable!("operand types already checked equal"),
    }
}

fn apply_mul_op(op: MulOp, left: Value, right: Value, position: SourcePosition) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            if b == 0 && op != MulOp::Mul {
                return Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero, position, "int").into());
            }
            Ok(Value::Int(match op {
                MulOp::Mul => a * b,
                MulOp::Div => a / b,
                MulOp::Mod => a % b,
            }))
        }
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(match op {
            MulOp::Mul => a * b,
            MulOp::Div => a / b,
            MulOp::Mod => a % b,
        })),
        (Value::String(_), Value::String(_)) => {
            Err(SemanticTypeError::new(position, "int, float, or currency", "string").into())
        }
        (Value::Bool(_), Value::Bool(_)) => {
            Err(SemanticTypeError::new(position, "int, float, or currency", "bool").into())
        }
        (Value::Currency(a), Value::Currency(b)) => {
            if b.amount == 0.0 && op != MulOp::Mul {
                return Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero, position, a.name).into());
            }
            Ok(Value::Currency(CurrencyValue::new(
                a.name,
                match op {
                    MulOp::Mul => a.amount * b.amount,
                    MulOp::Div => a.amount / b.amount,
                    MulOp::Mod => a.amount % b.amount,
                },
            )))
        }
        (Value::Currency(a), scalar @ (Value::Int(_) | Value::Float(_))) => {
            let b = scalar_of(&scalar).expect("scalar_of called on an int or float");
            if b == 0.0 && op != MulOp::Mul {
                return Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero, position, a.name).into());
            }
            Ok(Value::Currency(CurrencyValue::new(
                a.name,
                match op {
                    MulOp::Mul => a.amount * b,
                    MulOp::Div => a.amount / b,
                    MulOp::Mod => a.amount % b,
                },
            )))
        }
        (scalar @ (Value::Int(_) | Value::Float(_)), Value::Currency(b)) => {
            let a = scalar_of(&scalar).expect("scalar_of called on an int or float");
            if b.amount == 0.0 && op != MulOp::Mul {
                return Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero, position, b.name).into());
            }
            Ok(Value::Currency(CurrencyValue::new(
                b.name,
                match op {
                    MulOp::Mul => a * b.amount,
                    MulOp::Div => a / b.amount,
                    MulOp::Mod => a % b.amount,
                },
            )))
        }
        _ => unreachable!("operand types already checked equal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::source::StrSource;

    fn run(src: &str) -> Result<Option<Value>, EvalError> {
        let lexer = Lexer::new(StrSource::new(src), Limits::default());
        let mut parser = Parser::new(lexer).expect("lexing succeeds");
        let tree = parser.parse_program().expect("parsing succeeds");
        let mut evaluator = Evaluator::new(&tree, Limits::default())?;
        evaluator.run()
    }

    #[test]
    fn returns_a_constant() {
        assert_eq!(run("int main(){return 3;}").unwrap(), Some(Value::Int(3)));
    }

    #[test]
    fn or_evaluates_both_operands_without_short_circuit() {
        assert_eq!(
            run("bool main(){return true || false;}").unwrap(),
            Some(Value::Bool(true))
        );
        assert!(run("bool main(){return 1 || 1;}").is_err());
    }

    #[test]
    fn multiplicative_binds_tighter_than_additive() {
        assert_eq!(
            run("int main(){ return 2 + 2 * 2; }").unwrap(),
            Some(Value::Int(6))
        );
    }

    #[test]
    fn casts_float_to_currency_and_converts() {
        let result = run("EUR := 2.0; USD := 1.0; EUR main(){ return EUR 1.0USD; }").unwrap();
        assert_eq!(result, Some(Value::Currency(CurrencyValue::new("EUR", 0.5))));
    }

    #[test]
    fn compound_interest_recurses_through_currency_arithmetic() {
        let src = "USD := 3.0; float power(float basis, int exponent) { if (exponent == 0) { return 1.0; } return basis * power(basis, exponent - 1); } USD compound_interest(USD capital, float interest_rate, int number_of_times) { return capital * power(1.0 + interest_rate, number_of_times); } USD main(){ return compound_interest(10USD, 0.1, 5); }";
        let result = run(src).unwrap().unwrap();
        match result {
            Value::Currency(c) => {
                assert_eq!(c.name, "USD");
                assert!((c.amount - 16.1051).abs() < 1e-3);
            }
            other => panic!("expected a currency value, got {other:?}"),
        }
    }

    #[test]
    fn infinite_loop_raises_after_one_hundred_iterations() {
        let err = run("int main(){ while(true) {} }").unwrap_err();
        assert!(matches!(
            err,
            EvalError::Runtime(RuntimeError {
                kind: RuntimeErrorKind::InfiniteLoop,
                ..
            })
        ));
    }

    #[test]
    fn infinite_recursion_raises_at_depth_ten() {
        let err = run("int a(){return a();} int main(){return a();}").unwrap_err();
        assert!(matches!(
            err,
            EvalError::Runtime(RuntimeError {
                kind: RuntimeErrorKind::InfiniteRecursion,
                ..
            })
        ));
    }

    #[test]
    fn assignment_shadows_global_on_the_local_frame() {
        let src = "int counter = 1; void bump(){ counter = counter + 1; return; } int main(){ bump(); return counter; }";
        // `bump`'s assignment writes to its own frame; the global stays 1.
        assert_eq!(run(src).unwrap(), Some(Value::Int(1)));
    }

    #[test]
    fn currency_cast_through_base_unit_is_consistent() {
        let src = "EUR := 2.0; USD := 1.0; GBP := 4.0; EUR main(){ return EUR (USD 1.0GBP); }";
        let result = run(src).unwrap().unwrap();
        match result {
            Value::Currency(c) => {
                assert_eq!(c.name, "EUR");
                assert!((c.amount - 2.0).abs() < 1e-9);
            }
            other => panic!("expected currency, got {other:?}"),
        }
    }

    fn run_with_limits(src: &str, limits: Limits) -> Result<Option<Value>, EvalError> {
        let lexer = Lexer::new(StrSource::new(src), limits);
        let mut parser = Parser::new(lexer).expect("lexing succeeds");
        let tree = parser.parse_program().expect("parsing succeeds");
        let mut evaluator = Evaluator::new(&tree, limits)?;
        evaluator.run()
    }

    #[test]
    fn call_stack_depth_nine_succeeds_ten_fails() {
        let limits = Limits {
            max_call_stack_depth: 10,
            ..Limits::default()
        };
        let depth_nine = "int count(int n){ if (n == 0) { return 0; } return 1 + count(n - 1); } int main(){ return count(8); }";
        assert_eq!(run_with_limits(depth_nine, limits).unwrap(), Some(Value::Int(8)));

        let depth_ten = "int count(int n){ if (n == 0) { return 0; } return 1 + count(n - 1); } int main(){ return count(9); }";
        let err = run_with_limits(depth_ten, limits).unwrap_err();
        assert!(matches!(
            err,
            EvalError::Runtime(RuntimeError {
                kind: RuntimeErrorKind::InfiniteRecursion,
                ..
            })
        ));
    }

    #[test]
    fn while_loop_accepts_ninety_nine_iterations_rejects_the_hundredth() {
        let limits = Limits::default();
        let src_ok = "int main(){ int i = 0; while(i < 99) { i = i + 1; } return i; }";
        assert_eq!(run_with_limits(src_ok, limits).unwrap(), Some(Value::Int(99)));

        let src_fails = "int main(){ int i = 0; while(i < 1000) { i = i + 1; } return i; }";
        let err = run_with_limits(src_fails, limits).unwrap_err();
        assert!(matches!(
            err,
            EvalError::Runtime(RuntimeError {
                kind: RuntimeErrorKind::InfiniteLoop,
                ..
            })
        ));
    }
}
