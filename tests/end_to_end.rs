//! Integration tests over the concrete end-to-end scenarios from
//! `spec.md` §8 — each drives the full lex → parse → evaluate pipeline
//! through the crate's public `runner` API rather than any internal
//! module.

use crafting_interpreters::config::Limits;
use crafting_interpreters::error::InterpreterError;
use crafting_interpreters::evaluator::{CurrencyValue, Value};
use crafting_interpreters::runner::{run_source, stringify};

fn eval(src: &str) -> Value {
    run_source(src, Limits::default())
        .expect("program should evaluate")
        .value
        .expect("main should produce a value")
}

fn eval_err(src: &str) -> InterpreterError {
    run_source(src, Limits::default()).expect_err("program should fail")
}

#[test]
fn returns_an_int_constant() {
    assert_eq!(eval("int main(){return 3;}"), Value::Int(3));
}

#[test]
fn or_requires_bool_operands() {
    assert_eq!(
        eval("bool main(){return true || false;}"),
        Value::Bool(true)
    );
    assert!(matches!(
        eval_err("bool main(){return 1 || 1;}"),
        InterpreterError::Eval(_)
    ));
}

#[test]
fn multiplicative_binds_tighter_than_additive() {
    assert_eq!(eval("int main(){ return 2 + 2 * 2; }"), Value::Int(6));
}

#[test]
fn currency_cast_from_float_then_converted() {
    let src = "EUR := 2.0; USD := 1.0; EUR main(){ return EUR 1.0USD; }";
    assert_eq!(eval(src), Value::Currency(CurrencyValue::new("EUR", 0.5)));
}

#[test]
fn compound_interest_recurses_through_currency_arithmetic() {
    let src = "USD := 3.0; \
               float power(float basis, int exponent) { \
                   if (exponent == 0) { return 1.0; } \
                   return basis * power(basis, exponent - 1); \
               } \
               USD compound_interest(USD capital, float interest_rate, int number_of_times) { \
                   return capital * power(1.0 + interest_rate, number_of_times); \
               } \
               USD main(){ return compound_interest(10USD, 0.1, 5); }";
    match eval(src) {
        Value::Currency(c) => {
            assert_eq!(c.name, "USD");
            assert!((c.amount - 16.1051).abs() < 1e-3);
        }
        other => panic!("expected a USD currency value, got {other:?}"),
    }
}

#[test]
fn while_true_trips_the_infinite_loop_guard() {
    let err = eval_err("int main(){ while(true) {} }");
    assert!(err.to_string().contains("Infinite loop"));
}

#[test]
fn self_recursion_trips_the_infinite_recursion_guard() {
    let err = eval_err("int a(){return a();} int main(){return a();}");
    assert!(err.to_string().contains("Infinite recursion"));
}

#[test]
fn integer_literal_over_the_default_digit_limit_is_a_lexer_error() {
    // A 100-digit value already overflows `i64`, so this only exercises
    // the digit-count guard itself (raised while still accumulating
    // digits, before any attempt to parse the value) rather than the
    // accepted case — see the narrower-limit test below for that.
    let digits_101 = "1".repeat(101);
    let over_src = format!("int main(){{ return {digits_101}; }}");
    let err = run_source(&over_src, Limits::default()).unwrap_err();
    assert!(matches!(err, InterpreterError::Lexer(_)));
}

#[test]
fn integer_literal_digit_limit_is_configurable_and_boundary_exact() {
    let limits = Limits {
        max_integer_literal_digits: 5,
        ..Limits::default()
    };
    assert_eq!(
        run_source("int main(){ return 12345; }", limits)
            .unwrap()
            .value,
        Some(Value::Int(12345))
    );
    let err = run_source("int main(){ return 123456; }", limits).unwrap_err();
    assert!(matches!(err, InterpreterError::Lexer(_)));
}

#[test]
fn string_literal_boundary_at_one_thousand_characters() {
    let body_1000 = "a".repeat(1000);
    let body_1001 = "a".repeat(1001);

    let ok_src = format!("string main(){{ return \"{body_1000}\"; }}");
    assert!(run_source(&ok_src, Limits::default()).is_ok());

    let over_src = format!("string main(){{ return \"{body_1001}\"; }}");
    let err = run_source(&over_src, Limits::default()).unwrap_err();
    assert!(matches!(err, InterpreterError::Lexer(_)));
}

#[test]
fn recursion_depth_nine_succeeds_depth_ten_fails() {
    let limits = Limits {
        max_call_stack_depth: 10,
        ..Limits::default()
    };
    let count_fn = "int count(int n){ if (n == 0) { return 0; } return 1 + count(n - 1); } ";

    let depth_nine = format!("{count_fn} int main(){{ return count(8); }}");
    assert_eq!(
        run_source(&depth_nine, limits).unwrap().value,
        Some(Value::Int(8))
    );

    let depth_ten = format!("{count_fn} int main(){{ return count(9); }}");
    let err = run_source(&depth_ten, limits).unwrap_err();
    assert!(err.to_string().contains("Infinite recursion"));
}

#[test]
fn while_loop_ninety_nine_iterations_succeeds_one_hundred_fails() {
    let src_ok = "int main(){ int i = 0; while(i < 99) { i = i + 1; } return i; }";
    assert_eq!(eval(src_ok), Value::Int(99));

    let src_over = "int main(){ int i = 0; while(i < 1000) { i = i + 1; } return i; }";
    let err = eval_err(src_over);
    assert!(err.to_string().contains("Infinite loop"));
}

#[test]
fn stringify_renders_the_main_result() {
    let outcome = run_source("int main(){return 42;}", Limits::default()).unwrap();
    assert_eq!(stringify(&outcome.value), "42");
}

#[test]
fn void_main_stringifies_to_an_empty_string() {
    let outcome = run_source("void main(){ return; }", Limits::default()).unwrap();
    assert_eq!(stringify(&outcome.value), "");
}
