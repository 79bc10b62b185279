use std::rc::Rc;

use crate::runtime::value::Value;
use crate::session::EvalError;
use crate::session::test_support::scripted_session;

fn eval(source: &str) -> Result<Value, EvalError> {
    let (mut session, _) = scripted_session("");
    session.eval_source(source)
}

fn eval_ok(source: &str) -> Value {
    eval(source).expect("evaluation failed")
}

fn eval_err(source: &str) -> String {
    match eval(source) {
        Err(EvalError::Message(text)) => text,
        other => panic!("expected an error, got {:?}", other),
    }
}

#[test]
fn integer_arithmetic() {
    assert_eq!(eval_ok("1+1"), Value::Int(2));
    assert_eq!(eval_ok("2 * 3 + 4"), Value::Int(10));
    assert_eq!(eval_ok("2 + 3 * 4"), Value::Int(14));
    assert_eq!(eval_ok("7 % 3"), Value::Int(1));
    assert_eq!(eval_ok("-7 % 3"), Value::Int(2));
}

#[test]
fn integer_division_is_true_division() {
    assert_eq!(eval_ok("1 / 2"), Value::Float(0.5));
    assert_eq!(eval_ok("4 / 2"), Value::Float(2.0));
}

#[test]
fn division_by_zero_is_an_error() {
    assert_eq!(eval_err("1 / 0"), "division by zero");
    assert_eq!(eval_err("1 % 0"), "modulo by zero");
}

#[test]
fn mixed_numeric_promotion() {
    assert_eq!(eval_ok("1 + 2.5"), Value::Float(3.5));
    assert_eq!(eval_ok("2.0 * 3"), Value::Float(6.0));
}

#[test]
fn string_and_sequence_concatenation() {
    assert_eq!(eval_ok("'ab' + 'cd'"), Value::str("abcd"));
    assert_eq!(
        eval_ok("[1] + [2, 3]"),
        Value::List(Rc::new(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
    );
}

#[test]
fn comparisons_and_not() {
    assert_eq!(eval_ok("1 < 2"), Value::Bool(true));
    assert_eq!(eval_ok("2 <= 1"), Value::Bool(false));
    assert_eq!(eval_ok("1 == 1.0"), Value::Bool(true));
    assert_eq!(eval_ok("not 1 == 1.0"), Value::Bool(false));
    assert_eq!(eval_ok("'a' < 'b'"), Value::Bool(true));
}

#[test]
fn undefined_name_reports_like_a_runtime() {
    assert_eq!(eval_err("missing"), "name 'missing' is not defined");
}

#[test]
fn assignment_and_lookup_share_the_environment() {
    let (mut session, _) = scripted_session("");
    session.exec_source("x = [1, 2]\ny = x + [3]").unwrap();
    assert_eq!(
        session.eval_source("y").unwrap(),
        Value::List(Rc::new(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
    );
}

#[test]
fn del_removes_a_binding() {
    let (mut session, _) = scripted_session("");
    session.exec_source("x = 1").unwrap();
    session.exec_source("del x").unwrap();
    assert!(matches!(
        session.eval_source("x"),
        Err(EvalError::Message(text)) if text == "name 'x' is not defined"
    ));
    assert!(session.exec_source("del x").is_err());
}

#[test]
fn indexing_lists_maps_and_strings() {
    assert_eq!(eval_ok("[10, 20, 30][1]"), Value::Int(20));
    assert_eq!(eval_ok("[10, 20, 30][-1]"), Value::Int(30));
    assert_eq!(eval_ok("(1, 2)[0]"), Value::Int(1));
    assert_eq!(eval_ok("{'a': 5}['a']"), Value::Int(5));
    assert_eq!(eval_ok("'abc'[2]"), Value::str("c"));
    assert_eq!(eval_err("[1][5]"), "index out of range");
    assert_eq!(eval_err("{'a': 5}['b']"), "key not found: 'b'");
}

#[test]
fn builtin_constructors() {
    assert_eq!(
        eval_ok("complex(1, 2)"),
        Value::Complex { re: 1.0, im: 2.0 }
    );
    assert_eq!(
        eval_ok("_tether_fraction(6, 4)"),
        Value::Fraction { num: 3, den: 2 }
    );
    assert_eq!(eval_ok("_tether_symbol(':key')"), Value::symbol(":key"));
    assert!(eval_err("_tether_fraction(1, 0)").contains("denominator"));
}

#[test]
fn fraction_arithmetic_stays_exact() {
    assert_eq!(
        eval_ok("_tether_fraction(1, 3) + _tether_fraction(1, 6)"),
        Value::Fraction { num: 1, den: 2 }
    );
    // Whole results collapse back to integers.
    assert_eq!(
        eval_ok("_tether_fraction(1, 2) * 2"),
        Value::Int(1)
    );
}

#[test]
fn complex_attributes_resolve_locally() {
    assert_eq!(eval_ok("complex(1, 2).real"), Value::Float(1.0));
    assert_eq!(eval_ok("complex(1, 2).imag"), Value::Float(2.0));
    assert_eq!(
        eval_ok("_tether_fraction(3, 4).numerator"),
        Value::Int(3)
    );
}

#[test]
fn len_and_type_of() {
    assert_eq!(eval_ok("len([1, 2, 3])"), Value::Int(3));
    assert_eq!(eval_ok("len('abcd')"), Value::Int(4));
    assert_eq!(eval_ok("type_of(1)"), Value::str("int"));
    assert!(eval_err("len(1)").contains("has no len()"));
}

#[test]
fn builtins_reject_keyword_arguments() {
    assert_eq!(eval_err("len(x=[1])"), "len() takes no keyword arguments");
}

#[test]
fn calling_a_non_callable_is_an_error() {
    assert_eq!(eval_err("3(1)"), "'int' object is not callable");
}

#[test]
fn object_store_indexes_the_handle_table() {
    let (mut session, _) = scripted_session("");
    session.return_mode = 1;
    let encoded = session.encode(&Value::str("kept")).unwrap();
    assert!(encoded.contains(":handle 0"));
    session.return_mode = 0;
    assert_eq!(
        session.eval_source("_tether_objects[0]").unwrap(),
        Value::str("kept")
    );
    assert!(
        matches!(session.eval_source("_tether_objects[99]"),
        Err(EvalError::Message(text)) if text == "no object with handle 99")
    );
}

#[test]
fn free_releases_and_reports_stale_handles() {
    let (mut session, _) = scripted_session("");
    session.return_mode = 1;
    session.encode(&Value::Int(1)).unwrap();
    session.return_mode = 0;
    assert_eq!(session.eval_source("_tether_free(0)").unwrap(), Value::None);
    let err = match session.eval_source("_tether_free(0)") {
        Err(EvalError::Message(text)) => text,
        other => panic!("expected error, got {:?}", other),
    };
    assert_eq!(err, "no object with handle 0");
}

#[test]
fn array_builtin_builds_and_measures() {
    assert_eq!(
        eval_ok("len(_tether_array([2, 3], [1, 2, 3, 4, 5, 6]))"),
        Value::Int(6)
    );
    assert!(eval_err("_tether_array([2], [1, 2, 3])").contains("shape"));
}

#[test]
fn array_shape_overflow_is_an_error_not_a_panic() {
    // 2^62 * 4 wraps past usize; the wrapped product would match an
    // empty data vector and let encoding index out of bounds later.
    assert!(
        eval_err("_tether_array([4611686018427387904, 4], [])").contains("too large")
    );
}

#[test]
fn fraction_overflow_is_an_error_not_a_panic() {
    let err = eval_err(
        "_tether_fraction(4611686018427387904, 3) + _tether_fraction(1, 5)",
    );
    assert_eq!(err, "fraction overflow");
    // Multiplication overflows the same guarded path.
    let err = eval_err(
        "_tether_fraction(4611686018427387904, 1) * _tether_fraction(5, 1)",
    );
    assert_eq!(err, "fraction overflow");
}

#[test]
fn generator_stops_at_the_sentinel() {
    // `print` returns None every call, which is also the stop value, so
    // the very first `next` reports exhaustion.
    let (mut session, _) = scripted_session("");
    session
        .exec_source("g = _tether_generator(print, None)")
        .unwrap();
    let err = match session.eval_source("next(g)") {
        Err(EvalError::Message(text)) => text,
        other => panic!("expected stop, got {:?}", other),
    };
    assert_eq!(err, "stop iteration");
}

#[test]
fn interrupt_flag_aborts_evaluation_once() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    let (mut session, _) = scripted_session("");
    let flag = Arc::new(AtomicBool::new(false));
    session.set_interrupt_flag(flag.clone());
    flag.store(true, Ordering::SeqCst);
    assert!(matches!(
        session.eval_source("1+1"),
        Err(EvalError::Interrupted)
    ));
    // Consumed: the next evaluation proceeds normally.
    assert_eq!(session.eval_source("1+1").unwrap(), Value::Int(2));
}

#[test]
fn config_is_visible_to_guest_code() {
    let (mut session, _) = scripted_session("");
    assert_eq!(
        session.eval_source("len(_tether_config)").unwrap(),
        Value::Int(0)
    );
}
