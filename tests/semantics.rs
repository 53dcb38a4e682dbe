//! Language level guarantees: tail calls, lexical scope, macros, quasiquote, exceptions and binding.

mod common;

use common::*;
use test_case::test_case;

fn eval_all(forms: &[&str]) -> MalResult {
    let env = new_env();
    let mut last = Ok(MalType::Nil);
    for form in forms {
        last = eval_str_with_env(form, &env);
    }
    last
}

#[test]
fn million_tail_calls_do_not_grow_the_stack() {
    let result = eval_all(&[
        "(def! count-down (fn* (n) (if (= n 0) :done (count-down (- n 1)))))",
        "(count-down 1000000)",
    ]);
    assert_eq!(result, Ok(MalType::keyword("done")));
}

#[test]
fn tail_calls_through_let_do_and_catch() {
    let result = eval_all(&[
        "(def! spin (fn* (n) (let* (m (- n 1)) (do nil (if (= m 0) m (try* (throw m) (catch* e (spin e))))))))",
        "(spin 100000)",
    ]);
    assert_eq!(result, Ok(MalType::Number(0.0)));
}

#[test]
fn closures_resolve_free_symbols_where_they_were_defined() {
    let result = eval_all(&[
        "(def! x 1)",
        "(def! make (fn* () (let* (x 10) (fn* () x))))",
        "(def! get-x (make))",
        "(let* (x 100) (get-x))",
    ]);
    assert_eq!(result, Ok(MalType::Number(10.0)));
}

#[test]
fn closures_see_later_definitions_in_their_environment() {
    let result = eval_all(&[
        "(def! f (fn* () later))",
        "(def! later 5)",
        "(f)",
    ]);
    assert_eq!(result, Ok(MalType::Number(5.0)));
}

#[test]
fn macros_receive_unevaluated_forms() {
    let result = eval_all(&[
        "(defmacro! m (fn* (a) (list 'quote a)))",
        "(m (+ 1 2))",
    ]);
    assert_eq!(result.map(|v| pr_str(&v, true)), Ok("(+ 1 2)".to_string()));
}

#[test]
fn defmacro_leaves_the_function_alone() {
    let result = eval_all(&[
        "(def! f (fn* (a) (list 'quote a)))",
        "(defmacro! m f)",
        "(list (fn? f) (macro? f) (macro? m))",
    ]);
    assert_eq!(
        result.map(|v| pr_str(&v, true)),
        Ok("(true false true)".to_string())
    );
}

#[test_case("`(1 ~(+ 1 1) ~@(list 3 4))", "(1 2 3 4)" ; "unquote and splice")]
#[test_case("`(~@(list) 1)", "(1)" ; "splice of empty list")]
#[test_case("`((1 ~(+ 1 1)))", "((1 2))" ; "nested unquote")]
#[test_case("(let* (x 5) `(x ~x))", "(x 5)" ; "unquoted symbol is resolved")]
fn quasiquote_evaluates_selectively(input: &str, expected: &str) {
    assert_eq!(printed(input), expected);
}

#[test]
fn thrown_values_are_caught_as_is() {
    assert_eq!(
        eval_str(r#"(try* (throw "boom") (catch* e e))"#),
        Ok(MalType::string("boom"))
    );
}

#[test]
fn host_failures_are_caught_with_their_message() {
    let caught = eval_str("(try* (nth (list) 0) (catch* e e))").expect("caught");
    assert_eq!(pr_str(&caught, true), "\"index out of range\"");
    assert!(matches!(caught, MalType::Error(_)));
}

#[test]
fn uncaught_throw_reaches_the_caller() {
    assert_eq!(
        eval_str("(do (throw {:code 1}) 2)"),
        Err(MalError::Thrown(
            eval_str("{:code 1}").expect("map literal")
        ))
    );
}

#[test]
fn variadic_parameters_collect_the_rest() {
    let result = eval_all(&[
        "(def! f (fn* (a & rest) (list a rest)))",
        "(f 1 2 3)",
    ]);
    assert_eq!(result.map(|v| pr_str(&v, true)), Ok("(1 (2 3))".to_string()));
    assert_eq!(printed("((fn* (a & rest) rest) 1)"), "()");
}

#[test_case("((fn* (a b) a) 1)" ; "too few")]
#[test_case("((fn* (a b) a) 1 2 3)" ; "too many")]
#[test_case("((fn* (a & r) a))" ; "variadic still needs its fixed params")]
fn wrong_argument_count_is_a_binding_error(input: &str) {
    assert!(matches!(eval_str(input), Err(MalError::Binding(_))));
}

#[test]
fn failed_binding_defines_nothing() {
    let env = new_env();
    let result = eval_str_with_env("((fn* (a b) a) 1)", &env);
    assert!(matches!(result, Err(MalError::Binding(_))));
    assert!(matches!(eval_str_with_env("a", &env), Err(MalError::Name(_))));
    assert!(env.lookup("b").is_none());
}

#[test]
fn errors_do_not_poison_the_environment() {
    let env = new_env();
    eval_str_with_env("(def! keep 1)", &env).expect("defines");
    assert!(eval_str_with_env("(def! keep (undefined))", &env).is_err());
    assert_eq!(eval_str_with_env("keep", &env), Ok(MalType::Number(1.0)));
}
