//! Shared helpers for the integration tests.
//!
//! ```ignore
//! mod common;
//! use common::*;
//! ```

use std::{cell::RefCell, rc::Rc};

#[allow(unused_imports)]
pub use mal_trampoline::{
    core::bootstrap, eval::eval, printer::pr_str, reader::read_str, Env, MalError, MalResult,
    MalType,
};
use mal_trampoline::printer::stringify_args;
use regex::Regex;

/// A fresh root environment
pub fn new_env() -> Env {
    bootstrap(vec![]).expect("root environment builds")
}

/// Evaluate one form in `env`
pub fn eval_str_with_env(input: &str, env: &Env) -> MalResult {
    eval(read_str(input)?, env.clone())
}

/// Evaluate one form in a fresh environment
#[allow(dead_code)]
pub fn eval_str(input: &str) -> MalResult {
    eval_str_with_env(input, &new_env())
}

/// Evaluate one form in a fresh environment and print it readably
#[allow(dead_code)]
pub fn printed(input: &str) -> String {
    match eval_str(input) {
        Ok(value) => pr_str(&value, true),
        Err(err) => panic!("{input} failed: {err}"),
    }
}

#[allow(dead_code)]
/// Rebinds `prn` and `println` so whatever they print lands in the returned buffer
pub fn capture_output(env: &Env) -> Rc<RefCell<Vec<String>>> {
    let output = Rc::new(RefCell::new(Vec::new()));
    for (name, readably, sep) in [("prn", true, " "), ("println", false, " ")] {
        let sink = Rc::clone(&output);
        env.define(
            name,
            MalType::native(name, move |args| {
                sink.borrow_mut().push(stringify_args(&args, readably, sep));
                Ok(MalType::Nil)
            }),
        );
    }
    output
}

/// Run a `.mal` script line by line.
///
/// - `;;` lines and blank lines are skipped
/// - `;=>VALUE` checks the printed result of the last form
/// - `;/REGEX` matches the next captured output line, or the error message once output runs out
/// - every other line is evaluated as a form
#[allow(dead_code)]
pub fn run_test(script: &str) {
    let env = new_env();
    let output = capture_output(&env);
    let mut result: MalResult = Ok(MalType::Nil);
    let mut current_out_index = 0;
    for (number, line) in script.lines().enumerate().map(|(n, l)| (n + 1, l)) {
        if line.trim().is_empty() || line.starts_with(";;") || line.starts_with(";>>>") {
            continue;
        } else if let Some(expected) = line.strip_prefix(";=>") {
            match &result {
                Ok(value) => assert_eq!(
                    pr_str(value, true),
                    expected,
                    "Checking line {number} evaluates correctly"
                ),
                Err(err) => {
                    panic!("Result not ok: got {err:?}; but should be: {expected} (see line {number})")
                }
            }
        } else if let Some(pat) = line.strip_prefix(";/") {
            let re = Regex::new(pat).expect("valid pattern");
            match output.borrow().get(current_out_index) {
                Some(printed) => assert!(
                    re.is_match(printed),
                    "line {number}: {printed:?} does not match {pat}"
                ),
                None => match &result {
                    Err(err) => assert!(
                        re.is_match(&err.to_string()),
                        "line {number}: error {err} does not match {pat}"
                    ),
                    Ok(value) => panic!("line {number}: expected output or an error, got {value}"),
                },
            }
            current_out_index += 1;
        } else {
            output.borrow_mut().clear();
            current_out_index = 0;
            result = eval_str_with_env(line, &env);
        }
    }
}
