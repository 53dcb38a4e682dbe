//! A make-a-lisp interpreter whose evaluator is a trampoline: tail calls loop instead of recursing.
//!
//! ```
//! use mal_trampoline::{core::bootstrap, rep};
//!
//! let env = bootstrap(vec![]).unwrap();
//! assert_eq!(rep("(+ 1 2)", &env).unwrap(), "3");
//! ```

pub mod core;
pub mod env;
pub mod eval;
pub mod printer;
pub mod reader;
pub mod repl;
pub mod types;

pub use env::Env;
pub use types::{MalError, MalResult, MalType};

/// Read in a string and parse it into an AST expression
pub fn read(line: &str) -> MalResult {
    reader::read_str(line)
}

/// Runs the read, evaluate, and print functions in that order, returning the printed result
pub fn rep(line: &str, env: &Env) -> Result<String, MalError> {
    let ast = read(line)?;
    let res = eval::eval(ast, env.clone())?;
    Ok(printer::pr_str(&res, true))
}
