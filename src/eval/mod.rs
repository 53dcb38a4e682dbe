//! The evaluator: a trampoline over `(ast, env)` pairs
//!
//! Tail positions (`do`'s last form, the body of `let*`, both branches of `if`, a closure body in
//! call position, the output of `quasiquote` and the handler of `catch*`) reassign the pair and go
//! around the loop again instead of recursing, so tail calls never grow the host stack.

mod quasiquote;

use std::{cell::Cell, rc::Rc, str::FromStr};

use tracing::debug;

use crate::{
    env::{check_bindable, Env},
    types::{
        error::{application_error, binding_error, form_error},
        MalError, MalFunc, MalMap, MalResult, MalType,
    },
};

pub use quasiquote::quasiquote;

/// Nesting `eval` allows on a thread that never called [`set_max_eval_depth`]
///
/// Small enough for the 2 MiB stack of a spawned thread in an unoptimized build.
pub const DEFAULT_MAX_EVAL_DEPTH: usize = 128;

thread_local! {
    static EVAL_DEPTH: Cell<usize> = const { Cell::new(0) };
    static MAX_EVAL_DEPTH: Cell<usize> = const { Cell::new(DEFAULT_MAX_EVAL_DEPTH) };
}

/// Set how deeply `eval` may nest on the current thread; returns the previous limit
///
/// Every level costs host stack, so only raise it on a thread whose stack was sized to match.
pub fn set_max_eval_depth(depth: usize) -> usize {
    MAX_EVAL_DEPTH.with(|max| max.replace(depth))
}

/// One level of `eval` nesting, released on drop
struct EvalDepthGuard;

impl EvalDepthGuard {
    fn enter() -> Result<Self, MalError> {
        let depth = EVAL_DEPTH.with(|d| {
            d.set(d.get() + 1);
            d.get()
        });
        let max = MAX_EVAL_DEPTH.with(Cell::get);
        if depth > max {
            EVAL_DEPTH.with(|d| d.set(d.get() - 1));
            return application_error(format!(
                "stack depth exceeded: evaluation nested deeper than {max} levels"
            ));
        }
        Ok(EvalDepthGuard)
    }
}

impl Drop for EvalDepthGuard {
    fn drop(&mut self) {
        EVAL_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
/// Head symbols the evaluator handles itself instead of applying
pub enum SpecialKeyword {
    #[display(fmt = "def!")]
    Def,
    #[display(fmt = "let*")]
    Let,
    #[display(fmt = "do")]
    Do,
    #[display(fmt = "if")]
    If,
    #[display(fmt = "fn*")]
    Fn,
    #[display(fmt = "quote")]
    Quote,
    #[display(fmt = "quasiquote")]
    Quasiquote,
    #[display(fmt = "quasiquoteexpand")]
    QuasiquoteExpand,
    #[display(fmt = "defmacro!")]
    DefMacro,
    #[display(fmt = "macroexpand")]
    MacroExpand,
    #[display(fmt = "try*")]
    Try,
    #[display(fmt = "catch*")]
    Catch,
}

impl FromStr for SpecialKeyword {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "def!" => Ok(SpecialKeyword::Def),
            "let*" => Ok(SpecialKeyword::Let),
            "do" => Ok(SpecialKeyword::Do),
            "if" => Ok(SpecialKeyword::If),
            "fn*" => Ok(SpecialKeyword::Fn),
            "quote" => Ok(SpecialKeyword::Quote),
            "quasiquote" => Ok(SpecialKeyword::Quasiquote),
            "quasiquoteexpand" => Ok(SpecialKeyword::QuasiquoteExpand),
            "defmacro!" => Ok(SpecialKeyword::DefMacro),
            "macroexpand" => Ok(SpecialKeyword::MacroExpand),
            "try*" => Ok(SpecialKeyword::Try),
            "catch*" => Ok(SpecialKeyword::Catch),
            _ => Err(()),
        }
    }
}

fn special_keyword(head: &MalType) -> Option<SpecialKeyword> {
    match head {
        MalType::Symbol(s) => s.parse().ok(),
        _ => None,
    }
}

fn eval_each(items: &[MalType], env: &Env) -> Result<Vec<MalType>, MalError> {
    items.iter().map(|e| eval(e.clone(), env.clone())).collect()
}

/// Evaluate a form that is not a list: symbols resolve, collections evaluate their members
fn eval_ast(ast: &MalType, env: &Env) -> MalResult {
    match ast {
        MalType::Symbol(sym) => env.resolve(sym),
        MalType::List(list) => Ok(MalType::list(eval_each(list, env)?)),
        MalType::Vector(vec) => Ok(MalType::vector(eval_each(vec, env)?)),
        MalType::Map(map) => map
            .iter()
            .map(|(k, v)| Ok((eval(k.clone(), env.clone())?, eval(v.clone(), env.clone())?)))
            .collect::<Result<MalMap, _>>()
            .map(MalType::Map),
        _ => Ok(ast.clone()),
    }
}

/// Check if ast is a macro call; if it is, it returns the macro and the forms it applies to.
fn is_macro_call(ast: &MalType, env: &Env) -> Option<(Rc<MalFunc>, Vec<MalType>)> {
    let MalType::List(list) = ast else {
        return None;
    };
    let (MalType::Symbol(sym), rest) = list.split_first()? else {
        return None;
    };
    match env.lookup(sym)? {
        MalType::MalFunc(func) if func.is_macro => Some((func, rest.to_vec())),
        _ => None,
    }
}

/// Expand `ast` for as long as its head names a macro
///
/// A macro returning something other than a macro call stops the expansion; the result is
/// evaluated like any other form.
pub fn macroexpand(ast: MalType, env: &Env) -> MalResult {
    let mut current_ast = ast;
    while let Some((mac, macro_args)) = is_macro_call(&current_ast, env) {
        debug!(form = %current_ast, "expanding macro");
        current_ast = mac.call(macro_args)?;
    }
    Ok(current_ast)
}

/// Turn the bindings of a `let*` into `(name, form)` pairs
fn let_bindings(bindings: &[MalType]) -> Result<Vec<(&str, &MalType)>, MalError> {
    if bindings.len() % 2 != 0 {
        return form_error("let* needs an even number of forms in its bindings");
    }
    bindings
        .chunks_exact(2)
        .map(|pair| match pair {
            [MalType::Symbol(name), form] => {
                check_bindable(name)?;
                Ok((name.as_str(), form))
            }
            [other, _] => form_error(format!(
                "let* can only bind symbols; got {}",
                other.get_type()
            )),
            _ => form_error("let* binding is not a pair"),
        })
        .collect()
}

/// Names of a `fn*` parameter list
fn fn_params(params: &[MalType]) -> Result<Vec<String>, MalError> {
    params
        .iter()
        .map(|p| match p {
            MalType::Symbol(name) => Ok(name.clone()),
            other => binding_error(format!(
                "Parameters must all be symbols; got {}",
                other.get_type()
            )),
        })
        .collect()
}

/// Evaluate the given expression and return the result
///
/// Only non-tail nesting counts against the depth limit; going past it is an application error
/// that `try*` can catch. `(try* A (catch* S B))` checks the shape of its catch clause before
/// evaluating `A`, so a malformed clause is a form error even when `A` would have succeeded.
pub fn eval(ast: MalType, env: Env) -> MalResult {
    let _depth = EvalDepthGuard::enter()?;
    let mut current_ast = ast;
    let mut current_env = env;
    let return_value: MalResult = 'tco: loop {
        current_ast = macroexpand(current_ast, &current_env)?;

        let MalType::List(list) = &current_ast else {
            break 'tco eval_ast(&current_ast, &current_env);
        };
        let list = Rc::clone(list);
        let Some((head, rest)) = list.split_first() else {
            break 'tco Ok(current_ast);
        };

        match (special_keyword(head), rest) {
            (Some(SpecialKeyword::Def), [MalType::Symbol(name), value]) => {
                check_bindable(name)?;
                let evaluated = eval(value.clone(), current_env.clone())?;
                break 'tco Ok(current_env.define(name, evaluated));
            }
            (Some(SpecialKeyword::Def), _) => {
                break 'tco form_error("def! takes a symbol and a value")
            }
            (Some(SpecialKeyword::Let), [bindings, body]) => {
                let Some(bindings) = bindings.as_seq() else {
                    break 'tco form_error("let* bindings must be a list or vector");
                };
                let pairs = let_bindings(bindings)?;
                let let_env = Env::new(Some(current_env.clone()));
                for (name, form) in pairs {
                    let evaluated = eval(form.clone(), let_env.clone())?;
                    let_env.define(name, evaluated);
                }
                current_env = let_env;
                current_ast = body.clone();
                continue 'tco;
            }
            (Some(SpecialKeyword::Let), _) => {
                break 'tco form_error("let* takes a binding list and a body")
            }
            (Some(SpecialKeyword::Do), []) => break 'tco Ok(MalType::Nil),
            (Some(SpecialKeyword::Do), [between @ .., last]) => {
                eval_each(between, &current_env)?;
                current_ast = last.clone();
                continue 'tco;
            }
            (Some(SpecialKeyword::If), [condition, true_case, false_case @ ..])
                if false_case.len() <= 1 =>
            {
                if eval(condition.clone(), current_env.clone())?.is_truthy() {
                    current_ast = true_case.clone();
                } else {
                    current_ast = false_case.first().cloned().unwrap_or(MalType::Nil);
                }
                continue 'tco;
            }
            (Some(SpecialKeyword::If), _) => {
                break 'tco form_error("if takes a condition, a branch and an optional else branch")
            }
            (Some(SpecialKeyword::Fn), [params, body]) => {
                let Some(params) = params.as_seq() else {
                    break 'tco form_error("Function parameters must be a list or vector");
                };
                break 'tco Ok(MalType::MalFunc(Rc::new(MalFunc {
                    params: fn_params(params)?,
                    body: body.clone(),
                    env: current_env.clone(),
                    is_macro: false,
                })));
            }
            (Some(SpecialKeyword::Fn), _) => {
                break 'tco form_error("fn* takes a parameter list and a body")
            }
            (Some(SpecialKeyword::Quote), [quoted]) => break 'tco Ok(quoted.clone()),
            (Some(SpecialKeyword::Quote), _) => break 'tco form_error("quote takes one form"),
            (Some(SpecialKeyword::Quasiquote), [template]) => {
                current_ast = quasiquote(template);
                continue 'tco;
            }
            (Some(SpecialKeyword::QuasiquoteExpand), [template]) => {
                break 'tco Ok(quasiquote(template))
            }
            (Some(SpecialKeyword::Quasiquote | SpecialKeyword::QuasiquoteExpand), _) => {
                break 'tco form_error("quasiquote takes one form")
            }
            (Some(SpecialKeyword::DefMacro), [MalType::Symbol(name), form]) => {
                check_bindable(name)?;
                let MalType::MalFunc(func) = eval(form.clone(), current_env.clone())? else {
                    break 'tco form_error(format!("defmacro! {name} needs a function"));
                };
                let mac = MalType::MalFunc(Rc::new(func.to_macro()));
                break 'tco Ok(current_env.define(name, mac));
            }
            (Some(SpecialKeyword::DefMacro), _) => {
                break 'tco form_error("defmacro! takes a symbol and a function")
            }
            (Some(SpecialKeyword::MacroExpand), [form]) => {
                break 'tco macroexpand(form.clone(), &current_env)
            }
            (Some(SpecialKeyword::MacroExpand), _) => {
                break 'tco form_error("macroexpand takes one form")
            }
            (Some(SpecialKeyword::Try), [protected]) => {
                current_ast = protected.clone();
                continue 'tco;
            }
            (Some(SpecialKeyword::Try), [protected, clause]) => {
                // The clause is checked up front, whether or not `protected` fails
                let Some([catch, MalType::Symbol(name), handler]) = clause.as_seq() else {
                    break 'tco form_error("try* expects (catch* SYMBOL FORM) as its handler");
                };
                if special_keyword(catch) != Some(SpecialKeyword::Catch) {
                    break 'tco form_error("try* expects (catch* SYMBOL FORM) as its handler");
                }
                match eval(protected.clone(), current_env.clone()) {
                    Ok(value) => break 'tco Ok(value),
                    Err(err) => {
                        debug!(error = %err, "caught by try*");
                        let catch_env = Env::new(Some(current_env.clone()));
                        catch_env.define(name, err.into_payload());
                        current_env = catch_env;
                        current_ast = handler.clone();
                        continue 'tco;
                    }
                }
            }
            (Some(SpecialKeyword::Try), _) => {
                break 'tco form_error("try* takes a form and an optional catch* clause")
            }
            (Some(SpecialKeyword::Catch), _) => {
                break 'tco form_error("catch* can only appear inside try*")
            }
            (None, args) => {
                let func = eval(head.clone(), current_env.clone())?;
                let args = eval_each(args, &current_env)?;
                match func {
                    MalType::LiftedFunc(native) => break 'tco native.call(args),
                    MalType::MalFunc(closure) if !closure.is_macro => {
                        current_env = closure.bind(&args)?;
                        current_ast = closure.body.clone();
                        continue 'tco;
                    }
                    MalType::MalFunc(_) => {
                        break 'tco application_error("a macro cannot be applied as a function")
                    }
                    other => {
                        break 'tco application_error(format!(
                            "Expected first item to be a function; found {}",
                            other.get_type(),
                        ))
                    }
                }
            }
        }
    };
    return_value
}
