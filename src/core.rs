//! Primitive functions and the bootstrap that builds the root environment

use std::{fs::read_to_string, io::ErrorKind, iter::once};

use tracing::debug;

use crate::{
    env::Env,
    eval::eval,
    printer::stringify_args,
    reader::read_str,
    types::{
        apply_fn,
        error::{application_error, MalError},
        MalResult, MalType,
    },
};

/// Lisp definitions evaluated into the root environment after the primitives
const PRELUDE: &[&str] = &[
    "(def! not (fn* (a) (if a false true)))",
    r#"(def! load-file (fn* (f) (eval (read-string (str "(do " (slurp f) "\nnil)")))))"#,
    "(defmacro! cond (fn* (& xs) (if (> (count xs) 0) (list 'if (first xs) (if (> (count xs) 1) (nth xs 1) (throw \"odd number of forms to cond\")) (cons 'cond (rest (rest xs)))))))",
];

pub const HOST_LANGUAGE: &str = "rust-trampoline";

fn not_enough_args<T>() -> Result<T, MalError> {
    application_error("Not enough arguments")
}

fn expect_number(value: &MalType) -> Result<f64, MalError> {
    match value {
        MalType::Number(n) => Ok(*n),
        other => application_error(format!("Expected a number; got {}", other.get_type())),
    }
}

fn numbers(args: &[MalType]) -> Result<Vec<f64>, MalError> {
    args.iter().map(expect_number).collect()
}

/// Sum of all arguments, 0 when there are none
pub fn add(args: Vec<MalType>) -> MalResult {
    Ok(MalType::Number(
        numbers(&args)?.into_iter().fold(0.0, |acc, n| acc + n),
    ))
}

/// Product of all arguments, 1 when there are none
pub fn multiply(args: Vec<MalType>) -> MalResult {
    Ok(MalType::Number(
        numbers(&args)?.into_iter().fold(1.0, |acc, n| acc * n),
    ))
}

/// First argument minus each of the rest
pub fn subtract(args: Vec<MalType>) -> MalResult {
    match numbers(&args)?.split_first() {
        Some((first, rest)) => Ok(MalType::Number(rest.iter().fold(*first, |acc, n| acc - n))),
        None => not_enough_args(),
    }
}

/// First argument divided by each of the rest
pub fn divide(args: Vec<MalType>) -> MalResult {
    match numbers(&args)?.split_first() {
        Some((first, rest)) => Ok(MalType::Number(rest.iter().fold(*first, |acc, n| acc / n))),
        None => not_enough_args(),
    }
}

fn compare(args: Vec<MalType>, op: fn(&f64, &f64) -> bool) -> MalResult {
    match args.as_slice() {
        [x, y, ..] => Ok(MalType::Bool(op(&expect_number(x)?, &expect_number(y)?))),
        [] | [_] => not_enough_args(),
    }
}

pub fn less_than(args: Vec<MalType>) -> MalResult {
    compare(args, |x, y| x < y)
}

pub fn less_equal(args: Vec<MalType>) -> MalResult {
    compare(args, |x, y| x <= y)
}

pub fn greater_than(args: Vec<MalType>) -> MalResult {
    compare(args, |x, y| x > y)
}

pub fn greater_equal(args: Vec<MalType>) -> MalResult {
    compare(args, |x, y| x >= y)
}

/// Structural equality of the first argument with every other one
pub fn equal(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [] | [_] => not_enough_args(),
        [first, rest @ ..] => Ok(MalType::Bool(rest.iter().all(|r| r == first))),
    }
}

/// Makes each argument to their readable (escaped) string representation and concatenates them into a single string type.
pub fn pr_dash_str(args: Vec<MalType>) -> MalResult {
    Ok(MalType::String(stringify_args(&args, true, " ")))
}

/// Makes each argument to their string representation and concatenates them into a single string type.
pub fn str(args: Vec<MalType>) -> MalResult {
    Ok(MalType::String(stringify_args(&args, false, "")))
}

/// Makes each argument to their readable (escaped) string representation, concatenates them, and then prints the result to console.
pub fn prn(args: Vec<MalType>) -> MalResult {
    println!("{}", stringify_args(&args, true, " "));
    Ok(MalType::Nil)
}

/// Makes each argument to their string representation, concatenates them, and then prints the result to console.
pub fn println(args: Vec<MalType>) -> MalResult {
    println!("{}", stringify_args(&args, false, " "));
    Ok(MalType::Nil)
}

/// Convert all arguments to a list
pub fn to_list(args: Vec<MalType>) -> MalResult {
    Ok(MalType::list(args))
}

/// Check if first argument is a list
pub fn is_list(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::List(_), ..] => Ok(MalType::Bool(true)),
        [_, ..] => Ok(MalType::Bool(false)),
        [] => not_enough_args(),
    }
}

/// Check if first argument is empty
pub fn is_empty(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::List(v) | MalType::Vector(v), ..] => Ok(MalType::Bool(v.is_empty())),
        [MalType::Map(m), ..] => Ok(MalType::Bool(m.is_empty())),
        [MalType::Nil, ..] => Ok(MalType::Bool(true)),
        [t, ..] => application_error(format!(
            "Not a valid type; expected a list, vector, or map, but got {}",
            t.get_type()
        )),
        [] => not_enough_args(),
    }
}

/// Check the number of elements in first argument
pub fn count(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::List(v) | MalType::Vector(v), ..] => Ok(MalType::Number(v.len() as f64)),
        [MalType::Map(m), ..] => Ok(MalType::Number(m.len() as f64)),
        [MalType::Nil, ..] => Ok(MalType::Number(0.0)),
        [t, ..] => application_error(format!(
            "Not a valid type; expected a list, vector, map, or nil, but got {}",
            t.get_type()
        )),
        [] => not_enough_args(),
    }
}

/// Read a string and tries to parse it to a MalType
pub fn read_string(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::String(string), ..] => read_str(string),
        [m, ..] => application_error(format!("Expected a string; got {}", m.get_type())),
        [] => not_enough_args(),
    }
}

/// Given a string path, return the contents of the file as a string
pub fn slurp(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::String(path), ..] => {
            debug!(path = %path, "reading file");
            read_to_string(path)
                .map(MalType::String)
                .map_err(|err| match err.kind() {
                    ErrorKind::NotFound => MalError::Application(format!(
                        "Could not read file: {path} does not exist"
                    )),
                    ErrorKind::PermissionDenied => MalError::Application(format!(
                        "Could not read file: you don't have permission to open {path}"
                    )),
                    _ => MalError::Application(format!("Could not read file {path}: {err}")),
                })
        }
        [m, ..] => application_error(format!("Path must be a string; got {}", m.get_type())),
        [] => not_enough_args(),
    }
}

/// Read a line from the user; nil once input is exhausted
pub fn readline(args: Vec<MalType>) -> MalResult {
    let mut editor = rustyline::DefaultEditor::new()
        .map_err(|e| MalError::Application(format!("Editor Err: {e}")))?;
    let prompt = match args.as_slice() {
        [MalType::String(prompt), ..] => prompt.as_str(),
        _ => "",
    };
    match editor.readline(prompt) {
        Ok(line) => Ok(MalType::String(line)),
        Err(rustyline::error::ReadlineError::Eof) => Ok(MalType::Nil),
        Err(err) => application_error(err.to_string()),
    }
}

/// Make a given value into an atom
pub fn to_atom(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [a, ..] => Ok(MalType::atom(a.clone())),
        [] => not_enough_args(),
    }
}

/// Check if a given value is an atom
pub fn is_atom(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::Atom(_), ..] => Ok(MalType::Bool(true)),
        [_, ..] => Ok(MalType::Bool(false)),
        [] => not_enough_args(),
    }
}

/// Dereference an atom to its underlying value
pub fn deref(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::Atom(a), ..] => Ok(a.borrow().clone()),
        [m, ..] => application_error(format!("Cannot deref non-atom; got {}", m.get_type())),
        [] => not_enough_args(),
    }
}

/// Reset an atom to a different value
pub fn reset(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::Atom(a), value, ..] => {
            a.replace(value.clone());
            Ok(value.clone())
        }
        [m, _, ..] => application_error(format!("Cannot reset non-atom; got {}", m.get_type())),
        [] | [_] => not_enough_args(),
    }
}

/// Use a function to update the value of an atom
///
/// The function gets the current value followed by any extra arguments.
pub fn swap(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::Atom(a), f, extra_args @ ..] => {
            let current = a.borrow().clone();
            let new_value = apply_fn(f, once(current).chain(extra_args.iter().cloned()).collect())?;
            a.replace(new_value.clone());
            Ok(new_value)
        }
        [m, _, ..] => application_error(format!("Cannot swap non-atom; got {}", m.get_type())),
        [] | [_] => not_enough_args(),
    }
}

/// Takes a first item and a second item list, put them together with first item prepened to the list
pub fn cons(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [item, MalType::List(l) | MalType::Vector(l), ..] => Ok(MalType::list(
            once(item).chain(l.iter()).cloned().collect(),
        )),
        [item, MalType::Nil, ..] => Ok(MalType::list(vec![item.clone()])),
        [_, m, ..] => application_error(format!("Second item must be a list; got {}", m.get_type())),
        [] | [_] => not_enough_args(),
    }
}

/// Takes 0 or more lists and concatenates them together
pub fn concat(args: Vec<MalType>) -> MalResult {
    let mut joined = Vec::new();
    for arg in args {
        match arg {
            MalType::List(l) | MalType::Vector(l) => joined.extend(l.iter().cloned()),
            MalType::Nil => {}
            other => {
                return application_error(format!(
                    "concat expects lists or vectors; got {}",
                    other.get_type()
                ))
            }
        }
    }
    Ok(MalType::list(joined))
}

/// Convert a list into a vector
pub fn vec(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::List(l), ..] => Ok(MalType::Vector(l.clone())),
        [v @ MalType::Vector(_), ..] => Ok(v.clone()),
        [MalType::Nil, ..] => Ok(MalType::vector(vec![])),
        [m, ..] => application_error(format!("Expect a list (or vector); got a {}", m.get_type())),
        [] => not_enough_args(),
    }
}

/// Get the nth item from a list or vector
pub fn nth(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::List(l) | MalType::Vector(l), MalType::Number(n), ..]
            if *n >= 0.0 && n.fract() == 0.0 =>
        {
            l.get(*n as usize)
                .cloned()
                .ok_or_else(|| MalError::Application("index out of range".to_string()))
        }
        [MalType::List(_) | MalType::Vector(_), MalType::Number(n), ..] => application_error(
            format!("Expect index to be a non-negative integer; got {n}"),
        ),
        [MalType::List(_) | MalType::Vector(_), m, ..] => application_error(format!(
            "Expect a number as the second argument; got a {}",
            m.get_type()
        )),
        [m, _, ..] => application_error(format!(
            "Expect a list or vector as the first argument; got a {}",
            m.get_type()
        )),
        [] | [_] => not_enough_args(),
    }
}

/// Get the first item from a list or vector, nil when there is none
pub fn first(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::List(l) | MalType::Vector(l), ..] => {
            Ok(l.first().cloned().unwrap_or(MalType::Nil))
        }
        [MalType::Nil, ..] => Ok(MalType::Nil),
        [m, ..] => application_error(format!(
            "Expect a list, vector, or nil as the first argument; got a {}",
            m.get_type()
        )),
        [] => not_enough_args(),
    }
}

/// Everything but the first item, as a list
pub fn rest(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::List(l) | MalType::Vector(l), ..] => Ok(MalType::list(
            l.split_first()
                .map(|(_, rest)| rest.to_vec())
                .unwrap_or_default(),
        )),
        [MalType::Nil, ..] => Ok(MalType::list(vec![])),
        [m, ..] => application_error(format!(
            "Expect a list, vector, or nil as the first argument; got a {}",
            m.get_type()
        )),
        [] => not_enough_args(),
    }
}

/// Throws the first argument as an exception
pub fn throw(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [exception, ..] => Err(MalError::Thrown(exception.clone())),
        [] => application_error("No argument to throw"),
    }
}

/// Applies the first argument (as function) to the rest of the arguments, the last of which is a list
pub fn apply(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [f, middle @ .., MalType::List(v) | MalType::Vector(v)] => {
            let mut a = middle.to_vec();
            a.extend_from_slice(v);
            apply_fn(f, a)
        }
        [_, .., m] => application_error(format!(
            "Last argument to apply must be a list; got {}",
            m.get_type()
        )),
        [] | [_] => application_error("apply needs a function and a list of arguments"),
    }
}

/// Maps the first argument (as function) over each item of the second
pub fn map(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [f, MalType::List(items) | MalType::Vector(items), ..] => Ok(MalType::list(
            items
                .iter()
                .map(|item| apply_fn(f, vec![item.clone()]))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        [_, m, ..] => application_error(format!("Expected a list to map over; got {}", m.get_type())),
        [] | [_] => not_enough_args(),
    }
}

macro_rules! type_predicate {
    ($(#[$doc:meta])* $name:ident, $pattern:pat) => {
        $(#[$doc])*
        pub fn $name(args: Vec<MalType>) -> MalResult {
            match args.as_slice() {
                [$pattern, ..] => Ok(MalType::Bool(true)),
                [_, ..] => Ok(MalType::Bool(false)),
                [] => not_enough_args(),
            }
        }
    };
}

type_predicate!(
    /// Check if first argument is nil value (exactly nil type, not empty collection)
    is_nil,
    MalType::Nil
);
type_predicate!(
    /// Check if first argument is true value
    is_true,
    MalType::Bool(true)
);
type_predicate!(is_false, MalType::Bool(false));
type_predicate!(is_symbol, MalType::Symbol(_));
type_predicate!(is_keyword, MalType::Keyword(_));
type_predicate!(is_vector, MalType::Vector(_));
type_predicate!(
    /// Checks if the first argument is a sequential type (list or vector)
    is_sequential,
    MalType::List(_) | MalType::Vector(_)
);
type_predicate!(is_map, MalType::Map(_));
type_predicate!(is_string, MalType::String(_));
type_predicate!(is_number, MalType::Number(_));

/// Check if the first argument is a function (macros are not)
pub fn is_function(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::LiftedFunc(_), ..] => Ok(MalType::Bool(true)),
        [MalType::MalFunc(f), ..] => Ok(MalType::Bool(!f.is_macro)),
        [_, ..] => Ok(MalType::Bool(false)),
        [] => not_enough_args(),
    }
}

/// Check if the first argument is a macro
pub fn is_macro(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::MalFunc(f), ..] => Ok(MalType::Bool(f.is_macro)),
        [_, ..] => Ok(MalType::Bool(false)),
        [] => not_enough_args(),
    }
}

/// Converts a string to a symbol with that string name
pub fn to_symbol(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::String(s), ..] => Ok(MalType::symbol(s)),
        [m, ..] => application_error(format!("Cannot make symbol out of type {}", m.get_type())),
        [] => not_enough_args(),
    }
}

/// Converts a string into a keyword with that string name
pub fn to_keyword(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::String(s), ..] => Ok(MalType::keyword(s)),
        [keyword @ MalType::Keyword(_), ..] => Ok(keyword.clone()),
        [m, ..] => application_error(format!("Cannot make keyword out of type {}", m.get_type())),
        [] => not_enough_args(),
    }
}

/// Collects variable number of arguments into a vector
pub fn to_vector(args: Vec<MalType>) -> MalResult {
    Ok(MalType::vector(args))
}

fn pairs(kv: &[MalType]) -> Result<Vec<(MalType, MalType)>, MalError> {
    if kv.len() % 2 != 0 {
        return application_error("Expected an even number of keys and values");
    }
    Ok(kv
        .chunks_exact(2)
        .map(|x| (x[0].clone(), x[1].clone()))
        .collect())
}

/// Create a hash map from key value pairs
pub fn to_hash_map(args: Vec<MalType>) -> MalResult {
    Ok(MalType::Map(pairs(&args)?.into_iter().collect()))
}

/// Create a new hash map from the merging of a starting hash map and a list of key-value pairs
pub fn assoc(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::Map(m), kv @ ..] => {
            let mut updated = m.clone();
            updated.extend(pairs(kv)?);
            Ok(MalType::Map(updated))
        }
        [m, ..] => application_error(format!("Expected a hashmap, got {}", m.get_type())),
        [] => not_enough_args(),
    }
}

/// Create a new hash map without the given keys
pub fn dissoc(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::Map(m), keys @ ..] => Ok(MalType::Map(
            keys.iter().fold(m.clone(), |map, key| map.without(key)),
        )),
        [m, ..] => application_error(format!("Expected a hashmap, got {}", m.get_type())),
        [] => not_enough_args(),
    }
}

/// Given a hash map and and key, get the value at the given key in the hash map or return nil
pub fn get(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::Map(m), key, ..] => Ok(m.get(key).cloned().unwrap_or(MalType::Nil)),
        [MalType::Nil, ..] => Ok(MalType::Nil),
        [m, _, ..] => application_error(format!("Expected a hashmap, got {}", m.get_type())),
        [] | [_] => not_enough_args(),
    }
}

/// Checks if a given hash map contains a given key
pub fn contains(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::Map(m), key, ..] => Ok(MalType::Bool(m.contains_key(key))),
        [m, _, ..] => application_error(format!("Expected a hashmap, got {}", m.get_type())),
        [] | [_] => not_enough_args(),
    }
}

/// Return a list of keys
pub fn keys(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::Map(m), ..] => Ok(MalType::list(m.keys().cloned().collect())),
        [m, ..] => application_error(format!("Expected a hashmap, got {}", m.get_type())),
        [] => not_enough_args(),
    }
}

/// Return a list of values
pub fn vals(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::Map(m), ..] => Ok(MalType::list(m.values().cloned().collect())),
        [m, ..] => application_error(format!("Expected a hashmap, got {}", m.get_type())),
        [] => not_enough_args(),
    }
}

/// Convert a sequence type into a list
pub fn seq(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::List(l) | MalType::Vector(l), ..] => Ok(if l.is_empty() {
            MalType::Nil
        } else {
            MalType::List(l.clone())
        }),
        [MalType::String(s), ..] => Ok(if s.is_empty() {
            MalType::Nil
        } else {
            MalType::list(s.chars().map(|c| MalType::String(c.to_string())).collect())
        }),
        [MalType::Nil, ..] => Ok(MalType::Nil),
        [m, ..] => application_error(format!(
            "Expected a list, vector, string or nil; got {}",
            m.get_type()
        )),
        [] => not_enough_args(),
    }
}

/// Take a collection and some elements and addes them to the collection.
/// For list, inserted from front in reverse order.
/// For vector, inserted to back in order.
pub fn conj(args: Vec<MalType>) -> MalResult {
    match args.as_slice() {
        [MalType::List(l), elem @ ..] => Ok(MalType::list(
            elem.iter().rev().chain(l.iter()).cloned().collect(),
        )),
        [MalType::Vector(v), elem @ ..] => Ok(MalType::vector(
            v.iter().chain(elem.iter()).cloned().collect(),
        )),
        [m, ..] => application_error(format!("Expected a list or vector; got {}", m.get_type())),
        [] => not_enough_args(),
    }
}

/// Milliseconds since the UNIX epoch
pub fn time_ms(_args: Vec<MalType>) -> MalResult {
    use std::time::SystemTime;

    match SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
        Ok(n) => Ok(MalType::Number(n.as_millis() as f64)),
        Err(_) => application_error("SystemTime before UNIX EPOCH!"),
    }
}

macro_rules! core_ns {
    ($($func:ident $(as $name:literal)?),+ $(,)?) => {
        vec![$(core_ns!(@entry $func $(as $name)?)),+]
    };
    (@entry $func:ident as $name:literal) => {
        ($name, MalType::native($name, $func))
    };
    (@entry $func:ident) => {
        (stringify!($func), MalType::native(stringify!($func), $func))
    };
}

/// Every primitive, keyed by the name it is bound to in the root environment
pub fn namespace() -> Vec<(&'static str, MalType)> {
    core_ns![
        add as "+",
        subtract as "-",
        multiply as "*",
        divide as "/",
        less_than as "<",
        less_equal as "<=",
        greater_than as ">",
        greater_equal as ">=",
        equal as "=",
        pr_dash_str as "pr-str",
        str,
        prn,
        println,
        read_string as "read-string",
        slurp,
        readline,
        to_list as "list",
        is_list as "list?",
        to_vector as "vector",
        is_vector as "vector?",
        is_sequential as "sequential?",
        is_empty as "empty?",
        count,
        cons,
        concat,
        vec,
        nth,
        first,
        rest,
        seq,
        conj,
        to_hash_map as "hash-map",
        is_map as "map?",
        assoc,
        dissoc,
        get,
        contains as "contains?",
        keys,
        vals,
        is_nil as "nil?",
        is_true as "true?",
        is_false as "false?",
        is_symbol as "symbol?",
        is_keyword as "keyword?",
        is_string as "string?",
        is_number as "number?",
        is_function as "fn?",
        is_macro as "macro?",
        to_symbol as "symbol",
        to_keyword as "keyword",
        to_atom as "atom",
        is_atom as "atom?",
        deref,
        reset as "reset!",
        swap as "swap!",
        throw,
        apply,
        map,
        time_ms as "time-ms",
    ]
}

/// Build the root environment: primitives, `eval`, host globals, then the prelude
///
/// `argv` becomes `*ARGV*`.
pub fn bootstrap(argv: Vec<String>) -> Result<Env, MalError> {
    let env = Env::new(None);
    let primitives = namespace();
    let total = primitives.len();
    for (name, func) in primitives {
        env.define(name, func);
    }

    // A weak handle keeps the root from owning itself through `eval`
    let root = env.downgrade();
    env.define(
        "eval",
        MalType::native("eval", move |args| match (args.as_slice(), root.upgrade()) {
            ([ast, ..], Some(root)) => eval(ast.clone(), root),
            ([_, ..], None) => application_error("eval: the root environment is gone"),
            ([], _) => not_enough_args(),
        }),
    );
    env.define("*host-language*", MalType::string(HOST_LANGUAGE));
    env.define(
        "*ARGV*",
        MalType::list(argv.into_iter().map(MalType::String).collect()),
    );

    for form in PRELUDE {
        eval(read_str(form)?, env.clone())?;
    }
    debug!(primitives = total, "root environment ready");
    Ok(env)
}
