//! Values that the interpreter reads, evaluates, and prints

pub mod error;

use std::{
    cell::RefCell,
    fmt::Display,
    hash::{Hash, Hasher},
    rc::Rc,
};

use ordered_float::OrderedFloat;

use crate::{env::Env, eval::eval};

pub use error::{MalError, MalResult};

/// Hash map whose keys are any value, compared structurally
pub type MalMap = im::HashMap<MalType, MalType>;

#[derive(Clone)]
/// Basic Types with in the interpreter
pub enum MalType {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    /// Holds its leading colon, so `:abc` is stored as ":abc"
    Keyword(String),
    Symbol(String),
    List(Rc<Vec<MalType>>),
    Vector(Rc<Vec<MalType>>),
    Map(MalMap),
    LiftedFunc(LiftedFunc),
    MalFunc(Rc<MalFunc>),
    Atom(Rc<RefCell<MalType>>),
    /// Failure payload handed to `catch*` when the host raised the error
    Error(Box<MalType>),
}

impl MalType {
    pub fn list(items: Vec<MalType>) -> Self {
        MalType::List(Rc::new(items))
    }

    pub fn vector(items: Vec<MalType>) -> Self {
        MalType::Vector(Rc::new(items))
    }

    pub fn symbol(name: &str) -> Self {
        MalType::Symbol(name.to_string())
    }

    pub fn string(s: &str) -> Self {
        MalType::String(s.to_string())
    }

    /// Make a keyword, adding the leading colon if it is missing
    pub fn keyword(name: &str) -> Self {
        if name.starts_with(':') {
            MalType::Keyword(name.to_string())
        } else {
            MalType::Keyword(format!(":{name}"))
        }
    }

    pub fn atom(value: MalType) -> Self {
        MalType::Atom(Rc::new(RefCell::new(value)))
    }

    /// Wrap a host closure as a callable value
    pub fn native<F>(name: &str, func: F) -> Self
    where
        F: Fn(Vec<MalType>) -> MalResult + 'static,
    {
        MalType::LiftedFunc(LiftedFunc::new(name, func))
    }

    pub fn get_type(&self) -> String {
        match self {
            MalType::Nil => "Nil".to_string(),
            MalType::Bool(_) => "Bool".to_string(),
            MalType::Number(_) => "Number".to_string(),
            MalType::String(_) => "String".to_string(),
            MalType::Keyword(_) => "Keyword".to_string(),
            MalType::Symbol(_) => "Symbol".to_string(),
            MalType::List(_) => "List".to_string(),
            MalType::Vector(_) => "Vector".to_string(),
            MalType::Map(_) => "Map".to_string(),
            MalType::LiftedFunc(_) => "Built-in Function".to_string(),
            MalType::MalFunc(f) if f.is_macro => "Macro".to_string(),
            MalType::MalFunc(_) => "User Function".to_string(),
            MalType::Atom(_) => "Atom".to_string(),
            MalType::Error(_) => "Error".to_string(),
        }
    }

    /// Only `nil` and `false` are falsy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, MalType::Nil | MalType::Bool(false))
    }

    /// Elements of a list or vector
    pub fn as_seq(&self) -> Option<&[MalType]> {
        match self {
            MalType::List(l) | MalType::Vector(l) => Some(l.as_slice()),
            _ => None,
        }
    }

    /// A list or vector that has at least one element
    pub fn is_pair(&self) -> bool {
        self.as_seq().map_or(false, |s| !s.is_empty())
    }

    pub fn is_symbol_named(&self, name: &str) -> bool {
        matches!(self, MalType::Symbol(s) if s == name)
    }
}

impl PartialEq for MalType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(l0), Self::Bool(r0)) => l0 == r0,
            (Self::Number(l0), Self::Number(r0)) => OrderedFloat(*l0) == OrderedFloat(*r0),
            (Self::String(l0), Self::String(r0))
            | (Self::Keyword(l0), Self::Keyword(r0))
            | (Self::Symbol(l0), Self::Symbol(r0)) => l0 == r0,
            // List and Vector compare by contents regardless of which bracket made them
            (Self::List(l0) | Self::Vector(l0), Self::List(r0) | Self::Vector(r0)) => l0 == r0,
            (Self::Map(l0), Self::Map(r0)) => l0 == r0,
            (Self::LiftedFunc(l0), Self::LiftedFunc(r0)) => l0.name == r0.name,
            (Self::MalFunc(l0), Self::MalFunc(r0)) => Rc::ptr_eq(l0, r0),
            (Self::Atom(l0), Self::Atom(r0)) => Rc::ptr_eq(l0, r0),
            (Self::Error(l0), Self::Error(r0)) => l0 == r0,
            _ => false,
        }
    }
}

impl Eq for MalType {}

impl Hash for MalType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            MalType::Nil => 0u8.hash(state),
            MalType::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            MalType::Number(n) => {
                2u8.hash(state);
                OrderedFloat(*n).hash(state);
            }
            MalType::String(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            MalType::Keyword(k) => {
                4u8.hash(state);
                k.hash(state);
            }
            MalType::Symbol(s) => {
                5u8.hash(state);
                s.hash(state);
            }
            // Shared tag: equal lists and vectors must hash alike
            MalType::List(l) | MalType::Vector(l) => {
                6u8.hash(state);
                l.len().hash(state);
                l.iter().for_each(|item| item.hash(state));
            }
            // Iteration order of a hash map is not stable, so only the size is hashed
            MalType::Map(m) => {
                7u8.hash(state);
                m.len().hash(state);
            }
            MalType::LiftedFunc(f) => {
                8u8.hash(state);
                f.name.hash(state);
            }
            MalType::MalFunc(f) => {
                9u8.hash(state);
                (Rc::as_ptr(f) as usize).hash(state);
            }
            MalType::Atom(a) => {
                10u8.hash(state);
                (Rc::as_ptr(a) as usize).hash(state);
            }
            MalType::Error(e) => {
                11u8.hash(state);
                e.hash(state);
            }
        }
    }
}

impl std::fmt::Debug for MalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nil => write!(f, "Nil"),
            Self::Bool(arg0) => f.debug_tuple("Bool").field(arg0).finish(),
            Self::Number(arg0) => f.debug_tuple("Number").field(arg0).finish(),
            Self::String(arg0) => f.debug_tuple("String").field(arg0).finish(),
            Self::Keyword(arg0) => f.debug_tuple("Keyword").field(arg0).finish(),
            Self::Symbol(arg0) => f.debug_tuple("Symbol").field(arg0).finish(),
            Self::List(arg0) => f.debug_tuple("List").field(arg0).finish(),
            Self::Vector(arg0) => f.debug_tuple("Vector").field(arg0).finish(),
            Self::Map(arg0) => f.debug_tuple("Map").field(arg0).finish(),
            Self::LiftedFunc(arg0) => f.debug_tuple("LiftedFunc").field(&arg0.name).finish(),
            Self::MalFunc(func) => f
                .debug_struct("MalFunc")
                .field("params", &func.params)
                .field("body", &func.body)
                .field("is_macro", &func.is_macro)
                .finish(),
            Self::Atom(a) => f.debug_tuple("Atom").field(&a.borrow()).finish(),
            Self::Error(e) => f.debug_tuple("Error").field(e).finish(),
        }
    }
}

impl Display for MalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::printer::pr_str(self, true))
    }
}

/// Native function provided by the host
#[derive(Clone)]
pub struct LiftedFunc {
    pub name: String,
    func: Rc<dyn Fn(Vec<MalType>) -> MalResult>,
}

impl LiftedFunc {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(Vec<MalType>) -> MalResult + 'static,
    {
        LiftedFunc {
            name: name.to_string(),
            func: Rc::new(func),
        }
    }

    pub fn call(&self, args: Vec<MalType>) -> MalResult {
        (self.func)(args)
    }
}

/// A closure created by `fn*`
///
/// Holds on to the environment it was defined in; calling it binds the arguments in a child of that environment.
pub struct MalFunc {
    pub params: Vec<String>,
    pub body: MalType,
    pub env: Env,
    pub is_macro: bool,
}

impl MalFunc {
    /// Make the frame a call to this closure evaluates its body in
    pub fn bind(&self, args: &[MalType]) -> Result<Env, MalError> {
        Env::with_bindings(Some(self.env.clone()), &self.params, args)
    }

    /// Call the closure from host code
    ///
    /// The evaluator does not use this for calls in tail position; it binds and loops instead.
    pub fn call(&self, args: Vec<MalType>) -> MalResult {
        eval(self.body.clone(), self.bind(&args)?)
    }

    /// Copy of this closure flagged as a macro
    pub fn to_macro(&self) -> MalFunc {
        MalFunc {
            params: self.params.clone(),
            body: self.body.clone(),
            env: self.env.clone(),
            is_macro: true,
        }
    }
}

/// Call anything callable with already evaluated arguments
pub fn apply_fn(func: &MalType, args: Vec<MalType>) -> MalResult {
    match func {
        MalType::LiftedFunc(f) => f.call(args),
        MalType::MalFunc(f) if !f.is_macro => f.call(args),
        MalType::MalFunc(_) => error::application_error("a macro cannot be applied as a function"),
        other => error::application_error(format!(
            "Expected a function; found {}",
            other.get_type()
        )),
    }
}
