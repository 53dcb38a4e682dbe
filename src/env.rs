//! Lexical environments: a frame of bindings plus a link to the frame it was created in

use std::{
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
};

use crate::types::{
    error::{binding_error, MalError},
    MalResult, MalType,
};

/// Marks the parameter that collects every remaining argument
pub const VARIADIC_MARKER: &str = "&";

/// `&` only has meaning inside a parameter list; it never names a value
pub fn check_bindable(name: &str) -> Result<(), MalError> {
    if name == VARIADIC_MARKER {
        return binding_error(format!("'{VARIADIC_MARKER}' cannot be bound as a name"));
    }
    Ok(())
}

#[derive(Default)]
pub struct EnvStruct {
    outer: Option<Env>,
    data: RefCell<HashMap<String, MalType>>,
}

#[derive(Clone, Default)]
pub struct Env(Rc<EnvStruct>);

/// Non-owning handle to an environment
#[derive(Clone)]
pub struct WeakEnv(Weak<EnvStruct>);

impl WeakEnv {
    pub fn upgrade(&self) -> Option<Env> {
        self.0.upgrade().map(Env)
    }
}

impl Env {
    pub fn new(outer: Option<Env>) -> Self {
        Env(Rc::new(EnvStruct {
            data: RefCell::new(HashMap::default()),
            outer,
        }))
    }

    /// Make a child of `outer` binding `params` to `args` positionally
    ///
    /// A `&` in `params` makes the one name after it receive a list of the remaining arguments.
    /// Arity is checked before anything is bound.
    pub fn with_bindings(
        outer: Option<Env>,
        params: &[String],
        args: &[MalType],
    ) -> Result<Env, MalError> {
        let (fixed, variadic) = match params.iter().position(|p| p == VARIADIC_MARKER) {
            Some(i) => match &params[i + 1..] {
                [name] => {
                    check_bindable(name)?;
                    (&params[..i], Some(name))
                }
                [] => {
                    return binding_error(
                        "No name found for variadic arguments; there must be a name after the '&' symbol",
                    )
                }
                [name, ..] => {
                    return binding_error(format!(
                        "Only one parameter may follow '&'; found more after {name}"
                    ))
                }
            },
            None => (params, None),
        };

        if args.len() < fixed.len() || (variadic.is_none() && args.len() > fixed.len()) {
            return binding_error(format!(
                "Wrong number of arguments: expected {}{}, got {}",
                if variadic.is_some() { "at least " } else { "" },
                fixed.len(),
                args.len()
            ));
        }

        let env = Env::new(outer);
        for (name, value) in fixed.iter().zip(args) {
            env.define(name, value.clone());
        }
        if let Some(name) = variadic {
            env.define(name, MalType::list(args[fixed.len()..].to_vec()));
        }
        Ok(env)
    }

    pub fn outer(&self) -> Option<Env> {
        self.0.outer.clone()
    }

    /// Outermost environment of the chain
    pub fn root(&self) -> Env {
        let mut current = self.clone();
        while let Some(outer) = current.outer() {
            current = outer;
        }
        current
    }

    pub fn downgrade(&self) -> WeakEnv {
        WeakEnv(Rc::downgrade(&self.0))
    }

    /// Find the nearest environment that binds `key`
    pub fn find(&self, key: &str) -> Option<Env> {
        match (self.0.data.borrow().contains_key(key), self.0.outer.clone()) {
            (true, _) => Some(self.clone()),
            (false, Some(outer)) => outer.find(key),
            _ => None,
        }
    }

    pub fn lookup(&self, key: &str) -> Option<MalType> {
        let mut current = Some(self.clone());
        while let Some(env) = current {
            if let Some(value) = env.0.data.borrow().get(key) {
                return Some(value.clone());
            }
            current = env.outer();
        }
        None
    }

    pub fn resolve(&self, key: &str) -> MalResult {
        self.lookup(key)
            .ok_or_else(|| MalError::Name(key.to_string()))
    }

    /// Set a key in this environment (never an outer one) to a value.
    pub fn define(&self, key: &str, val: MalType) -> MalType {
        self.0.data.borrow_mut().insert(key.to_string(), val.clone());
        val
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names = self.0.data.borrow().keys().cloned().collect::<Vec<_>>();
        names.sort();
        f.debug_struct("Env")
            .field("names", &names)
            .field("has_outer", &self.0.outer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn params(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn nums(ns: &[f64]) -> Vec<MalType> {
        ns.iter().copied().map(MalType::Number).collect()
    }

    #[test]
    fn lookup_walks_outward() {
        let outer = Env::new(None);
        outer.define("a", MalType::Number(1.0));
        let inner = Env::new(Some(outer.clone()));
        inner.define("b", MalType::Number(2.0));
        assert_eq!(inner.lookup("a"), Some(MalType::Number(1.0)));
        assert_eq!(outer.lookup("b"), None);
        assert!(inner.find("a").is_some());
    }

    #[test]
    fn define_shadows_without_touching_outer() {
        let outer = Env::new(None);
        outer.define("a", MalType::Number(1.0));
        let inner = Env::new(Some(outer.clone()));
        inner.define("a", MalType::Number(2.0));
        assert_eq!(inner.resolve("a"), Ok(MalType::Number(2.0)));
        assert_eq!(outer.resolve("a"), Ok(MalType::Number(1.0)));
    }

    #[test]
    fn missing_name_is_name_error() {
        let env = Env::new(None);
        assert_eq!(env.resolve("nope"), Err(MalError::Name("nope".to_string())));
    }

    #[test]
    fn variadic_collects_rest() {
        let env = Env::with_bindings(None, &params(&["a", "&", "rest"]), &nums(&[1.0, 2.0, 3.0]))
            .expect("binds");
        assert_eq!(env.lookup("a"), Some(MalType::Number(1.0)));
        assert_eq!(env.lookup("rest"), Some(MalType::list(nums(&[2.0, 3.0]))));
    }

    #[test]
    fn variadic_with_no_extras_is_empty_list() {
        let env = Env::with_bindings(None, &params(&["a", "&", "rest"]), &nums(&[1.0]))
            .expect("binds");
        assert_eq!(env.lookup("rest"), Some(MalType::list(vec![])));
    }

    #[test_case(&["a", "b"], &[1.0] ; "too few arguments")]
    #[test_case(&["a"], &[1.0, 2.0] ; "too many arguments")]
    #[test_case(&["a", "&", "rest"], &[] ; "too few before variadic")]
    #[test_case(&["a", "&"], &[1.0] ; "no name after ampersand")]
    #[test_case(&["&", "xs", "ys"], &[1.0] ; "parameter after variadic name")]
    #[test_case(&["&", "&"], &[1.0, 2.0] ; "ampersand as variadic name")]
    #[test_case(&["a", "&", "&"], &[1.0] ; "ampersand after fixed parameter")]
    fn binding_errors(names: &[&str], args: &[f64]) {
        let result = Env::with_bindings(None, &params(names), &nums(args));
        assert!(matches!(result, Err(MalError::Binding(_))));
    }

    #[test]
    fn only_the_marker_is_unbindable() {
        assert!(check_bindable("xs").is_ok());
        assert!(matches!(check_bindable("&"), Err(MalError::Binding(_))));
    }

    #[test]
    fn root_and_weak_handle() {
        let root = Env::new(None);
        let child = Env::new(Some(Env::new(Some(root.clone()))));
        root.define("x", MalType::Nil);
        assert!(child.root().0.data.borrow().contains_key("x"));
        let weak = root.downgrade();
        assert!(weak.upgrade().is_some());
        drop(child);
        drop(root);
        assert!(weak.upgrade().is_none());
    }
}
