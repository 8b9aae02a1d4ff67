use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;

/// One scope frame in the chain. Cloning an `Environment` clones the
/// handle, not the bindings: closures created in the same scope share it.
#[derive(Clone)]
pub struct Environment {
    inner: Rc<RefCell<Scope>>,
}

struct Scope {
    values: IndexMap<String, Value>,
    enclosing: Option<Environment>,
}

impl Environment {
    /// The global scope: no enclosing environment.
    pub fn new() -> Self {
        Self::from_scope(None)
    }

    pub fn with_enclosing(enclosing: Environment) -> Self {
        Self::from_scope(Some(enclosing))
    }

    fn from_scope(enclosing: Option<Environment>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Scope {
                values: IndexMap::new(),
                enclosing,
            })),
        }
    }

    /// Binds `name` in this scope, overwriting any existing binding here.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.inner.borrow_mut().values.insert(name.into(), value);
    }

    /// Reads `name`, searching from this scope outward.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        self.lookup(&name.lexeme)
            .ok_or_else(|| RuntimeError::undefined_variable(name))
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        let scope = self.inner.borrow();
        match scope.values.get(name) {
            Some(value) => Some(value.clone()),
            None => scope.enclosing.as_ref().and_then(|enclosing| enclosing.lookup(name)),
        }
    }

    /// Overwrites the nearest existing binding of `name`. Never creates one.
    pub fn assign(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        let mut scope = self.inner.borrow_mut();
        if let Some(slot) = scope.values.get_mut(name.lexeme.as_ref()) {
            *slot = value;
            return Ok(());
        }
        match &scope.enclosing {
            Some(enclosing) => enclosing.assign(name, value),
            None => Err(RuntimeError::undefined_variable(name)),
        }
    }

    pub fn enclosing(&self) -> Option<Environment> {
        self.inner.borrow().enclosing.clone()
    }

    /// Bindings of this scope only, in definition order.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        self.inner
            .borrow()
            .values
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

// Scopes reach themselves through closures, so only names are printed.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = self.inner.borrow();
        f.debug_struct("Environment")
            .field("names", &scope.values.keys().collect::<Vec<_>>())
            .field("has_enclosing", &scope.enclosing.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Span;
    use crate::token::TokenKind;

    fn name(text: &str) -> Token {
        Token::new(TokenKind::Identifier, text, None, 1, Span::new(0, text.len()))
    }

    #[test]
    fn test_basic_define_get() {
        let env = Environment::new();
        env.define("x", Value::Number(42.0));
        assert_eq!(env.get(&name("x")).ok(), Some(Value::Number(42.0)));
    }

    #[test]
    fn test_redefinition_overwrites() {
        let env = Environment::new();
        env.define("x", Value::Number(1.0));
        env.define("x", Value::string("two"));
        assert_eq!(env.get(&name("x")).ok(), Some(Value::string("two")));
        assert_eq!(env.bindings().len(), 1);
    }

    #[test]
    fn test_get_walks_enclosing_chain() {
        let global = Environment::new();
        global.define("x", Value::Number(1.0));
        let inner = Environment::with_enclosing(Environment::with_enclosing(global));
        assert_eq!(inner.get(&name("x")).ok(), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_shadowing_leaves_outer_untouched() {
        let global = Environment::new();
        global.define("x", Value::Number(1.0));
        let inner = Environment::with_enclosing(global.clone());
        inner.define("x", Value::Number(2.0));
        assert_eq!(inner.get(&name("x")).ok(), Some(Value::Number(2.0)));
        assert_eq!(global.get(&name("x")).ok(), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_assign_updates_outer_scope() {
        let global = Environment::new();
        global.define("x", Value::Number(1.0));
        let inner = Environment::with_enclosing(global.clone());
        inner.assign(&name("x"), Value::Number(2.0)).unwrap();
        assert_eq!(global.get(&name("x")).ok(), Some(Value::Number(2.0)));
        assert!(inner.bindings().is_empty());
    }

    #[test]
    fn test_undefined_get_fails() {
        let env = Environment::new();
        let err = env.get(&name("missing")).unwrap_err();
        assert!(matches!(err, RuntimeError::UndefinedVariable { .. }));
    }

    #[test]
    fn test_assign_never_creates_binding() {
        let global = Environment::new();
        let inner = Environment::with_enclosing(global.clone());
        assert!(inner.assign(&name("x"), Value::Nil).is_err());
        assert!(global.get(&name("x")).is_err());
        assert!(inner.get(&name("x")).is_err());
    }

    #[test]
    fn test_enclosing_links_to_parent() {
        let global = Environment::new();
        let inner = Environment::with_enclosing(global.clone());
        assert!(inner.enclosing().is_some_and(|parent| parent.ptr_eq(&global)));
        assert!(global.enclosing().is_none());
    }

    #[test]
    fn test_clones_alias_the_same_scope() {
        let env = Environment::new();
        let alias = env.clone();
        alias.define("shared", Value::Bool(true));
        assert_eq!(env.get(&name("shared")).ok(), Some(Value::Bool(true)));
        assert!(env.ptr_eq(&alias));
    }
}
