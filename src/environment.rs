use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::object::Object;
use crate::token::Token;

/// A single link in the environment chain: a mapping from names to values
/// plus a pointer to the enclosing environment. The global environment has no
/// enclosing pointer.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub enclosing: Option<Rc<RefCell<Environment>>>,
    variables: HashMap<String, Object>,
}

impl Environment {
    pub fn new(enclosing: Option<Rc<RefCell<Environment>>>) -> Self {
        Environment {
            enclosing,
            variables: HashMap::new(),
        }
    }

    /// Binds a name to a value in this environment, replacing any previous
    /// binding of the same name.
    pub fn define(&mut self, name: &str, value: Object) {
        self.variables.insert(name.to_string(), value);
    }

    /// Returns the environment `distance` links up the chain. The resolver
    /// guarantees the chain is deep enough for every distance it hands out.
    fn ancestor(&self, distance: usize) -> Rc<RefCell<Environment>> {
        let parent = self.enclosing.clone()
            .unwrap_or_else(|| panic!("enclosing environment to exist at depth {}", 1));
        let mut environment = Rc::clone(&parent);

        for i in 1..distance {
            let parent = environment.borrow().enclosing.clone()
                .unwrap_or_else(|| panic!("enclosing environment to exist at depth {}", i));
            environment = Rc::clone(&parent);
        }

        environment
    }

    /// Assigns to an existing binding, walking the chain outwards until the
    /// name is found.
    pub fn assign(&mut self, name: &Token, value: Object) -> Result<(), RuntimeError> {
        if self.variables.contains_key(&name.lexeme) {
            self.variables.insert(name.lexeme.clone(), value);
            return Ok(());
        }

        if let Some(enclosing) = &mut self.enclosing {
            return enclosing.borrow_mut().assign(name, value);
        }

        Err(RuntimeError {
            token: name.clone(),
            message: format!("Undefined variable '{}'", name.lexeme),
        })
    }

    /// Assigns to the binding exactly `distance` links up the chain without
    /// walking any further.
    pub fn assign_at(&mut self, distance: usize, name: &Token, value: Object) {
        if distance > 0 {
            self.ancestor(distance).borrow_mut().variables.insert(name.lexeme.clone(), value);
        } else {
            self.variables.insert(name.lexeme.clone(), value);
        }
    }

    /// Looks a name up, walking the chain outwards until it is found.
    pub fn get(&self, name: &Token) -> Result<Object, RuntimeError> {
        if let Some(variable) = self.variables.get(&name.lexeme) {
            return Ok(variable.clone());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow().get(name);
        }

        Err(RuntimeError {
            token: name.clone(),
            message: format!("Undefined variable '{}'", name.lexeme),
        })
    }

    /// Looks a name up exactly `distance` links up the chain without walking
    /// any further.
    pub fn get_at(&self, distance: usize, name: &Token) -> Result<Object, RuntimeError> {
        let lookup = |variables: &HashMap<String, Object>| {
            variables.get(&name.lexeme).cloned().ok_or_else(|| RuntimeError {
                token: name.clone(),
                message: format!("Undefined variable '{}'", name.lexeme),
            })
        };

        if distance > 0 {
            lookup(&self.ancestor(distance).borrow().variables)
        } else {
            lookup(&self.variables)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::literal::Literal;

    fn wrap(environment: Environment) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(environment))
    }

    #[test]
    fn define_and_get() {
        let mut environment = Environment::new(None);
        environment.define("a", Object::from(12.0));

        let value = environment.get(&Token::from("a")).unwrap();
        assert_eq!(value, Object::from(12.0));
    }

    #[test]
    fn get_undefined() {
        let environment = Environment::new(None);
        assert!(environment.get(&Token::from("a")).is_err());
    }

    #[test]
    fn define_replaces() {
        let mut environment = Environment::new(None);
        environment.define("a", Object::from(1.0));
        environment.define("a", Object::from(2.0));

        let value = environment.get(&Token::from("a")).unwrap();
        assert_eq!(value, Object::from(2.0));
    }

    #[test]
    fn get_walks_the_chain() {
        let mut global = Environment::new(None);
        global.define("a", Object::from("outer"));

        let local = Environment::new(Some(wrap(global)));
        let value = local.get(&Token::from("a")).unwrap();
        assert_eq!(value, Object::from("outer"));
    }

    #[test]
    fn shadowing() {
        let mut global = Environment::new(None);
        global.define("a", Object::from("outer"));

        let mut local = Environment::new(Some(wrap(global)));
        local.define("a", Object::from("inner"));

        let value = local.get(&Token::from("a")).unwrap();
        assert_eq!(value, Object::from("inner"));
    }

    #[test]
    fn assign_walks_the_chain() {
        let global = wrap(Environment::new(None));
        global.borrow_mut().define("a", Object::from(1.0));

        let mut local = Environment::new(Some(Rc::clone(&global)));
        local.assign(&Token::from("a"), Object::from(2.0)).unwrap();

        let value = global.borrow().get(&Token::from("a")).unwrap();
        assert_eq!(value, Object::from(2.0));
    }

    #[test]
    fn assign_undefined() {
        let mut environment = Environment::new(None);
        let result = environment.assign(&Token::from("a"), Object::from(1.0));
        assert!(result.is_err());
    }

    #[test]
    fn get_at_stops_at_distance() {
        let global = wrap(Environment::new(None));
        global.borrow_mut().define("a", Object::from("global"));

        let middle = wrap(Environment::new(Some(Rc::clone(&global))));
        middle.borrow_mut().define("a", Object::from("middle"));

        let local = Environment::new(Some(Rc::clone(&middle)));

        assert_eq!(local.get_at(1, &Token::from("a")).unwrap(), Object::from("middle"));
        assert_eq!(local.get_at(2, &Token::from("a")).unwrap(), Object::from("global"));
    }

    #[test]
    fn get_at_zero_is_self() {
        let mut environment = Environment::new(None);
        environment.define("a", Object::from(Literal::Nil));

        assert_eq!(
            environment.get_at(0, &Token::from("a")).unwrap(),
            Object::from(Literal::Nil)
        );
    }

    #[test]
    fn assign_at_stops_at_distance() {
        let global = wrap(Environment::new(None));
        global.borrow_mut().define("a", Object::from("global"));

        let middle = wrap(Environment::new(Some(Rc::clone(&global))));
        middle.borrow_mut().define("a", Object::from("middle"));

        let mut local = Environment::new(Some(Rc::clone(&middle)));
        local.assign_at(1, &Token::from("a"), Object::from("changed"));

        assert_eq!(middle.borrow().get_at(0, &Token::from("a")).unwrap(), Object::from("changed"));
        assert_eq!(global.borrow().get_at(0, &Token::from("a")).unwrap(), Object::from("global"));
    }
}
