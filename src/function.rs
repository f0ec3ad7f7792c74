use std::cell::RefCell;
use std::fmt::{self, Debug, Display};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::environment::Environment;
use crate::error::Interrupt;
use crate::interpreter::Interpreter;
use crate::literal::Literal;
use crate::object::{Callable, Object};
use crate::stmt::FunctionData;
use crate::token::Token;

/// A user-defined function: the declaration it was built from, the
/// environment captured at its declaration point and whether it is a class
/// initializer. Initializers always evaluate to their bound `this`.
#[derive(Clone)]
pub struct Function {
    declaration: Rc<FunctionData>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl Function {
    pub fn new(
        declaration: Rc<FunctionData>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Function { declaration, closure, is_initializer }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// Returns a copy of this function whose closure is extended with a scope
    /// binding `this` to the given instance. Property access and `super`
    /// lookups both bind before handing the method out.
    pub fn bind(&self, instance: Object) -> Function {
        let mut environment = Environment::new(Some(Rc::clone(&self.closure)));
        environment.define("this", instance);

        Function::new(
            Rc::clone(&self.declaration),
            Rc::new(RefCell::new(environment)),
            self.is_initializer,
        )
    }
}

impl Callable for Function {
    fn call(
        &self,
        interpreter: &mut Interpreter<'_>,
        arguments: Vec<Object>,
    ) -> Result<Object, Interrupt> {
        // The parameter scope is the body scope; the resolver pushes exactly
        // one scope per function, so no extra environment is nested here.
        let mut environment = Environment::new(Some(Rc::clone(&self.closure)));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        let result = interpreter
            .execute_block(&self.declaration.body, Rc::new(RefCell::new(environment)));

        match result {
            Ok(()) => {},
            Err(Interrupt::Return(value)) => {
                if !self.is_initializer {
                    return Ok(value);
                }
            },
            Err(error) => return Err(error),
        }

        if self.is_initializer {
            // `this` lives at distance 0 of an initializer's closure.
            return self.closure
                .borrow()
                .get_at(0, &Token::from("this"))
                .map_err(Interrupt::from);
        }

        Ok(Object::Literal(Literal::Nil))
    }

    fn arity(&self) -> usize {
        self.declaration.params.len()
    }
}

/// Functions compare by identity: a bound method is never equal to the
/// method it was bound from.
impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.declaration, &other.declaration)
            && Rc::ptr_eq(&self.closure, &other.closure)
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

/// A function implemented by the interpreter itself rather than in the
/// language.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub function: fn(&mut Interpreter<'_>, Vec<Object>) -> Result<Object, Interrupt>,
}

impl NativeFunction {
    /// Returns the native functions pre-bound in the global environment.
    pub fn get_globals() -> Vec<NativeFunction> {
        vec![
            NativeFunction {
                name: "clock",
                arity: 0,
                function: |_, _| {
                    let now = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .unwrap_or_default();
                    Ok(Object::from(now.as_secs_f64()))
                },
            },
        ]
    }
}

impl Callable for NativeFunction {
    fn call(
        &self,
        interpreter: &mut Interpreter<'_>,
        arguments: Vec<Object>,
    ) -> Result<Object, Interrupt> {
        (self.function)(interpreter, arguments)
    }

    fn arity(&self) -> usize {
        self.arity
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}
