use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::Write;
use std::mem;
use std::rc::Rc;

use crate::class::Class;
use crate::environment::Environment;
use crate::error::{Interrupt, RuntimeError};
use crate::expr::{Expr, ExprVisitor};
use crate::function::{Function, NativeFunction};
use crate::literal::Literal;
use crate::object::{Callable, Object};
use crate::stmt::{Stmt, StmtVisitor};
use crate::token::{Token, Type};

type ExecResult<T> = Result<T, Interrupt>;

/// The tree-walk evaluator.
///
/// Carries the global environment, the current tip of the environment chain
/// and the side table of hop distances the resolver filled in. Everything
/// `print` produces goes to the injected writer.
pub struct Interpreter<'o> {
    pub globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<usize, usize>,
    out: &'o mut dyn Write,
}

impl<'o> Interpreter<'o> {
    pub fn new(out: &'o mut dyn Write) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new(None)));

        for native in NativeFunction::get_globals() {
            globals.borrow_mut().define(native.name, Object::from(native));
        }

        Interpreter {
            globals: Rc::clone(&globals),
            environment: globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Executes the statements in order, stopping at the first runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {},
                Err(Interrupt::Error(error)) => return Err(error),
                // The resolver rejects top-level returns.
                Err(Interrupt::Return(_)) => return Ok(()),
            }
        }

        Ok(())
    }

    /// Records the hop distance of a resolved node. Called by the resolver.
    pub fn resolve(&mut self, id: usize, depth: usize) {
        self.locals.insert(id, depth);
    }

    fn execute(&mut self, stmt: &Stmt) -> ExecResult<()> {
        stmt.accept(self)
    }

    fn evaluate(&mut self, expr: &Expr) -> ExecResult<Object> {
        expr.accept(self)
    }

    /// Executes the statements with `environment` as the current tip of the
    /// chain, restoring the previous tip on every exit path.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> ExecResult<()> {
        let previous = mem::replace(&mut self.environment, environment);

        let result = statements
            .iter()
            .try_for_each(|statement| self.execute(statement));

        self.environment = previous;
        result
    }

    /// Reads a variable through the resolver's side table: a resolved node
    /// goes straight to its recorded hop distance, everything else falls
    /// through to globals.
    fn look_up_variable(&self, id: usize, name: &Token) -> ExecResult<Object> {
        match self.locals.get(&id) {
            Some(distance) => self.environment.borrow().get_at(*distance, name),
            None => self.globals.borrow().get(name),
        }.map_err(Interrupt::from)
    }

    /// Returns if the expression is a read of `name` that the resolver left
    /// for globals. The resolver only rejects reading a variable in its own
    /// initializer inside local scopes; at the top level the self-read is
    /// legal and falls back to nil when the name has no binding yet.
    fn is_unresolved_self_read(&self, initializer: &Expr, name: &Token) -> bool {
        match initializer {
            Expr::Variable(variable) => {
                variable.name.lexeme == name.lexeme && !self.locals.contains_key(&variable.id)
            },
            _ => false,
        }
    }

    fn number_comparison(
        &self,
        left: Object,
        right: Object,
        operator: &Token,
    ) -> ExecResult<Ordering> {
        left.partial_cmp(&right).ok_or_else(|| {
            RuntimeError {
                token: operator.clone(),
                message: "Operands must be numbers".to_string(),
            }.into()
        })
    }
}

impl<'o> ExprVisitor<ExecResult<Object>> for Interpreter<'o> {
    fn visit_literal_expr(&mut self, expr: &Expr) -> ExecResult<Object> {
        let Expr::Literal(literal) = expr else { unreachable!() };

        Ok(Object::from(literal.clone()))
    }

    fn visit_grouping_expr(&mut self, expr: &Expr) -> ExecResult<Object> {
        let Expr::Grouping(grouping) = expr else { unreachable!() };

        self.evaluate(&grouping.expr)
    }

    fn visit_unary_expr(&mut self, expr: &Expr) -> ExecResult<Object> {
        let Expr::Unary(unary) = expr else { unreachable!() };

        let right = self.evaluate(&unary.expr)?;

        match unary.operator.r#type {
            Type::Bang => Ok(Object::from(!right.is_truthy())),
            Type::Minus => (-right).ok_or_else(|| {
                RuntimeError {
                    token: unary.operator.clone(),
                    message: "Operand must be a number".to_string(),
                }.into()
            }),
            _ => unreachable!(),
        }
    }

    fn visit_binary_expr(&mut self, expr: &Expr) -> ExecResult<Object> {
        let Expr::Binary(binary) = expr else { unreachable!() };

        let left = self.evaluate(&binary.left)?;
        let right = self.evaluate(&binary.right)?;

        let operator = &binary.operator;
        match operator.r#type {
            Type::Greater => {
                Ok(Object::from(self.number_comparison(left, right, operator)?.is_gt()))
            },
            Type::GreaterEqual => {
                Ok(Object::from(self.number_comparison(left, right, operator)?.is_ge()))
            },
            Type::Less => {
                Ok(Object::from(self.number_comparison(left, right, operator)?.is_lt()))
            },
            Type::LessEqual => {
                Ok(Object::from(self.number_comparison(left, right, operator)?.is_le()))
            },
            Type::EqualEqual => Ok(Object::from(left == right)),
            Type::BangEqual => Ok(Object::from(left != right)),
            Type::Plus => (left + right).ok_or_else(|| {
                RuntimeError {
                    token: operator.clone(),
                    message: "Operands must be two numbers or two strings".to_string(),
                }.into()
            }),
            Type::Minus => (left - right).ok_or_else(|| {
                RuntimeError {
                    token: operator.clone(),
                    message: "Operands must be numbers".to_string(),
                }.into()
            }),
            Type::Slash => (left / right).ok_or_else(|| {
                RuntimeError {
                    token: operator.clone(),
                    message: "Operands must be numbers".to_string(),
                }.into()
            }),
            Type::Star => (left * right).ok_or_else(|| {
                RuntimeError {
                    token: operator.clone(),
                    message: "Operands must be numbers".to_string(),
                }.into()
            }),
            _ => unreachable!(),
        }
    }

    fn visit_logical_expr(&mut self, expr: &Expr) -> ExecResult<Object> {
        let Expr::Logical(logical) = expr else { unreachable!() };

        let left = self.evaluate(&logical.left)?;

        // Short-circuit: the result is the deciding operand itself, not a
        // coerced boolean.
        if logical.operator.r#type == Type::Or {
            if left.is_truthy() {
                return Ok(left);
            }
        } else if !left.is_truthy() {
            return Ok(left);
        }

        self.evaluate(&logical.right)
    }

    fn visit_variable_expr(&mut self, expr: &Expr) -> ExecResult<Object> {
        let Expr::Variable(variable) = expr else { unreachable!() };

        self.look_up_variable(variable.id, &variable.name)
    }

    fn visit_assign_expr(&mut self, expr: &Expr) -> ExecResult<Object> {
        let Expr::Assign(assign) = expr else { unreachable!() };

        let value = self.evaluate(&assign.value)?;

        match self.locals.get(&assign.id) {
            Some(distance) => {
                self.environment
                    .borrow_mut()
                    .assign_at(*distance, &assign.name, value.clone());
            },
            None => {
                self.globals
                    .borrow_mut()
                    .assign(&assign.name, value.clone())
                    .map_err(Interrupt::from)?;
            },
        }

        Ok(value)
    }

    fn visit_call_expr(&mut self, expr: &Expr) -> ExecResult<Object> {
        let Expr::Call(call) = expr else { unreachable!() };

        let callee = self.evaluate(&call.callee)?;

        let mut arguments = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            arguments.push(self.evaluate(argument)?);
        }

        let callable: &dyn Callable = match &callee {
            Object::Function(function) => function,
            Object::NativeFunction(function) => function,
            Object::Class(class) => class,
            _ => {
                return Err(RuntimeError {
                    token: call.paren.clone(),
                    message: "Can only call functions and classes".to_string(),
                }.into());
            },
        };

        if arguments.len() != callable.arity() {
            return Err(RuntimeError {
                token: call.paren.clone(),
                message: format!(
                    "Expected {} arguments but got {}",
                    callable.arity(),
                    arguments.len()
                ),
            }.into());
        }

        callable.call(self, arguments)
    }

    fn visit_get_expr(&mut self, expr: &Expr) -> ExecResult<Object> {
        let Expr::Get(get) = expr else { unreachable!() };

        let object = self.evaluate(&get.object)?;

        if let Object::Instance(instance) = &object {
            return instance
                .borrow()
                .get(&get.name, &object)
                .map_err(Interrupt::from);
        }

        Err(RuntimeError {
            token: get.name.clone(),
            message: "Only instances have properties".to_string(),
        }.into())
    }

    fn visit_set_expr(&mut self, expr: &Expr) -> ExecResult<Object> {
        let Expr::Set(set) = expr else { unreachable!() };

        let object = self.evaluate(&set.object)?;

        let Object::Instance(instance) = object else {
            return Err(RuntimeError {
                token: set.name.clone(),
                message: "Only instances have fields".to_string(),
            }.into());
        };

        let value = self.evaluate(&set.value)?;
        instance.borrow_mut().set(&set.name, value.clone());

        Ok(value)
    }

    fn visit_this_expr(&mut self, expr: &Expr) -> ExecResult<Object> {
        let Expr::This(this) = expr else { unreachable!() };

        self.look_up_variable(this.id, &this.keyword)
    }

    fn visit_super_expr(&mut self, expr: &Expr) -> ExecResult<Object> {
        let Expr::Super(super_expr) = expr else { unreachable!() };

        let distance = *self.locals
            .get(&super_expr.id)
            .expect("'super' to have been resolved");

        let superclass = self.environment
            .borrow()
            .get_at(distance, &super_expr.keyword)?;
        let Object::Class(superclass) = superclass else { unreachable!() };

        // `this` always sits one environment below the one holding `super`.
        let object = self.environment
            .borrow()
            .get_at(distance - 1, &Token::from("this"))?;

        let Some(method) = superclass.find_method(&super_expr.method.lexeme) else {
            return Err(RuntimeError {
                token: super_expr.method.clone(),
                message: format!("Undefined property '{}'", super_expr.method.lexeme),
            }.into());
        };

        Ok(Object::from(method.bind(object)))
    }
}

impl<'o> StmtVisitor<ExecResult<()>> for Interpreter<'o> {
    fn visit_expression_stmt(&mut self, stmt: &Stmt) -> ExecResult<()> {
        let Stmt::Expression(data) = stmt else { unreachable!() };

        self.evaluate(&data.expr)?;
        Ok(())
    }

    fn visit_print_stmt(&mut self, stmt: &Stmt) -> ExecResult<()> {
        let Stmt::Print(data) = stmt else { unreachable!() };

        let value = self.evaluate(&data.expr)?;
        writeln!(self.out, "{value}").expect("output stream to be writable");

        Ok(())
    }

    fn visit_var_stmt(&mut self, stmt: &Stmt) -> ExecResult<()> {
        let Stmt::Var(data) = stmt else { unreachable!() };

        let value = match &data.initializer {
            Some(initializer) => match self.evaluate(initializer) {
                Ok(value) => value,
                // `var a = a;` at the top level reads the name being declared
                // before it exists. That read silently yields nil; the
                // declaration still succeeds and the run continues.
                Err(Interrupt::Error(_))
                    if self.is_unresolved_self_read(initializer, &data.name) =>
                {
                    Object::Literal(Literal::Nil)
                },
                Err(interrupt) => return Err(interrupt),
            },
            None => Object::Literal(Literal::Nil),
        };

        self.environment.borrow_mut().define(&data.name.lexeme, value);
        Ok(())
    }

    fn visit_block_stmt(&mut self, stmt: &Stmt) -> ExecResult<()> {
        let Stmt::Block(data) = stmt else { unreachable!() };

        let environment = Environment::new(Some(Rc::clone(&self.environment)));
        self.execute_block(&data.statements, Rc::new(RefCell::new(environment)))
    }

    fn visit_if_stmt(&mut self, stmt: &Stmt) -> ExecResult<()> {
        let Stmt::If(data) = stmt else { unreachable!() };

        if self.evaluate(&data.condition)?.is_truthy() {
            self.execute(&data.then_branch)?;
        } else if let Some(else_branch) = &data.else_branch {
            self.execute(else_branch)?;
        }

        Ok(())
    }

    fn visit_while_stmt(&mut self, stmt: &Stmt) -> ExecResult<()> {
        let Stmt::While(data) = stmt else { unreachable!() };

        while self.evaluate(&data.condition)?.is_truthy() {
            self.execute(&data.body)?;
        }

        Ok(())
    }

    fn visit_function_stmt(&mut self, stmt: &Stmt) -> ExecResult<()> {
        let Stmt::Function(data) = stmt else { unreachable!() };

        let function = Function::new(Rc::clone(data), Rc::clone(&self.environment), false);
        self.environment
            .borrow_mut()
            .define(&data.name.lexeme, Object::from(function));

        Ok(())
    }

    fn visit_return_stmt(&mut self, stmt: &Stmt) -> ExecResult<()> {
        let Stmt::Return(data) = stmt else { unreachable!() };

        let value = match &data.value {
            Some(value) => self.evaluate(value)?,
            None => Object::Literal(Literal::Nil),
        };

        Err(Interrupt::Return(value))
    }

    fn visit_class_stmt(&mut self, stmt: &Stmt) -> ExecResult<()> {
        let Stmt::Class(data) = stmt else { unreachable!() };

        let superclass = match &data.superclass {
            Some(superclass) => {
                let Expr::Variable(variable) = superclass else { unreachable!() };

                match self.evaluate(superclass)? {
                    Object::Class(class) => Some(class),
                    _ => {
                        return Err(RuntimeError {
                            token: variable.name.clone(),
                            message: "Superclass must be a class".to_string(),
                        }.into());
                    },
                }
            },
            None => None,
        };

        // The name is visible (as nil) while the methods are built, so they
        // can close over the class itself.
        self.environment
            .borrow_mut()
            .define(&data.name.lexeme, Object::Literal(Literal::Nil));

        if let Some(superclass) = &superclass {
            // Methods of a subclass close over an extra environment holding
            // `super`, mirroring the scope the resolver wrapped them in.
            let mut environment = Environment::new(Some(Rc::clone(&self.environment)));
            environment.define("super", Object::Class(Rc::clone(superclass)));
            self.environment = Rc::new(RefCell::new(environment));
        }

        let mut methods = HashMap::new();
        for method in &data.methods {
            let is_initializer = method.name.lexeme == "init";
            let function =
                Function::new(Rc::clone(method), Rc::clone(&self.environment), is_initializer);
            methods.insert(method.name.lexeme.clone(), function);
        }

        let class = Class::new(data.name.lexeme.clone(), superclass.clone(), methods);

        if superclass.is_some() {
            let enclosing = self.environment
                .borrow()
                .enclosing
                .clone()
                .expect("'super' environment to have an enclosing environment");
            self.environment = enclosing;
        }

        self.environment
            .borrow_mut()
            .assign(&data.name, Object::from(Rc::new(class)))
            .map_err(Interrupt::from)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::expr::{BinaryData, CallData, GroupingData, LogicalData, UnaryData};
    use crate::token::Location;

    fn token(r#type: Type, lexeme: &str) -> Token {
        Token::new(r#type, lexeme.to_string(), None, Location::new(1, 1))
    }

    fn literal(value: f64) -> Expr {
        Expr::Literal(Literal::Number(value))
    }

    fn evaluate(expr: &Expr) -> ExecResult<Object> {
        let mut out: Vec<u8> = Vec::new();
        let mut interpreter = Interpreter::new(&mut out);
        interpreter.evaluate(expr)
    }

    fn binary(left: Expr, operator: Token, right: Expr) -> Expr {
        Expr::Binary(BinaryData {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    #[test]
    fn evaluate_literal() {
        let expr = literal(12.0);
        assert_eq!(evaluate(&expr).unwrap(), Object::from(12.0));
    }

    #[test]
    fn evaluate_grouping() {
        let expr = Expr::Grouping(GroupingData { expr: Box::new(literal(12.0)) });
        assert_eq!(evaluate(&expr).unwrap(), Object::from(12.0));
    }

    #[test]
    fn evaluate_unary_minus() {
        let expr = Expr::Unary(UnaryData {
            operator: token(Type::Minus, "-"),
            expr: Box::new(literal(12.0)),
        });
        assert_eq!(evaluate(&expr).unwrap(), Object::from(-12.0));
    }

    #[test]
    fn evaluate_unary_minus_requires_a_number() {
        let expr = Expr::Unary(UnaryData {
            operator: token(Type::Minus, "-"),
            expr: Box::new(Expr::Literal(Literal::from("a"))),
        });
        assert!(evaluate(&expr).is_err());
    }

    #[test]
    fn evaluate_unary_bang_uses_truthiness() {
        let expr = Expr::Unary(UnaryData {
            operator: token(Type::Bang, "!"),
            expr: Box::new(literal(0.0)),
        });
        assert_eq!(evaluate(&expr).unwrap(), Object::from(false));

        let expr = Expr::Unary(UnaryData {
            operator: token(Type::Bang, "!"),
            expr: Box::new(Expr::Literal(Literal::Nil)),
        });
        assert_eq!(evaluate(&expr).unwrap(), Object::from(true));
    }

    #[test]
    fn evaluate_arithmetic() {
        let expr = binary(literal(6.0), token(Type::Star, "*"), literal(2.0));
        assert_eq!(evaluate(&expr).unwrap(), Object::from(12.0));

        let expr = binary(literal(6.0), token(Type::Slash, "/"), literal(2.0));
        assert_eq!(evaluate(&expr).unwrap(), Object::from(3.0));

        let expr = binary(literal(6.0), token(Type::Minus, "-"), literal(2.0));
        assert_eq!(evaluate(&expr).unwrap(), Object::from(4.0));
    }

    #[test]
    fn evaluate_plus_concatenates_strings() {
        let expr = binary(
            Expr::Literal(Literal::from("Hello")),
            token(Type::Plus, "+"),
            Expr::Literal(Literal::from("World")),
        );
        assert_eq!(evaluate(&expr).unwrap(), Object::from("HelloWorld"));
    }

    #[test]
    fn evaluate_plus_rejects_mixed_operands() {
        let expr = binary(
            Expr::Literal(Literal::from("Hello")),
            token(Type::Plus, "+"),
            literal(12.0),
        );
        assert!(evaluate(&expr).is_err());
    }

    #[test]
    fn evaluate_comparison() {
        let expr = binary(literal(1.0), token(Type::Less, "<"), literal(2.0));
        assert_eq!(evaluate(&expr).unwrap(), Object::from(true));

        let expr = binary(literal(1.0), token(Type::GreaterEqual, ">="), literal(2.0));
        assert_eq!(evaluate(&expr).unwrap(), Object::from(false));
    }

    #[test]
    fn evaluate_comparison_requires_numbers() {
        let expr = binary(
            Expr::Literal(Literal::from("a")),
            token(Type::Less, "<"),
            Expr::Literal(Literal::from("b")),
        );
        assert!(evaluate(&expr).is_err());
    }

    #[test]
    fn evaluate_equality() {
        let expr = binary(literal(12.0), token(Type::EqualEqual, "=="), literal(12.0));
        assert_eq!(evaluate(&expr).unwrap(), Object::from(true));

        let expr = binary(
            Expr::Literal(Literal::Nil),
            token(Type::EqualEqual, "=="),
            literal(12.0),
        );
        assert_eq!(evaluate(&expr).unwrap(), Object::from(false));

        let expr = binary(
            Expr::Literal(Literal::Nil),
            token(Type::BangEqual, "!="),
            Expr::Literal(Literal::Nil),
        );
        assert_eq!(evaluate(&expr).unwrap(), Object::from(false));
    }

    #[test]
    fn evaluate_logical_returns_the_operand() {
        let expr = Expr::Logical(LogicalData {
            left: Box::new(Expr::Literal(Literal::from("hi"))),
            operator: token(Type::Or, "or"),
            right: Box::new(literal(2.0)),
        });
        assert_eq!(evaluate(&expr).unwrap(), Object::from("hi"));

        let expr = Expr::Logical(LogicalData {
            left: Box::new(Expr::Literal(Literal::Nil)),
            operator: token(Type::And, "and"),
            right: Box::new(literal(2.0)),
        });
        assert_eq!(evaluate(&expr).unwrap(), Object::from(Literal::Nil));
    }

    #[test]
    fn calling_a_literal_fails() {
        let expr = Expr::Call(CallData {
            callee: Box::new(literal(1.0)),
            paren: token(Type::RightParen, ")"),
            arguments: vec![],
        });
        assert!(evaluate(&expr).is_err());
    }

    #[test]
    fn clock_is_pre_bound() {
        let mut out: Vec<u8> = Vec::new();
        let interpreter = Interpreter::new(&mut out);
        let clock = interpreter.globals.borrow().get(&Token::from("clock")).unwrap();

        assert_eq!(clock.type_str(), "native function");
    }
}
