use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

use crate::error::{Reporter, ResolveError};
use crate::expr::{Expr, ExprVisitor};
use crate::interpreter::Interpreter;
use crate::stmt::{FunctionData, Stmt, StmtVisitor};
use crate::token::Token;

/// What kind of function body the resolver is currently inside of.
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

/// What kind of class body the resolver is currently inside of.
enum ClassType {
    None,
    Class,
    Subclass,
}

/// A static pass between parsing and evaluation.
///
/// The resolver walks the same tree the evaluator does, but instead of values
/// it tracks scopes: a stack of maps from name to whether the name's
/// initializer has run yet. For every variable use it finds, it records how
/// many environments the evaluator will have to walk up at runtime, keyed by
/// the expression's node id. Names that fall off the bottom of the stack are
/// left for the global environment.
///
/// It also enforces the scope-shaped rules that are invisible to the parser:
/// reading a variable in its own initializer, double declarations, stray
/// `return`, `this` and `super`, and self-inheritance.
pub struct Resolver<'a, 'o> {
    interpreter: &'a mut Interpreter<'o>,
    reporter: &'a mut Reporter,
    scopes: Vec<HashMap<String, bool>>,
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'a, 'o> Resolver<'a, 'o> {
    pub fn new(interpreter: &'a mut Interpreter<'o>, reporter: &'a mut Reporter) -> Self {
        Resolver {
            interpreter,
            reporter,
            scopes: vec![],
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        expr.accept(self);
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        stmt.accept(self);
    }

    pub fn resolve(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.resolve_stmt(statement);
        }
    }

    /// Resolves a function body: one scope holding the parameters and the
    /// body statements. The evaluator's call protocol creates exactly one
    /// environment per call to match.
    fn resolve_function(&mut self, function: &Rc<FunctionData>, r#type: FunctionType) {
        let enclosing_function = mem::replace(&mut self.current_function, r#type);

        self.begin_scope();
        for param in &function.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve(&function.body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Marks the name as declared but not yet usable in the top scope.
    /// Declaring the same name twice in one local scope is an error.
    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else { return };

        if scope.contains_key(&name.lexeme) {
            self.reporter.error(&ResolveError {
                token: name.clone(),
                message: format!("A variable named '{}' already exists in this scope", name.lexeme),
            });
        }
        scope.insert(name.lexeme.to_owned(), false);
    }

    /// Marks the name as fully initialized and usable.
    fn define(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else { return };

        scope.insert(name.lexeme.to_owned(), true);
    }

    /// Walks the scope stack from the innermost scope outwards and records
    /// the hop distance of the name, if any scope holds it.
    fn resolve_local(&mut self, id: usize, name: &Token) {
        for (i, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.interpreter.resolve(id, i);
                return;
            }
        }
    }
}

impl<'a, 'o> ExprVisitor<()> for Resolver<'a, 'o> {
    fn visit_variable_expr(&mut self, expr: &Expr) {
        let Expr::Variable(variable) = expr else { unreachable!() };

        if let Some(scope) = self.scopes.last() {
            if scope.get(&variable.name.lexeme) == Some(&false) {
                self.reporter.error(&ResolveError {
                    token: variable.name.to_owned(),
                    message: "Cannot read local variable in its own initializer".to_string(),
                });
            }
        }

        self.resolve_local(variable.id, &variable.name);
    }

    fn visit_assign_expr(&mut self, expr: &Expr) {
        let Expr::Assign(assign) = expr else { unreachable!() };

        self.resolve_expr(&assign.value);
        self.resolve_local(assign.id, &assign.name);
    }

    fn visit_literal_expr(&mut self, expr: &Expr) {
        let Expr::Literal(_) = expr else { unreachable!() };
    }

    fn visit_logical_expr(&mut self, expr: &Expr) {
        let Expr::Logical(logical) = expr else { unreachable!() };

        self.resolve_expr(&logical.left);
        self.resolve_expr(&logical.right);
    }

    fn visit_unary_expr(&mut self, expr: &Expr) {
        let Expr::Unary(unary) = expr else { unreachable!() };

        self.resolve_expr(&unary.expr);
    }

    fn visit_binary_expr(&mut self, expr: &Expr) {
        let Expr::Binary(binary) = expr else { unreachable!() };

        self.resolve_expr(&binary.left);
        self.resolve_expr(&binary.right);
    }

    fn visit_grouping_expr(&mut self, expr: &Expr) {
        let Expr::Grouping(grouping) = expr else { unreachable!() };

        self.resolve_expr(&grouping.expr);
    }

    fn visit_call_expr(&mut self, expr: &Expr) {
        let Expr::Call(call) = expr else { unreachable!() };

        self.resolve_expr(&call.callee);

        for argument in &call.arguments {
            self.resolve_expr(argument);
        }
    }

    fn visit_get_expr(&mut self, expr: &Expr) {
        let Expr::Get(get) = expr else { unreachable!() };

        // Properties are looked up at runtime; only the object resolves.
        self.resolve_expr(&get.object);
    }

    fn visit_set_expr(&mut self, expr: &Expr) {
        let Expr::Set(set) = expr else { unreachable!() };

        self.resolve_expr(&set.value);
        self.resolve_expr(&set.object);
    }

    fn visit_this_expr(&mut self, expr: &Expr) {
        let Expr::This(this) = expr else { unreachable!() };

        if let ClassType::None = self.current_class {
            self.reporter.error(&ResolveError {
                token: this.keyword.clone(),
                message: "Cannot use 'this' outside of a class".to_string(),
            });
            return;
        }

        self.resolve_local(this.id, &this.keyword);
    }

    fn visit_super_expr(&mut self, expr: &Expr) {
        let Expr::Super(super_expr) = expr else { unreachable!() };

        match self.current_class {
            ClassType::Subclass => {},
            ClassType::None => self.reporter.error(&ResolveError {
                token: super_expr.keyword.clone(),
                message: "Cannot use 'super' outside of a class".to_string(),
            }),
            ClassType::Class => self.reporter.error(&ResolveError {
                token: super_expr.keyword.clone(),
                message: "Cannot use 'super' in a class with no superclass".to_string(),
            }),
        }

        self.resolve_local(super_expr.id, &super_expr.keyword);
    }
}

impl<'a, 'o> StmtVisitor<()> for Resolver<'a, 'o> {
    fn visit_block_stmt(&mut self, stmt: &Stmt) {
        let Stmt::Block(block) = stmt else { unreachable!() };

        self.begin_scope();
        self.resolve(&block.statements);
        self.end_scope();
    }

    fn visit_var_stmt(&mut self, stmt: &Stmt) {
        let Stmt::Var(var) = stmt else { unreachable!() };

        self.declare(&var.name);
        if let Some(initializer) = &var.initializer {
            self.resolve_expr(initializer);
        }
        self.define(&var.name);
    }

    fn visit_function_stmt(&mut self, stmt: &Stmt) {
        let Stmt::Function(function) = stmt else { unreachable!() };

        self.declare(&function.name);
        self.define(&function.name);

        self.resolve_function(function, FunctionType::Function);
    }

    fn visit_expression_stmt(&mut self, stmt: &Stmt) {
        let Stmt::Expression(expr) = stmt else { unreachable!() };

        self.resolve_expr(&expr.expr);
    }

    fn visit_if_stmt(&mut self, stmt: &Stmt) {
        let Stmt::If(if_stmt) = stmt else { unreachable!() };

        self.resolve_expr(&if_stmt.condition);
        self.resolve_stmt(&if_stmt.then_branch);
        if let Some(else_branch) = &if_stmt.else_branch {
            self.resolve_stmt(else_branch);
        }
    }

    fn visit_print_stmt(&mut self, stmt: &Stmt) {
        let Stmt::Print(print) = stmt else { unreachable!() };

        self.resolve_expr(&print.expr);
    }

    fn visit_return_stmt(&mut self, stmt: &Stmt) {
        let Stmt::Return(return_stmt) = stmt else { unreachable!() };

        if let FunctionType::None = self.current_function {
            self.reporter.error(&ResolveError {
                token: return_stmt.keyword.clone(),
                message: "Cannot return from top-level code".to_string(),
            });
        }

        if let Some(value) = &return_stmt.value {
            if let FunctionType::Initializer = self.current_function {
                self.reporter.error(&ResolveError {
                    token: return_stmt.keyword.clone(),
                    message: "Cannot return a value from an initializer".to_string(),
                });
                return;
            }

            self.resolve_expr(value);
        }
    }

    fn visit_while_stmt(&mut self, stmt: &Stmt) {
        let Stmt::While(while_stmt) = stmt else { unreachable!() };

        self.resolve_expr(&while_stmt.condition);
        self.resolve_stmt(&while_stmt.body);
    }

    fn visit_class_stmt(&mut self, stmt: &Stmt) {
        let Stmt::Class(class_stmt) = stmt else { unreachable!() };

        let enclosing_class = mem::replace(&mut self.current_class, ClassType::Class);

        self.declare(&class_stmt.name);
        self.define(&class_stmt.name);

        if let Some(superclass) = &class_stmt.superclass {
            let Expr::Variable(variable) = superclass else { unreachable!() };

            if class_stmt.name.lexeme == variable.name.lexeme {
                self.reporter.error(&ResolveError {
                    token: variable.name.clone(),
                    message: "A class cannot inherit from itself".to_string(),
                });
            }

            self.current_class = ClassType::Subclass;

            self.resolve_expr(superclass);

            // Methods of a subclass close over a scope holding `super`; the
            // evaluator builds the matching environment around them.
            self.begin_scope();
            self.scopes
                .last_mut()
                .expect("scope stack to not be empty")
                .insert("super".to_string(), true);
        }

        // Every method body closes over a scope holding `this`.
        self.begin_scope();
        self.scopes
            .last_mut()
            .expect("scope stack to not be empty")
            .insert("this".to_string(), true);

        for method in &class_stmt.methods {
            let declaration = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, declaration);
        }

        self.end_scope();

        if class_stmt.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::interpreter::Interpreter;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    /// Resolves the source and returns whether a static error was reported.
    fn resolve(source: &str) -> bool {
        let mut reporter = Reporter::new();
        let tokens = Scanner::new(source, &mut reporter).scan_tokens();
        let statements = Parser::new(tokens, 0, &mut reporter).parse();
        assert!(!reporter.had_error(), "unexpected parse error in {source}");

        let mut out: Vec<u8> = Vec::new();
        let mut interpreter = Interpreter::new(&mut out);
        Resolver::new(&mut interpreter, &mut reporter).resolve(&statements);

        reporter.had_error()
    }

    #[test]
    fn double_declaration_in_block() {
        assert!(resolve("{ var a = 1; var a = 2; }"));
    }

    #[test]
    fn double_declaration_in_globals_is_fine() {
        assert!(!resolve("var a = 1; var a = 2;"));
    }

    #[test]
    fn read_in_own_initializer() {
        assert!(resolve("var a = 1; { var a = a; }"));
    }

    #[test]
    fn read_in_own_initializer_at_global_is_not_an_error() {
        assert!(!resolve("var a = a;"));
    }

    #[test]
    fn top_level_return() {
        assert!(resolve("return;"));
        assert!(!resolve("fun f() { return; }"));
    }

    #[test]
    fn return_value_from_initializer() {
        assert!(resolve("class A { init() { return 1; } }"));
        assert!(!resolve("class A { init() { return; } }"));
    }

    #[test]
    fn this_outside_of_class() {
        assert!(resolve("print this;"));
        assert!(resolve("fun f() { return this; }"));
        assert!(!resolve("class A { f() { return this; } }"));
    }

    #[test]
    fn super_outside_of_class() {
        assert!(resolve("print super.f;"));
    }

    #[test]
    fn super_without_superclass() {
        assert!(resolve("class A { f() { super.f(); } }"));
        assert!(!resolve("class B {} class A < B { f() { super.f(); } }"));
    }

    #[test]
    fn self_inheritance() {
        assert!(resolve("class A < A {}"));
    }
}
