//! Shale is a small dynamically typed, class-based scripting language with
//! lexical scoping, first-class functions and single inheritance. It runs as
//! a tree-walk interpreter: the source is never compiled, the abstract syntax
//! tree itself is executed.
//!
//! A run goes through four phases:
//!
//! 1. **Scanning.** The [`scanner`] turns the source text into a flat list of
//!    tokens, each carrying its kind, verbatim lexeme, decoded literal value
//!    and source location. Lexical problems (an unterminated string, a stray
//!    character) are reported immediately and scanning continues, so a single
//!    pass surfaces them all.
//! 2. **Parsing.** The [`parser`] is a hand-written recursive descent parser
//!    over the token list. It produces [`expressions`](expr::Expr) (pieces of
//!    code that evaluate to an [`Object`](object::Object)) and
//!    [`statements`](stmt::Stmt) (pieces of code executed for their effect).
//!    On a syntax error it synchronizes at the next statement boundary and
//!    keeps parsing.
//! 3. **Resolving.** The [`resolver`] is a static pass that walks the fresh
//!    tree and computes, for every variable use, how many environments up the
//!    chain its definition lives. The evaluator later follows exactly that
//!    many links, which is what makes closures capture the scope they were
//!    written in rather than the scope they run in. The pass also rejects
//!    programs that are grammatically fine but semantically ill-formed, like
//!    a `return` outside a function or a class inheriting from itself.
//! 4. **Interpreting.** The [`interpreter`] evaluates the tree directly,
//!    threading an [`environment`](environment::Environment) chain for
//!    variable storage. Runtime errors (a type mismatch, an undefined
//!    variable) abort the run and are reported with the offending token's
//!    location.
//!
//! The three static phases all report through one [`Reporter`](error::Reporter);
//! if any of them reported an error the next phase is never run.

use std::fs;
use std::io::Write;
use std::process;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub mod ast;
pub mod class;
pub mod environment;
pub mod error;
pub mod expr;
pub mod function;
pub mod interpreter;
pub mod literal;
pub mod object;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stmt;
pub mod token;

use error::Reporter;
use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;
use scanner::Scanner;

/// The interpreter session: owns the evaluator, the diagnostic reporter and
/// the node id counter that keeps resolver entries distinct across prompt
/// lines. `print` output goes to the injected writer.
#[allow(non_camel_case_types)]
pub struct shale<'o> {
    interpreter: Interpreter<'o>,
    reporter: Reporter,
    next_id: usize,
}

impl<'o> shale<'o> {
    pub fn new(out: &'o mut dyn Write) -> Self {
        shale {
            interpreter: Interpreter::new(out),
            reporter: Reporter::new(),
            next_id: 0,
        }
    }

    /// Runs a script file to completion.
    ///
    /// Exits the process with 65 on a static error, 70 on a runtime error and
    /// 74 when the file cannot be read.
    pub fn run_file(&mut self, path: &str) {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(error) => {
                eprintln!("Could not read {path}: {error}");
                process::exit(74);
            },
        };

        self.run(&source);

        if self.reporter.had_error() {
            process::exit(65);
        }
        if self.reporter.had_runtime_error() {
            process::exit(70);
        }
    }

    /// Runs an interactive prompt, one line at a time.
    ///
    /// The session ends on `exit`, end of input or an interrupt. History is
    /// kept across sessions in the user's home directory.
    pub fn run_prompt(&mut self) {
        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(error) => {
                eprintln!("Could not start the prompt: {error}");
                return;
            },
        };

        let history = home::home_dir().map(|path| path.join(".shale_history"));
        if let Some(history) = &history {
            let _ = editor.load_history(history);
        }

        loop {
            match editor.readline("> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line == "exit" {
                        break;
                    }

                    let _ = editor.add_history_entry(line);
                    self.run(line);

                    // A bad line should not poison the next one.
                    self.reporter.reset();
                },
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(error) => {
                    eprintln!("Could not read line: {error}");
                    break;
                },
            }
        }

        if let Some(history) = &history {
            let _ = editor.save_history(history);
        }
    }

    /// Runs a chunk of source text through all four phases. Each phase only
    /// runs if the previous ones reported no errors.
    pub fn run(&mut self, source: &str) {
        let tokens = Scanner::new(source, &mut self.reporter).scan_tokens();

        if self.reporter.had_error() {
            return;
        }

        let mut parser = Parser::new(tokens, self.next_id, &mut self.reporter);
        let statements = parser.parse();
        self.next_id = parser.next_id();

        if self.reporter.had_error() {
            return;
        }

        let mut resolver = Resolver::new(&mut self.interpreter, &mut self.reporter);
        resolver.resolve(&statements);

        if self.reporter.had_error() {
            return;
        }

        if let Err(error) = self.interpreter.interpret(&statements) {
            self.reporter.runtime_error(&error);
        }
    }

    /// Returns if this session has reported an error that has not been reset.
    pub fn had_error(&self) -> bool {
        self.reporter.had_error() || self.reporter.had_runtime_error()
    }
}
