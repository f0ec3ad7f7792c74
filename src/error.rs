use std::fmt::{self, Display};

use crate::object::Object;
use crate::token::{Location, Token, Type};

/// The single diagnostic sink. Every error the interpreter can produce is
/// printed through a reporter, which also tracks whether the current run is
/// still allowed to proceed to the next phase.
///
/// The reporter is owned by the top-level driver and borrowed by the scanner,
/// the parser and the resolver. Runtime errors are returned to the driver
/// instead, which hands them to [`Reporter::runtime_error`].
#[derive(Debug, Default)]
pub struct Reporter {
    had_error: bool,
    had_runtime_error: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Reporter::default()
    }

    /// Reports a static error (scan, parse or resolve).
    pub fn error(&mut self, error: &impl Display) {
        eprintln!("{error}");
        self.had_error = true;
    }

    /// Reports an error that occurred while evaluating.
    pub fn runtime_error(&mut self, error: &RuntimeError) {
        eprintln!("{error}");
        self.had_runtime_error = true;
    }

    /// Returns if a static error was reported.
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// Returns if a runtime error was reported.
    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Clears both flags. The prompt calls this between lines so one bad line
    /// does not poison the rest of the session.
    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }
}

/// Represents an error that occurs during scanning.
#[derive(Debug)]
pub struct ScanError {
    pub location: Location,
    pub message: String,
}

impl Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error: {}", self.location, self.message)
    }
}

/// Represents an error that occurs during parsing.
#[derive(Debug)]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.token.r#type == Type::EOF {
            write!(f, "[line {}] Error at end: {}", self.token.location, self.message)
        } else {
            write!(
                f,
                "[line {}] Error at '{}': {}",
                self.token.location, self.token.lexeme, self.message
            )
        }
    }
}

/// Represents an error that occurs during resolution.
#[derive(Debug)]
pub struct ResolveError {
    pub token: Token,
    pub message: String,
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[line {}] Error at '{}': {}",
            self.token.location, self.token.lexeme, self.message
        )
    }
}

/// Represents an error that occurs during runtime.
#[derive(Debug)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[line {}] Error at '{}': {}",
            self.token.location, self.token.lexeme, self.message
        )
    }
}

/// A signal that unwinds statement execution.
///
/// `Return` is not an error: it carries the value of a `return` statement up
/// to the nearest function-call boundary, where it is caught. `Error` unwinds
/// all the way to the top-level interpret loop.
#[derive(Debug)]
pub enum Interrupt {
    Error(RuntimeError),
    Return(Object),
}

impl From<RuntimeError> for Interrupt {
    fn from(error: RuntimeError) -> Self {
        Interrupt::Error(error)
    }
}
