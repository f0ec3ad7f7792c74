use std::str::Chars;

use peekmore::{PeekMore, PeekMoreIterator};

use crate::error::{Reporter, ScanError};
use crate::literal::Literal;
use crate::token::{Location, Token, Type};

pub struct Scanner<'a> {
    source: PeekMoreIterator<Chars<'a>>,
    reporter: &'a mut Reporter,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    column_offset: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner.
    pub fn new(source: &'a str, reporter: &'a mut Reporter) -> Scanner<'a> {
        Scanner {
            source: source.chars().peekmore(),
            reporter,
            tokens: vec![],
            start: 0,
            current: 0,
            line: 1,
            column_offset: 0,
        }
    }

    /// Scans the source code and returns a vector of tokens.
    ///
    /// Scan errors are reported as they are encountered and scanning keeps
    /// going, so a single pass surfaces every lexical problem in the source.
    pub fn scan_tokens(&mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }

        self.tokens.push(Token::new(
            Type::EOF,
            String::new(),
            None,
            self.location(self.current),
        ));

        std::mem::take(&mut self.tokens)
    }

    /// Returns the location of the character at the given offset.
    fn location(&self, offset: usize) -> Location {
        Location::new(self.line, offset - self.column_offset + 1)
    }

    /// Consumes and returns the next character.
    fn advance(&mut self) -> char {
        self.current += 1;
        self.source.next().unwrap_or('\0')
    }

    /// Returns the next character without consuming it.
    fn peek(&mut self) -> char {
        self.source.peek().copied().unwrap_or('\0')
    }

    /// Returns the character after the next one without consuming anything.
    fn peek_next(&mut self) -> char {
        self.source.peek_nth(1).copied().unwrap_or('\0')
    }

    /// Returns if the character after the next one is the expected character.
    fn match_next(&mut self, expected: char) -> bool {
        self.source.peek_nth(1) == Some(&expected)
    }

    /// Adds a new token to the list of tokens.
    fn add_token(&mut self, r#type: Type, lexeme: String, literal: Option<Literal>) {
        let location = self.location(self.start);
        self.tokens.push(Token::new(r#type, lexeme, literal, location));
    }

    /// Adds a new single char token to the list of tokens.
    fn add_single_char_token(&mut self, r#type: Type) {
        let c = self.advance();
        self.add_token(r#type, c.to_string(), None);
    }

    /// Adds a new double char token to the list of tokens.
    fn add_double_char_token(&mut self, r#type: Type) {
        let first = self.advance();
        let second = self.advance();

        self.add_token(r#type, format!("{first}{second}"), None);
    }

    /// Returns if the scanner has reached the end of the file.
    fn is_at_end(&mut self) -> bool {
        self.source.peek().is_none()
    }

    /// Handles a string literal.
    fn string(&mut self) {
        let start = self.location(self.start);
        self.advance(); // Move past the opening double quote.

        let mut value = Vec::new();
        while !self.is_at_end() && self.peek() != '"' {
            let c = self.advance();
            value.push(c);

            if c == '\n' {
                self.line += 1;
                self.column_offset = self.current;
            }
        }

        if self.is_at_end() {
            self.reporter.error(&ScanError {
                location: start,
                message: String::from("Unterminated string"),
            });
            return;
        }

        self.advance(); // Move past the closing double quote.

        let value: String = value.into_iter().collect();

        // The literal does not include the double quotes unlike the lexeme.
        // The token is anchored at the opening quote, which may sit on an
        // earlier line than the closing one.
        self.tokens.push(Token::new(
            Type::String,
            format!("\"{value}\""),
            Some(Literal::String(value)),
            start,
        ));
    }

    /// Handles a number literal.
    fn number(&mut self) {
        let mut value = Vec::new();

        while self.peek().is_ascii_digit() {
            value.push(self.advance());
        }

        // A trailing dot is not part of the number; `12.` scans as the number
        // 12 followed by a dot token.
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            value.push(self.advance()); // Consume the dot.

            while self.peek().is_ascii_digit() {
                value.push(self.advance());
            }
        }

        let value: String = value.into_iter().collect();
        let number: f64 = value.parse().unwrap_or_default();

        self.add_token(Type::Number, value, Some(Literal::Number(number)));
    }

    /// Handles an identifier or a keyword.
    fn identifier(&mut self) {
        let mut value = Vec::new();

        // is_alphanumeric does not include underscores.
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            value.push(self.advance());
        }

        let value = String::from_iter(value);
        let token_type = match value.as_str() {
            "and"    => Type::And,
            "class"  => Type::Class,
            "else"   => Type::Else,
            "false"  => Type::False,
            "for"    => Type::For,
            "fun"    => Type::Fun,
            "if"     => Type::If,
            "nil"    => Type::Nil,
            "or"     => Type::Or,
            "print"  => Type::Print,
            "return" => Type::Return,
            "super"  => Type::Super,
            "this"   => Type::This,
            "true"   => Type::True,
            "var"    => Type::Var,
            "while"  => Type::While,
            _        => Type::Identifier,
        };

        self.add_token(token_type, value, None);
    }

    /// Scans the next token.
    fn scan_token(&mut self) {
        let c = self.peek();
        match c {
            // One character tokens
            '(' => self.add_single_char_token(Type::LeftParen),
            ')' => self.add_single_char_token(Type::RightParen),
            '{' => self.add_single_char_token(Type::LeftBrace),
            '}' => self.add_single_char_token(Type::RightBrace),
            ',' => self.add_single_char_token(Type::Comma),
            '.' => self.add_single_char_token(Type::Dot),
            '-' => self.add_single_char_token(Type::Minus),
            '+' => self.add_single_char_token(Type::Plus),
            ';' => self.add_single_char_token(Type::Semicolon),
            '*' => self.add_single_char_token(Type::Star),

            // Two character tokens
            '!' => {
                if self.match_next('=') {
                    self.add_double_char_token(Type::BangEqual);
                } else {
                    self.add_single_char_token(Type::Bang);
                }
            },
            '=' => {
                if self.match_next('=') {
                    self.add_double_char_token(Type::EqualEqual);
                } else {
                    self.add_single_char_token(Type::Equal);
                }
            },
            '<' => {
                if self.match_next('=') {
                    self.add_double_char_token(Type::LessEqual);
                } else {
                    self.add_single_char_token(Type::Less);
                }
            },
            '>' => {
                if self.match_next('=') {
                    self.add_double_char_token(Type::GreaterEqual);
                } else {
                    self.add_single_char_token(Type::Greater);
                }
            },
            '/' => {
                if self.match_next('/') {
                    // A comment runs until the end of the line.
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_single_char_token(Type::Slash);
                }
            },

            // Ignore whitespace
            ' ' | '\r' | '\t' => {
                self.advance();
            },

            // Update line counter
            '\n' => {
                self.advance();

                self.line += 1;
                self.column_offset = self.current;
            },

            // String
            '"' => self.string(),

            // Numbers
            c if c.is_ascii_digit() => self.number(),

            // Identifiers
            c if c.is_alphabetic() || c == '_' => self.identifier(),

            _ => {
                self.advance();

                let error = ScanError {
                    location: self.location(self.start),
                    message: format!("Unexpected character '{c}'"),
                };
                self.reporter.error(&error);
            },
        }
    }
}
