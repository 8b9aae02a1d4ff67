use thiserror::Error;

use crate::diagnostic::{Diagnostic, Label};
use crate::token::Token;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Undefined variable '{}'.", .name.lexeme)]
    UndefinedVariable { name: Token },

    #[error("{message}")]
    TypeError { operator: Token, message: String },

    #[error("Can only call functions.")]
    NotCallable { paren: Token },

    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { paren: Token, expected: usize, got: usize },

    #[error("Can't return from top-level code.")]
    ReturnOutsideFunction { keyword: Token },

    #[error("Stack overflow.")]
    StackOverflow { paren: Token, depth: usize },

    #[error("Could not write output: {message}")]
    Output { message: String },
}

impl RuntimeError {
    pub fn undefined_variable(name: &Token) -> Self {
        Self::UndefinedVariable { name: name.clone() }
    }

    pub fn type_error(operator: &Token, message: impl Into<String>) -> Self {
        Self::TypeError {
            operator: operator.clone(),
            message: message.into(),
        }
    }

    pub fn not_callable(paren: &Token) -> Self {
        Self::NotCallable { paren: paren.clone() }
    }

    pub fn arity_mismatch(paren: &Token, expected: usize, got: usize) -> Self {
        Self::ArityMismatch {
            paren: paren.clone(),
            expected,
            got,
        }
    }

    /// The token the error is reported against, if any.
    pub fn token(&self) -> Option<&Token> {
        match self {
            Self::UndefinedVariable { name } => Some(name),
            Self::TypeError { operator, .. } => Some(operator),
            Self::NotCallable { paren } => Some(paren),
            Self::ArityMismatch { paren, .. } => Some(paren),
            Self::ReturnOutsideFunction { keyword } => Some(keyword),
            Self::StackOverflow { paren, .. } => Some(paren),
            Self::Output { .. } => None,
        }
    }

    /// Source line of the offending token. Output failures have none.
    pub fn line(&self) -> Option<usize> {
        self.token().map(|token| token.line)
    }

    /// Classic report: the message, then `[line N]` when there is a line.
    pub fn report(&self) -> String {
        match self.line() {
            Some(line) => format!("{}\n[line {}]", self, line),
            None => self.to_string(),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.line().unwrap_or(0), self.to_string());
        let (code, label) = match self {
            Self::UndefinedVariable { .. } => ("E0201", "not found in any enclosing scope"),
            Self::TypeError { .. } => ("E0202", "operand type mismatch"),
            Self::NotCallable { .. } => ("E0203", "callee is not a function"),
            Self::ArityMismatch { .. } => ("E0204", "wrong number of arguments"),
            Self::ReturnOutsideFunction { .. } => ("E0205", "not inside a function body"),
            Self::StackOverflow { .. } => ("E0207", "call nesting limit reached here"),
            Self::Output { .. } => ("E0206", ""),
        };
        let mut diagnostic = diagnostic.with_code(code);
        if let Self::UndefinedVariable { name } = self {
            diagnostic = diagnostic.with_help(format!("declare it first with `var {} = ...;`", name.lexeme));
        }
        if let Self::StackOverflow { depth, .. } = self {
            diagnostic = diagnostic.with_help(format!("calls may nest at most {} deep", depth));
        }
        match self.token() {
            Some(token) => diagnostic
                .with_location(token.location())
                .with_label(Label::primary(token.span, label)),
            None => diagnostic,
        }
    }
}
