use chumsky::prelude::*;
use std::rc::Rc;
use thiserror::Error;

use crate::diagnostic::{Diagnostic, Label, LineIndex, Span};
use crate::token::{Literal, Token, TokenKind};

/// Raw scanner output before line numbers and lexemes are attached.
/// Malformed input is a lexeme too, so the grammar below never fails.
#[derive(Debug, Clone, PartialEq)]
enum Lexeme {
    Token(TokenKind, Option<Literal>),
    Comment,
    UnterminatedComment,
    UnterminatedString,
    Unexpected(char),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] Error: {message}")]
pub struct ScanError {
    pub line: usize,
    pub message: String,
    pub span: Span,
}

impl ScanError {
    fn new(line: usize, message: impl Into<String>, span: Span) -> Self {
        Self {
            line,
            message: message.into(),
            span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.line, self.message.clone())
            .with_code("E0001")
            .with_label(Label::primary(self.span, ""))
    }
}

#[derive(Debug, Clone)]
pub struct ScanResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<ScanError>,
}

impl ScanResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

fn lexer<'a>() -> impl Parser<'a, &'a str, Vec<(Lexeme, SimpleSpan)>, extra::Err<Simple<'a, char>>> {
    let number = text::digits(10)
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .map(|s: &str| Lexeme::Token(TokenKind::Number, s.parse().ok().map(Literal::Number)));

    let string = just('"')
        .ignore_then(none_of("\"").repeated().to_slice())
        .then(just('"').or_not())
        .map(|(body, close): (&str, Option<char>)| match close {
            Some(_) => Lexeme::Token(TokenKind::String, Some(Literal::String(Rc::from(body)))),
            None => Lexeme::UnterminatedString,
        });

    let ident = any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .then(any().filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_').repeated())
        .to_slice()
        .map(|s: &str| Lexeme::Token(TokenKind::keyword(s).unwrap_or(TokenKind::Identifier), None));

    let line_comment = just("//").then(none_of("\n").repeated()).to(Lexeme::Comment);

    // Block comments nest; the flag records whether the outermost `*/` was found.
    let block_comment = recursive(|nested| {
        just("/*")
            .ignore_then(
                choice((nested.ignored(), any().and_is(just("*/").not()).ignored())).repeated(),
            )
            .ignore_then(just("*/").or_not())
            .map(|close: Option<&str>| close.is_some())
    })
    .map(|terminated| {
        if terminated {
            Lexeme::Comment
        } else {
            Lexeme::UnterminatedComment
        }
    });

    // Two-character operators first so `!=` never lexes as `!` `=`.
    let operator = choice((
        just("!=").to(TokenKind::BangEqual),
        just("==").to(TokenKind::EqualEqual),
        just("<=").to(TokenKind::LessEqual),
        just(">=").to(TokenKind::GreaterEqual),
        just('!').to(TokenKind::Bang),
        just('=').to(TokenKind::Equal),
        just('<').to(TokenKind::Less),
        just('>').to(TokenKind::Greater),
        just('(').to(TokenKind::LeftParen),
        just(')').to(TokenKind::RightParen),
        just('{').to(TokenKind::LeftBrace),
        just('}').to(TokenKind::RightBrace),
        just(',').to(TokenKind::Comma),
        just('.').to(TokenKind::Dot),
        just('-').to(TokenKind::Minus),
        just('+').to(TokenKind::Plus),
        just(';').to(TokenKind::Semicolon),
        just('*').to(TokenKind::Star),
        just('/').to(TokenKind::Slash),
    ))
    .map(|kind| Lexeme::Token(kind, None));

    let whitespace = one_of(" \t\r\n").repeated();

    let lexeme = choice((
        line_comment,
        block_comment,
        string,
        number,
        ident,
        operator,
        any().map(Lexeme::Unexpected),
    ))
    .map_with(|lexeme, e| (lexeme, e.span()));

    whitespace
        .clone()
        .ignore_then(lexeme.then_ignore(whitespace).repeated().collect())
        .then_ignore(end())
}

/// Converts source text into tokens. Never aborts: malformed input is
/// reported in `errors` and scanning continues past it. The token list
/// always ends with exactly one `Eof` token.
pub fn scan(source: &str) -> ScanResult {
    let lines = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    let lexemes = match lexer().parse(source).into_output() {
        Some(lexemes) => lexemes,
        None => {
            errors.push(ScanError::new(1, "Could not tokenize input.", Span::new(0, source.len())));
            Vec::new()
        }
    };

    for (lexeme, simple_span) in lexemes {
        let span = Span::new(simple_span.start, simple_span.end);
        let line = lines.line(span.start);
        match lexeme {
            Lexeme::Token(kind, literal) => {
                let text = &source[span.start..span.end];
                tokens.push(Token::new(kind, text, literal, line, span));
            }
            Lexeme::Comment => {}
            Lexeme::UnterminatedComment => {
                errors.push(ScanError::new(lines.line(span.end), "Unterminated comment.", span));
            }
            Lexeme::UnterminatedString => {
                errors.push(ScanError::new(lines.line(span.end), "Unterminated string.", span));
            }
            Lexeme::Unexpected(c) => {
                errors.push(ScanError::new(line, format!("Unexpected character '{}'.", c), span));
            }
        }
    }

    tokens.push(Token::eof(lines.line_count(), source.len()));
    tracing::debug!(tokens = tokens.len(), errors = errors.len(), "scanned source");

    ScanResult { tokens, errors }
}
