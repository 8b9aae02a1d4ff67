pub mod ast;
pub mod cli;
pub mod config;
pub mod diagnostic;
pub mod format;
pub mod interpreter;
pub mod lexer;
pub mod stack;
pub mod token;
pub mod value;

pub use ast::{Expr, FunctionDecl, Stmt};
pub use interpreter::{parse_and_run, run_source, Interpreter, RunFailure};
pub use lexer::scan;
pub use token::{Token, TokenKind};
pub use value::Value;
