pub mod parser;
pub mod environment;
pub mod error;
pub mod control_flow;
pub mod builtins;
pub mod evaluator;

pub use error::RuntimeError;
pub use control_flow::ControlFlow;
pub use environment::Environment;
pub use parser::{parse, TokenParser, ParseError, ParseResult};
pub use evaluator::{Interpreter, RunFailure, run_source, parse_and_run};
