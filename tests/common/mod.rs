#![allow(dead_code)]

use lox::interpreter::{run_source, Interpreter, RunFailure};

/// Runs a program that is expected to succeed and returns what it printed.
pub fn run_ok(source: &str) -> String {
    let mut interpreter = Interpreter::with_output(Vec::new());
    if let Err(failure) = run_source(&mut interpreter, source) {
        panic!("program failed:\n{}\n--- source ---\n{}", failure.report(), source);
    }
    String::from_utf8(interpreter.into_output()).unwrap()
}

/// Runs a program that is expected to fail. Returns the output printed
/// before the failure together with the failure.
pub fn run_err(source: &str) -> (String, RunFailure) {
    let mut interpreter = Interpreter::with_output(Vec::new());
    match run_source(&mut interpreter, source) {
        Ok(()) => panic!("program unexpectedly succeeded:\n{}", source),
        Err(failure) => (String::from_utf8(interpreter.into_output()).unwrap(), failure),
    }
}

/// Joins expected output lines, each terminated by a newline.
pub fn lines(expected: &[&str]) -> String {
    expected.iter().map(|line| format!("{}\n", line)).collect()
}
