use std::io::{self, Write};
use std::rc::Rc;
use thiserror::Error;

use super::builtins;
use super::control_flow::ControlFlow;
use super::environment::Environment;
use super::error::RuntimeError;
use super::parser::parse;
use crate::ast::{Expr, Stmt};
use crate::config::{EXIT_DATA_ERROR, EXIT_SOFTWARE};
use crate::diagnostic::Diagnostic;
use crate::lexer::{scan, ScanResult};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenKind};
use crate::value::{Function, Value};

/// Deepest allowed nesting of user function calls.
pub const MAX_CALL_DEPTH: usize = 1024;

/// Executes statements against a chain of environments, writing `print`
/// output to `W`. One instance keeps its globals across many runs.
pub struct Interpreter<W: Write = io::Stdout> {
    globals: Environment,
    environment: Environment,
    output: W,
    call_depth: usize,
}

impl Interpreter<io::Stdout> {
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    pub fn with_output(output: W) -> Self {
        let globals = Environment::new();
        builtins::install(&globals);
        Self {
            environment: globals.clone(),
            globals,
            output,
            call_depth: 0,
        }
    }

    pub fn globals(&self) -> &Environment {
        &self.globals
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs a whole program unit. The first run-time error stops the unit;
    /// the interpreter itself stays usable.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for statement in statements {
            if let Err(err) = self.execute(statement) {
                tracing::debug!(line = ?err.line(), error = %err, "runtime error");
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn execute(&mut self, statement: &Stmt) -> Result<ControlFlow, RuntimeError> {
        ensure_sufficient_stack(|| self.execute_stmt(statement))
    }

    fn execute_stmt(&mut self, statement: &Stmt) -> Result<ControlFlow, RuntimeError> {
        match statement {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(ControlFlow::Normal)
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                self.print(&value)?;
                Ok(ControlFlow::Normal)
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.environment.define(name.lexeme.to_string(), value);
                Ok(ControlFlow::Normal)
            }
            Stmt::Block(statements) => {
                let scope = Environment::with_enclosing(self.environment.clone());
                self.execute_block(statements, scope)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(ControlFlow::Normal)
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let flow @ ControlFlow::Return(_) = self.execute(body)? {
                        return Ok(flow);
                    }
                }
                Ok(ControlFlow::Normal)
            }
            Stmt::Function(declaration) => {
                let function = Function::new(Rc::clone(declaration), self.environment.clone());
                self.environment
                    .define(declaration.name.lexeme.to_string(), Value::Function(Rc::new(function)));
                Ok(ControlFlow::Normal)
            }
            Stmt::Return { keyword, value } => {
                if self.call_depth == 0 {
                    return Err(RuntimeError::ReturnOutsideFunction {
                        keyword: keyword.clone(),
                    });
                }
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(ControlFlow::Return(value))
            }
        }
    }

    /// Runs `statements` with `environment` as the current scope, restoring
    /// the previous scope however the block exits.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: Environment) -> Result<ControlFlow, RuntimeError> {
        tracing::trace!(statements = statements.len(), "enter block");
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = self.execute_statements(statements);
        self.environment = previous;
        result
    }

    fn execute_statements(&mut self, statements: &[Stmt]) -> Result<ControlFlow, RuntimeError> {
        for statement in statements {
            match self.execute(statement)? {
                ControlFlow::Normal => {}
                flow @ ControlFlow::Return(_) => return Ok(flow),
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn print(&mut self, value: &Value) -> Result<(), RuntimeError> {
        writeln!(self.output, "{}", value)
            .and_then(|()| self.output.flush())
            .map_err(|err| RuntimeError::Output {
                message: err.to_string(),
            })
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match operator.kind {
                    TokenKind::Minus => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::type_error(operator, "Operand must be a number.")),
                    },
                    TokenKind::Bang => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(RuntimeError::type_error(operator, "Unknown unary operator.")),
                }
            }
            Expr::Binary { left, operator, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(operator, left, right)
            }
            Expr::Logical { left, operator, right } => {
                let left = self.evaluate(left)?;
                let decided = match operator.kind {
                    TokenKind::Or => left.is_truthy(),
                    _ => !left.is_truthy(),
                };
                if decided {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            Expr::Variable(name) => self.environment.get(name),
            Expr::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.environment.assign(name, value.clone())?;
                Ok(value)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;
                let arguments = arguments
                    .iter()
                    .map(|argument| self.evaluate(argument))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(callee, paren, arguments)
            }
        }
    }

    fn call(&mut self, callee: Value, paren: &Token, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(function) => {
                if arguments.len() != function.arity() {
                    return Err(RuntimeError::arity_mismatch(paren, function.arity(), arguments.len()));
                }
                if self.call_depth >= MAX_CALL_DEPTH {
                    return Err(RuntimeError::StackOverflow {
                        paren: paren.clone(),
                        depth: MAX_CALL_DEPTH,
                    });
                }
                tracing::trace!(function = function.name(), line = paren.line, "call");

                let frame = Environment::with_enclosing(function.closure.clone());
                for (param, argument) in function.declaration.params.iter().zip(arguments) {
                    frame.define(param.lexeme.to_string(), argument);
                }

                self.call_depth += 1;
                let result = self.execute_block(&function.declaration.body, frame);
                self.call_depth -= 1;

                match result? {
                    ControlFlow::Return(value) => Ok(value),
                    ControlFlow::Normal => Ok(Value::Nil),
                }
            }
            Value::Native(native) => {
                if arguments.len() != native.arity {
                    return Err(RuntimeError::arity_mismatch(paren, native.arity, arguments.len()));
                }
                tracing::trace!(function = native.name, "native call");
                Ok((native.function)(&arguments))
            }
            _ => Err(RuntimeError::not_callable(paren)),
        }
    }
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::type_error(operator, "Operands must be numbers.")),
    }
}

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value, RuntimeError> {
    let value = match operator.kind {
        TokenKind::Plus => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::String(a), Value::String(b)) => Value::string(format!("{}{}", a, b)),
            _ => {
                return Err(RuntimeError::type_error(
                    operator,
                    "Operands must be two numbers or two strings.",
                ))
            }
        },
        TokenKind::Minus => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Number(a - b)
        }
        TokenKind::Star => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Number(a * b)
        }
        TokenKind::Slash => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Number(a / b)
        }
        TokenKind::Greater => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Bool(a > b)
        }
        TokenKind::GreaterEqual => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Bool(a >= b)
        }
        TokenKind::Less => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Bool(a < b)
        }
        TokenKind::LessEqual => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Bool(a <= b)
        }
        TokenKind::EqualEqual => Value::Bool(left == right),
        TokenKind::BangEqual => Value::Bool(left != right),
        _ => return Err(RuntimeError::type_error(operator, "Unknown binary operator.")),
    };
    Ok(value)
}

/// Why a call to [`run_source`] did not complete.
#[derive(Debug, Error)]
pub enum RunFailure {
    #[error("aborting due to {} syntax error(s)", .0.len())]
    Syntax(Vec<Diagnostic>),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl RunFailure {
    /// Process exit status for a script that failed this way.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunFailure::Syntax(_) => EXIT_DATA_ERROR,
            RunFailure::Runtime(_) => EXIT_SOFTWARE,
        }
    }

    /// Classic one-error-per-line report.
    pub fn report(&self) -> String {
        match self {
            RunFailure::Syntax(diagnostics) => diagnostics
                .iter()
                .map(Diagnostic::summary)
                .collect::<Vec<_>>()
                .join("\n"),
            RunFailure::Runtime(err) => err.report(),
        }
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            RunFailure::Syntax(diagnostics) => diagnostics.clone(),
            RunFailure::Runtime(err) => vec![err.to_diagnostic()],
        }
    }
}

/// Scans, parses and, if both were clean, runs `source` on `interpreter`.
pub fn run_source<W: Write>(interpreter: &mut Interpreter<W>, source: &str) -> Result<(), RunFailure> {
    let ScanResult { tokens, errors } = scan(source);
    let parsed = parse(tokens);

    let diagnostics: Vec<Diagnostic> = errors
        .iter()
        .map(|err| err.to_diagnostic())
        .chain(parsed.errors.iter().map(|err| err.to_diagnostic()))
        .collect();
    if !diagnostics.is_empty() {
        return Err(RunFailure::Syntax(diagnostics));
    }

    interpreter.interpret(&parsed.statements)?;
    Ok(())
}

/// Runs `source` in a fresh interpreter and returns everything it printed.
pub fn parse_and_run(source: &str) -> Result<String, String> {
    let mut interpreter = Interpreter::with_output(Vec::new());
    run_source(&mut interpreter, source).map_err(|failure| failure.report())?;
    Ok(String::from_utf8_lossy(&interpreter.into_output()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> String {
        match parse_and_run(source) {
            Ok(output) => output,
            Err(err) => panic!("program failed: {}", err),
        }
    }

    /// Output printed before the failure, plus the failure itself.
    fn run_failing(source: &str) -> (String, RunFailure) {
        let mut interpreter = Interpreter::with_output(Vec::new());
        let failure = match run_source(&mut interpreter, source) {
            Ok(()) => panic!("program succeeded: {}", source),
            Err(failure) => failure,
        };
        (String::from_utf8_lossy(interpreter.output()).into_owned(), failure)
    }

    #[test]
    fn test_arithmetic_and_printing() {
        assert_eq!(run("print 1 + 2 * 3;"), "7\n");
        assert_eq!(run("print 10 / 4;"), "2.5\n");
        assert_eq!(run("print -(3 - 5);"), "2\n");
        assert_eq!(run("print \"a\" + \"b\";"), "ab\n");
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(run("print !nil; print !0; print !\"\"; print !false;"), "true\nfalse\nfalse\ntrue\n");
    }

    #[test]
    fn test_equality_never_errors() {
        assert_eq!(run("print 1 == \"1\"; print nil == nil; print nil == false; print \"a\" != \"a\";"), "false\ntrue\nfalse\nfalse\n");
    }

    #[test]
    fn test_logical_returns_deciding_operand() {
        assert_eq!(run("print nil or \"x\"; print 0 and 2; print false and 1; print \"l\" or 2;"), "x\n2\nfalse\nl\n");
    }

    #[test]
    fn test_plus_mixed_types_is_a_type_error() {
        let (_, failure) = run_failing("print 1 + \"a\";");
        let RunFailure::Runtime(RuntimeError::TypeError { operator, message }) = failure else {
            panic!("expected type error, got {:?}", failure);
        };
        assert_eq!(operator.kind, TokenKind::Plus);
        assert_eq!(message, "Operands must be two numbers or two strings.");
    }

    #[test]
    fn test_negating_a_string_is_a_type_error() {
        let (_, failure) = run_failing("-\"a\";");
        assert_eq!(failure.report(), "Operand must be a number.\n[line 1]");
    }

    #[test]
    fn test_runtime_error_stops_the_unit() {
        let (output, failure) = run_failing("print 1;\nprint x;\nprint 2;");
        assert_eq!(output, "1\n");
        assert_eq!(failure.exit_code(), 70);
        assert_eq!(failure.report(), "Undefined variable 'x'.\n[line 2]");
    }

    #[test]
    fn test_syntax_error_prevents_running() {
        let (output, failure) = run_failing("print 1;\nprint ;");
        assert_eq!(output, "");
        assert_eq!(failure.exit_code(), 65);
        assert_eq!(failure.report(), "[line 2] Error at ';': Expect expression.");
    }

    #[test]
    fn test_block_scope_is_restored_after_error() {
        let mut interpreter = Interpreter::with_output(Vec::new());
        let globals = interpreter.globals().clone();
        assert!(run_source(&mut interpreter, "var a = 1; { var a = 2; undefined; }").is_err());
        assert!(interpreter.environment.ptr_eq(&globals));
        run_source(&mut interpreter, "print a;").unwrap();
        assert_eq!(String::from_utf8_lossy(interpreter.output()), "1\n");
    }

    #[test]
    fn test_function_call_and_return() {
        assert_eq!(run("fun add(a, b) { return a + b; } print add(1, 2);"), "3\n");
        assert_eq!(run("fun f() {} print f();"), "nil\n");
        assert_eq!(run("fun f() { return; } print f();"), "nil\n");
    }

    #[test]
    fn test_return_unwinds_loops_and_blocks() {
        let source = "fun first() { var i = 0; while (true) { { if (i == 3) return i; } i = i + 1; } } print first();";
        assert_eq!(run(source), "3\n");
    }

    #[test]
    fn test_closures_capture_by_reference() {
        let source = r#"
            fun makeCounter() {
                var count = 0;
                fun counter() { count = count + 1; return count; }
                return counter;
            }
            var a = makeCounter();
            var b = makeCounter();
            print a(); print a(); print b();
        "#;
        assert_eq!(run(source), "1\n2\n1\n");
    }

    #[test]
    fn test_arity_mismatch() {
        let (_, failure) = run_failing("fun f(a) {}\nf(1, 2);");
        assert_eq!(failure.report(), "Expected 1 arguments but got 2.\n[line 2]");
    }

    #[test]
    fn test_calling_a_non_function() {
        let (_, failure) = run_failing("\"str\"();");
        assert_eq!(failure.report(), "Can only call functions.\n[line 1]");
    }

    #[test]
    fn test_callable_display() {
        assert_eq!(run("fun f() {} print f; print clock;"), "<fn f>\n<native fn>\n");
    }

    #[test]
    fn test_return_reaching_the_interpreter_is_an_error() {
        let keyword = Token::new(TokenKind::Return, "return", None, 4, crate::diagnostic::Span::new(0, 6));
        let statements = vec![Stmt::Return { keyword, value: None }];
        let mut interpreter = Interpreter::with_output(Vec::new());
        let err = interpreter.interpret(&statements).unwrap_err();
        assert!(matches!(err, RuntimeError::ReturnOutsideFunction { .. }));
        assert_eq!(err.line(), Some(4));
    }

    #[test]
    fn test_globals_persist_across_runs() {
        let mut interpreter = Interpreter::with_output(Vec::new());
        run_source(&mut interpreter, "var greeting = \"hi\";").unwrap();
        run_source(&mut interpreter, "print greeting;").unwrap();
        assert_eq!(String::from_utf8_lossy(interpreter.output()), "hi\n");
    }

    #[test]
    fn test_write_failure_is_a_runtime_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut interpreter = Interpreter::with_output(Broken);
        let failure = run_source(&mut interpreter, "print 1;").unwrap_err();
        assert!(matches!(failure, RunFailure::Runtime(RuntimeError::Output { .. })));
        let report = failure.report();
        assert!(report.starts_with("Could not write output:"), "{}", report);
        assert!(!report.contains("[line"), "{}", report);
    }
}
