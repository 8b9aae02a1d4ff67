use clap::Parser;
use lox::cli::{generate_completions, Args, Commands};
use lox::config::{AppConfig, EXIT_IO_ERROR, EXIT_USAGE};
use lox::diagnostic::render_diagnostics;
use lox::interpreter::{run_source, Interpreter, RunFailure};
use owo_colors::OwoColorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io;
use std::path::Path;

const REPL_FILE_NAME: &str = "<repl>";

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            std::process::exit(EXIT_USAGE);
        }
        Err(err) => err.exit(),
    };

    if let Some(Commands::Complete { shell }) = args.command {
        generate_completions(shell);
        return;
    }

    let config = AppConfig::from_args(&args);
    init_tracing(&config);

    match &args.script {
        Some(path) => run_file(path, &config),
        None => run_prompt(&config),
    }
}

fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.default_log_filter()));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(config.color_enabled)
                .with_target(true),
        )
        .with(filter)
        .init();
}

fn run_file(path: &Path, config: &AppConfig) {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            error_message(config, &format!("Failed to read {}: {}", path.display(), e));
            std::process::exit(EXIT_IO_ERROR);
        }
    };
    tracing::debug!(path = %path.display(), bytes = source.len(), "running script");

    let mut interpreter = Interpreter::new();
    if let Err(failure) = run_source(&mut interpreter, &source) {
        report_failure(&source, &path.display().to_string(), &failure, config);
        std::process::exit(failure.exit_code());
    }
}

/// Interactive session. Definitions persist from line to line; an error
/// only abandons the line it occurred on.
fn run_prompt(config: &AppConfig) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            error_message(config, &format!("Failed to start line editor: {}", e));
            std::process::exit(EXIT_IO_ERROR);
        }
    };
    let mut interpreter = Interpreter::new();

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == ".exit" {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());

                if let Err(failure) = run_source(&mut interpreter, &line) {
                    report_failure(&line, REPL_FILE_NAME, &failure, config);
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                error_message(config, &format!("Error reading input: {}", e));
                std::process::exit(EXIT_IO_ERROR);
            }
        }
    }
}

fn report_failure(source: &str, file_name: &str, failure: &RunFailure, config: &AppConfig) {
    let rendered = render_diagnostics(source, file_name, &failure.diagnostics(), config.color_enabled);
    eprint!("{}", rendered);
}

fn error_message(config: &AppConfig, message: &str) {
    if config.color_enabled {
        eprintln!("{}", message.red().bold());
    } else {
        eprintln!("{}", message);
    }
}
