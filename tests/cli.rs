use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn get_lox_binary() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_lox"));
    command.env_remove("RUST_LOG");
    command
}

fn write_script(name: &str, source: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("lox-cli-tests-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    let path = dir.join(name);
    std::fs::write(&path, source).expect("Failed to write script");
    path
}

fn run_script(name: &str, source: &str) -> Output {
    let path = write_script(name, source);
    get_lox_binary()
        .arg("--color")
        .arg("never")
        .arg(&path)
        .output()
        .expect("Failed to execute lox")
}

fn run_repl(input: &str) -> Output {
    let mut child = get_lox_binary()
        .arg("--color")
        .arg("never")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn lox");

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes()).unwrap();
        stdin.flush().unwrap();
    }

    child.wait_with_output().expect("Failed to wait for lox")
}

#[test]
fn test_version_flag() {
    let output = get_lox_binary().arg("--version").output().expect("Failed to execute lox");

    assert!(output.status.success(), "Version flag should succeed");
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("lox"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_runs_script_file() {
    let output = run_script("hello.lox", "var greeting = \"Hello\";\nprint greeting + \", world!\";\nprint 1 + 2;\n");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "Hello, world!\n3\n");
}

#[test]
fn test_syntax_error_exits_65() {
    let output = run_script("syntax.lox", "print \"never runs\";\nvar = 1;\n");

    assert_eq!(output.status.code(), Some(65));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "");
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Expect variable name."), "stderr: {}", stderr);
    assert!(stderr.contains("syntax.lox:2:5"), "stderr: {}", stderr);
}

#[test]
fn test_runtime_error_exits_70() {
    let output = run_script("runtime.lox", "print \"first\";\nprint -\"oops\";\nprint \"never\";\n");

    assert_eq!(output.status.code(), Some(70));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "first\n");
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Operand must be a number."), "stderr: {}", stderr);
}

#[test]
fn test_missing_script_exits_74() {
    let output = get_lox_binary()
        .arg("--color")
        .arg("never")
        .arg("/definitely/not/here.lox")
        .output()
        .expect("Failed to execute lox");

    assert_eq!(output.status.code(), Some(74));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Failed to read"), "stderr: {}", stderr);
}

#[test]
fn test_too_many_arguments_exits_64() {
    let output = get_lox_binary()
        .arg("one.lox")
        .arg("two.lox")
        .output()
        .expect("Failed to execute lox");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn test_repl_keeps_state_between_lines() {
    let output = run_repl("var a = 40;\nprint a + 2;\n.exit\nprint \"after exit\";\n");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("42"), "stdout: {}", stdout);
    assert!(!stdout.contains("after exit"), "stdout: {}", stdout);
}

#[test]
fn test_repl_survives_errors() {
    let output = run_repl("print missing;\nprint ;\nprint \"still here\";\n");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stdout.contains("still here"), "stdout: {}", stdout);
    assert!(stderr.contains("Undefined variable 'missing'."), "stderr: {}", stderr);
    assert!(stderr.contains("Expect expression."), "stderr: {}", stderr);
}

#[test]
fn test_completions() {
    let output = get_lox_binary()
        .arg("complete")
        .arg("bash")
        .output()
        .expect("Failed to execute lox");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("lox"));
}
