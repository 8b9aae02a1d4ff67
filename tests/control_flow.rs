mod common;

use common::{lines, run_err, run_ok};
use pretty_assertions::assert_eq;

#[test]
fn test_if_else() {
    let source = r#"
        var x = 5;
        if (x > 3) print "big"; else print "small";
        if (x > 10) print "huge"; else print "not huge";
        if (x == 5) { print "five"; }
    "#;
    assert_eq!(run_ok(source), lines(&["big", "not huge", "five"]));
}

#[test]
fn test_dangling_else_binds_to_nearest_if() {
    let source = r#"
        if (true) if (false) print "inner"; else print "inner else";
        if (false) if (true) print "a"; else print "b";
    "#;
    assert_eq!(run_ok(source), lines(&["inner else"]));
}

#[test]
fn test_while_loop() {
    let source = r#"
        var i = 0;
        while (i < 3) {
            print i;
            i = i + 1;
        }
        print "done";
    "#;
    assert_eq!(run_ok(source), lines(&["0", "1", "2", "done"]));
}

#[test]
fn test_while_with_false_condition_never_runs() {
    assert_eq!(run_ok("while (false) print 1; print 2;"), lines(&["2"]));
}

#[test]
fn test_for_loop_counts() {
    assert_eq!(run_ok("for (var i = 0; i < 3; i = i + 1) print i;"), lines(&["0", "1", "2"]));
}

#[test]
fn test_for_loop_variable_is_scoped_to_the_loop() {
    let (output, failure) = run_err("for (var i = 0; i < 1; i = i + 1) print i;\nprint i;");
    assert_eq!(output, lines(&["0"]));
    assert_eq!(failure.report(), "Undefined variable 'i'.\n[line 2]");
}

#[test]
fn test_for_loop_with_existing_variable_and_no_increment() {
    let source = r#"
        var i = 3;
        for (; i > 0;) {
            print i;
            i = i - 1;
        }
        print i;
    "#;
    assert_eq!(run_ok(source), lines(&["3", "2", "1", "0"]));
}

#[test]
fn test_for_loop_with_expression_initializer() {
    let source = r#"
        var i;
        for (i = 10; i < 12; i = i + 1) print i;
        print i;
    "#;
    assert_eq!(run_ok(source), lines(&["10", "11", "12"]));
}

#[test]
fn test_fibonacci_loop() {
    let source = r#"
        var a = 0;
        var temp;
        for (var b = 1; a < 100; b = temp + b) {
            print a;
            temp = a;
            a = b;
        }
    "#;
    let expected = lines(&["0", "1", "1", "2", "3", "5", "8", "13", "21", "34", "55", "89"]);
    assert_eq!(run_ok(source), expected);
}

#[test]
fn test_condition_is_evaluated_with_truthiness() {
    let source = r#"
        var n = 2;
        var seen = "";
        while (n) {
            seen = seen + "x";
            if (seen == "xx") n = nil;
        }
        print seen;
    "#;
    assert_eq!(run_ok(source), lines(&["xx"]));
}
