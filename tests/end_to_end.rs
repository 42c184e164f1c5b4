//! Whole-program tests run end-to-end through [`willow::Runner`].

use pretty_assertions::assert_eq;
use willow::{CollectOutput, CollectingSink, Limits, NoopTracer, Runner};

fn run(source: &str) -> (CollectingSink, CollectOutput, willow::Outcome) {
    Runner::new("test.wil", Limits::default_bounded()).run(
        source,
        CollectingSink::new(),
        CollectOutput::new(),
        NoopTracer,
    )
}

fn assert_succeeds(source: &str) -> CollectOutput {
    let (sink, output, outcome) = run(source);
    assert!(
        outcome.is_success(),
        "expected success, got error(s): {:?}",
        sink.diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>()
    );
    output
}

fn assert_fails_with(source: &str, needle: &str) {
    let (sink, _output, outcome) = run(source);
    assert!(!outcome.is_success(), "expected failure, program ran to completion");
    let message = sink.first_error_message().expect("a failing run always reports at least one error");
    assert!(message.contains(needle), "expected error containing {needle:?}, got {message:?}");
}

#[test]
fn reassignment_and_arithmetic_chain() {
    assert_succeeds("let a = 0; a = (a+1)*3; a = a+2; assert(a == 5);");
}

#[test]
fn closure_over_a_toggled_boolean() {
    // Spec §8 scenario 2, verbatim but for the grammar's required block
    // braces around each `if`/`else` arm: `toggle`'s body ends in a bare
    // `!b` with no `return`, relying on last-expression-as-block-value.
    assert_succeeds(
        r#"
        let b = true;
        let toggle = fn() {
            if (b) { b = false; } else { b = true; }
            !b
        };
        toggle();
        b = toggle();
        assert(!b);
        "#,
    );
}

#[test]
fn map_over_mixed_array_concatenates_string_renders() {
    let output = assert_succeeds(
        r#"
        let arr = [6, 9, [], "!"];
        let r = "";
        map(arr, fn(i) { r = r + i; });
        assert(r == "69[]!");
        puts(r);
        "#,
    );
    assert_eq!(output.lines, vec!["69[]!".to_owned()]);
}

#[test]
fn closures_snapshot_captures_at_scope_exit() {
    // Spec §8 scenario 4, verbatim: the inner closure's body is a bare
    // `"Hello, " + who` with no `return`, relying on
    // last-expression-as-block-value.
    assert_succeeds(
        r#"
        let mk = fn(who) { return fn() { "Hello, " + who }; };
        assert(mk("World")() == "Hello, World");
        "#,
    );
}

#[test]
fn mutual_recursion_at_the_same_lexical_level() {
    assert_succeeds(
        r#"
        let is_even = fn(n) { if (n == 0) { return true; } return is_odd(n - 1); };
        let is_odd = fn(n) { if (n == 0) { return false; } return is_even(n - 1); };
        assert(is_even(10));
        assert(is_odd(7));
        "#,
    );
}

#[test]
fn duplicate_dict_literal_key_fails() {
    assert_fails_with(r#"let d = {"a": 1, "a": 2};"#, "Duplicate key");
}

#[test]
fn array_index_out_of_range_fails() {
    assert_fails_with("let a = [1, 2]; let x = a[5];", "Index out of range");
}

#[test]
fn call_with_wrong_arity_fails() {
    assert_fails_with("let f = fn(x, y) { return x + y; }; f(1);", "Expected 2 argument");
}

#[test]
fn dividing_by_zero_fails() {
    assert_fails_with("let z = 0; assert(1 / z == 0);", "Division by zero");
}

#[test]
fn reassigning_an_undeclared_name_fails() {
    assert_fails_with("ghost = 1;", "immutable or doesn't exist");
}

#[test]
fn mutation_after_capture_is_invisible_inside_the_closure() {
    // `snapshot`'s capture locks when `make_snapshot`'s own call scope
    // exits, well before `counter` is mutated at the top level — so the
    // later reassignment cannot reach the frozen copy.
    assert_succeeds(
        r#"
        let counter = 0;
        let make_snapshot = fn() { return fn() { return counter; }; };
        let snapshot = make_snapshot();
        counter = 99;
        assert(snapshot() == 0);
        "#,
    );
}

#[test]
fn dict_plus_dict_merges_with_deep_copies() {
    assert_succeeds(
        r#"
        let a = {"x": 1};
        let b = {"y": 2};
        let merged = a + b;
        assert(merged["x"] == 1);
        assert(merged["y"] == 2);
        "#,
    );
}

#[test]
fn boolean_operators_do_not_short_circuit() {
    let output = assert_succeeds(
        r#"
        let side_effect = fn(tag, result) { puts(tag); return result; };
        let r = side_effect("left", false) && side_effect("right", true);
        assert(!r);
        "#,
    );
    assert_eq!(output.lines, vec!["left".to_owned(), "right".to_owned()]);
}

#[test]
fn exceeding_call_depth_limit_fails() {
    let limits = Limits { max_call_depth: Some(8), max_steps: None };
    let source = "let recur = fn() { recur(); }; recur();";
    let (sink, _output, outcome) =
        Runner::new("deep.wil", limits).run(source, CollectingSink::new(), CollectOutput::new(), NoopTracer);
    assert!(!outcome.is_success());
    assert!(sink.first_error_message().unwrap().contains("call depth"));
}

#[test]
fn lexer_error_reports_through_the_sink() {
    assert_fails_with("let a = 1 @ 2;", "Unexpected character");
}

#[test]
fn parser_error_reports_through_the_sink() {
    assert_fails_with("let a = ;", "Unexpected token");
}
