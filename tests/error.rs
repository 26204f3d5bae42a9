#[macro_use]
mod macros;

use thistle::{ErrorKind, Options};

fn kind_of(input: &str) -> ErrorKind {
    match thistle::from_string(input.to_string(), &Options::default().quiet(true)) {
        Ok(..) => panic!("expected {:?} to fail", input),
        Err(e) => e.kind(),
    }
}

#[test]
fn error_kinds_are_typed() {
    assert_eq!(kind_of("a {\n  v: (1 / 0);\n}\n"), ErrorKind::ZeroDivision);
    assert_eq!(kind_of("a {\n  v: 1px + 1s;\n}\n"), ErrorKind::IncompatibleUnits);
    assert_eq!(
        kind_of("a {\n  v: #102030 * 2;\n}\n"),
        ErrorKind::UndefinedOperation
    );
    assert_eq!(
        kind_of("a {\n  v: null * 2;\n}\n"),
        ErrorKind::InvalidNullOperation
    );
    assert_eq!(
        kind_of("a {\n  v: map-get((a: 1, a: 2), a);\n}\n"),
        ErrorKind::DuplicateKey
    );
    assert_eq!(
        kind_of("@mixin m($x) {\n  v: $x;\n}\na {\n  @include m;\n}\n"),
        ErrorKind::MissingArgument
    );
    assert_eq!(
        kind_of("a {\n  v: abs(foo);\n}\n"),
        ErrorKind::InvalidArgumentType
    );
    assert_eq!(kind_of(".b {\n  @extend .a;\n}\n"), ErrorKind::UnsatisfiedExtend);
    assert_eq!(
        kind_of("@media print {\n  .a {\n    @extend .b;\n  }\n}\n.b {\n  x: 1;\n}\n"),
        ErrorKind::ExtendAcrossMedia
    );
    assert_eq!(kind_of("& {\n  color: red;\n}\n"), ErrorKind::TopLevelParent);
    assert_eq!(kind_of("a {\n  v: $x\n}\n"), ErrorKind::InvalidSyntax);
}

#[test]
fn keyword_rest_argument_must_have_string_keys() {
    let input = "@function f($args...) {\n  @return 1;\n}\na {\n  v: f((1: 2)...);\n}\n";

    match thistle::from_string(input.to_string(), &Options::default()) {
        Ok(..) => panic!("did not fail"),
        Err(e) => assert_eq!(e.kind(), ErrorKind::InvalidVarKwdType),
    }
}

#[test]
fn stack_error_kind() {
    let input = "@function r() {\n  @return r();\n}\na {\n  v: r();\n}\n";

    match thistle::from_string(input.to_string(), &Options::default().max_depth(16)) {
        Ok(..) => panic!("did not fail"),
        Err(e) => assert_eq!(e.kind(), ErrorKind::StackError),
    }
}

#[test]
fn backtrace_names_the_failing_callable() {
    let input = "@function f($n) {\n  @return $n * 2px;\n}\na {\n  v: f(foo);\n}\n";

    let err = thistle::from_string(input.to_string(), &Options::default()).unwrap_err();
    let formatted = err.to_string();

    assert!(formatted.contains("function f()"), "trace was: {formatted}");
}

#[test]
fn error_messages_are_formatted_with_context() {
    let err = thistle::from_string(
        "a {\n  v: $missing;\n}\n".to_string(),
        &Options::default(),
    )
    .unwrap_err();

    let formatted = err.to_string();

    assert!(formatted.starts_with("Error: Undefined variable."));
    assert!(formatted.contains("$missing"));
    assert!(formatted.contains("stdin:2:6"));
}

error!(
    error_rule_terminates_compilation,
    "a {\n  @error \"boom\";\n  color: red;\n}\n",
    "Error: \"boom\""
);

test!(
    warn_does_not_interrupt_compilation,
    "@warn \"careful\";\na {\n  color: red;\n}\n",
    "a {\n  color: red;\n}\n",
    thistle::Options::default().quiet(true)
);

test!(
    debug_does_not_interrupt_compilation,
    "@debug 1 + 1;\na {\n  color: red;\n}\n",
    "a {\n  color: red;\n}\n",
    thistle::Options::default().quiet(true)
);
