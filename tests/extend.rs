#[macro_use]
mod macros;

test!(
    basic_extend,
    ".a {\n  color: red;\n}\n.b {\n  @extend .a;\n}\n",
    ".a,\n.b {\n  color: red;\n}\n"
);

test!(
    extend_registered_after_target,
    ".b {\n  @extend .a;\n  x: y;\n}\n.a {\n  color: red;\n}\n",
    ".b {\n  x: y;\n}\n\n.a,\n.b {\n  color: red;\n}\n"
);

test!(
    extend_placeholder,
    "%base {\n  color: red;\n}\n.a {\n  @extend %base;\n}\n",
    ".a {\n  color: red;\n}\n"
);

test!(
    extend_applies_to_descendant_selectors,
    ".a .b {\n  color: red;\n}\n.c {\n  @extend .b;\n}\n",
    ".a .b,\n.a .c {\n  color: red;\n}\n"
);

test!(
    extend_is_transitive,
    ".a {\n  color: red;\n}\n.b {\n  @extend .a;\n}\n.c {\n  @extend .b;\n}\n",
    ".a,\n.b,\n.c {\n  color: red;\n}\n"
);

test!(
    extend_within_same_media_context,
    "@media print {\n  .a {\n    color: red;\n  }\n  .b {\n    @extend .a;\n  }\n}\n",
    "@media print {\n  .a,\n  .b {\n    color: red;\n  }\n}\n"
);

test!(
    optional_extend_with_no_target,
    ".b {\n  @extend .a !optional;\n  color: red;\n}\n",
    ".b {\n  color: red;\n}\n"
);

test!(
    unsatisfied_extend_downgrades_to_warning_when_configured,
    ".b {\n  @extend .a;\n  color: red;\n}\n",
    ".b {\n  color: red;\n}\n",
    thistle::Options::default()
        .quiet(true)
        .error_on_unsatisfied_extend(false)
);

test!(
    extend_compound_target_selector,
    ".a.b {\n  color: red;\n}\n.c {\n  @extend .a;\n}\n",
    ".a.b,\n.b.c {\n  color: red;\n}\n"
);

test!(
    selector_extend_function,
    "a {\n  b: selector-extend(\".a .b\", \".b\", \".c\");\n}\n",
    "a {\n  b: .a .b, .a .c;\n}\n"
);

test!(
    selector_replace_function,
    "a {\n  b: selector-replace(\".a .b\", \".b\", \".c\");\n}\n",
    "a {\n  b: .a .c;\n}\n"
);

test!(
    selector_unify_function,
    "a {\n  b: selector-unify(\".a\", \".b\");\n}\n",
    "a {\n  b: .a.b;\n}\n"
);

test!(
    is_superselector_function,
    "a {\n  b: is-superselector(\"a\", \"a.b\");\n  c: is-superselector(\"a.b\", \"a\");\n}\n",
    "a {\n  b: true;\n  c: false;\n}\n"
);

error!(
    unsatisfied_extend_is_an_error,
    ".b {\n  @extend .a;\n}\n",
    "Error: The target selector was not found."
);

error!(
    extend_across_media_queries,
    "@media print {\n  .a {\n    @extend .b;\n  }\n}\n.b {\n  x: 1;\n}\n",
    "Error: You may not @extend selectors across media queries."
);

error!(
    extend_complex_selector,
    ".a {\n  color: red;\n}\n.b {\n  @extend .a .c;\n}\n",
    "Error: complex selectors may not be extended."
);

error!(
    extend_outside_style_rule,
    "@extend .a;\n",
    "Error: @extend may only be used within style rules."
);
