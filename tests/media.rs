#[macro_use]
mod macros;

test!(
    simple_media_query,
    "@media screen {\n  a {\n    color: red;\n  }\n}\n",
    "@media screen {\n  a {\n    color: red;\n  }\n}\n"
);

test!(
    media_query_with_condition,
    "@media (min-width: 100px) {\n  a {\n    color: red;\n  }\n}\n",
    "@media (min-width: 100px) {\n  a {\n    color: red;\n  }\n}\n"
);

test!(
    media_query_with_type_and_condition,
    "@media screen and (color) {\n  a {\n    color: red;\n  }\n}\n",
    "@media screen and (color) {\n  a {\n    color: red;\n  }\n}\n"
);

test!(
    media_condition_evaluates_expressions,
    "$width: 100px;\n@media (min-width: $width) {\n  a {\n    color: red;\n  }\n}\n",
    "@media (min-width: 100px) {\n  a {\n    color: red;\n  }\n}\n"
);

test!(
    nested_media_queries_merge,
    "@media screen {\n  @media (color) {\n    a {\n      color: red;\n    }\n  }\n}\n",
    "@media screen and (color) {\n  a {\n    color: red;\n  }\n}\n"
);

test!(
    media_nested_in_style_rule_is_hoisted,
    "a {\n  @media screen {\n    color: red;\n  }\n}\n",
    "@media screen {\n  a {\n    color: red;\n  }\n}\n"
);

test!(
    incompatible_nested_media_is_elided,
    "@media screen {\n  @media print {\n    a {\n      color: red;\n    }\n  }\n}\n",
    ""
);

test!(
    media_with_interpolated_query,
    "$query: screen;\n@media #{$query} {\n  a {\n    color: red;\n  }\n}\n",
    "@media screen {\n  a {\n    color: red;\n  }\n}\n"
);

test!(
    supports_rule,
    "@supports (display: flex) {\n  a {\n    display: flex;\n  }\n}\n",
    "@supports (display: flex) {\n  a {\n    display: flex;\n  }\n}\n"
);

test!(
    supports_not_condition,
    "@supports not (display: flex) {\n  a {\n    float: left;\n  }\n}\n",
    "@supports not (display: flex) {\n  a {\n    float: left;\n  }\n}\n"
);

test!(
    supports_nested_in_style_rule,
    "a {\n  @supports (display: flex) {\n    display: flex;\n  }\n}\n",
    "@supports (display: flex) {\n  a {\n    display: flex;\n  }\n}\n"
);

test!(
    at_root_escapes_style_rule,
    ".parent {\n  @at-root .child {\n    color: red;\n  }\n}\n",
    ".child {\n  color: red;\n}\n"
);

test!(
    at_root_without_media,
    "@media print {\n  .a {\n    @at-root (without: media) {\n      .b {\n        color: red;\n      }\n    }\n  }\n}\n",
    ".a .b {\n  color: red;\n}\n"
);

test!(
    at_root_keeps_rule_with_filter,
    "@media print {\n  .a {\n    @at-root (with: media) {\n      .b {\n        color: red;\n      }\n    }\n  }\n}\n",
    "@media print {\n  .b {\n    color: red;\n  }\n}\n"
);
