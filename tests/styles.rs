#[macro_use]
mod macros;

test!(
    simple_rule,
    "a {\n  color: red;\n}\n",
    "a {\n  color: red;\n}\n"
);

test!(
    two_rules_are_separated_by_a_blank_line,
    "a {\n  color: red;\n}\nb {\n  color: blue;\n}\n",
    "a {\n  color: red;\n}\n\nb {\n  color: blue;\n}\n"
);

test!(
    nested_rule_flattens_to_descendant_selector,
    ".a {\n  color: red;\n  .b {\n    color: blue;\n  }\n}\n",
    ".a {\n  color: red;\n}\n.a .b {\n  color: blue;\n}\n"
);

test!(
    outer_rule_without_declarations_is_elided,
    ".a {\n  .b {\n    color: blue;\n  }\n}\n",
    ".a .b {\n  color: blue;\n}\n"
);

test!(
    parent_selector_as_value,
    "a {\n  b {\n    color: &;\n  }\n}\n",
    "a b {\n  color: a b;\n}\n"
);

test!(
    parent_selector_suffix,
    ".btn {\n  &-primary {\n    color: blue;\n  }\n}\n",
    ".btn-primary {\n  color: blue;\n}\n"
);

test!(
    parent_selector_pseudo_compound,
    "a {\n  &:hover {\n    color: red;\n  }\n}\n",
    "a:hover {\n  color: red;\n}\n"
);

test!(
    comma_separated_selectors_one_per_line,
    ".a, .b {\n  color: red;\n}\n",
    ".a,\n.b {\n  color: red;\n}\n"
);

test!(
    child_combinator,
    "a > b {\n  color: red;\n}\n",
    "a > b {\n  color: red;\n}\n"
);

test!(
    nested_properties,
    "a {\n  font: {\n    weight: bold;\n    size: 12px;\n  }\n}\n",
    "a {\n  font-weight: bold;\n  font-size: 12px;\n}\n"
);

test!(
    nested_properties_with_value,
    "a {\n  font: 12px {\n    weight: bold;\n  }\n}\n",
    "a {\n  font: 12px;\n  font-weight: bold;\n}\n"
);

test!(
    null_declaration_is_elided,
    "a {\n  color: red !important;\n  color: null;\n}\n",
    "a {\n  color: red !important;\n}\n"
);

test!(
    placeholder_selector_is_invisible,
    "%base {\n  color: red;\n}\na {\n  color: blue;\n}\n",
    "a {\n  color: blue;\n}\n"
);

test!(
    loud_comment_preserved,
    "/* hello */\na {\n  color: red;\n}\n",
    "/* hello */\na {\n  color: red;\n}\n"
);

test!(
    silent_comment_removed,
    "// hello\na {\n  color: red;\n}\n",
    "a {\n  color: red;\n}\n"
);

test!(
    interpolated_selector,
    "$name: cool;\n.#{$name} {\n  color: red;\n}\n",
    ".cool {\n  color: red;\n}\n"
);

test!(
    custom_property_keeps_raw_value,
    "a {\n  --foo:  bar  baz ;\n}\n",
    "a {\n  --foo:  bar  baz ;\n}\n"
);

test!(
    unknown_at_rule_passes_through,
    "@font-face {\n  font-family: foo;\n}\n",
    "@font-face {\n  font-family: foo;\n}\n"
);

test!(
    keyframes_selectors,
    "@keyframes spin {\n  from {\n    transform: rotate(0deg);\n  }\n  to {\n    transform: rotate(360deg);\n  }\n}\n",
    "@keyframes spin {\n  from {\n    transform: rotate(0deg);\n  }\n  to {\n    transform: rotate(360deg);\n  }\n}\n"
);

// Output styles

test!(
    compressed_style,
    "a {\n  color: red;\n  b {\n    color: blue;\n  }\n}\n",
    "a{color:red}a b{color:blue}",
    thistle::Options::default().style(thistle::OutputStyle::Compressed)
);

test!(
    compressed_shortens_colors,
    "a {\n  color: #ffffff;\n}\n",
    "a{color:#fff}",
    thistle::Options::default().style(thistle::OutputStyle::Compressed)
);

test!(
    nested_style_indents_by_source_depth,
    "a {\n  color: red;\n  b {\n    color: blue;\n  }\n}\n",
    "a {\n  color: red; }\n  a b {\n    color: blue; }\n",
    thistle::Options::default().style(thistle::OutputStyle::Nested)
);

test!(
    compact_style_one_line_per_rule,
    "a {\n  color: red;\n  b {\n    color: blue;\n  }\n}\n",
    "a { color: red; }\na b { color: blue; }\n",
    thistle::Options::default().style(thistle::OutputStyle::Compact)
);

test!(
    charset_emitted_for_non_ascii,
    "a {\n  content: \"Ã¼\";\n}\n",
    "@charset \"UTF-8\";\na {\n  content: \"Ã¼\";\n}\n"
);

error!(
    top_level_parent_selector,
    "& {\n  color: red;\n}\n",
    "Error: Top-level selectors may not contain the parent selector \"&\"."
);

error!(
    declaration_outside_style_rule,
    "@mixin m {\n  color: red;\n}\n@include m;\n",
    "Error: Declarations may only be used within style rules."
);
