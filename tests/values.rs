#[macro_use]
mod macros;

test!(
    variable_declaration_and_use,
    "$color: red;\na {\n  color: $color;\n}\n",
    "a {\n  color: red;\n}\n"
);

test!(
    global_assignment_from_inner_scope,
    "$x: 1;\n.a {\n  $x: 2 !global;\n}\n.b {\n  v: $x;\n}\n",
    ".b {\n  v: 2;\n}\n"
);

test!(
    default_assignment_does_not_override,
    "$x: 1;\n$x: 2 !default;\na {\n  v: $x;\n}\n",
    "a {\n  v: 1;\n}\n"
);

test!(
    default_assignment_fills_null,
    "$x: null;\n$x: 2 !default;\na {\n  v: $x;\n}\n",
    "a {\n  v: 2;\n}\n"
);

test!(
    local_declaration_shadows_global,
    "$x: 1;\na {\n  $x: 2;\n  v: $x;\n}\nb {\n  v: $x;\n}\n",
    "a {\n  v: 2;\n}\n\nb {\n  v: 1;\n}\n"
);

test!(
    arithmetic_with_precedence,
    "a {\n  v: 1 + 2 * 3;\n}\n",
    "a {\n  v: 7;\n}\n"
);

test!(
    parens_change_precedence,
    "a {\n  v: (1 + 2) * 3;\n}\n",
    "a {\n  v: 9;\n}\n"
);

test!(
    slash_preserved_between_literal_numbers,
    "a {\n  font: 12px/30px;\n}\n",
    "a {\n  font: 12px/30px;\n}\n"
);

test!(
    parens_force_division,
    "a {\n  v: (12px/30px);\n}\n",
    "a {\n  v: 0.4;\n}\n",
    thistle::Options::default().quiet(true)
);

test!(
    division_with_variable_operand,
    "$w: 100px;\na {\n  v: $w / 2;\n}\n",
    "a {\n  v: 50px;\n}\n",
    thistle::Options::default().quiet(true)
);

test!(
    string_concatenation,
    "a {\n  v: \"foo\" + bar;\n}\n",
    "a {\n  v: \"foobar\";\n}\n"
);

test!(
    unquote_builtin,
    "a {\n  v: unquote(\"foo\");\n}\n",
    "a {\n  v: foo;\n}\n"
);

test!(
    quoted_and_unquoted_strings_compare_equal,
    "a {\n  v: \"foo\" == foo;\n}\n",
    "a {\n  v: true;\n}\n"
);

test!(
    truthiness_of_zero_and_empty_string,
    "a {\n  v: if(0, yes, no);\n  w: if(\"\", yes, no);\n  x: if(null, yes, no);\n  y: if(false, yes, no);\n}\n",
    "a {\n  v: yes;\n  w: yes;\n  x: no;\n  y: no;\n}\n"
);

test!(
    list_operations,
    "$list: 1 2 3;\na {\n  v: length($list);\n  w: nth($list, 2);\n  x: index($list, 3);\n}\n",
    "a {\n  v: 3;\n  w: 2;\n  x: 3;\n}\n"
);

test!(
    list_append_and_join,
    "a {\n  v: append(1 2, 3);\n  w: join((1, 2), (3, 4));\n}\n",
    "a {\n  v: 1 2 3;\n  w: 1, 2, 3, 4;\n}\n"
);

test!(
    negative_index_counts_from_end,
    "a {\n  v: nth(1 2 3, -1);\n}\n",
    "a {\n  v: 3;\n}\n"
);

test!(
    map_get_and_merge,
    "$m: (a: 1, b: 2);\na {\n  v: map-get($m, b);\n  w: map-get(map-merge($m, (c: 3)), c);\n}\n",
    "a {\n  v: 2;\n  w: 3;\n}\n"
);

test!(
    map_get_missing_key_is_null,
    "a {\n  v: inspect(map-get((a: 1), b));\n}\n",
    "a {\n  v: null;\n}\n"
);

test!(
    map_merge_preserves_insertion_order,
    "$m: (a: 1, b: 2);\na {\n  v: map-keys(map-merge($m, (a: 10)));\n}\n",
    "a {\n  v: a, b;\n}\n"
);

test!(
    map_inspect_round_trips,
    "a {\n  v: inspect((a: 1, b: (2, 3)));\n}\n",
    "a {\n  v: (a: 1, b: (2, 3));\n}\n"
);

test!(
    inspect_empty_list,
    "a {\n  v: inspect(());\n}\n",
    "a {\n  v: ();\n}\n"
);

test!(
    type_of_values,
    "a {\n  v: type-of(1px);\n  w: type-of(foo);\n  x: type-of((a: 1));\n  y: type-of(#fff);\n  z: type-of(1 2 3);\n}\n",
    "a {\n  v: number;\n  w: string;\n  x: map;\n  y: color;\n  z: list;\n}\n"
);

test!(
    color_name_round_trips,
    "a {\n  color: RED;\n}\n",
    "a {\n  color: RED;\n}\n"
);

test!(
    color_functions,
    "a {\n  v: red(#102030);\n  w: mix(#000, #fff);\n}\n",
    "a {\n  v: 16;\n  w: gray;\n}\n"
);

test!(
    lighten_and_darken,
    "a {\n  v: lighten(#800000, 10%);\n  w: darken(#800000, 10%);\n}\n",
    "a {\n  v: #b30000;\n  w: #4d0000;\n}\n"
);

test!(
    rgba_output,
    "a {\n  v: rgba(10, 20, 30, 0.5);\n}\n",
    "a {\n  v: rgba(10, 20, 30, 0.5);\n}\n"
);

test!(
    string_functions,
    "a {\n  v: str-length(\"hello\");\n  w: to-upper-case(\"abc\");\n  x: str-slice(\"abcde\", 2, 4);\n  y: str-index(\"abc\", \"b\");\n}\n",
    "a {\n  v: 5;\n  w: \"ABC\";\n  x: \"bcd\";\n  y: 2;\n}\n"
);

test!(
    interpolation_unquotes,
    "$x: \"foo\";\na {\n  v: \"#{$x}-bar\";\n  w: #{$x}-bar;\n}\n",
    "a {\n  v: \"foo-bar\";\n  w: foo-bar;\n}\n"
);

test!(
    calc_passes_through,
    "a {\n  width: calc(100% - 20px);\n}\n",
    "a {\n  width: calc(100% - 20px);\n}\n"
);

test!(
    calc_with_interpolation,
    "$x: 20px;\na {\n  width: calc(100% - #{$x});\n}\n",
    "a {\n  width: calc(100% - 20px);\n}\n"
);

test!(
    important_flag,
    "a {\n  color: red !important;\n}\n",
    "a {\n  color: red !important;\n}\n"
);

test!(
    precision_trims_to_five_digits,
    "a {\n  v: (1 / 3);\n}\n",
    "a {\n  v: 0.33333;\n}\n",
    thistle::Options::default().quiet(true)
);

test!(
    precision_is_configurable,
    "a {\n  v: (1 / 3);\n}\n",
    "a {\n  v: 0.3333333333;\n}\n",
    thistle::Options::default().quiet(true).precision(10)
);

error!(
    duplicate_map_key,
    "a {\n  v: map-get((a: 1, a: 2), a);\n}\n",
    "Error: Duplicate key."
);

error!(
    undefined_variable,
    "a {\n  v: $missing;\n}\n",
    "Error: Undefined variable."
);

error!(
    undefined_operation_on_colors,
    "a {\n  v: #102030 * 2;\n}\n",
    "Error: Undefined operation \"#102030 * 2\"."
);
