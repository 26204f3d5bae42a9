#[macro_use]
mod macros;

test!(
    if_true_branch,
    "a {\n  @if 1 + 1 == 2 {\n    color: red;\n  }\n}\n",
    "a {\n  color: red;\n}\n"
);

test!(
    if_else_branch,
    "a {\n  @if false {\n    color: red;\n  } @else {\n    color: blue;\n  }\n}\n",
    "a {\n  color: blue;\n}\n"
);

test!(
    if_else_if_chain,
    "$x: 2;\na {\n  @if $x == 1 {\n    v: one;\n  } @else if $x == 2 {\n    v: two;\n  } @else {\n    v: other;\n  }\n}\n",
    "a {\n  v: two;\n}\n"
);

test!(
    for_through_is_inclusive,
    "@for $i from 1 through 3 {\n  .w-#{$i} {\n    width: $i * 10px;\n  }\n}\n",
    ".w-1 {\n  width: 10px;\n}\n\n.w-2 {\n  width: 20px;\n}\n\n.w-3 {\n  width: 30px;\n}\n"
);

test!(
    for_to_is_exclusive,
    "@for $i from 1 to 3 {\n  .w-#{$i} {\n    width: $i * 10px;\n  }\n}\n",
    ".w-1 {\n  width: 10px;\n}\n\n.w-2 {\n  width: 20px;\n}\n"
);

test!(
    for_counts_downward,
    "@for $i from 3 through 1 {\n  .w-#{$i} {\n    v: $i;\n  }\n}\n",
    ".w-3 {\n  v: 3;\n}\n\n.w-2 {\n  v: 2;\n}\n\n.w-1 {\n  v: 1;\n}\n"
);

test!(
    each_over_list,
    "@each $name in foo, bar {\n  .#{$name} {\n    v: $name;\n  }\n}\n",
    ".foo {\n  v: foo;\n}\n\n.bar {\n  v: bar;\n}\n"
);

test!(
    each_with_destructuring,
    "@each $name, $size in (small, 1px), (large, 2px) {\n  .#{$name} {\n    width: $size;\n  }\n}\n",
    ".small {\n  width: 1px;\n}\n\n.large {\n  width: 2px;\n}\n"
);

test!(
    each_over_map,
    "@each $key, $value in (a: 1, b: 2) {\n  .#{$key} {\n    v: $value;\n  }\n}\n",
    ".a {\n  v: 1;\n}\n\n.b {\n  v: 2;\n}\n"
);

test!(
    while_loop,
    "$i: 1;\n@while $i <= 3 {\n  .w-#{$i} {\n    v: $i;\n  }\n  $i: $i + 1;\n}\n",
    ".w-1 {\n  v: 1;\n}\n\n.w-2 {\n  v: 2;\n}\n\n.w-3 {\n  v: 3;\n}\n"
);

test!(
    loop_variable_is_scoped_per_iteration,
    "@for $i from 1 through 2 {\n  $local: $i;\n}\na {\n  v: variable-exists(local);\n}\n",
    "a {\n  v: false;\n}\n"
);

error!(
    for_bounds_must_be_comparable,
    "@for $i from 1px through 3s {\n  a {\n    v: $i;\n  }\n}\n",
    "Error: Incompatible units px and s."
);
