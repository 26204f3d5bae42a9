#[macro_use]
mod macros;

test!(
    user_defined_function,
    "@function double($n) {\n  @return $n * 2px;\n}\na {\n  w: double(3);\n}\n",
    "a {\n  w: 6px;\n}\n"
);

test!(
    function_with_default_argument,
    "@function scale($n, $factor: 2) {\n  @return $n * $factor;\n}\na {\n  v: scale(3);\n  w: scale(3, 10);\n}\n",
    "a {\n  v: 6;\n  w: 30;\n}\n"
);

test!(
    function_with_control_flow,
    "@function largest($a, $b) {\n  @if $a > $b {\n    @return $a;\n  }\n  @return $b;\n}\na {\n  v: largest(1px, 2px);\n}\n",
    "a {\n  v: 2px;\n}\n"
);

test!(
    recursive_function,
    "@function fib($n) {\n  @if $n <= 1 {\n    @return $n;\n  }\n  @return fib($n - 1) + fib($n - 2);\n}\na {\n  v: fib(10);\n}\n",
    "a {\n  v: 55;\n}\n"
);

test!(
    function_rest_arguments,
    "@function sum($nums...) {\n  $total: 0;\n  @each $n in $nums {\n    $total: $total + $n;\n  }\n  @return $total;\n}\na {\n  v: sum(1, 2, 3);\n}\n",
    "a {\n  v: 6;\n}\n"
);

test!(
    functions_are_first_class,
    "@function double($n) {\n  @return $n * 2;\n}\na {\n  v: call(get-function(\"double\"), 21);\n}\n",
    "a {\n  v: 42;\n}\n"
);

test!(
    function_exists_builtin,
    "@function f() {\n  @return 1;\n}\na {\n  v: function-exists(f);\n  w: function-exists(missing);\n  x: function-exists(map-get);\n}\n",
    "a {\n  v: true;\n  w: false;\n  x: true;\n}\n"
);

test!(
    unknown_function_compiles_to_plain_css_call,
    "a {\n  filter: blur(2px);\n}\n",
    "a {\n  filter: blur(2px);\n}\n"
);

test!(
    function_closure_captures_definition_scope,
    "$x: outer;\n@function get() {\n  @return $x;\n}\na {\n  $x: inner;\n  v: get();\n}\n",
    "a {\n  v: outer;\n}\n"
);

error!(
    function_without_return,
    "@function f() {\n  $x: 1;\n}\na {\n  v: f();\n}\n",
    "Error: Function finished without @return."
);

error!(
    return_outside_function,
    "a {\n  @return 1;\n}\n",
    "Error: This at-rule is not allowed here."
);

error!(
    function_may_not_contain_style_rules,
    "@function f() {\n  a {\n    color: red;\n  }\n}\na {\n  v: f();\n}\n",
    "Error: @function rules may not contain style rules."
);

error!(
    runaway_recursion_is_caught,
    "@function r($n) {\n  @return r($n);\n}\na {\n  v: r(1);\n}\n",
    "Error: Maximum nesting depth of 32 exceeded.",
    thistle::Options::default().max_depth(32)
);
