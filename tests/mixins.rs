#[macro_use]
mod macros;

test!(
    simple_include,
    "@mixin m {\n  color: red;\n}\na {\n  @include m;\n}\n",
    "a {\n  color: red;\n}\n"
);

test!(
    mixin_with_arguments,
    "@mixin pad($x, $y: 2px) {\n  padding: $x $y;\n}\na {\n  @include pad(1px);\n}\nb {\n  @include pad(1px, 3px);\n}\n",
    "a {\n  padding: 1px 2px;\n}\n\nb {\n  padding: 1px 3px;\n}\n"
);

test!(
    mixin_with_named_arguments,
    "@mixin pad($x: 1px, $y: 2px) {\n  padding: $x $y;\n}\na {\n  @include pad($y: 5px);\n}\n",
    "a {\n  padding: 1px 5px;\n}\n"
);

test!(
    mixin_underscore_and_hyphen_names_are_equal,
    "@mixin foo_bar {\n  color: red;\n}\na {\n  @include foo-bar;\n}\n",
    "a {\n  color: red;\n}\n"
);

test!(
    content_block,
    "@mixin m {\n  @content;\n}\n.a {\n  @include m {\n    color: blue;\n  }\n}\n",
    ".a {\n  color: blue;\n}\n"
);

test!(
    content_block_sees_calling_scope,
    "$color: green;\n@mixin m {\n  @content;\n}\n.a {\n  @include m {\n    color: $color;\n  }\n}\n",
    ".a {\n  color: green;\n}\n"
);

test!(
    content_with_arguments,
    "@mixin grid($cols) {\n  @content ($cols * 10px);\n}\n.a {\n  @include grid(3) using ($width) {\n    width: $width;\n  }\n}\n",
    ".a {\n  width: 30px;\n}\n"
);

test!(
    mixin_wrapping_selector,
    "@mixin hover {\n  &:hover {\n    @content;\n  }\n}\n.btn {\n  @include hover {\n    color: red;\n  }\n}\n",
    ".btn:hover {\n  color: red;\n}\n"
);

test!(
    rest_arguments,
    "@mixin shadows($shadows...) {\n  box-shadow: $shadows;\n}\na {\n  @include shadows(1px 1px, 2px 2px);\n}\n",
    "a {\n  box-shadow: 1px 1px, 2px 2px;\n}\n"
);

test!(
    keyword_rest_arguments,
    "@mixin m($args...) {\n  v: map-get(keywords($args), color);\n}\na {\n  @include m($color: red);\n}\n",
    "a {\n  v: red;\n}\n"
);

test!(
    mixin_scope_is_lexical,
    "$x: global;\n@mixin m {\n  v: $x;\n}\n.a {\n  $x: local;\n  @include m;\n}\n",
    ".a {\n  v: global;\n}\n"
);

error!(
    undefined_mixin,
    "a {\n  @include missing;\n}\n",
    "Error: Undefined mixin."
);

error!(
    content_passed_to_mixin_without_content,
    "@mixin m {\n  color: red;\n}\na {\n  @include m {\n    color: blue;\n  }\n}\n",
    "Error: Mixin doesn't accept a content block."
);

error!(
    missing_mixin_argument,
    "@mixin m($x) {\n  v: $x;\n}\na {\n  @include m;\n}\n",
    "Error: Missing argument $x."
);

error!(
    too_many_arguments,
    "@mixin m($x) {\n  v: $x;\n}\na {\n  @include m(1, 2);\n}\n",
    "Error: Only 1 argument allowed, but 2 were passed."
);

error!(
    unknown_named_argument,
    "@mixin m($x: 1) {\n  v: $x;\n}\na {\n  @include m($y: 2);\n}\n",
    "Error: No argument named $y."
);

error!(
    content_outside_mixin,
    "a {\n  @content;\n}\n",
    "Error: @content is only allowed within mixin declarations."
);
