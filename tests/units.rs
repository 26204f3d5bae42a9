#[macro_use]
mod macros;

test!(
    addition_with_same_unit,
    "a {\n  v: 1px + 2px;\n}\n",
    "a {\n  v: 3px;\n}\n"
);

test!(
    addition_converts_comparable_units,
    "a {\n  v: 1in + 2cm;\n}\n",
    "a {\n  v: 1.7874in;\n}\n"
);

test!(
    addition_with_unitless_operand,
    "a {\n  v: 1px + 2;\n}\n",
    "a {\n  v: 3px;\n}\n"
);

test!(
    multiplication_cancels_units,
    "a {\n  v: (6px / 2px);\n}\n",
    "a {\n  v: 3;\n}\n",
    thistle::Options::default().quiet(true)
);

test!(
    multiplication_by_unitless_keeps_unit,
    "a {\n  v: 2px * 3;\n}\n",
    "a {\n  v: 6px;\n}\n"
);

test!(
    product_divided_by_factor_round_trips,
    "a {\n  v: (2px * 3 / 3);\n}\n",
    "a {\n  v: 2px;\n}\n",
    thistle::Options::default().quiet(true)
);

test!(
    modulo_follows_right_sign,
    "a {\n  v: 7 % 3;\n  w: -7 % 3;\n}\n",
    "a {\n  v: 1;\n  w: 2;\n}\n"
);

test!(
    comparisons_convert_units,
    "a {\n  v: 1in > 2cm;\n  w: 25mm > 1in;\n}\n",
    "a {\n  v: true;\n  w: false;\n}\n"
);

test!(
    unit_and_unitless_builtins,
    "a {\n  v: unit(1px);\n  w: unitless(1);\n  x: unitless(1em);\n  y: comparable(1px, 1in);\n  z: comparable(1px, 1s);\n}\n",
    "a {\n  v: \"px\";\n  w: true;\n  x: false;\n  y: true;\n  z: false;\n}\n"
);

test!(
    angle_conversion,
    "a {\n  v: 180deg + 200grad;\n}\n",
    "a {\n  v: 360deg;\n}\n"
);

test!(
    time_conversion,
    "a {\n  v: 1s + 500ms;\n}\n",
    "a {\n  v: 1.5s;\n}\n"
);

test!(
    percentage_builtin,
    "a {\n  v: percentage(0.25);\n}\n",
    "a {\n  v: 25%;\n}\n"
);

test!(
    rounding_builtins,
    "a {\n  v: round(1.5px);\n  w: ceil(1.2px);\n  x: floor(1.8px);\n  y: abs(-3px);\n}\n",
    "a {\n  v: 2px;\n  w: 2px;\n  x: 1px;\n  y: 3px;\n}\n"
);

test!(
    min_and_max_convert_units,
    "a {\n  v: min(1in, 2cm);\n  w: max(1px, 2px, 3px);\n}\n",
    "a {\n  v: 2cm;\n  w: 3px;\n}\n"
);

error!(
    incompatible_unit_addition,
    "a {\n  v: 1px + 1s;\n}\n",
    "Error: Incompatible units s and px."
);

error!(
    incompatible_unit_comparison,
    "a {\n  v: 1px > 1s;\n}\n",
    "Error: Incompatible units s and px."
);

error!(
    division_by_zero,
    "a {\n  v: (1 / 0);\n}\n",
    "Error: Division by zero.",
    thistle::Options::default().quiet(true)
);

error!(
    modulo_by_zero,
    "a {\n  v: 1 % 0;\n}\n",
    "Error: Modulo by zero."
);
