use std::io::Write;

#[macro_use]
mod macros;

test!(
    use_builtin_math_module,
    "@use \"sass:math\";\na {\n  v: math.div(10, 4);\n  w: math.unit(1px);\n}\n",
    "a {\n  v: 2.5;\n  w: \"px\";\n}\n"
);

test!(
    use_builtin_module_with_custom_namespace,
    "@use \"sass:string\" as str;\na {\n  v: str.to-upper-case(\"abc\");\n}\n",
    "a {\n  v: \"ABC\";\n}\n"
);

test!(
    use_builtin_map_module,
    "@use \"sass:map\";\na {\n  v: map.get((a: 1), a);\n  w: inspect(map.deep-merge((a: (b: 1)), (a: (c: 2))));\n}\n",
    "a {\n  v: 1;\n  w: (a: (b: 1, c: 2));\n}\n"
);

test!(
    use_builtin_meta_module,
    "@use \"sass:meta\";\na {\n  v: meta.type-of(1px);\n}\n",
    "a {\n  v: number;\n}\n"
);

test!(
    math_module_variables,
    "@use \"sass:math\";\na {\n  v: math.floor(math.$pi);\n}\n",
    "a {\n  v: 3;\n}\n"
);

#[test]
fn use_file_with_namespace() {
    tempfile!(
        "use_file_with_namespace.scss",
        "$size: 10px;\n@function double($n) {\n  @return $n * 2;\n}\n"
    );

    let input = "@use \"use_file_with_namespace\" as lib;\na {\n  v: lib.$size;\n  w: lib.double(4);\n}\n";

    assert_eq!(
        "a {\n  v: 10px;\n  w: 8;\n}\n",
        thistle::from_string(input.to_string(), &thistle::Options::default()).unwrap()
    );
}

#[test]
fn use_file_with_configuration() {
    tempfile!(
        "use_file_with_configuration.scss",
        "$color: red !default;\na {\n  color: $color;\n}\n"
    );

    let input = "@use \"use_file_with_configuration\" with ($color: blue);\n";

    assert_eq!(
        "a {\n  color: blue;\n}\n",
        thistle::from_string(input.to_string(), &thistle::Options::default()).unwrap()
    );
}

#[test]
fn use_file_default_not_overridden_without_config() {
    tempfile!(
        "use_file_plain_default.scss",
        "$color: red !default;\na {\n  color: $color;\n}\n"
    );

    let input = "@use \"use_file_plain_default\";\n";

    assert_eq!(
        "a {\n  color: red;\n}\n",
        thistle::from_string(input.to_string(), &thistle::Options::default()).unwrap()
    );
}

#[test]
fn module_is_loaded_at_most_once() {
    tempfile!(
        "use_loaded_once.scss",
        "a {\n  color: red;\n}\n"
    );

    let input =
        "@use \"use_loaded_once\" as one;\n@use \"use_loaded_once\" as two;\nb {\n  color: blue;\n}\n";

    assert_eq!(
        "a {\n  color: red;\n}\n\nb {\n  color: blue;\n}\n",
        thistle::from_string(input.to_string(), &thistle::Options::default()).unwrap()
    );
}

#[test]
fn configuring_an_already_loaded_module_is_an_error() {
    tempfile!(
        "use_configure_twice.scss",
        "$color: red !default;\na {\n  color: $color;\n}\n"
    );

    let input = "@use \"use_configure_twice\" as one;\n@use \"use_configure_twice\" as two with ($color: blue);\n";

    match thistle::from_string(input.to_string(), &thistle::Options::default()) {
        Ok(..) => panic!("did not fail"),
        Err(e) => assert_eq!(
            "Error: This module was already loaded, so it can't be configured using \"with\".",
            e.to_string()
                .chars()
                .take_while(|c| *c != '\n')
                .collect::<String>()
                .as_str()
        ),
    }
}

#[test]
fn configuring_a_variable_without_default_is_an_error() {
    tempfile!(
        "use_configure_no_default.scss",
        "$color: red;\na {\n  color: $color;\n}\n"
    );

    let input = "@use \"use_configure_no_default\" with ($color: blue);\n";

    match thistle::from_string(input.to_string(), &thistle::Options::default()) {
        Ok(..) => panic!("did not fail"),
        Err(e) => assert_eq!(
            "Error: This variable was not declared with !default in the @used module.",
            e.to_string()
                .chars()
                .take_while(|c| *c != '\n')
                .collect::<String>()
                .as_str()
        ),
    }
}

#[test]
fn namespaced_variable_assignment_writes_through() {
    tempfile!("use_write_through.scss", "$count: 1;\n");

    let input = "@use \"use_write_through\" as lib;\nlib.$count: 2;\na {\n  v: lib.$count;\n}\n";

    assert_eq!(
        "a {\n  v: 2;\n}\n",
        thistle::from_string(input.to_string(), &thistle::Options::default()).unwrap()
    );
}

#[test]
fn use_as_star_merges_into_global_scope() {
    tempfile!("use_star.scss", "$size: 4px;\n");

    let input = "@use \"use_star\" as *;\na {\n  v: $size;\n}\n";

    assert_eq!(
        "a {\n  v: 4px;\n}\n",
        thistle::from_string(input.to_string(), &thistle::Options::default()).unwrap()
    );
}

#[test]
fn private_members_are_not_visible() {
    tempfile!("use_private.scss", "$-secret: 1;\n$public: 2;\n");

    let input = "@use \"use_private\" as lib;\na {\n  v: lib.$-secret;\n}\n";

    match thistle::from_string(input.to_string(), &thistle::Options::default()) {
        Ok(..) => panic!("did not fail"),
        Err(e) => assert_eq!(
            "Error: Private members can't be accessed from outside their modules.",
            e.to_string()
                .chars()
                .take_while(|c| *c != '\n')
                .collect::<String>()
                .as_str()
        ),
    }
}

#[test]
fn forward_reexports_members() {
    tempfile!("forward_inner_lib.scss", "$size: 10px;\n");
    tempfile!(
        "forward_middle_lib.scss",
        "@forward \"forward_inner_lib\";\n"
    );

    let input = "@use \"forward_middle_lib\" as lib;\na {\n  v: lib.$size;\n}\n";

    assert_eq!(
        "a {\n  v: 10px;\n}\n",
        thistle::from_string(input.to_string(), &thistle::Options::default()).unwrap()
    );
}

#[test]
fn forward_show_filters_members() {
    tempfile!("forward_show_inner.scss", "$shown: 1;\n$hidden: 2;\n");
    tempfile!(
        "forward_show_middle.scss",
        "@forward \"forward_show_inner\" show $shown;\n"
    );

    let input = "@use \"forward_show_middle\" as lib;\na {\n  v: lib.$hidden;\n}\n";

    match thistle::from_string(input.to_string(), &thistle::Options::default()) {
        Ok(..) => panic!("did not fail"),
        Err(e) => assert_eq!(
            "Error: Undefined variable.",
            e.to_string()
                .chars()
                .take_while(|c| *c != '\n')
                .collect::<String>()
                .as_str()
        ),
    }
}

#[test]
fn forward_with_prefix() {
    tempfile!("forward_prefix_inner.scss", "$size: 10px;\n");
    tempfile!(
        "forward_prefix_middle.scss",
        "@forward \"forward_prefix_inner\" as lib-*;\n"
    );

    let input = "@use \"forward_prefix_middle\" as mid;\na {\n  v: mid.$lib-size;\n}\n";

    assert_eq!(
        "a {\n  v: 10px;\n}\n",
        thistle::from_string(input.to_string(), &thistle::Options::default()).unwrap()
    );
}

#[test]
fn forward_with_configuration_default() {
    tempfile!(
        "forward_config_inner.scss",
        "$color: red !default;\na {\n  color: $color;\n}\n"
    );
    tempfile!(
        "forward_config_middle.scss",
        "@forward \"forward_config_inner\" with ($color: green !default);\n"
    );

    let input = "@use \"forward_config_middle\" with ($color: blue);\n";

    assert_eq!(
        "a {\n  color: blue;\n}\n",
        thistle::from_string(input.to_string(), &thistle::Options::default()).unwrap()
    );
}

#[test]
fn import_merges_into_importer() {
    tempfile!("import_legacy.scss", "$size: 10px;\n.imported {\n  width: $size;\n}\n");

    let input = "@import \"import_legacy\";\na {\n  width: $size;\n}\n";

    assert_eq!(
        ".imported {\n  width: 10px;\n}\n\na {\n  width: 10px;\n}\n",
        thistle::from_string(input.to_string(), &thistle::Options::default()).unwrap()
    );
}

#[test]
fn plain_css_import_passes_through() {
    let input = "@import \"foo.css\";\na {\n  color: red;\n}\n";

    assert_eq!(
        "@import \"foo.css\";\na {\n  color: red;\n}\n",
        thistle::from_string(input.to_string(), &thistle::Options::default()).unwrap()
    );
}

error!(
    use_after_other_rules_is_an_error,
    "a {\n  color: red;\n}\n@use \"sass:math\";\n",
    "Error: @use rules must be written before any other rules."
);

error!(
    unknown_namespace,
    "a {\n  v: missing.$x;\n}\n",
    "Error: There is no module with the namespace \"missing\"."
);
