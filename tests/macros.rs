/// Compile the input and compare the CSS output.
#[macro_export]
macro_rules! test {
    (@base $( #[$attr:meta] ),*$func:ident, $input:expr, $output:expr, $options:expr) => {
        $(#[$attr])*
        #[test]
        #[allow(non_snake_case)]
        fn $func() {
            let css = thistle::from_string($input.to_string(), &$options)
                .expect(concat!("failed to compile ", $input));
            assert_eq!(String::from($output), css);
        }
    };
    ($( #[$attr:meta] ),*$func:ident, $input:expr, $output:expr, $options:expr) => {
        test!(@base $(#[$attr])* $func, $input, $output, $options);
    };
    ($( #[$attr:meta] ),*$func:ident, $input:expr, $output:expr) => {
        test!(@base $(#[$attr])* $func, $input, $output, thistle::Options::default());
    };
}

/// Verify the error *message* (the first line of the formatted error).
#[macro_export]
macro_rules! error {
    (@base $( #[$attr:meta] ),*$func:ident, $input:expr, $err:expr, $options:expr) => {
        $(#[$attr])*
        #[test]
        #[allow(non_snake_case)]
        fn $func() {
            match thistle::from_string($input.to_string(), &$options) {
                Ok(..) => panic!("did not fail"),
                Err(e) => assert_eq!(
                    $err,
                    e.to_string()
                        .chars()
                        .take_while(|c| *c != '\n')
                        .collect::<String>()
                        .as_str()
                ),
            }
        }
    };
    ($( #[$attr:meta] ),*$func:ident, $input:expr, $err:expr) => {
        error!(@base $(#[$attr])* $func, $input, $err, thistle::Options::default());
    };
    ($( #[$attr:meta] ),*$func:ident, $input:expr, $err:expr, $options:expr) => {
        error!(@base $(#[$attr])* $func, $input, $err, $options);
    };
}

/// Create a temporary file with the given name and contents in the current
/// directory, deleted when it falls out of scope.
#[macro_export]
macro_rules! tempfile {
    ($name:literal, $content:literal) => {
        let mut f = tempfile::Builder::new()
            .rand_bytes(0)
            .prefix("")
            .suffix($name)
            .tempfile_in("")
            .unwrap();
        write!(f, "{}", $content).unwrap();
    };
}
