use std::{
    fs::OpenOptions,
    io::{stdin, stdout, Read, Write},
    path::Path,
    process::ExitCode,
};

use clap::{builder::PossibleValue, value_parser, Arg, ArgAction, Command, ValueEnum};

use thistle::{compile_path, compile_string, Options, OutputStyle};

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum Style {
    Nested,
    Expanded,
    Compact,
    Compressed,
}

impl ValueEnum for Style {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Nested, Self::Expanded, Self::Compact, Self::Compressed]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            Self::Nested => PossibleValue::new("nested"),
            Self::Expanded => PossibleValue::new("expanded"),
            Self::Compact => PossibleValue::new("compact"),
            Self::Compressed => PossibleValue::new("compressed"),
        })
    }
}

impl From<Style> for OutputStyle {
    fn from(style: Style) -> Self {
        match style {
            Style::Nested => OutputStyle::Nested,
            Style::Expanded => OutputStyle::Expanded,
            Style::Compact => OutputStyle::Compact,
            Style::Compressed => OutputStyle::Compressed,
        }
    }
}

fn cli() -> Command {
    Command::new("thistle")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A Sass compiler written purely in Rust")
        .arg(
            Arg::new("STDIN")
                .action(ArgAction::SetTrue)
                .long("stdin")
                .help("Read the stylesheet from stdin"),
        )
        .arg(
            Arg::new("LOAD_PATH")
                .short('I')
                .long("load-path")
                .help("A path to use when resolving imports. May be passed multiple times.")
                .action(ArgAction::Append)
                .value_parser(value_parser!(String))
                .num_args(1),
        )
        .arg(
            Arg::new("STYLE")
                // Kept for compatibility with ruby sass.
                .short_alias('t')
                .short('s')
                .long("style")
                .help("Output style")
                .default_value("expanded")
                .ignore_case(true)
                .num_args(1)
                .value_parser(value_parser!(Style)),
        )
        .arg(
            Arg::new("PRECISION")
                .long("precision")
                .help("Number of digits after the decimal point to emit")
                .default_value("5")
                .num_args(1)
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("SOURCE_MAP")
                .action(ArgAction::SetTrue)
                .long("source-map")
                .help("Generate a source map alongside the CSS output"),
        )
        .arg(
            Arg::new("SOURCE_MAP_CONTENTS")
                .action(ArgAction::SetTrue)
                .long("source-map-contents")
                .help("Embed source file contents in the source map"),
        )
        .arg(
            Arg::new("ERROR_ON_UNSATISFIED_EXTEND")
                .action(ArgAction::Set)
                .long("error-on-unsatisfied-extend")
                .help("Whether @extend with no matching target aborts compilation")
                .default_value("true")
                .num_args(1)
                .value_parser(value_parser!(bool)),
        )
        .arg(
            Arg::new("NO_CHARSET")
                .action(ArgAction::SetTrue)
                .long("no-charset")
                .help("Don't emit a @charset or BOM for CSS with non-ASCII characters"),
        )
        .arg(
            Arg::new("QUIET")
                .action(ArgAction::SetTrue)
                .short('q')
                .long("quiet")
                .help("Don't print warnings"),
        )
        .arg(Arg::new("INPUT").help("SCSS files"))
        .arg(Arg::new("OUTPUT").help("Output CSS file"))
}

fn main() -> ExitCode {
    let matches = cli().get_matches();

    let load_paths = matches
        .get_many::<String>("LOAD_PATH")
        .map_or_else(Vec::new, |paths| paths.map(Path::new).collect());

    let style: OutputStyle = (*matches.get_one::<Style>("STYLE").unwrap()).into();

    let options = Options::default()
        .style(style)
        .precision(*matches.get_one::<usize>("PRECISION").unwrap())
        .quiet(matches.get_flag("QUIET"))
        .allows_charset(!matches.get_flag("NO_CHARSET"))
        .source_map(matches.get_flag("SOURCE_MAP"))
        .source_map_contents(matches.get_flag("SOURCE_MAP_CONTENTS"))
        .error_on_unsatisfied_extend(
            *matches
                .get_one::<bool>("ERROR_ON_UNSATISFIED_EXTEND")
                .unwrap(),
        )
        .load_paths(&load_paths);

    let result = if let Some(name) = matches.get_one::<String>("INPUT") {
        compile_path(name, &options)
    } else if matches.get_flag("STDIN") {
        let mut buffer = String::new();
        if let Err(e) = stdin().read_to_string(&mut buffer) {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
        compile_string(buffer, &options)
    } else {
        let _ = cli().print_long_help();
        return ExitCode::FAILURE;
    };

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match matches.get_one::<String>("OUTPUT") {
        Some(path) => {
            let mut file = match OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
            {
                Ok(file) => file,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            };

            if let Err(e) = file.write_all(output.css.as_bytes()) {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }

            if let Some(source_map) = output.source_map {
                let map_path = format!("{}.map", path);
                if let Err(e) = std::fs::write(&map_path, source_map) {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => {
            let mut out = stdout();
            if out.write_all(output.css.as_bytes()).is_err() {
                return ExitCode::FAILURE;
            }

            if let Some(source_map) = output.source_map {
                let _ = out.write_all(b"\n");
                let _ = out.write_all(source_map.as_bytes());
            }
        }
    }

    ExitCode::SUCCESS
}
