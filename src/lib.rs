/*! # thistle

A Sass/SCSS compiler in pure Rust.

Given SCSS source text, `thistle` produces CSS (in one of four output
styles) and, optionally, a source map.

## Use as a library
```no_run
fn main() -> Result<(), Box<thistle::Error>> {
    let css = thistle::from_string(
        "a { b { color: &; } }".to_owned(),
        &thistle::Options::default(),
    )?;
    assert_eq!(css, "a b {\n  color: a b;\n}\n");
    Ok(())
}
```

## Use as a binary
```bash
cargo install thistle
thistle input.scss
```
*/

#![warn(clippy::all, clippy::cargo, clippy::dbg_macro)]
#![deny(missing_debug_implementations)]
#![allow(
    clippy::use_self,
    clippy::missing_docs_in_private_items,
    clippy::unreachable,
    clippy::module_name_repetitions,
    clippy::new_ret_no_self,
    clippy::single_match,
    clippy::option_if_let_else,
    clippy::too_many_lines,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::cast_precision_loss,
    clippy::float_cmp,
    clippy::wildcard_imports,
    clippy::comparison_chain,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::multiple_crate_versions,
    clippy::redundant_pub_crate,
    clippy::items_after_statements,
    clippy::uninlined_format_args,
    unknown_lints
)]

use std::path::Path;

use codemap::CodeMap;

pub use crate::error::{CompileResult as Result, Error, ErrorKind};
pub use crate::fs::{Fs, NullFs, StdFs};
pub use crate::logger::{Logger, NullLogger, StdLogger};
pub use crate::options::{Options, OutputStyle};
pub use crate::sourcemap::SourceMap;

use crate::{evaluate::Evaluator, lexer::Lexer, parse::ScssParser};

mod ast;
mod builtin;
mod color;
mod common;
mod context_flags;
mod error;
mod evaluate;
mod fs;
mod interner;
mod lexer;
mod logger;
mod options;
mod parse;
mod selector;
mod serializer;
mod sourcemap;
mod unit;
mod utils;
mod value;

/// The result of a compilation: the CSS text plus the source map when one
/// was requested via [`Options::source_map`].
#[derive(Debug)]
pub struct CompileOutput {
    pub css: String,
    pub source_map: Option<String>,
}

fn compile_with_file_name(
    input: String,
    file_name: &str,
    options: &Options,
) -> Result<CompileOutput> {
    let mut map = CodeMap::new();
    let file = map.add_file(file_name.to_owned(), input);
    let empty_span = file.span.subspan(0, 0);
    let lexer = Lexer::new_from_file(&file);

    let path = Path::new(file_name);

    let stylesheet = ScssParser::new(lexer, &mut map, options, empty_span, path)
        .parse()
        .map_err(|e| e.render(&map, options.unicode_error_messages))?;

    let mut evaluator = Evaluator::new(path, options, &mut map, empty_span);

    let visited = evaluator
        .run_stylesheet(stylesheet)
        .and_then(|()| evaluator.finish());

    let stmts = visited.map_err(|e| e.render(&map, options.unicode_error_messages))?;

    let (css, mappings) =
        serializer::render(stmts, options, &map, empty_span, options.allows_charset)
            .map_err(|e| e.render(&map, options.unicode_error_messages))?;

    let source_map = if options.source_map {
        let output_name = format!(
            "{}.css",
            Path::new(file_name)
                .file_stem()
                .map_or_else(|| "stdin".to_owned(), |s| s.to_string_lossy().into_owned())
        );

        Some(
            sourcemap::build_source_map(
                &css,
                &output_name,
                &mappings,
                &map,
                options.source_map_contents,
            )
            .to_json(),
        )
    } else {
        None
    };

    Ok(CompileOutput { css, source_map })
}

/// Compile SCSS from a string, returning the CSS text.
pub fn from_string(input: String, options: &Options) -> Result<String> {
    Ok(compile_with_file_name(input, "stdin", options)?.css)
}

/// Compile SCSS from a path, returning the CSS text.
///
/// Files that are not valid UTF-8 are rejected.
pub fn from_path<P: AsRef<Path>>(p: P, options: &Options) -> Result<String> {
    Ok(compile_path(p, options)?.css)
}

/// Compile SCSS from a string, including the source map when requested.
pub fn compile_string(input: String, options: &Options) -> Result<CompileOutput> {
    compile_with_file_name(input, "stdin", options)
}

/// Compile SCSS from a path, including the source map when requested.
pub fn compile_path<P: AsRef<Path>>(p: P, options: &Options) -> Result<CompileOutput> {
    let path = p.as_ref();
    compile_with_file_name(
        String::from_utf8(options.fs.read(path)?)?,
        &path.to_string_lossy(),
        options,
    )
}
