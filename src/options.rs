use std::path::{Path, PathBuf};

use crate::{Fs, Logger, StdFs, StdLogger};

/// Configuration for a compilation.
///
/// The simplest usage is `thistle::Options::default()`; a builder pattern is
/// exposed for more control.
#[derive(Debug)]
pub struct Options<'a> {
    pub(crate) fs: &'a dyn Fs,
    pub(crate) logger: &'a dyn Logger,
    pub(crate) style: OutputStyle,
    pub(crate) load_paths: Vec<PathBuf>,
    pub(crate) precision: usize,
    pub(crate) allows_charset: bool,
    pub(crate) unicode_error_messages: bool,
    pub(crate) quiet: bool,
    pub(crate) max_depth: usize,
    pub(crate) source_map: bool,
    pub(crate) source_map_contents: bool,
    pub(crate) error_on_unsatisfied_extend: bool,
}

impl Default for Options<'_> {
    #[inline]
    fn default() -> Self {
        Self {
            fs: &StdFs,
            logger: &StdLogger,
            style: OutputStyle::Expanded,
            load_paths: Vec::new(),
            precision: 5,
            allows_charset: true,
            unicode_error_messages: true,
            quiet: false,
            max_depth: 512,
            source_map: false,
            source_map_contents: false,
            error_on_unsatisfied_extend: true,
        }
    }
}

impl<'a> Options<'a> {
    /// Control the file system the compiler sees when resolving imports.
    ///
    /// By default [`StdFs`] is used, giving direct access to the local file
    /// system.
    #[must_use]
    #[inline]
    pub fn fs(mut self, fs: &'a dyn Fs) -> Self {
        self.fs = fs;
        self
    }

    /// Control where `@warn` and `@debug` messages go.
    ///
    /// By default [`StdLogger`] writes them to standard error.
    #[must_use]
    #[inline]
    pub fn logger(mut self, logger: &'a dyn Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Select one of the four output styles. The default is
    /// [`OutputStyle::Expanded`].
    #[must_use]
    #[inline]
    pub const fn style(mut self, style: OutputStyle) -> Self {
        self.style = style;
        self
    }

    /// Silence all warnings and `@debug` output.
    #[must_use]
    #[inline]
    pub const fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// The number of decimal digits emitted for fractional values.
    ///
    /// Defaults to 5. Trailing zeros are always trimmed.
    #[must_use]
    #[inline]
    pub const fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Append a directory to the list searched when resolving `@use`,
    /// `@forward`, and `@import` URLs that don't match a file relative to the
    /// importing stylesheet.
    #[must_use]
    #[inline]
    pub fn load_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.load_paths.push(path.as_ref().to_owned());
        self
    }

    /// Append multiple load paths. Does not remove existing ones.
    #[must_use]
    #[inline]
    pub fn load_paths<P: AsRef<Path>>(mut self, paths: &[P]) -> Self {
        for path in paths {
            self.load_paths.push(path.as_ref().to_owned());
        }

        self
    }

    /// Whether to emit a `@charset "UTF-8";` declaration (or a byte-order
    /// mark under the compressed style) when the output contains non-ASCII
    /// characters. Defaults to `true`.
    #[must_use]
    #[inline]
    pub const fn allows_charset(mut self, allows_charset: bool) -> Self {
        self.allows_charset = allows_charset;
        self
    }

    /// Emit only ASCII characters in error messages.
    #[must_use]
    #[inline]
    pub const fn unicode_error_messages(mut self, unicode_error_messages: bool) -> Self {
        self.unicode_error_messages = unicode_error_messages;
        self
    }

    /// The maximum depth of rule nesting and callable recursion before
    /// compilation aborts with a stack error. Defaults to 512.
    #[must_use]
    #[inline]
    pub const fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Generate a source map alongside the CSS output.
    #[must_use]
    #[inline]
    pub const fn source_map(mut self, source_map: bool) -> Self {
        self.source_map = source_map;
        self
    }

    /// Embed the full source text of every input file in the source map's
    /// `sourcesContent` field.
    #[must_use]
    #[inline]
    pub const fn source_map_contents(mut self, source_map_contents: bool) -> Self {
        self.source_map_contents = source_map_contents;
        self
    }

    /// Whether `@extend` targeting a selector that appears in no rule is a
    /// hard error. When `false`, it is reported as a warning instead.
    /// `!optional` always suppresses it. Defaults to `true`.
    #[must_use]
    #[inline]
    pub const fn error_on_unsatisfied_extend(mut self, error: bool) -> Self {
        self.error_on_unsatisfied_extend = error;
        self
    }

    pub(crate) fn is_compressed(&self) -> bool {
        matches!(self.style, OutputStyle::Compressed)
    }
}

/// The formatting applied when serializing the resolved CSS tree.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputStyle {
    /// Child rules indented below the rules they were nested in, closing
    /// braces on the final declaration's line.
    Nested,

    /// Each selector and declaration on its own line. The default.
    Expanded,

    /// Each rule on a single line.
    Compact,

    /// As few characters as possible, the entire stylesheet on one line.
    Compressed,
}
