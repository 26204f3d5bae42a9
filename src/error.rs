use std::{
    error::Error as StdError,
    fmt::{self, Display},
    io,
    string::FromUtf8Error,
    sync::Arc,
};

use codemap::{Span, SpanLoc};

pub type CompileResult<T> = Result<T, Box<Error>>;

/// The category of a compilation error.
///
/// Kinds are stable across releases; messages are not.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A parse-level or semantically invalid construct.
    InvalidSyntax,
    /// A built-in function received a value of the wrong type.
    InvalidArgumentType,
    /// A mandatory argument was absent after binding.
    MissingArgument,
    /// A keyword-rest map had a non-string key.
    InvalidVarKwdType,
    /// A map literal contained a duplicate key.
    DuplicateKey,
    /// Division by zero in a numeric context.
    ZeroDivision,
    /// Arithmetic between numbers with incompatible units.
    IncompatibleUnits,
    /// An operator is not defined for the given operand types.
    UndefinedOperation,
    /// An operator was applied to `null`.
    InvalidNullOperation,
    /// The nesting or recursion limit was exceeded.
    StackError,
    /// `&` was used where no parent exists or with an incompatible combinator.
    InvalidParent,
    /// The parent selector was used at the top level.
    TopLevelParent,
    /// `@extend` targeted a selector that matches no rule.
    UnsatisfiedExtend,
    /// `@extend` crossed a media query boundary.
    ExtendAcrossMedia,
    /// An I/O failure while loading a file.
    Io,
    /// A loaded file was not valid UTF-8.
    Utf8,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidSyntax => "invalid syntax",
            ErrorKind::InvalidArgumentType => "invalid argument type",
            ErrorKind::MissingArgument => "missing argument",
            ErrorKind::InvalidVarKwdType => "invalid keyword argument map",
            ErrorKind::DuplicateKey => "duplicate key",
            ErrorKind::ZeroDivision => "division by zero",
            ErrorKind::IncompatibleUnits => "incompatible units",
            ErrorKind::UndefinedOperation => "undefined operation",
            ErrorKind::InvalidNullOperation => "invalid null operation",
            ErrorKind::StackError => "nesting limit exceeded",
            ErrorKind::InvalidParent => "invalid parent selector",
            ErrorKind::TopLevelParent => "top-level parent selector",
            ErrorKind::UnsatisfiedExtend => "unsatisfied extend",
            ErrorKind::ExtendAcrossMedia => "extend across media queries",
            ErrorKind::Io => "io error",
            ErrorKind::Utf8 => "invalid utf-8",
        }
    }
}

/// One frame of the Sass-level call stack, recorded at mixin, function,
/// content-block, and import boundaries.
#[derive(Debug, Clone)]
pub struct StackFrame {
    /// `"mixin m"`, `"function f"`, `"@content"`, or `"@import"`.
    pub name: String,
    pub span: Span,
}

/// A compilation error: kind, message, source span, and the Sass backtrace
/// accumulated while unwinding.
///
/// The `Display` implementation mirrors the diagnostics `dart-sass` emits:
///
/// ```scss
/// Error: $number: foo is not a number.
///     ,
/// 308 |     width: unit(foo);
///     |                 ^^^
///     '
/// ./input.scss:308:17
/// ```
#[derive(Debug, Clone)]
pub struct Error {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    /// An error that has not yet been resolved against the code map.
    Raw {
        kind: ErrorKind,
        message: String,
        span: Span,
        trace: Vec<StackFrame>,
    },
    Rendered {
        kind: ErrorKind,
        message: String,
        loc: SpanLoc,
        unicode: bool,
        trace: Vec<(String, SpanLoc)>,
    },
    Io(Arc<io::Error>),
    FromUtf8(String),
}

impl Error {
    pub(crate) fn raw(kind: ErrorKind, message: impl Into<String>, span: Span) -> Box<Self> {
        Box::new(Error {
            repr: ErrorRepr::Raw {
                kind,
                message: message.into(),
                span,
                trace: Vec::new(),
            },
        })
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match &self.repr {
            ErrorRepr::Raw { kind, .. } | ErrorRepr::Rendered { kind, .. } => *kind,
            ErrorRepr::Io(..) => ErrorKind::Io,
            ErrorRepr::FromUtf8(..) => ErrorKind::Utf8,
        }
    }

    /// The message, without the `Error: ` prefix or span context.
    pub fn message(&self) -> &str {
        match &self.repr {
            ErrorRepr::Raw { message, .. } | ErrorRepr::Rendered { message, .. } => message,
            ErrorRepr::Io(..) => "io error",
            ErrorRepr::FromUtf8(s) => s,
        }
    }

    /// Appends a stack frame while unwinding out of a callable or import.
    pub(crate) fn with_frame(mut self: Box<Self>, name: String, span: Span) -> Box<Self> {
        if let ErrorRepr::Raw { trace, .. } = &mut self.repr {
            trace.push(StackFrame { name, span });
        }
        self
    }

    pub(crate) fn span(&self) -> Option<Span> {
        match &self.repr {
            ErrorRepr::Raw { span, .. } => Some(*span),
            _ => None,
        }
    }

    /// Resolves raw spans against the code map so the error can outlive the
    /// compilation session.
    pub(crate) fn render(self: Box<Self>, map: &codemap::CodeMap, unicode: bool) -> Box<Self> {
        match self.repr {
            ErrorRepr::Raw {
                kind,
                message,
                span,
                trace,
            } => Box::new(Error {
                repr: ErrorRepr::Rendered {
                    kind,
                    message,
                    loc: map.look_up_span(span),
                    unicode,
                    trace: trace
                        .into_iter()
                        .map(|frame| (frame.name, map.look_up_span(frame.span)))
                        .collect(),
                },
            }),
            _ => self,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (message, loc, unicode, trace) = match &self.repr {
            ErrorRepr::Rendered {
                message,
                loc,
                unicode,
                trace,
                ..
            } => (message, loc, *unicode, trace),
            ErrorRepr::Raw { message, .. } => return writeln!(f, "Error: {}", message),
            ErrorRepr::FromUtf8(..) => return writeln!(f, "Error: Invalid UTF-8."),
            ErrorRepr::Io(s) => return writeln!(f, "Error: {}", s),
        };

        let first_bar = if unicode { '╷' } else { ',' };
        let middle_bar = if unicode { '│' } else { '|' };
        let last_bar = if unicode { '╵' } else { '\'' };

        let line = loc.begin.line + 1;
        let col = loc.begin.column + 1;
        writeln!(f, "Error: {}", message)?;
        let padding = " ".repeat(format!("{}", line).len() + 1);
        writeln!(f, "{}{}", padding, first_bar)?;
        writeln!(
            f,
            "{} {} {}",
            line,
            middle_bar,
            loc.file.source_line(loc.begin.line)
        )?;
        writeln!(
            f,
            "{}{} {}{}",
            padding,
            middle_bar,
            " ".repeat(loc.begin.column),
            "^".repeat(
                loc.end
                    .column
                    .max(loc.begin.column + 1)
                    .saturating_sub(loc.begin.column)
            )
        )?;
        writeln!(f, "{}{}", padding, last_bar)?;
        writeln!(f, "./{}:{}:{}", loc.file.name(), line, col)?;

        for (name, frame_loc) in trace {
            writeln!(
                f,
                "  {}:{}:{}  {}",
                frame_loc.file.name(),
                frame_loc.begin.line + 1,
                frame_loc.begin.column + 1,
                name
            )?;
        }

        Ok(())
    }
}

impl From<io::Error> for Box<Error> {
    #[inline]
    fn from(error: io::Error) -> Box<Error> {
        Box::new(Error {
            repr: ErrorRepr::Io(Arc::new(error)),
        })
    }
}

impl From<FromUtf8Error> for Box<Error> {
    #[inline]
    fn from(error: FromUtf8Error) -> Box<Error> {
        Box::new(Error {
            repr: ErrorRepr::FromUtf8(format!(
                "Invalid UTF-8 character \"\\x{:X?}\"",
                error.as_bytes()[0]
            )),
        })
    }
}

impl From<(&str, Span)> for Box<Error> {
    #[inline]
    fn from(error: (&str, Span)) -> Box<Error> {
        Error::raw(ErrorKind::InvalidSyntax, error.0, error.1)
    }
}

impl From<(String, Span)> for Box<Error> {
    #[inline]
    fn from(error: (String, Span)) -> Box<Error> {
        Error::raw(ErrorKind::InvalidSyntax, error.0, error.1)
    }
}

impl From<(ErrorKind, &str, Span)> for Box<Error> {
    #[inline]
    fn from(error: (ErrorKind, &str, Span)) -> Box<Error> {
        Error::raw(error.0, error.1, error.2)
    }
}

impl From<(ErrorKind, String, Span)> for Box<Error> {
    #[inline]
    fn from(error: (ErrorKind, String, Span)) -> Box<Error> {
        Error::raw(error.0, error.1, error.2)
    }
}

impl StdError for Error {
    #[inline]
    fn description(&self) -> &'static str {
        "Sass compilation error"
    }
}
