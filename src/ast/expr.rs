use std::sync::Arc;

use codemap::{Span, Spanned};

use crate::{
    color::Color,
    common::{BinaryOp, Brackets, Identifier, ListSeparator, QuoteKind, UnaryOp},
    unit::Unit,
    value::Number,
};

use super::{ArgumentInvocation, AstSupportsCondition, InterpolatedText};

/// The `if()` function, which evaluates its branches lazily and so can't be
/// an ordinary builtin.
#[derive(Debug, Clone)]
pub struct Ternary(pub ArgumentInvocation);

#[derive(Debug, Clone)]
pub struct ListExpr {
    pub elems: Vec<Spanned<AstExpr>>,
    pub separator: ListSeparator,
    pub brackets: Brackets,
}

#[derive(Debug, Clone)]
pub struct FunctionCallExpr {
    pub namespace: Option<Spanned<Identifier>>,
    pub name: Identifier,
    pub arguments: Arc<ArgumentInvocation>,
    pub span: Span,
}

/// A plain CSS function call whose name contains interpolation, e.g.
/// `#{$prefix}-translate(...)`.
#[derive(Debug, Clone)]
pub struct InterpolatedFunction {
    pub name: InterpolatedText,
    pub arguments: ArgumentInvocation,
    pub span: Span,
}

#[derive(Debug, Clone, Default)]
pub struct AstMapExpr(pub Vec<(Spanned<AstExpr>, AstExpr)>);

#[derive(Debug, Clone)]
pub struct BinaryOpExpr {
    pub lhs: AstExpr,
    pub op: BinaryOp,
    pub rhs: AstExpr,
    /// Whether a `/` here may be treated as a slash-separated value rather
    /// than division.
    pub allows_slash: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum AstExpr {
    BinaryOp(Arc<BinaryOpExpr>),
    True,
    False,
    Color(Arc<Color>),
    FunctionCall(FunctionCallExpr),
    If(Arc<Ternary>),
    InterpolatedFunction(Arc<InterpolatedFunction>),
    List(ListExpr),
    Map(AstMapExpr),
    Null,
    Number {
        n: Number,
        unit: Unit,
    },
    Paren(Arc<Self>),
    ParentSelector,
    String(StringExpr, Span),
    Supports(Arc<AstSupportsCondition>),
    UnaryOp(UnaryOp, Arc<Self>, Span),
    Variable {
        name: Spanned<Identifier>,
        namespace: Option<Spanned<Identifier>>,
    },
}

#[derive(Debug, Clone)]
pub struct StringExpr(pub InterpolatedText, pub QuoteKind);

impl StringExpr {
    /// Escapes one literal fragment for inclusion inside `quote`s.
    fn escape_fragment(text: &str, quote: char, out: &mut InterpolatedText, is_static: bool) {
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\n' || c == '\r' {
                out.push_text("\\a");
                if let Some(next) = chars.peek() {
                    if next.is_ascii_whitespace() || next.is_ascii_hexdigit() {
                        out.push_char(' ');
                    }
                }
                continue;
            }

            if c == quote
                || c == '\\'
                || (is_static && c == '#' && chars.peek() == Some(&'{'))
            {
                out.push_char('\\');
            }
            out.push_char(c);
        }
    }

    /// The quote character that needs the least escaping across all literal
    /// fragments: double quotes, unless those appear and single quotes do
    /// not.
    fn preferred_quote<'a>(fragments: impl Iterator<Item = &'a str>) -> char {
        let mut saw_double = false;
        for fragment in fragments {
            for c in fragment.chars() {
                match c {
                    '\'' => return '"',
                    '"' => saw_double = true,
                    _ => {}
                }
            }
        }

        if saw_double {
            '\''
        } else {
            '"'
        }
    }

    /// Re-renders this string as raw interpolated text, restoring quotes
    /// and escapes for quoted strings.
    pub fn as_interpolation(self, is_static: bool) -> InterpolatedText {
        let StringExpr(text, quote_kind) = self;

        if quote_kind == QuoteKind::None {
            return text;
        }

        let quote = Self::preferred_quote(text.literal_fragments());
        let (head, pairs) = text.into_parts();

        let mut out = InterpolatedText::new();
        out.push_char(quote);
        Self::escape_fragment(&head, quote, &mut out, is_static);

        for (expr, literal) in pairs {
            out.push_expr(expr);
            Self::escape_fragment(&literal, quote, &mut out, is_static);
        }

        out.push_char(quote);

        out
    }
}

impl AstExpr {
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable { .. })
    }

    pub fn is_slash_operand(&self) -> bool {
        match self {
            Self::Number { .. } => true,
            Self::BinaryOp(binop) => binop.allows_slash,
            _ => false,
        }
    }

    pub fn slash(left: Self, right: Self, span: Span) -> Self {
        Self::BinaryOp(Arc::new(BinaryOpExpr {
            lhs: left,
            op: BinaryOp::Div,
            rhs: right,
            allows_slash: true,
            span,
        }))
    }

    pub const fn span(self, span: Span) -> Spanned<Self> {
        Spanned { node: self, span }
    }
}
