use codemap::Span;

use super::CssStmt;

/// A resolved at-rule the compiler has no special handling for.
#[derive(Debug, Clone)]
pub struct UnknownAtRule {
    pub name: String,
    pub params: String,
    pub body: Vec<CssStmt>,
    pub has_body: bool,
    pub span: Span,
}
