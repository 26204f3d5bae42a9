use codemap::Spanned;

use super::AstExpr;

/// Source text interleaved with `#{…}` expressions.
///
/// Stored as a leading literal plus `(expression, literal)` pairs. Adjacent
/// literal text merges by construction, and text with no expressions is just
/// the head string.
#[derive(Debug, Clone, Default)]
pub struct InterpolatedText {
    head: String,
    tail: Vec<(Spanned<AstExpr>, String)>,
}

impl InterpolatedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_plain(text: String) -> Self {
        Self {
            head: text,
            tail: Vec::new(),
        }
    }

    pub fn from_expr(expr: Spanned<AstExpr>) -> Self {
        Self {
            head: String::new(),
            tail: vec![(expr, String::new())],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.tail.is_empty()
    }

    fn current_text(&mut self) -> &mut String {
        match self.tail.last_mut() {
            Some((_, text)) => text,
            None => &mut self.head,
        }
    }

    pub fn push_char(&mut self, c: char) {
        self.current_text().push(c);
    }

    pub fn push_text(&mut self, text: &str) {
        self.current_text().push_str(text);
    }

    pub fn push_expr(&mut self, expr: Spanned<AstExpr>) {
        self.tail.push((expr, String::new()));
    }

    pub fn append(&mut self, other: Self) {
        self.current_text().push_str(&other.head);
        self.tail.extend(other.tail);
    }

    /// The literal text before the first expression.
    pub fn leading_text(&self) -> &str {
        &self.head
    }

    /// The literal text after the last expression, or the whole text when
    /// there are no expressions.
    pub fn trailing_text(&self) -> &str {
        match self.tail.last() {
            Some((_, text)) => text,
            None => &self.head,
        }
    }

    /// The whole text, provided it contains no expressions.
    pub fn as_plain(&self) -> Option<&str> {
        if self.tail.is_empty() {
            Some(&self.head)
        } else {
            None
        }
    }

    /// Decomposes into the leading literal and the `(expression, literal)`
    /// pairs that follow it.
    pub fn into_parts(self) -> (String, Vec<(Spanned<AstExpr>, String)>) {
        (self.head, self.tail)
    }

    /// Borrowing view of the literal fragments, for quote selection.
    pub fn literal_fragments(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.head.as_str()).chain(self.tail.iter().map(|(_, text)| text.as_str()))
    }
}
