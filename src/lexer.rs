use std::sync::Arc;

use codemap::{File, Span};

const FORM_FEED: char = '\x0C';

/// A single source character with its byte offset into the file.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub kind: char,
    pos: u32,
}

/// Pre-lexes source text, normalizing `\r\n`, `\r`, and form feeds to `\n`.
/// Offsets point at the original bytes, so spans survive normalization.
fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        let kind = match c {
            FORM_FEED => '\n',
            '\r' => {
                if matches!(chars.peek(), Some((_, '\n'))) {
                    chars.next();
                }
                '\n'
            }
            c => c,
        };

        tokens.push(Token {
            kind,
            pos: pos as u32,
        });
    }

    tokens
}

/// A random-access stream of [`Token`]s with span bookkeeping.
///
/// The parser peeks and backtracks freely; the cursor is just an index into
/// the pre-lexed buffer.
#[derive(Debug, Clone)]
pub struct Lexer {
    buf: Vec<Token>,
    entire_span: Span,
    cursor: usize,
    /// Whether this lexer covers text longer than its original span. This
    /// happens when lexing the result of interpolation.
    is_expanded: bool,
}

impl Lexer {
    pub fn new_from_file(file: &Arc<File>) -> Self {
        Lexer {
            buf: tokenize(file.source()),
            entire_span: file.span,
            cursor: 0,
            is_expanded: false,
        }
    }

    pub fn new_from_string(s: &str, entire_span: Span) -> Self {
        Lexer {
            buf: tokenize(s),
            entire_span,
            cursor: 0,
            is_expanded: s.len() as u64 > entire_span.len(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

    pub fn peek(&self) -> Option<Token> {
        self.peek_n(0)
    }

    /// Peeks `n` tokens ahead of the cursor without advancing it.
    pub fn peek_n(&self, n: usize) -> Option<Token> {
        self.buf.get(self.cursor + n).copied()
    }

    /// Peeks `n` tokens behind the cursor without moving it.
    pub fn peek_n_backwards(&self, n: usize) -> Option<Token> {
        self.buf.get(self.cursor.checked_sub(n)?).copied()
    }

    pub fn next_char_is(&self, c: char) -> bool {
        matches!(self.peek(), Some(tok) if tok.kind == c)
    }

    /// The text between `start` and the cursor, as written.
    pub fn raw_text(&self, start: usize) -> String {
        self.buf[start..self.cursor]
            .iter()
            .map(|tok| tok.kind)
            .collect()
    }

    pub fn span_from(&self, start: usize) -> Span {
        self.span_at_index(start).merge(self.prev_span())
    }

    pub fn prev_span(&self) -> Span {
        self.span_at_index(self.cursor.saturating_sub(1))
    }

    pub fn current_span(&self) -> Span {
        self.span_at_index(self.cursor)
    }

    /// The span of the character at `idx`, or of the final character if
    /// `idx` is past the end.
    fn span_at_index(&self, idx: usize) -> Span {
        if self.is_expanded {
            return self.entire_span;
        }

        let tok = match self.buf.get(idx).or_else(|| self.buf.last()) {
            Some(tok) => tok,
            None => return self.entire_span.subspan(0, 0),
        };

        let lo = u64::from(tok.pos);
        self.entire_span.subspan(lo, lo + tok.kind.len_utf8() as u64)
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let tok = self.peek()?;
        self.cursor += 1;
        Some(tok)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buf.len() - self.cursor;
        (remaining, Some(remaining))
    }
}
