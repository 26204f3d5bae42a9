//! Low-level scanning over the token stream.
//!
//! Every parser in the crate shares these primitives. They live directly on
//! [`Lexer`] so that a grammar that only needs scanning (attribute selectors,
//! keyframe selectors, `@at-root` queries) needs no parser struct at all.

use crate::{
    error::CompileResult,
    lexer::{Lexer, Token},
    utils::{as_hex, hex_char_for, is_name, is_name_start, opposite_bracket},
};

impl Lexer {
    // ===== whitespace and comments =====

    pub fn skip_spaces(&mut self) {
        while self.next_char_is(' ') || self.next_char_is('\t') {
            self.next();
        }
    }

    pub fn skip_ws_no_comments(&mut self) {
        while matches!(
            self.peek(),
            Some(Token {
                kind: ' ' | '\t' | '\n',
                ..
            })
        ) {
            self.next();
        }
    }

    pub fn skip_ws(&mut self) -> CompileResult<()> {
        loop {
            self.skip_ws_no_comments();
            if !self.eat_comment()? {
                return Ok(());
            }
        }
    }

    /// Consumes one comment if the cursor is at one, returning whether it did.
    pub fn eat_comment(&mut self) -> CompileResult<bool> {
        if !self.next_char_is('/') {
            return Ok(false);
        }

        match self.peek_n(1).map(|tok| tok.kind) {
            Some('/') => {
                self.skip_line_comment();
                Ok(true)
            }
            Some('*') => {
                self.skip_block_comment()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn skip_line_comment(&mut self) {
        debug_assert!(self.starts_with("//"));
        while let Some(tok) = self.peek() {
            if tok.kind == '\n' {
                break;
            }
            self.next();
        }
    }

    pub fn skip_block_comment(&mut self) -> CompileResult<()> {
        debug_assert!(self.starts_with("/*"));
        self.next();
        self.next();

        while let Some(tok) = self.next() {
            if tok.kind != '*' {
                continue;
            }

            while self.eat_char('*') {}

            if self.eat_char('/') {
                return Ok(());
            }
        }

        Err(("expected more input.", self.current_span()).into())
    }

    pub fn expect_ws(&mut self) -> CompileResult<()> {
        let at_ws = matches!(
            self.peek(),
            Some(Token {
                kind: ' ' | '\t' | '\n' | '\r',
                ..
            })
        );

        if !at_ws && !self.eat_comment()? {
            return Err(("Expected whitespace.", self.current_span()).into());
        }

        self.skip_ws()
    }

    // ===== single characters and fixed strings =====

    pub fn eat_char(&mut self, c: char) -> bool {
        if self.next_char_is(c) {
            self.next();
            true
        } else {
            false
        }
    }

    pub fn expect_char(&mut self, c: char) -> CompileResult<()> {
        if self.eat_char(c) {
            Ok(())
        } else {
            Err((format!("expected \"{}\".", c), self.current_span()).into())
        }
    }

    /// Whether the next characters are exactly `s`, without consuming them.
    pub fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(idx, c)| matches!(self.peek_n(idx), Some(tok) if tok.kind == c))
    }

    // ===== identifiers =====

    /// Whether the cursor is immediately before a plain CSS identifier.
    pub fn at_identifier(&self) -> bool {
        let (first, second) = (self.peek(), self.peek_n(1));

        match first.map(|tok| tok.kind) {
            Some(c) if is_name_start(c) || c == '\\' => true,
            Some('-') => matches!(
                second.map(|tok| tok.kind),
                Some(c) if is_name_start(c) || c == '-' || c == '\\'
            ),
            _ => false,
        }
    }

    pub fn at_identifier_body(&self) -> bool {
        matches!(self.peek(), Some(tok) if is_name(tok.kind) || tok.kind == '\\')
    }

    /// Consumes a CSS identifier. `normalize` folds underscores to hyphens;
    /// `unit` stops a `-` that would begin a number, for unit identifiers.
    pub fn ident(&mut self, normalize: bool, unit: bool) -> CompileResult<String> {
        let mut text = String::new();

        if self.eat_char('-') {
            text.push('-');

            if self.eat_char('-') {
                text.push('-');
                self.ident_body_into(&mut text, normalize, unit)?;
                return Ok(text);
            }
        }

        match self.peek() {
            Some(Token { kind: '_', .. }) if normalize => {
                self.next();
                text.push('-');
            }
            Some(Token { kind, .. }) if is_name_start(kind) => {
                self.next();
                text.push(kind);
            }
            Some(Token { kind: '\\', .. }) => {
                let escaped = self.escape(true)?;
                text.push_str(&escaped);
            }
            _ => return Err(("Expected identifier.", self.current_span()).into()),
        }

        self.ident_body_into(&mut text, normalize, unit)?;

        Ok(text)
    }

    pub fn ident_body_into(
        &mut self,
        buffer: &mut String,
        normalize: bool,
        unit: bool,
    ) -> CompileResult<()> {
        while let Some(tok) = self.peek() {
            match tok.kind {
                '-' if unit => {
                    // In a unit, `-` before a digit or dot begins a new
                    // number rather than continuing the identifier.
                    match self.peek_n(1) {
                        Some(second) if second.kind == '.' || second.kind.is_ascii_digit() => break,
                        None => break,
                        Some(..) => {}
                    }

                    self.next();
                    buffer.push('-');
                }
                '_' if normalize => {
                    self.next();
                    buffer.push('-');
                }
                c if is_name(c) => {
                    self.next();
                    buffer.push(c);
                }
                '\\' => {
                    let escaped = self.escape(false)?;
                    buffer.push_str(&escaped);
                }
                _ => break,
            }
        }

        Ok(())
    }

    pub fn variable_name(&mut self) -> CompileResult<String> {
        self.expect_char('$')?;
        self.ident(true, false)
    }

    /// If the complete identifier `ident` is next, consume it.
    pub fn eat_ident(&mut self, ident: &'static str, case_sensitive: bool) -> CompileResult<bool> {
        if !self.at_identifier() {
            return Ok(false);
        }

        let start = self.cursor();

        for c in ident.chars() {
            if !self.eat_ident_char(c, case_sensitive)? {
                self.set_cursor(start);
                return Ok(false);
            }
        }

        if self.at_identifier_body() {
            self.set_cursor(start);
            return Ok(false);
        }

        Ok(true)
    }

    pub fn eat_ident_char(&mut self, c: char, case_sensitive: bool) -> CompileResult<bool> {
        let matches_c = |actual: char| {
            if case_sensitive {
                actual == c
            } else {
                actual.eq_ignore_ascii_case(&c)
            }
        };

        match self.peek() {
            Some(Token { kind, .. }) if matches_c(kind) => {
                self.next();
                Ok(true)
            }
            Some(Token { kind: '\\', .. }) => {
                let start = self.cursor();
                if matches_c(self.escaped_char()?) {
                    Ok(true)
                } else {
                    self.set_cursor(start);
                    Ok(false)
                }
            }
            _ => Ok(false),
        }
    }

    pub fn expect_ident_char(&mut self, c: char, case_sensitive: bool) -> CompileResult<()> {
        if self.eat_ident_char(c, case_sensitive)? {
            Ok(())
        } else {
            Err((format!("Expected \"{}\".", c), self.current_span()).into())
        }
    }

    pub fn expect_ident(&mut self, ident: &str, case_sensitive: bool) -> CompileResult<()> {
        let start = self.cursor();

        for c in ident.chars() {
            if !self.eat_ident_char(c, case_sensitive)? {
                return Err((format!("Expected \"{}\".", ident), self.span_from(start)).into());
            }
        }

        if self.at_identifier_body() {
            return Err((format!("Expected \"{}\".", ident), self.span_from(start)).into());
        }

        Ok(())
    }

    // ===== escapes =====

    /// Consumes an escape sequence, returning its identifier-safe spelling.
    pub fn escape(&mut self, identifier_start: bool) -> CompileResult<String> {
        let start = self.cursor();
        self.expect_char('\\')?;

        let first = match self.peek() {
            Some(tok) => tok,
            None => return Err(("Expected expression.", self.current_span()).into()),
        };

        let value = if first.kind == '\n' {
            return Err(("Expected escape sequence.", self.current_span()).into());
        } else if first.kind.is_ascii_hexdigit() {
            let mut value = 0;
            for _ in 0..6 {
                match self.peek() {
                    Some(tok) if tok.kind.is_ascii_hexdigit() => {
                        value = value * 16 + as_hex(tok.kind);
                        self.next();
                    }
                    _ => break,
                }
            }
            if matches!(
                self.peek(),
                Some(Token {
                    kind: ' ' | '\n' | '\t',
                    ..
                })
            ) {
                self.next();
            }
            value
        } else {
            self.next();
            first.kind as u32
        };

        let c = std::char::from_u32(value)
            .ok_or_else(|| ("Invalid Unicode code point.", self.span_from(start)))?;

        let keeps_meaning = if identifier_start {
            is_name_start(c) && !c.is_ascii_digit()
        } else {
            is_name(c)
        };

        if keeps_meaning {
            Ok(c.to_string())
        } else if value <= 0x1F || value == 0x7F || (identifier_start && c.is_ascii_digit()) {
            let mut spelled = String::with_capacity(4);
            spelled.push('\\');
            if value > 0xF {
                spelled.push(hex_char_for(value >> 4));
            }
            spelled.push(hex_char_for(value & 0xF));
            spelled.push(' ');
            Ok(spelled)
        } else {
            Ok(format!("\\{}", c))
        }
    }

    /// Consumes an escape sequence, returning the character it denotes.
    pub fn escaped_char(&mut self) -> CompileResult<char> {
        self.expect_char('\\')?;

        let first = match self.peek() {
            None => return Ok('\u{FFFD}'),
            Some(tok) => tok,
        };

        match first.kind {
            '\n' | '\r' => Err(("Expected escape sequence.", self.current_span()).into()),
            c if c.is_ascii_hexdigit() => {
                let mut value = 0;
                for _ in 0..6 {
                    match self.peek() {
                        Some(tok) if tok.kind.is_ascii_hexdigit() => {
                            value = (value << 4) + as_hex(tok.kind);
                            self.next();
                        }
                        _ => break,
                    }
                }

                if matches!(self.peek(), Some(tok) if tok.kind.is_ascii_whitespace()) {
                    self.next();
                }

                if value == 0 || (0xD800..=0xDFFF).contains(&value) || value >= 0x0010_FFFF {
                    Ok('\u{FFFD}')
                } else {
                    Ok(char::from_u32(value).unwrap())
                }
            }
            c => {
                self.next();
                Ok(c)
            }
        }
    }

    // ===== strings and urls =====

    pub fn quoted_string(&mut self) -> CompileResult<String> {
        let quote = match self.next() {
            Some(Token {
                kind: q @ ('\'' | '"'),
                ..
            }) => q,
            _ => return Err(("Expected string.", self.current_span()).into()),
        };

        let mut text = String::new();

        loop {
            let next = match self.peek() {
                Some(tok) => tok,
                None => {
                    return Err((
                        format!("Expected {quote}.", quote = quote),
                        self.current_span(),
                    )
                        .into())
                }
            };

            match next.kind {
                c if c == quote => {
                    self.next();
                    return Ok(text);
                }
                '\n' | '\r' => {
                    return Err((
                        format!("Expected {quote}.", quote = quote),
                        self.current_span(),
                    )
                        .into())
                }
                '\\' => match self.peek_n(1) {
                    Some(Token {
                        kind: '\n' | '\r', ..
                    }) => {
                        self.next();
                        self.next();
                    }
                    _ => text.push(self.escaped_char()?),
                },
                c => {
                    self.next();
                    text.push(c);
                }
            }
        }
    }

    /// Attempts a raw `url(...)` token, rewinding entirely on failure so the
    /// caller can re-parse a function call.
    pub fn url_token(&mut self) -> CompileResult<Option<String>> {
        let start = self.cursor();

        if !self.eat_ident("url", false)? || !self.eat_char('(') {
            self.set_cursor(start);
            return Ok(None);
        }

        self.skip_ws()?;

        let mut url = String::from("url(");

        while let Some(next) = self.peek() {
            match next.kind {
                '\\' => {
                    let escaped = self.escape(false)?;
                    url.push_str(&escaped);
                }
                ')' => {
                    self.next();
                    url.push(')');
                    return Ok(Some(url));
                }
                ' ' | '\t' | '\n' | '\r' => {
                    self.skip_ws_no_comments();
                    if !self.next_char_is(')') {
                        break;
                    }
                }
                '!' | '#' | '%' | '&' | '*'..='~' | '\u{80}'..=char::MAX => {
                    self.next();
                    url.push(next.kind);
                }
                _ => break,
            }
        }

        self.set_cursor(start);
        Ok(None)
    }

    // ===== balanced raw text =====

    /// Consumes raw declaration-value text up to an unbalanced terminator,
    /// keeping strings, comments, and `url()`s intact.
    pub fn balanced_text(&mut self, allow_empty: bool) -> CompileResult<String> {
        let mut text = String::new();
        let mut closers: Vec<char> = Vec::new();
        let mut pending_newline = false;

        while let Some(tok) = self.peek() {
            match tok.kind {
                ';' if closers.is_empty() => break,
                ']' | ')' | '}' => match closers.pop() {
                    Some(expected) => {
                        self.expect_char(expected)?;
                        text.push(tok.kind);
                        pending_newline = false;
                    }
                    None => break,
                },
                '[' | '(' | '{' => {
                    self.next();
                    text.push(tok.kind);
                    closers.push(opposite_bracket(tok.kind));
                    pending_newline = false;
                }
                '\\' => {
                    let escaped = self.escape(true)?;
                    text.push_str(&escaped);
                    pending_newline = false;
                }
                '"' | '\'' => {
                    let start = self.cursor();
                    self.quoted_string()?;
                    text.push_str(&self.raw_text(start));
                    pending_newline = false;
                }
                '/' => {
                    if matches!(self.peek_n(1), Some(Token { kind: '*', .. })) {
                        let start = self.cursor();
                        self.skip_block_comment()?;
                        text.push_str(&self.raw_text(start));
                    } else {
                        self.next();
                        text.push('/');
                    }
                    pending_newline = false;
                }
                ' ' | '\t' => {
                    // Collapse runs of whitespace to a single character.
                    let keep = pending_newline
                        || !matches!(self.peek_n(1), Some(next) if next.kind.is_ascii_whitespace());
                    self.next();
                    if keep {
                        text.push(tok.kind);
                    }
                }
                '\n' | '\r' => {
                    if !pending_newline {
                        text.push('\n');
                    }
                    pending_newline = true;
                    self.next();
                }
                ';' => {
                    self.next();
                    text.push(';');
                    pending_newline = false;
                }
                'u' | 'U' => {
                    match self.url_token()? {
                        Some(url) => text.push_str(&url),
                        None => {
                            self.next();
                            text.push(tok.kind);
                        }
                    }
                    pending_newline = false;
                }
                c => {
                    if self.at_identifier() {
                        let ident = self.ident(false, false)?;
                        text.push_str(&ident);
                    } else {
                        self.next();
                        text.push(c);
                    }
                    pending_newline = false;
                }
            }
        }

        if let Some(expected) = closers.pop() {
            self.expect_char(expected)?;
        }

        if !allow_empty && text.is_empty() {
            return Err(("Expected token.", self.current_span()).into());
        }

        Ok(text)
    }

    pub fn expect_done(&mut self) -> CompileResult<()> {
        match self.peek() {
            Some(tok) => Err((
                format!("expected no more input, found \"{}\".", tok.kind),
                self.current_span(),
            )
                .into()),
            None => Ok(()),
        }
    }
}
