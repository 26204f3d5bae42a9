//! The expression parser.
//!
//! Expressions layer as: comma-separated lists of space-separated lists of
//! binary-operator chains over single values. The `/` operator is kept
//! slash-capable at parse time so the evaluator can decide between division
//! and a slash-separated value.

use std::sync::Arc;

use codemap::Spanned;

use crate::{
    ast::{
        ArgumentInvocation, AstExpr, AstMapExpr, BinaryOpExpr, FunctionCallExpr, InterpolatedText,
        ListExpr, StringExpr, Ternary,
    },
    color::Color,
    common::{BinaryOp, Brackets, Identifier, ListSeparator, QuoteKind, UnaryOp},
    error::CompileResult,
    lexer::Token,
    unit::Unit,
    utils::{as_hex, is_name_start},
    value::Number,
};

use super::ScssParser;

/// An extra stopping condition threaded into expression parsing, used by
/// constructs like `@for $i from 1 to 3` whose keywords would otherwise be
/// parsed as unquoted strings.
pub(crate) type Predicate<'c> = &'c dyn Fn(&mut ScssParser) -> bool;

/// Function names whose arguments pass through as plain CSS.
fn is_special_function_name(name: &str) -> bool {
    matches!(
        name,
        "calc" | "var" | "env" | "clamp" | "expression" | "element" | "counter" | "counters"
    ) || name.starts_with("progid:")
}

impl<'a> ScssParser<'a> {
    fn should_stop(&mut self, predicate: Option<Predicate>) -> bool {
        match predicate {
            Some(predicate) => predicate(self),
            None => false,
        }
    }

    /// Parses a full expression: a comma list of space lists.
    pub(crate) fn parse_expression(
        &mut self,
        predicate: Option<Predicate>,
    ) -> CompileResult<Spanned<AstExpr>> {
        let start = self.toks.cursor();

        self.toks.skip_ws()?;

        let first = self.parse_space_list(predicate)?;

        self.toks.skip_ws()?;

        if !self.toks.next_char_is(',') || self.should_stop(predicate) {
            return Ok(first);
        }

        let mut elements = vec![first];

        while self.toks.eat_char(',') {
            self.toks.skip_ws()?;

            if self.at_expression_end() || self.should_stop(predicate) {
                break;
            }

            elements.push(self.parse_space_list(predicate)?);
            self.toks.skip_ws()?;
        }

        let span = self.toks.span_from(start);

        Ok(AstExpr::List(ListExpr {
            elems: elements,
            separator: ListSeparator::Comma,
            brackets: Brackets::None,
        })
        .span(span))
    }

    /// Whether the next token ends any expression context. `!important` is
    /// part of the value; `!default` and `!global` flags are not.
    fn at_expression_end(&mut self) -> bool {
        match self.toks.peek() {
            Some(Token {
                kind: ';' | '}' | '{' | ')' | ']' | ':',
                ..
            })
            | None => true,
            Some(Token { kind: '!', .. }) => !matches!(
                self.toks.peek_n(1),
                Some(Token {
                    kind: 'i' | 'I',
                    ..
                })
            ),
            _ => false,
        }
    }

    pub(crate) fn parse_space_list(
        &mut self,
        predicate: Option<Predicate>,
    ) -> CompileResult<Spanned<AstExpr>> {
        let start = self.toks.cursor();
        let first = self.parse_binary_expression(1, predicate)?;

        let mut elements = vec![first];

        loop {
            self.toks.skip_ws()?;

            if self.at_expression_end()
                || self.toks.next_char_is(',')
                || self.should_stop(predicate)
            {
                break;
            }

            if !self.looking_at_expression() {
                break;
            }

            elements.push(self.parse_binary_expression(1, predicate)?);
        }

        if elements.len() == 1 {
            return Ok(elements.pop().unwrap());
        }

        let span = self.toks.span_from(start);

        Ok(AstExpr::List(ListExpr {
            elems: elements,
            separator: ListSeparator::Space,
            brackets: Brackets::None,
        })
        .span(span))
    }

    /// Whether the scanner is before something that can begin an operand.
    pub(crate) fn looking_at_expression(&mut self) -> bool {
        let first = match self.toks.peek() {
            Some(tok) => tok,
            None => return false,
        };

        match first.kind {
            '.' => !self.toks.next_char_is('.'),
            '!' => matches!(
                self.toks.peek_n(1),
                Some(Token {
                    kind: 'i' | 'I', ..
                })
            ),
            '(' | '[' | '$' | '&' | '#' | '"' | '\'' => true,
            '-' | '+' => match self.toks.peek_n(1) {
                Some(second) => {
                    second.kind.is_ascii_digit()
                        || second.kind == '.'
                        || is_name_start(second.kind)
                        || second.kind == '#'
                        || second.kind == '$'
                        || second.kind == '('
                        || second.kind == '\\'
                }
                None => false,
            },
            '/' => true,
            c => c.is_ascii_digit() || is_name_start(c) || c == '\\',
        }
    }

    /// Precedence-climbing over the binary operators. `min_precedence` uses
    /// [`BinaryOp::precedence`] levels, with 1 (`or`) as the loosest.
    fn parse_binary_expression(
        &mut self,
        min_precedence: u8,
        predicate: Option<Predicate>,
    ) -> CompileResult<Spanned<AstExpr>> {
        let start = self.toks.cursor();
        let mut lhs = self.parse_unary_expression(predicate)?;

        loop {
            self.toks.skip_ws()?;

            if self.should_stop(predicate) {
                break;
            }

            let op = match self.peek_binary_op()? {
                Some(op) => op,
                None => break,
            };

            if op.precedence() < min_precedence {
                break;
            }

            self.consume_binary_op(op)?;
            self.toks.skip_ws()?;

            let rhs = self.parse_binary_expression(op.precedence() + 1, predicate)?;

            let span = self.toks.span_from(start);

            let allows_slash = op == BinaryOp::Div
                && lhs.node.is_slash_operand()
                && rhs.node.is_slash_operand();

            lhs = AstExpr::BinaryOp(Arc::new(BinaryOpExpr {
                lhs: lhs.node,
                op,
                rhs: rhs.node,
                allows_slash,
                span,
            }))
            .span(span);
        }

        Ok(lhs)
    }

    /// Peeks the next binary operator without consuming it, or `None` if the
    /// next token doesn't continue a binary chain.
    fn peek_binary_op(&mut self) -> CompileResult<Option<BinaryOp>> {
        let tok = match self.toks.peek() {
            Some(tok) => tok,
            None => return Ok(None),
        };

        Ok(match tok.kind {
            '=' if matches!(self.toks.peek_n(1), Some(Token { kind: '=', .. })) => {
                Some(BinaryOp::Equal)
            }
            '=' => Some(BinaryOp::SingleEq),
            '!' if matches!(self.toks.peek_n(1), Some(Token { kind: '=', .. })) => {
                Some(BinaryOp::NotEqual)
            }
            '>' if matches!(self.toks.peek_n(1), Some(Token { kind: '=', .. })) => {
                Some(BinaryOp::GreaterThanEqual)
            }
            '>' => Some(BinaryOp::GreaterThan),
            '<' if matches!(self.toks.peek_n(1), Some(Token { kind: '=', .. })) => {
                Some(BinaryOp::LessThanEqual)
            }
            '<' => Some(BinaryOp::LessThan),
            '*' => Some(BinaryOp::Mul),
            '%' => Some(BinaryOp::Rem),
            '/' if !matches!(self.toks.peek_n(1), Some(Token { kind: '/' | '*', .. })) => {
                Some(BinaryOp::Div)
            }
            '+' | '-' => {
                // A sign that begins a new operand belongs to the space
                // list, not to this chain: `10px -5px` is two elements.
                let follows_operand = matches!(
                    self.toks.peek_n(1),
                    Some(Token { kind, .. })
                        if kind.is_ascii_digit()
                            || kind == '.'
                            || is_name_start(kind)
                            || kind == '$'
                            || kind == '('
                            || kind == '#'
                );
                let preceded_by_whitespace = matches!(
                    self.toks.peek_n_backwards(1),
                    Some(Token {
                        kind: ' ' | '\t' | '\n',
                        ..
                    })
                );

                if preceded_by_whitespace && follows_operand {
                    None
                } else if tok.kind == '+' {
                    Some(BinaryOp::Plus)
                } else {
                    Some(BinaryOp::Minus)
                }
            }
            'a' | 'A' => {
                let before = self.toks.cursor();
                if self.toks.eat_ident("and", false)? {
                    // Re-scanned by `consume_binary_op`.
                    self.toks.set_cursor(before);
                    Some(BinaryOp::And)
                } else {
                    None
                }
            }
            'o' | 'O' => {
                let before = self.toks.cursor();
                if self.toks.eat_ident("or", false)? {
                    self.toks.set_cursor(before);
                    Some(BinaryOp::Or)
                } else {
                    None
                }
            }
            _ => None,
        })
    }

    fn consume_binary_op(&mut self, op: BinaryOp) -> CompileResult<()> {
        match op {
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::GreaterThanEqual
            | BinaryOp::LessThanEqual => {
                self.toks.next();
                self.toks.next();
            }
            BinaryOp::And => {
                self.toks.expect_ident("and", false)?;
            }
            BinaryOp::Or => {
                self.toks.expect_ident("or", false)?;
            }
            _ => {
                self.toks.next();
            }
        }

        Ok(())
    }

    fn parse_unary_expression(
        &mut self,
        predicate: Option<Predicate>,
    ) -> CompileResult<Spanned<AstExpr>> {
        let start = self.toks.cursor();

        if self.toks.eat_ident("not", false)? {
            self.toks.skip_ws()?;
            let operand = self.parse_unary_expression(predicate)?;
            let span = self.toks.span_from(start);
            return Ok(AstExpr::UnaryOp(UnaryOp::Not, Arc::new(operand.node), span).span(span));
        }

        match self.toks.peek() {
            Some(Token { kind: '+', .. })
                if !matches!(self.toks.peek_n(1), Some(Token { kind, .. }) if kind.is_ascii_digit() || kind == '.') =>
            {
                self.toks.next();
                self.toks.skip_ws()?;
                let operand = self.parse_unary_expression(predicate)?;
                let span = self.toks.span_from(start);
                Ok(AstExpr::UnaryOp(UnaryOp::Plus, Arc::new(operand.node), span).span(span))
            }
            Some(Token { kind: '-', .. })
                if !matches!(
                    self.toks.peek_n(1),
                    Some(Token { kind, .. }) if kind.is_ascii_digit() || kind == '.'
                ) && self.looking_at_expression_after_minus() =>
            {
                self.toks.next();
                self.toks.skip_ws()?;
                let operand = self.parse_unary_expression(predicate)?;
                let span = self.toks.span_from(start);
                Ok(AstExpr::UnaryOp(UnaryOp::Neg, Arc::new(operand.node), span).span(span))
            }
            _ => self.parse_single_value(predicate),
        }
    }

    /// Whether a `-` begins a negated operand rather than an identifier
    /// such as `-webkit-transform`.
    fn looking_at_expression_after_minus(&self) -> bool {
        matches!(
            self.toks.peek_n(1),
            Some(Token {
                kind: '$' | '(', ..
            })
        )
    }

    fn parse_single_value(
        &mut self,
        predicate: Option<Predicate>,
    ) -> CompileResult<Spanned<AstExpr>> {
        let _ = predicate;
        let start = self.toks.cursor();

        let first = match self.toks.peek() {
            Some(tok) => tok,
            None => return Err(("Expected expression.", self.toks.current_span()).into()),
        };

        match first.kind {
            '0'..='9' | '.' => self.parse_number_expression(false),
            '+' | '-'
                if matches!(
                    self.toks.peek_n(1),
                    Some(Token { kind, .. }) if kind.is_ascii_digit() || kind == '.'
                ) =>
            {
                self.parse_number_expression(first.kind == '-')
            }
            '-' if self.toks.at_identifier() => self.parse_identifier_expression(),
            '$' => self.parse_variable_expression(),
            '&' => {
                self.toks.next();
                Ok(AstExpr::ParentSelector.span(self.toks.span_from(start)))
            }
            '"' | '\'' => {
                let string = self.parse_interpolated_string()?;
                let span = string.span;
                Ok(AstExpr::String(string.node, span).span(span))
            }
            '#' => self.parse_hash_expression(),
            '(' => self.parse_paren_expression(),
            '[' => self.parse_bracketed_list(),
            '!' => {
                self.toks.next();
                self.toks.skip_ws()?;
                self.toks.expect_ident("important", false)?;
                let span = self.toks.span_from(start);
                Ok(AstExpr::String(
                    StringExpr(
                        InterpolatedText::from_plain("!important".to_owned()),
                        QuoteKind::None,
                    ),
                    span,
                )
                .span(span))
            }
            'u' | 'U' => {
                if let Some(url) = self.toks.url_token()? {
                    let span = self.toks.span_from(start);
                    return Ok(AstExpr::String(
                        StringExpr(InterpolatedText::from_plain(url), QuoteKind::None),
                        span,
                    )
                    .span(span));
                }

                self.parse_identifier_expression()
            }
            c if is_name_start(c) || c == '\\' => self.parse_identifier_expression(),
            c => Err((
                format!("Expected expression, found \"{}\".", c),
                self.toks.current_span(),
            )
                .into()),
        }
    }

    fn parse_number_expression(&mut self, negative: bool) -> CompileResult<Spanned<AstExpr>> {
        let start = self.toks.cursor();

        if matches!(
            self.toks.peek(),
            Some(Token {
                kind: '+' | '-',
                ..
            })
        ) {
            self.toks.next();
        }

        let mut digits = String::new();

        self.digits_into(&mut digits);

        if self.toks.next_char_is('.')
            && matches!(self.toks.peek_n(1), Some(Token { kind, .. }) if kind.is_ascii_digit())
        {
            self.toks.next();
            digits.push('.');
            self.digits_into(&mut digits);
        }

        if digits.is_empty() {
            return Err(("Expected number.", self.toks.current_span()).into());
        }

        // Scientific notation, but not the `em` unit.
        if matches!(self.toks.peek(), Some(Token { kind: 'e' | 'E', .. }))
            && matches!(
                self.toks.peek_n(1),
                Some(Token { kind, .. })
                    if kind.is_ascii_digit()
                        || (matches!(kind, '+' | '-')
                            && matches!(self.toks.peek_n(2), Some(Token { kind, .. }) if kind.is_ascii_digit()))
            )
        {
            digits.push('e');
            self.toks.next();

            if matches!(
                self.toks.peek(),
                Some(Token {
                    kind: '+' | '-',
                    ..
                })
            ) {
                digits.push(self.toks.next().unwrap().kind);
            }

            self.digits_into(&mut digits);
        }

        let mut value: f64 = digits.parse().map_err(|_| {
            Box::<crate::error::Error>::from(("Invalid number.", self.toks.span_from(start)))
        })?;

        if negative {
            value = -value;
        }

        let unit = if self.toks.eat_char('%') {
            Unit::Percent
        } else if self.toks.at_identifier() {
            Unit::from(self.toks.ident(false, true)?)
        } else {
            Unit::None
        };

        Ok(AstExpr::Number {
            n: Number(value),
            unit,
        }
        .span(self.toks.span_from(start)))
    }

    fn digits_into(&mut self, buffer: &mut String) {
        while matches!(self.toks.peek(), Some(tok) if tok.kind.is_ascii_digit()) {
            buffer.push(self.toks.next().unwrap().kind);
        }
    }

    fn parse_variable_expression(&mut self) -> CompileResult<Spanned<AstExpr>> {
        let start = self.toks.cursor();
        let name = self.toks.variable_name()?;
        let span = self.toks.span_from(start);

        Ok(AstExpr::Variable {
            name: Spanned {
                node: Identifier::from(name),
                span,
            },
            namespace: None,
        }
        .span(span))
    }

    /// `#` starts either a hex color or, with `#{`, interpolated text.
    fn parse_hash_expression(&mut self) -> CompileResult<Spanned<AstExpr>> {
        let start = self.toks.cursor();

        if matches!(self.toks.peek_n(1), Some(Token { kind: '{', .. })) {
            return self.parse_identifier_expression();
        }

        self.toks.expect_char('#')?;

        let mut digits = String::new();

        while matches!(self.toks.peek(), Some(tok) if tok.kind.is_ascii_hexdigit()) {
            digits.push(self.toks.next().unwrap().kind);
        }

        // Hex digits followed by identifier characters form an unquoted
        // string such as `#abcdefg`.
        if self.toks.at_identifier_body() || !matches!(digits.len(), 3 | 4 | 6 | 8) {
            self.toks.set_cursor(start);
            self.toks.next();
            let mut text = InterpolatedText::from_plain("#".to_owned());
            let ident = self.parse_interpolated_identifier()?;
            text.append(ident);
            let span = self.toks.span_from(start);
            return Ok(AstExpr::String(StringExpr(text, QuoteKind::None), span).span(span));
        }

        let span = self.toks.span_from(start);

        let (channels, alpha) = match digits.len() {
            3 | 4 => {
                let r = as_hex(digits.as_bytes()[0] as char) * 17;
                let g = as_hex(digits.as_bytes()[1] as char) * 17;
                let b = as_hex(digits.as_bytes()[2] as char) * 17;
                let a = if digits.len() == 4 {
                    as_hex(digits.as_bytes()[3] as char) as f64 * 17.0 / 255.0
                } else {
                    1.0
                };
                ([r, g, b], a)
            }
            6 | 8 => {
                let hex_pair = |i: usize| {
                    as_hex(digits.as_bytes()[i] as char) * 16
                        + as_hex(digits.as_bytes()[i + 1] as char)
                };
                let a = if digits.len() == 8 {
                    hex_pair(6) as f64 / 255.0
                } else {
                    1.0
                };
                ([hex_pair(0), hex_pair(2), hex_pair(4)], a)
            }
            _ => unreachable!(),
        };

        Ok(AstExpr::Color(Arc::new(Color::new_rgba(
            Number(channels[0] as f64),
            Number(channels[1] as f64),
            Number(channels[2] as f64),
            Number(alpha),
            crate::color::ColorFormat::Literal(format!("#{}", digits)),
        )))
        .span(span))
    }

    fn parse_paren_expression(&mut self) -> CompileResult<Spanned<AstExpr>> {
        let start = self.toks.cursor();
        self.toks.expect_char('(')?;
        self.toks.skip_ws()?;

        if self.toks.eat_char(')') {
            let span = self.toks.span_from(start);
            return Ok(AstExpr::List(ListExpr {
                elems: Vec::new(),
                separator: ListSeparator::Undecided,
                brackets: Brackets::None,
            })
            .span(span));
        }

        let first = self.parse_space_list(None)?;
        self.toks.skip_ws()?;

        if self.toks.eat_char(':') {
            self.toks.skip_ws()?;
            return self.parse_map_expression(first, start);
        }

        if self.toks.eat_char(',') {
            let mut elements = vec![first];

            loop {
                self.toks.skip_ws()?;
                if self.toks.next_char_is(')') {
                    break;
                }
                elements.push(self.parse_space_list(None)?);
                self.toks.skip_ws()?;
                if !self.toks.eat_char(',') {
                    break;
                }
            }

            self.toks.expect_char(')')?;

            let span = self.toks.span_from(start);
            return Ok(AstExpr::List(ListExpr {
                elems: elements,
                separator: ListSeparator::Comma,
                brackets: Brackets::None,
            })
            .span(span));
        }

        self.toks.expect_char(')')?;

        let span = self.toks.span_from(start);

        // Parentheses force `/` to mean division.
        let inner = match first.node {
            AstExpr::BinaryOp(binop) if binop.op == BinaryOp::Div => {
                AstExpr::BinaryOp(Arc::new(BinaryOpExpr {
                    lhs: binop.lhs.clone(),
                    op: binop.op,
                    rhs: binop.rhs.clone(),
                    allows_slash: false,
                    span: binop.span,
                }))
            }
            node => node,
        };

        Ok(AstExpr::Paren(Arc::new(inner)).span(span))
    }

    fn parse_map_expression(
        &mut self,
        first_key: Spanned<AstExpr>,
        start: usize,
    ) -> CompileResult<Spanned<AstExpr>> {
        let mut pairs = Vec::new();

        let first_value = self.parse_space_list(None)?;
        pairs.push((first_key, first_value.node));

        self.toks.skip_ws()?;

        while self.toks.eat_char(',') {
            self.toks.skip_ws()?;

            if self.toks.next_char_is(')') {
                break;
            }

            let key = self.parse_space_list(None)?;
            self.toks.skip_ws()?;
            self.toks.expect_char(':')?;
            self.toks.skip_ws()?;
            let value = self.parse_space_list(None)?;
            self.toks.skip_ws()?;

            pairs.push((key, value.node));
        }

        self.toks.expect_char(')')?;

        Ok(AstExpr::Map(AstMapExpr(pairs)).span(self.toks.span_from(start)))
    }

    fn parse_bracketed_list(&mut self) -> CompileResult<Spanned<AstExpr>> {
        let start = self.toks.cursor();
        self.toks.expect_char('[')?;
        self.toks.skip_ws()?;

        let mut elements: Vec<Spanned<AstExpr>> = Vec::new();
        let mut separator = ListSeparator::Undecided;

        while !self.toks.next_char_is(']') {
            elements.push(self.parse_space_list(None)?);
            self.toks.skip_ws()?;

            if self.toks.eat_char(',') {
                separator = ListSeparator::Comma;
                self.toks.skip_ws()?;
            } else {
                break;
            }
        }

        self.toks.expect_char(']')?;

        if separator == ListSeparator::Undecided && elements.len() > 1 {
            separator = ListSeparator::Space;
        }

        Ok(AstExpr::List(ListExpr {
            elems: elements,
            separator,
            brackets: Brackets::Bracketed,
        })
        .span(self.toks.span_from(start)))
    }

    /// Parses an expression beginning with an identifier: a keyword literal,
    /// a color name, a function call (possibly namespaced or interpolated),
    /// or an unquoted string.
    fn parse_identifier_expression(&mut self) -> CompileResult<Spanned<AstExpr>> {
        let start = self.toks.cursor();
        let identifier = self.parse_interpolated_identifier()?;
        let span = self.toks.span_from(start);

        if let Some(plain) = identifier.as_plain() {
            let plain = plain.to_owned();

            match plain.as_str() {
                "true" => return Ok(AstExpr::True.span(span)),
                "false" => return Ok(AstExpr::False.span(span)),
                "null" => return Ok(AstExpr::Null.span(span)),
                "if" if self.toks.next_char_is('(') => {
                    let arguments = self.parse_argument_invocation()?;
                    let span = self.toks.span_from(start);
                    return Ok(AstExpr::If(Arc::new(Ternary(arguments))).span(span));
                }
                "not" => {
                    // Reachable when `not` appears as a bare value.
                    self.toks.skip_ws()?;
                    let operand = self.parse_unary_expression(None)?;
                    let span = self.toks.span_from(start);
                    return Ok(
                        AstExpr::UnaryOp(UnaryOp::Not, Arc::new(operand.node), span).span(span)
                    );
                }
                _ => {}
            }

            // `ns.$var`, `ns.fn(...)`
            if self.toks.next_char_is('.')
                && !matches!(self.toks.peek_n(1), Some(Token { kind: '.', .. }))
            {
                let namespace = Spanned {
                    node: Identifier::from(plain.as_str()),
                    span,
                };

                self.toks.next();

                if self.toks.next_char_is('$') {
                    let var_start = self.toks.cursor();
                    let name = self.toks.variable_name()?;
                    let var_span = self.toks.span_from(var_start);
                    return Ok(AstExpr::Variable {
                        name: Spanned {
                            node: Identifier::from(name),
                            span: var_span,
                        },
                        namespace: Some(namespace),
                    }
                    .span(self.toks.span_from(start)));
                }

                let name = self.toks.ident(true, false)?;
                if !self.toks.next_char_is('(') {
                    return Err(("expected \"(\".", self.toks.current_span()).into());
                }

                let arguments = self.parse_argument_invocation()?;
                let span = self.toks.span_from(start);
                return Ok(AstExpr::FunctionCall(FunctionCallExpr {
                    namespace: Some(namespace),
                    name: Identifier::from(name),
                    arguments: Arc::new(arguments),
                    span,
                })
                .span(span));
            }

            if self.toks.next_char_is('(') {
                let lower = plain.to_ascii_lowercase();

                if is_special_function_name(&lower) {
                    return self.parse_special_function(plain, start);
                }

                let arguments = self.parse_argument_invocation()?;
                let span = self.toks.span_from(start);
                return Ok(AstExpr::FunctionCall(FunctionCallExpr {
                    namespace: None,
                    name: Identifier::from(plain.as_str()),
                    arguments: Arc::new(arguments),
                    span,
                })
                .span(span));
            }

            if let Some(color) = Color::from_name(&plain) {
                return Ok(AstExpr::Color(Arc::new(color)).span(span));
            }

            return Ok(AstExpr::String(StringExpr(identifier, QuoteKind::None), span).span(span));
        }

        // An interpolated name followed by parens is a plain CSS call with
        // the name computed at runtime.
        if self.toks.next_char_is('(') {
            let arguments = self.parse_argument_invocation()?;
            let span = self.toks.span_from(start);
            return Ok(AstExpr::InterpolatedFunction(Arc::new(
                crate::ast::InterpolatedFunction {
                    name: identifier,
                    arguments,
                    span,
                },
            ))
            .span(span));
        }

        Ok(AstExpr::String(StringExpr(identifier, QuoteKind::None), span).span(span))
    }

    /// `calc(...)` and friends: the contents pass through as raw
    /// (interpolation-aware) text.
    fn parse_special_function(
        &mut self,
        name: String,
        start: usize,
    ) -> CompileResult<Spanned<AstExpr>> {
        self.toks.expect_char('(')?;

        let mut text = InterpolatedText::from_plain(format!("{}(", name));

        self.parse_interpolated_balanced_text(&mut text, true)?;

        self.toks.expect_char(')')?;
        text.push_char(')');

        let span = self.toks.span_from(start);

        Ok(AstExpr::String(StringExpr(text, QuoteKind::None), span).span(span))
    }

    /// Appends balanced declaration-value text to `out`, resolving `#{}`
    /// blocks into interpolation parts.
    pub(crate) fn parse_interpolated_balanced_text(
        &mut self,
        out: &mut InterpolatedText,
        allow_empty: bool,
    ) -> CompileResult<()> {
        let mut closers = Vec::new();
        let start = self.toks.cursor();

        while let Some(tok) = self.toks.peek() {
            match tok.kind {
                '\\' => {
                    let escaped = self.toks.escape(true)?;
                    out.push_text(&escaped);
                }
                '"' | '\'' => {
                    let string = self.parse_interpolated_string()?;
                    out.append(string.node.as_interpolation(false));
                }
                '/' => {
                    if matches!(self.toks.peek_n(1), Some(Token { kind: '*', .. })) {
                        let comment_start = self.toks.cursor();
                        self.toks.skip_block_comment()?;
                        out.push_text(&self.toks.raw_text(comment_start));
                    } else {
                        out.push_char('/');
                        self.toks.next();
                    }
                }
                '#' => {
                    if matches!(self.toks.peek_n(1), Some(Token { kind: '{', .. })) {
                        let expr = self.parse_single_interpolation()?;
                        out.push_expr(expr);
                    } else {
                        out.push_char('#');
                        self.toks.next();
                    }
                }
                '(' | '[' | '{' => {
                    out.push_char(tok.kind);
                    self.toks.next();
                    closers.push(crate::utils::opposite_bracket(tok.kind));
                }
                ')' | ']' | '}' => {
                    if let Some(expected) = closers.pop() {
                        out.push_char(tok.kind);
                        self.toks.expect_char(expected)?;
                    } else {
                        break;
                    }
                }
                ';' => {
                    if closers.is_empty() {
                        break;
                    }
                    out.push_char(';');
                    self.toks.next();
                }
                c => {
                    out.push_char(c);
                    self.toks.next();
                }
            }
        }

        if let Some(expected) = closers.pop() {
            self.toks.expect_char(expected)?;
        }

        if !allow_empty && self.toks.cursor() == start {
            return Err(("Expected token.", self.toks.current_span()).into());
        }

        Ok(())
    }

    /// Parses `#{expr}` and returns the inner expression.
    pub(crate) fn parse_single_interpolation(&mut self) -> CompileResult<Spanned<AstExpr>> {
        self.toks.expect_char('#')?;
        self.toks.expect_char('{')?;
        self.toks.skip_ws()?;

        let expr = self.parse_expression(None)?;

        self.toks.expect_char('}')?;

        Ok(expr)
    }

    /// An identifier that may contain `#{}` blocks.
    pub(crate) fn parse_interpolated_identifier(&mut self) -> CompileResult<InterpolatedText> {
        let mut text = InterpolatedText::new();

        if self.toks.eat_char('-') {
            text.push_char('-');

            if self.toks.eat_char('-') {
                text.push_char('-');
                self.parse_interpolated_identifier_body(&mut text)?;
                return Ok(text);
            }
        }

        match self.toks.peek() {
            Some(Token { kind, .. }) if is_name_start(kind) => {
                text.push_char(kind);
                self.toks.next();
            }
            Some(Token { kind: '\\', .. }) => {
                let escaped = self.toks.escape(true)?;
                text.push_text(&escaped);
            }
            Some(Token { kind: '#', .. })
                if matches!(self.toks.peek_n(1), Some(Token { kind: '{', .. })) =>
            {
                let expr = self.parse_single_interpolation()?;
                text.push_expr(expr);
            }
            _ => return Err(("Expected identifier.", self.toks.current_span()).into()),
        }

        self.parse_interpolated_identifier_body(&mut text)?;

        Ok(text)
    }

    pub(crate) fn parse_interpolated_identifier_body(
        &mut self,
        out: &mut InterpolatedText,
    ) -> CompileResult<()> {
        while let Some(tok) = self.toks.peek() {
            match tok.kind {
                '_' | '-' => {
                    out.push_char(tok.kind);
                    self.toks.next();
                }
                c if crate::utils::is_name(c) => {
                    out.push_char(c);
                    self.toks.next();
                }
                '\\' => {
                    let escaped = self.toks.escape(false)?;
                    out.push_text(&escaped);
                }
                '#' if matches!(self.toks.peek_n(1), Some(Token { kind: '{', .. })) => {
                    let expr = self.parse_single_interpolation()?;
                    out.push_expr(expr);
                }
                _ => break,
            }
        }

        Ok(())
    }

    /// A quoted string with interpolation, e.g. `"a #{$b} c"`.
    pub(crate) fn parse_interpolated_string(&mut self) -> CompileResult<Spanned<StringExpr>> {
        let start = self.toks.cursor();

        let quote = match self.toks.next() {
            Some(Token {
                kind: kind @ ('"' | '\''),
                ..
            }) => kind,
            _ => return Err(("Expected string.", self.toks.current_span()).into()),
        };

        let mut text = InterpolatedText::new();

        let mut closed = false;

        while let Some(tok) = self.toks.peek() {
            match tok.kind {
                c if c == quote => {
                    self.toks.next();
                    closed = true;
                    break;
                }
                '\n' => break,
                '\\' => match self.toks.peek_n(1) {
                    Some(Token {
                        kind: '\n' | '\r', ..
                    }) => {
                        self.toks.next();
                        self.toks.next();
                    }
                    _ => text.push_char(self.toks.escaped_char()?),
                },
                '#' => {
                    if matches!(self.toks.peek_n(1), Some(Token { kind: '{', .. })) {
                        let expr = self.parse_single_interpolation()?;
                        text.push_expr(expr);
                    } else {
                        text.push_char('#');
                        self.toks.next();
                    }
                }
                c => {
                    text.push_char(c);
                    self.toks.next();
                }
            }
        }

        if !closed {
            return Err((
                format!("Expected {quote}.", quote = quote),
                self.toks.current_span(),
            )
                .into());
        }

        Ok(Spanned {
            node: StringExpr(text, QuoteKind::Quoted),
            span: self.toks.span_from(start),
        })
    }

    /// Call-site arguments: `(positional..., $named: value..., $rest...)`.
    pub(crate) fn parse_argument_invocation(&mut self) -> CompileResult<ArgumentInvocation> {
        let start = self.toks.cursor();
        self.toks.expect_char('(')?;
        self.toks.skip_ws()?;

        let mut invocation = ArgumentInvocation::empty(self.toks.current_span());

        while self.looking_at_expression() {
            let expr_start = self.toks.cursor();
            let expression = self.parse_space_list(None)?;
            self.toks.skip_ws()?;

            if expression.node.is_variable() && self.toks.eat_char(':') {
                let name = match &expression.node {
                    AstExpr::Variable { name, namespace } => {
                        if namespace.is_some() {
                            return Err((
                                "Nested variables may not be used as argument names.",
                                self.toks.span_from(expr_start),
                            )
                                .into());
                        }
                        name.node
                    }
                    _ => unreachable!(),
                };

                self.toks.skip_ws()?;
                let value = self.parse_space_list(None)?;

                if invocation.named.insert(name, value.node).is_some() {
                    return Err(("Duplicate argument.", self.toks.span_from(expr_start)).into());
                }
            } else if self.toks.starts_with("...") {
                self.toks.next();
                self.toks.next();
                self.toks.next();

                if invocation.rest.is_none() {
                    invocation.rest = Some(expression.node);
                } else if invocation.keyword_rest.is_none() {
                    invocation.keyword_rest = Some(expression.node);
                    self.toks.skip_ws()?;
                    break;
                } else {
                    return Err((
                        "Only two variable arguments are allowed.",
                        self.toks.span_from(start),
                    )
                        .into());
                }
            } else if !invocation.named.is_empty() {
                return Err((
                    "Positional arguments must come before keyword arguments.",
                    self.toks.span_from(expr_start),
                )
                    .into());
            } else {
                invocation.positional.push(expression.node);
            }

            self.toks.skip_ws()?;
            if !self.toks.eat_char(',') {
                break;
            }
            self.toks.skip_ws()?;
        }

        self.toks.expect_char(')')?;

        invocation.span = self.toks.span_from(start);

        Ok(invocation)
    }
}
