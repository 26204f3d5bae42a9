use codemap::Span;

use crate::{
    common::unvendor,
    error::CompileResult,
    lexer::{Lexer, Token},
};

use super::{
    Attribute, Combinator, ComplexSelector, ComplexSelectorComponent, CompoundSelector, Namespace,
    Pseudo, QualifiedName, SelectorList, SimpleSelector,
};

/// Pseudo-class selectors that take selectors as arguments.
const SELECTOR_PSEUDO_CLASSES: [&str; 9] = [
    "not",
    "matches",
    "where",
    "is",
    "current",
    "any",
    "has",
    "host",
    "host-context",
];

/// Pseudo-element selectors that take selectors as arguments.
const SELECTOR_PSEUDO_ELEMENTS: [&str; 1] = ["slotted"];

pub struct SelectorParser {
    /// Whether the parent selector `&` is allowed.
    allows_parent: bool,

    /// Whether placeholder selectors beginning with `%` are allowed.
    allows_placeholder: bool,

    pub toks: Lexer,

    span: Span,
}

impl SelectorParser {
    pub fn new(toks: Lexer, allows_parent: bool, allows_placeholder: bool, span: Span) -> Self {
        Self {
            toks,
            allows_parent,
            allows_placeholder,
            span,
        }
    }

    pub fn parse(mut self) -> CompileResult<SelectorList> {
        let list = self.selector_list()?;
        if self.toks.peek().is_some() {
            return Err(("expected selector.", self.span).into());
        }
        Ok(list)
    }

    fn selector_list(&mut self) -> CompileResult<SelectorList> {
        let mut components = vec![self.complex_selector(false)?];

        self.toks.skip_ws()?;

        let mut line_break = false;

        while self.toks.eat_char(',') {
            line_break = self.skip_ws_found_newline()? || line_break;
            match self.toks.peek() {
                Some(Token { kind: ',', .. }) => continue,
                Some(..) => {}
                None => break,
            }
            components.push(self.complex_selector(line_break)?);

            line_break = false;
        }

        Ok(SelectorList {
            components,
            span: self.span,
        })
    }

    /// Skips whitespace, reporting whether a newline was among it.
    fn skip_ws_found_newline(&mut self) -> CompileResult<bool> {
        let start = self.toks.cursor();
        self.toks.skip_ws()?;
        Ok(self.toks.raw_text(start).contains('\n'))
    }

    /// Consumes a complex selector. `line_break` records whether there was a
    /// line break before it.
    fn complex_selector(&mut self, line_break: bool) -> CompileResult<ComplexSelector> {
        let mut components = Vec::new();

        loop {
            self.toks.skip_ws()?;

            let next = match self.toks.peek() {
                Some(tok) => tok,
                None => break,
            };

            match next.kind {
                '+' => {
                    self.toks.next();
                    components.push(ComplexSelectorComponent::Combinator(
                        Combinator::NextSibling,
                    ));
                }
                '>' => {
                    self.toks.next();
                    components.push(ComplexSelectorComponent::Combinator(Combinator::Child));
                }
                '~' => {
                    self.toks.next();
                    components.push(ComplexSelectorComponent::Combinator(
                        Combinator::FollowingSibling,
                    ));
                }
                '[' | '.' | '#' | '%' | ':' | '&' | '*' | '|' => {
                    components.push(ComplexSelectorComponent::Compound(
                        self.compound_selector()?,
                    ));
                    if self.toks.next_char_is('&') {
                        return Err((
                            "\"&\" may only used at the beginning of a compound selector.",
                            self.span,
                        )
                            .into());
                    }
                }
                _ => {
                    if !self.toks.at_identifier() {
                        break;
                    }
                    components.push(ComplexSelectorComponent::Compound(
                        self.compound_selector()?,
                    ));
                    if self.toks.next_char_is('&') {
                        return Err((
                            "\"&\" may only used at the beginning of a compound selector.",
                            self.span,
                        )
                            .into());
                    }
                }
            }
        }

        if components.is_empty() {
            return Err(("expected selector.", self.span).into());
        }

        Ok(ComplexSelector::new(components, line_break))
    }

    fn compound_selector(&mut self) -> CompileResult<CompoundSelector> {
        let mut components = vec![self.simple_selector(None)?];

        while let Some(Token { kind, .. }) = self.toks.peek() {
            if !is_simple_selector_start(kind) {
                break;
            }

            components.push(self.simple_selector(Some(false))?);
        }

        Ok(CompoundSelector { components })
    }

    /// Consumes a simple selector. `allows_parent`, when `Some`, overrides
    /// the parser-level setting.
    fn simple_selector(&mut self, allows_parent: Option<bool>) -> CompileResult<SimpleSelector> {
        match self.toks.peek() {
            Some(Token { kind: '[', .. }) => {
                self.toks.next();
                Ok(SimpleSelector::Attribute(Box::new(Attribute::from_tokens(
                    &mut self.toks,
                )?)))
            }
            Some(Token { kind: '.', .. }) => {
                self.toks.next();
                Ok(SimpleSelector::Class(self.toks.ident(false, false)?))
            }
            Some(Token { kind: '#', .. }) => {
                self.toks.next();
                Ok(SimpleSelector::Id(self.toks.ident(false, false)?))
            }
            Some(Token { kind: '%', .. }) => {
                if !self.allows_placeholder {
                    return Err(("Placeholder selectors aren't allowed here.", self.span).into());
                }
                self.toks.next();
                Ok(SimpleSelector::Placeholder(self.toks.ident(false, false)?))
            }
            Some(Token { kind: ':', .. }) => self.pseudo_selector(),
            Some(Token { kind: '&', .. }) => {
                if !allows_parent.unwrap_or(self.allows_parent) {
                    return Err(("Parent selectors aren't allowed here.", self.span).into());
                }

                self.toks.next();
                let suffix = if self.toks.at_identifier_body() {
                    let mut buffer = String::new();
                    self.toks.ident_body_into(&mut buffer, false, false)?;
                    Some(buffer)
                } else {
                    None
                };
                Ok(SimpleSelector::Parent(suffix))
            }
            _ => self.type_or_universal_selector(),
        }
    }

    fn pseudo_selector(&mut self) -> CompileResult<SimpleSelector> {
        self.toks.next();
        let element = self.toks.eat_char(':');
        let name = self.toks.ident(false, false)?;

        if !self.toks.eat_char('(') {
            return Ok(SimpleSelector::Pseudo(Pseudo {
                is_class: !element && !is_fake_pseudo_element(&name),
                name,
                selector: None,
                is_syntactic_class: !element,
                argument: None,
                span: self.span,
            }));
        }

        self.toks.skip_ws()?;

        let unvendored = unvendor(&name);

        let mut argument: Option<Box<str>> = None;
        let mut selector: Option<Box<SelectorList>> = None;

        if element {
            if SELECTOR_PSEUDO_ELEMENTS.contains(&unvendored) {
                selector = Some(Box::new(self.selector_list()?));
                self.toks.skip_ws()?;
            } else {
                argument = Some(self.toks.balanced_text(true)?.into_boxed_str());
            }

            self.toks.expect_char(')')?;
        } else if SELECTOR_PSEUDO_CLASSES.contains(&unvendored) {
            selector = Some(Box::new(self.selector_list()?));
            self.toks.skip_ws()?;
            self.toks.expect_char(')')?;
        } else if unvendored == "nth-child" || unvendored == "nth-last-child" {
            let mut this_arg = self.nth_expression()?;

            let had_ws = self.skip_ws_found_ws()?;
            if had_ws && !self.toks.next_char_is(')') {
                self.toks.expect_ident("of", false)?;
                this_arg.push_str(" of");
                self.toks.skip_ws()?;
                selector = Some(Box::new(self.selector_list()?));
            }

            self.toks.expect_char(')')?;
            argument = Some(this_arg.into_boxed_str());
        } else {
            argument = Some(
                self.toks
                    .balanced_text(true)?
                    .trim_end()
                    .to_owned()
                    .into_boxed_str(),
            );

            self.toks.expect_char(')')?;
        }

        Ok(SimpleSelector::Pseudo(Pseudo {
            is_class: !element && !is_fake_pseudo_element(&name),
            name,
            selector,
            is_syntactic_class: !element,
            argument,
            span: self.span,
        }))
    }

    /// Skips whitespace, reporting whether any was found immediately before
    /// or during the skip.
    fn skip_ws_found_ws(&mut self) -> CompileResult<bool> {
        let had_ws_behind = matches!(
            self.toks.peek_n_backwards(1),
            Some(Token {
                kind: ' ' | '\t' | '\n' | '\r',
                ..
            })
        );
        let start = self.toks.cursor();
        self.toks.skip_ws()?;
        Ok(had_ws_behind || self.toks.cursor() != start)
    }

    /// Consumes a type selector or a universal selector; either may start
    /// with `*` or a namespace prefix.
    fn type_or_universal_selector(&mut self) -> CompileResult<SimpleSelector> {
        if self.toks.eat_char('*') {
            if self.toks.eat_char('|') {
                if self.toks.eat_char('*') {
                    return Ok(SimpleSelector::Universal(Namespace::Asterisk));
                }

                return Ok(SimpleSelector::Type(QualifiedName {
                    ident: self.toks.ident(false, false)?,
                    namespace: Namespace::Asterisk,
                }));
            }

            return Ok(SimpleSelector::Universal(Namespace::None));
        }

        if self.toks.eat_char('|') {
            if self.toks.eat_char('*') {
                return Ok(SimpleSelector::Universal(Namespace::Empty));
            }

            return Ok(SimpleSelector::Type(QualifiedName {
                ident: self.toks.ident(false, false)?,
                namespace: Namespace::Empty,
            }));
        }

        let name_or_namespace = self.toks.ident(false, false)?;

        if !self.toks.next_char_is('|') {
            return Ok(SimpleSelector::Type(QualifiedName {
                ident: name_or_namespace,
                namespace: Namespace::None,
            }));
        }

        self.toks.next();

        Ok(if self.toks.eat_char('*') {
            SimpleSelector::Universal(Namespace::Other(name_or_namespace.into_boxed_str()))
        } else {
            SimpleSelector::Type(QualifiedName {
                ident: self.toks.ident(false, false)?,
                namespace: Namespace::Other(name_or_namespace.into_boxed_str()),
            })
        })
    }

    /// Consumes an `An+B` production and returns its text.
    fn nth_expression(&mut self) -> CompileResult<String> {
        let mut text = String::new();

        match self.toks.peek().map(|tok| tok.kind) {
            Some('e' | 'E') => {
                self.toks.expect_ident("even", false)?;
                return Ok("even".to_owned());
            }
            Some('o' | 'O') => {
                self.toks.expect_ident("odd", false)?;
                return Ok("odd".to_owned());
            }
            Some(sign @ ('+' | '-')) => {
                text.push(sign);
                self.toks.next();
            }
            _ => {}
        }

        match self.toks.peek() {
            Some(tok) if tok.kind.is_ascii_digit() => {
                self.digits_into(&mut text);
                self.toks.skip_ws()?;
                if !self.toks.eat_ident_char('n', false)? {
                    return Ok(text);
                }
            }
            Some(..) => self.toks.expect_ident_char('n', false)?,
            None => return Err(("expected more input.", self.span).into()),
        }

        text.push('n');

        self.toks.skip_ws()?;

        if let Some(sign @ ('+' | '-')) = self.toks.peek().map(|tok| tok.kind) {
            text.push(sign);
            self.toks.next();
            self.toks.skip_ws()?;

            match self.toks.peek() {
                Some(tok) if tok.kind.is_ascii_digit() => {}
                _ => return Err(("Expected a number.", self.span).into()),
            }

            self.digits_into(&mut text);
        }

        Ok(text)
    }

    fn digits_into(&mut self, buffer: &mut String) {
        while matches!(self.toks.peek(), Some(tok) if tok.kind.is_ascii_digit()) {
            buffer.push(self.toks.next().unwrap().kind);
        }
    }
}

/// Whether `c` can start a simple selector other than a type selector.
fn is_simple_selector_start(c: char) -> bool {
    matches!(c, '*' | '[' | '.' | '#' | '%' | ':')
}

/// Whether `name` is a pseudo-element that may be written with pseudo-class
/// syntax (`:before`, `:after`, `:first-line`, `:first-letter`).
fn is_fake_pseudo_element(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "after" | "before" | "first-line" | "first-letter"
    )
}
