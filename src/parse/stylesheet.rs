use std::{
    cell::Cell,
    collections::HashSet,
    ffi::OsString,
    mem,
    path::{Path, PathBuf},
};

use codemap::{CodeMap, Span, Spanned};

use crate::{
    ast::*,
    common::{unvendor, Identifier, QuoteKind},
    context_flags::ContextFlags,
    error::CompileResult,
    lexer::{Lexer, Token},
    Options,
};

/// Identifiers that may not be used as function names.
const RESERVED_IDENTIFIERS: [&str; 8] = [
    "calc", "element", "expression", "url", "and", "or", "not", "clamp",
];

/// Which grammar governs the children of the block being parsed.
///
/// The same block machinery parses rule bodies, nested-property bodies, and
/// function bodies; only the statement set differs.
#[derive(Copy, Clone, PartialEq, Eq)]
enum BodyKind {
    /// Style rules, declarations, and the full at-rule set.
    Statement,
    /// Inside `prop: { ... }`: only declarations and a restricted at-rule
    /// set.
    Declaration,
    /// Inside `@function`: only variables, control flow, and `@return`.
    Function,
}

enum DeclarationHead {
    /// The head parsed as a complete statement.
    Stmt(AstStmt),
    /// The head turned out to be selector text; the caller re-parses it as
    /// a style rule with this prefix.
    SelectorText(InterpolatedText),
}

enum VariableOrName {
    VariableDecl(AstVariableDecl),
    Name(InterpolatedText),
}

/// The SCSS statement parser. Produces the AST consumed by the evaluator.
pub struct ScssParser<'a> {
    pub toks: Lexer,
    #[allow(unused)]
    pub map: &'a mut CodeMap,
    pub path: &'a Path,
    #[allow(unused)]
    pub span_before: Span,
    pub flags: ContextFlags,
    pub options: &'a Options<'a>,
}

impl<'a> ScssParser<'a> {
    pub fn new(
        toks: Lexer,
        map: &'a mut CodeMap,
        options: &'a Options<'a>,
        span_before: Span,
        file_name: &'a Path,
    ) -> Self {
        let mut flags = ContextFlags::empty();

        flags.set(ContextFlags::IS_USE_ALLOWED, true);

        ScssParser {
            toks,
            map,
            path: file_name,
            span_before,
            flags,
            options,
        }
    }

    pub fn parse(mut self) -> CompileResult<StyleSheet> {
        let mut sheet = StyleSheet::new(false, self.path.to_path_buf());

        // Allow a byte-order mark at the beginning of the document.
        self.toks.eat_char('\u{feff}');

        sheet.body = self.parse_sequence(false, BodyKind::Statement)?;

        for (idx, child) in sheet.body.iter().enumerate() {
            match child {
                AstStmt::VariableDecl(_) | AstStmt::LoudComment(_) | AstStmt::SilentComment(_) => {
                    continue
                }
                AstStmt::Use(..) => sheet.uses.push(idx),
                AstStmt::Forward(..) => sheet.forwards.push(idx),
                _ => break,
            }
        }

        Ok(sheet)
    }

    // ===================== statement sequences =====================

    /// The shared statement loop: the whole file when `in_block` is false,
    /// or a `{ ... }` body whose opening brace is already consumed.
    fn parse_sequence(&mut self, in_block: bool, kind: BodyKind) -> CompileResult<Vec<AstStmt>> {
        let mut stmts = Vec::new();
        self.toks.skip_ws_no_comments();

        loop {
            let tok = match self.toks.peek() {
                Some(tok) => tok,
                None if in_block => {
                    return Err(("expected \"}\".", self.toks.current_span()).into())
                }
                None => return Ok(stmts),
            };

            match tok.kind {
                '}' if in_block => {
                    self.toks.next();
                    return Ok(stmts);
                }
                ';' => {
                    self.toks.next();
                    self.toks.skip_ws_no_comments();
                }
                '$' => {
                    stmts.push(AstStmt::VariableDecl(
                        self.parse_variable_declaration_without_namespace(None, None)?,
                    ));
                }
                '/' => match self.toks.peek_n(1) {
                    Some(Token { kind: '/', .. }) => {
                        stmts.push(self.parse_silent_comment()?);
                        self.toks.skip_ws_no_comments();
                    }
                    Some(Token { kind: '*', .. }) => {
                        stmts.push(AstStmt::LoudComment(self.parse_loud_comment()?));
                        self.toks.skip_ws_no_comments();
                    }
                    _ => stmts.push(self.parse_child(kind)?),
                },
                _ => {
                    // `@charset` at the top level is consumed and dropped.
                    if !in_block && self.toks.starts_with("@charset") {
                        self.toks.expect_char('@')?;
                        self.toks.expect_ident("charset", false)?;
                        self.toks.skip_ws()?;
                        self.toks.quoted_string()?;
                        continue;
                    }

                    stmts.push(self.parse_child(kind)?);
                }
            }
        }
    }

    /// Parses a braced block, returning its children and span.
    fn parse_block(&mut self, kind: BodyKind) -> CompileResult<Spanned<Vec<AstStmt>>> {
        let start = self.toks.cursor();
        self.toks.expect_char('{')?;
        let children = self.parse_sequence(true, kind)?;
        let span = self.toks.span_from(start);
        self.toks.skip_ws_no_comments();

        Ok(Spanned {
            node: children,
            span,
        })
    }

    fn parse_child(&mut self, kind: BodyKind) -> CompileResult<AstStmt> {
        match kind {
            BodyKind::Statement => self.parse_statement(),
            BodyKind::Declaration => self.parse_declaration_child(),
            BodyKind::Function => self.parse_function_child(),
        }
    }

    fn parse_statement(&mut self) -> CompileResult<AstStmt> {
        match self.toks.peek() {
            Some(Token { kind: '@', .. }) => self.parse_at_rule(BodyKind::Statement),
            Some(Token { kind: '}', .. }) => {
                Err(("unmatched \"}\".", self.toks.current_span()).into())
            }
            _ => {
                if self.flags.in_style_rule()
                    || self.flags.in_unknown_at_rule()
                    || self.flags.in_mixin()
                    || self.flags.in_content_block()
                {
                    self.parse_declaration_or_style_rule()
                } else {
                    self.parse_variable_declaration_or_style_rule()
                }
            }
        }
    }

    fn expect_statement_separator(&mut self) -> CompileResult<()> {
        self.toks.skip_ws_no_comments();
        match self.toks.peek() {
            Some(Token {
                kind: ';' | '}', ..
            })
            | None => Ok(()),
            _ => self.toks.expect_char(';'),
        }
    }

    fn at_end_of_statement(&self) -> bool {
        matches!(
            self.toks.peek(),
            Some(Token {
                kind: ';' | '}' | '{',
                ..
            }) | None
        )
    }

    fn looking_at_block(&self) -> bool {
        self.toks.next_char_is('{')
    }

    // ===================== at-rules =====================

    fn plain_at_rule_name(&mut self) -> CompileResult<String> {
        self.toks.expect_char('@')?;
        let name = self.toks.ident(false, false)?;
        self.toks.skip_ws()?;
        Ok(name)
    }

    fn parse_at_rule(&mut self, kind: BodyKind) -> CompileResult<AstStmt> {
        let start = self.toks.cursor();

        self.toks.expect_char('@')?;
        let name = self.parse_interpolated_identifier()?;
        self.toks.skip_ws()?;

        // `@use` and `@forward` must come before other rules; every other
        // at-rule forfeits that permission.
        let was_use_allowed = self.flags.is_use_allowed();
        self.flags.set(ContextFlags::IS_USE_ALLOWED, false);

        match name.as_plain() {
            Some("at-root") => self.parse_at_root_rule(start),
            Some("content") => self.parse_content_rule(start),
            Some("debug") => self.parse_debug_rule(),
            Some("each") => self.parse_each_rule(kind),
            Some("else") | Some("return") => self.parse_disallowed_at_rule(start),
            Some("error") => self.parse_error_rule(),
            Some("extend") => self.parse_extend_rule(start),
            Some("for") => self.parse_for_rule(kind),
            Some("forward") => {
                self.flags
                    .set(ContextFlags::IS_USE_ALLOWED, was_use_allowed);
                self.parse_forward_rule(start)
            }
            Some("function") => self.parse_function_rule(start),
            Some("if") => self.parse_if_rule(kind),
            Some("import") => self.parse_import_rule(start),
            Some("include") => self.parse_include_rule(),
            Some("media") => self.parse_media_rule(start),
            Some("mixin") => self.parse_mixin_rule(start),
            Some("supports") => self.parse_supports_rule(),
            Some("use") => {
                self.flags
                    .set(ContextFlags::IS_USE_ALLOWED, was_use_allowed);
                self.parse_use_rule(start)
            }
            Some("warn") => self.parse_warn_rule(),
            Some("while") => self.parse_while_rule(kind),
            _ => self.parse_unknown_at_rule(name, start),
        }
    }

    fn parse_disallowed_at_rule(&mut self, start: usize) -> CompileResult<AstStmt> {
        self.almost_any_value(false)?;
        Err((
            "This at-rule is not allowed here.",
            self.toks.span_from(start),
        )
            .into())
    }

    fn parse_unknown_at_rule(
        &mut self,
        name: InterpolatedText,
        start: usize,
    ) -> CompileResult<AstStmt> {
        let was_in_unknown = self.flags.in_unknown_at_rule();
        self.flags.set(ContextFlags::IN_UNKNOWN_AT_RULE, true);

        let value = if self.toks.next_char_is('!') || self.at_end_of_statement() {
            None
        } else {
            Some(self.almost_any_value(false)?)
        };

        let body = if self.looking_at_block() {
            Some(self.parse_block(BodyKind::Statement)?.node)
        } else {
            self.expect_statement_separator()?;
            None
        };

        self.flags
            .set(ContextFlags::IN_UNKNOWN_AT_RULE, was_in_unknown);

        Ok(AstStmt::UnknownAtRule(AstUnknownAtRule {
            name,
            value,
            body,
            span: self.toks.span_from(start),
        }))
    }

    fn parse_at_root_rule(&mut self, start: usize) -> CompileResult<AstStmt> {
        if self.toks.next_char_is('(') {
            let query_start = self.toks.cursor();
            let query = self.parse_at_root_query_text()?;
            let query_span = self.toks.span_from(query_start);
            self.toks.skip_ws()?;
            let body = self.parse_block(BodyKind::Statement)?.node;

            return Ok(AstStmt::AtRootRule(AstAtRootRule {
                query: Some(Spanned {
                    node: query,
                    span: query_span,
                }),
                body,
                span: self.toks.span_from(start),
            }));
        }

        if self.looking_at_block() {
            let body = self.parse_block(BodyKind::Statement)?.node;
            return Ok(AstStmt::AtRootRule(AstAtRootRule {
                query: None,
                body,
                span: self.toks.span_from(start),
            }));
        }

        let child = self.parse_style_rule(None, None)?;
        Ok(AstStmt::AtRootRule(AstAtRootRule {
            query: None,
            body: vec![child],
            span: self.toks.span_from(start),
        }))
    }

    fn parse_at_root_query_text(&mut self) -> CompileResult<InterpolatedText> {
        let mut text = InterpolatedText::new();
        self.toks.expect_char('(')?;
        text.push_char('(');

        self.toks.skip_ws()?;

        text.push_expr(self.parse_expression(None)?);

        if self.toks.eat_char(':') {
            self.toks.skip_ws()?;
            text.push_text(": ");
            text.push_expr(self.parse_expression(None)?);
        }

        self.toks.expect_char(')')?;
        self.toks.skip_ws()?;
        text.push_char(')');

        Ok(text)
    }

    fn parse_content_rule(&mut self, start: usize) -> CompileResult<AstStmt> {
        if !self.flags.in_mixin() {
            return Err((
                "@content is only allowed within mixin declarations.",
                self.toks.span_from(start),
            )
                .into());
        }

        self.toks.skip_ws()?;

        let args = if self.toks.next_char_is('(') {
            self.parse_argument_invocation()?
        } else {
            ArgumentInvocation::empty(self.toks.current_span())
        };

        self.expect_statement_separator()?;

        self.flags.set(ContextFlags::FOUND_CONTENT_RULE, true);

        Ok(AstStmt::ContentRule(AstContentRule { args }))
    }

    fn parse_expression_statement(
        &mut self,
        build: fn(Spanned<crate::ast::AstExpr>) -> AstStmt,
    ) -> CompileResult<AstStmt> {
        let value = self.parse_expression(None)?;
        self.expect_statement_separator()?;
        Ok(build(value))
    }

    fn parse_debug_rule(&mut self) -> CompileResult<AstStmt> {
        self.parse_expression_statement(|value| {
            AstStmt::Debug(AstDebugRule {
                value: value.node,
                span: value.span,
            })
        })
    }

    fn parse_warn_rule(&mut self) -> CompileResult<AstStmt> {
        self.parse_expression_statement(|value| {
            AstStmt::Warn(AstWarn {
                value: value.node,
                span: value.span,
            })
        })
    }

    fn parse_error_rule(&mut self) -> CompileResult<AstStmt> {
        self.parse_expression_statement(|value| {
            AstStmt::ErrorRule(AstErrorRule {
                value: value.node,
                span: value.span,
            })
        })
    }

    fn parse_return_rule(&mut self) -> CompileResult<AstStmt> {
        self.parse_expression_statement(|value| {
            AstStmt::Return(AstReturn {
                val: value.node,
                span: value.span,
            })
        })
    }

    fn parse_extend_rule(&mut self, start: usize) -> CompileResult<AstStmt> {
        if !self.flags.in_style_rule()
            && !self.flags.in_mixin()
            && !self.flags.in_content_block()
        {
            return Err((
                "@extend may only be used within style rules.",
                self.toks.span_from(start),
            )
                .into());
        }

        let value = self.almost_any_value(false)?;

        let is_optional = self.toks.eat_char('!');
        if is_optional {
            self.toks.expect_ident("optional", false)?;
        }

        self.expect_statement_separator()?;

        Ok(AstStmt::Extend(AstExtendRule {
            value,
            is_optional,
            span: self.toks.span_from(start),
        }))
    }

    // ===================== control flow =====================

    fn parse_if_rule(&mut self, kind: BodyKind) -> CompileResult<AstStmt> {
        let was_in_control = self.flags.in_control_flow();
        self.flags.set(ContextFlags::IN_CONTROL_FLOW, true);

        let condition = self.parse_expression(None)?.node;
        let body = self.parse_block(kind)?.node;

        let mut clauses = vec![AstIfClause { condition, body }];
        let mut else_clause = None;

        while self.scan_else()? {
            self.toks.skip_ws()?;
            if self.toks.eat_ident("if", false)? {
                self.toks.skip_ws()?;
                let condition = self.parse_expression(None)?.node;
                let body = self.parse_block(kind)?.node;
                clauses.push(AstIfClause { condition, body });
            } else {
                else_clause = Some(self.parse_block(kind)?.node);
                break;
            }
        }

        self.flags
            .set(ContextFlags::IN_CONTROL_FLOW, was_in_control);
        self.toks.skip_ws_no_comments();

        Ok(AstStmt::If(AstIf {
            if_clauses: clauses,
            else_clause,
        }))
    }

    fn scan_else(&mut self) -> CompileResult<bool> {
        let start = self.toks.cursor();

        self.toks.skip_ws()?;

        if self.toks.eat_char('@') && self.toks.eat_ident("else", true)? {
            return Ok(true);
        }

        self.toks.set_cursor(start);

        Ok(false)
    }

    fn parse_each_rule(&mut self, kind: BodyKind) -> CompileResult<AstStmt> {
        let was_in_control = self.flags.in_control_flow();
        self.flags.set(ContextFlags::IN_CONTROL_FLOW, true);

        let mut variables = vec![Identifier::from(self.toks.variable_name()?)];
        self.toks.skip_ws()?;
        while self.toks.eat_char(',') {
            self.toks.skip_ws()?;
            variables.push(Identifier::from(self.toks.variable_name()?));
            self.toks.skip_ws()?;
        }

        self.toks.expect_ident("in", false)?;
        self.toks.skip_ws()?;

        let list = self.parse_expression(None)?.node;
        let body = self.parse_block(kind)?.node;

        self.flags
            .set(ContextFlags::IN_CONTROL_FLOW, was_in_control);

        Ok(AstStmt::Each(AstEach {
            variables,
            list,
            body,
        }))
    }

    fn parse_for_rule(&mut self, kind: BodyKind) -> CompileResult<AstStmt> {
        let was_in_control = self.flags.in_control_flow();
        self.flags.set(ContextFlags::IN_CONTROL_FLOW, true);

        let var_start = self.toks.cursor();
        let variable = Spanned {
            node: Identifier::from(self.toks.variable_name()?),
            span: self.toks.span_from(var_start),
        };
        self.toks.skip_ws()?;

        self.toks.expect_ident("from", false)?;
        self.toks.skip_ws()?;

        let exclusive: Cell<Option<bool>> = Cell::new(None);

        let from = self.parse_expression(Some(&|parser| {
            if exclusive.get().is_some() {
                return true;
            }
            if !parser.toks.at_identifier() {
                return false;
            }
            if parser.toks.eat_ident("to", false).unwrap_or(false) {
                exclusive.set(Some(true));
                true
            } else if parser.toks.eat_ident("through", false).unwrap_or(false) {
                exclusive.set(Some(false));
                true
            } else {
                false
            }
        }))?;

        let is_exclusive = match exclusive.get() {
            Some(b) => b,
            None => {
                return Err(("Expected \"to\" or \"through\".", self.toks.current_span()).into())
            }
        };

        self.toks.skip_ws()?;

        let to = self.parse_expression(None)?;
        let body = self.parse_block(kind)?.node;

        self.flags
            .set(ContextFlags::IN_CONTROL_FLOW, was_in_control);

        Ok(AstStmt::For(AstFor {
            variable,
            from,
            to,
            is_exclusive,
            body,
        }))
    }

    fn parse_while_rule(&mut self, kind: BodyKind) -> CompileResult<AstStmt> {
        let was_in_control = self.flags.in_control_flow();
        self.flags.set(ContextFlags::IN_CONTROL_FLOW, true);

        let condition = self.parse_expression(None)?.node;
        let body = self.parse_block(kind)?.node;

        self.flags
            .set(ContextFlags::IN_CONTROL_FLOW, was_in_control);

        Ok(AstStmt::While(AstWhile { condition, body }))
    }

    // ===================== callables =====================

    pub(crate) fn parse_argument_declaration(&mut self) -> CompileResult<ArgumentDeclaration> {
        self.toks.expect_char('(')?;
        self.toks.skip_ws()?;

        let mut arguments = Vec::new();
        let mut seen = HashSet::new();
        let mut rest_argument: Option<Identifier> = None;

        while self.toks.next_char_is('$') {
            let name_start = self.toks.cursor();
            let name = Identifier::from(self.toks.variable_name()?);
            let name_span = self.toks.span_from(name_start);
            self.toks.skip_ws()?;

            let mut default = None;

            if self.toks.eat_char(':') {
                self.toks.skip_ws()?;
                default = Some(self.parse_space_list(None)?.node);
            } else if self.toks.eat_char('.') {
                self.toks.expect_char('.')?;
                self.toks.expect_char('.')?;
                self.toks.skip_ws()?;
                rest_argument = Some(name);
                break;
            }

            arguments.push(Argument { name, default });

            if !seen.insert(name) {
                return Err(("Duplicate argument.", name_span).into());
            }

            if !self.toks.eat_char(',') {
                break;
            }
            self.toks.skip_ws()?;
        }
        self.toks.expect_char(')')?;

        Ok(ArgumentDeclaration {
            args: arguments,
            rest: rest_argument,
        })
    }

    fn parse_function_rule(&mut self, start: usize) -> CompileResult<AstStmt> {
        let name_start = self.toks.cursor();
        let name = self.toks.ident(true, false)?;
        let name_span = self.toks.span_from(name_start);
        self.toks.skip_ws()?;
        let arguments = self.parse_argument_declaration()?;

        if self.flags.in_mixin() || self.flags.in_content_block() {
            return Err((
                "Mixins may not contain function declarations.",
                self.toks.span_from(start),
            )
                .into());
        }
        if self.flags.in_control_flow() {
            return Err((
                "Functions may not be declared in control directives.",
                self.toks.span_from(start),
            )
                .into());
        }
        if RESERVED_IDENTIFIERS.contains(&unvendor(&name)) {
            return Err(("Invalid function name.", self.toks.span_from(start)).into());
        }

        self.toks.skip_ws()?;

        let body = self.parse_block(BodyKind::Function)?.node;

        Ok(AstStmt::FunctionDecl(AstFunctionDecl {
            name: Spanned {
                node: Identifier::from(name),
                span: name_span,
            },
            arguments,
            body,
        }))
    }

    fn parse_function_child(&mut self) -> CompileResult<AstStmt> {
        let start = self.toks.cursor();

        if !self.toks.next_char_is('@') {
            match self.parse_variable_declaration_with_namespace() {
                Ok(decl) => return Ok(AstStmt::VariableDecl(decl)),
                Err(e) => {
                    self.toks.set_cursor(start);

                    // Try to produce a better error than "expected .": was
                    // this a style rule or a declaration?
                    let stmt = match self.parse_declaration_or_style_rule() {
                        Ok(stmt) => stmt,
                        Err(..) => return Err(e),
                    };

                    let (is_style_rule, span) = match stmt {
                        AstStmt::RuleSet(ruleset) => (true, ruleset.span),
                        AstStmt::Style(style) => (false, style.span),
                        _ => return Err(e),
                    };

                    return Err((
                        format!(
                            "@function rules may not contain {}.",
                            if is_style_rule {
                                "style rules"
                            } else {
                                "declarations"
                            }
                        ),
                        span,
                    )
                        .into());
                }
            }
        }

        match self.plain_at_rule_name()?.as_str() {
            "debug" => self.parse_debug_rule(),
            "each" => self.parse_each_rule(BodyKind::Function),
            "else" => self.parse_disallowed_at_rule(start),
            "error" => self.parse_error_rule(),
            "for" => self.parse_for_rule(BodyKind::Function),
            "if" => self.parse_if_rule(BodyKind::Function),
            "return" => self.parse_return_rule(),
            "warn" => self.parse_warn_rule(),
            "while" => self.parse_while_rule(BodyKind::Function),
            _ => self.parse_disallowed_at_rule(start),
        }
    }

    fn parse_mixin_rule(&mut self, start: usize) -> CompileResult<AstStmt> {
        let name = Identifier::from(self.toks.ident(true, false)?);
        self.toks.skip_ws()?;
        let args = if self.toks.next_char_is('(') {
            self.parse_argument_declaration()?
        } else {
            ArgumentDeclaration::empty()
        };

        if self.flags.in_mixin() || self.flags.in_content_block() {
            return Err((
                "Mixins may not contain mixin declarations.",
                self.toks.span_from(start),
            )
                .into());
        }
        if self.flags.in_control_flow() {
            return Err((
                "Mixins may not be declared in control directives.",
                self.toks.span_from(start),
            )
                .into());
        }

        self.toks.skip_ws()?;

        let had_content = self.flags.found_content_rule();
        self.flags.set(ContextFlags::FOUND_CONTENT_RULE, false);
        self.flags.set(ContextFlags::IN_MIXIN, true);

        let body = self.parse_block(BodyKind::Statement)?.node;

        let has_content = self.flags.found_content_rule();

        self.flags
            .set(ContextFlags::FOUND_CONTENT_RULE, had_content);
        self.flags.set(ContextFlags::IN_MIXIN, false);

        Ok(AstStmt::Mixin(AstMixin {
            name,
            args,
            body,
            has_content,
        }))
    }

    fn parse_public_identifier(&mut self) -> CompileResult<String> {
        let start = self.toks.cursor();
        let ident = self.toks.ident(true, false)?;
        Self::assert_public(&ident, self.toks.span_from(start))?;

        Ok(ident)
    }

    fn assert_public(ident: &str, span: Span) -> CompileResult<()> {
        if ident.starts_with('-') || ident.starts_with('_') {
            return Err((
                "Private members can't be accessed from outside their modules.",
                span,
            )
                .into());
        }

        Ok(())
    }

    fn parse_include_rule(&mut self) -> CompileResult<AstStmt> {
        let mut namespace: Option<Spanned<Identifier>> = None;

        let name_start = self.toks.cursor();
        let mut name = self.toks.ident(false, false)?;

        if self.toks.eat_char('.') {
            let namespace_span = self.toks.span_from(name_start);
            namespace = Some(Spanned {
                node: Identifier::from(name),
                span: namespace_span,
            });
            name = self.parse_public_identifier()?;
        } else {
            name = name.replace('_', "-");
        }

        let name = Identifier::from(name);
        let name_span = self.toks.span_from(name_start);

        self.toks.skip_ws()?;

        let args = if self.toks.next_char_is('(') {
            self.parse_argument_invocation()?
        } else {
            ArgumentInvocation::empty(self.toks.current_span())
        };

        self.toks.skip_ws()?;

        let content_args = if self.toks.eat_ident("using", false)? {
            self.toks.skip_ws()?;
            let args = self.parse_argument_declaration()?;
            self.toks.skip_ws()?;
            Some(args)
        } else {
            None
        };

        let mut content = None;

        if content_args.is_some() || self.looking_at_block() {
            let content_args = content_args.unwrap_or_else(ArgumentDeclaration::empty);
            let was_in_content_block = self.flags.in_content_block();
            self.flags.set(ContextFlags::IN_CONTENT_BLOCK, true);
            let body = self.parse_block(BodyKind::Statement)?.node;
            content = Some(AstContentBlock {
                args: content_args,
                body,
            });
            self.flags
                .set(ContextFlags::IN_CONTENT_BLOCK, was_in_content_block);
        } else {
            self.expect_statement_separator()?;
        }

        Ok(AstStmt::Include(AstInclude {
            namespace,
            name: Spanned {
                node: name,
                span: name_span,
            },
            args,
            content,
            span: name_span,
        }))
    }

    // ===================== media and supports =====================

    fn parse_media_rule(&mut self, start: usize) -> CompileResult<AstStmt> {
        let query_start = self.toks.cursor();
        let query = self.parse_media_query_text()?;
        let query_span = self.toks.span_from(query_start);

        let body = self.parse_block(BodyKind::Statement)?.node;

        Ok(AstStmt::Media(AstMedia {
            query,
            query_span,
            body,
            span: self.toks.span_from(start),
        }))
    }

    /// Collects the interpolated text of a media query list; the structured
    /// parse happens at evaluation time, once interpolation is resolved.
    fn parse_media_query_text(&mut self) -> CompileResult<InterpolatedText> {
        let mut text = InterpolatedText::new();
        loop {
            self.toks.skip_ws()?;
            self.parse_one_media_query(&mut text)?;
            self.toks.skip_ws()?;
            if !self.toks.eat_char(',') {
                break;
            }
            text.push_text(", ");
        }
        Ok(text)
    }

    fn parse_one_media_query(&mut self, text: &mut InterpolatedText) -> CompileResult<()> {
        if self.toks.next_char_is('(') {
            self.parse_media_condition(text)?;
            self.toks.skip_ws()?;

            if self.toks.eat_ident("and", false)? {
                text.push_text(" and ");
                self.toks.expect_ws()?;
                self.parse_media_condition_chain(text, "and")?;
            } else if self.toks.eat_ident("or", false)? {
                text.push_text(" or ");
                self.toks.expect_ws()?;
                self.parse_media_condition_chain(text, "or")?;
            }

            return Ok(());
        }

        if self.toks.next_char_is('#') {
            // A bare interpolated query such as `@media #{$query}`.
            text.append(self.parse_interpolated_identifier()?);
            self.toks.skip_ws()?;
        } else {
            let first_word = self.parse_interpolated_identifier()?;
            let first_is_not = first_word
                .as_plain()
                .map_or(false, |w| w.eq_ignore_ascii_case("not"));

            text.append(first_word);

            if first_is_not {
                self.toks.expect_ws()?;
                text.push_char(' ');

                if !self.looking_at_interpolated_identifier() {
                    self.parse_media_condition(text)?;
                    return Ok(());
                }
            }

            self.toks.skip_ws()?;

            if !self.looking_at_interpolated_identifier() {
                return Ok(());
            }

            text.push_char(' ');
            let second_word = self.parse_interpolated_identifier()?;

            if second_word
                .as_plain()
                .map_or(false, |w| w.eq_ignore_ascii_case("and"))
            {
                self.toks.expect_ws()?;
                text.push_text("and ");
            } else {
                self.toks.skip_ws()?;
                text.append(second_word);

                if self.toks.eat_ident("and", false)? {
                    self.toks.expect_ws()?;
                    text.push_text(" and ");
                } else {
                    return Ok(());
                }
            }

            if self.toks.eat_ident("not", false)? {
                self.toks.expect_ws()?;
                text.push_text("not ");
                self.parse_media_condition(text)?;
                return Ok(());
            }

            self.parse_media_condition_chain(text, "and")?;
        }

        Ok(())
    }

    fn parse_media_condition(&mut self, text: &mut InterpolatedText) -> CompileResult<()> {
        self.toks.expect_char('(')?;
        text.push_char('(');
        self.toks.skip_ws()?;

        if self.toks.next_char_is('(') {
            self.parse_media_condition(text)?;
            self.toks.skip_ws()?;

            if self.toks.eat_ident("and", false)? {
                text.push_text(" and ");
                self.toks.expect_ws()?;
                self.parse_media_condition_chain(text, "and")?;
            } else if self.toks.eat_ident("or", false)? {
                text.push_text(" or ");
                self.toks.expect_ws()?;
                self.parse_media_condition_chain(text, "or")?;
            }
        } else if self.toks.eat_ident("not", false)? {
            text.push_text("not ");
            self.toks.expect_ws()?;
            self.parse_media_condition(text)?;
        } else {
            text.push_expr(self.parse_expression_until_comparison()?);

            if self.toks.eat_char(':') {
                self.toks.skip_ws()?;
                text.push_text(": ");
                text.push_expr(self.parse_expression(None)?);
            } else {
                // Range syntax: `(400px < width < 700px)`.
                while matches!(
                    self.toks.peek(),
                    Some(Token {
                        kind: '<' | '>' | '=',
                        ..
                    })
                ) {
                    let op = self.toks.next().unwrap();
                    text.push_char(' ');
                    text.push_char(op.kind);

                    if matches!(op.kind, '<' | '>') && self.toks.eat_char('=') {
                        text.push_char('=');
                    }

                    text.push_char(' ');

                    self.toks.skip_ws()?;
                    text.push_expr(self.parse_expression_until_comparison()?);
                }
            }
        }

        self.toks.expect_char(')')?;
        self.toks.skip_ws()?;
        text.push_char(')');

        Ok(())
    }

    fn parse_expression_until_comparison(&mut self) -> CompileResult<Spanned<crate::ast::AstExpr>> {
        self.parse_expression(Some(&|parser| match parser.toks.peek() {
            Some(Token {
                kind: '>' | '<' | ')' | ':',
                ..
            }) => true,
            Some(Token { kind: '=', .. }) => {
                !matches!(parser.toks.peek_n(1), Some(Token { kind: '=', .. }))
            }
            _ => false,
        }))
    }

    fn parse_media_condition_chain(
        &mut self,
        text: &mut InterpolatedText,
        operator: &'static str,
    ) -> CompileResult<()> {
        loop {
            self.parse_media_condition(text)?;
            self.toks.skip_ws()?;
            if !self.toks.eat_ident(operator, false)? {
                return Ok(());
            }
            self.toks.expect_ws()?;
            text.push_char(' ');
            text.push_text(operator);
            text.push_char(' ');
        }
    }

    fn parse_supports_rule(&mut self) -> CompileResult<AstStmt> {
        let condition = self.parse_supports_condition()?;
        self.toks.skip_ws()?;
        let children = self.parse_block(BodyKind::Statement)?;

        Ok(AstStmt::Supports(AstSupportsRule {
            condition,
            body: children.node,
            span: children.span,
        }))
    }

    fn parse_supports_condition(&mut self) -> CompileResult<AstSupportsCondition> {
        if self.toks.eat_ident("not", false)? {
            self.toks.skip_ws()?;
            return Ok(AstSupportsCondition::Negation(Box::new(
                self.parse_supports_condition_in_parens()?,
            )));
        }

        let mut condition = self.parse_supports_condition_in_parens()?;
        self.toks.skip_ws()?;

        while self.toks.at_identifier() {
            let operator = if self.toks.eat_ident("and", false)? {
                "and".to_owned()
            } else if self.toks.eat_ident("or", false)? {
                "or".to_owned()
            } else {
                break;
            };

            self.toks.expect_ws()?;

            let right = self.parse_supports_condition_in_parens()?;
            condition = AstSupportsCondition::Operation {
                left: Box::new(condition),
                operator: Some(operator),
                right: Box::new(right),
            };
            self.toks.skip_ws()?;
        }

        Ok(condition)
    }

    fn parse_supports_condition_in_parens(&mut self) -> CompileResult<AstSupportsCondition> {
        if self.looking_at_interpolated_identifier() {
            let identifier = self.parse_interpolated_identifier()?;

            if self.toks.next_char_is('(') {
                let mut args = InterpolatedText::new();
                self.toks.expect_char('(')?;
                self.parse_interpolated_balanced_text(&mut args, true)?;
                self.toks.expect_char(')')?;

                return Ok(AstSupportsCondition::Function {
                    name: identifier,
                    args,
                });
            }

            let (head, pairs) = identifier.into_parts();
            if head.is_empty() {
                if let [(expr, tail)] = pairs.as_slice() {
                    if tail.is_empty() {
                        return Ok(AstSupportsCondition::Interpolation(expr.node.clone()));
                    }
                }
            }

            return Err(("Expected @supports condition.", self.toks.current_span()).into());
        }

        self.toks.expect_char('(')?;
        self.toks.skip_ws()?;

        if self.toks.eat_ident("not", false)? {
            self.toks.skip_ws()?;
            let condition = self.parse_supports_condition_in_parens()?;
            self.toks.expect_char(')')?;
            return Ok(AstSupportsCondition::Negation(Box::new(condition)));
        }

        if self.toks.next_char_is('(') {
            let condition = self.parse_supports_condition()?;
            self.toks.expect_char(')')?;
            return Ok(condition);
        }

        // A declaration condition: `(display: flex)`.
        let name = self.parse_expression(Some(&|parser| parser.toks.next_char_is(':')))?;
        self.toks.expect_char(':')?;
        self.toks.skip_ws()?;
        let value = self.parse_expression(Some(&|parser| parser.toks.next_char_is(')')))?;
        self.toks.expect_char(')')?;

        Ok(AstSupportsCondition::Declaration {
            name: name.node,
            value: value.node,
        })
    }

    // ===================== modules =====================

    fn parse_use_rule(&mut self, start: usize) -> CompileResult<AstStmt> {
        let url_start = self.toks.cursor();
        let url = self.toks.quoted_string()?;
        let url_span = self.toks.span_from(url_start);
        self.toks.skip_ws()?;

        let path = PathBuf::from(url);

        let namespace = self.parse_use_namespace(path.as_ref(), url_span)?;
        self.toks.skip_ws()?;
        let configuration = self.parse_with_configuration(false)?;

        self.expect_statement_separator()?;

        let span = self.toks.span_from(start);

        if !self.flags.is_use_allowed() {
            return Err(("@use rules must be written before any other rules.", span).into());
        }

        Ok(AstStmt::Use(AstUseRule {
            url: path,
            namespace,
            configuration: configuration.unwrap_or_default(),
            span,
        }))
    }

    fn parse_use_namespace(
        &mut self,
        url: &Path,
        url_span: Span,
    ) -> CompileResult<Option<String>> {
        if self.toks.eat_ident("as", false)? {
            self.toks.skip_ws()?;
            return Ok(if self.toks.eat_char('*') {
                None
            } else {
                Some(self.toks.ident(false, false)?)
            });
        }

        if url.to_string_lossy().starts_with("sass:") {
            return Ok(Some(url.to_string_lossy().into_owned()));
        }

        let base_name = url
            .file_name()
            .map_or_else(OsString::new, ToOwned::to_owned);
        let base_name = base_name.to_string_lossy();
        let dot = base_name.find('.');

        let start = usize::from(base_name.starts_with('_'));
        let end = dot.unwrap_or(base_name.len());
        let namespace = &base_name[start..end];

        let mut namespace_toks = Lexer::new_from_string(namespace, url_span);

        let identifier = if namespace.is_empty() {
            Err(("Expected identifier.", url_span).into())
        } else {
            mem::swap(&mut self.toks, &mut namespace_toks);
            let ident = self.toks.ident(false, false);
            mem::swap(&mut self.toks, &mut namespace_toks);
            ident
        };

        match (identifier, namespace_toks.peek().is_none()) {
            (Ok(i), true) => Ok(Some(i)),
            _ => Err((
                format!(
                    "The default namespace \"{namespace}\" is not a valid Sass identifier.\n\n\
                     Recommendation: add an \"as\" clause to define an explicit namespace.",
                    namespace = namespace
                ),
                url_span,
            )
                .into()),
        }
    }

    fn parse_with_configuration(
        &mut self,
        allow_guarded: bool,
    ) -> CompileResult<Option<Vec<ConfiguredVariable>>> {
        if !self.toks.eat_ident("with", false)? {
            return Ok(None);
        }

        let mut seen = HashSet::new();
        let mut configuration = Vec::new();
        self.toks.skip_ws()?;
        self.toks.expect_char('(')?;

        loop {
            self.toks.skip_ws()?;
            let var_start = self.toks.cursor();
            let name = Identifier::from(self.toks.variable_name()?);
            let name_span = self.toks.span_from(var_start);
            self.toks.skip_ws()?;
            self.toks.expect_char(':')?;
            self.toks.skip_ws()?;
            let expr = self.parse_space_list(None)?;

            let mut is_guarded = false;
            let flag_start = self.toks.cursor();
            if allow_guarded && self.toks.eat_char('!') {
                if self.toks.ident(false, false)? == "default" {
                    is_guarded = true;
                    self.toks.skip_ws()?;
                } else {
                    return Err(("Invalid flag name.", self.toks.span_from(flag_start)).into());
                }
            }

            let span = self.toks.span_from(var_start);
            if !seen.insert(name) {
                return Err(("The same variable may only be configured once.", span).into());
            }

            configuration.push(ConfiguredVariable {
                name: Spanned {
                    node: name,
                    span: name_span,
                },
                expr,
                is_guarded,
            });

            if !self.toks.eat_char(',') {
                break;
            }
            self.toks.skip_ws()?;
            if !self.looking_at_expression() {
                break;
            }
        }

        self.toks.expect_char(')')?;

        Ok(Some(configuration))
    }

    fn parse_forward_rule(&mut self, start: usize) -> CompileResult<AstStmt> {
        let url = PathBuf::from(self.toks.quoted_string()?);
        self.toks.skip_ws()?;

        let prefix = if self.toks.eat_ident("as", false)? {
            self.toks.skip_ws()?;
            let prefix = self.toks.ident(true, false)?;
            self.toks.expect_char('*')?;
            self.toks.skip_ws()?;
            Some(prefix)
        } else {
            None
        };

        let mut visibility: Option<(bool, HashSet<Identifier>, HashSet<Identifier>)> = None;

        if self.toks.eat_ident("show", false)? {
            let (members, variables) = self.parse_member_list()?;
            visibility = Some((true, members, variables));
        } else if self.toks.eat_ident("hide", false)? {
            let (members, variables) = self.parse_member_list()?;
            visibility = Some((false, members, variables));
        }

        let config = self.parse_with_configuration(true)?;

        self.expect_statement_separator()?;
        let span = self.toks.span_from(start);

        if !self.flags.is_use_allowed() {
            return Err((
                "@forward rules must be written before any other rules.",
                span,
            )
                .into());
        }

        Ok(AstStmt::Forward(match visibility {
            Some((true, members, variables)) => {
                AstForwardRule::show(url, members, variables, prefix, config, span)
            }
            Some((false, members, variables)) => {
                AstForwardRule::hide(url, members, variables, prefix, config, span)
            }
            None => AstForwardRule::new(url, prefix, config, span),
        }))
    }

    fn parse_member_list(&mut self) -> CompileResult<(HashSet<Identifier>, HashSet<Identifier>)> {
        let mut members = HashSet::new();
        let mut variables = HashSet::new();

        loop {
            self.toks.skip_ws()?;

            if self.toks.next_char_is('$') {
                variables.insert(Identifier::from(self.toks.variable_name()?));
            } else {
                members.insert(Identifier::from(self.toks.ident(true, false)?));
            }

            self.toks.skip_ws()?;

            if !self.toks.eat_char(',') {
                break;
            }
        }

        Ok((members, variables))
    }

    fn parse_import_rule(&mut self, start: usize) -> CompileResult<AstStmt> {
        let mut imports = Vec::new();

        loop {
            self.toks.skip_ws()?;
            let argument = self.parse_import_argument()?;

            if (self.flags.in_control_flow() || self.flags.in_mixin()) && argument.is_dynamic() {
                self.parse_disallowed_at_rule(start)?;
            }

            imports.push(argument);
            self.toks.skip_ws()?;

            if !self.toks.eat_char(',') {
                break;
            }
        }

        self.expect_statement_separator()?;

        Ok(AstStmt::ImportRule(AstImportRule { imports }))
    }

    fn parse_import_argument(&mut self) -> CompileResult<AstImport> {
        let start = self.toks.cursor();

        if self.toks.next_char_is('u') || self.toks.next_char_is('U') {
            if let Some(url) = self.toks.url_token()? {
                let span = self.toks.span_from(start);
                return Ok(AstImport::Plain(AstPlainCssImport {
                    url: InterpolatedText::from_plain(url),
                    modifiers: None,
                    span,
                }));
            }
        }

        let url = self.toks.quoted_string()?;
        let span = self.toks.span_from(start);

        if is_plain_css_import(&url) {
            Ok(AstImport::Plain(AstPlainCssImport {
                url: InterpolatedText::from_plain(format!("\"{}\"", url)),
                modifiers: None,
                span,
            }))
        } else {
            Ok(AstImport::Sass(AstSassImport { url, span }))
        }
    }

    // ===================== declarations and style rules =====================

    fn parse_variable_declaration_or_style_rule(&mut self) -> CompileResult<AstStmt> {
        let start = self.toks.cursor();

        if !self.toks.at_identifier() {
            return self.parse_style_rule(None, None);
        }

        match self.parse_variable_declaration_or_name()? {
            VariableOrName::VariableDecl(var) => Ok(AstStmt::VariableDecl(var)),
            VariableOrName::Name(name) => self.parse_style_rule(Some(name), Some(start)),
        }
    }

    fn parse_declaration_or_style_rule(&mut self) -> CompileResult<AstStmt> {
        let start = self.toks.cursor();

        match self.parse_declaration_head()? {
            DeclarationHead::Stmt(stmt) => Ok(stmt),
            DeclarationHead::SelectorText(head) => self.parse_style_rule(Some(head), Some(start)),
        }
    }

    /// Disambiguates `name: value` declarations from selectors, following
    /// the same backtracking strategy as dart-sass: optimistically parse a
    /// declaration, and rewind to selector text when the tail disproves it.
    fn parse_declaration_head(&mut self) -> CompileResult<DeclarationHead> {
        let start = self.toks.cursor();
        let mut name = InterpolatedText::new();

        // Allow the "*prop: val", ":prop: val", "#prop: val", and
        // ".prop: val" hacks.
        let has_hack = self.at_declaration_hack();
        if has_hack {
            name.push_char(self.toks.next().unwrap().kind);
            let ws_start = self.toks.cursor();
            self.toks.skip_ws()?;
            name.push_text(&self.toks.raw_text(ws_start));
        }

        if !self.looking_at_interpolated_identifier() {
            return Ok(DeclarationHead::SelectorText(name));
        }

        if has_hack {
            name.append(self.parse_interpolated_identifier()?);
        } else {
            match self.parse_variable_declaration_or_name()? {
                VariableOrName::VariableDecl(decl) => {
                    return Ok(DeclarationHead::Stmt(AstStmt::VariableDecl(decl)))
                }
                VariableOrName::Name(parsed) => name.append(parsed),
            }
        }

        self.flags.set(ContextFlags::IS_USE_ALLOWED, false);

        if self.toks.starts_with("/*") {
            let comment_start = self.toks.cursor();
            self.toks.skip_block_comment()?;
            name.push_text(&self.toks.raw_text(comment_start));
        }

        let ws_start = self.toks.cursor();
        self.toks.skip_ws()?;
        let mid_ws = self.toks.raw_text(ws_start);

        if !self.toks.eat_char(':') {
            if !mid_ws.is_empty() {
                name.push_char(' ');
            }
            return Ok(DeclarationHead::SelectorText(name));
        }

        // Custom properties are always declarations; their values stay raw
        // apart from interpolation.
        if name.leading_text().starts_with("--") {
            return Ok(DeclarationHead::Stmt(self.parse_custom_property(name, start)?));
        }

        // A second colon means this was a pseudo selector all along.
        if self.toks.eat_char(':') {
            name.push_text(&mid_ws);
            name.push_char(':');
            return Ok(DeclarationHead::SelectorText(name));
        }

        let post_colon_start = self.toks.cursor();
        self.toks.skip_ws()?;
        let post_colon_ws = self.toks.raw_text(post_colon_start);

        if self.looking_at_block() {
            let body = self.parse_block(BodyKind::Declaration)?.node;
            return Ok(DeclarationHead::Stmt(AstStmt::Style(AstStyle {
                name,
                value: None,
                span: self.toks.span_from(start),
                body,
            })));
        }

        let could_be_selector =
            post_colon_ws.is_empty() && self.looking_at_interpolated_identifier();

        let before_value = self.toks.cursor();

        let value = loop {
            match self.parse_expression(None) {
                Ok(value) => {
                    if self.looking_at_block() {
                        // `a:hover {` parses as a value followed by a block;
                        // when it could have been a selector, it is one.
                        if !could_be_selector {
                            break value;
                        }
                    } else if self.at_end_of_statement() {
                        break value;
                    } else if !could_be_selector {
                        self.expect_statement_separator()?;
                        break value;
                    }
                }
                Err(e) => {
                    if !could_be_selector {
                        return Err(e);
                    }
                }
            }

            // Rewind and re-read the tail as selector text.
            self.toks.set_cursor(before_value);
            let tail = self.almost_any_value(false)?;
            if self.toks.next_char_is(';') {
                return Err(("Expected expression.", self.toks.current_span()).into());
            }

            name.push_text(&mid_ws);
            name.push_char(':');
            name.push_text(&post_colon_ws);
            name.append(tail);
            return Ok(DeclarationHead::SelectorText(name));
        };

        let body = if self.looking_at_block() {
            self.parse_block(BodyKind::Declaration)?.node
        } else {
            self.expect_statement_separator()?;
            Vec::new()
        };

        Ok(DeclarationHead::Stmt(AstStmt::Style(AstStyle {
            name,
            value: Some(value),
            span: self.toks.span_from(start),
            body,
        })))
    }

    fn at_declaration_hack(&self) -> bool {
        match self.toks.peek().map(|tok| tok.kind) {
            Some(':' | '*' | '.') => true,
            Some('#') => !matches!(self.toks.peek_n(1), Some(Token { kind: '{', .. })),
            _ => false,
        }
    }

    fn parse_custom_property(
        &mut self,
        name: InterpolatedText,
        start: usize,
    ) -> CompileResult<AstStmt> {
        let value_start = self.toks.cursor();
        let mut value = InterpolatedText::new();
        self.parse_interpolated_balanced_text(&mut value, false)?;
        let value_span = self.toks.span_from(value_start);
        self.expect_statement_separator()?;

        Ok(AstStmt::Style(AstStyle {
            name,
            value: Some(
                AstExpr::String(StringExpr(value, QuoteKind::None), value_span).span(value_span),
            ),
            span: self.toks.span_from(start),
            body: Vec::new(),
        }))
    }

    fn parse_declaration_child(&mut self) -> CompileResult<AstStmt> {
        let start = self.toks.cursor();

        if self.toks.next_char_is('@') {
            self.parse_declaration_at_rule(start)
        } else {
            self.parse_nested_property()
        }
    }

    fn parse_declaration_at_rule(&mut self, start: usize) -> CompileResult<AstStmt> {
        match self.plain_at_rule_name()?.as_str() {
            "content" => self.parse_content_rule(start),
            "debug" => self.parse_debug_rule(),
            "each" => self.parse_each_rule(BodyKind::Declaration),
            "else" => self.parse_disallowed_at_rule(start),
            "error" => self.parse_error_rule(),
            "for" => self.parse_for_rule(BodyKind::Declaration),
            "if" => self.parse_if_rule(BodyKind::Declaration),
            "include" => self.parse_include_rule(),
            "warn" => self.parse_warn_rule(),
            "while" => self.parse_while_rule(BodyKind::Declaration),
            _ => self.parse_disallowed_at_rule(start),
        }
    }

    /// A nested property: `size: 12px` inside `font: { ... }`.
    fn parse_nested_property(&mut self) -> CompileResult<AstStmt> {
        let start = self.toks.cursor();

        let name = match self.parse_variable_declaration_or_name()? {
            VariableOrName::Name(name) => name,
            VariableOrName::VariableDecl(decl) => return Ok(AstStmt::VariableDecl(decl)),
        };

        self.toks.skip_ws()?;
        self.toks.expect_char(':')?;
        self.toks.skip_ws()?;

        if self.looking_at_block() {
            let body = self.parse_block(BodyKind::Declaration)?.node;
            return Ok(AstStmt::Style(AstStyle {
                name,
                value: None,
                span: self.toks.span_from(start),
                body,
            }));
        }

        let value = self.parse_expression(None)?;

        let body = if self.looking_at_block() {
            self.parse_block(BodyKind::Declaration)?.node
        } else {
            self.expect_statement_separator()?;
            Vec::new()
        };

        Ok(AstStmt::Style(AstStyle {
            name,
            value: Some(value),
            span: self.toks.span_from(start),
            body,
        }))
    }

    fn parse_style_rule(
        &mut self,
        head: Option<InterpolatedText>,
        start: Option<usize>,
    ) -> CompileResult<AstStmt> {
        let start = start.unwrap_or_else(|| self.toks.cursor());

        self.flags.set(ContextFlags::IS_USE_ALLOWED, false);
        let tail = self.almost_any_value(false)?;

        let selector = match head {
            Some(mut head) => {
                head.append(tail);
                head
            }
            None => tail,
        };

        if selector.is_empty() {
            return Err(("expected \"}\".", self.toks.current_span()).into());
        }

        let was_in_style_rule = self.flags.in_style_rule();
        self.flags.set(ContextFlags::IN_STYLE_RULE, true);

        let selector_span = self.toks.span_from(start);

        let children = self.parse_block(BodyKind::Statement)?;

        self.flags
            .set(ContextFlags::IN_STYLE_RULE, was_in_style_rule);

        Ok(AstStmt::RuleSet(AstRuleSet {
            selector,
            body: children.node,
            selector_span,
            span: selector_span.merge(children.span),
        }))
    }

    // ===================== variables =====================

    fn parse_variable_declaration_with_namespace(&mut self) -> CompileResult<AstVariableDecl> {
        let start = self.toks.cursor();
        let namespace = self.toks.ident(false, false)?;
        let namespace_span = self.toks.span_from(start);
        self.toks.expect_char('.')?;
        self.parse_variable_declaration_without_namespace(
            Some(Spanned {
                node: Identifier::from(namespace),
                span: namespace_span,
            }),
            Some(start),
        )
    }

    fn parse_variable_declaration_without_namespace(
        &mut self,
        namespace: Option<Spanned<Identifier>>,
        start: Option<usize>,
    ) -> CompileResult<AstVariableDecl> {
        let start = start.unwrap_or_else(|| self.toks.cursor());

        let name = self.toks.variable_name()?;

        if namespace.is_some() {
            Self::assert_public(&name, self.toks.span_from(start))?;
        }

        self.toks.skip_ws()?;
        self.toks.expect_char(':')?;
        self.toks.skip_ws()?;

        let value = self.parse_expression(None)?.node;

        let mut is_guarded = false;
        let mut is_global = false;

        while self.toks.eat_char('!') {
            let flag_start = self.toks.cursor();

            match self.toks.ident(false, false)?.as_str() {
                "default" => is_guarded = true,
                "global" => {
                    if namespace.is_some() {
                        return Err((
                            "!global isn't allowed for variables in other modules.",
                            self.toks.span_from(flag_start),
                        )
                            .into());
                    }

                    is_global = true;
                }
                _ => {
                    return Err(("Invalid flag name.", self.toks.span_from(flag_start)).into())
                }
            }

            self.toks.skip_ws()?;
        }

        self.expect_statement_separator()?;

        Ok(AstVariableDecl {
            namespace,
            name: Identifier::from(name),
            value,
            is_guarded,
            is_global,
            span: self.toks.span_from(start),
        })
    }

    fn parse_variable_declaration_or_name(&mut self) -> CompileResult<VariableOrName> {
        if !self.toks.at_identifier() {
            return Ok(VariableOrName::Name(self.parse_interpolated_identifier()?));
        }

        let start = self.toks.cursor();

        let ident = self.toks.ident(false, false)?;
        if self.toks.starts_with(".$") {
            let namespace_span = self.toks.span_from(start);
            self.toks.expect_char('.')?;
            Ok(VariableOrName::VariableDecl(
                self.parse_variable_declaration_without_namespace(
                    Some(Spanned {
                        node: Identifier::from(ident),
                        span: namespace_span,
                    }),
                    Some(start),
                )?,
            ))
        } else {
            let mut name = InterpolatedText::from_plain(ident);

            if self.looking_at_interpolated_identifier_body() {
                name.append(self.parse_interpolated_identifier()?);
            }

            Ok(VariableOrName::Name(name))
        }
    }

    // ===================== comments and raw text =====================

    fn parse_silent_comment(&mut self) -> CompileResult<AstStmt> {
        let start = self.toks.cursor();
        debug_assert!(self.toks.starts_with("//"));
        self.toks.next();
        self.toks.next();

        let mut text = String::new();

        while let Some(tok) = self.toks.next() {
            if tok.kind == '\n' {
                self.toks.skip_ws_no_comments();
                if self.toks.starts_with("//") {
                    self.toks.next();
                    self.toks.next();
                    text.clear();
                    continue;
                }
                break;
            }

            text.push(tok.kind);
        }

        self.toks.skip_ws_no_comments();

        Ok(AstStmt::SilentComment(AstSilentComment {
            text,
            span: self.toks.span_from(start),
        }))
    }

    fn parse_loud_comment(&mut self) -> CompileResult<AstLoudComment> {
        let start = self.toks.cursor();
        self.toks.expect_char('/')?;
        self.toks.expect_char('*')?;

        let mut text = InterpolatedText::from_plain("/*".to_owned());

        while let Some(tok) = self.toks.peek() {
            match tok.kind {
                '#' => {
                    if matches!(self.toks.peek_n(1), Some(Token { kind: '{', .. })) {
                        let expr = self.parse_single_interpolation()?;
                        text.push_expr(expr);
                    } else {
                        self.toks.next();
                        text.push_char('#');
                    }
                }
                '*' => {
                    self.toks.next();
                    text.push_char('*');

                    if self.toks.eat_char('/') {
                        text.push_char('/');

                        return Ok(AstLoudComment {
                            text,
                            span: self.toks.span_from(start),
                        });
                    }
                }
                c => {
                    text.push_char(c);
                    self.toks.next();
                }
            }
        }

        Err(("expected more input.", self.toks.current_span()).into())
    }

    /// Consumes almost any text up to `{`, `}`, `;`, or `!`, preserving
    /// strings, comments, urls, and interpolation. Selector text is gathered
    /// this way and re-parsed against the resolved parent at evaluation
    /// time.
    fn almost_any_value(&mut self, omit_comments: bool) -> CompileResult<InterpolatedText> {
        let mut text = InterpolatedText::new();

        while let Some(tok) = self.toks.peek() {
            match tok.kind {
                '!' | ';' | '{' | '}' => break,
                '\\' => {
                    // Write a literal backslash: this text is re-parsed.
                    text.push_char('\\');
                    self.toks.next();
                    match self.toks.next() {
                        Some(tok) => text.push_char(tok.kind),
                        None => {
                            return Err(("expected more input.", self.toks.current_span()).into())
                        }
                    }
                }
                '"' | '\'' => {
                    text.append(
                        self.parse_interpolated_string()?
                            .node
                            .as_interpolation(false),
                    );
                }
                '/' => {
                    let comment_start = self.toks.cursor();
                    if self.toks.eat_comment()? {
                        if !omit_comments {
                            text.push_text(&self.toks.raw_text(comment_start));
                        }
                    } else {
                        self.toks.next();
                        text.push_char('/');
                    }
                }
                '#' => {
                    if matches!(self.toks.peek_n(1), Some(Token { kind: '{', .. })) {
                        // A full interpolated identifier handles cases like
                        // "#{...}--1", where "--1" isn't an identifier
                        // alone.
                        text.append(self.parse_interpolated_identifier()?);
                    } else {
                        self.toks.next();
                        text.push_char('#');
                    }
                }
                'u' | 'U' => match self.toks.url_token()? {
                    Some(url) => text.push_text(&url),
                    None => {
                        self.toks.next();
                        text.push_char(tok.kind);
                    }
                },
                c => {
                    if self.toks.at_identifier() {
                        let ident = self.toks.ident(false, false)?;
                        text.push_text(&ident);
                    } else {
                        self.toks.next();
                        text.push_char(c);
                    }
                }
            }
        }

        Ok(text)
    }

    /// Whether the next token starts an identifier that may include
    /// interpolation.
    fn looking_at_interpolated_identifier(&self) -> bool {
        let first = match self.toks.peek() {
            Some(tok) => tok,
            None => return false,
        };

        if crate::utils::is_name_start(first.kind) || first.kind == '\\' {
            return true;
        }

        if first.kind == '#' {
            return matches!(self.toks.peek_n(1), Some(Token { kind: '{', .. }));
        }

        if first.kind != '-' {
            return false;
        }

        match self.toks.peek_n(1) {
            Some(Token { kind: '#', .. }) => {
                matches!(self.toks.peek_n(2), Some(Token { kind: '{', .. }))
            }
            Some(Token { kind, .. }) => {
                crate::utils::is_name_start(kind) || kind == '-' || kind == '\\'
            }
            None => false,
        }
    }

    fn looking_at_interpolated_identifier_body(&self) -> bool {
        match self.toks.peek() {
            Some(Token { kind: '\\', .. }) => true,
            Some(Token { kind: '#', .. }) => {
                matches!(self.toks.peek_n(1), Some(Token { kind: '{', .. }))
            }
            Some(Token { kind, .. }) => crate::utils::is_name(kind),
            None => false,
        }
    }
}

/// Whether an `@import` url stays a plain CSS import.
fn is_plain_css_import(url: &str) -> bool {
    if url.len() < 5 {
        return false;
    }

    let lower = url.to_ascii_lowercase();

    lower.ends_with(".css")
        || lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("//")
}
