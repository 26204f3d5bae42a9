use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet, HashSet},
    ffi::OsStr,
    mem,
    path::{Path, PathBuf},
    rc::Rc,
    sync::Arc,
};

use codemap::{CodeMap, Span, Spanned};
use indexmap::IndexSet;

use crate::{
    ast::*,
    builtin::modules::{declare_builtin_module, is_builtin_module_url},
    common::{unvendor, Identifier},
    context_flags::ContextFlags,
    error::{CompileResult, Error, ErrorKind},
    interner::InternedString,
    lexer::Lexer,
    parse::{parse_at_root_query, parse_keyframes_selectors, ScssParser},
    selector::{ComplexSelectorComponent, ExtendRule, ExtendedSelector, Extender},
    value::{Function, Mixin, UserDefinedFunction, Value},
    Options,
};

use super::{
    configuration::{Configuration, ConfiguredValue},
    env::Environment,
    module::Module,
    tree::{CssTree, CssTreeIdx},
};

/// What a statement's execution asks of its enclosing body.
#[derive(Debug)]
pub(crate) enum Flow {
    /// Keep executing the current body.
    Continue,
    /// Unwind to the nearest function invocation with this value.
    Return(Value),
}

impl Flow {
    pub fn is_continue(&self) -> bool {
        matches!(self, Flow::Continue)
    }
}

/// A `@content` block captured at its `@include`, together with the
/// environment it closes over.
#[derive(Debug, Clone)]
pub struct ContentBlock {
    pub(super) block: AstContentBlock,
    pub(super) scope: Environment,
}

/// The tree-walking interpreter.
///
/// Walks the AST in program order, reading and writing the environment,
/// registering extensions, and emitting resolved statements into the CSS
/// tree.
pub struct Evaluator<'a> {
    pub env: Environment,
    pub flags: ContextFlags,
    pub extender: Extender,
    pub options: &'a Options<'a>,
    pub map: &'a mut CodeMap,

    pub(super) declaration_name: Option<String>,
    pub(super) current_rule: Option<ExtendedSelector>,
    pub(super) media_queries: Option<Vec<MediaQuery>>,
    pub(super) media_query_sources: Option<IndexSet<MediaQuery>>,
    pub(super) css_tree: CssTree,
    pub(super) parent: Option<CssTreeIdx>,
    pub(super) configuration: Configuration,
    pub(super) import_nodes: Vec<CssStmt>,
    pub(super) current_import_path: PathBuf,
    pub(super) blank_span: Span,
    /// Spans that already produced a warning; avoids duplicates from loops.
    pub(super) warnings_emitted: HashSet<Span>,

    /// Modules are compiled at most once per session; reloading a cached
    /// module with a fresh `with` configuration is an error.
    module_cache: BTreeMap<PathBuf, Rc<RefCell<Module>>>,
    /// Modules currently being executed, for loop detection.
    modules_loading: BTreeSet<PathBuf>,
    /// Parsed files, cached once a file is imported a second time.
    import_cache: BTreeMap<PathBuf, StyleSheet>,
    files_seen: BTreeSet<PathBuf>,

    /// Rule nesting plus callable recursion, checked against
    /// `Options::max_depth`.
    pub(super) depth: usize,
    /// Number of style rules lexically containing the current statement.
    pub(super) rule_depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        path: &Path,
        options: &'a Options<'a>,
        map: &'a mut CodeMap,
        blank_span: Span,
    ) -> Self {
        let mut flags = ContextFlags::empty();
        flags.set(ContextFlags::IN_SEMI_GLOBAL_SCOPE, true);

        Self {
            env: Environment::new(),
            flags,
            extender: Extender::new(blank_span),
            options,
            map,
            declaration_name: None,
            current_rule: None,
            media_queries: None,
            media_query_sources: None,
            css_tree: CssTree::new(),
            parent: None,
            configuration: Configuration::empty(),
            import_nodes: Vec::new(),
            current_import_path: path.to_path_buf(),
            blank_span,
            warnings_emitted: HashSet::new(),
            module_cache: BTreeMap::new(),
            modules_loading: BTreeSet::new(),
            import_cache: BTreeMap::new(),
            files_seen: BTreeSet::new(),
            depth: 0,
            rule_depth: 0,
        }
    }

    pub fn run_stylesheet(&mut self, mut sheet: StyleSheet) -> CompileResult<()> {
        mem::swap(&mut self.current_import_path, &mut sheet.url);
        let flow = self.exec_body(sheet.body);
        mem::swap(&mut self.current_import_path, &mut sheet.url);

        debug_assert!(flow.as_ref().map_or(true, Flow::is_continue));
        flow.map(|_| ())
    }

    /// Tears the evaluator down into the finished resolved tree, verifying
    /// that every mandatory `@extend` found its target.
    pub fn finish(mut self) -> CompileResult<Vec<CssStmt>> {
        if let Some((message, span)) = self.extender.check_unsatisfied_extensions() {
            if self.options.error_on_unsatisfied_extend {
                return Err((ErrorKind::UnsatisfiedExtend, message, span).into());
            }

            self.emit_warning(&message, span);
        }

        let mut tree = self.css_tree.finish();
        if self.import_nodes.is_empty() {
            Ok(tree)
        } else {
            self.import_nodes.append(&mut tree);
            Ok(self.import_nodes)
        }
    }

    // ===================== statement execution =====================

    pub(super) fn exec_body(&mut self, body: Vec<AstStmt>) -> CompileResult<Flow> {
        for stmt in body {
            match self.exec_stmt(stmt)? {
                Flow::Continue => {}
                returned => return Ok(returned),
            }
        }

        Ok(Flow::Continue)
    }

    /// Like [`Evaluator::exec_body`], for bodies the parser guarantees
    /// contain no `@return`.
    fn exec_output_body(&mut self, body: Vec<AstStmt>) -> CompileResult<()> {
        let flow = self.exec_body(body)?;
        debug_assert!(flow.is_continue());
        Ok(())
    }

    pub fn exec_stmt(&mut self, stmt: AstStmt) -> CompileResult<Flow> {
        // Declarations and scope effects.
        match stmt {
            AstStmt::VariableDecl(decl) => return self.exec_variable_decl(decl),
            AstStmt::FunctionDecl(decl) => {
                self.declare_function(decl);
                return Ok(Flow::Continue);
            }
            AstStmt::Mixin(decl) => {
                self.declare_mixin(decl);
                return Ok(Flow::Continue);
            }
            AstStmt::Return(ret) => {
                let value = self.eval(ret.val)?;
                return Ok(Flow::Return(value.without_slash()));
            }

            // Control flow.
            AstStmt::If(stmt) => return self.exec_if(stmt),
            AstStmt::For(stmt) => return self.exec_for(stmt),
            AstStmt::Each(stmt) => return self.exec_each(stmt),
            AstStmt::While(stmt) => return self.exec_while(&stmt),

            // Callables.
            AstStmt::Include(stmt) => return self.exec_include(stmt),
            AstStmt::ContentRule(stmt) => return self.exec_content_rule(stmt),

            _ => {}
        }

        // Everything below is output or module machinery and never returns
        // a value.
        match stmt {
            AstStmt::RuleSet(ruleset) => self.exec_ruleset(ruleset)?,
            AstStmt::Style(style) => self.exec_style(style)?,
            AstStmt::Media(media) => self.exec_media_rule(media)?,
            AstStmt::Supports(supports) => self.exec_supports_rule(supports)?,
            AstStmt::UnknownAtRule(at_rule) => self.exec_unknown_at_rule(at_rule)?,
            AstStmt::AtRootRule(at_root) => self.exec_at_root(at_root)?,
            AstStmt::Extend(extend) => self.exec_extend(extend)?,
            AstStmt::LoudComment(comment) => self.exec_loud_comment(comment)?,
            AstStmt::SilentComment(..) => {}
            AstStmt::Warn(warn) => self.exec_warn(warn)?,
            AstStmt::Debug(debug) => self.exec_debug(debug)?,
            AstStmt::ErrorRule(error) => return Err(self.exec_error_rule(error)?),
            AstStmt::Use(use_rule) => self.exec_use(use_rule)?,
            AstStmt::Forward(forward_rule) => self.exec_forward(forward_rule)?,
            AstStmt::ImportRule(import_rule) => self.exec_import(import_rule)?,
            AstStmt::VariableDecl(..)
            | AstStmt::FunctionDecl(..)
            | AstStmt::Mixin(..)
            | AstStmt::Return(..)
            | AstStmt::If(..)
            | AstStmt::For(..)
            | AstStmt::Each(..)
            | AstStmt::While(..)
            | AstStmt::Include(..)
            | AstStmt::ContentRule(..) => unreachable!("handled above"),
        }

        Ok(Flow::Continue)
    }

    pub(super) fn check_depth(&self, span: Span) -> CompileResult<()> {
        if self.depth > self.options.max_depth {
            return Err((
                ErrorKind::StackError,
                format!(
                    "Maximum nesting depth of {} exceeded.",
                    self.options.max_depth
                ),
                span,
            )
                .into());
        }

        Ok(())
    }

    // ===================== declarations =====================

    fn exec_variable_decl(&mut self, decl: AstVariableDecl) -> CompileResult<Flow> {
        let name = Spanned {
            node: decl.name,
            span: decl.span,
        };

        if decl.is_guarded {
            // A `with` override from an enclosing loader wins over the
            // default, and consumes the configured entry.
            if decl.namespace.is_none() && self.env.at_root() {
                let configured = self.configuration.remove(decl.name);
                match configured {
                    Some(ConfiguredValue { value, .. }) if !matches!(value, Value::Null) => {
                        self.env.insert_var(
                            name,
                            None,
                            value,
                            true,
                            self.flags.in_semi_global_scope(),
                        )?;
                        return Ok(Flow::Continue);
                    }
                    _ => {}
                }
            }

            if self.env.var_exists(decl.name, decl.namespace)? {
                let existing = self.env.get_var(name, decl.namespace)?;

                if existing != Value::Null {
                    return Ok(Flow::Continue);
                }
            }
        }

        let value = self.eval(decl.value)?.without_slash();

        self.env.insert_var(
            name,
            decl.namespace,
            value,
            decl.is_global,
            self.flags.in_semi_global_scope(),
        )?;

        Ok(Flow::Continue)
    }

    fn declare_function(&mut self, decl: AstFunctionDecl) {
        let name = decl.name.node;

        self.env.insert_fn(Function::UserDefined(UserDefinedFunction {
            function: Arc::new(decl),
            name,
            env: self.env.new_closure(),
        }));
    }

    fn declare_mixin(&mut self, decl: AstMixin) {
        let closure = self.env.new_closure();
        self.env.insert_mixin(decl.name, Mixin::UserDefined(decl, closure));
    }

    // ===================== control flow =====================

    fn exec_if(&mut self, stmt: AstIf) -> CompileResult<Flow> {
        let mut chosen = None;

        for clause in stmt.if_clauses {
            if self.eval(clause.condition)?.is_truthy() {
                chosen = Some(clause.body);
                break;
            }
        }

        let body = match chosen.or(stmt.else_clause) {
            Some(body) => body,
            None => return Ok(Flow::Continue),
        };

        self.scoped(false, |ev| ev.exec_body(body))
    }

    fn exec_for(&mut self, stmt: AstFor) -> CompileResult<Flow> {
        let from_span = stmt.from.span;
        let to_span = stmt.to.span;

        let from_bound = self.eval(stmt.from.node)?.assert_number(from_span)?;
        let to_bound = self.eval(stmt.to.node)?.assert_number(to_span)?;

        if !to_bound.unit().comparable(from_bound.unit()) {
            return Err((
                ErrorKind::IncompatibleUnits,
                format!(
                    "Incompatible units {} and {}.",
                    from_bound.unit(),
                    to_bound.unit()
                ),
                from_span.merge(to_span),
            )
                .into());
        }

        let from = from_bound.num.assert_int(from_span)?;
        let mut to = to_bound
            .num
            .convert(to_bound.unit(), from_bound.unit())
            .assert_int(to_span)?;

        let step = if from > to { -1 } else { 1 };
        if !stmt.is_exclusive {
            to += step;
        }

        if from == to {
            return Ok(Flow::Continue);
        }

        self.scoped(false, |ev| {
            let mut i = from;
            while i != to {
                ev.env.scopes_mut().insert_var_last(
                    stmt.variable.node,
                    Value::dimension(i, from_bound.unit().clone()),
                );

                match ev.exec_body(stmt.body.clone())? {
                    Flow::Continue => {}
                    returned => return Ok(returned),
                }

                i += step;
            }

            Ok(Flow::Continue)
        })
    }

    fn exec_each(&mut self, stmt: AstEach) -> CompileResult<Flow> {
        let items = self.eval(stmt.list)?.as_list();

        self.scoped(false, |ev| {
            for item in items {
                ev.bind_each_variables(&stmt.variables, item);

                match ev.exec_body(stmt.body.clone())? {
                    Flow::Continue => {}
                    returned => return Ok(returned),
                }
            }

            Ok(Flow::Continue)
        })
    }

    fn bind_each_variables(&mut self, variables: &[Identifier], item: Value) {
        if let [single] = variables {
            let item = item.without_slash();
            self.env.scopes_mut().insert_var_last(*single, item);
            return;
        }

        let mut values = item.as_list().into_iter();

        for &variable in variables {
            let value = values.next().unwrap_or(Value::Null).without_slash();
            self.env.scopes_mut().insert_var_last(variable, value);
        }
    }

    fn exec_while(&mut self, stmt: &AstWhile) -> CompileResult<Flow> {
        self.scoped(true, |ev| {
            while ev.eval(stmt.condition.clone())?.is_truthy() {
                match ev.exec_body(stmt.body.clone())? {
                    Flow::Continue => {}
                    returned => return Ok(returned),
                }
            }

            Ok(Flow::Continue)
        })
    }

    // ===================== scope helpers =====================

    pub(super) fn with_env<T>(
        &mut self,
        env: Environment,
        f: impl FnOnce(&mut Self) -> T,
    ) -> (T, Environment) {
        let mut previous = mem::replace(&mut self.env, env);
        let result = f(self);
        mem::swap(&mut self.env, &mut previous);
        (result, previous)
    }

    /// Runs `f` in a fresh lexical frame. `semi_global` keeps top-level
    /// variable writes global, as `@while`/`@import` bodies require.
    pub(super) fn scoped<T>(&mut self, semi_global: bool, f: impl FnOnce(&mut Self) -> T) -> T {
        let was_semi_global = self.flags.in_semi_global_scope();
        self.flags.set(
            ContextFlags::IN_SEMI_GLOBAL_SCOPE,
            semi_global && was_semi_global,
        );

        self.env.scopes_mut().enter_new_scope();
        let result = f(self);
        self.env.scopes_mut().exit_scope();

        self.flags
            .set(ContextFlags::IN_SEMI_GLOBAL_SCOPE, was_semi_global);

        result
    }

    /// Like [`Evaluator::scoped`], but without a new frame; only the
    /// semi-global flag is managed.
    pub(super) fn unscoped<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let was_semi_global = self.flags.in_semi_global_scope();
        self.flags.set(ContextFlags::IN_SEMI_GLOBAL_SCOPE, false);
        let result = f(self);
        self.flags
            .set(ContextFlags::IN_SEMI_GLOBAL_SCOPE, was_semi_global);
        result
    }

    pub(super) fn with_content_block<T>(
        &mut self,
        content: Option<Arc<ContentBlock>>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let previous = mem::replace(&mut self.env.content, content);
        let result = f(self);
        self.env.content = previous;
        result
    }

    pub(super) fn with_media<T>(
        &mut self,
        queries: Option<Vec<MediaQuery>>,
        sources: Option<IndexSet<MediaQuery>>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let old_queries = mem::replace(&mut self.media_queries, queries);
        let old_sources = mem::replace(&mut self.media_query_sources, sources);
        let result = f(self);
        self.media_queries = old_queries;
        self.media_query_sources = old_sources;
        result
    }

    // ===================== css tree plumbing =====================

    /// Attaches `node` under the current parent, first climbing past any
    /// ancestors `through` matches (style rules hoist out of one another,
    /// media rules hoist out of style rules, and so on).
    fn attach<F: Fn(&CssStmt) -> bool>(&mut self, node: CssStmt, through: Option<F>) -> CssTreeIdx {
        let mut parent = match self.parent {
            None | Some(CssTree::ROOT) => return self.css_tree.add_stmt(node, self.parent),
            Some(parent) => parent,
        };

        if let Some(through) = through {
            while parent != CssTree::ROOT && through(self.css_tree.get(parent).as_ref().unwrap()) {
                let grandparent = self.css_tree.parent_of(parent);
                debug_assert!(
                    grandparent.is_some(),
                    "through() must reject at least one ancestor"
                );
                parent = grandparent.unwrap();
            }

            // If the parent has a following sibling, duplicate its shell
            // rather than merging backwards past the sibling.
            if self.css_tree.has_following_sibling(parent) {
                let grandparent = self.css_tree.parent_of(parent).unwrap();
                let shell = self
                    .css_tree
                    .get(parent)
                    .as_ref()
                    .map(CssStmt::copy_without_children)
                    .unwrap();
                parent = self.css_tree.add_child(shell, grandparent);
            }
        }

        self.css_tree.add_child(node, parent)
    }

    /// Emits `parent_stmt` and runs `body` with it as the current parent,
    /// inside a fresh frame when `scope` is set.
    pub(super) fn nested_in<FT: Fn(&CssStmt) -> bool>(
        &mut self,
        parent_stmt: CssStmt,
        scope: bool,
        through: FT,
        body: impl FnOnce(&mut Self) -> CompileResult<()>,
    ) -> CompileResult<()> {
        let idx = self.attach(parent_stmt, Some(through));
        let old_parent = mem::replace(&mut self.parent, Some(idx));

        let result = if scope {
            self.scoped(false, body)
        } else {
            self.unscoped(body)
        };

        self.parent = old_parent;
        result
    }

    pub(super) fn style_rule_exists(&self) -> bool {
        !self.flags.at_root_excluding_style_rule() && self.current_rule.is_some()
    }

    // ===================== rules and output =====================

    fn exec_ruleset(&mut self, ruleset: AstRuleSet) -> CompileResult<()> {
        if self.declaration_name.is_some() {
            return Err((
                "Style rules may not be used within nested declarations.",
                ruleset.span,
            )
                .into());
        }

        self.depth += 1;
        let result = self.exec_ruleset_inner(ruleset);
        self.depth -= 1;

        result
    }

    fn exec_ruleset_inner(&mut self, ruleset: AstRuleSet) -> CompileResult<()> {
        self.check_depth(ruleset.span)?;

        let selector_text = self.eval_text_trimmed(ruleset.selector)?;
        let selector_span = ruleset.selector_span;
        let rule_span = ruleset.span;

        if self.flags.in_keyframes() {
            let keyframes = CssStmt::KeyframesRuleSet(KeyframesRuleSet {
                selector: parse_keyframes_selectors(Lexer::new_from_string(
                    &selector_text,
                    selector_span,
                ))?,
                body: Vec::new(),
                span: rule_span,
            });

            return self.nested_in(keyframes, true, CssStmt::is_style_rule, |ev| {
                ev.exec_output_body(ruleset.body)
            });
        }

        let parsed = self
            .selector_from_text(&selector_text, true, true, selector_span)?
            .resolve_parent_selectors(
                self.current_rule
                    .as_ref()
                    .map(|rule| rule.as_selector_list().clone()),
                !self.flags.at_root_excluding_style_rule(),
            )?;

        let selector = self.extender.add_selector(parsed, &self.media_queries)?;

        let rule = CssStmt::RuleSet {
            selector: selector.clone(),
            body: Vec::new(),
            is_group_end: false,
            depth: self.rule_depth,
            span: rule_span,
        };

        let was_at_root_excluding = self.flags.at_root_excluding_style_rule();
        self.flags
            .set(ContextFlags::AT_ROOT_EXCLUDING_STYLE_RULE, false);
        let enclosing_rule = mem::replace(&mut self.current_rule, Some(selector));
        self.rule_depth += 1;

        let result = self.nested_in(rule, true, CssStmt::is_style_rule, |ev| {
            ev.exec_output_body(ruleset.body)
        });

        self.rule_depth -= 1;
        self.current_rule = enclosing_rule;
        self.flags.set(
            ContextFlags::AT_ROOT_EXCLUDING_STYLE_RULE,
            was_at_root_excluding,
        );

        result?;

        self.mark_group_end();

        Ok(())
    }

    fn mark_group_end(&mut self) {
        if self.style_rule_exists() {
            return;
        }

        let last_child = self
            .css_tree
            .last_child(self.parent.unwrap_or(CssTree::ROOT));

        if let Some(child) = last_child {
            if let Some(stmt) = self.css_tree.get_mut(child).as_mut() {
                stmt.set_group_end();
            }
        }
    }

    fn exec_style(&mut self, style: AstStyle) -> CompileResult<()> {
        if !self.style_rule_exists()
            && !self.flags.in_unknown_at_rule()
            && !self.flags.in_keyframes()
        {
            return Err((
                "Declarations may only be used within style rules.",
                style.span,
            )
                .into());
        }

        let is_custom_property = style.is_custom_property();

        let mut name = self.eval_text(style.name)?;
        if let Some(prefix) = &self.declaration_name {
            name = format!("{}-{}", prefix, name);
        }

        if let Some(value_expr) = style.value {
            let span = value_expr.span;
            let value = Spanned {
                node: self.eval(value_expr.node)?,
                span,
            };

            // An empty list is preserved so serialization can report it;
            // blank values (null, invisible lists) elide the declaration.
            if !value.node.is_blank() || value.node.is_empty_list() {
                self.css_tree.add_stmt(
                    CssStmt::Style(Style {
                        property: InternedString::get_or_intern(&name),
                        value: Arc::new(value),
                        declared_as_custom_property: is_custom_property,
                    }),
                    self.parent,
                );
            } else if name.starts_with("--") {
                return Err(("Custom property values may not be empty.", style.span).into());
            }
        }

        if !style.body.is_empty() {
            let enclosing = mem::replace(&mut self.declaration_name, Some(name));
            let result = self.scoped(false, |ev| ev.exec_output_body(style.body));
            self.declaration_name = enclosing;
            result?;
        }

        Ok(())
    }

    fn exec_loud_comment(&mut self, comment: AstLoudComment) -> CompileResult<()> {
        if self.flags.in_function() {
            return Ok(());
        }

        let text = self.eval_text(comment.text)?;
        self.css_tree
            .add_stmt(CssStmt::Comment(text, comment.span), self.parent);

        Ok(())
    }

    // ===================== diagnostics =====================

    pub fn emit_warning(&mut self, message: &str, span: Span) {
        if self.options.quiet {
            return;
        }
        let loc = self.map.look_up_span(span);
        self.options.logger.warn(loc, message);
    }

    fn exec_warn(&mut self, warn: AstWarn) -> CompileResult<()> {
        if self.warnings_emitted.insert(warn.span) {
            let value = self.eval(warn.value)?;
            let message = value.to_css_string(warn.span, self.options.is_compressed())?;
            self.emit_warning(&message, warn.span);
        }

        Ok(())
    }

    fn exec_debug(&mut self, debug: AstDebugRule) -> CompileResult<()> {
        if self.options.quiet {
            return Ok(());
        }

        let value = self.eval(debug.value)?;
        let loc = self.map.look_up_span(debug.span);
        self.options.logger.debug(loc, &value.inspect(debug.span)?);

        Ok(())
    }

    fn exec_error_rule(&mut self, error: AstErrorRule) -> CompileResult<Box<Error>> {
        let message = self.eval(error.value)?.inspect(error.span)?;

        Ok((message, error.span).into())
    }

    // ===================== extend =====================

    fn exec_extend(&mut self, extend: AstExtendRule) -> CompileResult<()> {
        if !self.style_rule_exists() || self.declaration_name.is_some() {
            return Err(("@extend may only be used within style rules.", extend.span).into());
        }

        let extender_selector = self.current_rule.clone().unwrap();

        let target_text = self.eval_text(extend.value)?;
        let targets = self.selector_from_text(&target_text, false, true, extend.span)?;

        for complex in targets.components {
            let compound = match complex.components.as_slice() {
                [ComplexSelectorComponent::Compound(compound)] => compound,
                _ => {
                    return Err(("complex selectors may not be extended.", extend.span).into());
                }
            };

            let simple = match compound.components.as_slice() {
                [simple] => simple,
                _ => {
                    return Err((
                        format!(
                            "compound selectors may no longer be extended.\nConsider `@extend {}` instead.\nSee http://bit.ly/ExtendCompound for details.\n",
                            compound
                                .components
                                .iter()
                                .map(ToString::to_string)
                                .collect::<Vec<String>>()
                                .join(", ")
                        ),
                        extend.span,
                    )
                        .into());
                }
            };

            self.extender.add_extension(
                extender_selector.clone().into_selector().0,
                simple,
                &ExtendRule {
                    is_optional: extend.is_optional,
                },
                &self.media_queries,
                extend.span,
            )?;
        }

        Ok(())
    }

    // ===================== media =====================

    fn exec_media_rule(&mut self, media: AstMedia) -> CompileResult<()> {
        if self.declaration_name.is_some() {
            return Err((
                "Media rules may not be used within nested declarations.",
                media.span,
            )
                .into());
        }

        let query_text = self.eval_text(media.query)?;
        let queries = MediaQuery::parse_list(&query_text, media.query_span)?;

        let merged = self
            .media_queries
            .as_ref()
            .and_then(|outer| MediaQuery::intersect_all(outer, &queries));

        let sources = match &merged {
            Some(merged) if merged.is_empty() => return Ok(()),
            Some(..) => {
                let mut set = IndexSet::new();
                set.extend(self.media_query_sources.clone().unwrap());
                set.extend(self.media_queries.clone().unwrap());
                set.extend(queries.clone());
                set
            }
            None => IndexSet::new(),
        };

        let effective = merged.unwrap_or_else(|| queries.clone());

        let node = CssStmt::Media(
            MediaRule {
                query: effective.clone(),
                body: Vec::new(),
            },
            false,
            media.span,
        );

        let rule_span = media.span;
        let body = media.body;

        let through_sources = sources.clone();

        self.nested_in(
            node,
            true,
            move |stmt| match stmt {
                CssStmt::RuleSet { .. } => true,
                CssStmt::Media(inner, ..) => {
                    !through_sources.is_empty()
                        && inner.query.iter().all(|q| through_sources.contains(q))
                }
                _ => false,
            },
            |ev| {
                ev.with_media(Some(effective), Some(sources), |ev| {
                    ev.exec_possibly_in_rule(body, rule_span)
                })
            },
        )
    }

    /// Runs a body that may appear inside a style rule. If it does, a copy
    /// of the rule is interposed so bare declarations have somewhere to go:
    /// `a { @media screen { b: c } }` produces `@media screen { a { b: c } }`.
    fn exec_possibly_in_rule(&mut self, body: Vec<AstStmt>, span: Span) -> CompileResult<()> {
        if !self.style_rule_exists() {
            return self.exec_output_body(body);
        }

        let selector = self.current_rule.clone().unwrap();
        let shell = CssStmt::RuleSet {
            selector,
            body: Vec::new(),
            is_group_end: false,
            depth: self.rule_depth,
            span,
        };

        self.nested_in(shell, false, |_| false, |ev| ev.exec_output_body(body))
    }

    // ===================== supports =====================

    fn exec_supports_rule(&mut self, supports: AstSupportsRule) -> CompileResult<()> {
        if self.declaration_name.is_some() {
            return Err((
                "Supports rules may not be used within nested declarations.",
                supports.span,
            )
                .into());
        }

        let condition = self.eval_supports_condition(supports.condition)?;

        let node = CssStmt::Supports(
            SupportsRule {
                params: condition,
                body: Vec::new(),
                span: supports.span,
            },
            false,
        );

        let span = supports.span;
        let body = supports.body;

        self.nested_in(node, true, CssStmt::is_style_rule, |ev| {
            ev.exec_possibly_in_rule(body, span)
        })
    }

    // ===================== unknown at-rules =====================

    fn exec_unknown_at_rule(&mut self, at_rule: AstUnknownAtRule) -> CompileResult<()> {
        if self.declaration_name.is_some() {
            return Err((
                "At-rules may not be used within nested declarations.",
                at_rule.span,
            )
                .into());
        }

        let name = self.eval_text(at_rule.name)?;
        let params = at_rule
            .value
            .map(|value| self.eval_text_trimmed(value))
            .transpose()?
            .unwrap_or_default();

        let body = match at_rule.body {
            Some(body) => body,
            None => {
                let stmt = CssStmt::UnknownAtRule(
                    UnknownAtRule {
                        name,
                        params,
                        body: Vec::new(),
                        has_body: false,
                        span: at_rule.span,
                    },
                    false,
                );

                self.css_tree.add_stmt(stmt, self.parent);
                return Ok(());
            }
        };

        let was_in_keyframes = self.flags.in_keyframes();
        let was_in_unknown = self.flags.in_unknown_at_rule();

        let is_keyframes = unvendor(&name) == "keyframes";
        if is_keyframes {
            self.flags.set(ContextFlags::IN_KEYFRAMES, true);
        } else {
            self.flags.set(ContextFlags::IN_UNKNOWN_AT_RULE, true);
        }

        let node = CssStmt::UnknownAtRule(
            UnknownAtRule {
                name,
                params,
                body: Vec::new(),
                has_body: true,
                span: at_rule.span,
            },
            false,
        );

        let span = at_rule.span;

        let result = self.nested_in(node, true, CssStmt::is_style_rule, |ev| {
            if !ev.style_rule_exists() || ev.flags.in_keyframes() {
                ev.exec_output_body(body)
            } else {
                // "a {@foo {b: c}}" produces "@foo {a {b: c}}".
                ev.exec_possibly_in_rule(body, span)
            }
        });

        self.flags.set(ContextFlags::IN_KEYFRAMES, was_in_keyframes);
        self.flags
            .set(ContextFlags::IN_UNKNOWN_AT_RULE, was_in_unknown);

        result
    }

    // ===================== at-root =====================

    fn exec_at_root(&mut self, at_root: AstAtRootRule) -> CompileResult<()> {
        let query = match &at_root.query {
            Some(query) => {
                let text = self.eval_text(query.node.clone())?;
                parse_at_root_query(Lexer::new_from_string(&text, query.span))?
            }
            None => AtRootQuery::default(),
        };

        // Walk up the open wrappers, remembering which ones survive the
        // filter.
        let mut kept = Vec::new();
        let mut cursor = self.parent;

        while let Some(idx) = cursor {
            let node = self.css_tree.get(idx);
            cursor = match &*node {
                Some(stmt) => {
                    if !query.excludes(stmt) {
                        kept.push(idx);
                    }
                    self.css_tree.parent_of(idx)
                }
                None => break,
            };
        }

        let root = self.innermost_contiguous_kept(&kept);

        // Nothing was excluded; evaluate in place.
        if Some(root) == self.parent {
            return self.scoped(false, |ev| ev.exec_output_body(at_root.body));
        }

        // Rebuild shells of the kept wrappers at the root.
        let new_parent = if kept.is_empty() {
            let shell = self
                .css_tree
                .get(root)
                .as_ref()
                .map(CssStmt::copy_without_children);
            shell.map(|shell| self.css_tree.add_stmt(shell, None))
        } else {
            let mut outer = None;
            for &idx in &kept {
                let shell = self
                    .css_tree
                    .get(idx)
                    .as_ref()
                    .map(CssStmt::copy_without_children)
                    .unwrap();
                let shell_idx = self.css_tree.add_stmt(shell, None);
                if let Some(outer) = outer {
                    self.css_tree.link_child_to_parent(outer, shell_idx);
                }
                outer = Some(shell_idx);
            }
            outer
        };

        self.at_root_scope(new_parent, &query, |ev| ev.exec_output_body(at_root.body))
    }

    /// The innermost member of `kept` whose chain up to the root is entirely
    /// within `kept`; anything deeper must be re-created.
    fn innermost_contiguous_kept(&self, kept: &[CssTreeIdx]) -> CssTreeIdx {
        if kept.is_empty() {
            return CssTree::ROOT;
        }

        let mut cursor = self.parent;
        let mut innermost = None;

        for (i, &idx) in kept.iter().enumerate() {
            while cursor != Some(idx) {
                innermost = None;
                cursor = match cursor {
                    Some(c) => self.css_tree.parent_of(c),
                    None => break,
                };
            }
            innermost = innermost.or(Some(i));
            cursor = cursor.and_then(|c| self.css_tree.parent_of(c));
        }

        if cursor != Some(CssTree::ROOT) {
            return CssTree::ROOT;
        }

        kept[innermost.unwrap()]
    }

    fn at_root_scope(
        &mut self,
        new_parent: Option<CssTreeIdx>,
        query: &AtRootQuery,
        body: impl FnOnce(&mut Self) -> CompileResult<()>,
    ) -> CompileResult<()> {
        let old_parent = mem::replace(&mut self.parent, new_parent);

        let was_at_root_excluding = self.flags.at_root_excluding_style_rule();
        if query.excludes_style_rules() {
            self.flags
                .set(ContextFlags::AT_ROOT_EXCLUDING_STYLE_RULE, true);
        }

        let cleared_media = if self.media_queries.is_some() && query.excludes_name("media") {
            Some((self.media_queries.take(), self.media_query_sources.take()))
        } else {
            None
        };

        let was_in_keyframes = self.flags.in_keyframes();
        if was_in_keyframes && query.excludes_name("keyframes") {
            self.flags.set(ContextFlags::IN_KEYFRAMES, false);
        }

        let result = self.scoped(false, body);

        self.parent = old_parent;
        self.flags.set(
            ContextFlags::AT_ROOT_EXCLUDING_STYLE_RULE,
            was_at_root_excluding,
        );
        if let Some((queries, sources)) = cleared_media {
            self.media_queries = queries;
            self.media_query_sources = sources;
        }
        self.flags.set(ContextFlags::IN_KEYFRAMES, was_in_keyframes);

        result
    }

    // ===================== modules =====================

    fn execute_module(
        &mut self,
        sheet: StyleSheet,
        configuration: Option<Configuration>,
    ) -> CompileResult<Rc<RefCell<Module>>> {
        let module_env = Environment::new();
        let mut module_extender = Extender::new(self.blank_span);

        // A module executes with a pristine evaluation context: its own
        // environment and extension store, the shared CSS tree at the root.
        let saved = ModuleContext::save(self, configuration);
        mem::swap(&mut self.extender, &mut module_extender);

        let (result, _) = self.with_env(module_env.new_closure(), |ev| ev.run_stylesheet(sheet));

        mem::swap(&mut self.extender, &mut module_extender);
        saved.restore(self);

        result?;

        // The module's own extensions must be satisfied within the module.
        if let Some((message, span)) = module_extender.check_unsatisfied_extensions() {
            if self.options.error_on_unsatisfied_extend {
                return Err((ErrorKind::UnsatisfiedExtend, message, span).into());
            }

            self.emit_warning(&message, span);
        }

        Ok(module_env.to_module())
    }

    pub(super) fn load_module(
        &mut self,
        url: &Path,
        configuration: Option<Configuration>,
        span: Span,
        callback: impl FnOnce(&mut Self, Rc<RefCell<Module>>) -> CompileResult<()>,
    ) -> CompileResult<()> {
        if let Some(builtin) = is_builtin_module_url(url.to_string_lossy().as_ref()) {
            if let Some(config) = &configuration {
                if !config.is_implicit() && !config.is_empty() {
                    return Err((
                        "Built-in modules can't be configured.",
                        config.span().unwrap_or(span),
                    )
                        .into());
                }
            }

            let module = declare_builtin_module(builtin);
            return callback(self, Rc::new(RefCell::new(module)));
        }

        let canonical = self
            .find_import(url)
            .ok_or_else(|| ("Can't find stylesheet to import.", span))?;

        if let Some(cached) = self.module_cache.get(&canonical) {
            let configured = configuration
                .as_ref()
                .map_or(false, |config| !config.is_implicit() && !config.is_empty());

            if configured {
                return Err((
                    "This module was already loaded, so it can't be configured using \"with\".",
                    span,
                )
                    .into());
            }

            let module = Rc::clone(cached);
            return callback(self, module);
        }

        if !self.modules_loading.insert(canonical.clone()) {
            return Err(("Module loop: this module is already being loaded.", span).into());
        }

        let sheet = self.load_style_sheet(url.to_string_lossy().as_ref(), span)?;

        let module = self
            .execute_module(sheet, configuration)
            .map_err(|e| e.with_frame("@use".to_owned(), span));

        self.modules_loading.remove(&canonical);

        let module = module?;
        self.module_cache.insert(canonical, Rc::clone(&module));

        callback(self, module)
    }

    fn exec_use(&mut self, use_rule: AstUseRule) -> CompileResult<()> {
        let configuration = if use_rule.configuration.is_empty() {
            Configuration::empty()
        } else {
            let mut values = BTreeMap::new();

            for var in use_rule.configuration {
                let value = self.eval(var.expr.node)?.without_slash();
                values.insert(
                    var.name.node,
                    ConfiguredValue::explicit(value, var.name.span.merge(var.expr.span)),
                );
            }

            Configuration::explicit(values, use_rule.span)
        };

        let span = use_rule.span;
        let namespace = use_rule
            .namespace
            .as_ref()
            .map(|s| Identifier::from(s.trim_start_matches("sass:")));

        self.load_module(
            &use_rule.url,
            Some(configuration.clone()),
            span,
            |ev, module| ev.env.add_module(namespace, module, span),
        )?;

        Self::assert_configuration_is_empty(&configuration, false)
    }

    pub(super) fn assert_configuration_is_empty(
        config: &Configuration,
        name_in_error: bool,
    ) -> CompileResult<()> {
        // Implicit configurations are allowed to use only a subset of their
        // values.
        if config.is_empty() || config.is_implicit() {
            return Ok(());
        }

        let Spanned { node: name, span } = match config.first() {
            Some(first) => first,
            None => return Ok(()),
        };

        let msg = if name_in_error {
            format!(
                "${name} was not declared with !default in the @used module.",
                name = name
            )
        } else {
            "This variable was not declared with !default in the @used module.".to_owned()
        };

        Err((msg, span).into())
    }

    fn exec_forward(&mut self, forward_rule: AstForwardRule) -> CompileResult<()> {
        let outer_config = self.configuration.clone();
        let adjusted_config = Configuration::through_forward(&outer_config, &forward_rule);

        if forward_rule.configuration.is_empty() {
            self.configuration = adjusted_config;
            let url = forward_rule.url.clone();
            let span = forward_rule.span;
            self.load_module(url.as_path(), None, span, move |ev, module| {
                ev.env.forward_module(module, forward_rule);
                Ok(())
            })?;
            self.configuration = outer_config;
            return Ok(());
        }

        let new_configuration = self.forward_configuration(&adjusted_config, &forward_rule)?;

        let span = forward_rule.span;
        let rule = forward_rule.clone();
        self.load_module(
            forward_rule.url.as_path(),
            Some(new_configuration.clone()),
            span,
            move |ev, module| {
                ev.env.forward_module(module, rule);
                Ok(())
            },
        )?;

        Self::consume_through_forward(
            &adjusted_config,
            &new_configuration,
            &forward_rule
                .configuration
                .iter()
                .filter(|var| !var.is_guarded)
                .map(|var| var.name.node)
                .collect(),
        );

        // Leave errors for outer `with` clauses to those clauses: only the
        // variables this `@forward` configured are checked here.
        let own_names: HashSet<Identifier> = forward_rule
            .configuration
            .iter()
            .map(|var| var.name.node)
            .collect();

        let mut remaining = new_configuration;
        for name in remaining.keys() {
            if !own_names.contains(&name) {
                remaining.remove(name);
            }
        }

        Self::assert_configuration_is_empty(&remaining, false)
    }

    fn forward_configuration(
        &mut self,
        config: &Configuration,
        forward_rule: &AstForwardRule,
    ) -> CompileResult<Configuration> {
        let mut values = BTreeMap::from_iter(config.entries());

        for variable in &forward_rule.configuration {
            if variable.is_guarded {
                let inherited = {
                    let mut config = config.clone();
                    config.remove(variable.name.node)
                };

                match inherited {
                    Some(inherited) if !matches!(inherited.value, Value::Null) => {
                        values.insert(variable.name.node, inherited);
                        continue;
                    }
                    _ => {}
                }
            }

            let value = self.eval(variable.expr.node.clone())?.without_slash();

            values.insert(
                variable.name.node,
                ConfiguredValue::explicit(value, variable.expr.span),
            );
        }

        Ok(if !config.is_implicit() || config.is_empty() {
            Configuration::explicit(values, forward_rule.span)
        } else {
            Configuration::implicit(values)
        })
    }

    /// Marks upstream configuration entries consumed when the downstream
    /// module used them, except the ones this `@forward` supplied itself.
    fn consume_through_forward(
        upstream: &Configuration,
        downstream: &Configuration,
        except: &HashSet<Identifier>,
    ) {
        let downstream_keys = downstream.keys();

        let mut upstream = upstream.clone();
        for name in upstream.keys() {
            if !except.contains(&name) && !downstream_keys.contains(&name) {
                upstream.remove(name);
            }
        }
    }

    // ===================== imports =====================

    /// Resolution order for `@import`/`@use` URLs: the importing file's
    /// directory first, trying partials (`_name`), explicit extensions, then
    /// directory `index` files, then each load path.
    fn find_import(&self, path: &Path) -> Option<PathBuf> {
        let path_buf = if path.is_absolute() {
            path.into()
        } else {
            self.current_import_path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(path)
        };

        macro_rules! try_path {
            ($path:expr) => {
                let path = $path;
                let dirname = path.parent().unwrap_or_else(|| Path::new(""));
                let basename = path.file_name().unwrap_or_else(|| OsStr::new(".."));

                let partial = dirname.join(format!("_{}", basename.to_str().unwrap()));

                if self.options.fs.is_file(&partial) {
                    return Some(partial);
                }

                if self.options.fs.is_file(&path) {
                    return Some(path.to_path_buf());
                }
            };
        }

        if matches!(
            path_buf.extension().and_then(OsStr::to_str),
            Some("scss" | "css")
        ) {
            try_path!(path_buf);
            return None;
        }

        macro_rules! try_path_with_extensions {
            ($path:expr) => {
                let path = $path;
                try_path!(path.with_extension("scss"));
                try_path!(path.with_extension("css"));
            };
        }

        try_path_with_extensions!(path_buf.clone());

        if self.options.fs.is_dir(&path_buf) {
            try_path_with_extensions!(path_buf.join("index"));
        }

        for load_path in &self.options.load_paths {
            let path_buf = load_path.join(path);

            try_path_with_extensions!(&path_buf);

            if self.options.fs.is_dir(&path_buf) {
                try_path_with_extensions!(path_buf.join("index"));
            }
        }

        None
    }

    pub(super) fn load_style_sheet(&mut self, url: &str, span: Span) -> CompileResult<StyleSheet> {
        let name = self
            .find_import(url.as_ref())
            .ok_or_else(|| ("Can't find stylesheet to import.", span))?;

        if let Some(sheet) = self.import_cache.get(&name) {
            return Ok(sheet.clone());
        }

        let file = self.map.add_file(
            name.to_string_lossy().into(),
            String::from_utf8(self.options.fs.read(&name)?)?,
        );

        let was_use_allowed = self.flags.is_use_allowed();
        self.flags.set(ContextFlags::IS_USE_ALLOWED, true);

        let sheet = ScssParser::new(
            Lexer::new_from_file(&file),
            self.map,
            self.options,
            file.span.subspan(0, 0),
            &name,
        )
        .parse()?;

        self.flags
            .set(ContextFlags::IS_USE_ALLOWED, was_use_allowed);

        if self.files_seen.contains(&name) {
            self.import_cache.insert(name, sheet.clone());
        } else {
            self.files_seen.insert(name);
        }

        Ok(sheet)
    }

    fn exec_import(&mut self, import_rule: AstImportRule) -> CompileResult<()> {
        for import in import_rule.imports {
            match import {
                AstImport::Sass(dynamic) => {
                    let sheet = self.load_style_sheet(&dynamic.url, dynamic.span)?;
                    // Legacy imports merge the loaded file into the
                    // importer: same environment, same scope.
                    self.run_stylesheet(sheet)
                        .map_err(|e| e.with_frame("@import".to_owned(), dynamic.span))?;
                }
                AstImport::Plain(plain) => self.exec_plain_import(plain)?,
            }
        }

        Ok(())
    }

    fn exec_plain_import(&mut self, import: AstPlainCssImport) -> CompileResult<()> {
        let url = self.eval_text(import.url)?;
        let modifiers = import
            .modifiers
            .map(|modifiers| self.eval_text(modifiers))
            .transpose()?;

        let node = CssStmt::Import(url, modifiers);

        match self.parent {
            Some(parent) if parent != CssTree::ROOT => {
                self.css_tree.add_stmt(node, Some(parent));
            }
            _ => self.import_nodes.push(node),
        }

        Ok(())
    }
}

/// The evaluation state swapped out while a module executes, restored
/// whether or not the module succeeds.
struct ModuleContext {
    parent: Option<CssTreeIdx>,
    current_rule: Option<ExtendedSelector>,
    media_queries: Option<Vec<MediaQuery>>,
    media_query_sources: Option<IndexSet<MediaQuery>>,
    declaration_name: Option<String>,
    configuration: Option<Configuration>,
    in_unknown_at_rule: bool,
    at_root_excluding_style_rule: bool,
    in_keyframes: bool,
}

impl ModuleContext {
    fn save(ev: &mut Evaluator, configuration: Option<Configuration>) -> Self {
        let saved = Self {
            parent: ev.parent.take(),
            current_rule: ev.current_rule.take(),
            media_queries: ev.media_queries.take(),
            media_query_sources: ev.media_query_sources.take(),
            declaration_name: ev.declaration_name.take(),
            configuration: configuration
                .map(|config| mem::replace(&mut ev.configuration, config)),
            in_unknown_at_rule: ev.flags.in_unknown_at_rule(),
            at_root_excluding_style_rule: ev.flags.at_root_excluding_style_rule(),
            in_keyframes: ev.flags.in_keyframes(),
        };

        ev.flags.set(ContextFlags::IN_UNKNOWN_AT_RULE, false);
        ev.flags
            .set(ContextFlags::AT_ROOT_EXCLUDING_STYLE_RULE, false);
        ev.flags.set(ContextFlags::IN_KEYFRAMES, false);

        saved
    }

    fn restore(self, ev: &mut Evaluator) {
        ev.parent = self.parent;
        ev.current_rule = self.current_rule;
        ev.media_queries = self.media_queries;
        ev.media_query_sources = self.media_query_sources;
        ev.declaration_name = self.declaration_name;
        if let Some(configuration) = self.configuration {
            ev.configuration = configuration;
        }
        ev.flags
            .set(ContextFlags::IN_UNKNOWN_AT_RULE, self.in_unknown_at_rule);
        ev.flags.set(
            ContextFlags::AT_ROOT_EXCLUDING_STYLE_RULE,
            self.at_root_excluding_style_rule,
        );
        ev.flags.set(ContextFlags::IN_KEYFRAMES, self.in_keyframes);
    }
}
