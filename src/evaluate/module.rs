use std::{
    cell::RefCell,
    collections::{BTreeMap, HashSet},
    rc::Rc,
};

use codemap::{Span, Spanned};

use crate::{
    ast::AstForwardRule,
    builtin::Builtin,
    common::{Identifier, QuoteKind},
    error::CompileResult,
    value::{Function, Mixin, Value, ValueMap},
};

use super::scope::Scopes;

/// A compiled module: the global bindings of one source file (or a built-in
/// `sass:` module), plus anything it re-exports through `@forward`.
///
/// The binding maps are shared with the environment that produced the
/// module, so `ns.$x: value` assignments write through.
#[derive(Debug, Clone)]
pub struct Module {
    variables: Rc<RefCell<BTreeMap<Identifier, Value>>>,
    mixins: Rc<RefCell<BTreeMap<Identifier, Mixin>>>,
    functions: Rc<RefCell<BTreeMap<Identifier, Function>>>,

    /// Modules re-exported by this module's `@forward` rules, with their
    /// show/hide/prefix filters. Consulted after the module's own bindings.
    forwarded: Vec<ForwardedModule>,

    /// Whether this is a `sass:` module, whose variables can't be modified.
    is_builtin: bool,
}

/// One `@forward`ed module together with the visibility filter of the
/// `@forward` rule that exposed it.
#[derive(Debug, Clone)]
pub struct ForwardedModule {
    module: Rc<RefCell<Module>>,
    filter: ForwardFilter,
}

#[derive(Debug, Clone, Default)]
pub struct ForwardFilter {
    shown_variables: Option<HashSet<Identifier>>,
    hidden_variables: Option<HashSet<Identifier>>,
    shown_mixins_and_functions: Option<HashSet<Identifier>>,
    hidden_mixins_and_functions: Option<HashSet<Identifier>>,
    prefix: Option<String>,
}

impl ForwardFilter {
    pub fn of_rule(rule: &AstForwardRule) -> Self {
        Self {
            shown_variables: rule.shown_variables.clone(),
            hidden_variables: rule.hidden_variables.clone(),
            shown_mixins_and_functions: rule.shown_mixins_and_functions.clone(),
            hidden_mixins_and_functions: rule.hidden_mixins_and_functions.clone(),
            prefix: rule.prefix.clone(),
        }
    }

    /// Maps a consumer-visible variable name to the inner module's name, or
    /// `None` if the filter hides it. `show`/`hide` lists name the
    /// consumer-visible (prefixed) spelling.
    fn resolve_variable(&self, name: Identifier) -> Option<Identifier> {
        if let Some(shown) = &self.shown_variables {
            if !shown.contains(&name) {
                return None;
            }
        }

        if let Some(hidden) = &self.hidden_variables {
            if hidden.contains(&name) {
                return None;
            }
        }

        self.strip_prefix(name)
    }

    fn resolve_member(&self, name: Identifier) -> Option<Identifier> {
        if let Some(shown) = &self.shown_mixins_and_functions {
            if !shown.contains(&name) {
                return None;
            }
        }

        if let Some(hidden) = &self.hidden_mixins_and_functions {
            if hidden.contains(&name) {
                return None;
            }
        }

        self.strip_prefix(name)
    }

    fn strip_prefix(&self, name: Identifier) -> Option<Identifier> {
        match &self.prefix {
            Some(prefix) => name
                .as_str()
                .strip_prefix(prefix.as_str())
                .map(Identifier::from),
            None => Some(name),
        }
    }

    /// The consumer-visible spelling of an inner name.
    fn apply_prefix(&self, name: Identifier) -> Identifier {
        match &self.prefix {
            Some(prefix) => Identifier::from(format!("{}{}", prefix, name)),
            None => name,
        }
    }

    /// Maps an inner-module configuration name to the name the loader's
    /// `with` clause would use, or `None` if the filter hides it.
    pub fn resolve_config_name(&self, inner: Identifier) -> Option<Identifier> {
        let outer = self.apply_prefix(inner);

        if let Some(shown) = &self.shown_variables {
            if !shown.contains(&outer) {
                return None;
            }
        }

        if let Some(hidden) = &self.hidden_variables {
            if hidden.contains(&outer) {
                return None;
            }
        }

        Some(outer)
    }

    /// Maps a loader-level configuration name to the inner module's
    /// spelling, or `None` if the filter hides it.
    pub fn rename_config_name(&self, outer: Identifier) -> Option<Identifier> {
        if let Some(shown) = &self.shown_variables {
            if !shown.contains(&outer) {
                return None;
            }
        }

        if let Some(hidden) = &self.hidden_variables {
            if hidden.contains(&outer) {
                return None;
            }
        }

        self.strip_prefix(outer)
    }
}

impl Module {
    pub fn new_builtin() -> Self {
        Module {
            variables: Rc::new(RefCell::new(BTreeMap::new())),
            mixins: Rc::new(RefCell::new(BTreeMap::new())),
            functions: Rc::new(RefCell::new(BTreeMap::new())),
            forwarded: Vec::new(),
            is_builtin: true,
        }
    }

    /// Wraps the global frame of a fully executed module environment.
    pub fn from_scopes(scopes: &Scopes) -> Self {
        Module {
            variables: scopes.global_variables(),
            mixins: scopes.global_mixins(),
            functions: scopes.global_functions(),
            forwarded: Vec::new(),
            is_builtin: false,
        }
    }

    pub fn forward(&mut self, module: Rc<RefCell<Module>>, rule: &AstForwardRule) {
        self.forwarded.push(ForwardedModule {
            module,
            filter: ForwardFilter::of_rule(rule),
        });
    }

    pub fn get_var(&self, name: Spanned<Identifier>) -> CompileResult<Value> {
        if !name.node.is_public() {
            return Err((
                "Private members can't be accessed from outside their modules.",
                name.span,
            )
                .into());
        }

        match self.get_var_no_err(name.node) {
            Some(v) => Ok(v),
            None => Err(("Undefined variable.", name.span).into()),
        }
    }

    pub fn get_var_no_err(&self, name: Identifier) -> Option<Value> {
        if let Some(value) = (*self.variables).borrow().get(&name) {
            return Some(value.clone());
        }

        for forwarded in &self.forwarded {
            if let Some(inner) = forwarded.filter.resolve_variable(name) {
                if let Some(value) = (*forwarded.module).borrow().get_var_no_err(inner) {
                    return Some(value);
                }
            }
        }

        None
    }

    pub fn update_var(&mut self, name: Spanned<Identifier>, value: Value) -> CompileResult<()> {
        if self.is_builtin {
            return Err(("Cannot modify built-in variable.", name.span).into());
        }

        if !name.node.is_public() {
            return Err((
                "Private members can't be accessed from outside their modules.",
                name.span,
            )
                .into());
        }

        if (*self.variables).borrow().contains_key(&name.node) {
            (*self.variables).borrow_mut().insert(name.node, value);
            return Ok(());
        }

        for forwarded in &self.forwarded {
            if let Some(inner) = forwarded.filter.resolve_variable(name.node) {
                if (*forwarded.module).borrow().var_exists(inner) {
                    return (*forwarded.module).borrow_mut().update_var(
                        Spanned {
                            node: inner,
                            span: name.span,
                        },
                        value,
                    );
                }
            }
        }

        Err(("Undefined variable.", name.span).into())
    }

    pub fn var_exists(&self, name: Identifier) -> bool {
        name.is_public() && self.get_var_no_err(name).is_some()
    }

    pub fn get_mixin(&self, name: Spanned<Identifier>) -> CompileResult<Mixin> {
        if !name.node.is_public() {
            return Err((
                "Private members can't be accessed from outside their modules.",
                name.span,
            )
                .into());
        }

        match self.get_mixin_no_err(name.node) {
            Some(v) => Ok(v),
            None => Err(("Undefined mixin.", name.span).into()),
        }
    }

    pub fn get_mixin_no_err(&self, name: Identifier) -> Option<Mixin> {
        if let Some(mixin) = (*self.mixins).borrow().get(&name) {
            return Some(mixin.clone());
        }

        for forwarded in &self.forwarded {
            if let Some(inner) = forwarded.filter.resolve_member(name) {
                if let Some(mixin) = (*forwarded.module).borrow().get_mixin_no_err(inner) {
                    return Some(mixin);
                }
            }
        }

        None
    }

    pub fn mixin_exists(&self, name: Identifier) -> bool {
        name.is_public() && self.get_mixin_no_err(name).is_some()
    }

    pub fn get_fn(&self, name: Identifier) -> Option<Function> {
        if !name.is_public() {
            return None;
        }

        if let Some(func) = (*self.functions).borrow().get(&name) {
            return Some(func.clone());
        }

        for forwarded in &self.forwarded {
            if let Some(inner) = forwarded.filter.resolve_member(name) {
                if let Some(func) = (*forwarded.module).borrow().get_fn(inner) {
                    return Some(func);
                }
            }
        }

        None
    }

    pub fn fn_exists(&self, name: Identifier) -> bool {
        name.is_public() && self.get_fn(name).is_some()
    }

    pub fn insert_builtin(
        &mut self,
        name: &'static str,
        function: fn(crate::ast::ArgumentResult, &mut super::Evaluator) -> CompileResult<Value>,
    ) {
        let ident = name.into();
        (*self.functions)
            .borrow_mut()
            .insert(ident, Function::Builtin(Builtin::new(function), ident));
    }

    pub fn insert_builtin_var(&mut self, name: &'static str, value: Value) {
        (*self.variables).borrow_mut().insert(name.into(), value);
    }

    /// The map returned by `meta.module-functions()`.
    pub fn functions_map(&self, span: Span) -> ValueMap {
        ValueMap::new_with(
            (*self.functions)
                .borrow()
                .iter()
                .filter(|(key, _)| key.is_public())
                .map(|(key, value)| {
                    (
                        Value::String(key.to_string(), QuoteKind::Quoted).span(span),
                        Value::FunctionRef(Box::new(value.clone())),
                    )
                })
                .collect::<Vec<(Spanned<Value>, Value)>>(),
        )
    }

    /// The map returned by `meta.module-variables()`.
    pub fn variables_map(&self, span: Span) -> ValueMap {
        ValueMap::new_with(
            (*self.variables)
                .borrow()
                .iter()
                .filter(|(key, _)| key.is_public())
                .map(|(key, value)| {
                    (
                        Value::String(key.to_string(), QuoteKind::Quoted).span(span),
                        value.clone(),
                    )
                })
                .collect::<Vec<(Spanned<Value>, Value)>>(),
        )
    }

    /// Names of public variables, used for `as *` collision checks.
    pub fn variable_names(&self) -> Vec<Identifier> {
        (*self.variables)
            .borrow()
            .keys()
            .copied()
            .filter(Identifier::is_public)
            .collect()
    }
}

/// The modules visible in one environment, keyed by namespace.
#[derive(Debug, Default, Clone)]
pub struct Modules(BTreeMap<Identifier, Rc<RefCell<Module>>>);

impl Modules {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(
        &mut self,
        name: Identifier,
        module: Rc<RefCell<Module>>,
        span: Span,
    ) -> CompileResult<()> {
        if self.0.contains_key(&name) {
            return Err((
                format!("There's already a module with namespace \"{}\".", name),
                span,
            )
                .into());
        }

        self.0.insert(name, module);

        Ok(())
    }

    pub fn get(&self, name: Identifier, span: Span) -> CompileResult<Rc<RefCell<Module>>> {
        match self.0.get(&name) {
            Some(v) => Ok(Rc::clone(v)),
            None => Err((
                format!(
                    "There is no module with the namespace \"{}\".",
                    name.as_str()
                ),
                span,
            )
                .into()),
        }
    }
}
