use std::{cell::RefCell, rc::Rc, sync::Arc};

use codemap::{Span, Spanned};

use crate::{
    ast::AstForwardRule,
    common::Identifier,
    error::CompileResult,
    value::{Function, Mixin, Value},
};

use super::{
    evaluator::ContentBlock,
    module::{Module, Modules},
    scope::Scopes,
};

/// The lexical environment of the evaluator: the scope chain plus the
/// modules visible from the current source file.
#[derive(Debug, Clone)]
pub struct Environment {
    pub scopes: Scopes,
    pub modules: Rc<RefCell<Modules>>,
    /// Modules loaded with `@use "..." as *`, consulted after the scope
    /// chain. Collisions are detected lazily at lookup.
    pub global_modules: Vec<Rc<RefCell<Module>>>,
    /// The `@content` block supplied by the innermost `@include`, if any.
    pub content: Option<Arc<ContentBlock>>,
    /// Modules re-exported by this file's `@forward` rules.
    pub forwarded_modules: Rc<RefCell<Vec<(Rc<RefCell<Module>>, AstForwardRule)>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            scopes: Scopes::new(),
            modules: Rc::new(RefCell::new(Modules::new())),
            global_modules: Vec::new(),
            content: None,
            forwarded_modules: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// The environment captured by a closure: shares all frames, owns the
    /// spine.
    pub fn new_closure(&self) -> Self {
        Self {
            scopes: self.scopes.new_closure(),
            modules: Rc::clone(&self.modules),
            global_modules: self.global_modules.iter().map(Rc::clone).collect(),
            content: self.content.as_ref().map(Arc::clone),
            forwarded_modules: Rc::clone(&self.forwarded_modules),
        }
    }

    pub fn forward_module(&mut self, module: Rc<RefCell<Module>>, rule: AstForwardRule) {
        (*self.forwarded_modules)
            .borrow_mut()
            .push((module, rule));
    }

    pub fn insert_mixin(&mut self, name: Identifier, mixin: Mixin) {
        self.scopes.insert_mixin(name, mixin);
    }

    pub fn mixin_exists(&self, name: Identifier) -> bool {
        self.scopes.mixin_exists(name)
            || self
                .global_modules
                .iter()
                .any(|module| (**module).borrow().mixin_exists(name))
    }

    pub fn get_mixin(
        &self,
        name: Spanned<Identifier>,
        namespace: Option<Spanned<Identifier>>,
    ) -> CompileResult<Mixin> {
        if let Some(namespace) = namespace {
            let modules = (*self.modules).borrow();
            let module = modules.get(namespace.node, namespace.span)?;
            return (*module).borrow().get_mixin(name);
        }

        match self.scopes.get_mixin(name) {
            Ok(v) => Ok(v),
            Err(e) => {
                for module in &self.global_modules {
                    if let Some(mixin) = (**module).borrow().get_mixin_no_err(name.node) {
                        return Ok(mixin);
                    }
                }

                Err(e)
            }
        }
    }

    pub fn insert_fn(&mut self, func: Function) {
        self.scopes.insert_fn(func);
    }

    pub fn fn_exists(&self, name: Identifier) -> bool {
        self.scopes.fn_exists(name)
            || self
                .global_modules
                .iter()
                .any(|module| (**module).borrow().fn_exists(name))
    }

    pub fn get_fn(
        &self,
        name: Identifier,
        namespace: Option<Spanned<Identifier>>,
    ) -> CompileResult<Option<Function>> {
        if let Some(namespace) = namespace {
            let modules = (*self.modules).borrow();
            let module = modules.get(namespace.node, namespace.span)?;
            return Ok((*module).borrow().get_fn(name));
        }

        Ok(self.scopes.get_fn(name).or_else(|| {
            self.global_modules
                .iter()
                .find_map(|module| (**module).borrow().get_fn(name))
        }))
    }

    pub fn var_exists(
        &self,
        name: Identifier,
        namespace: Option<Spanned<Identifier>>,
    ) -> CompileResult<bool> {
        if let Some(namespace) = namespace {
            let modules = (*self.modules).borrow();
            let module = modules.get(namespace.node, namespace.span)?;
            return Ok((*module).borrow().var_exists(name));
        }

        Ok(self.scopes.var_exists(name)
            || self
                .global_modules
                .iter()
                .any(|module| (**module).borrow().var_exists(name)))
    }

    pub fn get_var(
        &mut self,
        name: Spanned<Identifier>,
        namespace: Option<Spanned<Identifier>>,
    ) -> CompileResult<Value> {
        if let Some(namespace) = namespace {
            let modules = (*self.modules).borrow();
            let module = modules.get(namespace.node, namespace.span)?;
            return (*module).borrow().get_var(name);
        }

        match self.scopes.get_var(name) {
            Ok(v) => Ok(v),
            Err(e) => {
                for module in &self.global_modules {
                    if let Some(value) = (**module).borrow().get_var_no_err(name.node) {
                        return Ok(value);
                    }
                }

                Err(e)
            }
        }
    }

    /// Assigns a variable following the `$x: ...` scoping rules: namespaced
    /// writes go to the module; `!global` (or top-level) writes go to the
    /// root frame; otherwise the innermost binding is updated, falling back
    /// to a new binding in the current frame.
    pub fn insert_var(
        &mut self,
        name: Spanned<Identifier>,
        namespace: Option<Spanned<Identifier>>,
        value: Value,
        is_global: bool,
        in_semi_global_scope: bool,
    ) -> CompileResult<()> {
        if let Some(namespace) = namespace {
            let modules = (*self.modules).borrow();
            let module = modules.get(namespace.node, namespace.span)?;
            (*module).borrow_mut().update_var(name, value)?;
            return Ok(());
        }

        if is_global || self.at_root() {
            self.scopes.insert_var(0, name.node, value);
            return Ok(());
        }

        let mut index = self
            .scopes
            .find_var(name.node)
            .unwrap_or(self.scopes.len() - 1);

        if !in_semi_global_scope && index == 0 {
            index = self.scopes.len() - 1;
        }

        self.scopes.last_variable_index = Some((name.node, index));

        self.scopes.insert_var(index, name.node, value);

        Ok(())
    }

    pub fn at_root(&self) -> bool {
        self.scopes.len() == 1
    }

    pub fn scopes_mut(&mut self) -> &mut Scopes {
        &mut self.scopes
    }

    /// Registers a loaded module under `namespace`, or merges it into the
    /// global lookup path for `as *`.
    pub fn add_module(
        &mut self,
        namespace: Option<Identifier>,
        module: Rc<RefCell<Module>>,
        span: Span,
    ) -> CompileResult<()> {
        match namespace {
            Some(namespace) => {
                (*self.modules)
                    .borrow_mut()
                    .insert(namespace, module, span)?;
            }
            None => {
                for name in (*self.scopes.global_variables()).borrow().keys() {
                    if (*module).borrow().var_exists(*name) {
                        return Err((
                            format!(
                                "This module and the new module both define a variable named \"${name}\".",
                                name = name
                            ),
                            span,
                        )
                            .into());
                    }
                }

                self.global_modules.push(module);
            }
        }

        Ok(())
    }

    /// Converts this environment into the module other files see when they
    /// load it, wiring up everything it forwarded.
    pub fn to_module(self) -> Rc<RefCell<Module>> {
        debug_assert!(self.at_root());

        let mut module = Module::from_scopes(&self.scopes);

        for (forwarded, rule) in (*self.forwarded_modules).borrow().iter() {
            module.forward(Rc::clone(forwarded), rule);
        }

        Rc::new(RefCell::new(module))
    }
}
