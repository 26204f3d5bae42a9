use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    rc::Rc,
};

use codemap::Spanned;

use crate::{
    builtin::GLOBAL_FUNCTIONS,
    common::Identifier,
    error::CompileResult,
    value::{Function, Mixin, Value},
};

type Frame<T> = Rc<RefCell<BTreeMap<Identifier, T>>>;

/// One namespace of the scope chain: a stack of shared frames.
///
/// Frames are individually reference-counted so closures can capture a
/// snapshot of the chain: the frames are shared, the spine is copied.
#[derive(Debug)]
struct Frames<T>(Rc<RefCell<Vec<Frame<T>>>>);

impl<T> Clone for Frames<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Clone> Frames<T> {
    fn with_root() -> Self {
        Self(Rc::new(RefCell::new(vec![Frame::default()])))
    }

    /// Shares every frame but owns the spine, so pushes and pops in one
    /// copy don't affect the other.
    fn snapshot(&self) -> Self {
        Self(Rc::new(RefCell::new((*self.0).borrow().clone())))
    }

    fn global(&self) -> Frame<T> {
        Rc::clone(&(*self.0).borrow()[0])
    }

    fn depth(&self) -> usize {
        (*self.0).borrow().len()
    }

    fn push_frame(&self) {
        (*self.0).borrow_mut().push(Frame::default());
    }

    fn pop_frame(&self) {
        (*self.0).borrow_mut().pop();
    }

    /// The index of the innermost frame defining `name`.
    fn find(&self, name: Identifier) -> Option<usize> {
        (*self.0)
            .borrow()
            .iter()
            .rposition(|frame| (**frame).borrow().contains_key(&name))
    }

    fn get_at(&self, idx: usize, name: Identifier) -> Option<T> {
        (*(*self.0).borrow()[idx]).borrow().get(&name).cloned()
    }

    /// The innermost binding of `name`, with the frame it was found in.
    fn get(&self, name: Identifier) -> Option<(usize, T)> {
        let idx = self.find(name)?;
        Some((idx, self.get_at(idx, name)?))
    }

    fn insert_at(&self, idx: usize, name: Identifier, value: T) -> Option<T> {
        (*(*self.0).borrow_mut()[idx])
            .borrow_mut()
            .insert(name, value)
    }

    fn insert_innermost(&self, name: Identifier, value: T) -> Option<T> {
        let idx = self.depth() - 1;
        self.insert_at(idx, name, value)
    }

    fn contains(&self, name: Identifier) -> bool {
        self.find(name).is_some()
    }
}

/// The lexical scope chain, with parallel namespaces for variables, mixins,
/// and functions.
#[derive(Debug, Clone)]
pub struct Scopes {
    variables: Frames<Value>,
    mixins: Frames<Mixin>,
    functions: Frames<Function>,
    len: Rc<Cell<usize>>,
    /// One-slot cache of the innermost frame a variable was found in.
    pub last_variable_index: Option<(Identifier, usize)>,
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

impl Scopes {
    pub fn new() -> Self {
        Self {
            variables: Frames::with_root(),
            mixins: Frames::with_root(),
            functions: Frames::with_root(),
            len: Rc::new(Cell::new(1)),
            last_variable_index: None,
        }
    }

    /// A snapshot of the chain for a closure.
    pub fn new_closure(&self) -> Self {
        debug_assert_eq!(self.len(), self.variables.depth());
        Self {
            variables: self.variables.snapshot(),
            mixins: self.mixins.snapshot(),
            functions: self.functions.snapshot(),
            len: Rc::new(Cell::new(self.len())),
            last_variable_index: self.last_variable_index,
        }
    }

    pub fn len(&self) -> usize {
        self.len.get()
    }

    pub fn enter_new_scope(&mut self) {
        self.len.set(self.len() + 1);
        self.variables.push_frame();
        self.mixins.push_frame();
        self.functions.push_frame();
    }

    pub fn exit_scope(&mut self) {
        self.len.set(self.len() - 1);
        self.variables.pop_frame();
        self.mixins.pop_frame();
        self.functions.pop_frame();
        self.last_variable_index = None;
    }

    pub fn global_variables(&self) -> Frame<Value> {
        self.variables.global()
    }

    pub fn global_mixins(&self) -> Frame<Mixin> {
        self.mixins.global()
    }

    pub fn global_functions(&self) -> Frame<Function> {
        self.functions.global()
    }

    // ===================== variables =====================

    pub fn find_var(&mut self, name: Identifier) -> Option<usize> {
        if let Some((cached, idx)) = self.last_variable_index {
            if cached == name {
                return Some(idx);
            }
        }

        let idx = self.variables.find(name)?;
        self.last_variable_index = Some((name, idx));
        Some(idx)
    }

    pub fn insert_var(&mut self, idx: usize, name: Identifier, value: Value) -> Option<Value> {
        self.variables.insert_at(idx, name, value)
    }

    /// Binds in the innermost frame, e.g. for `@each` and `@for` loop
    /// variables and argument binding.
    pub fn insert_var_last(&mut self, name: Identifier, value: Value) -> Option<Value> {
        self.last_variable_index = Some((name, self.len() - 1));
        self.variables.insert_innermost(name, value)
    }

    pub fn get_var(&mut self, name: Spanned<Identifier>) -> CompileResult<Value> {
        if let Some((cached, idx)) = self.last_variable_index {
            if cached == name.node {
                if let Some(value) = self.variables.get_at(idx, name.node) {
                    return Ok(value);
                }
            }
        }

        match self.variables.get(name.node) {
            Some((idx, value)) => {
                self.last_variable_index = Some((name.node, idx));
                Ok(value)
            }
            None => Err(("Undefined variable.", name.span).into()),
        }
    }

    pub fn var_exists(&self, name: Identifier) -> bool {
        self.variables.contains(name)
    }

    // ===================== mixins =====================

    pub fn insert_mixin(&mut self, name: Identifier, mixin: Mixin) {
        self.mixins.insert_innermost(name, mixin);
    }

    pub fn get_mixin(&self, name: Spanned<Identifier>) -> CompileResult<Mixin> {
        match self.mixins.get(name.node) {
            Some((_, mixin)) => Ok(mixin),
            None => Err(("Undefined mixin.", name.span).into()),
        }
    }

    pub fn mixin_exists(&self, name: Identifier) -> bool {
        self.mixins.contains(name)
    }

    // ===================== functions =====================

    pub fn insert_fn(&mut self, func: Function) {
        self.functions.insert_innermost(func.name(), func);
    }

    pub fn get_fn(&self, name: Identifier) -> Option<Function> {
        self.functions.get(name).map(|(_, func)| func)
    }

    pub fn fn_exists(&self, name: Identifier) -> bool {
        self.functions.contains(name) || GLOBAL_FUNCTIONS.contains_key(name.as_str())
    }
}
