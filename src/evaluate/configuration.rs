use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use codemap::{Span, Spanned};

use crate::{ast::AstForwardRule, common::Identifier, value::Value};

use super::module::ForwardFilter;

/// One `with`-configured variable, carrying the span of the `with` clause
/// that supplied it (absent for implicit configurations built from an
/// importer's globals).
#[derive(Debug, Clone)]
pub struct ConfiguredValue {
    pub value: Value,
    pub configuration_span: Option<Span>,
}

impl ConfiguredValue {
    pub fn explicit(value: Value, configuration_span: Span) -> Self {
        Self {
            value,
            configuration_span: Some(configuration_span),
        }
    }

    pub fn implicit(value: Value) -> Self {
        Self {
            value,
            configuration_span: None,
        }
    }
}

/// The `with`-configuration active while a module loads.
///
/// The value map is shared between views: a `@forward` narrows visibility
/// with a filter, but consuming a variable through the view marks it
/// consumed in the underlying map, which is what `!default` checks.
#[derive(Debug, Clone)]
pub struct Configuration {
    values: Rc<RefCell<BTreeMap<Identifier, ConfiguredValue>>>,
    /// Applied outermost-first when looking names up through `@forward`s.
    filters: Vec<ForwardFilter>,
    /// `Some` for explicit `with (...)` clauses; implicit configurations
    /// are allowed to go unconsumed.
    span: Option<Span>,
}

impl Configuration {
    pub fn empty() -> Self {
        Self {
            values: Rc::new(RefCell::new(BTreeMap::new())),
            filters: Vec::new(),
            span: None,
        }
    }

    pub fn explicit(values: BTreeMap<Identifier, ConfiguredValue>, span: Span) -> Self {
        Self {
            values: Rc::new(RefCell::new(values)),
            filters: Vec::new(),
            span: Some(span),
        }
    }

    pub fn implicit(values: BTreeMap<Identifier, ConfiguredValue>) -> Self {
        Self {
            values: Rc::new(RefCell::new(values)),
            filters: Vec::new(),
            span: None,
        }
    }

    /// A view of this configuration as seen through `forward`'s filter.
    pub fn through_forward(config: &Configuration, forward: &AstForwardRule) -> Configuration {
        if config.is_empty() {
            return Configuration::empty();
        }

        let mut filters = config.filters.clone();
        filters.push(ForwardFilter::of_rule(forward));

        Configuration {
            values: Rc::clone(&config.values),
            filters,
            span: config.span,
        }
    }

    pub fn is_implicit(&self) -> bool {
        self.span.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// The underlying name a view-level name refers to, if visible.
    fn resolve(&self, name: Identifier) -> Option<Identifier> {
        let mut name = name;
        for filter in self.filters.iter().rev() {
            name = filter.resolve_config_name(name)?;
        }
        Some(name)
    }

    /// Removes and returns the configured value for `name`, marking it
    /// consumed for every view sharing the map.
    pub fn remove(&mut self, name: Identifier) -> Option<ConfiguredValue> {
        let resolved = self.resolve(name)?;
        (*self.values).borrow_mut().remove(&resolved)
    }

    /// The visible `(name, value)` pairs, in view-level spelling.
    pub fn entries(&self) -> Vec<(Identifier, ConfiguredValue)> {
        self.keys()
            .into_iter()
            .filter_map(|name| {
                let resolved = self.resolve(name)?;
                let value = (*self.values).borrow().get(&resolved).cloned()?;
                Some((name, value))
            })
            .collect()
    }

    /// The visible names, in view-level spelling.
    pub fn keys(&self) -> Vec<Identifier> {
        (*self.values)
            .borrow()
            .keys()
            .copied()
            .filter_map(|underlying| {
                let mut name = underlying;
                for filter in &self.filters {
                    name = filter.rename_config_name(name)?;
                }
                Some(name)
            })
            .collect()
    }

    /// The first unconsumed variable, for "not declared with !default"
    /// errors.
    pub fn first(&self) -> Option<Spanned<Identifier>> {
        let keys = self.keys();
        let name = *keys.first()?;
        let resolved = self.resolve(name)?;
        let span = (*self.values)
            .borrow()
            .get(&resolved)?
            .configuration_span?;

        Some(Spanned { node: name, span })
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }
}
