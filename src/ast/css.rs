use codemap::Span;

use crate::selector::ExtendedSelector;

use super::{MediaRule, Style, UnknownAtRule};

/// A node of the resolved CSS tree: the evaluator's output, containing no
/// Sass-specific constructs.
#[derive(Debug, Clone)]
pub enum CssStmt {
    RuleSet {
        selector: ExtendedSelector,
        body: Vec<Self>,
        is_group_end: bool,
        /// How many style rules lexically enclosed this one; used by the
        /// nested output style.
        depth: usize,
        span: Span,
    },
    Style(Style),
    Media(MediaRule, bool, Span),
    UnknownAtRule(UnknownAtRule, bool),
    Supports(SupportsRule, bool),
    Comment(String, Span),
    KeyframesRuleSet(KeyframesRuleSet),
    /// A plain CSS import such as `@import "foo.css";`.
    Import(String, Option<String>),
}

impl CssStmt {
    pub fn is_style_rule(&self) -> bool {
        matches!(self, CssStmt::RuleSet { .. })
    }

    /// The group-end flag, for the statement kinds that carry one. A
    /// statement ending a group is followed by a blank line in the
    /// non-compressed output styles.
    fn group_end_slot(&mut self) -> Option<&mut bool> {
        match self {
            CssStmt::Media(_, flag, _)
            | CssStmt::UnknownAtRule(_, flag)
            | CssStmt::Supports(_, flag)
            | CssStmt::RuleSet {
                is_group_end: flag, ..
            } => Some(flag),
            CssStmt::Style(_)
            | CssStmt::Comment(..)
            | CssStmt::KeyframesRuleSet(_)
            | CssStmt::Import(..) => None,
        }
    }

    pub fn set_group_end(&mut self) {
        if let Some(flag) = self.group_end_slot() {
            *flag = true;
        }
    }

    pub fn is_group_end(&self) -> bool {
        match self {
            CssStmt::Media(_, flag, _)
            | CssStmt::UnknownAtRule(_, flag)
            | CssStmt::Supports(_, flag)
            | CssStmt::RuleSet {
                is_group_end: flag, ..
            } => *flag,
            _ => false,
        }
    }

    /// Whether serializing this statement would produce no output at all.
    pub fn is_invisible(&self) -> bool {
        let all_invisible = |body: &[CssStmt]| body.iter().all(CssStmt::is_invisible);

        match self {
            CssStmt::RuleSet { selector, body, .. } => {
                selector.is_invisible() || all_invisible(body)
            }
            CssStmt::Style(style) => style.value.node.is_blank(),
            CssStmt::Media(media_rule, ..) => all_invisible(&media_rule.body),
            CssStmt::Supports(supports_rule, ..) => all_invisible(&supports_rule.body),
            CssStmt::KeyframesRuleSet(keyframes) => all_invisible(&keyframes.body),
            CssStmt::UnknownAtRule(..) | CssStmt::Import(..) | CssStmt::Comment(..) => false,
        }
    }

    /// A shell of this statement with an empty body, for re-creating
    /// enclosing wrappers under `@at-root`. Only called on open wrappers,
    /// whose direct bodies are still empty.
    pub fn copy_without_children(&self) -> Self {
        let mut shell = self.clone();

        match &mut shell {
            CssStmt::RuleSet { body, .. } => body.clear(),
            CssStmt::Media(media, ..) => media.body.clear(),
            CssStmt::UnknownAtRule(at_rule, _) => at_rule.body.clear(),
            CssStmt::Supports(supports, _) => supports.body.clear(),
            CssStmt::KeyframesRuleSet(keyframes) => keyframes.body.clear(),
            CssStmt::Style(..) | CssStmt::Comment(..) | CssStmt::Import(..) => unreachable!(),
        }

        shell
    }
}

#[derive(Debug, Clone)]
pub struct KeyframesRuleSet {
    pub selector: Vec<KeyframesSelector>,
    pub body: Vec<CssStmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum KeyframesSelector {
    To,
    From,
    Percent(Box<str>),
}

impl std::fmt::Display for KeyframesSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyframesSelector::To => f.write_str("to"),
            KeyframesSelector::From => f.write_str("from"),
            KeyframesSelector::Percent(p) => write!(f, "{}%", p),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupportsRule {
    pub params: String,
    pub body: Vec<CssStmt>,
    pub span: Span,
}
