use codemap::Span;

use crate::{
    ast::MediaQuery,
    error::{CompileResult, ErrorKind},
};

use super::{ComplexSelector, SimpleSelector};

/// A single `@extend` relation: one extender selector applied to one target
/// simple selector.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Extension {
    /// The selector of the rule in which the `@extend` appeared.
    pub extender: ComplexSelector,

    /// The simple selector being extended. `None` for one-off extensions
    /// created internally while rewriting.
    pub target: Option<SimpleSelector>,

    /// The minimum specificity required of any selector generated from this
    /// extender.
    pub specificity: i32,

    /// Whether the `@extend` carried `!optional`.
    pub is_optional: bool,

    /// Whether this is a one-off extender representing a selector that was
    /// originally in the document rather than produced by `@extend`.
    pub is_original: bool,

    /// The media query context this extension is restricted to, or `None`
    /// for the top level.
    pub media_context: Option<Vec<MediaQuery>>,

    /// Where the `@extend` was written.
    pub span: Span,
}

impl Extension {
    pub fn one_off(
        extender: ComplexSelector,
        specificity: Option<i32>,
        is_original: bool,
        span: Span,
    ) -> Self {
        Self {
            specificity: specificity.unwrap_or_else(|| extender.max_specificity()),
            extender,
            target: None,
            span,
            is_optional: true,
            is_original,
            media_context: None,
        }
    }

    pub fn with_extender(&self, extender: ComplexSelector) -> Self {
        Self {
            extender,
            ..self.clone()
        }
    }

    /// Extending a rule inside one media context from inside a different one
    /// is an error. `!optional` does not excuse it.
    pub fn assert_compatible_media_context(
        &self,
        media_context: &Option<Vec<MediaQuery>>,
    ) -> CompileResult<()> {
        if &self.media_context == media_context {
            return Ok(());
        }

        if self.media_context.is_none() {
            return Ok(());
        }

        Err((
            ErrorKind::ExtendAcrossMedia,
            "You may not @extend selectors across media queries.",
            self.span,
        )
            .into())
    }

    /// Combines two extensions with the same extender and target, keeping
    /// the stricter optionality and checking media agreement.
    pub fn merge(left: Extension, right: Extension) -> CompileResult<Extension> {
        debug_assert!(left.extender == right.extender && left.target == right.target);

        if left.media_context.is_some()
            && right.media_context.is_some()
            && left.media_context != right.media_context
        {
            return Err((
                ErrorKind::ExtendAcrossMedia,
                "You may not @extend the same selector from within different media queries.",
                right.span,
            )
                .into());
        }

        if right.is_optional && right.media_context.is_none() {
            return Ok(left);
        }

        if left.is_optional && left.media_context.is_none() {
            return Ok(right);
        }

        Ok(Extension {
            media_context: match left.media_context {
                Some(v) => Some(v),
                None => right.media_context,
            },
            is_optional: left.is_optional && right.is_optional,
            is_original: false,
            ..left
        })
    }
}

/// The `!optional` flag and span of a single `@extend` rule.
#[derive(Clone, Debug)]
pub struct ExtendRule {
    pub is_optional: bool,
}
