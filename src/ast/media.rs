use std::fmt::{self, Write};

use codemap::Span;

use crate::{ast::CssStmt, error::CompileResult, lexer::Lexer, parse::parse_media_queries};

#[derive(Debug, Clone)]
pub struct MediaRule {
    pub query: Vec<MediaQuery>,
    pub body: Vec<CssStmt>,
}

/// A single parsed media query: `[modifier] [type] [and (cond) ...]`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MediaQuery {
    pub modifier: Option<String>,
    pub media_type: Option<String>,
    pub conditions: Vec<String>,
    pub conjunction: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum MediaQueryMergeResult {
    Empty,
    Unrepresentable,
    Success(MediaQuery),
}

impl MediaQuery {
    pub fn condition(conditions: Vec<String>, conjunction: bool) -> Self {
        Self {
            modifier: None,
            media_type: None,
            conditions,
            conjunction,
        }
    }

    pub fn media_type(
        media_type: Option<String>,
        modifier: Option<String>,
        conditions: Option<Vec<String>>,
    ) -> Self {
        Self {
            modifier,
            conjunction: true,
            media_type,
            conditions: conditions.unwrap_or_default(),
        }
    }

    pub fn parse_list(list: &str, span: Span) -> CompileResult<Vec<Self>> {
        parse_media_queries(Lexer::new_from_string(list, span))
    }

    pub fn matches_all_types(&self) -> bool {
        self.media_type.is_none()
            || self
                .media_type
                .as_deref()
                .map_or(false, |t| t.eq_ignore_ascii_case("all"))
    }

    fn is_negated(&self) -> bool {
        self.modifier
            .as_deref()
            .map_or(false, |m| m.eq_ignore_ascii_case("not"))
    }

    fn type_lowercase(&self) -> Option<String> {
        self.media_type.as_deref().map(str::to_ascii_lowercase)
    }

    fn joined_conditions(&self, other: &Self) -> Vec<String> {
        self.conditions
            .iter()
            .chain(&other.conditions)
            .cloned()
            .collect()
    }

    /// Intersects every query in `lhs` with every query in `rhs`, dropping
    /// empty intersections. `None` means some pair has no CSS spelling, so
    /// the caller must leave the queries nested.
    pub fn intersect_all(lhs: &[MediaQuery], rhs: &[MediaQuery]) -> Option<Vec<MediaQuery>> {
        let mut merged = Vec::new();

        for left in lhs {
            for right in rhs {
                match left.merge(right) {
                    MediaQueryMergeResult::Empty => {}
                    MediaQueryMergeResult::Unrepresentable => return None,
                    MediaQueryMergeResult::Success(query) => merged.push(query),
                }
            }
        }

        Some(merged)
    }

    /// Intersects two queries, producing the query matching exactly when
    /// both do, or reporting that no such query can be written.
    pub fn merge(&self, other: &Self) -> MediaQueryMergeResult {
        if !self.conjunction || !other.conjunction {
            return MediaQueryMergeResult::Unrepresentable;
        }

        // Two bare condition lists just concatenate.
        if self.media_type.is_none() && other.media_type.is_none() {
            return MediaQueryMergeResult::Success(Self::condition(
                self.joined_conditions(other),
                true,
            ));
        }

        match (self.is_negated(), other.is_negated()) {
            (true, true) => self.merge_both_negated(other),
            (true, false) => Self::merge_mixed_negation(self, other),
            (false, true) => Self::merge_mixed_negation(other, self),
            (false, false) => self.merge_positive(other),
        }
    }

    /// `not screen` ∩ `not print` has no CSS spelling; `not screen and (a)`
    /// ∩ `not screen and (a) and (b)` narrows to the longer condition list.
    fn merge_both_negated(&self, other: &Self) -> MediaQueryMergeResult {
        if self.type_lowercase() != other.type_lowercase() {
            return MediaQueryMergeResult::Unrepresentable;
        }

        let (wide, narrow) = if self.conditions.len() > other.conditions.len() {
            (self, other)
        } else {
            (other, self)
        };

        if narrow
            .conditions
            .iter()
            .all(|c| wide.conditions.contains(c))
        {
            MediaQueryMergeResult::Success(MediaQuery {
                modifier: self.modifier.clone(),
                media_type: self.media_type.clone(),
                conditions: wide.conditions.clone(),
                conjunction: true,
            })
        } else {
            MediaQueryMergeResult::Unrepresentable
        }
    }

    /// Exactly one side is negated: the intersection is the positive side,
    /// unless either side matches all types, which CSS can't express.
    fn merge_mixed_negation(negated: &Self, positive: &Self) -> MediaQueryMergeResult {
        if negated.matches_all_types() || positive.matches_all_types() {
            return MediaQueryMergeResult::Unrepresentable;
        }

        MediaQueryMergeResult::Success(MediaQuery {
            modifier: positive.modifier.clone(),
            media_type: positive.media_type.clone(),
            conditions: positive.conditions.clone(),
            conjunction: true,
        })
    }

    fn merge_positive(&self, other: &Self) -> MediaQueryMergeResult {
        if self.matches_all_types() {
            // Omit the type if either input query did, since that indicates
            // they aren't targeting a browser that requires "all and".
            let media_type = if other.matches_all_types() && self.media_type.is_none() {
                None
            } else {
                other.media_type.clone()
            };

            return MediaQueryMergeResult::Success(MediaQuery {
                modifier: other.modifier.clone(),
                media_type,
                conditions: self.joined_conditions(other),
                conjunction: true,
            });
        }

        if other.matches_all_types() {
            return MediaQueryMergeResult::Success(MediaQuery {
                modifier: self.modifier.clone(),
                media_type: self.media_type.clone(),
                conditions: self.joined_conditions(other),
                conjunction: true,
            });
        }

        if self.type_lowercase() != other.type_lowercase() {
            return MediaQueryMergeResult::Empty;
        }

        MediaQueryMergeResult::Success(MediaQuery {
            modifier: self
                .modifier
                .clone()
                .or_else(|| other.modifier.clone()),
            media_type: self.media_type.clone(),
            conditions: self.joined_conditions(other),
            conjunction: true,
        })
    }
}

impl fmt::Display for MediaQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(modifier) = &self.modifier {
            f.write_str(modifier)?;
            f.write_char(' ')?;
        }

        if let Some(media_type) = &self.media_type {
            f.write_str(media_type)?;
            if !self.conditions.is_empty() {
                f.write_str(" and ")?;
            }
        }

        f.write_str(&self.conditions.join(" and "))
    }
}
