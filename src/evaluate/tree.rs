use std::cell::{Ref, RefCell, RefMut};

use crate::ast::CssStmt;

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct CssTreeIdx(usize);

/// One statement slot and its links. The statement lives in a `RefCell` so a
/// parent's body can be filled in while the arena itself is only shared.
#[derive(Debug, Clone)]
struct Node {
    /// `None` is a tombstone left where a child has been folded away.
    stmt: RefCell<Option<CssStmt>>,
    /// The most recent parent this node was linked under.
    parent: Option<CssTreeIdx>,
    children: Vec<CssTreeIdx>,
}

impl Node {
    fn empty() -> Self {
        Self {
            stmt: RefCell::new(None),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// The resolved tree under construction.
///
/// Statements are stored flat in an arena and linked parent-to-child by
/// index, so a node can be created before its children finish evaluating and
/// `@at-root` can graft copies of enclosing wrappers. A node re-linked under
/// a new parent stays listed under the old one; whichever parent folds first
/// takes the statement. `finish` folds children into their parents' bodies.
#[derive(Debug, Clone)]
pub struct CssTree {
    nodes: Vec<Node>,
}

impl CssTree {
    pub const ROOT: CssTreeIdx = CssTreeIdx(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![Node::empty()],
        }
    }

    pub fn get(&self, idx: CssTreeIdx) -> Ref<Option<CssStmt>> {
        self.nodes[idx.0].stmt.borrow()
    }

    pub fn get_mut(&self, idx: CssTreeIdx) -> RefMut<Option<CssStmt>> {
        self.nodes[idx.0].stmt.borrow_mut()
    }

    pub fn parent_of(&self, idx: CssTreeIdx) -> Option<CssTreeIdx> {
        self.nodes[idx.0].parent
    }

    pub fn last_child(&self, parent: CssTreeIdx) -> Option<CssTreeIdx> {
        self.nodes[parent.0].children.last().copied()
    }

    pub fn add_stmt(&mut self, stmt: CssStmt, parent: Option<CssTreeIdx>) -> CssTreeIdx {
        self.add_child(stmt, parent.unwrap_or(Self::ROOT))
    }

    pub fn add_child(&mut self, stmt: CssStmt, parent: CssTreeIdx) -> CssTreeIdx {
        let child = CssTreeIdx(self.nodes.len());
        self.nodes.push(Node {
            stmt: RefCell::new(Some(stmt)),
            parent: None,
            children: Vec::new(),
        });
        self.link_child_to_parent(child, parent);

        child
    }

    pub fn link_child_to_parent(&mut self, child: CssTreeIdx, parent: CssTreeIdx) {
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Whether `child` is followed by a sibling under its current parent.
    pub fn has_following_sibling(&self, child: CssTreeIdx) -> bool {
        if child == Self::ROOT {
            return false;
        }

        let parent = self.parent_of(child).unwrap();

        self.nodes[parent.0].children.last() != Some(&child)
    }

    pub fn finish(self) -> Vec<CssStmt> {
        // Children always carry a higher index than the node they were added
        // under, so the last node can't be an unfolded parent.
        for idx in 1..self.nodes.len().saturating_sub(1) {
            let node = &self.nodes[idx];
            if !node.children.is_empty() && node.stmt.borrow().is_some() {
                self.fold_children(CssTreeIdx(idx));
            }
        }

        self.nodes
            .into_iter()
            .filter_map(|node| node.stmt.into_inner())
            .collect()
    }

    fn fold_children(&self, parent: CssTreeIdx) {
        for &child in &self.nodes[parent.0].children {
            if !self.nodes[child.0].children.is_empty() {
                self.fold_children(child);
            }

            if let Some(stmt) = self.nodes[child.0].stmt.borrow_mut().take() {
                self.push_into(parent, stmt);
            }
        }
    }

    fn push_into(&self, parent: CssTreeIdx, child: CssStmt) {
        let mut slot = self.nodes[parent.0].stmt.borrow_mut();

        match slot.as_mut() {
            Some(CssStmt::RuleSet { body, .. }) => body.push(child),
            Some(CssStmt::Media(media, ..)) => media.body.push(child),
            Some(CssStmt::UnknownAtRule(at_rule, ..)) => at_rule.body.push(child),
            Some(CssStmt::Supports(supports, ..)) => supports.body.push(child),
            Some(CssStmt::KeyframesRuleSet(keyframes)) => keyframes.body.push(child),
            Some(CssStmt::Style(..) | CssStmt::Comment(..) | CssStmt::Import(..)) | None => {
                unreachable!()
            }
        }
    }
}
