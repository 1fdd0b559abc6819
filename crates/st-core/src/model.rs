//! Core syntax-tree data model.
//!
//! A diagram is a forest stored in a `StableDiGraph`: nodes are syntax
//! nodes, edges are parent→child containment. Ownership only flows down;
//! the parent back-reference is the single incoming edge, looked up on
//! demand. One tree is the *main* tree (the one the bracket notation
//! shows); the others are detached subtrees left on the canvas after a
//! drag with no drop target.

use crate::id::{Label, NodeId};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

// ─── Node kinds ──────────────────────────────────────────────────────────

/// Tags that introduce a clause rather than a phrase.
const CLAUSE_TAGS: &[&str] = &["S", "IC", "DC", "RC", "CC", "SC"];

/// What a node stands for in the diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Sentence or clause (`S`, `IC`, `DC`, `RC`, `CC`).
    Clause,
    /// Phrase (`NP`, `VP`, `PP`, `ADJP`, ...).
    Phrase,
    /// Part of speech (`N`, `V`, `DET`, `CONJ`, `REL`, ...).
    PartOfSpeech,
    /// A literal word or the empty marker `_`. Never has children.
    Terminal,
}

impl NodeKind {
    /// Infer the kind of a bracketed category label. Never rejects a label:
    /// anything that is neither a clause tag nor ends in `P` is a part of speech.
    pub fn classify(label: &str) -> Self {
        if CLAUSE_TAGS.contains(&label) {
            NodeKind::Clause
        } else if label.len() > 1 && label.ends_with('P') {
            NodeKind::Phrase
        } else {
            NodeKind::PartOfSpeech
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, NodeKind::Terminal)
    }
}

// ─── Positions ───────────────────────────────────────────────────────────

/// A point on the canvas. Node positions are tile centres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Resolved absolute bounding box of a tile after layout.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResolvedBounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ResolvedBounds {
    /// Bounds of a tile of the given size centred on `center`.
    pub fn centered(center: Position, width: f32, height: f32) -> Self {
        Self {
            x: center.x - width / 2.0,
            y: center.y - height / 2.0,
            width,
            height,
        }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn center(&self) -> Position {
        Position::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if this bounds intersects another (AABB overlap).
    pub fn intersects(&self, other: &ResolvedBounds) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    /// Euclidean distance from `p` to the box, 0 inside it.
    pub fn distance_to(&self, p: Position) -> f32 {
        let dx = (self.x - p.x).max(p.x - (self.x + self.width)).max(0.0);
        let dy = (self.y - p.y).max(p.y - (self.y + self.height)).max(0.0);
        dx.hypot(dy)
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// A single node of the diagram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Category tag for non-terminals, the literal word for terminals.
    pub label: Label,
    /// Last known tile centre. Input to the resolver, never structural truth.
    pub position: Position,
}

impl SyntaxNode {
    pub fn new(kind: NodeKind, label: Label) -> Self {
        Self {
            id: NodeId::fresh(),
            kind,
            label,
            position: Position::default(),
        }
    }

    /// A non-terminal whose kind is inferred from its tag.
    pub fn category(tag: &str) -> Self {
        Self::new(NodeKind::classify(tag), Label::intern(tag))
    }

    pub fn terminal(word: &str) -> Self {
        Self::new(NodeKind::Terminal, Label::intern(word))
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}

// ─── Structural violations ───────────────────────────────────────────────

/// An edit or a state that would break a tree invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralViolation {
    #[error("node index {0:?} is not part of the tree")]
    MissingNode(NodeIndex),
    #[error("terminal {0} cannot own children")]
    TerminalWithChildren(NodeId),
    #[error("attaching {child} under {parent} would make {child} its own descendant")]
    Cycle { child: NodeId, parent: NodeId },
    #[error("the main root {0} cannot be given a parent")]
    RootReparent(NodeId),
    #[error("node {0} has more than one parent")]
    MultipleParents(NodeId),
    #[error("child list of {0} disagrees with its containment edges")]
    ChildOrderMismatch(NodeId),
    #[error("node {0} is neither reachable from a root nor registered as one")]
    Unreachable(NodeId),
}

// ─── Syntax forest ───────────────────────────────────────────────────────

/// The diagram: one optional main tree plus any detached subtrees.
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    /// The underlying directed graph (edges: parent → child).
    pub graph: StableDiGraph<SyntaxNode, ()>,

    /// Root of the main tree, the one the bracket notation describes.
    pub root: Option<NodeIndex>,

    /// Roots of detached subtrees, in order of detachment.
    detached: Vec<NodeIndex>,

    /// Authoritative left-to-right child order per parent.
    child_order: HashMap<NodeIndex, SmallVec<[NodeIndex; 4]>>,

    /// Index from NodeId → NodeIndex for fast lookup.
    id_index: HashMap<NodeId, NodeIndex>,
}

impl SyntaxTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn insert(&mut self, node: SyntaxNode) -> NodeIndex {
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        idx
    }

    /// Add a parentless node. It becomes the main root if there is none yet
    /// and it is a non-terminal; otherwise it starts out detached.
    pub fn add_root(&mut self, node: SyntaxNode) -> NodeIndex {
        let becomes_main = self.root.is_none() && !node.is_terminal();
        let idx = self.insert(node);
        if becomes_main {
            self.root = Some(idx);
        } else {
            self.detached.push(idx);
        }
        idx
    }

    /// Add a parentless node that is always detached.
    pub fn add_detached(&mut self, node: SyntaxNode) -> NodeIndex {
        let idx = self.insert(node);
        self.detached.push(idx);
        idx
    }

    /// Append `node` as the last child of `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeIndex,
        node: SyntaxNode,
    ) -> Result<NodeIndex, StructuralViolation> {
        let parent_node = self.get(parent)?;
        if parent_node.is_terminal() {
            return Err(StructuralViolation::TerminalWithChildren(parent_node.id));
        }
        let idx = self.insert(node);
        self.graph.add_edge(parent, idx, ());
        self.child_order.entry(parent).or_default().push(idx);
        Ok(idx)
    }

    /// Look up a node by index.
    pub fn get(&self, idx: NodeIndex) -> Result<&SyntaxNode, StructuralViolation> {
        self.graph
            .node_weight(idx)
            .ok_or(StructuralViolation::MissingNode(idx))
    }

    pub fn get_mut(&mut self, idx: NodeIndex) -> Result<&mut SyntaxNode, StructuralViolation> {
        self.graph
            .node_weight_mut(idx)
            .ok_or(StructuralViolation::MissingNode(idx))
    }

    pub fn contains(&self, idx: NodeIndex) -> bool {
        self.graph.contains_node(idx)
    }

    /// Get the index for a NodeId.
    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    /// Look up a node by its ID.
    pub fn get_by_id(&self, id: NodeId) -> Option<&SyntaxNode> {
        self.index_of(id).and_then(|idx| self.graph.node_weight(idx))
    }

    /// Get the parent index of a node.
    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
    }

    /// Children of a node in left-to-right order.
    pub fn children(&self, idx: NodeIndex) -> &[NodeIndex] {
        self.child_order
            .get(&idx)
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    /// Position of `idx` among its siblings, `None` for roots.
    pub fn index_in_parent(&self, idx: NodeIndex) -> Option<usize> {
        let parent = self.parent(idx)?;
        self.children(parent).iter().position(|&c| c == idx)
    }

    /// Number of edges between `idx` and its top-level root.
    pub fn depth(&self, idx: NodeIndex) -> usize {
        let mut depth = 0;
        let mut current = idx;
        while let Some(p) = self.parent(current) {
            depth += 1;
            current = p;
        }
        depth
    }

    /// The top-level root of the tree `idx` belongs to.
    pub fn top_of(&self, idx: NodeIndex) -> NodeIndex {
        let mut current = idx;
        while let Some(p) = self.parent(current) {
            current = p;
        }
        current
    }

    /// Check if `ancestor` is a parent/grandparent/etc. of `descendant`.
    pub fn is_ancestor_of(&self, ancestor: NodeIndex, descendant: NodeIndex) -> bool {
        let mut current = descendant;
        while let Some(p) = self.parent(current) {
            if p == ancestor {
                return true;
            }
            current = p;
        }
        false
    }

    /// `idx` and all its descendants in pre-order.
    pub fn descendants(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut stack = vec![idx];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Roots of detached subtrees.
    pub fn detached_roots(&self) -> &[NodeIndex] {
        &self.detached
    }

    pub fn is_detached_root(&self, idx: NodeIndex) -> bool {
        self.detached.contains(&idx)
    }

    /// All top-level roots: the main root first, then detached ones.
    pub fn roots(&self) -> Vec<NodeIndex> {
        self.root.iter().chain(self.detached.iter()).copied().collect()
    }

    /// Every node, tree by tree, in pre-order.
    pub fn preorder(&self) -> Vec<NodeIndex> {
        self.roots()
            .into_iter()
            .flat_map(|r| self.descendants(r))
            .collect()
    }

    /// Every node sorted top-to-bottom, then left-to-right, by last known
    /// position. Ties keep pre-order, so the scan is stable.
    pub fn scan_order(&self) -> Vec<NodeIndex> {
        let mut nodes = self.preorder();
        nodes.sort_by(|&a, &b| {
            let pa = self.graph[a].position;
            let pb = self.graph[b].position;
            pa.y.total_cmp(&pb.y).then(pa.x.total_cmp(&pb.x))
        });
        nodes
    }

    /// Unhook `idx` from its parent (or the detached list) without
    /// registering it anywhere.
    fn unlink(&mut self, idx: NodeIndex) {
        if let Some(parent) = self.parent(idx) {
            if let Some(edge) = self.graph.find_edge(parent, idx) {
                self.graph.remove_edge(edge);
            }
            if let Some(order) = self.child_order.get_mut(&parent) {
                order.retain(|c| *c != idx);
            }
        }
        self.detached.retain(|d| *d != idx);
    }

    /// Cut `idx` loose from its parent; it becomes a detached root.
    /// Detaching a top-level root is a no-op.
    pub fn detach(&mut self, idx: NodeIndex) -> Result<(), StructuralViolation> {
        self.get(idx)?;
        if self.parent(idx).is_none() {
            return Ok(());
        }
        self.unlink(idx);
        self.detached.push(idx);
        Ok(())
    }

    /// Move `child` (with its subtree) under `parent` at sibling position
    /// `index` (clamped to the child count). Refuses edits that would break
    /// an invariant and leaves the tree untouched in that case.
    pub fn attach(
        &mut self,
        child: NodeIndex,
        parent: NodeIndex,
        index: usize,
    ) -> Result<(), StructuralViolation> {
        let child_id = self.get(child)?.id;
        let parent_node = self.get(parent)?;
        if parent_node.is_terminal() {
            return Err(StructuralViolation::TerminalWithChildren(parent_node.id));
        }
        if child == parent || self.is_ancestor_of(child, parent) {
            return Err(StructuralViolation::Cycle {
                child: child_id,
                parent: parent_node.id,
            });
        }
        if self.root == Some(child) {
            return Err(StructuralViolation::RootReparent(child_id));
        }

        self.unlink(child);
        self.graph.add_edge(parent, child, ());
        let order = self.child_order.entry(parent).or_default();
        let at = index.min(order.len());
        order.insert(at, child);
        Ok(())
    }

    /// Stable-sort the children of `parent` by ascending x.
    pub fn sort_children_by_x(&mut self, parent: NodeIndex) {
        if let Some(mut order) = self.child_order.remove(&parent) {
            order.sort_by(|&a, &b| {
                self.graph[a]
                    .position
                    .x
                    .total_cmp(&self.graph[b].position.x)
            });
            self.child_order.insert(parent, order);
        }
    }

    /// Delete `idx` and its whole subtree. Returns the number of nodes removed.
    pub fn remove_subtree(&mut self, idx: NodeIndex) -> Result<usize, StructuralViolation> {
        self.get(idx)?;
        let doomed = self.descendants(idx);
        self.unlink(idx);
        if self.root == Some(idx) {
            self.root = None;
        }
        for n in &doomed {
            self.child_order.remove(n);
            if let Some(node) = self.graph.remove_node(*n) {
                self.id_index.remove(&node.id);
            }
        }
        Ok(doomed.len())
    }

    /// Promote a detached, non-terminal root to main root. Only valid when
    /// the main tree is empty.
    pub fn promote_to_root(&mut self, idx: NodeIndex) -> bool {
        if self.root.is_some() || !self.is_detached_root(idx) {
            return false;
        }
        if self.graph[idx].is_terminal() {
            return false;
        }
        self.detached.retain(|d| *d != idx);
        self.root = Some(idx);
        true
    }

    /// Find the first node (pre-order) carrying `label`.
    pub fn find_by_label(&self, label: &str) -> Option<NodeIndex> {
        self.preorder()
            .into_iter()
            .find(|&idx| self.graph[idx].label == label)
    }

    pub(crate) fn raw_child_order(&self) -> &HashMap<NodeIndex, SmallVec<[NodeIndex; 4]>> {
        &self.child_order
    }

    pub(crate) fn raw_id_index(&self) -> &HashMap<NodeId, NodeIndex> {
        &self.id_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn np_tree() -> (SyntaxTree, NodeIndex, NodeIndex, NodeIndex) {
        let mut t = SyntaxTree::new();
        let s = t.add_root(SyntaxNode::category("S"));
        let np = t.add_child(s, SyntaxNode::category("NP")).unwrap();
        let n = t.add_child(np, SyntaxNode::category("N")).unwrap();
        (t, s, np, n)
    }

    #[test]
    fn classify_labels() {
        assert_eq!(NodeKind::classify("S"), NodeKind::Clause);
        assert_eq!(NodeKind::classify("RC"), NodeKind::Clause);
        assert_eq!(NodeKind::classify("NP"), NodeKind::Phrase);
        assert_eq!(NodeKind::classify("ADVP"), NodeKind::Phrase);
        assert_eq!(NodeKind::classify("N"), NodeKind::PartOfSpeech);
        assert_eq!(NodeKind::classify("P"), NodeKind::PartOfSpeech);
        assert_eq!(NodeKind::classify("XYZZY"), NodeKind::PartOfSpeech);
    }

    #[test]
    fn distance_to_box() {
        let b = ResolvedBounds {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        };
        assert_eq!(b.distance_to(Position::new(5.0, 5.0)), 0.0);
        assert_eq!(b.distance_to(Position::new(13.0, 14.0)), 5.0);
        assert_eq!(b.distance_to(Position::new(-4.0, 5.0)), 4.0);
    }

    #[test]
    fn tree_basics() {
        let (t, s, np, n) = np_tree();
        assert_eq!(t.root, Some(s));
        assert_eq!(t.children(s), &[np]);
        assert_eq!(t.parent(n), Some(np));
        assert_eq!(t.depth(n), 2);
        assert!(t.is_ancestor_of(s, n));
        assert!(!t.is_ancestor_of(n, s));
        assert_eq!(t.descendants(s), vec![s, np, n]);
    }

    #[test]
    fn terminal_refuses_children() {
        let (mut t, _, _, n) = np_tree();
        let word = t.add_child(n, SyntaxNode::terminal("dog")).unwrap();
        let err = t.add_child(word, SyntaxNode::terminal("x")).unwrap_err();
        assert!(matches!(err, StructuralViolation::TerminalWithChildren(_)));
    }

    #[test]
    fn attach_refuses_cycles() {
        let (mut t, _, np, n) = np_tree();
        let err = t.attach(np, n, 0).unwrap_err();
        assert!(matches!(err, StructuralViolation::Cycle { .. }));
        // Tree untouched
        assert_eq!(t.parent(n), Some(np));
    }

    #[test]
    fn attach_refuses_main_root() {
        let (mut t, s, np, _) = np_tree();
        let vp = t.add_detached(SyntaxNode::category("VP"));
        let err = t.attach(s, vp, 0).unwrap_err();
        assert!(matches!(err, StructuralViolation::RootReparent(_)));
        assert_eq!(t.children(s), &[np]);
    }

    #[test]
    fn detach_then_reattach() {
        let (mut t, s, np, n) = np_tree();
        t.detach(n).unwrap();
        assert_eq!(t.parent(n), None);
        assert_eq!(t.detached_roots(), &[n]);
        assert!(t.children(np).is_empty());

        t.attach(n, s, 0).unwrap();
        assert_eq!(t.children(s), &[n, np]);
        assert!(t.detached_roots().is_empty());
    }

    #[test]
    fn remove_subtree_drops_index_entries() {
        let (mut t, s, np, n) = np_tree();
        let id = t.graph[n].id;
        assert_eq!(t.remove_subtree(np).unwrap(), 2);
        assert!(t.children(s).is_empty());
        assert!(t.get_by_id(id).is_none());
        assert_eq!(t.node_count(), 1);
    }

    #[test]
    fn terminal_root_starts_detached() {
        let mut t = SyntaxTree::new();
        let w = t.add_root(SyntaxNode::terminal("dog"));
        assert_eq!(t.root, None);
        assert_eq!(t.detached_roots(), &[w]);
        assert!(!t.promote_to_root(w));
    }

    #[test]
    fn scan_order_is_top_down_then_left_right() {
        let mut t = SyntaxTree::new();
        let s = t.add_root(SyntaxNode::category("S"));
        let a = t.add_child(s, SyntaxNode::category("NP")).unwrap();
        let b = t.add_child(s, SyntaxNode::category("VP")).unwrap();
        t.graph[s].position = Position::new(100.0, 0.0);
        t.graph[a].position = Position::new(150.0, 80.0);
        t.graph[b].position = Position::new(50.0, 80.0);
        assert_eq!(t.scan_order(), vec![s, b, a]);
    }

    #[test]
    fn sort_children_by_x_is_stable() {
        let (mut t, s, np, _) = np_tree();
        let vp = t.add_child(s, SyntaxNode::category("VP")).unwrap();
        t.graph[np].position.x = 200.0;
        t.graph[vp].position.x = 100.0;
        t.sort_children_by_x(s);
        assert_eq!(t.children(s), &[vp, np]);
    }
}
