//! Editing session: the single owner of a diagram.
//!
//! A session holds one forest, one status value and the positions a host
//! has pinned by dragging. Hosts feed it text through [`EditorSession::ingest`],
//! move tiles through the drag calls, and read the canonical notation back
//! from [`EditorSession::bracket`] at any time.
//!
//! Every structural edit runs as a transaction: it is applied to the tree,
//! the tree is checked, and on any violation the previous tree is restored.
//! After each committed edit the layout is re-solved, so positions always
//! reflect the latest structure.

use crate::config::EngineConfig;
use crate::drag::{DragGesture, DragOutcome, DragState};
use serde::{Deserialize, Serialize};
use st_core::NodeIndex;
use st_core::check::check_structure;
use st_core::emitter::emit_bracket;
use st_core::id::{Label, NodeId};
use st_core::layout::{apply_layout, resolve_layout, union_bounds};
use st_core::model::*;
use st_core::parser::{ParseError, is_delimiter, is_label_char, parse_bracket};
use st_core::resolve::{DropTarget, apply_drop, find_parent, resolve_drop};
use std::collections::HashMap;

// ─── Status & errors ─────────────────────────────────────────────────────

/// What a host shows in its status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Nothing on the canvas.
    Empty,
    /// One tree, fully described by the bracket notation.
    Synced,
    /// The last ingest was rejected; the tree is the previous one.
    ParseError { offset: usize, message: String },
    /// This many detached subtrees sit beside the main tree.
    PartiallyConnected(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no node {0} in this diagram")]
    UnknownNode(NodeId),
    #[error("node {0} is not being dragged")]
    NotDragging(NodeId),
    #[error("node {0} is already being dragged")]
    AlreadyDragging(NodeId),
    #[error("{text:?} is not valid text for a {kind:?} node")]
    InvalidText { text: String, kind: NodeKind },
    #[error("drop position is not a finite point")]
    NonFinitePosition,
    #[error(transparent)]
    Structural(#[from] StructuralViolation),
}

// ─── Session ─────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct EditorSession {
    tree: SyntaxTree,
    status: Status,
    config: EngineConfig,
    drag: DragState,
    /// Tile centres pinned for top-level roots by drags and drops.
    overrides: HashMap<NodeIndex, Position>,
    /// Commits each detached root has stayed detached for.
    detached_age: HashMap<NodeIndex, u32>,
    bounds: HashMap<NodeIndex, ResolvedBounds>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl EditorSession {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            tree: SyntaxTree::new(),
            status: Status::Empty,
            config,
            drag: DragState::Idle,
            overrides: HashMap::new(),
            detached_age: HashMap::new(),
            bounds: HashMap::new(),
        }
    }

    /// Build a session and ingest `text` into it.
    pub fn from_text(text: &str, config: EngineConfig) -> Result<Self, ParseError> {
        let mut session = Self::new(config);
        session.ingest(text)?;
        Ok(session)
    }

    // ─── Text side ───────────────────────────────────────────────────────

    /// Replace the diagram with the tree parsed from `text`.
    ///
    /// Blank text clears the canvas. On a parse error the current tree is
    /// kept and the status reports the error.
    pub fn ingest(&mut self, text: &str) -> Result<(), ParseError> {
        if text.trim().is_empty() {
            self.replace_tree(SyntaxTree::new());
            return Ok(());
        }
        match parse_bracket(text) {
            Ok(tree) => {
                self.replace_tree(tree);
                Ok(())
            }
            Err(err) => {
                log::debug!("ingest rejected: {err}");
                self.status = Status::ParseError {
                    offset: err.offset,
                    message: err.kind.to_string(),
                };
                Err(err)
            }
        }
    }

    /// Canonical bracket notation of the main tree.
    pub fn bracket(&self) -> String {
        emit_bracket(&self.tree)
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    fn replace_tree(&mut self, tree: SyntaxTree) {
        self.tree = tree;
        self.drag.reset();
        self.overrides.clear();
        self.detached_age.clear();
        self.relayout(true);
        self.refresh_status();
        log::debug!("ingested tree of {} nodes", self.tree.node_count());
    }

    // ─── Drag side ───────────────────────────────────────────────────────

    pub fn begin_drag(&mut self, id: NodeId) -> Result<(), SessionError> {
        let idx = self.index(id)?;
        let origin = self.tree.graph[idx].position;
        let gesture = DragGesture {
            node: id,
            origin,
            original_parent: self.tree.parent(idx).map(|p| self.tree.graph[p].id),
            original_index: self.tree.index_in_parent(idx),
            preview: origin,
        };
        self.drag.begin(gesture)
    }

    /// Record a preview sample. The tree is not touched.
    pub fn update_drag(&mut self, id: NodeId, at: Position) -> Result<(), SessionError> {
        self.drag.sample(id, at)
    }

    /// Release the dragged tile at `drop` and commit the resolved edit.
    pub fn end_drag(&mut self, id: NodeId, drop: Position) -> Result<DragOutcome, SessionError> {
        let gesture = self.drag.commit(id)?;
        let result = self.commit_drag(&gesture, drop);
        self.drag.reset();
        result
    }

    fn commit_drag(
        &mut self,
        gesture: &DragGesture,
        drop: Position,
    ) -> Result<DragOutcome, SessionError> {
        let idx = self.index(gesture.node)?;
        let target = resolve_drop(
            &self.tree,
            idx,
            drop,
            &self.config.resolver,
            &self.config.layout,
        )?;
        if target == DropTarget::NoOp {
            return Ok(DragOutcome::Unchanged);
        }
        self.transact(|tree| apply_drop(tree, idx, drop, target))?;

        let outcome = match target {
            DropTarget::Attach { parent, .. } => {
                self.overrides.remove(&idx);
                self.detached_age.remove(&idx);
                let parent = self.tree.graph[parent].id;
                DragOutcome::Attached {
                    parent,
                    index: self.tree.index_in_parent(idx).unwrap_or_default(),
                    reparented: gesture.original_parent != Some(parent),
                }
            }
            DropTarget::Detach => {
                self.overrides.insert(idx, drop);
                DragOutcome::Detached
            }
            DropTarget::Relocate | DropTarget::NoOp => {
                self.overrides.insert(idx, drop);
                DragOutcome::Relocated
            }
        };
        let fresh = (outcome == DragOutcome::Detached).then_some(idx);
        self.finish_commit(fresh);
        log::debug!("drag of {} committed: {outcome:?}", gesture.node);
        Ok(outcome)
    }

    /// Re-solve every tile position. `force` drops pinned positions so the
    /// main tree returns to the origin and detached trees line up beside it.
    pub fn relayout(&mut self, force: bool) {
        if force {
            self.overrides.clear();
        }
        let tree = &self.tree;
        self.overrides
            .retain(|&idx, _| tree.contains(idx) && tree.parent(idx).is_none());
        self.bounds = resolve_layout(&self.tree, &self.config.layout, &self.overrides);
        apply_layout(&mut self.tree, &self.bounds);
        log::debug!(
            "relayout of {} nodes ({} pinned)",
            self.bounds.len(),
            self.overrides.len()
        );
    }

    // ─── Palette & editing ───────────────────────────────────────────────

    /// Drop a brand-new tile. It attaches wherever a dragged tile released
    /// at `at` would. A category dropped on a canvas without a main tree
    /// becomes its root; anything else with no slot stays detached.
    pub fn drop_new(
        &mut self,
        kind: NodeKind,
        text: &str,
        at: Position,
    ) -> Result<NodeId, SessionError> {
        validate_text(kind, text)?;
        if !at.x.is_finite() || !at.y.is_finite() {
            return Err(SessionError::NonFinitePosition);
        }
        let mut node = SyntaxNode::new(kind, Label::intern(text));
        node.position = at;
        let id = node.id;

        let becomes_root = self.tree.root.is_none() && !kind.is_terminal();
        let (resolver, layout) = (self.config.resolver, self.config.layout);
        let (idx, attached) = self.transact(|tree| {
            if becomes_root {
                return Ok((tree.add_root(node), false));
            }
            let idx = tree.add_detached(node);
            match find_parent(tree, idx, at, &resolver, &layout) {
                Some((parent, index)) => {
                    tree.attach(idx, parent, index)?;
                    tree.sort_children_by_x(parent);
                    Ok((idx, true))
                }
                None => Ok((idx, false)),
            }
        })?;

        if !attached {
            self.overrides.insert(idx, at);
        }
        let fresh = self.tree.is_detached_root(idx).then_some(idx);
        self.finish_commit(fresh);
        log::debug!("dropped new {kind:?} {text:?} as {id}");
        Ok(id)
    }

    /// Change a node's label (or a terminal's word) in place. The text must
    /// stay a single token so the notation still parses back.
    pub fn set_label(&mut self, id: NodeId, text: &str) -> Result<(), SessionError> {
        let idx = self.index(id)?;
        validate_text(self.tree.graph[idx].kind, text)?;
        self.tree.graph[idx].label = Label::intern(text);
        self.relayout(false);
        self.refresh_status();
        Ok(())
    }

    /// Delete `id` and its subtree. Deleting the main root promotes the
    /// first detached category tree, if any. Returns the nodes removed.
    pub fn delete_node(&mut self, id: NodeId) -> Result<usize, SessionError> {
        let idx = self.index(id)?;
        if let Some(held) = self.drag.active_node().and_then(|n| self.tree.index_of(n))
            && (held == idx || self.tree.is_ancestor_of(idx, held))
        {
            self.drag.reset();
        }

        let removed = self.transact(|tree| {
            let was_main = tree.root == Some(idx);
            let removed = tree.remove_subtree(idx)?;
            if was_main {
                let next = tree
                    .detached_roots()
                    .iter()
                    .copied()
                    .find(|&r| !tree.graph[r].is_terminal());
                if let Some(next) = next {
                    tree.promote_to_root(next);
                }
            }
            Ok(removed)
        })?;

        self.forget_stale();
        self.relayout(false);
        self.refresh_status();
        log::debug!("deleted {id} ({removed} nodes)");
        Ok(removed)
    }

    /// Delete detached subtrees that have outlived the grace period and lie
    /// farther than `prune_distance` from the main tree. Returns the nodes
    /// removed. Without a main tree nothing is pruned.
    pub fn prune_detached(&mut self) -> Result<usize, SessionError> {
        let Some(root) = self.tree.root else {
            return Ok(0);
        };
        let Some(main) = union_bounds(&self.bounds, self.tree.descendants(root)) else {
            return Ok(0);
        };

        let doomed: Vec<NodeIndex> = self
            .tree
            .detached_roots()
            .iter()
            .copied()
            .filter(|r| {
                let age = self.detached_age.get(r).copied().unwrap_or_default();
                age >= self.config.grace_steps
                    && main.distance_to(self.tree.graph[*r].position) > self.config.prune_distance
            })
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        let removed = self.transact(|tree| {
            let mut removed = 0;
            for &r in &doomed {
                removed += tree.remove_subtree(r)?;
            }
            Ok(removed)
        })?;

        self.forget_stale();
        self.relayout(false);
        self.refresh_status();
        log::debug!("pruned {} detached subtrees ({removed} nodes)", doomed.len());
        Ok(removed)
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    /// Committed tile centre of `id`.
    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.tree.get_by_id(id).map(|n| n.position)
    }

    pub fn bounds_of(&self, id: NodeId) -> Option<ResolvedBounds> {
        self.tree
            .index_of(id)
            .and_then(|idx| self.bounds.get(&idx))
            .copied()
    }

    pub fn label_of(&self, id: NodeId) -> Option<&str> {
        self.tree.get_by_id(id).map(|n| n.label.as_str())
    }

    pub fn kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.tree.get_by_id(id).map(|n| n.kind)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.tree.root.map(|r| self.tree.graph[r].id)
    }

    pub fn detached_roots(&self) -> Vec<NodeId> {
        self.ids(self.tree.detached_roots())
    }

    pub fn parent_of(&self, id: NodeId) -> Result<Option<NodeId>, SessionError> {
        let idx = self.index(id)?;
        Ok(self.tree.parent(idx).map(|p| self.tree.graph[p].id))
    }

    pub fn children_of(&self, id: NodeId) -> Result<Vec<NodeId>, SessionError> {
        let idx = self.index(id)?;
        Ok(self.ids(self.tree.children(idx)))
    }

    /// First node carrying `label`, main tree first, in pre-order.
    pub fn find_by_label(&self, label: &str) -> Option<NodeId> {
        self.tree
            .find_by_label(label)
            .map(|idx| self.tree.graph[idx].id)
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn index(&self, id: NodeId) -> Result<NodeIndex, SessionError> {
        self.tree.index_of(id).ok_or(SessionError::UnknownNode(id))
    }

    fn ids(&self, nodes: &[NodeIndex]) -> Vec<NodeId> {
        nodes.iter().map(|&n| self.tree.graph[n].id).collect()
    }

    /// Apply `edit`, then check the tree. Either step failing restores the
    /// tree as it was before the edit.
    fn transact<T>(
        &mut self,
        edit: impl FnOnce(&mut SyntaxTree) -> Result<T, StructuralViolation>,
    ) -> Result<T, SessionError> {
        let snapshot = self.tree.clone();
        let result = edit(&mut self.tree).and_then(|out| check_structure(&self.tree).map(|()| out));
        result.map_err(|violation| {
            log::warn!("edit refused: {violation}");
            self.tree = snapshot;
            SessionError::Structural(violation)
        })
    }

    /// Bookkeeping after a drag or drop commit: age detached roots, start
    /// `fresh` at zero, re-solve the layout and refresh the status.
    fn finish_commit(&mut self, fresh: Option<NodeIndex>) {
        self.forget_stale();
        for &r in self.tree.detached_roots() {
            if Some(r) != fresh {
                *self.detached_age.entry(r).or_default() += 1;
            }
        }
        if let Some(r) = fresh {
            self.detached_age.insert(r, 0);
        }
        self.relayout(false);
        self.refresh_status();
    }

    /// Drop bookkeeping for nodes that are gone or no longer top-level.
    fn forget_stale(&mut self) {
        let tree = &self.tree;
        self.detached_age.retain(|&idx, _| tree.is_detached_root(idx));
        self.overrides
            .retain(|&idx, _| tree.contains(idx) && tree.parent(idx).is_none());
    }

    fn refresh_status(&mut self) {
        self.status = if self.tree.is_empty() {
            Status::Empty
        } else {
            match self.tree.detached_roots().len() {
                0 => Status::Synced,
                n => Status::PartiallyConnected(n),
            }
        };
    }
}

/// Categories need a label made of label characters; terminals need a
/// single non-empty word.
fn validate_text(kind: NodeKind, text: &str) -> Result<(), SessionError> {
    let valid = !text.is_empty()
        && if kind.is_terminal() {
            !text.chars().any(is_delimiter)
        } else {
            text.chars().all(is_label_char)
        };
    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidText {
            text: text.to_string(),
            kind,
        })
    }
}
