//! Spatial relationship resolver: drop position → structural edit.
//!
//! Given where a dragged tile was released, decides whether it attaches
//! under another node (and at which sibling index), detaches from the
//! tree, or simply moves. Only last known tile centres are consulted; the
//! resolver never looks at the layout solver's output directly.
//!
//! A node `N` is a candidate parent when the drop point lies in the band
//! below it (`min_drop < dy <= level_band`) and within its subtree's
//! horizontal extent widened by `horizontal_margin`. The best candidate
//! minimises the distance to its child slots: how far the drop lies outside
//! the extent plus `|dy - level_height|`. Equal scores keep the candidate
//! met first in scan order. Terminals can
//! be hit but never own children, so a hit terminal stands in for its
//! parent.

use crate::layout::LayoutConfig;
use crate::model::{Position, StructuralViolation, SyntaxTree};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ─── Config ───────────────────────────────────────────────────────────────

/// Calibration constants for drop-target detection, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Ideal vertical offset of a child below its parent.
    pub level_height: f32,
    /// A drop must land at least this far below a candidate.
    pub min_drop: f32,
    /// ... and at most this far below it.
    pub level_band: f32,
    /// Slack added on both sides of a candidate's horizontal extent.
    pub horizontal_margin: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            level_height: 80.0,
            min_drop: 40.0,
            level_band: 180.0,
            horizontal_margin: 60.0,
        }
    }
}

// ─── Outcomes ─────────────────────────────────────────────────────────────

/// The structural edit a drop resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// Become child number `index` of `parent` (may be the old parent).
    Attach { parent: NodeIndex, index: usize },
    /// Leave the tree and become a detached root.
    Detach,
    /// Move without structural change: the main root, or a detached root
    /// dropped away from every candidate.
    Relocate,
    /// Dropped exactly where it started.
    NoOp,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    parent: NodeIndex,
    score: f32,
}

impl Candidate {
    /// Strictly better only; ties stay with the earlier scan.
    fn beats(&self, other: &Candidate) -> bool {
        self.score < other.score
    }
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Decide what dropping `dragged` at `drop` means. Pure: the tree is only read.
pub fn resolve_drop(
    tree: &SyntaxTree,
    dragged: NodeIndex,
    drop: Position,
    config: &ResolverConfig,
    layout: &LayoutConfig,
) -> Result<DropTarget, StructuralViolation> {
    let node = tree.get(dragged)?;
    if !drop.x.is_finite() || !drop.y.is_finite() || node.position == drop {
        return Ok(DropTarget::NoOp);
    }
    if tree.root == Some(dragged) {
        return Ok(DropTarget::Relocate);
    }

    let target = match find_parent(tree, dragged, drop, config, layout) {
        Some((parent, index)) => DropTarget::Attach { parent, index },
        None if tree.parent(dragged).is_none() => DropTarget::Relocate,
        None => DropTarget::Detach,
    };
    log::debug!("drop of {} resolved to {target:?}", node.label);
    Ok(target)
}

/// Best parent for `dragged` released at `drop`, with the sibling index it
/// would take there. `None` when no node qualifies. The dragged node's own
/// position is not consulted, so this also serves freshly created tiles.
/// A non-finite drop point has no parent.
pub fn find_parent(
    tree: &SyntaxTree,
    dragged: NodeIndex,
    drop: Position,
    config: &ResolverConfig,
    layout: &LayoutConfig,
) -> Option<(NodeIndex, usize)> {
    if !drop.x.is_finite() || !drop.y.is_finite() {
        return None;
    }
    let excluded: HashSet<NodeIndex> = tree.descendants(dragged).into_iter().collect();
    let extents = horizontal_extents(tree, &excluded, layout);
    let mut best: Option<Candidate> = None;

    for idx in tree.scan_order() {
        if excluded.contains(&idx) {
            continue;
        }
        let scanned = &tree.graph[idx];
        let parent = if scanned.is_terminal() {
            match tree.parent(idx) {
                Some(p) if !excluded.contains(&p) => p,
                _ => continue,
            }
        } else {
            idx
        };

        let dy = drop.y - scanned.position.y;
        if dy <= config.min_drop || dy > config.level_band {
            continue;
        }
        let Some(&(left, right)) = extents.get(&idx) else {
            continue;
        };
        if drop.x < left - config.horizontal_margin || drop.x > right + config.horizontal_margin {
            continue;
        }

        let outside = (left - drop.x).max(drop.x - right).max(0.0);
        let candidate = Candidate {
            parent,
            score: outside + (dy - config.level_height).abs(),
        };
        log::trace!(
            "drop candidate {} via {} scores {:.1}",
            tree.graph[parent].label,
            scanned.label,
            candidate.score
        );
        if best.is_none_or(|b| candidate.beats(&b)) {
            best = Some(candidate);
        }
    }

    best.map(|Candidate { parent, .. }| (parent, insertion_index(tree, parent, dragged, drop.x)))
}

/// Apply a resolved drop. The dragged subtree is moved by the drag delta,
/// then the structural edit is made and the receiving parent's children
/// are re-sorted by x. On error the tree is left as it was.
pub fn apply_drop(
    tree: &mut SyntaxTree,
    dragged: NodeIndex,
    drop: Position,
    target: DropTarget,
) -> Result<(), StructuralViolation> {
    let start = tree.get(dragged)?.position;

    match target {
        DropTarget::NoOp => return Ok(()),
        DropTarget::Attach { parent, index } => tree.attach(dragged, parent, index)?,
        DropTarget::Detach => tree.detach(dragged)?,
        DropTarget::Relocate => {}
    }

    let (dx, dy) = (drop.x - start.x, drop.y - start.y);
    for idx in tree.descendants(dragged) {
        let node = &mut tree.graph[idx];
        node.position = node.position.offset(dx, dy);
    }

    if let DropTarget::Attach { parent, .. } = target {
        tree.sort_children_by_x(parent);
    }
    Ok(())
}

/// Count of `parent`'s other children lying left of `x`.
pub fn insertion_index(tree: &SyntaxTree, parent: NodeIndex, dragged: NodeIndex, x: f32) -> usize {
    tree.children(parent)
        .iter()
        .filter(|&&c| c != dragged && tree.graph[c].position.x < x)
        .count()
}

/// Horizontal span `(left, right)` of every subtree's tiles, ignoring the
/// `excluded` nodes. Built bottom-up in one pass.
fn horizontal_extents(
    tree: &SyntaxTree,
    excluded: &HashSet<NodeIndex>,
    layout: &LayoutConfig,
) -> HashMap<NodeIndex, (f32, f32)> {
    let mut extents: HashMap<NodeIndex, (f32, f32)> = HashMap::with_capacity(tree.node_count());
    for idx in tree.preorder().into_iter().rev() {
        if excluded.contains(&idx) {
            continue;
        }
        let node = &tree.graph[idx];
        let half = layout.node_width(node.label.as_str()) / 2.0;
        let mut span = (node.position.x - half, node.position.x + half);
        for child in tree.children(idx) {
            if let Some(&(l, r)) = extents.get(child) {
                span = (span.0.min(l), span.1.max(r));
            }
        }
        extents.insert(idx, span);
    }
    extents
}
