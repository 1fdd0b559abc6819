//! Tree layout solver.
//!
//! Converts a syntax forest into absolute `ResolvedBounds` for every tile:
//!
//! - strict leveling: a node sits exactly one `level_gap` below its parent,
//!   whatever the depth of its own subtree;
//! - a parent is centred over its first and last child;
//! - sibling subtrees are packed left to right in `children` order, each in
//!   a slot as wide as its full extent, so no two tiles ever overlap;
//! - whole trees never overlap either: a tree that would land on one placed
//!   earlier slides right until it clears it.
//!
//! The solver is pure: the same tree, config and overrides always produce
//! the same coordinates. Node positions stored on the tree are never read.

use crate::model::{Position, ResolvedBounds, SyntaxTree};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tile metrics and spacing used by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Left edge of the main tree.
    pub origin_x: f32,
    /// Centre line of the root row.
    pub origin_y: f32,
    /// Vertical distance between consecutive levels.
    pub level_gap: f32,
    /// Horizontal gap between sibling subtrees.
    pub sibling_gap: f32,
    /// Horizontal gap between separate trees on the canvas.
    pub tree_gap: f32,
    /// Estimated width of one label character.
    pub char_width: f32,
    /// Horizontal padding inside a tile.
    pub node_padding: f32,
    pub min_node_width: f32,
    pub node_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: 40.0,
            origin_y: 40.0,
            level_gap: 80.0,
            sibling_gap: 24.0,
            tree_gap: 80.0,
            char_width: 9.0,
            node_padding: 16.0,
            min_node_width: 36.0,
            node_height: 28.0,
        }
    }
}

impl LayoutConfig {
    /// Estimated tile width for a label.
    pub fn node_width(&self, label: &str) -> f32 {
        let chars = label.chars().count() as f32;
        (chars * self.char_width + self.node_padding).max(self.min_node_width)
    }
}

/// Per-subtree measurements in a local frame whose extent is `[0, width]`.
#[derive(Debug, Clone, Copy, Default)]
struct Measure {
    width: f32,
    /// Node centre within its own frame.
    center: f32,
    /// Frame origin relative to the parent's frame origin.
    offset: f32,
}

/// Resolve tile bounds for every node of every tree.
///
/// `overrides` pins the centre of a top-level root (a dragged tree or a
/// detached subtree left where it was dropped). Entries for non-root nodes
/// are ignored. Pinned trees are placed first; trees without an override
/// are then laid out left to right from the origin, the main tree first.
/// Any tree whose tiles would cover a tree already placed slides right
/// until it clears it, so pins are honoured only where they leave room.
pub fn resolve_layout(
    tree: &SyntaxTree,
    config: &LayoutConfig,
    overrides: &HashMap<NodeIndex, Position>,
) -> HashMap<NodeIndex, ResolvedBounds> {
    let mut measures: HashMap<NodeIndex, Measure> = HashMap::with_capacity(tree.node_count());
    let mut bounds: HashMap<NodeIndex, ResolvedBounds> = HashMap::with_capacity(tree.node_count());
    let mut occupied: Vec<ResolvedBounds> = Vec::new();

    let roots = tree.roots();
    for &root in &roots {
        measure(tree, root, config, &mut measures);
    }

    for &root in &roots {
        if let Some(pinned) = overrides.get(&root) {
            let left = pinned.x - measures[&root].center;
            settle(tree, root, left, pinned.y, config, &measures, &mut occupied, &mut bounds);
        }
    }

    let mut cursor = config.origin_x;
    for &root in roots.iter().filter(|&r| !overrides.contains_key(r)) {
        let left = settle(
            tree,
            root,
            cursor,
            config.origin_y,
            config,
            &measures,
            &mut occupied,
            &mut bounds,
        );
        cursor = left + measures[&root].width + config.tree_gap;
    }

    bounds
}

/// Place the tree under `root` with its frame starting at `left`, then
/// slide it right past every `occupied` area it touches. Returns the final
/// frame left.
#[allow(clippy::too_many_arguments)]
fn settle(
    tree: &SyntaxTree,
    root: NodeIndex,
    left: f32,
    y: f32,
    config: &LayoutConfig,
    measures: &HashMap<NodeIndex, Measure>,
    occupied: &mut Vec<ResolvedBounds>,
    bounds: &mut HashMap<NodeIndex, ResolvedBounds>,
) -> f32 {
    let mut local = HashMap::new();
    place(tree, root, left, y, config, measures, &mut local);
    let Some(mut area) = union_bounds(&local, local.keys().copied()) else {
        return left;
    };

    let mut dx = 0.0;
    while let Some(&hit) = occupied.iter().find(|b| b.intersects(&area)) {
        let step = hit.x + hit.width + config.tree_gap - area.x;
        area.x += step;
        dx += step;
    }
    for b in local.values_mut() {
        b.x += dx;
    }

    bounds.extend(local);
    occupied.push(area);
    left + dx
}

/// Measure every subtree under `root`, children before parents.
fn measure(
    tree: &SyntaxTree,
    root: NodeIndex,
    config: &LayoutConfig,
    measures: &mut HashMap<NodeIndex, Measure>,
) {
    for idx in tree.descendants(root).into_iter().rev() {
        let own = config.node_width(tree.graph[idx].label.as_str());
        let children = tree.children(idx);

        if children.is_empty() {
            measures.insert(
                idx,
                Measure {
                    width: own,
                    center: own / 2.0,
                    offset: 0.0,
                },
            );
            continue;
        }

        let mut cursor = 0.0f32;
        for child in children {
            if let Some(m) = measures.get_mut(child) {
                m.offset = cursor;
                cursor += m.width + config.sibling_gap;
            }
        }
        let block = cursor - config.sibling_gap;

        let first = measures[&children[0]];
        let last = measures[&children[children.len() - 1]];
        let mut mid = (first.offset + first.center + last.offset + last.center) / 2.0;

        // Keep the parent tile inside the frame: shift the child block right
        // when the tile would stick out on the left.
        let shift = (own / 2.0 - mid).max(0.0);
        if shift > 0.0 {
            for child in children {
                if let Some(m) = measures.get_mut(child) {
                    m.offset += shift;
                }
            }
            mid += shift;
        }

        measures.insert(
            idx,
            Measure {
                width: (block + shift).max(mid + own / 2.0),
                center: mid,
                offset: 0.0,
            },
        );
    }
}

/// Turn measures into absolute tile bounds, parents before children.
fn place(
    tree: &SyntaxTree,
    root: NodeIndex,
    frame_left: f32,
    y: f32,
    config: &LayoutConfig,
    measures: &HashMap<NodeIndex, Measure>,
    bounds: &mut HashMap<NodeIndex, ResolvedBounds>,
) {
    let mut stack = vec![(root, frame_left, y)];
    while let Some((idx, frame_left, y)) = stack.pop() {
        let m = measures[&idx];
        let width = config.node_width(tree.graph[idx].label.as_str());
        let center = Position::new(frame_left + m.center, y);
        bounds.insert(
            idx,
            ResolvedBounds::centered(center, width, config.node_height),
        );

        for &child in tree.children(idx) {
            let offset = measures[&child].offset;
            stack.push((child, frame_left + offset, y + config.level_gap));
        }
    }
}

/// Write resolved tile centres back onto the nodes.
pub fn apply_layout(tree: &mut SyntaxTree, bounds: &HashMap<NodeIndex, ResolvedBounds>) {
    for (&idx, b) in bounds {
        if let Ok(node) = tree.get_mut(idx) {
            node.position = b.center();
        }
    }
}

/// Smallest box covering the tiles of `nodes`, `None` if none have bounds.
pub fn union_bounds(
    bounds: &HashMap<NodeIndex, ResolvedBounds>,
    nodes: impl IntoIterator<Item = NodeIndex>,
) -> Option<ResolvedBounds> {
    let mut acc: Option<(f32, f32, f32, f32)> = None;
    for idx in nodes {
        let Some(b) = bounds.get(&idx) else {
            continue;
        };
        let (x0, y0, x1, y1) = (b.x, b.y, b.x + b.width, b.y + b.height);
        acc = Some(match acc {
            None => (x0, y0, x1, y1),
            Some((ax0, ay0, ax1, ay1)) => (ax0.min(x0), ay0.min(y0), ax1.max(x1), ay1.max(y1)),
        });
    }
    acc.map(|(x0, y0, x1, y1)| ResolvedBounds {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}
