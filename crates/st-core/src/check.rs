//! Structural invariant checks for syntax forests.
//!
//! Reports the first broken invariant without modifying the tree. Correct
//! use of the `SyntaxTree` API never trips these; the editor runs them after
//! every commit as a guard against programming errors.

use crate::model::{StructuralViolation, SyntaxTree};
use petgraph::Direction;
use std::collections::HashSet;

// ─── Public API ───────────────────────────────────────────────────────────

/// Run every rule over the forest.
pub fn check_structure(tree: &SyntaxTree) -> Result<(), StructuralViolation> {
    check_single_parent(tree)?;
    check_terminals(tree)?;
    check_child_order(tree)?;
    check_reachability(tree)?;
    Ok(())
}

// ─── Rules ────────────────────────────────────────────────────────────────

fn check_single_parent(tree: &SyntaxTree) -> Result<(), StructuralViolation> {
    for idx in tree.graph.node_indices() {
        let parents = tree
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .count();
        if parents > 1 {
            return Err(StructuralViolation::MultipleParents(tree.graph[idx].id));
        }
    }
    Ok(())
}

fn check_terminals(tree: &SyntaxTree) -> Result<(), StructuralViolation> {
    for idx in tree.graph.node_indices() {
        let node = &tree.graph[idx];
        if node.is_terminal() && !tree.children(idx).is_empty() {
            return Err(StructuralViolation::TerminalWithChildren(node.id));
        }
    }
    Ok(())
}

/// The explicit child order must list exactly the containment edges.
fn check_child_order(tree: &SyntaxTree) -> Result<(), StructuralViolation> {
    for idx in tree.graph.node_indices() {
        let mut edges: Vec<_> = tree
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        let mut listed = tree.children(idx).to_vec();
        edges.sort();
        listed.sort();
        if edges != listed {
            return Err(StructuralViolation::ChildOrderMismatch(tree.graph[idx].id));
        }
    }
    for parent in tree.raw_child_order().keys() {
        if !tree.contains(*parent) {
            return Err(StructuralViolation::MissingNode(*parent));
        }
    }
    for idx in tree.raw_id_index().values() {
        if !tree.contains(*idx) {
            return Err(StructuralViolation::MissingNode(*idx));
        }
    }
    Ok(())
}

/// Every node is reached exactly once walking down from the registered
/// roots. A cycle shows up as a node that is never reached (no root leads
/// into a closed loop) or as a revisit.
fn check_reachability(tree: &SyntaxTree) -> Result<(), StructuralViolation> {
    let mut seen = HashSet::new();
    for root in tree.roots() {
        let node = tree.get(root)?;
        if tree.parent(root).is_some() {
            return Err(StructuralViolation::MultipleParents(node.id));
        }
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            if !seen.insert(n) {
                return Err(StructuralViolation::Cycle {
                    child: tree.graph[n].id,
                    parent: tree.graph[n].id,
                });
            }
            stack.extend(tree.children(n).iter().copied());
        }
    }
    if let Some(stray) = tree.graph.node_indices().find(|idx| !seen.contains(idx)) {
        return Err(StructuralViolation::Unreachable(tree.graph[stray].id));
    }
    Ok(())
}
