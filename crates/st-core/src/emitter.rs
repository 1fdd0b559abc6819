//! Emitter: SyntaxTree → bracket notation.
//!
//! Produces the canonical form: single spaces between siblings, no
//! trailing whitespace. The output round-trips through the parser.

use crate::model::SyntaxTree;
use crate::parser::{ParseError, parse_bracket};
use petgraph::graph::NodeIndex;

/// Emit the main tree as bracket notation. Detached subtrees are not part
/// of the notation; an empty main tree emits an empty string.
#[must_use]
pub fn emit_bracket(tree: &SyntaxTree) -> String {
    match tree.root {
        Some(root) => emit_subtree(tree, root),
        None => String::new(),
    }
}

/// Emit the subtree rooted at `idx`.
#[must_use]
pub fn emit_subtree(tree: &SyntaxTree, idx: NodeIndex) -> String {
    let mut out = String::with_capacity(64);
    emit_node(&mut out, tree, idx);
    out
}

/// Parse and re-emit, normalising whitespace.
pub fn canonicalize(input: &str) -> Result<String, ParseError> {
    parse_bracket(input).map(|tree| emit_bracket(&tree))
}

enum Step {
    Node(NodeIndex),
    Space,
    Close,
}

fn emit_node(out: &mut String, tree: &SyntaxTree, idx: NodeIndex) {
    let mut stack = vec![Step::Node(idx)];
    while let Some(step) = stack.pop() {
        let idx = match step {
            Step::Node(idx) => idx,
            Step::Space => {
                out.push(' ');
                continue;
            }
            Step::Close => {
                out.push(']');
                continue;
            }
        };
        let Some(node) = tree.graph.node_weight(idx) else {
            continue;
        };

        if node.is_terminal() {
            out.push_str(node.label.as_str());
            continue;
        }

        out.push('[');
        out.push_str(node.label.as_str());
        stack.push(Step::Close);
        for &child in tree.children(idx).iter().rev() {
            stack.push(Step::Node(child));
            stack.push(Step::Space);
        }
    }
}
