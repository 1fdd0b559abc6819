pub mod check;
pub mod emitter;
pub mod id;
pub mod layout;
pub mod model;
pub mod notation;
pub mod parser;
pub mod resolve;

pub use check::check_structure;
pub use emitter::{canonicalize, emit_bracket, emit_subtree};
pub use id::{EMPTY_MARKER, Label, NodeId};
pub use layout::{LayoutConfig, apply_layout, resolve_layout, union_bounds};
pub use model::*;
pub use notation::{DiagramEntry, emit_diagram_list, parse_diagram_list};
pub use parser::{ParseError, ParseErrorKind, parse_bracket};
pub use resolve::{DropTarget, ResolverConfig, apply_drop, find_parent, resolve_drop};

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;
