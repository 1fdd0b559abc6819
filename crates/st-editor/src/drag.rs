//! Drag lifecycle for a single tile.
//!
//! `Idle → Dragging → Committing → Idle`. Samples taken while dragging
//! only move the preview; the tree is edited once, during the commit.

use crate::session::SessionError;
use serde::{Deserialize, Serialize};
use st_core::id::NodeId;
use st_core::model::Position;

/// What was recorded when a drag started, plus the latest preview sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragGesture {
    pub node: NodeId,
    /// Tile centre when the drag began.
    pub origin: Position,
    pub original_parent: Option<NodeId>,
    pub original_index: Option<usize>,
    /// Where the tile is being shown. Not structural state.
    pub preview: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragGesture),
    /// The resolver is applying the drop for `node`.
    Committing { node: NodeId },
}

impl DragState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DragState::Idle)
    }

    /// Node currently held, if any.
    pub fn active_node(&self) -> Option<NodeId> {
        match self {
            DragState::Idle => None,
            DragState::Dragging(g) => Some(g.node),
            DragState::Committing { node } => Some(*node),
        }
    }

    pub fn preview(&self) -> Option<Position> {
        match self {
            DragState::Dragging(g) => Some(g.preview),
            _ => None,
        }
    }

    pub(crate) fn begin(&mut self, gesture: DragGesture) -> Result<(), SessionError> {
        if let Some(held) = self.active_node() {
            return Err(SessionError::AlreadyDragging(held));
        }
        *self = DragState::Dragging(gesture);
        Ok(())
    }

    pub(crate) fn sample(&mut self, node: NodeId, at: Position) -> Result<(), SessionError> {
        match self {
            DragState::Dragging(g) if g.node == node => {
                g.preview = at;
                Ok(())
            }
            _ => Err(SessionError::NotDragging(node)),
        }
    }

    /// Move to `Committing` and hand back the gesture to resolve.
    pub(crate) fn commit(&mut self, node: NodeId) -> Result<DragGesture, SessionError> {
        match *self {
            DragState::Dragging(g) if g.node == node => {
                *self = DragState::Committing { node };
                Ok(g)
            }
            _ => Err(SessionError::NotDragging(node)),
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = DragState::Idle;
    }
}

/// Structural result of a committed drag or palette drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragOutcome {
    /// Now child number `index` of `parent`. `reparented` is false for a
    /// reorder (or nudge) under the same parent.
    Attached {
        parent: NodeId,
        index: usize,
        reparented: bool,
    },
    /// Left the tree and became a detached root.
    Detached,
    /// Moved without structural change.
    Relocated,
    /// Released where it started.
    Unchanged,
}
