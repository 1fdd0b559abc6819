//! Editing session for syntax-tree diagrams: text ingest, the drag
//! lifecycle, relayout and status reporting on top of `st-core`.

pub mod config;
pub mod drag;
pub mod session;

pub use config::EngineConfig;
pub use drag::{DragGesture, DragOutcome, DragState};
pub use session::{EditorSession, SessionError, Status};
