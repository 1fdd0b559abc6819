//! Session-wide configuration.

use serde::{Deserialize, Serialize};
use st_core::layout::LayoutConfig;
use st_core::resolve::ResolverConfig;

/// Everything a host can tune about an editing session. Missing fields
/// fall back to their defaults when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub layout: LayoutConfig,
    pub resolver: ResolverConfig,
    /// Commits a detached subtree must survive before it can be pruned.
    pub grace_steps: u32,
    /// Pruning only removes detached subtrees whose root lies farther than
    /// this from the main tree's tiles.
    pub prune_distance: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            resolver: ResolverConfig::default(),
            grace_steps: 2,
            prune_distance: 240.0,
        }
    }
}
