//! Post-processing of a freshly migrated contour.
//!
//! Migration leaves nodes wherever they landed: bunched up where many
//! paths converge, sparse where they fan out, occasionally crossing.
//! Three in-place passes turn that into a usable contour:
//! degenerate edges → self-intersection loops → node density.
//! Every pass is idempotent and none reduces a contour below three nodes.

mod degenerate;
mod density;
mod loops;

pub use degenerate::remove_short_edges;
pub use density::{correct_density, density_bounds};
pub use loops::{remove_loops, LoopRepair};

use crate::config::MigrationConfig;
use crate::contour::Contour;

/// What the passes changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    /// Nodes closing an edge shorter than `min_edge_length`.
    pub degenerate: usize,
    /// Self-intersection loops cut off.
    pub loops: usize,
    /// Nodes dropped with those loops.
    pub loop_nodes: usize,
    /// Nodes dropped by density correction.
    pub merged: usize,
    /// Nodes inserted by density correction.
    pub split: usize,
}

/// Apply all post-processing passes.
///
/// Density correction is skipped with `disable_density_correction` and in
/// sampling mode, where node positions are measurements rather than a
/// contour to be evened out.
pub fn process(contour: &mut Contour, config: &MigrationConfig) -> CleanupSummary {
    let mut summary = CleanupSummary {
        degenerate: remove_short_edges(contour, config.min_edge_length),
        ..CleanupSummary::default()
    };

    let repair = remove_loops(contour);
    summary.loops = repair.loops;
    summary.loop_nodes = repair.removed;

    if !(config.disable_density_correction || config.sampling_mode) {
        let (merged, split) = correct_density(contour, config.marker_spacing);
        summary.merged = merged;
        summary.split = split;
    }
    summary
}
