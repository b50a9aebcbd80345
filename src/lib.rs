//! contour-migration: frame-to-frame correspondence of cell boundaries.
//!
//! Given the closed boundary of a cell in frame *t* (contour A) and in
//! frame *t+1* (contour B), every boundary node of A is carried across to
//! B by a synthetic electrostatic field, giving a one-to-one mapping with
//! a signed displacement per node.
//!
//! Pipeline per frame pair: intersections between A and B, pairing
//! repair, sectors between consecutive intersections, field migration of
//! each sector's nodes, post-processing of the assembled contour.
//!
//! # Example
//!
//! ```no_run
//! use contour_migration::{Contour, MappingEngine, MigrationConfig};
//! use contour_migration::kurbo::Point;
//!
//! let ring = |r: f64| -> Vec<Point> {
//!     (0..32)
//!         .map(|i| {
//!             let a = i as f64 * std::f64::consts::TAU / 32.0;
//!             Point::new(r * a.cos(), r * a.sin())
//!         })
//!         .collect()
//! };
//! let mut a = Contour::from_points(&ring(20.0))?;
//! let mut b = Contour::from_points(&ring(24.0))?;
//!
//! let mut engine = MappingEngine::new(MigrationConfig::default())?;
//! let result = engine.map_pair(&mut a, &mut b)?;
//! for id in result.contour.iter() {
//!     let node = result.contour.vertex(id);
//!     println!("{} {}", node.distance, node.landing);
//! }
//! # Ok::<(), contour_migration::MigrationError>(())
//! ```

#![forbid(unsafe_code)]

mod config;
mod geom;

pub mod cleanup;
pub mod contour;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod field;
pub mod intersect;
pub mod render;
pub mod sector;

// Re-export kurbo so callers build points with the same version.
pub use kurbo;

pub use config::{ChargeModel, MigrationConfig};
pub use contour::{Contour, IntersectionId, IntersectionState, NodeMeta, Vertex, VertexId};
pub use diagnostics::{DiagnosticsSink, Layer, NoopSink};
pub use engine::{MappingEngine, MappingReport, MappingResult};
pub use error::MigrationError;
pub use render::RasterSink;
pub use sector::{Sector, SectorMode};

/// Map a whole time-lapse sequence, one frame pair at a time.
///
/// The first frame is resampled to `marker_spacing` and its nodes get
/// track ids in ring order; each output then becomes contour A of the next
/// pair, so ids follow the boundary through the sequence. Frames are
/// borrowed mutably for the same reasons as [`MappingEngine::map_pair`].
pub fn track_sequence(
    frames: &mut [Contour],
    config: &MigrationConfig,
) -> Result<Vec<MappingResult>, MigrationError> {
    track_sequence_with(frames, &mut MappingEngine::new(config.clone())?)
}

/// [`track_sequence`] with a caller-supplied engine (and thus sink).
pub fn track_sequence_with<S: DiagnosticsSink>(
    frames: &mut [Contour],
    engine: &mut MappingEngine<S>,
) -> Result<Vec<MappingResult>, MigrationError> {
    let Some((first, rest)) = frames.split_first_mut() else {
        return Ok(Vec::new());
    };
    if first.len() < 3 {
        return Err(MigrationError::TooFewVertices(first.len()));
    }
    first.make_counter_clockwise();
    let mut current = first.resample(engine.config().marker_spacing)?;
    for (track, id) in current.ids().into_iter().enumerate() {
        current.vertex_mut(id).meta.track_id = Some(track);
    }

    let mut results: Vec<MappingResult> = Vec::with_capacity(rest.len());
    for (k, next) in rest.iter_mut().enumerate() {
        log::info!("  Frame       {} \u{2192} {}", k, k + 1);
        let result = engine.map_pair(&mut current, next)?;
        current = result.contour.clone();
        results.push(result);
    }
    Ok(results)
}
