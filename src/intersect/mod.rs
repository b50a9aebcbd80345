//! Intersection handling between the two contours of a frame pair.
//!
//! 1. `find`: nudge exact coincidences apart, insert a paired vertex at
//!    every crossing (or one synthetic pair when there are none).
//! 2. `validate`: classify each pair and delete the crossings that keep
//!    the two rings from agreeing on intersection order.

pub mod find;
pub mod validate;

pub use find::{find_intersections, synthesize_intersection, FindOutcome};
pub use validate::{classify, pairing_is_consistent, validate, RepairOutcome, StateCounts};
