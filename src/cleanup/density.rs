//! Even out node spacing along the output contour.

use crate::contour::{Contour, Vertex};

/// Ratio between the target spacing and either edge-length bound.
const DENSITY_FACTOR: f64 = 1.6;

/// Accepted edge lengths for a given node spacing.
pub fn density_bounds(spacing: f64) -> (f64, f64) {
    (spacing / DENSITY_FACTOR, spacing * DENSITY_FACTOR)
}

/// Bring every edge into [`density_bounds`]: first drop nodes closing
/// short edges, then split long edges into `round(len / spacing)` parts.
///
/// Split parts land between 0.83 and 1.25 times the spacing, so a second
/// call finds nothing to do. Returns `(merged, split)` node counts.
pub fn correct_density(contour: &mut Contour, spacing: f64) -> (usize, usize) {
    let (min, max) = density_bounds(spacing);
    let merged = super::remove_short_edges(contour, min);

    let mut split = 0;
    for id in contour.ids() {
        let len = contour.edge_length(id);
        if len <= max {
            continue;
        }
        let parts = (len / spacing).round().max(2.0) as usize;
        let to = contour.next(id);
        // Insert back to front so each new node lands right after `id`.
        for k in (1..parts).rev() {
            let t = k as f64 / parts as f64;
            let node = Vertex::between(contour.vertex(id), contour.vertex(to), t);
            contour.insert_after(id, node);
            split += 1;
        }
    }
    (merged, split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    fn edge_lengths(contour: &Contour) -> Vec<f64> {
        contour.iter().map(|id| contour.edge_length(id)).collect()
    }

    #[test]
    fn splits_long_edges_evenly() {
        let mut contour = Contour::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 4.0),
            Point::new(0.0, 4.0),
        ])
        .unwrap();
        let (merged, split) = correct_density(&mut contour, 4.0);
        assert_eq!(merged, 0);
        assert_eq!(split, 8);
        assert_eq!(contour.len(), 12);
        for len in edge_lengths(&contour) {
            assert!((len - 4.0).abs() < 1e-9, "edge {len}");
        }
        // Inserted in order along the edge.
        for (k, p) in contour.points().iter().take(6).enumerate() {
            assert!((p.x - 4.0 * k as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn interpolates_migration_results() {
        let mut contour = Contour::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(8.0, 0.0),
            Point::new(8.0, 3.0),
            Point::new(0.0, 3.0),
        ])
        .unwrap();
        let head = contour.head();
        let second = contour.next(head);
        contour.vertex_mut(head).distance = 1.0;
        contour.vertex_mut(head).landing = 0.9;
        contour.vertex_mut(second).distance = 3.0;
        contour.vertex_mut(second).landing = 0.1;

        correct_density(&mut contour, 4.0);
        let mid = contour.vertex(contour.next(head));
        assert!(mid.interpolated);
        assert!((mid.distance - 2.0).abs() < 1e-12);
        assert!(mid.landing < 1e-9 || mid.landing > 1.0 - 1e-9, "wraps through zero");
    }

    #[test]
    fn correction_is_idempotent() {
        let mut contour = crate::contour::circle(Point::ZERO, 20.0, 7, 0.3);
        let first = correct_density(&mut contour, 4.0);
        assert!(first.1 > 0);
        let (min, max) = density_bounds(4.0);
        for len in edge_lengths(&contour) {
            assert!(len >= min && len <= max);
        }
        let snapshot = contour.points();
        assert_eq!(correct_density(&mut contour, 4.0), (0, 0));
        assert_eq!(contour.points(), snapshot);
    }
}
