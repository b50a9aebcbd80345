//! Collapse edges too short to carry direction.

use crate::contour::Contour;

/// Drop the end node of every edge shorter than `min_len`.
///
/// Rescans after each removal since the merged edge may still be short.
/// Returns the number of nodes removed.
pub fn remove_short_edges(contour: &mut Contour, min_len: f64) -> usize {
    let mut removed = 0;
    let mut id = contour.head();
    let mut clean_run = 0;
    while clean_run < contour.len() && contour.len() > 3 {
        if contour.edge_length(id) < min_len {
            let end = contour.next(id);
            if contour.remove(end) {
                removed += 1;
                clean_run = 0;
                continue;
            }
        }
        id = contour.next(id);
        clean_run += 1;
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn collapses_stacked_nodes() {
        let mut contour = Contour::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
        ])
        .unwrap();
        assert_eq!(remove_short_edges(&mut contour, 0.01), 2);
        assert_eq!(contour.len(), 3);
        assert!(contour.is_consistent());
        assert_eq!(remove_short_edges(&mut contour, 0.01), 0);
    }

    #[test]
    fn never_goes_below_a_triangle() {
        let mut contour = Contour::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(0.001, 0.0),
            Point::new(0.0, 0.001),
            Point::new(0.001, 0.001),
        ])
        .unwrap();
        remove_short_edges(&mut contour, 1.0);
        assert_eq!(contour.len(), 3);
    }
}
