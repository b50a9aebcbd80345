//! Matched arc pairs between consecutive intersections.
//!
//! A sector is the stretch of contour A and the stretch of contour B
//! between the same two intersections. Nodes on one of the arcs (the
//! migrating arc) are pushed across to the other (the target arc) by a
//! field built from charges laid along both arcs:
//!
//! - migrating charges repel, target charges attract;
//! - both sets sit a small offset `w` behind their arc, on the side away
//!   from the gap between the arcs, so a node starting on its own arc is
//!   never on top of a singular charge.

use kurbo::Point;

use crate::config::MigrationConfig;
use crate::contour::{Contour, IntersectionId, VertexId};
use crate::geom;

/// Mapping direction and polarity of a sector, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorMode {
    /// A migrates onto B, B lies outside A.
    ForwardExpanding,
    /// A migrates onto B, B lies inside A.
    ForwardContracting,
    /// B migrates onto A, B lies outside A.
    BackwardExpanding,
    /// B migrates onto A, B lies inside A.
    BackwardContracting,
}

impl SectorMode {
    pub fn new(forward: bool, expanding: bool) -> Self {
        match (forward, expanding) {
            (true, true) => SectorMode::ForwardExpanding,
            (true, false) => SectorMode::ForwardContracting,
            (false, true) => SectorMode::BackwardExpanding,
            (false, false) => SectorMode::BackwardContracting,
        }
    }

    pub fn is_forward(self) -> bool {
        matches!(self, SectorMode::ForwardExpanding | SectorMode::ForwardContracting)
    }

    pub fn is_expanding(self) -> bool {
        matches!(self, SectorMode::ForwardExpanding | SectorMode::BackwardExpanding)
    }

    /// Sign applied to the outward normal when offsetting migrating charges.
    /// Target charges use the opposite sign.
    pub fn outer_normal(self) -> f64 {
        match self {
            SectorMode::ForwardExpanding | SectorMode::BackwardContracting => -1.0,
            SectorMode::ForwardContracting | SectorMode::BackwardExpanding => 1.0,
        }
    }
}

/// Charge positions along one arc.
#[derive(Debug, Clone)]
pub struct ChargeSet {
    pub points: Vec<Point>,
    /// Closed sets (whole-polygon sectors) also link last to first.
    pub closed: bool,
}

impl ChargeSet {
    /// Consecutive charge pairs, used as line charges.
    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        let count = match (self.closed, n) {
            (_, 0 | 1) => 0,
            (true, _) => n,
            (false, _) => n - 1,
        };
        (0..count).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }
}

/// One edge of the target arc, with where it starts on its contour.
#[derive(Debug, Clone, Copy)]
pub struct TargetEdge {
    pub from: VertexId,
    pub a: Point,
    pub b: Point,
    /// Arc length from the target contour's head to `a`.
    pub arc_start: f64,
}

/// Closest point of the target arc to some query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub point: Point,
    pub distance: f64,
    /// Normalized arc position on the target contour, in [0, 1).
    pub coordinate: f64,
    /// Start vertex of the target edge the point lies on.
    pub edge_from: VertexId,
}

/// Region used to tell whether a point is still between the two arcs.
#[derive(Debug, Clone)]
enum Region {
    /// Migrating charges followed by the target charges reversed.
    Band(Vec<Point>),
    /// Whole-polygon sector: between the inner and outer charge rings.
    Annulus { inner: Vec<Point>, outer: Vec<Point> },
}

/// The four boundary vertices of a sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorBounds {
    pub start_a: VertexId,
    pub end_a: VertexId,
    pub start_b: VertexId,
    pub end_b: VertexId,
}

#[derive(Debug, Clone)]
pub struct Sector {
    pub id: IntersectionId,
    pub bounds: SectorBounds,
    pub length_a: f64,
    pub length_b: f64,
    pub mode: SectorMode,
    /// Single sector spanning both whole contours.
    pub whole: bool,
    pub migrating: ChargeSet,
    pub target: ChargeSet,
    migrating_nodes: Vec<VertexId>,
    target_edges: Vec<TargetEdge>,
    target_perimeter: f64,
    region: Region,
}

impl Sector {
    /// Build the sector starting at intersection `id`.
    pub fn construct(
        id: IntersectionId,
        bounds: SectorBounds,
        whole: bool,
        a: &Contour,
        b: &Contour,
        config: &MigrationConfig,
    ) -> Sector {
        let arc_a = arc(a, bounds.start_a, bounds.end_a);
        let arc_b = arc(b, bounds.start_b, bounds.end_b);
        let length_a = arc_length(a, &arc_a, whole);
        let length_b = arc_length(b, &arc_b, whole);

        let forward = if config.force_backward {
            false
        } else {
            length_a > length_b || config.force_forward
        };
        let expanding = if whole {
            b.signed_area().abs() > a.signed_area().abs()
        } else {
            let start = a.point(bounds.start_a);
            let along_a = a.point(a.next(bounds.start_a));
            let along_b = b.point(b.next(bounds.start_b));
            // B heading off to the right of A leaves a CCW ring: outside.
            geom::triangle_sign(start, along_a, along_b) < 0.0
        };
        let mode = SectorMode::new(forward, expanding);

        let (migrating_contour, migrating_arc, target_contour, target_arc) = if forward {
            (a, &arc_a, b, &arc_b)
        } else {
            (b, &arc_b, a, &arc_a)
        };
        let sign = mode.outer_normal();
        let migrating = charges(migrating_contour, migrating_arc, whole, sign, config);
        let target = charges(target_contour, target_arc, whole, -sign, config);

        let migrating_nodes = interior(migrating_contour, migrating_arc, whole);
        let target_edges = edges(target_contour, target_arc, whole);
        let region = if whole {
            if geom::signed_area(&migrating.points).abs() < geom::signed_area(&target.points).abs() {
                Region::Annulus {
                    inner: migrating.points.clone(),
                    outer: target.points.clone(),
                }
            } else {
                Region::Annulus {
                    inner: target.points.clone(),
                    outer: migrating.points.clone(),
                }
            }
        } else {
            let mut band = migrating.points.clone();
            band.extend(target.points.iter().rev());
            Region::Band(band)
        };

        Sector {
            id,
            bounds,
            length_a,
            length_b,
            mode,
            whole,
            migrating,
            target,
            migrating_nodes,
            target_edges,
            target_perimeter: target_contour.perimeter(),
            region,
        }
    }

    /// Nodes of the migrating arc to move, in ring order. Excludes the
    /// bounding intersections.
    pub fn migrating_nodes(&self) -> &[VertexId] {
        &self.migrating_nodes
    }

    pub fn target_edges(&self) -> &[TargetEdge] {
        &self.target_edges
    }

    /// Closest point on the target arc (global minimum over its edges).
    pub fn nearest_target(&self, p: Point) -> Option<Projection> {
        let mut best: Option<Projection> = None;
        for edge in &self.target_edges {
            let (q, t) = geom::project_to_segment(p, edge.a, edge.b);
            let distance = p.distance(q);
            if best.is_some_and(|b| b.distance <= distance) {
                continue;
            }
            let along = edge.arc_start + t * edge.a.distance(edge.b);
            let coordinate = if self.target_perimeter > 0.0 {
                (along / self.target_perimeter).rem_euclid(1.0)
            } else {
                0.0
            };
            best = Some(Projection {
                point: q,
                distance,
                coordinate,
                edge_from: edge.from,
            });
        }
        best
    }

    /// Whether `p` is between the two charge arcs.
    pub fn contains(&self, p: Point) -> bool {
        match &self.region {
            Region::Band(band) => geom::point_in_polygon(p, band),
            Region::Annulus { inner, outer } => {
                geom::point_in_polygon(p, outer) && !geom::point_in_polygon(p, inner)
            }
        }
    }
}

/// Build one sector per intersection, in id order.
///
/// Expects a validated pairing. A lone intersection yields the
/// whole-polygon sector.
pub fn build_sectors(a: &Contour, b: &Contour, config: &MigrationConfig) -> Vec<Sector> {
    let on_a = a.intersection_index();
    let on_b = b.intersection_index();
    let ids: Vec<IntersectionId> = on_a.keys().copied().filter(|id| on_b.contains_key(id)).collect();
    let whole = ids.len() == 1;

    ids.iter()
        .enumerate()
        .map(|(k, &id)| {
            let end = ids[(k + 1) % ids.len()];
            let bounds = SectorBounds {
                start_a: on_a[&id],
                end_a: on_a[&end],
                start_b: on_b[&id],
                end_b: on_b[&end],
            };
            Sector::construct(id, bounds, whole, a, b, config)
        })
        .collect()
}

/// Vertices from `start` to `end` inclusive. When they coincide the
/// whole ring is returned once, starting at `start`.
fn arc(contour: &Contour, start: VertexId, end: VertexId) -> Vec<VertexId> {
    if start == end {
        return contour.iter_from(start).collect();
    }
    let mut ids = vec![start];
    let mut id = start;
    for _ in 0..contour.len() {
        id = contour.next(id);
        ids.push(id);
        if id == end {
            break;
        }
    }
    ids
}

fn arc_points(contour: &Contour, ids: &[VertexId]) -> Vec<Point> {
    ids.iter().map(|&id| contour.point(id)).collect()
}

fn arc_length(contour: &Contour, ids: &[VertexId], closed: bool) -> f64 {
    geom::polyline_length(&arc_points(contour, ids), closed)
}

/// Charges along an arc, offset by `sign * w` along the outward normal.
fn charges(
    contour: &Contour,
    ids: &[VertexId],
    closed: bool,
    sign: f64,
    config: &MigrationConfig,
) -> ChargeSet {
    let offset = sign * config.charge_offset;
    let points = match config.charge_density {
        Some(spacing) => {
            let resampled = geom::resample_polyline(&arc_points(contour, ids), closed, spacing);
            let normals = geom::polyline_normals(&resampled, closed);
            resampled
                .iter()
                .zip(normals)
                .map(|(&p, n)| p + n * offset)
                .collect()
        }
        None => ids
            .iter()
            .map(|&id| {
                let v = contour.vertex(id);
                v.point + v.normal * offset
            })
            .collect(),
    };
    ChargeSet { points, closed }
}

fn interior(contour: &Contour, ids: &[VertexId], whole: bool) -> Vec<VertexId> {
    let inner = if whole {
        &ids[1..]
    } else {
        &ids[1..ids.len().saturating_sub(1).max(1)]
    };
    inner
        .iter()
        .copied()
        .filter(|&id| !contour.vertex(id).is_intersection())
        .collect()
}

fn edges(contour: &Contour, ids: &[VertexId], closed: bool) -> Vec<TargetEdge> {
    let positions = contour.arc_positions();
    let n = ids.len();
    let count = if closed { n } else { n.saturating_sub(1) };
    (0..count)
        .map(|i| {
            let from = ids[i];
            let to = ids[(i + 1) % n];
            TargetEdge {
                from,
                a: contour.point(from),
                b: contour.point(to),
                arc_start: positions[from],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::circle;
    use crate::intersect;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn prepared(mut a: Contour, mut b: Contour) -> (Contour, Contour) {
        a.make_counter_clockwise();
        b.make_counter_clockwise();
        a.update_normals();
        b.update_normals();
        let mut rng = StdRng::seed_from_u64(0);
        intersect::find_intersections(&mut a, &mut b, 0.5, &mut rng);
        intersect::validate(&mut a, &mut b);
        a.update_normals();
        b.update_normals();
        (a, b)
    }

    #[test]
    fn mode_table() {
        assert_eq!(SectorMode::new(true, true).outer_normal(), -1.0);
        assert_eq!(SectorMode::new(false, true).outer_normal(), 1.0);
        assert!(!SectorMode::BackwardContracting.is_expanding());
        assert!(SectorMode::ForwardContracting.is_forward());
    }

    #[test]
    fn charges_are_offset_by_mode_polarity() {
        // B is longer, so B migrates back onto a growing A: the migrating
        // charges sit on B's outer side, the target charges on A's inner.
        let (a, b) = prepared(
            circle(Point::ZERO, 10.0, 32, 0.0),
            circle(Point::ZERO, 12.0, 32, 0.0),
        );
        let config = MigrationConfig {
            charge_offset: 0.5,
            ..MigrationConfig::default()
        };
        let sectors = build_sectors(&a, &b, &config);
        let s = &sectors[0];
        assert_eq!(s.mode, SectorMode::BackwardExpanding);
        assert_eq!(s.mode.outer_normal(), 1.0);
        let radius = |p: &Point| p.to_vec2().hypot();
        assert!(s.migrating.points.iter().all(|p| radius(p) > 12.0));
        assert!(s.target.points.iter().all(|p| radius(p) < 10.0));
    }

    #[test]
    fn concentric_circles_form_one_expanding_sector() {
        let (a, b) = prepared(
            circle(Point::ZERO, 1.0, 8, 0.0),
            circle(Point::ZERO, 1.5, 8, 0.0),
        );
        let sectors = build_sectors(&a, &b, &MigrationConfig::default());
        assert_eq!(sectors.len(), 1);
        let s = &sectors[0];
        assert!(s.whole);
        assert!(s.mode.is_expanding());
        // A is shorter, so B's nodes migrate back onto A.
        assert!(!s.mode.is_forward());
        assert_eq!(s.migrating_nodes().len(), 8);
        assert!(s.migrating.closed && s.target.closed);

        // The ring between the circles is inside, the centre is not.
        assert!(s.contains(Point::new(1.25, 0.1)));
        assert!(!s.contains(Point::new(0.0, 0.0)));
        assert!(!s.contains(Point::new(3.0, 0.0)));
    }

    #[test]
    fn overlapping_circles_split_into_two_sectors() {
        let (a, b) = prepared(
            circle(Point::ZERO, 1.0, 32, 0.0),
            circle(Point::new(0.9, 0.05), 1.0, 32, 0.05),
        );
        let sectors = build_sectors(&a, &b, &MigrationConfig::default());
        assert_eq!(sectors.len(), 2);
        let expanding = sectors.iter().filter(|s| s.mode.is_expanding()).count();
        assert_eq!(expanding, 1, "one arc of B lies outside A, the other inside");
        for s in &sectors {
            assert!(!s.whole);
            // Migrating from the longer arc.
            assert_eq!(s.mode.is_forward(), s.length_a > s.length_b);
        }
    }

    #[test]
    fn forced_direction_flags() {
        let (a, b) = prepared(
            circle(Point::ZERO, 1.0, 8, 0.0),
            circle(Point::ZERO, 1.5, 8, 0.0),
        );
        let forward = MigrationConfig {
            force_forward: true,
            ..MigrationConfig::default()
        };
        assert!(build_sectors(&a, &b, &forward)[0].mode.is_forward());

        let both = MigrationConfig {
            force_forward: true,
            force_backward: true,
            ..MigrationConfig::default()
        };
        assert!(!build_sectors(&a, &b, &both)[0].mode.is_forward());
    }

    #[test]
    fn projection_reports_arc_coordinate() {
        let (a, b) = prepared(
            circle(Point::ZERO, 1.0, 8, 0.0),
            circle(Point::ZERO, 1.5, 8, 0.0),
        );
        let sector = &build_sectors(&a, &b, &MigrationConfig::default())[0];
        let hit = sector.nearest_target(Point::new(1.2, 0.0)).unwrap();
        assert!((hit.distance - 0.2).abs() < 1e-9);
        assert!((0.0..1.0).contains(&hit.coordinate));
    }

    #[test]
    fn resampled_charges_follow_density() {
        let (a, b) = prepared(
            circle(Point::ZERO, 10.0, 16, 0.0),
            circle(Point::ZERO, 12.0, 16, 0.0),
        );
        let config = MigrationConfig {
            charge_density: Some(1.0),
            ..MigrationConfig::default()
        };
        let sector = &build_sectors(&a, &b, &config)[0];
        assert!(sector.migrating.points.len() > 60);
        assert!(sector.target.points.len() > 50);
    }
}
