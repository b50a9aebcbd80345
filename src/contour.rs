//! Closed contours as index-linked vertex rings.
//!
//! Vertices live in an arena (`Vec<Vertex>`) and link to each other by
//! index, so inserting and removing a vertex are O(1) link rewrites and
//! ids handed out earlier stay valid for the whole mapping call. Removed
//! vertices are tombstoned rather than compacted.

use std::collections::BTreeMap;

use kurbo::{Point, Vec2};

use crate::error::MigrationError;
use crate::geom;

/// Stable index of a vertex inside its contour's arena.
pub type VertexId = usize;

/// Id shared by the two vertices of an intersection pair.
pub type IntersectionId = usize;

/// Pairing quality of an intersection, assigned during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntersectionState {
    #[default]
    Unclassified,
    /// The next intersection agrees on both contours.
    Valid,
    /// The next intersection on A is the previous one on B.
    Inverted,
    /// Neither of the above.
    Loose,
}

/// Per-node data carried through mapping but never interpreted by it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMeta {
    pub track_id: Option<usize>,
    pub fluorescence: Vec<f64>,
}

/// One boundary point.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub point: Point,
    pub normal: Vec2,
    pub tangent: Vec2,
    /// Set on synthetic vertices inserted at contour crossings.
    pub intersection: Option<IntersectionId>,
    pub state: IntersectionState,
    /// Whether the node reached its target during migration.
    pub snapped: bool,
    /// Signed, physically scaled migration distance.
    pub distance: f64,
    /// Landing position on the target contour as a fraction of its
    /// perimeter measured from the head.
    pub landing: f64,
    /// Inserted by cleanup rather than produced by migration.
    pub interpolated: bool,
    pub meta: NodeMeta,
    next: VertexId,
    prev: VertexId,
    is_head: bool,
    alive: bool,
}

impl Vertex {
    pub fn new(point: Point) -> Self {
        Vertex {
            point,
            normal: Vec2::ZERO,
            tangent: Vec2::ZERO,
            intersection: None,
            state: IntersectionState::Unclassified,
            snapped: false,
            distance: 0.0,
            landing: 0.0,
            interpolated: false,
            meta: NodeMeta::default(),
            next: 0,
            prev: 0,
            is_head: false,
            alive: true,
        }
    }

    /// A synthetic crossing vertex tagged with `id`.
    pub fn crossing(point: Point, id: IntersectionId) -> Self {
        Vertex {
            intersection: Some(id),
            ..Vertex::new(point)
        }
    }

    /// A vertex at parameter `t` between `from` and `to`, inheriting
    /// `from`'s metadata and interpolating its migration results.
    pub fn between(from: &Vertex, to: &Vertex, t: f64) -> Self {
        Vertex {
            distance: from.distance + (to.distance - from.distance) * t,
            landing: geom::lerp_coordinate(from.landing, to.landing, t),
            interpolated: true,
            meta: from.meta.clone(),
            ..Vertex::new(from.point.lerp(to.point, t))
        }
    }

    /// A node that reached its target during migration.
    pub fn migrated(point: Point, distance: f64, landing: f64, meta: NodeMeta) -> Self {
        Vertex {
            snapped: true,
            distance,
            landing,
            meta,
            ..Vertex::new(point)
        }
    }

    pub fn is_head(&self) -> bool {
        self.is_head
    }

    pub fn is_intersection(&self) -> bool {
        self.intersection.is_some()
    }
}

/// A closed polygon stored as a circular doubly-linked ring.
///
/// Invariant: exactly one live vertex is the head, and `len` steps along
/// `next` from any live vertex return to it.
#[derive(Debug, Clone)]
pub struct Contour {
    vertices: Vec<Vertex>,
    head: VertexId,
    len: usize,
}

impl Contour {
    /// Build a ring from points in order. The first point becomes the head.
    pub fn from_points(points: &[Point]) -> Result<Self, MigrationError> {
        Self::from_vertices(points.iter().map(|&p| Vertex::new(p)).collect())
    }

    /// Build a ring from fully populated vertices, relinking them in order.
    pub fn from_vertices(mut vertices: Vec<Vertex>) -> Result<Self, MigrationError> {
        let n = vertices.len();
        if n == 0 {
            return Err(MigrationError::EmptyContour);
        }
        for (i, v) in vertices.iter_mut().enumerate() {
            v.next = (i + 1) % n;
            v.prev = (i + n - 1) % n;
            v.is_head = i == 0;
            v.alive = true;
        }
        Ok(Contour {
            vertices,
            head: 0,
            len: n,
        })
    }

    pub fn head(&self) -> VertexId {
        self.head
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id]
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> &mut Vertex {
        &mut self.vertices[id]
    }

    pub fn point(&self, id: VertexId) -> Point {
        self.vertices[id].point
    }

    pub fn next(&self, id: VertexId) -> VertexId {
        self.vertices[id].next
    }

    pub fn prev(&self, id: VertexId) -> VertexId {
        self.vertices[id].prev
    }

    /// Walk the whole ring once, starting at the head.
    pub fn iter(&self) -> Walk<'_> {
        self.iter_from(self.head)
    }

    /// Walk the whole ring once, starting at `start`.
    pub fn iter_from(&self, start: VertexId) -> Walk<'_> {
        Walk {
            contour: self,
            current: start,
            remaining: self.len,
        }
    }

    /// Vertex ids in ring order from the head.
    pub fn ids(&self) -> Vec<VertexId> {
        self.iter().collect()
    }

    pub fn points(&self) -> Vec<Point> {
        self.iter().map(|id| self.point(id)).collect()
    }

    /// Link `vertex` in directly after `after` and return its id.
    pub fn insert_after(&mut self, after: VertexId, mut vertex: Vertex) -> VertexId {
        let id = self.vertices.len();
        let next = self.vertices[after].next;
        vertex.prev = after;
        vertex.next = next;
        vertex.is_head = false;
        vertex.alive = true;
        self.vertices.push(vertex);
        self.vertices[after].next = id;
        self.vertices[next].prev = id;
        self.len += 1;
        id
    }

    /// Unlink a vertex. The head passes to its successor.
    ///
    /// Refuses to remove the last remaining vertex or a dead one.
    pub fn remove(&mut self, id: VertexId) -> bool {
        if self.len <= 1 || !self.vertices[id].alive {
            return false;
        }
        let (prev, next) = (self.vertices[id].prev, self.vertices[id].next);
        self.vertices[prev].next = next;
        self.vertices[next].prev = prev;
        if id == self.head {
            self.set_head(next);
        }
        let v = &mut self.vertices[id];
        v.alive = false;
        v.is_head = false;
        self.len -= 1;
        true
    }

    pub fn set_head(&mut self, id: VertexId) {
        self.vertices[self.head].is_head = false;
        self.vertices[id].is_head = true;
        self.head = id;
    }

    /// Check the ring invariant: one head, consistent links, closure
    /// after exactly `len` steps.
    pub fn is_consistent(&self) -> bool {
        let heads = self.vertices.iter().filter(|v| v.alive && v.is_head).count();
        if heads != 1 || !self.vertices[self.head].is_head {
            return false;
        }
        let mut id = self.head;
        for step in 0..self.len {
            let v = &self.vertices[id];
            if !v.alive || self.vertices[v.next].prev != id {
                return false;
            }
            id = v.next;
            if id == self.head && step + 1 != self.len {
                return false;
            }
        }
        id == self.head
    }

    /// Length of the edge from `id` to its successor.
    pub fn edge_length(&self, id: VertexId) -> f64 {
        self.point(id).distance(self.point(self.next(id)))
    }

    pub fn perimeter(&self) -> f64 {
        self.iter().map(|id| self.edge_length(id)).sum()
    }

    /// Positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        geom::signed_area(&self.points())
    }

    /// Reverse traversal direction in place. The head is kept.
    pub fn reverse(&mut self) {
        for v in self.vertices.iter_mut().filter(|v| v.alive) {
            std::mem::swap(&mut v.next, &mut v.prev);
        }
    }

    /// Reverse the ring if it winds clockwise. Returns whether it did.
    pub fn make_counter_clockwise(&mut self) -> bool {
        if self.signed_area() < 0.0 {
            self.reverse();
            true
        } else {
            false
        }
    }

    /// Recompute unit tangents and outward normals from neighbours.
    pub fn update_normals(&mut self) {
        let orientation = if self.signed_area() < 0.0 { -1.0 } else { 1.0 };
        for id in self.ids() {
            let tangent = self.point(self.next(id)) - self.point(self.prev(id));
            let len = tangent.hypot();
            let v = &mut self.vertices[id];
            v.tangent = if len > 0.0 { tangent / len } else { Vec2::ZERO };
            v.normal = geom::outward_normal(tangent) * orientation;
        }
    }

    /// Arc length from the head to every live vertex, indexed by id.
    pub fn arc_positions(&self) -> Vec<f64> {
        let mut positions = vec![0.0; self.vertices.len()];
        let mut acc = 0.0;
        for id in self.iter() {
            positions[id] = acc;
            acc += self.edge_length(id);
        }
        positions
    }

    /// Arc length walking forward from `from` to `to`.
    /// A full lap when `from == to`.
    pub fn path_length(&self, from: VertexId, to: VertexId) -> f64 {
        let mut length = 0.0;
        let mut id = from;
        for _ in 0..self.len {
            length += self.edge_length(id);
            id = self.next(id);
            if id == to {
                break;
            }
        }
        length
    }

    /// Intersection vertices keyed by their shared id.
    pub fn intersection_index(&self) -> BTreeMap<IntersectionId, VertexId> {
        self.iter()
            .filter_map(|id| self.vertices[id].intersection.map(|key| (key, id)))
            .collect()
    }

    pub fn intersection_count(&self) -> usize {
        self.iter().filter(|&id| self.vertices[id].is_intersection()).count()
    }

    /// First intersection strictly after `id`, wrapping around to `id`
    /// itself when it is the only one.
    pub fn next_intersection(&self, id: VertexId) -> Option<VertexId> {
        self.iter_from(self.next(id))
            .find(|&v| self.vertices[v].is_intersection())
    }

    /// First intersection strictly before `id`, wrapping like
    /// [`Contour::next_intersection`].
    pub fn prev_intersection(&self, id: VertexId) -> Option<VertexId> {
        let mut v = self.prev(id);
        for _ in 0..self.len {
            if self.vertices[v].is_intersection() {
                return Some(v);
            }
            v = self.prev(v);
        }
        None
    }

    /// Unlink every intersection vertex. Returns how many were removed.
    pub fn clear_intersections(&mut self) -> usize {
        let crossings: Vec<VertexId> = self
            .iter()
            .filter(|&id| self.vertices[id].is_intersection())
            .collect();
        crossings.into_iter().filter(|&id| self.remove(id)).count()
    }

    /// A new contour with vertices spaced `spacing` apart along this one.
    /// Migration results and metadata are not carried over.
    pub fn resample(&self, spacing: f64) -> Result<Contour, MigrationError> {
        Contour::from_points(&geom::resample_polyline(&self.points(), true, spacing))
    }
}

/// Iterator over one lap of a ring.
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    contour: &'a Contour,
    current: VertexId,
    remaining: usize,
}

impl Iterator for Walk<'_> {
    type Item = VertexId;

    fn next(&mut self) -> Option<VertexId> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.current;
        self.current = self.contour.next(id);
        self.remaining -= 1;
        Some(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Regular polygon approximating a circle, counter-clockwise.
#[cfg(test)]
pub(crate) fn circle(center: Point, radius: f64, n: usize, phase: f64) -> Contour {
    let points: Vec<Point> = (0..n)
        .map(|i| {
            let a = phase + i as f64 * std::f64::consts::TAU / n as f64;
            Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect();
    Contour::from_points(&points).unwrap()
}
