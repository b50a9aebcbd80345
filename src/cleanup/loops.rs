//! Cut self-intersection loops out of a contour.
//!
//! Converging migration paths can cross. Each crossing between two
//! non-adjacent edges splits the ring into two loops; the one enclosing
//! less area is replaced by the crossing point itself.

use kurbo::Point;

use crate::contour::{Contour, Vertex, VertexId};
use crate::geom::{self, SegmentHit};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopRepair {
    pub loops: usize,
    /// Nodes dropped, not counting inserted crossing nodes.
    pub removed: usize,
}

/// Remove loops until no two non-adjacent edges cross.
///
/// Every cut removes at least two nodes and inserts one, so this ends in
/// fewer rounds than the contour has nodes.
pub fn remove_loops(contour: &mut Contour) -> LoopRepair {
    let mut repair = LoopRepair::default();
    let rounds = contour.len();
    for _ in 0..rounds {
        let ids = contour.ids();
        let Some(crossing) = first_crossing(contour, &ids) else {
            break;
        };
        repair.removed += cut(contour, &ids, crossing);
        repair.loops += 1;
    }
    if repair.loops > 0 {
        log::debug!("cut {} loops ({} nodes)", repair.loops, repair.removed);
    }
    repair
}

#[derive(Debug, Clone, Copy)]
struct Crossing {
    i: usize,
    j: usize,
    t: f64,
    u: f64,
    point: Point,
}

/// First crossing of edges `i < j` in ring order, skipping neighbours.
fn first_crossing(contour: &Contour, ids: &[VertexId]) -> Option<Crossing> {
    let n = ids.len();
    if n < 4 {
        return None;
    }
    let edge = |k: usize| (contour.point(ids[k]), contour.point(ids[(k + 1) % n]));
    for i in 0..n {
        let (a0, a1) = edge(i);
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (b0, b1) = edge(j);
            if let SegmentHit::Hit { point, t, u } = geom::segment_intersection(a0, a1, b0, b1) {
                return Some(Crossing { i, j, t, u, point });
            }
        }
    }
    None
}

/// Replace the smaller loop at `c` with one node at the crossing.
/// Returns how many nodes were removed.
fn cut(contour: &mut Contour, ids: &[VertexId], c: Crossing) -> usize {
    let n = ids.len();
    // Inner loop: nodes i+1..=j. Outer loop: j+1.. wrapping to i.
    let inner: Vec<VertexId> = ids[c.i + 1..=c.j].to_vec();
    let outer: Vec<VertexId> = ids[c.j + 1..].iter().chain(&ids[..=c.i]).copied().collect();

    let area = |loop_ids: &[VertexId]| {
        let mut ring = vec![c.point];
        ring.extend(loop_ids.iter().map(|&id| contour.point(id)));
        geom::signed_area(&ring).abs()
    };

    let (doomed, after, to, t) = if area(&inner) <= area(&outer) {
        (inner, ids[c.i], ids[c.i + 1], c.t)
    } else {
        (outer, ids[c.j], ids[(c.j + 1) % n], c.u)
    };

    let mut node = Vertex::between(contour.vertex(after), contour.vertex(to), t);
    node.point = c.point;
    contour.insert_after(after, node);
    doomed.into_iter().filter(|&id| contour.remove(id)).count()
}
