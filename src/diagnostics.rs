//! Optional visual output of a mapping run.
//!
//! The engine reports what it does to a [`DiagnosticsSink`]. The default
//! sink ignores everything; [`crate::render::RasterSink`] draws it.

use kurbo::Point;

/// What a drawn item represents. Sinks pick colours per layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Contour A of the pair.
    Source,
    /// Contour B of the pair.
    Target,
    Intersection,
    Charge,
    /// Migration path of one node, start to landing.
    Path,
    Output,
    /// Nodes that never reached their target.
    Failure,
}

pub trait DiagnosticsSink {
    fn draw_outline(&mut self, _layer: Layer, _points: &[Point], _closed: bool) {}

    fn draw_marker(&mut self, _layer: Layer, _at: Point) {}

    fn annotate(&mut self, _at: Point, _text: &str) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticsSink for NoopSink {}

impl<S: DiagnosticsSink + ?Sized> DiagnosticsSink for &mut S {
    fn draw_outline(&mut self, layer: Layer, points: &[Point], closed: bool) {
        (**self).draw_outline(layer, points, closed);
    }

    fn draw_marker(&mut self, layer: Layer, at: Point) {
        (**self).draw_marker(layer, at);
    }

    fn annotate(&mut self, at: Point, text: &str) {
        (**self).annotate(at, text);
    }
}
