//! Raster rendering of a mapping run for visual inspection.
//!
//! [`RasterSink`] records what the engine reports and draws it with
//! tiny-skia, fitted to the bounds of everything recorded.

use std::path::Path;

use kurbo::{BezPath, PathEl, Point, Rect};

use crate::diagnostics::{DiagnosticsSink, Layer};
use crate::error::MigrationError;

const MARKER_RADIUS: f32 = 3.0;

#[derive(Debug, Clone)]
enum Item {
    Outline(Layer, BezPath),
    Marker(Layer, Point),
}

/// Diagnostics sink that keeps everything and renders it to PNG.
#[derive(Debug, Clone)]
pub struct RasterSink {
    width: u32,
    height: u32,
    padding: u32,
    items: Vec<Item>,
    labels: Vec<(Point, String)>,
}

impl Default for RasterSink {
    fn default() -> Self {
        Self::new(800, 800)
    }
}

impl RasterSink {
    pub fn new(width: u32, height: u32) -> Self {
        RasterSink {
            width,
            height,
            padding: 20,
            items: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Text annotations in the order received.
    pub fn labels(&self) -> &[(Point, String)] {
        &self.labels
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.items.clear();
        self.labels.clear();
    }

    /// Draw all recorded items on a white background.
    pub fn render(&self) -> Result<tiny_skia::Pixmap, MigrationError> {
        let mut pixmap = tiny_skia::Pixmap::new(self.width, self.height)
            .ok_or_else(|| MigrationError::InvalidConfig(format!(
                "cannot render a {}x{} image",
                self.width, self.height
            )))?;
        pixmap.fill(tiny_skia::Color::WHITE);
        let transform = self.fit();

        for item in &self.items {
            let mut paint = tiny_skia::Paint::default();
            paint.anti_alias = true;
            match item {
                Item::Outline(layer, path) => {
                    paint.set_color(colour(*layer));
                    let stroke = tiny_skia::Stroke {
                        width: stroke_width(*layer),
                        ..tiny_skia::Stroke::default()
                    };
                    if let Some(sk_path) = outline_path(path, transform) {
                        pixmap.stroke_path(&sk_path, &paint, &stroke, tiny_skia::Transform::identity(), None);
                    }
                }
                Item::Marker(layer, at) => {
                    paint.set_color(colour(*layer));
                    let (x, y) = transform_point(at.x, at.y, transform);
                    if let Some(dot) = tiny_skia::PathBuilder::from_circle(x, y, MARKER_RADIUS) {
                        pixmap.fill_path(
                            &dot,
                            &paint,
                            tiny_skia::FillRule::Winding,
                            tiny_skia::Transform::identity(),
                            None,
                        );
                    }
                }
            }
        }
        Ok(pixmap)
    }

    /// Render and write a PNG file.
    pub fn save_png(&self, path: &Path) -> Result<(), MigrationError> {
        let png_data = encode_png(&self.render()?)?;
        std::fs::write(path, png_data)?;
        log::info!("  Render      {} items \u{2192} {}", self.items.len(), path.display());
        Ok(())
    }

    /// Uniform scale and offset mapping the recorded bounds into the
    /// padded image.
    fn fit(&self) -> tiny_skia::Transform {
        let mut points = self.items.iter().flat_map(|item| match item {
            Item::Outline(_, path) => path.elements().iter().filter_map(PathEl::end_point).collect::<Vec<_>>(),
            Item::Marker(_, p) => vec![*p],
        });
        let Some(first) = points.next() else {
            return tiny_skia::Transform::identity();
        };
        let bounds = points.fold(Rect::from_points(first, first), |r, p| r.union_pt(p));

        let content_w = self.width.saturating_sub(self.padding * 2).max(1) as f64;
        let content_h = self.height.saturating_sub(self.padding * 2).max(1) as f64;
        let s = (content_w / bounds.width().max(1e-9)).min(content_h / bounds.height().max(1e-9));
        let tx = self.padding as f64 + (content_w - bounds.width() * s) / 2.0 - bounds.x0 * s;
        let ty = self.padding as f64 + (content_h - bounds.height() * s) / 2.0 - bounds.y0 * s;
        tiny_skia::Transform {
            sx: s as f32,
            kx: 0.0,
            ky: 0.0,
            sy: s as f32,
            tx: tx as f32,
            ty: ty as f32,
        }
    }
}

impl DiagnosticsSink for RasterSink {
    fn draw_outline(&mut self, layer: Layer, points: &[Point], closed: bool) {
        let Some((&first, rest)) = points.split_first() else {
            return;
        };
        let mut path = BezPath::new();
        path.move_to(first);
        for &p in rest {
            path.line_to(p);
        }
        if closed {
            path.close_path();
        }
        self.items.push(Item::Outline(layer, path));
    }

    fn draw_marker(&mut self, layer: Layer, at: Point) {
        self.items.push(Item::Marker(layer, at));
    }

    fn annotate(&mut self, at: Point, text: &str) {
        log::debug!("annotation at ({:.1}, {:.1}): {}", at.x, at.y, text);
        self.labels.push((at, text.to_string()));
    }
}

fn colour(layer: Layer) -> tiny_skia::Color {
    match layer {
        Layer::Source => tiny_skia::Color::from_rgba8(40, 90, 220, 255),
        Layer::Target => tiny_skia::Color::from_rgba8(30, 160, 80, 255),
        Layer::Intersection => tiny_skia::Color::BLACK,
        Layer::Charge => tiny_skia::Color::from_rgba8(160, 160, 160, 140),
        Layer::Path => tiny_skia::Color::from_rgba8(240, 150, 30, 180),
        Layer::Output => tiny_skia::Color::from_rgba8(220, 30, 30, 255),
        Layer::Failure => tiny_skia::Color::from_rgba8(200, 0, 200, 255),
    }
}

fn stroke_width(layer: Layer) -> f32 {
    match layer {
        Layer::Output => 2.0,
        Layer::Charge | Layer::Path => 0.75,
        _ => 1.25,
    }
}

/// Polyline outline to a device-space `tiny_skia::Path`.
fn outline_path(outline: &BezPath, transform: tiny_skia::Transform) -> Option<tiny_skia::Path> {
    let mut pb = tiny_skia::PathBuilder::new();
    for el in outline.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                let (x, y) = transform_point(p.x, p.y, transform);
                pb.move_to(x, y);
            }
            PathEl::LineTo(p) => {
                let (x, y) = transform_point(p.x, p.y, transform);
                pb.line_to(x, y);
            }
            PathEl::ClosePath => pb.close(),
            // Outlines are built from straight segments only.
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
        }
    }
    pb.finish()
}

/// Scale and offset a contour point into pixel space.
fn transform_point(x: f64, y: f64, t: tiny_skia::Transform) -> (f32, f32) {
    let (x, y) = (x as f32, y as f32);
    (t.sx * x + t.tx, t.sy * y + t.ty)
}

/// Encode a pixmap to PNG bytes.
fn encode_png(pixmap: &tiny_skia::Pixmap) -> Result<Vec<u8>, MigrationError> {
    let mut buf = Vec::new();
    let mut encoder = png::Encoder::new(&mut buf, pixmap.width(), pixmap.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().map_err(std::io::Error::other)?;
    writer.write_image_data(pixmap.data()).map_err(std::io::Error::other)?;
    drop(writer);
    Ok(buf)
}
