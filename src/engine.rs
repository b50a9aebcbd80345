//! One frame pair, end to end.

use std::time::Instant;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cleanup::{self, CleanupSummary};
use crate::config::MigrationConfig;
use crate::contour::{Contour, NodeMeta, Vertex, VertexId};
use crate::diagnostics::{DiagnosticsSink, Layer, NoopSink};
use crate::error::MigrationError;
use crate::field::FieldIntegrator;
use crate::intersect;
use crate::sector::{build_sectors, Sector};

/// Counts gathered while mapping one frame pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappingReport {
    /// Genuine crossings between the inputs.
    pub raw_intersections: usize,
    /// Intersection pairs left after validation.
    pub intersections: usize,
    /// A fake intersection pair stood in for missing crossings.
    pub synthesized: bool,
    /// Vertices perturbed to break degenerate contacts.
    pub nudged: usize,
    /// The pairing needed rebuilding.
    pub repaired: bool,
    pub removed_intersections: usize,
    pub sectors: usize,
    /// Nodes handed to the integrator.
    pub candidates: usize,
    /// Nodes that reached their target, before cleanup.
    pub migrated: usize,
    /// Nodes that ran out of iterations and were dropped.
    pub unsnapped: usize,
    /// Integration steps over all nodes.
    pub iterations: usize,
    pub cleanup: CleanupSummary,
}

/// The mapped contour plus what happened on the way.
#[derive(Debug, Clone)]
pub struct MappingResult {
    pub contour: Contour,
    pub report: MappingReport,
}

/// Maps contour pairs under one fixed configuration.
#[derive(Debug)]
pub struct MappingEngine<S: DiagnosticsSink = NoopSink> {
    config: MigrationConfig,
    integrator: FieldIntegrator,
    sink: S,
}

impl MappingEngine<NoopSink> {
    pub fn new(config: MigrationConfig) -> Result<Self, MigrationError> {
        Self::with_sink(config, NoopSink)
    }
}

impl<S: DiagnosticsSink> MappingEngine<S> {
    /// Engine reporting to `sink`. Fails if the configuration is invalid.
    pub fn with_sink(config: MigrationConfig, sink: S) -> Result<Self, MigrationError> {
        config.validate()?;
        Ok(MappingEngine {
            integrator: FieldIntegrator::new(&config),
            config,
            sink,
        })
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Map the nodes of `a` (frame t) onto `b` (frame t+1).
    ///
    /// Both inputs are modified in place: they are oriented
    /// counter-clockwise, `b` may be resampled, and degenerate contacts may
    /// be nudged. Intersection vertices inserted along the way are removed
    /// again before returning.
    pub fn map_pair(&mut self, a: &mut Contour, b: &mut Contour) -> Result<MappingResult, MigrationError> {
        let t_start = Instant::now();
        let config = &self.config;
        for contour in [&*a, &*b] {
            if contour.len() < 3 {
                return Err(MigrationError::TooFewVertices(contour.len()));
            }
        }

        // ── Prepare ───────────────────────────────────────
        a.clear_intersections();
        b.clear_intersections();
        a.make_counter_clockwise();
        b.make_counter_clockwise();
        if config.resample_target {
            *b = b.resample(config.marker_spacing)?;
        }
        a.update_normals();
        b.update_normals();
        self.sink.draw_outline(Layer::Source, &a.points(), true);
        self.sink.draw_outline(Layer::Target, &b.points(), true);
        info!(
            "  Load        A {} nodes ({:.1} px) \u{00b7} B {} nodes ({:.1} px)",
            a.len(),
            a.perimeter(),
            b.len(),
            b.perimeter(),
        );

        // ── Intersections ─────────────────────────────────
        let mut report = MappingReport::default();
        if config.force_no_sectors {
            intersect::synthesize_intersection(a, b);
            report.synthesized = true;
        } else {
            let mut rng = StdRng::seed_from_u64(config.seed);
            let found = intersect::find_intersections(a, b, config.nudge_amplitude, &mut rng);
            report.raw_intersections = found.raw;
            report.synthesized = found.synthesized;
            report.nudged = found.nudged;
        }
        let repair = intersect::validate(a, b);
        report.repaired = repair.repaired;
        report.removed_intersections = repair.removed;
        report.intersections = repair.remaining;
        a.update_normals();
        b.update_normals();
        for id in a.intersection_index().into_values() {
            self.sink.draw_marker(Layer::Intersection, a.point(id));
        }
        info!(
            "  Intersect   {} raw \u{2192} {} paired{}{}",
            report.raw_intersections,
            report.intersections,
            if report.synthesized { " (synthesized)" } else { "" },
            if report.repaired {
                format!(" \u{00b7} {} removed in rebuild", report.removed_intersections)
            } else {
                String::new()
            },
        );

        // ── Sectors & migration ───────────────────────────
        let sectors = build_sectors(a, b, config);
        report.sectors = sectors.len();
        let migrated = self.migrate(a, b, &sectors, &mut report);
        a.clear_intersections();
        b.clear_intersections();
        let mut contour = migrated?;
        info!(
            "  Migrate     {} sectors \u{00b7} {}/{} nodes snapped \u{00b7} {} steps",
            report.sectors, report.migrated, report.candidates, report.iterations,
        );
        if report.unsnapped > 0 {
            warn!("{} nodes did not reach their target", report.unsnapped);
        }

        // ── Post-processing ───────────────────────────────
        report.cleanup = cleanup::process(&mut contour, &self.config);
        contour.update_normals();
        self.sink.draw_outline(Layer::Output, &contour.points(), true);
        if let Some(&first) = contour.points().first() {
            self.sink.annotate(
                first,
                &format!(
                    "{} sectors, {}/{} snapped, {} nodes",
                    report.sectors,
                    report.migrated,
                    report.candidates,
                    contour.len()
                ),
            );
        }
        let c = report.cleanup;
        info!(
            "  Clean       {} degenerate \u{00b7} {} loops \u{00b7} -{} +{} density \u{2192} {} nodes  ({}ms)",
            c.degenerate,
            c.loops,
            c.merged,
            c.split,
            contour.len(),
            t_start.elapsed().as_millis(),
        );

        Ok(MappingResult { contour, report })
    }

    /// Migrate every interior node of every sector and assemble the
    /// snapped results, in sector order, into a new contour.
    ///
    /// Expects normals and a validated pairing on both inputs.
    pub fn migrate(
        &mut self,
        a: &Contour,
        b: &Contour,
        sectors: &[Sector],
        report: &mut MappingReport,
    ) -> Result<Contour, MigrationError> {
        let config = &self.config;
        let mut nodes = Vec::new();

        for sector in sectors {
            self.sink.draw_outline(Layer::Charge, &sector.migrating.points, sector.migrating.closed);
            self.sink.draw_outline(Layer::Charge, &sector.target.points, sector.target.closed);

            let forward = sector.mode.is_forward();
            let (source, target) = if forward { (a, b) } else { (b, a) };
            debug!(
                "sector {}: {:?}, arcs {:.2} / {:.2}, {} nodes",
                sector.id,
                sector.mode,
                sector.length_a,
                sector.length_b,
                sector.migrating_nodes().len(),
            );

            for &id in sector.migrating_nodes() {
                report.candidates += 1;
                let start = source.point(id);
                let landing = self.integrator.migrate(start, sector);
                report.iterations += landing.iterations;

                if !landing.snapped {
                    report.unsnapped += 1;
                    debug!("node at ({:.2}, {:.2}) did not snap", start.x, start.y);
                    self.sink.draw_marker(Layer::Failure, start);
                    continue;
                }
                if !(landing.coordinate.is_finite() && (0.0..=1.0).contains(&landing.coordinate)) {
                    return Err(MigrationError::CoordinateTracking(format!(
                        "node at ({:.3}, {:.3}) landed at coordinate {}",
                        start.x, start.y, landing.coordinate
                    )));
                }

                let mut distance = -(landing.travelled * config.pixel_scale);
                if sector.mode.is_expanding() {
                    distance = -distance;
                }
                let point = if forward || config.sampling_mode {
                    landing.point
                } else {
                    start
                };
                // Identity always comes from frame t.
                let meta = if forward {
                    source.vertex(id).meta.clone()
                } else {
                    landing
                        .edge_from
                        .map(|from| identity(target, from))
                        .unwrap_or_default()
                };

                self.sink.draw_outline(Layer::Path, &[start, landing.point], false);
                nodes.push(Vertex::migrated(point, distance, landing.coordinate, meta));
            }
        }

        report.migrated = nodes.len();
        match nodes.len() {
            0 => Err(MigrationError::EmptyContour),
            n if n < 3 => Err(MigrationError::TooFewVertices(n)),
            _ => Contour::from_vertices(nodes),
        }
    }
}

/// Metadata of `id`, or of the closest real node before it when `id` is
/// an inserted intersection.
fn identity(contour: &Contour, id: VertexId) -> NodeMeta {
    let mut v = id;
    for _ in 0..contour.len() {
        if !contour.vertex(v).is_intersection() {
            return contour.vertex(v).meta.clone();
        }
        v = contour.prev(v);
    }
    NodeMeta::default()
}
