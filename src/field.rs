//! Fixed-step integration of a node through a sector's synthetic field.

use kurbo::{Point, Vec2};

use crate::config::{ChargeModel, MigrationConfig};
use crate::contour::VertexId;
use crate::sector::Sector;

/// Distances below this are treated as sitting on a charge.
const EPS: f64 = 1e-12;

/// Where a migrating node ended up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landing {
    pub point: Point,
    /// The stop condition was met inside the iteration budget.
    pub snapped: bool,
    /// Path length walked, including the final snap.
    pub travelled: f64,
    /// Normalized arc position on the target contour. NaN when not snapped.
    pub coordinate: f64,
    /// Target edge the node landed on.
    pub edge_from: Option<VertexId>,
    pub iterations: usize,
}

/// Euler integrator over one sector's charge sets.
#[derive(Debug, Clone)]
pub struct FieldIntegrator {
    model: ChargeModel,
    coulomb: f64,
    migrating_charge: f64,
    target_charge: f64,
    migrating_power: f64,
    target_power: f64,
    mobility: f64,
    max_force: f64,
    step: f64,
    max_iterations: usize,
    stop_distance: f64,
    sampling: Option<f64>,
}

impl FieldIntegrator {
    pub fn new(config: &MigrationConfig) -> Self {
        FieldIntegrator {
            model: config.charge_model,
            coulomb: config.coulomb,
            migrating_charge: config.migrating_charge,
            target_charge: config.target_charge,
            migrating_power: config.migrating_power,
            target_power: config.target_power,
            mobility: config.mobility,
            max_force: config.max_force,
            step: config.step,
            max_iterations: config.max_iterations,
            stop_distance: config.stop_distance,
            sampling: config.sampling_mode.then_some(config.sampling_distance),
        }
    }

    /// Move `start` through the field of `sector` until it reaches the
    /// target arc or the iteration budget runs out.
    ///
    /// In sampling mode the node instead stops after walking the sampling
    /// distance and stays where it is; only its coordinate is projected.
    pub fn migrate(&self, start: Point, sector: &Sector) -> Landing {
        let mut p = start;
        let mut travelled = 0.0;

        for iterations in 0..=self.max_iterations {
            match self.sampling {
                Some(limit) => {
                    if travelled >= limit {
                        let nearest = sector.nearest_target(p);
                        return Landing {
                            point: p,
                            snapped: nearest.is_some(),
                            travelled,
                            coordinate: nearest.map_or(f64::NAN, |n| n.coordinate),
                            edge_from: nearest.map(|n| n.edge_from),
                            iterations,
                        };
                    }
                }
                None => {
                    if let Some(nearest) = sector.nearest_target(p) {
                        if nearest.distance <= self.stop_distance {
                            return Landing {
                                point: nearest.point,
                                snapped: true,
                                travelled: travelled + nearest.distance,
                                coordinate: nearest.coordinate,
                                edge_from: Some(nearest.edge_from),
                                iterations,
                            };
                        }
                    }
                }
            }
            if iterations == self.max_iterations {
                break;
            }
            let delta = self.velocity(p, sector) * self.step;
            p += delta;
            travelled += delta.hypot();
        }

        Landing {
            point: p,
            snapped: false,
            travelled,
            coordinate: f64::NAN,
            edge_from: None,
            iterations: self.max_iterations,
        }
    }

    /// `mobility * E`, capped at `max_force` in magnitude.
    pub fn velocity(&self, p: Point, sector: &Sector) -> Vec2 {
        let v = self.field_at(p, sector) * self.mobility;
        let speed = v.hypot();
        if speed > self.max_force {
            v * (self.max_force / speed)
        } else {
            v
        }
    }

    /// Field at `p`: migrating charges repel, target charges attract.
    pub fn field_at(&self, p: Point, sector: &Sector) -> Vec2 {
        let field = match self.model {
            ChargeModel::Point => {
                let push = sector
                    .migrating
                    .points
                    .iter()
                    .fold(Vec2::ZERO, |acc, &c| acc + point_field(p, c, self.migrating_power));
                let pull = sector
                    .target
                    .points
                    .iter()
                    .fold(Vec2::ZERO, |acc, &c| acc + point_field(p, c, self.target_power));
                push * self.migrating_charge - pull * self.target_charge
            }
            ChargeModel::Line => {
                let push = sector
                    .migrating
                    .segments()
                    .fold(Vec2::ZERO, |acc, (a, b)| acc + line_field(p, a, b));
                let pull = sector
                    .target
                    .segments()
                    .fold(Vec2::ZERO, |acc, (a, b)| acc + line_field(p, a, b));
                // Once past the target the migrating arc pulls the node back.
                let polarity = if sector.contains(p) { 1.0 } else { -1.0 };
                push * (polarity * self.migrating_charge) - pull * self.target_charge
            }
        };
        field * self.coulomb
    }
}

/// Unit-charge field `(p - c) / |p - c|^(power + 1)`.
fn point_field(p: Point, c: Point, power: f64) -> Vec2 {
    let r = p - c;
    let dist = r.hypot();
    if dist < EPS {
        return Vec2::ZERO;
    }
    r / dist.powf(power + 1.0)
}

/// Field of a segment `a..b` with unit charge per unit length.
fn line_field(p: Point, a: Point, b: Point) -> Vec2 {
    let ab = b - a;
    let len = ab.hypot();
    let r1 = (p - a).hypot();
    let r2 = (p - b).hypot();
    if len < EPS || r1 < EPS || r2 < EPS {
        return Vec2::ZERO;
    }
    let u = ab / len;
    let x = (p - a).dot(u);
    let perp = (p - a) - u * x;
    let d2 = perp.hypot2();

    let along = u * (1.0 / r2 - 1.0 / r1);
    if d2 < EPS {
        return along;
    }
    let (s1, s2) = (-x, len - x);
    along + perp * ((s2 / r2 - s1 / r1) / d2)
}
