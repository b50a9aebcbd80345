use crate::error::MigrationError;

/// All migration parameters in one struct.
///
/// The engine takes an owned copy at construction and never mutates it,
/// so one value can drive any number of frame pairs.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    // -- Node density --
    /// Target spacing between output nodes, in pixels.
    /// Density correction keeps every edge within [spacing/1.6, spacing*1.6].
    pub marker_spacing: f64,
    /// Spacing of charges along the sector arcs. None = one charge per node.
    pub charge_density: Option<f64>,
    /// Edges shorter than this are collapsed during cleanup.
    pub min_edge_length: f64,

    // -- Field --
    /// Which force law the charges follow.
    pub charge_model: ChargeModel,
    /// Coulomb-style constant k.
    pub coulomb: f64,
    /// Charge carried by each migrating charge (repulsive).
    pub migrating_charge: f64,
    /// Charge carried by each target charge (attractive).
    pub target_charge: f64,
    /// Distance exponent for migrating point charges.
    pub migrating_power: f64,
    /// Distance exponent for target point charges.
    pub target_power: f64,
    /// Field-to-velocity scale.
    pub mobility: f64,
    /// Velocity magnitude cap.
    pub max_force: f64,
    /// Offset of charges from their arc along the normal (w).
    pub charge_offset: f64,

    // -- Integration --
    /// Euler step (h).
    pub step: f64,
    /// Iteration budget per node. Nodes still moving afterwards are dropped.
    pub max_iterations: usize,
    /// A node stops once it is this close to the target arc (d).
    pub stop_distance: f64,

    // -- Mapping overrides --
    /// Skip intersection detection and map the contours as one sector.
    pub force_no_sectors: bool,
    /// Always migrate contour A onto B.
    pub force_forward: bool,
    /// Always migrate contour B onto A. Wins over `force_forward`.
    pub force_backward: bool,
    /// Leave output node spacing as produced by migration.
    pub disable_density_correction: bool,
    /// Resample contour B to `marker_spacing` before mapping.
    pub resample_target: bool,

    // -- Sampling mode --
    /// Stop nodes after a fixed travel distance instead of at the target.
    pub sampling_mode: bool,
    /// Travel distance used by sampling mode.
    pub sampling_distance: f64,

    // -- Misc --
    /// Physical size of one pixel; scales reported distances.
    pub pixel_scale: f64,
    /// Largest coordinate perturbation used to break exact coincidences.
    pub nudge_amplitude: f64,
    /// Seed for the nudge random source.
    pub seed: u64,
}

/// Force law used for sector charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeModel {
    /// Inverse-power point charges at each charge position.
    Point,
    /// Uniformly charged segments between consecutive charge positions.
    Line,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            marker_spacing: 4.0,
            charge_density: None,
            min_edge_length: 0.01,
            charge_model: ChargeModel::Point,
            coulomb: 8.987_551_787e9,
            migrating_charge: 0.5e-6,
            target_charge: 0.5e-6,
            migrating_power: 2.0,
            target_power: 2.0,
            mobility: 1.0,
            max_force: 0.1,
            charge_offset: 0.01,
            step: 0.3,
            max_iterations: 4000,
            stop_distance: 0.2,
            force_no_sectors: false,
            force_forward: false,
            force_backward: false,
            disable_density_correction: false,
            resample_target: false,
            sampling_mode: false,
            sampling_distance: 5.0,
            pixel_scale: 1.0,
            nudge_amplitude: 0.5,
            seed: 0,
        }
    }
}

impl MigrationConfig {
    /// Reject parameter combinations the engine cannot run with.
    pub fn validate(&self) -> Result<(), MigrationError> {
        let positive = [
            ("marker_spacing", self.marker_spacing),
            ("max_force", self.max_force),
            ("mobility", self.mobility),
            ("step", self.step),
            ("stop_distance", self.stop_distance),
            ("coulomb", self.coulomb),
            ("pixel_scale", self.pixel_scale),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(MigrationError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("charge_offset", self.charge_offset),
            ("migrating_charge", self.migrating_charge),
            ("target_charge", self.target_charge),
            ("migrating_power", self.migrating_power),
            ("target_power", self.target_power),
            ("min_edge_length", self.min_edge_length),
            ("nudge_amplitude", self.nudge_amplitude),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(MigrationError::InvalidConfig(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }

        if self.migrating_charge == 0.0 && self.target_charge == 0.0 {
            return Err(MigrationError::InvalidConfig(
                "migrating_charge and target_charge are both zero".into(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(MigrationError::InvalidConfig(
                "max_iterations must be at least 1".into(),
            ));
        }
        if let Some(density) = self.charge_density {
            if !(density.is_finite() && density > 0.0) {
                return Err(MigrationError::InvalidConfig(format!(
                    "charge_density must be positive, got {}",
                    density
                )));
            }
        }
        if self.sampling_mode && !(self.sampling_distance.is_finite() && self.sampling_distance > 0.0) {
            return Err(MigrationError::InvalidConfig(format!(
                "sampling_distance must be positive in sampling mode, got {}",
                self.sampling_distance
            )));
        }
        if self.min_edge_length >= self.marker_spacing / 1.6 {
            return Err(MigrationError::InvalidConfig(format!(
                "min_edge_length {} conflicts with marker_spacing {}",
                self.min_edge_length, self.marker_spacing
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(MigrationConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_parameters() {
        let bad_step = MigrationConfig {
            step: 0.0,
            ..MigrationConfig::default()
        };
        assert!(matches!(
            bad_step.validate(),
            Err(MigrationError::InvalidConfig(_))
        ));

        let bad_sampling = MigrationConfig {
            sampling_mode: true,
            sampling_distance: -1.0,
            ..MigrationConfig::default()
        };
        assert!(bad_sampling.validate().is_err());

        let bad_density = MigrationConfig {
            charge_density: Some(0.0),
            ..MigrationConfig::default()
        };
        assert!(bad_density.validate().is_err());

        let no_iterations = MigrationConfig {
            max_iterations: 0,
            ..MigrationConfig::default()
        };
        assert!(no_iterations.validate().is_err());
    }
}
