//! Tunable force coefficients for both simulations.
//!
//! Every coefficient is an independently adjustable value with a documented
//! default; the logical-graph values are the ones a user can move live with
//! sliders, so they are re-read at the start of every pass.

use serde::{Deserialize, Serialize};

use crate::budget::LayoutBudget;
use crate::error::LayoutError;
use crate::Result;

/// Range of initial speeds assigned to a newly observed element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedRange {
    pub min: f64,
    pub max: f64,
}

impl SpeedRange {
    pub const STILL: SpeedRange = SpeedRange { min: 0.0, max: 0.0 };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_still(&self) -> bool {
        self.max <= 0.0
    }

    fn validate(&self, field: &'static str) -> Result<()> {
        ensure_non_negative(field, self.min)?;
        ensure_non_negative(field, self.max)?;
        if self.max < self.min {
            return Err(LayoutError::InvalidConfig {
                field,
                value: self.max,
                reason: "max must not be below min",
            });
        }
        Ok(())
    }
}

/// Configuration for the physical-graph simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalForceConfig {
    /// Multiplier applied to every force.
    pub global_force_multiplier: f64,
    /// Velocity retained after each iteration (0-1).
    pub velocity_decay: f64,
    /// Strength of the pull toward the origin.
    pub force_center_seeking: f64,
    /// Inverse-square repulsion between elements.
    pub coefficient_repulsion: f64,
    /// Scale of the wire attraction toward the other endpoint.
    pub coefficient_attraction: f64,
    /// Local inverse and remote control forces along control vectors.
    pub coefficient_control_force: f64,
    /// Perpendicular correction toward parallel control tangents.
    pub coefficient_rigidity: f64,
    /// Squared distances below this are treated as this value.
    pub min_effective_distance_squared: f64,
    /// Wire length at which attraction is calibrated.
    pub default_equilibrium_distance: f64,
    /// World units per simulation unit.
    pub world_scale: f64,
    pub host_speed: SpeedRange,
    pub device_speed: SpeedRange,
    pub budget: LayoutBudget,
    /// Seed for initial velocities; random when unset.
    pub seed: Option<u64>,
}

impl Default for PhysicalForceConfig {
    fn default() -> Self {
        Self {
            global_force_multiplier: 0.025,
            velocity_decay: 0.75,
            force_center_seeking: 0.25,
            coefficient_repulsion: 1.0,
            coefficient_attraction: 1.0,
            coefficient_control_force: 0.1,
            coefficient_rigidity: 0.05,
            min_effective_distance_squared: 0.25,
            default_equilibrium_distance: 1.0,
            world_scale: 50.0,
            host_speed: SpeedRange::new(0.05, 0.15),
            device_speed: SpeedRange::new(0.5, 1.5),
            budget: LayoutBudget::default(),
            seed: None,
        }
    }
}

impl PhysicalForceConfig {
    /// Check every value is usable by the solver.
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("global_force_multiplier", self.global_force_multiplier)?;
        ensure_unit_interval("velocity_decay", self.velocity_decay)?;
        ensure_non_negative("force_center_seeking", self.force_center_seeking)?;
        ensure_non_negative("coefficient_repulsion", self.coefficient_repulsion)?;
        ensure_non_negative("coefficient_attraction", self.coefficient_attraction)?;
        ensure_non_negative("coefficient_control_force", self.coefficient_control_force)?;
        ensure_non_negative("coefficient_rigidity", self.coefficient_rigidity)?;
        ensure_positive(
            "min_effective_distance_squared",
            self.min_effective_distance_squared,
        )?;
        ensure_positive(
            "default_equilibrium_distance",
            self.default_equilibrium_distance,
        )?;
        ensure_positive("world_scale", self.world_scale)?;
        self.host_speed.validate("host_speed")?;
        self.device_speed.validate("device_speed")?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Configuration for the logical-graph simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogicalForceConfig {
    /// Multiplier applied to every force.
    pub force_multiplier: f64,
    /// Velocity retained from the previous iteration (0-1).
    pub momentum_decay: f64,
    /// Distance at which edge attraction cancels repulsion.
    pub equilibrium_distance: f64,
    /// Extra attraction per shared group value.
    pub grouping_coefficient: f64,
    /// Repulsion per group value the other vertex lacks.
    pub grouping_repulsion_coefficient: f64,
    /// Strength of the pull toward the origin.
    pub origin_mass: f64,
    /// Distances below this are treated as this value.
    pub min_effective_distance: f64,
    /// Movement quantum in world units; suppresses sub-pixel jitter.
    pub noise_reduction: f64,
    /// Apply the square-to-circle perspective transform.
    pub apply_distortion: bool,
    /// World units per simulation unit along the longer viewport axis.
    pub unit_scale: f64,
    pub initial_speed: SpeedRange,
    pub budget: LayoutBudget,
    /// Seed for initial velocities; random when unset.
    pub seed: Option<u64>,
}

pub const LOGICAL_EQUILIBRIUM_DISTANCE: f64 = 2.8;

impl Default for LogicalForceConfig {
    fn default() -> Self {
        Self {
            force_multiplier: 0.025,
            momentum_decay: 0.5,
            equilibrium_distance: LOGICAL_EQUILIBRIUM_DISTANCE,
            grouping_coefficient: 1.5,
            grouping_repulsion_coefficient: 0.0,
            origin_mass: 1.0 / LOGICAL_EQUILIBRIUM_DISTANCE,
            min_effective_distance: 0.5,
            noise_reduction: 0.01,
            apply_distortion: true,
            unit_scale: 160.0,
            initial_speed: SpeedRange::new(0.5, 0.75),
            budget: LayoutBudget::default(),
            seed: None,
        }
    }
}

impl LogicalForceConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("force_multiplier", self.force_multiplier)?;
        ensure_unit_interval("momentum_decay", self.momentum_decay)?;
        ensure_positive("equilibrium_distance", self.equilibrium_distance)?;
        ensure_non_negative("grouping_coefficient", self.grouping_coefficient)?;
        ensure_non_negative(
            "grouping_repulsion_coefficient",
            self.grouping_repulsion_coefficient,
        )?;
        ensure_non_negative("origin_mass", self.origin_mass)?;
        ensure_positive("min_effective_distance", self.min_effective_distance)?;
        ensure_positive("noise_reduction", self.noise_reduction)?;
        ensure_positive("unit_scale", self.unit_scale)?;
        self.initial_speed.validate("initial_speed")?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

fn ensure_non_negative(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(LayoutError::InvalidConfig {
            field,
            value,
            reason: "must be finite and non-negative",
        });
    }
    Ok(())
}

fn ensure_positive(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(LayoutError::InvalidConfig {
            field,
            value,
            reason: "must be finite and positive",
        });
    }
    Ok(())
}

fn ensure_unit_interval(field: &'static str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(LayoutError::InvalidConfig {
            field,
            value,
            reason: "must be within 0..=1",
        });
    }
    Ok(())
}
