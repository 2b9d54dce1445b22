//! Logical effort delay estimates.
//!
//! Delays are in units of tau, the delay of an ideal inverter with no
//! parasitics driving an identical inverter.

use serde::{Deserialize, Serialize};

/// The delay parameters of one gate stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEffort {
    pub name: String,
    /// Gate size relative to the minimum size gate.
    pub size: f64,
    /// Input capacitance in minimum transistor widths.
    pub cin: f64,
    /// Output load in minimum transistor widths.
    pub cout: f64,
    /// Parasitic delay in units of the minimum inverter's parasitic delay.
    pub parasitic: f64,
    pub out_is_rise: bool,
    /// Input capacitance of a minimum size inverter.
    pub min_inv_cin: f64,
    /// Parasitic delay of a minimum size inverter.
    pub pinv: f64,
}

impl StageEffort {
    pub fn logical_effort(&self) -> f64 {
        (self.cin / self.size) / self.min_inv_cin
    }

    pub fn electrical_effort(&self) -> f64 {
        self.cout / self.cin
    }

    pub fn stage_effort(&self) -> f64 {
        self.logical_effort() * self.electrical_effort()
    }

    pub fn parasitic_delay(&self) -> f64 {
        self.pinv * self.parasitic
    }

    pub fn stage_delay(&self) -> f64 {
        self.stage_effort() + self.parasitic_delay()
    }
}

/// The delay of a path of stages, in units of tau.
pub fn relative_delay(stages: &[StageEffort]) -> f64 {
    stages.iter().map(StageEffort::stage_delay).sum()
}

/// The delay of a path of stages, in the units of `tau`.
pub fn absolute_delay(stages: &[StageEffort], tau: f64) -> f64 {
    relative_delay(stages) * tau
}
