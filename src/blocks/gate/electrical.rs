use serde::Serialize;

use crate::effort::StageEffort;
use crate::error::Result;
use crate::power::{Corner, PowerData};
use crate::tech::{GateElectrical, TechConfig};

use super::{GateType, Sizing};

/// Closed-form load, power and delay figures of a sized gate.
///
/// Capacitances are in fF, power in nW and frequencies in MHz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateModel {
    pub gate: GateType,
    pub sizing: Sizing,
    pub constants: GateElectrical,
    pub min_tx_drain_c: f64,
    pub min_tx_size: f64,
    pub event_frequency: f64,
    pub pinv: f64,
}

impl GateModel {
    pub fn new(tc: &TechConfig, gate: GateType, sizing: Sizing) -> Result<Self> {
        let e = &tc.electrical;
        Ok(Self {
            gate,
            sizing,
            constants: e.gate(gate.name())?,
            min_tx_drain_c: e.min_tx_drain_c,
            min_tx_size: e.min_tx_size,
            event_frequency: e.default_event_frequency,
            pinv: e.min_inv_para_delay,
        })
    }

    /// The relative input capacitance of a single input.
    pub fn input_load(&self) -> f64 {
        self.sizing.nmos_size + self.sizing.pmos_size
    }

    /// Output parasitic capacitance, scaled from the drain capacitance of a
    /// minimum size device by the pull-down size.
    pub fn parasitic_cap(&self) -> f64 {
        self.min_tx_drain_c * (self.sizing.nmos_size / self.min_tx_size)
    }

    pub fn effective_capacitance(&self, load: f64) -> f64 {
        self.constants.transition_prob * (load + self.parasitic_cap())
    }

    pub fn dynamic_power(&self, corner: &Corner, c_eff: f64, freq: f64) -> f64 {
        c_eff * corner.vdd * corner.vdd * freq
    }

    pub fn analytical_power(&self, corner: &Corner, load: f64) -> PowerData {
        let c_eff = self.effective_capacitance(load);
        PowerData {
            dynamic: self.dynamic_power(corner, c_eff, self.event_frequency),
            leakage: self.constants.leakage,
        }
    }

    /// Delay parameters for driving `cout`. The output of this stage
    /// switches opposite to its input.
    pub fn stage_effort(&self, cout: f64, inp_is_rise: bool) -> StageEffort {
        StageEffort {
            name: self.gate.name().to_string(),
            size: self.sizing.size,
            cin: self.input_load(),
            cout,
            parasitic: self.constants.parasitic_delay,
            out_is_rise: !inp_is_rise,
            min_inv_cin: 1.0 + self.sizing.beta,
            pinv: self.pinv,
        }
    }
}
