use std::collections::HashMap;
use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{CellError, Result};
use crate::geometry::Int;

pub mod scn4m;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct ContactStack {
    /// Bottom layer, cut layer, top layer.
    pub layers: Vec<String>,
}

impl ContactStack {
    pub fn bot(&self) -> &str {
        &self.layers[0]
    }

    pub fn cut(&self) -> &str {
        &self.layers[1]
    }

    pub fn top(&self) -> &str {
        &self.layers[2]
    }
}

/// Design rules and device parameters for one process.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TechConfig {
    pub grid: Int,
    pub tech: String,
    /// PMOS/NMOS width ratio of a balanced inverter.
    pub beta: f64,
    /// Width of a minimum size transistor.
    pub minwidth_tx: Int,
    /// Width of the widest transistor that may be drawn.
    pub maxwidth_tx: Int,
    pub dbu_per_um: Int,
    layers: HashMap<String, LayerConfig>,
    #[serde(default)]
    spacing: Vec<SpacingConfig>,
    #[serde(default)]
    stacks: HashMap<String, ContactStack>,
    pub electrical: ElectricalConfig,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct SpacingConfig {
    pub from: String,
    pub to: String,
    pub dist: Int,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct Enclosure {
    pub layer: String,
    pub enclosure: Int,
    #[serde(default)]
    pub one_side: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct Extension {
    pub layer: String,
    pub extend: Int,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct LayerConfig {
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub width: Int,
    #[serde(default)]
    pub space: Int,
    #[serde(default)]
    pub enclosures: Vec<Enclosure>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
    /// Shapes on this layer carry current between touching shapes.
    #[serde(default)]
    pub conductor: bool,
    /// Shapes of different nets on this layer are spacing checked.
    #[serde(default)]
    pub routing: bool,
}

/// Analytical model constants.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ElectricalConfig {
    /// Nominal supply voltage in volts.
    pub vdd: f64,
    /// Drain capacitance of a minimum size device, in fF.
    pub min_tx_drain_c: f64,
    /// Relative size of the reference device that `min_tx_drain_c` was measured on.
    pub min_tx_size: f64,
    /// In MHz.
    pub default_event_frequency: f64,
    /// Logical effort time unit, in ps.
    pub le_tau: f64,
    /// Parasitic delay of a minimum inverter, in units of tau.
    pub min_inv_para_delay: f64,
    pub nmos_model: String,
    pub pmos_model: String,
    #[serde(default)]
    gates: HashMap<String, GateElectrical>,
}

/// Per-topology constants.
///
/// These are tabulated from characterization of each gate family,
/// not derived from first principles.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct GateElectrical {
    /// Fraction of output transitions that switch the output capacitance.
    pub transition_prob: f64,
    /// Parasitic delay relative to a minimum inverter.
    pub parasitic_delay: f64,
    /// Leakage power in nW.
    pub leakage: f64,
}

impl TechConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let txt = std::fs::read_to_string(path)?;
        Self::from_toml(&txt)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let tc: Self = toml::from_str(s)?;
        tc.validate()?;
        Ok(tc)
    }

    /// Rejects values that the geometry and electrical models cannot use.
    pub fn validate(&self) -> Result<()> {
        let invalid = |what: String| -> Result<()> { Err(CellError::InvalidRule(what)) };
        if self.grid <= 0 {
            return invalid(format!("grid must be positive, got {}", self.grid));
        }
        if self.minwidth_tx <= 0 || self.maxwidth_tx < self.minwidth_tx {
            return invalid(format!(
                "transistor widths must satisfy 0 < minwidth_tx <= maxwidth_tx, got {} and {}",
                self.minwidth_tx, self.maxwidth_tx
            ));
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return invalid(format!("beta must be positive, got {}", self.beta));
        }
        self.electrical.validate()
    }

    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        // Tables are reordered so that plain values precede nested tables.
        toml::to_string(&toml::Value::try_from(self)?)
    }

    pub fn layer(&self, l: &str) -> Result<&LayerConfig> {
        self.layers
            .get(l)
            .ok_or_else(|| CellError::MissingRule(format!("layer `{l}`")))
    }

    pub fn has_layer(&self, l: &str) -> bool {
        self.layers.contains_key(l)
    }

    /// The minimum spacing between shapes on two different layers.
    pub fn space(&self, from: &str, to: &str) -> Result<Int> {
        self.spacing
            .iter()
            .find(|s| (s.from == from && s.to == to) || (s.to == from && s.from == to))
            .map(|s| s.dist)
            .ok_or_else(|| CellError::MissingRule(format!("space.{from}.{to}")))
    }

    pub fn stack(&self, stack: &str) -> Result<&ContactStack> {
        let s = self
            .stacks
            .get(stack)
            .ok_or_else(|| CellError::MissingRule(format!("stack `{stack}`")))?;
        if s.layers.len() != 3 {
            return Err(CellError::MissingRule(format!(
                "stack `{stack}` must list exactly 3 layers"
            )));
        }
        Ok(s)
    }

    /// The drawn width of a device that is `size` times the minimum width,
    /// rounded to the manufacturing grid.
    ///
    /// Widths above `maxwidth_tx` are rejected with [`CellError::InvalidSizing`].
    pub fn device_width(&self, size: f64) -> Result<Int> {
        let w = (size * self.minwidth_tx as f64 / self.grid as f64).round() * self.grid as f64;
        if !(w.is_finite() && w >= 0.0 && w <= self.maxwidth_tx as f64) {
            return Err(CellError::InvalidSizing(format!(
                "a device of {size}x the minimum width would be {w} wide, \
                 but maxwidth_tx is {}",
                self.maxwidth_tx
            )));
        }
        Ok(w as Int)
    }

    /// Keyed lookup of a geometric rule.
    ///
    /// Accepted keys are `grid`, `minwidth_tx`, `dbu_per_um`,
    /// `<layer>.width`, `<layer>.space`, `<layer>.enclosure.<other>`,
    /// `<layer>.extension.<other>` and `space.<from>.<to>`.
    pub fn rule(&self, key: &str) -> Result<Int> {
        let missing = || CellError::MissingRule(key.to_string());
        let parts = key.split('.').collect::<Vec<_>>();
        match parts.as_slice() {
            ["grid"] => Ok(self.grid),
            ["minwidth_tx"] => Ok(self.minwidth_tx),
            ["maxwidth_tx"] => Ok(self.maxwidth_tx),
            ["dbu_per_um"] => Ok(self.dbu_per_um),
            ["space", from, to] => self.space(from, to),
            [layer, "width"] => Ok(self.layer(layer)?.width),
            [layer, "space"] => Ok(self.layer(layer)?.space),
            [layer, "enclosure", other] => self
                .layer(layer)?
                .try_enclosure(other, false)
                .ok_or_else(missing),
            [layer, "extension", other] => self
                .layer(layer)?
                .try_extension(other)
                .ok_or_else(missing),
            _ => Err(missing()),
        }
    }

    /// Keyed lookup of a sizing or electrical parameter.
    ///
    /// Per-gate constants are addressed as `<gate>.<field>`, eg. `nand3.leakage`.
    pub fn parameter(&self, key: &str) -> Result<f64> {
        let e = &self.electrical;
        let parts = key.split('.').collect::<Vec<_>>();
        match parts.as_slice() {
            ["beta"] => Ok(self.beta),
            ["vdd"] => Ok(e.vdd),
            ["min_tx_drain_c"] => Ok(e.min_tx_drain_c),
            ["min_tx_size"] => Ok(e.min_tx_size),
            ["default_event_frequency"] => Ok(e.default_event_frequency),
            ["le_tau"] => Ok(e.le_tau),
            ["min_inv_para_delay"] => Ok(e.min_inv_para_delay),
            [gate, "transition_prob"] => Ok(e.gate(gate)?.transition_prob),
            [gate, "parasitic_delay"] => Ok(e.gate(gate)?.parasitic_delay),
            [gate, "leakage"] => Ok(e.gate(gate)?.leakage),
            _ => Err(CellError::MissingRule(key.to_string())),
        }
    }
}

impl ElectricalConfig {
    fn validate(&self) -> Result<()> {
        let positive = [
            ("vdd", self.vdd),
            ("min_tx_size", self.min_tx_size),
            ("default_event_frequency", self.default_event_frequency),
            ("le_tau", self.le_tau),
        ];
        let non_negative = [
            ("min_tx_drain_c", self.min_tx_drain_c),
            ("min_inv_para_delay", self.min_inv_para_delay),
        ];
        check_values(positive, non_negative)?;

        for name in self.gates.keys().sorted() {
            let g = &self.gates[name];
            if !(g.transition_prob > 0.0 && g.transition_prob <= 1.0) {
                return Err(CellError::InvalidRule(format!(
                    "electrical.gates.{name}.transition_prob must be in (0, 1], got {}",
                    g.transition_prob
                )));
            }
            check_values(
                [(&*format!("gates.{name}.parasitic_delay"), g.parasitic_delay)],
                [(&*format!("gates.{name}.leakage"), g.leakage)],
            )?;
        }
        Ok(())
    }

    pub fn gate(&self, key: &str) -> Result<GateElectrical> {
        self.gates
            .get(key)
            .copied()
            .ok_or_else(|| CellError::MissingRule(format!("electrical.gates.{key}")))
    }
}

fn check_values<'a>(
    positive: impl IntoIterator<Item = (&'a str, f64)>,
    non_negative: impl IntoIterator<Item = (&'a str, f64)>,
) -> Result<()> {
    for (key, v) in positive {
        if !(v.is_finite() && v > 0.0) {
            return Err(CellError::InvalidRule(format!(
                "electrical.{key} must be positive, got {v}"
            )));
        }
    }
    for (key, v) in non_negative {
        if !(v.is_finite() && v >= 0.0) {
            return Err(CellError::InvalidRule(format!(
                "electrical.{key} must not be negative, got {v}"
            )));
        }
    }
    Ok(())
}

impl LayerConfig {
    pub fn extension(&self, l: &str) -> Int {
        self.try_extension(l).unwrap_or_default()
    }

    fn try_extension(&self, l: &str) -> Option<Int> {
        self.extensions
            .iter()
            .find(|ext| ext.layer == l)
            .map(|ext| ext.extend)
    }

    fn try_enclosure(&self, l: &str, one_sided: bool) -> Option<Int> {
        let x = self.enclosures.iter().filter(|enc| enc.layer == l);

        if one_sided {
            x.map(|x| x.enclosure).max()
        } else {
            x.filter(|x| !x.one_side).map(|x| x.enclosure).max()
        }
    }

    pub fn enclosure(&self, l: &str) -> Int {
        self.try_enclosure(l, false).unwrap_or_default()
    }

    pub fn one_side_enclosure(&self, l: &str) -> Int {
        self.try_enclosure(l, true).unwrap_or_default()
    }
}
