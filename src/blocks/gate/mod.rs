use std::fmt::Display;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::error::{CellError, Result};
use crate::geometry::Int;
use crate::mos::MosType;
use crate::netlist::PinDirection;
use crate::tech::TechConfig;

pub mod electrical;
pub mod layout;
pub mod schematic;

#[cfg(test)]
mod tests;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Hash, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum GateType {
    Inv,
    Nand2,
    Nand3,
    Nor2,
}

/// One transistor of a gate.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DeviceEntry {
    /// Appended to the cell name to form the instance name.
    pub suffix: &'static str,
    /// Nets in `d`, `g`, `s`, `b` order.
    pub conns: [&'static str; 4],
}

/// The device table of a gate.
///
/// Each row lists devices in physical left to right order. Every device has
/// its source on the left and its drain on the right, so a device's drain net
/// must match the source net of its right neighbor. Devices at the same index
/// in both rows form a column and share a gate net.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Topology {
    pub pmos: &'static [DeviceEntry],
    pub nmos: &'static [DeviceEntry],
}

const fn dev(suffix: &'static str, conns: [&'static str; 4]) -> DeviceEntry {
    DeviceEntry { suffix, conns }
}

const INV: Topology = Topology {
    pmos: &[dev("pmos", ["Z", "A", "vdd", "vdd"])],
    nmos: &[dev("nmos", ["Z", "A", "gnd", "gnd"])],
};

const NAND2: Topology = Topology {
    pmos: &[
        dev("pmos1", ["Z", "A", "vdd", "vdd"]),
        dev("pmos2", ["vdd", "B", "Z", "vdd"]),
    ],
    nmos: &[
        dev("nmos1", ["net1", "A", "gnd", "gnd"]),
        dev("nmos2", ["Z", "B", "net1", "gnd"]),
    ],
};

// The input nearest ground is A.
const NAND3: Topology = Topology {
    pmos: &[
        dev("pmos1", ["Z", "A", "vdd", "vdd"]),
        dev("pmos2", ["vdd", "B", "Z", "vdd"]),
        dev("pmos3", ["Z", "C", "vdd", "vdd"]),
    ],
    nmos: &[
        dev("nmos1", ["net1", "A", "gnd", "gnd"]),
        dev("nmos2", ["net2", "B", "net1", "gnd"]),
        dev("nmos3", ["Z", "C", "net2", "gnd"]),
    ],
};

const NOR2: Topology = Topology {
    pmos: &[
        dev("pmos1", ["net1", "A", "vdd", "vdd"]),
        dev("pmos2", ["Z", "B", "net1", "vdd"]),
    ],
    nmos: &[
        dev("nmos1", ["Z", "A", "gnd", "gnd"]),
        dev("nmos2", ["gnd", "B", "Z", "gnd"]),
    ],
};

pub const OUTPUT: &str = "Z";
pub const VDD: &str = "vdd";
pub const GND: &str = "gnd";

impl Display for GateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl GateType {
    pub fn name(&self) -> &'static str {
        match *self {
            GateType::Inv => "inv",
            GateType::Nand2 => "nand2",
            GateType::Nand3 => "nand3",
            GateType::Nor2 => "nor2",
        }
    }

    pub fn inputs(&self) -> &'static [&'static str] {
        match *self {
            GateType::Inv => &["A"],
            GateType::Nand2 | GateType::Nor2 => &["A", "B"],
            GateType::Nand3 => &["A", "B", "C"],
        }
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs().len()
    }

    pub fn is_inv(&self) -> bool {
        matches!(self, GateType::Inv)
    }

    pub fn is_nand(&self) -> bool {
        matches!(self, GateType::Nand2 | GateType::Nand3)
    }

    pub fn is_nor(&self) -> bool {
        matches!(self, GateType::Nor2)
    }

    pub fn topology(&self) -> &'static Topology {
        match *self {
            GateType::Inv => &INV,
            GateType::Nand2 => &NAND2,
            GateType::Nand3 => &NAND3,
            GateType::Nor2 => &NOR2,
        }
    }

    /// The network whose devices are stacked in series.
    pub fn series(&self) -> MosType {
        if self.is_nor() {
            MosType::Pmos
        } else {
            MosType::Nmos
        }
    }

    /// The logical pins, in order.
    pub fn ports(&self) -> Vec<(&'static str, PinDirection)> {
        let mut ports = self
            .inputs()
            .iter()
            .map(|&i| (i, PinDirection::Input))
            .collect::<Vec<_>>();
        ports.push((OUTPUT, PinDirection::Output));
        ports.push((VDD, PinDirection::Power));
        ports.push((GND, PinDirection::Ground));
        ports
    }

    /// Channel tracks, bottom to top.
    ///
    /// Inputs are ordered so that inputs driving devices nearer the bottom of
    /// the series stack sit nearer that stack. The output track is adjacent
    /// to the parallel network.
    pub fn track_order(&self) -> Vec<&'static str> {
        let mut tracks = self.inputs().to_vec();
        match self.series() {
            MosType::Nmos => tracks.push(OUTPUT),
            MosType::Pmos => {
                tracks.reverse();
                tracks.insert(0, OUTPUT);
            }
        }
        tracks
    }

    /// The only supported size, if the topology is not scalable.
    pub fn fixed_size(&self) -> Option<f64> {
        match *self {
            GateType::Nand3 => Some(1.0),
            _ => None,
        }
    }

    /// Device sizes relative to a minimum width transistor.
    pub fn device_sizes(&self, beta: f64, size: f64) -> (f64, f64) {
        match *self {
            GateType::Inv => (size, beta * size),
            GateType::Nand2 | GateType::Nand3 => (2.0 * size, beta * size),
            GateType::Nor2 => (size, 2.0 * beta * size),
        }
    }

    /// Checks that the device table shares diffusion and gates consistently.
    pub fn validate_topology(&self) -> Result<()> {
        let t = self.topology();
        if t.pmos.len() != t.nmos.len() {
            return Err(CellError::topology(format!(
                "{self} has {} pmos devices but {} nmos devices",
                t.pmos.len(),
                t.nmos.len()
            )));
        }
        for row in [t.pmos, t.nmos] {
            for pair in row.windows(2) {
                let (left, right) = (&pair[0], &pair[1]);
                if left.conns[0] != right.conns[2] {
                    return Err(CellError::topology(format!(
                        "{self}: {} and {} cannot share diffusion ({} vs {})",
                        left.suffix, right.suffix, left.conns[0], right.conns[2]
                    )));
                }
            }
        }
        for (p, n) in t.pmos.iter().zip(t.nmos.iter()) {
            if p.conns[1] != n.conns[1] {
                return Err(CellError::topology(format!(
                    "{self}: {} and {} are in one column but have gates {} and {}",
                    p.suffix, n.suffix, p.conns[1], n.conns[1]
                )));
            }
        }
        Ok(())
    }
}

/// Parameters for generating one gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_builder::Builder)]
pub struct GateParams {
    pub gate: GateType,
    /// Drive strength relative to the minimum size gate.
    #[builder(default = "1.0")]
    pub size: f64,
    /// Cell height. The minimum legal height is used if unset.
    /// Only valid when a layout is generated.
    #[builder(default, setter(strip_option))]
    pub height: Option<Int>,
    #[builder(default, setter(into, strip_option))]
    pub name: Option<ArcStr>,
    /// Whether to generate a layout.
    #[builder(default = "true")]
    pub layout: bool,
}

impl GateParams {
    pub fn builder() -> GateParamsBuilder {
        GateParamsBuilder::default()
    }

    pub fn cell_name(&self) -> ArcStr {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{}_x{}", self.gate, self.size)
                .replace('.', "p")
                .into(),
        }
    }
}

/// The electrical sizing of a gate.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sizing {
    pub size: f64,
    pub beta: f64,
    /// NMOS size relative to a minimum width transistor.
    pub nmos_size: f64,
    pub pmos_size: f64,
    pub nmos_width: Int,
    pub pmos_width: Int,
}

impl Sizing {
    pub fn new(tc: &TechConfig, gate: GateType, size: f64) -> Result<Self> {
        if !size.is_finite() || size <= 0.0 {
            return Err(CellError::InvalidSizing(format!(
                "{gate} size must be a positive number, got {size}"
            )));
        }
        if let Some(fixed) = gate.fixed_size() {
            if size != fixed {
                return Err(CellError::InvalidSizing(format!(
                    "{gate} only supports size {fixed}, got {size}"
                )));
            }
        }
        let (nmos_size, pmos_size) = gate.device_sizes(tc.beta, size);
        Ok(Self {
            size,
            beta: tc.beta,
            nmos_size,
            pmos_size,
            nmos_width: tc.device_width(nmos_size)?,
            pmos_width: tc.device_width(pmos_size)?,
        })
    }
}
