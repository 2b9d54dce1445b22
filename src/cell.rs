//! Cell assembly.
//!
//! A [`Context`] owns the device cache, and with it the technology, for one
//! synthesis run. Each call to [`Context::generate`] produces an immutable
//! [`Cell`].

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use arcstr::ArcStr;
use serde::Serialize;

use crate::blocks::gate::electrical::GateModel;
use crate::blocks::gate::{layout, schematic, GateParams, GateType, Sizing, OUTPUT};
use crate::effort::StageEffort;
use crate::error::{CellError, Result};
use crate::layout::Layout;
use crate::mos::DeviceCache;
use crate::netlist::{Instance, Net, Netlist, PinDirection, Port};
use crate::paths::{out_json, out_spice};
use crate::power::{Corner, PowerData};
use crate::tech::scn4m::tech_config;
use crate::tech::TechConfig;

pub struct Context {
    devices: DeviceCache,
}

/// An input to output edge through a cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TimingArc {
    pub from: ArcStr,
    pub to: ArcStr,
}

/// A generated gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    name: ArcStr,
    gate: GateType,
    sizing: Sizing,
    netlist: Netlist,
    layout: Option<Layout>,
    model: GateModel,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(tech_config())
    }
}

impl Context {
    pub fn new(tech: Arc<TechConfig>) -> Self {
        Self {
            devices: DeviceCache::new(tech),
        }
    }

    pub fn tech(&self) -> &TechConfig {
        self.devices.tech()
    }

    pub fn devices(&self) -> &DeviceCache {
        &self.devices
    }

    pub fn generate(&self, params: &GateParams) -> Result<Cell> {
        let tc = self.tech();
        let name = params.cell_name();
        let gate = params.gate;

        if params.height.is_some() && !params.layout {
            return Err(CellError::InvalidSizing(format!(
                "{name}: a cell height was given but layout generation is disabled"
            )));
        }

        let sizing = Sizing::new(tc, gate, params.size)?;
        log::info!(
            "{name}: nmos {} ({}x), pmos {} ({}x)",
            sizing.nmos_width,
            sizing.nmos_size,
            sizing.pmos_width,
            sizing.pmos_size
        );

        let netlist = schematic::netlist(&self.devices, gate, &name, &sizing)?;
        log::info!(
            "{name}: netlist has {} devices and {} nets",
            netlist.instances().len(),
            netlist.nets().count()
        );

        let layout = if params.layout {
            let layout = layout::layout(tc, gate, &netlist, params.height)?;
            log::info!("{name}: layout is {} x {}", layout.width, layout.height);
            Some(layout)
        } else {
            None
        };

        let model = GateModel::new(tc, gate, sizing)?;

        Ok(Cell {
            name,
            gate,
            sizing,
            netlist,
            layout,
            model,
        })
    }
}

impl Cell {
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    pub fn gate(&self) -> GateType {
        self.gate
    }

    pub fn sizing(&self) -> &Sizing {
        &self.sizing
    }

    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    pub fn ports(&self) -> &[Port] {
        self.netlist.ports()
    }

    pub fn instances(&self) -> &[Instance] {
        self.netlist.instances()
    }

    pub fn nets(&self) -> impl Iterator<Item = &Net> {
        self.netlist.nets()
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn model(&self) -> &GateModel {
        &self.model
    }

    pub fn input_load(&self) -> f64 {
        self.model.input_load()
    }

    pub fn effective_capacitance(&self, load: f64) -> f64 {
        self.model.effective_capacitance(load)
    }

    pub fn analytical_power(&self, corner: &Corner, load: f64) -> PowerData {
        self.model.analytical_power(corner, load)
    }

    pub fn stage_effort(&self, cout: f64, inp_is_rise: bool) -> StageEffort {
        self.model.stage_effort(cout, inp_is_rise)
    }

    /// One arc from every input to the output.
    pub fn timing_arcs(&self) -> Vec<TimingArc> {
        self.ports()
            .iter()
            .filter(|p| p.direction == PinDirection::Input)
            .map(|p| TimingArc {
                from: p.name.clone(),
                to: ArcStr::from(OUTPUT),
            })
            .collect()
    }

    pub fn write_spice(&self, tc: &TechConfig, out: impl Write) -> Result<()> {
        self.netlist.write_spice(tc, out)
    }

    pub fn to_spice(&self, tc: &TechConfig) -> Result<String> {
        self.netlist.to_spice(tc)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the netlist and the JSON description of this cell to `work_dir`.
    pub fn save(&self, tc: &TechConfig, work_dir: impl AsRef<Path>) -> Result<()> {
        let work_dir = work_dir.as_ref();
        std::fs::create_dir_all(work_dir)?;

        let spice = out_spice(work_dir, &self.name);
        let mut out = std::io::BufWriter::new(std::fs::File::create(&spice)?);
        self.write_spice(tc, &mut out)?;
        out.flush()?;

        let json = out_json(work_dir, &self.name);
        std::fs::write(&json, self.to_json()?)?;

        log::info!("{}: wrote {:?} and {:?}", self.name, spice, json);
        Ok(())
    }
}
