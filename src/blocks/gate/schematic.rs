use arcstr::ArcStr;

use crate::error::Result;
use crate::mos::{DeviceCache, MosParams, MosType};
use crate::netlist::{Netlist, NetlistBuilder};

use super::{GateType, Sizing};

/// Builds the transistor netlist of `gate` from its device table.
pub fn netlist(
    devices: &DeviceCache,
    gate: GateType,
    name: &ArcStr,
    sizing: &Sizing,
) -> Result<Netlist> {
    gate.validate_topology()?;

    let mos = |mos_type, width| MosParams {
        mos_type,
        width,
        mults: 1,
        connect_poly: false,
        connect_active: false,
    };
    let pmos = devices.create(&mos(MosType::Pmos, sizing.pmos_width))?;
    let nmos = devices.create(&mos(MosType::Nmos, sizing.nmos_width))?;

    let mut b = NetlistBuilder::new(name.clone());
    b.add_comment(format!("{gate} size: {}", sizing.size));
    b.add_pin_list(gate.ports())?;

    let topology = gate.topology();
    for (device, entries) in [(&pmos, topology.pmos), (&nmos, topology.nmos)] {
        for entry in entries {
            b.add_inst(format!("{name}_{}", entry.suffix), device.clone())?;
            b.connect_inst(&entry.conns)?;
        }
    }

    b.finish()
}
