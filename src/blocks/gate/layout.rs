use crate::error::Result;
use crate::geometry::Int;
use crate::layout::{check, Layout, LayoutBuilder};
use crate::netlist::Netlist;
use crate::place::place;
use crate::route::route;
use crate::tech::TechConfig;

use super::GateType;

/// Places and routes `netlist`, then checks the result against it.
pub fn layout(
    tc: &TechConfig,
    gate: GateType,
    netlist: &Netlist,
    height: Option<Int>,
) -> Result<Layout> {
    let mut b = LayoutBuilder::new(netlist.name().clone());

    let fp = place(tc, netlist, &gate.track_order(), height, &mut b)?;
    route(tc, netlist, &fp, gate.series(), &mut b)?;

    let layout = b.finish(fp.width, fp.height);
    check::verify(tc, netlist, &layout)?;
    Ok(layout)
}
