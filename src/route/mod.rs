//! Supply, input and output routing of a placed gate.

use arcstr::ArcStr;

use crate::error::{CellError, Result};
use crate::geometry::{Int, Point, Rect};
use crate::layout::contact::{draw_contact, ContactParams};
use crate::layout::LayoutBuilder;
use crate::mos::MosType;
use crate::netlist::{Netlist, PinDirection};
use crate::place::{Floorplan, RowPlacement};
use crate::tech::TechConfig;

pub mod channel;

struct Router<'a> {
    tc: &'a TechConfig,
    fp: &'a Floorplan,
    b: &'a mut LayoutBuilder,
}

fn port_names(netlist: &Netlist, dir: PinDirection) -> Vec<ArcStr> {
    netlist
        .ports()
        .iter()
        .filter(|p| p.direction == dir)
        .map(|p| p.name.clone())
        .collect()
}

fn single_port(netlist: &Netlist, dir: PinDirection) -> Result<ArcStr> {
    let mut ports = port_names(netlist, dir);
    if ports.len() != 1 {
        return Err(CellError::topology(format!(
            "expected exactly one {dir} pin, found {}",
            ports.len()
        )));
    }
    Ok(ports.remove(0))
}

/// Routes every net of a placed gate.
///
/// `series` is the row holding the series stack; the output pin is
/// dropped at that row's output terminal.
pub fn route(
    tc: &TechConfig,
    netlist: &Netlist,
    fp: &Floorplan,
    series: MosType,
    b: &mut LayoutBuilder,
) -> Result<()> {
    let vdd = single_port(netlist, PinDirection::Power)?;
    let gnd = single_port(netlist, PinDirection::Ground)?;
    let out = single_port(netlist, PinDirection::Output)?;

    let mut router = Router { tc, fp, b };
    router.rails(&vdd, &gnd)?;
    router.supply(&fp.nmos, &gnd, 0)?;
    router.supply(&fp.pmos, &vdd, fp.height)?;
    for input in port_names(netlist, PinDirection::Input) {
        router.input(&input)?;
    }
    router.output(&out, series)?;
    Ok(())
}

impl<'a> Router<'a> {
    fn rails(&mut self, vdd: &ArcStr, gnd: &ArcStr) -> Result<()> {
        let rw = self.tc.layer("m1")?.width;
        for (net, y) in [(gnd, 0), (vdd, self.fp.height)] {
            let rail = Rect::from_xy(0, y - rw / 2, self.fp.width, y + rw / 2);
            self.b.add_pin(net, "m1", rail);
        }
        Ok(())
    }

    /// Connects every source/drain contact on `net`, and the well tap, to the rail at `rail_y`.
    fn supply(&mut self, row: &RowPlacement, net: &ArcStr, rail_y: Int) -> Result<()> {
        let w = self.tc.layer("m1")?.width;
        let mut xs = row
            .sd
            .iter()
            .filter(|(_, n)| n == net)
            .map(|(x, _)| Point::new(*x, row.sd_y))
            .collect::<Vec<_>>();
        if &row.body == net {
            xs.push(row.tap);
        }
        if xs.is_empty() {
            return Err(CellError::routing(
                net.clone(),
                format!("no {} terminal connects to the rail", row.mos_type),
            ));
        }
        for p in xs {
            self.b
                .add_path(net, "m1", vec![p, Point::new(p.x, rail_y)], w)?;
        }
        Ok(())
    }

    /// Drops a poly contact on the input's track in every gate column it drives.
    fn input(&mut self, net: &ArcStr) -> Result<()> {
        let y = self
            .fp
            .channel
            .track(net)
            .ok_or_else(|| CellError::routing(net.clone(), "no channel track"))?;

        let columns = |row: &RowPlacement| {
            row.gates
                .iter()
                .filter(|(_, n)| n == net)
                .map(|(x, _)| *x)
                .collect::<Vec<_>>()
        };
        let xs = columns(&self.fp.nmos);
        if xs.is_empty() {
            return Err(CellError::routing(net.clone(), "drives no gate"));
        }
        if xs != columns(&self.fp.pmos) {
            return Err(CellError::routing(
                net.clone(),
                "nmos and pmos gates are not vertically aligned",
            ));
        }

        let l = self.tc.layer("poly")?.width;
        let m1w = self.tc.layer("m1")?.width;
        let bot = self.fp.nmos.active.top();
        let top = self.fp.pmos.active.bottom();

        let mut pin = None;
        for &x in xs.iter() {
            self.b
                .add_rect(Some(net), "poly", Rect::from_xy(x - l / 2, bot, x + l / 2, top));
            let via = draw_contact(self.tc, &ContactParams::single("poly"), Point::new(x, y))?;
            pin.get_or_insert(via.top);
            self.b.add_via(net, via);
        }
        if xs.len() > 1 {
            let (x0, x1) = (xs[0], xs[xs.len() - 1]);
            self.b
                .add_path(net, "m1", vec![Point::new(x0, y), Point::new(x1, y)], m1w)?;
        }
        if let Some(pin) = pin {
            self.b.add_pin(net, "m1", pin);
        }
        Ok(())
    }

    /// Lifts every output contact to m2, joins them on the output track,
    /// and drops back to m1 for the pin.
    fn output(&mut self, net: &ArcStr, series: MosType) -> Result<()> {
        let y = self
            .fp
            .channel
            .track(net)
            .ok_or_else(|| CellError::routing(net.clone(), "no channel track"))?;
        let m2w = self.tc.layer("m2")?.width;

        let mut contacts = Vec::new();
        for row in self.fp.rows() {
            contacts.extend(
                row.sd
                    .iter()
                    .filter(|(_, n)| n == net)
                    .map(|(x, _)| (row.mos_type, Point::new(*x, row.sd_y))),
            );
        }
        if contacts.is_empty() {
            return Err(CellError::routing(net.clone(), "no device drives the output"));
        }

        for (_, p) in contacts.iter() {
            let via = draw_contact(self.tc, &ContactParams::single("via1"), *p)?;
            self.b.add_via(net, via);
            self.b
                .add_path(net, "m2", vec![*p, Point::new(p.x, y)], m2w)?;
        }

        let xmin = contacts.iter().map(|(_, p)| p.x).min().unwrap_or_default();
        let xmax = contacts.iter().map(|(_, p)| p.x).max().unwrap_or_default();
        if xmin < xmax {
            self.b
                .add_path(net, "m2", vec![Point::new(xmin, y), Point::new(xmax, y)], m2w)?;
        }

        let spine = contacts
            .iter()
            .filter(|(t, _)| *t == series)
            .map(|(_, p)| p.x)
            .max()
            .unwrap_or(xmax);
        let via = draw_contact(self.tc, &ContactParams::single("via1"), Point::new(spine, y))?;
        let pin = via.bot;
        self.b.add_via(net, via);
        self.b.add_pin(net, "m1", pin);

        log::debug!("output {net} spans x {xmin}..{xmax} on track y = {y}, pin at x = {spine}");
        Ok(())
    }
}
