//! Row placement of gate devices.
//!
//! NMOS devices form a row along the bottom edge of the cell and PMOS devices
//! a row along the top edge. Within a row, each device is offset from its left
//! neighbor by one source/drain pitch per finger so that neighbors share a
//! diffusion contact. The space between the rows is the routing channel.

use std::sync::Arc;

use arcstr::ArcStr;
use serde::Serialize;

use crate::error::{CellError, Result};
use crate::geometry::{snap_up, Int, Point, Rect};
use crate::layout::contact::{draw_contact, ContactParams};
use crate::layout::LayoutBuilder;
use crate::mos::{MosType, Ptx};
use crate::netlist::{Instance, Netlist};
use crate::route::channel::{ChannelPlan, ChannelRules};
use crate::tech::TechConfig;

/// One placed row of devices, in cell coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowPlacement {
    pub mos_type: MosType,
    /// The union of the active regions of the row.
    pub active: Rect,
    /// The y coordinate of source/drain contact centers.
    pub sd_y: Int,
    /// Source/drain contact centers and their nets, left to right.
    /// A contact shared by two devices appears once.
    pub sd: Vec<(Int, ArcStr)>,
    /// Gate centers and their nets, left to right.
    pub gates: Vec<(Int, ArcStr)>,
    /// The net biasing the well of this row.
    pub body: ArcStr,
    pub tap: Point,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Floorplan {
    pub width: Int,
    pub height: Int,
    /// Space between a device row and the cell edge.
    pub top_bottom_space: Int,
    pub nmos: RowPlacement,
    pub pmos: RowPlacement,
    /// The boundary between the p-well below and the n-well above.
    pub well_y: Int,
    pub channel: ChannelPlan,
}

impl Floorplan {
    pub fn row(&self, mos_type: MosType) -> &RowPlacement {
        match mos_type {
            MosType::Nmos => &self.nmos,
            MosType::Pmos => &self.pmos,
        }
    }

    pub fn rows(&self) -> [&RowPlacement; 2] {
        [&self.nmos, &self.pmos]
    }
}

fn row_devices(netlist: &Netlist, mos_type: MosType) -> Result<(Vec<&Instance>, Int)> {
    let insts = netlist
        .instances()
        .iter()
        .filter(|i| i.params.mos_type == mos_type)
        .collect::<Vec<_>>();
    let width = insts
        .first()
        .map(|i| i.params.width)
        .ok_or_else(|| CellError::topology(format!("no {mos_type} devices to place")))?;
    if let Some(i) = insts.iter().find(|i| i.params.width != width) {
        return Err(CellError::topology(format!(
            "{} has width {} but its row has width {width}",
            i.name, i.params.width
        )));
    }
    Ok((insts, width))
}

/// The rule-derived distance between a device row and the supply rail edge.
pub fn top_bottom_space(tc: &TechConfig) -> Result<Int> {
    let m1 = tc.layer("m1")?;
    let poly = tc.layer("poly")?;
    let contact = tc.layer("contact")?;
    let extra = (contact.enclosure("m1") - contact.enclosure("active")).max(0);
    Ok((m1.width / 2 + m1.space + extra).max(poly.extension("active") + poly.space))
}

/// Places the devices of `netlist` and draws wells and well taps.
///
/// `tracks` lists the nets that need a horizontal track in the channel,
/// bottom to top. Without a `height`, the smallest legal height is used.
pub fn place<S: AsRef<str>>(
    tc: &TechConfig,
    netlist: &Netlist,
    tracks: &[S],
    height: Option<Int>,
    b: &mut LayoutBuilder,
) -> Result<Floorplan> {
    let rules = ChannelRules::from_tech(tc)?;
    let tbs = top_bottom_space(tc)?;

    let (ndevs, wn) = row_devices(netlist, MosType::Nmos)?;
    let (pdevs, wp) = row_devices(netlist, MosType::Pmos)?;

    let (min_sep, rule) = rules.min_height(tracks.len());
    let min_height = snap_up(2 * tbs + wn + wp + min_sep, tc.grid);
    let height = match height {
        Some(h) if h <= 0 => {
            return Err(CellError::InvalidSizing(format!(
                "cell height must be positive, got {h}"
            )));
        }
        Some(h) if h % tc.grid != 0 => {
            return Err(CellError::InvalidSizing(format!(
                "cell height {h} is not a multiple of the {} grid",
                tc.grid
            )));
        }
        Some(h) if h < min_height => {
            return Err(CellError::LegalizationFailure {
                rule: rule.to_string(),
                required: min_height,
                available: h,
            });
        }
        Some(h) => h,
        None => min_height,
    };
    log::debug!(
        "{}: height {height} (minimum {min_height}, set by {rule})",
        netlist.name()
    );

    let x0 = tc
        .layer("nwell")?
        .enclosure("active")
        .max(tc.layer("pwell")?.enclosure("active"));

    let nmos = place_row(b, &ndevs, Point::new(x0, tbs))?;
    let pmos = place_row(b, &pdevs, Point::new(x0, height - tbs - wp))?;

    let contact = tc.layer("contact")?;
    let m1 = tc.layer("m1")?;
    let active = tc.layer("active")?;
    let tap_act = contact.width + 2 * contact.enclosure("active");
    let tap_m1 = contact.width + 2 * contact.enclosure("m1");
    let sd_m1 = contact.width + 2 * contact.enclosure("m1");
    let sd_act = contact.width / 2 + contact.enclosure("active");
    let tap_offset =
        (sd_m1 / 2 + m1.space + tap_m1 / 2).max(sd_act + active.space + tap_act / 2);
    let last_sd = nmos
        .sd
        .iter()
        .chain(pmos.sd.iter())
        .map(|(x, _)| *x)
        .max()
        .unwrap_or(x0);
    let tap_x = last_sd + tap_offset;

    let well_enc = x0;
    let width = snap_up(tap_x + tap_act / 2 + well_enc, tc.grid);
    let well_y = pmos.active.bottom() - tc.layer("nwell")?.enclosure("active");

    let mut rows = [nmos, pmos];
    for row in rows.iter_mut() {
        let (well, well_rect, tap_y) = match row.mos_type {
            MosType::Nmos => (
                "pwell",
                Rect::from_xy(0, 0, width, well_y),
                row.active.bottom() + tap_act / 2,
            ),
            MosType::Pmos => (
                "nwell",
                Rect::from_xy(0, well_y, width, height),
                row.active.top() - tap_act / 2,
            ),
        };
        b.add_well(well, &row.body, well_rect);

        row.tap = Point::new(tap_x, tap_y);
        let via = draw_contact(tc, &ContactParams::single(row.mos_type.tap_stack()), row.tap)?;
        b.add_via(&row.body, via);
        b.add_rect(None, "active", Rect::centered(row.tap, tap_act, tap_act));
        b.add_tap(well, &row.body, row.tap);
    }
    let [nmos, pmos] = rows;

    let channel = ChannelPlan::new(&rules, nmos.active.top(), pmos.active.bottom(), tracks)?;
    log::debug!(
        "{}: {width} x {height}, tracks {:?}",
        netlist.name(),
        channel.tracks
    );

    Ok(Floorplan {
        width,
        height,
        top_bottom_space: tbs,
        nmos,
        pmos,
        well_y,
        channel,
    })
}

fn place_row(b: &mut LayoutBuilder, devs: &[&Instance], origin: Point) -> Result<RowPlacement> {
    let first: &Arc<Ptx> = devs[0].device();
    let mos_type = first.mos_type();
    let body = devs[0].conns[3].clone();

    let mut sd: Vec<(Int, ArcStr)> = Vec::new();
    let mut gates = Vec::new();
    let mut active: Option<Rect> = None;
    let mut x = origin.x;

    for inst in devs {
        let dev = inst.device();
        let loc = Point::new(x, origin.y);
        b.add_instance(&inst.name, dev, loc, &inst.conns);

        for (k, c) in dev.sd_centers().iter().enumerate() {
            let net = if k % 2 == 0 {
                &inst.conns[2]
            } else {
                &inst.conns[0]
            };
            let cx = loc.x + c.x;
            match sd.last() {
                Some((lx, lnet)) if *lx == cx => {
                    if lnet != net {
                        return Err(CellError::topology(format!(
                            "{} shares diffusion carrying {lnet} with a terminal on {net}",
                            inst.name
                        )));
                    }
                }
                _ => sd.push((cx, net.clone())),
            }
        }
        gates.extend(
            dev.gate_centers()
                .iter()
                .map(|g| (loc.x + g, inst.conns[1].clone())),
        );

        let act = dev.active().translate(loc);
        active = Some(active.map_or(act, |a| a.union(&act)));
        x += dev.sd_pitch() * dev.params().mults;
    }

    let active = active.ok_or_else(|| CellError::topology(format!("empty {mos_type} row")))?;

    Ok(RowPlacement {
        mos_type,
        active,
        sd_y: origin.y + first.sd_centers()[0].y,
        sd,
        gates,
        body,
        tap: Point::default(),
    })
}
