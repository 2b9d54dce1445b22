//! Horizontal routing tracks between the two device rows.

use arcstr::ArcStr;
use serde::Serialize;

use crate::error::{CellError, Result};
use crate::geometry::{snap_down, Int};
use crate::tech::TechConfig;

/// Rule-derived dimensions of the routing channel.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct ChannelRules {
    /// Distance from a device row's active edge to the nearest track center.
    pub clearance: Int,
    /// Center to center distance of adjacent tracks.
    pub pitch: Int,
    /// Minimum distance between the NMOS and PMOS active regions
    /// imposed by the well rules.
    pub well_sep: Int,
    pub grid: Int,
}

impl ChannelRules {
    pub fn from_tech(tc: &TechConfig) -> Result<Self> {
        let contact = tc.layer("contact")?;
        let via1 = tc.layer("via1")?;
        let m1 = tc.layer("m1")?;
        let poly = tc.layer("poly")?;
        let nwell = tc.layer("nwell")?;

        let extra = (contact.enclosure("m1") - contact.enclosure("active")).max(0);
        let m1_pad = (contact.width + 2 * contact.enclosure("m1"))
            .max(via1.width + 2 * via1.enclosure("m1"));
        let poly_pad = contact.width + 2 * contact.enclosure("poly");

        let clearance = (extra + m1_pad / 2 + m1.space)
            .max(tc.space("poly", "active")? + poly_pad / 2);
        let pitch = (m1_pad + m1.space).max(poly_pad + poly.space);
        let well_sep = nwell.enclosure("active") + tc.space("nwell", "active")?;

        Ok(Self {
            clearance,
            pitch,
            well_sep,
            grid: tc.grid,
        })
    }

    /// The space the track requirement needs between the two rows.
    pub fn track_span(&self, tracks: usize) -> Int {
        2 * self.clearance + (tracks.max(1) as Int - 1) * self.pitch
    }

    /// The minimum separation of the two device rows, and the rule that sets it.
    pub fn min_height(&self, tracks: usize) -> (Int, &'static str) {
        let span = self.track_span(tracks);
        if span >= self.well_sep {
            (span, "m1/poly track pitch")
        } else {
            (self.well_sep, "nwell enclosure plus nwell to active spacing")
        }
    }
}

/// Track assignments within a channel.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct ChannelPlan {
    pub bottom: Int,
    pub top: Int,
    /// Net name and track center, bottom to top.
    pub tracks: Vec<(ArcStr, Int)>,
}

impl ChannelPlan {
    /// Centers `nets` (given bottom to top) in the channel between `bottom` and `top`.
    pub fn new<S: AsRef<str>>(
        rules: &ChannelRules,
        bottom: Int,
        top: Int,
        nets: &[S],
    ) -> Result<Self> {
        let needed = rules.track_span(nets.len());
        let available = top - bottom;
        if available < needed {
            return Err(CellError::LegalizationFailure {
                rule: "m1/poly track pitch".to_string(),
                required: needed,
                available,
            });
        }
        let block = (nets.len().max(1) as Int - 1) * rules.pitch;
        let start = snap_down(bottom + (available - block) / 2, rules.grid);
        let tracks = nets
            .iter()
            .enumerate()
            .map(|(i, n)| (ArcStr::from(n.as_ref()), start + i as Int * rules.pitch))
            .collect();
        Ok(Self {
            bottom,
            top,
            tracks,
        })
    }

    pub fn track(&self, net: &str) -> Option<Int> {
        self.tracks
            .iter()
            .find(|(n, _)| n == net)
            .map(|(_, y)| *y)
    }
}
