//! Sized transistor templates and the cache that shares them.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, PoisonError, RwLock};

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::error::{CellError, Result};
use crate::geometry::{Int, Point, Rect};
use crate::layout::contact::{draw_contact, max_cuts, ContactParams};
use crate::layout::{Element, Shape};
use crate::tech::TechConfig;

/// MOSFET Types
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum MosType {
    /// An n-channel transistor
    #[default]
    Nmos,
    /// A p-channel transistor
    Pmos,
}

impl Display for MosType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            MosType::Nmos => write!(f, "nmos"),
            MosType::Pmos => write!(f, "pmos"),
        }
    }
}

impl MosType {
    /// The well a device of this type sits in.
    pub fn well(&self) -> &'static str {
        match *self {
            MosType::Nmos => "pwell",
            MosType::Pmos => "nwell",
        }
    }

    /// The contact stack used to tap the well of this device type.
    pub fn tap_stack(&self) -> &'static str {
        match *self {
            MosType::Nmos => "ptap",
            MosType::Pmos => "ntap",
        }
    }
}

/// Terminal names of a device, in pin order.
pub const TERMINALS: [&str; 4] = ["d", "g", "s", "b"];

/// Everything that determines the geometry of a transistor.
///
/// Devices never depend on where they are placed, so this is also
/// the key under which drawn devices are shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_builder::Builder)]
pub struct MosParams {
    pub mos_type: MosType,
    /// The width of a single finger.
    pub width: Int,
    /// The number of fingers.
    #[builder(default = "1")]
    pub mults: Int,
    /// Tie all gate fingers together with a poly bar.
    #[builder(default)]
    pub connect_poly: bool,
    /// Strap all sources together, and all drains together.
    #[builder(default)]
    pub connect_active: bool,
}

impl MosParams {
    pub fn builder() -> MosParamsBuilder {
        MosParamsBuilder::default()
    }

    pub fn name(&self) -> String {
        format!(
            "{}_w{}_m{}{}{}",
            self.mos_type,
            self.width,
            self.mults,
            if self.connect_poly { "_cp" } else { "" },
            if self.connect_active { "_ca" } else { "" }
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.width <= 0 {
            return Err(CellError::InvalidSizing(format!(
                "{} width must be positive, got {}",
                self.mos_type, self.width
            )));
        }
        if self.mults < 1 {
            return Err(CellError::InvalidSizing(format!(
                "{} must have at least one finger, got {}",
                self.mos_type, self.mults
            )));
        }
        Ok(())
    }
}

/// A device terminal and the geometry that can be connected to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DevicePin {
    pub name: ArcStr,
    pub layer: ArcStr,
    pub rects: Vec<Rect>,
}

/// A drawn transistor.
///
/// The origin is the lower left corner of the active region. Source and
/// drain contacts alternate left to right, starting with a source.
/// Elements are labeled with the terminal (`d`, `g`, `s` or `b`) they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ptx {
    params: MosParams,
    name: ArcStr,
    elements: Vec<Element>,
    pins: Vec<DevicePin>,
    active: Rect,
    footprint: Rect,
    sd_pitch: Int,
    sd_centers: Vec<Point>,
    gate_centers: Vec<Int>,
}

impl Ptx {
    pub fn draw(tc: &TechConfig, params: &MosParams) -> Result<Self> {
        params.validate()?;

        let poly = tc.layer("poly")?;
        let contact = tc.layer("contact")?;
        let m1 = tc.layer("m1")?;
        let well = tc.layer(params.mos_type.well())?;

        let w = params.width;
        let nf = params.mults;
        let enc_act = contact.enclosure("active");
        let ctw = contact.width;
        let cgs = tc.space("contact", "poly")?;
        let l = poly.width;
        let ext = poly.extension("active");

        if w < ctw + 2 * enc_act {
            return Err(CellError::InvalidSizing(format!(
                "{} width {} is narrower than a diffusion contact ({})",
                params.mos_type,
                w,
                ctw + 2 * enc_act
            )));
        }
        if w > tc.maxwidth_tx {
            return Err(CellError::InvalidSizing(format!(
                "{} width {} exceeds maxwidth_tx ({})",
                params.mos_type, w, tc.maxwidth_tx
            )));
        }

        // Active edge to gate edge
        let sd_len = enc_act + ctw + cgs;
        let sd_pitch = ctw + 2 * cgs + l;
        let act_w = 2 * sd_len + nf * l + (nf - 1) * (ctw + 2 * cgs);
        let active = Rect::from_xy(0, 0, act_w, w);

        let mut elements = vec![Element {
            net: None,
            shape: Shape::Rect {
                layer: "active".into(),
                rect: active,
            },
        }];
        let mut push = |net: &str, shape: Shape| {
            elements.push(Element {
                net: Some(net.into()),
                shape,
            })
        };
        let rect = |layer: &str, rect: Rect| Shape::Rect {
            layer: layer.into(),
            rect,
        };

        let rows = max_cuts(tc, "active", "active", w)?;
        let ct = ContactParams::builder()
            .stack("active")
            .rows(rows)
            .build()
            .map_err(|e| CellError::InvalidSizing(e.to_string()))?;

        let mut sd_centers = Vec::with_capacity(nf as usize + 1);
        let mut s_rects = Vec::new();
        let mut d_rects = Vec::new();
        for i in 0..=nf {
            let center = Point::new(enc_act + ctw / 2 + i * sd_pitch, w / 2);
            let via = draw_contact(tc, &ct, center)?;
            let terminal = if i % 2 == 0 { "s" } else { "d" };
            if i % 2 == 0 {
                s_rects.push(via.top);
            } else {
                d_rects.push(via.top);
            }
            push(terminal, Shape::Via(via));
            sd_centers.push(center);
        }

        let mut gate_centers = Vec::with_capacity(nf as usize);
        let mut g_rects = Vec::new();
        for j in 0..nf {
            let gx = sd_len + l / 2 + j * sd_pitch;
            let r = Rect::from_xy(gx - l / 2, -ext, gx + l / 2, w + ext);
            push("g", rect("poly", r));
            g_rects.push(r);
            gate_centers.push(gx);
        }

        if nf > 1 && params.connect_poly {
            let r = Rect::from_xy(
                g_rects[0].left(),
                w + ext,
                g_rects[g_rects.len() - 1].right(),
                w + ext + l,
            );
            push("g", rect("poly", r));
            g_rects.push(r);
        }

        if nf > 1 && params.connect_active {
            let hw = m1.width / 2;
            for (terminal, rects, y0, y1) in [
                ("s", &mut s_rects, -m1.space - m1.width, -m1.space),
                ("d", &mut d_rects, w + m1.space, w + m1.space + m1.width),
            ] {
                if rects.len() < 2 {
                    continue;
                }
                let strap = Rect::from_xy(
                    rects[0].center().x - hw,
                    y0,
                    rects[rects.len() - 1].center().x + hw,
                    y1,
                );
                for r in rects.iter() {
                    let c = r.center();
                    push(
                        terminal,
                        rect(
                            "m1",
                            Rect::new(
                                Point::new(c.x - hw, c.y),
                                Point::new(c.x + hw, (y0 + y1) / 2),
                            ),
                        ),
                    );
                }
                push(terminal, rect("m1", strap));
                rects.push(strap);
            }
        }

        let well_rect = active.expand(well.enclosure("active"));
        push("b", rect(params.mos_type.well(), well_rect));

        let footprint = Rect::from_xy(
            g_rects[0].left() - cgs,
            0,
            g_rects[nf as usize - 1].right() + cgs,
            w,
        );

        let pin = |name: &str, layer: &str, rects: Vec<Rect>| DevicePin {
            name: name.into(),
            layer: layer.into(),
            rects,
        };
        let pins = vec![
            pin("d", "m1", d_rects),
            pin("g", "poly", g_rects),
            pin("s", "m1", s_rects),
            pin("b", params.mos_type.well(), vec![well_rect]),
        ];

        Ok(Self {
            name: params.name().into(),
            params: params.clone(),
            elements,
            pins,
            active,
            footprint,
            sd_pitch,
            sd_centers,
            gate_centers,
        })
    }

    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    pub fn params(&self) -> &MosParams {
        &self.params
    }

    pub fn mos_type(&self) -> MosType {
        self.params.mos_type
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Pins in `d`, `g`, `s`, `b` order.
    pub fn pins(&self) -> &[DevicePin] {
        &self.pins
    }

    pub fn pin(&self, name: &str) -> Option<&DevicePin> {
        self.pins.iter().find(|p| p.name == name)
    }

    pub fn active(&self) -> Rect {
        self.active
    }

    pub fn footprint(&self) -> Rect {
        self.footprint
    }

    /// Center to center distance of adjacent source/drain contacts.
    ///
    /// Abutting devices offset by `sd_pitch * mults` share a diffusion contact.
    pub fn sd_pitch(&self) -> Int {
        self.sd_pitch
    }

    pub fn sd_centers(&self) -> &[Point] {
        &self.sd_centers
    }

    pub fn gate_centers(&self) -> &[Int] {
        &self.gate_centers
    }
}

/// Drawn devices, shared between all cells generated in one session.
///
/// A cache draws every device with the technology it was created with.
#[derive(Debug)]
pub struct DeviceCache {
    tech: Arc<TechConfig>,
    devices: RwLock<HashMap<MosParams, Arc<Ptx>>>,
}

impl DeviceCache {
    pub fn new(tech: Arc<TechConfig>) -> Self {
        Self {
            tech,
            devices: RwLock::new(HashMap::new()),
        }
    }

    pub fn tech(&self) -> &Arc<TechConfig> {
        &self.tech
    }

    /// Returns the device for `params`, drawing it if this is the first request.
    pub fn create(&self, params: &MosParams) -> Result<Arc<Ptx>> {
        params.validate()?;
        {
            let map = self.devices.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(d) = map.get(params) {
                return Ok(Arc::clone(d));
            }
        }

        let mut map = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(d) = map.get(params) {
            return Ok(Arc::clone(d));
        }
        let d = Arc::new(Ptx::draw(&self.tech, params)?);
        log::debug!("drew device {}", d.name());
        map.insert(params.clone(), Arc::clone(&d));
        Ok(d)
    }

    pub fn len(&self) -> usize {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
