//! Append-only physical geometry.
//!
//! Shapes are accumulated in a [`LayoutBuilder`] while a cell is being
//! placed and routed, then frozen into an immutable [`Layout`].

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::error::{CellError, Result};
use crate::geometry::{bbox, Int, Point, Rect};
use crate::mos::Ptx;

pub mod check;
pub mod contact;

/// A Manhattan wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    pub layer: ArcStr,
    pub points: Vec<Point>,
    pub width: Int,
}

impl Path {
    /// Each segment as a rectangle, extended by half the width at both ends.
    pub fn rects(&self) -> Vec<Rect> {
        let hw = self.width / 2;
        self.points
            .windows(2)
            .map(|seg| Rect::new(seg[0], seg[1]).expand(hw))
            .collect()
    }

    pub fn translate(&self, p: Point) -> Self {
        Self {
            layer: self.layer.clone(),
            points: self.points.iter().map(|q| q.translate(p)).collect(),
            width: self.width,
        }
    }
}

/// A contact or via array joining `bot_layer` to `top_layer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Via {
    pub stack: ArcStr,
    pub bot_layer: ArcStr,
    pub cut_layer: ArcStr,
    pub top_layer: ArcStr,
    pub center: Point,
    pub cuts: Vec<Rect>,
    pub bot: Rect,
    pub top: Rect,
}

impl Via {
    pub fn translate(&self, p: Point) -> Self {
        Self {
            stack: self.stack.clone(),
            bot_layer: self.bot_layer.clone(),
            cut_layer: self.cut_layer.clone(),
            top_layer: self.top_layer.clone(),
            center: self.center.translate(p),
            cuts: self.cuts.iter().map(|c| c.translate(p)).collect(),
            bot: self.bot.translate(p),
            top: self.top.translate(p),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Rect { layer: ArcStr, rect: Rect },
    Path(Path),
    Via(Via),
}

impl Shape {
    pub fn translate(&self, p: Point) -> Self {
        match self {
            Shape::Rect { layer, rect } => Shape::Rect {
                layer: layer.clone(),
                rect: rect.translate(p),
            },
            Shape::Path(path) => Shape::Path(path.translate(p)),
            Shape::Via(via) => Shape::Via(via.translate(p)),
        }
    }

    /// Every drawn rectangle of this shape, with its layer.
    pub fn rects(&self) -> Vec<(ArcStr, Rect)> {
        match self {
            Shape::Rect { layer, rect } => vec![(layer.clone(), *rect)],
            Shape::Path(path) => path
                .rects()
                .into_iter()
                .map(|r| (path.layer.clone(), r))
                .collect(),
            Shape::Via(via) => {
                let mut v = vec![
                    (via.bot_layer.clone(), via.bot),
                    (via.top_layer.clone(), via.top),
                ];
                v.extend(via.cuts.iter().map(|c| (via.cut_layer.clone(), *c)));
                v
            }
        }
    }
}

/// A shape, optionally labeled with the net it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Element {
    pub net: Option<ArcStr>,
    pub shape: Shape,
}

/// A boundary pin of a cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutPin {
    pub name: ArcStr,
    pub layer: ArcStr,
    pub rect: Rect,
}

/// The location of one placed device instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub inst: ArcStr,
    pub device: ArcStr,
    pub loc: Point,
    /// The area reserved for the device, including rule-derived margins.
    pub footprint: Rect,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Well {
    pub layer: ArcStr,
    pub net: ArcStr,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tap {
    /// The well this tap biases.
    pub well: ArcStr,
    pub net: ArcStr,
    pub center: Point,
}

#[derive(Debug, Clone, Default)]
pub struct LayoutBuilder {
    name: ArcStr,
    placements: Vec<Placement>,
    elements: Vec<Element>,
    pins: Vec<LayoutPin>,
    wells: Vec<Well>,
    taps: Vec<Tap>,
}

/// A frozen layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub name: ArcStr,
    pub width: Int,
    pub height: Int,
    pub placements: Vec<Placement>,
    pub elements: Vec<Element>,
    pub pins: Vec<LayoutPin>,
    pub wells: Vec<Well>,
    pub taps: Vec<Tap>,
}

impl LayoutBuilder {
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_rect(&mut self, net: Option<&ArcStr>, layer: &str, rect: Rect) {
        self.elements.push(Element {
            net: net.cloned(),
            shape: Shape::Rect {
                layer: layer.into(),
                rect,
            },
        });
    }

    /// Adds a Manhattan path. Diagonal segments cannot be drawn.
    pub fn add_path(
        &mut self,
        net: &ArcStr,
        layer: &str,
        points: Vec<Point>,
        width: Int,
    ) -> Result<()> {
        if points.len() < 2 {
            return Err(CellError::routing(
                net.clone(),
                "a path needs at least two points",
            ));
        }
        if let Some(seg) = points
            .windows(2)
            .find(|seg| seg[0].x != seg[1].x && seg[0].y != seg[1].y)
        {
            return Err(CellError::routing(
                net.clone(),
                format!("diagonal {layer} segment from {} to {}", seg[0], seg[1]),
            ));
        }
        self.elements.push(Element {
            net: Some(net.clone()),
            shape: Shape::Path(Path {
                layer: layer.into(),
                points,
                width,
            }),
        });
        Ok(())
    }

    pub fn add_via(&mut self, net: &ArcStr, via: Via) {
        self.elements.push(Element {
            net: Some(net.clone()),
            shape: Shape::Via(via),
        });
    }

    /// Declares a boundary pin and draws its geometry.
    pub fn add_pin(&mut self, name: &ArcStr, layer: &str, rect: Rect) {
        self.add_rect(Some(name), layer, rect);
        self.pins.push(LayoutPin {
            name: name.clone(),
            layer: layer.into(),
            rect,
        });
    }

    pub fn add_well(&mut self, layer: &str, net: &ArcStr, rect: Rect) {
        self.add_rect(Some(net), layer, rect);
        self.wells.push(Well {
            layer: layer.into(),
            net: net.clone(),
            rect,
        });
    }

    pub fn add_tap(&mut self, well: &str, net: &ArcStr, center: Point) {
        self.taps.push(Tap {
            well: well.into(),
            net: net.clone(),
            center,
        });
    }

    /// Copies the geometry of `device` into this layout at `loc`,
    /// renaming each device terminal to the net it connects to.
    ///
    /// `conns` follows the pin order of the device.
    pub fn add_instance(&mut self, inst: &ArcStr, device: &Ptx, loc: Point, conns: &[ArcStr]) {
        let terminal_net = |t: &ArcStr| {
            device
                .pins()
                .iter()
                .position(|p| &p.name == t)
                .and_then(|i| conns.get(i))
                .cloned()
        };
        for elem in device.elements() {
            self.elements.push(Element {
                net: elem.net.as_ref().and_then(&terminal_net),
                shape: elem.shape.translate(loc),
            });
        }
        self.placements.push(Placement {
            inst: inst.clone(),
            device: device.name().clone(),
            loc,
            footprint: device.footprint().translate(loc),
        });
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn finish(self, width: Int, height: Int) -> Layout {
        Layout {
            name: self.name,
            width,
            height,
            placements: self.placements,
            elements: self.elements,
            pins: self.pins,
            wells: self.wells,
            taps: self.taps,
        }
    }
}

impl Layout {
    pub fn pin(&self, name: &str) -> Option<&LayoutPin> {
        self.pins.iter().find(|p| p.name == name)
    }

    pub fn placement(&self, inst: &str) -> Option<&Placement> {
        self.placements.iter().find(|p| p.inst == inst)
    }

    /// The cell boundary.
    pub fn boundary(&self) -> Rect {
        Rect::from_xy(0, 0, self.width, self.height)
    }

    /// The bounding box of all drawn geometry.
    pub fn bbox(&self) -> Option<Rect> {
        let rects = self
            .elements
            .iter()
            .flat_map(|e| e.shape.rects())
            .map(|(_, r)| r)
            .collect::<Vec<_>>();
        bbox(&rects)
    }

    /// All labeled rectangles on `layer`.
    pub fn shapes_on(&self, layer: &str) -> Vec<(Option<ArcStr>, Rect)> {
        self.elements
            .iter()
            .flat_map(|e| {
                e.shape
                    .rects()
                    .into_iter()
                    .filter(|(l, _)| l == layer)
                    .map(|(_, r)| (e.net.clone(), r))
            })
            .collect()
    }
}
