//! Checks that a layout implements its netlist.

use std::collections::{BTreeSet, HashMap};

use arcstr::ArcStr;
use itertools::Itertools;

use crate::error::{CellError, Result};
use crate::geometry::Rect;
use crate::netlist::Netlist;
use crate::tech::TechConfig;

use super::{Layout, Shape};

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            self.parent[a] = b;
        }
    }
}

struct Node {
    layer: ArcStr,
    rect: Rect,
    net: Option<ArcStr>,
}

/// Runs all checks.
pub fn verify(tc: &TechConfig, netlist: &Netlist, layout: &Layout) -> Result<()> {
    check_pins(netlist, layout)?;
    check_connectivity(tc, netlist, layout)?;
    check_spacing(tc, layout)?;
    Ok(())
}

/// Every logical pin has exactly one layout pin, and vice versa.
pub fn check_pins(netlist: &Netlist, layout: &Layout) -> Result<()> {
    for port in netlist.ports() {
        let n = layout.pins.iter().filter(|p| p.name == port.name).count();
        if n != 1 {
            return Err(CellError::routing(
                port.name.clone(),
                format!("expected one layout pin, found {n}"),
            ));
        }
    }
    if let Some(pin) = layout
        .pins
        .iter()
        .find(|p| netlist.port(&p.name).is_none())
    {
        return Err(CellError::routing(
            pin.name.clone(),
            "layout pin has no matching logical pin",
        ));
    }
    Ok(())
}

/// Every net's geometry forms one connected component, and no component
/// carries two nets.
pub fn check_connectivity(tc: &TechConfig, netlist: &Netlist, layout: &Layout) -> Result<()> {
    let mut nodes = Vec::new();
    let mut joins = Vec::new();
    for elem in layout.elements.iter() {
        let conductor = |layer: &str| tc.layer(layer).map(|l| l.conductor).unwrap_or(false);
        let mut push = |layer: &ArcStr, rect: Rect| {
            if conductor(layer) {
                nodes.push(Node {
                    layer: layer.clone(),
                    rect,
                    net: elem.net.clone(),
                });
                Some(nodes.len() - 1)
            } else {
                None
            }
        };
        match &elem.shape {
            Shape::Via(via) => {
                let bot = push(&via.bot_layer, via.bot);
                let top = push(&via.top_layer, via.top);
                if let (Some(bot), Some(top)) = (bot, top) {
                    joins.push((bot, top));
                }
            }
            shape => {
                for (layer, rect) in shape.rects() {
                    push(&layer, rect);
                }
            }
        }
    }

    let mut ds = DisjointSet::new(nodes.len());
    for (a, b) in joins {
        ds.union(a, b);
    }
    for (i, j) in (0..nodes.len()).tuple_combinations() {
        if nodes[i].layer == nodes[j].layer && nodes[i].rect.touches(&nodes[j].rect) {
            ds.union(i, j);
        }
    }

    let mut components: HashMap<usize, BTreeSet<&ArcStr>> = HashMap::new();
    let mut net_roots: HashMap<&ArcStr, BTreeSet<usize>> = HashMap::new();
    for (i, node) in nodes.iter().enumerate() {
        let root = ds.find(i);
        if let Some(net) = &node.net {
            components.entry(root).or_default().insert(net);
            net_roots.entry(net).or_default().insert(root);
        }
    }

    if let Some(nets) = components
        .values()
        .filter(|nets| nets.len() > 1)
        .min_by_key(|nets| nets.iter().next().map(|n| n.to_string()))
    {
        let mut iter = nets.iter();
        let first = iter.next().map(|n| (*n).clone()).unwrap_or_default();
        return Err(CellError::routing(
            first,
            format!("shorted to {}", iter.join(", ")),
        ));
    }

    for net in netlist.nets() {
        match net_roots.get(&net.name).map(|roots| roots.len()) {
            None => {
                return Err(CellError::routing(net.name.clone(), "has no geometry"));
            }
            Some(1) => {}
            Some(n) => {
                return Err(CellError::routing(
                    net.name.clone(),
                    format!("is split into {n} disconnected pieces"),
                ));
            }
        }
    }
    Ok(())
}

/// Shapes of different nets on routing layers respect the layer's minimum spacing.
pub fn check_spacing(tc: &TechConfig, layout: &Layout) -> Result<()> {
    let mut by_layer: HashMap<ArcStr, Vec<(&ArcStr, Rect)>> = HashMap::new();
    for elem in layout.elements.iter() {
        let Some(net) = &elem.net else {
            continue;
        };
        for (layer, rect) in elem.shape.rects() {
            if tc.layer(&layer).map(|l| l.routing).unwrap_or(false) {
                by_layer.entry(layer).or_default().push((net, rect));
            }
        }
    }

    for layer in by_layer.keys().sorted() {
        let shapes = &by_layer[layer];
        let space = tc.layer(layer)?.space;
        for ((na, ra), (nb, rb)) in shapes.iter().tuple_combinations() {
            if na == nb {
                continue;
            }
            let d2 = ra.distance2(rb);
            if d2 < space * space {
                return Err(CellError::routing(
                    (*na).clone(),
                    format!(
                        "{layer} at {:?} is {:.0} from net {nb} at {:?}, minimum is {space}",
                        ra,
                        (d2 as f64).sqrt(),
                        rb
                    ),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::layout::LayoutBuilder;
    use crate::tech::scn4m::tech_config;

    use super::*;

    fn layout_with(shapes: &[(&str, &str, Rect)]) -> Layout {
        let mut b = LayoutBuilder::new("test");
        for (net, layer, rect) in shapes {
            b.add_rect(Some(&ArcStr::from(*net)), layer, *rect);
        }
        b.finish(10_000, 10_000)
    }

    #[test]
    fn test_touching_nets() {
        let tc = tech_config();
        let layout = layout_with(&[
            ("a", "m1", Rect::from_xy(0, 0, 1000, 600)),
            ("b", "m1", Rect::from_xy(1000, 0, 2000, 600)),
        ]);
        let err = check_spacing(&tc, &layout).unwrap_err();
        assert!(matches!(err, CellError::RoutingInfeasible { .. }));
    }

    #[test]
    fn test_detects_spacing_violation() {
        let tc = tech_config();
        let layout = layout_with(&[
            ("a", "m1", Rect::from_xy(0, 0, 1000, 600)),
            ("b", "m1", Rect::from_xy(1500, 0, 2500, 600)),
            ("c", "m2", Rect::from_xy(1000, 0, 1500, 600)),
        ]);
        match check_spacing(&tc, &layout) {
            Err(CellError::RoutingInfeasible { net, reason }) => {
                assert_eq!(net, "a");
                assert!(reason.contains("m1"));
            }
            other => panic!("expected a spacing violation, got {other:?}"),
        }

        let layout = layout_with(&[
            ("a", "m1", Rect::from_xy(0, 0, 1000, 600)),
            ("b", "m1", Rect::from_xy(1600, 1200, 2500, 1800)),
        ]);
        assert!(check_spacing(&tc, &layout).is_ok());
    }

    #[test]
    fn test_spacing_ignores_non_routing_layers() {
        let tc = tech_config();
        let layout = layout_with(&[
            ("a", "active", Rect::from_xy(0, 0, 1000, 600)),
            ("b", "active", Rect::from_xy(1100, 0, 2000, 600)),
        ]);
        assert!(check_spacing(&tc, &layout).is_ok());
    }
}
