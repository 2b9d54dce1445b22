use std::collections::HashSet;

use approx::assert_relative_eq;
use itertools::Itertools;

use crate::cell::{Cell, Context};
use crate::error::CellError;
use crate::geometry::Rect;
use crate::layout::check::{check_connectivity, verify};
use crate::layout::{Element, Shape};
use crate::netlist::PinRef;
use crate::power::Corner;
use crate::tech::scn4m::tech_config;

use super::*;

const GATES: [GateType; 4] = [GateType::Inv, GateType::Nand2, GateType::Nand3, GateType::Nor2];

fn generate(gate: GateType, size: f64) -> Cell {
    let ctx = Context::default();
    let params = GateParams::builder().gate(gate).size(size).build().unwrap();
    ctx.generate(&params).unwrap()
}

fn sizes(gate: GateType) -> Vec<f64> {
    match gate.fixed_size() {
        Some(size) => vec![size],
        None => vec![1.0, 2.0, 3.5],
    }
}

#[test]
fn test_topologies_are_consistent() {
    for gate in GATES {
        gate.validate_topology().unwrap();
        let t = gate.topology();
        assert_eq!(t.pmos.len(), gate.num_inputs());
        assert_eq!(t.nmos.len(), gate.num_inputs());
    }
}

#[test]
fn test_nets_are_closed_and_unique() {
    for gate in GATES {
        for size in sizes(gate) {
            let cell = generate(gate, size);
            let mut seen = HashSet::new();
            for net in cell.nets() {
                assert!(
                    net.pins.len() >= 2,
                    "{gate} net {} has {} pins",
                    net.name,
                    net.pins.len()
                );
                for pin in net.pins.iter() {
                    assert!(seen.insert(pin.clone()), "{gate}: {pin} is on two nets");
                }
            }
            for inst in cell.instances() {
                for t in ["d", "g", "s", "b"] {
                    assert!(seen.contains(&PinRef::Inst {
                        inst: inst.name.clone(),
                        terminal: t.into(),
                    }));
                }
            }
            assert_eq!(seen.len(), cell.ports().len() + 4 * cell.instances().len());
        }
    }
}

#[test]
fn test_placement_is_legal() {
    for gate in GATES {
        for size in sizes(gate) {
            let cell = generate(gate, size);
            let layout = cell.layout().unwrap();
            assert_eq!(layout.placements.len(), 2 * gate.num_inputs());
            for (a, b) in layout.placements.iter().tuple_combinations() {
                assert!(
                    !a.footprint.overlaps(&b.footprint),
                    "{gate}: {} overlaps {}",
                    a.inst,
                    b.inst
                );
            }
            for p in layout.placements.iter() {
                assert!(layout.boundary().contains(&p.footprint));
            }

            let wells = layout.wells.iter().map(|w| w.layer.as_str()).collect::<Vec<_>>();
            assert_eq!(wells, ["pwell", "nwell"]);
            for well in layout.wells.iter() {
                let taps = layout
                    .taps
                    .iter()
                    .filter(|t| t.well == well.layer)
                    .collect::<Vec<_>>();
                assert_eq!(taps.len(), 1, "{gate}: {} has no tap", well.layer);
                assert_eq!(taps[0].net, well.net);
                let c = taps[0].center;
                assert!(well.rect.contains(&Rect::from_xy(c.x, c.y, c.x, c.y)));
            }
        }
    }
}

#[test]
fn test_layout_implements_netlist() {
    let tc = tech_config();
    for gate in GATES {
        for size in sizes(gate) {
            let cell = generate(gate, size);
            let layout = cell.layout().unwrap();
            verify(&tc, cell.netlist(), layout).unwrap();

            let pins = layout.pins.iter().map(|p| p.name.as_str()).sorted().collect::<Vec<_>>();
            let ports = cell.ports().iter().map(|p| p.name.as_str()).sorted().collect::<Vec<_>>();
            assert_eq!(pins, ports);
            assert!(layout.pins.iter().all(|p| p.layer == "m1"));
        }
    }
}

#[test]
fn test_short_is_detected() {
    let tc = tech_config();
    let cell = generate(GateType::Nand2, 1.0);
    let mut layout = cell.layout().unwrap().clone();
    let a = layout.pin("A").unwrap().rect;
    let z = layout.pin("Z").unwrap().rect;
    layout.elements.push(Element {
        net: Some("A".into()),
        shape: Shape::Rect {
            layer: "m1".into(),
            rect: a.union(&z),
        },
    });
    match check_connectivity(&tc, cell.netlist(), &layout) {
        Err(CellError::RoutingInfeasible { reason, .. }) => assert!(reason.contains("shorted")),
        other => panic!("expected a short, got {other:?}"),
    }
}

#[test]
fn test_open_is_detected() {
    let tc = tech_config();
    let cell = generate(GateType::Inv, 1.0);
    let mut layout = cell.layout().unwrap().clone();
    layout.elements.retain(|e| match &e.shape {
        Shape::Path(path) => path.layer != "m2",
        _ => true,
    });
    match check_connectivity(&tc, cell.netlist(), &layout) {
        Err(CellError::RoutingInfeasible { net, .. }) => assert_eq!(net, "Z"),
        other => panic!("expected an open, got {other:?}"),
    }
}

#[test]
fn test_generation_is_deterministic() {
    for gate in GATES {
        let a = generate(gate, 1.0);
        let b = generate(gate, 1.0);
        assert_eq!(a, b);
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }
}

#[test]
fn test_nand3() {
    let tc = tech_config();
    let cell = generate(GateType::Nand3, 1.0);

    assert_eq!(cell.name(), "nand3_x1");
    assert_eq!(cell.sizing().nmos_width, 1600);
    assert_eq!(cell.sizing().pmos_width, 1600);
    assert_relative_eq!(cell.input_load(), 4.0);

    let layout = cell.layout().unwrap();
    assert_eq!((layout.width, layout.height), (9_000, 11_400));

    let spice = cell.to_spice(&tc).unwrap();
    let lines = spice.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], "* nand3 size: 1");
    assert_eq!(lines[1], ".SUBCKT nand3_x1 A B C Z vdd gnd");
    assert_eq!(lines[2], "Mnand3_x1_pmos1 Z A vdd vdd p m=1 w=1.6u l=0.4u");
    assert_eq!(lines[5], "Mnand3_x1_nmos1 net1 A gnd gnd n m=1 w=1.6u l=0.4u");
    assert_eq!(lines[7], "Mnand3_x1_nmos3 Z C net2 gnd n m=1 w=1.6u l=0.4u");
    assert_eq!(lines[8], ".ENDS nand3_x1");

    let arcs = cell
        .timing_arcs()
        .into_iter()
        .map(|arc| format!("{}->{}", arc.from, arc.to))
        .collect::<Vec<_>>();
    assert_eq!(arcs, ["A->Z", "B->Z", "C->Z"]);
}

#[test]
fn test_nand3_only_supports_unit_size() {
    let ctx = Context::default();
    for size in [2.0, 0.5] {
        let params = GateParams::builder()
            .gate(GateType::Nand3)
            .size(size)
            .build()
            .unwrap();
        assert!(matches!(
            ctx.generate(&params),
            Err(CellError::InvalidSizing(_))
        ));
    }
}

#[test]
fn test_invalid_sizes() {
    let tc = tech_config();
    for size in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            Sizing::new(&tc, GateType::Inv, size),
            Err(CellError::InvalidSizing(_))
        ));
    }
    // Rounds to a device narrower than a diffusion contact.
    assert!(matches!(
        Context::default().generate(
            &GateParams::builder()
                .gate(GateType::Inv)
                .size(0.5)
                .build()
                .unwrap()
        ),
        Err(CellError::InvalidSizing(_))
    ));
}

#[test]
fn test_oversized_devices_are_rejected() {
    let ctx = Context::default();
    for (gate, size) in [
        (GateType::Inv, 1e15),
        (GateType::Inv, f64::MAX),
        (GateType::Nand2, 40.0),
        (GateType::Nor2, 1e300),
    ] {
        let params = GateParams::builder()
            .gate(gate)
            .size(size)
            .build()
            .unwrap();
        match ctx.generate(&params) {
            Err(CellError::InvalidSizing(msg)) => assert!(msg.contains("maxwidth_tx"), "{msg}"),
            other => panic!("expected {gate} x{size} to be rejected, got {other:?}"),
        }
    }
    assert!(ctx.devices().is_empty());

    // The widest legal pmos is 50000.
    let sizing = Sizing::new(ctx.tech(), GateType::Inv, 25.0).unwrap();
    assert_eq!(sizing.pmos_width, 40_000);
    assert!(Sizing::new(ctx.tech(), GateType::Inv, 31.3).is_err());
}

#[test]
fn test_electrical_model() {
    let cell = generate(GateType::Nand3, 1.0);
    let corner = Corner::typical(5.0);

    assert_relative_eq!(cell.effective_capacitance(0.0), 0.1094 * 1.4, epsilon = 1e-9);
    let power = cell.analytical_power(&corner, 10.0);
    assert_relative_eq!(power.dynamic, 0.1094 * 11.4 * 25.0 * 100.0, epsilon = 1e-6);
    assert_relative_eq!(power.leakage, 1.0);

    let stage = cell.stage_effort(12.0, true);
    assert_relative_eq!(stage.logical_effort(), 4.0 / 3.0);
    assert_relative_eq!(stage.electrical_effort(), 3.0);
    assert_relative_eq!(stage.parasitic_delay(), 2.07 * 3.0, epsilon = 1e-9);
    assert_relative_eq!(stage.stage_delay(), 4.0 + 6.21, epsilon = 1e-9);
    assert!(!stage.out_is_rise);
    assert!(cell.stage_effort(12.0, false).out_is_rise);
}

#[test]
fn test_load_monotonicity() {
    let corner = Corner::typical(5.0);
    for gate in GATES {
        let cell = generate(gate, 1.0);
        for (lo, hi) in [0.0, 0.5, 1.0, 10.0, 100.0].into_iter().tuple_windows() {
            assert!(cell.effective_capacitance(lo) < cell.effective_capacitance(hi));
            assert!(
                cell.analytical_power(&corner, lo).dynamic
                    < cell.analytical_power(&corner, hi).dynamic
            );
        }
    }
}

#[test]
fn test_input_loads() {
    let loads = GATES.map(|gate| generate(gate, 1.0).input_load());
    assert_eq!(loads, [3.0, 4.0, 4.0, 5.0]);
}

#[test]
fn test_explicit_height() {
    let ctx = Context::default();
    let params = |height| {
        GateParams::builder()
            .gate(GateType::Nand3)
            .height(height)
            .build()
            .unwrap()
    };

    let cell = ctx.generate(&params(12_000)).unwrap();
    assert_eq!(cell.layout().unwrap().height, 12_000);

    match ctx.generate(&params(10_000)) {
        Err(CellError::LegalizationFailure {
            required,
            available,
            ..
        }) => {
            assert_eq!(required, 11_400);
            assert_eq!(available, 10_000);
        }
        other => panic!("expected a legalization failure, got {other:?}"),
    }

    for height in [12_025, 0, -12_000] {
        assert!(matches!(
            ctx.generate(&params(height)),
            Err(CellError::InvalidSizing(_))
        ));
    }
}

#[test]
fn test_netlist_only() {
    let ctx = Context::default();
    let params = GateParams::builder()
        .gate(GateType::Nor2)
        .layout(false)
        .build()
        .unwrap();
    let cell = ctx.generate(&params).unwrap();
    assert!(cell.layout().is_none());
    assert_eq!(cell.instances().len(), 4);

    let params = GateParams::builder()
        .gate(GateType::Nor2)
        .layout(false)
        .height(12_000)
        .build()
        .unwrap();
    assert!(matches!(
        ctx.generate(&params),
        Err(CellError::InvalidSizing(_))
    ));
}

#[test]
fn test_parallel_generation_shares_devices() {
    let ctx = Context::default();
    let cells = std::thread::scope(|s| {
        let handles = GATES
            .iter()
            .flat_map(|&gate| [gate, gate])
            .map(|gate| {
                let ctx = &ctx;
                s.spawn(move || {
                    let params = GateParams::builder().gate(gate).build().unwrap();
                    ctx.generate(&params).unwrap()
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });
    assert_eq!(cells.len(), 8);
    for pair in cells.chunks(2) {
        assert_eq!(pair[0], pair[1]);
    }
    // nmos 800 and 1600, pmos 1600 and 3200
    assert_eq!(ctx.devices().len(), 4);
}
