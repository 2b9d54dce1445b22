use std::sync::Arc;

use crate::error::CellError;
use crate::mos::{MosParams, MosType, Ptx};
use crate::tech::scn4m::tech_config;

use super::*;

fn device(mos_type: MosType, width: i64) -> Arc<Ptx> {
    let params = MosParams::builder()
        .mos_type(mos_type)
        .width(width)
        .build()
        .unwrap();
    Arc::new(Ptx::draw(&tech_config(), &params).unwrap())
}

fn inverter() -> NetlistBuilder {
    let mut b = NetlistBuilder::new("inv");
    b.add_pin_list([
        ("A", PinDirection::Input),
        ("Z", PinDirection::Output),
        ("vdd", PinDirection::Power),
        ("gnd", PinDirection::Ground),
    ])
    .unwrap();
    b.add_inst("inv_pmos", device(MosType::Pmos, 1600)).unwrap();
    b.connect_inst(&["Z", "A", "vdd", "vdd"]).unwrap();
    b.add_inst("inv_nmos", device(MosType::Nmos, 800)).unwrap();
    b.connect_inst(&["Z", "A", "gnd", "gnd"]).unwrap();
    b
}

#[test]
fn test_inverter_netlist() {
    let netlist = inverter().finish().unwrap();
    assert_eq!(netlist.name(), "inv");
    assert_eq!(netlist.instances().len(), 2);
    let names = netlist.nets().map(|n| n.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["A", "Z", "vdd", "gnd"]);
    assert_eq!(
        netlist.net("A").unwrap().pins,
        vec![
            PinRef::Port("A".into()),
            PinRef::Inst {
                inst: "inv_pmos".into(),
                terminal: "g".into()
            },
            PinRef::Inst {
                inst: "inv_nmos".into(),
                terminal: "g".into()
            },
        ]
    );
    assert_eq!(netlist.net("vdd").unwrap().pins.len(), 3);
    assert_eq!(
        netlist.port("Z").unwrap().direction,
        PinDirection::Output
    );
}

#[test]
fn test_dangling_net() {
    let mut b = inverter();
    b.add_inst("extra", device(MosType::Nmos, 800)).unwrap();
    b.connect_inst(&["Z", "A", "floating", "gnd"]).unwrap();
    match b.finish() {
        Err(CellError::MalformedTopology(msg)) => assert!(msg.contains("floating")),
        other => panic!("expected malformed topology, got {other:?}"),
    }
}

#[test]
fn test_unconnected_port() {
    let mut b = inverter();
    b.add_pin("B", PinDirection::Input).unwrap();
    assert!(matches!(b.finish(), Err(CellError::MalformedTopology(_))));
}

#[test]
fn test_connection_count_mismatch() {
    let mut b = NetlistBuilder::new("bad");
    b.add_inst("n", device(MosType::Nmos, 800)).unwrap();
    assert!(matches!(
        b.connect_inst(&["a", "b", "c"]),
        Err(CellError::MalformedTopology(_))
    ));
}

#[test]
fn test_builder_misuse() {
    let mut b = NetlistBuilder::new("bad");
    assert!(b.connect_inst(&["a", "b", "c", "d"]).is_err());
    b.add_pin("A", PinDirection::Input).unwrap();
    assert!(b.add_pin("A", PinDirection::Output).is_err());
    b.add_inst("n", device(MosType::Nmos, 800)).unwrap();
    assert!(b.add_inst("m", device(MosType::Nmos, 800)).is_err());

    let mut b = inverter();
    assert!(b.add_inst("inv_nmos", device(MosType::Nmos, 800)).is_err());
    b.add_inst("dangling", device(MosType::Nmos, 800)).unwrap();
    assert!(matches!(b.finish(), Err(CellError::MalformedTopology(_))));
}

#[test]
fn test_write_spice() {
    let mut b = inverter();
    b.add_comment("size: 1");
    let netlist = b.finish().unwrap();
    let spice = netlist.to_spice(&tech_config()).unwrap();
    let lines = spice.lines().collect::<Vec<_>>();
    assert_eq!(
        lines,
        [
            "* size: 1",
            ".SUBCKT inv A Z vdd gnd",
            "Minv_pmos Z A vdd vdd p m=1 w=1.6u l=0.4u",
            "Minv_nmos Z A gnd gnd n m=1 w=0.8u l=0.4u",
            ".ENDS inv",
        ]
    );
}
