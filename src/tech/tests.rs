use approx::assert_relative_eq;

use crate::error::CellError;

use super::scn4m::{tech_config, SCN4M_SUBM_TOML};
use super::TechConfig;

#[test]
fn test_load_scn4m() {
    let tc = tech_config();
    assert_eq!(tc.tech, "scn4m_subm");
    assert_eq!(tc.grid, 50);
    assert_eq!(tc.minwidth_tx, 800);
    assert_relative_eq!(tc.beta, 2.0);
    assert!(tc.layer("m1").unwrap().routing);
    assert!(!tc.layer("active").unwrap().conductor);
}

#[test]
fn test_rule_lookup() {
    let tc = tech_config();
    assert_eq!(tc.rule("m1.width").unwrap(), 600);
    assert_eq!(tc.rule("poly.space").unwrap(), 600);
    assert_eq!(tc.rule("contact.enclosure.m1").unwrap(), 200);
    assert_eq!(tc.rule("poly.extension.active").unwrap(), 400);
    assert_eq!(tc.rule("space.contact.poly").unwrap(), 400);
    assert_eq!(tc.rule("space.poly.contact").unwrap(), 400);
    assert_eq!(tc.rule("grid").unwrap(), 50);
    assert_relative_eq!(tc.parameter("beta").unwrap(), 2.0);
    assert_relative_eq!(tc.parameter("nand3.transition_prob").unwrap(), 0.1094);
    assert_relative_eq!(tc.parameter("nand3.parasitic_delay").unwrap(), 3.0);
}

#[test]
fn test_missing_rule() {
    let tc = tech_config();
    for key in [
        "m3.width",
        "m1.enclosure.m2",
        "space.m1.m2",
        "m1.pitch",
        "",
        "contact.enclosure",
    ] {
        match tc.rule(key) {
            Err(CellError::MissingRule(_)) => {}
            other => panic!("expected a missing rule error for `{key}`, got {other:?}"),
        }
    }
    assert!(matches!(
        tc.parameter("xor2.leakage"),
        Err(CellError::MissingRule(_))
    ));
    assert!(matches!(tc.stack("via2"), Err(CellError::MissingRule(_))));
}

#[test]
fn test_device_width() {
    let tc = tech_config();
    assert_eq!(tc.device_width(1.0).unwrap(), 800);
    assert_eq!(tc.device_width(2.0).unwrap(), 1600);
    assert_eq!(tc.device_width(1.3).unwrap(), 1050);
    assert_eq!(tc.device_width(62.5).unwrap(), 50_000);
    assert_eq!(tc.rule("maxwidth_tx").unwrap(), 50_000);
}

#[test]
fn test_device_width_limit() {
    let tc = tech_config();
    for size in [62.6, 1e15, f64::MAX, f64::INFINITY, f64::NAN] {
        match tc.device_width(size) {
            Err(CellError::InvalidSizing(msg)) => assert!(msg.contains("maxwidth_tx")),
            other => panic!("expected an invalid sizing error for {size}, got {other:?}"),
        }
    }
}

#[test]
fn test_toml_roundtrip() {
    let tc = tech_config();
    let s = tc.to_toml().unwrap();
    let parsed = TechConfig::from_toml(&s).unwrap();
    assert_eq!(&parsed, tc.as_ref());
}

#[test]
fn test_malformed_toml() {
    assert!(matches!(
        TechConfig::from_toml("grid = \"fifty\""),
        Err(CellError::TomlParse(_))
    ));
}

#[test]
fn test_load_file() {
    let tc = tech_config();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.toml");
    std::fs::write(&path, tc.to_toml().unwrap()).unwrap();
    assert_eq!(&TechConfig::load(&path).unwrap(), tc.as_ref());

    assert!(matches!(
        TechConfig::load(dir.path().join("missing.toml")),
        Err(CellError::Io(_))
    ));
}

#[test]
fn test_rejects_invalid_values() {
    for (from, to) in [
        ("transition_prob = 0.1094", "transition_prob = 0.0"),
        ("transition_prob = 0.1094", "transition_prob = -0.5"),
        ("transition_prob = 0.1094", "transition_prob = 1.5"),
        ("leakage = 1.0", "leakage = -1.0"),
        ("parasitic_delay = 3.0", "parasitic_delay = nan"),
        ("min_tx_size = 1.0", "min_tx_size = 0.0"),
        ("vdd = 5.0", "vdd = -5.0"),
        ("maxwidth_tx = 50000", "maxwidth_tx = 400"),
        ("grid = 50", "grid = 0"),
        ("beta = 2.0", "beta = 0.0"),
    ] {
        assert!(SCN4M_SUBM_TOML.contains(from), "`{from}` is not in the rules");
        let txt = SCN4M_SUBM_TOML.replacen(from, to, 1);
        match TechConfig::from_toml(&txt) {
            Err(CellError::InvalidRule(_)) => {}
            other => panic!("expected `{to}` to be rejected, got {other:?}"),
        }
    }
}
