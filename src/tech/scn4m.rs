use std::sync::Arc;

use lazy_static::lazy_static;

use super::TechConfig;

pub const SCN4M_SUBM_TOML: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tech/scn4m_subm/rules.toml"
));

lazy_static! {
    static ref TECH_CONFIG: Arc<TechConfig> = Arc::new(
        TechConfig::from_toml(SCN4M_SUBM_TOML).expect("failed to load scn4m_subm tech config")
    );
}

/// The built-in reference technology.
pub fn tech_config() -> Arc<TechConfig> {
    Arc::clone(&TECH_CONFIG)
}
