use clap::Parser;
use std::path::PathBuf;

use crate::blocks::gate::GateType;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about,
    help_template(
        "{before-help}{name} {version}\n{author-with-newline}{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}"
    )
)]
pub struct Args {
    /// Gate to generate.
    #[arg(short, long, value_enum)]
    pub gate: GateType,

    /// Drive strength relative to the minimum size gate.
    #[arg(short, long, default_value_t = 1.0)]
    pub size: f64,

    /// Cell height in nm. Defaults to the minimum legal height.
    #[arg(long)]
    pub height: Option<i64>,

    /// Cell name. Defaults to the gate type and size.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Path to a TOML technology file. Defaults to the built-in scn4m_subm rules.
    #[arg(short, long)]
    pub tech: Option<PathBuf>,

    /// Generate only the netlist.
    #[arg(long, conflicts_with = "height")]
    pub netlist_only: bool,

    /// Directory to which output files should be saved.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}
