use std::fs::canonicalize;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;

use crate::blocks::gate::GateParams;
use crate::cell::{Cell, Context};
use crate::cli::args::Args;
use crate::power::Corner;
use crate::tech::scn4m::tech_config;
use crate::tech::TechConfig;
use crate::Result;

pub mod args;

pub const BANNER: &str = r"
                 __
   ____ _____ _/ /____  ____ ____  ____
  / __ `/ __ `/ __/ _ \/ __ `/ _ \/ __ \
 / /_/ / /_/ / /_/  __/ /_/ /  __/ / / /
 \__, /\__,_/\__/\___/\__, /\___/_/ /_/
/____/               /____/

GATEGEN v0.1
";

pub fn run() -> Result<()> {
    let args = Args::parse();
    run_with(args)
}

pub fn run_with(args: Args) -> Result<()> {
    println!("{BANNER}");

    let tech = match &args.tech {
        Some(path) => {
            let path = canonicalize(path)?;
            println!("Technology file: {:?}", &path);
            Arc::new(TechConfig::load(&path)?)
        }
        None => tech_config(),
    };

    let params = gate_params(&args)?;
    println!("Gate parameters:");
    println!("\tGate: {}", params.gate);
    println!("\tSize: {}", params.size);
    if let Some(height) = params.height {
        println!("\tHeight: {height}");
    }

    let ctx = Context::new(tech);
    let cell = ctx.generate(&params)?;
    print_summary(&ctx, &cell);

    let work_dir = if let Some(output_dir) = args.output_dir {
        output_dir
    } else {
        PathBuf::from(cell.name().as_str())
    };
    cell.save(ctx.tech(), &work_dir)?;
    let work_dir = canonicalize(work_dir)?;
    println!("Artifacts saved to: {:?}\n", &work_dir);

    Ok(())
}

pub fn gate_params(args: &Args) -> Result<GateParams> {
    let mut builder = GateParams::builder();
    builder
        .gate(args.gate)
        .size(args.size)
        .layout(!args.netlist_only);
    if let Some(height) = args.height {
        builder.height(height);
    }
    if let Some(name) = &args.name {
        builder.name(name.as_str());
    }
    Ok(builder.build()?)
}

fn print_summary(ctx: &Context, cell: &Cell) {
    let tc = ctx.tech();
    let sizing = cell.sizing();
    println!("\n{} {}", "Generated".green().bold(), cell.name().as_str().bold());
    println!(
        "\tNMOS width: {} nm ({}x)\n\tPMOS width: {} nm ({}x)",
        sizing.nmos_width, sizing.nmos_size, sizing.pmos_width, sizing.pmos_size
    );
    println!(
        "\tDevices: {}\tNets: {}",
        cell.instances().len(),
        cell.nets().count()
    );
    match cell.layout() {
        Some(layout) => println!(
            "\tLayout: {} x {} nm, {} pins",
            layout.width,
            layout.height,
            layout.pins.len()
        ),
        None => println!("\tLayout: {}", "skipped".yellow()),
    }

    let corner = Corner::typical(tc.electrical.vdd);
    let load = cell.input_load();
    let stage = cell.stage_effort(load, true);
    println!("\tInput load: {}", cell.input_load());
    println!(
        "\tPower at a fanout of one: {}",
        cell.analytical_power(&corner, load)
    );
    println!(
        "\tStage delay at a fanout of one: {:.3} tau ({:.3} ps)",
        stage.stage_delay(),
        stage.stage_delay() * tc.electrical.le_tau
    );
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::blocks::gate::GateType;

    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::parse_from([
            "gategen", "--gate", "nand3", "--height", "12000", "--name", "my_nand",
        ]);
        assert_eq!(args.gate, GateType::Nand3);
        assert_eq!(args.size, 1.0);
        let params = gate_params(&args).unwrap();
        assert_eq!(params.height, Some(12_000));
        assert_eq!(params.cell_name(), "my_nand");
        assert!(params.layout);

        let args = Args::parse_from(["gategen", "-g", "nor2", "-s", "2.5", "--netlist-only"]);
        let params = gate_params(&args).unwrap();
        assert_eq!(params.cell_name(), "nor2_x2p5");
        assert!(!params.layout);
    }

    #[test]
    fn test_rejects_unknown_gate() {
        assert!(Args::try_parse_from(["gategen", "--gate", "xor2"]).is_err());
        assert!(Args::try_parse_from(["gategen"]).is_err());
        assert!(Args::try_parse_from([
            "gategen", "-g", "inv", "--height", "12000", "--netlist-only"
        ])
        .is_err());
    }

    #[test]
    fn test_run_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args::parse_from([
            "gategen",
            "--gate",
            "inv",
            "--output-dir",
            dir.path().to_str().unwrap(),
        ]);
        run_with(args).unwrap();
        let spice = std::fs::read_to_string(dir.path().join("inv_x1.sp")).unwrap();
        assert!(spice.contains(".SUBCKT inv_x1 A Z vdd gnd"));
        let json = std::fs::read_to_string(dir.path().join("inv_x1.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["name"], "inv_x1");
    }

    #[test]
    fn test_run_with_tech_file() {
        let dir = tempfile::tempdir().unwrap();
        let tech = dir.path().join("rules.toml");
        std::fs::write(&tech, tech_config().to_toml().unwrap()).unwrap();
        let out = dir.path().join("out");
        let args = Args::parse_from([
            "gategen",
            "--gate",
            "nand2",
            "--tech",
            tech.to_str().unwrap(),
            "--output-dir",
            out.to_str().unwrap(),
        ]);
        run_with(args).unwrap();
        let spice = std::fs::read_to_string(out.join("nand2_x1.sp")).unwrap();
        assert!(spice.contains(".SUBCKT nand2_x1 A B Z vdd gnd"));

        std::fs::write(&tech, "grid = 0").unwrap();
        let args = Args::parse_from([
            "gategen",
            "--gate",
            "nand2",
            "--tech",
            tech.to_str().unwrap(),
            "--output-dir",
            out.to_str().unwrap(),
        ]);
        assert!(run_with(args).is_err());
    }
}
