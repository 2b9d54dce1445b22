//! Parametric layout and netlist generation for CMOS logic gates.
//!
//! ```no_run
//! use gategen::blocks::gate::{GateParams, GateType};
//! use gategen::Context;
//!
//! let ctx = Context::default();
//! let params = GateParams::builder().gate(GateType::Nand3).build().unwrap();
//! let cell = ctx.generate(&params).unwrap();
//! println!("{}", cell.to_spice(ctx.tech()).unwrap());
//! ```

pub use anyhow::{anyhow, Result};

pub mod blocks;
pub mod cell;
pub mod cli;
pub mod effort;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod mos;
pub mod netlist;
pub mod paths;
pub mod place;
pub mod power;
pub mod route;
pub mod tech;

pub use cell::{Cell, Context};
pub use error::CellError;
