use std::fmt::Display;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Power in nW.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerData {
    pub dynamic: f64,
    pub leakage: f64,
}

impl PowerData {
    pub fn new(dynamic: f64, leakage: f64) -> Self {
        Self { dynamic, leakage }
    }

    pub fn total(&self) -> f64 {
        self.dynamic + self.leakage
    }
}

impl Add for PowerData {
    type Output = PowerData;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            dynamic: self.dynamic + rhs.dynamic,
            leakage: self.leakage + rhs.leakage,
        }
    }
}

impl AddAssign for PowerData {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Display for PowerData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.3} nW dynamic, {:.3} nW leakage",
            self.dynamic, self.leakage
        )
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Process {
    Ff,
    #[default]
    Tt,
    Ss,
}

/// A process, voltage and temperature corner.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corner {
    pub process: Process,
    /// Supply voltage in volts.
    pub vdd: f64,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
}

impl Corner {
    pub fn new(process: Process, vdd: f64, temperature: f64) -> Self {
        Self {
            process,
            vdd,
            temperature,
        }
    }

    /// The typical corner at the given supply voltage and 25 C.
    pub fn typical(vdd: f64) -> Self {
        Self::new(Process::Tt, vdd, 25.0)
    }
}
