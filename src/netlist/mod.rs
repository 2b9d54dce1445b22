//! Device-level connectivity.
//!
//! A [`NetlistBuilder`] accumulates ports, device instances and their
//! connections. [`NetlistBuilder::finish`] validates the result and is the
//! only way to obtain a [`Netlist`], which in turn is the only input the
//! layout phase accepts.

use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;

use arcstr::ArcStr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CellError, Result};
use crate::mos::{MosParams, Ptx};

pub mod spice;

#[cfg(test)]
mod tests;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinDirection {
    Input,
    Output,
    Power,
    Ground,
}

impl Display for PinDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Input => write!(f, "INPUT"),
            Self::Output => write!(f, "OUTPUT"),
            Self::Power => write!(f, "POWER"),
            Self::Ground => write!(f, "GROUND"),
        }
    }
}

/// A logical pin of a cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Port {
    pub name: ArcStr,
    pub direction: PinDirection,
}

/// One member of a net.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PinRef {
    /// A port of the cell itself.
    Port(ArcStr),
    /// Terminal `terminal` of instance `inst`.
    Inst { inst: ArcStr, terminal: ArcStr },
}

impl Display for PinRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Port(name) => write!(f, "{name}"),
            Self::Inst { inst, terminal } => write!(f, "{inst}.{terminal}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Net {
    pub name: ArcStr,
    pub pins: Vec<PinRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    pub name: ArcStr,
    pub params: MosParams,
    /// Net names, in the pin order of the device.
    pub conns: Vec<ArcStr>,
    #[serde(skip)]
    device: Arc<Ptx>,
}

impl Instance {
    pub fn device(&self) -> &Arc<Ptx> {
        &self.device
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetlistBuilder {
    name: ArcStr,
    ports: Vec<Port>,
    instances: Vec<Instance>,
    pending: Option<(ArcStr, Arc<Ptx>)>,
    comments: Vec<String>,
}

/// A validated netlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Netlist {
    name: ArcStr,
    ports: Vec<Port>,
    instances: Vec<Instance>,
    nets: IndexMap<ArcStr, Net>,
    comments: Vec<String>,
}

impl NetlistBuilder {
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_pin(&mut self, name: impl Into<ArcStr>, direction: PinDirection) -> Result<()> {
        let name = name.into();
        if self.ports.iter().any(|p| p.name == name) {
            return Err(CellError::topology(format!("duplicate pin `{name}`")));
        }
        self.ports.push(Port { name, direction });
        Ok(())
    }

    pub fn add_pin_list<'a>(
        &mut self,
        pins: impl IntoIterator<Item = (&'a str, PinDirection)>,
    ) -> Result<()> {
        for (name, dir) in pins {
            self.add_pin(name, dir)?;
        }
        Ok(())
    }

    /// Adds an instance of `device`.
    ///
    /// It must be connected with [`NetlistBuilder::connect_inst`] before
    /// another instance is added.
    pub fn add_inst(&mut self, name: impl Into<ArcStr>, device: Arc<Ptx>) -> Result<()> {
        let name = name.into();
        if let Some((pending, _)) = &self.pending {
            return Err(CellError::topology(format!(
                "instance `{pending}` was never connected"
            )));
        }
        if self.instances.iter().any(|i| i.name == name) {
            return Err(CellError::topology(format!("duplicate instance `{name}`")));
        }
        self.pending = Some((name, device));
        Ok(())
    }

    /// Connects the most recently added instance.
    pub fn connect_inst<S>(&mut self, conns: &[S]) -> Result<()>
    where
        S: AsRef<str>,
    {
        let (name, device) = self
            .pending
            .take()
            .ok_or_else(|| CellError::topology("no instance to connect"))?;
        if conns.len() != device.pins().len() {
            return Err(CellError::topology(format!(
                "instance `{name}` has {} pins, but {} connections were given",
                device.pins().len(),
                conns.len()
            )));
        }
        self.instances.push(Instance {
            name,
            params: device.params().clone(),
            conns: conns.iter().map(|c| ArcStr::from(c.as_ref())).collect(),
            device,
        });
        Ok(())
    }

    pub fn add_comment(&mut self, comment: impl Into<String>) {
        self.comments.push(comment.into());
    }

    /// Resolves nets and checks that the netlist is well formed.
    pub fn finish(self) -> Result<Netlist> {
        if let Some((name, _)) = self.pending {
            return Err(CellError::topology(format!(
                "instance `{name}` was never connected"
            )));
        }

        let mut nets: IndexMap<ArcStr, Net> = IndexMap::new();
        let mut add = |net: &ArcStr, pin: PinRef| {
            nets.entry(net.clone())
                .or_insert_with(|| Net {
                    name: net.clone(),
                    pins: Vec::new(),
                })
                .pins
                .push(pin);
        };
        for port in self.ports.iter() {
            add(&port.name, PinRef::Port(port.name.clone()));
        }
        for inst in self.instances.iter() {
            for (pin, net) in inst.device.pins().iter().zip(inst.conns.iter()) {
                add(
                    net,
                    PinRef::Inst {
                        inst: inst.name.clone(),
                        terminal: pin.name.clone(),
                    },
                );
            }
        }

        let mut seen = HashSet::new();
        for net in nets.values() {
            if net.pins.len() < 2 {
                return Err(CellError::topology(format!(
                    "net `{}` is only connected to {}",
                    net.name,
                    net.pins
                        .first()
                        .map(|p| p.to_string())
                        .unwrap_or_default()
                )));
            }
            for pin in net.pins.iter() {
                if !seen.insert(pin) {
                    return Err(CellError::topology(format!(
                        "pin {pin} belongs to more than one net"
                    )));
                }
            }
        }

        log::debug!(
            "netlist {}: {} instances, {} nets",
            self.name,
            self.instances.len(),
            nets.len()
        );

        Ok(Netlist {
            name: self.name,
            ports: self.ports,
            instances: self.instances,
            nets,
            comments: self.comments,
        })
    }
}

impl Netlist {
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn instance(&self, name: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.name == name)
    }

    pub fn nets(&self) -> impl Iterator<Item = &Net> {
        self.nets.values()
    }

    pub fn net(&self, name: &str) -> Option<&Net> {
        self.nets.get(name)
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }
}
