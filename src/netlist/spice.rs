use std::io::Write;

use crate::error::Result;
use crate::mos::MosType;
use crate::tech::TechConfig;

use super::Netlist;

/// Emits flat SPICE subcircuits.
pub struct SpiceWriter<W> {
    out: W,
}

impl<W: Write> SpiceWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn comment(&mut self, comment: &str) -> Result<()> {
        writeln!(self.out, "* {}", comment)?;
        Ok(())
    }

    pub fn subcircuit<S: AsRef<str>>(&mut self, name: &str, ports: &[S]) -> Result<()> {
        write!(self.out, ".SUBCKT {}", name)?;
        for p in ports {
            write!(self.out, " {}", p.as_ref())?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    pub fn end_subcircuit(&mut self, name: &str) -> Result<()> {
        writeln!(self.out, ".ENDS {}", name)?;
        Ok(())
    }

    /// Writes one transistor. Dimensions are in microns.
    pub fn mosfet<S: AsRef<str>>(
        &mut self,
        name: &str,
        terminals: &[S],
        model: &str,
        mults: i64,
        width: f64,
        length: f64,
    ) -> Result<()> {
        write!(self.out, "M{}", name)?;
        for t in terminals {
            write!(self.out, " {}", t.as_ref())?;
        }
        writeln!(self.out, " {} m={} w={}u l={}u", model, mults, width, length)?;
        Ok(())
    }
}

impl Netlist {
    /// Writes this netlist as a single flat subcircuit.
    pub fn write_spice(&self, tc: &TechConfig, out: impl Write) -> Result<()> {
        let mut w = SpiceWriter::new(out);
        let um = tc.dbu_per_um as f64;
        let length = tc.layer("poly")?.width as f64 / um;

        for c in self.comments() {
            w.comment(c)?;
        }
        let ports = self.ports().iter().map(|p| &p.name).collect::<Vec<_>>();
        w.subcircuit(self.name(), &ports)?;
        for inst in self.instances() {
            let model = match inst.params.mos_type {
                MosType::Nmos => &tc.electrical.nmos_model,
                MosType::Pmos => &tc.electrical.pmos_model,
            };
            w.mosfet(
                &inst.name,
                &inst.conns,
                model,
                inst.params.mults,
                inst.params.width as f64 / um,
                length,
            )?;
        }
        w.end_subcircuit(self.name())?;
        Ok(())
    }

    pub fn to_spice(&self, tc: &TechConfig) -> Result<String> {
        let mut buf = Vec::new();
        self.write_spice(tc, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
