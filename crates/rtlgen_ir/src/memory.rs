//! Block memories: addressable arrays with a single clock edge.

use rtlgen_common::{BuildError, CodeLoc, Ident};

use crate::design::Design;
use crate::ids::{MemoryId, ModuleId};
use crate::signal::{name_of, sig, SigArg, Signal, SignalData};

/// The clock edge a memory's writes are synchronized to.
#[derive(Debug, Clone, Copy)]
pub enum Edge {
    /// Rising-edge-triggered writes, naming the clock signal.
    Posedge(Signal),
    /// Falling-edge-triggered writes, naming the clock signal.
    Negedge(Signal),
}

impl Edge {
    /// The clock signal regardless of polarity.
    pub fn clock(self) -> Signal {
        match self {
            Edge::Posedge(s) | Edge::Negedge(s) => s,
        }
    }
}

/// A block memory under construction.
#[derive(Debug, Clone)]
pub struct MemoryData {
    /// The memory's name.
    pub name: Ident,
    /// The call site of `AddMemory`.
    pub codeloc: CodeLoc,
    /// The width, in bits, of one memory word.
    pub width: u32,
    /// The number of addressable words.
    pub depth: u32,
    /// Whether reads/writes are treated as signed.
    pub signed: bool,
    /// The clock edge writes are synchronized to.
    pub edge: Edge,
    /// Recorded if-guarded write actions (`if (wen) mem[idx] <= val;`).
    pub regactions: Vec<String>,
}

/// A handle to a memory owned by a specific module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Memory {
    /// The owning module.
    pub module: ModuleId,
    /// The memory's ID within that module's memory arena.
    pub id: MemoryId,
}

/// Declares a block memory in the currently open module. `width` follows the
/// usual convention: negative encodes `(-width)`-bit signed.
pub fn add_memory(
    design: &mut Design,
    name: &str,
    width: i32,
    depth: u32,
    edge: Edge,
    codeloc: CodeLoc,
) -> Result<Memory, BuildError> {
    let module = design.current_module("AddMemory")?;
    let (w, signed) = if width < 0 {
        ((-width) as u32, true)
    } else {
        (width as u32, false)
    };
    let ident = design.intern(name);
    design.set_materialize(edge.clock());
    let data = MemoryData {
        name: ident,
        codeloc,
        width: w,
        depth,
        signed,
        edge,
        regactions: Vec::new(),
    };
    design.declare_memory(module, ident, data)
}

impl Memory {
    /// Reads one word: `mem[idx]`, producing a new signal whose rvalue is
    /// the indexed memory reference.
    pub fn index(
        self,
        design: &mut Design,
        idx: impl Into<SigArg>,
        codeloc: CodeLoc,
    ) -> Result<Signal, BuildError> {
        let idx_sig = sig(design, idx.into(), codeloc)?;
        design.set_materialize(idx_sig);
        let mem = design.memory_data(self);
        let width = mem.width;
        let signed = mem.signed;
        let mem_name = design.resolve(mem.name).to_string();
        let idx_text = name_of(design, idx_sig);
        let rvalue = format!("{mem_name}[{idx_text}]");
        let auto = design.auto_name();
        let mut data = SignalData::plain(auto, width, signed, rvalue, codeloc);
        data.memory = Some(self.id);
        data.deps = vec![idx_sig];
        design.declare_signal(self.module, auto, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SignalId;

    #[test]
    fn edge_clock_extracts_signal() {
        let clk = Signal::InModule(ModuleId::from_raw(0), SignalId::from_raw(0));
        let e = Edge::Posedge(clk);
        assert_eq!(e.clock(), clk);
        let e = Edge::Negedge(clk);
        assert_eq!(e.clock(), clk);
    }
}
