//! Module containers: named collections of signals, memories, instances,
//! and procedural code.

use std::collections::HashMap;

use rtlgen_common::{CodeLoc, Ident};

use crate::arena::Arena;
use crate::bundle::Bundle;
use crate::ids::{MemoryId, SignalId, SnippetId};
use crate::memory::MemoryData;
use crate::signal::SignalData;
use crate::snippet::Snippet;

/// A recorded submodule instantiation: `(inst_name, type_name, ports, loc)`.
#[derive(Debug, Clone)]
pub struct Instance {
    /// The instance name local to the parent module.
    pub inst_name: Ident,
    /// The name of the module being instantiated.
    pub type_name: Ident,
    /// The instance's port bundle (role `Parent`).
    pub ports: Bundle,
    /// The call site of `AddInst`.
    pub codeloc: CodeLoc,
}

/// A module under construction: the container for signals, memories,
/// instances, and procedural code.
#[derive(Debug, Clone)]
pub struct ModuleData {
    /// The module's name.
    pub name: Ident,
    /// The call site of `AddModule`.
    pub codeloc: CodeLoc,
    pub(crate) signals: Arena<SignalId, SignalData>,
    pub(crate) signal_names: HashMap<Ident, SignalId>,
    pub(crate) memories: Arena<MemoryId, MemoryData>,
    pub(crate) memory_names: HashMap<Ident, MemoryId>,
    /// Recorded submodule instantiations, in declaration order.
    pub instances: Vec<Instance>,
    /// Snippets emitted outside the open-context machinery (register and
    /// write-enable defaults); always emitted before `code_snippets`.
    pub init_snippets: Vec<Snippet>,
    /// Snippets built through the `If`/`Switch`/`Case`/`Default`/`Assign`
    /// context machinery, in the order their owning contexts were opened.
    pub code_snippets: Vec<Snippet>,
    /// Raw register-update and `Connect`-generated `assign` lines, emitted
    /// verbatim after the combinational blocks.
    pub regactions: Vec<String>,
}

impl ModuleData {
    pub(crate) fn new(name: Ident, codeloc: CodeLoc) -> Self {
        Self {
            name,
            codeloc,
            signals: Arena::new(),
            signal_names: HashMap::new(),
            memories: Arena::new(),
            memory_names: HashMap::new(),
            instances: Vec::new(),
            init_snippets: Vec::new(),
            code_snippets: Vec::new(),
            regactions: Vec::new(),
        }
    }

    /// Looks up a signal by name within this module.
    pub fn find_signal(&self, name: Ident) -> Option<SignalId> {
        self.signal_names.get(&name).copied()
    }

    /// Looks up a memory by name within this module.
    pub fn find_memory(&self, name: Ident) -> Option<MemoryId> {
        self.memory_names.get(&name).copied()
    }

    /// Iterates over every signal declared in this module, in declaration
    /// order (the order the emitter lists ports and wire/reg declarations
    /// in).
    pub fn signals(&self) -> impl Iterator<Item = (SignalId, &SignalData)> {
        self.signals.iter()
    }

    /// Iterates over every memory declared in this module, in declaration
    /// order.
    pub fn memories(&self) -> impl Iterator<Item = (MemoryId, &MemoryData)> {
        self.memories.iter()
    }

    pub(crate) fn code_snippet_mut(&mut self, id: SnippetId) -> &mut Snippet {
        &mut self.code_snippets[id.as_raw() as usize]
    }

    pub(crate) fn push_code_snippet(&mut self) -> SnippetId {
        let id = SnippetId::from_raw(self.code_snippets.len() as u32);
        self.code_snippets.push(Snippet::new());
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_module_is_empty() {
        let m = ModuleData::new(Ident::from_raw(0), CodeLoc::UNKNOWN);
        assert_eq!(m.signals.len(), 0);
        assert_eq!(m.instances.len(), 0);
    }

    #[test]
    fn push_code_snippet_returns_sequential_ids() {
        let mut m = ModuleData::new(Ident::from_raw(0), CodeLoc::UNKNOWN);
        let a = m.push_code_snippet();
        let b = m.push_code_snippet();
        assert_eq!(a.as_raw(), 0);
        assert_eq!(b.as_raw(), 1);
    }
}
