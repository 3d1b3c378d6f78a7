//! The process-wide (per-thread) builder state.
//!
//! A [`Design`] owns every module, every module-less constant, the string
//! interner, the open-context stack, the pending-else slot, and the
//! auto-name counter. Nothing here is `Send`/`Sync`; callers that want
//! independent designs on independent threads hold one `Design` per
//! thread (see `rtlgen`'s thread-local wrapper, which is the only place
//! that mandate is enforced — `Design` itself is a plain, explicit handle,
//! following this crate's general avoidance of implicit global state).

use std::collections::HashMap;

use rtlgen_common::{BuildError, CodeLoc, Ident, Interner};

use crate::arena::Arena;
use crate::ids::{ConstId, ModuleId, SnippetId};
use crate::memory::{Memory, MemoryData};
use crate::module::ModuleData;
use crate::signal::{Signal, SignalData};

/// A frame on the open-context stack, tracking which module and which
/// (lazily allocated) code snippet subsequent `add_line` calls target.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ContextFrame {
    pub module: ModuleId,
    pub snippet: Option<SnippetId>,
}

/// The closed `If`/`ElseIf` context eligible to be reopened by a following
/// `ElseIf`/`Else`, sharing the same snippet so the whole chain coalesces.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingElse {
    pub module: ModuleId,
    pub snippet: SnippetId,
}

/// Process-wide (per-thread) builder state.
pub struct Design {
    pub(crate) interner: Interner,
    pub(crate) modules: Arena<ModuleId, ModuleData>,
    module_names: HashMap<Ident, ModuleId>,
    pub(crate) consts: Arena<ConstId, SignalData>,
    pub(crate) context_stack: Vec<ContextFrame>,
    pub(crate) pending_else: Option<PendingElse>,
    auto_name_counter: u64,
}

impl Design {
    /// Creates a fresh, empty design.
    pub fn new() -> Self {
        Self {
            interner: Interner::new(),
            modules: Arena::new(),
            module_names: HashMap::new(),
            consts: Arena::new(),
            context_stack: Vec::new(),
            pending_else: None,
            auto_name_counter: 0,
        }
    }

    /// Interns a string.
    pub fn intern(&mut self, s: &str) -> Ident {
        self.interner.get_or_intern(s)
    }

    /// Resolves an interned identifier back to its string.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.interner.resolve(ident)
    }

    /// Generates the next auto-name (`__1`, `__2`, …), strictly increasing
    /// and unique for the lifetime of this design.
    pub fn auto_name(&mut self) -> Ident {
        self.auto_name_counter += 1;
        let name = format!("__{}", self.auto_name_counter);
        self.intern(&name)
    }

    /// Declares a new module; fails if the name is already in use.
    pub fn add_module(&mut self, name: &str, codeloc: CodeLoc) -> Result<ModuleId, BuildError> {
        let ident = self.intern(name);
        if self.module_names.contains_key(&ident) {
            return Err(BuildError::DuplicateModule {
                name: name.to_string(),
            });
        }
        let id = self.modules.alloc(ModuleData::new(ident, codeloc));
        self.module_names.insert(ident, id);
        Ok(id)
    }

    /// Looks up a module by name.
    pub fn find_module(&self, name: &str) -> Option<ModuleId> {
        let ident = self.interner.get(name)?;
        self.module_names.get(&ident).copied()
    }

    /// Returns every module in declaration order.
    pub fn module_ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.modules.iter().map(|(id, _)| id)
    }

    /// Borrows a module's data.
    pub fn module(&self, id: ModuleId) -> &ModuleData {
        self.modules.get(id)
    }

    /// Mutably borrows a module's data.
    pub fn module_mut(&mut self, id: ModuleId) -> &mut ModuleData {
        self.modules.get_mut(id)
    }

    /// Returns the module owning the currently open context, failing with
    /// [`BuildError::NoOpenContext`] naming `function` if no context is
    /// open.
    pub fn current_module(&self, function: &'static str) -> Result<ModuleId, BuildError> {
        self.context_stack
            .last()
            .map(|f| f.module)
            .ok_or(BuildError::NoOpenContext { function })
    }

    /// Opens a plain context frame on `module`, with no snippet of its own
    /// yet. This is the mechanism `AddModule` uses to make a module's
    /// builder calls (`AddInput`, `Assign`, `If`, ...) resolve against it
    /// without an explicit module argument on every call; matched by a
    /// later [`Design::pop_context`].
    pub fn push_module_context(&mut self, module: ModuleId) {
        self.context_stack.push(ContextFrame { module, snippet: None });
    }

    /// Closes the innermost open context frame, failing with
    /// [`BuildError::NoOpenContext`] if none is open.
    pub fn pop_context(&mut self, function: &'static str) -> Result<(), BuildError> {
        match self.context_stack.pop() {
            Some(_) => Ok(()),
            None => Err(BuildError::NoOpenContext { function }),
        }
    }

    /// Resets the design to empty. Fails while any context is open.
    pub fn reset(&mut self) -> Result<(), BuildError> {
        if !self.context_stack.is_empty() {
            return Err(BuildError::ContextOpen);
        }
        *self = Design::new();
        Ok(())
    }

    /// Declares a named signal in `module`, failing on a duplicate name.
    pub fn declare_signal(
        &mut self,
        module: ModuleId,
        name: Ident,
        data: SignalData,
    ) -> Result<Signal, BuildError> {
        let module_data = self.modules.get_mut(module);
        if module_data.signal_names.contains_key(&name) {
            return Err(BuildError::DuplicateSignal {
                module: self.interner.resolve(module_data.name).to_string(),
                name: self.interner.resolve(name).to_string(),
            });
        }
        let id = module_data.signals.alloc(data);
        module_data.signal_names.insert(name, id);
        Ok(Signal::InModule(module, id))
    }

    /// Allocates a module-less constant literal; never name-checked, never
    /// looked up by name.
    pub fn alloc_const(&mut self, data: SignalData) -> Signal {
        let id = self.consts.alloc(data);
        Signal::Const(id)
    }

    /// Declares a new memory in `module`, failing on a duplicate name.
    pub fn declare_memory(
        &mut self,
        module: ModuleId,
        name: Ident,
        data: MemoryData,
    ) -> Result<Memory, BuildError> {
        let module_data = self.modules.get_mut(module);
        if module_data.memory_names.contains_key(&name) {
            return Err(BuildError::DuplicateMemory {
                module: self.interner.resolve(module_data.name).to_string(),
                name: self.interner.resolve(name).to_string(),
            });
        }
        let id = module_data.memories.alloc(data);
        module_data.memory_names.insert(name, id);
        Ok(Memory { module, id })
    }

    /// Borrows a memory's stored data.
    pub fn memory_data(&self, mem: Memory) -> &MemoryData {
        self.modules.get(mem.module).memories.get(mem.id)
    }

    /// Mutably borrows a memory's stored data.
    pub fn memory_data_mut(&mut self, mem: Memory) -> &mut MemoryData {
        self.modules.get_mut(mem.module).memories.get_mut(mem.id)
    }

    /// Borrows a signal's stored data, regardless of whether it is a
    /// module-owned signal or a module-less constant.
    pub fn signal_data(&self, sig: Signal) -> &SignalData {
        match sig {
            Signal::Const(id) => self.consts.get(id),
            Signal::InModule(module, id) => self.modules.get(module).signals.get(id),
        }
    }

    /// Mutably borrows a signal's stored data.
    pub fn signal_data_mut(&mut self, sig: Signal) -> &mut SignalData {
        match sig {
            Signal::Const(id) => self.consts.get_mut(id),
            Signal::InModule(module, id) => self.modules.get_mut(module).signals.get_mut(id),
        }
    }

    /// The module owning `sig`, or `None` for a module-less constant.
    pub fn module_of(&self, sig: Signal) -> Option<ModuleId> {
        match sig {
            Signal::Const(_) => None,
            Signal::InModule(module, _) => Some(module),
        }
    }

    /// Whether `sig` is a register.
    pub fn is_register(&self, sig: Signal) -> bool {
        self.signal_data(sig).register
    }

    /// Marks `sig` materialized, propagating transitively through `deps`.
    /// Idempotent: already-materialized signals (and their subtrees) are
    /// not revisited.
    pub fn set_materialize(&mut self, sig: Signal) {
        if self.signal_data(sig).materialize {
            return;
        }
        self.signal_data_mut(sig).materialize = true;
        let deps = self.signal_data(sig).deps.clone();
        for dep in deps {
            self.set_materialize(dep);
        }
    }

    /// Marks `sig` and every signal in its transitive dependency closure as
    /// having received an assignment (used by `Assign` to stamp an lhs's
    /// dependency chain, e.g. a bit-slice's base signal).
    pub fn mark_gotassign_transitive(&mut self, sig: Signal) {
        if self.signal_data(sig).gotassign {
            return;
        }
        self.signal_data_mut(sig).gotassign = true;
        let deps = self.signal_data(sig).deps.clone();
        for dep in deps {
            self.mark_gotassign_transitive(dep);
        }
    }
}

impl Default for Design {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_name_strictly_increasing() {
        let mut d = Design::new();
        let a = d.auto_name();
        let b = d.auto_name();
        assert_eq!(d.resolve(a), "__1");
        assert_eq!(d.resolve(b), "__2");
    }

    #[test]
    fn duplicate_module_name_rejected() {
        let mut d = Design::new();
        d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        let err = d.add_module("m", CodeLoc::UNKNOWN).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateModule { .. }));
    }

    #[test]
    fn reset_fails_with_open_context() {
        let mut d = Design::new();
        let m = d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.context_stack.push(ContextFrame {
            module: m,
            snippet: None,
        });
        assert!(matches!(d.reset(), Err(BuildError::ContextOpen)));
    }

    #[test]
    fn reset_clears_modules_and_counter() {
        let mut d = Design::new();
        d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.auto_name();
        d.reset().unwrap();
        assert_eq!(d.modules.len(), 0);
        assert_eq!(d.resolve(d.auto_name()), "__1");
    }

    #[test]
    fn current_module_errors_without_context() {
        let d = Design::new();
        let err = d.current_module("AddInput").unwrap_err();
        assert!(matches!(err, BuildError::NoOpenContext { function: "AddInput" }));
    }
}
