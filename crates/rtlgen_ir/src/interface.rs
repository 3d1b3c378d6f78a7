//! Interfaces: reusable, role-parameterized port bundles.
//!
//! An [`Interface`] is a closure that, given a [`PortBuilder`] and the role
//! it is being instantiated under, adds whatever signals/memories/nested
//! bundles make up one instance of the protocol. The same closure produces a
//! module's own ports (`Role::Parent`/`Role::Child`), a submodule instance's
//! port bundle (`Role::Parent`, via `add_inst`), or a bus master/slave pair
//! (`Role::Master`/`Role::Slave`) — the direction of every leaf flips
//! automatically with the role.

use std::rc::Rc;

use rtlgen_common::{BuildError, CodeLoc};

use crate::bundle::{Bundle, BundleMember};
use crate::design::Design;
use crate::ids::ModuleId;
use crate::memory::{self, Edge, Memory};
use crate::module::Instance;
use crate::regsynth::{self, RegOptions};
use crate::signal::declare_wire;

/// The role an interface is being built under, driving how each leaf port's
/// direction is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The interface describes a module's own ports, as seen from outside.
    Parent,
    /// The interface describes a submodule instance's ports, as seen from
    /// inside that submodule (directions invert relative to `Parent`).
    Child,
    /// Every leaf is forced to be an input, regardless of its own `output`
    /// flag (used when an interface is passed directly to `AddInput`).
    Input,
    /// Every leaf is forced to be an output.
    Output,
    /// Every leaf is forced to be a register.
    Register,
    /// The interface describes a memory's word layout; leaves become plain
    /// wires sized to the word, not ports.
    Memory,
    /// A bus master: `output`-flagged leaves drive, the rest receive.
    Master,
    /// A bus slave: directions invert relative to `Master`.
    Slave,
}

/// The shape of one leaf (or nested) port within an interface.
#[derive(Clone)]
pub enum PortShape {
    /// A plain signal, `width` following the usual negative-is-signed
    /// convention.
    Width(i32),
    /// A block memory, `(width, depth)`.
    Memory(i32, u32),
    /// A nested interface, applied recursively under a resolved role.
    Nested(Interface),
}

/// A reusable, role-parameterized port-adder. Cloneable (`Rc`) so the same
/// interface value can be attached to any number of modules/instances.
pub type Interface = Rc<dyn Fn(&mut Design, &mut PortBuilder, Role) -> Result<(), BuildError>>;

/// The clock edge and depth a memory-shaped interface's leaves are declared
/// against.
#[derive(Debug, Clone, Copy)]
pub struct MemorySpec {
    /// Word count.
    pub depth: u32,
    /// Write-synchronizing clock edge.
    pub edge: Edge,
}

/// Accumulates the bundle one interface application builds, tracking the
/// module it is building into, the name prefix every leaf is qualified
/// with, and the role driving leaf-direction resolution.
pub struct PortBuilder {
    module: ModuleId,
    prefix: String,
    role: Role,
    memory: Option<MemorySpec>,
    bundle: Bundle,
}

fn resolve_child_role(outer: Role, leaf_is_output: bool) -> Role {
    match outer {
        Role::Input => Role::Input,
        Role::Output => Role::Output,
        Role::Register => Role::Register,
        Role::Memory => Role::Memory,
        Role::Parent | Role::Master => {
            if leaf_is_output {
                Role::Output
            } else {
                Role::Input
            }
        }
        Role::Child | Role::Slave => {
            if leaf_is_output {
                Role::Input
            } else {
                Role::Output
            }
        }
    }
}

impl PortBuilder {
    /// Starts a fresh port builder for one interface application.
    pub fn new(module: ModuleId, prefix: impl Into<String>, role: Role) -> Self {
        Self {
            module,
            prefix: prefix.into(),
            role,
            memory: None,
            bundle: Bundle::new(),
        }
    }

    /// The module signals are being declared into.
    pub fn module(&self) -> ModuleId {
        self.module
    }

    /// The role this builder is resolving leaf directions under.
    pub fn role(&self) -> Role {
        self.role
    }

    fn qualify(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}__{}", self.prefix, name)
        }
    }

    /// Adds one named leaf (or nested) port. `output` is the shape's
    /// declared direction before role resolution: under `Role::Parent` an
    /// `output`-flagged leaf becomes a module output; under `Role::Child`
    /// (an instance's own view) the same flag becomes an input, since an
    /// instance's output is its parent's input.
    pub fn add_port(
        &mut self,
        design: &mut Design,
        name: &str,
        shape: PortShape,
        output: bool,
        codeloc: CodeLoc,
    ) -> Result<(), BuildError> {
        let ident = design.intern(name);
        let qualified = self.qualify(name);
        let resolved = resolve_child_role(self.role, output);

        match shape {
            PortShape::Width(width) => {
                let sig = match (resolved, self.memory) {
                    (_, Some(_)) => {
                        let (w, signed) = if width < 0 {
                            ((-width) as u32, true)
                        } else {
                            (width as u32, false)
                        };
                        declare_wire(design, self.module, Some(&qualified), w, signed, codeloc)?
                    }
                    (Role::Input, None) => regsynth::add_input(design, &qualified, width, codeloc)?,
                    (Role::Output, None) => {
                        regsynth::add_output(design, &qualified, width, RegOptions::default(), codeloc)?
                    }
                    (Role::Register, None) => {
                        regsynth::add_reg(design, &qualified, width, RegOptions::default(), codeloc)?
                    }
                    (other, None) => {
                        unreachable!("resolve_child_role never yields {other:?} for a leaf port")
                    }
                };
                self.bundle.add(ident, BundleMember::Signal(sig));
            }
            PortShape::Memory(width, depth) => {
                let spec = self.memory.unwrap_or(MemorySpec {
                    depth,
                    edge: Edge::Posedge(regsynth::add_input(design, &format!("{qualified}_clk"), 1, codeloc)?),
                });
                let mem = memory::add_memory(design, &qualified, width, depth, spec.edge, codeloc)?;
                self.bundle.add(ident, BundleMember::Memory(mem));
            }
            PortShape::Nested(interface) => {
                let mut child = PortBuilder::new(self.module, qualified, resolved);
                child.memory = self.memory;
                interface(design, &mut child, resolved)?;
                self.bundle.add(ident, BundleMember::Bundle(child.bundle));
            }
        }
        Ok(())
    }
}

/// Applies `interface` directly to the currently open module, as the
/// grounding source does when `AddInput`/`AddOutput`/`AddReg` are given an
/// interface instead of an integer width.
pub fn add_port(design: &mut Design, name: &str, interface: Interface, role: Role, codeloc: CodeLoc) -> Result<Bundle, BuildError> {
    let module = design.current_module("AddPort")?;
    let mut pb = PortBuilder::new(module, name, role);
    interface(design, &mut pb, role)?;
    let _ = codeloc;
    Ok(pb.bundle)
}

fn clear_port_flags(design: &mut Design, bundle: &Bundle) {
    for (_, member) in bundle.iter() {
        match member {
            BundleMember::Signal(s) => {
                let data = design.signal_data_mut(*s);
                data.inport = false;
                data.outport = false;
            }
            BundleMember::Bundle(b) => clear_port_flags(design, b),
            BundleMember::Memory(_) => {}
        }
    }
}

/// Instantiates `interface` as a submodule instance's port bundle: every
/// leaf is qualified with `inst_name` as its prefix and resolved under
/// `Role::Parent` (the instance's ports, as seen from the instantiating
/// module). The `inport`/`outport` flags are cleared afterward — an
/// instance's ports are not this module's own ports — but `register` is
/// deliberately left untouched, mirroring the grounding source's `AddInst`,
/// which clears only the two port flags.
pub fn add_inst(
    design: &mut Design,
    inst_name: &str,
    interface: Interface,
    type_name: &str,
    codeloc: CodeLoc,
) -> Result<Bundle, BuildError> {
    let module = design.current_module("AddInst")?;
    let mut pb = PortBuilder::new(module, inst_name, Role::Parent);
    interface(design, &mut pb, Role::Parent)?;
    clear_port_flags(design, &pb.bundle);

    let inst_ident = design.intern(inst_name);
    let type_ident = design.intern(type_name);
    design.module_mut(module).instances.push(Instance {
        inst_name: inst_ident,
        type_name: type_ident,
        ports: pb.bundle.clone(),
        codeloc,
    });
    Ok(pb.bundle)
}

/// Declares a memory whose word layout is described by an interface: every
/// leaf becomes a plain wire sized for the word, and the interface's own
/// role request is ignored in favor of `Role::Memory`, matching the
/// grounding source's `AddMemory` recursing as `"memory"` regardless of
/// what the interface body asks for.
pub fn add_memory_with_interface(
    design: &mut Design,
    name: &str,
    interface: Interface,
    depth: u32,
    edge: Edge,
    codeloc: CodeLoc,
) -> Result<Bundle, BuildError> {
    let module = design.current_module("AddMemory")?;
    let mut pb = PortBuilder::new(module, name, Role::Memory);
    pb.memory = Some(MemorySpec { depth, edge });
    interface(design, &mut pb, Role::Memory)?;
    Ok(pb.bundle)
}

/// Options for the `stream` ready/valid interface builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamOptions {
    /// Adds a `last` (end-of-packet) bit.
    pub last: bool,
    /// Adds a `dest` field this many bits wide (0 = omit).
    pub destbits: u32,
}

/// Builds a ready/valid streaming interface: `data`/`valid` (and optionally
/// `last`/`dest`) flow from master to slave; `ready` flows the other way.
pub fn stream(data_width: i32, options: StreamOptions, codeloc: CodeLoc) -> Interface {
    Rc::new(move |design: &mut Design, pb: &mut PortBuilder, _role: Role| {
        pb.add_port(design, "data", PortShape::Width(data_width), true, codeloc)?;
        pb.add_port(design, "valid", PortShape::Width(1), true, codeloc)?;
        pb.add_port(design, "ready", PortShape::Width(1), false, codeloc)?;
        if options.last {
            pb.add_port(design, "last", PortShape::Width(1), true, codeloc)?;
        }
        if options.destbits > 0 {
            pb.add_port(design, "dest", PortShape::Width(options.destbits as i32), true, codeloc)?;
        }
        Ok(())
    })
}
