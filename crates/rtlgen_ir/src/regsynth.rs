//! Register & memory synthesis: `AddInput`/`AddOutput`/`AddReg`, the
//! `AddFF`/`AddAsync` synchronization elements they wire up, and the
//! `__next__<name>` shadow-lvalue scheme that makes a register's next-value
//! computation glitch-free.

use rtlgen_common::{BuildError, CodeLoc};

use crate::design::Design;
use crate::ids::{ModuleId, SignalId};
use crate::memory::Edge;
use crate::signal::{declare_wire, name_of, Signal};
use crate::snippet::Snippet;

fn signal_id(sig: Signal) -> Option<SignalId> {
    match sig {
        Signal::InModule(_, id) => Some(id),
        Signal::Const(_) => None,
    }
}

/// The synchronization options accepted by `AddReg`/`AddOutput`. At most one
/// of `posedge`/`negedge`/`async_feedback` may be given; all three absent
/// leaves the register declared but unsynchronized, to be completed later by
/// a direct `AddFF`/`AddAsync` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegOptions {
    /// Rising-edge clock to synchronize on.
    pub posedge: Option<Signal>,
    /// Falling-edge clock to synchronize on.
    pub negedge: Option<Signal>,
    /// Use `'bx` as the next-value default instead of the hold value.
    pub nodefault: bool,
    /// No clock edge; combinational feedback (`assign name = __next__name;`).
    pub async_feedback: bool,
}

fn split_width(width: i32) -> (u32, bool) {
    if width < 0 {
        ((-width) as u32, true)
    } else {
        (width as u32, false)
    }
}

/// Declares a plain input port in the currently open module.
pub fn add_input(design: &mut Design, name: &str, width: i32, codeloc: CodeLoc) -> Result<Signal, BuildError> {
    let module = design.current_module("AddInput")?;
    let (w, signed) = split_width(width);
    let sig = declare_wire(design, module, Some(name), w, signed, codeloc)?;
    design.signal_data_mut(sig).inport = true;
    // An input's value comes from outside this module: it is always
    // considered driven, mirroring the grounding source treating ports as
    // pre-assigned.
    design.signal_data_mut(sig).gotassign = true;
    design.set_materialize(sig);
    Ok(sig)
}

/// Declares an output port. With no synchronization options this is a plain
/// wire, driven by a later `Assign`/`Connect`; with `posedge`/`negedge`/
/// `async_feedback` given it is `AddReg` wearing the `outport` flag.
pub fn add_output(
    design: &mut Design,
    name: &str,
    width: i32,
    options: RegOptions,
    codeloc: CodeLoc,
) -> Result<Signal, BuildError> {
    if has_sync(options) {
        let sig = add_reg(design, name, width, options, codeloc)?;
        design.signal_data_mut(sig).outport = true;
        return Ok(sig);
    }
    let module = design.current_module("AddOutput")?;
    let (w, signed) = split_width(width);
    let sig = declare_wire(design, module, Some(name), w, signed, codeloc)?;
    design.signal_data_mut(sig).outport = true;
    design.set_materialize(sig);
    Ok(sig)
}

fn has_sync(options: RegOptions) -> bool {
    options.posedge.is_some() || options.negedge.is_some() || options.async_feedback
}

/// Declares a register: a signal whose rvalue is its current value and whose
/// lvalue (`__next__<name>`) is the combinationally-computed next value.
/// Dispatches to `AddFF`/`AddAsync` per `options`, leaving the register
/// unsynchronized if none are given.
pub fn add_reg(
    design: &mut Design,
    name: &str,
    width: i32,
    options: RegOptions,
    codeloc: CodeLoc,
) -> Result<Signal, BuildError> {
    if options.posedge.is_some() && options.negedge.is_some() {
        return Err(BuildError::EdgeSpecConflict {
            name: name.to_string(),
        });
    }
    let module = design.current_module("AddReg")?;
    let (w, signed) = split_width(width);
    let sig = declare_wire(design, module, Some(name), w, signed, codeloc)?;
    design.signal_data_mut(sig).register = true;
    design.signal_data_mut(sig).vlog_lvalue = Some(format!("__next__{name}"));
    design.set_materialize(sig);

    match (options.posedge, options.negedge) {
        (Some(clk), None) => add_ff(design, sig, Edge::Posedge(clk), options.nodefault, codeloc)?,
        (None, Some(clk)) => add_ff(design, sig, Edge::Negedge(clk), options.nodefault, codeloc)?,
        (None, None) if options.async_feedback => add_async(design, sig, options.nodefault, codeloc)?,
        (None, None) => {}
        (Some(_), Some(_)) => unreachable!("checked above"),
    }
    Ok(sig)
}

fn require_unsynced_register(design: &Design, sig: Signal) -> Result<ModuleId, BuildError> {
    let data = design.signal_data(sig);
    let name = name_of(design, sig);
    if !data.register {
        return Err(BuildError::NotARegister { name });
    }
    if data.regaction {
        return Err(BuildError::RegActionAlreadySet { name });
    }
    Ok(design.module_of(sig).expect("a register always belongs to a module"))
}

/// Attaches an edge-triggered synchronization element to `sig`: an
/// init-snippet holding the default next-value (the hold value, or `'bx`
/// under `nodefault`) and an `always @(posedge/negedge <clk>) ...`
/// register-update line.
///
/// Always uses the name of whichever clock signal was actually given,
/// never the other edge's — the grounding source's negedge branch
/// erroneously references the posedge clock's name even when only a
/// negedge clock was supplied; this is a known defect this implementation
/// does not replicate.
pub fn add_ff(design: &mut Design, sig: Signal, edge: Edge, nodefault: bool, codeloc: CodeLoc) -> Result<(), BuildError> {
    let module = require_unsynced_register(design, sig)?;
    let name = name_of(design, sig);
    let width = design.signal_data(sig).width;
    let next_lvalue = design
        .signal_data(sig)
        .vlog_lvalue
        .clone()
        .expect("AddReg always sets vlog_lvalue before AddFF can run");

    design.set_materialize(edge.clock());
    let clk_name = name_of(design, edge.clock());

    let init_line = if nodefault {
        format!("{next_lvalue} = {width}'bx; // {codeloc}")
    } else {
        format!("{next_lvalue} = {name}; // {codeloc}")
    };
    let mut init = Snippet::new();
    init.add_line(&init_line, signal_id(sig));
    design.module_mut(module).init_snippets.push(init);

    let reg_line = match edge {
        Edge::Posedge(_) => format!("always @(posedge {clk_name}) {name} <= {next_lvalue}; // {codeloc}"),
        Edge::Negedge(_) => format!("always @(negedge {clk_name}) {name} <= {next_lvalue}; // {codeloc}"),
    };
    design.module_mut(module).regactions.push(reg_line);

    design.signal_data_mut(sig).regaction = true;
    design.signal_data_mut(sig).vlog_reg = true;
    Ok(())
}

/// Attaches a combinational-feedback synchronization element to `sig`: the
/// register's current value is simply `assign`ed from its next-value shadow
/// wire, with no clock at all.
pub fn add_async(design: &mut Design, sig: Signal, _nodefault: bool, codeloc: CodeLoc) -> Result<(), BuildError> {
    let module = require_unsynced_register(design, sig)?;
    let name = name_of(design, sig);
    let width = design.signal_data(sig).width;
    let next_lvalue = design
        .signal_data(sig)
        .vlog_lvalue
        .clone()
        .expect("AddReg always sets vlog_lvalue before AddAsync can run");

    let mut init = Snippet::new();
    init.add_line(&format!("{next_lvalue} = {width}'bx; // {codeloc}"), signal_id(sig));
    design.module_mut(module).init_snippets.push(init);

    design
        .module_mut(module)
        .regactions
        .push(format!("assign {name} = {next_lvalue}; // {codeloc}"));
    design.signal_data_mut(sig).regaction = true;
    Ok(())
}
