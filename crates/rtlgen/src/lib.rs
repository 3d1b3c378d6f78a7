//! Thread-local, ergonomic front end over `rtlgen_ir`/`rtlgen_verilog`.
//!
//! `rtlgen_ir` exposes an explicit `&mut Design` builder surface; this crate
//! wraps that surface in a per-thread [`Design`](rtlgen_ir::Design) so a host
//! program can call free functions (`add_input`, `assign`, `if_block`, ...)
//! without threading a builder handle through every call, and adds the
//! host-language ergonomics the distilled model's embedding described as
//! external (`std::ops` operator overloads, `Signal::set_next`).
//!
//! Block constructors (`if_block`, `switch_block`, ...) cannot simply wrap
//! `rtlgen_ir`'s body-taking functions in one held `RefCell` borrow: the
//! caller-supplied body itself calls further free functions in this crate,
//! which would try to borrow the same thread-local a second time and panic.
//! Every block constructor here instead borrows twice, briefly: once to call
//! `rtlgen_ir`'s `open_*`, then (with no borrow held) runs the body as
//! ordinary statements, then borrows again to call the matching `close_*`.

#![warn(missing_docs)]

use std::cell::RefCell;

use rtlgen_common::CodeLoc;
pub use rtlgen_common::BuildError;
use rtlgen_ir as ir;
pub use rtlgen_ir::{
    BinaryOp, CmpOp, Design as IrDesign, IndexArg, IndexOperand, Interface, PortBuilder, PortShape, Role, SigArg,
    StreamOptions, SwitchOptions, UnaryOp,
};
pub use rtlgen_verilog::EmitError;

thread_local! {
    static DESIGN: RefCell<ir::Design> = RefCell::new(ir::Design::new());
}

fn with_design<T>(f: impl FnOnce(&mut ir::Design) -> T) -> T {
    DESIGN.with(|cell| f(&mut cell.borrow_mut()))
}

fn with_design_ref<T>(f: impl FnOnce(&ir::Design) -> T) -> T {
    DESIGN.with(|cell| f(&cell.borrow()))
}

/// Resets the calling thread's design to empty. Fails while any procedural
/// context is still open.
pub fn reset_design() -> Result<(), BuildError> {
    with_design(|d| d.reset())
}

/// Validates and writes the calling thread's design as Verilog-2001 source
/// text, in module declaration order.
pub fn write_verilog<W: std::io::Write>(out: &mut W) -> Result<(), EmitError> {
    with_design_ref(|d| rtlgen_verilog::write_verilog(d, out))
}

/// Checks the completeness invariant (`gotassign ∧ regaction` on every
/// register) without writing anything.
pub fn validate_design() -> Result<(), BuildError> {
    with_design_ref(rtlgen_verilog::validate_design)
}

/// A handle to a signal in the calling thread's design: either a named
/// module signal or a module-less constant literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signal(ir::Signal);

impl From<ir::Signal> for Signal {
    fn from(s: ir::Signal) -> Self {
        Signal(s)
    }
}

impl From<Signal> for SigArg {
    fn from(s: Signal) -> Self {
        SigArg::Signal(s.0)
    }
}

impl Signal {
    /// The signal's width in bits.
    pub fn width(self) -> u32 {
        with_design_ref(|d| d.signal_data(self.0).width)
    }

    /// Whether arithmetic on this signal is signed.
    pub fn signed(self) -> bool {
        with_design_ref(|d| d.signal_data(self.0).signed)
    }

    /// Whether this signal is a register.
    pub fn is_register(self) -> bool {
        with_design_ref(|d| d.is_register(self.0))
    }

    /// Applies an index or slice operation, producing a new signal whose
    /// lvalue-ness (if any) derives from this one.
    #[track_caller]
    pub fn index(self, index: IndexArg) -> Result<Signal, BuildError> {
        let codeloc = CodeLoc::capture();
        with_design(|d| self.0.index(d, index, codeloc)).map(Signal)
    }

    /// The settable-property sugar for `Assign(self, rhs)`: the Rust
    /// spelling of the distilled model's `.next = expr`.
    #[track_caller]
    pub fn set_next(self, rhs: impl Into<SigArg>) -> Result<(), BuildError> {
        assign(self, rhs)
    }

    /// Re-wraps this signal with a forced width/signedness.
    #[track_caller]
    pub fn with_width(self, width: i32) -> Result<Signal, BuildError> {
        let codeloc = CodeLoc::capture();
        with_design(|d| ir::sig_with_width(d, self.0, width, codeloc)).map(Signal)
    }

    #[track_caller]
    fn unary(self, op: UnaryOp) -> Signal {
        let codeloc = CodeLoc::capture();
        with_design(|d| ir::unary_op(d, op, self.0, codeloc))
            .expect("operator sugar requires an open module context")
            .into()
    }

    #[track_caller]
    fn binary(self, op: BinaryOp, rhs: Signal) -> Signal {
        let codeloc = CodeLoc::capture();
        with_design(|d| ir::binary_op(d, op, self.0, rhs.0, codeloc))
            .expect("operator sugar requires operands from a single module")
            .into()
    }

    #[track_caller]
    fn cmp(self, op: CmpOp, rhs: Signal) -> Signal {
        let codeloc = CodeLoc::capture();
        with_design(|d| ir::cmp_op(d, op, self.0, rhs.0, codeloc))
            .expect("operator sugar requires operands from a single module")
            .into()
    }

    /// Reduction AND (`&sig`): 1 if every bit is set.
    pub fn reduce_and(self) -> Signal {
        self.unary(UnaryOp::ReduceAnd)
    }

    /// Reduction OR (`|sig`): 1 if any bit is set.
    pub fn reduce_or(self) -> Signal {
        self.unary(UnaryOp::ReduceOr)
    }

    /// Reduction XOR (`^sig`): parity of the signal's bits.
    pub fn reduce_xor(self) -> Signal {
        self.unary(UnaryOp::ReduceXor)
    }

    /// `self == rhs`, as a named method: `PartialEq::eq` cannot return a
    /// [`Signal`], so comparison sugar is spelled as ordinary methods
    /// instead of the `==`/`<`/... operators.
    pub fn eq(self, rhs: Signal) -> Signal {
        self.cmp(CmpOp::Eq, rhs)
    }

    /// `self != rhs`.
    pub fn ne(self, rhs: Signal) -> Signal {
        self.cmp(CmpOp::Ne, rhs)
    }

    /// `self < rhs`.
    pub fn lt(self, rhs: Signal) -> Signal {
        self.cmp(CmpOp::Lt, rhs)
    }

    /// `self <= rhs`.
    pub fn le(self, rhs: Signal) -> Signal {
        self.cmp(CmpOp::Le, rhs)
    }

    /// `self > rhs`.
    pub fn gt(self, rhs: Signal) -> Signal {
        self.cmp(CmpOp::Gt, rhs)
    }

    /// `self >= rhs`.
    pub fn ge(self, rhs: Signal) -> Signal {
        self.cmp(CmpOp::Ge, rhs)
    }

    /// `self / rhs`. No native Rust operator is used for division: hardware
    /// division semantics are easy to confuse with Rust's integer division,
    /// so this is a named method rather than a `std::ops::Div` impl.
    pub fn div(self, rhs: Signal) -> Signal {
        self.binary(BinaryOp::Div, rhs)
    }

    /// `self % rhs`.
    pub fn rem(self, rhs: Signal) -> Signal {
        self.binary(BinaryOp::Mod, rhs)
    }

    /// `self ** rhs`.
    pub fn pow(self, rhs: Signal) -> Signal {
        self.binary(BinaryOp::Pow, rhs)
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl std::ops::$trait for Signal {
            type Output = Signal;
            #[track_caller]
            fn $method(self, rhs: Signal) -> Signal {
                self.binary($op, rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, BinaryOp::Add);
impl_binary_op!(Sub, sub, BinaryOp::Sub);
impl_binary_op!(Mul, mul, BinaryOp::Mul);
impl_binary_op!(BitAnd, bitand, BinaryOp::And);
impl_binary_op!(BitOr, bitor, BinaryOp::Or);
impl_binary_op!(BitXor, bitxor, BinaryOp::Xor);
impl_binary_op!(Shl, shl, BinaryOp::Shl);
impl_binary_op!(Shr, shr, BinaryOp::Shr);

impl std::ops::Not for Signal {
    type Output = Signal;
    #[track_caller]
    fn not(self) -> Signal {
        self.unary(UnaryOp::Not)
    }
}

impl std::ops::Neg for Signal {
    type Output = Signal;
    #[track_caller]
    fn neg(self) -> Signal {
        self.unary(UnaryOp::Neg)
    }
}

/// A handle to a block memory in the calling thread's design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Memory(ir::Memory);

impl Memory {
    /// Reads one word: `mem[idx]`.
    #[track_caller]
    pub fn index(self, idx: impl Into<SigArg>) -> Result<Signal, BuildError> {
        let codeloc = CodeLoc::capture();
        with_design(|d| self.0.index(d, idx, codeloc)).map(Signal)
    }
}

/// The clock edge a register or memory's writes are synchronized to.
#[derive(Debug, Clone, Copy)]
pub enum Edge {
    /// Rising-edge-triggered.
    Posedge(Signal),
    /// Falling-edge-triggered.
    Negedge(Signal),
}

impl Edge {
    fn into_ir(self) -> ir::Edge {
        match self {
            Edge::Posedge(s) => ir::Edge::Posedge(s.0),
            Edge::Negedge(s) => ir::Edge::Negedge(s.0),
        }
    }
}

/// Synchronization options for `add_reg`/`add_output`. At most one of
/// `posedge`/`negedge`/`async_feedback` may be given.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegOptions {
    /// Rising-edge clock to synchronize on.
    pub posedge: Option<Signal>,
    /// Falling-edge clock to synchronize on.
    pub negedge: Option<Signal>,
    /// Use `'bx` as the next-value default instead of the hold value.
    pub nodefault: bool,
    /// No clock edge; combinational feedback.
    pub async_feedback: bool,
}

impl RegOptions {
    fn into_ir(self) -> ir::RegOptions {
        ir::RegOptions {
            posedge: self.posedge.map(|s| s.0),
            negedge: self.negedge.map(|s| s.0),
            nodefault: self.nodefault,
            async_feedback: self.async_feedback,
        }
    }
}

/// A handle to a module in the calling thread's design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Module(ir::ModuleId);

impl Module {
    /// Looks up a signal declared in this module by name, independent of
    /// whichever module's context currently happens to be open.
    ///
    /// Prefer this over the implicit lookup [`sig`] performs when a builder
    /// helper might run while a different module's context is current.
    pub fn signal(self, name: &str) -> Result<Signal, BuildError> {
        with_design(|d| {
            let ident = d.intern(name);
            match d.module(self.0).find_signal(ident) {
                Some(id) => Ok(Signal(ir::Signal::InModule(self.0, id))),
                None => Err(BuildError::UnknownSignal {
                    module: d.resolve(d.module(self.0).name).to_string(),
                    name: name.to_string(),
                }),
            }
        })
    }
}

/// Declares a new module and runs `body` with it as the open context,
/// closing the context afterward regardless of whether `body` fails.
#[track_caller]
pub fn add_module(name: &str, body: impl FnOnce(Module) -> Result<(), BuildError>) -> Result<Module, BuildError> {
    let codeloc = CodeLoc::capture();
    let module = with_design(|d| d.add_module(name, codeloc))?;
    with_design(|d| d.push_module_context(module));
    let result = body(Module(module));
    with_design(|d| d.pop_context("add_module"))?;
    result?;
    Ok(Module(module))
}

/// Declares a plain input port in the currently open module.
#[track_caller]
pub fn add_input(name: &str, width: i32) -> Result<Signal, BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::add_input(d, name, width, codeloc)).map(Signal)
}

/// Declares an output port, optionally wearing register synchronization.
#[track_caller]
pub fn add_output(name: &str, width: i32, options: RegOptions) -> Result<Signal, BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::add_output(d, name, width, options.into_ir(), codeloc)).map(Signal)
}

/// Declares a register, dispatching to `add_ff`/`add_async` per `options`.
#[track_caller]
pub fn add_reg(name: &str, width: i32, options: RegOptions) -> Result<Signal, BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::add_reg(d, name, width, options.into_ir(), codeloc)).map(Signal)
}

/// Attaches an edge-triggered synchronization element to an unsynchronized
/// register declared by [`add_reg`] with no `posedge`/`negedge`/
/// `async_feedback` option.
#[track_caller]
pub fn add_ff(sig: Signal, edge: Edge, nodefault: bool) -> Result<(), BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::add_ff(d, sig.0, edge.into_ir(), nodefault, codeloc))
}

/// Attaches a combinational-feedback synchronization element to an
/// unsynchronized register.
#[track_caller]
pub fn add_async(sig: Signal, nodefault: bool) -> Result<(), BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::add_async(d, sig.0, nodefault, codeloc))
}

/// Declares a block memory in the currently open module.
#[track_caller]
pub fn add_memory(name: &str, width: i32, depth: u32, edge: Edge) -> Result<Memory, BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::add_memory(d, name, width, depth, edge.into_ir(), codeloc)).map(Memory)
}

/// A member of a [`Bundle`]: a leaf signal, a leaf memory, or a nested
/// bundle.
#[derive(Debug, Clone)]
pub enum BundleMember {
    /// A leaf signal.
    Signal(Signal),
    /// A nested bundle.
    Bundle(Bundle),
    /// A leaf memory.
    Memory(Memory),
}

impl From<ir::BundleMember> for BundleMember {
    fn from(m: ir::BundleMember) -> Self {
        match m {
            ir::BundleMember::Signal(s) => BundleMember::Signal(Signal(s)),
            ir::BundleMember::Bundle(b) => BundleMember::Bundle(Bundle(b)),
            ir::BundleMember::Memory(m) => BundleMember::Memory(Memory(m)),
        }
    }
}

/// An ordered, named tree of signals and sub-bundles: a module's own ports,
/// a submodule instance's port bundle, or a bus master/slave pair.
#[derive(Debug, Clone, Default)]
pub struct Bundle(ir::Bundle);

impl From<ir::Bundle> for Bundle {
    fn from(b: ir::Bundle) -> Self {
        Bundle(b)
    }
}

impl Bundle {
    /// The number of direct members.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this bundle has no members.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Looks up a member by name.
    pub fn get(&self, name: &str) -> Option<BundleMember> {
        with_design(|d| {
            let ident = d.intern(name);
            self.0.get(ident).cloned().map(BundleMember::from)
        })
    }

    /// The subset of members (recursively) whose leaf signals are
    /// registers.
    pub fn regs(&self) -> Bundle {
        with_design_ref(|d| Bundle(self.0.regs(d)))
    }

    /// The subset of members (recursively) whose leaf signals are not
    /// registers.
    pub fn nonregs(&self) -> Bundle {
        with_design_ref(|d| Bundle(self.0.nonregs(d)))
    }

    /// Broadcasts an index/slice operation across every leaf signal,
    /// recursively.
    #[track_caller]
    pub fn index(&self, index: IndexArg) -> Result<Bundle, BuildError> {
        let codeloc = CodeLoc::capture();
        with_design(|d| self.0.index(d, index, codeloc)).map(Bundle)
    }

    /// The settable-property sugar for `assign_bundle(self, rhs)`.
    #[track_caller]
    pub fn set_next(&self, rhs: &Bundle) -> Result<(), BuildError> {
        assign_bundle(self, rhs)
    }
}

/// Applies `interface` directly to the currently open module, producing its
/// port bundle.
#[track_caller]
pub fn add_port(name: &str, interface: Interface, role: Role) -> Result<Bundle, BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::add_port(d, name, interface, role, codeloc)).map(Bundle)
}

/// Instantiates `interface` as a submodule instance's port bundle and
/// records the instance.
#[track_caller]
pub fn add_inst(inst_name: &str, interface: Interface, type_name: &str) -> Result<Bundle, BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::add_inst(d, inst_name, interface, type_name, codeloc)).map(Bundle)
}

/// Declares a memory whose word layout is described by an interface.
#[track_caller]
pub fn add_memory_with_interface(
    name: &str,
    interface: Interface,
    depth: u32,
    edge: Edge,
) -> Result<Bundle, BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::add_memory_with_interface(d, name, interface, depth, edge.into_ir(), codeloc)).map(Bundle)
}

/// Builds a ready/valid streaming interface: `data`/`valid` (and optionally
/// `last`/`dest`) flow from master to slave; `ready` flows the other way.
#[track_caller]
pub fn stream(data_width: i32, options: StreamOptions) -> Interface {
    let codeloc = CodeLoc::capture();
    ir::stream(data_width, options, codeloc)
}

/// A value `connect` accepts: a plain signal or a bundle of signals.
#[derive(Debug, Clone)]
pub enum ConnectItem {
    /// A single signal.
    Signal(Signal),
    /// A bundle, connected member-wise.
    Bundle(Bundle),
}

impl From<Signal> for ConnectItem {
    fn from(s: Signal) -> Self {
        ConnectItem::Signal(s)
    }
}

impl From<Bundle> for ConnectItem {
    fn from(b: Bundle) -> Self {
        ConnectItem::Bundle(b)
    }
}

/// Connects a set of plain signals: exactly one must be a valid master, and
/// every other becomes an alias driven by it.
#[track_caller]
pub fn connect_signals(sigs: &[Signal]) -> Result<(), BuildError> {
    let codeloc = CodeLoc::capture();
    let sigs: Vec<ir::Signal> = sigs.iter().map(|s| s.0).collect();
    with_design(|d| ir::connect_signals(d, &sigs, codeloc))
}

/// Connects signals or parallel bundles, recursively zipping bundles by
/// member name.
#[track_caller]
pub fn connect(items: &[ConnectItem]) -> Result<(), BuildError> {
    let codeloc = CodeLoc::capture();
    let items: Vec<ir::Connectable> = items
        .iter()
        .map(|item| match item {
            ConnectItem::Signal(s) => ir::Connectable::Signal(s.0),
            ConnectItem::Bundle(b) => ir::Connectable::Bundle(b.0.clone()),
        })
        .collect();
    with_design(|d| ir::connect(d, &items, codeloc))
}

/// Drives `lhs` with `rhs`: a plain assignment, or an auto-write-enabled
/// memory-element write if `lhs` is a memory read target.
#[track_caller]
pub fn assign(lhs: Signal, rhs: impl Into<SigArg>) -> Result<(), BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::assign(d, lhs.0, rhs, codeloc))
}

/// Recursively assigns a bundle member-wise; both bundles must share an
/// identical shape.
#[track_caller]
pub fn assign_bundle(lhs: &Bundle, rhs: &Bundle) -> Result<(), BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::assign_bundle(d, &lhs.0, &rhs.0, codeloc))
}

/// Builds a ternary mux expression signal: `cond ? if_true : if_false`.
#[track_caller]
pub fn cond(condition: impl Into<SigArg>, if_true: impl Into<SigArg>, if_false: impl Into<SigArg>) -> Result<Signal, BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::cond(d, condition, if_true, if_false, codeloc)).map(Signal)
}

/// Concatenates signals MSB-first into one unsigned signal.
#[track_caller]
pub fn concat(parts: &[Signal]) -> Result<Signal, BuildError> {
    let codeloc = CodeLoc::capture();
    let parts: Vec<SigArg> = parts.iter().map(|s| SigArg::Signal(s.0)).collect();
    with_design(|d| ir::concat(d, &parts, codeloc)).map(Signal)
}

/// Repeats a signal `n` times (Verilog's replication operator).
#[track_caller]
pub fn repeat(n: u32, a: Signal) -> Result<Signal, BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::repeat(d, n, a.0, codeloc)).map(Signal)
}

/// Looks up a signal by name in the currently open module.
///
/// Resolves against whichever module's context happens to be open, which
/// can silently resolve against the wrong module if called from a nested
/// builder helper invoked while a different module's context is current;
/// callers that need a specific module regardless of what is currently open
/// should use [`Module::signal`] instead.
#[track_caller]
pub fn sig(name: &str) -> Result<Signal, BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::sig(d, SigArg::Name(name.to_string()), codeloc)).map(Signal)
}

/// Builds a constant literal signal. `width` follows the usual convention:
/// negative encodes `(-width)`-bit signed, positive encodes `width`-bit
/// unsigned.
#[track_caller]
pub fn sig_int(value: i64, width: i32) -> Signal {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::sig_int(d, value, width, codeloc)).into()
}

/// Opens an `if (cond) begin ... end`, running `body` with no design borrow
/// held so it may freely call further free functions in this crate.
#[track_caller]
pub fn if_block<T>(
    condition: impl Into<SigArg>,
    body: impl FnOnce() -> Result<T, BuildError>,
) -> Result<T, BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::open_if(d, condition, codeloc))?;
    let result = body();
    with_design(ir::close_if)?;
    result
}

/// Opens an `else if (cond) begin ... end`, valid only after an [`if_block`]
/// or another [`else_if_block`] with no intervening [`else_block`].
#[track_caller]
pub fn else_if_block<T>(
    condition: impl Into<SigArg>,
    body: impl FnOnce() -> Result<T, BuildError>,
) -> Result<T, BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::open_else_if(d, condition, codeloc))?;
    let result = body();
    with_design(ir::close_else_if)?;
    result
}

/// Opens a trailing `else begin ... end`, closing the chain: no further
/// `else_if_block`/`else_block` can follow.
#[track_caller]
pub fn else_block<T>(body: impl FnOnce() -> Result<T, BuildError>) -> Result<T, BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::open_else(d, codeloc))?;
    let result = body();
    with_design(ir::close_else)?;
    result
}

/// Opens a `case (expr) ... endcase`, running `body` (which opens
/// `case_block`/`default_block` arms) with no design borrow held.
#[track_caller]
pub fn switch_block<T>(
    expr: impl Into<SigArg>,
    options: SwitchOptions,
    body: impl FnOnce() -> Result<T, BuildError>,
) -> Result<T, BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::open_switch(d, expr, options, codeloc))?;
    let result = body();
    with_design(ir::close_switch)?;
    result
}

/// Opens a `value: begin ... end` arm inside an open [`switch_block`].
#[track_caller]
pub fn case_block<T>(value: impl Into<SigArg>, body: impl FnOnce() -> Result<T, BuildError>) -> Result<T, BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::open_case(d, value, codeloc))?;
    let result = body();
    with_design(ir::close_case)?;
    result
}

/// Opens a `default: begin ... end` arm inside an open [`switch_block`].
#[track_caller]
pub fn default_block<T>(body: impl FnOnce() -> Result<T, BuildError>) -> Result<T, BuildError> {
    let codeloc = CodeLoc::capture();
    with_design(|d| ir::open_default(d, codeloc))?;
    let result = body();
    with_design(ir::close_default)?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reset() {
        let _ = reset_design();
    }

    #[test]
    fn add_input_roundtrips_through_module_signal() {
        reset();
        add_module("m", |m| {
            add_input("clk", 1)?;
            let clk = m.signal("clk").unwrap();
            assert_eq!(clk.width(), 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn operator_sugar_builds_expression_signal() {
        reset();
        add_module("m", |_m| {
            let a = add_input("a", 8)?;
            let b = add_input("b", 8)?;
            let sum = a + b;
            assert_eq!(sum.width(), 8);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn nested_if_else_does_not_panic_on_reentrant_borrow() {
        reset();
        add_module("m", |_m| {
            let clk = add_input("clk", 1)?;
            let sel = add_input("sel", 1)?;
            let r = add_reg(
                "r",
                1,
                RegOptions {
                    posedge: Some(clk),
                    ..Default::default()
                },
            )?;
            if_block(sel, || {
                if_block(sel, || r.set_next(sel))?;
                Ok(())
            })?;
            else_block(|| r.set_next(sel))?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn unknown_module_signal_is_reported() {
        reset();
        add_module("m", |m| {
            let err = m.signal("nope").unwrap_err();
            assert!(matches!(err, BuildError::UnknownSignal { .. }));
            Ok(())
        })
        .unwrap();
    }
}
