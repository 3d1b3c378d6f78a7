//! Signals: typed bit-vectors, the expressions built from them, and the
//! rules that propagate their width and signedness.

use rtlgen_common::{BuildError, CodeLoc, Ident};

use crate::design::Design;
use crate::ids::{MemoryId, ModuleId, SignalId};

/// A handle to a signal: either a module-owned signal, or a module-less
/// constant literal.
///
/// Mirrors the grounding source's literals, which carry `module=None` and
/// are never registered in any module's signal table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// A constant literal, owned by no module.
    Const(crate::ids::ConstId),
    /// A signal owned by a specific module.
    InModule(ModuleId, SignalId),
}

/// The stored record for a signal: everything about it except the handle
/// used to refer to it.
#[derive(Debug, Clone)]
pub struct SignalData {
    /// The signal's name (an auto-name for derived/anonymous signals).
    pub name: Ident,
    /// Width in bits.
    pub width: u32,
    /// Whether arithmetic on this signal is signed.
    pub signed: bool,
    /// The Verilog text used when this signal appears as an expression
    /// operand. Always populated at construction.
    pub vlog_rvalue: Option<String>,
    /// The Verilog text used when this signal appears as an assignment
    /// target. `None` for signals that cannot be assigned to (pure
    /// expression results).
    pub vlog_lvalue: Option<String>,
    /// Declared as a module input port.
    pub inport: bool,
    /// Declared as a module output port.
    pub outport: bool,
    /// Declared as a register (clocked storage element).
    pub register: bool,
    /// Whether a register has received its `AddFF`/`AddAsync`
    /// synchronization element.
    pub regaction: bool,
    /// Whether this signal must be declared with Verilog `reg` (as opposed
    /// to `wire`).
    pub vlog_reg: bool,
    /// Whether this signal must be declared/emitted at all (referenced
    /// signals are marked transitively; unreferenced intermediate
    /// temporaries are dropped at emission time).
    pub materialize: bool,
    /// Whether this signal (or, for a derived lvalue, its underlying base)
    /// has received at least one `Assign`.
    pub gotassign: bool,
    /// An alternate name this signal is connected to one level up through
    /// (a submodule port aliasing a parent signal).
    pub portalias: Option<Ident>,
    /// The memory this signal reads from, if it is a memory read result.
    pub memory: Option<MemoryId>,
    /// The signals this one was derived from, for transitive `materialize`
    /// and `gotassign` propagation (e.g. a bit-slice's base signal).
    pub deps: Vec<Signal>,
    /// Where this signal was declared or derived.
    pub codeloc: CodeLoc,
}

impl SignalData {
    pub(crate) fn plain(name: Ident, width: u32, signed: bool, rvalue: String, codeloc: CodeLoc) -> Self {
        Self {
            name,
            width,
            signed,
            vlog_rvalue: Some(rvalue),
            vlog_lvalue: None,
            inport: false,
            outport: false,
            register: false,
            regaction: false,
            vlog_reg: false,
            materialize: false,
            gotassign: false,
            portalias: None,
            memory: None,
            deps: Vec::new(),
            codeloc,
        }
    }
}

/// An index or part-select operand: either a literal constant or a
/// variable signal.
#[derive(Debug, Clone, Copy)]
pub enum IndexOperand {
    /// A compile-time-constant offset.
    Const(i64),
    /// A runtime-computed offset.
    Signal(Signal),
}

/// The shape of an indexing/slicing operation applied to a signal or a
/// bundle's leaves.
#[derive(Debug, Clone, Copy)]
pub enum IndexArg {
    /// A single bit, selected by a constant index.
    Bit(i64),
    /// A single bit, selected by a runtime index (`sig[idx]`).
    BitSignal(Signal),
    /// An inclusive constant range `hi:lo` (`sig[hi:lo]`).
    Range(i64, i64),
    /// A variable-base indexed part-select. The width's sign selects the
    /// direction of the part-select operator: positive for `+:`, negative
    /// for `-:` (the declared width is `abs(width)`), mirroring the
    /// grounding source's signed-width tuple-index convention.
    Indexed(IndexOperand, i32),
}

/// A value accepted everywhere a `Sig()`-style coercion is needed: an
/// existing signal, a name to look up in the current module, an integer
/// literal, or a list of parts to concatenate.
#[derive(Debug, Clone)]
pub enum SigArg {
    /// An already-built signal, passed through unchanged.
    Signal(Signal),
    /// A name looked up in the currently open module.
    Name(String),
    /// A 32-bit signed integer literal.
    Int(i64),
    /// A concatenation of further coercible parts, MSB first.
    Concat(Vec<SigArg>),
}

impl From<Signal> for SigArg {
    fn from(s: Signal) -> Self {
        SigArg::Signal(s)
    }
}

impl From<&Signal> for SigArg {
    fn from(s: &Signal) -> Self {
        SigArg::Signal(*s)
    }
}

impl From<i64> for SigArg {
    fn from(v: i64) -> Self {
        SigArg::Int(v)
    }
}

impl From<i32> for SigArg {
    fn from(v: i32) -> Self {
        SigArg::Int(v as i64)
    }
}

impl From<&str> for SigArg {
    fn from(s: &str) -> Self {
        SigArg::Name(s.to_string())
    }
}

impl From<String> for SigArg {
    fn from(s: String) -> Self {
        SigArg::Name(s)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Bitwise complement.
    Not,
    /// Reduction AND (`&sig`).
    ReduceAnd,
    /// Reduction OR (`|sig`).
    ReduceOr,
    /// Reduction XOR (`^sig`).
    ReduceXor,
}

impl UnaryOp {
    fn vlog_text(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "~",
            UnaryOp::ReduceAnd => "&",
            UnaryOp::ReduceOr => "|",
            UnaryOp::ReduceXor => "^",
        }
    }

    fn is_reduction(self) -> bool {
        matches!(self, UnaryOp::ReduceAnd | UnaryOp::ReduceOr | UnaryOp::ReduceXor)
    }
}

/// Binary operators. `Shl`/`Shr` take their result width from the left
/// operand alone; every other operator takes the max of both widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `**`
    Pow,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
    /// `<<<` (arithmetic-aware left shift)
    Shl,
    /// `>>>` (arithmetic-aware right shift)
    Shr,
}

impl BinaryOp {
    fn vlog_text(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<<",
            BinaryOp::Shr => ">>>",
        }
    }

    fn left_width_only(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }
}

/// Comparison operators. Always produce a 1-bit unsigned result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CmpOp {
    fn vlog_text(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

fn sized_literal_text(width: u32, signed: bool, value: i64) -> String {
    let mask: u128 = if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    };
    let masked = (value as i128 as u128) & mask;
    format!("{}'{}d{}", width, if signed { "s" } else { "" }, masked)
}

/// Builds a constant literal signal. `width` follows the grounding
/// source's convention: negative encodes `(-width)`-bit signed, positive
/// encodes `width`-bit unsigned.
pub fn sig_int(design: &mut Design, value: i64, width: i32, codeloc: CodeLoc) -> Signal {
    let (w, signed) = if width < 0 {
        ((-width) as u32, true)
    } else {
        (width as u32, false)
    };
    let text = sized_literal_text(w, signed, value);
    let name = design.intern(&text);
    let mut data = SignalData::plain(name, w, signed, text, codeloc);
    data.materialize = true;
    data.gotassign = true;
    design.alloc_const(data)
}

fn declare_named(
    design: &mut Design,
    module: ModuleId,
    name: &str,
    width: u32,
    signed: bool,
    codeloc: CodeLoc,
) -> Result<Signal, BuildError> {
    let ident = design.intern(name);
    let rvalue = name.to_string();
    let mut data = SignalData::plain(ident, width, signed, rvalue, codeloc);
    data.vlog_lvalue = Some(name.to_string());
    design.declare_signal(module, ident, data)
}

/// Declares a plain internal wire (used by `AddReg`'s underlying storage
/// and by any anonymous combinational temporary that must be addressable
/// by name).
pub fn declare_wire(
    design: &mut Design,
    module: ModuleId,
    name: Option<&str>,
    width: u32,
    signed: bool,
    codeloc: CodeLoc,
) -> Result<Signal, BuildError> {
    match name {
        Some(n) => declare_named(design, module, n, width, signed, codeloc),
        None => {
            let auto = design.auto_name();
            let rvalue = design.resolve(auto).to_string();
            let mut data = SignalData::plain(auto, width, signed, rvalue.clone(), codeloc);
            data.vlog_lvalue = Some(rvalue);
            design.declare_signal(module, auto, data)
        }
    }
}

fn infer_module(
    design: &Design,
    candidates: &[Option<ModuleId>],
    function: &'static str,
) -> Result<ModuleId, BuildError> {
    let mut distinct: Vec<ModuleId> = Vec::new();
    for c in candidates.iter().flatten() {
        if !distinct.contains(c) {
            distinct.push(*c);
        }
    }
    match distinct.len() {
        0 => design.current_module(function),
        1 => Ok(distinct[0]),
        _ => {
            let a = design.resolve(design.module(distinct[0]).name).to_string();
            let b = design.resolve(design.module(distinct[1]).name).to_string();
            Err(BuildError::CrossModuleOperands { a, b })
        }
    }
}

/// The text used to reference `sig` as an operand inside a larger
/// expression: always its own name, never its (possibly composite) rvalue.
/// Mirrors the grounding source building every operator's text from
/// `operand.name`, never `operand.vlog_rvalue` — each derived signal gets
/// its own `assign <name> = <rvalue>;` declaration at emission time, and
/// everything downstream refers to it by that one name.
pub(crate) fn name_of(design: &Design, sig: Signal) -> String {
    design.resolve(design.signal_data(sig).name).to_string()
}

/// Same text as [`name_of`], spelled differently for call sites that
/// reference a signal as a condition or case value (`if (<rvalue_of cond>)`)
/// rather than as an expression operand — both ultimately read a signal back
/// by its own name, never its composite rvalue.
pub(crate) fn rvalue_of(design: &Design, sig: Signal) -> String {
    name_of(design, sig)
}

fn coerced_module(design: &Design, sig: Signal) -> Option<ModuleId> {
    design.module_of(sig)
}

fn new_derived(
    design: &mut Design,
    module: ModuleId,
    width: u32,
    signed: bool,
    rvalue: String,
    deps: Vec<Signal>,
    codeloc: CodeLoc,
) -> Result<Signal, BuildError> {
    let auto = design.auto_name();
    let mut data = SignalData::plain(auto, width, signed, rvalue, codeloc);
    data.deps = deps;
    design.declare_signal(module, auto, data)
}

/// Builds a unary expression signal.
pub fn unary_op(
    design: &mut Design,
    op: UnaryOp,
    a: impl Into<SigArg>,
    codeloc: CodeLoc,
) -> Result<Signal, BuildError> {
    let a = sig(design, a.into(), codeloc)?;
    let module = infer_module(design, &[coerced_module(design, a)], "unary operator")?;
    let a_data_width = design.signal_data(a).width;
    let a_data_signed = design.signal_data(a).signed;
    let (width, signed) = if op.is_reduction() {
        (1, false)
    } else {
        (a_data_width, a_data_signed)
    };
    let rvalue = format!("({}{})", op.vlog_text(), name_of(design, a));
    new_derived(design, module, width, signed, rvalue, vec![a], codeloc)
}

/// Builds a binary expression signal.
pub fn binary_op(
    design: &mut Design,
    op: BinaryOp,
    a: impl Into<SigArg>,
    b: impl Into<SigArg>,
    codeloc: CodeLoc,
) -> Result<Signal, BuildError> {
    let a = sig(design, a.into(), codeloc)?;
    let b = sig(design, b.into(), codeloc)?;
    let module = infer_module(
        design,
        &[coerced_module(design, a), coerced_module(design, b)],
        "binary operator",
    )?;
    let aw = design.signal_data(a).width;
    let bw = design.signal_data(b).width;
    let width = if op.left_width_only() { aw } else { aw.max(bw) };
    let signed = if op.left_width_only() {
        design.signal_data(a).signed
    } else {
        design.signal_data(a).signed && design.signal_data(b).signed
    };
    let rvalue = format!(
        "({} {} {})",
        name_of(design, a),
        op.vlog_text(),
        name_of(design, b)
    );
    new_derived(design, module, width, signed, rvalue, vec![a, b], codeloc)
}

/// Builds a comparison expression signal (always 1-bit, unsigned).
pub fn cmp_op(
    design: &mut Design,
    op: CmpOp,
    a: impl Into<SigArg>,
    b: impl Into<SigArg>,
    codeloc: CodeLoc,
) -> Result<Signal, BuildError> {
    let a = sig(design, a.into(), codeloc)?;
    let b = sig(design, b.into(), codeloc)?;
    let module = infer_module(
        design,
        &[coerced_module(design, a), coerced_module(design, b)],
        "comparison operator",
    )?;
    let rvalue = format!(
        "({} {} {})",
        name_of(design, a),
        op.vlog_text(),
        name_of(design, b)
    );
    new_derived(design, module, 1, false, rvalue, vec![a, b], codeloc)
}

/// Builds a ternary mux expression signal: `cond ? if_true : if_false`.
pub fn cond(
    design: &mut Design,
    condition: impl Into<SigArg>,
    if_true: impl Into<SigArg>,
    if_false: impl Into<SigArg>,
    codeloc: CodeLoc,
) -> Result<Signal, BuildError> {
    let c = sig(design, condition.into(), codeloc)?;
    let t = sig(design, if_true.into(), codeloc)?;
    let f = sig(design, if_false.into(), codeloc)?;
    let module = infer_module(
        design,
        &[
            coerced_module(design, c),
            coerced_module(design, t),
            coerced_module(design, f),
        ],
        "Cond",
    )?;
    let tw = design.signal_data(t).width;
    let fw = design.signal_data(f).width;
    let signed = design.signal_data(t).signed && design.signal_data(f).signed;
    let rvalue = format!(
        "({} ? {} : {})",
        name_of(design, c),
        name_of(design, t),
        name_of(design, f)
    );
    new_derived(design, module, tw.max(fw), signed, rvalue, vec![c, t, f], codeloc)
}

/// Concatenates signals MSB-first into one unsigned signal.
///
/// Module inference here does not go through [`infer_module`]: an open
/// context's module wins outright over the operands, and only falls back to
/// an operand's module when no context is open, matching the grounding
/// source's `Concat` (which checks `tls.ChipyCurrentContext` first and only
/// adopts the first operand's module as a fallback).
pub fn concat(design: &mut Design, parts: &[SigArg], codeloc: CodeLoc) -> Result<Signal, BuildError> {
    let resolved: Vec<Signal> = parts
        .iter()
        .map(|p| sig(design, p.clone(), codeloc))
        .collect::<Result<_, _>>()?;

    let mut module: Option<ModuleId> = design.context_stack.last().map(|f| f.module);
    let mut width = 0u32;
    let mut rvalue_parts = Vec::with_capacity(resolved.len());
    let mut lvalue_parts: Option<Vec<String>> = Some(Vec::with_capacity(resolved.len()));
    for s in &resolved {
        if let Some(sm) = coerced_module(design, *s) {
            match module {
                None => module = Some(sm),
                Some(existing) if existing != sm => {
                    let a = design.resolve(design.module(existing).name).to_string();
                    let b = design.resolve(design.module(sm).name).to_string();
                    return Err(BuildError::CrossModuleOperands { a, b });
                }
                _ => {}
            }
        }
        let data = design.signal_data(*s);
        width += data.width;
        rvalue_parts.push(name_of(design, *s));
        match (&mut lvalue_parts, &design.signal_data(*s).vlog_lvalue) {
            (Some(v), Some(lv)) => v.push(lv.clone()),
            (Some(_), None) => lvalue_parts = None,
            (None, _) => {}
        }
    }
    let module = match module {
        Some(m) => m,
        None => design.current_module("Concat")?,
    };

    let rvalue = format!("{{{}}}", rvalue_parts.join(", "));
    let auto = design.auto_name();
    let mut data = SignalData::plain(auto, width, false, rvalue, codeloc);
    data.deps = resolved.clone();
    if let Some(lvs) = lvalue_parts {
        data.vlog_lvalue = Some(format!("{{{}}}", lvs.join(", ")));
    }
    design.declare_signal(module, auto, data)
}

/// Repeats a signal `n` times (Verilog's replication operator).
pub fn repeat(design: &mut Design, n: u32, a: impl Into<SigArg>, codeloc: CodeLoc) -> Result<Signal, BuildError> {
    let a = sig(design, a.into(), codeloc)?;
    let module = infer_module(design, &[coerced_module(design, a)], "Repeat")?;
    let width = n * design.signal_data(a).width;
    let rvalue = format!("{{{}{{{}}}}}", n, name_of(design, a));
    new_derived(design, module, width, false, rvalue, vec![a], codeloc)
}

/// Coerces a [`SigArg`] into a concrete [`Signal`], the shared entry point
/// every builder function funnels its operands through.
pub fn sig(design: &mut Design, arg: SigArg, codeloc: CodeLoc) -> Result<Signal, BuildError> {
    match arg {
        SigArg::Signal(s) => Ok(s),
        SigArg::Int(v) => Ok(sig_int(design, v, -32, codeloc)),
        SigArg::Concat(parts) => concat(design, &parts, codeloc),
        SigArg::Name(name) => {
            let module = design.current_module("Sig")?;
            let ident = design.intern(&name);
            match design.module(module).find_signal(ident) {
                Some(id) => Ok(Signal::InModule(module, id)),
                None => {
                    let module_name = design.resolve(design.module(module).name).to_string();
                    Err(BuildError::UnknownSignal {
                        module: module_name,
                        name,
                    })
                }
            }
        }
    }
}

/// Coerces and materializes a value in one step: the pattern every
/// procedural block and `Assign` applies to a condition/expression before
/// emitting Verilog text for it.
pub(crate) fn set_materialize_and_sig(
    design: &mut Design,
    arg: SigArg,
    codeloc: CodeLoc,
) -> Result<Signal, BuildError> {
    let s = sig(design, arg, codeloc)?;
    design.set_materialize(s);
    Ok(s)
}

/// Re-wraps an existing signal with a forced width/signedness, as in the
/// grounding source's `Sig(sig, width)` overload. Requires an open context
/// when `sig` is a module-less constant, since the result is a fresh named
/// signal and must belong to some module.
pub fn sig_with_width(
    design: &mut Design,
    source: Signal,
    width: i32,
    codeloc: CodeLoc,
) -> Result<Signal, BuildError> {
    let (w, signed) = if width < 0 {
        ((-width) as u32, true)
    } else {
        (width as u32, false)
    };
    let module = infer_module(design, &[coerced_module(design, source)], "Sig")?;
    let rvalue = name_of(design, source);
    new_derived(design, module, w, signed, rvalue, vec![source], codeloc)
}

impl Signal {
    /// Applies an index or slice operation, producing a new signal whose
    /// lvalue-ness (if any) derives from the base signal.
    pub fn index(self, design: &mut Design, index: IndexArg, codeloc: CodeLoc) -> Result<Signal, BuildError> {
        let base_data = design.signal_data(self);
        let base_name = design.resolve(base_data.name).to_string();
        let base_lvalue = base_data.vlog_lvalue.clone();
        let base_rvalue = name_of(design, self);
        let module = coerced_module(design, self);
        let module = match module {
            Some(m) => m,
            None => design.current_module("index")?,
        };

        let (width, rvalue_suffix, lvalue_suffix) = match index {
            IndexArg::Bit(i) => (1u32, format!("[{i}]"), format!("[{i}]")),
            IndexArg::BitSignal(idx) => {
                let idx_text = name_of(design, idx);
                (1u32, format!("[{idx_text}]"), format!("[{idx_text}]"))
            }
            IndexArg::Range(hi, lo) => {
                if hi < lo {
                    return Err(BuildError::UnsupportedIndex {
                        name: base_name.clone(),
                        detail: format!("slice hi ({hi}) below lo ({lo})"),
                    });
                }
                let width = (hi - lo + 1) as u32;
                (width, format!("[{hi}:{lo}]"), format!("[{hi}:{lo}]"))
            }
            IndexArg::Indexed(operand, signed_width) => {
                let updown = if signed_width >= 0 { '+' } else { '-' };
                let width = signed_width.unsigned_abs();
                let base_text = match operand {
                    IndexOperand::Const(c) => c.to_string(),
                    IndexOperand::Signal(s) => {
                        design.set_materialize(s);
                        name_of(design, s)
                    }
                };
                let suffix = format!("[{base_text} {updown}: {width}]");
                (width, suffix.clone(), suffix)
            }
        };

        let rvalue = format!("{base_rvalue}{rvalue_suffix}");
        // The lvalue prefix is the base's own lvalue text (e.g. a
        // register's `__next__name`), not its bare name: slicing a
        // register must slice its next-value shadow wire.
        let lvalue = base_lvalue.map(|lv| format!("{lv}{lvalue_suffix}"));

        // Indexing a memory-read result does not chain dependencies through
        // the read itself (it carries no assignable state of its own); only
        // a direct signal's index feeds back into its base for transitive
        // materialize/gotassign propagation.
        let deps = if base_data.memory.is_some() { Vec::new() } else { vec![self] };

        let auto = design.auto_name();
        let mut data = SignalData::plain(auto, width, false, rvalue, codeloc);
        data.vlog_lvalue = lvalue;
        data.deps = deps;
        design.declare_signal(module, auto, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Design, ModuleId) {
        let mut d = Design::new();
        let m = d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.context_stack.push(crate::design::ContextFrame {
            module: m,
            snippet: None,
        });
        (d, m)
    }

    #[test]
    fn literal_text_masks_to_width() {
        let mut d = Design::new();
        let s = sig_int(&mut d, -1, 4, CodeLoc::UNKNOWN);
        assert_eq!(d.signal_data(s).vlog_rvalue.as_deref(), Some("4'd15"));
    }

    #[test]
    fn signed_literal_text() {
        let mut d = Design::new();
        let s = sig_int(&mut d, 3, -8, CodeLoc::UNKNOWN);
        assert_eq!(d.signal_data(s).width, 8);
        assert!(d.signal_data(s).signed);
    }

    #[test]
    fn binary_op_width_is_max_of_operands() {
        let (mut d, m) = setup();
        let a = declare_wire(&mut d, m, Some("a"), 4, false, CodeLoc::UNKNOWN).unwrap();
        let b = declare_wire(&mut d, m, Some("b"), 8, false, CodeLoc::UNKNOWN).unwrap();
        let r = binary_op(&mut d, BinaryOp::Add, a, b, CodeLoc::UNKNOWN).unwrap();
        assert_eq!(d.signal_data(r).width, 8);
    }

    #[test]
    fn shift_width_is_left_operand_only() {
        let (mut d, m) = setup();
        let a = declare_wire(&mut d, m, Some("a"), 4, false, CodeLoc::UNKNOWN).unwrap();
        let b = declare_wire(&mut d, m, Some("b"), 32, false, CodeLoc::UNKNOWN).unwrap();
        let r = binary_op(&mut d, BinaryOp::Shl, a, b, CodeLoc::UNKNOWN).unwrap();
        assert_eq!(d.signal_data(r).width, 4);
    }

    #[test]
    fn shift_signedness_follows_left_operand_only() {
        let (mut d, m) = setup();
        let a = declare_wire(&mut d, m, Some("a"), 4, true, CodeLoc::UNKNOWN).unwrap();
        let b = declare_wire(&mut d, m, Some("b"), 32, false, CodeLoc::UNKNOWN).unwrap();
        let r = binary_op(&mut d, BinaryOp::Shl, a, b, CodeLoc::UNKNOWN).unwrap();
        assert!(d.signal_data(r).signed, "a signed left operand should keep the shift result signed");
    }

    #[test]
    fn cmp_is_always_one_bit_unsigned() {
        let (mut d, m) = setup();
        let a = declare_wire(&mut d, m, Some("a"), 16, true, CodeLoc::UNKNOWN).unwrap();
        let b = declare_wire(&mut d, m, Some("b"), 16, true, CodeLoc::UNKNOWN).unwrap();
        let r = cmp_op(&mut d, CmpOp::Lt, a, b, CodeLoc::UNKNOWN).unwrap();
        assert_eq!(d.signal_data(r).width, 1);
        assert!(!d.signal_data(r).signed);
    }

    #[test]
    fn cross_module_operands_rejected() {
        let mut d = Design::new();
        let m1 = d.add_module("m1", CodeLoc::UNKNOWN).unwrap();
        let m2 = d.add_module("m2", CodeLoc::UNKNOWN).unwrap();
        let a = declare_wire(&mut d, m1, Some("a"), 4, false, CodeLoc::UNKNOWN).unwrap();
        let b = declare_wire(&mut d, m2, Some("b"), 4, false, CodeLoc::UNKNOWN).unwrap();
        let err = binary_op(&mut d, BinaryOp::Add, a, b, CodeLoc::UNKNOWN).unwrap_err();
        assert!(matches!(err, BuildError::CrossModuleOperands { .. }));
    }

    #[test]
    fn concat_sums_widths_and_is_unsigned() {
        let (mut d, m) = setup();
        let a = declare_wire(&mut d, m, Some("a"), 4, true, CodeLoc::UNKNOWN).unwrap();
        let b = declare_wire(&mut d, m, Some("b"), 8, true, CodeLoc::UNKNOWN).unwrap();
        let r = concat(&mut d, &[SigArg::Signal(a), SigArg::Signal(b)], CodeLoc::UNKNOWN).unwrap();
        assert_eq!(d.signal_data(r).width, 12);
        assert!(!d.signal_data(r).signed);
    }

    #[test]
    fn repeat_multiplies_width() {
        let (mut d, m) = setup();
        let a = declare_wire(&mut d, m, Some("a"), 3, false, CodeLoc::UNKNOWN).unwrap();
        let r = repeat(&mut d, 4, a, CodeLoc::UNKNOWN).unwrap();
        assert_eq!(d.signal_data(r).width, 12);
    }

    #[test]
    fn literal_without_open_context_still_succeeds() {
        // Plain literals never need a module, open context or not.
        let mut d = Design::new();
        let _ = sig_int(&mut d, 1, 1, CodeLoc::UNKNOWN);
    }

    #[test]
    fn binary_op_on_two_literals_requires_open_context() {
        let mut d = Design::new();
        let a = sig_int(&mut d, 1, 1, CodeLoc::UNKNOWN);
        let b = sig_int(&mut d, 0, 1, CodeLoc::UNKNOWN);
        let err = binary_op(&mut d, BinaryOp::And, a, b, CodeLoc::UNKNOWN).unwrap_err();
        assert!(matches!(err, BuildError::NoOpenContext { .. }));
    }

    #[test]
    fn bit_index_produces_one_bit_lvalue() {
        let (mut d, m) = setup();
        let a = declare_wire(&mut d, m, Some("a"), 8, false, CodeLoc::UNKNOWN).unwrap();
        let b = a.index(&mut d, IndexArg::Bit(3), CodeLoc::UNKNOWN).unwrap();
        assert_eq!(d.signal_data(b).width, 1);
        assert_eq!(d.signal_data(b).vlog_lvalue.as_deref(), Some("a[3]"));
    }

    #[test]
    fn range_index_width_is_inclusive() {
        let (mut d, m) = setup();
        let a = declare_wire(&mut d, m, Some("a"), 8, false, CodeLoc::UNKNOWN).unwrap();
        let b = a.index(&mut d, IndexArg::Range(5, 2), CodeLoc::UNKNOWN).unwrap();
        assert_eq!(d.signal_data(b).width, 4);
    }

    #[test]
    fn range_index_rejects_inverted_bounds() {
        let (mut d, m) = setup();
        let a = declare_wire(&mut d, m, Some("a"), 8, false, CodeLoc::UNKNOWN).unwrap();
        let err = a.index(&mut d, IndexArg::Range(1, 5), CodeLoc::UNKNOWN).unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedIndex { .. }));
    }

    #[test]
    fn unknown_name_lookup_fails() {
        let (mut d, _m) = setup();
        let err = sig(&mut d, SigArg::Name("nope".into()), CodeLoc::UNKNOWN).unwrap_err();
        assert!(matches!(err, BuildError::UnknownSignal { .. }));
    }
}
