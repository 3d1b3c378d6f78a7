//! Nested procedural blocks: `If`/`ElseIf`/`Else`, `Switch`/`Case`/`Default`.
//!
//! Each block opens a [`ContextFrame`], runs a caller-supplied closure that
//! builds its body, then closes the frame. Blocks that share a driven
//! signal end up tagging the same snippet (directly nested blocks reuse
//! their parent's in-progress snippet) or distinct snippets later merged by
//! the driver union-find in `rtlgen_verilog`.

use rtlgen_common::{BuildError, CodeLoc};

use crate::design::{ContextFrame, Design, PendingElse};
use crate::ids::SignalId;
use crate::signal::{rvalue_of, set_materialize_and_sig, SigArg};

fn add_line(design: &mut Design, line: &str, lvalues: impl IntoIterator<Item = SignalId>) {
    let frame = *design
        .context_stack
        .last()
        .expect("add_line requires an open context");
    let module = frame.module;
    let snippet_id = match frame.snippet {
        Some(id) => id,
        None => {
            let id = design.module_mut(module).push_code_snippet();
            design.context_stack.last_mut().unwrap().snippet = Some(id);
            id
        }
    };
    design
        .module_mut(module)
        .code_snippet_mut(snippet_id)
        .add_line(line, lvalues);
}

fn indent(design: &mut Design, increase: bool) {
    let frame = *design
        .context_stack
        .last()
        .expect("indent requires an open context");
    let Some(snippet_id) = frame.snippet else {
        return;
    };
    let snippet = design.module_mut(frame.module).code_snippet_mut(snippet_id);
    if increase {
        snippet.add_indent();
    } else {
        snippet.remove_indent();
    }
}

fn fresh_frame(design: &Design) -> Option<ContextFrame> {
    design.context_stack.last().copied()
}

/// Opens an `if (cond) begin` line without running a body, leaving the
/// context stack with the new frame on top. Pairs with [`close_if`].
///
/// This split exists alongside the body-taking [`if_block`] for callers
/// that cannot hold a `&mut Design` borrow across an entire body (the
/// `rtlgen` crate's thread-local free-function surface, whose body
/// closures re-borrow the thread-local `Design` for each nested call
/// rather than threading one borrow through): such a caller opens, lets
/// the body run as ordinary (re-borrowing) statements, then closes.
pub fn open_if(design: &mut Design, condition: impl Into<SigArg>, codeloc: CodeLoc) -> Result<(), BuildError> {
    design.pending_else = None;
    let cond = set_materialize_and_sig(design, condition.into(), codeloc)?;
    let parent = fresh_frame(design);
    let module = design.current_module("If")?;
    let frame = ContextFrame {
        module,
        snippet: parent.and_then(|f| f.snippet),
    };
    design.context_stack.push(frame);
    add_line(design, &format!("if ({}) begin // {codeloc}", rvalue_of(design, cond)), []);
    indent(design, true);
    Ok(())
}

/// Closes the block opened by [`open_if`] and publishes the pending-else
/// slot a following [`open_else_if`]/[`open_else`] consumes.
pub fn close_if(design: &mut Design) -> Result<(), BuildError> {
    indent(design, false);
    add_line(design, "end", []);
    let closed = design
        .context_stack
        .pop()
        .ok_or(BuildError::NoOpenContext { function: "close_if" })?;
    design.pending_else = Some(PendingElse {
        module: closed.module,
        snippet: closed.snippet.expect("open_if always allocates a snippet"),
    });
    Ok(())
}

/// Opens an `if (cond) begin ... end`, clearing any pending `Else`/`ElseIf`
/// chain and leaving a new one behind for a following `ElseIf`/`Else`.
pub fn if_block<T>(
    design: &mut Design,
    condition: impl Into<SigArg>,
    codeloc: CodeLoc,
    body: impl FnOnce(&mut Design) -> Result<T, BuildError>,
) -> Result<T, BuildError> {
    open_if(design, condition, codeloc)?;
    let result = body(design);
    close_if(design)?;
    result
}

/// Opens an `else if (cond) begin` line, reusing the pending chain's
/// snippet. Pairs with [`close_else_if`].
pub fn open_else_if(design: &mut Design, condition: impl Into<SigArg>, codeloc: CodeLoc) -> Result<(), BuildError> {
    let pending = design.pending_else.take().ok_or(BuildError::NoPendingElse)?;
    let cond = set_materialize_and_sig(design, condition.into(), codeloc)?;
    let frame = ContextFrame {
        module: pending.module,
        snippet: Some(pending.snippet),
    };
    design.context_stack.push(frame);
    add_line(
        design,
        &format!("else if ({}) begin // {codeloc}", rvalue_of(design, cond)),
        [],
    );
    indent(design, true);
    Ok(())
}

/// Closes the block opened by [`open_else_if`].
pub fn close_else_if(design: &mut Design) -> Result<(), BuildError> {
    close_if(design)
}

/// Opens an `else if (cond) begin ... end`, reusing the snippet of the
/// `If`/`ElseIf` it follows so the whole chain coalesces into one snippet.
pub fn else_if_block<T>(
    design: &mut Design,
    condition: impl Into<SigArg>,
    codeloc: CodeLoc,
    body: impl FnOnce(&mut Design) -> Result<T, BuildError>,
) -> Result<T, BuildError> {
    open_else_if(design, condition, codeloc)?;
    let result = body(design);
    close_else_if(design)?;
    result
}

/// Opens a trailing `else begin` line. Pairs with [`close_else`]; no
/// further `ElseIf`/`Else` can follow.
pub fn open_else(design: &mut Design, codeloc: CodeLoc) -> Result<(), BuildError> {
    let pending = design.pending_else.take().ok_or(BuildError::NoPendingElse)?;
    let frame = ContextFrame {
        module: pending.module,
        snippet: Some(pending.snippet),
    };
    design.context_stack.push(frame);
    add_line(design, &format!("else begin // {codeloc}"), []);
    indent(design, true);
    Ok(())
}

/// Closes the block opened by [`open_else`], leaving no pending-else slot.
pub fn close_else(design: &mut Design) -> Result<(), BuildError> {
    indent(design, false);
    add_line(design, "end", []);
    design
        .context_stack
        .pop()
        .ok_or(BuildError::NoOpenContext { function: "close_else" })?;
    design.pending_else = None;
    Ok(())
}

/// Opens a trailing `else begin ... end`. Closes the chain: no further
/// `ElseIf`/`Else` can follow.
pub fn else_block<T>(
    design: &mut Design,
    codeloc: CodeLoc,
    body: impl FnOnce(&mut Design) -> Result<T, BuildError>,
) -> Result<T, BuildError> {
    open_else(design, codeloc)?;
    let result = body(design);
    close_else(design)?;
    result
}

/// Switch/case pragma: forces the synthesizer to treat branches as mutually
/// exclusive (`parallel`) and/or collectively exhaustive (`full`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchOptions {
    /// Emit `(* parallel_case *)`.
    pub parallel: bool,
    /// Emit `(* full_case *)`.
    pub full: bool,
}

/// Opens a `case (expr) ... endcase`'s header, clearing any pending `Else`
/// chain. Pairs with [`close_switch`]; `Case`/`Default` arms open inside.
pub fn open_switch(
    design: &mut Design,
    expr: impl Into<SigArg>,
    options: SwitchOptions,
    codeloc: CodeLoc,
) -> Result<(), BuildError> {
    design.pending_else = None;
    let expr = set_materialize_and_sig(design, expr.into(), codeloc)?;
    let parent = fresh_frame(design);
    let module = design.current_module("Switch")?;
    let frame = ContextFrame {
        module,
        snippet: parent.and_then(|f| f.snippet),
    };
    design.context_stack.push(frame);
    if options.parallel {
        add_line(design, "(* parallel_case *)", []);
    }
    if options.full {
        add_line(design, "(* full_case *)", []);
    }
    add_line(design, &format!("case ({}) // {codeloc}", rvalue_of(design, expr)), []);
    indent(design, true);
    Ok(())
}

/// Closes the block opened by [`open_switch`].
pub fn close_switch(design: &mut Design) -> Result<(), BuildError> {
    indent(design, false);
    add_line(design, "endcase", []);
    design
        .context_stack
        .pop()
        .ok_or(BuildError::NoOpenContext { function: "close_switch" })?;
    design.pending_else = None;
    Ok(())
}

/// Opens a `case (expr) ... endcase`, clearing any pending `Else` chain.
/// `Case`/`Default` are opened inside `body`.
pub fn switch_block<T>(
    design: &mut Design,
    expr: impl Into<SigArg>,
    options: SwitchOptions,
    codeloc: CodeLoc,
    body: impl FnOnce(&mut Design) -> Result<T, BuildError>,
) -> Result<T, BuildError> {
    open_switch(design, expr, options, codeloc)?;
    let result = body(design);
    close_switch(design)?;
    result
}

/// Opens a `value: begin` arm's header inside an open `Switch`. Pairs with
/// [`close_case`].
pub fn open_case(design: &mut Design, value: impl Into<SigArg>, codeloc: CodeLoc) -> Result<(), BuildError> {
    design.pending_else = None;
    let value = set_materialize_and_sig(design, value.into(), codeloc)?;
    let parent = design
        .context_stack
        .last()
        .copied()
        .ok_or(BuildError::NoOpenContext { function: "Case" })?;
    let frame = ContextFrame {
        module: parent.module,
        snippet: parent.snippet,
    };
    design.context_stack.push(frame);
    add_line(design, &format!("{}: begin // {codeloc}", rvalue_of(design, value)), []);
    indent(design, true);
    Ok(())
}

/// Closes the block opened by [`open_case`].
pub fn close_case(design: &mut Design) -> Result<(), BuildError> {
    indent(design, false);
    add_line(design, "end", []);
    design
        .context_stack
        .pop()
        .ok_or(BuildError::NoOpenContext { function: "close_case" })?;
    design.pending_else = None;
    Ok(())
}

/// Opens a `value: begin ... end` arm inside an open `Switch`.
pub fn case_block<T>(
    design: &mut Design,
    value: impl Into<SigArg>,
    codeloc: CodeLoc,
    body: impl FnOnce(&mut Design) -> Result<T, BuildError>,
) -> Result<T, BuildError> {
    open_case(design, value, codeloc)?;
    let result = body(design);
    close_case(design)?;
    result
}

/// Opens a `default: begin` arm's header inside an open `Switch`. Pairs
/// with [`close_default`].
pub fn open_default(design: &mut Design, codeloc: CodeLoc) -> Result<(), BuildError> {
    design.pending_else = None;
    let parent = design
        .context_stack
        .last()
        .copied()
        .ok_or(BuildError::NoOpenContext { function: "Default" })?;
    let frame = ContextFrame {
        module: parent.module,
        snippet: parent.snippet,
    };
    design.context_stack.push(frame);
    add_line(design, &format!("default: begin // {codeloc}"), []);
    indent(design, true);
    Ok(())
}

/// Closes the block opened by [`open_default`].
pub fn close_default(design: &mut Design) -> Result<(), BuildError> {
    indent(design, false);
    add_line(design, "end", []);
    design
        .context_stack
        .pop()
        .ok_or(BuildError::NoOpenContext { function: "close_default" })?;
    design.pending_else = None;
    Ok(())
}

/// Opens a `default: begin ... end` arm inside an open `Switch`.
pub fn default_block<T>(
    design: &mut Design,
    codeloc: CodeLoc,
    body: impl FnOnce(&mut Design) -> Result<T, BuildError>,
) -> Result<T, BuildError> {
    open_default(design, codeloc)?;
    let result = body(design);
    close_default(design)?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::Design;
    use crate::signal::declare_wire;

    fn setup() -> (Design, crate::ids::ModuleId) {
        let mut d = Design::new();
        let m = d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.context_stack.push(ContextFrame { module: m, snippet: None });
        (d, m)
    }

    #[test]
    fn if_without_else_leaves_pending_else() {
        let (mut d, m) = setup();
        let cond = declare_wire(&mut d, m, Some("c"), 1, false, CodeLoc::UNKNOWN).unwrap();
        if_block(&mut d, cond, CodeLoc::UNKNOWN, |_| Ok(())).unwrap();
        assert!(d.pending_else.is_some());
    }

    #[test]
    fn else_if_without_pending_fails() {
        let (mut d, m) = setup();
        let cond = declare_wire(&mut d, m, Some("c"), 1, false, CodeLoc::UNKNOWN).unwrap();
        let err = else_if_block(&mut d, cond, CodeLoc::UNKNOWN, |_| Ok(())).unwrap_err();
        assert!(matches!(err, BuildError::NoPendingElse));
    }

    #[test]
    fn if_else_chain_shares_one_snippet() {
        let (mut d, m) = setup();
        let cond = declare_wire(&mut d, m, Some("c"), 1, false, CodeLoc::UNKNOWN).unwrap();
        if_block(&mut d, cond, CodeLoc::UNKNOWN, |_| Ok(())).unwrap();
        else_block(&mut d, CodeLoc::UNKNOWN, |_| Ok(())).unwrap();
        assert_eq!(d.module(m).code_snippets.len(), 1);
    }

    #[test]
    fn two_separate_ifs_get_separate_snippets() {
        let (mut d, m) = setup();
        let cond = declare_wire(&mut d, m, Some("c"), 1, false, CodeLoc::UNKNOWN).unwrap();
        if_block(&mut d, cond, CodeLoc::UNKNOWN, |_| Ok(())).unwrap();
        if_block(&mut d, cond, CodeLoc::UNKNOWN, |_| Ok(())).unwrap();
        assert_eq!(d.module(m).code_snippets.len(), 2);
    }

    #[test]
    fn nested_if_reuses_parent_snippet() {
        let (mut d, m) = setup();
        let cond = declare_wire(&mut d, m, Some("c"), 1, false, CodeLoc::UNKNOWN).unwrap();
        if_block(&mut d, cond, CodeLoc::UNKNOWN, |d| {
            if_block(d, cond, CodeLoc::UNKNOWN, |_| Ok(()))
        })
        .unwrap();
        assert_eq!(d.module(m).code_snippets.len(), 1);
    }
}
