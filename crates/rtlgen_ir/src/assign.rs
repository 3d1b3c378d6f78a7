//! `Assign`: combinational driving of a signal, a memory element, or a
//! bundle, from inside an open procedural context.

use rtlgen_common::{BuildError, CodeLoc};

use crate::bundle::{zip, Bundle, BundleMember};
use crate::design::{ContextFrame, Design};
use crate::signal::{set_materialize_and_sig, SigArg, Signal};

/// Collects `sig` and the transitive closure of its `deps`, matching the
/// grounding source's `get_deps()`: an assignment to a bit-slice tags both
/// the slice itself and its underlying base register as driven, so
/// partial-bit assigns of the same register merge into one `always` block.
fn transitive_deps(design: &Design, sig: Signal) -> Vec<crate::ids::SignalId> {
    let mut out = Vec::new();
    let mut stack = vec![sig];
    while let Some(s) = stack.pop() {
        if let Signal::InModule(_, id) = s {
            if !out.contains(&id) {
                out.push(id);
                stack.extend(design.signal_data(s).deps.iter().copied());
            }
        } else {
            stack.extend(design.signal_data(s).deps.iter().copied());
        }
    }
    out
}

/// Opens a fresh one-line context (no `begin`/`end`, no indent change) that
/// inherits the snippet of whatever context is currently open, appends one
/// line, and closes immediately. Used for the single `lhs = rhs;` line an
/// `Assign` produces.
fn one_line(design: &mut Design, line: &str, lvalues: impl IntoIterator<Item = crate::ids::SignalId>) {
    let parent = design.context_stack.last().copied();
    let module = parent.map(|f| f.module).expect("Assign requires an open context");
    let frame = ContextFrame {
        module,
        snippet: parent.and_then(|f| f.snippet),
    };
    design.context_stack.push(frame);
    let snippet_id = match design.context_stack.last().unwrap().snippet {
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
    design.context_stack.pop();
}

/// Drives `lhs` with `rhs`: `lhs = rhs;` for a plain signal, or an
/// auto-write-enabled `mem[idx] <= rhs;` for a memory-element read target.
pub fn assign(
    design: &mut Design,
    lhs: Signal,
    rhs: impl Into<SigArg>,
    codeloc: CodeLoc,
) -> Result<(), BuildError> {
    let rhs = set_materialize_and_sig(design, rhs.into(), codeloc)?;

    if let Some(mem) = design.signal_data(lhs).memory {
        let module = design.module_of(lhs).expect("memory reads live in a module");
        let handle = crate::memory::Memory { module, id: mem };
        // `lhs.vlog_rvalue` is already the full "mem[addr]" text built by
        // `Memory::index`; the guarded write reuses it verbatim as the
        // assignment target.
        let idx_text = design.signal_data(lhs).vlog_rvalue.clone().unwrap_or_default();
        let wen = crate::signal::declare_wire(design, module, None, 1, false, codeloc)?;
        let wen_lvalue = design.signal_data(wen).vlog_lvalue.clone().unwrap();
        let wen_name = design.resolve(design.signal_data(wen).name).to_string();
        design.signal_data_mut(wen).vlog_reg = true;
        design.set_materialize(wen);

        let mut init = crate::snippet::Snippet::new();
        init.add_line(&format!("{wen_lvalue} = 1'b0; // {codeloc}"), []);
        design.module_mut(module).init_snippets.push(init);

        let wen_id = match wen {
            Signal::InModule(_, id) => id,
            Signal::Const(_) => unreachable!("declare_wire always returns InModule"),
        };
        one_line(design, &format!("{wen_lvalue} = 1'b1; // {codeloc}"), [wen_id]);

        let rhs_text = crate::signal::name_of(design, rhs);
        let line = format!("if ({wen_name}) {idx_text} <= {rhs_text}; // {codeloc}");
        design.memory_data_mut(handle).regactions.push(line);
        return Ok(());
    }

    let lvalue = design
        .signal_data(lhs)
        .vlog_lvalue
        .clone()
        .ok_or_else(|| BuildError::NoLvalue {
            name: design.resolve(design.signal_data(lhs).name).to_string(),
        })?;
    design.mark_gotassign_transitive(lhs);
    let rhs_text = crate::signal::name_of(design, rhs);
    let lvalues = transitive_deps(design, lhs);
    one_line(design, &format!("{lvalue} = {rhs_text}; // {codeloc}"), lvalues);
    Ok(())
}

/// Recursively assigns a bundle member-wise; both bundles must share an
/// identical shape.
pub fn assign_bundle(
    design: &mut Design,
    lhs: &Bundle,
    rhs: &Bundle,
    codeloc: CodeLoc,
) -> Result<(), BuildError> {
    let columns = zip(&[lhs, rhs])?;
    for (_name, column) in columns {
        match (&column[0], &column[1]) {
            (BundleMember::Signal(l), BundleMember::Signal(r)) => {
                assign(design, *l, *r, codeloc)?;
            }
            (BundleMember::Bundle(l), BundleMember::Bundle(r)) => {
                assign_bundle(design, l, r, codeloc)?;
            }
            _ => {
                return Err(BuildError::BundleShapeMismatch {
                    detail: "Assign requires matching Signal/Bundle shapes".to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::Design;
    use crate::ids::ModuleId;
    use crate::signal::declare_wire;

    fn setup() -> (Design, ModuleId) {
        let mut d = Design::new();
        let m = d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.context_stack.push(ContextFrame { module: m, snippet: None });
        (d, m)
    }

    #[test]
    fn assign_requires_lvalue() {
        let (mut d, m) = setup();
        let a = declare_wire(&mut d, m, Some("a"), 4, false, CodeLoc::UNKNOWN).unwrap();
        let b = crate::signal::binary_op(
            &mut d,
            crate::signal::BinaryOp::Add,
            a,
            a,
            CodeLoc::UNKNOWN,
        )
        .unwrap();
        // `b` is a derived expression signal: no lvalue.
        let err = assign(&mut d, b, a, CodeLoc::UNKNOWN).unwrap_err();
        assert!(matches!(err, BuildError::NoLvalue { .. }));
    }

    #[test]
    fn assign_marks_gotassign() {
        let (mut d, m) = setup();
        let a = declare_wire(&mut d, m, Some("a"), 4, false, CodeLoc::UNKNOWN).unwrap();
        let b = declare_wire(&mut d, m, Some("b"), 4, false, CodeLoc::UNKNOWN).unwrap();
        assign(&mut d, a, b, CodeLoc::UNKNOWN).unwrap();
        assert!(d.signal_data(a).gotassign);
    }

    #[test]
    fn assign_appends_one_line_to_open_snippet() {
        let (mut d, m) = setup();
        let a = declare_wire(&mut d, m, Some("a"), 4, false, CodeLoc::UNKNOWN).unwrap();
        let b = declare_wire(&mut d, m, Some("b"), 4, false, CodeLoc::UNKNOWN).unwrap();
        assign(&mut d, a, b, CodeLoc::UNKNOWN).unwrap();
        assert_eq!(d.module(m).code_snippets.len(), 1);
        assert_eq!(d.module(m).code_snippets[0].text_lines.len(), 1);
    }
}
