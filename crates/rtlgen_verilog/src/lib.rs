//! Verilog text emission.
//!
//! Walks a finished [`Design`] and writes one Verilog-2001 module per
//! `AddModule`, ordering combinational driver code into `always @*` blocks
//! with a [`petgraph`] union-find: snippets that share a driven signal are
//! merged into the same block so a register's default and its user-written
//! update never end up split across two `always` processes, which Verilog
//! forbids.
//!
//! This crate only knows how to write Verilog to a `std::io::Write` sink —
//! it owns no file handling, no CLI, and no example designs of its own (see
//! the `rtlgen` crate for those).

#![warn(missing_docs)]

use std::collections::HashMap;
use std::io::{self, Write};

use petgraph::unionfind::UnionFind;

use rtlgen_common::BuildError;
use rtlgen_ir::{Bundle, BundleMember, Design, Edge, ModuleData, ModuleId, Signal, SignalData, SignalId};

/// Failure writing a design out as Verilog: either a structural
/// completeness violation caught at emit time (`IncompleteRegister`) or an
/// I/O failure writing to the sink.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// The design failed a completeness check (see [`validate_design`]).
    #[error(transparent)]
    Build(#[from] BuildError),
    /// The sink returned an I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Checks the completeness invariant every register must satisfy by
/// emission time: `gotassign ∧ regaction`. Fails fatal (fail-stop, no
/// partial output) on the first violation found, in module-then-signal
/// declaration order.
pub fn validate_design(design: &Design) -> Result<(), BuildError> {
    for module_id in design.module_ids() {
        let module = design.module(module_id);
        let module_name = design.resolve(module.name).to_string();
        for (_id, data) in module.signals() {
            if !data.register {
                continue;
            }
            let name = design.resolve(data.name).to_string();
            if !data.gotassign {
                return Err(BuildError::IncompleteRegister {
                    module: module_name,
                    name,
                    missing: "assignment",
                    loc: data.codeloc,
                });
            }
            if !data.regaction {
                return Err(BuildError::IncompleteRegister {
                    module: module_name,
                    name,
                    missing: "synchronization element",
                    loc: data.codeloc,
                });
            }
        }
    }
    Ok(())
}

fn width_prefix(data: &SignalData) -> String {
    if data.width == 1 {
        String::new()
    } else {
        format!("[{}:0] ", data.width - 1)
    }
}

fn kind_keyword(data: &SignalData) -> &'static str {
    if data.vlog_reg {
        "reg"
    } else {
        "wire"
    }
}

/// Groups a module's code snippets by shared driven signals, using a
/// union-find over snippet indices: two snippets that drive the same
/// signal land in the same group, and thus the same `always @*` block.
fn group_snippets(module: &ModuleData) -> Vec<Vec<usize>> {
    let snippets: Vec<_> = module.code_snippets.iter().collect();
    let n = snippets.len();
    let mut uf: UnionFind<usize> = UnionFind::new(n.max(1));
    let mut last_owner: HashMap<SignalId, usize> = HashMap::new();
    for (i, snip) in snippets.iter().enumerate() {
        for sig in &snip.lvalue_signals {
            match last_owner.get(sig) {
                Some(&owner) => uf.union(owner, i),
                None => {
                    last_owner.insert(*sig, i);
                }
            }
        }
    }
    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..n {
        groups.entry(uf.find(i)).or_default().push(i);
    }
    let mut result: Vec<Vec<usize>> = groups.into_values().collect();
    result.sort_by_key(|g| g[0]);
    result
}

fn driven_signals_of_group(module: &ModuleData, group: &[usize]) -> std::collections::BTreeSet<SignalId> {
    let mut out = std::collections::BTreeSet::new();
    for &i in group {
        out.extend(module.code_snippets[i].lvalue_signals.iter().copied());
    }
    out
}

fn write_module<W: Write>(design: &Design, module_id: ModuleId, out: &mut W) -> io::Result<()> {
    let module = design.module(module_id);
    let name = design.resolve(module.name);

    let mut ports: Vec<(SignalId, &SignalData)> = Vec::new();
    let mut decls: Vec<(SignalId, &SignalData)> = Vec::new();
    for (id, data) in module.signals() {
        if data.inport || data.outport {
            ports.push((id, data));
        } else if data.materialize {
            decls.push((id, data));
        }
    }
    // Declaration order mirrors the grounding source's alphabetical sweep
    // over its signal dict, not arena insertion order.
    ports.sort_by(|a, b| design.resolve(a.1.name).cmp(design.resolve(b.1.name)));
    decls.sort_by(|a, b| design.resolve(a.1.name).cmp(design.resolve(b.1.name)));
    let mut memories: Vec<(rtlgen_ir::MemoryId, &rtlgen_ir::MemoryData)> = module.memories().collect();
    memories.sort_by(|a, b| design.resolve(a.1.name).cmp(design.resolve(b.1.name)));

    writeln!(out, "module {name} (")?;
    for (i, (_, data)) in ports.iter().enumerate() {
        let comma = if i + 1 == ports.len() { "" } else { "," };
        let dir = if data.inport { "input" } else { "output" };
        let reg = if !data.inport && data.vlog_reg { "reg " } else { "" };
        writeln!(
            out,
            "    {dir} {reg}{}{}{comma}",
            width_prefix(data),
            design.resolve(data.name)
        )?;
    }
    writeln!(out, ");")?;

    for (_, mem) in &memories {
        writeln!(
            out,
            "  reg [{}:0] {} [0:{}];",
            mem.width - 1,
            design.resolve(mem.name),
            mem.depth - 1
        )?;
    }
    for (_, data) in &decls {
        writeln!(
            out,
            "  {} {}{};",
            kind_keyword(data),
            width_prefix(data),
            design.resolve(data.name)
        )?;
        // A register's combinational next-value is driven through a shadow
        // lvalue distinct from the register's own name; it needs its own
        // wire declaration alongside the register's.
        if data.register {
            if let Some(lvalue) = &data.vlog_lvalue {
                writeln!(out, "  reg {}{lvalue};", width_prefix(data))?;
            }
        }
    }

    // A decl with no lvalue is a pure expression result (built by an
    // operator, `index`, or `Sig(sig, width)`): its value is fixed at
    // construction, so it is bound with a continuous assign rather than
    // driven from inside a procedural block.
    for (_, data) in &decls {
        if data.vlog_lvalue.is_none() {
            writeln!(
                out,
                "  assign {} = {};",
                design.resolve(data.name),
                data.vlog_rvalue.as_deref().unwrap_or_default()
            )?;
        }
    }

    if !module.init_snippets.is_empty() || !module.code_snippets.is_empty() {
        let groups = group_snippets(module);
        if groups.is_empty() {
            for init in &module.init_snippets {
                writeln!(out, "  always @* begin")?;
                for line in &init.text_lines {
                    writeln!(out, "  {line}")?;
                }
                writeln!(out, "  end")?;
            }
        } else {
            for group in &groups {
                let driven = driven_signals_of_group(module, group);
                writeln!(out, "  always @* begin")?;
                for init in &module.init_snippets {
                    if init.lvalue_signals.iter().any(|s| driven.contains(s)) {
                        for line in &init.text_lines {
                            writeln!(out, "  {line}")?;
                        }
                    }
                }
                for &i in group {
                    for line in &module.code_snippets[i].text_lines {
                        writeln!(out, "  {line}")?;
                    }
                }
                writeln!(out, "  end")?;
            }
        }
    }

    for line in &module.regactions {
        writeln!(out, "  {line}")?;
    }

    for inst in &module.instances {
        writeln!(
            out,
            "  {} {} (",
            design.resolve(inst.type_name),
            design.resolve(inst.inst_name)
        )?;
        let leaves = flatten_bundle(design, &inst.ports, String::new());
        for (i, (port_path, sig)) in leaves.iter().enumerate() {
            let comma = if i + 1 == leaves.len() { "" } else { "," };
            writeln!(out, "    .{port_path}({}){comma}", design.resolve(design.signal_data(*sig).name))?;
        }
        writeln!(out, "  );")?;
    }

    for (_, mem) in &memories {
        if mem.regactions.is_empty() {
            continue;
        }
        let edge_kw = match mem.edge {
            Edge::Posedge(_) => "posedge",
            Edge::Negedge(_) => "negedge",
        };
        let clk_name = design.resolve(design.signal_data(mem.edge.clock()).name).to_string();
        if mem.regactions.len() == 1 {
            writeln!(out, "  always @({edge_kw} {clk_name}) {}", mem.regactions[0])?;
        } else {
            writeln!(out, "  always @({edge_kw} {clk_name}) begin")?;
            for line in &mem.regactions {
                writeln!(out, "    {line}")?;
            }
            writeln!(out, "  end")?;
        }
    }

    writeln!(out, "endmodule")?;
    Ok(())
}

/// Flattens a bundle into `(dotted.port.path, leaf signal)` pairs in
/// iteration order, the shape an instance's port list is connected with.
/// Memory-shaped leaves have no single driving signal and are skipped: an
/// interface carrying a memory describes a memory's own word layout, not a
/// submodule port.
fn flatten_bundle(design: &Design, bundle: &Bundle, prefix: String) -> Vec<(String, Signal)> {
    let mut out = Vec::new();
    for (name, member) in bundle.iter() {
        let name_text = design.resolve(*name);
        let path = if prefix.is_empty() {
            name_text.to_string()
        } else {
            format!("{prefix}.{name_text}")
        };
        match member {
            BundleMember::Signal(s) => out.push((path, *s)),
            BundleMember::Bundle(b) => out.extend(flatten_bundle(design, b, path)),
            BundleMember::Memory(_) => {}
        }
    }
    out
}

/// Validates and writes every module in `design`, in declaration order, as
/// Verilog-2001 source text.
///
/// Fails with [`EmitError::Build`] before writing anything if any register
/// in the design has not received both an assignment and a synchronization
/// element (see [`validate_design`]).
pub fn write_verilog<W: Write>(design: &Design, out: &mut W) -> Result<(), EmitError> {
    validate_design(design)?;
    for module_id in design.module_ids() {
        write_module(design, module_id, out)?;
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtlgen_common::CodeLoc;
    use rtlgen_ir::{add_input, assign, declare_wire};

    fn render(design: &Design) -> String {
        let mut buf = Vec::new();
        write_verilog(design, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn empty_module_emits_header_and_footer() {
        let mut d = Design::new();
        d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        let text = render(&d);
        assert!(text.contains("module m ("));
        assert!(text.contains("endmodule"));
    }

    #[test]
    fn input_port_has_no_reg_keyword() {
        let mut d = Design::new();
        let m = d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.push_module_context(m);
        add_input(&mut d, "clk", 1, CodeLoc::UNKNOWN).unwrap();
        let text = render(&d);
        assert!(text.contains("input clk"));
        assert!(!text.contains("input reg"));
    }

    #[test]
    fn combinational_assign_groups_into_one_always_block() {
        let mut d = Design::new();
        let m = d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.push_module_context(m);
        let a = declare_wire(&mut d, m, Some("a"), 1, false, CodeLoc::UNKNOWN).unwrap();
        let b = declare_wire(&mut d, m, Some("b"), 1, false, CodeLoc::UNKNOWN).unwrap();
        d.set_materialize(a);
        assign(&mut d, a, b, CodeLoc::UNKNOWN).unwrap();
        let text = render(&d);
        assert_eq!(text.matches("always @*").count(), 1);
    }

    #[test]
    fn unsynchronized_register_fails_validation() {
        let mut d = Design::new();
        let m = d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.push_module_context(m);
        rtlgen_ir::add_reg(&mut d, "r", 1, Default::default(), CodeLoc::UNKNOWN).unwrap();
        let err = validate_design(&d).unwrap_err();
        assert!(matches!(
            err,
            BuildError::IncompleteRegister {
                missing: "synchronization element",
                ..
            }
        ));
    }

    #[test]
    fn unassigned_register_fails_validation() {
        let mut d = Design::new();
        let m = d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.push_module_context(m);
        let clk = add_input(&mut d, "clk", 1, CodeLoc::UNKNOWN).unwrap();
        rtlgen_ir::add_reg(
            &mut d,
            "r",
            1,
            rtlgen_ir::RegOptions {
                posedge: Some(clk),
                ..Default::default()
            },
            CodeLoc::UNKNOWN,
        )
        .unwrap();
        let err = validate_design(&d).unwrap_err();
        assert!(matches!(
            err,
            BuildError::IncompleteRegister {
                missing: "assignment",
                ..
            }
        ));
    }

    #[test]
    fn write_verilog_surfaces_incomplete_register_as_build_error() {
        let mut d = Design::new();
        let m = d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.push_module_context(m);
        rtlgen_ir::add_reg(&mut d, "r", 1, Default::default(), CodeLoc::UNKNOWN).unwrap();
        let mut buf = Vec::new();
        let err = write_verilog(&d, &mut buf).unwrap_err();
        assert!(matches!(err, EmitError::Build(BuildError::IncompleteRegister { .. })));
        assert!(buf.is_empty());
    }

    #[test]
    fn fully_synchronized_register_passes_validation() {
        let mut d = Design::new();
        let m = d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.push_module_context(m);
        let clk = add_input(&mut d, "clk", 1, CodeLoc::UNKNOWN).unwrap();
        let r = rtlgen_ir::add_reg(
            &mut d,
            "r",
            1,
            rtlgen_ir::RegOptions {
                posedge: Some(clk),
                ..Default::default()
            },
            CodeLoc::UNKNOWN,
        )
        .unwrap();
        assign(&mut d, r, r, CodeLoc::UNKNOWN).unwrap();
        assert!(validate_design(&d).is_ok());
    }

    #[test]
    fn materialized_expression_gets_continuous_assign() {
        let mut d = Design::new();
        let m = d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.push_module_context(m);
        let a = add_input(&mut d, "a", 8, CodeLoc::UNKNOWN).unwrap();
        let b = add_input(&mut d, "b", 8, CodeLoc::UNKNOWN).unwrap();
        let sum = rtlgen_ir::binary_op(&mut d, rtlgen_ir::BinaryOp::Add, a, b, CodeLoc::UNKNOWN).unwrap();
        let y = rtlgen_ir::add_output(&mut d, "y", 8, Default::default(), CodeLoc::UNKNOWN).unwrap();
        assign(&mut d, y, sum, CodeLoc::UNKNOWN).unwrap();
        let text = render(&d);
        assert!(text.contains("assign __1 = (a + b);"));
        assert!(text.contains("y = __1;"));
    }

    #[test]
    fn register_gets_a_separate_next_value_wire() {
        let mut d = Design::new();
        let m = d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.push_module_context(m);
        let clk = add_input(&mut d, "clk", 1, CodeLoc::UNKNOWN).unwrap();
        let r = rtlgen_ir::add_reg(
            &mut d,
            "r",
            4,
            rtlgen_ir::RegOptions {
                posedge: Some(clk),
                ..Default::default()
            },
            CodeLoc::UNKNOWN,
        )
        .unwrap();
        assign(&mut d, r, r, CodeLoc::UNKNOWN).unwrap();
        let text = render(&d);
        assert!(text.contains("reg [3:0] r;"));
        assert!(text.contains("reg [3:0] __next__r;"));
    }

    #[test]
    fn wires_declare_in_alphabetical_order() {
        let mut d = Design::new();
        let m = d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.push_module_context(m);
        let zeta = declare_wire(&mut d, m, Some("zeta"), 1, false, CodeLoc::UNKNOWN).unwrap();
        let alpha = declare_wire(&mut d, m, Some("alpha"), 1, false, CodeLoc::UNKNOWN).unwrap();
        d.set_materialize(zeta);
        d.set_materialize(alpha);
        let text = render(&d);
        let alpha_pos = text.find("alpha").unwrap();
        let zeta_pos = text.find("zeta").unwrap();
        assert!(alpha_pos < zeta_pos, "wires should declare in alphabetical order:\n{text}");
    }

    #[test]
    fn memory_write_is_wrapped_in_clocked_always_block() {
        let mut d = Design::new();
        let m = d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.push_module_context(m);
        let clk = add_input(&mut d, "clk", 1, CodeLoc::UNKNOWN).unwrap();
        let addr = add_input(&mut d, "addr", 4, CodeLoc::UNKNOWN).unwrap();
        let data = add_input(&mut d, "data", 8, CodeLoc::UNKNOWN).unwrap();
        let mem = rtlgen_ir::add_memory(&mut d, "mem", 8, 16, rtlgen_ir::Edge::Posedge(clk), CodeLoc::UNKNOWN).unwrap();
        let word = mem.index(&mut d, addr, CodeLoc::UNKNOWN).unwrap();
        assign(&mut d, word, data, CodeLoc::UNKNOWN).unwrap();
        let text = render(&d);
        assert!(text.contains("always @(posedge clk) if (__2) mem[addr] <= data;"));
    }
}
