//! `Connect`: wires a set of signals (or parallel bundles) together by
//! picking the single valid master and aliasing every other signal to it.

use rtlgen_common::{BuildError, CodeLoc};

use crate::bundle::{zip, Bundle, BundleMember};
use crate::design::Design;
use crate::signal::{rvalue_of, Signal};

/// A value `Connect` accepts: a plain signal or a bundle of signals.
#[derive(Debug, Clone)]
pub enum Connectable {
    /// A single signal.
    Signal(Signal),
    /// A bundle, connected member-wise.
    Bundle(Bundle),
}

impl From<Signal> for Connectable {
    fn from(s: Signal) -> Self {
        Connectable::Signal(s)
    }
}

impl From<Bundle> for Connectable {
    fn from(b: Bundle) -> Self {
        Connectable::Bundle(b)
    }
}

/// A signal is a valid master unless it is an un-driven register: a plain
/// wire is always a valid master, and a register counts once it has either
/// an assignment or a synchronization element.
fn is_valid_master(design: &Design, sig: Signal) -> bool {
    let data = design.signal_data(sig);
    !data.register || data.regaction || data.gotassign
}

/// Connects a set of plain signals: exactly one must be a valid master: all
/// others become aliases driven by it.
pub fn connect_signals(design: &mut Design, sigs: &[Signal], codeloc: CodeLoc) -> Result<(), BuildError> {
    let masters: Vec<Signal> = sigs
        .iter()
        .copied()
        .filter(|s| is_valid_master(design, *s))
        .collect();
    let master = match masters.len() {
        0 => return Err(BuildError::NoMaster),
        1 => masters[0],
        _ => {
            let names = masters
                .iter()
                .map(|s| design.resolve(design.signal_data(*s).name).to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(BuildError::MultipleMasters { names });
        }
    };

    // The grounding source emits `Connect`'s assign lines into whichever
    // module is currently open, not necessarily the master's own module
    // (a `Connect` often runs in a parent module wiring a child instance's
    // ports, which live in no module of their own once `AddInst` clears
    // their flags).
    let module = design.current_module("Connect")?;
    let master_rvalue = rvalue_of(design, master);
    for &slave in sigs {
        if slave == master {
            continue;
        }
        let slave_lvalue = design
            .signal_data(slave)
            .vlog_lvalue
            .clone()
            .ok_or_else(|| BuildError::NoLvalue {
                name: design.resolve(design.signal_data(slave).name).to_string(),
            })?;
        design.signal_data_mut(slave).portalias = Some(design.signal_data(master).name);
        design.signal_data_mut(slave).register = false;
        design.signal_data_mut(slave).regaction = true;
        design.signal_data_mut(slave).gotassign = true;
        design.set_materialize(master);
        let line = format!("assign {slave_lvalue} = {master_rvalue}; // {codeloc}");
        design.module_mut(module).regactions.push(line);
    }
    Ok(())
}

/// Connects bundles (or a mix of signals and bundles) recursively: bundles
/// are zipped member-wise and each column is connected in turn.
pub fn connect(design: &mut Design, items: &[Connectable], codeloc: CodeLoc) -> Result<(), BuildError> {
    if items.is_empty() {
        return Ok(());
    }
    let all_signals = items.iter().all(|i| matches!(i, Connectable::Signal(_)));
    if all_signals {
        let sigs: Vec<Signal> = items
            .iter()
            .map(|i| match i {
                Connectable::Signal(s) => *s,
                Connectable::Bundle(_) => unreachable!("checked above"),
            })
            .collect();
        return connect_signals(design, &sigs, codeloc);
    }

    let bundles: Vec<&Bundle> = items
        .iter()
        .map(|i| match i {
            Connectable::Bundle(b) => b,
            Connectable::Signal(_) => {
                panic!("Connect requires all arguments to be bundles or all to be signals")
            }
        })
        .collect();
    let columns = zip(&bundles)?;
    for (_name, column) in columns {
        let all_signal_members = column.iter().all(|m| matches!(m, BundleMember::Signal(_)));
        if all_signal_members {
            let sigs: Vec<Signal> = column
                .iter()
                .map(|m| match m {
                    BundleMember::Signal(s) => *s,
                    BundleMember::Bundle(_) => unreachable!("checked above"),
                    BundleMember::Memory(_) => {
                        panic!("Connect does not support memory-shaped bundle members")
                    }
                })
                .collect();
            connect_signals(design, &sigs, codeloc)?;
        } else {
            let nested: Vec<Connectable> = column
                .into_iter()
                .map(|m| match m {
                    BundleMember::Bundle(b) => Connectable::Bundle(b),
                    BundleMember::Signal(s) => Connectable::Signal(s),
                    BundleMember::Memory(_) => {
                        panic!("Connect does not support memory-shaped bundle members")
                    }
                })
                .collect();
            connect(design, &nested, codeloc)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::Design;
    use crate::signal::declare_wire;

    #[test]
    fn connect_requires_a_master() {
        let mut d = Design::new();
        let m = d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.context_stack.push(crate::design::ContextFrame { module: m, snippet: None });
        let a = crate::regsynth::add_reg(&mut d, "a", 1, Default::default(), CodeLoc::UNKNOWN).unwrap();
        let b = crate::regsynth::add_reg(&mut d, "b", 1, Default::default(), CodeLoc::UNKNOWN).unwrap();
        let err = connect_signals(&mut d, &[a, b], CodeLoc::UNKNOWN).unwrap_err();
        assert!(matches!(err, BuildError::NoMaster));
    }

    #[test]
    fn connect_aliases_slave_to_sole_master() {
        let mut d = Design::new();
        let m = d.add_module("m", CodeLoc::UNKNOWN).unwrap();
        d.context_stack.push(crate::design::ContextFrame { module: m, snippet: None });
        let a = declare_wire(&mut d, m, Some("a"), 4, false, CodeLoc::UNKNOWN).unwrap();
        // A bare register with no regaction/gotassign is not a valid master
        // (mirrors the grounding source's `checkreg`), so `a` is the sole
        // master and `b` is aliased to it.
        let b = crate::regsynth::add_reg(&mut d, "b", 4, Default::default(), CodeLoc::UNKNOWN).unwrap();
        connect_signals(&mut d, &[a, b], CodeLoc::UNKNOWN).unwrap();
        assert_eq!(d.module(m).regactions.len(), 1);
    }
}
