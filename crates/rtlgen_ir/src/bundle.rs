//! Bundles: named trees of signals and sub-bundles.

use rtlgen_common::{BuildError, Ident};

use crate::design::Design;
use crate::memory::Memory;
use crate::signal::{IndexArg, Signal};

/// A member of a [`Bundle`]: a leaf signal, a leaf memory, or a nested
/// bundle.
#[derive(Debug, Clone)]
pub enum BundleMember {
    /// A leaf signal.
    Signal(Signal),
    /// A nested bundle (one level of interface hierarchy).
    Bundle(Bundle),
    /// A leaf memory (only produced by a `Memory`-role `AddPort`).
    Memory(Memory),
}

/// An ordered, named tree of signals and sub-bundles.
///
/// Member order is insertion order, mirroring the grounding source's
/// reliance on dict-insertion-order iteration for deterministic port lists.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    members: Vec<(Ident, BundleMember)>,
}

impl Bundle {
    /// Creates an empty bundle.
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    /// Adds (or replaces) a member.
    pub fn add(&mut self, name: Ident, member: BundleMember) {
        if let Some(slot) = self.members.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = member;
        } else {
            self.members.push((name, member));
        }
    }

    /// Looks up a member by name.
    pub fn get(&self, name: Ident) -> Option<&BundleMember> {
        self.members.iter().find(|(n, _)| *n == name).map(|(_, m)| m)
    }

    /// Iterates over `(name, member)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(Ident, BundleMember)> {
        self.members.iter()
    }

    /// The number of direct members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether this bundle has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the subset of members (recursively) whose leaf signals are
    /// registers.
    pub fn regs(&self, design: &Design) -> Bundle {
        self.filter_leaves(design, true)
    }

    /// Returns the subset of members (recursively) whose leaf signals are
    /// not registers.
    pub fn nonregs(&self, design: &Design) -> Bundle {
        self.filter_leaves(design, false)
    }

    fn filter_leaves(&self, design: &Design, want_register: bool) -> Bundle {
        let mut out = Bundle::new();
        for (name, member) in &self.members {
            match member {
                BundleMember::Bundle(b) => {
                    out.add(*name, BundleMember::Bundle(b.filter_leaves(design, want_register)));
                }
                BundleMember::Signal(s) => {
                    if design.is_register(*s) == want_register {
                        out.add(*name, BundleMember::Signal(*s));
                    }
                }
            }
        }
        out
    }

    /// Broadcasts an index/slice operation across every leaf signal,
    /// recursively.
    pub fn index(
        &self,
        design: &mut Design,
        index: IndexArg,
        codeloc: rtlgen_common::CodeLoc,
    ) -> Result<Bundle, BuildError> {
        let mut out = Bundle::new();
        for (name, member) in self.members.clone() {
            let indexed = match member {
                BundleMember::Bundle(b) => BundleMember::Bundle(b.index(design, index.clone(), codeloc)?),
                BundleMember::Signal(s) => BundleMember::Signal(s.index(design, index.clone(), codeloc)?),
                BundleMember::Memory(_) => {
                    panic!("cannot index a memory-shaped bundle member directly")
                }
            };
            out.add(name, indexed);
        }
        Ok(out)
    }
}

/// Zips same-shaped bundles member-wise: for each member name, collects the
/// corresponding leaf from every input bundle, keyed in the same order the
/// caller's bundles were given.
///
/// All bundles must share an identical set of member names; the recursion
/// does not currently zip through nested sub-bundles (the grounding
/// source's `Zip` only recurses when the caller explicitly re-invokes it on
/// the nested values, which in Rust becomes an explicit second call).
pub fn zip(bundles: &[&Bundle]) -> Result<Vec<(Ident, Vec<BundleMember>)>, BuildError> {
    let Some(first) = bundles.first() else {
        return Ok(Vec::new());
    };
    let names: Vec<Ident> = first.members.iter().map(|(n, _)| *n).collect();
    for b in bundles {
        let other_names: Vec<Ident> = b.members.iter().map(|(n, _)| *n).collect();
        if other_names != names {
            return Err(BuildError::BundleShapeMismatch {
                detail: "Zip requires identical member names in identical order".to_string(),
            });
        }
    }
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let mut column = Vec::with_capacity(bundles.len());
        for b in bundles {
            column.push(b.get(name).expect("checked above").clone());
        }
        out.push((name, column));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ModuleId, SignalId};

    fn sig(n: u32) -> Signal {
        Signal::InModule(ModuleId::from_raw(0), SignalId::from_raw(n))
    }

    #[test]
    fn add_and_get() {
        let mut b = Bundle::new();
        b.add(Ident::from_raw(1), BundleMember::Signal(sig(0)));
        assert!(matches!(b.get(Ident::from_raw(1)), Some(BundleMember::Signal(_))));
        assert!(b.get(Ident::from_raw(2)).is_none());
    }

    #[test]
    fn add_replaces_existing() {
        let mut b = Bundle::new();
        b.add(Ident::from_raw(1), BundleMember::Signal(sig(0)));
        b.add(Ident::from_raw(1), BundleMember::Signal(sig(5)));
        assert_eq!(b.len(), 1);
        if let Some(BundleMember::Signal(s)) = b.get(Ident::from_raw(1)) {
            assert_eq!(*s, sig(5));
        } else {
            panic!("expected Signal member");
        }
    }

    #[test]
    fn zip_rejects_mismatched_shape() {
        let mut a = Bundle::new();
        a.add(Ident::from_raw(1), BundleMember::Signal(sig(0)));
        let mut b = Bundle::new();
        b.add(Ident::from_raw(2), BundleMember::Signal(sig(1)));
        assert!(zip(&[&a, &b]).is_err());
    }

    #[test]
    fn zip_empty_input_is_empty() {
        let result = zip(&[]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn zip_collects_columns_in_order() {
        let mut a = Bundle::new();
        a.add(Ident::from_raw(1), BundleMember::Signal(sig(0)));
        let mut b = Bundle::new();
        b.add(Ident::from_raw(1), BundleMember::Signal(sig(9)));
        let zipped = zip(&[&a, &b]).unwrap();
        assert_eq!(zipped.len(), 1);
        assert_eq!(zipped[0].1.len(), 2);
    }
}
