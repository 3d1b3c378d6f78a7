//! The fail-stop error taxonomy returned by every fallible builder call.

use crate::codeloc::CodeLoc;

/// Errors produced while building or emitting an RTL design.
///
/// There is no recovery path: every builder call that can fail returns
/// `Result<T, BuildError>`, and callers are expected to propagate with `?`
/// rather than retry. Every variant is enumerable ahead of time so a caller
/// (e.g. a lint pass built atop this crate) can match on a specific failure
/// mode instead of inspecting an opaque message.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A builder function was called with no open module context.
    #[error("{function} called outside an open module context")]
    NoOpenContext {
        /// The name of the function that required a context.
        function: &'static str,
    },

    /// `reset_design` was called while a context is still open.
    #[error("cannot reset design inside open context (If/Else/Switch etc. block)")]
    ContextOpen,

    /// `Else`/`ElseIf` was used with no pending `If`/`ElseIf` to attach to.
    #[error("cannot find matching If/ElseIf for Else")]
    NoPendingElse,

    /// A context object was entered while already open (internal invariant).
    #[error("trying to enter context that is already open")]
    ContextAlreadyOpen,

    /// Two modules were declared with the same name.
    #[error("module name '{name}' already in use")]
    DuplicateModule {
        /// The colliding module name.
        name: String,
    },

    /// Two signals in the same module were declared with the same name.
    #[error("signal name '{name}' already in use in module '{module}'")]
    DuplicateSignal {
        /// The owning module's name.
        module: String,
        /// The colliding signal name.
        name: String,
    },

    /// Two memories in the same module were declared with the same name.
    #[error("memory name '{name}' already in use in module '{module}'")]
    DuplicateMemory {
        /// The owning module's name.
        module: String,
        /// The colliding memory name.
        name: String,
    },

    /// `Sig("name")` referenced a signal absent from the current module.
    #[error("signal '{name}' not found in current module ('{module}')")]
    UnknownSignal {
        /// The module that was searched.
        module: String,
        /// The name that was not found.
        name: String,
    },

    /// Operands of an expression come from more than one module.
    #[error("operands belong to different modules ('{a}' and '{b}')")]
    CrossModuleOperands {
        /// One offending module name.
        a: String,
        /// The other offending module name.
        b: String,
    },

    /// A bundle was combined with a non-bundle, or two bundles had
    /// different member sets, in `Assign` or `Connect`.
    #[error("bundle shape mismatch: {detail}")]
    BundleShapeMismatch {
        /// A human-readable description of the mismatch.
        detail: String,
    },

    /// `Connect` found no valid master among its arguments.
    #[error("could not identify a master signal in Connect statement")]
    NoMaster,

    /// `Connect` found more than one valid master among its arguments.
    #[error("multiple possible masters in Connect statement: {names}")]
    MultipleMasters {
        /// A comma-joined list of the competing master signal names.
        names: String,
    },

    /// `AddFF`/`AddAsync` was called on a signal that is not a register.
    #[error("AddFF/AddAsync called on non-register signal '{name}'")]
    NotARegister {
        /// The offending signal name.
        name: String,
    },

    /// `AddFF`/`AddAsync` was called on a register that already has a
    /// synchronization element.
    #[error("AddFF/AddAsync called on register '{name}' with regaction already set")]
    RegActionAlreadySet {
        /// The offending signal name.
        name: String,
    },

    /// `posedge`/`negedge` were both given, or both omitted, where exactly
    /// one is required.
    #[error("posedge XOR negedge must be given for '{name}'")]
    EdgeSpecConflict {
        /// The register or memory this applies to.
        name: String,
    },

    /// A register reached emission time without `gotassign`/`regaction`.
    #[error("register without {missing}: {module}.{name} ({loc})")]
    IncompleteRegister {
        /// The owning module's name.
        module: String,
        /// The offending signal name.
        name: String,
        /// Which requirement is missing (`"assignment"` or
        /// `"synchronization element"`).
        missing: &'static str,
        /// The signal's declaration site.
        loc: CodeLoc,
    },

    /// A signal was indexed with a value of an unsupported type/shape.
    #[error("trying to index signal '{name}' with an unsupported value: {detail}")]
    UnsupportedIndex {
        /// The signal being indexed.
        name: String,
        /// A human-readable description of the problem.
        detail: String,
    },

    /// A slice (`a..b`) was used as the width element of an indexed-range
    /// tuple (`signal[idx, width]`), which only accepts a plain integer.
    #[error("slice used where an indexed-range width was expected on '{name}'")]
    SliceInIndexedRange {
        /// The signal being indexed.
        name: String,
    },

    /// `Sig(...)` was called on a value of an unsupported type.
    #[error("cannot construct Sig from argument: {detail}")]
    UnsupportedSigArg {
        /// A human-readable description of the rejected value.
        detail: String,
    },

    /// `Assign` targeted a signal with no `vlog_lvalue` (a pure expression
    /// result, never an input/output/register/slice-of-lvalue).
    #[error("trying to assign to signal '{name}' with no lvalue")]
    NoLvalue {
        /// The offending signal's name.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_duplicate_module() {
        let err = BuildError::DuplicateModule {
            name: "counter".into(),
        };
        assert_eq!(format!("{err}"), "module name 'counter' already in use");
    }

    #[test]
    fn display_incomplete_register_mentions_loc() {
        let err = BuildError::IncompleteRegister {
            module: "m".into(),
            name: "q".into(),
            missing: "synchronization element",
            loc: CodeLoc::UNKNOWN,
        };
        let text = format!("{err}");
        assert!(text.contains("m.q"));
        assert!(text.contains("synchronization element"));
    }

    #[test]
    fn display_multiple_masters_lists_names() {
        let err = BuildError::MultipleMasters {
            names: "a,b".into(),
        };
        assert!(format!("{err}").contains("a,b"));
    }

    #[test]
    fn no_open_context_mentions_function() {
        let err = BuildError::NoOpenContext { function: "AddInput" };
        assert!(format!("{err}").contains("AddInput"));
    }
}
