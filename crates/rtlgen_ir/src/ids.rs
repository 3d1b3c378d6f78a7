//! Opaque ID newtypes for IR entities stored in [`Arena`](crate::arena::Arena)s.

use crate::arena::ArenaId;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// Opaque ID for a module within a [`Design`](crate::design::Design).
    ModuleId
);

define_id!(
    /// Opaque ID for a signal within a module's signal arena.
    SignalId
);

define_id!(
    /// Opaque ID for a memory within a module's memory arena.
    MemoryId
);

define_id!(
    /// Opaque ID for a module-less constant literal within a design's
    /// constant arena.
    ConstId
);

define_id!(
    /// Opaque ID for a code snippet within a module's `code_snippets` list.
    SnippetId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn id_roundtrip() {
        let id = ModuleId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
    }

    #[test]
    fn id_equality() {
        let a = SignalId::from_raw(7);
        let b = SignalId::from_raw(7);
        let c = SignalId::from_raw(8);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn id_hash_in_set() {
        let mut set = HashSet::new();
        set.insert(MemoryId::from_raw(1));
        set.insert(MemoryId::from_raw(2));
        set.insert(MemoryId::from_raw(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn all_id_types_construct() {
        let _ = ModuleId::from_raw(0);
        let _ = SignalId::from_raw(0);
        let _ = MemoryId::from_raw(0);
        let _ = ConstId::from_raw(0);
        let _ = SnippetId::from_raw(0);
    }
}
