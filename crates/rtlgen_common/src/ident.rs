//! Interned identifiers for cheap cloning and O(1) equality comparison.

use lasso::Rodeo;

/// A unique identifier for a named entity (module, signal, or memory).
///
/// Identifiers are interned strings represented as a `u32` index into an
/// [`Interner`]. This gives O(1) equality comparison and O(1) cloning,
/// which matters since a `Signal` handle carries its name on every
/// expression-builder call.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Ident(u32);

impl Ident {
    /// Creates an `Ident` from a raw `u32` index.
    ///
    /// Primarily intended for testing; in normal use identifiers come from
    /// [`Interner::get_or_intern`].
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index of this identifier.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: `Ident` wraps a `u32`, always a valid `usize` on supported
// platforms; `try_from_usize` rejects values that don't fit back into `u32`.
unsafe impl lasso::Key for Ident {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Ident)
    }
}

/// String interner backing every `Ident` in one [`Design`](rtlgen_ir)'s
/// module/signal/memory names.
///
/// A [`Design`](rtlgen_ir) (and therefore its `Interner`) lives in
/// thread-local storage rather than being shared across threads, so the
/// single-threaded [`lasso::Rodeo`] is the right variant here — unlike the
/// `ThreadedRodeo` this crate's model was grounded on, there is no
/// cross-thread resolution to support.
pub struct Interner {
    rodeo: Rodeo<Ident>,
}

impl Interner {
    /// Creates a new empty interner.
    pub fn new() -> Self {
        Self {
            rodeo: Rodeo::new(),
        }
    }

    /// Interns a string, returning its [`Ident`]. If the string was already
    /// interned, returns the existing identifier without allocating.
    pub fn get_or_intern(&mut self, s: &str) -> Ident {
        self.rodeo.get_or_intern(s)
    }

    /// Resolves an [`Ident`] back to its string value.
    ///
    /// # Panics
    ///
    /// Panics if the `Ident` was not created by this interner.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.rodeo.resolve(&ident)
    }

    /// Looks up a string's `Ident` without interning it, returning `None`
    /// if it was never interned.
    pub fn get(&self, s: &str) -> Option<Ident> {
        self.rodeo.get(s)
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_resolve_roundtrip() {
        let mut interner = Interner::new();
        let id = interner.get_or_intern("hello");
        assert_eq!(interner.resolve(id), "hello");
    }

    #[test]
    fn same_string_same_ident() {
        let mut interner = Interner::new();
        let a = interner.get_or_intern("world");
        let b = interner.get_or_intern("world");
        assert_eq!(a, b);
    }

    #[test]
    fn different_strings_different_idents() {
        let mut interner = Interner::new();
        let a = interner.get_or_intern("foo");
        let b = interner.get_or_intern("bar");
        assert_ne!(a, b);
    }
}
