//! Shared foundational types used across the rtlgen hardware-description
//! crates: interned identifiers, the source-location capture used on every
//! declaration, and the fail-stop error taxonomy.

#![warn(missing_docs)]

pub mod codeloc;
pub mod error;
pub mod ident;

pub use codeloc::CodeLoc;
pub use error::BuildError;
pub use ident::{Ident, Interner};
