//! The intermediate representation: modules, signals, memories, bundles,
//! interfaces, and the procedural/register-synthesis machinery that builds
//! them under an explicit, per-thread [`Design`].
//!
//! This crate owns no Verilog writer of its own (see `rtlgen_verilog`) and
//! no thread-local/global convenience surface (see `rtlgen`) — it is the
//! data model and the builder operations that mutate it.

#![warn(missing_docs)]

pub mod arena;
pub mod assign;
pub mod bundle;
pub mod connect;
pub mod design;
pub mod ids;
pub mod interface;
pub mod memory;
pub mod module;
pub mod procedural;
pub mod regsynth;
pub mod signal;
pub mod snippet;

pub use arena::{Arena, ArenaId};
pub use assign::{assign, assign_bundle};
pub use bundle::{zip, Bundle, BundleMember};
pub use connect::{connect, connect_signals, Connectable};
pub use design::Design;
pub use ids::{ConstId, MemoryId, ModuleId, SignalId, SnippetId};
pub use interface::{
    add_inst, add_memory_with_interface, add_port, stream, Interface, MemorySpec, PortBuilder, PortShape, Role,
    StreamOptions,
};
pub use memory::{add_memory, Edge, Memory, MemoryData};
pub use module::{Instance, ModuleData};
pub use procedural::{
    case_block, close_case, close_default, close_else, close_else_if, close_if, close_switch, default_block,
    else_block, else_if_block, if_block, open_case, open_default, open_else, open_else_if, open_if, open_switch,
    switch_block, SwitchOptions,
};
pub use regsynth::{add_async, add_ff, add_input, add_output, add_reg, RegOptions};
pub use signal::{
    cmp_op, concat, cond, declare_wire, repeat, sig, sig_int, sig_with_width, unary_op, BinaryOp, CmpOp, IndexArg,
    IndexOperand, SigArg, Signal, SignalData, UnaryOp,
};
pub use snippet::Snippet;
