//! # Coreform Macro Expansion
//!
//! This module turns syntax trees that mix macro uses and core forms into
//! trees made only of core forms, atoms, and explicitly stopped nodes.
//!
//! ## Core Principles
//!
//! - **Identity, not spelling**: forms are recognized by the [`Identity`] of
//!   their head. Two forms named `if` are unrelated unless they share one.
//! - **Open core**: which forms are primitive is data held in a
//!   [`FormRegistry`], extended per compilation unit with [`Descriptor`]s that
//!   say how each child is traversed.
//! - **Resumable**: an expansion can stop at the heads in a [`StopSet`]; the
//!   [`StopProtocol`] wraps those nodes so a transformer can pick them apart
//!   and resume below them.
//! - **Bounded**: every macro step consumes one unit of a per-path depth fuse
//!   carried in the [`ExpansionContext`], and recursion into children stops
//!   at the same ceiling.
//!
//! **INVARIANT:** A core form's head and arity survive expansion unchanged.
//! Only the children in expression positions are rewritten.
//!
//! [`Identity`]: crate::ast::Identity

pub mod context;
pub mod expander;
pub mod protocol;
pub mod registry;
pub mod std;
pub mod types;

pub use context::{ExpansionContext, ScopeId, StopSet};
pub use expander::{invoke, ExpandOptions, Expander, MacroCx};
pub use protocol::StopProtocol;
pub use registry::FormRegistry;
pub use types::{
    Descriptor, Entry, ExpansionStep, FormKind, Position, Provenance, TransformFn, Transformer,
    MAX_EXPANSION_DEPTH,
};
