//! # Coreform
//!
//! A macro expansion engine whose set of core forms is open. Each
//! compilation unit declares core forms and macros in a [`FormRegistry`],
//! layered over a shared base of built-ins, and the [`Expander`] rewrites
//! macro uses until only core forms remain. Forms are matched by identity,
//! never by name.
//!
//! ## Modules
//!
//! - [`ast`]: identities, the immutable syntax tree and the JSON datum
//!   hand-off from a reader.
//! - [`macros`]: the registry, expansion context, stop/resume protocol and
//!   expansion loop, plus the built-in forms in [`macros::std`].
//! - [`validation`]: checks a backend can run over expanded output.
//! - [`diagnostics`]: [`FormError`] and its `miette` rendering.
//! - [`cli`]: the `coreform` command line.
//!
//! [`FormRegistry`]: crate::macros::FormRegistry
//! [`Expander`]: crate::macros::Expander

pub use crate::diagnostics::{ErrorType, FormError};

pub mod ast;
pub mod cli;
pub mod diagnostics;
pub mod macros;
pub mod validation;
