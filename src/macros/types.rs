//!
//! This module defines the fundamental types of the form registry: how a core
//! form declares the traversal of its children, what a transformer is, and
//! what a registry entry holds. It has no dependencies on other macro
//! modules apart from the [`MacroCx`] handle transformers receive.
//!
//! ## Ownership and Borrowing
//!
//! - `Transformer` is an `Arc` around a closure, cheaply cloneable and
//!   shareable between threads
//! - `Descriptor` owns its position list
//! - `Entry` owns one of the two

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::ast::{Form, Identity, NodePath, Syntax};
use crate::macros::expander::MacroCx;
use crate::FormError;

/// Default ceiling on macro re-entries along one expansion path and on nesting depth.
pub const MAX_EXPANSION_DEPTH: usize = 128;

/// Classification of one child position of a core form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// A sub-expression, expanded with the current stop set.
    Expression,
    /// A binding occurrence; its symbols are bound in a new scope visible to
    /// the positions that follow it.
    Binding,
    /// Literal data, never expanded.
    Opaque,
}

/// The traversal rule of a core form.
///
/// `positions` classifies the leading children one by one; `rest`, when
/// present, classifies any number of trailing children.
///
/// # Examples
///
/// ```rust
/// use coreform::macros::{Descriptor, Position};
/// let app = Descriptor::new([Position::Expression, Position::Expression]);
/// assert!(app.accepts(2));
/// assert!(!app.accepts(3));
///
/// let begin = Descriptor::variadic([], Position::Expression);
/// assert!(begin.accepts(0));
/// assert_eq!(begin.arity_label(), "at least 0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    positions: Vec<Position>,
    rest: Option<Position>,
}

/// The function type behind a [`Transformer`].
pub type TransformFn =
    dyn Fn(&Syntax, &MacroCx<'_>) -> Result<Syntax, FormError> + Send + Sync;

/// A macro's rewrite rule.
///
/// Transformers receive the whole use-site node and a [`MacroCx`] through
/// which they may read the expansion context or re-enter the expansion loop.
/// They must not have effects visible outside the tree they return.
#[derive(Clone)]
pub struct Transformer(Arc<TransformFn>);

/// Which of the two kinds a form was declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    Macro,
    Core,
}

/// A registry entry: exactly one kind for the identity's whole lifetime.
#[derive(Debug, Clone)]
pub enum Entry {
    Macro(Transformer),
    Core(Descriptor),
}

/// Where a lookup found its entry: the unit's own registry or a shared base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Unit,
    Base,
}

/// A single macro step, for traceability.
#[derive(Debug, Clone)]
pub struct ExpansionStep {
    /// The macro invoked.
    pub identity: Identity,
    /// Which registry layer the macro was found in.
    pub provenance: Provenance,
    /// The use-site node before the step.
    pub input: Syntax,
    /// The transformer's result.
    pub output: Syntax,
    /// Macro re-entries on this path, this one included.
    pub depth: usize,
}

impl Descriptor {
    /// A fixed-arity descriptor.
    pub fn new(positions: impl IntoIterator<Item = Position>) -> Self {
        Descriptor {
            positions: positions.into_iter().collect(),
            rest: None,
        }
    }

    /// A descriptor whose trailing children all share one classification.
    pub fn variadic(positions: impl IntoIterator<Item = Position>, rest: Position) -> Self {
        Descriptor {
            positions: positions.into_iter().collect(),
            rest: Some(rest),
        }
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn rest(&self) -> Option<Position> {
        self.rest
    }

    /// Classification of the child at `index`, if the descriptor covers it.
    pub fn position(&self, index: usize) -> Option<Position> {
        self.positions.get(index).copied().or(self.rest)
    }

    pub fn accepts(&self, arity: usize) -> bool {
        match self.rest {
            Some(_) => arity >= self.positions.len(),
            None => arity == self.positions.len(),
        }
    }

    /// Human-readable arity, e.g. `exactly 2` or `at least 1`.
    pub fn arity_label(&self) -> String {
        match self.rest {
            Some(_) => format!("at least {}", self.positions.len()),
            None => format!("exactly {}", self.positions.len()),
        }
    }

    /// Checks a node with this descriptor's head against the declared arity.
    pub fn check_shape(&self, form: &Form, position: &NodePath) -> Result<(), FormError> {
        if self.accepts(form.arity()) {
            return Ok(());
        }
        Err(FormError::ShapeError {
            identity: form.head().clone(),
            expected: self.arity_label(),
            found: form.arity(),
            node: Syntax::Form(form.clone()),
            position: position.clone(),
        })
    }
}

impl Transformer {
    /// Wraps a closure or function as a transformer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use coreform::macros::Transformer;
    /// let identity_macro = Transformer::new(|node, _cx| Ok(node.clone()));
    /// assert!(identity_macro.same_as(&identity_macro.clone()));
    /// ```
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Syntax, &MacroCx<'_>) -> Result<Syntax, FormError> + Send + Sync + 'static,
    {
        Transformer(Arc::new(f))
    }

    pub(crate) fn call(&self, node: &Syntax, cx: &MacroCx<'_>) -> Result<Syntax, FormError> {
        (self.0)(node, cx)
    }

    /// True if both handles share one underlying function.
    pub fn same_as(&self, other: &Transformer) -> bool {
        Arc::as_ptr(&self.0) as *const () == Arc::as_ptr(&other.0) as *const ()
    }
}

impl Entry {
    pub fn kind(&self) -> FormKind {
        match self {
            Entry::Macro(_) => FormKind::Macro,
            Entry::Core(_) => FormKind::Core,
        }
    }

    pub fn as_core(&self) -> Option<&Descriptor> {
        match self {
            Entry::Core(descriptor) => Some(descriptor),
            Entry::Macro(_) => None,
        }
    }

    pub fn as_macro(&self) -> Option<&Transformer> {
        match self {
            Entry::Macro(transformer) => Some(transformer),
            Entry::Core(_) => None,
        }
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transformer({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Position::Expression => "expression",
            Position::Binding => "binding",
            Position::Opaque => "opaque",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.positions.iter().map(ToString::to_string).collect();
        if let Some(rest) = self.rest {
            parts.push(format!("{}...", rest));
        }
        write!(f, "({})", parts.join(" "))
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormKind::Macro => f.pad("macro"),
            FormKind::Core => f.pad("core"),
        }
    }
}
