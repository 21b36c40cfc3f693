//! Syntax tree module for Coreform
//!
//! This module provides the identity-tagged tree that every other stage of the
//! engine operates on. Trees are immutable values: children live behind an
//! `Arc<[Syntax]>`, so cloning a subtree is cheap and transformation always
//! builds a new tree instead of mutating an old one.

// ============================================================================
// IMPORTS
// ============================================================================

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub mod datum;

pub use datum::Datum;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Global counter for minting identities.
static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

/// An opaque token bound to a form at its declaration site.
///
/// Two identities are equal iff they were minted by the same call to
/// [`Identity::fresh`]. The name is carried for diagnostics only and never
/// takes part in comparison, so two forms that happen to share a name stay
/// distinct.
///
/// # Examples
///
/// ```rust
/// use coreform::ast::Identity;
/// let a = Identity::fresh("app");
/// let b = Identity::fresh("app");
/// assert_ne!(a, b);
/// assert_eq!(a, a.clone());
/// assert_eq!(a.name(), "app");
/// ```
#[derive(Clone)]
pub struct Identity {
    id: u64,
    name: Arc<str>,
}

/// A leaf datum. Atoms are never classified against the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Atom {
    Symbol(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

/// A compound node: a head identity and an ordered sequence of children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Form {
    head: Identity,
    children: Arc<[Syntax]>,
}

/// A node marked as already expanded by a stop/resume protocol.
///
/// The tag names the protocol instance that produced the wrapper; only that
/// protocol may remove it. See [`crate::macros::StopProtocol`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stopped {
    tag: Identity,
    inner: Arc<Syntax>,
}

/// The canonical syntax node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    Atom(Atom),
    Form(Form),
    Stopped(Stopped),
}

/// Child-index path from the root of a top-level expansion call.
///
/// Used in diagnostics to locate the node that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct NodePath(Vec<usize>);

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl Identity {
    /// Mints a new identity, distinct from every identity minted before it.
    pub fn fresh(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Identity {
            id: NEXT_IDENTITY.fetch_add(1, Ordering::SeqCst),
            name: name.into(),
        }
    }

    /// The diagnostic name given at declaration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The process-unique numeric id.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Form {
    /// Creates a form from a head identity and its children.
    pub fn new(head: Identity, children: impl Into<Arc<[Syntax]>>) -> Self {
        Form {
            head,
            children: children.into(),
        }
    }

    pub fn head(&self) -> &Identity {
        &self.head
    }

    pub fn children(&self) -> &[Syntax] {
        &self.children
    }

    pub fn arity(&self) -> usize {
        self.children.len()
    }

    /// Returns a form with the same head and new children.
    pub fn with_children(&self, children: Vec<Syntax>) -> Self {
        Form {
            head: self.head.clone(),
            children: children.into(),
        }
    }
}

impl Stopped {
    pub(crate) fn new(tag: Identity, inner: Syntax) -> Self {
        Stopped {
            tag,
            inner: Arc::new(inner),
        }
    }

    /// The identity of the protocol that produced this wrapper.
    pub fn tag(&self) -> &Identity {
        &self.tag
    }

    pub fn inner(&self) -> &Syntax {
        &self.inner
    }
}

impl Syntax {
    // ------------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------------

    pub fn symbol(name: impl Into<String>) -> Self {
        Syntax::Atom(Atom::Symbol(name.into()))
    }

    pub fn int(value: i64) -> Self {
        Syntax::Atom(Atom::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Syntax::Atom(Atom::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Syntax::Atom(Atom::Str(value.into()))
    }

    pub fn bool(value: bool) -> Self {
        Syntax::Atom(Atom::Bool(value))
    }

    /// Builds a compound node.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use coreform::ast::{Identity, Syntax};
    /// let app = Identity::fresh("app");
    /// let node = Syntax::form(&app, vec![Syntax::int(1), Syntax::int(2)]);
    /// assert_eq!(node.pretty(), "(app 1 2)");
    /// ```
    pub fn form(head: &Identity, children: Vec<Syntax>) -> Self {
        Syntax::Form(Form::new(head.clone(), children))
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Syntax::Atom(atom) => Some(atom),
            _ => None,
        }
    }

    pub fn as_form(&self) -> Option<&Form> {
        match self {
            Syntax::Form(form) => Some(form),
            _ => None,
        }
    }

    pub fn as_stopped(&self) -> Option<&Stopped> {
        match self {
            Syntax::Stopped(stopped) => Some(stopped),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Syntax::Atom(Atom::Symbol(name)) => Some(name),
            _ => None,
        }
    }

    /// The head identity of a compound node, if any.
    pub fn head(&self) -> Option<&Identity> {
        self.as_form().map(Form::head)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Syntax::Stopped(_))
    }

    /// Collects the symbol atoms of a binding occurrence, left to right.
    ///
    /// Stopped wrappers are looked through; nothing is expanded.
    pub fn binders(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_binders(self, &mut names);
        names
    }

    /// Returns every stopped wrapper in the tree, outermost first.
    pub fn stopped_nodes(&self) -> Vec<&Stopped> {
        let mut found = Vec::new();
        let _ = self.visit_stopped(|_, stopped| {
            found.push(stopped);
            Ok::<(), std::convert::Infallible>(())
        });
        found
    }

    /// Calls `visit` with the path and wrapper of every stopped node, outermost
    /// first, stopping at the first error.
    ///
    /// The walk keeps its own stack, so arbitrarily deep trees are fine. A
    /// wrapper shares its path with the node inside it.
    pub fn visit_stopped<'a, E, F>(&'a self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&[usize], &'a Stopped) -> Result<(), E>,
    {
        let mut path = Vec::new();
        // (node, length of the parent's path, index under the parent)
        let mut pending: Vec<(&'a Syntax, usize, Option<usize>)> = vec![(self, 0, None)];
        while let Some((node, depth, index)) = pending.pop() {
            path.truncate(depth);
            path.extend(index);
            match node {
                Syntax::Atom(_) => {}
                Syntax::Form(form) => {
                    let depth = path.len();
                    pending.extend(
                        form.children()
                            .iter()
                            .enumerate()
                            .rev()
                            .map(|(i, child)| (child, depth, Some(i))),
                    );
                }
                Syntax::Stopped(stopped) => {
                    visit(&path, stopped)?;
                    pending.push((stopped.inner(), path.len(), None));
                }
            }
        }
        Ok(())
    }

    /// Heads of the forms sitting directly under stopped wrappers.
    pub fn stopped_heads(&self) -> Vec<&Identity> {
        self.stopped_nodes()
            .into_iter()
            .filter_map(|stopped| stopped.inner().head())
            .collect()
    }

    pub fn count_stopped(&self) -> usize {
        self.stopped_nodes().len()
    }

    /// Pretty-prints the node as s-expression text.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use coreform::ast::{Identity, Syntax};
    /// let quote = Identity::fresh("quote");
    /// let node = Syntax::form(&quote, vec![Syntax::symbol("x"), Syntax::string("hi"), Syntax::bool(false)]);
    /// assert_eq!(node.pretty(), "(quote x \"hi\" #f)");
    /// ```
    pub fn pretty(&self) -> String {
        match self {
            Syntax::Atom(atom) => atom.pretty(),
            Syntax::Form(form) => Self::pretty_form(form),
            Syntax::Stopped(stopped) => format!("#<stopped {}>", stopped.inner.pretty()),
        }
    }

    // ------------------------------------------------------------------------
    // Pretty-printing helpers
    // ------------------------------------------------------------------------

    fn pretty_form(form: &Form) -> String {
        let mut parts = Vec::with_capacity(form.arity() + 1);
        parts.push(form.head.name().to_string());
        parts.extend(form.children.iter().map(Syntax::pretty));
        format!("({})", parts.join(" "))
    }
}

impl Atom {
    pub fn pretty(&self) -> String {
        match self {
            Atom::Symbol(name) => name.clone(),
            Atom::Int(n) => n.to_string(),
            Atom::Float(n) => n.to_string(),
            Atom::Str(s) => format!("{:?}", s),
            Atom::Bool(true) => "#t".to_string(),
            Atom::Bool(false) => "#f".to_string(),
        }
    }
}

impl NodePath {
    pub fn root() -> Self {
        NodePath(Vec::new())
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The path of the `index`th child of this node.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        NodePath(indices)
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<Atom> for Syntax {
    fn from(atom: Atom) -> Self {
        Syntax::Atom(atom)
    }
}

impl From<Form> for Syntax {
    fn from(form: Form) -> Self {
        Syntax::Form(form)
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        NodePath(indices)
    }
}

impl<'a> FromIterator<&'a usize> for NodePath {
    fn from_iter<I: IntoIterator<Item = &'a usize>>(iter: I) -> Self {
        NodePath(iter.into_iter().copied().collect())
    }
}

// ============================================================================
// INFRASTRUCTURE/TRAITS
// ============================================================================

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Identity {}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Identity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Identities serialize for backends but are never deserialized.
impl Serialize for Identity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("Identity", 2)?;
        s.serialize_field("name", &*self.name)?;
        s.serialize_field("id", &self.id)?;
        s.end()
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pretty())
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "<root>.{}", parts.join("."))
    }
}

// ============================================================================
// INTERNAL HELPERS
// ============================================================================

fn collect_binders(node: &Syntax, names: &mut Vec<String>) {
    let mut pending = vec![node];
    while let Some(node) = pending.pop() {
        match node {
            Syntax::Atom(Atom::Symbol(name)) => names.push(name.clone()),
            Syntax::Atom(_) => {}
            Syntax::Form(form) => pending.extend(form.children().iter().rev()),
            Syntax::Stopped(stopped) => pending.push(stopped.inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_compare_by_binding_site_not_name() {
        let first = Identity::fresh("let");
        let second = Identity::fresh("let");
        assert_ne!(first, second);
        assert_eq!(first.name(), second.name());
        assert!(first.id() < second.id());
    }

    #[test]
    fn pretty_prints_nested_forms_and_wrappers() {
        let app = Identity::fresh("app");
        let inner = Syntax::form(&app, vec![Syntax::symbol("f"), Syntax::float(1.5)]);
        let node = Syntax::form(&app, vec![inner.clone(), Syntax::int(-3)]);
        assert_eq!(node.pretty(), "(app (app f 1.5) -3)");

        let stopped = Syntax::Stopped(Stopped::new(Identity::fresh("stop"), inner));
        assert_eq!(stopped.to_string(), "#<stopped (app f 1.5)>");
    }

    #[test]
    fn binders_are_collected_left_to_right() {
        let params = Identity::fresh("params");
        let node = Syntax::form(
            &params,
            vec![Syntax::symbol("x"), Syntax::int(0), Syntax::symbol("y")],
        );
        assert_eq!(node.binders(), vec!["x".to_string(), "y".to_string()]);
        assert!(Syntax::int(4).binders().is_empty());
    }

    #[test]
    fn stopped_heads_lists_wrapped_forms() {
        let tag = Identity::fresh("stop");
        let head = Identity::fresh("my-app");
        let app = Identity::fresh("app");
        let wrapped = Syntax::Stopped(Stopped::new(tag, Syntax::form(&head, vec![])));
        let tree = Syntax::form(&app, vec![wrapped, Syntax::int(1)]);
        assert_eq!(tree.stopped_heads(), vec![&head]);
        assert_eq!(tree.count_stopped(), 1);
    }

    #[test]
    fn stopped_nodes_are_visited_with_their_paths() {
        let tag = Identity::fresh("stop");
        let app = Identity::fresh("app");
        let leaf = Syntax::Stopped(Stopped::new(tag.clone(), Syntax::form(&app, vec![])));
        let outer = Syntax::Stopped(Stopped::new(
            tag,
            Syntax::form(&app, vec![Syntax::int(0), leaf]),
        ));
        let tree = Syntax::form(&app, vec![Syntax::int(1), outer]);

        let mut seen = Vec::new();
        tree.visit_stopped(|path, _| {
            seen.push(path.to_vec());
            Ok::<(), ()>(())
        })
        .unwrap();
        assert_eq!(seen, vec![vec![1], vec![1, 1]]);
    }

    #[test]
    fn deep_trees_are_walked_without_recursion() {
        let wrap = Identity::fresh("wrap");
        let tag = Identity::fresh("stop");
        let mut node = Syntax::Stopped(Stopped::new(tag, Syntax::symbol("x")));
        for _ in 0..5_000 {
            node = Syntax::form(&wrap, vec![node]);
        }
        assert_eq!(node.count_stopped(), 1);
        assert_eq!(node.binders(), vec!["x".to_string()]);
        let mut depth = 0;
        node.visit_stopped(|path, _| {
            depth = path.len();
            Ok::<(), ()>(())
        })
        .unwrap();
        assert_eq!(depth, 5_000);
        // Dropping recurses once per level.
        std::mem::forget(node);
    }

    #[test]
    fn node_paths_render_from_the_root() {
        assert_eq!(NodePath::root().to_string(), "<root>");
        assert_eq!(NodePath::root().child(1).child(0).to_string(), "<root>.1.0");
    }
}
