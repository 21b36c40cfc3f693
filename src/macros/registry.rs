//! Form registry: the single source of truth for "is this a core form".
//!
//! # Error Handling
//!
//! Registration fails with [`FormError::DuplicateRegistration`] when the
//! identity is already known to this registry or to its base; lookup fails
//! with [`FormError::UnknownForm`] when it is known to neither.
//!
//! # Monotonicity
//! Entries are never removed or replaced. Registration needs `&mut self` and
//! expansion borrows the registry shared, so a form cannot change kind while a
//! unit is being expanded.
//!
//! # Layering
//! A unit registry may sit on top of a shared read-only base (usually the
//! built-ins from [`crate::macros::std`]). Lookups fall through to the base;
//! registrations always land in the unit.
//!
//! # Names
//! Each registry keeps a namespace from names to identities, used only when
//! binding a reader's name-based [`Datum`] into syntax. Recognition of forms
//! during expansion goes through identities alone.
//!
//! # Summary Table
//! | Method                 | Mints identity | Error on duplicate | Notes                         |
//! |------------------------|----------------|--------------------|-------------------------------|
//! | register               | No             | Yes                | Raw entry                     |
//! | declare_macro          | No             | Yes                | Caller-minted identity        |
//! | declare_core_form      | No             | Yes                | Caller-minted identity        |
//! | define_macro           | Yes            | Never              | Returns the new identity      |
//! | define_recursive_macro | Yes            | Never              | Builder sees the new identity |
//! | define_core_form       | Yes            | Never              | Returns the new identity      |
//! | lookup                 | N/A            | N/A                | `UnknownForm` when absent     |

use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::{Atom, Datum, Identity, NodePath, Syntax};
use crate::macros::types::{Descriptor, Entry, FormKind, Provenance, Transformer};
use crate::FormError;

/// Registry of macros and core forms for one compilation unit.
///
/// # Example
/// ```rust
/// use coreform::macros::{Descriptor, FormRegistry, Position, Transformer};
/// let mut reg = FormRegistry::new();
/// let app = reg.define_core_form("app", Descriptor::new([Position::Expression, Position::Expression]));
/// let same = Transformer::new(|node, _cx| Ok(node.clone()));
/// let my_app = reg.define_macro("my-app", same);
/// assert!(reg.is_core_form(&app));
/// assert!(!reg.is_core_form(&my_app));
/// assert_eq!(reg.resolve("app"), Some(&app));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FormRegistry {
    entries: HashMap<Identity, Entry>,
    names: HashMap<String, Identity>,
    base: Option<Arc<FormRegistry>>,
}

impl FormRegistry {
    /// Creates a new, empty registry with no base.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty unit registry layered over a shared base.
    pub fn with_base(base: Arc<FormRegistry>) -> Self {
        FormRegistry {
            entries: HashMap::new(),
            names: HashMap::new(),
            base: Some(base),
        }
    }

    pub fn base(&self) -> Option<&Arc<FormRegistry>> {
        self.base.as_ref()
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Registers `entry` under `identity`.
    ///
    /// # Errors
    /// Returns `DuplicateRegistration` if the identity is already registered
    /// here or in the base.
    pub fn register(&mut self, identity: Identity, entry: Entry) -> Result<(), FormError> {
        if self.contains(&identity) {
            return Err(FormError::DuplicateRegistration { identity });
        }
        self.insert_fresh(identity, entry);
        Ok(())
    }

    pub fn declare_macro(
        &mut self,
        identity: Identity,
        transformer: Transformer,
    ) -> Result<(), FormError> {
        self.register(identity, Entry::Macro(transformer))
    }

    pub fn declare_core_form(
        &mut self,
        identity: Identity,
        descriptor: Descriptor,
    ) -> Result<(), FormError> {
        self.register(identity, Entry::Core(descriptor))
    }

    /// Mints an identity for `name` and registers it as a macro.
    pub fn define_macro(&mut self, name: &str, transformer: Transformer) -> Identity {
        let identity = Identity::fresh(name);
        self.insert_fresh(identity.clone(), Entry::Macro(transformer));
        identity
    }

    /// Like [`FormRegistry::define_macro`], for transformers that produce uses
    /// of the macro being defined. `build` receives the minted identity.
    pub fn define_recursive_macro<F>(&mut self, name: &str, build: F) -> Identity
    where
        F: FnOnce(&Identity) -> Transformer,
    {
        let identity = Identity::fresh(name);
        let transformer = build(&identity);
        self.insert_fresh(identity.clone(), Entry::Macro(transformer));
        identity
    }

    /// Mints an identity for `name` and registers it as a core form.
    pub fn define_core_form(&mut self, name: &str, descriptor: Descriptor) -> Identity {
        let identity = Identity::fresh(name);
        self.insert_fresh(identity.clone(), Entry::Core(descriptor));
        identity
    }

    // A freshly minted identity cannot collide, so the callers above skip the check.
    fn insert_fresh(&mut self, identity: Identity, entry: Entry) {
        self.names.insert(identity.name().to_string(), identity.clone());
        self.entries.insert(identity, entry);
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    /// Looks up the entry for `identity`.
    ///
    /// # Errors
    /// Returns `UnknownForm` if neither this registry nor its base has it.
    pub fn lookup(&self, identity: &Identity) -> Result<&Entry, FormError> {
        self.get(identity).ok_or_else(|| FormError::UnknownForm {
            identity: identity.clone(),
            position: NodePath::root(),
        })
    }

    /// Looks up an entry together with the layer it was found in.
    pub fn lookup_with_provenance(&self, identity: &Identity) -> Option<(Provenance, &Entry)> {
        if let Some(entry) = self.entries.get(identity) {
            return Some((Provenance::Unit, entry));
        }
        self.base
            .as_ref()
            .and_then(|base| base.get(identity))
            .map(|entry| (Provenance::Base, entry))
    }

    pub fn get(&self, identity: &Identity) -> Option<&Entry> {
        self.lookup_with_provenance(identity).map(|(_, entry)| entry)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.get(identity).is_some()
    }

    pub fn kind_of(&self, identity: &Identity) -> Option<FormKind> {
        self.get(identity).map(Entry::kind)
    }

    /// The traversal descriptor of a core form.
    pub fn descriptor(&self, identity: &Identity) -> Option<&Descriptor> {
        self.get(identity).and_then(Entry::as_core)
    }

    pub fn is_core_form(&self, identity: &Identity) -> bool {
        self.descriptor(identity).is_some()
    }

    /// Resolves a name through the unit namespace, then the base's.
    pub fn resolve(&self, name: &str) -> Option<&Identity> {
        self.names
            .get(name)
            .or_else(|| self.base.as_ref().and_then(|base| base.resolve(name)))
    }

    /// Number of registered identities, base included.
    pub fn len(&self) -> usize {
        self.entries.len() + self.base.as_ref().map_or(0, |base| base.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every registered identity, unit entries first, each layer sorted by id.
    pub fn identities(&self) -> Vec<&Identity> {
        let mut local: Vec<&Identity> = self.entries.keys().collect();
        local.sort();
        if let Some(base) = &self.base {
            local.extend(base.identities());
        }
        local
    }

    // ------------------------------------------------------------------------
    // Binding reader output
    // ------------------------------------------------------------------------

    /// Binds a name-based datum into syntax.
    ///
    /// Head names are resolved through [`FormRegistry::resolve`]. A name with
    /// no binding gets one fresh, unregistered identity per call, so the
    /// expansion that follows reports `UnknownForm` for it.
    ///
    /// # Example
    /// ```rust
    /// use coreform::ast::Datum;
    /// use coreform::macros::{Descriptor, FormRegistry, Position};
    /// let mut reg = FormRegistry::new();
    /// let app = reg.define_core_form("app", Descriptor::new([Position::Expression, Position::Expression]));
    /// let datum = Datum::from_json(r#"["app", "f", 1]"#).unwrap();
    /// let syntax = reg.bind(&datum).unwrap();
    /// assert_eq!(syntax.head(), Some(&app));
    /// assert_eq!(syntax.pretty(), "(app f 1)");
    /// ```
    pub fn bind(&self, datum: &Datum) -> Result<Syntax, FormError> {
        let mut unbound = HashMap::new();
        self.bind_with(datum, &mut unbound)
    }

    fn bind_with(
        &self,
        datum: &Datum,
        unbound: &mut HashMap<String, Identity>,
    ) -> Result<Syntax, FormError> {
        let atom = match datum {
            Datum::Bool(b) => Atom::Bool(*b),
            Datum::Int(n) => Atom::Int(*n),
            Datum::Float(n) => Atom::Float(*n),
            Datum::Symbol(name) => Atom::Symbol(name.clone()),
            Datum::Str { str } => Atom::Str(str.clone()),
            Datum::List(_) => return self.bind_compound(datum, unbound),
        };
        Ok(Syntax::Atom(atom))
    }

    fn bind_compound(
        &self,
        datum: &Datum,
        unbound: &mut HashMap<String, Identity>,
    ) -> Result<Syntax, FormError> {
        let (name, rest) = datum.as_compound()?;
        let head = match self.resolve(name) {
            Some(identity) => identity.clone(),
            None => unbound
                .entry(name.to_string())
                .or_insert_with(|| Identity::fresh(name))
                .clone(),
        };
        let children = rest
            .iter()
            .map(|child| self.bind_with(child, unbound))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Syntax::form(&head, children))
    }
}
