//! Expansion context threaded through recursive expansion.
//!
//! A context is a value: every extension (entering a binding form, consuming
//! one unit of the depth fuse, descending into a child) returns a new context
//! and leaves the caller's untouched. The fields are `im` persistent
//! collections, so those copies share structure and stay cheap.
//!
//! Two counters share the same ceiling. The fuse counts macro steps along a
//! path; the nesting level counts recursive descents (core-form children and
//! nested `local_expand` calls), so the loop never recurses deeper than the
//! ceiling.

use std::sync::atomic::{AtomicU64, Ordering};

use im::{HashMap, HashSet, Vector};

use crate::ast::{Identity, NodePath};
use crate::FormError;

/// The set of identities an expansion call must leave unexpanded.
pub type StopSet = HashSet<Identity>;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// A unique lexical scope introduced by a binding position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    pub fn fresh() -> Self {
        ScopeId(NEXT_SCOPE_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Stop set, lexical scopes and depth fuse for one point of an expansion.
#[derive(Debug, Clone)]
pub struct ExpansionContext {
    stop_set: StopSet,
    scopes: Vector<ScopeId>,
    bindings: HashMap<String, ScopeId>,
    limit: usize,
    remaining: usize,
    chain: Vector<Identity>,
    path: Vector<usize>,
    nesting: usize,
}

impl ExpansionContext {
    /// A root context with an empty scope and a full fuse of `limit` re-entries.
    pub fn new(stop_set: StopSet, limit: usize) -> Self {
        ExpansionContext {
            stop_set,
            scopes: Vector::new(),
            bindings: HashMap::new(),
            limit,
            remaining: limit,
            chain: Vector::new(),
            path: Vector::new(),
            nesting: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Stop set
    // ------------------------------------------------------------------------

    pub fn stop_set(&self) -> &StopSet {
        &self.stop_set
    }

    pub fn stops(&self, identity: &Identity) -> bool {
        self.stop_set.contains(identity)
    }

    // ------------------------------------------------------------------------
    // Lexical scope
    // ------------------------------------------------------------------------

    /// Enters a fresh scope binding `names`; returns the extended context.
    pub fn enter_scope<I>(&self, names: I) -> (Self, ScopeId)
    where
        I: IntoIterator<Item = String>,
    {
        let scope = ScopeId::fresh();
        let mut next = self.clone();
        next.scopes.push_back(scope);
        for name in names {
            next.bindings.insert(name, scope);
        }
        (next, scope)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// The innermost scope binding `name`.
    pub fn binding_of(&self, name: &str) -> Option<ScopeId> {
        self.bindings.get(name).copied()
    }

    /// Enclosing scopes, outermost first.
    pub fn scopes(&self) -> &Vector<ScopeId> {
        &self.scopes
    }

    // ------------------------------------------------------------------------
    // Depth fuse
    // ------------------------------------------------------------------------

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Macro re-entries on the path to this point, in order.
    pub fn chain(&self) -> &Vector<Identity> {
        &self.chain
    }

    /// Consumes one unit of the fuse for a re-entry through `identity`.
    pub fn consume(&self, identity: &Identity) -> Result<Self, FormError> {
        if self.remaining == 0 {
            return Err(FormError::ExpansionDepthExceeded {
                limit: self.limit,
                chain: self.chain.iter().cloned().collect(),
                position: self.path(),
            });
        }
        let mut next = self.clone();
        next.remaining -= 1;
        next.chain.push_back(identity.clone());
        Ok(next)
    }

    // ------------------------------------------------------------------------
    // Position
    // ------------------------------------------------------------------------

    /// The context for the `index`th child of the current node.
    ///
    /// Fails with `NestingTooDeep` once the nesting level reaches the limit.
    pub fn child(&self, index: usize) -> Result<Self, FormError> {
        let mut next = self.deeper()?;
        next.path.push_back(index);
        Ok(next)
    }

    /// The context for a nested expansion of the current node.
    pub fn nested(&self, stop_set: StopSet) -> Result<Self, FormError> {
        let mut next = self.deeper()?;
        next.stop_set = stop_set;
        Ok(next)
    }

    /// Recursive descents on the path to this point.
    pub fn nesting(&self) -> usize {
        self.nesting
    }

    fn deeper(&self) -> Result<Self, FormError> {
        if self.nesting >= self.limit {
            return Err(FormError::NestingTooDeep {
                limit: self.limit,
                position: self.path(),
            });
        }
        let mut next = self.clone();
        next.nesting += 1;
        Ok(next)
    }

    pub fn path(&self) -> NodePath {
        self.path.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_leave_the_parent_context_untouched() {
        let root = ExpansionContext::new(StopSet::new(), 4);
        let (inner, scope) = root.enter_scope(vec!["x".to_string()]);
        assert!(inner.is_bound("x"));
        assert_eq!(inner.binding_of("x"), Some(scope));
        assert!(!root.is_bound("x"));
        assert!(root.scopes().is_empty());
    }

    #[test]
    fn inner_scopes_shadow_outer_ones() {
        let root = ExpansionContext::new(StopSet::new(), 4);
        let (outer, first) = root.enter_scope(vec!["x".to_string()]);
        let (inner, second) = outer.enter_scope(vec!["x".to_string()]);
        assert_ne!(first, second);
        assert_eq!(inner.binding_of("x"), Some(second));
        assert_eq!(inner.scopes().len(), 2);
    }

    #[test]
    fn the_fuse_runs_out_after_limit_reentries() {
        let looping = Identity::fresh("loop");
        let mut ctx = ExpansionContext::new(StopSet::new(), 3);
        for _ in 0..3 {
            ctx = ctx.consume(&looping).unwrap();
        }
        assert_eq!(ctx.remaining(), 0);
        match ctx.consume(&looping) {
            Err(FormError::ExpansionDepthExceeded { limit, chain, .. }) => {
                assert_eq!(limit, 3);
                assert_eq!(chain.len(), 3);
            }
            other => panic!("expected the fuse to trip, got {:?}", other),
        }
    }

    #[test]
    fn child_contexts_extend_the_path() {
        let ctx = ExpansionContext::new(StopSet::new(), 2)
            .child(2)
            .and_then(|ctx| ctx.child(0))
            .unwrap();
        assert_eq!(ctx.path(), NodePath::from(vec![2, 0]));
        assert_eq!(ctx.nesting(), 2);
        assert_eq!(ctx.remaining(), 2);
    }

    #[test]
    fn descents_stop_at_the_ceiling() {
        let ctx = ExpansionContext::new(StopSet::new(), 2)
            .child(0)
            .and_then(|ctx| ctx.nested(StopSet::new()))
            .unwrap();
        match ctx.child(1) {
            Err(FormError::NestingTooDeep { limit, position }) => {
                assert_eq!(limit, 2);
                assert_eq!(position, NodePath::from(vec![0]));
            }
            other => panic!("expected the nesting ceiling, got {:?}", other),
        }
    }
}
