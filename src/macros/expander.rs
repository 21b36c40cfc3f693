//!
//! The expansion loop and transformer invocation.
//!
//! ## Expansion
//!
//! Each node moves through a small state machine:
//!
//! - an atom, or a node already wrapped by a stop/resume protocol, is
//!   returned unchanged;
//! - a form whose head is in the stop set is returned wrapped;
//! - a form whose head is a macro is rewritten by its transformer and the
//!   result is classified again from scratch;
//! - a form whose head is a core form keeps its head and arity, and each child
//!   is expanded, bound, or left alone according to the form's descriptor;
//! - a form whose head is not registered fails with `UnknownForm`.
//!
//! ## Recursion and Depth
//!
//! Transformers may call back into the loop through [`MacroCx::local_expand`].
//! Both that mutual recursion and chains of macro-to-macro rewrites are
//! bounded by the depth fuse carried in the [`ExpansionContext`]: every macro
//! step consumes one unit, and an empty fuse fails with
//! `ExpansionDepthExceeded` naming every re-entry on the path.
//!
//! Recursion itself is bounded by the same ceiling. Descending into a core
//! form's child or into a nested `local_expand` raises the nesting level, and
//! a descent past the ceiling fails with `NestingTooDeep` instead of growing
//! the stack.

use std::cell::RefCell;

use tracing::{debug, trace, warn};

use crate::ast::{Form, Identity, NodePath, Syntax};
use crate::macros::context::{ExpansionContext, StopSet};
use crate::macros::protocol::StopProtocol;
use crate::macros::registry::FormRegistry;
use crate::macros::types::{
    Descriptor, Entry, ExpansionStep, Position, Provenance, Transformer, MAX_EXPANSION_DEPTH,
};
use crate::FormError;

// =============================
// Public API for macro expansion
// =============================

/// Options for a top-level expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Ceiling on macro re-entries along one path, and on nesting depth.
    pub max_depth: usize,
    /// Fail instead of warning when the result carries wrappers for forms
    /// outside the top-level stop set.
    pub strict_wrappers: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        ExpandOptions {
            max_depth: MAX_EXPANSION_DEPTH,
            strict_wrappers: false,
        }
    }
}

/// The expansion engine for one registry.
///
/// # Examples
///
/// ```rust
/// use coreform::ast::Syntax;
/// use coreform::macros::{Descriptor, Expander, FormRegistry, Position, StopSet, Transformer};
///
/// let mut reg = FormRegistry::new();
/// let app = reg.define_core_form("app", Descriptor::new([Position::Expression, Position::Expression]));
/// let target = app.clone();
/// let my_app = reg.define_macro("my-app", Transformer::new(move |node, _cx| {
///     let form = node.as_form().expect("invoked on a form");
///     Ok(Syntax::form(&target, form.children().to_vec()))
/// }));
///
/// let expander = Expander::new(&reg);
/// let input = Syntax::form(&my_app, vec![Syntax::int(1), Syntax::int(2)]);
/// let output = expander.expand(input, StopSet::new()).unwrap();
/// assert_eq!(output, Syntax::form(&app, vec![Syntax::int(1), Syntax::int(2)]));
/// ```
#[derive(Debug, Clone)]
pub struct Expander<'r> {
    registry: &'r FormRegistry,
    protocol: StopProtocol,
    options: ExpandOptions,
}

impl<'r> Expander<'r> {
    pub fn new(registry: &'r FormRegistry) -> Self {
        Self::with_options(registry, ExpandOptions::default())
    }

    pub fn with_options(registry: &'r FormRegistry, options: ExpandOptions) -> Self {
        Expander {
            registry,
            protocol: StopProtocol::new(),
            options,
        }
    }

    /// Uses `protocol` for the wrappers this expander produces.
    pub fn with_protocol(mut self, protocol: StopProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn registry(&self) -> &'r FormRegistry {
        self.registry
    }

    pub fn protocol(&self) -> &StopProtocol {
        &self.protocol
    }

    pub fn options(&self) -> &ExpandOptions {
        &self.options
    }

    /// Expands `node` until only core forms and stopped heads remain.
    pub fn expand(&self, node: Syntax, stop_set: StopSet) -> Result<Syntax, FormError> {
        let session = Session::new(self.registry, &self.protocol, false);
        self.run(&session, node, stop_set)
    }

    /// Like [`Expander::expand`], also returning every macro step taken.
    pub fn expand_traced(
        &self,
        node: Syntax,
        stop_set: StopSet,
    ) -> Result<(Syntax, Vec<ExpansionStep>), FormError> {
        let session = Session::new(self.registry, &self.protocol, true);
        let expanded = self.run(&session, node, stop_set)?;
        Ok((expanded, session.into_trace()))
    }

    fn run(&self, session: &Session<'_>, node: Syntax, stop_set: StopSet) -> Result<Syntax, FormError> {
        let ctx = ExpansionContext::new(stop_set, self.options.max_depth);
        let expanded = expand_node(session, node, &ctx)?;
        self.check_boundary(&expanded, ctx.stop_set())?;
        Ok(expanded)
    }

    // Wrappers for heads in the caller's stop set are the expected result.
    // Anything else was produced by a nested call and never unwrapped.
    fn check_boundary(&self, expanded: &Syntax, stop_set: &StopSet) -> Result<(), FormError> {
        expanded.visit_stopped(|path, stopped| {
            let head = stopped.inner().head();
            if head.map_or(false, |head| stop_set.contains(head)) {
                return Ok(());
            }
            let identity = head.unwrap_or(stopped.tag()).clone();
            let position = NodePath::from(path.to_vec());
            if self.options.strict_wrappers {
                return Err(FormError::UnconsumedWrapper { identity, position });
            }
            warn!(form = %identity, %position, "unconsumed stop wrapper at top-level boundary");
            Ok(())
        })
    }
}

/// Applies a transformer to a use-site node.
pub fn invoke(transformer: &Transformer, node: &Syntax, cx: &MacroCx<'_>) -> Result<Syntax, FormError> {
    debug!(
        form = %cx.identity(),
        remaining = cx.context().remaining(),
        "invoking transformer"
    );
    transformer.call(node, cx)
}

/// What a transformer sees of the engine while it runs.
///
/// Everything here is read-only; there is no way to register forms from inside
/// an expansion.
pub struct MacroCx<'s> {
    session: &'s Session<'s>,
    context: &'s ExpansionContext,
    identity: &'s Identity,
}

impl<'s> MacroCx<'s> {
    /// The macro being invoked.
    pub fn identity(&self) -> &Identity {
        self.identity
    }

    pub fn context(&self) -> &ExpansionContext {
        self.context
    }

    pub fn registry(&self) -> &FormRegistry {
        self.session.registry
    }

    /// The protocol whose wrappers nested expansions produce.
    pub fn protocol(&self) -> &StopProtocol {
        self.session.protocol
    }

    /// Re-enters the expansion loop with the invoking context and a new stop set.
    ///
    /// Scopes, the remaining depth and the nesting level carry over, so nested
    /// calls count against the same ceiling as the enclosing expansion.
    pub fn local_expand(&self, node: Syntax, stop_set: StopSet) -> Result<Syntax, FormError> {
        let ctx = self.context.nested(stop_set)?;
        expand_node(self.session, node, &ctx)
    }

    /// A transformer failure attributed to the invoked macro.
    pub fn error(&self, message: impl Into<String>) -> FormError {
        FormError::Transformer {
            identity: self.identity.clone(),
            message: message.into(),
        }
    }
}

// =============================
// Internal expansion helpers
// =============================

// Shared state of one top-level call, including nested local expansions.
struct Session<'a> {
    registry: &'a FormRegistry,
    protocol: &'a StopProtocol,
    trace: Option<RefCell<Vec<ExpansionStep>>>,
}

impl<'a> Session<'a> {
    fn new(registry: &'a FormRegistry, protocol: &'a StopProtocol, record: bool) -> Self {
        Session {
            registry,
            protocol,
            trace: record.then(|| RefCell::new(Vec::new())),
        }
    }

    fn record(&self, step: ExpansionStep) {
        if let Some(trace) = &self.trace {
            trace.borrow_mut().push(step);
        }
    }

    fn into_trace(self) -> Vec<ExpansionStep> {
        self.trace.map(RefCell::into_inner).unwrap_or_default()
    }
}

// Classification of a node's head against the stop set and registry.
enum Head<'a> {
    Stopped,
    Macro(Provenance, &'a Transformer),
    Core(&'a Descriptor),
}

fn classify<'a>(
    registry: &'a FormRegistry,
    form: &Form,
    ctx: &ExpansionContext,
) -> Result<Head<'a>, FormError> {
    let head = form.head();
    if ctx.stops(head) {
        return Ok(Head::Stopped);
    }
    match registry.lookup_with_provenance(head) {
        Some((provenance, Entry::Macro(transformer))) => Ok(Head::Macro(provenance, transformer)),
        Some((_, Entry::Core(descriptor))) => Ok(Head::Core(descriptor)),
        None => Err(FormError::UnknownForm {
            identity: head.clone(),
            position: ctx.path(),
        }),
    }
}

fn expand_node(session: &Session<'_>, node: Syntax, ctx: &ExpansionContext) -> Result<Syntax, FormError> {
    let mut node = node;
    let mut ctx = ctx.clone();
    loop {
        let form = match &node {
            Syntax::Form(form) => form.clone(),
            Syntax::Atom(_) | Syntax::Stopped(_) => return Ok(node),
        };
        match classify(session.registry, &form, &ctx)? {
            Head::Stopped => {
                trace!(form = %form.head(), "stopped");
                return session.protocol.wrap(node);
            }
            Head::Core(descriptor) => {
                trace!(form = %form.head(), "core form");
                return expand_core(session, &form, descriptor, &ctx);
            }
            Head::Macro(provenance, transformer) => {
                let next = ctx.consume(form.head())?;
                let cx = MacroCx {
                    session,
                    context: &next,
                    identity: form.head(),
                };
                let output = invoke(transformer, &node, &cx)?;
                session.record(ExpansionStep {
                    identity: form.head().clone(),
                    provenance,
                    input: node,
                    output: output.clone(),
                    depth: next.limit() - next.remaining(),
                });
                node = output;
                ctx = next;
            }
        }
    }
}

fn expand_core(
    session: &Session<'_>,
    form: &Form,
    descriptor: &Descriptor,
    ctx: &ExpansionContext,
) -> Result<Syntax, FormError> {
    descriptor.check_shape(form, &ctx.path())?;
    let mut scope = ctx.clone();
    let mut children = Vec::with_capacity(form.arity());
    for (index, child) in form.children().iter().enumerate() {
        let position = descriptor.position(index).unwrap_or(Position::Opaque);
        let expanded = match position {
            Position::Expression => expand_node(session, child.clone(), &scope.child(index)?)?,
            Position::Binding => {
                let (extended, scope_id) = scope.enter_scope(child.binders());
                trace!(form = %form.head(), scope = %scope_id, "entered scope");
                scope = extended;
                child.clone()
            }
            Position::Opaque => child.clone(),
        };
        children.push(expanded);
    }
    Ok(Syntax::Form(form.with_children(children)))
}
