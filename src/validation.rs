//! Backend contract check for fully expanded trees.
//!
//! A backend that receives the output of [`Expander::expand`] can rely on
//! every compound node being a registered core form with a well-formed shape,
//! apart from nodes explicitly stopped at the caller's request. The functions
//! here verify that contract using nothing but the registry, so a backend can
//! walk forms it has never heard of by following their descriptors.
//!
//! The walk keeps its own stack rather than recursing, so it accepts trees of
//! any depth.
//!
//! [`Expander::expand`]: crate::macros::Expander::expand

use crate::ast::{Form, NodePath, Syntax};
use crate::macros::{Descriptor, Entry, FormRegistry, Position, StopSet};
use crate::FormError;

/// Verifies that `tree` contains only core forms, atoms, and nodes stopped at
/// heads in `stop_set`.
///
/// # Errors
/// - `UnknownForm` for a head the registry has never seen
/// - `UnexpandedMacro` for a surviving macro use
/// - `ShapeError` for a core form with the wrong arity
/// - `UnconsumedWrapper` for a wrapper around a head outside `stop_set`
pub fn check_expanded(
    registry: &FormRegistry,
    tree: &Syntax,
    stop_set: &StopSet,
) -> Result<(), FormError> {
    let mut walk = Walk {
        registry,
        stop_set: Some(stop_set),
        visitor: accept_all,
    };
    walk.run(tree)
}

/// Calls `visitor` on every core form reachable through expression positions,
/// outermost first.
///
/// Stopped nodes are not entered. Walking halts at the first error, either
/// from the visitor or from a head that is not a core form.
///
/// # Examples
///
/// ```rust
/// use coreform::ast::Syntax;
/// use coreform::macros::std::{base_registry, std_forms};
/// use coreform::validation::for_each_core_form;
///
/// let reg = base_registry();
/// let forms = std_forms();
/// let tree = Syntax::form(&forms.if_, vec![
///     Syntax::bool(true),
///     Syntax::form(&forms.quote, vec![Syntax::symbol("x")]),
///     Syntax::int(0),
/// ]);
/// let mut seen = Vec::new();
/// for_each_core_form(&reg, &tree, |form, _descriptor, path| {
///     seen.push(format!("{} at {}", form.head(), path));
///     Ok(())
/// }).unwrap();
/// assert_eq!(seen, vec!["if at <root>", "quote at <root>.1"]);
/// ```
pub fn for_each_core_form<F>(registry: &FormRegistry, tree: &Syntax, visitor: F) -> Result<(), FormError>
where
    F: FnMut(&Form, &Descriptor, &NodePath) -> Result<(), FormError>,
{
    let mut walk = Walk {
        registry,
        stop_set: None,
        visitor,
    };
    walk.run(tree)
}

// ============================================================================
// Tree walk
// ============================================================================

fn accept_all(_: &Form, _: &Descriptor, _: &NodePath) -> Result<(), FormError> {
    Ok(())
}

struct Walk<'a, F> {
    registry: &'a FormRegistry,
    // `None` skips stopped nodes without judging them.
    stop_set: Option<&'a StopSet>,
    visitor: F,
}

impl<'a, F> Walk<'a, F>
where
    F: FnMut(&Form, &Descriptor, &NodePath) -> Result<(), FormError>,
{
    fn run(&mut self, tree: &Syntax) -> Result<(), FormError> {
        let mut pending = vec![(tree, NodePath::root())];
        while let Some((node, path)) = pending.pop() {
            let Syntax::Form(form) = node else {
                self.leaf(node, &path)?;
                continue;
            };
            let Some(descriptor) = self.form(form, &path)? else {
                continue;
            };
            for (index, child) in form.children().iter().enumerate().rev() {
                if descriptor.position(index) == Some(Position::Expression) {
                    pending.push((child, path.child(index)));
                }
            }
        }
        Ok(())
    }

    fn leaf(&mut self, node: &Syntax, path: &NodePath) -> Result<(), FormError> {
        match node {
            Syntax::Atom(_) => Ok(()),
            Syntax::Stopped(stopped) => {
                let Some(stop_set) = self.stop_set else {
                    return Ok(());
                };
                match stopped.inner().head() {
                    Some(head) if stop_set.contains(head) => Ok(()),
                    head => Err(FormError::UnconsumedWrapper {
                        identity: head.unwrap_or(stopped.tag()).clone(),
                        position: path.clone(),
                    }),
                }
            }
            Syntax::Form(_) => Ok(()),
        }
    }

    // Checks one form and returns the descriptor to walk its children by, or
    // `None` when the form is left alone.
    fn form(&mut self, form: &Form, path: &NodePath) -> Result<Option<&'a Descriptor>, FormError> {
        let head = form.head();
        if self.stop_set.map_or(false, |stop_set| stop_set.contains(head)) {
            return Ok(None);
        }
        let descriptor = match self.registry.get(head) {
            Some(Entry::Core(descriptor)) => descriptor,
            Some(Entry::Macro(_)) => {
                return Err(FormError::UnexpandedMacro {
                    identity: head.clone(),
                    position: path.clone(),
                })
            }
            None => {
                return Err(FormError::UnknownForm {
                    identity: head.clone(),
                    position: path.clone(),
                })
            }
        };
        descriptor.check_shape(form, path)?;
        (self.visitor)(form, descriptor, path)?;
        Ok(Some(descriptor))
    }
}
