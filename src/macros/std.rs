//!
//! The built-in base vocabulary: a handful of core forms and the standard
//! macros defined on top of them.
//!
//! Built-ins get no special treatment from the engine. They are declared
//! through the same registry calls as user forms, and each standard macro
//! refers to the core forms it produces by the identities captured at
//! declaration, never by name.
//!
//! | Form     | Kind  | Shape / rewrite                                    |
//! |----------|-------|----------------------------------------------------|
//! | `app`    | core  | `(expression expression)`                          |
//! | `lambda` | core  | `(binding expression...)`                          |
//! | `let`    | core  | `(binding expression)`                             |
//! | `if`     | core  | `(expression expression expression)`               |
//! | `quote`  | core  | `(opaque)`                                         |
//! | `begin`  | core  | `(expression...)`                                  |
//! | `when`   | macro | `(when c b...)` => `(if c (begin b...) #f)`        |
//! | `unless` | macro | `(unless c b...)` => `(if c #f (begin b...))`      |
//! | `and`    | macro | `(and a b...)` => `(if a (and b...) #f)`           |
//! | `or`     | macro | `(or a b...)` => `(if a #t (or b...))`             |
//! | `let*`   | macro | `(let* x y body)` => `(let x (let* y body))`       |

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::ast::{Form, Identity, Syntax};
use crate::macros::expander::MacroCx;
use crate::macros::registry::FormRegistry;
use crate::macros::types::{Descriptor, Position, Transformer};
use crate::FormError;

// ===================================================================================================
// REGISTRY: Standard Form Registration
// ===================================================================================================

/// Identities of the built-in forms, as declared in one registry.
#[derive(Debug, Clone)]
pub struct StdForms {
    pub app: Identity,
    pub lambda: Identity,
    pub let_: Identity,
    pub if_: Identity,
    pub quote: Identity,
    pub begin: Identity,
    pub when: Identity,
    pub unless: Identity,
    pub and: Identity,
    pub or: Identity,
    pub let_star: Identity,
}

static BASE: Lazy<(Arc<FormRegistry>, StdForms)> = Lazy::new(|| {
    let mut registry = FormRegistry::new();
    let forms = register_std_forms(&mut registry);
    (Arc::new(registry), forms)
});

/// The process-wide, read-only base registry of built-ins.
pub fn base_registry() -> Arc<FormRegistry> {
    Arc::clone(&BASE.0)
}

/// Identities of the forms in [`base_registry`].
pub fn std_forms() -> &'static StdForms {
    &BASE.1
}

/// Declares every built-in in `registry` under fresh identities.
pub fn register_std_forms(registry: &mut FormRegistry) -> StdForms {
    use Position::{Binding, Expression, Opaque};

    // Core forms
    let app = registry.define_core_form("app", Descriptor::new([Expression, Expression]));
    let lambda = registry.define_core_form("lambda", Descriptor::variadic([Binding], Expression));
    let let_ = registry.define_core_form("let", Descriptor::new([Binding, Expression]));
    let if_ = registry.define_core_form("if", Descriptor::new([Expression, Expression, Expression]));
    let quote = registry.define_core_form("quote", Descriptor::new([Opaque]));
    let begin = registry.define_core_form("begin", Descriptor::variadic([], Expression));

    // Control flow
    let when = registry.define_macro("when", expand_when(&if_, &begin));
    let unless = registry.define_macro("unless", expand_unless(&if_, &begin));

    // Self-referential
    let and = registry.define_recursive_macro("and", |and| expand_and(and, &if_));
    let or = registry.define_recursive_macro("or", |or| expand_or(or, &if_));
    let let_star = registry.define_recursive_macro("let*", |let_star| expand_let_star(let_star, &let_));

    StdForms {
        app,
        lambda,
        let_,
        if_,
        quote,
        begin,
        when,
        unless,
        and,
        or,
        let_star,
    }
}

// ===================================================================================================
// STANDARD MACROS
// ===================================================================================================

fn expand_when(if_: &Identity, begin: &Identity) -> Transformer {
    let (if_, begin) = (if_.clone(), begin.clone());
    Transformer::new(move |node, cx| {
        let (test, body) = split_test(node, cx)?;
        let then = Syntax::form(&begin, body.to_vec());
        Ok(Syntax::form(&if_, vec![test.clone(), then, Syntax::bool(false)]))
    })
}

fn expand_unless(if_: &Identity, begin: &Identity) -> Transformer {
    let (if_, begin) = (if_.clone(), begin.clone());
    Transformer::new(move |node, cx| {
        let (test, body) = split_test(node, cx)?;
        let otherwise = Syntax::form(&begin, body.to_vec());
        Ok(Syntax::form(&if_, vec![test.clone(), Syntax::bool(false), otherwise]))
    })
}

fn expand_and(and: &Identity, if_: &Identity) -> Transformer {
    let (and, if_) = (and.clone(), if_.clone());
    Transformer::new(move |node, cx| {
        let args = use_site(node, cx)?.children();
        match args {
            [] => Ok(Syntax::bool(true)),
            [only] => Ok(only.clone()),
            [first, rest @ ..] => {
                let tail = Syntax::form(&and, rest.to_vec());
                Ok(Syntax::form(&if_, vec![first.clone(), tail, Syntax::bool(false)]))
            }
        }
    })
}

fn expand_or(or: &Identity, if_: &Identity) -> Transformer {
    let (or, if_) = (or.clone(), if_.clone());
    Transformer::new(move |node, cx| {
        let args = use_site(node, cx)?.children();
        match args {
            [] => Ok(Syntax::bool(false)),
            [only] => Ok(only.clone()),
            [first, rest @ ..] => {
                let tail = Syntax::form(&or, rest.to_vec());
                Ok(Syntax::form(&if_, vec![first.clone(), Syntax::bool(true), tail]))
            }
        }
    })
}

fn expand_let_star(let_star: &Identity, let_: &Identity) -> Transformer {
    let (let_star, let_) = (let_star.clone(), let_.clone());
    Transformer::new(move |node, cx| {
        let args = use_site(node, cx)?.children();
        match args {
            [] => Err(cx.error("expected a body")),
            [body] => Ok(body.clone()),
            [binder, rest @ ..] => {
                let inner = Syntax::form(&let_star, rest.to_vec());
                Ok(Syntax::form(&let_, vec![binder.clone(), inner]))
            }
        }
    })
}

// ===================================================================================================
// INTERNAL HELPERS
// ===================================================================================================

/// The use-site form a transformer was invoked on.
fn use_site<'n>(node: &'n Syntax, cx: &MacroCx<'_>) -> Result<&'n Form, FormError> {
    node.as_form()
        .ok_or_else(|| cx.error(format!("expected a form, found {}", node.pretty())))
}

/// Splits `(m test body...)` into the test and the body.
fn split_test<'n>(node: &'n Syntax, cx: &MacroCx<'_>) -> Result<(&'n Syntax, &'n [Syntax]), FormError> {
    let form = use_site(node, cx)?;
    form.children()
        .split_first()
        .ok_or_else(|| cx.error("expected a test expression"))
}
