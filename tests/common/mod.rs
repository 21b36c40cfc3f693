//! # Coreform Test Helpers
//!
//! Small registries shared by the integration tests. Every helper mints its
//! own identities, so tests never observe each other's forms.

#![allow(dead_code)]

use coreform::ast::{Identity, Syntax};
use coreform::macros::{Descriptor, Expander, FormRegistry, Position, StopSet, Transformer};
use coreform::FormError;

/// A registry with core form `app` (two expressions) and macro `my-app`
/// rewriting `(my-app a b)` to `(app a b)`.
pub struct AppFixture {
    pub registry: FormRegistry,
    pub app: Identity,
    pub my_app: Identity,
}

pub fn app_fixture() -> AppFixture {
    let mut registry = FormRegistry::new();
    let app = registry.define_core_form(
        "app",
        Descriptor::new([Position::Expression, Position::Expression]),
    );
    let my_app = registry.define_macro("my-app", rename_to(&app));
    AppFixture {
        registry,
        app,
        my_app,
    }
}

/// A transformer that keeps the children and swaps the head for `target`.
pub fn rename_to(target: &Identity) -> Transformer {
    let target = target.clone();
    Transformer::new(move |node, cx| {
        let form = node
            .as_form()
            .ok_or_else(|| cx.error("expected a form"))?;
        Ok(Syntax::form(&target, form.children().to_vec()))
    })
}

pub fn stop_set(identities: &[&Identity]) -> StopSet {
    identities.iter().map(|identity| (*identity).clone()).collect()
}

/// Expands with default options and an empty stop set, panicking on failure.
pub fn must_expand(registry: &FormRegistry, node: Syntax) -> Syntax {
    let result = Expander::new(registry).expand(node, StopSet::new());
    assert!(result.is_ok(), "expansion failed: {:?}", result);
    result.unwrap()
}

pub fn expand_err(registry: &FormRegistry, node: Syntax) -> FormError {
    match Expander::new(registry).expand(node, StopSet::new()) {
        Ok(out) => panic!("expected expansion to fail, got {}", out),
        Err(e) => e,
    }
}
