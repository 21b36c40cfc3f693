//!
//! # Overview
//!
//! This module defines the unified, `miette`-based diagnostic type for the
//! Coreform engine. Every failure of registration, expansion, the stop/resume
//! protocol, or input binding is a [`FormError`]. Nothing in the engine
//! recovers from these locally; they propagate with `?` to the caller of the
//! top-level entry point, which decides what to do with them.
//!
//! # Error Construction
//!
//! - Structured variants (`UnknownForm`, `ShapeError`, ...) are built directly
//!   by the component that detects them, carrying the offending identity and
//!   the [`NodePath`] of the failing node.
//! - Message-only variants are built with `err_msg!`:
//!   - `err_msg!(Input, "malformed datum: {}", e)`
//!   - `err_msg!(Transformer, identity, "expected {} children", n)`

use miette::Diagnostic;
use thiserror::Error;

use crate::ast::{Identity, NodePath, Syntax};

/// Type-safe error classification enum that corresponds to `FormError` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// A head identity that was never registered.
    UnknownForm,
    /// Registering an identity twice.
    DuplicateRegistration,
    /// Arity mismatch against a traversal descriptor.
    Shape,
    /// Stop/resume protocol misuse.
    Protocol,
    /// The expansion-depth fuse tripped, or nesting passed the ceiling.
    DepthExceeded,
    /// A macro head survived where only core forms are allowed.
    Unexpanded,
    /// A transformer reported its own failure.
    Transformer,
    /// Malformed input handed to the engine.
    Input,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::UnknownForm => "UnknownForm",
            ErrorType::DuplicateRegistration => "DuplicateRegistration",
            ErrorType::Shape => "ShapeError",
            ErrorType::Protocol => "Protocol",
            ErrorType::DepthExceeded => "ExpansionDepthExceeded",
            ErrorType::Unexpanded => "Unexpanded",
            ErrorType::Transformer => "Transformer",
            ErrorType::Input => "Input",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unified error type for all Coreform failure modes.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("unknown form `{identity:?}` at {position}")]
    UnknownForm { identity: Identity, position: NodePath },

    #[error("form `{identity:?}` is already registered")]
    DuplicateRegistration { identity: Identity },

    #[error("shape error: `{identity}` expects {expected} children, found {found} at {position}")]
    ShapeError {
        identity: Identity,
        expected: String,
        found: usize,
        node: Syntax,
        position: NodePath,
    },

    #[error("stop/resume protocol: expected a wrapper tagged `{expected:?}`, found {found}")]
    NotWrapped { expected: Identity, found: String },

    #[error("stop/resume protocol: node is already wrapped by `{tag:?}`")]
    DoubleWrap { tag: Identity, node: Syntax },

    #[error("expansion depth limit ({limit}) exceeded at {position}")]
    ExpansionDepthExceeded {
        limit: usize,
        chain: Vec<Identity>,
        position: NodePath,
    },

    #[error("nesting limit ({limit}) exceeded at {position}")]
    NestingTooDeep { limit: usize, position: NodePath },

    #[error("macro `{identity}` left unexpanded at {position}")]
    UnexpandedMacro { identity: Identity, position: NodePath },

    #[error("unconsumed stop wrapper around `{identity}` at {position}")]
    UnconsumedWrapper { identity: Identity, position: NodePath },

    #[error("transformer for `{identity}` failed: {message}")]
    Transformer { identity: Identity, message: String },

    #[error("invalid input: {message}")]
    Input { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FormError {
    /// Returns the type-safe classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            FormError::UnknownForm { .. } => ErrorType::UnknownForm,
            FormError::DuplicateRegistration { .. } => ErrorType::DuplicateRegistration,
            FormError::ShapeError { .. } => ErrorType::Shape,
            FormError::NotWrapped { .. } | FormError::DoubleWrap { .. } => ErrorType::Protocol,
            FormError::UnconsumedWrapper { .. } => ErrorType::Protocol,
            FormError::ExpansionDepthExceeded { .. } | FormError::NestingTooDeep { .. } => {
                ErrorType::DepthExceeded
            }
            FormError::UnexpandedMacro { .. } => ErrorType::Unexpanded,
            FormError::Transformer { .. } => ErrorType::Transformer,
            FormError::Input { .. } | FormError::Io(_) => ErrorType::Input,
        }
    }

    /// The identity the failure is about, when there is one.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            FormError::UnknownForm { identity, .. }
            | FormError::DuplicateRegistration { identity }
            | FormError::ShapeError { identity, .. }
            | FormError::UnexpandedMacro { identity, .. }
            | FormError::UnconsumedWrapper { identity, .. }
            | FormError::Transformer { identity, .. } => Some(identity),
            FormError::NotWrapped { expected, .. } => Some(expected),
            FormError::DoubleWrap { tag, .. } => Some(tag),
            FormError::ExpansionDepthExceeded { chain, .. } => chain.last(),
            FormError::NestingTooDeep { .. } | FormError::Input { .. } | FormError::Io(_) => None,
        }
    }

    /// The path of the failing node, for the variants raised during a walk.
    pub fn position(&self) -> Option<&NodePath> {
        match self {
            FormError::UnknownForm { position, .. }
            | FormError::ShapeError { position, .. }
            | FormError::ExpansionDepthExceeded { position, .. }
            | FormError::NestingTooDeep { position, .. }
            | FormError::UnexpandedMacro { position, .. }
            | FormError::UnconsumedWrapper { position, .. } => Some(position),
            _ => None,
        }
    }
}

impl Diagnostic for FormError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let code = match self {
            FormError::UnknownForm { .. } => "coreform::unknown_form",
            FormError::DuplicateRegistration { .. } => "coreform::duplicate_registration",
            FormError::ShapeError { .. } => "coreform::shape",
            FormError::NotWrapped { .. } => "coreform::protocol::not_wrapped",
            FormError::DoubleWrap { .. } => "coreform::protocol::double_wrap",
            FormError::ExpansionDepthExceeded { .. } => "coreform::depth_exceeded",
            FormError::NestingTooDeep { .. } => "coreform::nesting_too_deep",
            FormError::UnexpandedMacro { .. } => "coreform::unexpanded_macro",
            FormError::UnconsumedWrapper { .. } => "coreform::protocol::unconsumed_wrapper",
            FormError::Transformer { .. } => "coreform::transformer",
            FormError::Input { .. } => "coreform::input",
            FormError::Io(_) => "coreform::io",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let help = match self {
            FormError::UnknownForm { .. } => {
                "declare the form before expanding code that uses it".to_string()
            }
            FormError::DuplicateRegistration { .. } => {
                "registrations are permanent; mint a fresh identity instead".to_string()
            }
            FormError::ShapeError { node, .. } => format!("offending node: {}", node.pretty()),
            FormError::NotWrapped { .. } => {
                "only the protocol that produced a wrapper may remove it".to_string()
            }
            FormError::DoubleWrap { .. } => "unwrap the node before wrapping it again".to_string(),
            FormError::ExpansionDepthExceeded { chain, .. } => format!(
                "re-entry chain: {}",
                chain
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ")
            ),
            FormError::NestingTooDeep { .. } => {
                "flatten the input or raise the ceiling with a larger depth limit".to_string()
            }
            FormError::UnconsumedWrapper { .. } => {
                "a nested expansion produced this wrapper but no caller unwrapped it".to_string()
            }
            _ => return None,
        };
        Some(Box::new(help))
    }
}

/// Constructs a message-only `FormError` variant.
///
/// `Input` takes a format string and arguments; `Transformer` takes the
/// identity of the failing macro first.
#[macro_export]
macro_rules! err_msg {
    (Transformer, $identity:expr, $msg:expr $(, $arg:expr)* $(,)?) => {
        $crate::FormError::Transformer {
            identity: ::std::clone::Clone::clone(&$identity),
            message: format!($msg $(, $arg)*),
        }
    };
    (Input, $msg:expr $(, $arg:expr)* $(,)?) => {
        $crate::FormError::Input {
            message: format!($msg $(, $arg)*),
        }
    };
}

#[cfg(test)]
mod diagnostics_tests {
    use miette::Report;

    use super::*;

    #[test]
    fn depth_errors_render_the_reentry_chain() {
        let looping = Identity::fresh("loop");
        let err = FormError::ExpansionDepthExceeded {
            limit: 2,
            chain: vec![looping.clone(), looping],
            position: NodePath::root().child(1),
        };
        assert_eq!(err.error_type(), ErrorType::DepthExceeded);
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("coreform::depth_exceeded"));
        assert!(output.contains("loop -> loop"));
    }

    #[test]
    fn nesting_errors_share_the_depth_classification() {
        let err = FormError::NestingTooDeep {
            limit: 4,
            position: NodePath::from(vec![0, 0, 0, 0]),
        };
        assert_eq!(err.error_type(), ErrorType::DepthExceeded);
        assert_eq!(err.identity(), None);
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("coreform::nesting_too_deep"));
        assert!(output.contains("<root>.0.0.0.0"));
    }

    #[test]
    fn message_macro_builds_transformer_errors() {
        let when = Identity::fresh("when");
        let err = err_msg!(Transformer, when, "expected at least {} child", 1);
        assert_eq!(err.identity(), Some(&when));
        assert_eq!(err.to_string(), "transformer for `when` failed: expected at least 1 child");
    }

    #[test]
    fn shape_errors_carry_the_offending_node() {
        let app = Identity::fresh("app");
        let node = Syntax::form(&app, vec![Syntax::int(1)]);
        let err = FormError::ShapeError {
            identity: app,
            expected: "exactly 2".to_string(),
            found: 1,
            node,
            position: NodePath::root(),
        };
        assert_eq!(err.position(), Some(&NodePath::root()));
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("offending node: (app 1)"));
    }
}
