//! The stop/resume protocol.
//!
//! When the expansion loop stops at a head in the stop set, it returns the
//! node wrapped in a single-layer marker tagged with the protocol's identity.
//! A caller that wants to resume expansion below that boundary unwraps it
//! through the same protocol; a wrapper carrying any other tag is refused.

use crate::ast::{Identity, Stopped, Syntax};
use crate::FormError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopProtocol {
    tag: Identity,
}

impl StopProtocol {
    /// A protocol with a freshly minted tag.
    pub fn new() -> Self {
        StopProtocol {
            tag: Identity::fresh("stop"),
        }
    }

    pub fn with_tag(tag: Identity) -> Self {
        StopProtocol { tag }
    }

    pub fn tag(&self) -> &Identity {
        &self.tag
    }

    /// Marks `node` as already expanded.
    ///
    /// Wrapping a node that already carries a wrapper, from this protocol or
    /// any other, is refused: one logical boundary gets one marker.
    pub fn wrap(&self, node: Syntax) -> Result<Syntax, FormError> {
        if let Syntax::Stopped(existing) = &node {
            return Err(FormError::DoubleWrap {
                tag: existing.tag().clone(),
                node: existing.inner().clone(),
            });
        }
        Ok(Syntax::Stopped(Stopped::new(self.tag.clone(), node)))
    }

    /// Removes this protocol's wrapper from `node`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use coreform::ast::Syntax;
    /// use coreform::macros::StopProtocol;
    /// let protocol = StopProtocol::new();
    /// let wrapped = protocol.wrap(Syntax::int(7)).unwrap();
    /// assert_eq!(protocol.unwrap(&wrapped).unwrap(), Syntax::int(7));
    /// assert!(StopProtocol::new().unwrap(&wrapped).is_err());
    /// ```
    pub fn unwrap(&self, node: &Syntax) -> Result<Syntax, FormError> {
        match node {
            Syntax::Stopped(stopped) if stopped.tag() == &self.tag => Ok(stopped.inner().clone()),
            Syntax::Stopped(stopped) => Err(FormError::NotWrapped {
                expected: self.tag.clone(),
                found: format!("a wrapper tagged `{:?}`", stopped.tag()),
            }),
            other => Err(FormError::NotWrapped {
                expected: self.tag.clone(),
                found: format!("unwrapped node {}", other.pretty()),
            }),
        }
    }

    /// True if `node` carries this protocol's wrapper.
    pub fn is_wrapped(&self, node: &Syntax) -> bool {
        matches!(node, Syntax::Stopped(stopped) if stopped.tag() == &self.tag)
    }
}

impl Default for StopProtocol {
    fn default() -> Self {
        Self::new()
    }
}
