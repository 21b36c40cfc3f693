//! Name-based surface trees handed over by a reader.
//!
//! A `Datum` is what a reader produces before any form has been recognized:
//! heads are plain names. [`crate::macros::FormRegistry::bind`] turns a datum
//! into a [`Syntax`](crate::ast::Syntax) tree by resolving those names to
//! identities exactly once, at the boundary.
//!
//! The JSON shape is:
//! - `["head", child, ...]` for a compound node,
//! - `"x"` for a symbol, `{"str": "text"}` for a string literal,
//! - integers, floats and booleans for themselves.

use serde::{Deserialize, Serialize};

use crate::{err_msg, FormError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Datum {
    Bool(bool),
    Int(i64),
    Float(f64),
    Symbol(String),
    Str { str: String },
    List(Vec<Datum>),
}

impl Datum {
    /// Parses a datum from its JSON representation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use coreform::ast::Datum;
    /// let datum = Datum::from_json(r#"["my-app", 1, "x"]"#).unwrap();
    /// assert_eq!(
    ///     datum,
    ///     Datum::List(vec![Datum::Symbol("my-app".into()), Datum::Int(1), Datum::Symbol("x".into())])
    /// );
    /// ```
    pub fn from_json(source: &str) -> Result<Self, FormError> {
        serde_json::from_str(source).map_err(|e| err_msg!(Input, "malformed datum: {}", e))
    }

    pub fn to_json(&self) -> Result<String, FormError> {
        serde_json::to_string(self).map_err(|e| err_msg!(Input, "cannot encode datum: {}", e))
    }

    /// Splits a compound datum into its head name and children.
    pub fn as_compound(&self) -> Result<(&str, &[Datum]), FormError> {
        let Datum::List(items) = self else {
            return Err(err_msg!(Input, "expected a compound datum"));
        };
        let Some((head, rest)) = items.split_first() else {
            return Err(err_msg!(Input, "a compound datum needs a head name"));
        };
        let Datum::Symbol(name) = head else {
            return Err(err_msg!(Input, "the head of a compound datum must be a name, found {:?}", head));
        };
        Ok((name, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_atom_shape() {
        let datum = Datum::from_json(r#"["q", true, 3, 2.5, "sym", {"str": "text"}]"#).unwrap();
        let (head, children) = datum.as_compound().unwrap();
        assert_eq!(head, "q");
        assert_eq!(
            children,
            &[
                Datum::Bool(true),
                Datum::Int(3),
                Datum::Float(2.5),
                Datum::Symbol("sym".to_string()),
                Datum::Str { str: "text".to_string() },
            ]
        );
    }

    #[test]
    fn rejects_headless_lists() {
        let empty = Datum::from_json("[]").unwrap();
        assert!(matches!(empty.as_compound(), Err(FormError::Input { .. })));
        let numeric = Datum::from_json("[1, 2]").unwrap();
        assert!(matches!(numeric.as_compound(), Err(FormError::Input { .. })));
    }

    #[test]
    fn malformed_json_is_an_input_error() {
        assert!(matches!(Datum::from_json("[\"app\", "), Err(FormError::Input { .. })));
    }
}
