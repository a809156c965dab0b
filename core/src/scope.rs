//! Per-type scoping tokens used to attribute-scope compiled CSS.
//!
//! Every component type is assigned one random token for the lifetime of the
//! process. The token serves three roles: it keys the style node injected
//! into the host document, it is stamped as an attribute on every markup tag
//! built while an instance of the type is rendering, and it is recorded as
//! an implicit prop on child instances so parent scoping rules reach nested
//! markup.

use std::rc::Rc;

use core::fmt;

/// A per-type scoping token, shared by all instances of a component type.
///
/// Tokens compare by text value, and cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeToken(Rc<str>);

impl ScopeToken {
    /// Generates a fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        let unique = uuid::Uuid::new_v4().simple();
        Self(Rc::from(format!("cs-{unique}").as_str()))
    }

    /// Returns the token text, usable as an attribute or prop key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_token_shape() {
        let token = ScopeToken::generate();
        assert!(token.as_str().starts_with("cs-"));
        assert_eq!(token.as_str().len(), 3 + 32);
    }

    #[test]
    fn test_scope_token_unique() {
        assert_ne!(ScopeToken::generate(), ScopeToken::generate());
    }
}
