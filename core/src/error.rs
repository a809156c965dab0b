//! Error types for component construction and accessor evaluation.

use thiserror::Error;

/// Errors raised while constructing a component instance.
///
/// Both variants are contract violations made by the caller and always
/// propagate; the offending keys are listed sorted so that messages are
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructError {
    /// Props were supplied that the component type does not declare.
    #[error("unexpected props {keys:?} passed to `{component}`")]
    UnexpectedProps {
        /// Name of the component type being constructed.
        component: String,
        /// The undeclared prop keys, sorted.
        keys: Vec<String>,
    },
    /// Declared-required props were missing from the supplied set.
    #[error("missing props {keys:?} for `{component}`")]
    MissingProps {
        /// Name of the component type being constructed.
        component: String,
        /// The missing prop keys, sorted.
        keys: Vec<String>,
    },
}

/// Errors raised when evaluating a declared state, prop or ref accessor.
///
/// These surface through the render result channel: a render closure that
/// reads a misdeclared or undeclared key fails, and the failure is handled
/// by the regular render failure policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// A prop default produced a future; defaults must resolve synchronously.
    #[error("prop `{key}` of `{component}` declares an asynchronous default; defaults must be synchronous")]
    AsyncDefault {
        /// Name of the component type.
        component: String,
        /// The offending prop key.
        key: String,
    },
    /// A state key was read or written that the type does not declare.
    #[error("`{key}` is not a declared state key of `{component}`")]
    UnknownState {
        /// Name of the component type.
        component: String,
        /// The undeclared key.
        key: String,
    },
    /// A prop key was read that the type does not declare.
    #[error("`{key}` is not a declared prop of `{component}`")]
    UnknownProp {
        /// Name of the component type.
        component: String,
        /// The undeclared key.
        key: String,
    },
    /// A ref key was read that the type does not declare.
    #[error("`{key}` is not a declared ref of `{component}`")]
    UnknownRef {
        /// Name of the component type.
        component: String,
        /// The undeclared key.
        key: String,
    },
}
