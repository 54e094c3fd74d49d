//! Public error types for the host binding layer.
//!
//! Registry, builder, and accessor errors are programmer errors: they are
//! raised synchronously at the point of misuse and never retried. Errors
//! reported by the engine pass through with their original message intact.

use thiserror::Error;

/// Public error type for all host-binding operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A value that cannot cross the engine boundary (absent data, or a
    /// callback flowing the wrong way).
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// A type name that is neither a primitive nor a defined alias.
    #[error("unknown type name: {0}")]
    UnknownType(String),

    /// A type alias name defined twice in the same registry.
    #[error("type alias already defined: {0}")]
    DuplicateAlias(String),

    /// Malformed function declaration, reported against the name of the
    /// function's first argument.
    #[error("invalid declaration of function '{function}': {message}")]
    Builder { function: String, message: String },

    /// A required argument was not supplied at the call site.
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    /// An argument name that was never declared for this function.
    #[error("argument '{0}' is not declared for this function")]
    UnknownArgumentName(String),

    /// Operation on a released namespace, script, block, or evaluator.
    #[error("{0} has been destroyed")]
    UseAfterDestroy(&'static str),

    /// Failure reported by the engine. The message is the engine's own,
    /// verbatim.
    #[error("{0}")]
    Engine(String),
}
