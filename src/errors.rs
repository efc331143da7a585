//! Atom Error Hierarchy
//!
//! Errors are grouped by the layer that detects them. None of them is fatal:
//! misuse is reported and the offending call degrades to a no-op, transport
//! failures are folded into synthetic `onError` responses by the pipeline.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed store paths
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Malformed watch registrations
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Definition registration and lookup failures
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Network level failures reported by a [`crate::Transport`]
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Configuration source failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration values that parsed but make no sense
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The event loop receiver was dropped
    #[error("Atom event loop closed")]
    EventLoopClosed,

    /// Another task is already driving the event loop
    #[error("Atom event loop is already running")]
    EventLoopBusy,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    #[error("Invalid paths in watch call: {0}. Paths should be a non-empty list of valid paths.")]
    InvalidPaths(String),

    #[error(
        "Invalid validators in watch call: {0}. Validators should map a path to one or more \
         predicates."
    )]
    InvalidValidators(String),

    #[error("Invalid callbacks in watch call. At least one callback is required.")]
    InvalidCallbacks,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("Invalid name in create('{kind}', '{name}', {{...}}). Name should be a non-empty string.")]
    InvalidName { kind: &'static str, name: String },

    #[error("Required {property} property in create('{kind}', '{name}', {{...}})")]
    MissingProperty {
        kind: &'static str,
        name: String,
        property: &'static str,
    },

    #[error("Invalid \"{property}\" property in create('{kind}', '{name}', {{...}}). {hint}")]
    InvalidProperty {
        kind: &'static str,
        name: String,
        property: &'static str,
        hint: String,
    },

    #[error("No {kind} definition named '{name}'")]
    UnknownDefinition { kind: &'static str, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection level failure (DNS, refused, reset ...)
    #[error("Network failure: {0}")]
    Network(String),

    /// No response within `api.request_timeout_in_ms`
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// The request was cancelled through its cancellation token
    #[error("Request cancelled")]
    Cancelled,

    /// Body was not valid JSON
    #[error("Invalid response body: {0}")]
    InvalidBody(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
