//! Error types.
//!
//! The engine has no failure modes of its own. Every error in this crate
//! originates in user code (a Reactive body, an Observer body) and is
//! carried back to the nearest boundary: the `invoke()` caller or the
//! `flush()` caller.

use std::error::Error as StdError;
use std::fmt::Display;
use std::sync::Arc;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error raised by a reactive body.
///
/// Errors are cheap to clone because a [`Reactive`](crate::reactive::Reactive)
/// caches the error of its last execution and re-raises it on every read
/// until a dependency changes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A typed error returned by user code.
    #[error(transparent)]
    Failed(Arc<dyn StdError + Send + Sync + 'static>),

    /// An ad-hoc failure described by a message.
    #[error("{0}")]
    Message(String),

    /// Several Observers failed during one flush.
    #[error("{} observers failed during flush", .0.len())]
    Observers(Vec<Error>),
}

impl Error {
    /// Wrap a typed error.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Failed(Arc::new(error))
    }

    /// Build an error from a message.
    pub fn msg(message: impl Display) -> Self {
        Self::Message(message.to_string())
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Self::Message(message.to_owned())
    }
}
