use std::error::Error as StdError;

use thiserror::Error;

/// Errors shared by every Hawser crate.
///
/// The variants are kinds rather than call sites: a message carries the
/// details, while callers match on the kind to decide whether a failure is a
/// bad setup, bad data, or a broken invariant.
#[derive(Debug, Error)]
pub enum Error {
    /// A setup value was rejected, such as an unknown scheme name.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A buffer could not be allocated.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// A call received data of the wrong shape or for the wrong object role.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal invariant does not hold.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A derivative producer failed while the engine was stepping.
    #[error("model error: {0}")]
    Model(#[source] Box<dyn StdError + Send + Sync>),
}

impl Error {
    /// Wraps a foreign error raised while evaluating a model.
    pub fn model<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        Self::Model(Box::new(err))
    }

    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn out_of_memory(msg: impl Into<String>) -> Self {
        Self::OutOfMemory(msg.into())
    }
}
