//! Inking engine error types

use liveink_core::StyleError;
use liveink_dispatch::DispatchError;
use thiserror::Error;

/// Errors reported synchronously by the inking engine
#[derive(Error, Debug)]
pub enum InkError {
    /// The style failed validation and was not accepted
    #[error("invalid drawing style: {0}")]
    InvalidStyle(#[from] StyleError),

    /// Reset requires the device to be in contact
    #[error("device must be in the down state to reset a stroke")]
    DeviceNotDown,

    /// The operation is only valid on the application thread
    #[error("operation must run on the application thread")]
    WrongThread,

    /// The dedicated render thread could not be started
    #[error("failed to start render thread: {0}")]
    RenderThread(String),
}

impl From<DispatchError> for InkError {
    fn from(err: DispatchError) -> Self {
        InkError::RenderThread(err.to_string())
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, InkError>;
