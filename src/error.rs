//! Error taxonomy for the mode engine.
//!
//! Handlers and repositories use `anyhow`; the core uses `BotError` so loop
//! ticks and dispatcher stages can decide whether a failure is skippable.

use teloxide::{ApiError, RequestError};
use thiserror::Error;

/// Errors surfaced by the mode engine and the messaging collaborator.
#[derive(Error, Debug)]
pub enum BotError {
    /// User, chat or template id could not be resolved.
    #[error("not found: {0}")]
    NotFound(String),

    /// The platform refused the action (e.g. delete without rights).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Network failure or rate limiting; retried naturally on the next tick.
    #[error("send failed: {0}")]
    TransientSend(String),

    /// Malformed operator input. Nothing was mutated.
    #[error("invalid input: {0}")]
    Config(String),

    /// Persistence failure.
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Result alias for core operations.
pub type BotResult<T> = Result<T, BotError>;

impl From<RequestError> for BotError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Api(api) => match api {
                ApiError::ChatNotFound | ApiError::UserNotFound => Self::NotFound(api.to_string()),
                ApiError::MessageToDeleteNotFound => Self::NotFound(api.to_string()),
                ApiError::MessageCantBeDeleted
                | ApiError::BotBlocked
                | ApiError::BotKicked
                | ApiError::BotKickedFromSupergroup
                | ApiError::CantInitiateConversation => Self::PermissionDenied(api.to_string()),
                other => Self::TransientSend(other.to_string()),
            },
            other => Self::TransientSend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_errors_map_to_taxonomy() {
        let err: BotError = RequestError::Api(ApiError::ChatNotFound).into();
        assert!(matches!(err, BotError::NotFound(_)));

        let err: BotError = RequestError::Api(ApiError::MessageCantBeDeleted).into();
        assert!(matches!(err, BotError::PermissionDenied(_)));

        let err: BotError = RequestError::Api(ApiError::Unknown("boom".into())).into();
        assert!(matches!(err, BotError::TransientSend(_)));
    }
}
