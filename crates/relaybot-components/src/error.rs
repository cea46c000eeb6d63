use thiserror::Error;

/// Failures surfaced by the component dispatch table.
///
/// An unknown or expired custom id is not an error; `resolve_and_invoke`
/// reports it as `Ok(false)`.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("custom id `{0}` is already registered")]
    DuplicateId(String),
    #[error("custom id `{0}` is already being handled")]
    InFlight(String),
    #[error("handler for `{custom_id}` failed: {source:#}")]
    Handler {
        custom_id: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("handler for `{custom_id}` panicked")]
    HandlerPanicked { custom_id: String },
}

impl DispatchError {
    /// The custom id this error concerns.
    pub fn custom_id(&self) -> &str {
        match self {
            DispatchError::DuplicateId(id) | DispatchError::InFlight(id) => id,
            DispatchError::Handler { custom_id, .. }
            | DispatchError::HandlerPanicked { custom_id } => custom_id,
        }
    }

    /// Whether the registered handler itself failed.
    pub fn is_handler_failure(&self) -> bool {
        matches!(
            self,
            DispatchError::Handler { .. } | DispatchError::HandlerPanicked { .. }
        )
    }
}
