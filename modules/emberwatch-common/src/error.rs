use thiserror::Error;

/// Failure taxonomy for every store-facing operation.
///
/// A failed call must never collapse into an empty result set — callers
/// always see one of these variants. `Transient` is the only variant a
/// caller may retry.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transient store failure: {0}")]
    Transient(String),

    #[error("Unknown store failure: {0}")]
    Unknown(String),

    /// The subscription row exists but the zone counter was not bumped.
    /// Recoverable: the derived count over Subscription rows is correct.
    #[error("subscription {subscription_id} created but zone counter update failed: {source}")]
    SubscriptionCounterFailed {
        subscription_id: String,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// True when the caller may retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}
