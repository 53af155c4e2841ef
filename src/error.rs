use thiserror::Error;

/// Failure of an external collaborator (map query, venue data, path planner).
///
/// Callers inside this crate never propagate these; they log and continue
/// with whatever data is available.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Transport-level failure, including timeouts.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The service answered with a body we could not interpret.
    #[error("unexpected response from {service}: {message}")]
    InvalidResponse { service: &'static str, message: String },

    /// The path planner could not produce a route for a query.
    #[error("no route found: {0}")]
    NoRoute(String),
}

impl CollaboratorError {
    pub fn invalid(service: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CollaboratorError>;
