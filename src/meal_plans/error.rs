use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

/// Why a remote workflow call did not produce a usable body.
#[derive(Debug, Error)]
pub enum RemoteCallError {
    #[error("request timed out")]
    Timeout,
    #[error("could not connect: {0}")]
    Connect(String),
    #[error("workflow returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("response body is not JSON: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RemoteCallError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteCallError::Timeout
        } else if e.is_connect() {
            RemoteCallError::Connect(e.to_string())
        } else if e.is_decode() {
            RemoteCallError::Decode(e.to_string())
        } else {
            RemoteCallError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("catalog item {0} could not be resolved")]
    Projection(Uuid),
    #[error("meal plan webhook is not configured ({0} missing)")]
    Configuration(&'static str),
    #[error("remote workflow call failed: {0}")]
    RemoteCall(#[from] RemoteCallError),
    #[error("unrecognised meal plan response: {0}")]
    Normalization(&'static str),
    #[error("retry limit reached after {attempts} attempts")]
    CapExceeded { attempts: u32 },
    #[error("grocery list has no items")]
    EmptyList,
    #[error("meal plan generation already in progress")]
    AlreadyRunning,
    #[error("grocery list not found")]
    ListNotFound,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl GenerationError {
    /// Short tag used in logs and in the generation status snapshot.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Projection(_) => "projection",
            GenerationError::Configuration(_) => "configuration",
            GenerationError::RemoteCall(_) => "remote_call",
            GenerationError::Normalization(_) => "normalization",
            GenerationError::CapExceeded { .. } => "cap_exceeded",
            GenerationError::EmptyList => "empty_list",
            GenerationError::AlreadyRunning => "already_running",
            GenerationError::ListNotFound => "not_found",
            GenerationError::Store(_) => "store",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GenerationError::EmptyList => StatusCode::BAD_REQUEST,
            GenerationError::ListNotFound => StatusCode::NOT_FOUND,
            GenerationError::AlreadyRunning => StatusCode::CONFLICT,
            GenerationError::CapExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            GenerationError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            GenerationError::RemoteCall(_) | GenerationError::Normalization(_) => {
                StatusCode::BAD_GATEWAY
            }
            GenerationError::Projection(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GenerationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to API callers.
    pub fn public_message(&self) -> &'static str {
        match self {
            GenerationError::EmptyList => "Grocery list has no items to plan meals from",
            GenerationError::ListNotFound => "Grocery list not found",
            GenerationError::AlreadyRunning => "Meal plan generation is already in progress",
            GenerationError::CapExceeded { .. } => {
                "Retry limit reached; continue without meal plans"
            }
            GenerationError::Configuration(_) => "Meal plan generation is not available",
            GenerationError::RemoteCall(_) | GenerationError::Normalization(_) => {
                "Meal plan service failed"
            }
            GenerationError::Projection(_) => "Grocery list references an unknown item",
            GenerationError::Store(_) => "Internal server error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_message_hides_internal_detail() {
        let err = GenerationError::RemoteCall(RemoteCallError::Status {
            status: 500,
            body: "stack trace at line 42".into(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(!err.public_message().contains("stack"));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn cap_exceeded_maps_to_too_many_requests() {
        let err = GenerationError::CapExceeded { attempts: 3 };
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.kind(), "cap_exceeded");
    }
}
