use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LlmError {
    /// The backend could not be reached at all (connection refused, DNS, reset).
    #[error("inference backend unavailable: {0}")]
    BackendUnavailable(String),
    /// The backend answered with a non-success status.
    #[error("inference backend returned {status}: {body}")]
    BackendError { status: u16, body: String },
    /// The backend answered, but the payload could not be understood.
    #[error("invalid response from inference backend: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return LlmError::InvalidResponse(err.to_string());
        }
        if let Some(status) = err.status() {
            return LlmError::BackendError {
                status: status.as_u16(),
                body: err.to_string(),
            };
        }
        LlmError::BackendUnavailable(err.to_string())
    }

    pub(crate) async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        LlmError::BackendError { status, body }
    }
}
