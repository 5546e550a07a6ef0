use opsdesk_kv::KVError;

/// Client-side API error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("missing permission: {0}")]
    Forbidden(String),

    #[error("decode: {0}")]
    Decode(String),

    #[error("token store: {0}")]
    Store(#[from] KVError),

    #[error("invalid base url: {0}")]
    InvalidUrl(String),

    #[error("attachment: {0}")]
    Attachment(String),
}

impl ApiError {
    /// HTTP status for server-side failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the server rejected the credentials (HTTP 401).
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_is_detected_from_status() {
        let err = ApiError::Server { status: 401, message: "Unauthenticated.".into() };
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "HTTP 401: Unauthenticated.");

        let err = ApiError::Server { status: 403, message: String::new() };
        assert!(!err.is_unauthorized());
        assert!(!ApiError::Decode("x".into()).is_unauthorized());
    }
}
