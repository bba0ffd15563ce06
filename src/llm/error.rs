use thiserror::Error;

/// Failure of a single LLM request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("authentication failed with status {status}: {message}")]
    Authentication { status: u16, message: String },

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("server error with status {status}: {message}")]
    Server { status: u16, message: String },

    #[error("request rejected with status {status}: {message}")]
    InvalidRequest { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl RequestError {
    /// Whether the same request may succeed if sent again
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RequestError::RateLimited(_)
                | RequestError::Timeout
                | RequestError::Network(_)
                | RequestError::Server { .. }
        )
    }

    /// Map a non-success HTTP status and its body to an error
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => RequestError::Authentication {
                status,
                message: body,
            },
            408 => RequestError::Timeout,
            429 => RequestError::RateLimited(body),
            500..=599 => RequestError::Server {
                status,
                message: body,
            },
            _ => RequestError::InvalidRequest {
                status,
                message: body,
            },
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RequestError::Timeout
        } else if err.is_decode() {
            RequestError::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            RequestError::from_status(status.as_u16(), err.to_string())
        } else {
            RequestError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            RequestError::from_status(401, "bad key".into()),
            RequestError::Authentication { status: 401, .. }
        ));
        assert!(matches!(
            RequestError::from_status(403, String::new()),
            RequestError::Authentication { .. }
        ));
        assert_eq!(RequestError::from_status(408, String::new()), RequestError::Timeout);
        assert!(matches!(
            RequestError::from_status(429, String::new()),
            RequestError::RateLimited(_)
        ));
        assert!(matches!(
            RequestError::from_status(503, String::new()),
            RequestError::Server { status: 503, .. }
        ));
        assert!(matches!(
            RequestError::from_status(400, String::new()),
            RequestError::InvalidRequest { status: 400, .. }
        ));
    }

    #[test]
    fn test_transient_classes() {
        assert!(RequestError::Timeout.is_transient());
        assert!(RequestError::RateLimited("slow down".into()).is_transient());
        assert!(RequestError::Network("reset".into()).is_transient());
        assert!(RequestError::from_status(502, String::new()).is_transient());

        assert!(!RequestError::from_status(401, String::new()).is_transient());
        assert!(!RequestError::from_status(422, String::new()).is_transient());
        assert!(!RequestError::MalformedResponse("no choices".into()).is_transient());
    }
}
