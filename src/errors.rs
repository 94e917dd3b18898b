use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    /// Failure reported by the hosted backend. The message is its own text.
    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("{0} requires the hosted backend")]
    NotAvailable(&'static str),

    #[error("no signed-in user")]
    Unauthenticated,

    #[error("local storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("malformed stored data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("request to remote backend failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Remote { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ServiceError::NotAvailable(_) => StatusCode::NOT_IMPLEMENTED,
            ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServiceError::Http(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Storage(_) | ServiceError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_message_is_passed_through_verbatim() {
        let err = ServiceError::Remote {
            status: 400,
            message: "Invalid login credentials".into(),
        };
        let app: AppError = err.into();
        assert_eq!(app.status, StatusCode::BAD_REQUEST);
        assert_eq!(app.message, "Invalid login credentials");
    }

    #[test]
    fn capability_gap_maps_to_not_implemented() {
        let app: AppError = ServiceError::NotAvailable("OAuth sign in").into();
        assert_eq!(app.status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(app.message, "OAuth sign in requires the hosted backend");
    }
}
