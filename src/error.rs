//! Error handling

use axum::response::IntoResponse;
use tracing::info;

/// Errors from the web layer of the application.
#[derive(Debug)]
pub enum CampaignError {
    /// When you didn't do the right thing
    BadRequest,
    /// Missing or invalid session / CSRF token
    Unauthorized,
    /// When a requested resource is not found
    NotFound(String),
    /// When an internal server error occurs
    InternalServerError(String),
}

impl From<tower_sessions::session::Error> for CampaignError {
    fn from(err: tower_sessions::session::Error) -> Self {
        CampaignError::InternalServerError(err.to_string())
    }
}

impl IntoResponse for CampaignError {
    fn into_response(self) -> axum::response::Response {
        match self {
            CampaignError::BadRequest => {
                info!("Bad request received");
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Bad Request"));
                *response.status_mut() = axum::http::StatusCode::BAD_REQUEST;
                response
            }
            CampaignError::Unauthorized => {
                info!("Unauthorized request received");
                let mut response = axum::response::Response::new(axum::body::Body::from(
                    "Unauthorized: invalid or missing session.",
                ));
                *response.status_mut() = axum::http::StatusCode::UNAUTHORIZED;
                response
            }
            CampaignError::NotFound(url) => {
                tracing::error!("404 {url}");
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Not Found"));
                *response.status_mut() = axum::http::StatusCode::NOT_FOUND;
                response
            }
            CampaignError::InternalServerError(message) => {
                tracing::error!("Internal server error: {}", message);
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Internal server error"));
                *response.status_mut() = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }
}

/// Failures from the external text/image services and the image codec.
#[derive(Debug)]
pub enum ServiceError {
    /// The request never got a response (DNS, TLS, connection reset, timeout).
    Transport(String),
    /// The service answered with a non-success status.
    Api {
        /// HTTP status code returned
        status: u16,
        /// Response body, as text
        body: String,
    },
    /// The response arrived but didn't have the shape we expected.
    MalformedResponse(String),
    /// Fetched bytes could not be decoded as an image.
    Decode(String),
    /// The bitmap could not be encoded for download.
    Encode(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "Network error: {msg}"),
            Self::Api { status, body } => write!(f, "API error {status}: {body}"),
            Self::MalformedResponse(msg) => write!(f, "Unexpected response: {msg}"),
            Self::Decode(msg) => write!(f, "Failed to decode image: {msg}"),
            Self::Encode(msg) => write!(f, "Failed to encode image: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Transport(err.to_string())
    }
}

impl From<image::ImageError> for ServiceError {
    fn from(err: image::ImageError) -> Self {
        ServiceError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_status() {
        let err = ServiceError::Api {
            status: 429,
            body: "quota exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "API error 429: quota exceeded");
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let response = CampaignError::Unauthorized.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
