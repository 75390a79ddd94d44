use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use brigade_notify::NotifyError;
use thiserror::Error;

/// Errors that can occur when running the Brigade server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or invalid credentials.
    #[error("{code}: {message}")]
    Unauthorized {
        /// Machine-readable error code.
        code: &'static str,
        /// Human-readable detail.
        message: String,
        /// Realm for the `WWW-Authenticate` challenge.
        realm: String,
    },

    /// The request body or parameters were invalid.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Building the notification service failed.
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),
}

impl ServerError {
    /// Credentials were presented and rejected.
    pub fn authentication_failed(message: impl Into<String>, realm: impl Into<String>) -> Self {
        Self::Unauthorized {
            code: "authentication_failed",
            message: message.into(),
            realm: realm.into(),
        }
    }

    /// No credentials were presented on an endpoint that requires them.
    pub fn authentication_required(realm: impl Into<String>) -> Self {
        Self::Unauthorized {
            code: "authentication_required",
            message: "This endpoint requires authentication. Set Authorization: Bearer <key>, \
                      X-API-Key, or X-Service-Token header."
                .to_owned(),
            realm: realm.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Io(_) | Self::Notify(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { code, .. } => *code,
            Self::BadRequest(_) => "bad_request",
            Self::Config(_) | Self::Io(_) | Self::Notify(_) => "internal_error",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Unauthorized { message, .. } => message.clone(),
            Self::BadRequest(msg) => msg.clone(),
            other => other.to_string(),
        };
        let body = serde_json::json!({ "error": self.code(), "message": message });
        let mut response = (status, axum::Json(body)).into_response();

        if let Self::Unauthorized { realm, .. } = &self
            && let Ok(challenge) = HeaderValue::from_str(&format!("Bearer realm=\"{realm}\""))
        {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, challenge);
        }

        response
    }
}
