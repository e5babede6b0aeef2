use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::{curriculum::access::InvalidLessonError, progress::InvalidRangeError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error(transparent)]
    InvalidLesson(#[from] InvalidLessonError),
    #[error(transparent)]
    InvalidRange(#[from] InvalidRangeError),
    #[error("{0}")]
    InvalidInput(String),
    #[error("access denied")]
    AccessDenied,
    #[error("not logged in")]
    Unauthorized,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
    #[error("fatal error: {0}")]
    Fatal(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Body of every non-data response
#[derive(Debug, Serialize, ToSchema)]
pub struct Message {
    pub msg: String,
}

impl Message {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::UserNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidLesson(_) | Error::InvalidRange(_) | Error::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::AccessDenied => StatusCode::FORBIDDEN,
            Error::Unauthorized | Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::Persistence(_) | Error::Session(_) | Error::Fatal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let msg = if status.is_server_error() {
            error!("request failed: {}", self);
            "internal server error".to_string()
        } else {
            if status == StatusCode::FORBIDDEN {
                warn!("{}", self);
            }
            self.to_string()
        };
        (status, Json(Message::new(msg))).into_response()
    }
}
