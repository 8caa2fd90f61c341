use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Debug;

/// Body of every error response: `{message, errors?}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationIssue>>,
}

#[derive(Debug, Serialize)]
pub struct ValidationIssue {
    pub path: Vec<&'static str>,
    pub message: String,
}

pub fn error_response(
    status: StatusCode,
    message: impl Into<String>,
    errors: Option<Vec<ValidationIssue>>,
) -> Response {
    let body = ErrorBody {
        message: message.into(),
        errors,
    };

    (status, Json(body)).into_response()
}

/// Maps any failure to a 500 carrying only `message`; the error itself is logged.
pub fn e500<T>(message: &'static str) -> impl FnOnce(T) -> HttpError<T>
where
    T: Debug,
{
    move |error| HttpError::InternalServerError { message, error }
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError<T>
where
    T: Debug,
{
    #[error("{message}")]
    InternalServerError { message: &'static str, error: T },
}

impl<T> IntoResponse for HttpError<T>
where
    T: Debug,
{
    fn into_response(self) -> Response {
        tracing::error!("{:#?}", self);

        match self {
            Self::InternalServerError { message, .. } => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, message, None)
            }
        }
    }
}
