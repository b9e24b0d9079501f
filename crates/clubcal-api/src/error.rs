//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure is rendered as `{"ok": false, "code": ..., "error": ...}`
//! where `error` is the message meant for the person who made the request.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Event(#[from] clubcal_core::Error),

  #[error("Missing or invalid caller identity")]
  Unauthorized,

  #[error("Event has changed since it was loaded")]
  PreconditionFailed,

  #[error("{0}")]
  BadRequest(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    use clubcal_core::Error as E;
    match self {
      Self::Unauthorized => StatusCode::UNAUTHORIZED,
      Self::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Event(e) => match e {
        _ if e.is_authorization() => StatusCode::FORBIDDEN,
        E::EventNotFound | E::EventNotInOrganization => StatusCode::NOT_FOUND,
        E::EventHasPassed { .. } => StatusCode::CONFLICT,
        E::VersionConflict => StatusCode::PRECONDITION_FAILED,
        _ if e.is_validation() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      Self::Event(e) => e.code(),
      Self::Unauthorized => "unauthorized",
      Self::PreconditionFailed => "precondition_failed",
      Self::BadRequest(_) => "bad_request",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    (
      status,
      Json(json!({ "ok": false, "code": self.code(), "error": self.to_string() })),
    )
      .into_response()
  }
}
