use std::borrow::Cow;

use aide::OperationOutput;
use axum::{
	body::Body,
	extract::rejection::PathRejection,
	http::{Response, StatusCode},
	response::IntoResponse,
	Json,
};
use axum_jsonschema::JsonSchemaRejection;
use schemars::JsonSchema;
use serde::Serialize;

/// The body of every error response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message<'a> {
	pub error: Cow<'a, str>,
}

impl<'a> Message<'a> {
	pub fn new(error: impl Into<Cow<'a, str>>) -> Self {
		Self {
			error: error.into(),
		}
	}
}

/// Describes how a route-specific error is presented to the client.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;

	fn message(&self) -> Cow<'_, str> {
		self.to_string().into()
	}
}

/// Errors shared by every route: extractor rejections and the store.
///
/// The Display impl is only logged, the client sees [`AppError::message`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json error")]
	Json(JsonSchemaRejection),
	#[error("path error: {0}")]
	Path(#[from] PathRejection),
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
}

impl From<JsonSchemaRejection> for AppError {
	fn from(rejection: JsonSchemaRejection) -> Self {
		Self::Json(rejection)
	}
}

impl AppError {
	fn status(&self) -> StatusCode {
		match self {
			Self::Validation(..) | Self::Json(..) | Self::Path(..) => StatusCode::BAD_REQUEST,
			Self::Database(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn message(&self) -> String {
		match self {
			Self::Validation(errors) => errors
				.field_errors()
				.into_iter()
				.flat_map(|(field, errors)| {
					errors.iter().map(move |error| format!("{field}: {error}"))
				})
				.collect::<Vec<_>>()
				.join(", "),
			Self::Json(rejection) => json_rejection_message(rejection),
			Self::Path(rejection) => rejection.body_text(),
			// Surfaced verbatim, the same text the store reported.
			Self::Database(sqlx::Error::Database(error)) => error.message().to_string(),
			Self::Database(error) => error.to_string(),
		}
	}
}

/// Names what was wrong with the body: the parse error, or every schema
/// violation as `<pointer>: <description>`.
fn json_rejection_message(rejection: &JsonSchemaRejection) -> String {
	match rejection {
		JsonSchemaRejection::Json(rejection) => rejection.body_text(),
		JsonSchemaRejection::Serde(error) => format!("{}: {}", error.path(), error.inner()),
		JsonSchemaRejection::Schema(errors) => errors
			.iter()
			.map(|unit| format!("{}: {}", unit.instance_location(), unit.error_description()))
			.collect::<Vec<_>>()
			.join(", "),
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		let status = self.status();

		if status.is_server_error() {
			tracing::error!(error = %self, "request failed");
		}

		(status, Json(Message::new(self.message()))).into_response()
	}
}

/// Error returned by handlers: either a shared [`AppError`] or
/// the route module's own error type.
#[derive(Debug)]
pub enum RouteError<E> {
	App(AppError),
	Route(E),
}

impl<E: ErrorShape> From<E> for RouteError<E> {
	fn from(error: E) -> Self {
		Self::Route(error)
	}
}

impl<E> From<AppError> for RouteError<E> {
	fn from(error: AppError) -> Self {
		Self::App(error)
	}
}

impl<E> From<sqlx::Error> for RouteError<E> {
	fn from(error: sqlx::Error) -> Self {
		Self::App(error.into())
	}
}

impl<E: ErrorShape> IntoResponse for RouteError<E> {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::App(error) => error.into_response(),
			Self::Route(error) => {
				(error.status(), Json(Message::new(error.message()))).into_response()
			}
		}
	}
}

impl<E> OperationOutput for RouteError<E> {
	type Inner = Message<'static>;
}
