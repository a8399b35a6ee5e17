use aide::axum::{
	routing::{get_with, post_with, put_with},
	ApiRouter,
};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

/// An error specific to the post routes.
///
/// The messages are presented to the client as-is.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Title, content and authorId are required")]
	MissingFields,
	#[error("Title is required")]
	MissingTitle,
	#[error("Title must be at most 255 characters")]
	TitleTooLong,
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/create", post_with(create_post, create_post_docs))
		.api_route("/all", get_with(get_posts, get_posts_docs))
		.api_route(
			"/post/:id",
			put_with(update_post, update_post_docs).delete_with(delete_post, delete_post_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::MissingFields | Self::MissingTitle | Self::TitleTooLong => StatusCode::BAD_REQUEST,
		}
	}
}
