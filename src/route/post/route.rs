use axum::{extract::State, http::StatusCode};
use macros::route;

use crate::{
	extract::{Json, Path},
	openapi::tag,
	AppState, Database,
};

use super::{model, RouteError};

/// Create post
/// Writes a new post, then announces it on the `post_created` queue.
/// The response does not wait for the announcement, and a failed announcement
/// is not reported.
#[route(tag = tag::POST, response(status = 201, description = "Post created.", shape = "Json<model::Confirmation>"))]
pub async fn create_post(
	State(state): State<AppState>,
	Json(input): Json<model::PostInput>,
) -> Result<(StatusCode, Json<model::Confirmation>), RouteError> {
	let post = input.require(state.messaging)?;

	sqlx::query(
		r#"
			INSERT INTO posts (title, content, author_id)
			VALUES ($1, $2, $3)
		"#,
	)
	.bind(&post.title)
	.bind(&post.content)
	.bind(post.author_id)
	.execute(&state.database)
	.await?;

	tracing::info!(
		monotonic_counter.posts_created = 1_u64,
		title = %post.title,
		"created post"
	);

	if state.messaging.announces() {
		// Detached; the outcome only ends up in the logs.
		drop(state.announcer.announce(post.into()));
	}

	Ok((
		StatusCode::CREATED,
		Json(model::Confirmation::new("Post created successfully")),
	))
}

/// Get all posts
/// Returns every post, in no particular order.
#[route(tag = tag::POST)]
pub async fn get_posts(
	State(database): State<Database>,
) -> Result<Json<Vec<model::Post>>, RouteError> {
	let posts = sqlx::query_as::<_, model::Post>(
		r#"
			SELECT id, title, content, author_id, created_at
			FROM posts
		"#,
	)
	.fetch_all(&database)
	.await?;

	Ok(Json(posts))
}

/// Update post
/// Replaces the fields of a post by its id. Updating an id that does not exist
/// still succeeds.
#[route(tag = tag::POST)]
pub async fn update_post(
	State(state): State<AppState>,
	Path(path): Path<model::IdInput>,
	Json(input): Json<model::PostInput>,
) -> Result<Json<model::Confirmation>, RouteError> {
	let post = input.require(state.messaging)?;

	let result = sqlx::query(
		r#"
			UPDATE posts
			SET title = $1, content = $2, author_id = $3
			WHERE id = $4
		"#,
	)
	.bind(&post.title)
	.bind(&post.content)
	.bind(post.author_id)
	.bind(path.id)
	.execute(&state.database)
	.await?;

	if result.rows_affected() == 0 {
		tracing::debug!(id = path.id, "updated a post that does not exist");
	}

	Ok(Json(model::Confirmation::new("Post updated successfully")))
}

/// Delete post
/// Deletes a post by its id. Deleting an id that does not exist still succeeds.
#[route(tag = tag::POST, response(status = 204, description = "Post deleted."))]
pub async fn delete_post(
	State(database): State<Database>,
	Path(path): Path<model::IdInput>,
) -> Result<StatusCode, RouteError> {
	let result = sqlx::query("DELETE FROM posts WHERE id = $1")
		.bind(path.id)
		.execute(&database)
		.await?;

	if result.rows_affected() == 0 {
		tracing::debug!(id = path.id, "deleted a post that does not exist");
	}

	Ok(StatusCode::NO_CONTENT)
}
