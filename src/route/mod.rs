use aide::axum::{routing::get_with, ApiRouter};
use macros::route;

use crate::{extract::Json, openapi::tag, AppState};

pub mod docs;
pub mod model;
pub mod post;

pub fn routes() -> ApiRouter<AppState> {
	ApiRouter::new()
		.api_route("/", get_with(index, index_docs))
		.merge(post::routes())
}

/// Service name
/// Returns the name of the service. Useful as a liveness check.
#[route(tag = tag::SERVICE)]
pub async fn index() -> Json<&'static str> {
	Json("post service")
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[sqlx::test(migrations = false)]
	async fn test_index(pool: Database) {
		let app = app(pool, Messaging::Required).await;

		let response = app.server.get("/").await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<Value>(), json!("post service"));
	}

	#[sqlx::test(migrations = false)]
	async fn test_openapi_document(pool: Database) {
		let app = app(pool, Messaging::Required).await;

		let response = app.server.get("/docs/private/api.json").await;

		assert_eq!(response.status_code(), 200);

		let document = response.json::<Value>();

		assert!(document["paths"]["/create"]["post"].is_object());
		assert!(document["paths"]["/post/{id}"]["delete"].is_object());
	}
}
