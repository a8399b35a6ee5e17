#![warn(clippy::pedantic)]

mod announce;
mod bootstrap;
mod broker;
mod config;
mod error;
mod extract;
mod openapi;
mod route;
mod store;
#[cfg(test)]
mod test;
mod trace;

use std::{process::ExitCode, sync::Arc};

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::{
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};

use crate::{announce::Announcer, config::Messaging};

pub type Database = sqlx::Pool<sqlx::Postgres>;
pub type AppState = State;

/// The shared application state.
///
/// `messaging` decides which fields a post must carry and whether it is
/// announced after being written.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub database: Database,
	pub announcer: Announcer,
	pub messaging: Messaging,
}

/// Builds the full router, including the API reference under `/docs`.
pub fn app(state: AppState) -> Router {
	aide::gen::extract_schemas(true);

	let mut api = OpenApi::default();

	ApiRouter::new()
		.merge(route::routes())
		.nest_api_service("/docs", route::docs::routes())
		.finish_api_with(&mut api, openapi::docs)
		.layer(Extension(Arc::new(api)))
		.layer(
			ServiceBuilder::new()
				.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
				.layer(TraceLayer::new_for_http())
				.layer(PropagateRequestIdLayer::x_request_id()),
		)
		.with_state(state)
}

#[tokio::main]
async fn main() -> ExitCode {
	dotenvy::dotenv().ok();

	let _guard = match trace::init_tracing_subscriber() {
		Ok(guard) => guard,
		Err(error) => {
			eprintln!("{error}");
			return ExitCode::FAILURE;
		}
	};

	let config = match config::Config::from_env() {
		Ok(config) => config,
		Err(error) => {
			tracing::error!(%error, "invalid configuration");
			return ExitCode::FAILURE;
		}
	};

	tracing::info!(?config, "starting post service");

	if let Err(error) = bootstrap::start(config).await {
		tracing::error!(%error, "post service failed");
		return ExitCode::FAILURE;
	}

	ExitCode::SUCCESS
}
