//! Shared helpers for the route tests.

use std::time::Duration;

pub use std::sync::Arc;

pub use axum_test::TestServer;
pub use serde_json::{json, Value};

pub use crate::{
	broker::{memory::MemoryBroker, Broker, QUEUE},
	config::Messaging,
	Database,
};
use crate::{announce::Announcer, store::ensure_schema, AppState};

pub struct TestApp {
	pub server: TestServer,
	/// Records what the service tried to publish.
	pub broker: Arc<MemoryBroker>,
}

/// Serves the app on top of `database`, announcing into an in-memory broker
/// unless messaging is disabled.
pub async fn app(database: Database, messaging: Messaging) -> TestApp {
	let broker = Arc::new(MemoryBroker::default());

	broker.declare(QUEUE, false).await.unwrap();

	let announcer = if messaging.announces() {
		Announcer::new(broker.clone(), Duration::from_secs(1))
	} else {
		Announcer::unavailable()
	};

	serve(database, messaging, announcer, broker).await
}

/// Serves the app as if the broker could not be reached at startup.
///
/// The returned broker is never handed to the service, so it must stay empty.
pub async fn app_without_broker(database: Database, messaging: Messaging) -> TestApp {
	let broker = Arc::new(MemoryBroker::default());

	serve(database, messaging, Announcer::unavailable(), broker).await
}

async fn serve(
	database: Database,
	messaging: Messaging,
	announcer: Announcer,
	broker: Arc<MemoryBroker>,
) -> TestApp {
	ensure_schema(&database).await.unwrap();

	let server = TestServer::new(crate::app(AppState {
		database,
		announcer,
		messaging,
	}))
	.unwrap();

	TestApp { server, broker }
}

/// Polls `condition` for up to a second, since announcements are published
/// in the background.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
	for _ in 0..100 {
		if condition() {
			return true;
		}

		tokio::time::sleep(Duration::from_millis(10)).await;
	}

	condition()
}
