//! Startup sequence: store, then broker, then the HTTP surface.
//!
//! Nothing is served until the dependencies required by the configured
//! [`Messaging`] mode are connected. With `Messaging::Required` a broker
//! outage keeps the whole service down, CRUD routes included; with
//! `Messaging::Optional` the service starts and posts are written without
//! being announced.

use std::{future::Future, sync::Arc};

use tokio::net::TcpListener;

use crate::{
	announce::Announcer,
	broker::{AmqpBroker, BrokerError},
	config::{Config, Messaging},
	store::{self, StoreError},
	AppState,
};

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error("failed to connect to the message broker: {0}")]
	Broker(#[source] BrokerError),
	#[error("failed to bind {address}: {source}")]
	Bind {
		address: String,
		#[source]
		source: std::io::Error,
	},
	#[error("server error: {0}")]
	Serve(#[source] std::io::Error),
}

/// Connected dependencies, ready to be turned into router state.
#[derive(Debug)]
pub struct Services<D> {
	pub database: D,
	pub announcer: Announcer,
}

/// Connects the store and then, depending on `messaging`, the broker.
///
/// A store failure always aborts before the broker is contacted.
pub async fn assemble<D, S, SFut, B, BFut>(
	messaging: Messaging,
	connect_store: S,
	connect_broker: B,
) -> Result<Services<D>, BootstrapError>
where
	S: FnOnce() -> SFut,
	SFut: Future<Output = Result<D, StoreError>>,
	B: FnOnce() -> BFut,
	BFut: Future<Output = Result<Announcer, BrokerError>>,
{
	let database = connect_store().await?;

	let announcer = match messaging {
		Messaging::Disabled => {
			tracing::info!("messaging disabled, posts will not be announced");

			Announcer::unavailable()
		}
		Messaging::Required => connect_broker().await.map_err(BootstrapError::Broker)?,
		Messaging::Optional => match connect_broker().await {
			Ok(announcer) => announcer,
			Err(error) => {
				tracing::warn!(%error, "message broker unavailable, starting without publishing");

				Announcer::unavailable()
			}
		},
	};

	Ok(Services {
		database,
		announcer,
	})
}

/// Runs the service until a shutdown signal arrives.
pub async fn start(config: Config) -> Result<(), BootstrapError> {
	let broker = config.broker.as_ref();

	let Services {
		database,
		announcer,
	} = assemble(
		config.messaging,
		|| store::connect(&config.store),
		|| async move {
			match broker {
				Some(broker) => AmqpBroker::connect(broker).await.map(|publisher| {
					Announcer::new(Arc::new(publisher), broker.publish_timeout)
				}),
				None => Ok(Announcer::unavailable()),
			}
		},
	)
	.await?;

	let app = crate::app(AppState {
		database,
		announcer: announcer.clone(),
		messaging: config.messaging,
	});

	let address = format!("{}:{}", config.host, config.port);
	let listener = TcpListener::bind(&address)
		.await
		.map_err(|source| BootstrapError::Bind {
			address: address.clone(),
			source,
		})?;

	tracing::info!(
		publishing = announcer.is_available(),
		"post service listening at {}:{}",
		config.app_url,
		config.port
	);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await
		.map_err(BootstrapError::Serve)?;

	announcer.close().await;

	tracing::info!("post service stopped");

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(error) = tokio::signal::ctrl_c().await {
			tracing::error!(%error, "failed to listen for ctrl-c");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(error) => {
				tracing::error!(%error, "failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}

	tracing::info!("shutting down");
}
