use async_trait::async_trait;
use lapin::{
	options::{BasicPublishOptions, QueueDeclareOptions},
	types::FieldTable,
	BasicProperties, Channel, Connection, ConnectionProperties,
};

use super::{connect_within, declare_or_close, Broker, BrokerError, QUEUE};
use crate::config::BrokerConfig;

/// Reply code for a normal AMQP connection close.
const REPLY_SUCCESS: u16 = 200;

/// A RabbitMQ connection with a single channel.
pub struct AmqpBroker {
	connection: Connection,
	channel: Channel,
}

impl AmqpBroker {
	/// Connects within the configured timeout, opens a channel and declares
	/// the non-durable [`QUEUE`].
	///
	/// There is a single attempt; whether a failure is fatal is up to the caller.
	pub async fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
		let url = config.url.clone();

		let connection = connect_within(
			config.connect_timeout,
			async move {
				let connection = Connection::connect(&url, ConnectionProperties::default()).await?;

				Ok::<_, BrokerError>(connection)
			},
			|connection: Connection| async move {
				abandon(&connection, "connection timed out").await;
			},
		)
		.await?;

		let channel = match connection.create_channel().await {
			Ok(channel) => channel,
			Err(error) => {
				abandon(&connection, "failed to open channel").await;

				return Err(error.into());
			}
		};

		let broker = Self {
			connection,
			channel,
		};

		// messages do not survive a broker restart
		declare_or_close(&broker, QUEUE, false).await?;

		tracing::info!(queue = QUEUE, "connected to the message broker");

		Ok(broker)
	}
}

/// Closes a connection that will never be handed out.
async fn abandon(connection: &Connection, reason: &str) {
	if let Err(error) = connection.close(REPLY_SUCCESS, reason).await {
		tracing::warn!(%error, reason, "failed to close abandoned broker connection");
	}
}

#[async_trait]
impl Broker for AmqpBroker {
	async fn declare(&self, queue: &str, durable: bool) -> Result<(), BrokerError> {
		self.channel
			.queue_declare(
				queue,
				QueueDeclareOptions {
					durable,
					..QueueDeclareOptions::default()
				},
				FieldTable::default(),
			)
			.await?;

		Ok(())
	}

	async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
		// The default exchange routes by queue name. Publisher confirms are not
		// enabled on the channel, so there is nothing to wait for afterwards.
		let _confirm = self
			.channel
			.basic_publish(
				"",
				queue,
				BasicPublishOptions::default(),
				payload,
				BasicProperties::default(),
			)
			.await?;

		Ok(())
	}

	async fn close(&self) {
		if let Err(error) = self.connection.close(REPLY_SUCCESS, "shutting down").await {
			tracing::warn!(%error, "failed to close broker connection");
		}
	}
}
