//! Message broker access.
//!
//! The service only needs two operations from a broker: declaring a queue and
//! publishing bytes to it. [`Broker`] captures exactly that, so the AMQP
//! implementation in [`amqp`] can be swapped for an in-memory one in tests.

pub mod amqp;
#[cfg(test)]
pub mod memory;

use std::{future::Future, time::Duration};

use async_trait::async_trait;

pub use amqp::AmqpBroker;

/// Queue that receives one message per created post.
pub const QUEUE: &str = "post_created";

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
	#[error("broker connection timed out after {0:?}")]
	Timeout(Duration),
	#[error("broker is disconnected")]
	Disconnected,
	#[error("amqp error: {0}")]
	Amqp(#[from] lapin::Error),
	#[error("broker connect task failed: {0}")]
	Task(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait Broker: Send + Sync {
	/// Declares `queue`, creating it if it does not exist.
	async fn declare(&self, queue: &str, durable: bool) -> Result<(), BrokerError>;

	/// Hands `payload` to the broker for delivery to `queue`.
	///
	/// Success means the broker accepted the frame, not that a consumer
	/// received it.
	async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError>;

	async fn close(&self) {}
}

/// Races `connect` against a timer of `timeout`.
///
/// When the timer wins the attempt fails with [`BrokerError::Timeout`], but
/// the connect keeps running in the background. If it eventually succeeds the
/// late handle is passed to `discard` instead of being leaked, so nothing can
/// ever be published through it.
pub async fn connect_within<T, F, D, DFut>(
	timeout: Duration,
	connect: F,
	discard: D,
) -> Result<T, BrokerError>
where
	T: Send + 'static,
	F: Future<Output = Result<T, BrokerError>> + Send + 'static,
	D: FnOnce(T) -> DFut + Send + 'static,
	DFut: Future<Output = ()> + Send,
{
	let mut attempt = tokio::spawn(connect);

	tokio::select! {
		joined = &mut attempt => joined?,
		() = tokio::time::sleep(timeout) => {
			tokio::spawn(async move {
				if let Ok(Ok(late)) = attempt.await {
					tracing::warn!("broker connected after the timeout, discarding the connection");

					discard(late).await;
				}
			});

			Err(BrokerError::Timeout(timeout))
		}
	}
}

/// Declares `queue` on a freshly connected broker, closing the broker if the
/// declare fails so the connection is not left open behind the error.
pub async fn declare_or_close<B: Broker + ?Sized>(
	broker: &B,
	queue: &str,
	durable: bool,
) -> Result<(), BrokerError> {
	if let Err(error) = broker.declare(queue, durable).await {
		broker.close().await;

		return Err(error);
	}

	Ok(())
}

#[cfg(test)]
mod test {
	use std::{sync::Arc, time::Duration};

	use tokio::sync::oneshot;

	use super::{connect_within, declare_or_close, memory::MemoryBroker, Broker, BrokerError, QUEUE};

	#[tokio::test(start_paused = true)]
	async fn test_connects_before_timeout() {
		let result = connect_within(
			Duration::from_secs(5),
			async {
				tokio::time::sleep(Duration::from_secs(1)).await;
				Ok::<_, BrokerError>(7)
			},
			|_| async {},
		)
		.await;

		assert_eq!(result.unwrap(), 7);
	}

	#[tokio::test(start_paused = true)]
	async fn test_connect_error_is_returned() {
		let result = connect_within(
			Duration::from_secs(5),
			async { Err::<(), _>(BrokerError::Disconnected) },
			|_| async {},
		)
		.await;

		assert!(matches!(result, Err(BrokerError::Disconnected)));
	}

	#[tokio::test(start_paused = true)]
	async fn test_never_connecting_times_out() {
		let result = connect_within(
			Duration::from_secs(5),
			std::future::pending::<Result<(), BrokerError>>(),
			|_| async {},
		)
		.await;

		assert!(matches!(
			result,
			Err(BrokerError::Timeout(timeout)) if timeout == Duration::from_secs(5)
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_late_connection_is_discarded() {
		let broker = Arc::new(MemoryBroker::default());
		let (tx, rx) = oneshot::channel();

		let late = broker.clone();
		let result = connect_within(
			Duration::from_secs(5),
			async move {
				tokio::time::sleep(Duration::from_secs(10)).await;
				late.declare(QUEUE, false).await?;
				Ok::<_, BrokerError>(late)
			},
			|broker: Arc<MemoryBroker>| async move {
				broker.close().await;
				let _ = tx.send(());
			},
		)
		.await;

		assert!(matches!(result, Err(BrokerError::Timeout(..))));

		// the connect finishes in the background and is handed to `discard`
		rx.await.unwrap();

		assert!(broker.is_closed());
		assert_eq!(broker.durable(QUEUE), Some(false));
		assert_eq!(broker.publish_attempts(), 0);
		assert!(broker.publish(QUEUE, b"{}").await.is_err());
		assert!(broker.messages(QUEUE).is_empty());
	}

	#[tokio::test]
	async fn test_declare_or_close_keeps_broker() {
		let broker = MemoryBroker::default();

		declare_or_close(&broker, QUEUE, false).await.unwrap();

		assert!(!broker.is_closed());
		assert_eq!(broker.durable(QUEUE), Some(false));
	}

	#[tokio::test]
	async fn test_failed_declare_closes_broker() {
		let broker = MemoryBroker::default();

		broker.disconnect();

		let result = declare_or_close(&broker, QUEUE, false).await;

		assert!(matches!(result, Err(BrokerError::Disconnected)));
		assert!(broker.is_closed());
	}
}
