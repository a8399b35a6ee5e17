use std::{fmt, sync::Arc, time::Duration};

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::broker::{Broker, QUEUE};

/// Message published to [`QUEUE`] after a post has been written.
///
/// It carries no id or version and nothing about it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
	pub title: String,
	pub content: Option<String>,
	pub author_id: Option<i32>,
}

/// How a single announcement attempt ended. Only ever logged, never reported
/// to the client that created the post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
	Published,
	Failed(String),
	TimedOut,
	/// The service runs without a broker connection.
	Unavailable,
}

/// Publishes announcements in the background, detached from the request
/// that triggered them.
#[derive(Clone)]
pub struct Announcer {
	broker: Option<Arc<dyn Broker>>,
	timeout: Duration,
}

impl fmt::Debug for Announcer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Announcer")
			.field("available", &self.is_available())
			.field("timeout", &self.timeout)
			.finish()
	}
}

impl Announcer {
	pub fn new(broker: Arc<dyn Broker>, timeout: Duration) -> Self {
		Self {
			broker: Some(broker),
			timeout,
		}
	}

	/// An announcer without a broker; every attempt ends as [`Outcome::Unavailable`].
	pub fn unavailable() -> Self {
		Self {
			broker: None,
			timeout: Duration::ZERO,
		}
	}

	pub fn is_available(&self) -> bool {
		self.broker.is_some()
	}

	/// Spawns the publish and returns immediately.
	///
	/// The handle resolves to the outcome, which has already been logged by
	/// then. Callers on the request path drop it.
	pub fn announce(&self, announcement: Announcement) -> JoinHandle<Outcome> {
		let broker = self.broker.clone();
		let timeout = self.timeout;

		tokio::spawn(async move {
			let outcome = publish(broker.as_deref(), timeout, &announcement).await;

			match &outcome {
				Outcome::Published => tracing::info!(
					monotonic_counter.announcements_published = 1_u64,
					queue = QUEUE,
					title = %announcement.title,
					"announced post"
				),
				Outcome::Failed(error) => tracing::warn!(
					monotonic_counter.announcements_failed = 1_u64,
					queue = QUEUE,
					title = %announcement.title,
					%error,
					"failed to announce post"
				),
				Outcome::TimedOut => tracing::warn!(
					monotonic_counter.announcements_failed = 1_u64,
					queue = QUEUE,
					title = %announcement.title,
					"announcing post timed out after {:?}",
					timeout
				),
				Outcome::Unavailable => tracing::warn!(
					queue = QUEUE,
					title = %announcement.title,
					"publishing unavailable, post not announced"
				),
			}

			outcome
		})
	}

	pub async fn close(&self) {
		if let Some(broker) = &self.broker {
			broker.close().await;
		}
	}
}

async fn publish(
	broker: Option<&dyn Broker>,
	timeout: Duration,
	announcement: &Announcement,
) -> Outcome {
	let Some(broker) = broker else {
		return Outcome::Unavailable;
	};

	let payload = match serde_json::to_vec(announcement) {
		Ok(payload) => payload,
		Err(error) => return Outcome::Failed(error.to_string()),
	};

	match tokio::time::timeout(timeout, broker.publish(QUEUE, &payload)).await {
		Ok(Ok(())) => Outcome::Published,
		Ok(Err(error)) => Outcome::Failed(error.to_string()),
		Err(..) => Outcome::TimedOut,
	}
}

#[cfg(test)]
mod test {
	use std::{sync::Arc, time::Duration};

	use super::{Announcement, Announcer, Outcome};
	use crate::broker::{memory::MemoryBroker, Broker, QUEUE};

	fn announcement() -> Announcement {
		Announcement {
			title: "t".into(),
			content: Some("c".into()),
			author_id: Some(7),
		}
	}

	async fn declared() -> Arc<MemoryBroker> {
		let broker = Arc::new(MemoryBroker::default());

		broker.declare(QUEUE, false).await.unwrap();
		broker
	}

	#[test]
	fn test_payload_shape() {
		let payload = serde_json::to_string(&announcement()).unwrap();

		assert_eq!(payload, r#"{"title":"t","content":"c","authorId":7}"#);
	}

	#[tokio::test]
	async fn test_publishes_to_queue() {
		let broker = declared().await;
		let announcer = Announcer::new(broker.clone(), Duration::from_secs(1));

		let outcome = announcer.announce(announcement()).await.unwrap();

		assert_eq!(outcome, Outcome::Published);
		assert_eq!(
			broker.messages(QUEUE),
			vec![br#"{"title":"t","content":"c","authorId":7}"#.to_vec()]
		);
	}

	#[tokio::test]
	async fn test_disconnected_broker_fails_quietly() {
		let broker = declared().await;
		let announcer = Announcer::new(broker.clone(), Duration::from_secs(1));

		broker.disconnect();

		let outcome = announcer.announce(announcement()).await.unwrap();

		assert!(matches!(outcome, Outcome::Failed(..)));
		assert_eq!(broker.publish_attempts(), 1);
		assert!(broker.messages(QUEUE).is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_stalled_publish_times_out() {
		let broker = declared().await;
		let announcer = Announcer::new(broker.clone(), Duration::from_secs(5));

		broker.stall();

		let outcome = announcer.announce(announcement()).await.unwrap();

		assert_eq!(outcome, Outcome::TimedOut);
		assert!(broker.messages(QUEUE).is_empty());
	}

	#[tokio::test]
	async fn test_unavailable_announcer() {
		let announcer = Announcer::unavailable();

		assert!(!announcer.is_available());
		assert_eq!(
			announcer.announce(announcement()).await.unwrap(),
			Outcome::Unavailable
		);
	}
}
