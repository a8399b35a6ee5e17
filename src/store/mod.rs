mod schema;

use std::{future::Future, time::Duration};

use sqlx::postgres::PgPoolOptions;

pub use schema::ensure_schema;

use crate::{config::StoreConfig, Database};

/// Fixed-delay retry policy for the initial store connection.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub delay: Duration,
}

impl From<&StoreConfig> for RetryPolicy {
	fn from(config: &StoreConfig) -> Self {
		Self {
			max_attempts: config.max_attempts,
			delay: config.retry_delay,
		}
	}
}

/// Every attempt failed; `source` is the error of the last one.
#[derive(Debug, thiserror::Error)]
#[error("could not connect to the database after {attempts} attempts: {source}")]
pub struct Exhausted<E> {
	pub attempts: u32,
	#[source]
	pub source: E,
}

pub type StoreError = Exhausted<sqlx::Error>;

/// Runs `connect` followed by `prepare` until both succeed or the policy
/// runs out of attempts.
///
/// A failing `prepare` counts as a failed attempt, so the handle it was given
/// is dropped and a fresh one is requested. There is no wait after the final
/// attempt.
pub async fn connect_with<T, E, C, CFut, P, PFut>(
	policy: RetryPolicy,
	mut connect: C,
	mut prepare: P,
) -> Result<T, Exhausted<E>>
where
	C: FnMut() -> CFut,
	CFut: Future<Output = Result<T, E>>,
	P: FnMut(T) -> PFut,
	PFut: Future<Output = Result<T, E>>,
	E: std::fmt::Display,
{
	let max_attempts = policy.max_attempts.max(1);
	let mut attempt = 0;

	loop {
		attempt += 1;

		let result = match connect().await {
			Ok(handle) => prepare(handle).await,
			Err(error) => Err(error),
		};

		match result {
			Ok(handle) => {
				tracing::info!(attempt, "connected to the database");

				return Ok(handle);
			}
			Err(error) if attempt >= max_attempts => {
				tracing::error!(attempt, %error, "failed to connect to the database, giving up");

				return Err(Exhausted {
					attempts: attempt,
					source: error,
				});
			}
			Err(error) => {
				tracing::warn!(
					attempt,
					remaining = max_attempts - attempt,
					%error,
					"failed to connect to the database, retrying in {:?}",
					policy.delay
				);

				tokio::time::sleep(policy.delay).await;
			}
		}
	}
}

/// Connects the pool and makes sure the `posts` table exists.
pub async fn connect(config: &StoreConfig) -> Result<Database, StoreError> {
	let options = PgPoolOptions::new()
		.max_connections(config.max_connections)
		.acquire_timeout(config.acquire_timeout);

	connect_with(
		RetryPolicy::from(config),
		|| options.clone().connect(&config.url),
		|database| async move {
			ensure_schema(&database).await?;
			Ok::<_, sqlx::Error>(database)
		},
	)
	.await
}

#[cfg(test)]
mod test {
	use std::{
		io,
		sync::atomic::{AtomicU32, Ordering},
		time::Duration,
	};

	use super::{connect_with, RetryPolicy};

	fn policy(max_attempts: u32) -> RetryPolicy {
		RetryPolicy {
			max_attempts,
			delay: Duration::from_secs(5),
		}
	}

	fn refused() -> io::Error {
		io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused")
	}

	#[tokio::test(start_paused = true)]
	async fn test_succeeds_after_transient_failures() {
		let connects = AtomicU32::new(0);
		let prepares = AtomicU32::new(0);
		let started = tokio::time::Instant::now();

		let handle = connect_with(
			policy(5),
			|| {
				let attempt = connects.fetch_add(1, Ordering::SeqCst) + 1;

				async move {
					if attempt <= 3 {
						Err::<u32, _>(refused())
					} else {
						Ok(attempt)
					}
				}
			},
			|handle| {
				prepares.fetch_add(1, Ordering::SeqCst);

				async move { Ok::<_, io::Error>(handle) }
			},
		)
		.await
		.unwrap();

		assert_eq!(handle, 4);
		assert_eq!(connects.load(Ordering::SeqCst), 4);
		assert_eq!(prepares.load(Ordering::SeqCst), 1);
		// fixed delay, one wait per failure
		assert!(started.elapsed() >= Duration::from_secs(15));
		assert!(started.elapsed() < Duration::from_secs(16));
	}

	#[tokio::test(start_paused = true)]
	async fn test_exhausts_attempts() {
		let connects = AtomicU32::new(0);
		let prepares = AtomicU32::new(0);
		let started = tokio::time::Instant::now();

		let error = connect_with(
			policy(3),
			|| {
				connects.fetch_add(1, Ordering::SeqCst);

				async { Err::<(), _>(refused()) }
			},
			|handle| {
				prepares.fetch_add(1, Ordering::SeqCst);

				async move { Ok::<_, io::Error>(handle) }
			},
		)
		.await
		.unwrap_err();

		assert_eq!(error.attempts, 3);
		assert_eq!(error.source.kind(), io::ErrorKind::ConnectionRefused);
		assert_eq!(connects.load(Ordering::SeqCst), 3);
		assert_eq!(prepares.load(Ordering::SeqCst), 0);
		assert!(started.elapsed() >= Duration::from_secs(10));
		assert!(started.elapsed() < Duration::from_secs(11));
	}

	#[tokio::test(start_paused = true)]
	async fn test_failed_prepare_counts_as_attempt() {
		let connects = AtomicU32::new(0);
		let prepares = AtomicU32::new(0);

		let handle = connect_with(
			policy(3),
			|| {
				connects.fetch_add(1, Ordering::SeqCst);

				async { Ok::<_, io::Error>("pool") }
			},
			|handle| {
				let attempt = prepares.fetch_add(1, Ordering::SeqCst) + 1;

				async move {
					if attempt == 1 {
						Err::<&str, _>(io::Error::new(io::ErrorKind::Other, "schema"))
					} else {
						Ok(handle)
					}
				}
			},
		)
		.await
		.unwrap();

		assert_eq!(handle, "pool");
		assert_eq!(connects.load(Ordering::SeqCst), 2);
		assert_eq!(prepares.load(Ordering::SeqCst), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn test_zero_attempts_still_tries_once() {
		let connects = AtomicU32::new(0);

		let result = connect_with(
			policy(0),
			|| {
				connects.fetch_add(1, Ordering::SeqCst);

				async { Err::<(), _>(refused()) }
			},
			|handle| async move { Ok::<_, io::Error>(handle) },
		)
		.await;

		assert_eq!(result.unwrap_err().attempts, 1);
		assert_eq!(connects.load(Ordering::SeqCst), 1);
	}
}
