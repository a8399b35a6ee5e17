use std::{
	collections::HashMap,
	sync::{
		atomic::{AtomicBool, AtomicUsize, Ordering},
		Mutex,
	},
};

use async_trait::async_trait;

use super::{Broker, BrokerError};

#[derive(Debug, Default)]
struct Queue {
	durable: bool,
	messages: Vec<Vec<u8>>,
}

/// In-process broker double that records what was declared and published.
#[derive(Debug, Default)]
pub struct MemoryBroker {
	queues: Mutex<HashMap<String, Queue>>,
	disconnected: AtomicBool,
	closed: AtomicBool,
	stalled: AtomicBool,
	attempts: AtomicUsize,
}

impl MemoryBroker {
	/// Simulates the broker going away: every later call fails.
	pub fn disconnect(&self) {
		self.disconnected.store(true, Ordering::SeqCst);
	}

	/// Makes every later publish hang forever.
	pub fn stall(&self) {
		self.stalled.store(true, Ordering::SeqCst);
	}

	/// Whether [`Broker::close`] was called.
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	fn is_usable(&self) -> bool {
		!self.disconnected.load(Ordering::SeqCst) && !self.is_closed()
	}

	pub fn publish_attempts(&self) -> usize {
		self.attempts.load(Ordering::SeqCst)
	}

	pub fn durable(&self, queue: &str) -> Option<bool> {
		self.queues
			.lock()
			.unwrap()
			.get(queue)
			.map(|queue| queue.durable)
	}

	pub fn messages(&self, queue: &str) -> Vec<Vec<u8>> {
		self.queues
			.lock()
			.unwrap()
			.get(queue)
			.map(|queue| queue.messages.clone())
			.unwrap_or_default()
	}
}

#[async_trait]
impl Broker for MemoryBroker {
	async fn declare(&self, queue: &str, durable: bool) -> Result<(), BrokerError> {
		if !self.is_usable() {
			return Err(BrokerError::Disconnected);
		}

		self.queues
			.lock()
			.unwrap()
			.entry(queue.to_string())
			.or_insert_with(|| Queue {
				durable,
				messages: Vec::new(),
			});

		Ok(())
	}

	async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
		self.attempts.fetch_add(1, Ordering::SeqCst);

		if self.stalled.load(Ordering::SeqCst) {
			std::future::pending::<()>().await;
		}

		if !self.is_usable() {
			return Err(BrokerError::Disconnected);
		}

		// like the AMQP default exchange, publishing to an undeclared queue is a silent drop
		if let Some(queue) = self.queues.lock().unwrap().get_mut(queue) {
			queue.messages.push(payload.to_vec());
		}

		Ok(())
	}

	async fn close(&self) {
		self.closed.store(true, Ordering::SeqCst);
	}
}
