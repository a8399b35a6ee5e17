use std::{fmt, str::FromStr, time::Duration};

/// How the service treats the message broker at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Messaging {
	/// The broker must be reachable, otherwise startup aborts.
	Required,
	/// A broker failure is logged and the service starts without publishing.
	Optional,
	/// No broker is used and posts are never announced.
	Disabled,
}

impl Messaging {
	/// Whether created posts are announced, which also decides
	/// which fields a post must carry.
	pub fn announces(self) -> bool {
		!matches!(self, Self::Disabled)
	}
}

impl FromStr for Messaging {
	type Err = ();

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.trim().to_ascii_lowercase().as_str() {
			"required" => Ok(Self::Required),
			"optional" => Ok(Self::Optional),
			"disabled" => Ok(Self::Disabled),
			_ => Err(()),
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("{0} must be set")]
	Missing(&'static str),
	#[error("{key} has an invalid value: {value:?}")]
	Invalid { key: &'static str, value: String },
}

#[derive(Clone)]
pub struct StoreConfig {
	pub url: String,
	pub max_attempts: u32,
	pub retry_delay: Duration,
	pub max_connections: u32,
	pub acquire_timeout: Duration,
}

impl fmt::Debug for StoreConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StoreConfig")
			.field("url", &"[REDACTED]")
			.field("max_attempts", &self.max_attempts)
			.field("retry_delay", &self.retry_delay)
			.field("max_connections", &self.max_connections)
			.field("acquire_timeout", &self.acquire_timeout)
			.finish()
	}
}

#[derive(Clone)]
pub struct BrokerConfig {
	pub url: String,
	pub connect_timeout: Duration,
	pub publish_timeout: Duration,
}

impl fmt::Debug for BrokerConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BrokerConfig")
			.field("url", &"[REDACTED]")
			.field("connect_timeout", &self.connect_timeout)
			.field("publish_timeout", &self.publish_timeout)
			.finish()
	}
}

/// Process configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
	pub store: StoreConfig,
	/// `None` only when messaging is disabled.
	pub broker: Option<BrokerConfig>,
	pub messaging: Messaging,
	pub host: String,
	pub port: u16,
	/// Externally advertised base url, only used for the startup log line.
	pub app_url: String,
}

impl Config {
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Builds the configuration from an arbitrary key lookup, so tests do not
	/// have to mutate the process environment.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let messaging = match lookup("MESSAGING") {
			Some(value) => value.parse().map_err(|()| ConfigError::Invalid {
				key: "MESSAGING",
				value,
			})?,
			None => Messaging::Required,
		};

		let store = StoreConfig {
			url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
			max_attempts: parse_or(&lookup, "DB_MAX_ATTEMPTS", 5)?,
			retry_delay: millis_or(&lookup, "DB_RETRY_DELAY_MS", 5000)?,
			max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
			acquire_timeout: millis_or(&lookup, "DB_ACQUIRE_TIMEOUT_MS", 30_000)?,
		};

		if store.max_attempts == 0 {
			return Err(ConfigError::Invalid {
				key: "DB_MAX_ATTEMPTS",
				value: "0".into(),
			});
		}

		let broker = if messaging.announces() {
			Some(BrokerConfig {
				url: lookup("RABBITMQ_URL").ok_or(ConfigError::Missing("RABBITMQ_URL"))?,
				connect_timeout: millis_or(&lookup, "BROKER_CONNECT_TIMEOUT_MS", 5000)?,
				publish_timeout: millis_or(&lookup, "PUBLISH_TIMEOUT_MS", 5000)?,
			})
		} else {
			None
		};

		Ok(Self {
			store,
			broker,
			messaging,
			host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
			port: parse_or(&lookup, "PORT", 3000)?,
			app_url: lookup("APP_URL").unwrap_or_else(|| "http://localhost".into()),
		})
	}
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
	F: Fn(&str) -> Option<String>,
	T: FromStr,
{
	match lookup(key) {
		Some(value) => value
			.trim()
			.parse()
			.map_err(|_| ConfigError::Invalid { key, value }),
		None => Ok(default),
	}
}

fn millis_or<F>(lookup: &F, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	parse_or(lookup, key, default).map(Duration::from_millis)
}
