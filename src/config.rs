//! Declarative client stacks.
//!
//! [`ClientConfig`] describes the stateless decorators and the rate limit a client should
//! carry, typically loaded from JSON. [`ClientConfig::decorate`] applies them in a fixed
//! order, from the wrapped client outwards:
//!
//! 1. default headers,
//! 2. rate limit,
//! 3. status allow-list,
//! 4. body requirement,
//! 5. timeout, outermost so the deadline also covers rate-limit waits.

// self
use crate::{
	_prelude::*,
	client::{self, SharedClient},
	decorator::{
		self,
		header::{HeaderDecorator, HeaderMode},
	},
	error::ConfigError,
	limit,
};

/// Rate limit settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
	/// Requests admitted per window.
	pub max_requests: u32,
	/// Window length in milliseconds.
	pub window_ms: u64,
}
impl RateLimitConfig {
	/// Window length.
	pub fn window(&self) -> Duration {
		Duration::from_millis(self.window_ms)
	}
}

/// Serializable description of a decorated client.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
	/// Bound on the whole call, in milliseconds.
	pub timeout_ms: Option<u64>,
	/// Client-side rate limit.
	pub rate_limit: Option<RateLimitConfig>,
	/// Headers set on every request, replacing any existing values.
	pub headers: BTreeMap<String, Vec<String>>,
	/// Accepted status codes; empty disables the check.
	pub allowed_statuses: Vec<u16>,
	/// Whether responses must carry a body.
	pub require_body: bool,
}
impl ClientConfig {
	/// Parses a JSON document, reporting the path of the first invalid field.
	pub fn from_json(document: &str) -> Result<Self> {
		let mut deserializer = serde_json::Deserializer::from_str(document);
		let config = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ConfigError::InvalidDocument { source })?;

		Ok(config)
	}

	/// Timeout, if configured.
	pub fn timeout(&self) -> Option<Duration> {
		self.timeout_ms.map(Duration::from_millis)
	}

	/// Checks every setting without building anything.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.timeout_ms == Some(0) {
			return Err(ConfigError::ZeroTimeout);
		}
		if let Some(rate_limit) = &self.rate_limit {
			if rate_limit.max_requests == 0 {
				return Err(ConfigError::ZeroRateLimitCapacity);
			}
			if rate_limit.window_ms == 0 {
				return Err(ConfigError::ZeroRateLimitWindow);
			}
		}

		self.header_pairs()?;
		self.statuses()?;

		Ok(())
	}

	/// Wraps `client` in the configured decorators.
	pub fn decorate(&self, client: impl Into<Option<SharedClient>>) -> Result<SharedClient> {
		self.validate()?;

		let mut client = client::or_default(client);

		for (name, values) in self.header_pairs()? {
			client = Arc::new(HeaderDecorator::new(client, HeaderMode::Set, name, values));
		}
		if let Some(rate_limit) = &self.rate_limit {
			client = limit::set_rate_limit(client, rate_limit.max_requests, rate_limit.window())?;
		}
		if !self.allowed_statuses.is_empty() {
			client = decorator::require_status(client, self.statuses()?);
		}
		if self.require_body {
			client = decorator::require_body(client);
		}
		if let Some(timeout) = self.timeout() {
			client = decorator::set_timeout(client, timeout)?;
		}

		Ok(client)
	}

	fn header_pairs(&self) -> Result<Vec<(HeaderName, Vec<HeaderValue>)>, ConfigError> {
		self.headers
			.iter()
			.map(|(name, values)| {
				let header =
					HeaderName::try_from(name).map_err(|e| ConfigError::header_name(name, e))?;
				let values = values
					.iter()
					.map(|value| {
						HeaderValue::try_from(value).map_err(|e| ConfigError::header_value(name, e))
					})
					.collect::<Result<Vec<_>, _>>()?;

				Ok((header, values))
			})
			.collect()
	}

	fn statuses(&self) -> Result<Vec<StatusCode>, ConfigError> {
		self.allowed_statuses
			.iter()
			.map(|&code| StatusCode::from_u16(code).map_err(|_| ConfigError::InvalidStatus { code }))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::*,
		client::ClientFn,
		error::ErrorKind,
		http::{Request, Response},
	};

	fn get() -> Request {
		Request::new(Method::GET, test_url("http://localhost/config"))
	}

	#[test]
	fn parses_json_with_defaults() {
		let config = ClientConfig::from_json(
			r#"{
				"timeout_ms": 1500,
				"rate_limit": { "max_requests": 10, "window_ms": 1000 },
				"headers": { "x-api-version": ["2"] }
			}"#,
		)
		.expect("Config should parse.");

		assert_eq!(config.timeout(), Some(Duration::from_millis(1_500)));
		assert_eq!(
			config.rate_limit,
			Some(RateLimitConfig { max_requests: 10, window_ms: 1_000 })
		);
		assert!(config.allowed_statuses.is_empty());
		assert!(!config.require_body);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn parse_errors_report_the_field_path() {
		let err = ClientConfig::from_json(r#"{ "rate_limit": { "max_requests": "ten" } }"#)
			.expect_err("String capacity should be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::InvalidDocument { .. })));
		assert!(err.to_string().contains("rate_limit.max_requests"));
	}

	#[test]
	fn validate_rejects_unusable_settings() {
		let cases = [
			(ClientConfig { timeout_ms: Some(0), ..Default::default() }, "timeout"),
			(
				ClientConfig {
					rate_limit: Some(RateLimitConfig { max_requests: 0, window_ms: 10 }),
					..Default::default()
				},
				"capacity",
			),
			(
				ClientConfig {
					rate_limit: Some(RateLimitConfig { max_requests: 1, window_ms: 0 }),
					..Default::default()
				},
				"window",
			),
			(ClientConfig { allowed_statuses: vec![42], ..Default::default() }, "status"),
			(
				ClientConfig {
					headers: BTreeMap::from([("bad header".into(), vec!["v".into()])]),
					..Default::default()
				},
				"header",
			),
		];

		for (config, label) in cases {
			let err = config.validate().expect_err(label);

			match label {
				"timeout" => assert!(matches!(err, ConfigError::ZeroTimeout)),
				"capacity" => assert!(matches!(err, ConfigError::ZeroRateLimitCapacity)),
				"window" => assert!(matches!(err, ConfigError::ZeroRateLimitWindow)),
				"status" => assert!(matches!(err, ConfigError::InvalidStatus { code: 42 })),
				_ => assert!(matches!(err, ConfigError::InvalidHeaderName { .. })),
			}
		}
	}

	#[tokio::test]
	async fn decorate_applies_headers_and_validators() {
		let config = ClientConfig {
			headers: BTreeMap::from([("x-api-version".into(), vec!["2".into()])]),
			allowed_statuses: vec![200],
			require_body: true,
			timeout_ms: Some(5_000),
			..Default::default()
		};
		let client = config.decorate(echo_client()).expect("Stack should build.");
		let response = client.send(Some(get())).await.expect("Echo should pass the stack.");

		assert_eq!(response.headers.get("x-api-version").expect("Header should be set."), "2");

		let bodyless = ClientFn::shared(|_: Option<Request>| async {
			Ok(Response::new(StatusCode::OK))
		});
		let err = config
			.decorate(bodyless)
			.expect("Stack should build.")
			.send(Some(get()))
			.await
			.expect_err("Body is required.");

		assert!(err.has_kind(ErrorKind::MissingBody));
	}

	#[tokio::test(start_paused = true)]
	async fn timeout_covers_rate_limit_waits() {
		let config = ClientConfig {
			rate_limit: Some(RateLimitConfig { max_requests: 1, window_ms: 60_000 }),
			timeout_ms: Some(1_000),
			..Default::default()
		};
		let (inner, calls) = counting_client(200, "");
		let client = config.decorate(inner).expect("Stack should build.");

		client.send(Some(get())).await.expect("First request fits the window.");

		let err = client.send(Some(get())).await.expect_err("Second request should time out.");

		assert!(err.is_cancellation());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}
