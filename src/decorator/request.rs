//! Decorators that build or bound the request itself.

// self
use crate::{
	_prelude::*,
	client::{self, Client, ClientFuture, SharedClient},
	error::ConfigError,
	http::{Request, Signal},
};

/// Ignores the incoming request and sends a fresh `method url` request instead.
///
/// Accepts `None`, so it is usually the last decorator applied before calling `send`.
pub fn set_request(
	client: impl Into<Option<SharedClient>>,
	method: Method,
	url: Url,
) -> SharedClient {
	set_request_with_signal(Signal::default(), client, method, url)
}

/// Like [`set_request`], with every issued request bound to `signal`.
pub fn set_request_with_signal(
	signal: Signal,
	client: impl Into<Option<SharedClient>>,
	method: Method,
	url: Url,
) -> SharedClient {
	Arc::new(SetRequest { inner: client::or_default(client), signal, method, url })
}

/// Bounds the whole call, including time spent in inner decorators, to `timeout`.
///
/// The request's deadline becomes the earlier of its current one and now + `timeout`.
pub fn set_timeout(
	client: impl Into<Option<SharedClient>>,
	timeout: Duration,
) -> Result<SharedClient> {
	if timeout.is_zero() {
		return Err(ConfigError::ZeroTimeout.into());
	}

	Ok(Arc::new(Timeout { inner: client::or_default(client), timeout }))
}

struct SetRequest {
	inner: SharedClient,
	signal: Signal,
	method: Method,
	url: Url,
}
impl Client for SetRequest {
	fn send(&self, _: Option<Request>) -> ClientFuture<'_> {
		let request =
			Request::new(self.method.clone(), self.url.clone()).with_signal(self.signal.clone());

		self.inner.send(Some(request))
	}
}

struct Timeout {
	inner: SharedClient,
	timeout: Duration,
}
impl Client for Timeout {
	fn send(&self, request: Option<Request>) -> ClientFuture<'_> {
		Box::pin(async move {
			let request = request.ok_or_else(Error::missing_request)?.with_timeout(self.timeout);
			let signal = request.signal().clone();

			signal.check()?;

			tokio::select! {
				biased;
				err = signal.cancelled() => Err(err),
				result = self.inner.send(Some(request)) => result,
			}
		})
	}
}
