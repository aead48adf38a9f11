//! Request and response values that flow through decorator stacks.
//!
//! A [`Request`] is owned by whoever currently holds it; decorators receive it by value,
//! mutate headers or body in place, and hand it to the next [`Client`](crate::client::Client).
//! Every request carries a [`Signal`] so blocking decorators can give up once the caller
//! cancels or the deadline elapses.

pub mod body;
pub mod cookie;

pub use body::*;
pub use cookie::*;

// crates.io
use ::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use crate::{_prelude::*, error::ConfigError};

/// Cancellation token plus optional deadline attached to a request.
///
/// Clones share the same token, so canceling any clone cancels them all.
#[derive(Clone, Debug, Default)]
pub struct Signal {
	token: CancellationToken,
	deadline: Option<Instant>,
}
impl Signal {
	/// Creates a signal that only fires when `token` is canceled.
	pub fn new(token: CancellationToken) -> Self {
		Self { token, deadline: None }
	}

	/// Returns a copy whose deadline is the earlier of the current one and `deadline`.
	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(match self.deadline {
			Some(current) if current <= deadline => current,
			_ => deadline,
		});

		self
	}

	/// Returns the configured deadline, if any.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Returns the cancellation token backing this signal.
	pub fn token(&self) -> &CancellationToken {
		&self.token
	}

	/// Fails immediately when the signal has already fired.
	pub fn check(&self) -> Result<()> {
		if self.token.is_cancelled() {
			return Err(Error::Canceled);
		}
		if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
			return Err(Error::DeadlineExceeded);
		}

		Ok(())
	}

	/// Resolves with the matching error once the token is canceled or the deadline passes.
	pub async fn cancelled(&self) -> Error {
		let deadline = self.deadline;

		tokio::select! {
			biased;
			_ = self.token.cancelled() => Error::Canceled,
			_ = sleep_until(deadline) => Error::DeadlineExceeded,
		}
	}
}

async fn sleep_until(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(deadline).await,
		None => std::future::pending().await,
	}
}

/// Outbound request descriptor.
#[derive(Clone, Debug)]
pub struct Request {
	/// HTTP method.
	pub method: Method,
	/// Target URL.
	pub url: Url,
	/// Request headers.
	pub headers: HeaderMap,
	/// Request payload, if any.
	pub body: Option<Vec<u8>>,
	signal: Signal,
}
impl Request {
	/// Creates a request with empty headers, no body, and a fresh signal.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None, signal: Signal::default() }
	}

	/// Replaces the request's signal.
	pub fn with_signal(mut self, signal: Signal) -> Self {
		self.signal = signal;

		self
	}

	/// Tightens the deadline so the request gives up after `timeout` from now.
	///
	/// A timeout too large to represent as an instant leaves the deadline unchanged.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		if let Some(deadline) = Instant::now().checked_add(timeout) {
			self.signal = self.signal.with_deadline(deadline);
		}

		self
	}

	/// Returns the request's cancellation signal.
	pub fn signal(&self) -> &Signal {
		&self.signal
	}

	/// Sets `Authorization: Basic ...` for the provided credentials.
	pub fn basic_auth(mut self, user: &str, password: &str) -> Result<Self> {
		let encoded = STANDARD.encode(format!("{user}:{password}"));
		let mut value = HeaderValue::try_from(format!("Basic {encoded}"))
			.map_err(|e| ConfigError::header_value(AUTHORIZATION.as_str(), e))?;

		value.set_sensitive(true);
		self.headers.insert(AUTHORIZATION, value);

		Ok(self)
	}

	/// Appends a cookie to the `Cookie` header, joining with `; ` when one already exists.
	pub fn add_cookie(&mut self, cookie: &Cookie) -> Result<()> {
		let pair = cookie.to_pair();
		let joined = match self.headers.get(COOKIE).map(HeaderValue::as_bytes) {
			Some(existing) if !existing.is_empty() => {
				let mut buf = existing.to_vec();

				buf.extend_from_slice(b"; ");
				buf.extend_from_slice(pair.as_bytes());

				buf
			},
			_ => pair.into_bytes(),
		};
		let value = HeaderValue::from_bytes(&joined)
			.map_err(|e| ConfigError::header_value(COOKIE.as_str(), e))?;

		self.headers.insert(COOKIE, value);

		Ok(())
	}
}

/// Result of a request that reached the server.
pub struct Response {
	/// Status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response payload stream; whoever reads it last must close it.
	pub body: Option<Body>,
}
impl Response {
	/// Creates a response with no headers and no body.
	pub fn new(status: StatusCode) -> Self {
		Self { status, headers: HeaderMap::new(), body: None }
	}

	/// Parses every `Set-Cookie` header into name/value pairs.
	///
	/// Attributes such as `Path` or `Max-Age` are ignored; malformed entries are skipped.
	pub fn cookies(&self) -> Vec<Cookie> {
		self.headers
			.get_all(SET_COOKIE)
			.iter()
			.filter_map(|value| value.to_str().ok())
			.filter_map(Cookie::parse_set_cookie)
			.collect()
	}
}
impl Debug for Response {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Response")
			.field("status", &self.status)
			.field("headers", &self.headers)
			.field("has_body", &self.body.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	#[test]
	fn basic_auth_encodes_credentials() {
		let request = Request::new(Method::GET, test_url("http://localhost/login"))
			.basic_auth("tom", "password1")
			.expect("Basic auth header should be valid.");

		assert_eq!(
			request.headers.get(AUTHORIZATION).expect("Authorization header should be set."),
			"Basic dG9tOnBhc3N3b3JkMQ=="
		);
	}

	#[test]
	fn add_cookie_joins_existing_header() {
		let mut request = Request::new(Method::GET, test_url("http://localhost/"));

		request.add_cookie(&Cookie::new("a", "1")).expect("First cookie should be accepted.");
		request.add_cookie(&Cookie::new("b", "2")).expect("Second cookie should be accepted.");

		assert_eq!(request.headers.get(COOKIE).expect("Cookie header should be set."), "a=1; b=2");
	}

	#[test]
	fn response_cookies_parse_set_cookie_headers() {
		let mut response = Response::new(StatusCode::OK);

		response.headers.append(SET_COOKIE, HeaderValue::from_static("session=abc; Path=/"));
		response.headers.append(SET_COOKIE, HeaderValue::from_static("theme=dark"));
		response.headers.append(SET_COOKIE, HeaderValue::from_static("=broken"));

		assert_eq!(response.cookies(), vec![Cookie::new("session", "abc"), Cookie::new("theme", "dark")]);
	}

	#[tokio::test(start_paused = true)]
	async fn timeout_keeps_the_earlier_deadline() {
		let request = Request::new(Method::GET, test_url("http://localhost/"))
			.with_timeout(Duration::from_secs(1))
			.with_timeout(Duration::from_secs(30));
		let deadline = request.signal().deadline().expect("Deadline should be set.");

		assert!(deadline <= Instant::now() + Duration::from_secs(1));
		assert!(request.signal().check().is_ok());

		tokio::time::advance(Duration::from_secs(2)).await;

		assert!(matches!(request.signal().check(), Err(Error::DeadlineExceeded)));
	}

	#[tokio::test(start_paused = true)]
	async fn unrepresentable_timeout_sets_no_deadline() {
		let request =
			Request::new(Method::GET, test_url("http://localhost/")).with_timeout(Duration::MAX);

		assert!(request.signal().deadline().is_none());

		let tightened = request.with_timeout(Duration::from_secs(1));

		assert!(tightened.with_timeout(Duration::MAX).signal().deadline().is_some());
	}

	#[tokio::test]
	async fn cancelled_resolves_after_token_cancel() {
		let token = CancellationToken::new();
		let signal = Signal::new(token.clone());

		token.cancel();

		assert!(matches!(signal.cancelled().await, Error::Canceled));
		assert!(matches!(signal.check(), Err(Error::Canceled)));
	}
}
