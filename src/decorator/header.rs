//! Header and cookie decorators.

// crates.io
use ::http::header::COOKIE;
// self
use crate::{
	_prelude::*,
	client::{self, Client, ClientFuture, SharedClient},
	error::ConfigError,
	http::{Cookie, Request},
};

/// Replaces every `name` header on the request with `values`.
///
/// An empty `values` removes the header.
pub fn set_header<I>(
	client: impl Into<Option<SharedClient>>,
	name: &str,
	values: I,
) -> Result<SharedClient>
where
	I: IntoIterator,
	I::Item: AsRef<str>,
{
	let (name, values) = parse_header(name, values)?;

	Ok(Arc::new(HeaderDecorator::new(client, HeaderMode::Set, name, values)))
}

/// Appends `values` to the request's `name` header.
pub fn add_header<I>(
	client: impl Into<Option<SharedClient>>,
	name: &str,
	values: I,
) -> Result<SharedClient>
where
	I: IntoIterator,
	I::Item: AsRef<str>,
{
	let (name, values) = parse_header(name, values)?;

	Ok(Arc::new(HeaderDecorator::new(client, HeaderMode::Add, name, values)))
}

/// Appends `cookies` to the request's `Cookie` header.
///
/// With no cookies the client is returned as is.
pub fn add_cookies(
	client: impl Into<Option<SharedClient>>,
	cookies: impl IntoIterator<Item = Cookie>,
) -> SharedClient {
	let client = client::or_default(client);
	let cookies = cookies.into_iter().collect::<Vec<_>>();

	if cookies.is_empty() {
		return client;
	}

	Arc::new(AddCookies { inner: client, cookies })
}

/// Drops any `Cookie` header on the request, then sends `cookies` only.
///
/// Cookies a transport adds on its own, such as from a cookie jar, are untouched.
pub fn set_cookies(
	client: impl Into<Option<SharedClient>>,
	cookies: impl IntoIterator<Item = Cookie>,
) -> SharedClient {
	Arc::new(HeaderDecorator::new(
		add_cookies(client, cookies),
		HeaderMode::Set,
		COOKIE,
		Vec::new(),
	))
}

pub(crate) fn parse_header<I>(name: &str, values: I) -> Result<(HeaderName, Vec<HeaderValue>)>
where
	I: IntoIterator,
	I::Item: AsRef<str>,
{
	let header = HeaderName::try_from(name).map_err(|e| ConfigError::header_name(name, e))?;
	let values = values
		.into_iter()
		.map(|value| {
			HeaderValue::try_from(value.as_ref()).map_err(|e| ConfigError::header_value(name, e))
		})
		.collect::<Result<Vec<_>, _>>()?;

	Ok((header, values))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HeaderMode {
	Set,
	Add,
}

/// Writes a fixed header before delegating.
pub(crate) struct HeaderDecorator {
	inner: SharedClient,
	mode: HeaderMode,
	name: HeaderName,
	values: Vec<HeaderValue>,
}
impl HeaderDecorator {
	pub(crate) fn new(
		client: impl Into<Option<SharedClient>>,
		mode: HeaderMode,
		name: HeaderName,
		values: Vec<HeaderValue>,
	) -> Self {
		Self { inner: client::or_default(client), mode, name, values }
	}

	fn apply(&self, headers: &mut HeaderMap) {
		if self.mode == HeaderMode::Set {
			headers.remove(&self.name);
		}

		for value in &self.values {
			headers.append(self.name.clone(), value.clone());
		}
	}
}
impl Client for HeaderDecorator {
	fn send(&self, request: Option<Request>) -> ClientFuture<'_> {
		Box::pin(async move {
			let mut request = request.ok_or_else(Error::missing_request)?;

			self.apply(&mut request.headers);
			self.inner.send(Some(request)).await
		})
	}
}

struct AddCookies {
	inner: SharedClient,
	cookies: Vec<Cookie>,
}
impl Client for AddCookies {
	fn send(&self, request: Option<Request>) -> ClientFuture<'_> {
		Box::pin(async move {
			let mut request = request.ok_or_else(Error::missing_request)?;

			for cookie in &self.cookies {
				request.add_cookie(cookie)?;
			}

			self.inner.send(Some(request)).await
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, error::ErrorKind};

	fn get() -> Request {
		Request::new(Method::GET, test_url("http://localhost/headers"))
	}

	fn values<'a>(headers: &'a HeaderMap, name: &str) -> Vec<&'a str> {
		headers
			.get_all(name)
			.iter()
			.map(|value| value.to_str().expect("Header should be ASCII."))
			.collect()
	}

	#[tokio::test]
	async fn set_header_replaces_and_add_header_appends() {
		let client = set_header(echo_client(), "X-Mode", ["set"]).expect("Header should build.");
		let client = add_header(client, "x-extra", ["a", "b"]).expect("Header should build.");
		let mut request = get();

		request.headers.insert("x-mode", HeaderValue::from_static("original"));
		request.headers.insert("x-extra", HeaderValue::from_static("0"));

		let response = client.send(Some(request)).await.expect("Echo should answer.");

		assert_eq!(values(&response.headers, "x-mode"), ["set"]);
		assert_eq!(values(&response.headers, "x-extra"), ["0", "a", "b"]);
	}

	#[tokio::test]
	async fn set_header_with_no_values_removes_the_header() {
		let empty: [&str; 0] = [];
		let client = set_header(echo_client(), "x-gone", empty).expect("Header should build.");
		let mut request = get();

		request.headers.insert("x-gone", HeaderValue::from_static("1"));

		let response = client.send(Some(request)).await.expect("Echo should answer.");

		assert!(response.headers.get("x-gone").is_none());
	}

	#[test]
	fn invalid_header_is_rejected_at_construction() {
		let err = set_header(echo_client(), "bad header", ["v"]).expect_err("Name has a space.");

		assert!(err.has_kind(ErrorKind::Config));
		assert!(matches!(err, Error::Config(ConfigError::InvalidHeaderName { .. })));

		let err = add_header(echo_client(), "x-ok", ["line\nbreak"]).expect_err("Value has a newline.");

		assert!(matches!(err, Error::Config(ConfigError::InvalidHeaderValue { .. })));
	}

	#[tokio::test]
	async fn add_cookies_appends_and_set_cookies_clears_first() {
		let appended = add_cookies(echo_client(), [Cookie::new("b", "2")]);
		let replaced = set_cookies(echo_client(), [Cookie::new("c", "3"), Cookie::new("d", "4")]);
		let mut request = get();

		request.headers.insert(COOKIE, HeaderValue::from_static("a=1"));

		let response = appended.send(Some(request.clone())).await.expect("Echo should answer.");

		assert_eq!(values(&response.headers, "cookie"), ["a=1; b=2"]);

		let response = replaced.send(Some(request)).await.expect("Echo should answer.");

		assert_eq!(values(&response.headers, "cookie"), ["c=3; d=4"]);
	}

	#[tokio::test]
	async fn header_decorators_require_a_request() {
		let client = set_header(echo_client(), "x", ["1"]).expect("Header should build.");
		let err = client.send(None).await.expect_err("Missing request should be rejected.");

		assert!(err.has_kind(ErrorKind::InvalidArgument));
	}
}
