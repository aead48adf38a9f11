//! Response validators.

// std
use std::collections::BTreeSet;
// self
use crate::{
	_prelude::*,
	client::{self, Client, ClientFuture, SharedClient},
	http::Request,
};

/// Fails with [`Error::UnexpectedStatus`] unless the response status is in `statuses`.
///
/// An empty set accepts `200 OK` only.
pub fn require_status(
	client: impl Into<Option<SharedClient>>,
	statuses: impl IntoIterator<Item = StatusCode>,
) -> SharedClient {
	Arc::new(RequireStatus::new(client, statuses))
}

/// Fails with [`Error::MissingBody`] when the response carries no body.
pub fn require_body(client: impl Into<Option<SharedClient>>) -> SharedClient {
	Arc::new(RequireBody { inner: client::or_default(client) })
}

/// Status allow-list decorator; see [`require_status`].
#[derive(Clone)]
pub struct RequireStatus {
	inner: SharedClient,
	allowed: BTreeSet<StatusCode>,
}
impl RequireStatus {
	/// Builds the decorator.
	pub fn new(
		client: impl Into<Option<SharedClient>>,
		statuses: impl IntoIterator<Item = StatusCode>,
	) -> Self {
		let mut allowed = statuses.into_iter().collect::<BTreeSet<_>>();

		if allowed.is_empty() {
			allowed.insert(StatusCode::OK);
		}

		Self { inner: client::or_default(client), allowed }
	}

	/// Accepted status codes, ascending.
	pub fn allowed(&self) -> Vec<u16> {
		self.allowed.iter().map(StatusCode::as_u16).collect()
	}
}
impl Client for RequireStatus {
	fn send(&self, request: Option<Request>) -> ClientFuture<'_> {
		Box::pin(async move {
			let request = request.ok_or_else(Error::missing_request)?;
			let response = self.inner.send(Some(request)).await?;

			if !self.allowed.contains(&response.status) {
				return Err(Error::UnexpectedStatus {
					got: response.status.as_u16(),
					allowed: self.allowed(),
				});
			}

			Ok(response)
		})
	}
}
impl Debug for RequireStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequireStatus").field("allowed", &self.allowed()).finish()
	}
}

struct RequireBody {
	inner: SharedClient,
}
impl Client for RequireBody {
	fn send(&self, request: Option<Request>) -> ClientFuture<'_> {
		Box::pin(async move {
			let request = request.ok_or_else(Error::missing_request)?;
			let response = self.inner.send(Some(request)).await?;

			if response.body.is_none() {
				return Err(Error::MissingBody);
			}

			Ok(response)
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, client::ClientFn, error::ErrorKind, http::Response};

	fn get() -> Request {
		Request::new(Method::GET, test_url("http://localhost/status"))
	}

	#[tokio::test]
	async fn status_outside_allow_list_is_rejected() {
		let (inner, calls) = counting_client(404, "missing");
		let client = require_status(inner, [StatusCode::OK, StatusCode::CREATED]);
		let err = client.send(Some(get())).await.expect_err("404 is not allowed.");

		assert!(matches!(
			&err,
			Error::UnexpectedStatus { got: 404, allowed } if allowed == &[200, 201]
		));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn empty_allow_list_defaults_to_ok() {
		let decorator = RequireStatus::new(counting_client(200, "").0, []);

		assert_eq!(decorator.allowed(), [200]);

		decorator.send(Some(get())).await.expect("200 should pass.");

		let err = require_status(counting_client(204, "").0, [])
			.send(Some(get()))
			.await
			.expect_err("204 is outside the default set.");

		assert!(err.has_kind(ErrorKind::UnexpectedStatus));
	}

	#[tokio::test]
	async fn bodyless_response_is_rejected() {
		let bodyless = ClientFn::shared(|_: Option<Request>| async {
			Ok(Response::new(StatusCode::NO_CONTENT))
		});
		let err = require_body(bodyless).send(Some(get())).await.expect_err("Body is required.");

		assert!(matches!(err, Error::MissingBody));

		require_body(counting_client(200, "").0)
			.send(Some(get()))
			.await
			.expect("Empty body still counts as present.");
	}

	#[tokio::test]
	async fn transport_errors_pass_through_untouched() {
		let failing = ClientFn::shared(|_: Option<Request>| async {
			Err(Error::Transport(crate::error::TransportError::network(std::io::Error::other(
				"connection refused",
			))))
		});
		let err = require_status(require_body(failing), [])
			.send(Some(get()))
			.await
			.expect_err("Transport failure should surface.");

		assert!(err.has_kind(ErrorKind::Transport));
	}
}
