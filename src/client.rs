//! The client contract every decorator composes over.
//!
//! [`Client`] is the crate's only dependency on an HTTP stack: anything that can turn a
//! [`Request`] into a [`Response`] qualifies, including every decorator in this crate. Stacks
//! are passed around as [`SharedClient`] so one decorated value can serve many concurrent
//! callers.

#[cfg(feature = "reqwest")] mod transport;

#[cfg(feature = "reqwest")] pub use transport::*;

// self
use crate::{
	_prelude::*,
	http::{Request, Response},
};

/// Boxed future returned by [`Client::send`].
pub type ClientFuture<'a> = Pin<Box<dyn Future<Output = Result<Response>> + 'a + Send>>;

/// Reference-counted client handle shared by decorators and callers.
pub type SharedClient = Arc<dyn Client>;

/// Performs a request and yields a response or an error.
///
/// When `send` fails the response is dropped; when it succeeds a response is always
/// present. Implementations must tolerate concurrent calls on the same value. Decorators
/// that need a request fail with [`Error::InvalidArgument`] when handed `None` and never
/// reach the client they wrap.
pub trait Client
where
	Self: Send + Sync,
{
	/// Sends `request` and resolves with the response.
	fn send(&self, request: Option<Request>) -> ClientFuture<'_>;
}
impl Debug for dyn Client {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Client(..)")
	}
}

/// Adapter that lets an async closure act as a [`Client`].
#[derive(Clone)]
pub struct ClientFn<F>(pub F);
impl<F> ClientFn<F> {
	/// Wraps `f` and returns it as a [`SharedClient`].
	pub fn shared<Fut>(f: F) -> SharedClient
	where
		F: 'static + Send + Sync + Fn(Option<Request>) -> Fut,
		Fut: 'static + Send + Future<Output = Result<Response>>,
	{
		Arc::new(Self(f))
	}
}
impl<F, Fut> Client for ClientFn<F>
where
	F: Send + Sync + Fn(Option<Request>) -> Fut,
	Fut: 'static + Send + Future<Output = Result<Response>>,
{
	fn send(&self, request: Option<Request>) -> ClientFuture<'_> {
		Box::pin((self.0)(request))
	}
}
impl<F> Debug for ClientFn<F> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ClientFn(..)")
	}
}

/// Returns `client`, or a freshly built default transport when `client` is `None`.
///
/// Each call builds its own transport; there is no process-wide default. Without the
/// `reqwest` feature the substitute fails every request with [`Error::InvalidArgument`].
pub fn or_default(client: impl Into<Option<SharedClient>>) -> SharedClient {
	match client.into() {
		Some(client) => client,
		#[cfg(feature = "reqwest")]
		None => Arc::new(ReqwestTransport::default()),
		#[cfg(not(feature = "reqwest"))]
		None => Arc::new(NoTransport),
	}
}

#[cfg(not(feature = "reqwest"))]
struct NoTransport;
#[cfg(not(feature = "reqwest"))]
impl Client for NoTransport {
	fn send(&self, _: Option<Request>) -> ClientFuture<'_> {
		Box::pin(async {
			Err(Error::InvalidArgument {
				reason: "no transport configured; enable the `reqwest` feature or pass a client"
					.into(),
			})
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	#[tokio::test]
	async fn client_fn_forwards_requests() {
		let (client, calls) = counting_client(204, "");
		let response = client
			.send(Some(Request::new(Method::GET, test_url("http://localhost/"))))
			.await
			.expect("Counting client should answer.");

		assert_eq!(response.status, StatusCode::NO_CONTENT);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn shared_clients_are_debuggable() {
		let client: Result<SharedClient> = Ok(echo_client());

		assert_eq!(format!("{client:?}"), "Ok(Client(..))");
	}

	#[tokio::test]
	async fn or_default_keeps_provided_client() {
		let (client, calls) = counting_client(200, "");
		let resolved = or_default(client);

		resolved
			.send(Some(Request::new(Method::GET, test_url("http://localhost/"))))
			.await
			.expect("Provided client should be used.");

		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}
