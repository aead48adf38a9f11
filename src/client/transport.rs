//! Default transport backed by [`reqwest`].

// std
use std::{io, ops::Deref};
// crates.io
use reqwest::{Client as ReqwestClient, Request as ReqwestRequest, Response as ReqwestResponse};
// self
use crate::{
	_prelude::*,
	client::{Client, ClientFuture},
	error::ConfigError,
	http::{Body, BodyFuture, BodyStream, Request, Response, Signal},
};

/// Thin wrapper around [`ReqwestClient`] implementing [`Client`].
///
/// Both the round trip and the later body read race the request's [`Signal`], so a
/// canceled caller stops waiting on the network as well as on decorator gates.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a transport whose connections give up after `timeout`.
	pub fn with_timeout(timeout: Duration) -> Result<Self> {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.build()
			.map_err(ConfigError::http_client_build)?;

		Ok(Self(client))
	}

	fn to_native(request: Request) -> ReqwestRequest {
		let Request { method, url, headers, body, .. } = request;
		let mut native = ReqwestRequest::new(method, url);

		*native.headers_mut() = headers;

		if let Some(body) = body {
			*native.body_mut() = Some(body.into());
		}

		native
	}
}
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl Client for ReqwestTransport {
	fn send(&self, request: Option<Request>) -> ClientFuture<'_> {
		Box::pin(async move {
			let request = request.ok_or_else(Error::missing_request)?;
			let signal = request.signal().clone();

			signal.check()?;

			let native = Self::to_native(request);
			let response = tokio::select! {
				biased;
				err = signal.cancelled() => return Err(err),
				response = self.0.execute(native) => response?,
			};
			let mut converted = Response::new(response.status());

			converted.headers = response.headers().to_owned();
			converted.body = Some(Body::new(ReqwestBody { response: Some(response), signal }));

			Ok(converted)
		})
	}
}

struct ReqwestBody {
	response: Option<ReqwestResponse>,
	signal: Signal,
}
impl BodyStream for ReqwestBody {
	fn read_all(&mut self) -> BodyFuture<'_, Vec<u8>> {
		let response = self.response.take();
		let signal = self.signal.clone();

		Box::pin(async move {
			let Some(response) = response else {
				return Ok(Vec::new());
			};

			tokio::select! {
				biased;
				err = signal.cancelled() => Err(err),
				bytes = response.bytes() => Ok(bytes?.to_vec()),
			}
		})
	}

	fn close(&mut self) -> io::Result<()> {
		self.response = None;

		Ok(())
	}
}
