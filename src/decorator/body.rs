//! Request body marshalling and response body decoding.
//!
//! Decoding materializes the whole response body, closes the original stream, and puts an
//! in-memory copy back on the response so callers further out can still read it. Decoded
//! values land in a [`ResponseSlot`] shared with the caller.

// std
use std::convert::Infallible;
// crates.io
use ::http::header::{ACCEPT, CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	client::{self, Client, ClientFuture, SharedClient},
	decorator::{
		header::{HeaderDecorator, HeaderMode},
		validate,
	},
	error::EncodingError,
	http::{Body, Request},
};

const APPLICATION_JSON: &str = "application/json";

/// Thread-safe slot receiving the value decoded from the most recent response.
///
/// Clones share the same storage; keep one and hand another to [`decode_body`].
pub struct ResponseSlot<T>(Arc<Mutex<Option<T>>>);
impl<T> ResponseSlot<T> {
	/// Creates an empty slot.
	pub fn new() -> Self {
		Self(Arc::new(Mutex::new(None)))
	}

	/// Stores a freshly decoded value, replacing any previous one.
	pub fn store(&self, value: T) {
		*self.0.lock() = Some(value);
	}

	/// Returns the decoded value, if any, consuming it from the slot.
	pub fn take(&self) -> Option<T> {
		self.0.lock().take()
	}

	/// Returns a copy of the decoded value, leaving it in place.
	pub fn get(&self) -> Option<T>
	where
		T: Clone,
	{
		self.0.lock().clone()
	}
}
impl<T> Clone for ResponseSlot<T> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}
impl<T> Default for ResponseSlot<T> {
	fn default() -> Self {
		Self::new()
	}
}
impl<T> Debug for ResponseSlot<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ResponseSlot").field(&*self.0.lock()).finish()
	}
}

/// Turns a value into request body bytes.
pub trait Marshaller<T>
where
	Self: Send + Sync,
{
	/// Encodes `value`.
	fn marshal(&self, value: &T) -> Result<Vec<u8>>;
}
impl<T, F, E> Marshaller<T> for F
where
	F: Send + Sync + Fn(&T) -> std::result::Result<Vec<u8>, E>,
	E: 'static + Send + Sync + StdError,
{
	fn marshal(&self, value: &T) -> Result<Vec<u8>> {
		self(value).map_err(|e| EncodingError::marshal(e).into())
	}
}

/// Turns response body bytes into a value.
pub trait Decoder<T>
where
	Self: Send + Sync,
{
	/// Decodes `bytes`.
	fn decode(&self, bytes: &[u8]) -> Result<T>;
}
impl<T, F, E> Decoder<T> for F
where
	F: Send + Sync + Fn(&[u8]) -> std::result::Result<T, E>,
	E: 'static + Send + Sync + StdError,
{
	fn decode(&self, bytes: &[u8]) -> Result<T> {
		self(bytes).map_err(|e| EncodingError::decode(e).into())
	}
}

/// Sends `bytes` as the request body.
pub fn set_body(
	client: impl Into<Option<SharedClient>>,
	bytes: impl Into<Vec<u8>>,
) -> SharedClient {
	let bytes = bytes.into();

	set_body_with(client, |bytes: &Vec<u8>| Ok::<_, Infallible>(bytes.clone()), bytes)
}

/// Marshals `value` with `marshaller` on every request and sends it as the body.
///
/// A marshalling failure surfaces as [`EncodingError::Marshal`] before the wrapped client is
/// called.
pub fn set_body_with<T>(
	client: impl Into<Option<SharedClient>>,
	marshaller: impl 'static + Marshaller<T>,
	value: T,
) -> SharedClient
where
	T: 'static + Send + Sync,
{
	Arc::new(SetBody { inner: client::or_default(client), marshaller: Box::new(marshaller), value })
}

/// Sends `value` as a JSON body with `Content-Type: application/json`.
pub fn set_json_body<T>(client: impl Into<Option<SharedClient>>, value: T) -> SharedClient
where
	T: 'static + Send + Sync + Serialize,
{
	let client = Arc::new(HeaderDecorator::new(
		client,
		HeaderMode::Set,
		CONTENT_TYPE,
		vec![HeaderValue::from_static(APPLICATION_JSON)],
	));

	Arc::new(SetBody { inner: client, marshaller: Box::new(JsonMarshaller), value })
}

/// Decodes every response body with `decoder` into `slot`.
///
/// Responses without a body fail with [`Error::MissingBody`]. If the original stream fails
/// to close after a successful decode the call fails with [`Error::BodyClose`]; the decoded
/// value is still stored.
pub fn decode_body<T>(
	client: impl Into<Option<SharedClient>>,
	decoder: impl 'static + Decoder<T>,
	slot: ResponseSlot<T>,
) -> SharedClient
where
	T: 'static + Send,
{
	Arc::new(DecodeBody {
		inner: validate::require_body(client),
		decoder: Box::new(decoder),
		slot,
	})
}

/// Decodes every response body as JSON into `slot`, sending `Accept: application/json`.
///
/// Parse failures report the path of the offending field.
pub fn decode_json<T>(
	client: impl Into<Option<SharedClient>>,
	slot: ResponseSlot<T>,
) -> SharedClient
where
	T: 'static + Send + for<'de> Deserialize<'de>,
{
	let client: SharedClient = Arc::new(HeaderDecorator::new(
		client,
		HeaderMode::Set,
		ACCEPT,
		vec![HeaderValue::from_static(APPLICATION_JSON)],
	));

	decode_body(client, JsonDecoder, slot)
}

struct JsonMarshaller;
impl<T> Marshaller<T> for JsonMarshaller
where
	T: Serialize,
{
	fn marshal(&self, value: &T) -> Result<Vec<u8>> {
		serde_json::to_vec(value).map_err(|e| EncodingError::marshal(e).into())
	}
}

struct JsonDecoder;
impl<T> Decoder<T> for JsonDecoder
where
	T: for<'de> Deserialize<'de>,
{
	fn decode(&self, bytes: &[u8]) -> Result<T> {
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);

		let value = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| EncodingError::Json { source })?;

		deserializer.end().map_err(EncodingError::decode)?;

		Ok(value)
	}
}

struct SetBody<T> {
	inner: SharedClient,
	marshaller: Box<dyn Marshaller<T>>,
	value: T,
}
impl<T> Client for SetBody<T>
where
	T: Send + Sync,
{
	fn send(&self, request: Option<Request>) -> ClientFuture<'_> {
		Box::pin(async move {
			let mut request = request.ok_or_else(Error::missing_request)?;

			request.body = Some(self.marshaller.marshal(&self.value)?);

			self.inner.send(Some(request)).await
		})
	}
}

struct DecodeBody<T> {
	inner: SharedClient,
	decoder: Box<dyn Decoder<T>>,
	slot: ResponseSlot<T>,
}
impl<T> Client for DecodeBody<T>
where
	T: Send,
{
	fn send(&self, request: Option<Request>) -> ClientFuture<'_> {
		Box::pin(async move {
			let request = request.ok_or_else(Error::missing_request)?;
			let mut response = self.inner.send(Some(request)).await?;
			let mut body = response.body.take().ok_or(Error::MissingBody)?;
			let read = body.read_all().await;
			let closed = body.close();
			let bytes = read?;

			response.body = Some(Body::from_bytes(bytes.clone()));

			self.slot.store(self.decoder.decode(&bytes)?);

			if let Err(source) = closed {
				return Err(Error::BodyClose { source });
			}

			Ok(response)
		})
	}
}
