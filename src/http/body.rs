//! Response body streams.

// std
use std::io;
// self
use crate::_prelude::*;

/// Boxed future returned by [`BodyStream::read_all`].
pub type BodyFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Readable, closable byte stream backing a [`Body`].
///
/// Transports implement this for their native body type. Reading consumes the stream;
/// `close` releases whatever the transport holds and may fail independently of reading.
pub trait BodyStream
where
	Self: Send,
{
	/// Reads every remaining byte.
	fn read_all(&mut self) -> BodyFuture<'_, Vec<u8>>;

	/// Releases the stream.
	fn close(&mut self) -> io::Result<()>;
}

/// Owned response body.
pub struct Body(Box<dyn BodyStream>);
impl Body {
	/// Wraps a transport-specific stream.
	pub fn new(stream: impl 'static + BodyStream) -> Self {
		Self(Box::new(stream))
	}

	/// Creates an in-memory body over `bytes`.
	pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
		Self::new(BufferedBody(bytes.into()))
	}

	/// Reads every remaining byte from the stream.
	pub async fn read_all(&mut self) -> Result<Vec<u8>> {
		self.0.read_all().await
	}

	/// Closes the underlying stream.
	pub fn close(&mut self) -> io::Result<()> {
		self.0.close()
	}
}
impl Debug for Body {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Body(..)")
	}
}

struct BufferedBody(Vec<u8>);
impl BodyStream for BufferedBody {
	fn read_all(&mut self) -> BodyFuture<'_, Vec<u8>> {
		let bytes = std::mem::take(&mut self.0);

		Box::pin(async move { Ok(bytes) })
	}

	fn close(&mut self) -> io::Result<()> {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn buffered_body_reads_once() {
		let mut body = Body::from_bytes("{\"hello\":\"world\"}");

		assert_eq!(body.read_all().await.expect("First read should succeed."), b"{\"hello\":\"world\"}");
		assert!(body.read_all().await.expect("Second read should succeed.").is_empty());
		assert!(body.close().is_ok());
	}
}
