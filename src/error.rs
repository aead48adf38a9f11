//! Crate-level error types shared by the client contract and every decorator.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error returned from [`Client::send`](crate::client::Client::send).
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem detected while building a decorator.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Failure reported by the underlying transport, passed through untouched.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Request or response body could not be marshalled or unmarshalled.
	#[error(transparent)]
	Encoding(#[from] EncodingError),

	/// A decorator was invoked without a request to operate on.
	#[error("Invalid argument: {reason}.")]
	InvalidArgument {
		/// Explanation of the rejected argument.
		reason: String,
	},
	/// Response status is not part of the allowed set.
	#[error("Received unexpected status code {got}; allowed: {allowed:?}.")]
	UnexpectedStatus {
		/// Status code returned by the server.
		got: u16,
		/// Status codes the decorator accepts.
		allowed: Vec<u16>,
	},
	/// Response carries no body.
	#[error("Expected a response body.")]
	MissingBody,
	/// Login response did not carry the expected credential.
	#[error("Login response is missing the `{header}` credential header.")]
	MissingCredential {
		/// Header the credential was expected in.
		header: String,
	},
	/// The original response body could not be closed after it was read.
	#[error("Response body could not be closed: {source}.")]
	BodyClose {
		/// Failure reported by the body stream.
		#[source]
		source: std::io::Error,
	},
	/// The request's cancellation token fired before the call could proceed.
	#[error("Request was canceled.")]
	Canceled,
	/// The request's deadline elapsed before the call could proceed.
	#[error("Request deadline exceeded.")]
	DeadlineExceeded,
	/// A single-flight initialization attempt failed; the next caller may retry.
	#[error("Initialization failed: {0}")]
	InitializationFailed(#[source] Arc<Error>),
}
impl Error {
	/// Builds the error returned when a decorator receives no request.
	pub fn missing_request() -> Self {
		Self::InvalidArgument { reason: "a request is required".into() }
	}

	/// Returns the flat kind of this error without descending into causes.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Config(_) => ErrorKind::Config,
			Self::Transport(_) => ErrorKind::Transport,
			Self::Encoding(_) => ErrorKind::Encoding,
			Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
			Self::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
			Self::MissingBody => ErrorKind::MissingBody,
			Self::MissingCredential { .. } => ErrorKind::MissingCredential,
			Self::BodyClose { .. } => ErrorKind::BodyClose,
			Self::Canceled => ErrorKind::Canceled,
			Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
			Self::InitializationFailed(_) => ErrorKind::InitializationFailed,
		}
	}

	/// Chain-aware kind check.
	///
	/// Matches this error's own kind or, for [`Error::InitializationFailed`], the kind of any
	/// wrapped failure. Use it as the general sentinel test, e.g.
	/// `err.has_kind(ErrorKind::BodyClose)` holds both for a direct close failure and for
	/// one that broke an initializer.
	pub fn has_kind(&self, kind: ErrorKind) -> bool {
		let mut current = self;

		loop {
			if current.kind() == kind {
				return true;
			}

			match current {
				Self::InitializationFailed(inner) => current = &**inner,
				_ => return false,
			}
		}
	}

	/// Returns `true` when the error came from the request's cancellation signal.
	pub fn is_cancellation(&self) -> bool {
		self.has_kind(ErrorKind::Canceled) || self.has_kind(ErrorKind::DeadlineExceeded)
	}

	/// Walks the `source()` chain and returns the first cause of type `E`.
	///
	/// The error itself is not inspected; only its causes are.
	pub fn find_source<E>(&self) -> Option<&E>
	where
		E: 'static + StdError,
	{
		let mut current = StdError::source(self);

		while let Some(err) = current {
			if let Some(hit) = err.downcast_ref::<E>() {
				return Some(hit);
			}

			current = err.source();
		}

		None
	}
}

/// Flat classification of [`Error`] variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// [`Error::Config`].
	Config,
	/// [`Error::Transport`].
	Transport,
	/// [`Error::Encoding`].
	Encoding,
	/// [`Error::InvalidArgument`].
	InvalidArgument,
	/// [`Error::UnexpectedStatus`].
	UnexpectedStatus,
	/// [`Error::MissingBody`].
	MissingBody,
	/// [`Error::MissingCredential`].
	MissingCredential,
	/// [`Error::BodyClose`].
	BodyClose,
	/// [`Error::Canceled`].
	Canceled,
	/// [`Error::DeadlineExceeded`].
	DeadlineExceeded,
	/// [`Error::InitializationFailed`].
	InitializationFailed,
}

/// Configuration and validation failures raised while building decorators.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Header name cannot be used in a request.
	#[error("Header name `{name}` is invalid.")]
	InvalidHeaderName {
		/// Rejected header name.
		name: String,
		/// Underlying parsing failure.
		#[source]
		source: ::http::header::InvalidHeaderName,
	},
	/// Header value cannot be used in a request.
	#[error("Value for header `{name}` is invalid.")]
	InvalidHeaderValue {
		/// Header the value was meant for.
		name: String,
		/// Underlying parsing failure.
		#[source]
		source: ::http::header::InvalidHeaderValue,
	},
	/// Rate limiter capacity must admit at least one request per window.
	#[error("Rate limit capacity must be greater than zero.")]
	ZeroRateLimitCapacity,
	/// Rate limiter window must be a positive duration.
	#[error("Rate limit window must be greater than zero.")]
	ZeroRateLimitWindow,
	/// Timeout must be a positive duration.
	#[error("Timeout must be greater than zero.")]
	ZeroTimeout,
	/// Status code is outside the valid HTTP range.
	#[error("Status code {code} is invalid.")]
	InvalidStatus {
		/// Rejected status code.
		code: u16,
	},
	/// Configuration document could not be parsed.
	#[error("Configuration is invalid at `{path}`.", path = .source.path())]
	InvalidDocument {
		/// Structured parsing failure, including the path that failed.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	pub(crate) fn header_name(name: &str, source: ::http::header::InvalidHeaderName) -> Self {
		Self::InvalidHeaderName { name: name.to_owned(), source }
	}

	pub(crate) fn header_value(name: &str, source: ::http::header::InvalidHeaderValue) -> Self {
		Self::InvalidHeaderValue { name: name.to_owned(), source }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for TransportError {
	fn from(e: reqwest::Error) -> Self {
		Self::network(e)
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for Error {
	fn from(e: reqwest::Error) -> Self {
		TransportError::from(e).into()
	}
}

/// Body marshal/unmarshal failures.
#[derive(Debug, ThisError)]
pub enum EncodingError {
	/// Request body could not be marshalled.
	#[error("Could not marshal request body.")]
	Marshal {
		/// Marshaller failure.
		#[source]
		source: BoxError,
	},
	/// Response body is not valid JSON for the target type.
	#[error("Response body is not valid JSON for the target type at `{path}`.", path = .source.path())]
	Json {
		/// Structured parsing failure, including the path that failed.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Custom decoder rejected the response body.
	#[error("Could not decode response body.")]
	Decode {
		/// Decoder failure.
		#[source]
		source: BoxError,
	},
}
impl EncodingError {
	/// Wraps a marshaller failure.
	pub fn marshal(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Marshal { source: Box::new(src) }
	}

	/// Wraps a decoder failure.
	pub fn decode(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Decode { source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::io;
	// self
	use super::*;

	fn close_failure() -> Error {
		Error::BodyClose { source: io::Error::other("close body error") }
	}

	#[test]
	fn body_close_matches_specific_and_general_checks() {
		let err = close_failure();

		assert!(matches!(err, Error::BodyClose { .. }));
		assert!(err.has_kind(ErrorKind::BodyClose));
		assert!(!err.has_kind(ErrorKind::Encoding));
		assert!(err.to_string().contains("close body error"));
	}

	#[test]
	fn body_close_cause_requires_chain_walk() {
		let err = close_failure();
		let as_dyn: &(dyn StdError + 'static) = &err;

		assert!(as_dyn.downcast_ref::<io::Error>().is_none());

		let cause = err.find_source::<io::Error>().expect("Close failure should expose its cause.");

		assert_eq!(cause.to_string(), "close body error");
	}

	#[test]
	fn has_kind_descends_into_initialization_failures() {
		let err = Error::InitializationFailed(Arc::new(close_failure()));

		assert_eq!(err.kind(), ErrorKind::InitializationFailed);
		assert!(err.has_kind(ErrorKind::InitializationFailed));
		assert!(err.has_kind(ErrorKind::BodyClose));
		assert!(err.find_source::<io::Error>().is_some());
	}

	#[test]
	fn cancellation_helper_covers_both_signals() {
		assert!(Error::Canceled.is_cancellation());
		assert!(Error::DeadlineExceeded.is_cancellation());
		assert!(Error::InitializationFailed(Arc::new(Error::Canceled)).is_cancellation());
		assert!(!Error::MissingBody.is_cancellation());
	}

	#[test]
	fn transport_error_keeps_network_source() {
		let err: Error = TransportError::network(io::Error::other("connection reset")).into();
		let source = StdError::source(&err).expect("Transport error should expose its source.");

		assert!(matches!(err, Error::Transport(TransportError::Network { .. })));
		assert_eq!(source.to_string(), "connection reset");
	}
}
