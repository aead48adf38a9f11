//! Composable decorators for outbound HTTP clients: client-side rate limiting, single-flight
//! initialization, and credential injection that stay correct under concurrent callers.
//!
//! Every decorator takes the [`SharedClient`](client::SharedClient) it wraps and returns a
//! new one honoring the same [`Client`](client::Client) contract, so stacks are built by
//! nesting calls. The outermost decorator sees the request first and the response last.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod decorator;
pub mod error;
pub mod http;
pub mod init;
pub mod limit;
pub mod obs;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fake clients for tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use std::sync::atomic::{AtomicUsize, Ordering};

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::{ClientFn, SharedClient},
		http::{Body, Request, Response},
	};

	/// Builds a client that answers every request with `status` and `body` while counting
	/// how many requests reached it.
	pub fn counting_client(status: u16, body: &'static str) -> (SharedClient, Arc<AtomicUsize>) {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let client = ClientFn::shared(move |request: Option<Request>| {
			let counter = counter.clone();

			async move {
				request.ok_or_else(Error::missing_request)?;
				counter.fetch_add(1, Ordering::SeqCst);

				let mut response = Response::new(
					StatusCode::from_u16(status).expect("Test status code should be valid."),
				);

				response.body = Some(Body::from_bytes(body.as_bytes().to_vec()));

				Ok(response)
			}
		});

		(client, calls)
	}

	/// Builds a client that echoes request headers and body back in the response.
	pub fn echo_client() -> SharedClient {
		ClientFn::shared(|request: Option<Request>| async move {
			let request = request.ok_or_else(Error::missing_request)?;
			let mut response = Response::new(StatusCode::OK);

			response.headers = request.headers.clone();
			response.body = Some(Body::from_bytes(request.body.unwrap_or_default()));

			Ok(response)
		})
	}

	/// Parses a URL fixture.
	pub fn test_url(value: &str) -> Url {
		Url::parse(value).expect("Test URL fixture should parse.")
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	pub use ::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
	pub use parking_lot::Mutex;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use tokio::time::Instant;
	pub use tokio_util::sync::CancellationToken;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
