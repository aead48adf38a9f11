//! Credential header wrapper that redacts sensitive material.

// self
use crate::{_prelude::*, error::ConfigError};

/// Header name/value pair attached to every authenticated request.
///
/// The value is marked sensitive and never appears in `Debug` or `Display` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
	name: HeaderName,
	value: HeaderValue,
}
impl Credential {
	/// Builds a credential for `name: value`.
	pub fn new(name: &str, value: &str) -> Result<Self> {
		let header = HeaderName::try_from(name).map_err(|e| ConfigError::header_name(name, e))?;
		let value = HeaderValue::try_from(value).map_err(|e| ConfigError::header_value(name, e))?;

		Ok(Self::from_parts(header, value))
	}

	/// Builds an `Authorization: Bearer <token>` credential.
	pub fn bearer(token: &str) -> Result<Self> {
		Self::new(::http::header::AUTHORIZATION.as_str(), &format!("Bearer {token}"))
	}

	/// Wraps an already validated header pair.
	pub fn from_parts(name: HeaderName, mut value: HeaderValue) -> Self {
		value.set_sensitive(true);

		Self { name, value }
	}

	/// Header the credential is sent in.
	pub fn name(&self) -> &HeaderName {
		&self.name
	}

	/// Returns the raw header value. Callers must avoid logging it.
	pub fn expose(&self) -> &HeaderValue {
		&self.value
	}

	/// Inserts the credential into `headers`, replacing any previous value.
	pub fn apply(&self, headers: &mut HeaderMap) {
		headers.insert(self.name.clone(), self.value.clone());
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("name", &self.name)
			.field("value", &"<redacted>")
			.finish()
	}
}
impl Display for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}: <redacted>", self.name)
	}
}
