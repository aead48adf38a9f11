//! Minimal cookie pairs for `Cookie` and `Set-Cookie` headers.

// self
use crate::_prelude::*;

/// Name/value cookie pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cookie {
	/// Cookie name.
	pub name: String,
	/// Cookie value; may be empty.
	pub value: String,
}
impl Cookie {
	/// Creates a cookie pair.
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self { name: name.into(), value: value.into() }
	}

	/// Renders the pair as it appears in a `Cookie` header.
	pub fn to_pair(&self) -> String {
		format!("{}={}", self.name, self.value)
	}

	/// Parses the leading `name=value` pair of a `Set-Cookie` header.
	pub fn parse_set_cookie(raw: &str) -> Option<Self> {
		let pair = raw.split(';').next()?.trim();
		let (name, value) = pair.split_once('=')?;
		let name = name.trim();

		if name.is_empty() {
			return None;
		}

		Some(Self::new(name, value.trim().trim_matches('"')))
	}
}
impl Display for Cookie {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}={}", self.name, self.value)
	}
}
