//! Credential acquisition and injection.
//!
//! [`AuthToken`] runs a login sub-request the first time a request passes through it,
//! extracts a [`Credential`] from the login response, and attaches that credential to every
//! request afterwards. Acquisition is single-flight: concurrent callers share one login
//! attempt. A failed login leaves the gate open so the next caller logs in again; a
//! successful one is cached for the lifetime of the decorator and never refreshed, even if
//! the server later rejects it.

pub mod credential;

pub use credential::Credential;

// self
use crate::{
	_prelude::*,
	client::{self, Client, ClientFuture, SharedClient},
	decorator,
	error::ConfigError,
	http::{Request, Response},
	init::{FlightPhase, SingleFlight},
	obs::GateKind,
};

/// Builds the login sub-request; called once per acquisition attempt.
pub trait LoginRequest
where
	Self: Send + Sync,
{
	/// Creates a fresh login request.
	fn build(&self) -> Result<Request>;
}
impl<F> LoginRequest for F
where
	F: Send + Sync + Fn() -> Result<Request>,
{
	fn build(&self) -> Result<Request> {
		self()
	}
}

/// Reads the credential out of a successful login response.
pub trait CredentialExtractor
where
	Self: Send + Sync,
{
	/// Extracts the credential.
	fn extract(&self, response: &Response) -> Result<Credential>;
}
impl<F> CredentialExtractor for F
where
	F: Send + Sync + Fn(&Response) -> Result<Credential>,
{
	fn extract(&self, response: &Response) -> Result<Credential> {
		self(response)
	}
}

/// Wraps `client` so every request carries a credential obtained from one login call.
pub fn set_auth_token(
	client: impl Into<Option<SharedClient>>,
	login: impl 'static + LoginRequest,
	extractor: impl 'static + CredentialExtractor,
) -> SharedClient {
	Arc::new(AuthToken::new(client, login, extractor))
}

/// Login request builder that authenticates with HTTP basic credentials.
pub fn basic_auth_login(
	method: Method,
	url: Url,
	user: impl Into<String>,
	password: impl Into<String>,
) -> impl 'static + LoginRequest {
	let user = user.into();
	let password = password.into();

	move || Request::new(method.clone(), url.clone()).basic_auth(&user, &password)
}

/// Extractor that copies the login response's `name` header into a credential sent under
/// the same header.
pub fn header_credential(name: &str) -> Result<impl 'static + CredentialExtractor> {
	let header = HeaderName::try_from(name).map_err(|e| ConfigError::header_name(name, e))?;

	Ok(move |response: &Response| match response.headers.get(&header) {
		Some(value) => Ok(Credential::from_parts(header.clone(), value.clone())),
		None => Err(Error::MissingCredential { header: header.to_string() }),
	})
}

/// Decorator that injects a lazily acquired credential into every request.
pub struct AuthToken {
	inner: SharedClient,
	login_client: SharedClient,
	login: Box<dyn LoginRequest>,
	extractor: Box<dyn CredentialExtractor>,
	gate: SingleFlight<Credential>,
}
impl AuthToken {
	/// Builds the decorator.
	///
	/// The login sub-request goes through the wrapped client and must answer `200 OK`; use
	/// [`AuthToken::with_login_client`] to send it elsewhere.
	pub fn new(
		client: impl Into<Option<SharedClient>>,
		login: impl 'static + LoginRequest,
		extractor: impl 'static + CredentialExtractor,
	) -> Self {
		let inner = client::or_default(client);
		let login_client = decorator::require_status(inner.clone(), [StatusCode::OK]);

		Self {
			inner,
			login_client,
			login: Box::new(login),
			extractor: Box::new(extractor),
			gate: SingleFlight::new(GateKind::AuthToken),
		}
	}

	/// Sends login sub-requests through `client` instead of the wrapped client.
	pub fn with_login_client(mut self, client: SharedClient) -> Self {
		self.login_client = client;

		self
	}

	/// Returns the cached credential once a login succeeded.
	pub fn credential(&self) -> Option<Credential> {
		self.gate.get()
	}

	/// Current phase of the acquisition gate.
	pub fn phase(&self) -> FlightPhase {
		self.gate.phase()
	}

	async fn acquire(&self) -> Result<Credential> {
		let request = self.login.build()?;
		let response = self.login_client.send(Some(request)).await?;

		self.extractor.extract(&response)
	}
}
impl Client for AuthToken {
	fn send(&self, request: Option<Request>) -> ClientFuture<'_> {
		Box::pin(async move {
			let mut request = request.ok_or_else(Error::missing_request)?;
			let credential = self.gate.get_or_try_init(request.signal(), || self.acquire()).await?;

			credential.apply(&mut request.headers);
			self.inner.send(Some(request)).await
		})
	}
}
impl Debug for AuthToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthToken")
			.field("phase", &self.phase())
			.field("credential", &self.credential())
			.finish()
	}
}
