// std
use std::sync::Arc;
// crates.io
use http::{Method, StatusCode};
use httpmock::prelude::*;
// self
use http_decorators::{
	auth::{self, AuthToken},
	client::{Client, ReqwestTransport, SharedClient},
	decorator,
	error::ErrorKind,
	http::Request,
	init::FlightPhase,
	url::Url,
};

const BASIC_TOM: &str = "Basic dG9tOnBhc3N3b3JkMQ==";
const TOKEN: &str = "YOU'RE SPECIAL";

fn url(server: &MockServer, path: &str) -> Url {
	Url::parse(&server.url(path)).expect("Mock server URL should parse.")
}

fn authenticated(server: &MockServer) -> Arc<AuthToken> {
	let transport: SharedClient = Arc::new(ReqwestTransport::default());

	Arc::new(AuthToken::new(
		transport,
		auth::basic_auth_login(Method::GET, url(server, "/login"), "tom", "password1"),
		auth::header_credential("TOKEN").expect("Header name should be valid."),
	))
}

#[tokio::test]
async fn concurrent_requests_log_in_once() {
	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(GET).path("/login").header("authorization", BASIC_TOM);
			then.status(200).header("TOKEN", TOKEN);
		})
		.await;
	let bar = server
		.mock_async(|when, then| {
			when.method(GET).path("/bar").header("token", TOKEN);
			then.status(200).body("{\"bar\":\"tiki\"}");
		})
		.await;
	let client = authenticated(&server);
	let shared: SharedClient = client.clone();
	let guarded = decorator::require_status(shared, [StatusCode::OK]);
	let mut tasks = tokio::task::JoinSet::new();

	for _ in 0..8 {
		let guarded = guarded.clone();
		let request = Request::new(Method::GET, url(&server, "/bar"));

		tasks.spawn(async move { guarded.send(Some(request)).await });
	}

	while let Some(joined) = tasks.join_next().await {
		joined.expect("Task should not panic.").expect("Authenticated request should succeed.");
	}

	login.assert_calls_async(1).await;
	bar.assert_calls_async(8).await;

	assert_eq!(client.phase(), FlightPhase::Ready);
	assert_eq!(client.credential().expect("Credential should be cached.").expose(), TOKEN);
}

#[tokio::test]
async fn failed_login_is_retried_by_the_next_request() {
	let server = MockServer::start_async().await;
	let mut failing = server
		.mock_async(|when, then| {
			when.method(GET).path("/login");
			then.status(503);
		})
		.await;
	let client = authenticated(&server);
	let err = client
		.send(Some(Request::new(Method::GET, url(&server, "/bar"))))
		.await
		.expect_err("Login outage should fail the request.");

	assert!(err.has_kind(ErrorKind::InitializationFailed));
	assert!(err.has_kind(ErrorKind::UnexpectedStatus));
	assert_eq!(client.phase(), FlightPhase::Failed);

	failing.assert_calls_async(1).await;
	failing.delete_async().await;

	let login = server
		.mock_async(|when, then| {
			when.method(GET).path("/login").header("authorization", BASIC_TOM);
			then.status(200).header("TOKEN", TOKEN);
		})
		.await;
	let bar = server
		.mock_async(|when, then| {
			when.method(GET).path("/bar").header("token", TOKEN);
			then.status(200).body("{\"bar\":\"tiki\"}");
		})
		.await;

	client
		.send(Some(Request::new(Method::GET, url(&server, "/bar"))))
		.await
		.expect("Second attempt should log in.");

	login.assert_calls_async(1).await;
	bar.assert_calls_async(1).await;
}

#[tokio::test]
async fn token_is_never_refreshed_after_success() {
	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(GET).path("/login");
			then.status(200).header("TOKEN", TOKEN);
		})
		.await;
	let _forbidden = server
		.mock_async(|when, then| {
			when.method(GET).path("/bar");
			then.status(403);
		})
		.await;
	let shared: SharedClient = authenticated(&server);
	let client = decorator::require_status(shared, [StatusCode::OK]);

	for _ in 0..3 {
		let err = client
			.send(Some(Request::new(Method::GET, url(&server, "/bar"))))
			.await
			.expect_err("Server keeps rejecting the token.");

		assert!(err.has_kind(ErrorKind::UnexpectedStatus));
	}

	login.assert_calls_async(1).await;
}
