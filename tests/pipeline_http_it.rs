#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::{OffsetDateTime, macros::datetime};
// self
use bearer_pipeline::{
	Error,
	auth::{TokenKind, TokenSecret},
	codec::iso8601,
	request::ApiRequest,
	store::MemoryStore,
};
use common::*;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
	email: &'a str,
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
	access_token: String,
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Holding {
	symbol: String,
	#[serde(with = "iso8601")]
	updated_at: OffsetDateTime,
}

#[tokio::test]
async fn exempt_paths_carry_only_the_client_key() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/login")
				.header("x-client-token-ios", CLIENT_KEY)
				.header("content-type", "application/json")
				.header_missing("authorization")
				.json_body(json!({ "email": "satoshi@road2crypto.com" }));
			then.status(200).json_body(json!({ "accessToken": "access-new" }));
		})
		.await;
	let (client, _) = mock_server_client(
		&server.base_url(),
		MemoryStore::with_tokens(stale_access_token(), "refresh-1"),
	);
	let response: LoginResponse = client
		.request(
			ApiRequest::post("/auth/login")
				.parameters(&LoginRequest { email: "satoshi@road2crypto.com" }),
		)
		.await
		.expect("Login should not require a token.");

	mock.assert_calls_async(1).await;

	assert_eq!(response.access_token, "access-new");
	assert_eq!(client.refresh_metrics().attempts(), 0);
}

#[tokio::test]
async fn authenticated_requests_decode_fractional_dates() {
	let server = MockServer::start_async().await;
	let access = fresh_access_token();
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/v1/holdings/btc")
				.header("x-client-token-ios", CLIENT_KEY)
				.header("authorization", access.as_str());
			then.status(200).body(r#"{"symbol":"BTC","updatedAt":"2023-10-25T12:30:45.120Z"}"#);
		})
		.await;
	let store = MemoryStore::with_tokens(access.as_str(), "refresh-1");
	let (client, notifier) = mock_server_client(&server.base_url(), store);
	let holding: Holding = client
		.request(ApiRequest::get("/api/v1/holdings/btc"))
		.await
		.expect("Authenticated request should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(holding, Holding {
		symbol: "BTC".into(),
		updated_at: datetime!(2023-10-25 12:30:45.12 UTC)
	});
	assert_eq!(notifier.logouts(), 0);
}

#[tokio::test]
async fn stale_tokens_refresh_over_the_wire() {
	let server = MockServer::start_async().await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/refresh")
				.header("x-client-token-ios", CLIENT_KEY)
				.header_missing("authorization")
				.json_body(json!({ "refreshToken": "refresh-1" }));
			then.status(200).json_body(json!({ "accessToken": "access-2", "expiresIn": 900 }));
		})
		.await;
	let portfolio = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/portfolio").header("authorization", "access-2");
			then.status(200).json_body(json!({ "symbol": "ETH" }));
		})
		.await;
	let store = MemoryStore::with_tokens(stale_access_token(), "refresh-1");
	let (client, notifier) = mock_server_client(&server.base_url(), store.clone());
	let body: serde_json::Value = client
		.request(ApiRequest::get("/api/v1/portfolio"))
		.await
		.expect("Request after refresh should succeed.");

	refresh.assert_calls_async(1).await;
	portfolio.assert_calls_async(1).await;

	assert_eq!(body, json!({ "symbol": "ETH" }));
	assert_eq!(store.peek(TokenKind::Access), Some(TokenSecret::new("access-2")));
	assert_eq!(notifier.logouts(), 0);
}

#[tokio::test]
async fn error_statuses_map_onto_the_taxonomy() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/coins/unknown");
			then.status(404).json_body(json!({ "message": "Coin not found" }));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/coins/maintenance");
			then.status(503);
		})
		.await;

	let (client, notifier) =
		mock_server_client(&server.base_url(), MemoryStore::with_tokens(fresh_access_token(), "r"));
	let not_found = client
		.request::<serde_json::Value>(ApiRequest::get("/api/v1/coins/unknown"))
		.await
		.expect_err("Missing coin should fail.");
	let maintenance = client
		.request::<serde_json::Value>(ApiRequest::get("/api/v1/coins/maintenance"))
		.await
		.expect_err("Maintenance should fail.");

	assert_eq!(not_found, Error::ClientError { status: 404, message: "Coin not found".into() });
	assert_eq!(maintenance, Error::ServerError { status: 503, message: "No message".into() });
	assert_eq!(notifier.logouts(), 0);
}

#[tokio::test]
async fn unauthorized_responses_end_the_session() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/user");
			then.status(401).json_body(json!({ "message": "Token revoked" }));
		})
		.await;
	let (client, notifier) =
		mock_server_client(&server.base_url(), MemoryStore::with_tokens(fresh_access_token(), "r"));
	let err = client
		.request::<serde_json::Value>(ApiRequest::get("/api/v1/user"))
		.await
		.expect_err("Revoked token should fail.");

	mock.assert_calls_async(1).await;

	assert!(err.is_auth_failure());
	assert_eq!(err.message(), "Token revoked");
	assert_eq!(notifier.logouts(), 1);
}

#[tokio::test]
async fn absolute_urls_are_fetched_without_a_token() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/assets/news.json")
				.header("x-client-token-ios", CLIENT_KEY)
				.header("accept-language", "en")
				.header_missing("authorization");
			then.status(200).json_body(json!({ "items": [] }));
		})
		.await;
	let (client, _) =
		mock_server_client(&server.base_url(), MemoryStore::with_tokens(fresh_access_token(), "r"));
	let body: serde_json::Value = client
		.fetch_url(&server.url("/assets/news.json"), [("Accept-Language", "en")])
		.await
		.expect("Absolute URL fetch should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(body, json!({ "items": [] }));
}
