//! Shared helpers for integration tests.

#![allow(dead_code)]

// std
use std::time::{SystemTime, UNIX_EPOCH};
// crates.io
use httpmock::prelude::*;
// self
use ovh_client::{Client, ClientBuilder, ConfigResolver, EnvSource, endpoint::Endpoint};

pub const APPLICATION_KEY: &str = "fake application key";
pub const APPLICATION_SECRET: &str = "fake application secret";
pub const CONSUMER_KEY: &str = "fake consumer key";
pub const CLIENT_ID: &str = "client-id";
pub const CLIENT_SECRET: &str = "client-secret";
pub const TOKEN_PATH: &str = "/auth/oauth2/token";

/// Resolver that sees neither the process environment nor any file.
pub fn isolated_resolver() -> ConfigResolver {
	ConfigResolver::default().with_env(EnvSource::Disabled)
}

/// Endpoint whose API base is `<server>/1.0` and whose token issuer lives on the same server.
pub fn mock_endpoint(server: &MockServer) -> Endpoint {
	Endpoint::custom("mock", server.url("/1.0"), Some(server.url(TOKEN_PATH).as_str()))
		.expect("Mock endpoint should build.")
}

pub fn builder(server: &MockServer) -> ClientBuilder {
	Client::builder().resolver(isolated_resolver()).custom_endpoint(mock_endpoint(server))
}

pub fn signed_client(server: &MockServer) -> Client {
	builder(server)
		.application_key(APPLICATION_KEY)
		.application_secret(APPLICATION_SECRET)
		.consumer_key(CONSUMER_KEY)
		.build()
		.expect("Signed client should build.")
}

pub fn oauth2_client(server: &MockServer) -> Client {
	builder(server)
		.client_id(CLIENT_ID)
		.client_secret(CLIENT_SECRET)
		.build()
		.expect("OAuth2 client should build.")
}

pub fn unix_now() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System clock should be after the epoch.")
		.as_secs() as i64
}

/// Serves `/1.0/auth/time` as `now + offset`; only unsigned requests match.
pub async fn mock_server_time(server: &MockServer, offset: i64) -> httpmock::Mock<'_> {
	let server_time = unix_now() + offset;

	server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/1.0/auth/time")
				.header_exists("x-ovh-application")
				.header_missing("x-ovh-consumer")
				.header_missing("x-ovh-timestamp")
				.header_missing("x-ovh-signature");
			then.status(200).header("content-type", "application/json").body(server_time.to_string());
		})
		.await
}
