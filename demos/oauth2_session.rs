//! Demonstrates the OAuth2 client-credentials mode: the bearer token is fetched on the first
//! call and reused afterwards.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use ovh_client::{Client, ConfigResolver, EnvSource, Params, endpoint::Endpoint};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/oauth2/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-bearer\",\"token_type\":\"Bearer\",\"expires_in\":3600,\"scope\":\"all\"}",
			);
		})
		.await;
	let services_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/services").header("authorization", "Bearer demo-bearer");
			then.status(200).header("content-type", "application/json").body("[1, 2, 3]");
		})
		.await;
	let endpoint = Endpoint::custom(
		"demo",
		server.url("/1.0"),
		Some(server.url("/auth/oauth2/token").as_str()),
	)?;
	let client = Client::builder()
		.resolver(ConfigResolver::default().with_env(EnvSource::Disabled))
		.custom_endpoint(endpoint)
		.client_id("demo-client")
		.client_secret("demo-secret")
		.build()?;

	for _ in 0..2 {
		let services = client.get("/v1/services", &Params::new(), true).await?;

		println!("Services: {services}.");
	}

	token_mock.assert_async().await;
	services_mock.assert_calls_async(2).await;

	Ok(())
}
