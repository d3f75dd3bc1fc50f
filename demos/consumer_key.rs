//! Demonstrates requesting a consumer key with recursive access rules, then signing a call
//! with it, against a mock API server.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use ovh_client::{
	Client, ConfigResolver, EnvSource, Params,
	endpoint::Endpoint,
	rules::{API_READ_ONLY, API_READ_WRITE_SAFE},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let credential_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/1.0/auth/credential");
			then.status(200).header("content-type", "application/json").body(
				"{\"validationUrl\":\"https://eu.api.ovh.com/auth/?credentialToken=demo\",\"consumerKey\":\"demo-consumer-key\",\"state\":\"pendingValidation\"}",
			);
		})
		.await;
	let time_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/1.0/auth/time");
			then.status(200).header("content-type", "application/json").body("1404395931");
		})
		.await;
	let me_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/1.0/me").header("x-ovh-consumer", "demo-consumer-key");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"firstname\":\"Ada\",\"nichandle\":\"ab1234-ovh\"}");
		})
		.await;
	let client = Client::builder()
		.resolver(ConfigResolver::default().with_env(EnvSource::Disabled))
		.custom_endpoint(Endpoint::custom("demo", server.url("/1.0"), None)?)
		.application_key("demo-application-key")
		.application_secret("demo-application-secret")
		.build()?;
	let mut request = client.new_consumer_key_request();

	request.add_rules(API_READ_ONLY, "/me");
	request.add_recursive_rules(API_READ_WRITE_SAFE, "/domain/zone/*");

	let validation = request.request(Some("https://example.com/validated")).await?;

	println!("Grant {} rules at {}.", request.rules().len(), validation.validation_url);

	let me = client.get("/me", &Params::new(), true).await?;

	println!("Hello {}, time delta is {}s.", me["firstname"], client.time_delta().await?);

	credential_mock.assert_async().await;
	time_mock.assert_async().await;
	me_mock.assert_async().await;

	Ok(())
}
