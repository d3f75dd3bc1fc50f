mod common;

// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
use sha1::{Digest, Sha1};
// self
use common::*;
use ovh_client::{
	Client, Error, ErrorKind, Params,
	endpoint::Endpoint,
	error::DecodeError,
	reqwest::Method,
	rules::{API_READ_ONLY, API_READ_WRITE},
};

#[tokio::test]
async fn signed_call_sends_application_consumer_and_signature_headers() {
	let server = MockServer::start_async().await;
	let time = mock_server_time(&server, 0).await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/1.0/me")
				.header("x-ovh-application", APPLICATION_KEY)
				.header("x-ovh-consumer", CONSUMER_KEY)
				.header_exists("x-ovh-timestamp")
				.header_exists("x-ovh-signature");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"nichandle\":\"xx1234-ovh\"}");
		})
		.await;
	let client = signed_client(&server);
	let me = client.get("/me", &Params::new(), true).await.expect("Signed call should succeed.");

	assert_eq!(me, json!({ "nichandle": "xx1234-ovh" }));

	mock.assert_async().await;
	time.assert_async().await;
}

#[tokio::test]
async fn signature_covers_sent_url_body_and_timestamp() {
	let server = MockServer::start_async().await;
	let time = mock_server_time(&server, 0).await;
	let base_url = server.base_url();
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/1.0/me/contact")
				.query_param("scope", "test")
				.body("{\"firstName\":\"Ada\"}")
				.is_true(move |req| {
					let header = |name: &str| {
						req.headers_vec()
							.iter()
							.find(|(key, _)| key.eq_ignore_ascii_case(name))
							.map(|(_, value)| value.clone())
							.unwrap_or_default()
					};
					let timestamp = header("x-ovh-timestamp");
					let payload = format!(
						"{APPLICATION_SECRET}+{CONSUMER_KEY}+POST+{base_url}{}+{}+{timestamp}",
						req.uri_str(),
						req.body_string(),
					);
					let expected = format!("$1${}", hex::encode(Sha1::digest(payload.as_bytes())));

					!timestamp.is_empty() && header("x-ovh-signature") == expected
				});
			then.status(200).header("content-type", "application/json").body("{\"id\":1}");
		})
		.await;
	let client = signed_client(&server);
	let contact = client
		.post("/me/contact?scope=test", &Params::new().with("firstName", "Ada"), true)
		.await
		.expect("Signature over the sent request should be accepted.");

	assert_eq!(contact, json!({ "id": 1 }));

	mock.assert_async().await;
	time.assert_async().await;
}

#[tokio::test]
async fn time_delta_is_fetched_once_per_client() {
	let server = MockServer::start_async().await;
	let time = mock_server_time(&server, 3600).await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/1.0/me");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;
	let client = signed_client(&server);
	let delta = client.time_delta().await.expect("Time delta should be fetched.");

	assert!((3599..=3601).contains(&delta), "Unexpected delta {delta}.");

	for _ in 0..2 {
		client.get("/me", &Params::new(), true).await.expect("Signed call should succeed.");
	}

	assert_eq!(client.time_delta().await.expect("Cached delta should be returned."), delta);

	time.assert_calls_async(1).await;
	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn unauthenticated_call_sends_only_application_header() {
	let server = MockServer::start_async().await;
	let time = mock_server_time(&server, 0).await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/1.0/auth/currentCredential")
				.header("x-ovh-application", APPLICATION_KEY)
				.header_missing("x-ovh-consumer")
				.header_missing("x-ovh-signature");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let client = signed_client(&server);
	let value = client
		.get("/auth/currentCredential", &Params::new(), false)
		.await
		.expect("Unauthenticated call should succeed.");

	assert_eq!(value, json!([]));

	mock.assert_async().await;
	time.assert_calls_async(0).await;
}

#[tokio::test]
async fn missing_secret_fails_before_any_request() {
	let server = MockServer::start_async().await;
	let time = mock_server_time(&server, 0).await;
	let mock = server
		.mock_async(|when, then| {
			when.any_request();
			then.status(200).body("{}");
		})
		.await;
	let client = builder(&server)
		.application_key(APPLICATION_KEY)
		.build()
		.expect("Key-only client should build.");
	let err = client
		.get("/me", &Params::new(), true)
		.await
		.expect_err("Signing without a secret must fail.");

	assert_eq!(err.kind(), ErrorKind::InvalidKey);

	time.assert_calls_async(0).await;
	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn no_content_yields_null() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/1.0/me/sshKey/main");
			then.status(204);
		})
		.await;
	let client = signed_client(&server);
	let value = client
		.delete("/me/sshKey/main", &Params::new(), false)
		.await
		.expect("204 must not be decoded.");

	assert_eq!(value, Value::Null);

	mock.assert_async().await;
}

#[tokio::test]
async fn error_statuses_map_to_kinds_and_carry_query_id() {
	let server = MockServer::start_async().await;
	let cases = [
		("/invalid-credential", 403, Some("INVALID_CREDENTIAL"), ErrorKind::InvalidCredential),
		("/forbidden", 403, Some("FORBIDDEN"), ErrorKind::Forbidden),
		("/not-granted", 403, Some("NOT_GRANTED_CALL"), ErrorKind::NotGrantedCall),
		("/not-credential", 403, Some("NOT_CREDENTIAL"), ErrorKind::NotCredential),
		("/invalid-key", 403, Some("INVALID_KEY"), ErrorKind::InvalidKey),
		("/missing", 404, None, ErrorKind::ResourceNotFound),
		("/bad", 400, None, ErrorKind::BadParameters),
		("/conflict", 409, None, ErrorKind::ResourceConflict),
		("/expired", 460, None, ErrorKind::ResourceExpired),
		("/broken", 500, None, ErrorKind::Api),
	];

	for (path, status, code, _) in cases {
		let body = match code {
			Some(code) => json!({ "message": "Nope", "errorCode": code }),
			None => json!({ "message": "Nope" }),
		};

		server
			.mock_async(|when, then| {
				when.path(format!("/1.0{path}"));
				then.status(status)
					.header("content-type", "application/json")
					.header("x-ovh-queryid", "FR.ws-8.5860f657.4632.0180")
					.body(body.to_string());
			})
			.await;
	}

	let client = signed_client(&server);

	for (path, status, _, kind) in cases {
		let err = client
			.get(path, &Params::new(), false)
			.await
			.expect_err("Non-2xx answers must fail.");

		assert_eq!(err.kind(), kind, "Wrong kind for {path}.");
		assert_eq!(err.query_id(), Some("FR.ws-8.5860f657.4632.0180"));

		let Error::Api(api) = err else { panic!("Expected an API error for {path}.") };

		assert_eq!(api.status, status);
		assert_eq!(api.message.as_deref(), Some("Nope"));
		assert_eq!(api.to_string(), "Nope \nOVH-Query-ID: FR.ws-8.5860f657.4632.0180");
	}
}

#[tokio::test]
async fn undecodable_body_is_an_invalid_response() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/1.0/html");
			then.status(200).header("x-ovh-queryid", "FR.test").body("<html>oops</html>");
		})
		.await;

	let client = signed_client(&server);
	let err = client
		.get("/html", &Params::new(), false)
		.await
		.expect_err("Non-JSON answers must fail.");

	assert_eq!(err.kind(), ErrorKind::InvalidResponse);
	assert_eq!(err.query_id(), Some("FR.test"));
	assert!(matches!(err, Error::InvalidResponse { status: Some(200), .. }));
}

#[tokio::test]
async fn trailing_data_after_json_is_an_invalid_response() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/1.0/me");
			then.status(200)
				.header("content-type", "application/json")
				.header("x-ovh-queryid", "FR.trailing")
				.body("{\"a\":1} junk");
		})
		.await;

	let client = signed_client(&server);
	let err = client
		.get("/me", &Params::new(), false)
		.await
		.expect_err("A JSON value followed by junk must fail.");

	assert_eq!(err.kind(), ErrorKind::InvalidResponse);
	assert_eq!(err.query_id(), Some("FR.trailing"));
	assert!(matches!(
		err,
		Error::InvalidResponse { source: DecodeError::TrailingData(_), status: Some(200), .. }
	));
}

#[tokio::test]
async fn versioned_paths_bypass_legacy_prefix() {
	let server = MockServer::start_async().await;
	let versioned = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/call");
			then.status(200).header("content-type", "application/json").body("\"v1\"");
		})
		.await;
	let legacy = server
		.mock_async(|when, then| {
			when.method(GET).path("/1.0/call");
			then.status(200).header("content-type", "application/json").body("\"1.0\"");
		})
		.await;
	let client = signed_client(&server);

	assert_eq!(client.get("/v1/call", &Params::new(), false).await.ok(), Some(json!("v1")));
	assert_eq!(client.get("/call", &Params::new(), false).await.ok(), Some(json!("1.0")));

	versioned.assert_async().await;
	legacy.assert_async().await;
}

#[tokio::test]
async fn query_arguments_and_json_body_are_routed_by_verb() {
	let server = MockServer::start_async().await;
	let query = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/1.0/me/bill")
				.query_param("from", "2024-01-01")
				.query_param("paid", "true")
				.query_param("category", "null");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let body = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/1.0/me/contact")
				.header("content-type", "application/json")
				.body("{\"firstName\":\"Ada\",\"type\":\"personal\"}");
			then.status(200).header("content-type", "application/json").body("{\"id\":1}");
		})
		.await;
	let client = signed_client(&server);
	let params = Params::new().with("_from", "2024-01-01").with("paid", true).with("category", Value::Null);

	client.get("/me/bill", &params, false).await.expect("GET with query should succeed.");

	let params = Params::new().with("firstName", "Ada").with("_type", "personal");
	let created =
		client.post("/me/contact", &params, false).await.expect("POST with body should succeed.");

	assert_eq!(created["id"], 1);

	query.assert_async().await;
	body.assert_async().await;
}

#[tokio::test]
async fn batch_calls_announce_separator() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/1.0/domain/a.com,b.com").header("x-ovh-batch", ",");
			then.status(200).header("content-type", "application/json").body("[{},{}]");
		})
		.await;
	let client = signed_client(&server);
	let value = client
		.get_batch("/domain/a.com,b.com", ",", &Params::new(), false)
		.await
		.expect("Batch call should succeed.");

	assert_eq!(value.as_array().map(Vec::len), Some(2));

	mock.assert_async().await;
}

#[tokio::test]
async fn raw_call_returns_undecoded_response() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(PUT).path("/1.0/me").body("{\"language\":\"fr_FR\"}");
			then.status(409).body("conflict");
		})
		.await;

	let client = signed_client(&server);
	let response = client
		.raw_call(Method::PUT, "/me", Some(&json!({ "language": "fr_FR" })), false, None)
		.await
		.expect("Raw calls do not interpret the status.");

	assert_eq!(response.status().as_u16(), 409);
	assert_eq!(response.text().await.expect("Body should be readable."), "conflict");
}

#[tokio::test]
async fn connection_failure_is_a_transport_error() {
	let endpoint =
		Endpoint::custom("closed", "http://127.0.0.1:9/1.0", None).expect("Endpoint should build.");
	let client = Client::builder()
		.resolver(isolated_resolver())
		.custom_endpoint(endpoint)
		.application_key(APPLICATION_KEY)
		.build()
		.expect("Client should build.");
	let err = client
		.get("/me", &Params::new(), false)
		.await
		.expect_err("Nothing listens on the discard port.");

	assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn consumer_key_request_posts_rules_and_loads_new_key() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/1.0/auth/credential")
				.header("x-ovh-application", APPLICATION_KEY)
				.header_missing("x-ovh-signature")
				.json_body(json!({
					"accessRules": [
						{ "method": "GET", "path": "/me" },
						{ "method": "GET", "path": "/sms" },
						{ "method": "POST", "path": "/sms" },
						{ "method": "PUT", "path": "/sms" },
						{ "method": "DELETE", "path": "/sms" },
						{ "method": "GET", "path": "/sms/*" },
						{ "method": "POST", "path": "/sms/*" },
						{ "method": "PUT", "path": "/sms/*" },
						{ "method": "DELETE", "path": "/sms/*" }
					],
					"redirection": "https://example.com/done",
					"allowedIPs": ["198.51.100.0/24"]
				}));
			then.status(200).header("content-type", "application/json").body(
				"{\"validationUrl\":\"https://eu.api.ovh.com/auth/?credentialToken=abc\",\"consumerKey\":\"new-ck\",\"state\":\"pendingValidation\"}",
			);
		})
		.await;
	let client = builder(&server)
		.application_key(APPLICATION_KEY)
		.build()
		.expect("Key-only client should build.");
	let mut request = client.new_consumer_key_request();

	request.add_rules(API_READ_ONLY, "/me");
	request.add_recursive_rules(API_READ_WRITE, "/sms/*");
	request.allowed_ips(["198.51.100.0/24"]);

	let validation =
		request.request(Some("https://example.com/done")).await.expect("Request should succeed.");

	assert_eq!(validation.consumer_key, "new-ck");
	assert_eq!(validation.state, "pendingValidation");
	assert_eq!(validation.validation_url, "https://eu.api.ovh.com/auth/?credentialToken=abc");
	assert_eq!(request.rules().len(), 9, "Rules are kept after submission.");
	assert_eq!(client.consumer_key().map(|key| key.expose().to_owned()).as_deref(), Some("new-ck"));

	mock.assert_async().await;
}
