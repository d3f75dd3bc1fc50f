//! API client: construction, authentication modes, and the call path.
//!
//! A [`Client`] is built once through [`ClientBuilder`]. Explicit builder arguments win
//! over the [`ConfigResolver`]; the resolver is consulted once, at [`ClientBuilder::build`].
//! After that the only mutable pieces are the consumer key (updated by a credential
//! request) and the cached server time delta (written once).

// std
use std::path::PathBuf;
// crates.io
use async_lock::OnceCell;
use reqwest::{
	Method, Response, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	config::{ConfigResolver, ConfigSources},
	endpoint::Endpoint,
	error::{ApiError, ConfigError, DecodeError, TransportError},
	http::{ReqwestHttpClient, Timeout},
	oauth::OAuth2Session,
	obs::{self, CallKind},
	params::Params,
	rules::{AccessRule, ConsumerKeyRequest, ConsumerKeyValidation},
	secret::Secret,
	sign::{RequestSigner, header, header_value},
};

/// Path of the unauthenticated server clock.
const TIME_PATH: &str = "/auth/time";
/// Path of the consumer key issuance endpoint.
const CREDENTIAL_PATH: &str = "/auth/credential";

/// Handle to the API of one endpoint.
pub struct Client {
	endpoint: Endpoint,
	http: ReqwestHttpClient,
	auth: AuthMode,
	time_delta: OnceCell<i64>,
}
impl Client {
	/// Starts building a client.
	pub fn builder() -> ClientBuilder {
		ClientBuilder::default()
	}

	/// Builds a client entirely from the environment and the default configuration files.
	pub fn from_env() -> Result<Self> {
		Self::builder().build()
	}

	/// Endpoint every call is sent to.
	pub fn endpoint(&self) -> &Endpoint {
		&self.endpoint
	}

	/// Application key, in application-key mode.
	pub fn application_key(&self) -> Option<&str> {
		match &self.auth {
			AuthMode::Signature(credentials) => Some(&credentials.application_key),
			AuthMode::OAuth2(_) => None,
		}
	}

	/// Current consumer key, in application-key mode.
	pub fn consumer_key(&self) -> Option<Secret> {
		match &self.auth {
			AuthMode::Signature(credentials) => credentials.consumer_key.read().clone(),
			AuthMode::OAuth2(_) => None,
		}
	}

	/// Replaces the consumer key used to sign later calls.
	pub fn set_consumer_key(&self, consumer_key: impl Into<String>) -> Result<()> {
		match &self.auth {
			AuthMode::Signature(credentials) => {
				*credentials.consumer_key.write() = Some(Secret::new(consumer_key));

				Ok(())
			},
			AuthMode::OAuth2(_) => Err(ConfigError::ConsumerKeyWithOAuth2.into()),
		}
	}

	/// OAuth2 session, in OAuth2 mode.
	pub fn oauth2_session(&self) -> Option<&OAuth2Session> {
		match &self.auth {
			AuthMode::OAuth2(session) => Some(session),
			AuthMode::Signature(_) => None,
		}
	}

	/// Offset in seconds between the server clock and the local clock.
	///
	/// Fetched from the unauthenticated time endpoint on first use, then cached for the
	/// lifetime of the client.
	pub async fn time_delta(&self) -> Result<i64> {
		self.time_delta
			.get_or_try_init(|| async {
				let server_time = self.server_time().await?;

				Ok::<_, Error>(server_time - OffsetDateTime::now_utc().unix_timestamp())
			})
			.await
			.copied()
	}

	/// Starts a consumer key request bound to this client.
	pub fn new_consumer_key_request(&self) -> ConsumerKeyRequest<'_> {
		ConsumerKeyRequest::new(self)
	}

	/// Requests a new consumer key granting `rules`.
	///
	/// Only the application key is needed. The returned key is loaded into the client
	/// right away but stays unusable until the end user visits the validation URL.
	pub async fn request_consumer_key(
		&self,
		rules: &[AccessRule],
		redirect_url: Option<&str>,
		allowed_ips: Option<&[String]>,
	) -> Result<ConsumerKeyValidation> {
		let AuthMode::Signature(credentials) = &self.auth else {
			return Err(ConfigError::ConsumerKeyWithOAuth2.into());
		};
		let access_rules = serde_json::to_value(rules).map_err(ConfigError::InvalidPayload)?;
		let mut params =
			Params::new().with("accessRules", access_rules).with("redirection", redirect_url);

		if let Some(ranges) = allowed_ips {
			params.insert("allowedIPs", ranges.to_vec());
		}

		let payload = self.post(CREDENTIAL_PATH, &params, false).await?;
		let validation = serde_path_to_error::deserialize::<_, ConsumerKeyValidation>(&payload)
			.map_err(Error::invalid_response)?;

		*credentials.consumer_key.write() = Some(Secret::new(validation.consumer_key.clone()));

		Ok(validation)
	}

	/// `GET path`, with `params` in the query string.
	pub async fn get(&self, path: &str, params: &Params, need_auth: bool) -> Result<Value> {
		self.call(Method::GET, &params.append_to(path), None, need_auth).await
	}

	/// `GET path` addressing several resources at once; ids in `path` are joined by
	/// `separator`, which is announced in the `X-Ovh-Batch` header.
	pub async fn get_batch(
		&self,
		path: &str,
		separator: &str,
		params: &Params,
		need_auth: bool,
	) -> Result<Value> {
		self.call_with_batch(Method::GET, &params.append_to(path), None, need_auth, Some(separator))
			.await
	}

	/// `DELETE path`, with `params` in the query string.
	pub async fn delete(&self, path: &str, params: &Params, need_auth: bool) -> Result<Value> {
		self.call(Method::DELETE, &params.append_to(path), None, need_auth).await
	}

	/// `POST path`, with `params` as JSON body.
	pub async fn post(&self, path: &str, params: &Params, need_auth: bool) -> Result<Value> {
		self.call(Method::POST, path, params.to_body().as_ref(), need_auth).await
	}

	/// `PUT path`, with `params` as JSON body.
	pub async fn put(&self, path: &str, params: &Params, need_auth: bool) -> Result<Value> {
		self.call(Method::PUT, path, params.to_body().as_ref(), need_auth).await
	}

	/// Sends one call and decodes its JSON answer.
	///
	/// `204 No Content` yields [`Value::Null`]. Non-2xx answers are mapped to
	/// [`ApiError`]; undecodable bodies to [`Error::InvalidResponse`].
	pub async fn call(
		&self,
		method: Method,
		path: &str,
		data: Option<&Value>,
		need_auth: bool,
	) -> Result<Value> {
		self.call_with_batch(method, path, data, need_auth, None).await
	}

	/// Sends one call and returns the undecoded response, whatever its status.
	pub async fn raw_call(
		&self,
		method: Method,
		path: &str,
		data: Option<&Value>,
		need_auth: bool,
		batch: Option<&str>,
	) -> Result<Response> {
		obs::observe(
			self.call_kind(need_auth),
			method.as_str(),
			self.dispatch(&method, path, data, need_auth, batch),
		)
		.await
	}

	async fn call_with_batch(
		&self,
		method: Method,
		path: &str,
		data: Option<&Value>,
		need_auth: bool,
		batch: Option<&str>,
	) -> Result<Value> {
		obs::observe(self.call_kind(need_auth), method.as_str(), async {
			let response = self.dispatch(&method, path, data, need_auth, batch).await?;

			decode(response).await
		})
		.await
	}

	fn call_kind(&self, need_auth: bool) -> CallKind {
		match (&self.auth, need_auth) {
			(AuthMode::OAuth2(_), _) => CallKind::Bearer,
			(AuthMode::Signature(_), true) => CallKind::Signed,
			(AuthMode::Signature(_), false) => CallKind::Unsigned,
		}
	}

	async fn dispatch(
		&self,
		method: &Method,
		path: &str,
		data: Option<&Value>,
		need_auth: bool,
		batch: Option<&str>,
	) -> Result<Response> {
		let url = self.target(path)?;
		let body = data.map(Value::to_string);
		let mut headers = HeaderMap::new();

		if body.is_some() {
			headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		}
		if let Some(separator) = batch {
			headers.insert(header::BATCH, header_value(&header::BATCH, separator)?);
		}

		match &self.auth {
			AuthMode::OAuth2(session) => {
				let token = session.access_token().await?;

				headers.insert(
					AUTHORIZATION,
					header_value(&AUTHORIZATION, &format!("Bearer {}", token.expose()))?,
				);
			},
			AuthMode::Signature(credentials) => {
				credentials.identify(&mut headers)?;

				if need_auth {
					let signer = credentials.signer()?;
					let timestamp =
						OffsetDateTime::now_utc().unix_timestamp() + self.time_delta().await?;

					signer
						.sign(method.as_str(), url.as_str(), body.as_deref().unwrap_or_default(), timestamp)
						.apply(&mut headers)?;
				}
			},
		}

		self.execute(method, url, headers, body).await
	}

	// Never signed: signing depends on the time delta this call computes.
	async fn server_time(&self) -> Result<i64> {
		obs::observe(CallKind::Unsigned, Method::GET.as_str(), async {
			let url = self.target(TIME_PATH)?;
			let mut headers = HeaderMap::new();

			if let AuthMode::Signature(credentials) = &self.auth {
				credentials.identify(&mut headers)?;
			}

			let payload = decode(self.execute(&Method::GET, url, headers, None).await?).await?;

			serde_path_to_error::deserialize::<_, i64>(&payload).map_err(Error::invalid_response)
		})
		.await
	}

	async fn execute(
		&self,
		method: &Method,
		url: Url,
		headers: HeaderMap,
		body: Option<String>,
	) -> Result<Response> {
		let mut request = self.http.request(method.clone(), url).headers(headers);

		if let Some(body) = body {
			request = request.body(body);
		}

		request.send().await.map_err(|e| TransportError::from(e).into())
	}

	fn target(&self, path: &str) -> Result<Url> {
		let target = self.endpoint.target_url(path);

		Url::parse(&target).map_err(|source| ConfigError::InvalidUrl { url: target, source }.into())
	}
}
impl Debug for Client {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("endpoint", &self.endpoint)
			.field("auth", &self.auth)
			.field("time_delta", &self.time_delta.get())
			.finish()
	}
}

enum AuthMode {
	Signature(ApplicationCredentials),
	OAuth2(OAuth2Session),
}
impl Debug for AuthMode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Signature(credentials) => f
				.debug_struct("Signature")
				.field("application_key", &credentials.application_key)
				.finish_non_exhaustive(),
			Self::OAuth2(session) => f.debug_tuple("OAuth2").field(session).finish(),
		}
	}
}

struct ApplicationCredentials {
	application_key: String,
	application_secret: Option<Secret>,
	consumer_key: RwLock<Option<Secret>>,
}
impl ApplicationCredentials {
	fn identify(&self, headers: &mut HeaderMap) -> Result<(), ConfigError> {
		headers.insert(header::APPLICATION, header_value(&header::APPLICATION, &self.application_key)?);

		Ok(())
	}

	fn signer(&self) -> Result<RequestSigner> {
		let application_secret = self
			.application_secret
			.clone()
			.ok_or(Error::InvalidKey { reason: "no application secret is configured" })?;
		let consumer_key = self
			.consumer_key
			.read()
			.clone()
			.ok_or(Error::InvalidKey { reason: "no consumer key is configured" })?;

		Ok(RequestSigner::new(application_secret, consumer_key))
	}
}

async fn decode(response: Response) -> Result<Value> {
	let status = response.status();
	let query_id = response
		.headers()
		.get(header::QUERY_ID)
		.and_then(|value| value.to_str().ok())
		.map(ToOwned::to_owned);

	if status == StatusCode::NO_CONTENT {
		return Ok(Value::Null);
	}

	let bytes = response.bytes().await.map_err(TransportError::from)?;
	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
	let payload = serde_path_to_error::deserialize::<_, Value>(&mut deserializer)
		.map_err(DecodeError::from)
		.and_then(|payload| deserializer.end().map(|()| payload).map_err(DecodeError::TrailingData))
		.map_err(|source| Error::InvalidResponse {
			source,
			status: Some(status.as_u16()),
			query_id: query_id.clone(),
		})?;

	if status.is_informational() || status.is_success() {
		Ok(payload)
	} else {
		Err(ApiError::from_body(status.as_u16(), &payload, query_id).into())
	}
}

enum EndpointChoice {
	Named(String),
	Custom(Endpoint),
}

/// Builder for [`Client`].
///
/// Every credential left unset is looked up through the resolver in the section named
/// after the endpoint. Empty values count as unset.
#[derive(Default)]
pub struct ClientBuilder {
	endpoint: Option<EndpointChoice>,
	application_key: Option<String>,
	application_secret: Option<String>,
	consumer_key: Option<String>,
	client_id: Option<String>,
	client_secret: Option<String>,
	config_file: Option<PathBuf>,
	resolver: Option<ConfigResolver>,
	timeout: Timeout,
	http_client: Option<ReqwestClient>,
}
impl ClientBuilder {
	/// Selects an endpoint from the compiled-in table.
	pub fn endpoint(mut self, name: impl Into<String>) -> Self {
		self.endpoint = Some(EndpointChoice::Named(name.into()));

		self
	}

	/// Uses an endpoint outside the compiled-in table.
	pub fn custom_endpoint(mut self, endpoint: Endpoint) -> Self {
		self.endpoint = Some(EndpointChoice::Custom(endpoint));

		self
	}

	/// Sets the application key.
	pub fn application_key(mut self, value: impl Into<String>) -> Self {
		self.application_key = Some(value.into());

		self
	}

	/// Sets the application secret.
	pub fn application_secret(mut self, value: impl Into<String>) -> Self {
		self.application_secret = Some(value.into());

		self
	}

	/// Sets the consumer key.
	pub fn consumer_key(mut self, value: impl Into<String>) -> Self {
		self.consumer_key = Some(value.into());

		self
	}

	/// Sets the OAuth2 client id.
	pub fn client_id(mut self, value: impl Into<String>) -> Self {
		self.client_id = Some(value.into());

		self
	}

	/// Sets the OAuth2 client secret.
	pub fn client_secret(mut self, value: impl Into<String>) -> Self {
		self.client_secret = Some(value.into());

		self
	}

	/// Reads configuration from this file only, instead of the default search path.
	pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
		self.config_file = Some(path.into());

		self
	}

	/// Uses a prepared resolver; takes precedence over [`ClientBuilder::config_file`].
	pub fn resolver(mut self, resolver: ConfigResolver) -> Self {
		self.resolver = Some(resolver);

		self
	}

	/// Overrides the connect/read timeouts (180 seconds each by default).
	pub fn timeout(mut self, timeout: Timeout) -> Self {
		self.timeout = timeout;

		self
	}

	/// Uses a pre-built reqwest client; [`ClientBuilder::timeout`] is then ignored.
	pub fn http_client(mut self, client: ReqwestClient) -> Self {
		self.http_client = Some(client);

		self
	}

	/// Resolves configuration, validates the credential set, and builds the client.
	pub fn build(self) -> Result<Client> {
		let resolver = match self.resolver {
			Some(resolver) => resolver,
			None => ConfigResolver::load(
				&self.config_file.map(ConfigSources::File).unwrap_or_default(),
			)?,
		};
		let endpoint = match self.endpoint {
			Some(EndpointChoice::Custom(endpoint)) => endpoint,
			Some(EndpointChoice::Named(name)) => Endpoint::named(&name)?,
			None => Endpoint::named(
				&non_empty(resolver.get("default", "endpoint")).ok_or(ConfigError::MissingEndpoint)?,
			)?,
		};
		let lookup = |explicit: Option<String>, name: &str| {
			non_empty(explicit).or_else(|| non_empty(resolver.get(endpoint.name(), name)))
		};
		let application_key = lookup(self.application_key, "application_key");
		let application_secret = lookup(self.application_secret, "application_secret");
		let consumer_key = lookup(self.consumer_key, "consumer_key");
		let client_id = lookup(self.client_id, "client_id");
		let client_secret = lookup(self.client_secret, "client_secret");
		let http = match self.http_client {
			Some(client) => ReqwestHttpClient::with_client(client),
			None => ReqwestHttpClient::with_timeouts(self.timeout)?,
		};
		let application_mode =
			application_key.is_some() || application_secret.is_some() || consumer_key.is_some();
		let auth = match (client_id, client_secret) {
			(Some(_), None) | (None, Some(_)) => return Err(ConfigError::IncompleteOAuth2Pair.into()),
			(Some(_), Some(_)) if application_mode =>
				return Err(ConfigError::ConflictingAuthModes.into()),
			(Some(client_id), Some(client_secret)) => {
				let token_url = endpoint.token_url().ok_or_else(|| {
					ConfigError::OAuth2UnsupportedEndpoint { endpoint: endpoint.name().into() }
				})?;

				AuthMode::OAuth2(OAuth2Session::new(
					client_id,
					Secret::new(client_secret),
					token_url,
					http.clone(),
				))
			},
			(None, None) => match application_key {
				Some(application_key) => AuthMode::Signature(ApplicationCredentials {
					application_key,
					application_secret: application_secret.map(Secret::new),
					consumer_key: RwLock::new(consumer_key.map(Secret::new)),
				}),
				None if application_secret.is_some() =>
					return Err(ConfigError::IncompleteApplicationPair.into()),
				None => return Err(ConfigError::MissingCredentials.into()),
			},
		};

		Ok(Client { endpoint, http, auth, time_delta: OnceCell::new() })
	}
}
impl Debug for ClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let endpoint = self.endpoint.as_ref().map(|choice| match choice {
			EndpointChoice::Named(name) => name.as_str(),
			EndpointChoice::Custom(endpoint) => endpoint.name(),
		});

		f.debug_struct("ClientBuilder")
			.field("endpoint", &endpoint)
			.field("application_key", &self.application_key)
			.field("application_secret", &self.application_secret.as_ref().map(|_| "<redacted>"))
			.field("consumer_key", &self.consumer_key.as_ref().map(|_| "<redacted>"))
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
			.field("config_file", &self.config_file)
			.field("resolver", &self.resolver)
			.field("timeout", &self.timeout)
			.finish_non_exhaustive()
	}
}

fn non_empty(value: Option<String>) -> Option<String> {
	value.filter(|value| !value.is_empty())
}
