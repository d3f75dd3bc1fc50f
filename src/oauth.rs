//! OAuth2 client-credentials session used instead of request signing.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
	obs::{self, CallKind},
	secret::Secret,
};

/// Scope requested for every token.
pub const SCOPE: &str = "all";

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Bearer token cached by an [`OAuth2Session`].
#[derive(Clone, Debug)]
pub struct BearerToken {
	access_token: Secret,
	expires_at: Option<OffsetDateTime>,
}
impl BearerToken {
	/// Creates a token; `expires_at = None` never expires locally.
	pub fn new(access_token: Secret, expires_at: Option<OffsetDateTime>) -> Self {
		Self { access_token, expires_at }
	}

	/// Access token value.
	pub fn access_token(&self) -> &Secret {
		&self.access_token
	}

	/// Instant at which the token stops being usable.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.expires_at
	}

	/// Returns true once `now` reaches the expiry instant.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| now >= expires_at)
	}
}

/// Lazily acquired bearer token session for the client-credentials grant.
///
/// The first authenticated call fetches a token; later calls reuse it until it
/// expires, at which point a single new token is fetched before the call proceeds.
pub struct OAuth2Session {
	client_id: String,
	oauth_client: ConfiguredBasicClient,
	http_client: ReqwestHttpClient,
	token: AsyncMutex<Option<BearerToken>>,
}
impl OAuth2Session {
	/// Creates a session against `token_url`, authenticating with HTTP Basic.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: Secret,
		token_url: &Url,
		http_client: ReqwestHttpClient,
	) -> Self {
		let client_id = client_id.into();
		let oauth_client = BasicClient::new(ClientId::new(client_id.clone()))
			.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()))
			.set_token_uri(TokenUrl::from_url(token_url.clone()))
			.set_auth_type(AuthType::BasicAuth);

		Self { client_id, oauth_client, http_client, token: AsyncMutex::new(None) }
	}

	/// Client identifier.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Returns a live access token, fetching a new one when none is cached or the
	/// cached one expired.
	pub async fn access_token(&self) -> Result<Secret> {
		let mut cached = self.token.lock().await;

		if let Some(token) = cached.as_ref().filter(|t| !t.is_expired_at(OffsetDateTime::now_utc()))
		{
			return Ok(token.access_token.clone());
		}

		let token = obs::observe(CallKind::Token, "POST", self.fetch_token()).await?;

		if token.is_expired_at(OffsetDateTime::now_utc()) {
			return Err(Error::OAuth2 { message: "Token endpoint issued an expired token.".into() });
		}

		let access_token = token.access_token.clone();

		*cached = Some(token);

		Ok(access_token)
	}

	/// Drops the cached token so the next call fetches a new one.
	pub async fn invalidate(&self) {
		self.token.lock().await.take();
	}

	async fn fetch_token(&self) -> Result<BearerToken> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let response = self
			.oauth_client
			.exchange_client_credentials()
			.add_scope(Scope::new(SCOPE.into()))
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;
		let issued_at = OffsetDateTime::now_utc();
		let expires_at = response
			.expires_in()
			.and_then(|lifetime| Duration::try_from(lifetime).ok())
			.and_then(|lifetime| issued_at.checked_add(lifetime));

		Ok(BearerToken::new(Secret::new(response.access_token().secret()), expires_at))
	}
}
impl Debug for OAuth2Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2Session").field("client_id", &self.client_id).finish_non_exhaustive()
	}
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	match err {
		RequestTokenError::ServerResponse(response) => {
			let detail = match response.error_description() {
				Some(description) => format!("({}) {description}", response.error().as_ref()),
				None => format!("({})", response.error().as_ref()),
			};

			oauth2_failure(detail, meta)
		},
		RequestTokenError::Request(error) => map_transport_error(error),
		RequestTokenError::Parse(error, _body) => oauth2_failure(error, meta),
		RequestTokenError::Other(message) => oauth2_failure(message, meta),
	}
}

fn map_transport_error(err: HttpClientError<ReqwestError>) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::http_client_build(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => Error::OAuth2 {
			message: format!(
				"HTTP client error occurred while calling the token endpoint: {message}."
			),
		},
		_ => Error::OAuth2 {
			message: "HTTP client error occurred while calling the token endpoint.".into(),
		},
	}
}

// Appends what the token endpoint actually answered, when it answered.
fn oauth2_failure(detail: impl Display, meta: Option<ResponseMetadata>) -> Error {
	let mut message = detail.to_string();

	if let Some(ResponseMetadata { status: Some(status), body }) = meta {
		let body = body.unwrap_or_default();

		match status {
			200..=299 => message.push_str(&format!(" Received invalid body: {body}")),
			400.. => message.push_str(&format!(
				" Token creation failed with status_code={status}, body={body}"
			)),
			_ => {},
		}
	}

	Error::OAuth2 { message }
}
