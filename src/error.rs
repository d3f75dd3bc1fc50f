//! Client-level error types shared by configuration, signing, dispatch, and OAuth2 layers.

// std
use std::path::PathBuf;
// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem detected before any request was sent.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The API answered with a body that is not valid JSON (or not the expected shape).
	#[error("Failed to decode API response.")]
	InvalidResponse {
		/// Parsing failure.
		#[source]
		source: DecodeError,
		/// HTTP status code, when the failure came from a response.
		status: Option<u16>,
		/// Query correlation id read from the response, when present.
		query_id: Option<String>,
	},
	/// Signing was required but a secret is missing.
	#[error("Cannot sign the request: {reason}.")]
	InvalidKey {
		/// Which credential is missing.
		reason: &'static str,
	},
	/// Token issuance or refresh failed.
	#[error("OAuth2 failure: {message}")]
	OAuth2 {
		/// Failure detail enriched with the provider's answer when available.
		message: String,
	},
	/// The API answered with a non-2xx status.
	#[error(transparent)]
	Api(#[from] ApiError),
}
impl Error {
	/// Wraps a JSON decoding failure that is not tied to a specific response.
	pub fn invalid_response(source: impl Into<DecodeError>) -> Self {
		Self::InvalidResponse { source: source.into(), status: None, query_id: None }
	}

	/// Flattens the error into the client taxonomy.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Config(ConfigError::UnknownEndpoint { .. }) => ErrorKind::InvalidRegion,
			Self::Config(_) => ErrorKind::InvalidConfiguration,
			Self::Transport(_) => ErrorKind::Transport,
			Self::InvalidResponse { .. } => ErrorKind::InvalidResponse,
			Self::InvalidKey { .. } => ErrorKind::InvalidKey,
			Self::OAuth2 { .. } => ErrorKind::OAuth2Failure,
			Self::Api(e) => e.kind.into(),
		}
	}

	/// Returns the `X-OVH-QUERYID` correlation id for errors that carry a response.
	pub fn query_id(&self) -> Option<&str> {
		match self {
			Self::InvalidResponse { query_id, .. } => query_id.as_deref(),
			Self::Api(e) => e.query_id.as_deref(),
			_ => None,
		}
	}
}

/// Flat view over every failure the client can raise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Network, DNS, or connection failure.
	Transport,
	/// Non-JSON or undecodable response body.
	InvalidResponse,
	/// Unknown endpoint name.
	InvalidRegion,
	/// Contradictory or incomplete configuration.
	InvalidConfiguration,
	/// Missing secret at signing time, or key rejected by the API.
	InvalidKey,
	/// Consumer key rejected by the API.
	InvalidCredential,
	/// Call not covered by the consumer key's access rules.
	NotGrantedCall,
	/// Consumer key not validated.
	NotCredential,
	/// Access forbidden.
	Forbidden,
	/// HTTP 404.
	ResourceNotFound,
	/// HTTP 400.
	BadParameters,
	/// HTTP 409.
	ResourceConflict,
	/// HTTP 460.
	ResourceExpired,
	/// Token issuance or refresh failure.
	OAuth2Failure,
	/// Any other non-2xx status.
	Api,
}

/// Categories of API-side failures, keyed off the status code and the embedded `errorCode`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
	/// 403 `NOT_GRANTED_CALL`.
	NotGrantedCall,
	/// 403 `NOT_CREDENTIAL`.
	NotCredential,
	/// 403 `INVALID_KEY`.
	InvalidKey,
	/// 403 `INVALID_CREDENTIAL`.
	InvalidCredential,
	/// 403 `FORBIDDEN`.
	Forbidden,
	/// 404.
	ResourceNotFound,
	/// 400.
	BadParameters,
	/// 409.
	ResourceConflict,
	/// 460.
	ResourceExpired,
	/// Anything else.
	Other,
}
impl ApiErrorKind {
	/// Classifies a non-2xx answer.
	pub fn classify(status: u16, error_code: Option<&str>) -> Self {
		match (status, error_code) {
			(403, Some("NOT_GRANTED_CALL")) => Self::NotGrantedCall,
			(403, Some("NOT_CREDENTIAL")) => Self::NotCredential,
			(403, Some("INVALID_KEY")) => Self::InvalidKey,
			(403, Some("INVALID_CREDENTIAL")) => Self::InvalidCredential,
			(403, Some("FORBIDDEN")) => Self::Forbidden,
			(404, _) => Self::ResourceNotFound,
			(400, _) => Self::BadParameters,
			(409, _) => Self::ResourceConflict,
			(460, _) => Self::ResourceExpired,
			_ => Self::Other,
		}
	}
}
impl From<ApiErrorKind> for ErrorKind {
	fn from(kind: ApiErrorKind) -> Self {
		match kind {
			ApiErrorKind::NotGrantedCall => Self::NotGrantedCall,
			ApiErrorKind::NotCredential => Self::NotCredential,
			ApiErrorKind::InvalidKey => Self::InvalidKey,
			ApiErrorKind::InvalidCredential => Self::InvalidCredential,
			ApiErrorKind::Forbidden => Self::Forbidden,
			ApiErrorKind::ResourceNotFound => Self::ResourceNotFound,
			ApiErrorKind::BadParameters => Self::BadParameters,
			ApiErrorKind::ResourceConflict => Self::ResourceConflict,
			ApiErrorKind::ResourceExpired => Self::ResourceExpired,
			ApiErrorKind::Other => Self::Api,
		}
	}
}

/// Failure reported by the API itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiError {
	/// Classified failure category.
	pub kind: ApiErrorKind,
	/// HTTP status code.
	pub status: u16,
	/// The body's `message` field.
	pub message: Option<String>,
	/// The body's `errorCode` field.
	pub error_code: Option<String>,
	/// Correlation id from the `X-OVH-QUERYID` header.
	pub query_id: Option<String>,
}
impl ApiError {
	/// Builds an error from a decoded error body.
	pub fn from_body(status: u16, body: &serde_json::Value, query_id: Option<String>) -> Self {
		let field = |name: &str| body.get(name).and_then(|v| v.as_str()).map(ToOwned::to_owned);
		let error_code = field("errorCode");

		Self {
			kind: ApiErrorKind::classify(status, error_code.as_deref()),
			status,
			message: field("message"),
			error_code,
			query_id,
		}
	}
}
impl Display for ApiError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match &self.message {
			Some(message) => f.write_str(message)?,
			None => write!(f, "API call failed with HTTP status {}.", self.status)?,
		}

		if let Some(query_id) = &self.query_id {
			write!(f, " \nOVH-Query-ID: {query_id}")?;
		}

		Ok(())
	}
}
impl StdError for ApiError {}

/// Configuration and construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Endpoint name is not in the compiled-in table.
	#[error("Unknown endpoint `{name}`. Valid endpoints: {valid}.")]
	UnknownEndpoint {
		/// Requested name.
		name: String,
		/// Comma-separated list of known names.
		valid: String,
	},
	/// No endpoint given and none found in the environment or configuration files.
	#[error("No endpoint configured; pass one explicitly or set OVH_ENDPOINT.")]
	MissingEndpoint,
	/// Endpoint URL cannot be parsed.
	#[error("Endpoint URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Only one of `client_id` / `client_secret` was given.
	#[error("Invalid OAuth2 config, both client_id and client_secret must be given.")]
	IncompleteOAuth2Pair,
	/// `application_secret` given without `application_key`.
	#[error("Invalid authentication config, application_secret requires application_key.")]
	IncompleteApplicationPair,
	/// Both authentication modes are configured.
	#[error("Can't use both application_key/application_secret and OAuth2.")]
	ConflictingAuthModes,
	/// Neither authentication mode is configured.
	#[error("Missing credentials; configure application_key/application_secret or client_id/client_secret.")]
	MissingCredentials,
	/// OAuth2 requested on an endpoint without a token issuer.
	#[error(
		"OAuth2 authentication is not compatible with endpoint `{endpoint}` (it can only be used with ovh-eu, ovh-ca and ovh-us)."
	)]
	OAuth2UnsupportedEndpoint {
		/// Endpoint name.
		endpoint: String,
	},
	/// Operation only exists for application-key authentication.
	#[error("Consumer keys are not used in OAuth2 mode.")]
	ConsumerKeyWithOAuth2,
	/// A configuration file could not be parsed.
	#[error("Failed to parse configuration file {}.", path.display())]
	ConfigFileParse {
		/// File that failed.
		path: PathBuf,
		/// Underlying parsing failure.
		#[source]
		source: ini::Error,
	},
	/// A credential cannot be carried in an HTTP header.
	#[error("Value for header `{name}` is not a valid header value.")]
	InvalidHeaderValue {
		/// Header name.
		name: String,
	},
	/// Call arguments could not be turned into JSON.
	#[error("Failed to serialize request arguments.")]
	InvalidPayload(#[source] serde_json::Error),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Why a response body could not be decoded.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// The body is not JSON, or not the expected shape; carries the failing path.
	#[error(transparent)]
	Shape(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// A complete JSON value was followed by more data.
	#[error("Unexpected data after the JSON value: {0}")]
	TrailingData(#[source] serde_json::Error),
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Low level HTTP request failed.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn forbidden_sub_kinds_follow_error_code() {
		assert_eq!(
			ApiErrorKind::classify(403, Some("NOT_GRANTED_CALL")),
			ApiErrorKind::NotGrantedCall
		);
		assert_eq!(ApiErrorKind::classify(403, Some("NOT_CREDENTIAL")), ApiErrorKind::NotCredential);
		assert_eq!(ApiErrorKind::classify(403, Some("INVALID_KEY")), ApiErrorKind::InvalidKey);
		assert_eq!(
			ApiErrorKind::classify(403, Some("INVALID_CREDENTIAL")),
			ApiErrorKind::InvalidCredential
		);
		assert_eq!(ApiErrorKind::classify(403, Some("FORBIDDEN")), ApiErrorKind::Forbidden);
		assert_eq!(ApiErrorKind::classify(403, Some("SOMETHING_ELSE")), ApiErrorKind::Other);
		assert_eq!(ApiErrorKind::classify(403, None), ApiErrorKind::Other);
	}

	#[test]
	fn status_codes_map_without_error_code() {
		assert_eq!(ApiErrorKind::classify(404, None), ApiErrorKind::ResourceNotFound);
		assert_eq!(ApiErrorKind::classify(400, Some("FORBIDDEN")), ApiErrorKind::BadParameters);
		assert_eq!(ApiErrorKind::classify(409, None), ApiErrorKind::ResourceConflict);
		assert_eq!(ApiErrorKind::classify(460, None), ApiErrorKind::ResourceExpired);
		assert_eq!(ApiErrorKind::classify(306, None), ApiErrorKind::Other);
		assert_eq!(ApiErrorKind::classify(500, None), ApiErrorKind::Other);
	}

	#[test]
	fn api_error_reads_body_fields_and_renders_query_id() {
		let body = serde_json::json!({ "message": "Invalid credential", "errorCode": "INVALID_CREDENTIAL" });
		let err = ApiError::from_body(403, &body, Some("FR.test1".into()));

		assert_eq!(err.kind, ApiErrorKind::InvalidCredential);
		assert_eq!(err.message.as_deref(), Some("Invalid credential"));
		assert_eq!(err.to_string(), "Invalid credential \nOVH-Query-ID: FR.test1");

		let err = Error::from(err);

		assert_eq!(err.kind(), ErrorKind::InvalidCredential);
		assert_eq!(err.query_id(), Some("FR.test1"));
	}

	#[test]
	fn config_errors_flatten_to_region_or_configuration() {
		let region = Error::from(ConfigError::UnknownEndpoint {
			name: "laponie".into(),
			valid: "ovh-eu".into(),
		});

		assert_eq!(region.kind(), ErrorKind::InvalidRegion);
		assert_eq!(Error::from(ConfigError::MissingCredentials).kind(), ErrorKind::InvalidConfiguration);
		assert_eq!(region.query_id(), None);
	}
}
