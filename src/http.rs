//! Transport primitives shared by API calls and OAuth2 token exchanges.
//!
//! [`ReqwestHttpClient`] owns the connection pool of one client instance. Token exchanges
//! go through an [`InstrumentedHandle`] which records the status and raw body of the
//! token endpoint's answer in a [`ResponseMetadataSlot`], so token failures can be
//! reported with the provider's own words.

// std
use std::{ops::Deref, time::Duration as StdDuration};
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
// self
use crate::{_prelude::*, error::ConfigError};

/// Connect and read timeouts applied to every request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeout {
	/// Maximum time to establish a connection.
	pub connect: StdDuration,
	/// Maximum time to wait between two reads.
	pub read: StdDuration,
}
impl Timeout {
	/// Same limit for both phases.
	pub const fn uniform(limit: StdDuration) -> Self {
		Self { connect: limit, read: limit }
	}
}
impl Default for Timeout {
	fn default() -> Self {
		Self::uniform(StdDuration::from_secs(180))
	}
}

/// Metadata captured from the most recent token endpoint response.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code, if a response was received.
	pub status: Option<u16>,
	/// Raw body, lossily decoded as UTF-8.
	pub body: Option<String>,
}

/// Thread-safe slot sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Connection pool of one client instance.
///
/// Redirects are not followed: the API and the token endpoints answer directly.
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client with the given connect/read timeouts.
	pub fn with_timeouts(timeout: Timeout) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.connect_timeout(timeout.connect)
			.read_timeout(timeout.read)
			.redirect(reqwest::redirect::Policy::none())
			.build()?;

		Ok(Self(client))
	}

	/// Builds an instrumented handle that captures response metadata into `slot`.
	pub(crate) fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle { client: self.0.clone(), slot }
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// [`AsyncHttpClient`] adapter used for token exchanges.
///
/// Each exchange gets its own handle, bound to a fresh slot.
#[derive(Clone, Debug)]
pub struct InstrumentedHandle {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let Self { client, slot } = self.clone();

		Box::pin(async move {
			slot.take();

			let request = request.try_into().map_err(Box::new)?;
			let response = client.execute(request).await.map_err(Box::new)?;
			let (status, headers) = (response.status(), response.headers().clone());
			let body = response.bytes().await.map_err(Box::new)?.to_vec();

			slot.store(ResponseMetadata {
				status: Some(status.as_u16()),
				body: Some(String::from_utf8_lossy(&body).into_owned()),
			});

			let mut http_response = HttpResponse::new(body);

			*http_response.status_mut() = status;
			*http_response.headers_mut() = headers;

			Ok(http_response)
		})
	}
}
