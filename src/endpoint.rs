//! Compiled-in endpoint table and target URL construction.

// self
use crate::{_prelude::*, error::ConfigError};

/// Suffix of the legacy API generation carried by every table entry.
const LEGACY_VERSION_SUFFIX: &str = "/1.0";
/// Path prefixes that address the versioned API generations.
const VERSIONED_MARKERS: &[&str] = &["/v1", "/v2"];

/// `(name, API base, OAuth2 token URL)` triples.
const ENDPOINTS: &[(&str, &str, Option<&str>)] = &[
	("ovh-eu", "https://eu.api.ovh.com/1.0", Some("https://www.ovh.com/auth/oauth2/token")),
	("ovh-ca", "https://ca.api.ovh.com/1.0", Some("https://ca.ovh.com/auth/oauth2/token")),
	("ovh-us", "https://api.us.ovhcloud.com/1.0", Some("https://us.ovhcloud.com/auth/oauth2/token")),
	("kimsufi-eu", "https://eu.api.kimsufi.com/1.0", None),
	("kimsufi-ca", "https://ca.api.kimsufi.com/1.0", None),
	("soyoustart-eu", "https://eu.api.soyoustart.com/1.0", None),
	("soyoustart-ca", "https://ca.api.soyoustart.com/1.0", None),
];

/// A named API region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
	name: String,
	api_base: String,
	token_url: Option<Url>,
}
impl Endpoint {
	/// Looks `name` up in the endpoint table.
	pub fn named(name: &str) -> Result<Self, ConfigError> {
		let (name, api_base, token_url) = ENDPOINTS
			.iter()
			.find(|(known, _, _)| *known == name)
			.ok_or_else(|| ConfigError::UnknownEndpoint {
				name: name.to_owned(),
				valid: Self::known_names().collect::<Vec<_>>().join(", "),
			})?;

		Self::custom(*name, *api_base, *token_url)
	}

	/// Builds an endpoint outside the table (gateways, mock servers).
	pub fn custom(
		name: impl Into<String>,
		api_base: impl Into<String>,
		token_url: Option<&str>,
	) -> Result<Self, ConfigError> {
		let api_base = api_base.into().trim_end_matches('/').to_owned();

		Url::parse(&api_base)
			.map_err(|source| ConfigError::InvalidUrl { url: api_base.clone(), source })?;

		let token_url = token_url
			.map(|url| {
				Url::parse(url).map_err(|source| ConfigError::InvalidUrl { url: url.into(), source })
			})
			.transpose()?;

		Ok(Self { name: name.into(), api_base, token_url })
	}

	/// Names accepted by [`Endpoint::named`].
	pub fn known_names() -> impl Iterator<Item = &'static str> {
		ENDPOINTS.iter().map(|(name, _, _)| *name)
	}

	/// Endpoint name, also used as the configuration section for its credentials.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// API base URL, without trailing slash.
	pub fn api_base(&self) -> &str {
		&self.api_base
	}

	/// OAuth2 token issuer, when the region supports OAuth2.
	pub fn token_url(&self) -> Option<&Url> {
		self.token_url.as_ref()
	}

	/// Joins `path` onto the API base.
	///
	/// A path addressing a versioned generation (`/v1/...`, `/v2/...`) replaces the
	/// legacy `/1.0` suffix of the base instead of being appended to it.
	pub fn target_url(&self, path: &str) -> String {
		let base = if is_versioned(path) {
			self.api_base.strip_suffix(LEGACY_VERSION_SUFFIX).unwrap_or(&self.api_base)
		} else {
			&self.api_base
		};

		format!("{base}{path}")
	}
}
impl Display for Endpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.name)
	}
}

fn is_versioned(path: &str) -> bool {
	VERSIONED_MARKERS.iter().any(|marker| {
		path.strip_prefix(marker)
			.is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']))
	})
}
