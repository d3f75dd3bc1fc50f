//! Access rules requested for a consumer key.
//!
//! A consumer key is bound to a list of `{method, path}` grants. The end user validates
//! those grants once by visiting the validation URL returned by the credential request.

// std
use std::ops::{Deref, DerefMut};
// self
use crate::{_prelude::*, client::Client};

/// Read-only access.
pub const API_READ_ONLY: &[&str] = &["GET"];
/// Full read/write access.
pub const API_READ_WRITE: &[&str] = &["GET", "POST", "PUT", "DELETE"];
/// Read/write access without deletion.
pub const API_READ_WRITE_SAFE: &[&str] = &["GET", "POST", "PUT"];

/// A single grant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessRule {
	/// Upper-cased HTTP method.
	pub method: String,
	/// Path pattern, `*` acting as a wildcard.
	pub path: String,
}
impl AccessRule {
	/// Creates a rule; the method is upper-cased.
	pub fn new(method: &str, path: impl Into<String>) -> Self {
		Self { method: method.to_ascii_uppercase(), path: path.into() }
	}
}

/// Ordered list of grants. Duplicates are kept as given.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccessRules(Vec<AccessRule>);
impl AccessRules {
	/// Creates an empty list.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends one rule.
	pub fn add_rule(&mut self, method: &str, path: impl Into<String>) -> &mut Self {
		self.0.push(AccessRule::new(method, path));

		self
	}

	/// Appends one rule per method for `path`, in the given method order.
	pub fn add_rules(&mut self, methods: &[&str], path: &str) -> &mut Self {
		for method in methods {
			self.add_rule(method, path);
		}

		self
	}

	/// Grants `methods` on `path` and everything beneath it.
	///
	/// Trailing `*`, `/` and spaces are stripped first. The stripped path itself is
	/// granted when non-empty, then `stripped/*` is always granted, so `"/sms/*"` yields
	/// rules for `/sms` and `/sms/*` while `"/"` only yields rules for `/*`.
	pub fn add_recursive_rules(&mut self, methods: &[&str], path: &str) -> &mut Self {
		let path = path.trim_end_matches(['*', '/', ' ']);

		if !path.is_empty() {
			self.add_rules(methods, path);
		}

		self.add_rules(methods, &format!("{path}/*"))
	}

	/// Rules in insertion order.
	pub fn as_slice(&self) -> &[AccessRule] {
		&self.0
	}
}
impl Deref for AccessRules {
	type Target = [AccessRule];

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl From<Vec<AccessRule>> for AccessRules {
	fn from(rules: Vec<AccessRule>) -> Self {
		Self(rules)
	}
}
impl FromIterator<AccessRule> for AccessRules {
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = AccessRule>,
	{
		Self(iter.into_iter().collect())
	}
}

/// Pending consumer key returned by the credential request.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerKeyValidation {
	/// Newly issued consumer key, unusable until validated.
	pub consumer_key: String,
	/// URL the end user must visit to validate the grants.
	pub validation_url: String,
	/// Credential state, `pendingValidation` for a fresh key.
	#[serde(default)]
	pub state: String,
}

/// Builds the grant list of a consumer key request and submits it.
///
/// Dereferences to [`AccessRules`], so the rule helpers are available directly:
///
/// ```no_run
/// # async fn demo(client: &ovh_client::Client) -> ovh_client::Result<()> {
/// use ovh_client::rules::API_READ_ONLY;
///
/// let mut request = client.new_consumer_key_request();
///
/// request.add_rules(API_READ_ONLY, "/me");
/// request.add_recursive_rules(&["GET", "POST"], "/sms/*");
///
/// let validation = request.request(Some("https://example.com/done")).await?;
///
/// println!("Visit {} to validate.", validation.validation_url);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConsumerKeyRequest<'a> {
	client: &'a Client,
	rules: AccessRules,
	allowed_ips: Option<Vec<String>>,
}
impl<'a> ConsumerKeyRequest<'a> {
	pub(crate) fn new(client: &'a Client) -> Self {
		Self { client, rules: AccessRules::new(), allowed_ips: None }
	}

	/// Restricts the consumer key to the given IP ranges (CIDR notation).
	pub fn allowed_ips<I, S>(&mut self, ranges: I) -> &mut Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.allowed_ips = Some(ranges.into_iter().map(Into::into).collect());

		self
	}

	/// Accumulated rules.
	pub fn rules(&self) -> &AccessRules {
		&self.rules
	}

	/// Submits the accumulated rules.
	///
	/// The rules are left untouched, so the same request can be resubmitted. On success
	/// the new consumer key is loaded into the client.
	pub async fn request(&self, redirect_url: Option<&str>) -> Result<ConsumerKeyValidation> {
		self.client
			.request_consumer_key(&self.rules, redirect_url, self.allowed_ips.as_deref())
			.await
	}
}
impl Deref for ConsumerKeyRequest<'_> {
	type Target = AccessRules;

	fn deref(&self) -> &Self::Target {
		&self.rules
	}
}
impl DerefMut for ConsumerKeyRequest<'_> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.rules
	}
}
