//! Optional observability helpers for API calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `ovh.call` with the `kind` (authentication
//!   path) and `method` (HTTP verb) fields.
//! - Enable `metrics` to increment the `ovh_client_call_total` counter for every
//!   attempt/success/failure, labeled by `kind` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// How a call is authenticated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Only the application header is sent.
	Unsigned,
	/// Consumer/timestamp/signature headers are sent.
	Signed,
	/// OAuth2 bearer token is sent.
	Bearer,
	/// OAuth2 token exchange against the token endpoint.
	Token,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::Unsigned => "unsigned",
			CallKind::Signed => "signed",
			CallKind::Bearer => "bearer",
			CallKind::Token => "token",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Call started.
	Attempt,
	/// Call returned a decoded payload.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside a call span and records its attempt and outcome.
pub(crate) async fn observe<T, Fut>(kind: CallKind, method: &str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = CallSpan::new(kind, method);

	record_call_outcome(kind, CallOutcome::Attempt);

	let result = span.instrument(fut).await;

	record_call_outcome(
		kind,
		if result.is_ok() { CallOutcome::Success } else { CallOutcome::Failure },
	);

	result
}
