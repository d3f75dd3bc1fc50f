//! Lightweight OVHcloud API client: signed application-key calls, OAuth2 bearer sessions,
//! layered configuration, and a typed error taxonomy.
//!
//! ```no_run
//! # async fn demo() -> ovh_client::Result<()> {
//! use ovh_client::{Client, Params};
//!
//! let client = Client::builder()
//! 	.endpoint("ovh-eu")
//! 	.application_key("my_app_key")
//! 	.application_secret("my_application_secret")
//! 	.consumer_key("my_consumer_key")
//! 	.build()?;
//! let me = client.get("/me", &Params::new(), true).await?;
//!
//! println!("Hello {}", me["firstname"]);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod params;
pub mod rules;
pub mod secret;
pub mod sign;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use serde_json;
pub use url;

pub use crate::{
	client::{Client, ClientBuilder},
	config::{ConfigResolver, ConfigSources, EnvSource},
	endpoint::Endpoint,
	error::{ApiError, ApiErrorKind, Error, ErrorKind, Result},
	http::Timeout,
	params::Params,
	rules::{AccessRule, AccessRules, ConsumerKeyValidation},
	secret::Secret,
};

#[cfg(test)] use {color_eyre as _, httpmock as _};
