//! Layered configuration lookup: environment first, then INI files.
//!
//! A parameter `name` is first looked up in the environment as `OVH_<NAME>` (the section
//! is ignored there), then in the loaded configuration files, highest precedence first.
//! The default search list is, lowest to highest precedence:
//!
//! 1. `/etc/ovh.conf`
//! 2. `~/.ovh.conf`
//! 3. `./ovh.conf`
//!
//! A caller-supplied file replaces the whole list. Files look like:
//!
//! ```ini
//! [default]
//! endpoint=ovh-eu
//!
//! [ovh-eu]
//! application_key=my_app_key
//! application_secret=my_application_secret
//! consumer_key=my_consumer_key
//! ```

// std
use std::{
	env,
	io::ErrorKind as IoErrorKind,
	path::{Path, PathBuf},
};
// crates.io
use ini::Ini;
// self
use crate::{_prelude::*, error::ConfigError};

/// Prefix of every environment variable consulted by the resolver.
pub const ENV_PREFIX: &str = "OVH_";

/// Files the resolver reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSources {
	/// Merge every existing file; later entries override earlier ones.
	Search(Vec<PathBuf>),
	/// Read only this file.
	File(PathBuf),
}
impl ConfigSources {
	/// Selects a single caller-supplied file.
	pub fn file(path: impl Into<PathBuf>) -> Self {
		Self::File(path.into())
	}

	/// System, user, and working-directory files, lowest precedence first.
	pub fn default_search_path() -> Vec<PathBuf> {
		let mut paths = vec![PathBuf::from("/etc/ovh.conf")];

		if let Some(home) = dirs::home_dir() {
			paths.push(home.join(".ovh.conf"));
		}

		paths.push(PathBuf::from("./ovh.conf"));

		paths
	}

	fn paths(&self) -> &[PathBuf] {
		match self {
			Self::Search(paths) => paths,
			Self::File(path) => std::slice::from_ref(path),
		}
	}
}
impl Default for ConfigSources {
	fn default() -> Self {
		Self::Search(Self::default_search_path())
	}
}

/// Where environment variables come from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EnvSource {
	/// The process environment.
	#[default]
	Process,
	/// A fixed map keyed by full variable name (`OVH_ENDPOINT`, ...).
	Fixed(HashMap<String, String>),
	/// No environment lookup at all.
	Disabled,
}
impl EnvSource {
	fn lookup(&self, variable: &str) -> Option<String> {
		match self {
			Self::Process => env::var(variable).ok(),
			Self::Fixed(vars) => vars.get(variable).cloned(),
			Self::Disabled => None,
		}
	}
}

/// Resolves named configuration parameters through environment and files.
#[derive(Clone, Default)]
pub struct ConfigResolver {
	env: EnvSource,
	// Highest precedence last.
	files: Vec<Ini>,
}
impl ConfigResolver {
	/// Reads every existing file listed by `sources`.
	///
	/// Missing files are skipped; a file that exists but cannot be parsed fails the load.
	pub fn load(sources: &ConfigSources) -> Result<Self, ConfigError> {
		let mut files = Vec::new();

		for path in sources.paths() {
			if let Some(ini) = read_file(path)? {
				files.push(ini);
			}
		}

		Ok(Self { env: EnvSource::Process, files })
	}

	/// Loads the default search path.
	pub fn from_default_sources() -> Result<Self, ConfigError> {
		Self::load(&ConfigSources::default())
	}

	/// Parses configuration text as a single highest-precedence source.
	pub fn from_ini_str(contents: &str) -> Result<Self, ConfigError> {
		let ini = Ini::load_from_str_noescape(contents).map_err(|source| {
			ConfigError::ConfigFileParse { path: PathBuf::from("<inline>"), source: ini::Error::Parse(source) }
		})?;

		Ok(Self { env: EnvSource::Process, files: vec![ini] })
	}

	/// Replaces the environment source.
	pub fn with_env(mut self, env: EnvSource) -> Self {
		self.env = env;

		self
	}

	/// Looks `name` up, first in the environment, then in `section` of the loaded files.
	///
	/// Absence is not an error; callers decide whether a missing value is fatal.
	pub fn get(&self, section: &str, name: &str) -> Option<String> {
		let variable = format!("{ENV_PREFIX}{}", name.to_ascii_uppercase());

		if let Some(value) = self.env.lookup(&variable) {
			return Some(value);
		}

		self.files.iter().rev().find_map(|ini| ini.get_from(Some(section), name)).map(Into::into)
	}
}
impl Debug for ConfigResolver {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ConfigResolver")
			.field("env", &self.env)
			.field("files", &self.files.len())
			.finish()
	}
}

fn read_file(path: &Path) -> Result<Option<Ini>, ConfigError> {
	match Ini::load_from_file_noescape(path) {
		Ok(ini) => Ok(Some(ini)),
		Err(ini::Error::Io(e)) if e.kind() == IoErrorKind::NotFound => Ok(None),
		Err(source) => Err(ConfigError::ConfigFileParse { path: path.to_owned(), source }),
	}
}
