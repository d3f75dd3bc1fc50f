//! Ordered named-argument bag routed to the query string (GET/DELETE) or the JSON body
//! (POST/PUT).
//!
//! Keys that clash with a reserved word may be escaped with a leading underscore
//! (`_from`, `_type`); the underscore is stripped before transmission. Other
//! underscored keys (`_to`) are sent verbatim.

// crates.io
use serde_json::{Map, Value};
use url::form_urlencoded;

/// Words that need the underscore escape when used as argument names.
const RESERVED_WORDS: &[&str] = &[
	"and", "as", "assert", "async", "await", "break", "class", "const", "continue", "crate",
	"def", "del", "dyn", "elif", "else", "enum", "except", "extern", "false", "finally", "fn",
	"for", "from", "global", "if", "impl", "import", "in", "is", "lambda", "let", "loop",
	"match", "mod", "move", "mut", "nonlocal", "not", "or", "pass", "pub", "raise", "ref",
	"return", "self", "static", "struct", "super", "trait", "true", "try", "type", "unsafe",
	"use", "where", "while", "with", "yield",
];

/// Named arguments for a verb shortcut, kept in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params(Vec<(String, Value)>);
impl Params {
	/// Creates an empty bag.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds (or replaces) an argument and returns the bag.
	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.insert(key, value);

		self
	}

	/// Adds an argument; an existing key keeps its position and takes the new value.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
		let key = unescape(key.into());
		let value = value.into();

		match self.0.iter_mut().find(|(existing, _)| *existing == key) {
			Some(slot) => slot.1 = value,
			None => self.0.push((key, value)),
		}

		self
	}

	/// Returns the value stored under `key` (after unescaping).
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.iter().find(|(existing, _)| existing == key).map(|(_, value)| value)
	}

	/// Number of arguments.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true when no argument was given.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates over `(name, value)` pairs in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.0.iter().map(|(key, value)| (key.as_str(), value))
	}

	/// Renders the arguments as an URL-encoded query string.
	///
	/// Booleans become `true`/`false`, `null` becomes the literal `null`, strings are sent
	/// as is, and arrays or objects are sent as compact JSON.
	pub fn to_query_string(&self) -> String {
		let mut serializer = form_urlencoded::Serializer::new(String::new());

		for (key, value) in &self.0 {
			serializer.append_pair(key, &query_value(value));
		}

		serializer.finish()
	}

	/// Appends the query string to `path`, honoring an existing `?`.
	pub fn append_to(&self, path: &str) -> String {
		let query = self.to_query_string();

		if query.is_empty() {
			return path.to_owned();
		}

		let separator = if path.contains('?') { '&' } else { '?' };

		format!("{path}{separator}{query}")
	}

	/// Builds the JSON object sent as request body; `None` when the bag is empty.
	pub fn to_body(&self) -> Option<Value> {
		if self.is_empty() {
			return None;
		}

		Some(Value::Object(self.0.iter().cloned().collect::<Map<_, _>>()))
	}
}
impl<K, V> FromIterator<(K, V)> for Params
where
	K: Into<String>,
	V: Into<Value>,
{
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
	{
		let mut params = Self::new();

		for (key, value) in iter {
			params.insert(key, value);
		}

		params
	}
}

fn unescape(key: String) -> String {
	match key.strip_prefix('_') {
		Some(word) if RESERVED_WORDS.contains(&word) => word.to_owned(),
		_ => key,
	}
}

fn query_value(value: &Value) -> String {
	match value {
		Value::String(text) => text.clone(),
		Value::Bool(flag) => flag.to_string(),
		Value::Null => "null".into(),
		Value::Number(number) => number.to_string(),
		other => other.to_string(),
	}
}
