//! Router configuration.
//!
//! Options can be built in code or loaded from TOML:
//!
//! ```toml
//! basepath = "/app"
//! case_sensitive = false
//! trailing_slash = "never"
//! max_redirects = 10
//! ```

use serde::{Deserialize, Serialize};
use waymark_core::TrailingSlash;

/// Default bound on the redirect chain of one navigation.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Errors raised while loading or validating [`RouterOptions`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
	/// The TOML input could not be parsed.
	#[error("Failed to parse router options: {message}")]
	ParseError {
		/// Parser message.
		message: String,
	},
	/// A field holds an unusable value.
	#[error("Invalid router option '{field}': {reason}")]
	Invalid {
		/// Offending field.
		field: &'static str,
		/// Why it was rejected.
		reason: String,
	},
}

/// Router-wide options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
	/// Prefix stripped before matching and prepended to history hrefs.
	pub basepath: String,
	/// Compare static segments case-sensitively.
	pub case_sensitive: bool,
	/// Trailing slash policy for built pathnames.
	pub trailing_slash: TrailingSlash,
	/// Redirects allowed within one navigation before it fails.
	pub max_redirects: usize,
}

impl Default for RouterOptions {
	fn default() -> Self {
		Self {
			basepath: "/".to_string(),
			case_sensitive: false,
			trailing_slash: TrailingSlash::default(),
			max_redirects: DEFAULT_MAX_REDIRECTS,
		}
	}
}

impl RouterOptions {
	/// Parses and validates options from a TOML string.
	///
	/// # Errors
	///
	/// Returns [`ConfigError::ParseError`] for malformed TOML and
	/// [`ConfigError::Invalid`] if validation fails.
	pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
		let options: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
			message: e.to_string(),
		})?;
		options.validate()?;
		Ok(options)
	}

	/// Checks that every field is usable.
	///
	/// # Errors
	///
	/// Returns [`ConfigError::Invalid`] if `basepath` does not start with `/`
	/// or `max_redirects` is zero.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.basepath.starts_with('/') {
			return Err(ConfigError::Invalid {
				field: "basepath",
				reason: format!("'{}' must start with '/'", self.basepath),
			});
		}
		if self.max_redirects == 0 {
			return Err(ConfigError::Invalid {
				field: "max_redirects",
				reason: "must be at least 1".to_string(),
			});
		}
		Ok(())
	}

	/// Sets the basepath.
	pub fn with_basepath(mut self, basepath: impl Into<String>) -> Self {
		self.basepath = basepath.into();
		self
	}

	/// Sets case-sensitive matching.
	pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
		self.case_sensitive = case_sensitive;
		self
	}

	/// Sets the trailing slash policy.
	pub fn with_trailing_slash(mut self, trailing_slash: TrailingSlash) -> Self {
		self.trailing_slash = trailing_slash;
		self
	}

	/// Sets the redirect bound.
	pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
		self.max_redirects = max_redirects;
		self
	}

	fn base(&self) -> &str {
		self.basepath.trim_end_matches('/')
	}

	/// Removes the basepath from an href coming from history.
	///
	/// Hrefs outside the basepath are returned unchanged and will usually
	/// fail to match.
	pub fn strip_basepath<'a>(&self, href: &'a str) -> std::borrow::Cow<'a, str> {
		let base = self.base();
		if base.is_empty() {
			return href.into();
		}
		match href.strip_prefix(base) {
			Some("") => "/".into(),
			Some(rest) if rest.starts_with(['/', '?', '#']) => {
				if rest.starts_with('/') {
					rest.into()
				} else {
					format!("/{}", rest).into()
				}
			}
			_ => href.into(),
		}
	}

	/// Prefixes an href with the basepath before it is written to history.
	pub fn join_basepath(&self, href: &str) -> String {
		let base = self.base();
		if base.is_empty() {
			href.to_string()
		} else if href == "/" {
			base.to_string()
		} else if href.starts_with(['?', '#']) || href.starts_with("/?") || href.starts_with("/#") {
			format!("{}{}", base, href.trim_start_matches('/'))
		} else {
			format!("{}{}", base, href)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_defaults() {
		let options = RouterOptions::default();
		assert_eq!(options.basepath, "/");
		assert!(!options.case_sensitive);
		assert_eq!(options.trailing_slash, TrailingSlash::Never);
		assert_eq!(options.max_redirects, DEFAULT_MAX_REDIRECTS);
	}

	#[rstest]
	fn test_from_toml_str() {
		let options = RouterOptions::from_toml_str(
			r#"
			basepath = "/app"
			trailing_slash = "always"
			max_redirects = 3
			"#,
		)
		.unwrap();
		assert_eq!(
			options,
			RouterOptions::default()
				.with_basepath("/app")
				.with_trailing_slash(TrailingSlash::Always)
				.with_max_redirects(3)
		);
	}

	#[rstest]
	fn test_from_toml_str_rejects_garbage() {
		assert!(matches!(
			RouterOptions::from_toml_str("max_redirects = \"many\""),
			Err(ConfigError::ParseError { .. })
		));
	}

	#[rstest]
	#[case("basepath = \"app\"", "basepath")]
	#[case("max_redirects = 0", "max_redirects")]
	fn test_validation(#[case] toml: &str, #[case] field: &str) {
		match RouterOptions::from_toml_str(toml) {
			Err(ConfigError::Invalid { field: got, .. }) => assert_eq!(got, field),
			other => panic!("expected invalid option, got {:?}", other),
		}
	}

	#[rstest]
	#[case("/", "/posts?a=1", "/posts?a=1")]
	#[case("/app", "/app/posts", "/posts")]
	#[case("/app/", "/app", "/")]
	#[case("/app", "/app?x=1", "/?x=1")]
	#[case("/app", "/application", "/application")]
	#[case("/app", "/other", "/other")]
	fn test_strip_basepath(#[case] basepath: &str, #[case] href: &str, #[case] expected: &str) {
		let options = RouterOptions::default().with_basepath(basepath);
		assert_eq!(options.strip_basepath(href), expected);
	}

	#[rstest]
	#[case("/", "/posts", "/posts")]
	#[case("/app", "/posts", "/app/posts")]
	#[case("/app", "/", "/app")]
	#[case("/app/", "/?x=1", "/app?x=1")]
	fn test_join_basepath(#[case] basepath: &str, #[case] href: &str, #[case] expected: &str) {
		let options = RouterOptions::default().with_basepath(basepath);
		assert_eq!(options.join_basepath(href), expected);
	}
}
