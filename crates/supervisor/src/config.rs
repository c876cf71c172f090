//! Operator-supplied server configuration.

use serde::{Deserialize, Serialize};

use crate::profile::ServerProfile;

/// Settings describing one server instance.
///
/// Every optional field follows the same rule: a value that is absent, empty, or made only of
/// whitespace means "leave it out of the invocation", never "pass an empty value". The accessors
/// apply that rule, so consumers should always go through them rather than reading the fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
	/// Opaque identifier, used to resolve the on-disk server files.
	pub server_id: String,

	/// Map (or world) to load.
	pub map: Option<String>,

	/// Name advertised to players.
	pub session_name: Option<String>,

	/// Address to bind to, on hosts with more than one.
	pub bind_address: Option<String>,

	/// Game port.
	pub port: Option<String>,

	/// Steam query port.
	pub query_port: Option<String>,

	/// Player cap.
	pub max_players: Option<String>,

	/// Free-form extra arguments.
	///
	/// Appended as-is if it starts with `?`, as a separate token if it starts with `-`, and
	/// dropped otherwise.
	pub extra_param: Option<String>,
}

impl ServerConfig {
	/// Configuration used before the operator has configured anything.
	#[must_use]
	pub fn defaults_for(server_id: impl Into<String>, profile: &ServerProfile) -> Self {
		let defaults = &profile.defaults;
		Self {
			server_id: server_id.into(),
			map: Some(defaults.map.into()),
			session_name: Some(defaults.session_name.into()),
			bind_address: None,
			port: Some(defaults.port.into()),
			query_port: Some(defaults.query_port.into()),
			max_players: Some(defaults.max_players.into()),
			extra_param: Some(defaults.extra_param.into()),
		}
	}

	pub fn map(&self) -> Option<&str> {
		non_blank(self.map.as_deref())
	}

	pub fn session_name(&self) -> Option<&str> {
		non_blank(self.session_name.as_deref())
	}

	pub fn bind_address(&self) -> Option<&str> {
		non_blank(self.bind_address.as_deref())
	}

	pub fn port(&self) -> Option<&str> {
		non_blank(self.port.as_deref())
	}

	pub fn query_port(&self) -> Option<&str> {
		non_blank(self.query_port.as_deref())
	}

	pub fn max_players(&self) -> Option<&str> {
		non_blank(self.max_players.as_deref())
	}

	pub fn extra_param(&self) -> Option<&str> {
		non_blank(self.extra_param.as_deref())
	}
}

/// The one place where "blank" is decided.
///
/// Present values are returned untrimmed: only the presence test ignores whitespace.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<&str> {
	value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::profile::PALWORLD;

	#[test]
	fn blank_values_are_absent() {
		let config = ServerConfig {
			map: Some(String::new()),
			session_name: Some("   ".into()),
			bind_address: Some("\t\n".into()),
			port: None,
			..Default::default()
		};

		assert_eq!(config.map(), None);
		assert_eq!(config.session_name(), None);
		assert_eq!(config.bind_address(), None);
		assert_eq!(config.port(), None);
	}

	#[test]
	fn present_values_are_untouched() {
		let config = ServerConfig {
			session_name: Some(" My Server ".into()),
			..Default::default()
		};

		assert_eq!(config.session_name(), Some(" My Server "));
	}

	#[test]
	fn defaults_come_from_profile() {
		let config = ServerConfig::defaults_for("1", &PALWORLD);
		assert_eq!(config.server_id, "1");
		assert_eq!(config.map(), Some("MainWorld5"));
		assert_eq!(config.session_name(), Some("Palworld"));
		assert_eq!(config.port(), Some("8211"));
		assert_eq!(config.query_port(), Some("8212"));
		assert_eq!(config.max_players(), Some("32"));
		assert_eq!(config.bind_address(), None);
	}
}
