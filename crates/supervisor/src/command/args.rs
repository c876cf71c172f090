use std::fmt::Write as _;

use crate::config::ServerConfig;

const LISTEN: &str = "?listen";

/// Build the server's command-line argument string from a configuration.
///
/// The string is assembled in a fixed order, and parts of it depend on what came before:
///
/// 1. the map, if any, as the leading token;
/// 2. `?listen`, always;
/// 3. `?SessionName="""<name>"""`: the triple quotes survive the command-line parser as one
///    pair of literal quotes around the name;
/// 4. `?MultiHome=<bind address>`;
/// 5. `?Port=<port>`;
/// 6. `?QueryPort=<query port>`;
/// 7. `?MaxPlayers=<max players>`;
/// 8. the extra parameter: glued on if it starts with `?` (it extends the `?key=value` block),
///    appended as a separate token if it starts with `-`, dropped otherwise;
/// 9. ` -WinLiveMaxPlayers=<max players>`.
///
/// Max players is emitted twice on purpose. The server reads the `?MaxPlayers=` option and the
/// legacy `-WinLiveMaxPlayers=` flag from different places and both are needed.
///
/// ```
/// # use palkeeper_supervisor::{command::build_args, config::ServerConfig};
/// assert_eq!(build_args(&ServerConfig::default()), "?listen");
/// ```
#[must_use]
pub fn build_args(config: &ServerConfig) -> String {
	let mut param = String::new();

	// fmt::Write for String is infallible
	if let Some(map) = config.map() {
		write!(param, " {map}").ok();
	}

	param.push_str(LISTEN);

	if let Some(name) = config.session_name() {
		write!(param, "?SessionName=\"\"\"{name}\"\"\"").ok();
	}

	if let Some(address) = config.bind_address() {
		write!(param, "?MultiHome={address}").ok();
	}

	if let Some(port) = config.port() {
		write!(param, "?Port={port}").ok();
	}

	if let Some(port) = config.query_port() {
		write!(param, "?QueryPort={port}").ok();
	}

	if let Some(max) = config.max_players() {
		write!(param, "?MaxPlayers={max}").ok();
	}

	if let Some(extra) = config.extra_param() {
		if extra.starts_with('?') {
			param.push_str(extra);
		} else if extra.starts_with('-') {
			write!(param, " {extra}").ok();
		}
	}

	if let Some(max) = config.max_players() {
		write!(param, " -WinLiveMaxPlayers={max}").ok();
	}

	param
}
