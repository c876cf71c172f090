//! Fixed per-server-type constants.

use std::{ops::RangeInclusive, path::PathBuf};

/// How a server type is launched and stopped.
///
/// This is a property of the server type, not of a single launch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LaunchMode {
	/// Output captured and relayed, window hidden, stopped by typing `quit` into its console.
	Embedded,

	/// Window minimized, output not captured, stopped by closing its window.
	Standalone,
}

/// Values used before the operator has configured anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProfileDefaults {
	pub session_name: &'static str,
	pub map: &'static str,
	pub max_players: &'static str,
	pub port: &'static str,
	pub query_port: &'static str,
	pub extra_param: &'static str,
}

/// A server type: everything about a dedicated server that the operator cannot change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerProfile {
	/// Short name, used to select the profile from configuration.
	pub name: &'static str,

	/// Display name.
	pub full_name: &'static str,

	/// Steam application id of the dedicated server.
	pub app_id: &'static str,

	/// Whether SteamCMD can fetch the server without an account.
	pub login_anonymous: bool,

	/// Path of the executable relative to the server files, one component per entry.
	pub start_path: &'static [&'static str],

	pub launch_mode: LaunchMode,

	/// How many sequential ports an instance reserves, starting from its game port.
	///
	/// Hosts running several instances space their ports at least this far apart.
	pub port_increments: u16,

	pub defaults: ProfileDefaults,
}

#[cfg(windows)]
const PALWORLD_START_PATH: &[&str] = &["Pal", "Binaries", "Win64", "PalServer-Win64-Test-Cmd.exe"];
#[cfg(not(windows))]
const PALWORLD_START_PATH: &[&str] = &["PalServer.sh"];

/// Palworld Dedicated Server.
pub const PALWORLD: ServerProfile = ServerProfile {
	name: "palworld",
	full_name: "Palworld Dedicated Server",
	app_id: "2394010",
	login_anonymous: true,
	start_path: PALWORLD_START_PATH,
	launch_mode: LaunchMode::Embedded,
	port_increments: 3,
	defaults: ProfileDefaults {
		session_name: "Palworld",
		map: "MainWorld5",
		max_players: "32",
		port: "8211",
		query_port: "8212",
		extra_param: "EpicApp=PalServer -useperfthreads -NoAsyncLoadingThread -UseMultithreadForDS",
	},
};

/// Every server type this build knows about.
pub const PROFILES: &[ServerProfile] = &[PALWORLD];

impl ServerProfile {
	/// Look up a profile by its short name, case-insensitively.
	#[must_use]
	pub fn find(name: &str) -> Option<&'static Self> {
		PROFILES
			.iter()
			.find(|profile| profile.name.eq_ignore_ascii_case(name))
	}

	/// The executable path relative to a server-file root.
	#[must_use]
	pub fn relative_executable(&self) -> PathBuf {
		self.start_path.iter().collect()
	}

	/// The ports an instance whose game port is `base` reserves.
	#[must_use]
	pub fn reserved_ports(&self, base: u16) -> RangeInclusive<u16> {
		base..=base.saturating_add(self.port_increments.saturating_sub(1))
	}

	/// The file name of the executable, for diagnostics.
	#[must_use]
	pub fn executable_name(&self) -> &'static str {
		self.start_path.last().copied().unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reserved_ports_follow_the_game_port() {
		assert_eq!(PALWORLD.reserved_ports(8211), 8211..=8213);
		assert_eq!(PALWORLD.reserved_ports(u16::MAX), u16::MAX..=u16::MAX);
	}

	#[test]
	fn find_is_case_insensitive() {
		assert_eq!(ServerProfile::find("PalWorld"), Some(&PALWORLD));
		assert_eq!(ServerProfile::find("ark"), None);
	}

	#[test]
	fn executable_name_is_last_component() {
		let profile = ServerProfile {
			start_path: &["bin", "srv.exe"],
			..PALWORLD
		};
		assert_eq!(profile.executable_name(), "srv.exe");
		assert_eq!(profile.relative_executable(), PathBuf::from("bin").join("srv.exe"));
	}
}
