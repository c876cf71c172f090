use std::path::{Path, PathBuf};

use miette::{miette, IntoDiagnostic, Result, WrapErr};
use palkeeper_supervisor::{paths::ServerPaths, profile::ServerProfile, ServerConfig};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::args::Args;

/// The configuration file.
///
/// Server settings live at the top level, next to the host settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
	/// Server type, by short name. Palworld if absent.
	pub profile: Option<String>,

	pub servers_dir: Option<PathBuf>,

	pub steamcmd: Option<PathBuf>,

	/// Steam account, for server types that can't be fetched anonymously.
	pub steam_user: Option<String>,

	#[serde(flatten)]
	pub server: ServerConfig,
}

impl FileConfig {
	/// A configuration file with the defaults of `profile`.
	pub fn initial(server_id: &str, profile: &ServerProfile) -> Self {
		Self {
			profile: Some(profile.name.into()),
			server: ServerConfig::defaults_for(server_id, profile),
			..Default::default()
		}
	}

	pub async fn load(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path)
			.await
			.into_diagnostic()
			.wrap_err_with(|| format!("Failed to read config file at {}", path.display()))?;
		Self::parse(&content)
			.wrap_err_with(|| format!("Failed to parse config file at {}", path.display()))
	}

	pub fn parse(content: &str) -> Result<Self> {
		toml::from_str(content).into_diagnostic()
	}

	pub fn to_toml(&self) -> Result<String> {
		toml::to_string_pretty(self).into_diagnostic()
	}
}

/// Everything a command needs, with command-line overrides applied.
#[derive(Clone, Debug)]
pub struct Settings {
	pub server: ServerConfig,
	pub profile: &'static ServerProfile,
	pub paths: ServerPaths,
	pub steamcmd: PathBuf,
	pub steam_user: Option<String>,
}

impl Settings {
	pub async fn load(args: &Args) -> Result<Self> {
		let file = FileConfig::load(&args.config).await?;
		let settings = Self::resolve(args, file)?;
		debug!(?settings, "resolved settings");
		Ok(settings)
	}

	pub fn resolve(args: &Args, file: FileConfig) -> Result<Self> {
		let profile_name = file.profile.as_deref().unwrap_or("palworld");
		let profile = ServerProfile::find(profile_name)
			.ok_or_else(|| miette!("Unknown server type {profile_name:?}"))?;

		if file.server.server_id.trim().is_empty() {
			return Err(miette!("The configuration has no server_id"));
		}

		let servers_dir = args
			.servers_dir
			.clone()
			.or(file.servers_dir)
			.unwrap_or_else(default_servers_dir);

		let steamcmd = args
			.steamcmd
			.clone()
			.or(file.steamcmd)
			.unwrap_or_else(|| PathBuf::from("steamcmd"));

		Ok(Self {
			server: file.server,
			profile,
			paths: ServerPaths::new(servers_dir),
			steamcmd,
			steam_user: file.steam_user,
		})
	}
}

fn default_servers_dir() -> PathBuf {
	dirs::data_local_dir()
		.map_or_else(|| PathBuf::from("servers"), |dir| dir.join("palkeeper").join("servers"))
}
