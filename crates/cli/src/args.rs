use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::{Parser, Subcommand, ValueHint};
use palkeeper_supervisor::shutdown::DEFAULT_GRACE;
use tracing::debug;

pub mod logging;

const OPTSET_CONFIG: &str = "Configuration options";
const OPTSET_DEBUGGING: &str = "Debugging options";
const OPTSET_STOPPING: &str = "Stopping options";

/// Run, stop, install and update dedicated game servers.
///
/// Palkeeper keeps one server per configuration file. Start with 'palkeeper init' to write a
/// configuration with the defaults of the server type, then 'palkeeper install' and
/// 'palkeeper run'.
#[derive(Debug, Clone, Parser)]
#[command(name = "palkeeper", author, version, about, long_about = None)]
#[cfg_attr(debug_assertions, command(before_help = "⚠ DEBUG BUILD ⚠"))]
pub struct Args {
	#[command(subcommand)]
	pub command: Command,

	/// Configuration file
	#[arg(
		long,
		short,
		global = true,
		env = "PALKEEPER_CONFIG",
		default_value = "palkeeper.toml",
		help_heading = OPTSET_CONFIG,
		value_hint = ValueHint::FilePath,
		value_name = "PATH",
	)]
	pub config: PathBuf,

	/// Directory holding the files of every server
	///
	/// Each server's files go in '<servers dir>/<server id>/serverfiles'. Overrides 'servers_dir'
	/// from the configuration file. The default is a 'palkeeper/servers' folder in the platform's
	/// local data directory.
	#[arg(
		long,
		global = true,
		env = "PALKEEPER_SERVERS_DIR",
		help_heading = OPTSET_CONFIG,
		value_hint = ValueHint::DirPath,
		value_name = "DIR",
	)]
	pub servers_dir: Option<PathBuf>,

	/// Path to steamcmd
	///
	/// Overrides 'steamcmd' from the configuration file. By default 'steamcmd' is looked up in
	/// the PATH.
	#[arg(
		long,
		global = true,
		env = "PALKEEPER_STEAMCMD",
		help_heading = OPTSET_CONFIG,
		value_hint = ValueHint::ExecutablePath,
		value_name = "PATH",
	)]
	pub steamcmd: Option<PathBuf>,

	#[command(flatten)]
	pub logging: logging::LoggingArgs,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
	/// Write a configuration file with the server type's defaults
	Init {
		/// Identifier of the server, used to locate its files
		#[arg(long, default_value = "1")]
		server_id: String,

		/// Server type
		#[arg(long, default_value = "palworld")]
		profile: String,

		/// Overwrite an existing configuration file
		#[arg(long)]
		force: bool,
	},

	/// Print the arguments the server would be started with
	Args,

	/// Install the server files
	Install,

	/// Update the server files
	Update {
		/// Check every file, not just the ones that changed
		#[arg(long)]
		validate: bool,

		/// Extra arguments passed through to steamcmd
		#[arg(long, value_name = "ARGS", allow_hyphen_values = true)]
		custom: Option<String>,
	},

	/// Compare the installed build with the latest published one
	Check,

	/// Check that the server files are installed
	Validate,

	/// Check that a directory holds server files that could be imported
	Import {
		/// Directory to check
		#[arg(value_hint = ValueHint::DirPath)]
		path: PathBuf,
	},

	/// Start the server and keep it in the foreground
	///
	/// Console output of the server is printed prefixed with its id. Press Ctrl-C to stop it: the
	/// server is asked to stop the way it expects, and if it's still running after the kill timeout,
	/// it is forcefully terminated.
	Run {
		/// Time to give the server after asking it to quit
		///
		/// Only used for servers that are stopped through their console. Takes a unit-less value
		/// in seconds, or a time span value such as "1min 30s".
		#[arg(
			long,
			help_heading = OPTSET_STOPPING,
			default_value_t = TimeSpan(DEFAULT_GRACE),
			value_name = "DURATION",
		)]
		grace: TimeSpan,

		/// Time to wait for the server to exit once the stop protocol has run
		///
		/// If the server is still running after that, it is forcefully terminated. Takes a
		/// unit-less value in seconds, or a time span value such as "2min". Set to 0 to
		/// force-kill immediately after the stop protocol.
		#[arg(
			long,
			help_heading = OPTSET_STOPPING,
			default_value = "30s",
			value_name = "TIMEOUT",
		)]
		kill_timeout: TimeSpan,
	},
}

/// A duration given on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSpan(pub Duration);

impl FromStr for TimeSpan {
	type Err = humantime::DurationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		s.parse::<u64>().map_or_else(
			|_| humantime::parse_duration(s).map(Self),
			|secs| Ok(Self(Duration::from_secs(secs))),
		)
	}
}

impl std::fmt::Display for TimeSpan {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", humantime::format_duration(self.0))
	}
}

pub fn get_args() -> Args {
	if std::env::var("RUST_LOG").is_ok() {
		eprintln!("⚠ RUST_LOG environment variable set, logging options have no effect");
	}

	let args = Args::parse();
	debug!(?args, "parsed arguments");
	args
}
