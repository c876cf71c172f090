use std::{env::var, io::stderr, path::PathBuf};

use clap::{ArgAction, Parser, ValueHint};
use miette::{miette, Result};
use tokio::fs::metadata;
use tracing::{info, warn};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};

#[derive(Debug, Clone, Parser)]
pub struct LoggingArgs {
	/// Set diagnostic log level
	///
	/// Useful for finding out why a server won't start, stop, or install. Use multiple times to
	/// increase verbosity, up to '-vvvv'.
	///
	/// Relayed console output of the server is logged at the info level: with '-vv' and above it
	/// shows up in the logs as well as on the terminal.
	///
	/// Setting $RUST_LOG also works, and takes precedence.
	#[arg(
		long,
		short,
		global = true,
		help_heading = super::OPTSET_DEBUGGING,
		action = ArgAction::Count,
		default_value = "0",
		num_args = 0,
	)]
	pub verbose: u8,

	/// Write diagnostic logs to a file, as JSON
	///
	/// Implies '-vvv' unless a level was given. If the path is a directory (the default is the
	/// working directory), the log goes to 'palkeeper.YYYY-MM-DDTHH-MM-SSZ.log' inside it.
	#[arg(
		long,
		global = true,
		help_heading = super::OPTSET_DEBUGGING,
		num_args = 0..=1,
		default_missing_value = ".",
		value_hint = ValueHint::AnyPath,
		value_name = "PATH",
	)]
	pub log_file: Option<PathBuf>,
}

impl LoggingArgs {
	/// The level filter these options ask for, if any.
	#[must_use]
	pub fn filter(&self) -> Option<&'static str> {
		match (self.verbose, &self.log_file) {
			(0, None) => None,
			(1, _) => Some("warn"),
			(2, _) => Some("info"),
			(0 | 3, _) => Some("debug"),
			_ => Some("trace"),
		}
	}

	async fn log_file_path(&self) -> Result<Option<(PathBuf, PathBuf)>> {
		let Some(file) = &self.log_file else {
			return Ok(None);
		};

		if metadata(file).await.is_ok_and(|info| info.is_dir()) {
			let name = format!(
				"palkeeper.{}.log",
				chrono::Utc::now().format("%Y-%m-%dT%H-%M-%SZ")
			);
			return Ok(Some((file.clone(), name.into())));
		}

		match (file.parent(), file.file_name()) {
			(Some(parent), Some(name)) => Ok(Some((parent.into(), name.into()))),
			_ => Err(miette!("Failed to determine log file name")),
		}
	}
}

/// Set up logging from $RUST_LOG, before arguments are parsed. Returns whether it did.
pub fn from_env() -> bool {
	let Ok(filter) = var("RUST_LOG") else {
		return false;
	};

	match tracing_subscriber::fmt::try_init() {
		Ok(()) => {
			warn!(RUST_LOG=%filter, "logging configured from RUST_LOG");
			true
		}
		Err(e) => {
			eprintln!("Failed to initialise logging with RUST_LOG, falling back\n{e}");
			false
		}
	}
}

/// Set up logging from the command line options.
///
/// The guard must be held for as long as logs should be written.
pub async fn from_args(args: &LoggingArgs) -> Result<Option<WorkerGuard>> {
	let Some(filter) = args.filter() else {
		return Ok(None);
	};

	let builder = tracing_subscriber::fmt().with_env_filter(filter);
	let (result, guard) = if let Some((dir, name)) = args.log_file_path().await? {
		let (writer, guard) = non_blocking(rolling::never(dir, name));
		(builder.json().with_writer(writer).try_init(), guard)
	} else {
		let (writer, guard) = non_blocking(stderr());
		(builder.with_writer(writer).try_init(), guard)
	};

	match result {
		Ok(()) => info!(%filter, "logging initialised"),
		Err(e) => eprintln!("Failed to initialise logging, continuing with none\n{e}"),
	}

	Ok(Some(guard))
}
