//! Error types.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Why a server could not be started.
///
/// Neither is retried: a missing executable needs a (re)install, and an OS refusal is reported
/// as-is for the host to decide.
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum StartError {
	/// The executable is not where the server files say it should be.
	///
	/// Raised before any attempt at creating a process.
	#[error("{file} not found ({})", path.display())]
	#[diagnostic(
		code(palkeeper::start::executable_not_found),
		help("install or repair the server files first")
	)]
	ExecutableNotFound {
		/// File name of the executable.
		file: String,

		/// Full path that was checked.
		path: PathBuf,
	},

	/// The OS refused to create the process.
	#[error("failed to launch {}: {err}", path.display())]
	#[diagnostic(code(palkeeper::start::launch_failed))]
	LaunchFailed {
		/// Path of the executable.
		path: PathBuf,

		/// The underlying OS error.
		#[source]
		err: std::io::Error,
	},
}

/// A failure reported by the package-fetch collaborator.
///
/// These are common (network, disk space, credentials) and never fatal: the message is kept
/// for display and the orchestrator stays usable.
#[derive(Clone, Debug, Diagnostic, Error, PartialEq, Eq)]
#[error("{message}")]
#[diagnostic(code(palkeeper::installer))]
pub struct InstallerError {
	message: String,
}

impl InstallerError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}

	/// Wrap an I/O error with some context.
	pub fn io(about: &str, err: &std::io::Error) -> Self {
		Self::new(format!("{about}: {err}"))
	}

	#[must_use]
	pub fn message(&self) -> &str {
		&self.message
	}
}

impl From<String> for InstallerError {
	fn from(message: String) -> Self {
		Self::new(message)
	}
}

impl From<&str> for InstallerError {
	fn from(message: &str) -> Self {
		Self::new(message)
	}
}
