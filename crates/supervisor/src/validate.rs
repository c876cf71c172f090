//! Checking that server files are where they should be.

use std::path::Path;

use tracing::trace;

use crate::{paths::ServerPaths, profile::ServerProfile};

/// Whether `profile`'s executable is installed for `server_id`.
#[must_use]
pub fn is_install_valid(paths: &ServerPaths, server_id: &str, profile: &ServerProfile) -> bool {
	let exe = paths.executable(server_id, profile);
	let valid = exe.is_file();
	trace!(?exe, %valid, "checked install");
	valid
}

/// Check that `path` holds server files that could be imported.
///
/// The error is a message for the operator, naming the file that's missing.
pub fn is_import_valid(path: &Path, profile: &ServerProfile) -> Result<(), String> {
	let exe = path.join(profile.relative_executable());
	trace!(?exe, "checking import");
	if exe.is_file() {
		Ok(())
	} else {
		Err(format!(
			"Invalid Path! Fail to find {}",
			profile.executable_name()
		))
	}
}
