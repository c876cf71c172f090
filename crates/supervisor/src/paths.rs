//! On-disk layout of server instances.

use std::path::{Path, PathBuf};

use crate::profile::ServerProfile;

const SERVER_FILES: &str = "serverfiles";

/// Resolves server-file roots from server ids.
///
/// Each server id gets `<servers root>/<server id>/serverfiles`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerPaths {
	root: PathBuf,
}

impl ServerPaths {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	#[must_use]
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Directory holding the installed server software for `server_id`.
	#[must_use]
	pub fn server_files(&self, server_id: &str) -> PathBuf {
		self.root.join(server_id).join(SERVER_FILES)
	}

	/// Absolute path where `profile`'s executable is expected for `server_id`.
	#[must_use]
	pub fn executable(&self, server_id: &str, profile: &ServerProfile) -> PathBuf {
		self.server_files(server_id)
			.join(profile.relative_executable())
	}
}
