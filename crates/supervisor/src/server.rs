//! One configured server, all operations in one place.

use std::{
	path::{Path, PathBuf},
	sync::Arc,
	time::Duration,
};

use crate::{
	command::build_args,
	config::ServerConfig,
	errors::{InstallerError, StartError},
	installer::{BuildId, InstallOrchestrator, InstallerProcess, PackageFetcher},
	launcher::Launcher,
	paths::ServerPaths,
	process::ProcessHandle,
	profile::ServerProfile,
	relay::ConsoleSink,
	shutdown::{StopCoordinator, StopOutcome},
	validate,
	window::WindowMessenger,
};

/// A server instance: its configuration and type, and the machinery to run and maintain it.
///
/// `Server` doesn't keep track of the process it starts. [`start()`](Self::start) hands over a
/// [`ProcessHandle`], and [`stop()`](Self::stop) wants it back.
#[derive(Debug)]
pub struct Server<F, M> {
	config: ServerConfig,
	profile: &'static ServerProfile,
	paths: ServerPaths,
	launcher: Launcher,
	stopper: StopCoordinator<M>,
	installer: InstallOrchestrator<F>,
	import_error: Option<String>,
}

impl<F: PackageFetcher, M: WindowMessenger> Server<F, M> {
	pub fn new(
		config: ServerConfig,
		profile: &'static ServerProfile,
		paths: ServerPaths,
		sink: Arc<dyn ConsoleSink>,
		fetcher: F,
		messenger: M,
	) -> Self {
		let installer = InstallOrchestrator::new(fetcher, config.server_id.clone(), profile);
		Self {
			config,
			profile,
			paths,
			launcher: Launcher::new(sink),
			stopper: StopCoordinator::new(messenger),
			installer,
			import_error: None,
		}
	}

	/// Change the grace period given to embedded servers when stopping.
	#[must_use]
	pub fn with_grace(mut self, grace: Duration) -> Self {
		self.stopper = self.stopper.with_grace(grace);
		self
	}

	#[must_use]
	pub const fn config(&self) -> &ServerConfig {
		&self.config
	}

	/// Replace the configuration. Takes effect from the next operation.
	pub fn set_config(&mut self, config: ServerConfig) {
		self.installer.set_server_id(config.server_id.clone());
		self.config = config;
	}

	#[must_use]
	pub const fn profile(&self) -> &'static ServerProfile {
		self.profile
	}

	#[must_use]
	pub const fn paths(&self) -> &ServerPaths {
		&self.paths
	}

	/// The argument string the current configuration produces.
	#[must_use]
	pub fn args(&self) -> String {
		build_args(&self.config)
	}

	/// Where the executable should be.
	#[must_use]
	pub fn executable(&self) -> PathBuf {
		self.paths.executable(&self.config.server_id, self.profile)
	}

	/// Start the server.
	///
	/// Must be called from within a Tokio runtime.
	pub fn start(&self) -> Result<ProcessHandle, StartError> {
		self.launcher.start(
			&self.config.server_id,
			&self.executable(),
			&self.args(),
			self.profile.launch_mode,
		)
	}

	/// Ask the server to stop. See [`StopCoordinator::stop`].
	pub async fn stop(&self, process: &mut ProcessHandle) -> StopOutcome {
		self.stopper.stop(process).await
	}

	pub async fn install(&mut self) -> Option<InstallerProcess> {
		self.installer.install().await
	}

	pub async fn update(&mut self, validate: bool, custom: Option<&str>) -> Option<InstallerProcess> {
		self.installer.update(validate, custom).await
	}

	pub fn local_build(&mut self) -> Option<BuildId> {
		self.installer.local_build()
	}

	pub async fn remote_build(&mut self) -> Option<BuildId> {
		self.installer.remote_build().await
	}

	pub async fn is_up_to_date(&mut self) -> Option<bool> {
		self.installer.is_up_to_date().await
	}

	/// The error from the last install, update, or build query, if it failed.
	#[must_use]
	pub const fn last_error(&self) -> Option<&InstallerError> {
		self.installer.last_error()
	}

	/// Whether the server files are installed.
	#[must_use]
	pub fn is_install_valid(&self) -> bool {
		validate::is_install_valid(&self.paths, &self.config.server_id, self.profile)
	}

	/// Whether `path` holds server files of this type.
	///
	/// On failure, [`import_error()`](Self::import_error) says which file is missing.
	pub fn is_import_valid(&mut self, path: &Path) -> bool {
		match validate::is_import_valid(path, self.profile) {
			Ok(()) => {
				self.import_error = None;
				true
			}
			Err(message) => {
				self.import_error = Some(message);
				false
			}
		}
	}

	/// Why the last import check failed.
	#[must_use]
	pub fn import_error(&self) -> Option<&str> {
		self.import_error.as_deref()
	}
}
