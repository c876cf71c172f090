//! Installing and updating server files.
//!
//! The actual fetching belongs to a [`PackageFetcher`], most likely [`SteamCmd`]. The
//! [`InstallOrchestrator`] binds one to a server and profile, and turns the fetcher's errors into
//! a readable [`last_error()`](InstallOrchestrator::last_error) instead of failures.

use std::{fmt, future::Future, process::ExitStatus};

use tokio::process::Child;
use tracing::{debug, warn};

use crate::{errors::InstallerError, profile::ServerProfile};

#[doc(inline)]
pub use steamcmd::SteamCmd;

mod steamcmd;

/// An opaque build identifier.
///
/// Two builds are the same if their identifiers are equal; nothing else can be inferred.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BuildId(String);

impl BuildId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for BuildId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// A running installer.
///
/// Installs and updates can take a very long time; the caller decides whether to wait.
#[derive(Debug)]
pub struct InstallerProcess {
	child: Child,
}

impl InstallerProcess {
	pub const fn new(child: Child) -> Self {
		Self { child }
	}

	/// The native process id, if the installer hasn't been reaped yet.
	#[must_use]
	pub fn id(&self) -> Option<u32> {
		self.child.id()
	}

	/// Wait for the installer to finish.
	pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
		self.child.wait().await
	}
}

/// The package-fetch boundary.
pub trait PackageFetcher: Send + Sync {
	/// Start a fresh install.
	fn install(
		&self,
		server_id: &str,
		branch: &str,
		app_id: &str,
		is_server: bool,
		anonymous: bool,
	) -> impl Future<Output = Result<InstallerProcess, InstallerError>> + Send;

	/// Start an update of an existing install.
	///
	/// `custom` is passed through to the fetcher untouched.
	fn update(
		&self,
		server_id: &str,
		app_id: &str,
		validate: bool,
		custom: Option<&str>,
		anonymous: bool,
	) -> impl Future<Output = Result<InstallerProcess, InstallerError>> + Send;

	/// Build identifier of what's installed.
	fn local_build(&self, server_id: &str, app_id: &str) -> Result<BuildId, InstallerError>;

	/// Build identifier of what's available to install.
	fn remote_build(
		&self,
		app_id: &str,
	) -> impl Future<Output = Result<BuildId, InstallerError>> + Send;
}

/// Installs and updates one server through a [`PackageFetcher`].
///
/// Nothing here fails: every operation returns `None` on error and records it, to be read with
/// [`last_error()`](Self::last_error). The record is cleared when the next operation starts.
#[derive(Debug)]
pub struct InstallOrchestrator<F> {
	fetcher: F,
	server_id: String,
	profile: &'static ServerProfile,
	last_error: Option<InstallerError>,
}

impl<F: PackageFetcher> InstallOrchestrator<F> {
	pub fn new(fetcher: F, server_id: impl Into<String>, profile: &'static ServerProfile) -> Self {
		Self {
			fetcher,
			server_id: server_id.into(),
			profile,
			last_error: None,
		}
	}

	pub const fn fetcher(&self) -> &F {
		&self.fetcher
	}

	/// Point at a different server id, for when the configuration changes.
	pub fn set_server_id(&mut self, server_id: impl Into<String>) {
		self.server_id = server_id.into();
	}

	/// The error reported by the most recent operation, if it failed.
	#[must_use]
	pub const fn last_error(&self) -> Option<&InstallerError> {
		self.last_error.as_ref()
	}

	fn record<T>(&mut self, op: &str, result: Result<T, InstallerError>) -> Option<T> {
		match result {
			Ok(value) => Some(value),
			Err(err) => {
				warn!(server=%self.server_id, %op, %err, "installer reported an error");
				self.last_error = Some(err);
				None
			}
		}
	}

	/// Install the server from scratch.
	pub async fn install(&mut self) -> Option<InstallerProcess> {
		self.last_error = None;
		debug!(server=%self.server_id, app=%self.profile.app_id, "installing");
		let result = self
			.fetcher
			.install(
				&self.server_id,
				"",
				self.profile.app_id,
				true,
				self.profile.login_anonymous,
			)
			.await;
		self.record("install", result)
	}

	/// Update the server, optionally forcing a validation of every file.
	pub async fn update(&mut self, validate: bool, custom: Option<&str>) -> Option<InstallerProcess> {
		self.last_error = None;
		debug!(server=%self.server_id, app=%self.profile.app_id, %validate, ?custom, "updating");
		let result = self
			.fetcher
			.update(
				&self.server_id,
				self.profile.app_id,
				validate,
				custom,
				self.profile.login_anonymous,
			)
			.await;
		self.record("update", result)
	}

	/// Build id of the installed server.
	pub fn local_build(&mut self) -> Option<BuildId> {
		self.last_error = None;
		let result = self.fetcher.local_build(&self.server_id, self.profile.app_id);
		self.record("local build", result)
	}

	/// Build id of the latest published server.
	pub async fn remote_build(&mut self) -> Option<BuildId> {
		self.last_error = None;
		let result = self.fetcher.remote_build(self.profile.app_id).await;
		self.record("remote build", result)
	}

	/// Whether the installed build matches the published one.
	///
	/// `None` if either can't be determined; [`last_error()`](Self::last_error) says why.
	pub async fn is_up_to_date(&mut self) -> Option<bool> {
		let local = self.local_build()?;
		let remote = self.remote_build().await?;
		debug!(server=%self.server_id, %local, %remote, "compared builds");
		Some(local == remote)
	}
}
