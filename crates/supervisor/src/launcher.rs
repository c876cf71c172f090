//! Process creation.

use std::{path::Path, sync::Arc};

use tracing::debug;

use crate::{
	command::to_spawnable,
	errors::StartError,
	process::ProcessHandle,
	profile::LaunchMode,
	relay::{ConsoleRelay, ConsoleSink},
};

/// Starts server executables.
///
/// Output of [`Embedded`](LaunchMode::Embedded) processes is relayed to the launcher's sink.
#[derive(Clone)]
pub struct Launcher {
	sink: Arc<dyn ConsoleSink>,
}

impl std::fmt::Debug for Launcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Launcher").finish_non_exhaustive()
	}
}

impl Launcher {
	pub fn new(sink: Arc<dyn ConsoleSink>) -> Self {
		Self { sink }
	}

	/// Start `executable` with the argument string `args`.
	///
	/// Returns as soon as the process exists; there's no waiting for the server to come up. If
	/// output is captured, the relay is already running when this returns.
	///
	/// Must be called from within a Tokio runtime.
	pub fn start(
		&self,
		server_id: &str,
		executable: &Path,
		args: &str,
		mode: LaunchMode,
	) -> Result<ProcessHandle, StartError> {
		if !executable.is_file() {
			return Err(StartError::ExecutableNotFound {
				file: executable
					.file_name()
					.map_or_else(String::new, |name| name.to_string_lossy().into_owned()),
				path: executable.to_owned(),
			});
		}

		let mut command = to_spawnable(executable, args, mode);
		debug!(server=%server_id, ?mode, ?command, "spawning server");

		let launch_failed = |err| StartError::LaunchFailed {
			path: executable.to_owned(),
			err,
		};

		let mut child = command.spawn().map_err(launch_failed)?;
		let pid = child.id().ok_or_else(|| {
			launch_failed(std::io::Error::new(
				std::io::ErrorKind::Other,
				"process was dead on arrival",
			))
		})?;
		debug!(server=%server_id, %pid, "server spawned");

		#[cfg(windows)]
		crate::window::apply_launch_mode(pid, mode);

		let relay = match mode {
			LaunchMode::Standalone => None,
			LaunchMode::Embedded => Some(ConsoleRelay::attach(
				server_id,
				child.stdout.take(),
				child.stderr.take(),
				self.sink.clone(),
			)),
		};

		Ok(ProcessHandle::new(child, pid, mode, relay))
	}
}
