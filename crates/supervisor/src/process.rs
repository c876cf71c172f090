//! Handle to a running server process.

use std::process::ExitStatus;

use tokio::process::{Child, ChildStdin};
use tracing::{debug, trace};

use crate::{profile::LaunchMode, relay::ConsoleRelay};

/// One supervised OS process.
///
/// The launcher creates it and hands it to the host. The host gives it back (by `&mut`) to the
/// stop protocol. There is only ever one owner, so nothing here is synchronised.
///
/// The supervisor never kills a process on its own. [`kill()`](Self::kill) is there for the host,
/// to escalate when a stop protocol has run its course and the process is still alive. Dropping
/// the handle leaves the process running.
#[derive(Debug)]
pub struct ProcessHandle {
	child: Child,
	pid: u32,
	mode: LaunchMode,
	relay: Option<ConsoleRelay>,
	input: Option<ChildStdin>,
}

impl ProcessHandle {
	pub(crate) fn new(
		mut child: Child,
		pid: u32,
		mode: LaunchMode,
		relay: Option<ConsoleRelay>,
	) -> Self {
		let input = child.stdin.take();
		Self {
			child,
			pid,
			mode,
			relay,
			input,
		}
	}

	/// The native process identifier, as it was at launch.
	#[must_use]
	pub const fn id(&self) -> u32 {
		self.pid
	}

	/// The mode this process was launched with.
	#[must_use]
	pub const fn mode(&self) -> LaunchMode {
		self.mode
	}

	/// The console relay, if the process was launched with captured output.
	#[must_use]
	pub const fn relay(&self) -> Option<&ConsoleRelay> {
		self.relay.as_ref()
	}

	/// Take the piped console input, if there is one.
	///
	/// Only processes launched [`Embedded`](LaunchMode::Embedded) on Unix have one. The stop
	/// protocol borrows it to deliver the quit command and gives it back with
	/// [`restore_input()`](Self::restore_input), so the server doesn't see end-of-file.
	pub fn take_input(&mut self) -> Option<ChildStdin> {
		self.input.take()
	}

	/// Put back console input taken with [`take_input()`](Self::take_input).
	pub fn restore_input(&mut self, input: ChildStdin) {
		self.input = Some(input);
	}

	/// Check whether the process is still running, without waiting.
	pub fn is_running(&mut self) -> std::io::Result<bool> {
		let status = self.child.try_wait()?;
		trace!(pid=%self.pid, ?status, "try-waiting on process");
		Ok(status.is_none())
	}

	/// Wait for the process to exit.
	///
	/// If output was captured, this also waits for the relay to deliver the last lines.
	pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
		trace!(pid=%self.pid, "waiting on process");
		let status = self.child.wait().await?;
		debug!(pid=%self.pid, ?status, "process exited");

		if let Some(relay) = self.relay.as_mut() {
			relay.finished().await;
		}

		Ok(status)
	}

	/// Forcefully terminate the process and wait for it to exit.
	///
	/// On Unix this kills the server's whole process group, so children left behind by a wrapper
	/// script go too, even once the script itself has exited. Elsewhere it does nothing if the
	/// process has already exited.
	pub async fn kill(&mut self) -> std::io::Result<()> {
		#[cfg(unix)]
		self.kill_group()?;

		#[cfg(not(unix))]
		{
			if !self.is_running()? {
				return Ok(());
			}

			debug!(pid=%self.pid, "killing process");
			self.child.start_kill()?;
		}

		self.child.wait().await.map(drop)
	}

	#[cfg(unix)]
	fn kill_group(&self) -> std::io::Result<()> {
		use nix::{
			errno::Errno,
			sys::signal::{killpg, Signal},
			unistd::Pid,
		};

		let pgid = i32::try_from(self.pid)
			.map(Pid::from_raw)
			.map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "pid out of range"))?;

		debug!(%pgid, "killing process group");
		match killpg(pgid, Signal::SIGKILL) {
			// Nothing left in the group
			Ok(()) | Err(Errno::ESRCH) => Ok(()),
			Err(err) => Err(err.into()),
		}
	}
}
