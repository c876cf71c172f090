use std::io::{Error, ErrorKind, Result};

use nix::{
	sys::signal::{killpg, Signal},
	unistd::Pid,
};
use tokio::io::AsyncWriteExt;
use tracing::trace;

use super::{Key, Window, WindowMessenger};
use crate::process::ProcessHandle;

/// Unix stand-in for window messaging.
///
/// A live process's "window" is its pid and its piped console input. Closing it sends `SIGTERM`
/// to the server's process group, the closest thing to a polite close request. Typing writes to
/// its stdin.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignalMessenger;

fn pid_of(window: &Window) -> Result<Pid> {
	i32::try_from(window.raw())
		.map(Pid::from_raw)
		.map_err(|_| Error::new(ErrorKind::InvalidInput, "window is not a process id"))
}

fn input_of(window: &mut Window) -> Result<&mut tokio::process::ChildStdin> {
	window
		.input()
		.ok_or_else(|| Error::new(ErrorKind::NotConnected, "process has no console input"))
}

impl WindowMessenger for SignalMessenger {
	fn main_window(&self, process: &mut ProcessHandle) -> Option<Window> {
		if !process.is_running().unwrap_or(false) {
			return None;
		}

		let raw = isize::try_from(process.id()).ok()?;
		Some(Window::from_raw(raw).with_input(process.take_input()))
	}

	async fn close(&self, window: &mut Window) -> Result<()> {
		let pid = pid_of(window)?;
		// The server leads its own group. Wrapper scripts don't always exec the real binary.
		trace!(pgid=%pid, "sending SIGTERM to process group");
		killpg(pid, Signal::SIGTERM).map_err(Error::from)
	}

	async fn send_text(&self, window: &mut Window, text: &str) -> Result<()> {
		let input = input_of(window)?;
		input.write_all(text.as_bytes()).await?;
		input.flush().await
	}

	async fn send_key(&self, window: &mut Window, key: Key) -> Result<()> {
		let input = input_of(window)?;
		match key {
			Key::Enter => input.write_all(b"\n").await?,
		}
		input.flush().await
	}
}
