//! Talking to a server's main window.
//!
//! The stop protocol needs three things from the platform: find the main window of a process,
//! close it, and type into it. Every call takes the [`Window`] explicitly; there's no notion of a
//! "currently targeted" window anywhere.

use std::future::Future;

use tokio::process::ChildStdin;

use crate::process::ProcessHandle;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
#[doc(inline)]
pub use unix::SignalMessenger;
#[cfg(windows)]
pub(crate) use windows::apply_launch_mode;
#[cfg(windows)]
#[doc(inline)]
pub use windows::Win32Messenger;

/// The messenger for the current platform.
#[cfg(unix)]
pub type NativeMessenger = SignalMessenger;

/// The messenger for the current platform.
#[cfg(windows)]
pub type NativeMessenger = Win32Messenger;

/// A process's main window.
///
/// On Windows this is a window handle. On Unix there are no windows: it's the process id, plus
/// the process's piped console input when it has one.
#[derive(Debug)]
pub struct Window {
	raw: isize,
	input: Option<ChildStdin>,
}

impl Window {
	/// Wrap a raw platform handle.
	#[must_use]
	pub const fn from_raw(raw: isize) -> Self {
		Self { raw, input: None }
	}

	/// Attach console input to type into.
	#[must_use]
	pub fn with_input(mut self, input: Option<ChildStdin>) -> Self {
		self.input = input;
		self
	}

	/// The raw platform handle.
	#[must_use]
	pub const fn raw(&self) -> isize {
		self.raw
	}

	/// Give up the attached console input.
	#[must_use]
	pub fn into_input(self) -> Option<ChildStdin> {
		self.input
	}

	#[cfg_attr(windows, allow(dead_code))]
	pub(crate) fn input(&mut self) -> Option<&mut ChildStdin> {
		self.input.as_mut()
	}
}

/// Keys the stop protocol can press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
	Enter,
}

/// The window-messaging boundary.
pub trait WindowMessenger: Send + Sync {
	/// Find the main window of a process.
	///
	/// `None` means the process can't be reached this way (it never created a window, or it has
	/// already gone).
	fn main_window(&self, process: &mut ProcessHandle) -> Option<Window>;

	/// Ask the window to close, the way a user clicking its close button would.
	fn close(&self, window: &mut Window) -> impl Future<Output = std::io::Result<()>> + Send;

	/// Type literal text into the window.
	fn send_text(
		&self,
		window: &mut Window,
		text: &str,
	) -> impl Future<Output = std::io::Result<()>> + Send;

	/// Press a key in the window.
	fn send_key(
		&self,
		window: &mut Window,
		key: Key,
	) -> impl Future<Output = std::io::Result<()>> + Send;
}
