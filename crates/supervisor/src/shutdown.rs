//! The stop protocol.
//!
//! Servers are asked to stop, never made to. How they're asked depends on how they were
//! launched:
//!
//! - [`Standalone`](LaunchMode::Standalone) servers own a visible console window. Closing it is
//!   the polite request, and nothing more is done.
//! - [`Embedded`](LaunchMode::Embedded) servers are told to `quit` on their console, then given a
//!   grace period to save and exit.
//!
//! If the process turns out to have no reachable main window, the messaging steps are skipped.
//! That's not an error: the outcome says so, and the host decides what to do next.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{
	process::ProcessHandle,
	profile::LaunchMode,
	window::{Key, Window, WindowMessenger},
};

/// The grace period given to embedded servers after the quit command.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(6);

/// The command typed into an embedded server's console.
pub const QUIT_COMMAND: &str = "quit";

/// A stage of the stop protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopStage {
	/// The process was running when the protocol began.
	Running,

	/// The close-window request was delivered.
	SignalSent,

	/// The quit command was typed.
	QuitTyped,

	/// Enter was pressed after the quit command.
	EnterPressed,

	/// The grace period was waited out.
	Waiting,

	/// The protocol has finished. This says nothing about whether the process has exited.
	Terminal,
}

/// What a stop did.
///
/// Every variant lists the stages that completed, in order. Messaging steps that failed are
/// logged and left out of the list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopOutcome {
	/// A standalone server's window was asked to close.
	CloseRequested { stages: Vec<StopStage> },

	/// An embedded server's console was reached with the quit command.
	QuitSent { stages: Vec<StopStage> },

	/// The process had no reachable main window, so nothing was sent.
	Unreachable { stages: Vec<StopStage> },
}

impl StopOutcome {
	/// The stages that completed, in order.
	#[must_use]
	pub fn stages(&self) -> &[StopStage] {
		match self {
			Self::CloseRequested { stages }
			| Self::QuitSent { stages }
			| Self::Unreachable { stages } => stages,
		}
	}

	/// Whether the process's main window was found.
	#[must_use]
	pub const fn is_reachable(&self) -> bool {
		!matches!(self, Self::Unreachable { .. })
	}
}

/// Runs the stop protocol through a [`WindowMessenger`].
#[derive(Clone, Debug)]
pub struct StopCoordinator<M> {
	messenger: M,
	grace: Duration,
}

impl<M: WindowMessenger> StopCoordinator<M> {
	/// A coordinator with the default grace period.
	pub fn new(messenger: M) -> Self {
		Self {
			messenger,
			grace: DEFAULT_GRACE,
		}
	}

	/// Change the grace period given to embedded servers.
	#[must_use]
	pub fn with_grace(mut self, grace: Duration) -> Self {
		self.grace = grace;
		self
	}

	/// The grace period given to embedded servers.
	#[must_use]
	pub const fn grace(&self) -> Duration {
		self.grace
	}

	pub const fn messenger(&self) -> &M {
		&self.messenger
	}

	/// Ask the process to stop.
	///
	/// For an embedded server this always takes at least the grace period, reachable or not. It
	/// never kills the process and never fails.
	pub async fn stop(&self, process: &mut ProcessHandle) -> StopOutcome {
		let mode = process.mode();
		let mut window = self.messenger.main_window(process);
		debug!(pid=%process.id(), ?mode, found=%window.is_some(), "stopping server");
		let outcome = self.drive(mode, window.as_mut()).await;

		if let Some(input) = window.and_then(Window::into_input) {
			process.restore_input(input);
		}

		outcome
	}

	async fn drive(&self, mode: LaunchMode, window: Option<&mut Window>) -> StopOutcome {
		let mut stages = vec![StopStage::Running];
		let reachable = window.is_some();

		match (mode, window) {
			(LaunchMode::Standalone, Some(window)) => {
				match self.messenger.close(window).await {
					Ok(()) => {
						debug!(stage=?StopStage::SignalSent, "asked window to close");
						stages.push(StopStage::SignalSent);
					}
					Err(err) => warn!(%err, "could not close server window"),
				}
			}
			(LaunchMode::Standalone, None) => {
				debug!("no window to close");
			}
			(LaunchMode::Embedded, window) => {
				if let Some(window) = window {
					self.type_quit(window, &mut stages).await;
				} else {
					debug!("no console to type into");
				}

				debug!(grace=?self.grace, "waiting for server to exit");
				sleep(self.grace).await;
				stages.push(StopStage::Waiting);
			}
		}

		stages.push(StopStage::Terminal);
		match (reachable, mode) {
			(false, _) => StopOutcome::Unreachable { stages },
			(true, LaunchMode::Standalone) => StopOutcome::CloseRequested { stages },
			(true, LaunchMode::Embedded) => StopOutcome::QuitSent { stages },
		}
	}

	async fn type_quit(&self, window: &mut Window, stages: &mut Vec<StopStage>) {
		match self.messenger.send_text(window, QUIT_COMMAND).await {
			Ok(()) => {
				debug!(stage=?StopStage::QuitTyped, "typed quit command");
				stages.push(StopStage::QuitTyped);
			}
			Err(err) => warn!(%err, "could not type quit command"),
		}

		match self.messenger.send_key(window, Key::Enter).await {
			Ok(()) => {
				debug!(stage=?StopStage::EnterPressed, "pressed enter");
				stages.push(StopStage::EnterPressed);
			}
			Err(err) => warn!(%err, "could not press enter"),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::{
		io::{Error, ErrorKind},
		sync::{Arc, Mutex},
	};

	use tokio::time::Instant;

	use super::*;

	#[derive(Clone, Debug, PartialEq, Eq)]
	enum Call {
		Close,
		Text(String),
		Key(Key),
	}

	#[derive(Clone, Debug, Default)]
	struct TestMessenger {
		calls: Arc<Mutex<Vec<Call>>>,
		fail_text: bool,
	}

	impl TestMessenger {
		fn calls(&self) -> Vec<Call> {
			self.calls.lock().unwrap().clone()
		}
	}

	impl WindowMessenger for TestMessenger {
		fn main_window(&self, _process: &mut ProcessHandle) -> Option<Window> {
			unreachable!("tests drive the protocol directly")
		}

		async fn close(&self, _window: &mut Window) -> std::io::Result<()> {
			self.calls.lock().unwrap().push(Call::Close);
			Ok(())
		}

		async fn send_text(&self, _window: &mut Window, text: &str) -> std::io::Result<()> {
			self.calls.lock().unwrap().push(Call::Text(text.into()));
			if self.fail_text {
				Err(Error::new(ErrorKind::BrokenPipe, "console went away"))
			} else {
				Ok(())
			}
		}

		async fn send_key(&self, _window: &mut Window, key: Key) -> std::io::Result<()> {
			self.calls.lock().unwrap().push(Call::Key(key));
			Ok(())
		}
	}

	#[tokio::test(start_paused = true)]
	async fn embedded_types_quit_then_waits() {
		let messenger = TestMessenger::default();
		let coordinator = StopCoordinator::new(messenger.clone());

		let started = Instant::now();
		let outcome = coordinator
			.drive(LaunchMode::Embedded, Some(&mut Window::from_raw(1)))
			.await;

		assert!(started.elapsed() >= DEFAULT_GRACE);
		assert_eq!(
			messenger.calls(),
			vec![Call::Text("quit".into()), Call::Key(Key::Enter)]
		);
		assert_eq!(
			outcome,
			StopOutcome::QuitSent {
				stages: vec![
					StopStage::Running,
					StopStage::QuitTyped,
					StopStage::EnterPressed,
					StopStage::Waiting,
					StopStage::Terminal,
				]
			}
		);
	}

	#[tokio::test(start_paused = true)]
	async fn embedded_unreachable_still_waits() {
		let messenger = TestMessenger::default();
		let coordinator = StopCoordinator::new(messenger.clone());

		let started = Instant::now();
		let outcome = coordinator.drive(LaunchMode::Embedded, None).await;

		assert!(started.elapsed() >= DEFAULT_GRACE);
		assert!(messenger.calls().is_empty());
		assert!(!outcome.is_reachable());
		assert_eq!(
			outcome.stages(),
			[StopStage::Running, StopStage::Waiting, StopStage::Terminal]
		);
	}

	#[tokio::test(start_paused = true)]
	async fn grace_is_configurable() {
		let coordinator =
			StopCoordinator::new(TestMessenger::default()).with_grace(Duration::from_secs(30));

		let started = Instant::now();
		coordinator
			.drive(LaunchMode::Embedded, Some(&mut Window::from_raw(1)))
			.await;

		assert!(started.elapsed() >= Duration::from_secs(30));
	}

	#[tokio::test(start_paused = true)]
	async fn standalone_closes_and_returns_promptly() {
		let messenger = TestMessenger::default();
		let coordinator = StopCoordinator::new(messenger.clone());

		let started = Instant::now();
		let outcome = coordinator
			.drive(LaunchMode::Standalone, Some(&mut Window::from_raw(1)))
			.await;

		assert!(started.elapsed() < Duration::from_secs(1));
		assert_eq!(messenger.calls(), vec![Call::Close]);
		assert_eq!(
			outcome,
			StopOutcome::CloseRequested {
				stages: vec![
					StopStage::Running,
					StopStage::SignalSent,
					StopStage::Terminal
				]
			}
		);
	}

	#[tokio::test(start_paused = true)]
	async fn standalone_unreachable_sends_nothing() {
		let messenger = TestMessenger::default();
		let coordinator = StopCoordinator::new(messenger.clone());

		let outcome = coordinator.drive(LaunchMode::Standalone, None).await;

		assert!(messenger.calls().is_empty());
		assert_eq!(
			outcome,
			StopOutcome::Unreachable {
				stages: vec![StopStage::Running, StopStage::Terminal]
			}
		);
	}

	#[tokio::test(start_paused = true)]
	async fn failed_step_does_not_stop_protocol() {
		let messenger = TestMessenger {
			fail_text: true,
			..Default::default()
		};
		let coordinator = StopCoordinator::new(messenger.clone());

		let outcome = coordinator
			.drive(LaunchMode::Embedded, Some(&mut Window::from_raw(1)))
			.await;

		assert_eq!(
			messenger.calls(),
			vec![Call::Text("quit".into()), Call::Key(Key::Enter)]
		);
		assert_eq!(
			outcome.stages(),
			[
				StopStage::Running,
				StopStage::EnterPressed,
				StopStage::Waiting,
				StopStage::Terminal
			]
		);
		assert!(outcome.is_reachable());
	}
}
