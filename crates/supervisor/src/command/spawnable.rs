use std::{path::Path, process::Stdio};

use tokio::process::Command as TokioCommand;
use tracing::trace;

use crate::profile::LaunchMode;

/// `CREATE_NEW_CONSOLE`: the server gets a console window of its own. The launcher then
/// minimises or hides it, depending on the launch mode.
#[cfg(windows)]
const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;

/// Obtain a [`tokio::process::Command`] for the server executable.
///
/// No shell is involved on any platform.
pub fn to_spawnable(prog: &Path, args: &str, mode: LaunchMode) -> TokioCommand {
	trace!(prog=?prog, %args, ?mode, "constructing command");

	let mut cmd = TokioCommand::new(prog);

	#[cfg(windows)]
	{
		// The argument string is already quoted for the Windows parser
		cmd.raw_arg(args);
		cmd.creation_flags(CREATE_NEW_CONSOLE);
	}

	#[cfg(not(windows))]
	cmd.args(super::split_command_line(args));

	if let Some(dir) = prog.parent() {
		cmd.current_dir(dir);
	}

	if mode == LaunchMode::Embedded {
		cmd.stdout(Stdio::piped());
		cmd.stderr(Stdio::piped());

		// No console window to type into here: the quit command goes through stdin instead.
		#[cfg(unix)]
		cmd.stdin(Stdio::piped());
	}

	#[cfg(unix)]
	{
		// Keep the server out of our foreground process group, so a Ctrl-C at the terminal
		// reaches the supervisor, which then runs the stop protocol, and not the server directly.
		cmd.process_group(0);

		// Resets the sigmask of the process before we spawn it, as the runtime may have blocked
		// signals the server relies on.
		use nix::sys::signal::{sigprocmask, SigSet, SigmaskHow, Signal};
		unsafe {
			cmd.pre_exec(|| {
				let mut oldset = SigSet::empty();
				let mut newset = SigSet::all();
				newset.remove(Signal::SIGHUP); // leave SIGHUP alone so nohup works
				sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&newset), Some(&mut oldset))?;
				Ok(())
			});
		}
	}

	cmd
}
