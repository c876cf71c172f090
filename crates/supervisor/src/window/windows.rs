use std::{
	io::{Error, Result},
	ptr::null_mut,
	time::Duration,
};

use tokio::time::sleep;
use tracing::{debug, trace};
use windows_sys::Win32::{
	Foundation::{BOOL, HWND, LPARAM},
	UI::WindowsAndMessaging::{
		EnumWindows, GetWindow, GetWindowThreadProcessId, IsWindowVisible, PostMessageW,
		ShowWindow, GW_OWNER, SW_HIDE, SW_SHOWMINNOACTIVE, WM_CHAR, WM_CLOSE,
	},
};

use super::{Key, Window, WindowMessenger};
use crate::{process::ProcessHandle, profile::LaunchMode};

const WINDOW_POLL: Duration = Duration::from_millis(50);
const WINDOW_POLLS: usize = 100;

const CARRIAGE_RETURN: usize = 0x0D;

/// Win32 window messaging.
///
/// The main window of a process is its first visible top-level window without an owner, falling
/// back to any unowned top-level window. Text and keys are posted to the window as `WM_CHAR`
/// messages, so they land in the server's console whether or not it has focus, and never in
/// whatever window the operator is using.
#[derive(Clone, Copy, Debug, Default)]
pub struct Win32Messenger;

struct Search {
	pid: u32,
	visible: HWND,
	hidden: HWND,
}

unsafe extern "system" fn visit(hwnd: HWND, lparam: LPARAM) -> BOOL {
	let search = &mut *(lparam as *mut Search);

	let mut owner = 0_u32;
	GetWindowThreadProcessId(hwnd, &mut owner);
	if owner != search.pid || !GetWindow(hwnd, GW_OWNER).is_null() {
		return 1;
	}

	if IsWindowVisible(hwnd) != 0 {
		search.visible = hwnd;
		return 0;
	}

	if search.hidden.is_null() {
		search.hidden = hwnd;
	}
	1
}

fn find_main_window(pid: u32) -> Option<isize> {
	let mut search = Search {
		pid,
		visible: null_mut(),
		hidden: null_mut(),
	};

	unsafe {
		EnumWindows(Some(visit), &mut search as *mut Search as LPARAM);
	}

	let found = if search.visible.is_null() {
		search.hidden
	} else {
		search.visible
	};

	(!found.is_null()).then_some(found as isize)
}

fn hwnd(window: &Window) -> HWND {
	window.raw() as HWND
}

fn post_chars(window: &Window, units: impl IntoIterator<Item = usize>) -> Result<()> {
	for unit in units {
		if unsafe { PostMessageW(hwnd(window), WM_CHAR, unit, 0) } == 0 {
			return Err(Error::last_os_error());
		}
	}

	Ok(())
}

/// Give a freshly spawned server's console window the state its launch mode calls for.
///
/// Standalone windows are minimised without taking focus; embedded ones are hidden, as their
/// output is relayed instead. The console window appears some time after the process does, so
/// this polls for it in the background.
pub(crate) fn apply_launch_mode(pid: u32, mode: LaunchMode) {
	let show = match mode {
		LaunchMode::Standalone => SW_SHOWMINNOACTIVE,
		LaunchMode::Embedded => SW_HIDE,
	};

	tokio::spawn(async move {
		for _ in 0..WINDOW_POLLS {
			if let Some(raw) = find_main_window(pid) {
				unsafe {
					ShowWindow(raw as HWND, show);
				}
				trace!(%pid, hwnd=%raw, ?mode, "applied window state");
				return;
			}

			sleep(WINDOW_POLL).await;
		}

		debug!(%pid, ?mode, "server window did not appear, leaving it as it is");
	});
}

impl WindowMessenger for Win32Messenger {
	fn main_window(&self, process: &mut ProcessHandle) -> Option<Window> {
		let found = find_main_window(process.id())?;
		trace!(pid=%process.id(), hwnd=%found, "found main window");
		Some(Window::from_raw(found))
	}

	async fn close(&self, window: &mut Window) -> Result<()> {
		if unsafe { PostMessageW(hwnd(window), WM_CLOSE, 0, 0) } == 0 {
			Err(Error::last_os_error())
		} else {
			Ok(())
		}
	}

	async fn send_text(&self, window: &mut Window, text: &str) -> Result<()> {
		post_chars(window, text.encode_utf16().map(usize::from))
	}

	async fn send_key(&self, window: &mut Window, key: Key) -> Result<()> {
		let unit = match key {
			Key::Enter => CARRIAGE_RETURN,
		};

		post_chars(window, [unit])
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use tokio::time::{timeout, Duration};
	use windows_sys::Win32::UI::WindowsAndMessaging::IsIconic;

	use super::*;
	use crate::command::to_spawnable;

	fn shell() -> PathBuf {
		std::env::var_os("ComSpec").map_or_else(
			|| PathBuf::from(r"C:\Windows\System32\cmd.exe"),
			PathBuf::from,
		)
	}

	async fn window_of(pid: u32, state: impl Fn(HWND) -> bool) -> bool {
		timeout(Duration::from_secs(10), async {
			loop {
				if let Some(raw) = find_main_window(pid) {
					if state(raw as HWND) {
						return;
					}
				}
				sleep(WINDOW_POLL).await;
			}
		})
		.await
		.is_ok()
	}

	#[tokio::test]
	async fn standalone_console_is_minimised() {
		let mut child = to_spawnable(&shell(), "/k", LaunchMode::Standalone)
			.spawn()
			.unwrap();
		let pid = child.id().unwrap();
		apply_launch_mode(pid, LaunchMode::Standalone);

		let minimised = window_of(pid, |hwnd| unsafe { IsIconic(hwnd) } != 0).await;
		child.kill().await.unwrap();
		assert!(minimised);
	}

	#[tokio::test]
	async fn embedded_console_is_hidden() {
		let mut child = to_spawnable(&shell(), "/k", LaunchMode::Embedded)
			.spawn()
			.unwrap();
		let pid = child.id().unwrap();
		apply_launch_mode(pid, LaunchMode::Embedded);

		let hidden = window_of(pid, |hwnd| unsafe { IsWindowVisible(hwnd) } == 0).await;
		child.kill().await.unwrap();
		assert!(hidden);
	}

	#[tokio::test]
	async fn typing_into_a_gone_window_fails() {
		let mut window = Window::from_raw(0x7fff_fff0);
		assert!(Win32Messenger.send_text(&mut window, "quit").await.is_err());
		assert!(Win32Messenger.send_key(&mut window, Key::Enter).await.is_err());
	}
}
