#![cfg(unix)]

use std::{
	fs, io::ErrorKind, os::unix::fs::PermissionsExt, path::PathBuf, sync::Arc, time::Duration,
};

use palkeeper_supervisor::{
	errors::StartError,
	installer::SteamCmd,
	paths::ServerPaths,
	profile::{LaunchMode, ServerProfile, PALWORLD},
	relay::ConsoleLine,
	server::Server,
	shutdown::{StopOutcome, StopStage},
	window::SignalMessenger,
	ServerConfig,
};
use tempfile::TempDir;
use tokio::{
	sync::mpsc,
	time::{sleep, timeout},
};

static STANDALONE: ServerProfile = ServerProfile {
	name: "standalone",
	launch_mode: LaunchMode::Standalone,
	..PALWORLD
};

struct Fixture {
	_dir: TempDir,
	server: Server<SteamCmd, SignalMessenger>,
	lines: mpsc::UnboundedReceiver<ConsoleLine>,
}

impl Fixture {
	fn new(profile: &'static ServerProfile, config: ServerConfig, script: Option<&str>) -> Self {
		let dir = tempfile::tempdir().unwrap();
		let paths = ServerPaths::new(dir.path());

		if let Some(body) = script {
			let exe = paths.executable(&config.server_id, profile);
			fs::create_dir_all(exe.parent().unwrap()).unwrap();
			fs::write(&exe, format!("#!/bin/sh\n{body}\n")).unwrap();
			fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
		}

		let (sink, lines) = mpsc::unbounded_channel();
		let server = Server::new(
			config,
			profile,
			paths.clone(),
			Arc::new(sink),
			SteamCmd::new("steamcmd", paths),
			SignalMessenger,
		)
		.with_grace(Duration::from_millis(300));

		Self {
			_dir: dir,
			server,
			lines,
		}
	}

	fn server_dir(&self) -> PathBuf {
		self.server.executable().parent().unwrap().to_owned()
	}

	fn lines(&mut self) -> Vec<String> {
		let mut out = Vec::new();
		while let Ok(line) = self.lines.try_recv() {
			assert_eq!(line.server_id, self.server.config().server_id);
			out.push(line.line);
		}
		out
	}
}

fn config() -> ServerConfig {
	ServerConfig {
		server_id: "1".into(),
		..Default::default()
	}
}

#[tokio::test]
async fn embedded_output_is_relayed() {
	let mut fx = Fixture::new(
		&PALWORLD,
		ServerConfig {
			session_name: Some("My Server".into()),
			max_players: Some("8".into()),
			..config()
		},
		Some(r#"for a in "$@"; do echo "arg=$a"; done; echo oops >&2"#),
	);

	let mut process = fx.server.start().unwrap();
	assert!(process.wait().await.unwrap().success());

	let lines = fx.lines();
	assert_eq!(lines.len(), 3);
	let stdout: Vec<_> = lines.iter().filter(|l| l.starts_with("arg=")).collect();
	assert_eq!(
		stdout,
		[
			r#"arg=?listen?SessionName="My Server"?MaxPlayers=8"#,
			"arg=-WinLiveMaxPlayers=8"
		]
	);
	assert!(lines.contains(&"oops".to_string()));
}

#[tokio::test]
async fn embedded_server_quits_on_command() {
	let mut fx = Fixture::new(
		&PALWORLD,
		config(),
		Some(
			r#"echo ready
while read line; do
	if [ "$line" = quit ]; then echo bye; exit 0; fi
done
exit 1"#,
		),
	);

	let mut process = fx.server.start().unwrap();
	let outcome = fx.server.stop(&mut process).await;
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

	let status = timeout(Duration::from_secs(5), process.wait())
		.await
		.unwrap()
		.unwrap();
	assert!(status.success());
	assert_eq!(fx.lines(), ["ready", "bye"]);
}

#[tokio::test]
async fn stopping_an_exited_server_is_unreachable() {
	let fx = Fixture::new(&PALWORLD, config(), Some("exit 0"));

	let mut process = fx.server.start().unwrap();
	process.wait().await.unwrap();

	let outcome = fx.server.stop(&mut process).await;
	assert!(!outcome.is_reachable());
	assert!(outcome.stages().contains(&StopStage::Waiting));
}

#[tokio::test]
async fn standalone_window_is_closed() {
	let fx = Fixture::new(
		&STANDALONE,
		config(),
		Some("trap 'exit 0' TERM\nwhile true; do sleep 0.1; done"),
	);

	let mut process = fx.server.start().unwrap();
	assert!(process.relay().is_none());

	let outcome = timeout(Duration::from_secs(1), fx.server.stop(&mut process))
		.await
		.unwrap();
	assert!(matches!(outcome, StopOutcome::CloseRequested { .. }));

	let status = timeout(Duration::from_secs(5), process.wait())
		.await
		.unwrap()
		.unwrap();
	assert!(status.success());
}

#[tokio::test]
async fn missing_executable_is_reported() {
	let fx = Fixture::new(&PALWORLD, config(), None);

	match fx.server.start() {
		Err(StartError::ExecutableNotFound { file, path }) => {
			assert_eq!(file, "PalServer.sh");
			assert_eq!(path, fx.server.executable());
			assert!(!fx.server.is_install_valid());
		}
		other => panic!("expected ExecutableNotFound, got {other:?}"),
	}
}

#[tokio::test]
async fn host_can_kill_after_stop() {
	let fx = Fixture::new(&PALWORLD, config(), Some("trap '' TERM\nwhile true; do sleep 0.1; done"));

	let mut process = fx.server.start().unwrap();
	fx.server.stop(&mut process).await;
	assert!(process.is_running().unwrap());

	process.kill().await.unwrap();
	assert!(!process.is_running().unwrap());
}

#[tokio::test]
async fn non_executable_file_fails_to_launch() {
	let fx = Fixture::new(&PALWORLD, config(), None);
	let exe = fx.server.executable();
	fs::create_dir_all(exe.parent().unwrap()).unwrap();
	fs::write(&exe, "#!/bin/sh\nexit 0\n").unwrap();
	fs::set_permissions(&exe, fs::Permissions::from_mode(0o644)).unwrap();

	match fx.server.start() {
		Err(StartError::LaunchFailed { path, err }) => {
			assert_eq!(path, exe);
			assert_eq!(err.kind(), ErrorKind::PermissionDenied);
		}
		other => panic!("expected LaunchFailed, got {other:?}"),
	}
}

#[tokio::test]
async fn close_reaches_server_behind_wrapper_script() {
	// The wrapper runs the server as a child, without exec
	let fx = Fixture::new(
		&STANDALONE,
		config(),
		Some(
			"(trap 'echo closed > closed; exit 0' TERM; while true; do sleep 0.1; done) &\nwait",
		),
	);

	let mut process = fx.server.start().unwrap();
	let outcome = fx.server.stop(&mut process).await;
	assert!(matches!(outcome, StopOutcome::CloseRequested { .. }));

	let marker = fx.server_dir().join("closed");
	let closed = timeout(Duration::from_secs(5), async {
		while !marker.exists() {
			sleep(Duration::from_millis(50)).await;
		}
	})
	.await;
	assert!(closed.is_ok(), "server behind the wrapper never got the close request");
	process.kill().await.unwrap();
}

#[tokio::test]
async fn kill_reaches_children_left_by_wrapper() {
	// The script exits straight away; its child keeps the console open
	let mut fx = Fixture::new(&PALWORLD, config(), Some("sleep 30 &\necho started"));

	let mut process = fx.server.start().unwrap();
	assert!(timeout(Duration::from_millis(500), process.wait())
		.await
		.is_err());

	process.kill().await.unwrap();
	let status = timeout(Duration::from_secs(5), process.wait()).await;
	assert!(status.is_ok(), "console stayed open after kill");
	assert_eq!(fx.lines(), ["started"]);
}

#[tokio::test]
async fn console_input_survives_a_stop() {
	let mut fx = Fixture::new(
		&PALWORLD,
		config(),
		Some(
			r#"n=0
while read line; do
	n=$((n+1))
	echo "$line $n"
	if [ $n = 2 ]; then exit 0; fi
done
echo eof
exit 1"#,
		),
	);

	let mut process = fx.server.start().unwrap();

	let first = fx.server.stop(&mut process).await;
	assert!(first.stages().contains(&StopStage::QuitTyped));
	assert!(process.is_running().unwrap());

	let second = fx.server.stop(&mut process).await;
	assert!(second.stages().contains(&StopStage::QuitTyped));

	let status = timeout(Duration::from_secs(5), process.wait())
		.await
		.unwrap()
		.unwrap();
	assert!(status.success());
	assert_eq!(fx.lines(), ["quit 1", "quit 2"]);
}
