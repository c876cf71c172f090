use std::{path::Path, sync::Arc, time::Duration};

use miette::{bail, miette, IntoDiagnostic, Report, Result};
use palkeeper_supervisor::{
	installer::{InstallerProcess, SteamCmd},
	profile::ServerProfile,
	relay::{ConsoleSink, TracingSink},
	server::Server,
	window::NativeMessenger,
};
use tokio::{fs, signal::ctrl_c, time::timeout};
use tracing::{debug, info, warn};

use crate::{
	args::Args,
	config::{FileConfig, Settings},
};

type CliServer = Server<SteamCmd, NativeMessenger>;

/// Prints relayed console lines, prefixed with the server id.
#[derive(Clone, Copy, Debug)]
struct PrintSink;

impl ConsoleSink for PrintSink {
	fn append(&self, server_id: &str, line: &str) {
		TracingSink.append(server_id, line);
		println!("[{server_id}] {line}");
	}
}

async fn server(args: &Args) -> Result<CliServer> {
	let settings = Settings::load(args).await?;
	let steamcmd =
		SteamCmd::new(settings.steamcmd, settings.paths.clone()).with_user(settings.steam_user);

	Ok(Server::new(
		settings.server,
		settings.profile,
		settings.paths,
		Arc::new(PrintSink),
		steamcmd,
		NativeMessenger::default(),
	))
}

fn installer_failure(server: &CliServer, what: &str) -> Report {
	server
		.last_error()
		.cloned()
		.map_or_else(|| miette!("{what} failed"), Report::new)
}

async fn finish(mut installer: InstallerProcess, what: &str) -> Result<()> {
	info!(pid=?installer.id(), %what, "steamcmd running");
	let status = installer.wait().await.into_diagnostic()?;
	debug!(%status, %what, "steamcmd exited");

	if status.success() {
		eprintln!("{what} finished");
		Ok(())
	} else {
		bail!("{what} failed: steamcmd {status}")
	}
}

pub async fn init(args: &Args, server_id: &str, profile: &str, force: bool) -> Result<()> {
	let profile = ServerProfile::find(profile)
		.ok_or_else(|| miette!("Unknown server type {profile:?}"))?;

	if !force && fs::try_exists(&args.config).await.into_diagnostic()? {
		bail!(
			"{} already exists, pass --force to overwrite it",
			args.config.display()
		);
	}

	let initial = FileConfig::initial(server_id, profile);
	fs::write(&args.config, initial.to_toml()?)
		.await
		.into_diagnostic()?;
	eprintln!(
		"Wrote {} for {} server {server_id}",
		args.config.display(),
		profile.full_name
	);

	if let Some(base) = initial.server.port().and_then(|port| port.parse::<u16>().ok()) {
		let ports = profile.reserved_ports(base);
		eprintln!(
			"It uses ports {} to {}: give other servers ports outside that range",
			ports.start(),
			ports.end()
		);
	}
	Ok(())
}

pub async fn args(args: &Args) -> Result<()> {
	let server = server(args).await?;
	println!("{}", server.args());
	Ok(())
}

pub async fn install(args: &Args) -> Result<()> {
	let mut server = server(args).await?;
	match server.install().await {
		Some(installer) => finish(installer, "install").await,
		None => Err(installer_failure(&server, "install")),
	}
}

pub async fn update(args: &Args, validate: bool, custom: Option<&str>) -> Result<()> {
	let mut server = server(args).await?;
	match server.update(validate, custom).await {
		Some(installer) => finish(installer, "update").await,
		None => Err(installer_failure(&server, "update")),
	}
}

pub async fn check(args: &Args) -> Result<()> {
	let mut server = server(args).await?;

	let Some(local) = server.local_build() else {
		return Err(installer_failure(&server, "reading the installed build"));
	};
	println!("installed: {local}");

	let Some(remote) = server.remote_build().await else {
		return Err(installer_failure(&server, "querying the published build"));
	};
	println!("published: {remote}");

	if local == remote {
		println!("up to date");
	} else {
		println!("update available");
	}
	Ok(())
}

pub async fn validate(args: &Args) -> Result<()> {
	let server = server(args).await?;
	let exe = server.executable();

	if server.is_install_valid() {
		eprintln!("{} is installed ({})", server.profile().full_name, exe.display());
		Ok(())
	} else {
		bail!(
			"{} not found ({})",
			server.profile().executable_name(),
			exe.display()
		)
	}
}

pub async fn import(args: &Args, path: &Path) -> Result<()> {
	let mut server = server(args).await?;

	if server.is_import_valid(path) {
		eprintln!("{} can be imported", path.display());
		Ok(())
	} else {
		Err(miette!(
			"{}",
			server.import_error().unwrap_or("Invalid Path!")
		))
	}
}

pub async fn run(args: &Args, grace: Duration, kill_timeout: Duration) -> Result<()> {
	let server = server(args).await?.with_grace(grace);
	let mut process = server.start()?;
	info!(pid=%process.id(), mode=?process.mode(), "server started");
	eprintln!(
		"{} started (pid {}), press Ctrl-C to stop it",
		server.profile().full_name,
		process.id()
	);

	tokio::select! {
		status = process.wait() => {
			let status = status.into_diagnostic()?;
			return if status.success() {
				eprintln!("server exited");
				Ok(())
			} else {
				Err(miette!("server exited with {status}"))
			};
		}
		signal = ctrl_c() => {
			signal.into_diagnostic()?;
		}
	}

	eprintln!("stopping server...");
	let outcome = server.stop(&mut process).await;
	debug!(?outcome, "stop protocol finished");
	if !outcome.is_reachable() {
		warn!("server could not be reached, it may not stop on its own");
	}

	match timeout(kill_timeout, process.wait()).await {
		Ok(status) => {
			let status = status.into_diagnostic()?;
			eprintln!("server stopped ({status})");
		}
		Err(_) => {
			warn!(timeout=?kill_timeout, "server still running, killing it");
			process.kill().await.into_diagnostic()?;
			eprintln!("server killed");
		}
	}

	Ok(())
}
