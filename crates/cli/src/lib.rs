#![deny(rust_2018_idioms)]
#![allow(clippy::missing_const_for_fn, clippy::future_not_send)]

use args::{Args, Command};
use miette::Result;
use tracing::{debug, info, warn};

pub mod args;
mod commands;
mod config;

async fn init() -> Result<(Args, Option<tracing_appender::non_blocking::WorkerGuard>)> {
	let log_on = args::logging::from_env();

	let args = args::get_args();

	let guard = if log_on {
		warn!("ignoring logging options from args");
		None
	} else {
		args::logging::from_args(&args.logging).await?
	};

	Ok((args, guard))
}

pub async fn run() -> Result<()> {
	let (args, _guard) = init().await?;
	info!(version=%env!("CARGO_PKG_VERSION"), "palkeeper starting");
	debug!(?args, "arguments");

	match args.command.clone() {
		Command::Init {
			server_id,
			profile,
			force,
		} => commands::init(&args, &server_id, &profile, force).await,
		Command::Args => commands::args(&args).await,
		Command::Install => commands::install(&args).await,
		Command::Update { validate, custom } => {
			commands::update(&args, validate, custom.as_deref()).await
		}
		Command::Check => commands::check(&args).await,
		Command::Validate => commands::validate(&args).await,
		Command::Import { path } => commands::import(&args, &path).await,
		Command::Run {
			grace,
			kill_timeout,
		} => commands::run(&args, grace.0, kill_timeout.0).await,
	}
}
