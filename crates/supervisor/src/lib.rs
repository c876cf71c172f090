//! Palkeeper's dedicated server supervisor.
//!
//! This crate launches a game's dedicated server from its configuration, relays its console
//! output, asks it to stop the way that server type expects, and installs or updates its files
//! through SteamCMD.
//!
//! # Usage
//!
//! Most hosts only need [`Server`](server::Server), which ties one [`ServerConfig`] to a
//! [`ServerProfile`](profile::ServerProfile) and holds the machinery to run and maintain it. The
//! parts are usable on their own:
//!
//! - [`build_args`](command::build_args) turns a configuration into the server's argument string;
//! - the [`Launcher`](launcher::Launcher) starts the executable and, for
//!   [`Embedded`](profile::LaunchMode::Embedded) servers, relays output to a
//!   [`ConsoleSink`](relay::ConsoleSink);
//! - the [`StopCoordinator`](shutdown::StopCoordinator) runs the stop protocol through a
//!   [`WindowMessenger`](window::WindowMessenger);
//! - the [`InstallOrchestrator`](installer::InstallOrchestrator) drives a
//!   [`PackageFetcher`](installer::PackageFetcher) such as [`SteamCmd`](installer::SteamCmd);
//! - [`validate`] checks that server files are present.
//!
//! # Theory of Operation
//!
//! There is exactly one process per configuration and no registry: [`start()`] returns a
//! [`ProcessHandle`](process::ProcessHandle), the host owns it, and lends it back by `&mut` to
//! [`stop()`]. Stopping is always cooperative. Standalone servers have their main window closed;
//! embedded servers have `quit` typed into their console and are then given a grace period. The
//! supervisor itself never kills anything; the host may, with
//! [`ProcessHandle::kill()`](process::ProcessHandle::kill), once it has given up waiting.
//!
//! [`start()`]: server::Server::start
//! [`stop()`]: server::Server::stop
//!
//! # Example
//!
//! ```no_run
//! # #[tokio::main(flavor = "current_thread")] async fn main() { // single-threaded for doctest only
//! use std::sync::Arc;
//! use palkeeper_supervisor::{
//!     ServerConfig,
//!     installer::SteamCmd,
//!     paths::ServerPaths,
//!     profile::PALWORLD,
//!     relay::TracingSink,
//!     server::Server,
//!     window::NativeMessenger,
//! };
//!
//! let paths = ServerPaths::new("/srv/palkeeper");
//! let server = Server::new(
//!     ServerConfig::defaults_for("1", &PALWORLD),
//!     &PALWORLD,
//!     paths.clone(),
//!     Arc::new(TracingSink),
//!     SteamCmd::new("steamcmd", paths),
//!     NativeMessenger::default(),
//! );
//!
//! let mut process = server.start().unwrap();
//! let outcome = server.stop(&mut process).await;
//! println!("{outcome:?}");
//! # }
//! ```

#![warn(clippy::unwrap_used, rustdoc::unescaped_backticks)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(rust_2018_idioms)]

#[doc(no_inline)]
pub use config::ServerConfig;

pub mod command;
pub mod config;
pub mod errors;
pub mod installer;
pub mod launcher;
pub mod paths;
pub mod process;
pub mod profile;
pub mod relay;
pub mod server;
pub mod shutdown;
pub mod validate;
pub mod window;
