//! Command-line construction for the supervised server.
//!
//! [`build_args`] turns a [`ServerConfig`](crate::config::ServerConfig) into the argument
//! string the server expects. That string is written for the Windows command-line parser; on
//! Windows it is handed to the OS verbatim, elsewhere it goes through [`split_command_line`]
//! first so the server sees the same arguments either way.

#[doc(inline)]
pub use self::{args::build_args, split::split_command_line};

mod args;
mod spawnable;
mod split;

pub(crate) use spawnable::to_spawnable;
