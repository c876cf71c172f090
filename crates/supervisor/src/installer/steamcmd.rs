use std::{
	ffi::OsString,
	io::ErrorKind,
	path::{Path, PathBuf},
	process::Stdio,
};

use tokio::{fs, process::Command};
use tracing::{debug, trace};

use super::{BuildId, InstallerProcess, PackageFetcher};
use crate::{command::split_command_line, errors::InstallerError, paths::ServerPaths};

/// Fetches server files with Valve's `steamcmd`.
///
/// Install and update hand back the running `steamcmd`; its output goes wherever the host's
/// output goes.
#[derive(Clone, Debug)]
pub struct SteamCmd {
	exe: PathBuf,
	paths: ServerPaths,
	user: Option<String>,
}

impl SteamCmd {
	/// Use the `steamcmd` at `exe` (or found in `PATH`, if it's a bare name).
	pub fn new(exe: impl Into<PathBuf>, paths: ServerPaths) -> Self {
		Self {
			exe: exe.into(),
			paths,
			user: None,
		}
	}

	/// Steam account for server types that can't be fetched anonymously.
	#[must_use]
	pub fn with_user(mut self, user: Option<String>) -> Self {
		self.user = user;
		self
	}

	#[must_use]
	pub fn exe(&self) -> &Path {
		&self.exe
	}

	fn login(&self, anonymous: bool) -> Result<&str, InstallerError> {
		if anonymous {
			return Ok("anonymous");
		}

		self.user
			.as_deref()
			.filter(|user| !user.trim().is_empty())
			.ok_or_else(|| InstallerError::new("this server needs a Steam account: set steam_user"))
	}

	async fn prepare(&self, server_id: &str) -> Result<PathBuf, InstallerError> {
		let root = self.paths.server_files(server_id);
		fs::create_dir_all(&root)
			.await
			.map_err(|err| InstallerError::io(&format!("creating {}", root.display()), &err))?;
		Ok(root)
	}

	fn spawn(&self, args: Vec<OsString>) -> Result<InstallerProcess, InstallerError> {
		debug!(exe=?self.exe, ?args, "running steamcmd");
		let child = Command::new(&self.exe)
			.args(args)
			.stdin(Stdio::null())
			.spawn()
			.map_err(|err| self.spawn_error(&err))?;
		Ok(InstallerProcess::new(child))
	}

	fn spawn_error(&self, err: &std::io::Error) -> InstallerError {
		if err.kind() == ErrorKind::NotFound {
			InstallerError::new(format!("steamcmd not found ({})", self.exe.display()))
		} else {
			InstallerError::io("failed to run steamcmd", err)
		}
	}
}

fn install_args(root: &Path, login: &str, app_id: &str, branch: &str) -> Vec<OsString> {
	let mut args: Vec<OsString> = vec![
		"+force_install_dir".into(),
		root.into(),
		"+login".into(),
		login.into(),
		"+app_update".into(),
		app_id.into(),
	];
	if !branch.trim().is_empty() {
		args.push("-beta".into());
		args.push(branch.into());
	}
	args.push("validate".into());
	args.push("+quit".into());
	args
}

fn update_args(
	root: &Path,
	login: &str,
	app_id: &str,
	validate: bool,
	custom: Option<&str>,
) -> Vec<OsString> {
	let mut args: Vec<OsString> = vec![
		"+force_install_dir".into(),
		root.into(),
		"+login".into(),
		login.into(),
		"+app_update".into(),
		app_id.into(),
	];
	if validate {
		args.push("validate".into());
	}
	if let Some(custom) = custom {
		args.extend(split_command_line(custom).into_iter().map(OsString::from));
	}
	args.push("+quit".into());
	args
}

impl PackageFetcher for SteamCmd {
	async fn install(
		&self,
		server_id: &str,
		branch: &str,
		app_id: &str,
		is_server: bool,
		anonymous: bool,
	) -> Result<InstallerProcess, InstallerError> {
		// only dedicated servers are published for anonymous download
		let login = self.login(anonymous && is_server)?;
		let root = self.prepare(server_id).await?;
		self.spawn(install_args(&root, login, app_id, branch))
	}

	async fn update(
		&self,
		server_id: &str,
		app_id: &str,
		validate: bool,
		custom: Option<&str>,
		anonymous: bool,
	) -> Result<InstallerProcess, InstallerError> {
		let login = self.login(anonymous)?;
		let root = self.prepare(server_id).await?;
		self.spawn(update_args(&root, login, app_id, validate, custom))
	}

	fn local_build(&self, server_id: &str, app_id: &str) -> Result<BuildId, InstallerError> {
		let manifest = self
			.paths
			.server_files(server_id)
			.join("steamapps")
			.join(format!("appmanifest_{app_id}.acf"));
		trace!(?manifest, "reading app manifest");

		let text = std::fs::read_to_string(&manifest)
			.map_err(|err| InstallerError::io(&format!("reading {}", manifest.display()), &err))?;

		vdf::find(&text, &["AppState"], "buildid")
			.map(BuildId::new)
			.ok_or_else(|| InstallerError::new(format!("no buildid in {}", manifest.display())))
	}

	async fn remote_build(&self, app_id: &str) -> Result<BuildId, InstallerError> {
		debug!(exe=?self.exe, %app_id, "querying published build");
		let output = Command::new(&self.exe)
			.args([
				"+login",
				"anonymous",
				"+app_info_update",
				"1",
				"+app_info_print",
				app_id,
				"+quit",
			])
			.stdin(Stdio::null())
			.stderr(Stdio::null())
			.output()
			.await
			.map_err(|err| self.spawn_error(&err))?;

		let text = String::from_utf8_lossy(&output.stdout);
		vdf::find(&text, &["branches", "public"], "buildid")
			.map(BuildId::new)
			.ok_or_else(|| {
				InstallerError::new(format!(
					"steamcmd did not report a public build for app {app_id} ({})",
					output.status
				))
			})
	}
}

/// Just enough of Valve's KeyValues text format to pull values out of manifests.
mod vdf {
	#[derive(Debug, PartialEq, Eq)]
	enum Token {
		Str(String),
		Open,
		Close,
	}

	// Anything that isn't a quoted string or a brace is skipped; steamcmd prints
	// progress noise around the data.
	fn tokens(text: &str) -> Vec<Token> {
		let mut tokens = Vec::new();
		let mut chars = text.chars();
		while let Some(c) = chars.next() {
			match c {
				'{' => tokens.push(Token::Open),
				'}' => tokens.push(Token::Close),
				'"' => {
					let mut s = String::new();
					while let Some(c) = chars.next() {
						match c {
							'"' => break,
							'\\' => {
								if let Some(escaped) = chars.next() {
									s.push(escaped);
								}
							}
							c => s.push(c),
						}
					}
					tokens.push(Token::Str(s));
				}
				_ => {}
			}
		}
		tokens
	}

	/// Find the first `key` whose enclosing sections end with `section`.
	///
	/// Names compare case-insensitively, as Steam does.
	pub fn find(text: &str, section: &[&str], key: &str) -> Option<String> {
		let mut stack: Vec<String> = Vec::new();
		let mut pending: Option<String> = None;

		for token in tokens(text) {
			match token {
				Token::Open => stack.push(pending.take().unwrap_or_default()),
				Token::Close => {
					stack.pop();
					pending = None;
				}
				Token::Str(s) => match pending.take() {
					None => pending = Some(s),
					Some(k) => {
						if k.eq_ignore_ascii_case(key) && in_section(&stack, section) {
							return Some(s);
						}
					}
				},
			}
		}

		None
	}

	fn in_section(stack: &[String], section: &[&str]) -> bool {
		stack.len() >= section.len()
			&& stack[stack.len() - section.len()..]
				.iter()
				.zip(section)
				.all(|(have, want)| have.eq_ignore_ascii_case(want))
	}

}

#[cfg(test)]
mod tests {
	use super::*;

	fn strings(args: &[OsString]) -> Vec<&str> {
		args.iter().map(|arg| arg.to_str().unwrap()).collect()
	}

	#[test]
	fn install_arguments() {
		let args = install_args(Path::new("/srv/1/serverfiles"), "anonymous", "2394010", "");
		assert_eq!(
			strings(&args),
			[
				"+force_install_dir",
				"/srv/1/serverfiles",
				"+login",
				"anonymous",
				"+app_update",
				"2394010",
				"validate",
				"+quit"
			]
		);
	}

	#[test]
	fn install_arguments_with_branch() {
		let args = install_args(Path::new("/r"), "anonymous", "1", "preview");
		assert!(strings(&args).windows(2).any(|w| w == ["-beta", "preview"]));
	}

	#[test]
	fn update_arguments() {
		let args = update_args(Path::new("/r"), "bob", "1", true, Some("-beta \"my branch\""));
		assert_eq!(
			strings(&args),
			[
				"+force_install_dir",
				"/r",
				"+login",
				"bob",
				"+app_update",
				"1",
				"validate",
				"-beta",
				"my branch",
				"+quit"
			]
		);

		let plain = update_args(Path::new("/r"), "anonymous", "1", false, None);
		assert!(!strings(&plain).contains(&"validate"));
	}

	#[tokio::test]
	async fn account_required_when_not_anonymous() {
		let dir = tempfile::tempdir().unwrap();
		let steam = SteamCmd::new("steamcmd", ServerPaths::new(dir.path()));

		let err = steam.install("1", "", "1", true, false).await.unwrap_err();
		assert!(err.message().contains("steam_user"));
	}

	#[tokio::test]
	async fn missing_steamcmd() {
		let dir = tempfile::tempdir().unwrap();
		let exe = dir.path().join("no-steamcmd-here");
		let steam = SteamCmd::new(&exe, ServerPaths::new(dir.path()));

		let err = steam.install("1", "", "1", true, true).await.unwrap_err();
		assert_eq!(
			err.message(),
			format!("steamcmd not found ({})", exe.display())
		);
		assert!(dir.path().join("1").join("serverfiles").is_dir());
	}

	#[tokio::test]
	async fn unwritable_server_files_directory() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("1"), "not a directory").unwrap();
		let steam = SteamCmd::new("steamcmd", ServerPaths::new(dir.path()));

		let err = steam.update("1", "1", false, None, true).await.unwrap_err();
		assert!(err.message().starts_with("creating "));
	}

	#[test]
	fn local_build_from_manifest() {
		let dir = tempfile::tempdir().unwrap();
		let paths = ServerPaths::new(dir.path());
		let apps = paths.server_files("1").join("steamapps");
		std::fs::create_dir_all(&apps).unwrap();
		std::fs::write(
			apps.join("appmanifest_2394010.acf"),
			"\"AppState\"\n{\n\t\"buildid\"\t\t\"777\"\n}\n",
		)
		.unwrap();

		let steam = SteamCmd::new("steamcmd", paths);
		assert_eq!(
			steam.local_build("1", "2394010").unwrap(),
			BuildId::new("777")
		);
		assert!(steam.local_build("2", "2394010").is_err());
	}
}
