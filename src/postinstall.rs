//! `AppSetup` capability discovery and the isolated POST_INSTALL runtime
//! (spec §4.8, §6, §9 "Plugin discovery in an isolated runtime").
//!
//! Rust has no equivalent to reflectively scanning arbitrary native
//! binaries for a capability implementation, and the design notes
//! explicitly bless a subprocess substitute: *"If the target language
//! lacks an equivalent domain mechanism, a helper subprocess is the
//! acceptable substitute. Do not load plugin code into the main
//! process."* `relup`'s concrete mechanism is documented in
//! `SPEC_FULL.md` §4.8: a sidecar `app-setup.json` manifest at the root
//! of the extracted package, run via a re-exec of `relup` itself under
//! a hidden `__run-post-install` subcommand.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::manifest::Version;


/// The on-disk `app-setup.json` sidecar, present at the root of a
/// package's `lib/<framework>/` extraction when the hosted app declares
/// lifecycle hooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredSetup
{
	pub shortcut_name: String,
	pub target: String,
	#[serde(default)]
	pub launch_on_setup: bool,
	#[serde(default)]
	pub shortcuts: Vec<ShortcutRequest>,
	pub on_app_install: Option<String>,
	pub on_app_uninstall: Option<String>,
	pub on_version_installed: Option<String>,
	pub on_version_uninstalling: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortcutRequest
{
	pub name: String,
	pub target: String,
	pub args: Option<String>,
}

/// Synthesized when no `app-setup.json` is present: spec §6's "default
/// synthesized from each `*.exe` file's embedded version info" fallback,
/// minus the PE-resource reader this pack doesn't supply (SPEC_FULL.md
/// §4.8) — we fall back to the first executable-permission file found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultSetup
{
	pub shortcut_name: String,
	pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AppSetupCapability
{
	Discovered(DiscoveredSetup),
	Default(DefaultSetup),
}

impl AppSetupCapability
{
	pub fn shortcut_name(&self) -> &str
	{
		match self {
			Self::Discovered(d) => &d.shortcut_name,
			Self::Default(d) => &d.shortcut_name,
		}
	}

	pub fn target(&self) -> &str
	{
		match self {
			Self::Discovered(d) => &d.target,
			Self::Default(d) => &d.target,
		}
	}

	pub fn launch_on_setup(&self) -> bool
	{
		match self {
			Self::Discovered(d) => d.launch_on_setup,
			Self::Default(_) => false,
		}
	}
}


const MANIFEST_NAME: &str = "app-setup.json";

/// Discover the `AppSetup` capability of a freshly extracted app
/// directory. This only ever deserializes JSON data — no code is loaded
/// here; actually running a hook command happens in the subprocess
/// (`run_post_install_subprocess`).
pub fn discover(app_dir: &Path) -> AppSetupCapability
{
	let manifest_path = app_dir.join(MANIFEST_NAME);
	if let Ok(text) = std::fs::read_to_string(&manifest_path)
	{
		if let Ok(d) = serde_json::from_str::<DiscoveredSetup>(&text)
		{
			return AppSetupCapability::Discovered(d);
		}
		// Malformed app-setup.json: spec §7's PluginLoadFailure is
		// non-fatal, degrade to the synthesized default.
	}

	synthesize_default(app_dir)
}

fn synthesize_default(app_dir: &Path) -> AppSetupCapability
{
	let exe = find_first_executable(app_dir);
	let (target, name) = match exe {
		Some(p) => {
			let name = p.file_stem()
					.map(|s| s.to_string_lossy().into_owned())
					.unwrap_or_else(|| "App".to_string());
			let target = p.strip_prefix(app_dir).unwrap_or(&p)
					.to_string_lossy().into_owned();
			(target, name)
		},
		None => (String::new(), "App".to_string()),
	};
	AppSetupCapability::Default(DefaultSetup { shortcut_name: name, target })
}

fn find_first_executable(app_dir: &Path) -> Option<PathBuf>
{
	let mut entries: Vec<_> = std::fs::read_dir(app_dir).ok()?
			.filter_map(|e| e.ok())
			.map(|e| e.path())
			.filter(|p| p.is_file())
			.collect();
	entries.sort();

	entries.into_iter().find(|p| is_executable(p))
}

#[cfg(unix)]
fn is_executable(p: &Path) -> bool
{
	use std::os::unix::fs::PermissionsExt;
	std::fs::metadata(p)
			.map(|m| m.permissions().mode() & 0o111 != 0)
			.unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(p: &Path) -> bool
{
	p.extension().map(|e| e.eq_ignore_ascii_case("exe")).unwrap_or(false)
}


/// A snapshot of an older version's setup, taken during `CLEAN_DEAD`
/// before its `app-<version>` directory is removed — by the time
/// `POST_INSTALL` runs, CLEAN_DEAD has already completed (spec §5
/// ordering guarantee 1), so the old directory (and whatever plugin
/// artifacts it held) may already be gone. We read the static
/// `app-setup.json` data up front and carry it forward so
/// `OnVersionUninstalling` can still be invoked from inside the
/// isolated subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OldVersionSetup
{
	pub version: Version,
	pub capability: AppSetupCapability,
}


/// Everything the isolated subprocess needs to run `POST_INSTALL`
/// (spec §4.8): the newly extracted directory, the old versions being
/// uninstalled (already snapshotted since CLEAN_DEAD deleted their
/// directories), whether this is a bootstrap install, and the
/// previously-known shortcut tombstones so hooks never try to recreate a
/// shortcut the user deleted by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostInstallRequest
{
	pub new_app_dir: PathBuf,
	pub new_version: Version,
	pub is_bootstrapping: bool,
	pub old_setups: Vec<OldVersionSetup>,
	pub known_tombstones: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostInstallResponse
{
	pub launch_path: Option<PathBuf>,
	pub tombstones: Vec<String>,
}

#[derive(Debug)]
#[derive(thiserror::Error)]
pub enum PostInstallErr
{
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Malformed post-install IPC payload: {0}")]
	BadPayload(#[from] serde_json::Error),

	#[error("A lifecycle hook for {setup} during {phase} exited non-zero")]
	HookThrew { setup: String, phase: &'static str },

	#[error("Post-install subprocess exited with status {0}")]
	SubprocessFailed(i32),
}


/// Run a single hook command, appending `arg` as the final argument, as
/// a plain shell-style command line (spec §4.8: "run with the version
/// string appended as a final argument").
fn run_hook(cmdline: &str, arg: &str) -> Result<(), ()>
{
	let mut parts = cmdline.split_whitespace();
	let prog = match parts.next() { Some(p) => p, None => return Ok(()) };

	let status = Command::new(prog)
			.args(parts)
			.arg(arg)
			.status();

	match status {
		Ok(s) if s.success() => Ok(()),
		_ => Err(()),
	}
}


/// The actual `POST_INSTALL` logic, executed inside the isolated
/// subprocess (invoked via the hidden `__run-post-install` CLI
/// subcommand -- see `crate::command`).
pub fn run_post_install(req: PostInstallRequest) -> Result<PostInstallResponse, PostInstallErr>
{
	use PostInstallErr as E;

	let mut tombstones: HashMap<String, ()> = req.known_tombstones
			.into_iter().map(|t| (t, ())).collect();

	// Older versions first: OnVersionUninstalling, best-effort (spec §7:
	// "logged and swallowed -- a broken old version must never block a
	// new install").
	for old in &req.old_setups
	{
		if let AppSetupCapability::Discovered(d) = &old.capability
		{
			if let Some(cmd) = &d.on_version_uninstalling
			{
				if run_hook(cmd, &old.version.to_string()).is_err()
				{
					eprintln!("warning: OnVersionUninstalling hook for {} \
							failed, continuing", old.version);
				}
			}
			for sc in &d.shortcuts
			{
				if !Path::new(&sc.target).exists()
				{
					tombstones.insert(sc.name.clone(), ());
				}
			}
		}
	}

	let new_setup = discover(&req.new_app_dir);
	if let AppSetupCapability::Discovered(d) = &new_setup
	{
		if req.is_bootstrapping
		{
			if let Some(cmd) = &d.on_app_install
			{
				run_hook(cmd, &req.new_version.to_string())
						.map_err(|_| E::HookThrew {
							setup: d.shortcut_name.clone(), phase: "OnAppInstall",
						})?;
			}
		}

		if let Some(cmd) = &d.on_version_installed
		{
			run_hook(cmd, &req.new_version.to_string())
					.map_err(|_| E::HookThrew {
						setup: d.shortcut_name.clone(), phase: "OnVersionInstalled",
					})?;
		}
	}

	let launch_path = match new_setup.launch_on_setup()
	{
		true if !new_setup.target().is_empty() =>
				Some(req.new_app_dir.join(new_setup.target())),
		_ => None,
	};

	Ok(PostInstallResponse {
		launch_path,
		tombstones: tombstones.into_keys().collect(),
	})
}


/// Re-exec `relup` itself under the hidden `__run-post-install`
/// subcommand, feeding it `req` as JSON on stdin and reading back a
/// `PostInstallResponse` from stdout -- the isolation boundary spec §9
/// calls for in place of a .NET AppDomain/AssemblyLoadContext.
pub fn run_post_install_subprocess(req: &PostInstallRequest)
		-> Result<PostInstallResponse, PostInstallErr>
{
	use std::io::Write as _;

	let exe = std::env::current_exe()?;
	let mut child = Command::new(exe)
			.arg("__run-post-install")
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.spawn()?;

	let payload = serde_json::to_vec(req)?;
	child.stdin.take().unwrap().write_all(&payload)?;

	let out = child.wait_with_output()?;
	if !out.status.success()
	{
		return Err(PostInstallErr::SubprocessFailed(out.status.code().unwrap_or(-1)));
	}

	let resp: PostInstallResponse = serde_json::from_slice(&out.stdout)?;
	Ok(resp)
}



#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn discover_missing_manifest_synthesizes_default()
	{
		let dir = tempfile::tempdir().unwrap();
		let cap = discover(dir.path());
		assert!(matches!(cap, AppSetupCapability::Default(_)));
	}

	#[test]
	fn discover_valid_manifest()
	{
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join(MANIFEST_NAME), r#"{
			"shortcut_name": "My App",
			"target": "lib/net45/MyApp.exe",
			"launch_on_setup": true,
			"shortcuts": [],
			"on_app_install": null,
			"on_app_uninstall": null,
			"on_version_installed": null,
			"on_version_uninstalling": null
		}"#).unwrap();

		let cap = discover(dir.path());
		match cap {
			AppSetupCapability::Discovered(d) => {
				assert_eq!(d.shortcut_name, "My App");
				assert!(d.launch_on_setup);
			},
			_ => panic!("expected discovered setup"),
		}
	}

	#[test]
	fn run_post_install_bootstrap_runs_on_app_install()
	{
		let dir = tempfile::tempdir().unwrap();
		let marker = dir.path().join("installed.marker");

		std::fs::write(dir.path().join(MANIFEST_NAME), format!(r#"{{
			"shortcut_name": "My App",
			"target": "MyApp",
			"launch_on_setup": false,
			"shortcuts": [],
			"on_app_install": "/usr/bin/touch {}",
			"on_app_uninstall": null,
			"on_version_installed": null,
			"on_version_uninstalling": null
		}}"#, marker.display())).unwrap();

		let req = PostInstallRequest {
			new_app_dir: dir.path().to_path_buf(),
			new_version: Version::new(1, 0, 0, 0),
			is_bootstrapping: true,
			old_setups: vec![],
			known_tombstones: vec![],
		};

		let resp = run_post_install(req).unwrap();
		assert!(marker.exists());
		assert!(resp.tombstones.is_empty());
	}

	#[test]
	fn tombstone_kept_when_shortcut_target_gone()
	{
		let dir = tempfile::tempdir().unwrap();
		let old_cap = AppSetupCapability::Discovered(DiscoveredSetup {
			shortcut_name: "Old App".into(),
			target: "OldApp".into(),
			launch_on_setup: false,
			shortcuts: vec![ShortcutRequest {
				name: "Old App".into(),
				target: "/no/such/path/OldApp".into(),
				args: None,
			}],
			on_app_install: None,
			on_app_uninstall: None,
			on_version_installed: None,
			on_version_uninstalling: None,
		});

		let req = PostInstallRequest {
			new_app_dir: dir.path().to_path_buf(),
			new_version: Version::new(1, 1, 0, 0),
			is_bootstrapping: false,
			old_setups: vec![OldVersionSetup { version: Version::new(1, 0, 0, 0), capability: old_cap }],
			known_tombstones: vec![],
		};

		let resp = run_post_install(req).unwrap();
		assert!(resp.tombstones.contains(&"Old App".to_string()));
	}
}
