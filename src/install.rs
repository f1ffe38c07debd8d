//! Installer (C8) — spec §4.8. Runs the state machine:
//!
//! ```text
//! PREPARE -> CLEAN_DEAD -> COMPOSE_OR_PICK -> EXTRACT -> POST_INSTALL
//!         -> REWRITE_MANIFEST -> DONE
//! ```
use std::path::{Path, PathBuf};

use crate::compose::{self, ComposeErr, DeltaApplicator};
use crate::manifest::{Manifest, ReleaseEntry};
use crate::planner::UpdateInfo;
use crate::postinstall::{self, PostInstallErr, PostInstallRequest};
use crate::store::{ArtifactStore, StoreErr};

pub mod clean;
pub mod extract;
pub mod framework;
pub mod pending;

#[derive(Debug)]
#[derive(thiserror::Error)]
pub enum InstallErr
{
	#[error(transparent)]
	Store(#[from] StoreErr),

	#[error(transparent)]
	Compose(#[from] ComposeErr),

	#[error(transparent)]
	Extract(#[from] extract::ExtractErr),

	#[error(transparent)]
	PostInstall(#[from] PostInstallErr),
}

/// The result of a single `applyReleases` pass.
pub struct InstallResult
{
	pub installed_entry: ReleaseEntry,
	pub app_dir: PathBuf,
	pub launch_path: Option<PathBuf>,
	pub published_manifest: Manifest,
}

fn app_dir_name(version: &crate::manifest::Version) -> String { format!("app-{version}") }

/// Run the full Installer state machine for one update plan.
///
/// `applicator` is C7's black-box `applyDelta` implementation; tests
/// substitute a fake one, production uses `compose::QbsdiffApplicator`.
pub fn install(root: &Path, plan: &UpdateInfo, applicator: &dyn DeltaApplicator)
		-> Result<InstallResult, InstallErr>
{
	// PREPARE
	let store = ArtifactStore::new(plan.package_directory.clone());
	store.ensure_exists()?;

	// CLEAN_DEAD: completes before EXTRACT (spec §5 ordering 1).
	let keep_version = plan.currently_installed_version.as_ref().map(|e| e.version);
	let old_setups = clean::clean_dead(root, keep_version, now());

	// COMPOSE_OR_PICK
	let installed_entry = compose::compose(
		&store,
		plan.currently_installed_version.as_ref(),
		&plan.releases_to_apply,
		applicator,
	)?;

	// EXTRACT: completes before POST_INSTALL (spec §5 ordering 2).
	let app_dir = root.join(app_dir_name(&installed_entry.version));
	let pkg_path = store.path(&installed_entry);
	extract::extract_app(&pkg_path, &app_dir, &plan.app_framework_version)?;

	// POST_INSTALL, in the isolated subprocess.
	let req = PostInstallRequest {
		new_app_dir: app_dir.clone(),
		new_version: installed_entry.version,
		is_bootstrapping: plan.is_bootstrapping,
		old_setups,
		known_tombstones: load_tombstones(root),
	};
	let resp = postinstall::run_post_install_subprocess(&req)?;
	save_tombstones(root, &resp.tombstones);

	fix_pinned_shortcuts(root, keep_version, installed_entry.version);

	// REWRITE_MANIFEST: last, and the only step that publishes (spec §3
	// invariant 1, §5 ordering 3).
	let published_manifest = store.rewrite_manifest_file()?;

	Ok(InstallResult {
		installed_entry,
		app_dir,
		launch_path: resp.launch_path,
		published_manifest,
	})
}

/// `fullUninstall()` (SPEC_FULL.md §4 supplement): run every installed
/// version's `OnVersionUninstalling`, the current version's
/// `OnAppUninstall`, delete everything under `root`, and leave no
/// manifest behind. Best-effort throughout -- an uninstall must never
/// get stuck on a broken hook (spec §7).
pub fn full_uninstall(root: &Path) -> Result<(), InstallErr>
{
	let snapshots = clean::clean_dead(root, None, now());

	for old in &snapshots
	{
		if let postinstall::AppSetupCapability::Discovered(d) = &old.capability
		{
			if let Some(cmd) = &d.on_app_uninstall
			{
				let mut parts = cmd.split_whitespace();
				if let Some(prog) = parts.next()
				{
					let _ = std::process::Command::new(prog)
							.args(parts)
							.arg(old.version.to_string())
							.status();
				}
			}
		}
	}

	let packages = root.join("packages");
	let _ = std::fs::remove_dir_all(&packages);
	let tombstones = root.join(TOMBSTONES_FILE);
	let _ = std::fs::remove_file(&tombstones);

	Ok(())
}

const TOMBSTONES_FILE: &str = "shortcut-tombstones.json";

fn load_tombstones(root: &Path) -> Vec<String>
{
	let path = root.join(TOMBSTONES_FILE);
	std::fs::read_to_string(path).ok()
			.and_then(|t| serde_json::from_str(&t).ok())
			.unwrap_or_default()
}

fn save_tombstones(root: &Path, tombstones: &[String])
{
	if tombstones.is_empty() { return; }
	if let Ok(text) = serde_json::to_string(tombstones)
	{
		let _ = std::fs::write(root.join(TOMBSTONES_FILE), text);
	}
}

/// Pinned-shortcut fix (spec §4.8): rewrite any shortcut JSON file under
/// `<root>/shortcuts/` whose target pointed into the old `app-<old>/`
/// directory to point into `app-<new>/` instead, preserving the
/// relative subpath; if the rewritten target doesn't exist, the
/// shortcut is unpinned (deleted). A no-op when there was no prior
/// version to rewrite from.
fn fix_pinned_shortcuts(root: &Path, old_version: Option<crate::manifest::Version>,
		new_version: crate::manifest::Version)
{
	let old_version = match old_version {
		Some(v) => v,
		None => return,
	};

	let shortcuts_dir = root.join("shortcuts");
	let entries = match std::fs::read_dir(&shortcuts_dir) {
		Ok(e) => e,
		Err(_) => return,
	};

	let old_prefix = root.join(app_dir_name(&old_version));
	let new_prefix = root.join(app_dir_name(&new_version));

	for dirent in entries.filter_map(|e| e.ok())
	{
		let path = dirent.path();
		if path.extension().and_then(|e| e.to_str()) != Some("json") { continue; }

		let text = match std::fs::read_to_string(&path) { Ok(t) => t, Err(_) => continue };
		let mut sc: postinstall::ShortcutRequest = match serde_json::from_str(&text) {
			Ok(s) => s, Err(_) => continue,
		};

		let target = PathBuf::from(&sc.target);
		let rel = match target.strip_prefix(&old_prefix) {
			Ok(r) => r,
			Err(_) => continue,
		};

		let rewritten = new_prefix.join(rel);
		if rewritten.exists()
		{
			sc.target = rewritten.to_string_lossy().into_owned();
			if let Ok(text) = serde_json::to_string(&sc) { let _ = std::fs::write(&path, text); }
		}
		else
		{
			let _ = std::fs::remove_file(&path);
		}
	}
}

fn now() -> chrono::DateTime<chrono::Utc>
{
	chrono::Utc::now()
}



#[cfg(test)]
mod tests
{
	use super::*;
	use crate::manifest::Version;
	use std::io::Write as _;

	struct NoopApplicator;
	impl DeltaApplicator for NoopApplicator
	{
		fn apply(&self, _base: &Path, _delta: &Path, _dst: &Path) -> Result<(), ComposeErr>
		{ unreachable!("no deltas in these tests") }
	}

	fn make_pkg_bytes() -> Vec<u8>
	{
		let mut buf = Vec::new();
		{
			let cursor = std::io::Cursor::new(&mut buf);
			let mut zip = zip::ZipWriter::new(cursor);
			let opts = zip::write::FileOptions::default();
			zip.start_file("lib/net45/MyApp.exe", opts).unwrap();
			zip.write_all(b"binary").unwrap();
			zip.finish().unwrap();
		}
		buf
	}

	fn entry_for(bytes: &[u8], filename: &str) -> ReleaseEntry
	{
		let sha1 = { let mut c = bytes; crate::hash::sha1_reader(&mut c).unwrap() };
		ReleaseEntry::from_filename(filename, bytes.len() as u64, sha1).unwrap()
	}

	#[test]
	fn bootstrap_install_extracts_and_publishes()
	{
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path().join("packages"));
		store.ensure_exists().unwrap();

		let bytes = make_pkg_bytes();
		let entry = entry_for(&bytes, "MyApp-1.0.0.nupkg");
		store.put(&entry.filename, &bytes).unwrap();

		let plan = UpdateInfo {
			currently_installed_version: None,
			releases_to_apply: vec![entry.clone()],
			future_release_entry: entry.clone(),
			package_directory: dir.path().join("packages"),
			app_framework_version: "net45".to_string(),
			is_bootstrapping: true,
		};

		let result = install(dir.path(), &plan, &NoopApplicator).unwrap();
		assert_eq!(result.installed_entry.version, Version::new(1, 0, 0, 0));
		assert!(result.app_dir.join("lib/net45/MyApp.exe").exists());
		assert_eq!(result.published_manifest.entries.len(), 1);
		assert!(dir.path().join("packages/RELEASES").exists());
	}
}
