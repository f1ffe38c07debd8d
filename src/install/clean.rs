//! CLEAN_DEAD step (spec §4.8): remove every `app-*` directory that
//! isn't the currently installed version, tolerating failure (locked
//! files get queued for the next run via `PendingDeletes`).
//!
//! Also responsible for snapshotting each removed version's `AppSetup`
//! capability *before* deletion, since by the time `POST_INSTALL` runs
//! (which must invoke `OnVersionUninstalling` for each) the directory is
//! already gone -- see `crate::postinstall::OldVersionSetup`.
use std::path::Path;

use crate::manifest::Version;
use crate::postinstall::{self, OldVersionSetup};

const APP_PREFIX: &str = "app-";

/// Remove every `app-<version>` directory under `root` other than
/// `keep_version`, snapshotting each one's `AppSetup` capability first.
/// Never returns an error: failures are queued in
/// `<root>/pending-deletes.json` for the next pipeline invocation (spec
/// §4.8: "This step must be tolerant -- a failure here is never fatal").
pub fn clean_dead(root: &Path, keep_version: Option<Version>,
		now: chrono::DateTime<chrono::Utc>) -> Vec<OldVersionSetup>
{
	// Retry anything queued from a previous run first; files may have
	// unlocked since.
	if let Ok(mut pending) = super::pending::PendingDeletes::load(root)
	{
		pending.retry_all();
		let _ = pending.save(root);
	}

	let mut snapshots = Vec::new();

	let entries = match std::fs::read_dir(root) {
		Ok(e) => e,
		Err(_) => return snapshots,
	};

	for dirent in entries.filter_map(|e| e.ok())
	{
		let path = dirent.path();
		if !path.is_dir() { continue; }

		let name = dirent.file_name();
		let name = name.to_string_lossy();
		let verstr = match name.strip_prefix(APP_PREFIX) {
			Some(v) => v,
			None => continue,
		};
		let version: Version = match verstr.parse() {
			Ok(v) => v,
			Err(_) => continue,
		};

		if Some(version) == keep_version { continue; }

		let capability = postinstall::discover(&path);
		snapshots.push(OldVersionSetup { version, capability });

		super::pending::delete_or_schedule(root, &path, now);
	}

	snapshots
}



#[cfg(test)]
mod tests
{
	use super::*;

	fn now() -> chrono::DateTime<chrono::Utc>
	{
		chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap()
	}

	#[test]
	fn removes_old_versions_keeps_current()
	{
		let dir = tempfile::tempdir().unwrap();
		std::fs::create_dir(dir.path().join("app-1.0.0")).unwrap();
		std::fs::create_dir(dir.path().join("app-1.1.0")).unwrap();

		let keep = Version::new(1, 1, 0, 0);
		let snaps = clean_dead(dir.path(), Some(keep), now());

		assert!(!dir.path().join("app-1.0.0").exists());
		assert!(dir.path().join("app-1.1.0").exists());
		assert_eq!(snaps.len(), 1);
		assert_eq!(snaps[0].version, Version::new(1, 0, 0, 0));
	}

	#[test]
	fn bootstrap_with_no_keep_removes_everything()
	{
		let dir = tempfile::tempdir().unwrap();
		std::fs::create_dir(dir.path().join("app-1.0.0")).unwrap();

		let snaps = clean_dead(dir.path(), None, now());
		assert!(!dir.path().join("app-1.0.0").exists());
		assert_eq!(snaps.len(), 1);
	}

	#[test]
	fn ignores_non_app_directories()
	{
		let dir = tempfile::tempdir().unwrap();
		std::fs::create_dir(dir.path().join("packages")).unwrap();

		let snaps = clean_dead(dir.path(), None, now());
		assert!(dir.path().join("packages").exists());
		assert!(snaps.is_empty());
	}
}
