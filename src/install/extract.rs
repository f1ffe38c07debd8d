//! EXTRACT step (spec §4.8): unpack a full `.nupkg` (a plain ZIP) into a
//! fresh `app-<version>/` directory, keeping only `lib/` entries that
//! match the configured framework profile.
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use super::framework;

#[derive(Debug)]
#[derive(thiserror::Error)]
pub enum ExtractErr
{
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Bad zip archive: {0}")]
	Zip(#[from] zip::result::ZipError),

	#[error("Archive entry '{0}' escapes the extraction directory")]
	PathEscape(String),
}

/// Extract `pkg_path`'s `lib/<profile>` entries matching
/// `target_framework` into `app_dir`, which is created fresh (any
/// pre-existing directory of the same name is removed first). Entries
/// are sorted by archive path ascending before copying, so a
/// higher-profile variant (within the allowed set) deterministically
/// overwrites a lower-profile one sharing a relative path (spec §4.8).
///
/// The `app-setup.json` sidecar (SPEC_FULL.md §4.8) lives at the
/// package root, next to `lib/`, not under it -- it's copied
/// unconditionally, bypassing the framework-profile filter, so
/// `postinstall::discover` can find it after extraction.
pub fn extract_app(pkg_path: &Path, app_dir: &Path, target_framework: &str)
		-> Result<(), ExtractErr>
{
	if app_dir.exists() { fs::remove_dir_all(app_dir)?; }
	fs::create_dir_all(app_dir)?;

	let file = File::open(pkg_path)?;
	let mut zip = ZipArchive::new(file)?;

	let mut names: Vec<String> = (0..zip.len())
			.map(|i| zip.by_index(i).map(|f| f.name().to_string()))
			.collect::<Result<_, _>>()?;
	names.sort();

	for name in names
	{
		if !framework::matches_target(&name, target_framework) && !is_root_sidecar(&name)
		{ continue; }

		let mut entry = zip.by_name(&name)?;
		if entry.is_dir() { continue; }

		let rel = sanitize_relpath(&name)
				.ok_or_else(|| ExtractErr::PathEscape(name.clone()))?;
		let dest = app_dir.join(rel);

		if let Some(parent) = dest.parent() { fs::create_dir_all(parent)?; }
		let mut out = File::create(&dest)?;
		io::copy(&mut entry, &mut out)?;

		#[cfg(unix)]
		if let Some(mode) = entry.unix_mode()
		{
			use std::os::unix::fs::PermissionsExt;
			fs::set_permissions(&dest, fs::Permissions::from_mode(mode))?;
		}
	}

	Ok(())
}

/// Does `archive_path` name the `app-setup.json` sidecar sitting at the
/// package root (not under `lib/`)? Compared case-insensitively with
/// both path separators normalized, same as `framework::matches_target`.
fn is_root_sidecar(archive_path: &str) -> bool
{
	archive_path.to_ascii_lowercase().replace('\\', "/") == "app-setup.json"
}

/// Reject archive paths that would escape `app_dir` via `..` components
/// or an absolute path, and normalize backslashes to the platform
/// separator along the way.
fn sanitize_relpath(name: &str) -> Option<PathBuf>
{
	let norm = name.replace('\\', "/");
	let mut out = PathBuf::new();
	for comp in norm.split('/')
	{
		match comp {
			"" | "." => continue,
			".." => return None,
			c => out.push(c),
		}
	}
	Some(out)
}



#[cfg(test)]
mod tests
{
	use super::*;
	use std::io::Write as _;

	fn make_pkg(entries: &[(&str, &[u8])]) -> tempfile::NamedTempFile
	{
		let tmp = tempfile::NamedTempFile::new().unwrap();
		{
			let mut zip = zip::ZipWriter::new(tmp.reopen().unwrap());
			let opts = zip::write::FileOptions::default();
			for (name, bytes) in entries
			{
				zip.start_file(*name, opts).unwrap();
				zip.write_all(bytes).unwrap();
			}
			zip.finish().unwrap();
		}
		tmp
	}

	#[test]
	fn extracts_matching_profile_only()
	{
		let pkg = make_pkg(&[
			("lib/net40/App.exe", b"forty"),
			("lib/net45/App.exe", b"fortyfive"),
			("content/readme.txt", b"ignored"),
		]);

		let dir = tempfile::tempdir().unwrap();
		let app_dir = dir.path().join("app-1.0.0");
		extract_app(pkg.path(), &app_dir, "net40").unwrap();

		assert!(app_dir.join("lib/net40/App.exe").exists());
		assert!(!app_dir.join("lib/net45/App.exe").exists());
		assert!(!app_dir.join("content/readme.txt").exists());
	}

	#[test]
	fn removes_preexisting_dir_first()
	{
		let pkg = make_pkg(&[("lib/net40/App.exe", b"new")]);
		let dir = tempfile::tempdir().unwrap();
		let app_dir = dir.path().join("app-1.0.0");

		fs::create_dir_all(&app_dir).unwrap();
		fs::write(app_dir.join("stale.txt"), b"old").unwrap();

		extract_app(pkg.path(), &app_dir, "net40").unwrap();
		assert!(!app_dir.join("stale.txt").exists());
		assert!(app_dir.join("lib/net40/App.exe").exists());
	}

	#[test]
	fn root_app_setup_json_survives_extraction_and_is_discovered()
	{
		let setup_json = br#"{
			"shortcut_name": "MyApp",
			"target": "MyApp.exe",
			"launch_on_setup": true,
			"on_version_installed": "MyApp.exe --on-version-installed"
		}"#;

		let pkg = make_pkg(&[
			("lib/net40/MyApp.exe", b"binary"),
			("app-setup.json", setup_json),
			("content/readme.txt", b"ignored"),
		]);

		let dir = tempfile::tempdir().unwrap();
		let app_dir = dir.path().join("app-1.0.0");
		extract_app(pkg.path(), &app_dir, "net40").unwrap();

		assert!(app_dir.join("lib/net40/MyApp.exe").exists());
		assert!(app_dir.join("app-setup.json").exists());
		assert!(!app_dir.join("content/readme.txt").exists());

		let capability = crate::postinstall::discover(&app_dir);
		match capability {
			crate::postinstall::AppSetupCapability::Discovered(d) => {
				assert_eq!(d.shortcut_name, "MyApp");
				assert!(d.launch_on_setup);
			},
			crate::postinstall::AppSetupCapability::Default(_) =>
				panic!("expected the root app-setup.json sidecar to be discovered"),
		}
	}
}
