//! Artifact Store (C3) — owns `<root>/packages/`; verifies files by
//! length + digest, evicting corrupt files so retries can re-download
//! (spec §4.3). Also owns the Self-Rewriting Manifest (C10, spec §4.10).
use std::path::{Path, PathBuf};
use std::fs;
use std::io::Write as _;

use crate::hash;
use crate::manifest::{Manifest, ReleaseEntry};


#[derive(Debug)]
#[derive(thiserror::Error)]
pub enum StoreErr
{
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Missing artifact: {0}")]
	Missing(PathBuf),

	#[error("Size mismatch for {filename}: expected {expected}, got {got}")]
	SizeMismatch { filename: String, expected: u64, got: u64 },

	#[error("Digest mismatch for {filename}: expected {expected}, got {got}")]
	DigestMismatch { filename: String, expected: String, got: String },
}


/// Owns `<root>/packages/`.
#[derive(Debug, Clone)]
pub struct ArtifactStore
{
	root: PathBuf,
}

impl ArtifactStore
{
	/// `root` is the `packages/` directory itself, not the installation
	/// root.
	pub fn new(root: PathBuf) -> Self { Self { root } }

	pub fn root(&self) -> &Path { &self.root }

	/// Ensure `packages/` exists (PREPARE step, spec §4.8).
	pub fn ensure_exists(&self) -> Result<(), StoreErr>
	{
		fs::create_dir_all(&self.root)?;
		Ok(())
	}

	/// Expected absolute path for an entry.
	pub fn path(&self, entry: &ReleaseEntry) -> PathBuf
	{
		self.root.join(&entry.filename)
	}


	/// Atomically write `bytes` to `packages/<name>`.  If a file with
	/// that name already exists with matching digest and size, the
	/// write is skipped (spec §4.3).
	pub fn put(&self, name: &str, bytes: &[u8]) -> Result<(), StoreErr>
	{
		let dest = self.root.join(name);

		if let Ok(meta) = fs::metadata(&dest)
		{
			if meta.len() == bytes.len() as u64
			{
				let existing = hash::sha1_file(&dest);
				let incoming = {
					let mut c = bytes;
					hash::sha1_reader(&mut c)
				};
				if let (Ok(e), Ok(i)) = (existing, incoming)
				{
					if e == i { return Ok(()); }
				}
			}
		}

		self.ensure_exists()?;

		// Atomic write: write to a sibling temp file, then rename into
		// place, so a crash mid-write never leaves a half-written
		// artifact at the canonical path.
		let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
		tmp.write_all(bytes)?;
		tmp.as_file().sync_all()?;
		tmp.persist(&dest).map_err(|e| e.error)?;

		Ok(())
	}


	/// Verify `packages/<entry.filename>` against `entry`'s size and
	/// digest.  On a mismatch the file is deleted before the error is
	/// surfaced, so a retry can re-download cleanly (spec §4.3).
	pub fn verify(&self, entry: &ReleaseEntry) -> Result<(), StoreErr>
	{
		let path = self.path(entry);

		let meta = match fs::metadata(&path) {
			Ok(m) => m,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound =>
			{ return Err(StoreErr::Missing(path)); },
			Err(e) => return Err(e.into()),
		};

		let got_size = meta.len();
		if got_size != entry.filesize
		{
			let _ = fs::remove_file(&path);
			return Err(StoreErr::SizeMismatch {
				filename: entry.filename.clone(),
				expected: entry.filesize,
				got: got_size,
			});
		}

		let got_hash = hash::sha1_file(&path)?;
		if got_hash != entry.sha1
		{
			let _ = fs::remove_file(&path);
			return Err(StoreErr::DigestMismatch {
				filename: entry.filename.clone(),
				expected: entry.sha1.to_string(),
				got: got_hash.to_string(),
			});
		}

		Ok(())
	}


	/// Build a `ReleaseEntry` from the file actually on disk, used by
	/// the delta composer (C7) and the self-rewriting manifest (C10).
	pub fn entry_from_disk(&self, filename: &str) -> Result<ReleaseEntry, StoreErr>
	{
		let path = self.root.join(filename);
		let meta = fs::metadata(&path)
				.map_err(|_| StoreErr::Missing(path.clone()))?;
		let sha1 = hash::sha1_file(&path)?;

		ReleaseEntry::from_filename(filename, meta.len(), sha1)
				.map_err(|e| {
					// Not a StoreErr variant of its own; a malformed
					// on-disk filename is as good as missing, since we
					// can't identify it.
					let _ = e;
					StoreErr::Missing(path)
				})
	}


	/// Self-Rewriting Manifest (C10, spec §4.10): rebuild the manifest by
	/// enumerating `packages/*.nupkg`, hashing every file present.
	/// Ordering: ascending by version, then by `is_delta` (full first).
	/// This is the ONLY place that writes `packages/RELEASES`, and only
	/// ever after a successful install (spec §3 invariant 1).
	pub fn rebuild_manifest(&self) -> Result<Manifest, StoreErr>
	{
		self.ensure_exists()?;

		let mut entries = Vec::new();
		for dirent in fs::read_dir(&self.root)?
		{
			let dirent = dirent?;
			let name = dirent.file_name();
			let name = name.to_string_lossy();
			if !name.to_ascii_lowercase().ends_with(".nupkg") { continue; }

			entries.push(self.entry_from_disk(&name)?);
		}

		entries.sort_by(|a, b| a.cmp_for_ordering(b));
		Ok(Manifest::new(entries))
	}

	/// Rebuild the manifest (see `rebuild_manifest`) and atomically
	/// publish it as `packages/RELEASES`.
	pub fn rewrite_manifest_file(&self) -> Result<Manifest, StoreErr>
	{
		let manifest = self.rebuild_manifest()?;
		let text = crate::manifest::serialize(&manifest);

		let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
		tmp.write_all(text.as_bytes())?;
		tmp.as_file().sync_all()?;
		tmp.persist(self.root.join("RELEASES")).map_err(|e| e.error)?;

		Ok(manifest)
	}

	/// Load the locally published manifest, or an empty one if
	/// `packages/RELEASES` doesn't exist yet (a fresh installation root).
	pub fn load_local_manifest(&self) -> Result<Manifest, StoreErr>
	{
		let path = self.root.join("RELEASES");
		match fs::read_to_string(&path)
		{
			Ok(text) => crate::manifest::parse(&text)
					.map_err(|_| StoreErr::Missing(path)),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound =>
					Ok(Manifest::default()),
			Err(e) => Err(e.into()),
		}
	}
}



#[cfg(test)]
mod tests
{
	use super::*;
	use crate::manifest::ReleaseEntry;

	fn entry_for(bytes: &[u8], filename: &str) -> ReleaseEntry
	{
		let sha1 = {
			let mut c = bytes;
			hash::sha1_reader(&mut c).unwrap()
		};
		ReleaseEntry::from_filename(filename, bytes.len() as u64, sha1).unwrap()
	}

	#[test]
	fn put_and_verify_roundtrip()
	{
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path().to_path_buf());

		let bytes = b"hello world";
		let entry = entry_for(bytes, "MyApp-1.0.0.nupkg");

		store.put(&entry.filename, bytes).unwrap();
		store.verify(&entry).unwrap();
	}

	#[test]
	fn verify_missing()
	{
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path().to_path_buf());
		let entry = entry_for(b"hello world", "MyApp-1.0.0.nupkg");

		let err = store.verify(&entry).unwrap_err();
		assert!(matches!(err, StoreErr::Missing(_)));
	}

	#[test]
	fn verify_size_mismatch_deletes_file()
	{
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path().to_path_buf());
		let entry = entry_for(b"hello world", "MyApp-1.0.0.nupkg");

		store.put(&entry.filename, b"short").unwrap();
		let err = store.verify(&entry).unwrap_err();
		assert!(matches!(err, StoreErr::SizeMismatch { .. }));
		assert!(!store.path(&entry).exists());
	}

	#[test]
	fn verify_digest_mismatch_deletes_file()
	{
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path().to_path_buf());
		let entry = entry_for(b"hello world", "MyApp-1.0.0.nupkg");

		// Same length, different bytes -> digest mismatch.
		store.put(&entry.filename, b"HELLO WORLD").unwrap();
		let err = store.verify(&entry).unwrap_err();
		assert!(matches!(err, StoreErr::DigestMismatch { .. }));
		assert!(!store.path(&entry).exists());
	}

	#[test]
	fn put_skips_rewrite_when_matching()
	{
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path().to_path_buf());
		let entry = entry_for(b"hello world", "MyApp-1.0.0.nupkg");

		store.put(&entry.filename, b"hello world").unwrap();
		let path = store.path(&entry);
		let before = fs::metadata(&path).unwrap().modified().unwrap();

		std::thread::sleep(std::time::Duration::from_millis(10));
		store.put(&entry.filename, b"hello world").unwrap();
		let after = fs::metadata(&path).unwrap().modified().unwrap();

		assert_eq!(before, after);
	}

	#[test]
	fn rebuild_manifest_orders_full_before_delta_by_version()
	{
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path().to_path_buf());

		store.put("myapp-1.1.0-delta.nupkg", b"bb").unwrap();
		store.put("myapp-1.0.0.nupkg", b"a").unwrap();
		store.put("myapp-1.2.0.nupkg", b"ccc").unwrap();

		let m = store.rebuild_manifest().unwrap();
		let names: Vec<_> = m.entries.iter().map(|e| e.filename.clone()).collect();
		assert_eq!(names, vec![
			"myapp-1.0.0.nupkg",
			"myapp-1.1.0-delta.nupkg",
			"myapp-1.2.0.nupkg",
		]);
	}

	#[test]
	fn rewrite_manifest_file_roundtrips_through_parse()
	{
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path().to_path_buf());
		store.put("myapp-1.0.0.nupkg", b"hello").unwrap();

		let built = store.rewrite_manifest_file().unwrap();
		let loaded = store.load_local_manifest().unwrap();
		assert_eq!(built, loaded);
	}

	#[test]
	fn load_local_manifest_missing_is_empty()
	{
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path().to_path_buf());
		let m = store.load_local_manifest().unwrap();
		assert!(m.is_empty());
	}
}
