//! Delta Composer (C7): reduces a chain of delta releases against a
//! base full package into a single full package artifact.
//!
//! The binary-patch algorithm itself is a black box to the rest of the
//! pipeline (spec §1); it's expressed here as the `DeltaApplicator`
//! trait so the default `qbsdiff`-backed implementation (mirroring
//! `util::bspatch::patch_qbsdiff` in spirit) can be swapped out in
//! tests.
use std::fs::{self, File};
use std::path::Path;

use crate::hash;
use crate::manifest::version::strip_delta_suffix;
use crate::manifest::{ReleaseEntry, Version};
use crate::store::ArtifactStore;


#[derive(Debug)]
#[derive(thiserror::Error)]
pub enum ComposeErr
{
	#[error("Releases to apply mix full and delta packages")]
	MixedFullAndDelta,

	#[error("Delta application failed for version {0}")]
	DeltaApplicationFailed(Version),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Bad delta filename: {0}")]
	BadFilename(String),
}


/// A black-box binary-patch applicator: given a base file and a delta
/// file, produce the resulting full file at `dst`.
pub trait DeltaApplicator
{
	fn apply(&self, base: &Path, delta: &Path, dst: &Path) -> Result<(), ComposeErr>;
}


/// The production applicator, backed by `qbsdiff`.
#[derive(Debug, Default, Clone, Copy)]
pub struct QbsdiffApplicator;

impl DeltaApplicator for QbsdiffApplicator
{
	fn apply(&self, base: &Path, delta: &Path, dst: &Path) -> Result<(), ComposeErr>
	{
		use qbsdiff::Bspatch;

		let srcb = fs::read(base)?;
		let mut dstf = File::create(dst)?;
		let patchb = fs::read(delta)?;

		let patcher = Bspatch::new(&patchb)
				.map_err(|_| ComposeErr::DeltaApplicationFailed(Version::default()))?;
		patcher.apply(&srcb, &mut dstf)
				.map_err(|_| ComposeErr::DeltaApplicationFailed(Version::default()))?;
		Ok(())
	}
}


/// Compose `releases_to_apply` (§4.7) into one full `ReleaseEntry`,
/// starting from `base` (the currently installed version's package, if
/// any).  Preconditions enforced here: the list must be either all full
/// or all delta, and an all-delta list requires a non-null `base`.
pub fn compose(store: &ArtifactStore, base: Option<&ReleaseEntry>,
		releases_to_apply: &[ReleaseEntry], applicator: &dyn DeltaApplicator)
		-> Result<ReleaseEntry, ComposeErr>
{
	let all_full = releases_to_apply.iter().all(|e| !e.is_delta);
	let all_delta = releases_to_apply.iter().all(|e| e.is_delta);

	if !all_full && !all_delta { return Err(ComposeErr::MixedFullAndDelta); }

	if all_full
	{
		// A single full release (or the largest-full-wins case from the
		// planner) needs no composition at all.
		let winner = releases_to_apply.iter()
				.max_by(|a, b| a.version.cmp(&b.version))
				.ok_or(ComposeErr::MixedFullAndDelta)?;
		return Ok(winner.clone());
	}

	let base = base.ok_or(ComposeErr::MixedFullAndDelta)?;

	let mut ordered: Vec<&ReleaseEntry> = releases_to_apply.iter().collect();
	ordered.sort_by(|a, b| a.version.cmp(&b.version));

	let mut base_path = store.path(base);

	let mut last_entry: Option<ReleaseEntry> = None;
	for delta in ordered
	{
		let delta_path = store.path(delta);
		let full_name = strip_delta_suffix(&delta.filename)
				.ok_or_else(|| ComposeErr::BadFilename(delta.filename.clone()))?;
		let dst_path = store.root().join(&full_name);

		applicator.apply(&base_path, &delta_path, &dst_path)
				.map_err(|_| ComposeErr::DeltaApplicationFailed(delta.version))?;

		let filesize = fs::metadata(&dst_path)?.len();
		let sha1 = hash::sha1_file(&dst_path)
				.map_err(|_| ComposeErr::DeltaApplicationFailed(delta.version))?;

		let entry = ReleaseEntry::from_filename(&full_name, filesize, sha1)
				.map_err(|_| ComposeErr::BadFilename(full_name.clone()))?;

		base_path = dst_path;
		last_entry = Some(entry);
	}

	last_entry.ok_or(ComposeErr::MixedFullAndDelta)
}



#[cfg(test)]
mod tests
{
	use super::*;
	use crate::hash::Sha1Hash;
	use std::cell::RefCell;

	fn entry(filename: &str, filesize: u64) -> ReleaseEntry
	{
		ReleaseEntry::from_filename(filename, filesize, Sha1Hash::default()).unwrap()
	}

	/// A fake applicator that just concatenates base bytes with a marker
	/// byte, recording every call it saw, so composition order can be
	/// asserted without a real bsdiff-format patch file.
	struct FakeApplicator
	{
		calls: RefCell<Vec<(String, String)>>,
	}

	impl DeltaApplicator for FakeApplicator
	{
		fn apply(&self, base: &Path, delta: &Path, dst: &Path) -> Result<(), ComposeErr>
		{
			self.calls.borrow_mut().push((
				base.file_name().unwrap().to_string_lossy().to_string(),
				delta.file_name().unwrap().to_string_lossy().to_string(),
			));
			let mut bytes = fs::read(base)?;
			bytes.push(b'.');
			fs::write(dst, bytes)?;
			Ok(())
		}
	}

	#[test]
	fn all_full_picks_largest()
	{
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path().to_path_buf());
		let applicator = QbsdiffApplicator;

		let a = entry("MyApp-1.0.0.nupkg", 10);
		let b = entry("MyApp-1.1.0.nupkg", 20);
		let got = compose(&store, None, &[a, b.clone()], &applicator).unwrap();
		assert_eq!(got.filename, b.filename);
	}

	#[test]
	fn mixed_full_and_delta_rejected()
	{
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path().to_path_buf());
		let applicator = QbsdiffApplicator;

		let a = entry("MyApp-1.1.0.nupkg", 10);
		let b = entry("MyApp-1.2.0-delta.nupkg", 20);
		let err = compose(&store, None, &[a, b], &applicator).unwrap_err();
		assert!(matches!(err, ComposeErr::MixedFullAndDelta));
	}

	#[test]
	fn delta_chain_without_base_rejected()
	{
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path().to_path_buf());
		let applicator = QbsdiffApplicator;

		let d = entry("MyApp-1.1.0-delta.nupkg", 20);
		let err = compose(&store, None, &[d], &applicator).unwrap_err();
		assert!(matches!(err, ComposeErr::MixedFullAndDelta));
	}

	#[test]
	fn delta_chain_applies_in_order()
	{
		let dir = tempfile::tempdir().unwrap();
		store_prep(&dir);
		let store = ArtifactStore::new(dir.path().to_path_buf());

		let base = entry("MyApp-1.0.0.nupkg", 1);
		let d1 = entry("MyApp-1.1.0-delta.nupkg", 1);
		let d2 = entry("MyApp-1.2.0-delta.nupkg", 1);

		let applicator = FakeApplicator { calls: RefCell::new(Vec::new()) };
		let got = compose(&store, Some(&base), &[d2.clone(), d1.clone()], &applicator).unwrap();

		assert_eq!(got.filename, "myapp-1.2.0.nupkg");
		let calls = applicator.calls.borrow();
		assert_eq!(calls.len(), 2);
		assert_eq!(calls[0].0, "myapp-1.0.0.nupkg");
		assert_eq!(calls[0].1, "myapp-1.1.0-delta.nupkg");
		assert_eq!(calls[1].1, "myapp-1.2.0-delta.nupkg");
	}

	fn store_prep(dir: &tempfile::TempDir)
	{
		fs::write(dir.path().join("myapp-1.0.0.nupkg"), b"x").unwrap();
		fs::write(dir.path().join("myapp-1.1.0-delta.nupkg"), b"x").unwrap();
		fs::write(dir.path().join("myapp-1.2.0-delta.nupkg"), b"x").unwrap();
	}
}
