//! Update Pipeline (C9): the single linear orchestration surface spec
//! §4.9 exposes, wrapping every call in the Global Install Lock (C4) and
//! reporting coarse progress on a caller-supplied sink.
use std::path::PathBuf;

use crate::compose::QbsdiffApplicator;
use crate::fetch::{self, FetchErr};
use crate::install::{self, InstallErr, InstallResult};
use crate::lock::{self, LockErr};
use crate::manifest::{self, ManifestErr, Manifest, ReleaseEntry};
use crate::planner::{self, PlanErr, UpdateInfo};
use crate::pool::{self, Pool as _};
use crate::store::{ArtifactStore, StoreErr};


#[derive(Debug)]
#[derive(thiserror::Error)]
pub enum PipelineErr
{
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Lock(#[from] LockErr),

	#[error(transparent)]
	Manifest(#[from] ManifestErr),

	#[error(transparent)]
	Plan(#[from] PlanErr),

	#[error(transparent)]
	Fetch(#[from] FetchErr),

	#[error(transparent)]
	Store(#[from] StoreErr),

	#[error(transparent)]
	Install(#[from] InstallErr),

	#[error("Verification failed for one or more downloaded artifacts: {0}")]
	Verify(#[from] pool::hashcheck::PoolErrs),

	#[error(transparent)]
	Pool(#[from] anyhow::Error),
}


/// `Fn(u8) + Send + Sync`, invoked with a monotonic percentage in
/// `[0, 100]` -- spec §9's design notes call for exactly this signature.
/// The pipeline guarantees a terminal `100` is reported even on a
/// failure path that started making progress (`Finally` semantics, spec
/// §4.9), using the literal 10/50/95/100 milestones spec.md's own
/// example uses.
pub type ProgressSink<'a> = dyn Fn(u8) + Send + Sync + 'a;


/// Everything one pipeline call needs: where the app is installed, where
/// to fetch releases from, and how to pick among package variants.
#[derive(Clone)]
pub struct Pipeline
{
	pub root: PathBuf,
	pub source: String,
	pub app_framework_version: String,
	pub ignore_delta_updates: bool,
	pub agent: ureq::Agent,
}

impl Pipeline
{
	pub fn new(root: PathBuf, source: String, app_framework_version: String) -> Self
	{
		Self {
			root,
			source,
			app_framework_version,
			ignore_delta_updates: false,
			agent: fetch::mk_agent(),
		}
	}

	fn store(&self) -> ArtifactStore { ArtifactStore::new(self.packages_dir()) }
	fn packages_dir(&self) -> PathBuf { self.root.join("packages") }

	/// `checkForUpdate(ignoreDeltaUpdates, progressSink) -> UpdateInfo?`
	/// (spec §4.9): reconcile the local manifest against the remote feed
	/// and return a plan, or `None` if nothing needs to change.
	pub fn check_for_update(&self, progress: &ProgressSink)
			-> Result<Option<UpdateInfo>, PipelineErr>
	{
		let _guard = lock::acquire(&self.root)?;
		progress(10);

		let result = (|| -> Result<Option<UpdateInfo>, PipelineErr> {
			let store = self.store();
			let local = store.load_local_manifest()?;

			let remote_text = fetch::fetch_manifest(&self.agent, &self.source, "RELEASES")?;
			let remote = manifest::parse(&remote_text)?;
			progress(50);

			let plan = planner::plan(
				&local,
				&remote,
				self.ignore_delta_updates,
				self.packages_dir(),
				self.app_framework_version.clone(),
			)?;
			progress(95);

			Ok(plan)
		})();

		progress(100);
		result
	}

	/// `downloadReleases(entries, progressSink)` (spec §4.9): fetch a set
	/// of releases into a staging area, then verify each one (ordering
	/// guarantee 4, spec §5: "checksum verification strictly follows
	/// download completion for that artifact") before relocating it into
	/// the store.
	pub fn download_releases(&self, entries: &[ReleaseEntry], progress: &ProgressSink)
			-> Result<(), PipelineErr>
	{
		let _guard = lock::acquire(&self.root)?;
		progress(10);

		let result = (|| -> Result<(), PipelineErr> {
			let staging = self.packages_dir().join(".incoming");
			std::fs::create_dir_all(&staging)?;

			fetch::fetch_artifacts(&self.agent, &self.source, entries, &staging)?;
			progress(50);

			let reqs: Vec<pool::hashcheck::Req> = entries.iter()
					.map(|e| pool::hashcheck::Req { entry: e.clone() })
					.collect();
			let hc = pool::hashcheck::HashCheck::new(reqs.len());
			let ctrl = pool::hashcheck::Control {
				src_dir: staging.clone(),
				dest_dir: self.packages_dir(),
			};
			let res = hc.run(&ctrl, reqs)?;

			let _ = std::fs::remove_dir_all(&staging);

			if let Some(errs) = res.errs { return Err(errs.into()); }
			progress(95);

			Ok(())
		})();

		progress(100);
		result
	}

	/// `applyReleases(plan, progressSink) -> list<launchPath>` (spec
	/// §4.9): run the Installer state machine (C8) for the given plan.
	pub fn apply_releases(&self, plan: &UpdateInfo, progress: &ProgressSink)
			-> Result<InstallResult, PipelineErr>
	{
		let _guard = lock::acquire(&self.root)?;
		progress(10);

		let result = (|| -> Result<InstallResult, PipelineErr> {
			let applicator = QbsdiffApplicator;
			let res = install::install(&self.root, plan, &applicator)?;
			progress(95);
			Ok(res)
		})();

		progress(100);
		result
	}

	/// `fullUninstall()` (spec §4.9, detailed in SPEC_FULL.md §4
	/// supplement): run every version's uninstall hooks best-effort, then
	/// remove the entire installation root's managed state.
	pub fn full_uninstall(&self, progress: &ProgressSink) -> Result<(), PipelineErr>
	{
		let _guard = lock::acquire(&self.root)?;
		progress(10);

		let result = (|| -> Result<(), PipelineErr> {
			install::full_uninstall(&self.root)?;
			progress(95);
			Ok(())
		})();

		progress(100);
		result
	}

	/// `updateLocalManifest()` (spec §4.9): rebuild `packages/RELEASES`
	/// from whatever artifacts are actually present on disk (C10),
	/// without running a full install.
	pub fn update_local_manifest(&self, progress: &ProgressSink)
			-> Result<Manifest, PipelineErr>
	{
		let _guard = lock::acquire(&self.root)?;
		progress(10);

		let result = (|| -> Result<Manifest, PipelineErr> {
			let m = self.store().rewrite_manifest_file()?;
			progress(95);
			Ok(m)
		})();

		progress(100);
		result
	}
}


#[cfg(test)]
mod tests
{
	use super::*;
	use std::sync::atomic::{AtomicU8, Ordering};
	use std::sync::Mutex;

	fn entry_for(bytes: &[u8], filename: &str) -> ReleaseEntry
	{
		let sha1 = { let mut c = bytes; crate::hash::sha1_reader(&mut c).unwrap() };
		ReleaseEntry::from_filename(filename, bytes.len() as u64, sha1).unwrap()
	}

	#[test]
	fn check_for_update_bootstrap_reports_terminal_progress()
	{
		let root = tempfile::tempdir().unwrap();
		let remote_dir = tempfile::tempdir().unwrap();

		let bytes = b"hello world";
		let entry = entry_for(bytes, "MyApp-1.0.0.nupkg");
		std::fs::write(remote_dir.path().join(&entry.filename), bytes).unwrap();
		std::fs::write(
			remote_dir.path().join("RELEASES"),
			manifest::serialize(&Manifest::new(vec![entry])),
		).unwrap();

		let pipeline = Pipeline::new(
			root.path().to_path_buf(),
			remote_dir.path().to_string_lossy().to_string(),
			"net45".to_string(),
		);

		let seen: Mutex<Vec<u8>> = Mutex::new(Vec::new());
		let sink = |p: u8| seen.lock().unwrap().push(p);

		let plan = pipeline.check_for_update(&sink).unwrap().unwrap();
		assert!(plan.is_bootstrapping);

		let seen = seen.into_inner().unwrap();
		assert_eq!(seen.last(), Some(&100));
		assert!(seen.contains(&10));
	}

	#[test]
	fn download_releases_moves_verified_artifacts_into_store()
	{
		let root = tempfile::tempdir().unwrap();
		let remote_dir = tempfile::tempdir().unwrap();

		let bytes = b"payload bytes";
		let entry = entry_for(bytes, "MyApp-1.0.0.nupkg");
		std::fs::write(remote_dir.path().join(&entry.filename), bytes).unwrap();

		let pipeline = Pipeline::new(
			root.path().to_path_buf(),
			remote_dir.path().to_string_lossy().to_string(),
			"net45".to_string(),
		);

		let calls = AtomicU8::new(0);
		let sink = |_: u8| { calls.fetch_add(1, Ordering::Relaxed); };

		pipeline.download_releases(&[entry.clone()], &sink).unwrap();

		assert!(root.path().join("packages").join(&entry.filename).exists());
		assert!(calls.load(Ordering::Relaxed) >= 3);
	}

	#[test]
	fn update_local_manifest_rebuilds_from_disk()
	{
		let root = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(root.path().join("packages"));
		store.put("myapp-1.0.0.nupkg", b"abc").unwrap();

		let pipeline = Pipeline::new(
			root.path().to_path_buf(),
			"unused".to_string(),
			"net45".to_string(),
		);

		let sink = |_: u8| {};
		let m = pipeline.update_local_manifest(&sink).unwrap();
		assert_eq!(m.entries.len(), 1);
	}
}
