//! Update Planner (C6): diffs a local manifest against a remote one and
//! produces an `UpdateInfo` describing what, if anything, needs to be
//! applied.
use std::path::PathBuf;

use crate::manifest::{Manifest, ReleaseEntry, Version};


#[derive(Debug)]
#[derive(thiserror::Error)]
pub enum PlanErr
{
	#[error("Remote manifest is empty or missing")]
	CorruptRemoteManifest,

	#[error("Filename '{0}' has two different digests between local and remote manifests")]
	ConflictingDigests(String),
}


/// Plan record for one `applyReleases` call.
#[derive(Debug, Clone)]
pub struct UpdateInfo
{
	/// The non-delta local release with the highest version, if any.
	pub currently_installed_version: Option<ReleaseEntry>,

	/// Ordered releases to apply; non-empty whenever an update is
	/// actually needed.
	pub releases_to_apply: Vec<ReleaseEntry>,

	/// The release whose version will be current after apply -- the
	/// highest-version entry in `releases_to_apply`.
	pub future_release_entry: ReleaseEntry,

	pub package_directory: PathBuf,
	pub app_framework_version: String,

	/// True when no local version existed at all.
	pub is_bootstrapping: bool,
}


/// Compute an update plan, or `Ok(None)` when no update is needed.
///
/// `package_directory` and `app_framework_version` are carried through
/// into the resulting `UpdateInfo` for the installer (C8) to consume;
/// the planner itself doesn't touch the filesystem.
pub fn plan(local: &Manifest, remote: &Manifest, ignore_delta_updates: bool,
		package_directory: PathBuf, app_framework_version: String)
		-> Result<Option<UpdateInfo>, PlanErr>
{
	if remote.is_empty() { return Err(PlanErr::CorruptRemoteManifest); }

	check_digest_conflicts(local, remote)?;

	// Open question (a): this is fragile if a release is replaced
	// in-place with the same count but different contents, but it's the
	// behavior being preserved from the source.
	if remote.len() == local.len() { return Ok(None); }

	let remote = if ignore_delta_updates { remote.filter_out_deltas() } else { remote.clone() };

	let current = local.latest_full_entry().cloned();

	let is_bootstrapping = current.is_none();

	let releases_to_apply = if is_bootstrapping
	{
		let latest = remote.latest_full_entry()
				.ok_or(PlanErr::CorruptRemoteManifest)?
				.clone();
		vec![latest]
	}
	else
	{
		let current = current.clone().unwrap();
		let local_max = local.latest_entry().map(|e| e.version).unwrap_or_default();
		let remote_max = remote.latest_entry().map(|e| e.version).unwrap_or_default();

		if local_max >= remote_max
		{
			// Treat as corruption/downgrade: reinstall the latest full
			// remote release outright rather than try to reconcile.
			let latest = remote.latest_full_entry()
					.ok_or(PlanErr::CorruptRemoteManifest)?
					.clone();
			vec![latest]
		}
		else
		{
			plan_forward(&current, &remote)
		}
	};

	let future_release_entry = releases_to_apply.iter()
			.max_by(|a, b| a.cmp_for_ordering(b))
			.cloned()
			.ok_or(PlanErr::CorruptRemoteManifest)?;

	Ok(Some(UpdateInfo {
		currently_installed_version: if is_bootstrapping { None } else { current },
		releases_to_apply,
		future_release_entry,
		package_directory,
		app_framework_version,
		is_bootstrapping,
	}))
}


/// Step 6 of §4.6: start from `current` and take everything remote
/// that's newer.  When that set is a contiguous delta chain, hand it
/// all to C7; otherwise the largest full release wins outright.
fn plan_forward(current: &ReleaseEntry, remote: &Manifest) -> Vec<ReleaseEntry>
{
	let newer = remote.newer_than(current.version);

	let all_delta = !newer.is_empty() && newer.iter().all(|e| e.is_delta);
	if all_delta && is_contiguous_chain(current.version, &newer)
	{
		return newer;
	}

	// Not a clean delta chain: the largest full release among the
	// candidates takes precedence over everything else.
	let best_full = newer.iter()
			.filter(|e| !e.is_delta)
			.max_by(|a, b| a.version.cmp(&b.version))
			.cloned();

	match best_full
	{
		Some(full) => vec![full],
		// No full release among the newer entries at all; fall back to
		// whatever deltas exist, even if the chain has a gap -- C7 will
		// reject it with `MixedFullAndDelta`/apply failures downstream
		// if it truly can't be composed.
		None => newer,
	}
}

/// A chain is contiguous when, sorted ascending, each delta's version
/// strictly increases from the one before it and the first is strictly
/// newer than `base`.  We don't require knowledge of the *exact*
/// predecessor version encoded anywhere but the sequence itself, since
/// the manifest doesn't carry a "based on" field.
fn is_contiguous_chain(base: Version, chain: &[ReleaseEntry]) -> bool
{
	let mut prev = base;
	for e in chain
	{
		if e.version <= prev { return false; }
		prev = e.version;
	}
	true
}


/// Open question (b): the same filename with two different digests
/// between local and remote is undefined by the source; treat it as
/// `CorruptRemoteManifest`.
fn check_digest_conflicts(local: &Manifest, remote: &Manifest) -> Result<(), PlanErr>
{
	use std::collections::HashMap;

	let mut by_name: HashMap<&str, &crate::hash::Sha1Hash> = HashMap::new();
	for e in &local.entries { by_name.insert(&e.filename, &e.sha1); }

	for e in &remote.entries
	{
		if let Some(&sha) = by_name.get(e.filename.as_str())
		{
			if *sha != e.sha1
			{
				return Err(PlanErr::ConflictingDigests(e.filename.clone()));
			}
		}
	}
	Ok(())
}
