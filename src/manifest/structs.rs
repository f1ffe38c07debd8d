//! `ReleaseEntry` and `Manifest` — spec §3.
use crate::hash::Sha1Hash;
use super::version::{self, Version};


/// A single release artifact: a full or delta `.nupkg`, identified by
/// filename and digest.
///
/// Identity is the pair (filename, sha1); Ord/PartialOrd are derived
/// field-order, which happens to put `version` first for sorting
/// purposes even though identity doesn't include it — see
/// `ReleaseEntry::cmp_for_ordering` for the real spec §4.2 ordering
/// rule (version first, full-before-delta on ties).
#[derive(Debug, Clone)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ReleaseEntry
{
	/// Hex SHA-1, compared case-insensitively (we normalize to
	/// lowercase on construction, so `Eq` alone is enough after that).
	pub sha1: Sha1Hash,

	/// Lowercase filename, no path separators.
	pub filename: String,

	/// Size in bytes.
	pub filesize: u64,

	/// Parsed from the filename; both sides (parse and whoever set
	/// this) must agree per spec invariant.
	pub version: Version,

	/// True iff `filename` ends with `-delta.nupkg` (case-insensitive).
	pub is_delta: bool,

	/// Where this entry's bytes can be fetched from, if not the
	/// manifest's own source.
	pub base_url: Option<String>,
}

impl PartialEq for ReleaseEntry
{
	fn eq(&self, other: &Self) -> bool
	{
		self.filename == other.filename && self.sha1 == other.sha1
	}
}
impl Eq for ReleaseEntry {}

impl std::hash::Hash for ReleaseEntry
{
	fn hash<H: std::hash::Hasher>(&self, state: &mut H)
	{
		self.filename.hash(state);
		self.sha1.hash(state);
	}
}


#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(thiserror::Error)]
pub enum ReleaseEntryErr
{
	#[error("{0}")]
	Filename(#[from] version::FilenameErr),

	#[error("Filename '{filename}' implies version {from_name}, but caller \
			gave {given}")]
	VersionMismatch { filename: String, from_name: Version, given: Version },
}

impl ReleaseEntry
{
	/// Build an entry from a filename, size, and hash, deriving version
	/// and delta-ness from the filename per spec §4.2.
	pub fn from_filename(filename: &str, filesize: u64, sha1: Sha1Hash)
			-> Result<Self, ReleaseEntryErr>
	{
		let parsed = version::parse_filename(filename)?;
		Ok(Self {
			sha1,
			filename: filename.to_ascii_lowercase(),
			filesize,
			version: parsed.version,
			is_delta: parsed.is_delta,
			base_url: None,
		})
	}

	/// Ordering per spec §4.2: strictly by version; ties break with
	/// full releases (`is_delta = false`) sorting before deltas.
	pub fn cmp_for_ordering(&self, other: &Self) -> std::cmp::Ordering
	{
		self.version.cmp(&other.version)
				.then_with(|| self.is_delta.cmp(&other.is_delta))
	}
}


/// An ordered sequence of release entries.  Duplicate filenames are
/// permitted (historical full releases superseded by deltas).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest
{
	pub entries: Vec<ReleaseEntry>,
}

impl Manifest
{
	pub fn new(entries: Vec<ReleaseEntry>) -> Self { Self { entries } }

	pub fn is_empty(&self) -> bool { self.entries.is_empty() }
	pub fn len(&self) -> usize { self.entries.len() }

	/// The single highest-version entry, delta or not.
	pub fn latest_entry(&self) -> Option<&ReleaseEntry>
	{
		self.entries.iter().max_by(|a, b| a.cmp_for_ordering(b))
	}

	/// The highest-version full (non-delta) entry -- the manifest's
	/// logical "current version" per spec §3.
	pub fn latest_full_entry(&self) -> Option<&ReleaseEntry>
	{
		self.entries.iter().filter(|e| !e.is_delta)
				.max_by(|a, b| a.version.cmp(&b.version))
	}

	pub fn filter_out_deltas(&self) -> Manifest
	{
		Manifest::new(self.entries.iter().filter(|e| !e.is_delta).cloned().collect())
	}

	/// Entries strictly newer than a given version, sorted ascending.
	pub fn newer_than(&self, v: Version) -> Vec<ReleaseEntry>
	{
		let mut v: Vec<_> = self.entries.iter()
				.filter(|e| e.version > v)
				.cloned().collect();
		v.sort_by(|a, b| a.cmp_for_ordering(b));
		v
	}
}
