//! Version and filename rules (spec §4.2).
//!
//! A package filename is `<packageId>-<version>(-delta)?.nupkg`, where
//! `<version>` is up to four dot-separated non-negative integers with
//! missing trailing components defaulting to zero.  Ordering between
//! releases is strictly by version; ties break full-before-delta.
use std::fmt;


/// A four-component `major.minor.build.revision` version.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Version
{
	pub major: u32,
	pub minor: u32,
	pub build: u32,
	pub revision: u32,
}

impl Version
{
	pub fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self
	{
		Self { major, minor, build, revision }
	}
}

impl fmt::Display for Version
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{
		write!(f, "{}.{}.{}.{}", self.major, self.minor, self.build, self.revision)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(thiserror::Error)]
pub enum VersionErr
{
	#[error("Version has too many components: '{0}'")]
	TooManyComponents(String),

	#[error("Bad version component '{1}' in '{0}'")]
	BadComponent(String, String),

	#[error("Empty version string")]
	Empty,
}

impl std::str::FromStr for Version
{
	type Err = VersionErr;

	fn from_str(s: &str) -> Result<Self, Self::Err>
	{
		use VersionErr as VE;

		if s.is_empty() { return Err(VE::Empty); }

		let mut parts = s.split('.');
		let mut comps = [0u32; 4];
		let mut n = 0;
		for slot in comps.iter_mut()
		{
			let p = match parts.next() {
				Some(p) => p,
				None => break,
			};
			*slot = p.parse().map_err(|_| {
				VE::BadComponent(s.to_string(), p.to_string())
			})?;
			n += 1;
		}
		let _ = n;

		// Anything left over means too many dot-separated components.
		if parts.next().is_some()
		{
			return Err(VE::TooManyComponents(s.to_string()));
		}

		let [major, minor, build, revision] = comps;
		Ok(Version { major, minor, build, revision })
	}
}


/// The parsed pieces of a package filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename
{
	pub package_id: String,
	pub version: Version,
	pub is_delta: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(thiserror::Error)]
pub enum FilenameErr
{
	#[error("Filename '{0}' doesn't end in .nupkg")]
	NotNupkg(String),

	#[error("Filename '{0}' has no version component")]
	NoVersion(String),

	#[error("Filename '{0}': {1}")]
	BadVersion(String, VersionErr),
}

/// Suffix stripped for a delta package.
const DELTA_SUFFIX: &str = "-delta.nupkg";
const PLAIN_SUFFIX: &str = ".nupkg";

/// Parse `<packageId>-<version>(-delta)?.nupkg`.  Comparison of the
/// `.nupkg`/`-delta` suffixes is case-insensitive, same as the `sha1`
/// comparison elsewhere in the manifest (spec §3).
pub fn parse_filename(filename: &str) -> Result<ParsedFilename, FilenameErr>
{
	use FilenameErr as FE;

	let lower = filename.to_ascii_lowercase();
	if !lower.ends_with(PLAIN_SUFFIX)
	{
		return Err(FE::NotNupkg(filename.to_string()));
	}

	let (is_delta, stem) = if lower.ends_with(DELTA_SUFFIX)
	{
		let cut = filename.len() - DELTA_SUFFIX.len();
		(true, &filename[..cut])
	}
	else
	{
		let cut = filename.len() - PLAIN_SUFFIX.len();
		(false, &filename[..cut])
	};

	// stem is now "<packageId>-<version>"; split on the last '-'.
	let dash = stem.rfind('-').ok_or_else(|| FE::NoVersion(filename.to_string()))?;
	let package_id = stem[..dash].to_string();
	let verstr = &stem[dash + 1..];

	let version: Version = verstr.parse()
			.map_err(|e| FE::BadVersion(filename.to_string(), e))?;

	Ok(ParsedFilename { package_id, version, is_delta })
}


/// Is this filename a delta package, by the `-delta.nupkg` suffix rule
/// alone (case-insensitive)?  Doesn't require the rest of the filename
/// to be well-formed.
pub fn is_delta_filename(filename: &str) -> bool
{
	filename.to_ascii_lowercase().ends_with(DELTA_SUFFIX)
}


/// Build the filename for the full package that results from applying a
/// delta, by dropping the `-delta` suffix.
pub fn strip_delta_suffix(filename: &str) -> Option<String>
{
	if !is_delta_filename(filename) { return None; }
	let cut = filename.len() - DELTA_SUFFIX.len();
	Some(format!("{}{}", &filename[..cut], PLAIN_SUFFIX))
}



#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn version_parse_full()
	{
		let v: Version = "1.2.3.4".parse().unwrap();
		assert_eq!(v, Version::new(1, 2, 3, 4));
	}

	#[test]
	fn version_parse_defaults()
	{
		let v: Version = "1.2".parse().unwrap();
		assert_eq!(v, Version::new(1, 2, 0, 0));

		let v: Version = "5".parse().unwrap();
		assert_eq!(v, Version::new(5, 0, 0, 0));
	}

	#[test]
	fn version_ordering()
	{
		let a: Version = "1.0.0.0".parse().unwrap();
		let b: Version = "1.0.0.1".parse().unwrap();
		let c: Version = "1.1.0.0".parse().unwrap();
		assert!(a < b);
		assert!(b < c);
	}

	#[test]
	fn version_too_many()
	{
		let r: Result<Version, _> = "1.2.3.4.5".parse();
		assert!(r.is_err());
	}

	#[test]
	fn filename_full()
	{
		let p = parse_filename("MyApp-1.2.3.nupkg").unwrap();
		assert_eq!(p.package_id, "MyApp");
		assert_eq!(p.version, Version::new(1, 2, 3, 0));
		assert!(!p.is_delta);
	}

	#[test]
	fn filename_delta()
	{
		let p = parse_filename("MyApp-1.2.3-delta.nupkg").unwrap();
		assert_eq!(p.package_id, "MyApp");
		assert_eq!(p.version, Version::new(1, 2, 3, 0));
		assert!(p.is_delta);
	}

	#[test]
	fn filename_case_insensitive_suffix()
	{
		let p = parse_filename("MyApp-1.0.0-DELTA.NUPKG").unwrap();
		assert!(p.is_delta);
	}

	#[test]
	fn filename_not_nupkg()
	{
		assert!(parse_filename("MyApp-1.0.0.zip").is_err());
	}

	#[test]
	fn strip_delta()
	{
		let full = strip_delta_suffix("MyApp-1.2.0-delta.nupkg").unwrap();
		assert_eq!(full, "MyApp-1.2.0.nupkg");
		assert!(strip_delta_suffix("MyApp-1.2.0.nupkg").is_none());
	}
}
