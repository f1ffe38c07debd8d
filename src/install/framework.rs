//! Framework-profile matching for the EXTRACT step (spec §4.8).
//!
//! Only files under `lib/` whose immediate subdirectory names a
//! framework profile at or below the configured target are extracted
//! (e.g. target `net40` pulls in `lib/net20` and `lib/net40`, but not
//! `lib/net45`); `lib/winrt45` is excluded unconditionally regardless of
//! target. Matching is case-insensitive and normalizes both `\` and `/`
//! path separators before comparing (design notes §9, open question c).

/// Normalize a path string to use `/` throughout, lowercased, for
/// profile comparisons.
fn normalize(path: &str) -> String
{
	path.to_ascii_lowercase().replace('\\', "/")
}

/// Parse a profile directory name's trailing digits as a numeric rank,
/// e.g. `net45` -> `45`, `net20` -> `20`. Non-numeric or missing digits
/// rank as `0`, which only matters if the configured target itself
/// doesn't parse -- in which case everything not explicitly excluded is
/// let through, matching a permissive default.
fn profile_rank(profile: &str) -> Option<(String, u32)>
{
	let digits_at = profile.find(|c: char| c.is_ascii_digit())?;
	let (prefix, digits) = profile.split_at(digits_at);
	let rank: u32 = digits.parse().ok()?;
	Some((prefix.to_string(), rank))
}

/// Does `archive_path` (a path inside the `.nupkg` zip) belong under
/// `lib/` at a profile at-or-below `target_framework`?
pub fn matches_target(archive_path: &str, target_framework: &str) -> bool
{
	let norm = normalize(archive_path);
	let rest = match norm.strip_prefix("lib/") {
		Some(r) => r,
		None => return false,
	};

	let profile = match rest.split('/').next() {
		Some(p) if !p.is_empty() => p,
		_ => return false,
	};

	if profile == "winrt45" { return false; }

	let (target_prefix, target_rank) = match profile_rank(&normalize(target_framework)) {
		Some(tr) => tr,
		None => return true,
	};

	match profile_rank(profile)
	{
		Some((prefix, rank)) => prefix == target_prefix && rank <= target_rank,
		None => false,
	}
}



#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn lower_profile_included()
	{
		assert!(matches_target("lib/net20/Foo.dll", "net40"));
		assert!(matches_target("lib/net40/Foo.dll", "net40"));
	}

	#[test]
	fn higher_profile_excluded()
	{
		assert!(!matches_target("lib/net45/Foo.dll", "net40"));
	}

	#[test]
	fn winrt45_always_excluded()
	{
		assert!(!matches_target("lib/winrt45/Foo.dll", "net45"));
	}

	#[test]
	fn backslash_paths_normalized()
	{
		assert!(matches_target(r"lib\net40\Foo.dll", "net40"));
	}

	#[test]
	fn case_insensitive()
	{
		assert!(matches_target("LIB/NET40/Foo.dll", "net40"));
	}

	#[test]
	fn outside_lib_excluded()
	{
		assert!(!matches_target("content/readme.txt", "net40"));
	}
}
