//! The RELEASES manifest codec (spec §4.1).
//!
//! Grammar: one entry per line, `<sha1> <filename> <filesize>`,
//! whitespace-separated.  Blank lines and lines starting with `#` are
//! ignored.  A malformed line fails the whole parse (no partial
//! manifest is ever returned) with the offending line number attached.
use super::structs::{Manifest, ReleaseEntry};
use crate::hash::Sha1Hash;


#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(thiserror::Error)]
pub enum ManifestErr
{
	#[error("Corrupt manifest at line {line}: {reason}")]
	CorruptManifest { line: u32, reason: String },
}

impl ManifestErr
{
	fn at(line: u32, reason: impl Into<String>) -> Self
	{
		Self::CorruptManifest { line, reason: reason.into() }
	}
}


/// Parse a RELEASES file's full text into a `Manifest`.
///
/// On any malformed line, the whole parse fails; we never hand back a
/// manifest missing entries that failed to parse (spec §4.1).
pub fn parse(text: &str) -> Result<Manifest, ManifestErr>
{
	let mut entries = Vec::new();

	for (idx, raw) in text.split('\n').enumerate()
	{
		let lnum = (idx + 1) as u32;
		let line = raw.trim();

		if line.is_empty() || line.starts_with('#') { continue; }

		let mut flds = line.split_whitespace();
		let sha1s = flds.next()
				.ok_or_else(|| ManifestErr::at(lnum, "missing sha1 field"))?;
		let filename = flds.next()
				.ok_or_else(|| ManifestErr::at(lnum, "missing filename field"))?;
		let filesize = flds.next()
				.ok_or_else(|| ManifestErr::at(lnum, "missing filesize field"))?;
		if flds.next().is_some()
		{
			return Err(ManifestErr::at(lnum, "too many fields"));
		}

		let sha1: Sha1Hash = sha1s.parse()
				.map_err(|e| ManifestErr::at(lnum, format!("bad sha1: {e}")))?;
		let filesize: u64 = filesize.parse()
				.map_err(|e| ManifestErr::at(lnum, format!("bad filesize: {e}")))?;

		let entry = ReleaseEntry::from_filename(filename, filesize, sha1)
				.map_err(|e| ManifestErr::at(lnum, format!("bad filename: {e}")))?;

		entries.push(entry);
	}

	Ok(Manifest::new(entries))
}


/// Serialize a manifest back to RELEASES text, in the caller-supplied
/// order, UTF-8 without BOM, one `\n`-terminated line per entry.
pub fn serialize(manifest: &Manifest) -> String
{
	let mut out = String::new();
	for e in &manifest.entries
	{
		out.push_str(&format!("{} {} {}\n", e.sha1, e.filename, e.filesize));
	}
	out
}



#[cfg(test)]
mod tests
{
	use super::*;

	const SHA: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

	#[test]
	fn roundtrip()
	{
		let text = format!("{SHA} MyApp-1.0.0.nupkg 1024\n\
				{SHA} MyApp-1.1.0-delta.nupkg 99\n");
		let m = parse(&text).unwrap();
		assert_eq!(m.len(), 2);
		assert_eq!(serialize(&m), text);
	}

	#[test]
	fn comments_and_blanks_ignored()
	{
		let text = format!("# comment\n\n{SHA} MyApp-1.0.0.nupkg 1024\n\n");
		let m = parse(&text).unwrap();
		assert_eq!(m.len(), 1);
	}

	#[test]
	fn malformed_line_fails_whole_parse()
	{
		let text = format!("{SHA} MyApp-1.0.0.nupkg 1024\nnot a valid line\n");
		let err = parse(&text).unwrap_err();
		match err {
			ManifestErr::CorruptManifest { line, .. } => assert_eq!(line, 2),
		}
	}

	#[test]
	fn duplicate_filenames_allowed()
	{
		let text = format!("{SHA} MyApp-1.0.0.nupkg 1024\n\
				{SHA} MyApp-1.0.0.nupkg 1024\n");
		let m = parse(&text).unwrap();
		assert_eq!(m.len(), 2);
	}

	#[test]
	fn sha1_case_insensitive()
	{
		let upper = SHA.to_ascii_uppercase();
		let text = format!("{upper} MyApp-1.0.0.nupkg 1024\n");
		let m = parse(&text).unwrap();
		assert_eq!(m.entries[0].sha1.to_string(), SHA);
	}
}
