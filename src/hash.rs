//! SHA-1 hashing utils for artifact integrity checks.
//!
//! Release manifests only ever need SHA-1 (see spec §7 taxonomy); this is
//! an integrity check, not a security boundary, so SHA-1's well-known
//! weaknesses as a security primitive don't matter here.
use std::ops::Deref;
use std::fmt;
use serde_with::{serde_as, hex::Hex};


/// A raw SHA-1 hash output.
///
/// SHA-1 gives you a 160 bit number; 20 octets is the simplest way to
/// store that.  The sha1 crate hands back a [u8; 20], and base16ct can
/// deal with that directly, so we just wrap it.
#[derive(Default, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde_as]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Sha1Hash(
	#[serde_as(as = "Hex")]
	[u8; 20]
);

impl Deref for Sha1Hash
{
	type Target = [u8; 20];
	fn deref(&self) -> &Self::Target { &self.0 }
}

impl fmt::Debug for Sha1Hash
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{ write!(f, "Sha1Hash({})", self.to_buf().as_ref()) }
}

impl std::str::FromStr for Sha1Hash
{
	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err>
	{
		use anyhow::anyhow;

		// First check the length; that's easy.
		let xlen = 40;
		let slen = s.len();
		if slen != xlen
		{
			let estr = anyhow!("Invalid hash length: {slen} should be \
					{xlen} for '{s}'");
			Err(estr)?;
		}

		// And dehexify.  base16ct wants lowercase; the spec says sha1 is
		// compared case-insensitively, so lowercase first.
		let lower = s.to_ascii_lowercase();
		let mut hout = Sha1Hash::default();
		let hret = base16ct::lower::decode(&lower, &mut hout.0)
				.map_err(|e| anyhow!("Invalid hex parsing: {e} trying '{s}'"))?;

		assert_eq!(hret.len(), hout.len(), "should have gotten the hex len right");

		Ok(hout)
	}
}

impl From<[u8; 20]> for Sha1Hash
{
	fn from(buf: [u8; 20]) -> Self { Self(buf) }
}

impl fmt::Display for Sha1Hash
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{
		let hb: Sha1HashBuf = self.to_buf();
		write!(f, "{}", hb)
	}
}

impl Sha1Hash
{
	pub fn to_buf(&self) -> Sha1HashBuf { self.clone().into() }
}


/// A hex SHA-1 output, stored inline rather than as a heap String.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde_as]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Sha1HashBuf(
	#[serde_as(as = "Hex")]
	[u8; 40]
);

impl Deref for Sha1HashBuf
{
	type Target = [u8; 40];
	fn deref(&self) -> &Self::Target { &self.0 }
}

impl Default for Sha1HashBuf
{
	fn default() -> Self { Self([0; 40]) }
}

impl From<Sha1Hash> for Sha1HashBuf
{
	fn from(hash: Sha1Hash) -> Self
	{
		let mut buf = Self::default();
		let bret = base16ct::lower::encode(&hash.0, &mut buf.0)
				.map_err(|e| format!("Hash encoding error: {}", e))
				.unwrap();

		let slen = bret.len();
		let blen = buf.len();
		if slen != blen
		{
			panic!("Programmer screwed up buffer size: should have \
					{blen} but got {slen} encoded");
		}

		std::str::from_utf8(&buf.0).expect("base16 encode screwed us");

		buf
	}
}

impl AsRef<str> for Sha1HashBuf
{
	fn as_ref(&self) -> &str
	{
		std::str::from_utf8(&self.0).expect("base16 encode screwed us")
	}
}

impl fmt::Display for Sha1HashBuf
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{ write!(f, "{}", self.as_ref()) }
}

impl fmt::Debug for Sha1HashBuf
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{ write!(f, "Sha1HashBuf({})", self.as_ref()) }
}



/*
 * Hashing utils, using the above
 */

/// Check the SHA-1 hash of a buffer against an expected hex value.
pub fn check_sha1(buf: &[u8], expect: &str, name: &str)
		-> Result<(), anyhow::Error>
{
	use sha1::{Sha1, Digest};

	let xhash: Sha1Hash = expect.parse()?;

	let khash = Sha1::digest(buf);
	let khash = Sha1Hash(khash.into());

	if khash != xhash
	{
		use anyhow::anyhow;
		let es = anyhow!("Bad {name} hash: expected '{xhash}', got '{khash}'");
		return Err(es);
	}

	Ok(())
}


#[derive(Debug)]
#[derive(thiserror::Error)]
pub enum Sha1ReaderErr
{
	#[error("I/O error: {0}")]
	IO(#[from] std::io::Error),

	#[error("Invalid hash (expected {0}, got {1})")]
	Hash(String, String),

	#[error("Invalid expected hash: {0}")]
	Expected(anyhow::Error),
}


/// Calculate the SHA-1 of something we can read from.
pub fn sha1_reader<T: std::io::Read>(rdr: &mut T)
		-> Result<Sha1Hash, Sha1ReaderErr>
{
	use sha1::{Sha1, Digest};

	let mut hasher = Sha1::new();
	std::io::copy(rdr, &mut hasher)?;
	let khash = hasher.finalize();
	let khash = Sha1Hash(khash.into());
	Ok(khash)
}


/// Calculate the SHA-1 of a file.
pub fn sha1_file(file: &std::path::Path) -> Result<Sha1Hash, Sha1ReaderErr>
{
	let mut fh = std::fs::File::open(file)?;
	sha1_reader(&mut fh)
}


/// Check the SHA-1 of a readable against an expected value.
pub fn check_sha1_reader<T: std::io::Read>(rdr: &mut T, expect: &str)
		-> Result<(), Sha1ReaderErr>
{
	use Sha1ReaderErr as ERR;

	let xhash: Sha1Hash = expect.parse().map_err(|e| ERR::Expected(e))?;
	let gothash = sha1_reader(rdr)?;

	if xhash != gothash
	{
		return Err(ERR::Hash(xhash.to_string(), gothash.to_string()));
	}
	Ok(())
}


/// Check the SHA-1 of a file against an expected value.
pub fn check_sha1_file(file: &std::path::Path, expect: &str)
		-> Result<(), Sha1ReaderErr>
{
	let mut fh = std::fs::File::open(file)?;
	check_sha1_reader(&mut fh, expect)
}


/// A hex digest of an arbitrary byte string; used for the global install
/// lock's identity (see `crate::lock`) and isn't about artifact
/// integrity at all, just a stable short name.
pub fn digest_hex(bytes: &[u8]) -> String
{
	use sha1::{Sha1, Digest};
	let h = Sha1::digest(bytes);
	let h: Sha1Hash = Sha1Hash(h.into());
	h.to_string()
}



#[cfg(test)]
mod tests
{
	fn start_at_the_beginning() -> &'static str
	{ "Do, a deer, a female deer" }
	fn expect_at_the_beginning() -> &'static str
	{ "f1e0a98c85e21159e5decb07d94ffe1af2a65612" }

	#[test]
	fn sha1()
	{
		let buf = start_at_the_beginning().as_bytes();
		let expect = expect_at_the_beginning();
		super::check_sha1(buf, expect, "Julie Andrews").unwrap();
	}

	#[test]
	fn sha1_reader()
	{
		let mut buf = start_at_the_beginning().as_bytes();
		let expect = expect_at_the_beginning();
		super::check_sha1_reader(&mut buf, expect).unwrap();
	}

	#[test]
	fn case_insensitive_parse()
	{
		let lower: super::Sha1Hash = expect_at_the_beginning().parse().unwrap();
		let upper: super::Sha1Hash = expect_at_the_beginning()
				.to_ascii_uppercase().parse().unwrap();
		assert_eq!(lower, upper);
	}

	#[test]
	fn bad_length()
	{
		let r: Result<super::Sha1Hash, _> = "abcd".parse();
		assert!(r.is_err());
	}
}
