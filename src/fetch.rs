//! Remote Fetcher (C5): classifies a source location as remote or
//! local, and fetches manifests (small, read fully into memory) and
//! artifacts (potentially large, fanned out across `pool::fetch`).
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::manifest::ReleaseEntry;
use crate::pool::{self, Pool as _};


/// A classified source location: either a URL to fetch over HTTP(S), or
/// a local filesystem path to copy -- `file://` URLs and bare paths
/// both count as local (spec §4.5).
#[derive(Debug, Clone)]
pub enum Source
{
	Remote(Url),
	Local(PathBuf),
}

impl Source
{
	/// Classify a base location plus a relative file, joining as
	/// appropriate for whichever kind it turns out to be. Per spec
	/// §4.5/§6, only `http`/`https` count as remote; every other
	/// scheme -- `file://`, `ftp://`, `s3://`, or no scheme at all --
	/// is treated as a local directory path.
	pub fn join(base: &str, file: &str) -> Result<Self, FetchErr>
	{
		match Url::parse(base)
		{
			Ok(url) if url.scheme() == "http" || url.scheme() == "https" =>
				Ok(Source::Remote(url.join(file)?)),
			Ok(url) if url.scheme() == "file" =>
			{
				let path = url.to_file_path()
						.map_err(|_| FetchErr::BadLocalUrl(base.to_string()))?;
				Ok(Source::Local(path.join(file)))
			},
			_ => Ok(Source::Local(Path::new(base).join(file))),
		}
	}
}


#[derive(Debug)]
#[derive(thiserror::Error)]
pub enum FetchErr
{
	#[error("URL error: {0}")]
	Url(#[from] url::ParseError),

	#[error("'{0}' looks like a file:// URL but isn't a valid local path")]
	BadLocalUrl(String),

	#[error("HTTP fetch error: {0}")]
	Http(#[from] Box<ureq::Error>),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Transport failure fetching manifest from {source}: {reason}")]
	TransportFailure { source: String, reason: String },

	#[error(transparent)]
	Pool(#[from] anyhow::Error),
}


/// Build the `ureq::Agent` used for every request this crate makes.
pub fn mk_agent() -> ureq::Agent
{
	ureq::AgentBuilder::new()
			.timeout_connect(Duration::from_secs(10))
			.timeout_read(Duration::from_secs(30))
			.build()
}


/// Fetch the RELEASES manifest text from `base` (a remote base URL or a
/// local directory), without parsing it -- that's `manifest::parse`'s
/// job.
pub fn fetch_manifest(agent: &ureq::Agent, base: &str, filename: &str)
		-> Result<String, FetchErr>
{
	let source = Source::join(base, filename)?;
	match source
	{
		Source::Remote(url) =>
		{
			let resp = agent.request_url("GET", &url).call()
					.map_err(|e| FetchErr::TransportFailure {
						source: url.to_string(),
						reason: e.to_string(),
					})?;
			let mut buf = String::new();
			use std::io::Read;
			resp.into_reader().take(16 * 1024 * 1024).read_to_string(&mut buf)?;
			Ok(buf)
		},
		Source::Local(path) => Ok(fs::read_to_string(&path)?),
	}
}


/// Fetch a batch of artifacts from `base` into `dest_dir`, fanning the
/// work out across `pool::fetch`.  Returns the filenames that succeeded;
/// any failures are summarized in the returned error if *any* fetch
/// failed, since a partial artifact set isn't something the planner can
/// recover from on its own (spec §4.5 -- "presumed fatal").
pub fn fetch_artifacts(agent: &ureq::Agent, base: &str, entries: &[ReleaseEntry],
		dest_dir: &Path) -> Result<Vec<String>, FetchErr>
{
	fs::create_dir_all(dest_dir)?;

	let reqs = entries.iter()
			.map(|e| -> Result<pool::fetch::Req, FetchErr> {
				Ok(pool::fetch::Req {
					source: Source::join(base, &e.filename)?,
					filename: e.filename.clone(),
				})
			})
			.collect::<Result<Vec<_>, _>>()?;

	let fp = pool::fetch::Fetch::new(reqs.len());
	let ctrl = pool::fetch::Control { agent: agent.clone(), dest_dir: dest_dir.to_path_buf() };

	let want = reqs.len();
	let res = fp.run(&ctrl, reqs)?;

	if let Some(errs) = res.errs
	{
		return Err(FetchErr::TransportFailure {
			source: base.to_string(),
			reason: format!("{:?}", errs.errs),
		});
	}
	if res.oks.len() != want
	{
		return Err(FetchErr::TransportFailure {
			source: base.to_string(),
			reason: format!("expected {want} artifacts, fetched {}", res.oks.len()),
		});
	}

	Ok(res.oks)
}



#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn classify_remote()
	{
		let s = Source::join("https://example.com/releases/", "RELEASES").unwrap();
		assert!(matches!(s, Source::Remote(_)));
	}

	#[test]
	fn classify_local_bare_path()
	{
		let s = Source::join("/tmp/releases", "RELEASES").unwrap();
		assert!(matches!(s, Source::Local(_)));
	}

	#[test]
	fn classify_local_file_url()
	{
		let s = Source::join("file:///tmp/releases/", "RELEASES").unwrap();
		match s {
			Source::Local(p) => assert_eq!(p, Path::new("/tmp/releases/RELEASES")),
			_ => panic!("expected local"),
		}
	}

	#[test]
	fn classify_non_http_scheme_as_local()
	{
		// Only http/https count as remote (spec §4.5/§6); any other
		// parseable scheme falls through to local.
		let s = Source::join("ftp://example.com/releases/", "RELEASES").unwrap();
		assert!(matches!(s, Source::Local(_)));
	}

	#[test]
	fn fetch_manifest_from_local_dir()
	{
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("RELEASES"), "hello\n").unwrap();

		let agent = mk_agent();
		let base = dir.path().to_string_lossy().to_string();
		let text = fetch_manifest(&agent, &base, "RELEASES").unwrap();
		assert_eq!(text, "hello\n");
	}
}
