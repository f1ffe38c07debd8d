//! Concurrent artifact-fetch pool: fans a list of source locations
//! (remote URLs or local paths, classified the same way `fetch::`
//! classifies a single one) out across worker threads and drops the
//! bytes into a destination directory.
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use indicatif::ProgressBar;

use crate::fetch::Source;

/// A gigabyte; nothing in this domain should ever legitimately be
/// bigger than that, so treat anything past it as a runaway transfer
/// rather than trust a content-length header blindly.
const LIMIT: u64 = 1024 * 1024 * 1024;


#[derive(Debug)]
pub struct Fetch
{
	pb: ProgressBar,
	oks: Vec<String>,
	errs: Vec<GetErr>,
}

impl Fetch
{
	pub fn new(pblen: usize) -> Self
	{
		Self {
			pb: ProgressBar::new(pblen as u64),
			oks: Vec::with_capacity(pblen),
			errs: Vec::new(),
		}
	}
}


#[derive(Debug)]
pub struct PoolResult
{
	pub oks: Vec<String>,
	pub errs: Option<PoolErrs>,
}

#[derive(Debug)]
#[derive(thiserror::Error)]
#[error("{errs:?}")]
pub struct PoolErrs
{
	pub errs: Vec<GetErr>,
}


#[derive(Debug, Clone)]
pub struct Control
{
	pub agent: ureq::Agent,
	pub dest_dir: PathBuf,
}

#[derive(Debug)]
pub struct Req
{
	pub source: Source,
	pub filename: String,
}

#[derive(Debug)]
pub struct Res
{
	pub filename: String,
}

#[derive(Debug)]
#[derive(thiserror::Error)]
pub enum GetErr
{
	#[error("HTTP fetch error: {0}")]
	Http(#[from] Box<ureq::Error>),

	#[error("File I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Transfer of {0} exceeded the {1} byte limit")]
	TooBig(String, u64),
}


impl crate::pool::Pool for Fetch
{
	type Control = Control;
	type UnitControl = Control;

	fn mk_unitcontrol(c: &Control) -> Control { c.clone() }

	type PoolResult = PoolResult;

	type WorkRequest = Req;
	type WorkResult = Res;
	type WorkErr = GetErr;

	fn work(ctrl: &Control, req: Req) -> Result<Res, GetErr>
	{
		fetch_worker(ctrl, req)
	}

	fn nthreads(&self) -> u32 { super::jobs_net() }

	fn work_result(&mut self, resp: Result<Res, GetErr>)
	{
		self.pb.inc(1);
		match resp
		{
			Ok(r) => self.oks.push(r.filename),
			Err(e) => self.errs.push(e),
		}
	}

	fn finalize(self) -> PoolResult
	{
		let Fetch { pb, oks, errs } = self;
		pb.finish();
		let errs = match errs.len() { 0 => None, _ => Some(PoolErrs { errs }) };
		PoolResult { oks, errs }
	}
}


fn fetch_worker(ctrl: &Control, req: Req) -> Result<Res, GetErr>
{
	let Req { source, filename } = req;
	let outpath = ctrl.dest_dir.join(&filename);

	let mut tmp = tempfile::NamedTempFile::new_in(&ctrl.dest_dir)?;

	match source
	{
		Source::Remote(url) =>
		{
			let resp = ctrl.agent.request_url("GET", &url).call()
					.map_err(|e| GetErr::Http(Box::new(e)))?;
			let mut rdr = resp.into_reader().take(LIMIT + 1);
			let n = io::copy(&mut rdr, tmp.as_file_mut())?;
			if n > LIMIT { return Err(GetErr::TooBig(filename, LIMIT)); }
		},
		Source::Local(path) =>
		{
			let mut f = fs::File::open(&path)?;
			io::copy(&mut f, tmp.as_file_mut())?;
		},
	}

	tmp.as_file().sync_all()?;
	tmp.persist(&outpath).map_err(|e| e.error)?;

	Ok(Res { filename })
}
