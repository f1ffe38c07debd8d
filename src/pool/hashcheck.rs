//! Concurrent hash-check pool: verifies a batch of just-downloaded
//! artifacts against their manifest entries, and relocates the ones
//! that check out into the artifact store.
use std::fs;
use std::path::PathBuf;

use indicatif::ProgressBar;

use crate::hash::{self, Sha1ReaderErr};
use crate::manifest::ReleaseEntry;


#[derive(Debug)]
pub struct HashCheck
{
	pb: ProgressBar,
	oks: Vec<Res>,
	errs: Vec<HashCheckErr>,
}

impl HashCheck
{
	pub fn new(pblen: usize) -> Self
	{
		Self {
			pb: ProgressBar::new(pblen as u64),
			oks: Vec::new(),
			errs: Vec::new(),
		}
	}
}


#[derive(Debug)]
pub struct PoolResult
{
	pub oks: Vec<Res>,
	pub errs: Option<PoolErrs>,
}

#[derive(Debug)]
#[derive(thiserror::Error)]
#[error("{errs:?}")]
pub struct PoolErrs
{
	pub errs: Vec<HashCheckErr>,
}


#[derive(Debug, Clone)]
pub struct Control
{
	/// Where just-downloaded files sit, unverified.
	pub src_dir: PathBuf,

	/// Where verified files get moved to (the store's `packages/`).
	pub dest_dir: PathBuf,
}

#[derive(Debug)]
pub struct Req
{
	pub entry: ReleaseEntry,
}

#[derive(Debug)]
pub struct Res
{
	pub filename: String,
}

#[derive(Debug)]
#[derive(thiserror::Error)]
pub enum HashCheckErr
{
	#[error("No such file: {0}")]
	Missing(PathBuf),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Size mismatch for {filename}: expected {expected}, got {got}")]
	SizeMismatch { filename: String, expected: u64, got: u64 },

	#[error("Hashing error: {0}")]
	Hashing(#[from] Sha1ReaderErr),

	#[error("Digest mismatch for {filename}: expected {expected}, got {got}")]
	DigestMismatch { filename: String, expected: String, got: String },
}


impl crate::pool::Pool for HashCheck
{
	type Control = Control;
	type UnitControl = Control;

	fn mk_unitcontrol(c: &Control) -> Control { c.clone() }

	type PoolResult = PoolResult;

	type WorkRequest = Req;
	type WorkResult = Res;
	type WorkErr = HashCheckErr;

	fn work(ctrl: &Control, req: Req) -> Result<Res, HashCheckErr>
	{
		hashcheck_worker(ctrl, req)
	}

	fn nthreads(&self) -> u32 { super::jobs_cpu() }

	fn work_result(&mut self, resp: Result<Res, HashCheckErr>)
	{
		self.pb.inc(1);
		match resp
		{
			Ok(r) => self.oks.push(r),
			Err(e) => self.errs.push(e),
		}
	}

	fn finalize(self) -> PoolResult
	{
		let HashCheck { pb, oks, errs } = self;
		pb.finish();
		let errs = match errs.len() { 0 => None, _ => Some(PoolErrs { errs }) };
		PoolResult { oks, errs }
	}
}


fn hashcheck_worker(ctrl: &Control, req: Req) -> Result<Res, HashCheckErr>
{
	use HashCheckErr as E;

	let Req { entry } = req;
	let srcpath = ctrl.src_dir.join(&entry.filename);
	let dstpath = ctrl.dest_dir.join(&entry.filename);

	let meta = fs::metadata(&srcpath).map_err(|_| E::Missing(srcpath.clone()))?;
	if meta.len() != entry.filesize
	{
		let _ = fs::remove_file(&srcpath);
		return Err(E::SizeMismatch {
			filename: entry.filename.clone(),
			expected: entry.filesize,
			got: meta.len(),
		});
	}

	let got = hash::sha1_file(&srcpath)?;
	if got != entry.sha1
	{
		let _ = fs::remove_file(&srcpath);
		return Err(E::DigestMismatch {
			filename: entry.filename.clone(),
			expected: entry.sha1.to_string(),
			got: got.to_string(),
		});
	}

	fs::create_dir_all(&ctrl.dest_dir)?;
	fs::rename(&srcpath, &dstpath)?;

	Ok(Res { filename: entry.filename })
}
