//! Global Install Lock (C4) — a cross-process advisory lock over an
//! installation root, so two pipeline runs against the same install
//! never race (spec §4.4).
//!
//! Backed by `fs4`'s advisory file locking (the same primitive
//! `cargo-binstall` and friends use for this), keyed by a lock file
//! inside the installation root.  Acquisition is bounded: we poll with
//! backoff rather than blocking forever, and give up with
//! `AnotherInstanceActive` once the timeout elapses.
//!
//! Within a single process, a second acquisition for the *same* root is
//! allowed to nest rather than deadlock against itself or fail --
//! tracked via a small process-wide registry keyed by a digest of the
//! root path.
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use fs4::FileExt;

use crate::hash;


const LOCK_FILENAME: &str = ".relup-lock";
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const ACQUIRE_TIMEOUT: Duration = Duration::from_millis(2000);


#[derive(Debug)]
#[derive(thiserror::Error)]
pub enum LockErr
{
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Another instance is already updating this installation")]
	AnotherInstanceActive,
}


/// Process-wide registry of held locks, keyed by the lock identity
/// (`hash::digest_hex` of the root path's bytes).  The count lets a
/// second acquisition from the same process for the same root nest
/// instead of deadlocking against the OS-level advisory lock it
/// already holds.
struct Slot
{
	file: File,
	count: usize,
}

fn registry() -> &'static Mutex<HashMap<String, Arc<Mutex<Slot>>>>
{
	static REG: OnceLock<Mutex<HashMap<String, Arc<Mutex<Slot>>>>> = OnceLock::new();
	REG.get_or_init(|| Mutex::new(HashMap::new()))
}


/// RAII handle on the global install lock.  Dropping it releases the
/// lock (and, for a nested same-process acquisition, just decrements
/// the hold count).
pub struct LockGuard
{
	ident: String,
	slot: Arc<Mutex<Slot>>,
}

impl Drop for LockGuard
{
	fn drop(&mut self)
	{
		let mut reg = registry().lock().unwrap();

		let done = {
			let mut slot = self.slot.lock().unwrap();
			slot.count -= 1;
			if slot.count == 0
			{
				let _ = fs4::FileExt::unlock(&slot.file);
			}
			slot.count == 0
		};

		if done { reg.remove(&self.ident); }
	}
}


/// Identity string for the lock over a given installation root: a
/// digest of the canonicalized (or best-effort absolute) root path, so
/// two differently-spelled paths to the same directory still collide.
fn lock_identity(root: &Path) -> String
{
	let canon = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
	hash::digest_hex(canon.to_string_lossy().as_bytes())
}

fn lock_path(root: &Path) -> PathBuf { root.join(LOCK_FILENAME) }


/// Acquire the global install lock over `root`, blocking with
/// poll-and-backoff up to a bounded timeout.
///
/// Same-process re-entrant acquisition (e.g. a pipeline step that
/// itself calls into another lock-taking step) succeeds immediately and
/// nests; a genuinely different process holding the OS-level lock
/// causes this to retry until `AnotherInstanceActive`.
pub fn acquire(root: &Path) -> Result<LockGuard, LockErr>
{
	fs::create_dir_all(root)?;
	let ident = lock_identity(root);

	// Fast path: this process already holds the lock for this root.
	{
		let reg = registry().lock().unwrap();
		if let Some(slot) = reg.get(&ident)
		{
			let mut s = slot.lock().unwrap();
			s.count += 1;
			drop(s);
			return Ok(LockGuard { ident, slot: Arc::clone(slot) });
		}
	}

	let file = OpenOptions::new()
			.create(true)
			.write(true)
			.open(lock_path(root))?;

	let deadline = Instant::now() + ACQUIRE_TIMEOUT;
	loop
	{
		match file.try_lock_exclusive()
		{
			Ok(()) => break,
			Err(_) if Instant::now() < deadline =>
			{ std::thread::sleep(POLL_INTERVAL); },
			Err(_) => return Err(LockErr::AnotherInstanceActive),
		}
	}

	let mut reg = registry().lock().unwrap();
	// Another thread in this process may have raced us to register the
	// same identity while we were blocked on the OS lock (which, being
	// the same process, would have succeeded immediately too) -- if so,
	// just nest onto it and drop our freshly opened handle.
	if let Some(slot) = reg.get(&ident)
	{
		let mut s = slot.lock().unwrap();
		s.count += 1;
		let slot = Arc::clone(slot);
		drop(s);
		return Ok(LockGuard { ident, slot });
	}

	let slot = Arc::new(Mutex::new(Slot { file, count: 1 }));
	reg.insert(ident.clone(), Arc::clone(&slot));

	Ok(LockGuard { ident, slot })
}



#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn acquire_and_release()
	{
		let dir = tempfile::tempdir().unwrap();
		let guard = acquire(dir.path()).unwrap();
		drop(guard);
		// Should be acquirable again after release.
		let _guard2 = acquire(dir.path()).unwrap();
	}

	#[test]
	fn reentrant_same_process()
	{
		let dir = tempfile::tempdir().unwrap();
		let g1 = acquire(dir.path()).unwrap();
		let g2 = acquire(dir.path()).unwrap();
		drop(g1);
		drop(g2);
	}

	#[test]
	fn different_roots_dont_conflict()
	{
		let dir1 = tempfile::tempdir().unwrap();
		let dir2 = tempfile::tempdir().unwrap();
		let _g1 = acquire(dir1.path()).unwrap();
		let _g2 = acquire(dir2.path()).unwrap();
	}

	#[test]
	fn second_process_simulated_via_separate_handle_times_out()
	{
		let dir = tempfile::tempdir().unwrap();
		let _guard = acquire(dir.path()).unwrap();

		// Simulate a foreign process by locking the same file directly,
		// bypassing our in-process registry.
		let file = OpenOptions::new().write(true).open(lock_path(dir.path())).unwrap();
		let err = file.try_lock_exclusive();
		assert!(err.is_err());
	}
}
