//! PendingDeletes: a JSON marker file standing in for
//! `MoveFileEx(MOVEFILE_DELAY_UNTIL_REBOOT)` on platforms without a
//! native delay-until-reboot facility. `CLEAN_DEAD` retries everything
//! queued here once per pipeline invocation before doing its own work.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDelete
{
	pub path: PathBuf,
	pub scheduled_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingDeletes
{
	pub entries: Vec<PendingDelete>,
}

#[derive(Debug)]
#[derive(thiserror::Error)]
pub enum PendingErr
{
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Corrupt pending-deletes file: {0}")]
	Corrupt(#[from] serde_json::Error),
}

const FILENAME: &str = "pending-deletes.json";

fn file_path(workdir: &Path) -> PathBuf { workdir.join(FILENAME) }

impl PendingDeletes
{
	pub fn load(workdir: &Path) -> Result<Self, PendingErr>
	{
		let path = file_path(workdir);
		match fs::read_to_string(&path)
		{
			Ok(text) => Ok(serde_json::from_str(&text)?),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
			Err(e) => Err(e.into()),
		}
	}

	pub fn save(&self, workdir: &Path) -> Result<(), PendingErr>
	{
		let text = serde_json::to_string_pretty(self)?;
		fs::write(file_path(workdir), text)?;
		Ok(())
	}

	pub fn push(&mut self, path: PathBuf, now: chrono::DateTime<chrono::Utc>)
	{
		self.entries.push(PendingDelete { path, scheduled_at: now });
	}

	/// Retry every queued deletion once.  Entries that still fail stay
	/// queued; entries that succeed (or whose target is already gone)
	/// drop out.
	pub fn retry_all(&mut self)
	{
		self.entries.retain(|e| {
			if !e.path.exists() { return false; }
			match remove_dir(&e.path) {
				Ok(()) => false,
				Err(_) => true,
			}
		});
	}
}

fn remove_dir(path: &Path) -> std::io::Result<()>
{
	if path.is_dir() { fs::remove_dir_all(path) } else { fs::remove_file(path) }
}


/// Try to delete `path` immediately; on failure, queue it in
/// `pending-deletes.json` under `workdir` for the next pipeline run.
/// Never returns an error -- `CLEAN_DEAD` must be tolerant of failure
/// here (spec §4.8).
pub fn delete_or_schedule(workdir: &Path, path: &Path, now: chrono::DateTime<chrono::Utc>)
{
	if remove_dir(path).is_ok() { return; }

	let mut pending = PendingDeletes::load(workdir).unwrap_or_default();
	pending.push(path.to_path_buf(), now);
	let _ = pending.save(workdir);
}



#[cfg(test)]
mod tests
{
	use super::*;

	fn now() -> chrono::DateTime<chrono::Utc>
	{
		chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap()
	}

	#[test]
	fn schedule_and_retry()
	{
		let dir = tempfile::tempdir().unwrap();
		let target = dir.path().join("app-1.0.0");
		fs::create_dir(&target).unwrap();

		// Hold a file open inside so the directory can't be removed on
		// platforms where that blocks removal -- on most unix systems
		// removal would actually succeed regardless, so just force the
		// queued path directly to exercise the retry/save format.
		let mut pending = PendingDeletes::default();
		pending.push(target.clone(), now());
		pending.save(dir.path()).unwrap();

		let mut loaded = PendingDeletes::load(dir.path()).unwrap();
		assert_eq!(loaded.entries.len(), 1);

		loaded.retry_all();
		assert!(loaded.entries.is_empty());
		assert!(!target.exists());
	}

	#[test]
	fn load_missing_file_is_empty()
	{
		let dir = tempfile::tempdir().unwrap();
		let loaded = PendingDeletes::load(dir.path()).unwrap();
		assert!(loaded.entries.is_empty());
	}

	#[test]
	fn delete_or_schedule_succeeds_immediately()
	{
		let dir = tempfile::tempdir().unwrap();
		let target = dir.path().join("app-1.0.0");
		fs::create_dir(&target).unwrap();

		delete_or_schedule(dir.path(), &target, now());
		assert!(!target.exists());

		let pending = PendingDeletes::load(dir.path()).unwrap();
		assert!(pending.entries.is_empty());
	}
}
