//! Single-instance guard per output target
//!
//! A lock file in a shared directory marks an export in progress. Its name is
//! derived from the canonical output path, so exports to different files can
//! run side by side while different spellings of one file share a lock. The
//! lock is reclaimed when it is older than the staleness threshold, when its
//! owning process is gone, or when its content cannot be read after a short
//! grace period.
//!
//! Lock files are only created or reclaimed while holding a short-lived marker
//! file next to the lock, so two contenders can never both decide that a stale
//! lock is theirs to replace.
//!
//! This is advisory and machine-local: it stops accidental concurrent runs,
//! not multi-host races.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sysinfo::{Pid, System};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::utils::canonical_target;

/// Locks older than this are presumed abandoned
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(6 * 60 * 60);

/// How long an unreadable lock file is given to be filled in by its creator.
/// Also the age after which a leftover marker is ignored.
const UNREADABLE_GRACE: Duration = Duration::from_secs(5);

/// Content of a lock file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRecord {
    pub pid: u32,
    pub target: PathBuf,
    pub created_at: DateTime<Utc>,
}

enum LockState {
    Held { pid: u32 },
    Stale { reason: String },
}

/// Held lock for one output target; released on drop
#[derive(Debug)]
pub struct RunGuard {
    path: PathBuf,
    record: LockRecord,
    released: bool,
}

impl RunGuard {
    /// Lock file path for an output target.
    ///
    /// Aliases of one file (`dir/./a.csv`, `dir/sub/../a.csv`) map to the same
    /// lock path.
    pub fn lock_path_for(lock_dir: &Path, target: &Path) -> PathBuf {
        let key = canonical_target(target).unwrap_or_else(|_| target.to_path_buf());
        let digest = Sha256::digest(key.to_string_lossy().as_bytes());
        lock_dir.join(format!("libretto-{}.lock", &hex::encode(digest)[..16]))
    }

    /// Take the lock for `target`, reclaiming it if the current holder is stale.
    pub fn acquire(lock_dir: &Path, target: &Path, stale_after: Duration) -> Result<Self> {
        fs::create_dir_all(lock_dir)?;
        let target = canonical_target(target)?;
        let path = Self::lock_path_for(lock_dir, &target);

        let Some(_marker) = AcquireMarker::create(&path)? else {
            // Another contender is taking this lock right now
            let pid = read_record(&path).map(|r| r.pid).unwrap_or(0);
            return Err(already_running(&path, pid));
        };

        match fs::symlink_metadata(&path) {
            Ok(_) => match inspect(&path, stale_after) {
                LockState::Held { pid } => return Err(already_running(&path, pid)),
                LockState::Stale { reason } => {
                    warn!(lock = %path.display(), "Reclaiming stale lock: {}", reason);
                    remove_if_present(&path)?;
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => Self::fill(file, path, target),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let pid = read_record(&path).map(|r| r.pid).unwrap_or(0);
                Err(already_running(&path, pid))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn fill(mut file: File, path: PathBuf, target: PathBuf) -> Result<Self> {
        let record = LockRecord {
            pid: std::process::id(),
            target,
            created_at: Utc::now(),
        };

        let written = serde_json::to_vec(&record)
            .map_err(io::Error::other)
            .and_then(|json| {
                file.write_all(&json)?;
                file.sync_all()
            });
        if let Err(e) = written {
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }

        debug!(lock = %path.display(), target = %record.target.display(), "Acquired run lock");
        Ok(Self {
            path,
            record,
            released: false,
        })
    }

    /// Lock file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock now instead of on drop
    pub fn release(mut self) -> Result<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        // Leave the file alone unless it is still the record we wrote
        if read_record(&self.path).as_ref() != Some(&self.record) {
            warn!(lock = %self.path.display(), "Lock no longer ours, leaving it");
            return Ok(());
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(lock = %self.path.display(), "Released run lock");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Err(e) = self.release_inner() {
            warn!(lock = %self.path.display(), "Failed to release run lock: {}", e);
        }
    }
}

/// Marker file held while one contender creates or reclaims a lock
struct AcquireMarker {
    path: PathBuf,
}

impl AcquireMarker {
    /// `None` when another contender holds the marker
    fn create(lock_path: &Path) -> Result<Option<Self>> {
        let path = lock_path.with_extension("lock.acquire");

        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Some(Self { path })),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    // Left behind by a contender that died while holding it
                    if file_age(&path).map_or(false, |age| age >= UNREADABLE_GRACE) {
                        warn!(marker = %path.display(), "Removing abandoned lock marker");
                        remove_if_present(&path)?;
                        continue;
                    }
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

impl Drop for AcquireMarker {
    fn drop(&mut self) {
        if let Err(e) = remove_if_present(&self.path) {
            warn!(marker = %self.path.display(), "Failed to remove lock marker: {}", e);
        }
    }
}

fn already_running(path: &Path, pid: u32) -> Error {
    Error::AlreadyRunning {
        lock_path: path.to_path_buf(),
        pid,
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn file_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    SystemTime::now().duration_since(modified).ok()
}

fn read_record(path: &Path) -> Option<LockRecord> {
    let content = fs::read(path).ok()?;
    serde_json::from_slice(&content).ok()
}

fn inspect(path: &Path, stale_after: Duration) -> LockState {
    let Some(record) = read_record(path) else {
        // Possibly still being written by its creator
        return match file_age(path) {
            Some(age) if age < UNREADABLE_GRACE => LockState::Held { pid: 0 },
            _ => LockState::Stale {
                reason: "unreadable lock file".to_string(),
            },
        };
    };

    let age = Utc::now()
        .signed_duration_since(record.created_at)
        .to_std()
        .unwrap_or(Duration::ZERO);
    if age > stale_after {
        return LockState::Stale {
            reason: format!("held by pid {} for {}s", record.pid, age.as_secs()),
        };
    }

    if !process_alive(record.pid) {
        return LockState::Stale {
            reason: format!("owner pid {} is no longer running", record.pid),
        };
    }

    LockState::Held { pid: record.pid }
}

fn process_alive(pid: u32) -> bool {
    if pid == std::process::id() {
        return true;
    }
    let mut sys = System::new();
    sys.refresh_process(Pid::from_u32(pid))
}
