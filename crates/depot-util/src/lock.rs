//! The pidfile protocol that keeps installs and GC from racing in the same
//! depot (spec.md §5 "Ordering guarantees", item 3).
//!
//! An install acquires a [`PidLock`] on `<install_path>.pid` before it
//! begins writing; GC treats any path whose pidfile was written within the
//! staleness window as active and skips it.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::UtilError;

/// Default staleness window: a pidfile older than this is assumed to
/// belong to a crashed process rather than a live install.
pub const DEFAULT_STALENESS: Duration = Duration::from_secs(20);

fn pidfile_path(install_path: &Path) -> PathBuf {
    let mut name = install_path.as_os_str().to_owned();
    name.push(".pid");
    PathBuf::from(name)
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A held lock on `<install_path>.pid`. Removed on drop.
#[derive(Debug)]
pub struct PidLock {
    path: PathBuf,
}

impl PidLock {
    /// Acquire the lock, recording this process's PID and the current time.
    ///
    /// # Errors
    /// Returns an error if the pidfile cannot be written.
    pub fn acquire(install_path: &Path) -> Result<Self, UtilError> {
        let path = pidfile_path(install_path);
        let contents = format!("{}\n{}\n", std::process::id(), now_unix());
        crate::fs::write_atomic(&path, contents.as_bytes())?;
        Ok(PidLock { path })
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// `true` if `install_path` has a pidfile written within `staleness` of now.
///
/// GC consults this before sweeping a path; an install in progress is
/// never collected.
#[must_use]
pub fn is_locked(install_path: &Path, staleness: Duration) -> bool {
    let path = pidfile_path(install_path);
    let Ok(contents) = std::fs::read_to_string(&path) else {
        return false;
    };
    let Some(recorded) = contents.lines().nth(1).and_then(|line| line.parse::<u64>().ok()) else {
        return false;
    };
    now_unix().saturating_sub(recorded) < staleness.as_secs()
}
