//! # Retention Sweeper
//!
//! Deletes staged upload files that are strictly older than the maximum age.
//! Designed to run as a standalone periodic process (see the `sweep-uploads`
//! binary) concurrently with live request handling, so every per-entry
//! failure is logged and skipped rather than aborting the sweep; a file that
//! disappears between the directory listing and the delete call is treated
//! as already cleaned up.
//!
//! Re-running on an already-clean directory is a no-op.

use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

/// Staged files older than this are deleted: 24 hours.
pub const MAX_STAGED_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Outcome counters for one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Entries seen in the directory listing
    pub scanned: usize,
    /// Entries deleted because they were older than the threshold
    pub deleted: usize,
    /// Entries that could not be statted or deleted
    pub failed: usize,
}

/// Sweep `dir`, deleting entries whose modification time is strictly older
/// than `max_age`. The directory is created if absent. Only the listing
/// itself (or a missing, uncreatable directory) is a fatal error.
pub fn sweep(dir: &Path, max_age: Duration) -> io::Result<SweepStats> {
    sweep_at(dir, max_age, SystemTime::now())
}

/// Sweep with an explicit notion of "now". An entry aged exactly `max_age`
/// is retained; deletion requires strictly greater age.
pub fn sweep_at(dir: &Path, max_age: Duration, now: SystemTime) -> io::Result<SweepStats> {
    std::fs::create_dir_all(dir)?;

    let mut stats = SweepStats::default();

    for entry in std::fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to read directory entry");
                stats.failed += 1;
                continue;
            }
        };
        stats.scanned += 1;
        let path = entry.path();

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to stat entry, skipping");
                stats.failed += 1;
                continue;
            }
        };

        // A modification time in the future means the entry is not stale.
        let age = match now.duration_since(modified) {
            Ok(age) => age,
            Err(_) => continue,
        };

        if age <= max_age {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), age_secs = age.as_secs(), "deleted stale staged file");
                stats.deleted += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Deleted out from under us between listing and unlink.
                debug!(path = %path.display(), "entry already gone");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to delete stale staged file");
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use std::fs;

    fn touch_with_age(dir: &Path, name: &str, now: SystemTime, age: Duration) {
        let path = dir.join(name);
        fs::write(&path, b"audio bytes").unwrap();
        let mtime = FileTime::from_system_time(now - age);
        filetime::set_file_mtime(&path, mtime).unwrap();
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn deletes_strictly_older_keeps_newer() {
        let tmp = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        let max_age = Duration::from_secs(60 * 60);

        touch_with_age(tmp.path(), "stale.mp3", now, max_age + Duration::from_secs(1));
        touch_with_age(tmp.path(), "fresh.wav", now, Duration::from_secs(10));

        let stats = sweep_at(tmp.path(), max_age, now).unwrap();
        assert_eq!(stats.scanned, 2);
        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(names(tmp.path()), vec!["fresh.wav"]);
    }

    #[test]
    fn entry_exactly_at_threshold_is_retained() {
        let tmp = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        let max_age = Duration::from_secs(60 * 60);

        touch_with_age(tmp.path(), "boundary.ogg", now, max_age);

        let stats = sweep_at(tmp.path(), max_age, now).unwrap();
        assert_eq!(stats.deleted, 0);
        assert_eq!(names(tmp.path()), vec!["boundary.ogg"]);

        // One second past the threshold it goes.
        let stats = sweep_at(tmp.path(), max_age, now + Duration::from_secs(1)).unwrap();
        assert_eq!(stats.deleted, 1);
        assert!(names(tmp.path()).is_empty());
    }

    #[test]
    fn sweep_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        let max_age = Duration::from_secs(60);

        touch_with_age(tmp.path(), "old-1.mp3", now, Duration::from_secs(3600));
        touch_with_age(tmp.path(), "old-2.mp3", now, Duration::from_secs(7200));
        touch_with_age(tmp.path(), "new.mp3", now, Duration::from_secs(5));

        let first = sweep_at(tmp.path(), max_age, now).unwrap();
        assert_eq!(first.deleted, 2);
        let after_first = names(tmp.path());

        let second = sweep_at(tmp.path(), max_age, now).unwrap();
        assert_eq!(second.deleted, 0);
        assert_eq!(second.failed, 0);
        assert_eq!(names(tmp.path()), after_first);
    }

    #[test]
    fn future_mtime_is_retained() {
        let tmp = tempfile::tempdir().unwrap();
        let now = SystemTime::now();

        let path = tmp.path().join("from-the-future.wav");
        fs::write(&path, b"x").unwrap();
        let mtime = FileTime::from_system_time(now + Duration::from_secs(3600));
        filetime::set_file_mtime(&path, mtime).unwrap();

        let stats = sweep_at(tmp.path(), Duration::from_secs(60), now).unwrap();
        assert_eq!(stats.deleted, 0);
        assert_eq!(names(tmp.path()), vec!["from-the-future.wav"]);
    }

    #[test]
    fn creates_missing_directory_and_is_a_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("uploads");
        assert!(!dir.exists());

        let stats = sweep(&dir, MAX_STAGED_AGE).unwrap();
        assert!(dir.is_dir());
        assert_eq!(stats, SweepStats::default());
    }

    #[test]
    fn undeletable_entry_does_not_abort_the_sweep() {
        let tmp = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        let max_age = Duration::from_secs(60);

        // A stale subdirectory cannot be removed with remove_file; the
        // failure must be isolated and the stale sibling still deleted.
        let subdir = tmp.path().join("not-a-file");
        fs::create_dir(&subdir).unwrap();
        filetime::set_file_mtime(
            &subdir,
            FileTime::from_system_time(now - Duration::from_secs(3600)),
        )
        .unwrap();
        touch_with_age(tmp.path(), "stale.mp3", now, Duration::from_secs(3600));

        let stats = sweep_at(tmp.path(), max_age, now).unwrap();
        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(names(tmp.path()), vec!["not-a-file"]);
    }
}
