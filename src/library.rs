//! Recording library
//!
//! Manages the saved-recordings directory: copying finished recordings in,
//! listing them newest-first, and deleting them. The directory itself is the
//! only index; there is no metadata database.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A saved recording, identified by its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingEntry {
    pub name: String,
    pub modified: Option<SystemTime>,
}

/// The saved-recordings directory and the operations on it.
pub struct RecordingLibrary {
    dir: PathBuf,
}

impl RecordingLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the recordings directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create recordings directory {:?}", self.dir))
    }

    /// Copy `source` into the library. With no destination a timestamp-based
    /// name is generated. Returns the path of the saved file.
    pub fn save(&self, source: &Path, destination: Option<&Path>) -> Result<PathBuf> {
        let dest = match destination {
            Some(path) => path.to_path_buf(),
            None => {
                self.ensure_dir()?;
                self.dir.join(default_name_at(Local::now()))
            }
        };

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {:?}", parent))?;
            }
        }

        std::fs::copy(source, &dest)
            .with_context(|| format!("failed to copy {:?} to {:?}", source, dest))?;

        Ok(dest)
    }

    /// List saved recordings, `.wav` files only, newest first.
    pub fn list(&self) -> Result<Vec<RecordingEntry>> {
        self.ensure_dir()?;

        let mut entries: Vec<(RecordingEntry, PathBuf)> = std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read recordings directory {:?}", self.dir))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_wav_extension(path))
            .filter_map(|path| {
                let name = path.file_name()?.to_string_lossy().to_string();
                let modified = path.metadata().and_then(|m| m.modified()).ok();
                Some((RecordingEntry { name, modified }, path))
            })
            .collect();

        // Newest first
        entries.sort_by(|(a, _), (b, _)| b.modified.cmp(&a.modified));

        Ok(entries.into_iter().map(|(entry, _)| entry).collect())
    }

    /// Delete a recording by file name. Returns `Ok(false)` if it was absent.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path).with_context(|| format!("failed to delete {:?}", path))?;
        Ok(true)
    }

    /// Resolve a file name to its full path inside the library.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

fn has_wav_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

/// Generate the default save name for a given local time,
/// e.g. `recording_20260830_142305.wav`.
fn default_name_at(now: DateTime<Local>) -> String {
    format!("recording_{}.wav", now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs::File;
    use std::time::Duration;

    fn touch(path: &Path, modified: SystemTime) {
        File::create(path).unwrap();
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(modified).unwrap();
    }

    #[test]
    fn test_list_filters_and_sorts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let library = RecordingLibrary::new(dir.path());

        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        touch(&dir.path().join("old.wav"), base);
        touch(&dir.path().join("mid.WAV"), base + Duration::from_secs(60));
        touch(&dir.path().join("new.wav"), base + Duration::from_secs(120));
        touch(&dir.path().join("notes.txt"), base + Duration::from_secs(300));

        let names: Vec<String> = library.list().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["new.wav", "mid.WAV", "old.wav"]);
    }

    #[test]
    fn test_list_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let library = RecordingLibrary::new(dir.path().join("recordings"));
        assert!(library.list().unwrap().is_empty());
        assert!(library.dir().is_dir());
    }

    #[test]
    fn test_delete_missing_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let library = RecordingLibrary::new(dir.path());
        assert!(!library.delete("nope.wav").unwrap());
    }

    #[test]
    fn test_delete_existing_returns_true() {
        let dir = tempfile::tempdir().unwrap();
        let library = RecordingLibrary::new(dir.path());
        File::create(dir.path().join("take1.wav")).unwrap();
        assert!(library.delete("take1.wav").unwrap());
        assert!(!dir.path().join("take1.wav").exists());
    }

    #[test]
    fn test_default_name_pattern_and_distinct_across_seconds() {
        let t1 = Local.with_ymd_and_hms(2026, 8, 30, 14, 23, 5).unwrap();
        let t2 = Local.with_ymd_and_hms(2026, 8, 30, 14, 23, 6).unwrap();

        let name = default_name_at(t1);
        assert_eq!(name, "recording_20260830_142305.wav");
        assert!(name.starts_with("recording_"));
        assert!(name.ends_with(".wav"));
        assert_ne!(name, default_name_at(t2));
    }

    #[test]
    fn test_save_round_trip_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let library = RecordingLibrary::new(dir.path().join("saved"));

        let source = dir.path().join("temp.wav");
        let payload: Vec<u8> = (0u16..2048).flat_map(|v| v.to_le_bytes()).collect();
        std::fs::write(&source, &payload).unwrap();

        let saved = library.save(&source, None).unwrap();
        let name = saved.file_name().unwrap().to_string_lossy().to_string();
        let read_back = std::fs::read(library.path_for(&name)).unwrap();
        assert_eq!(read_back, payload);
    }

    #[test]
    fn test_save_with_explicit_destination() {
        let dir = tempfile::tempdir().unwrap();
        let library = RecordingLibrary::new(dir.path());

        let source = dir.path().join("temp.wav");
        std::fs::write(&source, b"RIFF").unwrap();

        let dest = dir.path().join("nested").join("keeper.wav");
        let saved = library.save(&source, Some(&dest)).unwrap();
        assert_eq!(saved, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"RIFF");
    }
}
