//! Persistence of student profiles and the quiz result log.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const PROFILES_FILE: &str = "students_profiles.json";
pub const RESULTS_FILE: &str = "quiz_results.json";

/// Per-student mastery record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub student_id: String,
    /// Lessons the student has not mastered yet
    #[serde(rename = "sous_acquis", default)]
    pub unmastered: BTreeSet<String>,
}

impl StudentProfile {
    pub fn empty(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            unmastered: BTreeSet::new(),
        }
    }
}

/// Immutable entry of the quiz result log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    #[serde(default)]
    pub id: String,
    pub student_id: String,
    /// `"<course>.<part>"`
    pub course: String,
    pub subskill_id: String,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub score: f64,
    pub percentage: f64,
    pub is_mastered: bool,
    /// RFC 3339, UTC
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable storage behind the mastery tracker.
///
/// Each save replaces the whole collection with snapshot `version` and
/// returns only once it is durably written. Snapshots are cumulative, so a
/// save older than the one already stored is discarded and reported as
/// written: the newer snapshot carries its content.
pub trait MasteryStore: Send + Sync {
    fn load_profiles(&self) -> Result<Vec<StudentProfile>, StoreError>;
    fn load_results(&self) -> Result<Vec<QuizResult>, StoreError>;
    fn save_profiles(&self, version: u64, profiles: &[StudentProfile]) -> Result<(), StoreError>;
    fn save_results(&self, version: u64, results: &[QuizResult]) -> Result<(), StoreError>;
}

// ==================== JSON files ====================

/// `students_profiles.json` and `quiz_results.json` inside a data directory.
///
/// Concurrent saves write and sync their own temp files in parallel; only
/// the rename is serialized, and it is skipped for stale versions.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    profiles_version: Mutex<u64>,
    results_version: Mutex<u64>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            profiles_version: Mutex::new(0),
            results_version: Mutex::new(0),
        }
    }

    pub fn profiles_path(&self) -> PathBuf {
        self.dir.join(PROFILES_FILE)
    }

    pub fn results_path(&self) -> PathBuf {
        self.dir.join(RESULTS_FILE)
    }
}

impl MasteryStore for JsonFileStore {
    fn load_profiles(&self) -> Result<Vec<StudentProfile>, StoreError> {
        read_json_array(&self.profiles_path())
    }

    fn load_results(&self) -> Result<Vec<QuizResult>, StoreError> {
        read_json_array(&self.results_path())
    }

    fn save_profiles(&self, version: u64, profiles: &[StudentProfile]) -> Result<(), StoreError> {
        write_versioned(
            &self.profiles_path(),
            "student profiles",
            &self.profiles_version,
            version,
            &profiles,
        )
    }

    fn save_results(&self, version: u64, results: &[QuizResult]) -> Result<(), StoreError> {
        write_versioned(
            &self.results_path(),
            "quiz results",
            &self.results_version,
            version,
            &results,
        )
    }
}

/// A missing file reads as an empty collection.
fn read_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    };
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Writes to a sibling temp file, syncs, then renames over the target.
pub fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    what: &'static str,
    value: &T,
) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    write_synced(&tmp, path, what, value)?;
    std::fs::rename(&tmp, path).map_err(|source| write_error(path, source))
}

/// Like [`write_json`], but the rename only happens when `version` is newer
/// than the last one renamed into place.
fn write_versioned<T: Serialize + ?Sized>(
    path: &Path,
    what: &'static str,
    published: &Mutex<u64>,
    version: u64,
    value: &T,
) -> Result<(), StoreError> {
    let tmp = path.with_extension(format!("json.{version}.tmp"));
    if let Err(err) = write_synced(&tmp, path, what, value) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err);
    }

    let mut published = published.lock();
    if version <= *published {
        drop(published);
        if let Err(err) = std::fs::remove_file(&tmp) {
            tracing::warn!(path = %tmp.display(), error = %err, "failed to remove stale snapshot");
        }
        return Ok(());
    }
    std::fs::rename(&tmp, path).map_err(|source| write_error(path, source))?;
    *published = version;
    Ok(())
}

fn write_synced<T: Serialize + ?Sized>(
    tmp: &Path,
    target: &Path,
    what: &'static str,
    value: &T,
) -> Result<(), StoreError> {
    use std::io::Write;

    let bytes =
        serde_json::to_vec_pretty(value).map_err(|source| StoreError::Encode { what, source })?;
    let mut file = std::fs::File::create(tmp).map_err(|source| write_error(target, source))?;
    file.write_all(&bytes).map_err(|source| write_error(target, source))?;
    file.sync_all().map_err(|source| write_error(target, source))
}

fn write_error(path: &Path, source: io::Error) -> StoreError {
    StoreError::Write {
        path: path.display().to_string(),
        source,
    }
}

// ==================== In-memory ====================

/// Volatile store with switchable write failures
#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: Mutex<(u64, Vec<StudentProfile>)>,
    results: Mutex<(u64, Vec<QuizResult>)>,
    fail_profiles: AtomicBool,
    fail_results: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: Vec<StudentProfile>) -> Self {
        Self {
            profiles: Mutex::new((0, profiles)),
            ..Self::default()
        }
    }

    pub fn fail_profile_writes(&self, fail: bool) {
        self.fail_profiles.store(fail, Ordering::SeqCst);
    }

    pub fn fail_result_writes(&self, fail: bool) {
        self.fail_results.store(fail, Ordering::SeqCst);
    }

    pub fn saved_profiles(&self) -> Vec<StudentProfile> {
        self.profiles.lock().1.clone()
    }

    pub fn saved_results(&self) -> Vec<QuizResult> {
        self.results.lock().1.clone()
    }
}

fn replace_if_newer<T: Clone>(slot: &Mutex<(u64, Vec<T>)>, version: u64, items: &[T]) {
    let mut slot = slot.lock();
    if version > slot.0 {
        *slot = (version, items.to_vec());
    }
}

impl MasteryStore for MemoryStore {
    fn load_profiles(&self) -> Result<Vec<StudentProfile>, StoreError> {
        Ok(self.saved_profiles())
    }

    fn load_results(&self) -> Result<Vec<QuizResult>, StoreError> {
        Ok(self.saved_results())
    }

    fn save_profiles(&self, version: u64, profiles: &[StudentProfile]) -> Result<(), StoreError> {
        if self.fail_profiles.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("profile writes disabled".into()));
        }
        replace_if_newer(&self.profiles, version, profiles);
        Ok(())
    }

    fn save_results(&self, version: u64, results: &[QuizResult]) -> Result<(), StoreError> {
        if self.fail_results.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("result writes disabled".into()));
        }
        replace_if_newer(&self.results, version, results);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> QuizResult {
        QuizResult {
            id: "r1".into(),
            student_id: "s1".into(),
            course: "2.1".into(),
            subskill_id: "2.1".into(),
            total_questions: 10,
            correct_answers: 9,
            score: 0.9,
            percentage: 90.0,
            is_mastered: true,
            timestamp: "2024-01-01T00:00:00.000Z".into(),
        }
    }

    fn temp_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn test_missing_files_read_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load_profiles().unwrap().is_empty());
        assert!(store.load_results().unwrap().is_empty());
    }

    #[test]
    fn test_profiles_use_sous_acquis_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let mut profile = StudentProfile::empty("s1");
        profile.unmastered.insert("2.1".into());
        store.save_profiles(1, &[profile.clone()]).unwrap();

        let raw = std::fs::read_to_string(store.profiles_path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[0]["sous_acquis"][0], "2.1");
        assert_eq!(store.load_profiles().unwrap(), vec![profile]);
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_legacy_profile_with_duplicates_collapses() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROFILES_FILE),
            r#"[{"student_id":"s1","sous_acquis":["2.1","2.1","1.3"]}]"#,
        )
        .unwrap();
        let profiles = JsonFileStore::new(dir.path()).load_profiles().unwrap();
        assert_eq!(profiles[0].unmastered.len(), 2);
    }

    #[test]
    fn test_legacy_result_without_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(RESULTS_FILE),
            r#"[{"student_id":"s1","course":"1.1","subskill_id":"1.1","total_questions":4,
                "correct_answers":1,"score":0.25,"percentage":25.0,"is_mastered":false,
                "timestamp":"2024-03-01T10:00:00"}]"#,
        )
        .unwrap();
        let results = JsonFileStore::new(dir.path()).load_results().unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].id.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(RESULTS_FILE), "{not json").unwrap();
        let err = JsonFileStore::new(dir.path()).load_results().unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[test]
    fn test_results_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.save_results(1, &[sample_result()]).unwrap();
        assert_eq!(store.load_results().unwrap(), vec![sample_result()]);
    }

    #[test]
    fn test_stale_snapshot_does_not_replace_newer() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let mut second = sample_result();
        second.id = "r2".into();

        store.save_results(2, &[sample_result(), second.clone()]).unwrap();
        store.save_results(1, &[sample_result()]).unwrap();

        assert_eq!(store.load_results().unwrap(), vec![sample_result(), second]);
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_memory_store_failure_switches() {
        let store = MemoryStore::new();
        store.fail_result_writes(true);
        assert!(store.save_results(1, &[sample_result()]).is_err());
        assert!(store.saved_results().is_empty());
        store.fail_result_writes(false);
        store.save_results(1, &[sample_result()]).unwrap();
        assert_eq!(store.saved_results().len(), 1);
        store.save_results(1, &[]).unwrap();
        assert_eq!(store.saved_results().len(), 1);
    }
}
