//! Concurrency and durability tests for the mastery tracker.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use curriculum_backend::services::mastery::{MasteryTracker, QuizSubmission, TrackerError};
use curriculum_backend::services::store::{
    JsonFileStore, MasteryStore, MemoryStore, QuizResult, StoreError, StudentProfile,
};

fn submission(student: &str, course: u32, part: u32, correct: u32) -> QuizSubmission {
    QuizSubmission {
        student_id: student.to_string(),
        course_number: course,
        part_number: part,
        total_questions: 10,
        correct_answers: correct,
    }
}

/// Log writes stall while the newest record belongs to `slow_student`.
struct SlowStore {
    inner: MemoryStore,
    slow_student: &'static str,
    delay: Duration,
}

impl MasteryStore for SlowStore {
    fn load_profiles(&self) -> Result<Vec<StudentProfile>, StoreError> {
        self.inner.load_profiles()
    }

    fn load_results(&self) -> Result<Vec<QuizResult>, StoreError> {
        self.inner.load_results()
    }

    fn save_profiles(&self, version: u64, profiles: &[StudentProfile]) -> Result<(), StoreError> {
        self.inner.save_profiles(version, profiles)
    }

    fn save_results(&self, version: u64, results: &[QuizResult]) -> Result<(), StoreError> {
        if results.last().is_some_and(|r| r.student_id == self.slow_student) {
            thread::sleep(self.delay);
        }
        self.inner.save_results(version, results)
    }
}

#[test]
fn test_slow_write_does_not_stall_other_students() {
    let store = Arc::new(SlowStore {
        inner: MemoryStore::new(),
        slow_student: "a",
        delay: Duration::from_millis(500),
    });
    let tracker = Arc::new(MasteryTracker::open(store.clone()).unwrap());

    let elapsed = thread::scope(|scope| {
        let slow_tracker = Arc::clone(&tracker);
        let slow = scope.spawn(move || slow_tracker.evaluate_quiz(submission("a", 1, 1, 2)));
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        tracker.evaluate_quiz(submission("b", 1, 2, 2)).unwrap();
        let elapsed = started.elapsed();

        slow.join().unwrap().unwrap();
        elapsed
    });

    assert!(elapsed < Duration::from_millis(250), "student b waited {elapsed:?}");
    // the older snapshot finishing last must not drop the newer submission
    assert_eq!(store.inner.saved_results().len(), 2);
    assert_eq!(store.inner.saved_profiles().len(), 2);
    assert!(tracker.unmastered("a").contains("1.1"));
    assert!(tracker.unmastered("b").contains("1.2"));
}

#[test]
fn test_concurrent_students_lose_no_updates() {
    let store = Arc::new(MemoryStore::new());
    let tracker = Arc::new(MasteryTracker::open(store.clone()).unwrap());

    thread::scope(|scope| {
        for s in 0..8 {
            let tracker = Arc::clone(&tracker);
            scope.spawn(move || {
                let student = format!("student-{s}");
                for part in 1..=7 {
                    tracker
                        .evaluate_quiz(submission(&student, 1, part, 2))
                        .unwrap();
                }
            });
        }
    });

    assert_eq!(store.saved_results().len(), 56);
    let profiles = store.saved_profiles();
    assert_eq!(profiles.len(), 8);
    assert!(profiles.iter().all(|p| p.unmastered.len() == 7));
    assert_eq!(tracker.global_statistics().total_students, 8);
}

#[test]
fn test_concurrent_submissions_for_one_student() {
    let store = Arc::new(MemoryStore::new());
    let tracker = Arc::new(MasteryTracker::open(store.clone()).unwrap());

    thread::scope(|scope| {
        for _ in 0..6 {
            let tracker = Arc::clone(&tracker);
            scope.spawn(move || {
                for _ in 0..5 {
                    tracker.evaluate_quiz(submission("s1", 4, 2, 1)).unwrap();
                }
            });
        }
    });

    assert_eq!(tracker.get_history("s1").len(), 30);
    let unmastered = tracker.unmastered("s1");
    assert_eq!(unmastered.len(), 1);
    assert!(unmastered.contains("4.2"));
}

#[test]
fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store: Arc<dyn MasteryStore> = Arc::new(JsonFileStore::new(dir.path()));
        let tracker = MasteryTracker::open(store).unwrap();
        tracker.evaluate_quiz(submission("s1", 5, 1, 3)).unwrap();
        tracker.evaluate_quiz(submission("s1", 5, 2, 9)).unwrap();
    }

    let store: Arc<dyn MasteryStore> = Arc::new(JsonFileStore::new(dir.path()));
    let reopened = MasteryTracker::open(store).unwrap();

    assert!(reopened.unmastered("s1").contains("5.1"));
    assert!(!reopened.unmastered("s1").contains("5.2"));
    let history = reopened.get_history("s1");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].subskill_id, "5.2");
    assert!(!history[0].id.is_empty());
}

#[test]
fn test_failed_write_leaves_disk_and_memory_untouched() {
    let store = Arc::new(MemoryStore::new());
    let tracker = MasteryTracker::open(store.clone()).unwrap();
    tracker.evaluate_quiz(submission("s1", 6, 1, 1)).unwrap();
    let profiles_before = store.saved_profiles();

    store.fail_profile_writes(true);
    let err = tracker.evaluate_quiz(submission("s1", 6, 1, 10)).unwrap_err();
    assert!(matches!(err, TrackerError::Persistence(_)));

    assert_eq!(store.saved_profiles(), profiles_before);
    assert_eq!(store.saved_results().len(), 1);
    assert!(tracker.unmastered("s1").contains("6.1"));

    store.fail_profile_writes(false);
    tracker.evaluate_quiz(submission("s1", 6, 1, 10)).unwrap();
    assert!(tracker.unmastered("s1").is_empty());
    assert_eq!(store.saved_results().len(), 2);
}
