//! Mastery Tracker
//!
//! Owns the per-student unmastered sets and the quiz result log. Quiz
//! submissions for the same student are serialized. Every submission stages
//! its change into a versioned, cumulative snapshot and writes that snapshot
//! without holding any shared lock, so students never wait on each other's
//! file writes. The store keeps the newest snapshot.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use curriculum_algo::quiz::{
    calculate_score, course_to_lesson, feedback_message, is_mastered, threshold_percentage,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::store::{MasteryStore, QuizResult, StoreError, StudentProfile};

const MOST_UNMASTERED_LIMIT: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),
    #[error("no lesson mapped to course {course_number} part {part_number}")]
    UnmappedCourse { course_number: u32, part_number: u32 },
    #[error("failed to persist mastery state: {0}")]
    Persistence(#[source] StoreError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizSubmission {
    pub student_id: String,
    pub course_number: u32,
    pub part_number: u32,
    pub total_questions: u32,
    pub correct_answers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizEvaluation {
    pub student_id: String,
    pub course: String,
    pub subskill_id: String,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub score: f64,
    pub percentage: f64,
    pub is_mastered: bool,
    /// Mastery threshold as a percentage
    pub threshold: f64,
    /// Whether the unmastered set changed
    pub student_profile_updated: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuizStatistics {
    pub total_quizzes: usize,
    pub average_score: f64,
    pub average_percentage: f64,
    pub mastered_count: usize,
    pub not_mastered_count: usize,
    /// Percentage of mastered submissions
    pub mastery_rate: f64,
}

impl QuizStatistics {
    fn from_results<'a>(results: impl Iterator<Item = &'a QuizResult>) -> Self {
        let mut total = 0usize;
        let mut score_sum = 0.0;
        let mut mastered = 0usize;
        for result in results {
            total += 1;
            score_sum += result.score;
            if result.is_mastered {
                mastered += 1;
            }
        }
        if total == 0 {
            return Self::default();
        }

        let average_score = score_sum / total as f64;
        Self {
            total_quizzes: total,
            average_score,
            average_percentage: average_score * 100.0,
            mastered_count: mastered,
            not_mastered_count: total - mastered,
            mastery_rate: mastered as f64 / total as f64 * 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonCount {
    pub lesson_id: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalStatistics {
    pub total_students: usize,
    pub quiz_statistics: QuizStatistics,
    /// Lessons most often unmastered, count desc then id asc
    pub most_common_unmastered: Vec<LessonCount>,
}

#[derive(Debug, Clone, Default)]
struct TrackerState {
    profiles: Vec<StudentProfile>,
    results: Vec<QuizResult>,
}

impl TrackerState {
    fn profile_mut(&mut self, student_id: &str) -> &mut StudentProfile {
        let idx = match self.profiles.iter().position(|p| p.student_id == student_id) {
            Some(idx) => idx,
            None => {
                self.profiles.push(StudentProfile::empty(student_id));
                self.profiles.len() - 1
            }
        };
        &mut self.profiles[idx]
    }

    fn restore_profile(&mut self, student_id: &str, previous: Option<&StudentProfile>) {
        match previous {
            Some(previous) => *self.profile_mut(student_id) = previous.clone(),
            None => self.profiles.retain(|p| p.student_id != student_id),
        }
    }
}

/// Changes accepted for writing, including ones still in flight
#[derive(Debug, Default)]
struct Staging {
    version: u64,
    /// Newest version whose snapshot was fully written
    durable: u64,
    state: TrackerState,
}

/// One submission's staged change, enough to take it back out
struct StagedChange {
    version: u64,
    record: QuizResult,
    previous_profile: Option<StudentProfile>,
    profile: StudentProfile,
    changed: bool,
}

pub struct MasteryTracker {
    store: Arc<dyn MasteryStore>,
    /// What readers see: only fully written submissions
    committed: RwLock<TrackerState>,
    staging: Mutex<Staging>,
    student_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Lesson ids of the loaded curriculum, when known
    catalog: Option<HashSet<String>>,
}

impl MasteryTracker {
    /// Loads the committed state from `store`.
    pub fn open(store: Arc<dyn MasteryStore>) -> Result<Self, StoreError> {
        let profiles = store.load_profiles()?;
        let results = store.load_results()?;
        tracing::info!(
            students = profiles.len(),
            results = results.len(),
            "mastery state loaded"
        );

        let state = TrackerState { profiles, results };
        Ok(Self {
            store,
            committed: RwLock::new(state.clone()),
            staging: Mutex::new(Staging {
                state,
                ..Staging::default()
            }),
            student_locks: Mutex::new(HashMap::new()),
            catalog: None,
        })
    }

    /// Restricts quiz submissions to lessons of the loaded curriculum; a
    /// mapped course whose lesson is not in `lesson_ids` is rejected as
    /// unmapped.
    pub fn with_catalog<I, S>(mut self, lesson_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalog = Some(lesson_ids.into_iter().map(Into::into).collect());
        self
    }

    fn student_lock(&self, student_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.student_locks.lock();
        Arc::clone(
            locks
                .entry(student_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    fn resolve_lesson(&self, course_number: u32, part_number: u32) -> Result<String, TrackerError> {
        let unmapped = || TrackerError::UnmappedCourse {
            course_number,
            part_number,
        };
        let lesson_id = course_to_lesson(course_number, part_number).ok_or_else(unmapped)?;
        match &self.catalog {
            Some(catalog) if !catalog.contains(&lesson_id) => {
                tracing::warn!(lesson_id = %lesson_id, "quiz lesson is not part of the curriculum");
                Err(unmapped())
            }
            _ => Ok(lesson_id),
        }
    }

    /// Scores a quiz, appends it to the log and updates the student's
    /// unmastered set. Nothing is committed unless both stores were written.
    pub fn evaluate_quiz(&self, submission: QuizSubmission) -> Result<QuizEvaluation, TrackerError> {
        let student_id = submission.student_id.trim().to_string();
        if student_id.is_empty() {
            return Err(TrackerError::InvalidSubmission(
                "student_id must not be empty".into(),
            ));
        }
        if submission.correct_answers > submission.total_questions {
            return Err(TrackerError::InvalidSubmission(format!(
                "correct_answers ({}) exceeds total_questions ({})",
                submission.correct_answers, submission.total_questions
            )));
        }

        let lesson_id = self.resolve_lesson(submission.course_number, submission.part_number)?;

        let score = calculate_score(submission.total_questions, submission.correct_answers);
        let mastered = is_mastered(score);
        let course = format!("{}.{}", submission.course_number, submission.part_number);

        let record = QuizResult {
            id: Uuid::new_v4().to_string(),
            student_id: student_id.clone(),
            course: course.clone(),
            subskill_id: lesson_id.clone(),
            total_questions: submission.total_questions,
            correct_answers: submission.correct_answers,
            score,
            percentage: score * 100.0,
            is_mastered: mastered,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        let lock = self.student_lock(&student_id);
        let _student_guard = lock.lock();

        let (change, snapshot) = self.stage(record, &lesson_id, mastered);
        if let Err(err) = self.write_snapshot(change.version, &snapshot) {
            self.abandon(&change, err)?;
        }
        let changed = change.changed;
        self.commit(change);

        tracing::info!(
            student_id = %student_id,
            lesson_id = %lesson_id,
            score,
            mastered,
            "quiz evaluated"
        );

        Ok(QuizEvaluation {
            student_id,
            course,
            subskill_id: lesson_id,
            total_questions: submission.total_questions,
            correct_answers: submission.correct_answers,
            score,
            percentage: score * 100.0,
            is_mastered: mastered,
            threshold: threshold_percentage(),
            student_profile_updated: changed,
            message: feedback_message(score).to_string(),
        })
    }

    /// Applies the change to the staged state and returns it with a snapshot
    /// of everything staged so far.
    fn stage(&self, record: QuizResult, lesson_id: &str, mastered: bool) -> (StagedChange, TrackerState) {
        let mut staging = self.staging.lock();
        staging.version += 1;
        let version = staging.version;

        let state = &mut staging.state;
        let previous_profile = state
            .profiles
            .iter()
            .find(|p| p.student_id == record.student_id)
            .cloned();
        let profile = state.profile_mut(&record.student_id);
        let changed = if mastered {
            profile.unmastered.remove(lesson_id)
        } else {
            profile.unmastered.insert(lesson_id.to_string())
        };
        let profile = profile.clone();
        state.results.push(record.clone());

        let change = StagedChange {
            version,
            record,
            previous_profile,
            profile,
            changed,
        };
        (change, staging.state.clone())
    }

    /// Log first, then profiles.
    fn write_snapshot(&self, version: u64, snapshot: &TrackerState) -> Result<(), StoreError> {
        self.store.save_results(version, &snapshot.results)?;
        self.store.save_profiles(version, &snapshot.profiles)?;

        let mut staging = self.staging.lock();
        staging.durable = staging.durable.max(version);
        Ok(())
    }

    /// Handles a failed write. When a newer snapshot carrying the change is
    /// already on disk the submission stands; otherwise the change is taken
    /// out of the staged state and a snapshot without it is written over any
    /// in-flight one that still carries it.
    fn abandon(&self, change: &StagedChange, err: StoreError) -> Result<(), TrackerError> {
        let (version, snapshot) = {
            let mut staging = self.staging.lock();
            if staging.durable >= change.version {
                tracing::debug!(
                    student_id = %change.record.student_id,
                    error = %err,
                    "write failed but a newer snapshot already holds the submission"
                );
                return Ok(());
            }

            let student_id = change.record.student_id.as_str();
            staging.state.results.retain(|r| r.id != change.record.id);
            staging
                .state
                .restore_profile(student_id, change.previous_profile.as_ref());
            staging.version += 1;
            (staging.version, staging.state.clone())
        };

        if let Err(rollback_err) = self.write_snapshot(version, &snapshot) {
            tracing::error!(
                student_id = %change.record.student_id,
                error = %rollback_err,
                "failed to write snapshot after discarding a quiz submission"
            );
        }
        Err(TrackerError::Persistence(err))
    }

    fn commit(&self, change: StagedChange) {
        let mut committed = self.committed.write();
        *committed.profile_mut(&change.record.student_id) = change.profile;
        committed.results.push(change.record);
    }

    /// Current profile; unknown students get an empty one that is not stored.
    pub fn get_profile(&self, student_id: &str) -> StudentProfile {
        self.committed
            .read()
            .profiles
            .iter()
            .find(|p| p.student_id == student_id)
            .cloned()
            .unwrap_or_else(|| StudentProfile::empty(student_id))
    }

    pub fn unmastered(&self, student_id: &str) -> BTreeSet<String> {
        self.get_profile(student_id).unmastered
    }

    /// Results of one student, newest first.
    pub fn get_history(&self, student_id: &str) -> Vec<QuizResult> {
        let state = self.committed.read();
        let mut history: Vec<QuizResult> = state
            .results
            .iter()
            .rev()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        history
    }

    /// Statistics for one student, or over every result when `None`.
    pub fn get_statistics(&self, student_id: Option<&str>) -> QuizStatistics {
        let state = self.committed.read();
        match student_id {
            Some(id) => QuizStatistics::from_results(state.results.iter().filter(|r| r.student_id == id)),
            None => QuizStatistics::from_results(state.results.iter()),
        }
    }

    pub fn global_statistics(&self) -> GlobalStatistics {
        let state = self.committed.read();

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for profile in &state.profiles {
            for lesson in &profile.unmastered {
                *counts.entry(lesson.as_str()).or_insert(0) += 1;
            }
        }
        // BTreeMap iterates by id, so the stable sort leaves ties in id order
        let mut ranked: Vec<LessonCount> = counts
            .into_iter()
            .map(|(lesson_id, count)| LessonCount {
                lesson_id: lesson_id.to_string(),
                count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(MOST_UNMASTERED_LIMIT);

        GlobalStatistics {
            total_students: state.profiles.len(),
            quiz_statistics: QuizStatistics::from_results(state.results.iter()),
            most_common_unmastered: ranked,
        }
    }

    /// Every student's unmastered set, for struggling-count aggregation
    pub fn unmastered_sets(&self) -> Vec<BTreeSet<String>> {
        self.committed
            .read()
            .profiles
            .iter()
            .map(|p| p.unmastered.clone())
            .collect()
    }
}
