//! Quiz scoring and the mastery decision rule.

use serde::{Deserialize, Serialize};

use crate::types::MASTERY_THRESHOLD;

/// Number of parts per course, courses numbered from 1
pub const COURSE_PARTS: &[u32] = &[7, 3, 4, 9, 7, 3, 3, 6];

/// Lesson id assessed by a course part, `None` when unmapped.
pub fn course_to_lesson(course_number: u32, part_number: u32) -> Option<String> {
    let course_idx = usize::try_from(course_number.checked_sub(1)?).ok()?;
    let parts = *COURSE_PARTS.get(course_idx)?;
    (1..=parts)
        .contains(&part_number)
        .then(|| format!("{course_number}.{part_number}"))
}

/// Fraction of correct answers; 0.0 for an empty quiz.
pub fn calculate_score(total_questions: u32, correct_answers: u32) -> f64 {
    if total_questions == 0 {
        return 0.0;
    }
    f64::from(correct_answers) / f64::from(total_questions)
}

pub fn is_mastered(score: f64) -> bool {
    score >= MASTERY_THRESHOLD
}

/// Threshold expressed as a percentage
pub fn threshold_percentage() -> f64 {
    MASTERY_THRESHOLD * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackBand {
    Excellent,
    VeryGood,
    Good,
    Fair,
    Insufficient,
    Weak,
}

impl FeedbackBand {
    pub fn from_score(score: f64) -> Self {
        let percentage = score * 100.0;
        if percentage >= 90.0 {
            Self::Excellent
        } else if percentage >= 80.0 {
            Self::VeryGood
        } else if percentage >= 70.0 {
            Self::Good
        } else if percentage >= 60.0 {
            Self::Fair
        } else if percentage >= 50.0 {
            Self::Insufficient
        } else {
            Self::Weak
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Excellent => "🎉 Excellent ! Vous maîtrisez parfaitement ce cours !",
            Self::VeryGood => "✅ Très bien ! Vous avez validé ce cours.",
            Self::Good => "👍 Bon travail ! Encore un petit effort pour maîtriser ce cours.",
            Self::Fair => "⚠️ Passable. Il serait bon de réviser ce cours.",
            Self::Insufficient => "⚠️ Insuffisant. Ce cours nécessite plus de travail.",
            Self::Weak => "❌ Résultat faible. Il est recommandé de réviser ce cours en profondeur.",
        }
    }
}

pub fn feedback_message(score: f64) -> &'static str {
    FeedbackBand::from_score(score).message()
}
