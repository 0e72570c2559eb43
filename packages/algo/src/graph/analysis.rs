use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::CurriculumGraph;

const MOST_DIFFICULT_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrugglingStats {
    pub mean: f64,
    pub max: u32,
    pub min: u32,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultLesson {
    pub lesson_id: String,
    pub lesson_name: String,
    pub struggling_students: u32,
    pub bloom_level: u8,
}

/// Static difficulty overview of the whole curriculum
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DifficultyAnalysis {
    /// Lesson count per complexity level
    pub bloom_distribution: BTreeMap<u8, usize>,
    pub struggling_students_stats: StrugglingStats,
    /// Lessons with the highest struggling count, node order on ties
    pub most_difficult_lessons: Vec<DifficultLesson>,
}

impl CurriculumGraph {
    pub fn difficulty_analysis(&self) -> DifficultyAnalysis {
        if self.is_empty() {
            return DifficultyAnalysis::default();
        }

        let mut bloom_distribution = BTreeMap::new();
        for attrs in self.all_attributes() {
            *bloom_distribution.entry(attrs.complexity_level).or_insert(0) += 1;
        }

        let counts: Vec<u32> = self
            .all_attributes()
            .iter()
            .map(|a| a.struggling_students)
            .collect();
        let total: u64 = counts.iter().map(|&c| u64::from(c)).sum();
        let struggling_students_stats = StrugglingStats {
            mean: total as f64 / counts.len() as f64,
            max: counts.iter().copied().max().unwrap_or(0),
            min: counts.iter().copied().min().unwrap_or(0),
            total,
        };

        let mut lessons: Vec<DifficultLesson> = self
            .lesson_ids()
            .iter()
            .zip(self.all_attributes())
            .map(|(id, attrs)| DifficultLesson {
                lesson_id: id.clone(),
                lesson_name: attrs.name.clone(),
                struggling_students: attrs.struggling_students,
                bloom_level: attrs.complexity_level,
            })
            .collect();
        lessons.sort_by(|a, b| b.struggling_students.cmp(&a.struggling_students));
        lessons.truncate(MOST_DIFFICULT_LIMIT);

        DifficultyAnalysis {
            bloom_distribution,
            struggling_students_stats,
            most_difficult_lessons: lessons,
        }
    }
}
