//! Recommendation Ranker
//!
//! Filters lessons to unmastered, prerequisite-eligible candidates and orders
//! them by model score.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::graph::CurriculumGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    NeedsWork,
    Mastered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyIndicators {
    pub struggling_students: u32,
    pub bloom_level: u8,
}

/// One ranked study suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub lesson_id: String,
    pub lesson_name: String,
    pub priority_score: f64,
    pub bloom_level: u8,
    pub prerequisites: Vec<String>,
    pub difficulty_indicators: DifficultyIndicators,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub lesson_id: String,
    pub lesson_name: String,
    pub score: f64,
    pub status: PredictionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub recommendations: Vec<Recommendation>,
    /// Score of every lesson in node order
    pub all_predictions: Vec<Prediction>,
    pub total_non_mastered: usize,
    /// Candidates before truncation
    pub eligible_for_study: usize,
}

/// A lesson is eligible when it is unmastered and none of its immediate
/// prerequisites are.
pub fn is_eligible(graph: &CurriculumGraph, idx: usize, unmastered: &BTreeSet<String>) -> bool {
    unmastered.contains(&graph.lesson_ids()[idx])
        && !graph
            .prerequisites(idx)
            .iter()
            .any(|prereq| unmastered.contains(prereq))
}

/// Ranks eligible lessons by descending score.
///
/// `scores` is indexed by node position. Equal scores keep node order. A
/// `max_recommendations` of zero or less returns every candidate.
pub fn rank(
    graph: &CurriculumGraph,
    scores: &[f64],
    unmastered: &BTreeSet<String>,
    max_recommendations: i64,
) -> Ranking {
    debug_assert_eq!(scores.len(), graph.len());

    let mut candidates: Vec<usize> = (0..graph.len())
        .filter(|&idx| is_eligible(graph, idx, unmastered))
        .collect();
    // sort_by is stable; total_cmp keeps NaN from panicking
    candidates.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    let eligible_for_study = candidates.len();

    if max_recommendations > 0 {
        let limit = usize::try_from(max_recommendations).unwrap_or(usize::MAX);
        candidates.truncate(limit);
    }

    let recommendations = candidates
        .into_iter()
        .map(|idx| {
            let attrs = graph.attributes(idx);
            Recommendation {
                lesson_id: graph.lesson_ids()[idx].clone(),
                lesson_name: attrs.name.clone(),
                priority_score: scores[idx],
                bloom_level: attrs.complexity_level,
                prerequisites: graph.prerequisites(idx).to_vec(),
                difficulty_indicators: DifficultyIndicators {
                    struggling_students: attrs.struggling_students,
                    bloom_level: attrs.complexity_level,
                },
            }
        })
        .collect();

    let all_predictions = graph
        .lesson_ids()
        .iter()
        .zip(graph.all_attributes())
        .zip(scores)
        .map(|((lesson_id, attrs), &score)| Prediction {
            lesson_id: lesson_id.clone(),
            lesson_name: attrs.name.clone(),
            score,
            status: if unmastered.contains(lesson_id) {
                PredictionStatus::NeedsWork
            } else {
                PredictionStatus::Mastered
            },
        })
        .collect();

    Ranking {
        recommendations,
        all_predictions,
        total_non_mastered: unmastered.len(),
        eligible_for_study,
    }
}
