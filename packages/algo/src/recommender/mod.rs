//! Recommendation pipeline: features → fit → score → rank.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{DataError, RecommendError};
use crate::features::{build_features, build_targets};
use crate::gcn::LessonGcn;
use crate::graph::CurriculumGraph;
use crate::ranker::{rank, Ranking};
use crate::types::{FitReport, GcnConfig};

/// Result of a recommendation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecommendationOutcome {
    /// Nothing left to study; no model was fit
    FullyMastered,
    Ranked {
        ranking: Ranking,
        fit: FitReport,
    },
}

/// Every id of the unmastered set must be a node of the graph.
pub fn validate_unmastered(
    graph: &CurriculumGraph,
    unmastered: &BTreeSet<String>,
) -> Result<(), DataError> {
    match unmastered.iter().find(|id| !graph.contains(id)) {
        Some(unknown) => Err(DataError::UnknownLesson(unknown.clone())),
        None => Ok(()),
    }
}

/// Fits a fresh model for one student and ranks the eligible lessons.
///
/// Synchronous and CPU-bound; async callers should run it on a blocking
/// thread.
pub fn recommend(
    graph: &CurriculumGraph,
    unmastered: &BTreeSet<String>,
    config: &GcnConfig,
    max_recommendations: i64,
) -> Result<RecommendationOutcome, RecommendError> {
    if unmastered.is_empty() {
        return Ok(RecommendationOutcome::FullyMastered);
    }
    validate_unmastered(graph, unmastered)?;

    let features = build_features(graph, unmastered);
    let targets = build_targets(graph, unmastered);

    let mut model = LessonGcn::new(config.clone());
    let report = model.fit(&features, graph.adjacency(), &targets)?;
    let scores = model.scores(&features, graph.adjacency())?;

    tracing::debug!(
        lessons = graph.len(),
        unmastered = unmastered.len(),
        final_loss = report.final_loss,
        "model fit complete"
    );

    Ok(RecommendationOutcome::Ranked {
        ranking: rank(graph, &scores, unmastered, max_recommendations),
        fit: report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::graph::{
        EnrichedMetadata, GraphDescription, PrerequisiteEntry, PrerequisiteMap,
    };

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| (*s).to_string()).collect()
    }

    fn curriculum(with_prereq: bool) -> CurriculumGraph {
        let labels = ["1.1", "2.1", "2.2", "2.3"];
        let desc = GraphDescription::from_labels(&labels, &[(0, 1), (1, 2), (2, 3)]);
        let prereqs = with_prereq.then(|| {
            let mut map = PrerequisiteMap::new();
            map.insert(
                "2.2".into(),
                PrerequisiteEntry {
                    immediate_dependencies: vec!["2.1".into()],
                },
            );
            map
        });
        CurriculumGraph::build(desc, EnrichedMetadata::new(), prereqs).unwrap()
    }

    fn fast_config() -> GcnConfig {
        GcnConfig {
            epochs: 40,
            ..GcnConfig::default()
        }
    }

    fn ranked(outcome: RecommendationOutcome) -> Ranking {
        match outcome {
            RecommendationOutcome::Ranked { ranking, .. } => ranking,
            RecommendationOutcome::FullyMastered => panic!("expected a ranking"),
        }
    }

    #[test]
    fn test_single_lesson_without_prerequisites() {
        let graph = curriculum(false);
        let ranking = ranked(recommend(&graph, &set(&["2.1"]), &fast_config(), 5).unwrap());

        assert_eq!(ranking.recommendations.len(), 1);
        assert_eq!(ranking.recommendations[0].lesson_id, "2.1");
        assert_eq!(ranking.all_predictions.len(), 4);
    }

    #[test]
    fn test_prerequisite_filtering() {
        let graph = curriculum(true);
        let ranking = ranked(recommend(&graph, &set(&["2.1", "2.2"]), &fast_config(), 5).unwrap());

        let ids: Vec<&str> = ranking.recommendations.iter().map(|r| r.lesson_id.as_str()).collect();
        assert_eq!(ids, vec!["2.1"]);
        assert_eq!(ranking.total_non_mastered, 2);
    }

    #[test]
    fn test_empty_set_skips_fit() {
        let graph = curriculum(false);
        let outcome = recommend(&graph, &BTreeSet::new(), &fast_config(), 5).unwrap();
        assert_eq!(outcome, RecommendationOutcome::FullyMastered);
    }

    #[test]
    fn test_empty_set_on_empty_graph_is_fully_mastered() {
        let graph =
            CurriculumGraph::build(GraphDescription::default(), EnrichedMetadata::new(), None)
                .unwrap();
        let outcome = recommend(&graph, &BTreeSet::new(), &fast_config(), 5).unwrap();
        assert_eq!(outcome, RecommendationOutcome::FullyMastered);
    }

    #[test]
    fn test_unknown_lesson_rejected() {
        let graph = curriculum(false);
        let err = recommend(&graph, &set(&["9.9"]), &fast_config(), 5).unwrap_err();
        assert!(matches!(err, RecommendError::Data(DataError::UnknownLesson(id)) if id == "9.9"));
    }

    #[test]
    fn test_zero_edge_graph_scores() {
        let desc = GraphDescription::from_labels(&["a", "b"], &[]);
        let graph = CurriculumGraph::build(desc, EnrichedMetadata::new(), None).unwrap();
        let ranking = ranked(recommend(&graph, &set(&["a", "b"]), &fast_config(), 0).unwrap());

        assert_eq!(ranking.recommendations.len(), 2);
        assert!(ranking
            .all_predictions
            .iter()
            .all(|p| p.score.is_finite() && p.score > 0.0 && p.score < 1.0));
    }

    #[test]
    fn test_model_error_converts() {
        let err: RecommendError = ModelError::EmptyGraph.into();
        assert!(matches!(err, RecommendError::Model(ModelError::EmptyGraph)));
    }
}
