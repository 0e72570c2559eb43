//! Recommendation service: runs the per-student pipeline off the async
//! runtime and describes the loaded model.

use std::collections::BTreeSet;
use std::sync::Arc;

use curriculum_algo::{
    recommend, CurriculumGraph, DataAvailability, DifficultyAnalysis, RecommendError,
    RecommendationOutcome, MASTERY_THRESHOLD,
};
use serde::Serialize;

use crate::config::RecommenderConfig;

#[derive(Debug, thiserror::Error)]
pub enum RecommendServiceError {
    #[error(transparent)]
    Recommend(#[from] RecommendError),
    #[error("recommendation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub total_lessons: usize,
    /// Valid directed links
    pub total_edges: usize,
    /// Models are fit per request; true once the curriculum is loaded
    pub model_trained: bool,
    pub data_availability: DataAvailability,
    pub difficulty_analysis: DifficultyAnalysis,
    pub mastery_threshold: f64,
    pub hidden_dim: usize,
    pub epochs: usize,
}

pub struct RecommendationService {
    graph: Arc<CurriculumGraph>,
    config: RecommenderConfig,
}

impl RecommendationService {
    pub fn new(graph: Arc<CurriculumGraph>, config: RecommenderConfig) -> Self {
        Self { graph, config }
    }

    pub fn graph(&self) -> &CurriculumGraph {
        &self.graph
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// Fits a fresh model on the blocking pool and ranks the student's lessons.
    pub async fn recommend(
        &self,
        student_id: &str,
        unmastered: BTreeSet<String>,
        max_recommendations: Option<i64>,
    ) -> Result<RecommendationOutcome, RecommendServiceError> {
        let max = max_recommendations.unwrap_or(self.config.default_max_recommendations);
        if unmastered.is_empty() {
            tracing::info!(student_id = %student_id, "all lessons mastered, skipping fit");
            return Ok(RecommendationOutcome::FullyMastered);
        }

        let graph = Arc::clone(&self.graph);
        let gcn = self.config.gcn.clone();
        let started = std::time::Instant::now();
        let outcome =
            tokio::task::spawn_blocking(move || recommend(&graph, &unmastered, &gcn, max)).await??;

        if let RecommendationOutcome::Ranked { ranking, fit } = &outcome {
            tracing::info!(
                student_id = %student_id,
                recommendations = ranking.recommendations.len(),
                eligible = ranking.eligible_for_study,
                final_loss = fit.final_loss,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "recommendations generated"
            );
        }
        Ok(outcome)
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            total_lessons: self.graph.len(),
            total_edges: self.graph.edge_count(),
            model_trained: !self.graph.is_empty(),
            data_availability: self.graph.availability(),
            difficulty_analysis: self.graph.difficulty_analysis(),
            mastery_threshold: MASTERY_THRESHOLD,
            hidden_dim: self.config.gcn.hidden_dim,
            epochs: self.config.gcn.epochs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curriculum_algo::{DataError, EnrichedMetadata, GcnConfig, GraphDescription};

    fn service() -> RecommendationService {
        let desc = GraphDescription::from_labels(&["1.1", "2.1", "2.2"], &[(0, 1), (1, 2)]);
        let graph = CurriculumGraph::build(desc, EnrichedMetadata::new(), None).unwrap();
        RecommendationService::new(
            Arc::new(graph),
            RecommenderConfig {
                gcn: GcnConfig {
                    epochs: 30,
                    ..GcnConfig::default()
                },
                default_max_recommendations: 5,
            },
        )
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_recommend_on_blocking_pool() {
        let outcome = service().recommend("s1", set(&["2.1"]), None).await.unwrap();
        match outcome {
            RecommendationOutcome::Ranked { ranking, fit } => {
                assert_eq!(ranking.recommendations[0].lesson_id, "2.1");
                assert_eq!(fit.epochs, 30);
            }
            RecommendationOutcome::FullyMastered => panic!("expected ranking"),
        }
    }

    #[tokio::test]
    async fn test_fully_mastered() {
        let outcome = service().recommend("s1", BTreeSet::new(), Some(3)).await.unwrap();
        assert_eq!(outcome, RecommendationOutcome::FullyMastered);
    }

    #[tokio::test]
    async fn test_unknown_lesson_surfaces_data_error() {
        let err = service().recommend("s1", set(&["7.7"]), None).await.unwrap_err();
        assert!(matches!(
            err,
            RecommendServiceError::Recommend(RecommendError::Data(DataError::UnknownLesson(_)))
        ));
    }

    #[test]
    fn test_model_info() {
        let info = service().model_info();
        assert_eq!(info.total_lessons, 3);
        assert_eq!(info.total_edges, 2);
        assert!(info.model_trained);
        assert!(info.data_availability.graph_data);
        assert!(!info.data_availability.forward_paths);
        assert_eq!(info.mastery_threshold, 0.8);
    }
}
