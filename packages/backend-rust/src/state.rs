use std::path::Path;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use curriculum_algo::DataError;

use crate::config::RecommenderConfig;
use crate::services::curriculum::{load_curriculum, CurriculumFiles};
use crate::services::mastery::MasteryTracker;
use crate::services::recommendation::RecommendationService;
use crate::services::store::{JsonFileStore, MasteryStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to load mastery state: {0}")]
    Store(#[from] StoreError),
    #[error("failed to load curriculum: {0}")]
    Curriculum(#[from] DataError),
}

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    tracker: Arc<MasteryTracker>,
    recommender: Arc<RecommendationService>,
}

impl AppState {
    pub fn new(tracker: Arc<MasteryTracker>, recommender: Arc<RecommendationService>) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            tracker,
            recommender,
        }
    }

    /// Opens the JSON stores in `data_dir` and loads the curriculum.
    pub fn load(data_dir: &Path, config: RecommenderConfig) -> Result<Self, StartupError> {
        let store: Arc<dyn MasteryStore> = Arc::new(JsonFileStore::new(data_dir));
        Self::with_store(data_dir, store, config)
    }

    pub fn with_store(
        data_dir: &Path,
        store: Arc<dyn MasteryStore>,
        config: RecommenderConfig,
    ) -> Result<Self, StartupError> {
        let tracker = MasteryTracker::open(store)?;
        let graph = load_curriculum(&CurriculumFiles::in_dir(data_dir), &tracker.unmastered_sets())?;
        let tracker = tracker.with_catalog(graph.lesson_ids().iter().cloned());

        Ok(Self::new(
            Arc::new(tracker),
            Arc::new(RecommendationService::new(Arc::new(graph), config)),
        ))
    }

    pub fn tracker(&self) -> &MasteryTracker {
        &self.tracker
    }

    pub fn recommender(&self) -> &RecommendationService {
        &self.recommender
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }
}
