//! # curriculum-algo - lesson recommendation core
//!
//! Pure, synchronous building blocks of the recommender:
//!
//! - **Curriculum Graph Store** - validated lesson graph with typed attributes
//! - **Feature Builder** - per-student node feature matrix
//! - **Scoring Model** - two-layer GCN fit per request with Adam
//! - **Recommendation Ranker** - prerequisite-aware ordering of lessons
//! - **Quiz rule** - scoring, course mapping and the mastery threshold
//!
//! ## Modules
//!
//! - [`graph`] - graph store, normalized adjacency, difficulty analysis
//! - [`enrich`] - regeneration of enriched lesson metadata
//! - [`features`] - feature matrix and regression targets
//! - [`gcn`] - graph convolutional network and optimizer
//! - [`ranker`] - candidate filtering and ordering
//! - [`recommender`] - the end-to-end pipeline
//! - [`quiz`] - quiz scoring rule
//! - [`matrix`] - dense row-major helpers
//! - [`sanitize`] - numeric validation
//! - [`types`] - shared types and constants
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeSet;
//! use curriculum_algo::{recommend, CurriculumGraph, EnrichedMetadata, GcnConfig, GraphDescription};
//!
//! let desc = GraphDescription::from_labels(&["1.1", "1.2"], &[(0, 1)]);
//! let graph = CurriculumGraph::build(desc, EnrichedMetadata::new(), None).unwrap();
//! let unmastered: BTreeSet<String> = ["1.2".to_string()].into_iter().collect();
//!
//! let outcome = recommend(&graph, &unmastered, &GcnConfig::default(), 5).unwrap();
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod enrich;
pub mod error;
pub mod features;
pub mod gcn;
pub mod graph;
pub mod matrix;
pub mod quiz;
pub mod ranker;
pub mod recommender;
pub mod sanitize;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use error::{DataError, ModelError, RecommendError};

pub use graph::{
    CurriculumGraph, DataAvailability, DifficultLesson, DifficultyAnalysis, EnrichedMetadata,
    GraphDescription, GraphLink, GraphNode, LessonAttributes, LessonMetadata, NodeRef,
    NormalizedAdjacency, PrerequisiteEntry, PrerequisiteMap, StrugglingStats,
};

pub use enrich::{generate_enriched_metadata, EnrichmentTables};

pub use features::{build_features, build_targets, FeatureMatrix};

pub use gcn::LessonGcn;

pub use ranker::{rank, DifficultyIndicators, Prediction, PredictionStatus, Ranking, Recommendation};

pub use recommender::{recommend, validate_unmastered, RecommendationOutcome};
