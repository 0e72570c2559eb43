//! Feature Builder
//!
//! Per-student node feature matrix (`N × FEATURE_DIMENSION`, row-major).

use std::collections::BTreeSet;

use crate::graph::CurriculumGraph;
use crate::types::{FeatureColumn, FEATURE_DIMENSION};

/// Row-major `N × FEATURE_DIMENSION` feature matrix
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    values: Vec<f64>,
}

impl FeatureMatrix {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        FEATURE_DIMENSION
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn row(&self, idx: usize) -> &[f64] {
        &self.values[idx * FEATURE_DIMENSION..(idx + 1) * FEATURE_DIMENSION]
    }

    pub fn get(&self, idx: usize, column: FeatureColumn) -> f64 {
        self.values[idx * FEATURE_DIMENSION + column.index()]
    }

    #[cfg(test)]
    pub(crate) fn from_values(values: Vec<f64>) -> Self {
        assert_eq!(values.len() % FEATURE_DIMENSION, 0);
        Self {
            rows: values.len() / FEATURE_DIMENSION,
            values,
        }
    }
}

/// Divisor for max-normalization; floored to 1 so an all-zero column stays 0.
fn normalizer(values: impl Iterator<Item = u32>) -> f64 {
    let max = values.max().unwrap_or(0);
    if max == 0 {
        1.0
    } else {
        f64::from(max)
    }
}

/// Builds the feature matrix for one student.
///
/// Pure function of the graph and the unmastered set.
pub fn build_features(graph: &CurriculumGraph, unmastered: &BTreeSet<String>) -> FeatureMatrix {
    let attrs = graph.all_attributes();
    let max_in = normalizer(attrs.iter().map(|a| a.in_degree));
    let max_out = normalizer(attrs.iter().map(|a| a.out_degree));
    let max_struggle = normalizer(attrs.iter().map(|a| a.struggling_students));

    let mut values = Vec::with_capacity(attrs.len() * FEATURE_DIMENSION);
    for (lesson, a) in graph.lesson_ids().iter().zip(attrs) {
        let mastery_flag = if unmastered.contains(lesson) { 1.0 } else { 0.0 };
        values.extend_from_slice(&[
            a.complexity_norm,
            f64::from(a.in_degree) / max_in,
            f64::from(a.out_degree) / max_out,
            f64::from(a.struggling_students) / max_struggle,
            mastery_flag,
        ]);
    }

    FeatureMatrix {
        rows: attrs.len(),
        values,
    }
}

/// Regression target: 1.0 for unmastered lessons, 0.0 otherwise.
pub fn build_targets(graph: &CurriculumGraph, unmastered: &BTreeSet<String>) -> Vec<f64> {
    graph
        .lesson_ids()
        .iter()
        .map(|lesson| if unmastered.contains(lesson) { 1.0 } else { 0.0 })
        .collect()
}
