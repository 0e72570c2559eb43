//! Curriculum Graph Store
//!
//! Immutable snapshot of lessons, their static attributes and prerequisite
//! relations. Lesson indices are the positions in the graph description's
//! node list and stay fixed for the lifetime of a [`CurriculumGraph`].

mod adjacency;
mod analysis;

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::sanitize::clamp_unit;
use crate::types::MAX_COMPLEXITY_LEVEL;

pub use adjacency::NormalizedAdjacency;
pub use analysis::{DifficultLesson, DifficultyAnalysis, StrugglingStats};

// ==================== Persisted Layout ====================

/// Node reference inside `graph_data.json`; numbers may be stored as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeRef {
    Index(i64),
    Text(String),
}

impl NodeRef {
    pub fn as_index(&self) -> Option<i64> {
        match self {
            NodeRef::Index(i) => Some(*i),
            NodeRef::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<usize> for NodeRef {
    fn from(value: usize) -> Self {
        NodeRef::Index(value as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeRef>,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: NodeRef,
    pub target: NodeRef,
}

/// Contents of `graph_data.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDescription {
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub links: Vec<GraphLink>,
}

impl GraphDescription {
    /// Builds a description from labels and `(source, target)` positions.
    pub fn from_labels(labels: &[&str], links: &[(usize, usize)]) -> Self {
        Self {
            nodes: labels
                .iter()
                .enumerate()
                .map(|(i, label)| GraphNode {
                    id: Some(i.into()),
                    label: (*label).to_string(),
                })
                .collect(),
            links: links
                .iter()
                .map(|&(s, t)| GraphLink {
                    source: s.into(),
                    target: t.into(),
                })
                .collect(),
        }
    }
}

/// One entry of `enriched_graph.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub in_degree: u32,
    #[serde(default)]
    pub out_degree: u32,
    #[serde(default)]
    pub struggling_students: u32,
    #[serde(default)]
    pub bloom_level: u8,
    #[serde(default)]
    pub bloom_norm: Option<f64>,
}

pub type EnrichedMetadata = BTreeMap<String, LessonMetadata>;

/// One entry of `forward_recommendation_paths.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrerequisiteEntry {
    #[serde(default)]
    pub immediate_dependencies: Vec<String>,
}

pub type PrerequisiteMap = BTreeMap<String, PrerequisiteEntry>;

// ==================== Store Types ====================

/// Static attributes of a lesson, defaults applied once at load time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonAttributes {
    pub name: String,
    pub complexity_level: u8,
    /// Complexity scaled into `[0, 1]`
    pub complexity_norm: f64,
    pub in_degree: u32,
    pub out_degree: u32,
    pub struggling_students: u32,
}

impl LessonAttributes {
    pub fn defaults_for(lesson_id: &str) -> Self {
        Self {
            name: lesson_id.to_string(),
            complexity_level: 0,
            complexity_norm: 0.0,
            in_degree: 0,
            out_degree: 0,
            struggling_students: 0,
        }
    }

    fn from_metadata(lesson_id: &str, meta: &LessonMetadata) -> Self {
        let complexity_norm = match meta.bloom_norm {
            Some(norm) => clamp_unit(norm),
            None => clamp_unit(f64::from(meta.bloom_level) / f64::from(MAX_COMPLEXITY_LEVEL)),
        };
        Self {
            name: meta
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| lesson_id.to_string()),
            complexity_level: meta.bloom_level,
            complexity_norm,
            in_degree: meta.in_degree,
            out_degree: meta.out_degree,
            struggling_students: meta.struggling_students,
        }
    }
}

/// Which optional inputs were present when the store was built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAvailability {
    pub enriched_data: bool,
    pub graph_data: bool,
    pub forward_paths: bool,
}

#[derive(Debug, Clone)]
pub struct CurriculumGraph {
    lesson_ids: Vec<String>,
    index: HashMap<String, usize>,
    attributes: Vec<LessonAttributes>,
    edges: Vec<(usize, usize)>,
    prerequisites: Vec<Vec<String>>,
    adjacency: NormalizedAdjacency,
    availability: DataAvailability,
}

impl CurriculumGraph {
    /// Validates the inputs and builds the store.
    ///
    /// Links with endpoints outside `[0, N)` are dropped with a warning.
    /// Unknown lesson ids in the prerequisite map and cycles are errors.
    pub fn build(
        description: GraphDescription,
        metadata: EnrichedMetadata,
        prerequisites: Option<PrerequisiteMap>,
    ) -> Result<Self, DataError> {
        let n = description.nodes.len();
        let mut lesson_ids = Vec::with_capacity(n);
        let mut index = HashMap::with_capacity(n);
        for (i, node) in description.nodes.iter().enumerate() {
            let label = node.label.trim().to_string();
            if index.insert(label.clone(), i).is_some() {
                return Err(DataError::DuplicateLesson(label));
            }
            lesson_ids.push(label);
        }

        for key in metadata.keys() {
            if !index.contains_key(key) {
                tracing::warn!(lesson_id = %key, "metadata entry without graph node ignored");
            }
        }

        let attributes: Vec<LessonAttributes> = lesson_ids
            .iter()
            .map(|id| match metadata.get(id) {
                Some(meta) => LessonAttributes::from_metadata(id, meta),
                None => {
                    tracing::warn!(lesson_id = %id, "lesson has no metadata, using defaults");
                    LessonAttributes::defaults_for(id)
                }
            })
            .collect();

        let mut edges = Vec::with_capacity(description.links.len());
        for link in &description.links {
            let resolved = (link.source.as_index(), link.target.as_index());
            match resolved {
                (Some(s), Some(t)) if in_range(s, n) && in_range(t, n) => {
                    edges.push((s as usize, t as usize));
                }
                _ => {
                    tracing::warn!(
                        source = ?link.source,
                        target = ?link.target,
                        node_count = n,
                        "link ignored: endpoint out of range"
                    );
                }
            }
        }
        if edges.is_empty() && n > 0 {
            tracing::warn!("no valid links, message passing uses self loops only");
        }

        let has_prerequisites = prerequisites.is_some();
        let mut prereq_lists: Vec<Vec<String>> = vec![Vec::new(); n];
        for (lesson, entry) in prerequisites.unwrap_or_default() {
            let Some(&target) = index.get(lesson.as_str()) else {
                return Err(DataError::UnknownLesson(lesson));
            };
            let mut deps: Vec<String> = Vec::with_capacity(entry.immediate_dependencies.len());
            for dep in entry.immediate_dependencies {
                if !index.contains_key(dep.as_str()) {
                    return Err(DataError::UnknownLesson(dep));
                }
                if !deps.contains(&dep) {
                    deps.push(dep);
                }
            }
            prereq_lists[target] = deps;
        }

        ensure_acyclic(&lesson_ids, &index, &edges, &prereq_lists)?;

        let adjacency = NormalizedAdjacency::from_edges(n, &edges);

        Ok(Self {
            lesson_ids,
            index,
            attributes,
            edges,
            prerequisites: prereq_lists,
            adjacency,
            availability: DataAvailability {
                enriched_data: !metadata.is_empty(),
                graph_data: n > 0,
                forward_paths: has_prerequisites,
            },
        })
    }

    pub fn len(&self) -> usize {
        self.lesson_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lesson_ids.is_empty()
    }

    pub fn lesson_ids(&self) -> &[String] {
        &self.lesson_ids
    }

    pub fn index_of(&self, lesson_id: &str) -> Option<usize> {
        self.index.get(lesson_id).copied()
    }

    pub fn contains(&self, lesson_id: &str) -> bool {
        self.index.contains_key(lesson_id)
    }

    pub fn attributes(&self, idx: usize) -> &LessonAttributes {
        &self.attributes[idx]
    }

    pub fn all_attributes(&self) -> &[LessonAttributes] {
        &self.attributes
    }

    /// Valid directed prerequisite links `(source, target)`
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Immediate prerequisite lesson ids; empty when none are known
    pub fn prerequisites(&self, idx: usize) -> &[String] {
        &self.prerequisites[idx]
    }

    pub fn adjacency(&self) -> &NormalizedAdjacency {
        &self.adjacency
    }

    pub fn availability(&self) -> DataAvailability {
        self.availability
    }
}

fn in_range(value: i64, n: usize) -> bool {
    value >= 0 && (value as u64) < n as u64
}

fn ensure_acyclic(
    lesson_ids: &[String],
    index: &HashMap<String, usize>,
    edges: &[(usize, usize)],
    prerequisites: &[Vec<String>],
) -> Result<(), DataError> {
    let mut g: DiGraph<usize, ()> = DiGraph::with_capacity(lesson_ids.len(), edges.len());
    let nodes: Vec<_> = (0..lesson_ids.len()).map(|i| g.add_node(i)).collect();

    for &(s, t) in edges {
        g.add_edge(nodes[s], nodes[t], ());
    }
    for (target, deps) in prerequisites.iter().enumerate() {
        for dep in deps {
            if let Some(&source) = index.get(dep.as_str()) {
                g.add_edge(nodes[source], nodes[target], ());
            }
        }
    }

    toposort(&g, None)
        .map(|_| ())
        .map_err(|cycle| DataError::Cycle(lesson_ids[g[cycle.node_id()]].clone()))
}
