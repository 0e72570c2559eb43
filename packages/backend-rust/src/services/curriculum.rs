//! Loads the curriculum graph store from the data directory.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use curriculum_algo::{
    generate_enriched_metadata, CurriculumGraph, DataError, EnrichedMetadata, EnrichmentTables,
    GraphDescription, PrerequisiteMap,
};
use serde::de::DeserializeOwned;

use crate::services::store::write_json;

pub const GRAPH_FILE: &str = "graph_data.json";
pub const ENRICHED_FILE: &str = "enriched_graph.json";
pub const PREREQUISITES_FILE: &str = "forward_recommendation_paths.json";

#[derive(Debug, Clone)]
pub struct CurriculumFiles {
    pub graph: PathBuf,
    pub enriched: PathBuf,
    pub prerequisites: PathBuf,
}

impl CurriculumFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            graph: dir.join(GRAPH_FILE),
            enriched: dir.join(ENRICHED_FILE),
            prerequisites: dir.join(PREREQUISITES_FILE),
        }
    }
}

/// Builds the graph store.
///
/// A missing enrichment file is regenerated from the graph and the students'
/// unmastered sets, written, and read back once. A missing prerequisite file
/// means no lesson has prerequisites.
pub fn load_curriculum(
    files: &CurriculumFiles,
    unmastered_sets: &[BTreeSet<String>],
) -> Result<CurriculumGraph, DataError> {
    let description: GraphDescription = read_json(&files.graph, "graph description")?
        .ok_or_else(|| not_found(&files.graph))?;

    let metadata = match read_json::<EnrichedMetadata>(&files.enriched, "enriched metadata")? {
        Some(metadata) => metadata,
        None => {
            tracing::warn!(
                path = %files.enriched.display(),
                "enriched metadata missing, regenerating"
            );
            let generated =
                generate_enriched_metadata(&description, unmastered_sets, &EnrichmentTables::default());
            write_json(&files.enriched, "enriched metadata", &generated).map_err(|err| {
                DataError::Io {
                    path: files.enriched.display().to_string(),
                    source: io::Error::new(io::ErrorKind::Other, err.to_string()),
                }
            })?;
            read_json(&files.enriched, "enriched metadata")?
                .ok_or_else(|| not_found(&files.enriched))?
        }
    };

    let prerequisites: Option<PrerequisiteMap> =
        read_json(&files.prerequisites, "prerequisite map")?;
    if prerequisites.is_none() {
        tracing::warn!(
            path = %files.prerequisites.display(),
            "prerequisite map missing, every unmastered lesson is eligible"
        );
    }

    let graph = CurriculumGraph::build(description, metadata, prerequisites)?;
    tracing::info!(
        lessons = graph.len(),
        edges = graph.edge_count(),
        "curriculum loaded"
    );
    Ok(graph)
}

/// `Ok(None)` when the file does not exist.
fn read_json<T: DeserializeOwned>(path: &Path, what: &'static str) -> Result<Option<T>, DataError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(DataError::Io {
                path: path.display().to_string(),
                source,
            })
        }
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| DataError::Parse { what, source })
}

fn not_found(path: &Path) -> DataError {
    DataError::Io {
        path: path.display().to_string(),
        source: io::Error::from(io::ErrorKind::NotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAPH: &str = r#"{
        "nodes": [{"id": 0, "label": "1.1"}, {"id": "1", "label": "2.1"}, {"id": 2, "label": "2.2"}],
        "links": [{"source": 0, "target": 1}, {"source": "1", "target": 2}, {"source": 0, "target": 7}]
    }"#;

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_load_with_all_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), GRAPH_FILE, GRAPH);
        write(
            dir.path(),
            ENRICHED_FILE,
            r#"{"2.1": {"name": "If else", "bloom_level": 3, "bloom_norm": 0.6, "struggling_students": 2}}"#,
        );
        write(
            dir.path(),
            PREREQUISITES_FILE,
            r#"{"2.2": {"immediate_dependencies": ["2.1"]}}"#,
        );

        let graph = load_curriculum(&CurriculumFiles::in_dir(dir.path()), &[]).unwrap();

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.attributes(1).name, "If else");
        assert_eq!(graph.prerequisites(2), &["2.1".to_string()]);
        assert!(graph.availability().forward_paths);
    }

    #[test]
    fn test_missing_enrichment_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), GRAPH_FILE, GRAPH);
        let students = vec![["2.1".to_string()].into_iter().collect::<BTreeSet<_>>()];

        let graph = load_curriculum(&CurriculumFiles::in_dir(dir.path()), &students).unwrap();

        assert!(dir.path().join(ENRICHED_FILE).exists());
        assert_eq!(graph.attributes(1).struggling_students, 1);
        assert_eq!(graph.attributes(1).complexity_level, 3);
        assert_eq!(graph.attributes(0).out_degree, 1);
        assert!(!graph.availability().forward_paths);
    }

    #[test]
    fn test_missing_graph_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_curriculum(&CurriculumFiles::in_dir(dir.path()), &[]).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }

    #[test]
    fn test_malformed_graph_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), GRAPH_FILE, "[1, 2");
        let err = load_curriculum(&CurriculumFiles::in_dir(dir.path()), &[]).unwrap_err();
        assert!(matches!(err, DataError::Parse { what: "graph description", .. }));
    }

    #[test]
    fn test_unknown_prerequisite_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), GRAPH_FILE, GRAPH);
        write(dir.path(), ENRICHED_FILE, "{}");
        write(
            dir.path(),
            PREREQUISITES_FILE,
            r#"{"2.2": {"immediate_dependencies": ["9.9"]}}"#,
        );
        let err = load_curriculum(&CurriculumFiles::in_dir(dir.path()), &[]).unwrap_err();
        assert!(matches!(err, DataError::UnknownLesson(id) if id == "9.9"));
    }
}
