//! Enriched lesson metadata generation.
//!
//! Rebuilds `enriched_graph.json` from the graph description and the current
//! student profiles when the file is missing.

use std::collections::HashMap;

use crate::graph::{EnrichedMetadata, GraphDescription, LessonMetadata, NodeRef};
use crate::types::MAX_COMPLEXITY_LEVEL;

/// Name used for lessons missing from the name table
pub const UNKNOWN_LESSON_NAME: &str = "Unknown";

/// Bloom level per lesson of the C programming curriculum
pub const COMPLEXITY_LEVELS: &[(&str, u8)] = &[
    ("1.1", 1), ("1.2", 2), ("1.3", 3), ("1.4", 4), ("1.5", 3), ("1.6", 3), ("1.7", 5),
    ("2.1", 3), ("2.2", 3), ("2.3", 4),
    ("3.1", 3), ("3.2", 3), ("3.3", 3), ("3.4", 4),
    ("4.1", 1), ("4.2", 3), ("4.3", 3), ("4.4", 3), ("4.5", 3), ("4.6", 4), ("4.7", 3),
    ("4.8", 1), ("4.9", 3),
    ("5.1", 1), ("5.2", 3), ("5.3", 3), ("5.4", 3),
    ("6.1", 1), ("6.2", 3), ("6.3", 3),
    ("7.1", 1), ("7.2", 3), ("7.3", 3),
    ("8.1", 1), ("8.2", 3), ("8.3", 3), ("8.4", 4), ("8.5", 4), ("8.6", 3),
];

/// Display names of the C programming curriculum
pub const LESSON_NAMES: &[(&str, &str)] = &[
    ("1.1", "Lister les étapes pour passer d'un code source à un exécutable"),
    ("1.2", "Décrire la structure d'un programme C"),
    ("1.3", "Utiliser les variables"),
    ("1.4", "Examiner la portée d'une variable"),
    ("1.5", "Pratiquer les fonctions d'entrées / sorties"),
    ("1.6", "Utiliser les opérateurs arithmétiques et logiques"),
    ("1.7", "Ordonner les opérateurs arithmétiques et logiques"),
    ("2.1", "Reconnaître la structure if else"),
    ("2.2", "Reconnaître la structures switch"),
    ("2.3", "Distinguer les structures conditionnelles ( if, if else et switch ) du langage C"),
    ("3.1", "Reconnaître la boucle for"),
    ("3.2", "Reconnaître la boucle do while"),
    ("3.3", "Reconnaître la boucle while"),
    ("3.4", "Différencier les structures itératives"),
    ("4.1", "Définir un tableau"),
    ("4.2", "Pratiquer l'opération d'ajout"),
    ("4.3", "Pratiquer l'opération de suppression"),
    ("4.4", "Pratiquer l'opération de parcours"),
    ("4.5", "Appliquer la recherche séquentielle"),
    ("4.6", "Ordonner un tableau"),
    ("4.7", "Appliquer la recherche dichotomique"),
    ("4.8", "Identifier les types des tableaux"),
    ("4.9", "Appliquer une structure itérative pour le parcours d'un tableau bidimentionnel"),
    ("5.1", "Définir une chaîne de caractères"),
    ("5.2", "Utiliser les fonctions prédéfinies de String.h"),
    ("6.1", "Définir une structure avec des champs"),
    ("6.2", "Utiliser une variable de type structure"),
    ("6.3", "Définir un alias sur une structure via typedef"),
    ("7.1", "Définir une fonction"),
    ("7.2", "Identifier les composantes d'une fonction"),
    ("7.3", "Distinguer les modes de passage des paramètres d'une fonction"),
    ("8.1", "Définir un pointeur"),
    ("8.2", "Utiliser les pointeurs dans les prototypes des fonctions"),
    ("8.3", "Appliquer les pointeurs pour la manipulation des tableaux"),
];

/// Static lookup tables feeding the generator
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentTables<'a> {
    pub complexity_levels: &'a [(&'a str, u8)],
    pub lesson_names: &'a [(&'a str, &'a str)],
}

impl Default for EnrichmentTables<'static> {
    fn default() -> Self {
        Self {
            complexity_levels: COMPLEXITY_LEVELS,
            lesson_names: LESSON_NAMES,
        }
    }
}

/// Computes per-lesson metadata from the graph links and the students'
/// unmastered sets.
///
/// Links whose endpoints cannot be resolved to a node position are skipped.
pub fn generate_enriched_metadata<I, J, S>(
    description: &GraphDescription,
    unmastered_sets: I,
    tables: &EnrichmentTables<'_>,
) -> EnrichedMetadata
where
    I: IntoIterator<Item = J>,
    J: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let labels: Vec<&str> = description.nodes.iter().map(|n| n.label.trim()).collect();
    let mut in_degree: HashMap<&str, u32> = HashMap::new();
    let mut out_degree: HashMap<&str, u32> = HashMap::new();
    for link in &description.links {
        match (label_at(&labels, &link.source), label_at(&labels, &link.target)) {
            (Some(src), Some(tgt)) => {
                *out_degree.entry(src).or_insert(0) += 1;
                *in_degree.entry(tgt).or_insert(0) += 1;
            }
            _ => {
                tracing::warn!(source = ?link.source, target = ?link.target, "skipping unresolved link");
            }
        }
    }

    let mut struggling: HashMap<String, u32> = HashMap::new();
    for set in unmastered_sets {
        for lesson in set {
            *struggling.entry(lesson.as_ref().to_string()).or_insert(0) += 1;
        }
    }

    let complexity: HashMap<&str, u8> = tables.complexity_levels.iter().copied().collect();
    let names: HashMap<&str, &str> = tables.lesson_names.iter().copied().collect();

    labels
        .iter()
        .map(|&label| {
            let bloom_level = complexity.get(label).copied().unwrap_or(0);
            let meta = LessonMetadata {
                name: Some(
                    names
                        .get(label)
                        .copied()
                        .unwrap_or(UNKNOWN_LESSON_NAME)
                        .to_string(),
                ),
                in_degree: in_degree.get(label).copied().unwrap_or(0),
                out_degree: out_degree.get(label).copied().unwrap_or(0),
                struggling_students: struggling.get(label).copied().unwrap_or(0),
                bloom_level,
                bloom_norm: Some(f64::from(bloom_level) / f64::from(MAX_COMPLEXITY_LEVEL)),
            };
            (label.to_string(), meta)
        })
        .collect()
}

fn label_at<'a>(labels: &[&'a str], node: &NodeRef) -> Option<&'a str> {
    let idx = usize::try_from(node.as_index()?).ok()?;
    labels.get(idx).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degrees_and_struggling_counts() {
        let desc = GraphDescription::from_labels(&["1.1", "1.2", "2.1"], &[(0, 1), (0, 2), (1, 2)]);
        let students = vec![vec!["2.1".to_string()], vec!["2.1".to_string(), "1.2".to_string()]];

        let meta = generate_enriched_metadata(&desc, &students, &EnrichmentTables::default());

        let first = &meta["1.1"];
        assert_eq!(first.out_degree, 2);
        assert_eq!(first.in_degree, 0);
        assert_eq!(first.bloom_level, 1);
        assert_eq!(first.bloom_norm, Some(0.2));
        assert_eq!(
            first.name.as_deref(),
            Some("Lister les étapes pour passer d'un code source à un exécutable")
        );

        let last = &meta["2.1"];
        assert_eq!(last.in_degree, 2);
        assert_eq!(last.struggling_students, 2);
        assert_eq!(meta["1.2"].struggling_students, 1);
    }

    #[test]
    fn test_unknown_lesson_defaults() {
        let desc = GraphDescription::from_labels(&["9.9"], &[(0, 4)]);
        let no_students: Vec<Vec<String>> = Vec::new();

        let meta = generate_enriched_metadata(&desc, &no_students, &EnrichmentTables::default());

        let entry = &meta["9.9"];
        assert_eq!(entry.name.as_deref(), Some(UNKNOWN_LESSON_NAME));
        assert_eq!(entry.bloom_level, 0);
        assert_eq!(entry.bloom_norm, Some(0.0));
        assert_eq!(entry.out_degree, 0);
    }
}
