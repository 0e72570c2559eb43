#![allow(dead_code)]

use std::path::Path;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use curriculum_algo::GcnConfig;
use curriculum_backend::config::RecommenderConfig;
use curriculum_backend::state::AppState;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const LESSONS: &[&str] = &["1.1", "1.2", "2.1", "2.2", "2.3"];

pub struct Fixture {
    pub prerequisites: bool,
    pub enriched: bool,
    /// `(student_id, unmastered lessons)`
    pub profiles: Vec<(&'static str, Vec<&'static str>)>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            prerequisites: true,
            enriched: true,
            profiles: Vec::new(),
        }
    }
}

pub fn write_data_dir(dir: &Path, fixture: &Fixture) {
    let nodes: Vec<Value> = LESSONS
        .iter()
        .enumerate()
        .map(|(i, label)| json!({"id": i, "label": label}))
        .collect();
    let links: Vec<Value> = (1..LESSONS.len())
        .map(|i| json!({"source": i - 1, "target": i}))
        .collect();
    write(dir, "graph_data.json", &json!({"nodes": nodes, "links": links}));

    if fixture.enriched {
        write(
            dir,
            "enriched_graph.json",
            &json!({
                "1.1": {"name": "Compilation", "in_degree": 0, "out_degree": 1, "struggling_students": 0, "bloom_level": 1, "bloom_norm": 0.2},
                "1.2": {"name": "Structure", "in_degree": 1, "out_degree": 1, "struggling_students": 1, "bloom_level": 2, "bloom_norm": 0.4},
                "2.1": {"name": "If else", "in_degree": 1, "out_degree": 1, "struggling_students": 3, "bloom_level": 3, "bloom_norm": 0.6},
                "2.2": {"name": "Switch", "in_degree": 1, "out_degree": 1, "struggling_students": 2, "bloom_level": 3, "bloom_norm": 0.6},
                "2.3": {"name": "Conditionals", "in_degree": 1, "out_degree": 0, "struggling_students": 1, "bloom_level": 4, "bloom_norm": 0.8}
            }),
        );
    }

    if fixture.prerequisites {
        write(
            dir,
            "forward_recommendation_paths.json",
            &json!({
                "2.2": {"immediate_dependencies": ["2.1"]},
                "2.3": {"immediate_dependencies": ["2.1", "2.2"]}
            }),
        );
    }

    let profiles: Vec<Value> = fixture
        .profiles
        .iter()
        .map(|(id, lessons)| json!({"student_id": id, "sous_acquis": lessons}))
        .collect();
    write(dir, "students_profiles.json", &Value::Array(profiles));
}

fn write(dir: &Path, name: &str, value: &Value) {
    std::fs::write(dir.join(name), serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

pub fn test_config() -> RecommenderConfig {
    RecommenderConfig {
        gcn: GcnConfig {
            epochs: 40,
            ..GcnConfig::default()
        },
        default_max_recommendations: 5,
    }
}

pub fn create_test_app(fixture: &Fixture) -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    write_data_dir(dir.path(), fixture);
    let state = AppState::load(dir.path(), test_config()).unwrap();
    (dir, curriculum_backend::create_app(state))
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}
