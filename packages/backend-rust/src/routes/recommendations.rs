use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use curriculum_algo::{Prediction, Recommendation, RecommendationOutcome};
use serde::{Deserialize, Serialize};

use crate::response::{AppError, SuccessResponse};
use crate::services::mastery::{QuizStatistics, QuizSubmission};
use crate::services::store::QuizResult;
use crate::state::AppState;

const RECENT_QUIZ_LIMIT: usize = 10;
const FULLY_MASTERED_MESSAGE: &str =
    "Félicitations ! Vous avez maîtrisé tous les sous-acquis. Aucune recommandation nécessaire.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/evaluate-quiz", post(evaluate_quiz))
        .route("/student/:student_id/profile", get(student_profile))
        .route(
            "/student/:student_id/recommendations",
            post(student_recommendations).get(student_recommendations),
        )
        .route("/student/:student_id/statistics", get(student_statistics))
        .route("/model-info", get(model_info))
        .route("/global-statistics", get(global_statistics))
}

#[derive(Debug, Deserialize)]
struct RecommendationQuery {
    max_recommendations: Option<i64>,
}

#[derive(Debug, Serialize)]
struct StudentProfileDto {
    student_id: String,
    sous_acquis: Vec<String>,
    total_sous_acquis: usize,
    statistics: QuizStatistics,
    recent_quizzes: Vec<QuizResult>,
}

#[derive(Debug, Serialize)]
struct StudentStatisticsDto {
    student_id: String,
    statistics: QuizStatistics,
    total_sous_acquis: usize,
}

#[derive(Debug, Serialize)]
struct RecommendationsDto {
    student_id: String,
    fully_mastered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    recommendations: Vec<Recommendation>,
    all_predictions: Vec<Prediction>,
    total_non_mastered: usize,
    eligible_for_study: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    final_loss: Option<f64>,
}

async fn evaluate_quiz(
    State(state): State<AppState>,
    Json(payload): Json<QuizSubmission>,
) -> Result<impl IntoResponse, AppError> {
    let tracker_state = state.clone();
    let evaluation =
        tokio::task::spawn_blocking(move || tracker_state.tracker().evaluate_quiz(payload))
            .await
            .map_err(|err| AppError::internal(err.to_string()))??;

    Ok(Json(SuccessResponse::new(evaluation)))
}

async fn student_profile(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tracker = state.tracker();
    let profile = tracker.get_profile(&student_id);
    let mut recent_quizzes = tracker.get_history(&student_id);
    recent_quizzes.truncate(RECENT_QUIZ_LIMIT);

    Ok(Json(SuccessResponse::new(StudentProfileDto {
        total_sous_acquis: profile.unmastered.len(),
        sous_acquis: profile.unmastered.into_iter().collect(),
        statistics: tracker.get_statistics(Some(&student_id)),
        recent_quizzes,
        student_id,
    })))
}

async fn student_recommendations(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let unmastered = state.tracker().unmastered(&student_id);
    let outcome = state
        .recommender()
        .recommend(&student_id, unmastered, query.max_recommendations)
        .await?;

    let dto = match outcome {
        RecommendationOutcome::FullyMastered => RecommendationsDto {
            student_id,
            fully_mastered: true,
            message: Some(FULLY_MASTERED_MESSAGE),
            recommendations: Vec::new(),
            all_predictions: Vec::new(),
            total_non_mastered: 0,
            eligible_for_study: 0,
            final_loss: None,
        },
        RecommendationOutcome::Ranked { ranking, fit } => RecommendationsDto {
            student_id,
            fully_mastered: false,
            message: None,
            recommendations: ranking.recommendations,
            all_predictions: ranking.all_predictions,
            total_non_mastered: ranking.total_non_mastered,
            eligible_for_study: ranking.eligible_for_study,
            final_loss: Some(fit.final_loss),
        },
    };

    Ok(Json(SuccessResponse::new(dto)))
}

async fn student_statistics(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tracker = state.tracker();
    Ok(Json(SuccessResponse::new(StudentStatisticsDto {
        statistics: tracker.get_statistics(Some(&student_id)),
        total_sous_acquis: tracker.unmastered(&student_id).len(),
        student_id,
    })))
}

async fn model_info(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(SuccessResponse::new(state.recommender().model_info())))
}

async fn global_statistics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(SuccessResponse::new(state.tracker().global_statistics())))
}
