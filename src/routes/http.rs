//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs identifiers and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::{header, StatusCode},
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::domain::{QuizQuestion, ValidationReport};
use crate::error::AppResult;
use crate::files::process_uploads;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, ai: state.openai.is_some() })
}

#[instrument(level = "info", skip(state, body), fields(files = body.files.len()))]
pub async fn http_post_process_files(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ProcessFilesIn>,
) -> AppResult<Json<ProcessFilesOut>> {
  let files = process_uploads(&body.files, &state.limits)?;
  Ok(Json(ProcessFilesOut { files: files.iter().map(to_file_out).collect() }))
}

#[instrument(level = "info", skip(state, body), fields(count = body.question_count, files = body.files.len()))]
pub async fn http_post_quiz(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> AppResult<impl IntoResponse> {
  let quiz = logic::generate_quiz(&state, body).await?;
  info!(target: "quiz", id = %quiz.id, questions = quiz.questions.len(), "HTTP quiz created");
  let out = to_quiz_out(&quiz, 1, state.limits.default_page_size);
  Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(level = "info", skip(state, q), fields(%quiz_id))]
pub async fn http_get_quiz(
  State(state): State<Arc<AppState>>,
  Path(quiz_id): Path<String>,
  Query(q): Query<PageQuery>,
) -> AppResult<Json<QuizOut>> {
  let quiz = state.get_quiz(&quiz_id).await?;
  let page = q.page.unwrap_or(1);
  let page_size = q
    .page_size
    .unwrap_or(state.limits.default_page_size)
    .clamp(1, state.limits.max_questions.max(1));
  Ok(Json(to_quiz_out(&quiz, page, page_size)))
}

#[instrument(level = "info", skip(state), fields(%quiz_id))]
pub async fn http_delete_quiz(
  State(state): State<Arc<AppState>>,
  Path(quiz_id): Path<String>,
) -> AppResult<StatusCode> {
  state.remove_quiz(&quiz_id).await?;
  info!(target: "quiz", %quiz_id, "HTTP quiz deleted");
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state, question), fields(%quiz_id, %question_id))]
pub async fn http_put_question(
  State(state): State<Arc<AppState>>,
  Path((quiz_id, question_id)): Path<(String, String)>,
  Json(mut question): Json<QuizQuestion>,
) -> AppResult<Json<QuestionOut>> {
  // The path is authoritative for which question is edited.
  question.id = question_id;
  let question = logic::update_question(&state, &quiz_id, question).await?;
  Ok(Json(QuestionOut { question }))
}

#[instrument(level = "info", skip(state), fields(%quiz_id, %question_id))]
pub async fn http_delete_question(
  State(state): State<Arc<AppState>>,
  Path((quiz_id, question_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
  logic::delete_question(&state, &quiz_id, &question_id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state), fields(%quiz_id, %question_id, mode = ?q.mode))]
pub async fn http_post_regenerate(
  State(state): State<Arc<AppState>>,
  Path((quiz_id, question_id)): Path<(String, String)>,
  Query(q): Query<RegenerateIn>,
) -> AppResult<Json<QuestionOut>> {
  let question = logic::regenerate_question(&state, &quiz_id, &question_id, q.mode).await?;
  Ok(Json(QuestionOut { question }))
}

#[instrument(level = "info", skip(state, body), fields(%quiz_id, count = body.count))]
pub async fn http_post_batch(
  State(state): State<Arc<AppState>>,
  Path(quiz_id): Path<String>,
  Json(body): Json<BatchIn>,
) -> AppResult<Json<QuestionsOut>> {
  let (questions, total_questions) = logic::add_questions(&state, &quiz_id, body.count).await?;
  Ok(Json(QuestionsOut { questions, total_questions }))
}

#[instrument(level = "info", skip(state, body), fields(%quiz_id, %question_id))]
pub async fn http_post_option(
  State(state): State<Arc<AppState>>,
  Path((quiz_id, question_id)): Path<(String, String)>,
  Json(body): Json<OptionIn>,
) -> AppResult<Json<QuestionOut>> {
  let question = logic::add_option(&state, &quiz_id, &question_id, &body.text).await?;
  Ok(Json(QuestionOut { question }))
}

#[instrument(level = "info", skip(state), fields(%quiz_id, %question_id, %option_id))]
pub async fn http_delete_option(
  State(state): State<Arc<AppState>>,
  Path((quiz_id, question_id, option_id)): Path<(String, String, String)>,
) -> AppResult<Json<QuestionOut>> {
  let question = logic::remove_option(&state, &quiz_id, &question_id, &option_id).await?;
  Ok(Json(QuestionOut { question }))
}

#[instrument(level = "info", skip(state), fields(%quiz_id, %question_id, %option_id))]
pub async fn http_post_toggle_correct(
  State(state): State<Arc<AppState>>,
  Path((quiz_id, question_id, option_id)): Path<(String, String, String)>,
) -> AppResult<Json<QuestionOut>> {
  let question = logic::toggle_correct(&state, &quiz_id, &question_id, &option_id).await?;
  Ok(Json(QuestionOut { question }))
}

#[instrument(level = "info", skip(state), fields(%quiz_id))]
pub async fn http_get_validate(
  State(state): State<Arc<AppState>>,
  Path(quiz_id): Path<String>,
) -> AppResult<Json<ValidationReport>> {
  Ok(Json(logic::validate_quiz(&state, &quiz_id).await?))
}

#[instrument(level = "info", skip(state), fields(%quiz_id))]
pub async fn http_get_export(
  State(state): State<Arc<AppState>>,
  Path(quiz_id): Path<String>,
) -> AppResult<impl IntoResponse> {
  let (file_name, body) = logic::export_quiz(&state, &quiz_id).await?;
  info!(target: "quiz", %quiz_id, bytes = body.len(), "HTTP quiz exported");
  Ok((
    [
      (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
      (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
    ],
    body,
  ))
}
