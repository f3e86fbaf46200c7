//! Core workflows behind the HTTP handlers.
//!
//! This includes:
//!   - Generating a quiz from settings + uploads (prompt -> AI -> parser -> store)
//!   - Regenerating one question (replace in place or insert after it)
//!   - Appending a batch of additional questions
//!   - Editing, validation and export on stored quizzes

use tracing::{info, instrument, warn};

use crate::domain::{Quiz, QuizQuestion, QuizSettings, ValidationReport};
use crate::error::{AppError, AppResult};
use crate::files::process_uploads;
use crate::openai::InlineImage;
use crate::parser::{parse_questions, shuffle_options};
use crate::prompt::{build_batch_prompt, build_generation_prompt, build_regeneration_prompt};
use crate::protocol::{GenerateIn, RegenerateMode};
use crate::state::AppState;

fn check_count(count: usize, max: usize, what: &str) -> AppResult<()> {
  if count == 0 || count > max {
    return Err(AppError::Validation(format!("{} must be between 1 and {}", what, max)));
  }
  Ok(())
}

/// Ask the model and parse its answer. `expected_multi` is forwarded to the parser.
async fn ask_for_questions(
  state: &AppState,
  model_is_strong: bool,
  user_prompt: &str,
  settings: &QuizSettings,
  expected_multi: Option<bool>,
  temperature: f32,
) -> AppResult<Vec<QuizQuestion>> {
  let ai = state.ai()?;
  let model = if model_is_strong { &ai.strong_model } else { &ai.fast_model };
  let images = InlineImage::from_files(&settings.files);
  let raw = ai
    .generate_json(model, &state.prompts.system, user_prompt, &images, temperature)
    .await?;
  let mut questions = parse_questions(&raw, expected_multi)?;
  if state.generation.shuffle_options {
    shuffle_options(&mut questions);
  }
  Ok(questions)
}

#[instrument(level = "info", skip(state, req), fields(subject = %req.subject, grade = %req.grade_level, count = req.question_count, files = req.files.len()))]
pub async fn generate_quiz(state: &AppState, req: GenerateIn) -> AppResult<Quiz> {
  check_count(req.question_count, state.limits.max_questions, "questionCount")?;
  if req.multi_answer_percent > 100 {
    return Err(AppError::Validation("multiAnswerPercent must be between 0 and 100".into()));
  }
  // Fail before decoding uploads when generation is impossible anyway.
  state.ai()?;

  let files = process_uploads(&req.files, &state.limits)?;
  let settings = QuizSettings {
    name: req.name.trim().to_string(),
    grade_level: req.grade_level.trim().to_string(),
    subject: req.subject.trim().to_string(),
    prompt: req.prompt.trim().to_string(),
    question_count: req.question_count,
    multi_answer_percent: req.multi_answer_percent,
    files,
  };

  let user_prompt = build_generation_prompt(&state.prompts, &settings);
  let mut questions = ask_for_questions(
    state,
    true,
    &user_prompt,
    &settings,
    None,
    state.generation.temperature,
  )
  .await?;

  if questions.len() > settings.question_count {
    questions.truncate(settings.question_count);
  } else if questions.len() < settings.question_count {
    warn!(target: "quiz", requested = settings.question_count, received = questions.len(), "Model returned fewer questions than requested");
  }

  let quiz = Quiz::new(settings, questions);
  info!(target: "quiz", id = %quiz.id, questions = quiz.questions.len(), "Quiz generated");
  state.insert_quiz(quiz.clone()).await;
  Ok(quiz)
}

#[instrument(level = "info", skip(state), fields(%quiz_id, %question_id, ?mode))]
pub async fn regenerate_question(
  state: &AppState,
  quiz_id: &str,
  question_id: &str,
  mode: RegenerateMode,
) -> AppResult<QuizQuestion> {
  let quiz = state.get_quiz(quiz_id).await?;
  let target = quiz.question(question_id)?.clone();

  let user_prompt = build_regeneration_prompt(&state.prompts, &quiz.settings, &quiz.questions, &target);
  let replacement = ask_for_questions(
    state,
    false,
    &user_prompt,
    &quiz.settings,
    Some(target.multiple_answers),
    state.generation.regenerate_temperature,
  )
  .await?
  .into_iter()
  .next()
  .ok_or_else(|| AppError::Parse("no usable questions in response".into()))?;

  // The quiz may have been edited while the model was thinking; ids are re-resolved here.
  let stored = replacement.clone();
  state
    .with_quiz_mut(quiz_id, move |q| match mode {
      RegenerateMode::Replace => q.replace_question(question_id, stored),
      RegenerateMode::InsertAfter => q.insert_after(question_id, vec![stored]),
    })
    .await?;

  info!(target: "quiz", %quiz_id, old = %question_id, new = %replacement.id, "Question regenerated");
  Ok(replacement)
}

#[instrument(level = "info", skip(state), fields(%quiz_id))]
pub async fn add_questions(state: &AppState, quiz_id: &str, count: usize) -> AppResult<(Vec<QuizQuestion>, usize)> {
  check_count(count, state.limits.max_batch, "count")?;
  let quiz = state.get_quiz(quiz_id).await?;
  if quiz.questions.len() + count > state.limits.max_questions {
    return Err(AppError::Validation(format!(
      "a quiz holds at most {} questions",
      state.limits.max_questions
    )));
  }

  let user_prompt = build_batch_prompt(&state.prompts, &quiz.settings, &quiz.questions, count);
  let mut added = ask_for_questions(
    state,
    true,
    &user_prompt,
    &quiz.settings,
    None,
    state.generation.temperature,
  )
  .await?;
  added.truncate(count);

  let to_store = added.clone();
  let total = state
    .with_quiz_mut(quiz_id, move |q| {
      q.append(to_store);
      Ok(q.questions.len())
    })
    .await?;
  info!(target: "quiz", %quiz_id, added = added.len(), total, "Questions appended");
  Ok((added, total))
}

#[instrument(level = "info", skip(state, question), fields(%quiz_id, question_id = %question.id))]
pub async fn update_question(state: &AppState, quiz_id: &str, question: QuizQuestion) -> AppResult<QuizQuestion> {
  state
    .with_quiz_mut(quiz_id, |q| q.update_question(question).map(|u| u.clone()))
    .await
}

#[instrument(level = "info", skip(state), fields(%quiz_id, %question_id))]
pub async fn delete_question(state: &AppState, quiz_id: &str, question_id: &str) -> AppResult<QuizQuestion> {
  state
    .with_quiz_mut(quiz_id, |q| q.delete_question(question_id))
    .await
}

#[instrument(level = "info", skip(state, text), fields(%quiz_id, %question_id))]
pub async fn add_option(state: &AppState, quiz_id: &str, question_id: &str, text: &str) -> AppResult<QuizQuestion> {
  state
    .with_quiz_mut(quiz_id, |q| q.add_option(question_id, text).map(|u| u.clone()))
    .await
}

#[instrument(level = "info", skip(state), fields(%quiz_id, %question_id, %option_id))]
pub async fn remove_option(state: &AppState, quiz_id: &str, question_id: &str, option_id: &str) -> AppResult<QuizQuestion> {
  state
    .with_quiz_mut(quiz_id, |q| q.remove_option(question_id, option_id).map(|u| u.clone()))
    .await
}

#[instrument(level = "info", skip(state), fields(%quiz_id, %question_id, %option_id))]
pub async fn toggle_correct(state: &AppState, quiz_id: &str, question_id: &str, option_id: &str) -> AppResult<QuizQuestion> {
  state
    .with_quiz_mut(quiz_id, |q| q.toggle_correct(question_id, option_id).map(|u| u.clone()))
    .await
}

#[instrument(level = "info", skip(state), fields(%quiz_id))]
pub async fn validate_quiz(state: &AppState, quiz_id: &str) -> AppResult<ValidationReport> {
  let report = state.get_quiz(quiz_id).await?.validate();
  info!(target: "quiz", %quiz_id, valid = report.valid, issues = report.issues.len(), "Quiz validated");
  Ok(report)
}

/// Returns `(file name, text body)`.
#[instrument(level = "info", skip(state), fields(%quiz_id))]
pub async fn export_quiz(state: &AppState, quiz_id: &str) -> AppResult<(String, String)> {
  let quiz = state.get_quiz(quiz_id).await?;
  Ok((export_file_name(&quiz.settings.name), quiz.export_text()))
}

/// `"Unit 3: Fractions!"` -> `"unit-3-fractions.txt"`.
pub fn export_file_name(name: &str) -> String {
  let slug: String = name
    .trim()
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
    .collect();
  let slug = slug.split('-').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-");
  if slug.is_empty() { "quiz.txt".into() } else { format!("{}.txt", slug) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::QuizConfig;

  fn request(count: usize) -> GenerateIn {
    GenerateIn {
      name: "Plants".into(),
      grade_level: "3".into(),
      subject: "Science".into(),
      prompt: "Photosynthesis basics".into(),
      question_count: count,
      multi_answer_percent: 0,
      files: vec![],
    }
  }

  #[test]
  fn file_names() {
    assert_eq!(export_file_name("Unit 3: Fractions!"), "unit-3-fractions.txt");
    assert_eq!(export_file_name("   "), "quiz.txt");
  }

  #[tokio::test]
  async fn generation_checks_inputs_before_ai() {
    let state = AppState::with_parts(QuizConfig::default(), None);
    assert!(matches!(generate_quiz(&state, request(0)).await, Err(AppError::Validation(_))));
    assert!(matches!(generate_quiz(&state, request(500)).await, Err(AppError::Validation(_))));
    let mut r = request(5);
    r.multi_answer_percent = 101;
    assert!(matches!(generate_quiz(&state, r).await, Err(AppError::Validation(_))));
    assert!(matches!(generate_quiz(&state, request(5)).await, Err(AppError::AiUnavailable)));
  }
}
