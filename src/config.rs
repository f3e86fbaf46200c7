//! Loading quiz configuration (prompts, upload limits, generation knobs) from TOML.
//!
//! Every section is optional; missing keys fall back to the defaults below.
//!
//! ```toml
//! [limits]
//! max_file_bytes = 4194304
//!
//! [generation]
//! temperature = 0.7
//! shuffle_options = true
//!
//! [prompts]
//! system = "..."
//! ```

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct QuizConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub limits: Limits,
  #[serde(default)]
  pub generation: Generation,
}

/// Upload and request size limits.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Limits {
  pub max_files: usize,
  pub max_file_bytes: usize,
  /// Text files are cut to this many characters before they go into a prompt.
  pub max_text_chars: usize,
  pub max_questions: usize,
  pub max_batch: usize,
  pub default_page_size: usize,
}

impl Default for Limits {
  fn default() -> Self {
    Self {
      max_files: 5,
      max_file_bytes: 4 * 1024 * 1024,
      max_text_chars: 20_000,
      max_questions: 50,
      max_batch: 20,
      default_page_size: 5,
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Generation {
  pub temperature: f32,
  pub regenerate_temperature: f32,
  /// Reorder options after parsing so the correct one is not always first.
  pub shuffle_options: bool,
}

impl Default for Generation {
  fn default() -> Self {
    Self { temperature: 0.7, regenerate_temperature: 0.9, shuffle_options: true }
  }
}

/// Prompt templates. Placeholders use `{name}` syntax (see `prompt.rs` for the full list).
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub system: String,
  /// Appended to every user prompt; describes the JSON shape we parse.
  pub output_format: String,
  pub generate_user_template: String,
  pub regenerate_user_template: String,
  pub batch_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      system: "You are an experienced teacher who writes clear, accurate multiple-choice quiz questions for the given grade level. Respond ONLY with strict JSON.".into(),
      output_format: r#"Return a JSON object of this exact shape:
{"questions": [{"question": "text", "multipleAnswers": false, "options": [{"text": "option", "isCorrect": true}, {"text": "option", "isCorrect": false}, {"text": "option", "isCorrect": false}, {"text": "option", "isCorrect": false}]}]}
Rules:
- Every question has exactly 4 options.
- A question with "multipleAnswers": false has exactly 1 correct option.
- A question with "multipleAnswers": true has at least 2 correct options.
- Write math in LaTeX between $...$ and escape every backslash for JSON (write \\frac, not \frac).
- Do not wrap the JSON in markdown code fences."#.into(),
      generate_user_template: "Create a quiz named \"{name}\".\nSubject: {subject}\nGrade level: {grade}\nTeacher instructions: {prompt}\n\nWrite {count} questions. {multi_count} of them must be multi-answer questions (\"multipleAnswers\": true); the rest are single-answer.\n{file_context}".into(),
      regenerate_user_template: "Quiz \"{name}\" for grade {grade}, subject {subject}.\nTeacher instructions: {prompt}\n\nReplace this question with ONE new, different question on the same topic:\n{question}\n\nThe new question must be {answer_kind}. Do not repeat any of the existing questions:\n{existing_questions}\n{file_context}".into(),
      batch_user_template: "Quiz \"{name}\" for grade {grade}, subject {subject}.\nTeacher instructions: {prompt}\n\nWrite {count} additional questions. {multi_count} of them must be multi-answer questions. Do not repeat or paraphrase any of the existing questions:\n{existing_questions}\n{file_context}".into(),
    }
  }
}

/// Attempt to load `QuizConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_quiz_config_from_env() -> Option<QuizConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<QuizConfig>(&s) {
      Ok(cfg) => {
        info!(target: "quizcraft_backend", %path, "Loaded quiz config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quizcraft_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "quizcraft_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_toml_keeps_defaults() {
    let cfg: QuizConfig = toml::from_str(
      r#"
      [limits]
      max_files = 2

      [prompts]
      system = "Be brief."
      "#,
    )
    .unwrap();
    assert_eq!(cfg.limits.max_files, 2);
    assert_eq!(cfg.limits.default_page_size, 5);
    assert_eq!(cfg.prompts.system, "Be brief.");
    assert!(cfg.prompts.generate_user_template.contains("{count}"));
    assert!(cfg.generation.shuffle_options);
  }

  #[test]
  fn empty_toml_is_default() {
    let cfg: QuizConfig = toml::from_str("").unwrap();
    assert_eq!(cfg.limits.max_questions, 50);
    assert!((cfg.generation.temperature - 0.7).abs() < f32::EPSILON);
  }
}
