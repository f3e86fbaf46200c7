//! Prompt construction for the three request types: initial generation, single-question
//! regeneration and batch addition.
//!
//! Template placeholders:
//!   {name} {subject} {grade} {prompt}   quiz settings
//!   {count} {multi_count}               generation / batch sizes
//!   {question} {answer_kind}            regeneration target
//!   {existing_questions}                numbered list of current questions
//!   {file_context}                      embedded file contents (may be empty)
//!
//! The shared `output_format` block is appended to every user prompt.

use crate::config::Prompts;
use crate::domain::{FileKind, ProcessedFile, QuizQuestion, QuizSettings};
use crate::util::fill_template;

/// How many of `count` questions should be multi-answer for a percentage target.
pub fn multi_answer_count(count: usize, percent: u8) -> usize {
  let pct = percent.min(100) as f64;
  ((count as f64) * pct / 100.0).round() as usize
}

/// Text context for the prompt. Images are only named here; their bytes travel as
/// separate inline image parts.
pub fn file_context(files: &[ProcessedFile]) -> String {
  if files.is_empty() {
    return String::new();
  }
  let mut out = String::from("\nBase the questions on the following reference material.\n");
  for f in files {
    match f.kind {
      FileKind::Image => {
        out.push_str(&format!("\n--- File: {} (image) ---\n[attached as image]\n", f.name));
      }
      _ => {
        out.push_str(&format!("\n--- File: {} ({}) ---\n{}\n", f.name, f.kind.as_str(), f.content));
      }
    }
  }
  out
}

fn existing_list(existing: &[QuizQuestion]) -> String {
  if existing.is_empty() {
    return "(none)".into();
  }
  existing
    .iter()
    .enumerate()
    .map(|(i, q)| format!("{}. {}", i + 1, q.text.trim()))
    .collect::<Vec<_>>()
    .join("\n")
}

fn describe_question(q: &QuizQuestion) -> String {
  let mut out = q.text.trim().to_string();
  for o in &q.options {
    out.push_str(&format!("\n- {}{}", o.text.trim(), if o.is_correct { " (correct)" } else { "" }));
  }
  out
}

fn with_format(prompts: &Prompts, body: String) -> String {
  format!("{}\n\n{}", body.trim_end(), prompts.output_format)
}

pub fn build_generation_prompt(prompts: &Prompts, settings: &QuizSettings) -> String {
  let count = settings.question_count.to_string();
  let multi = multi_answer_count(settings.question_count, settings.multi_answer_percent).to_string();
  let files = file_context(&settings.files);
  let body = fill_template(
    &prompts.generate_user_template,
    &[
      ("name", settings.name.as_str()),
      ("subject", settings.subject.as_str()),
      ("grade", settings.grade_level.as_str()),
      ("prompt", settings.prompt.as_str()),
      ("count", count.as_str()),
      ("multi_count", multi.as_str()),
      ("file_context", files.as_str()),
    ],
  );
  with_format(prompts, body)
}

pub fn build_regeneration_prompt(
  prompts: &Prompts,
  settings: &QuizSettings,
  existing: &[QuizQuestion],
  target: &QuizQuestion,
) -> String {
  let answer_kind = if target.multiple_answers {
    "a multi-answer question (\"multipleAnswers\": true, at least 2 correct options)"
  } else {
    "a single-answer question (\"multipleAnswers\": false, exactly 1 correct option)"
  };
  let question = describe_question(target);
  let list = existing_list(existing);
  let files = file_context(&settings.files);
  let body = fill_template(
    &prompts.regenerate_user_template,
    &[
      ("name", settings.name.as_str()),
      ("subject", settings.subject.as_str()),
      ("grade", settings.grade_level.as_str()),
      ("prompt", settings.prompt.as_str()),
      ("question", question.as_str()),
      ("answer_kind", answer_kind),
      ("existing_questions", list.as_str()),
      ("file_context", files.as_str()),
    ],
  );
  with_format(prompts, body)
}

pub fn build_batch_prompt(
  prompts: &Prompts,
  settings: &QuizSettings,
  existing: &[QuizQuestion],
  count: usize,
) -> String {
  let count_s = count.to_string();
  let multi = multi_answer_count(count, settings.multi_answer_percent).to_string();
  let list = existing_list(existing);
  let files = file_context(&settings.files);
  let body = fill_template(
    &prompts.batch_user_template,
    &[
      ("name", settings.name.as_str()),
      ("subject", settings.subject.as_str()),
      ("grade", settings.grade_level.as_str()),
      ("prompt", settings.prompt.as_str()),
      ("count", count_s.as_str()),
      ("multi_count", multi.as_str()),
      ("existing_questions", list.as_str()),
      ("file_context", files.as_str()),
    ],
  );
  with_format(prompts, body)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::tests::{settings, single};

  #[test]
  fn multi_answer_rounding() {
    assert_eq!(multi_answer_count(10, 0), 0);
    assert_eq!(multi_answer_count(10, 25), 3);
    assert_eq!(multi_answer_count(5, 50), 3);
    assert_eq!(multi_answer_count(4, 100), 4);
    assert_eq!(multi_answer_count(4, 250), 4);
  }

  #[test]
  fn generation_prompt_embeds_settings_and_format() {
    let mut s = settings();
    s.question_count = 8;
    s.multi_answer_percent = 25;
    let p = build_generation_prompt(&Prompts::default(), &s);
    assert!(p.contains("Create a quiz named \"Fractions check\"."));
    assert!(p.contains("Subject: Math"));
    assert!(p.contains("Grade level: 5"));
    assert!(p.contains("Write 8 questions. 2 of them"));
    assert!(p.contains("\"multipleAnswers\""));
    assert!(!p.contains("{count}"));
    assert!(!p.contains("reference material"));
  }

  #[test]
  fn file_context_embeds_text_and_names_images() {
    let mut s = settings();
    s.files = vec![
      ProcessedFile { name: "notes.txt".into(), mime_type: "text/plain".into(), kind: FileKind::Text, content: "Halves and quarters".into() },
      ProcessedFile { name: "chart.png".into(), mime_type: "image/png".into(), kind: FileKind::Image, content: "iVBORw0KGgo=".into() },
    ];
    let p = build_generation_prompt(&Prompts::default(), &s);
    assert!(p.contains("--- File: notes.txt (text) ---\nHalves and quarters"));
    assert!(p.contains("--- File: chart.png (image) ---\n[attached as image]"));
    assert!(!p.contains("iVBORw0KGgo="));
  }

  #[test]
  fn regeneration_prompt_keeps_answer_kind_and_lists_existing() {
    let existing = vec![single("What is 1/2 + 1/4?", 0), single("What is 2/3 - 1/3?", 1)];
    let mut target = existing[0].clone();
    target.multiple_answers = true;
    let p = build_regeneration_prompt(&Prompts::default(), &settings(), &existing, &target);
    assert!(p.contains("a multi-answer question"));
    assert!(p.contains("1. What is 1/2 + 1/4?\n2. What is 2/3 - 1/3?"));
    assert!(p.contains("- What is 1/2 + 1/4? opt 0 (correct)"));
  }

  #[test]
  fn batch_prompt_counts() {
    let mut s = settings();
    s.multi_answer_percent = 50;
    let p = build_batch_prompt(&Prompts::default(), &s, &[], 4);
    assert!(p.contains("Write 4 additional questions. 2 of them"));
    assert!(p.contains("(none)"));
  }
}
