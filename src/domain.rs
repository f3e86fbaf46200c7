//! Domain models: quiz settings, uploaded files, questions/options, and the quiz itself.
//!
//! `Quiz` carries the editing operations used by the HTTP layer. Structural rules that must
//! hold at all times (ids exist, at least two options) are enforced here; answer-key rules
//! (exactly one / at least two correct) are only reported by `Quiz::validate`, because a
//! question is allowed to be temporarily inconsistent while it is being edited.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::util::option_letter;

/// Options a freshly generated question carries.
pub const OPTIONS_PER_QUESTION: usize = 4;
/// Editing never leaves a question with fewer options than this.
pub const MIN_OPTIONS: usize = 2;

/// Coarse classification of an uploaded file.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
  Text,
  Pdf,
  Image,
  Unknown,
}

impl FileKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      FileKind::Text => "text",
      FileKind::Pdf => "pdf",
      FileKind::Image => "image",
      FileKind::Unknown => "unknown",
    }
  }
}

/// An upload after classification.
/// `content` is raw text, base64 image data, or a placeholder (pdf / unknown).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFile {
  pub name: String,
  pub mime_type: String,
  pub kind: FileKind,
  pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSettings {
  pub name: String,
  pub grade_level: String,
  pub subject: String,
  pub prompt: String,
  pub question_count: usize,
  /// Target share of multi-answer questions, 0..=100.
  pub multi_answer_percent: u8,
  #[serde(default)]
  pub files: Vec<ProcessedFile>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizOption {
  #[serde(default)]
  pub id: String,
  pub text: String,
  pub is_correct: bool,
}

impl QuizOption {
  pub fn new(text: impl Into<String>, is_correct: bool) -> Self {
    Self { id: Uuid::new_v4().to_string(), text: text.into(), is_correct }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
  /// May be omitted in edit requests; the route path names the question.
  #[serde(default)]
  pub id: String,
  pub text: String,
  pub options: Vec<QuizOption>,
  /// Whether the question was requested as "select all that apply".
  pub multiple_answers: bool,
}

impl QuizQuestion {
  pub fn new(text: impl Into<String>, options: Vec<QuizOption>, multiple_answers: bool) -> Self {
    Self { id: Uuid::new_v4().to_string(), text: text.into(), options, multiple_answers }
  }

  pub fn correct_count(&self) -> usize {
    self.options.iter().filter(|o| o.is_correct).count()
  }

  fn option_mut(&mut self, option_id: &str) -> AppResult<&mut QuizOption> {
    self
      .options
      .iter_mut()
      .find(|o| o.id == option_id)
      .ok_or_else(|| AppError::NotFound(format!("option {}", option_id)))
  }
}

/// One reported problem from `Quiz::validate`.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
  /// `None` for quiz-level issues.
  pub question_id: Option<String>,
  /// 1-based position, matching what the user sees in the list.
  pub question_number: Option<usize>,
  pub message: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
  pub valid: bool,
  pub issues: Vec<ValidationIssue>,
}

/// One page of questions. `offset` is the 0-based index of the first item in the quiz.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPage {
  pub page: usize,
  pub page_size: usize,
  pub total_pages: usize,
  pub total_questions: usize,
  pub offset: usize,
  pub questions: Vec<QuizQuestion>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
  pub id: String,
  pub settings: QuizSettings,
  pub questions: Vec<QuizQuestion>,
}

impl Quiz {
  pub fn new(settings: QuizSettings, questions: Vec<QuizQuestion>) -> Self {
    Self { id: Uuid::new_v4().to_string(), settings, questions }
  }

  fn position(&self, question_id: &str) -> AppResult<usize> {
    self
      .questions
      .iter()
      .position(|q| q.id == question_id)
      .ok_or_else(|| AppError::NotFound(format!("question {}", question_id)))
  }

  pub fn question(&self, question_id: &str) -> AppResult<&QuizQuestion> {
    let idx = self.position(question_id)?;
    Ok(&self.questions[idx])
  }

  fn question_mut(&mut self, question_id: &str) -> AppResult<&mut QuizQuestion> {
    let idx = self.position(question_id)?;
    Ok(&mut self.questions[idx])
  }

  /// Replace a question in place. The incoming id must already exist.
  /// Option ids that are blank get fresh ids (new options added client-side).
  pub fn update_question(&mut self, mut updated: QuizQuestion) -> AppResult<&QuizQuestion> {
    if updated.options.len() < MIN_OPTIONS {
      return Err(AppError::Validation(format!(
        "a question needs at least {} options",
        MIN_OPTIONS
      )));
    }
    for opt in updated.options.iter_mut() {
      if opt.id.trim().is_empty() {
        opt.id = Uuid::new_v4().to_string();
      }
    }
    let idx = self.position(&updated.id)?;
    self.questions[idx] = updated;
    Ok(&self.questions[idx])
  }

  pub fn delete_question(&mut self, question_id: &str) -> AppResult<QuizQuestion> {
    let idx = self.position(question_id)?;
    Ok(self.questions.remove(idx))
  }

  /// Insert `questions` directly after `question_id`, keeping their order.
  pub fn insert_after(&mut self, question_id: &str, questions: Vec<QuizQuestion>) -> AppResult<()> {
    let idx = self.position(question_id)?;
    let tail = self.questions.split_off(idx + 1);
    self.questions.extend(questions);
    self.questions.extend(tail);
    Ok(())
  }

  pub fn append(&mut self, questions: Vec<QuizQuestion>) {
    self.questions.extend(questions);
  }

  /// Swap one question for another at the same position.
  pub fn replace_question(&mut self, question_id: &str, replacement: QuizQuestion) -> AppResult<()> {
    let idx = self.position(question_id)?;
    self.questions[idx] = replacement;
    Ok(())
  }

  pub fn add_option(&mut self, question_id: &str, text: &str) -> AppResult<&QuizQuestion> {
    let q = self.question_mut(question_id)?;
    q.options.push(QuizOption::new(text.trim(), false));
    Ok(&*q)
  }

  pub fn remove_option(&mut self, question_id: &str, option_id: &str) -> AppResult<&QuizQuestion> {
    let q = self.question_mut(question_id)?;
    let idx = q
      .options
      .iter()
      .position(|o| o.id == option_id)
      .ok_or_else(|| AppError::NotFound(format!("option {}", option_id)))?;
    if q.options.len() <= MIN_OPTIONS {
      return Err(AppError::Validation(format!(
        "a question keeps at least {} options",
        MIN_OPTIONS
      )));
    }
    q.options.remove(idx);
    Ok(&*q)
  }

  /// Single-answer: the chosen option becomes the only correct one.
  /// Multi-answer: the chosen option flips.
  pub fn toggle_correct(&mut self, question_id: &str, option_id: &str) -> AppResult<&QuizQuestion> {
    let q = self.question_mut(question_id)?;
    if q.multiple_answers {
      let opt = q.option_mut(option_id)?;
      opt.is_correct = !opt.is_correct;
    } else {
      q.option_mut(option_id)?;
      for o in q.options.iter_mut() {
        o.is_correct = o.id == option_id;
      }
    }
    Ok(&*q)
  }

  /// 1-based page; out-of-range pages clamp to the nearest valid page.
  pub fn page(&self, page: usize, page_size: usize) -> QuestionPage {
    let page_size = page_size.max(1);
    let total = self.questions.len();
    let total_pages = total.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);
    let offset = (page - 1) * page_size;
    let questions = self.questions.iter().skip(offset).take(page_size).cloned().collect();
    QuestionPage { page, page_size, total_pages, total_questions: total, offset, questions }
  }

  pub fn validate(&self) -> ValidationReport {
    let mut issues = Vec::new();
    if self.questions.is_empty() {
      issues.push(ValidationIssue {
        question_id: None,
        question_number: None,
        message: "The quiz has no questions.".into(),
      });
    }

    for (idx, q) in self.questions.iter().enumerate() {
      let mut push = |message: String| {
        issues.push(ValidationIssue {
          question_id: Some(q.id.clone()),
          question_number: Some(idx + 1),
          message,
        })
      };

      if q.text.trim().is_empty() {
        push("Question text is empty.".into());
      }
      if q.options.len() < MIN_OPTIONS {
        push(format!("Needs at least {} options.", MIN_OPTIONS));
      }
      for (oi, o) in q.options.iter().enumerate() {
        if o.text.trim().is_empty() {
          push(format!("Option {} is empty.", option_letter(oi)));
        }
      }
      let correct = q.correct_count();
      if q.multiple_answers {
        if correct < 2 {
          push(format!("Multi-answer question needs at least 2 correct options (has {}).", correct));
        }
      } else if correct != 1 {
        push(format!("Single-answer question needs exactly 1 correct option (has {}).", correct));
      }
    }

    ValidationReport { valid: issues.is_empty(), issues }
  }

  /// Plain-text rendering with an answer line under each question.
  pub fn export_text(&self) -> String {
    let s = &self.settings;
    let mut out = String::new();
    let title = if s.name.trim().is_empty() { "Quiz" } else { s.name.trim() };
    out.push_str(title);
    out.push('\n');
    let mut meta = Vec::new();
    if !s.subject.trim().is_empty() {
      meta.push(format!("Subject: {}", s.subject.trim()));
    }
    if !s.grade_level.trim().is_empty() {
      meta.push(format!("Grade: {}", s.grade_level.trim()));
    }
    if !meta.is_empty() {
      out.push_str(&meta.join(" | "));
      out.push('\n');
    }

    for (idx, q) in self.questions.iter().enumerate() {
      out.push('\n');
      out.push_str(&format!("{}. {}", idx + 1, q.text.trim()));
      if q.multiple_answers {
        out.push_str(" (select all that apply)");
      }
      out.push('\n');
      let mut answers = Vec::new();
      for (oi, o) in q.options.iter().enumerate() {
        let letter = option_letter(oi);
        out.push_str(&format!("   {}) {}\n", letter, o.text.trim()));
        if o.is_correct {
          answers.push(letter);
        }
      }
      let answer_line = if answers.is_empty() { "-".to_string() } else { answers.join(", ") };
      out.push_str(&format!("   Answer: {}\n", answer_line));
    }
    out
  }
}
