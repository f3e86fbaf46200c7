//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{
    FileKind, ProcessedFile, QuestionPage, Quiz, QuizQuestion, QuizSettings,
};

/// A file as the browser sends it: base64 payload (a `data:` URL is accepted too).
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadIn {
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateIn {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub grade_level: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub prompt: String,
    pub question_count: usize,
    #[serde(default)]
    pub multi_answer_percent: u8,
    #[serde(default)]
    pub files: Vec<FileUploadIn>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessFilesIn {
    pub files: Vec<FileUploadIn>,
}

/// File preview for the form; image payloads are not echoed back.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFileOut {
    pub name: String,
    pub mime_type: String,
    pub kind: FileKind,
    pub preview: String,
    pub chars: usize,
}

const PREVIEW_CHARS: usize = 200;

pub fn to_file_out(f: &ProcessedFile) -> ProcessedFileOut {
    let preview = match f.kind {
        FileKind::Image => String::new(),
        _ => crate::util::truncate_chars(&f.content, PREVIEW_CHARS),
    };
    ProcessedFileOut {
        name: f.name.clone(),
        mime_type: f.mime_type.clone(),
        kind: f.kind,
        preview,
        chars: f.content.chars().count(),
    }
}

#[derive(Debug, Serialize)]
pub struct ProcessFilesOut {
    pub files: Vec<ProcessedFileOut>,
}

/// Settings as echoed to the browser, without the file payloads.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsOut {
    pub name: String,
    pub grade_level: String,
    pub subject: String,
    pub prompt: String,
    pub question_count: usize,
    pub multi_answer_percent: u8,
    pub files: Vec<ProcessedFileOut>,
}

fn to_settings_out(s: &QuizSettings) -> SettingsOut {
    SettingsOut {
        name: s.name.clone(),
        grade_level: s.grade_level.clone(),
        subject: s.subject.clone(),
        prompt: s.prompt.clone(),
        question_count: s.question_count,
        multi_answer_percent: s.multi_answer_percent,
        files: s.files.iter().map(to_file_out).collect(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOut {
    pub id: String,
    pub settings: SettingsOut,
    #[serde(flatten)]
    pub page: QuestionPage,
}

pub fn to_quiz_out(q: &Quiz, page: usize, page_size: usize) -> QuizOut {
    QuizOut {
        id: q.id.clone(),
        settings: to_settings_out(&q.settings),
        page: q.page(page, page_size),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegenerateMode {
    #[default]
    Replace,
    InsertAfter,
}

/// Query string of the regenerate endpoint (`?mode=insert_after`).
#[derive(Debug, Default, Deserialize)]
pub struct RegenerateIn {
    #[serde(default)]
    pub mode: RegenerateMode,
}

#[derive(Debug, Deserialize)]
pub struct BatchIn {
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct OptionIn {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub question: QuizQuestion,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsOut {
    pub questions: Vec<QuizQuestion>,
    pub total_questions: usize,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub ai: bool,
}
