//! Application state: the in-memory quiz store, prompts, limits and the optional OpenAI client.
//!
//! Quizzes live only as long as the process. Every mutation goes through `with_quiz_mut`
//! so the write lock is held for exactly one edit.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::config::{load_quiz_config_from_env, Generation, Limits, Prompts, QuizConfig};
use crate::domain::Quiz;
use crate::error::{AppError, AppResult};
use crate::openai::OpenAI;

#[derive(Clone)]
pub struct AppState {
    pub quizzes: Arc<RwLock<HashMap<String, Quiz>>>,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
    pub limits: Limits,
    pub generation: Generation,
}

impl AppState {
    /// Build state from env: load config, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_quiz_config_from_env().unwrap_or_default();

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "quizcraft_backend", base_url = %oa.base_url, fast_model = %oa.fast_model, strong_model = %oa.strong_model, "OpenAI enabled.");
        } else {
            info!(target: "quizcraft_backend", "OpenAI disabled (no OPENAI_API_KEY). Generation endpoints will return 503.");
        }

        Self::with_parts(cfg, openai)
    }

    pub fn with_parts(cfg: QuizConfig, openai: Option<OpenAI>) -> Self {
        Self {
            quizzes: Arc::new(RwLock::new(HashMap::new())),
            openai,
            prompts: cfg.prompts,
            limits: cfg.limits,
            generation: cfg.generation,
        }
    }

    pub fn ai(&self) -> AppResult<&OpenAI> {
        self.openai.as_ref().ok_or(AppError::AiUnavailable)
    }

    #[instrument(level = "debug", skip(self, quiz), fields(id = %quiz.id, questions = quiz.questions.len()))]
    pub async fn insert_quiz(&self, quiz: Quiz) {
        self.quizzes.write().await.insert(quiz.id.clone(), quiz);
    }

    /// Read-only snapshot of a quiz by id.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_quiz(&self, id: &str) -> AppResult<Quiz> {
        self.quizzes
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("quiz {}", id)))
    }

    /// Run one edit against a stored quiz under the write lock.
    pub async fn with_quiz_mut<T>(
        &self,
        id: &str,
        edit: impl FnOnce(&mut Quiz) -> AppResult<T>,
    ) -> AppResult<T> {
        let mut quizzes = self.quizzes.write().await;
        let quiz = quizzes
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("quiz {}", id)))?;
        edit(quiz)
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn remove_quiz(&self, id: &str) -> AppResult<Quiz> {
        self.quizzes
            .write()
            .await
            .remove(id)
            .ok_or_else(|| AppError::NotFound(format!("quiz {}", id)))
    }
}
