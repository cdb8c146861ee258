use std::path::PathBuf;

use thiserror::Error;

use crate::quiz::Level;

/// Errors a user can run into while driving the quiz. These are always
/// recovered at the bot boundary and turned into a fixed chat message; they
/// never surface as raw faults.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("unknown level: {0:?}")]
    UnknownLevel(String),
    #[error("no active quiz for this user")]
    NoActiveSession,
}

impl QuizError {
    /// The fixed reply the bot sends when this error reaches a chat.
    pub fn user_message(&self) -> &'static str {
        match self {
            QuizError::UnknownLevel(_) => "Пожалуйста, выберите уровень через /level.",
            QuizError::NoActiveSession => "ℹ️ Пока нет активной викторины. Нажмите /start.",
        }
    }
}

/// Question-source problems caught while the bank loads. Any of these means
/// the questions/ directory of the deployment is corrupt, so they are fatal
/// at startup rather than per-request errors.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{level}: question set is empty")]
    EmptySet { level: Level },
    #[error("{level}, question {index}: fewer than two options")]
    TooFewOptions { level: Level, index: usize },
    #[error("{level}, question {index}: correct answer index {correct} is out of range")]
    CorrectOutOfRange {
        level: Level,
        index: usize,
        correct: usize,
    },
}

/// Result-store failures. Never fatal for the interaction: callers log them
/// and the user still gets the in-memory view of their quiz.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("results serialization failed: {0}")]
    Serialization(String),
}
