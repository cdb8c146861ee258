use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::LoadError;
use crate::quiz::{Level, Question};

/// All question sets, loaded once at startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    sets: HashMap<Level, Vec<Question>>,
}

impl QuestionBank {
    /// Reads `<dir>/<level>.json` for every level and validates each set.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let dir = dir.as_ref();
        let mut sets = HashMap::new();
        for level in Level::ALL {
            let path = dir.join(format!("{}.json", level.key()));
            let file = File::open(&path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;
            let questions: Vec<Question> = serde_json::from_reader(BufReader::new(file))
                .map_err(|source| LoadError::Parse { path, source })?;
            validate(level, &questions)?;
            log::info!("loaded {} questions for level {}", questions.len(), level);
            sets.insert(level, questions);
        }
        Ok(Self { sets })
    }

    pub fn questions_for(&self, level: Level) -> &[Question] {
        self.sets.get(&level).map(Vec::as_slice).unwrap_or_default()
    }
}

#[cfg(test)]
impl QuestionBank {
    /// Builds a bank straight from in-memory sets, skipping the file pass.
    pub(crate) fn from_sets(sets: HashMap<Level, Vec<Question>>) -> Self {
        Self { sets }
    }
}

fn validate(level: Level, questions: &[Question]) -> Result<(), LoadError> {
    if questions.is_empty() {
        return Err(LoadError::EmptySet { level });
    }
    for (index, question) in questions.iter().enumerate() {
        if question.options.len() < 2 {
            return Err(LoadError::TooFewOptions { level, index });
        }
        if question.correct >= question.options.len() {
            return Err(LoadError::CorrectOutOfRange {
                level,
                index,
                correct: question.correct,
            });
        }
    }
    Ok(())
}
