//! Build-time embedded fallback dataset
//!
//! The bundled questions are compiled into the binary so that a question set
//! is always available, even with an empty store and no network.

use std::sync::{Arc, OnceLock};

use super::types::{validate_all, QuestionRecord};

const BUNDLED_JSON: &str = include_str!("../../data/questions.json");

static BUNDLED: OnceLock<FallbackDataset> = OnceLock::new();

/// A non-empty, validated question list used when the store has nothing
#[derive(Debug, Clone)]
pub struct FallbackDataset {
    questions: Arc<Vec<QuestionRecord>>,
}

impl FallbackDataset {
    /// Wrap a question list, rejecting empty or invalid sets
    pub fn new(questions: Vec<QuestionRecord>) -> Result<Self, String> {
        if questions.is_empty() {
            return Err("fallback dataset must not be empty".to_string());
        }
        validate_all(&questions)?;

        Ok(Self {
            questions: Arc::new(questions),
        })
    }

    /// The dataset embedded in the binary
    pub fn bundled() -> Self {
        BUNDLED
            .get_or_init(|| {
                let questions: Vec<QuestionRecord> =
                    serde_json::from_str(BUNDLED_JSON).expect("bundled questions.json is valid");
                FallbackDataset::new(questions).expect("bundled questions.json is non-empty")
            })
            .clone()
    }

    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    pub fn to_vec(&self) -> Vec<QuestionRecord> {
        self.questions.as_ref().clone()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl Default for FallbackDataset {
    fn default() -> Self {
        Self::bundled()
    }
}
