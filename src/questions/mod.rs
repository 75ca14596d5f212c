//! Question data model, bundled fallback dataset and remote source seam

pub mod bundled;
pub mod source;
pub mod types;

pub use bundled::FallbackDataset;
pub use source::{BundledSource, HttpQuestionSource, QuestionSource, SourceError};
pub use types::{AnsweredQuestionEntry, CacheMetadata, Difficulty, QuestionRecord};
