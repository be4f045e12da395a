//! Service Module
//!
//! The cached lexical operations and the collaborator traits they call
//! through. Every operation here follows the same shape: build a
//! deterministic key, consult the cache, and only on a miss pay for the
//! expensive collaborator before writing the result back.

pub mod collaborators;
pub mod ops;

pub use collaborators::{GenerateError, GraphSource, KnowledgeBase, LookupError, TextGenerator};
pub use ops::ttl;
pub use ops::{
    Exercise, ExerciseMode, Explanation, GeneratedRelations, LexicalService, RelationshipAnalysis,
};

use thiserror::Error;

// == Service Errors ==
/// Errors surfaced by [`LexicalService`] operations.
///
/// None of these are ever cached; a failed operation leaves the cache
/// untouched so the next call retries the collaborator.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("text generation failed: {0}")]
    Generation(#[from] GenerateError),

    #[error("knowledge base lookup failed: {0}")]
    KnowledgeBase(#[from] LookupError),

    #[error("generator returned malformed output: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
