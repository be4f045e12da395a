//! Collaborator Contracts
//!
//! Trait seams for the expensive subsystems the cache fronts: text
//! generation, the structured knowledge base and the lexical graph. Real
//! clients live outside this crate; tests substitute scripted ones.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

// == Collaborator Errors ==
/// Total failure of the text generator, after it has exhausted whatever
/// retries and model fallbacks it runs internally.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct GenerateError(pub String);

/// Failure of a knowledge-base lookup.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct LookupError(pub String);

// == Text Generator ==
/// Produces text for a prompt using a named model variant.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, GenerateError>;
}

// == Knowledge Base ==
/// Structured-fact source addressed by term and language.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Fetches structured facts about `term`.
    async fn lookup(&self, term: &str, lang: &str) -> Result<Value, LookupError>;

    /// Fetches terms related to `term`.
    async fn related(&self, term: &str, lang: &str) -> Result<Value, LookupError>;
}

// == Graph Source ==
/// Read access to the lexical graph.
///
/// Implementations report empty or absent results rather than failing
/// when the graph is unavailable.
pub trait GraphSource: Send + Sync {
    /// Whether `node` exists in the graph.
    fn has_node(&self, node: &str) -> bool;

    /// Attributes attached to `node`, if it exists.
    fn node_attributes(&self, node: &str) -> Option<Value>;

    /// Neighbor nodes of `node`, in graph order.
    fn neighbors(&self, node: &str) -> Vec<String>;

    /// Attributes of the edge between `from` and `to`, if one exists.
    fn edge_attributes(&self, from: &str, to: &str) -> Option<Value>;
}
