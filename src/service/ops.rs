//! Lexical Operations
//!
//! Cache-fronted operations over the lexical graph. Each one derives its
//! key from the operation tag and every argument that changes the result,
//! so two calls collide exactly when their answers would be identical.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::cache::{CacheStore, KeyBuilder, Operation};
use crate::service::collaborators::{GraphSource, KnowledgeBase, TextGenerator};
use crate::service::{Result, ServiceError};

/// Language used for knowledge-base sections when the caller gives none.
const DEFAULT_LANG: &str = "en";

// == Retention Periods ==
/// How long each operation's results stay valid.
///
/// Generated prose ages slowly, graph-shaped answers age with the graph,
/// and node detail envelopes turn over fastest because they mix both.
pub mod ttl {
    use std::time::Duration;

    pub const EXPLANATION: Duration = Duration::from_secs(3 * 24 * 60 * 60);
    pub const RELATIONSHIP: Duration = Duration::from_secs(3 * 24 * 60 * 60);
    pub const GENERATED_RELATIONS: Duration = Duration::from_secs(7 * 24 * 60 * 60);
    pub const KNOWLEDGE_BASE: Duration = Duration::from_secs(24 * 60 * 60);
    pub const RELATED_TERMS: Duration = Duration::from_secs(24 * 60 * 60);
    pub const NODE_DETAILS: Duration = Duration::from_secs(60 * 60);
    pub const NEIGHBORHOOD: Duration = Duration::from_secs(24 * 60 * 60);
    pub const EXERCISE: Duration = Duration::from_secs(24 * 60 * 60);
}

// == Exercise Modes ==
/// Shape of a generated exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseMode {
    /// Fill-in / matching style drill.
    Structured,
    /// Open conversation starter.
    Conversation,
}

impl ExerciseMode {
    pub fn tag(&self) -> &'static str {
        match self {
            ExerciseMode::Structured => "structured",
            ExerciseMode::Conversation => "conversation",
        }
    }
}

// == Cached Payloads ==
/// A generated explanation of a single term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub term: String,
    pub model: String,
    pub text: String,
}

/// A generated analysis of the directed pair `(term1, term2)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipAnalysis {
    pub term1: String,
    pub term2: String,
    pub model: String,
    pub analysis: String,
}

/// Candidate relations proposed by the generator for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedRelations {
    pub node: String,
    pub model: String,
    pub relations: Value,
}

/// A generated practice exercise anchored on one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub node: String,
    pub level: u8,
    pub mode: String,
    pub model: String,
    pub content: String,
}

// == Lexical Service ==
/// Cache-fronted facade over the generator, knowledge base and graph.
///
/// All operations are read-through: a hit returns the stored payload
/// without touching any collaborator, a miss pays for exactly one
/// collaborator round trip and stores the result under the operation's
/// retention period. Failures are returned to the caller and never
/// stored, so the next call retries.
pub struct LexicalService {
    cache: Arc<CacheStore>,
    generator: Arc<dyn TextGenerator>,
    knowledge: Arc<dyn KnowledgeBase>,
    graph: Arc<dyn GraphSource>,
    default_model: String,
}

impl LexicalService {
    pub fn new(
        cache: Arc<CacheStore>,
        generator: Arc<dyn TextGenerator>,
        knowledge: Arc<dyn KnowledgeBase>,
        graph: Arc<dyn GraphSource>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            generator,
            knowledge,
            graph,
            default_model: default_model.into(),
        }
    }

    /// The cache store backing this service.
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    fn model_or_default(&self, model: Option<&str>) -> String {
        model.unwrap_or(&self.default_model).to_string()
    }

    /// Reads a typed payload out of the cache. An entry that no longer
    /// decodes as `T` is treated as a miss so the caller regenerates it.
    fn cached_payload<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.get(key)?;
        match serde_json::from_value(value) {
            Ok(payload) => Some(payload),
            Err(err) => {
                warn!("discarding unreadable cached payload for {}: {}", key, err);
                None
            }
        }
    }

    fn store_payload<T: Serialize>(&self, key: &str, payload: &T, ttl: Duration) {
        match serde_json::to_value(payload) {
            Ok(value) => self.cache.set(key, &value, Some(ttl)),
            Err(err) => warn!("failed to encode cache payload for {}: {}", key, err),
        }
    }

    /// Explains `term` for a learner, grounding the prompt in the term's
    /// graph neighborhood when one exists.
    ///
    /// Works for terms outside the graph too; they are simply explained
    /// without connected-term context.
    pub async fn explanation(&self, term: &str, model: Option<&str>) -> Result<Explanation> {
        let model = self.model_or_default(model);
        let key = KeyBuilder::new(Operation::Explanation)
            .push(term)
            .push(&model)
            .build();

        if let Some(cached) = self.cached_payload::<Explanation>(&key) {
            debug!("cache hit for {}", key);
            return Ok(cached);
        }

        debug!("cache miss for {}, generating", key);
        let neighbors = self.graph.neighbors(term);
        let prompt = if neighbors.is_empty() {
            format!("Explain the term '{}' for a language learner.", term)
        } else {
            format!(
                "Explain the term '{}' for a language learner. Connected terms: {}.",
                term,
                neighbors.join(", ")
            )
        };
        let text = self.generator.generate(&prompt, &model).await?;

        let payload = Explanation {
            term: term.to_string(),
            model,
            text,
        };
        self.store_payload(&key, &payload, ttl::EXPLANATION);
        Ok(payload)
    }

    /// Analyzes the relationship from `term1` to `term2`.
    ///
    /// Argument order is part of the key; the analysis of `(a, b)` is not
    /// the analysis of `(b, a)`.
    pub async fn relationship_analysis(
        &self,
        term1: &str,
        term2: &str,
        model: Option<&str>,
    ) -> Result<RelationshipAnalysis> {
        let model = self.model_or_default(model);
        let key = KeyBuilder::new(Operation::RelationshipAnalysis)
            .push(term1)
            .push(term2)
            .push(&model)
            .build();

        if let Some(cached) = self.cached_payload::<RelationshipAnalysis>(&key) {
            debug!("cache hit for {}", key);
            return Ok(cached);
        }

        debug!("cache miss for {}, generating", key);
        let prompt = format!(
            "Describe the relationship between '{}' and '{}' in a lexical graph.",
            term1, term2
        );
        let analysis = self.generator.generate(&prompt, &model).await?;

        let payload = RelationshipAnalysis {
            term1: term1.to_string(),
            term2: term2.to_string(),
            model,
            analysis,
        };
        self.store_payload(&key, &payload, ttl::RELATIONSHIP);
        Ok(payload)
    }

    /// Asks the generator to propose new relations for an existing node.
    ///
    /// The raw generator output must parse as JSON; output that does not
    /// is reported as [`ServiceError::MalformedResponse`] and nothing is
    /// cached.
    pub async fn generated_relations(
        &self,
        node: &str,
        model: Option<&str>,
    ) -> Result<GeneratedRelations> {
        if !self.graph.has_node(node) {
            return Err(ServiceError::UnknownNode(node.to_string()));
        }

        let model = self.model_or_default(model);
        let key = KeyBuilder::new(Operation::GeneratedRelations)
            .push(node)
            .push(&model)
            .build();

        if let Some(cached) = self.cached_payload::<GeneratedRelations>(&key) {
            debug!("cache hit for {}", key);
            return Ok(cached);
        }

        debug!("cache miss for {}, generating", key);
        let neighbors = self.graph.neighbors(node);
        let prompt = format!(
            "Produce a JSON array of lexical relations for '{}'. Known neighbors: {}.",
            node,
            neighbors.join(", ")
        );
        let raw = self.generator.generate(&prompt, &model).await?;
        let relations: Value = serde_json::from_str(&raw)
            .map_err(|err| ServiceError::MalformedResponse(err.to_string()))?;

        let payload = GeneratedRelations {
            node: node.to_string(),
            model,
            relations,
        };
        self.store_payload(&key, &payload, ttl::GENERATED_RELATIONS);
        Ok(payload)
    }

    /// Structured facts about `term` from the knowledge base.
    pub async fn knowledge_base_info(&self, term: &str, lang: &str) -> Result<Value> {
        let key = KeyBuilder::new(Operation::KnowledgeBaseInfo)
            .push(term)
            .push(lang)
            .build();

        if let Some(cached) = self.cache.get(&key) {
            debug!("cache hit for {}", key);
            return Ok(cached);
        }

        debug!("cache miss for {}, querying knowledge base", key);
        let facts = self.knowledge.lookup(term, lang).await?;
        self.cache.set(&key, &facts, Some(ttl::KNOWLEDGE_BASE));
        Ok(facts)
    }

    /// Terms the knowledge base considers related to `term`.
    pub async fn related_terms(&self, term: &str, lang: &str) -> Result<Value> {
        let key = KeyBuilder::new(Operation::RelatedTerms)
            .push(term)
            .push(lang)
            .build();

        if let Some(cached) = self.cache.get(&key) {
            debug!("cache hit for {}", key);
            return Ok(cached);
        }

        debug!("cache miss for {}, querying knowledge base", key);
        let related = self.knowledge.related(term, lang).await?;
        self.cache.set(&key, &related, Some(ttl::RELATED_TERMS));
        Ok(related)
    }

    /// Assembles a detail envelope for `node` with the requested sections.
    ///
    /// `include` chooses among `attributes`, `neighbors` and
    /// `knowledge_base`; an empty slice means all of them. Section order
    /// in `include` does not matter and does not change the key. A failed
    /// knowledge-base lookup voids only that section; the envelope still
    /// carries the graph sections and is cached with an error marker in
    /// the failed one, under the short detail retention.
    pub async fn node_details(&self, node: &str, include: &[&str]) -> Result<Value> {
        if !self.graph.has_node(node) {
            return Err(ServiceError::UnknownNode(node.to_string()));
        }

        let key = KeyBuilder::new(Operation::NodeDetails)
            .push(node)
            .push_collection(include)
            .build();

        if let Some(cached) = self.cache.get(&key) {
            debug!("cache hit for {}", key);
            return Ok(cached);
        }

        debug!("cache miss for {}, assembling details", key);
        let mut details = json!({ "node": node });

        if wants(include, "attributes") {
            details["attributes"] = self.graph.node_attributes(node).unwrap_or(Value::Null);
        }
        if wants(include, "neighbors") {
            details["neighbors"] = json!(self.graph.neighbors(node));
        }
        if wants(include, "knowledge_base") {
            details["knowledge_base"] = match self.knowledge.lookup(node, DEFAULT_LANG).await {
                Ok(facts) => facts,
                Err(err) => {
                    warn!("knowledge base section failed for {}: {}", node, err);
                    json!({ "error": err.to_string() })
                }
            };
        }

        self.cache.set(&key, &details, Some(ttl::NODE_DETAILS));
        Ok(details)
    }

    /// The immediate neighborhood of `node`, at most `limit` neighbors,
    /// each carrying its connecting edge attributes.
    pub fn neighborhood(&self, node: &str, limit: usize) -> Result<Value> {
        if !self.graph.has_node(node) {
            return Err(ServiceError::UnknownNode(node.to_string()));
        }

        let key = KeyBuilder::new(Operation::Neighborhood)
            .push(node)
            .push(&limit.to_string())
            .build();

        if let Some(cached) = self.cache.get(&key) {
            debug!("cache hit for {}", key);
            return Ok(cached);
        }

        debug!("cache miss for {}, shaping neighborhood", key);
        let neighbors: Vec<Value> = self
            .graph
            .neighbors(node)
            .into_iter()
            .take(limit)
            .map(|neighbor| {
                let edge = self
                    .graph
                    .edge_attributes(node, &neighbor)
                    .unwrap_or(Value::Null);
                json!({ "node": neighbor, "edge": edge })
            })
            .collect();

        let envelope = json!({ "node": node, "limit": limit, "neighbors": neighbors });
        self.cache.set(&key, &envelope, Some(ttl::NEIGHBORHOOD));
        Ok(envelope)
    }

    /// Generates a practice exercise anchored on `node`.
    ///
    /// `level` is clamped to the 1..=6 difficulty band rather than
    /// rejected, so a clamped request shares its cache entry with the
    /// in-band one.
    pub async fn exercise(
        &self,
        node: &str,
        level: u8,
        mode: ExerciseMode,
        model: Option<&str>,
    ) -> Result<Exercise> {
        if !self.graph.has_node(node) {
            return Err(ServiceError::UnknownNode(node.to_string()));
        }

        let level = level.clamp(1, 6);
        let model = self.model_or_default(model);
        let key = KeyBuilder::new(Operation::Exercise)
            .push(node)
            .push(&level.to_string())
            .push(mode.tag())
            .push(&model)
            .build();

        if let Some(cached) = self.cached_payload::<Exercise>(&key) {
            debug!("cache hit for {}", key);
            return Ok(cached);
        }

        debug!("cache miss for {}, generating", key);
        let neighbors = self.graph.neighbors(node);
        let prompt = match mode {
            ExerciseMode::Structured => format!(
                "Write a level {} vocabulary exercise around '{}'. Usable related terms: {}.",
                level,
                node,
                neighbors.join(", ")
            ),
            ExerciseMode::Conversation => format!(
                "Write a level {} conversation starter around '{}'. Usable related terms: {}.",
                level,
                node,
                neighbors.join(", ")
            ),
        };
        let content = self.generator.generate(&prompt, &model).await?;

        let payload = Exercise {
            node: node.to_string(),
            level,
            mode: mode.tag().to_string(),
            model,
            content,
        };
        self.store_payload(&key, &payload, ttl::EXERCISE);
        Ok(payload)
    }
}

fn wants(include: &[&str], section: &str) -> bool {
    include.is_empty() || include.contains(&section)
}
