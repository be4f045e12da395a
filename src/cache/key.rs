//! Cache Key Module
//!
//! The single key-construction path shared by everything that reads or
//! writes the cache. Keys are readable concatenations: the operation tag,
//! then the subjects in call order, then parameters, joined with `:`.
//! Segments are escaped so a separator inside a subject can never make two
//! distinct inputs collide, and nothing nondeterministic (timestamps,
//! random identifiers, addresses) ever goes into a key.

// == Operation ==
/// The kinds of cached computation, each with a fixed tag.
///
/// Tags are part of the stored-key format; changing one orphans every
/// durable row written under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Prose explanation of a single term
    Explanation,
    /// Analysis of how two terms relate (argument order matters)
    RelationshipAnalysis,
    /// Generated relation list for a graph node
    GeneratedRelations,
    /// Structured facts about a term from the knowledge base
    KnowledgeBaseInfo,
    /// Terms related to a term, from the knowledge base
    RelatedTerms,
    /// Assembled detail envelope for a graph node
    NodeDetails,
    /// Neighborhood subgraph around a node
    Neighborhood,
    /// Generated exercise or conversation starter for a node
    Exercise,
}

impl Operation {
    /// The stable tag string that leads every key for this operation.
    pub fn tag(&self) -> &'static str {
        match self {
            Operation::Explanation => "explanation",
            Operation::RelationshipAnalysis => "relationship",
            Operation::GeneratedRelations => "generated_relations",
            Operation::KnowledgeBaseInfo => "kb_info",
            Operation::RelatedTerms => "kb_related",
            Operation::NodeDetails => "node_details",
            Operation::Neighborhood => "neighborhood",
            Operation::Exercise => "exercise",
        }
    }
}

// == Key Builder ==
/// Builds a cache key from an operation tag and a sequence of segments.
///
/// Segment order is significant: `relationship:a:b` and `relationship:b:a`
/// name different computations. Collection parameters go through
/// [`KeyBuilder::push_collection`], which sorts them first, so
/// logically-equal collections in any order produce the same key.
#[derive(Debug)]
pub struct KeyBuilder {
    segments: Vec<String>,
}

impl KeyBuilder {
    /// Starts a key for `op`.
    pub fn new(op: Operation) -> Self {
        Self {
            segments: vec![op.tag().to_string()],
        }
    }

    /// Appends one subject or parameter segment.
    pub fn push(mut self, segment: &str) -> Self {
        self.segments.push(escape_segment(segment));
        self
    }

    /// Appends a collection parameter as a single normalized segment:
    /// items are sorted, escaped and joined with `,`.
    pub fn push_collection<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut items: Vec<String> = items
            .into_iter()
            .map(|item| item.as_ref().to_string())
            .collect();
        items.sort_unstable();

        let escaped: Vec<String> = items.iter().map(|item| escape_segment(item)).collect();
        self.segments.push(escaped.join(","));
        self
    }

    /// Joins the segments into the final key.
    pub fn build(self) -> String {
        self.segments.join(":")
    }
}

// == Segment Escaping ==
/// Escapes the characters the key format reserves: `%` (the escape
/// introducer itself), the `:` segment separator and the `,` collection
/// separator. Escaping is injective, so distinct segment lists always
/// yield distinct keys.
fn escape_segment(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for ch in segment.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            ':' => escaped.push_str("%3A"),
            ',' => escaped.push_str("%2C"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format_is_stable() {
        let key = KeyBuilder::new(Operation::Explanation)
            .push("casa")
            .push("gemini-2.0-flash")
            .build();
        assert_eq!(key, "explanation:casa:gemini-2.0-flash");
    }

    #[test]
    fn test_key_is_deterministic() {
        let build = || {
            KeyBuilder::new(Operation::KnowledgeBaseInfo)
                .push("perro")
                .push("es")
                .build()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_distinct_operations_never_collide() {
        let info = KeyBuilder::new(Operation::KnowledgeBaseInfo)
            .push("sol")
            .push("es")
            .build();
        let related = KeyBuilder::new(Operation::RelatedTerms)
            .push("sol")
            .push("es")
            .build();
        assert_ne!(info, related);
    }

    #[test]
    fn test_subject_order_is_preserved() {
        let forward = KeyBuilder::new(Operation::RelationshipAnalysis)
            .push("luz")
            .push("sombra")
            .build();
        let reverse = KeyBuilder::new(Operation::RelationshipAnalysis)
            .push("sombra")
            .push("luz")
            .build();
        assert_ne!(forward, reverse);
    }

    #[test]
    fn test_collection_order_is_normalized() {
        let a = KeyBuilder::new(Operation::NodeDetails)
            .push("casa")
            .push_collection(["neighbors", "attributes"])
            .build();
        let b = KeyBuilder::new(Operation::NodeDetails)
            .push("casa")
            .push_collection(["attributes", "neighbors"])
            .build();
        assert_eq!(a, b);
        assert_eq!(b, "node_details:casa:attributes,neighbors");
    }

    #[test]
    fn test_separator_in_segment_does_not_alias() {
        let single = KeyBuilder::new(Operation::Explanation).push("a:b").build();
        let pair = KeyBuilder::new(Operation::Explanation)
            .push("a")
            .push("b")
            .build();
        assert_ne!(single, pair);
        assert_eq!(single, "explanation:a%3Ab");
    }

    #[test]
    fn test_escape_introducer_is_escaped_first() {
        // A segment that already looks escaped must not collide with the
        // segment it would decode to.
        let literal = KeyBuilder::new(Operation::Explanation)
            .push("a%3Ab")
            .build();
        let colon = KeyBuilder::new(Operation::Explanation).push("a:b").build();
        assert_ne!(literal, colon);
    }

    #[test]
    fn test_comma_in_collection_item_does_not_alias() {
        let joined = KeyBuilder::new(Operation::NodeDetails)
            .push("x")
            .push_collection(["a,b"])
            .build();
        let split = KeyBuilder::new(Operation::NodeDetails)
            .push("x")
            .push_collection(["a", "b"])
            .build();
        assert_ne!(joined, split);
    }

    #[test]
    fn test_empty_collection_produces_empty_segment() {
        let key = KeyBuilder::new(Operation::NodeDetails)
            .push("casa")
            .push_collection(Vec::<String>::new())
            .build();
        assert_eq!(key, "node_details:casa:");
    }
}
