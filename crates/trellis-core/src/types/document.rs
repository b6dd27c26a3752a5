//! Vertex and edge documents
//!
//! A document is an attribute bag identified by a collection-qualified
//! `_id` of the form `"<collection>/<key>"`. Edge documents additionally
//! carry `_from` and `_to`. Traversal treats documents as immutable
//! snapshots shared through `Arc`.

use crate::types::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Collection-qualified document identifier (`collection/key`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId {
    id: String,
    split: usize,
}

impl DocumentId {
    /// Parse an id of the form `collection/key`
    ///
    /// Returns `None` when either part is empty or the separator is missing.
    pub fn parse(id: &str) -> Option<Self> {
        let split = id.find('/')?;
        if split == 0 || split + 1 >= id.len() {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            split,
        })
    }

    /// Build an id from its parts
    pub fn new(collection: &str, key: &str) -> Self {
        Self {
            id: format!("{}/{}", collection, key),
            split: collection.len(),
        }
    }

    /// Collection part
    pub fn collection(&self) -> &str {
        &self.id[..self.split]
    }

    /// Key part
    pub fn key(&self) -> &str {
        &self.id[self.split + 1..]
    }

    /// Full id string
    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid document id '{}'", value))
    }
}

impl From<DocumentId> for String {
    fn from(value: DocumentId) -> Self {
        value.id
    }
}

/// Edge endpoints, present only on edge documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeEnds {
    pub from: DocumentId,
    pub to: DocumentId,
}

/// A stored vertex or edge document
///
/// `body` is always an object and contains the system attributes (`_id`,
/// `_key`, and for edges `_from`/`_to`) alongside user attributes, so
/// expression evaluation can borrow attributes without conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: DocumentId,
    ends: Option<EdgeEnds>,
    body: Value,
}

impl Document {
    /// Create a vertex document from user attributes
    pub fn vertex(id: DocumentId, attributes: Value) -> Self {
        let body = with_system_attributes(&id, None, attributes);
        Self {
            id,
            ends: None,
            body,
        }
    }

    /// Create an edge document from user attributes
    pub fn edge(id: DocumentId, from: DocumentId, to: DocumentId, attributes: Value) -> Self {
        let ends = EdgeEnds { from, to };
        let body = with_system_attributes(&id, Some(&ends), attributes);
        Self {
            id,
            ends: Some(ends),
            body,
        }
    }

    /// Document id
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// Edge endpoints (`None` for vertices)
    pub fn ends(&self) -> Option<&EdgeEnds> {
        self.ends.as_ref()
    }

    /// Full document body as an object value
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Look up a single attribute
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.body.get(attribute)
    }

    /// The vertex on the other side of this edge, seen from `vertex`
    ///
    /// For a self-loop both sides are `vertex`.
    pub fn other_end(&self, vertex: &DocumentId) -> Option<&DocumentId> {
        let ends = self.ends.as_ref()?;
        if &ends.from == vertex {
            Some(&ends.to)
        } else {
            Some(&ends.from)
        }
    }
}

fn with_system_attributes(id: &DocumentId, ends: Option<&EdgeEnds>, attributes: Value) -> Value {
    let mut pairs = vec![
        ("_id".to_string(), Value::string(id.as_str())),
        ("_key".to_string(), Value::string(id.key())),
    ];
    if let Some(ends) = ends {
        pairs.push(("_from".to_string(), Value::string(ends.from.as_str())));
        pairs.push(("_to".to_string(), Value::string(ends.to.as_str())));
    }
    if let Value::Object(user) = attributes {
        pairs.extend(user.into_iter().filter(|(k, _)| {
            !matches!(k.as_str(), "_id" | "_key" | "_from" | "_to")
        }));
    }
    Value::Object(pairs)
}
