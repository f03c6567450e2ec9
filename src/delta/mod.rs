//! Rich-text deltas.
//!
//! A [`Delta`] is a list of `insert` / `retain` / `delete` runs describing
//! either a whole document (inserts only) or a change against one. The JSON
//! form matches the rich-text OT type: `{"ops":[{"insert":"hi"},{"retain":2}]}`.
//!
//! Lengths count Unicode scalar values, which is also how the rope-backed
//! editor indexes text.

mod diff;

pub use diff::diff;

use ropey::Rope;
use serde::{Deserialize, Serialize};

/// Formatting attributes carried by an insert or retain run.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Error applying a delta to a text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeltaError {
    #[error("delta spans {required} characters but the text has {available}")]
    OutOfRange { required: usize, available: usize },
    #[error("expected a document delta made only of inserts")]
    NotDocument,
}

/// A single run in a delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Op {
    Insert {
        insert: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<Attributes>,
    },
    Retain {
        retain: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<Attributes>,
    },
    Delete {
        delete: usize,
    },
}

impl Op {
    /// Length of the run in characters.
    pub fn len(&self) -> usize {
        match self {
            Self::Insert { insert, .. } => insert.chars().count(),
            Self::Retain { retain, .. } => *retain,
            Self::Delete { delete } => *delete,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An ordered list of runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub ops: Vec<Op>,
}

impl Delta {
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// A document delta holding `text` as a single insert.
    pub fn from_text(text: &str) -> Self {
        let mut delta = Self::new();
        delta.insert(text);
        delta
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Append an unformatted insert.
    pub fn insert(&mut self, text: &str) -> &mut Self {
        self.insert_with(text, None)
    }

    /// Append an insert with optional attributes.
    ///
    /// Adjacent inserts with equal attributes are merged. An insert pushed
    /// right after a delete is placed before it, so equivalent deltas
    /// compare equal.
    pub fn insert_with(&mut self, text: &str, attributes: Option<Attributes>) -> &mut Self {
        if text.is_empty() {
            return self;
        }
        let attributes = attributes.filter(|attrs| !attrs.is_empty());
        let mut at = self.ops.len();
        if matches!(self.ops.last(), Some(Op::Delete { .. })) {
            at -= 1;
        }
        if at > 0
            && let Some(Op::Insert {
                insert,
                attributes: prev,
            }) = self.ops.get_mut(at - 1)
            && *prev == attributes
        {
            insert.push_str(text);
            return self;
        }
        self.ops.insert(
            at,
            Op::Insert {
                insert: text.to_string(),
                attributes,
            },
        );
        self
    }

    /// Append a plain retain.
    pub fn retain(&mut self, count: usize) -> &mut Self {
        self.retain_with(count, None)
    }

    pub fn retain_with(&mut self, count: usize, attributes: Option<Attributes>) -> &mut Self {
        if count == 0 {
            return self;
        }
        let attributes = attributes.filter(|attrs| !attrs.is_empty());
        if let Some(Op::Retain {
            retain,
            attributes: prev,
        }) = self.ops.last_mut()
            && *prev == attributes
        {
            *retain += count;
            return self;
        }
        self.ops.push(Op::Retain {
            retain: count,
            attributes,
        });
        self
    }

    pub fn delete(&mut self, count: usize) -> &mut Self {
        if count == 0 {
            return self;
        }
        if let Some(Op::Delete { delete }) = self.ops.last_mut() {
            *delete += count;
            return self;
        }
        self.ops.push(Op::Delete { delete: count });
        self
    }

    /// Drop a trailing unformatted retain, which changes nothing.
    pub fn chop(&mut self) -> &mut Self {
        if matches!(
            self.ops.last(),
            Some(Op::Retain {
                attributes: None,
                ..
            })
        ) {
            self.ops.pop();
        }
        self
    }

    /// Number of characters of the base text this delta reads.
    pub fn base_len(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                Op::Insert { .. } => 0,
                other => other.len(),
            })
            .sum()
    }

    /// Concatenated text of all inserts.
    ///
    /// For a document delta this is the document's plain text.
    pub fn text(&self) -> String {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Insert { insert, .. } => Some(insert.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Whether every run is an insert.
    pub fn is_document(&self) -> bool {
        self.ops.iter().all(|op| matches!(op, Op::Insert { .. }))
    }

    /// Where a character index ends up after this delta is applied.
    ///
    /// Inserts at exactly `index` push it forward.
    pub fn transform_position(&self, mut index: usize) -> usize {
        let mut offset = 0;
        for op in &self.ops {
            if offset > index {
                break;
            }
            match op {
                Op::Delete { delete } => index -= (*delete).min(index - offset),
                Op::Insert { .. } => {
                    index += op.len();
                    offset += op.len();
                }
                Op::Retain { retain, .. } => offset += retain,
            }
        }
        index
    }

    /// Apply this delta to `rope` in place.
    ///
    /// Attributes are ignored; the rope holds plain text only. The rope is
    /// left untouched when the delta reads past its end.
    ///
    /// # Errors
    /// Returns [`DeltaError::OutOfRange`] when retains and deletes span more
    /// characters than the rope holds.
    pub fn apply_to(&self, rope: &mut Rope) -> Result<(), DeltaError> {
        let required = self.base_len();
        let available = rope.len_chars();
        if required > available {
            return Err(DeltaError::OutOfRange {
                required,
                available,
            });
        }

        let mut index = 0;
        for op in &self.ops {
            match op {
                Op::Retain { retain, .. } => index += retain,
                Op::Insert { insert, .. } => {
                    rope.insert(index, insert);
                    index += insert.chars().count();
                }
                Op::Delete { delete } => rope.remove(index..index + delete),
            }
        }
        Ok(())
    }
}

impl From<&str> for Delta {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}
