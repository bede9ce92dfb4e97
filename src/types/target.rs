//! Arena identifiers for graph elements.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a notion inside its owning [`Graph`](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotionId(pub(crate) usize);

/// Index of a relation inside its owning [`Graph`](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationId(pub(crate) usize);

impl NotionId {
  pub fn index(self) -> usize {
    self.0
  }
}

impl RelationId {
  pub fn index(self) -> usize {
    self.0
  }
}

impl fmt::Display for NotionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "notion#{}", self.0)
  }
}

impl fmt::Display for RelationId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "relation#{}", self.0)
  }
}

/// Any element a walker can stand on: a notion (vertex) or a relation (edge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
  Notion(NotionId),
  Relation(RelationId),
}

impl Target {
  pub fn notion(self) -> Option<NotionId> {
    match self {
      Target::Notion(id) => Some(id),
      Target::Relation(_) => None,
    }
  }

  pub fn relation(self) -> Option<RelationId> {
    match self {
      Target::Relation(id) => Some(id),
      Target::Notion(_) => None,
    }
  }
}

impl From<NotionId> for Target {
  fn from(id: NotionId) -> Self {
    Target::Notion(id)
  }
}

impl From<RelationId> for Target {
  fn from(id: RelationId) -> Self {
    Target::Relation(id)
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Target::Notion(id) => id.fmt(f),
      Target::Relation(id) => id.fmt(f),
    }
  }
}
