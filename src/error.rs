//! Errors raised while building graphs.
//!
//! Traversal failures are not errors: a stuck or failed walk is reported
//! through [`Outcome`](crate::Outcome).

use thiserror::Error;

use crate::types::{NotionId, RelationId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("unknown notion {0}")]
  UnknownNotion(NotionId),
  #[error("unknown relation {0}")]
  UnknownRelation(RelationId),
  #[error("notion `{0}` cannot own relations")]
  NotComplex(String),
  #[error("notion `{0}` is not selective")]
  NotSelective(String),
  #[error("default relation {relation} of `{notion}` has a different subject")]
  ForeignDefault { notion: String, relation: RelationId },
  #[error("graph `{0}` has no root notion")]
  MissingRoot(String),
}
