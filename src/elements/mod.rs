//! Graph elements: notions (vertices) and relations (edges).
//!
//! Every element owns a [`Handler`] keyed by walk direction. The walker
//! queries the current element with its direction and a [`Scope`]; the reply
//! is a [`Command`](crate::Command) it then interprets.

mod loop_relation;
#[cfg(test)]
mod loop_relation_test;
mod notion;
mod relation;
mod scope;
mod selective;

use crate::handler::Handler;

pub use loop_relation::{Bounds, CustomFn, Limit, Quantifier, truthy};
pub use notion::{Notion, NotionKind};
pub use relation::{Relation, RelationKind};
pub use scope::{
  ActionFn, GuardFn, Query, QueryCheckFn, QueryFn, QueryPostFn, QueryPreFn, Scope, Text, guard,
};
pub use selective::candidates;

/// Anything the walker can stand on.
pub trait Element {
  fn name(&self) -> Option<&str>;
  fn handler(&self) -> &Handler<Query>;
  fn handler_mut(&mut self) -> &mut Handler<Query>;
}
