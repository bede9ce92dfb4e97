//! Ranked alternation with rollback.
//!
//! A selective notion ranks its relations against the current scope and takes
//! the best one. When several tie, it opens a change group, remembers the
//! untried candidates as its private state and revisits itself after the
//! attempt: forward means commit, `error` means roll back and try the next.

use serde_json::Value;
use tracing::debug;

use super::scope::{Query, Scope};
use crate::event::Event;
use crate::handler::Handler;
use crate::types::{Command, Direction, RelationId, Target};

pub(crate) fn register(handler: &mut Handler<Query>) {
  handler
    .on(Direction::Next, Event::<Query>::named("next", on_next))
    .on(Direction::Error, Event::<Query>::named("error", on_error))
    .on(Direction::Break, Event::<Query>::named("break", commit))
    .on(Direction::Continue, Event::<Query>::named("continue", commit));
}

fn encode(candidates: &[RelationId]) -> Value {
  Value::Array(candidates.iter().map(|r| Value::from(r.index())).collect())
}

fn decode(state: &Value) -> Vec<RelationId> {
  state
    .as_array()
    .map(|ids| {
      ids
        .iter()
        .filter_map(Value::as_u64)
        .filter_map(|n| usize::try_from(n).ok())
        .map(RelationId)
        .collect()
    })
    .unwrap_or_default()
}

/// Relations tied at the best rank, in registration order.
pub fn candidates(scope: &Scope<'_>) -> Vec<RelationId> {
  let graph = scope.graph;
  let Some(notion) = scope.this.notion().and_then(|id| graph.notion(id)) else {
    return Vec::new();
  };
  let default = notion.default_relation();
  let mut best: Option<usize> = None;
  let mut tied = Vec::new();
  for &id in notion.relations() {
    if Some(id) == default {
      continue;
    }
    let Some(rank) = graph.relation(id).and_then(|r| r.rank(&scope.focus(id))) else {
      continue;
    };
    match best {
      Some(b) if rank < b => {}
      Some(b) if rank == b => tied.push(id),
      _ => {
        best = Some(rank);
        tied = vec![id];
      }
    }
  }
  tied
}

fn on_next(_: &Direction, scope: &mut Scope<'_>) -> Command {
  let scope: &Scope<'_> = scope;
  if scope.state().is_some() {
    return Command::Sequence(vec![Command::ForgetContext, Command::ClearState]);
  }
  let tied = candidates(scope);
  match tied.as_slice() {
    [] => {
      let default = scope
        .this
        .notion()
        .and_then(|id| scope.graph.notion(id))
        .and_then(|n| n.default_relation());
      match default {
        Some(d) => Command::Target(Target::Relation(d)),
        None => Command::error(),
      }
    }
    [only] => Command::Target(Target::Relation(*only)),
    [first, rest @ ..] => {
      debug!(notion = %scope.this, candidates = tied.len(), "selective trial");
      Command::Sequence(vec![
        Command::PushContext,
        Command::SetState(encode(rest)),
        Command::Target(Target::Relation(*first)),
        Command::Target(scope.this),
      ])
    }
  }
}

fn on_error(_: &Direction, scope: &mut Scope<'_>) -> Command {
  let Some(state) = scope.state() else {
    return Command::Nothing;
  };
  match decode(state).split_first() {
    Some((next, rest)) => {
      debug!(notion = %scope.this, next = %next, left = rest.len(), "selective retry");
      Command::Sequence(vec![
        Command::PopContext,
        Command::PushContext,
        Command::SetState(encode(rest)),
        Command::Direction(Direction::Next),
        Command::Target(Target::Relation(*next)),
        Command::Target(scope.this),
      ])
    }
    None => Command::Sequence(vec![
      Command::PopContext,
      Command::ClearState,
      Command::Direction(Direction::Error),
    ]),
  }
}

fn commit(_: &Direction, scope: &mut Scope<'_>) -> Command {
  if scope.state().is_none() {
    return Command::Nothing;
  }
  Command::Sequence(vec![Command::ForgetContext, Command::ClearState])
}
