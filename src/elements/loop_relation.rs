//! Quantified repetition.
//!
//! A loop relation stores the number of the iteration in progress as its
//! private state. Flexible loops open a change group before each iteration
//! so a failing iteration can be rolled back to the last successful count.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::relation::RelationKind;
use super::scope::{Query, Scope};
use crate::event::Event;
use crate::handler::Handler;
use crate::types::{Command, Direction, Target};

pub type CustomFn = dyn Fn(Option<&Value>, &Scope<'_>) -> Value + Send + Sync;

/// One end of a loop's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Limit {
  Finite(usize),
  Infinite,
}

/// Iteration bounds, `lower <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
  pub lower: Limit,
  pub upper: Limit,
}

#[derive(Clone)]
pub enum Quantifier {
  /// Exactly `n` iterations.
  Exact(usize),
  /// Between `m` (default 0) and `n` (default unbounded) iterations.
  Range(Option<usize>, Option<usize>),
  Star,
  Plus,
  Optional,
  /// Repeats until a `break`.
  Forever,
  /// Repeats while the function returns a truthy value; the value becomes
  /// the loop's state.
  Custom(Arc<CustomFn>),
}

impl fmt::Debug for Quantifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Quantifier::Exact(n) => f.debug_tuple("Exact").field(n).finish(),
      Quantifier::Range(m, n) => f.debug_tuple("Range").field(m).field(n).finish(),
      Quantifier::Star => f.write_str("Star"),
      Quantifier::Plus => f.write_str("Plus"),
      Quantifier::Optional => f.write_str("Optional"),
      Quantifier::Forever => f.write_str("Forever"),
      Quantifier::Custom(_) => f.write_str("Custom(..)"),
    }
  }
}

impl Quantifier {
  pub fn custom(f: impl Fn(Option<&Value>, &Scope<'_>) -> Value + Send + Sync + 'static) -> Self {
    let f: Arc<CustomFn> = Arc::new(f);
    Quantifier::Custom(f)
  }

  /// Fixed bounds; `None` for custom loops.
  pub fn bounds(&self) -> Option<Bounds> {
    use Limit::{Finite, Infinite};
    let (lower, upper) = match *self {
      Quantifier::Exact(n) => (Finite(n.min(1)), Finite(n)),
      Quantifier::Range(m, n) => {
        let lower = m.unwrap_or(0);
        match n {
          Some(n) if n < lower => (Finite(n), Finite(lower)),
          Some(n) => (Finite(lower), Finite(n)),
          None => (Finite(lower), Infinite),
        }
      }
      Quantifier::Star => (Finite(0), Infinite),
      Quantifier::Plus => (Finite(1), Infinite),
      Quantifier::Optional => (Finite(0), Finite(1)),
      Quantifier::Forever => (Infinite, Infinite),
      Quantifier::Custom(_) => return None,
    };
    Some(Bounds { lower, upper })
  }

  /// Whether iterations are snapshotted so a failing one can be rolled back.
  pub fn is_flexible(&self) -> bool {
    !matches!(self, Quantifier::Exact(_) | Quantifier::Custom(_))
  }
}

impl From<usize> for Quantifier {
  fn from(n: usize) -> Self {
    Quantifier::Exact(n)
  }
}

impl From<(usize, usize)> for Quantifier {
  fn from((m, n): (usize, usize)) -> Self {
    Quantifier::Range(Some(m), Some(n))
  }
}

impl From<bool> for Quantifier {
  fn from(forever: bool) -> Self {
    if forever {
      Quantifier::Forever
    } else {
      Quantifier::Exact(0)
    }
  }
}

/// JavaScript-style truthiness of a custom loop's return value.
pub fn truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
    Value::String(s) => !s.is_empty(),
    Value::Array(a) => !a.is_empty(),
    Value::Object(o) => !o.is_empty(),
  }
}

pub(crate) fn register(handler: &mut Handler<Query>) {
  handler
    .on(Direction::Next, Event::<Query>::named("next", on_next))
    .on(Direction::Error, Event::<Query>::named("error", on_error))
    .on(Direction::Break, Event::<Query>::named("break", on_break))
    .on(Direction::Continue, Event::<Query>::named("continue", on_continue));
}

struct Looping<'s> {
  this: Target,
  object: Command,
  quantifier: &'s Quantifier,
}

fn looping<'s>(scope: &Scope<'s>) -> Option<Looping<'s>> {
  let graph = scope.graph;
  let relation = graph.relation(scope.this.relation()?)?;
  match &relation.kind {
    RelationKind::Loop(quantifier) => Some(Looping {
      this: scope.this,
      object: relation.object_command(),
      quantifier,
    }),
    _ => None,
  }
}

fn iteration(state: &Value) -> usize {
  state
    .as_u64()
    .and_then(|n| usize::try_from(n).ok())
    .unwrap_or(0)
}

/// Runs iteration `k` (1-based) of a bounded loop.
fn iterate(l: &Looping<'_>, k: usize, first: bool) -> Command {
  let flexible = l.quantifier.is_flexible();
  let mut out = Vec::with_capacity(5);
  if flexible {
    if !first {
      out.push(Command::ForgetContext);
    }
    out.push(Command::PushContext);
  }
  out.push(Command::SetState(Value::from(k)));
  out.push(l.object.clone());
  out.push(Command::Target(l.this));
  Command::Sequence(out)
}

/// Forward revisit after iteration `k` succeeded.
fn advance(l: &Looping<'_>, scope: &Scope<'_>) -> Command {
  let state = scope.state();
  if let Quantifier::Custom(f) = l.quantifier {
    let value = f(state, scope);
    return if truthy(&value) {
      Command::Sequence(vec![
        Command::SetState(value),
        l.object.clone(),
        Command::Target(l.this),
      ])
    } else if state.is_some() {
      Command::ClearState
    } else {
      Command::Nothing
    };
  }
  let Some(bounds) = l.quantifier.bounds() else {
    return Command::Nothing;
  };
  let flexible = l.quantifier.is_flexible();
  match state.map(iteration) {
    None if bounds.upper == Limit::Finite(0) => Command::Nothing,
    None => iterate(l, 1, true),
    Some(k) if Limit::Finite(k) < bounds.upper => iterate(l, k + 1, false),
    Some(_) => {
      let mut out = Vec::with_capacity(2);
      if flexible {
        out.push(Command::ForgetContext);
      }
      out.push(Command::ClearState);
      Command::Sequence(out)
    }
  }
}

fn on_next(_: &Direction, scope: &mut Scope<'_>) -> Command {
  let scope: &Scope<'_> = scope;
  match looping(scope) {
    Some(l) => advance(&l, scope),
    None => Command::Nothing,
  }
}

fn on_error(_: &Direction, scope: &mut Scope<'_>) -> Command {
  let scope: &Scope<'_> = scope;
  let (Some(l), Some(state)) = (looping(scope), scope.state()) else {
    return Command::Nothing;
  };
  let Some(bounds) = l.quantifier.bounds() else {
    return Command::ClearState;
  };
  let k = iteration(state);
  let flexible = l.quantifier.is_flexible();
  if flexible && Limit::Finite(k) > bounds.lower && Limit::Finite(k) <= bounds.upper {
    debug!(relation = %l.this, failed = k, kept = k - 1, "loop rolls back last iteration");
    return Command::Sequence(vec![
      Command::PopContext,
      Command::ClearState,
      Command::Direction(Direction::Next),
    ]);
  }
  debug!(relation = %l.this, failed = k, "loop fails");
  let mut out = Vec::with_capacity(3);
  if flexible {
    out.push(Command::PopContext);
  }
  out.push(Command::ClearState);
  out.push(Command::Direction(Direction::Error));
  Command::Sequence(out)
}

fn on_break(_: &Direction, scope: &mut Scope<'_>) -> Command {
  let scope: &Scope<'_> = scope;
  let (Some(l), Some(_)) = (looping(scope), scope.state()) else {
    return Command::Nothing;
  };
  let mut out = Vec::with_capacity(3);
  if l.quantifier.is_flexible() {
    out.push(Command::ForgetContext);
  }
  out.push(Command::ClearState);
  out.push(Command::Direction(Direction::Next));
  Command::Sequence(out)
}

fn on_continue(_: &Direction, scope: &mut Scope<'_>) -> Command {
  let scope: &Scope<'_> = scope;
  let (Some(l), Some(_)) = (looping(scope), scope.state()) else {
    return Command::Nothing;
  };
  Command::Sequence(vec![
    Command::Direction(Direction::Next),
    advance(&l, scope),
  ])
}
