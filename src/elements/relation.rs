//! Relations: directed edges from a complex notion to an optional object.

use std::fmt;
use std::sync::Arc;

use super::Element;
use super::loop_relation::{self, Quantifier};
use super::scope::{ActionFn, Query, Scope, Text};
use crate::condition::Condition;
use crate::event::Event;
use crate::handler::Handler;
use crate::types::{Command, Direction, NotionId, Target};

#[derive(Clone)]
pub enum RelationKind {
  /// Passes through to the object; a failing guard replies `error`.
  Next { guard: Option<Condition<Text>> },
  /// Runs its function, then passes through.
  Action(Arc<ActionFn>),
  /// Matches the remaining text and consumes what matched.
  Parsing {
    condition: Condition<Text>,
    optional: bool,
    check_only: bool,
  },
  /// Repeats its object.
  Loop(Quantifier),
}

impl fmt::Debug for RelationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RelationKind::Next { guard } => f.debug_struct("Next").field("guard", guard).finish(),
      RelationKind::Action(_) => f.write_str("Action(..)"),
      RelationKind::Parsing {
        condition,
        optional,
        check_only,
      } => f
        .debug_struct("Parsing")
        .field("condition", condition)
        .field("optional", optional)
        .field("check_only", check_only)
        .finish(),
      RelationKind::Loop(q) => f.debug_tuple("Loop").field(q).finish(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct Relation {
  pub(crate) name: Option<String>,
  pub(crate) subject: Option<NotionId>,
  pub(crate) object: Option<NotionId>,
  pub(crate) kind: RelationKind,
  pub(crate) handler: Handler<Query>,
}

impl Relation {
  pub fn new(kind: RelationKind) -> Self {
    let handler = default_handler(&kind);
    Self {
      name: None,
      subject: None,
      object: None,
      kind,
      handler,
    }
  }

  pub fn next() -> Self {
    Self::new(RelationKind::Next { guard: None })
  }

  pub fn guarded(guard: impl Into<Condition<Text>>) -> Self {
    Self::new(RelationKind::Next {
      guard: Some(guard.into()),
    })
  }

  pub fn action(f: impl Fn(&Scope<'_>) -> Command + Send + Sync + 'static) -> Self {
    let f: Arc<ActionFn> = Arc::new(f);
    Self::new(RelationKind::Action(f))
  }

  pub fn parsing(condition: impl Into<Condition<Text>>) -> Self {
    Self::new(RelationKind::Parsing {
      condition: condition.into(),
      optional: false,
      check_only: false,
    })
  }

  pub fn repeat(quantifier: impl Into<Quantifier>) -> Self {
    Self::new(RelationKind::Loop(quantifier.into()))
  }

  pub fn named(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// A parsing relation that replies nothing instead of `error` on no match.
  pub fn optional(mut self) -> Self {
    if let RelationKind::Parsing { optional, .. } = &mut self.kind {
      *optional = true;
    }
    self
  }

  /// A parsing relation that matches without consuming.
  pub fn check_only(mut self) -> Self {
    if let RelationKind::Parsing { check_only, .. } = &mut self.kind {
      *check_only = true;
    }
    self
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  pub fn subject(&self) -> Option<NotionId> {
    self.subject
  }

  pub fn object(&self) -> Option<NotionId> {
    self.object
  }

  pub fn kind(&self) -> &RelationKind {
    &self.kind
  }

  /// How well this relation would do if taken now; `None` means it would
  /// reply `error`.
  pub fn rank(&self, scope: &Scope<'_>) -> Option<usize> {
    match &self.kind {
      RelationKind::Parsing {
        condition,
        optional,
        ..
      } => match condition.check(scope.text, scope) {
        Some(m) => Some(m.rank),
        None if *optional => Some(0),
        None => None,
      },
      RelationKind::Next { guard: Some(guard) } => guard.check(scope.text, scope).map(|m| m.rank),
      _ => Some(0),
    }
  }

  pub(crate) fn object_command(&self) -> Command {
    self
      .object
      .map(|o| Command::Target(Target::Notion(o)))
      .unwrap_or(Command::Nothing)
  }
}

impl Element for Relation {
  fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  fn handler(&self) -> &Handler<Query> {
    &self.handler
  }

  fn handler_mut(&mut self) -> &mut Handler<Query> {
    &mut self.handler
  }
}

fn default_handler(kind: &RelationKind) -> Handler<Query> {
  let mut handler = Handler::new();
  match kind {
    RelationKind::Loop(_) => loop_relation::register(&mut handler),
    _ => {
      handler.on(Direction::Next, Event::<Query>::named("next", pass));
    }
  }
  handler
}

fn pass(_: &Direction, scope: &mut Scope<'_>) -> Command {
  let scope: &Scope<'_> = scope;
  let graph = scope.graph;
  let Some(relation) = scope.this.relation().and_then(|id| graph.relation(id)) else {
    return Command::Nothing;
  };
  match &relation.kind {
    RelationKind::Next { guard } => {
      if guard
        .as_ref()
        .is_some_and(|g| g.check(scope.text, scope).is_none())
      {
        return Command::error();
      }
      relation.object_command()
    }
    RelationKind::Action(f) => Command::Sequence(vec![f(scope), relation.object_command()]),
    RelationKind::Parsing {
      condition,
      optional,
      check_only,
    } => match condition.check(scope.text, scope) {
      Some(m) => {
        let proceed = if *check_only {
          Command::Nothing
        } else {
          Command::Proceed(m.rank)
        };
        Command::Sequence(vec![proceed, relation.object_command()])
      }
      None if *optional => Command::Nothing,
      None => Command::error(),
    },
    RelationKind::Loop(_) => Command::Nothing,
  }
}
