//! Notions: the vertices of a graph.

use std::fmt;
use std::sync::Arc;

use super::Element;
use super::scope::{ActionFn, Query, Scope};
use super::selective;
use crate::event::Event;
use crate::handler::Handler;
use crate::types::{Command, Direction, RelationId, Target};

#[derive(Clone)]
pub enum NotionKind {
  /// Name only; replies nothing.
  Plain,
  /// Runs its function when entered going forward.
  Action(Arc<ActionFn>),
  /// Owns relations and walks them in order.
  Complex,
  /// Owns relations and takes exactly one of them, retrying on error.
  Selective { default: Option<RelationId> },
}

impl fmt::Debug for NotionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NotionKind::Plain => f.write_str("Plain"),
      NotionKind::Action(_) => f.write_str("Action(..)"),
      NotionKind::Complex => f.write_str("Complex"),
      NotionKind::Selective { default } => f
        .debug_struct("Selective")
        .field("default", default)
        .finish(),
    }
  }
}

/// A named vertex.
///
/// Complex and selective notions keep the ids of the relations they are the
/// subject of; the owning [`Graph`](crate::Graph) keeps that list in sync.
#[derive(Debug, Clone)]
pub struct Notion {
  pub(crate) name: String,
  pub(crate) kind: NotionKind,
  pub(crate) relations: Vec<RelationId>,
  pub(crate) handler: Handler<Query>,
}

impl Notion {
  pub fn new(name: impl Into<String>, kind: NotionKind) -> Self {
    let handler = default_handler(&kind);
    Self {
      name: name.into(),
      kind,
      relations: Vec::new(),
      handler,
    }
  }

  pub fn plain(name: impl Into<String>) -> Self {
    Self::new(name, NotionKind::Plain)
  }

  pub fn action(
    name: impl Into<String>,
    f: impl Fn(&Scope<'_>) -> Command + Send + Sync + 'static,
  ) -> Self {
    let f: Arc<ActionFn> = Arc::new(f);
    Self::new(name, NotionKind::Action(f))
  }

  pub fn complex(name: impl Into<String>) -> Self {
    Self::new(name, NotionKind::Complex)
  }

  pub fn selective(name: impl Into<String>) -> Self {
    Self::new(name, NotionKind::Selective { default: None })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn kind(&self) -> &NotionKind {
    &self.kind
  }

  /// Relations this notion is the subject of, in walk order.
  pub fn relations(&self) -> &[RelationId] {
    &self.relations
  }

  /// Whether the notion may be the subject of relations.
  pub fn is_complex(&self) -> bool {
    matches!(self.kind, NotionKind::Complex | NotionKind::Selective { .. })
  }

  pub fn is_selective(&self) -> bool {
    matches!(self.kind, NotionKind::Selective { .. })
  }

  /// Fallback relation of a selective notion.
  pub fn default_relation(&self) -> Option<RelationId> {
    match self.kind {
      NotionKind::Selective { default } => default,
      _ => None,
    }
  }
}

impl Element for Notion {
  fn name(&self) -> Option<&str> {
    Some(&self.name)
  }

  fn handler(&self) -> &Handler<Query> {
    &self.handler
  }

  fn handler_mut(&mut self) -> &mut Handler<Query> {
    &mut self.handler
  }
}

fn default_handler(kind: &NotionKind) -> Handler<Query> {
  let mut handler = Handler::new();
  match kind {
    NotionKind::Plain => {}
    NotionKind::Action(_) => {
      handler.on(Direction::Next, Event::<Query>::named("next", run_action));
    }
    NotionKind::Complex => {
      handler.on(Direction::Next, Event::<Query>::named("next", walk_relations));
    }
    NotionKind::Selective { .. } => selective::register(&mut handler),
  }
  handler
}

fn run_action(_: &Direction, scope: &mut Scope<'_>) -> Command {
  let scope: &Scope<'_> = scope;
  let graph = scope.graph;
  match scope.this.notion().and_then(|id| graph.notion(id)) {
    Some(Notion {
      kind: NotionKind::Action(f),
      ..
    }) => f(scope),
    _ => Command::Nothing,
  }
}

fn walk_relations(_: &Direction, scope: &mut Scope<'_>) -> Command {
  let Some(id) = scope.this.notion() else {
    return Command::Nothing;
  };
  Command::Sequence(
    scope
      .graph
      .relations_of(id)
      .iter()
      .map(|&r| Command::Target(Target::Relation(r)))
      .collect(),
  )
}
