//! The walker: frames, context, private states and the text cursor.
//!
//! A [`Walker`] holds everything a walk mutates. Its primitives are what the
//! process events call; each returns the [`Command`] the event replies with.
//! While a change group is open every context, state and cursor write records
//! its prior value in the [`Journal`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;
use tracing::{instrument, trace, warn};
use uuid::Uuid;

use crate::condition::{Matched, Subject};
use crate::config::ProcessConfig;
use crate::elements::Scope;
use crate::error::GraphError;
use crate::event::{Event, Protocol};
use crate::graph::Graph;
use crate::journal::{Change, Journal};
use crate::types::{Checkpoint, Command, Context, Direction, Frame, Target};

pub type WalkCheckFn = dyn Fn(&Command, &Walker) -> Option<Matched> + Send + Sync;
pub type WalkFn = dyn Fn(&Command, &mut Walker) -> Command + Send + Sync;
pub type WalkPreFn = dyn Fn(&Command, &Walker) -> Option<Command> + Send + Sync;
pub type WalkPostFn = dyn Fn(&Command, &Walker, Command) -> Command + Send + Sync;

/// Process events: dispatched on the kind of the next message item.
#[derive(Debug)]
pub struct Walk;

impl Subject for Walk {
  type Head = Command;
  type Args<'a> = Walker;
  type Check = WalkCheckFn;

  fn check(f: &WalkCheckFn, head: &Command, args: &Walker) -> Option<Matched> {
    f(head, args)
  }
}

impl Protocol for Walk {
  type Call = WalkFn;
  type Pre = WalkPreFn;
  type Post = WalkPostFn;

  fn call(f: &WalkFn, head: &Command, args: &mut Walker) -> Command {
    f(head, args)
  }

  fn pre(f: &WalkPreFn, head: &Command, args: &Walker) -> Option<Command> {
    f(head, args)
  }

  fn post(f: &WalkPostFn, head: &Command, args: &Walker, reply: Command) -> Command {
    f(head, args, reply)
  }
}

impl Event<Walk> {
  pub fn named(
    name: impl Into<String>,
    f: impl Fn(&Command, &mut Walker) -> Command + Send + Sync + 'static,
  ) -> Self {
    let call: Arc<WalkFn> = Arc::new(f);
    Event::from_call(Some(name.into()), call)
  }

  pub fn set_pre(&mut self, f: impl Fn(&Command, &Walker) -> Option<Command> + Send + Sync + 'static) {
    let pre: Arc<WalkPreFn> = Arc::new(f);
    self.set_pre_hook(Some(pre));
  }

  pub fn set_post(
    &mut self,
    f: impl Fn(&Command, &Walker, Command) -> Command + Send + Sync + 'static,
  ) {
    let post: Arc<WalkPostFn> = Arc::new(f);
    self.set_post_hook(Some(post));
  }
}

pub struct Walker {
  id: Uuid,
  graph: Arc<Graph>,
  config: ProcessConfig,
  frames: Vec<Frame>,
  context: Context,
  states: HashMap<Target, Value>,
  journal: Journal,
  direction: Direction,
  text: String,
  offset: usize,
  parsed_length: usize,
  last_parsed: String,
  last: Option<Target>,
  steps: usize,
}

impl Walker {
  pub fn new(graph: Arc<Graph>, config: ProcessConfig) -> Self {
    Self {
      id: Uuid::new_v4(),
      graph,
      config,
      frames: Vec::new(),
      context: Context::new(),
      states: HashMap::new(),
      journal: Journal::new(),
      direction: Direction::Next,
      text: String::new(),
      offset: 0,
      parsed_length: 0,
      last_parsed: String::new(),
      last: None,
      steps: 0,
    }
  }

  /// Starts over at `target`: frames, states and change groups are dropped.
  pub(crate) fn reset(&mut self, target: Target, context: Context, text: String) {
    self.frames = vec![Frame::entering(target)];
    self.context = context;
    self.states.clear();
    self.journal = Journal::new();
    self.direction = Direction::Next;
    self.text = text;
    self.offset = 0;
    self.parsed_length = 0;
    self.last_parsed.clear();
    self.last = None;
    self.steps = 0;
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn graph(&self) -> &Arc<Graph> {
    &self.graph
  }

  pub fn config(&self) -> &ProcessConfig {
    &self.config
  }

  pub fn frames(&self) -> &[Frame] {
    &self.frames
  }

  /// Element of the active frame.
  pub fn current(&self) -> Option<Target> {
    self.frames.last().and_then(|f| f.current)
  }

  pub fn direction(&self) -> Direction {
    self.direction
  }

  pub fn context(&self) -> &Context {
    &self.context
  }

  pub fn state(&self, target: Target) -> Option<&Value> {
    self.states.get(&target)
  }

  pub fn journal(&self) -> &Journal {
    &self.journal
  }

  /// Unparsed remainder of the text.
  pub fn text(&self) -> &str {
    self.text.get(self.offset..).unwrap_or_default()
  }

  pub fn parsed_length(&self) -> usize {
    self.parsed_length
  }

  pub fn last_parsed(&self) -> &str {
    &self.last_parsed
  }

  /// Last element entered going forward (revisits of stateful elements excluded).
  pub fn last(&self) -> Option<Target> {
    self.last
  }

  pub fn steps(&self) -> usize {
    self.steps
  }

  pub(crate) fn tick(&mut self) {
    self.steps += 1;
  }

  /// Next item of the active frame; exhausted frames above the root are popped.
  pub fn take_head(&mut self) -> Option<Command> {
    loop {
      let top = self.frames.last_mut()?;
      if let Some(head) = top.message.pop_front() {
        return Some(head);
      }
      if self.frames.len() > 1 {
        self.frames.pop();
      } else {
        return None;
      }
    }
  }

  /// Puts `reply` in front of the active frame's message.
  pub fn enqueue(&mut self, reply: Command) {
    if self.frames.is_empty() {
      self.frames.push(Frame::default());
    }
    let Some(top) = self.frames.last_mut() else {
      return;
    };
    for item in reply.flatten().into_iter().rev() {
      top.message.push_front(item);
    }
  }

  /// Asks the current element to react to the walk direction.
  #[instrument(level = "trace", skip(self), fields(current = ?self.current(), direction = %self.direction))]
  pub fn query(&mut self) -> Command {
    let Some(current) = self.current() else {
      warn!("query without a current element");
      return Command::Nothing;
    };
    let graph = Arc::clone(&self.graph);
    let Some(element) = graph.element(current) else {
      warn!(%current, "query of an element the graph does not know");
      return Command::Flag(false);
    };
    if self.direction.is_forward() && !self.states.contains_key(&current) {
      self.last = Some(current);
    }
    let mut scope = Scope {
      graph: &graph,
      this: current,
      context: &self.context,
      states: &self.states,
      text: self.text(),
      parsed_length: self.parsed_length,
      last_parsed: &self.last_parsed,
      direction: self.direction,
    };
    match element.handler().handle(&self.direction, &mut scope) {
      Some(handled) if handled.reply != Command::Flag(false) => handled.reply,
      _ => Command::Nothing,
    }
  }

  /// Enters `target`. An exhausted active frame is replaced instead of kept.
  #[instrument(level = "trace", skip(self))]
  pub fn push_frame(&mut self, target: Target) -> Command {
    if !self.graph.contains(target) {
      warn!(%target, "cannot enter an element the graph does not know");
      return Command::Flag(false);
    }
    match self.frames.last_mut() {
      Some(top) if top.is_empty() => *top = Frame::entering(target),
      _ => self.frames.push(Frame::entering(target)),
    }
    Command::Nothing
  }

  /// Drops the next queued item of the active frame.
  pub fn skip(&mut self) -> Command {
    if let Some(skipped) = self.frames.last_mut().and_then(|f| f.message.pop_front()) {
      trace!(skipped = skipped.kind(), "skip");
    }
    Command::Nothing
  }

  /// Changes direction; backward directions discard the rest of the active frame.
  pub fn turn(&mut self, direction: Direction) -> Command {
    self.direction = direction;
    if self.config.is_backward(direction) {
      if let Some(top) = self.frames.last_mut() {
        top.message.clear();
      }
    }
    Command::Nothing
  }

  fn write_context(&mut self, key: &str, value: Option<Value>) {
    if !self.journal.is_empty() {
      self.journal.record(Change::Context {
        key: key.to_string(),
        prior: self.context.get(key).cloned(),
      });
    }
    match value {
      Some(v) => self.context.insert(key.to_string(), v),
      None => self.context.remove(key),
    };
  }

  fn write_state(&mut self, target: Target, value: Option<Value>) {
    if !self.journal.is_empty() {
      self.journal.record(Change::State {
        target,
        prior: self.states.get(&target).cloned(),
      });
    }
    match value {
      Some(v) => self.states.insert(target, v),
      None => self.states.remove(&target),
    };
  }

  /// Inserts the keys that are not in the context yet.
  pub fn add_context(&mut self, entries: &BTreeMap<String, Value>) -> Command {
    for (key, value) in entries {
      if !self.context.contains_key(key) {
        self.write_context(key, Some(value.clone()));
      }
    }
    Command::Nothing
  }

  pub fn update_context(&mut self, entries: &BTreeMap<String, Value>) -> Command {
    for (key, value) in entries {
      self.write_context(key, Some(value.clone()));
    }
    Command::Nothing
  }

  pub fn delete_context(&mut self, keys: &[String]) -> Command {
    for key in keys {
      if self.context.contains_key(key) {
        self.write_context(key, None);
      }
    }
    Command::Nothing
  }

  pub fn push_context(&mut self) -> Command {
    self.journal.push();
    trace!(depth = self.journal.depth(), "push_context");
    Command::Nothing
  }

  /// Rolls back the innermost change group.
  pub fn pop_context(&mut self) -> Command {
    let Some(changes) = self.journal.pop() else {
      warn!("pop_context without an open change group");
      return Command::Nothing;
    };
    trace!(depth = self.journal.depth(), undone = changes.len(), "pop_context");
    for change in changes {
      match change {
        Change::Context { key, prior } => match prior {
          Some(v) => {
            self.context.insert(key, v);
          }
          None => {
            self.context.remove(&key);
          }
        },
        Change::State { target, prior } => match prior {
          Some(v) => {
            self.states.insert(target, v);
          }
          None => {
            self.states.remove(&target);
          }
        },
        Change::Cursor {
          offset,
          parsed_length,
          last_parsed,
        } => {
          self.offset = offset;
          self.parsed_length = parsed_length;
          self.last_parsed = last_parsed;
        }
      }
    }
    Command::Nothing
  }

  /// Keeps the innermost change group's effects.
  pub fn forget_context(&mut self) -> Command {
    if !self.journal.forget() {
      warn!("forget_context without an open change group");
    }
    Command::Nothing
  }

  pub fn set_state(&mut self, value: Value) -> Command {
    match self.current() {
      Some(target) => self.write_state(target, Some(value)),
      None => warn!("set_state without a current element"),
    }
    Command::Nothing
  }

  pub fn clear_state(&mut self) -> Command {
    match self.current() {
      Some(target) if self.states.contains_key(&target) => self.write_state(target, None),
      Some(_) => {}
      None => warn!("clear_state without a current element"),
    }
    Command::Nothing
  }

  /// Consumes `n` characters of the remaining text.
  pub fn proceed(&mut self, n: usize) -> Command {
    let rest = self.text();
    let end = rest.char_indices().nth(n).map_or(rest.len(), |(i, _)| i);
    let taken = rest[..end].to_string();
    if !self.journal.is_empty() {
      self.journal.record(Change::Cursor {
        offset: self.offset,
        parsed_length: self.parsed_length,
        last_parsed: self.last_parsed.clone(),
      });
    }
    self.offset += end;
    self.parsed_length += taken.chars().count();
    self.last_parsed = taken;
    Command::Nothing
  }

  pub(crate) fn checkpoint(&self) -> Checkpoint {
    let mut states: Vec<(Target, Value)> = self
      .states
      .iter()
      .map(|(t, v)| (*t, v.clone()))
      .collect();
    states.sort_by_key(|(t, _)| *t);
    Checkpoint {
      saved_at: chrono::Utc::now(),
      frames: self.frames.clone(),
      context: self.context.clone(),
      states,
      journal: self.journal.clone(),
      direction: self.direction,
      text: self.text.clone(),
      offset: self.offset,
      parsed_length: self.parsed_length,
      last_parsed: self.last_parsed.clone(),
    }
  }

  /// Rebuilds a paused walker; every element the checkpoint mentions must
  /// exist in `graph`.
  pub(crate) fn restore(
    graph: Arc<Graph>,
    config: ProcessConfig,
    checkpoint: Checkpoint,
  ) -> Result<Self, GraphError> {
    let mentioned = checkpoint
      .frames
      .iter()
      .flat_map(|f| {
        f.current.into_iter().chain(f.message.iter().filter_map(|c| match c {
          Command::Target(t) => Some(*t),
          _ => None,
        }))
      })
      .chain(checkpoint.states.iter().map(|(t, _)| *t));
    for target in mentioned {
      if !graph.contains(target) {
        return Err(match target {
          Target::Notion(id) => GraphError::UnknownNotion(id),
          Target::Relation(id) => GraphError::UnknownRelation(id),
        });
      }
    }
    let mut walker = Walker::new(graph, config);
    walker.frames = checkpoint.frames;
    walker.context = checkpoint.context;
    walker.states = checkpoint.states.into_iter().collect();
    walker.journal = checkpoint.journal;
    walker.direction = checkpoint.direction;
    walker.text = checkpoint.text;
    walker.offset = checkpoint.offset;
    walker.parsed_length = checkpoint.parsed_length;
    walker.last_parsed = checkpoint.last_parsed;
    Ok(walker)
  }
}
