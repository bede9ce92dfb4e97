//! Engine commands: the only shape a reply or a queued message item can take.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Direction, Target};

/// One item of a pending message, or one reply from an element or a process event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
  /// Ends the walk successfully.
  Ok,
  /// Ends the walk; the frames stay in place so the walk can be resumed.
  Stop,
  /// `true` ends the current dispatch step, `false` marks a stuck traversal.
  Flag(bool),
  /// No effect.
  Nothing,
  /// Ask the current element to react to the walk direction.
  Query,
  /// Drop the next queued item.
  Skip,
  /// Enter an element.
  Target(Target),
  /// Change the walk direction.
  Direction(Direction),
  /// Insert keys that are not in the context yet.
  AddContext(BTreeMap<String, Value>),
  /// Insert or overwrite keys.
  UpdateContext(BTreeMap<String, Value>),
  /// Remove keys.
  DeleteContext(Vec<String>),
  PushContext,
  PopContext,
  ForgetContext,
  /// Set the private state of the current element.
  SetState(Value),
  /// Remove the private state of the current element.
  ClearState,
  /// Consume this many characters of the remaining text.
  Proceed(usize),
  /// Client payload; only understood by handlers the client registers.
  Value(Value),
  Sequence(Vec<Command>),
}

impl Command {
  /// Name a process handler dispatches this command by.
  pub fn kind(&self) -> &'static str {
    match self {
      Command::Ok => "ok",
      Command::Stop => "stop",
      Command::Flag(true) => "true",
      Command::Flag(false) => "false",
      Command::Nothing => "nothing",
      Command::Query => "query",
      Command::Skip => "skip",
      Command::Target(_) => "element",
      Command::Direction(d) => d.as_str(),
      Command::AddContext(_) => "add_context",
      Command::UpdateContext(_) => "update_context",
      Command::DeleteContext(_) => "delete_context",
      Command::PushContext => "push_context",
      Command::PopContext => "pop_context",
      Command::ForgetContext => "forget_context",
      Command::SetState(_) => "set_state",
      Command::ClearState => "clear_state",
      Command::Proceed(_) => "proceed",
      Command::Value(_) => "value",
      Command::Sequence(_) => "sequence",
    }
  }

  pub fn error() -> Self {
    Command::Direction(Direction::Error)
  }

  /// Single-key `UpdateContext`.
  pub fn update(key: impl Into<String>, value: impl Into<Value>) -> Self {
    Command::UpdateContext(BTreeMap::from([(key.into(), value.into())]))
  }

  /// Single-key `AddContext`.
  pub fn add(key: impl Into<String>, value: impl Into<Value>) -> Self {
    Command::AddContext(BTreeMap::from([(key.into(), value.into())]))
  }

  pub fn delete<I, K>(keys: I) -> Self
  where
    I: IntoIterator<Item = K>,
    K: Into<String>,
  {
    Command::DeleteContext(keys.into_iter().map(Into::into).collect())
  }

  /// Walk terminators: `ok`, `stop` and the stuck sentinel `false`.
  pub fn is_terminal(&self) -> bool {
    matches!(self, Command::Ok | Command::Stop | Command::Flag(false))
  }

  /// Replies that are dropped instead of being queued.
  pub fn is_pass(&self) -> bool {
    matches!(self, Command::Nothing | Command::Flag(true))
  }

  /// Flattens nested sequences and drops `Nothing` items.
  pub fn flatten(self) -> Vec<Command> {
    let mut out = Vec::new();
    self.flatten_into(&mut out);
    out
  }

  fn flatten_into(self, out: &mut Vec<Command>) {
    match self {
      Command::Sequence(items) => {
        for item in items {
          item.flatten_into(out);
        }
      }
      Command::Nothing => {}
      other => out.push(other),
    }
  }
}

impl From<Target> for Command {
  fn from(target: Target) -> Self {
    Command::Target(target)
  }
}

impl From<Direction> for Command {
  fn from(direction: Direction) -> Self {
    Command::Direction(direction)
  }
}

impl From<Vec<Command>> for Command {
  fn from(items: Vec<Command>) -> Self {
    Command::Sequence(items)
  }
}
