//! Undo journal behind `push_context` / `pop_context` / `forget_context`.
//!
//! Each pushed group remembers the value every touched slot had *before* the
//! first write after the push. Popping hands those priors back so the walker
//! can restore them; forgetting folds them into the enclosing group so an
//! outer pop still rolls them back.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Target;

/// A piece of walk state the journal can restore.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
  Context(String),
  State(Target),
  Cursor,
}

/// Prior value of one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
  Context {
    key: String,
    prior: Option<Value>,
  },
  State {
    target: Target,
    prior: Option<Value>,
  },
  Cursor {
    offset: usize,
    parsed_length: usize,
    last_parsed: String,
  },
}

impl Change {
  pub fn slot(&self) -> Slot {
    match self {
      Change::Context { key, .. } => Slot::Context(key.clone()),
      Change::State { target, .. } => Slot::State(*target),
      Change::Cursor { .. } => Slot::Cursor,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Group {
  changes: Vec<Change>,
  slots: HashSet<Slot>,
}

impl Group {
  fn record(&mut self, change: Change) {
    if self.slots.insert(change.slot()) {
      self.changes.push(change);
    }
  }
}

/// Stack of change groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Journal {
  groups: Vec<Group>,
}

impl Journal {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of open groups.
  pub fn depth(&self) -> usize {
    self.groups.len()
  }

  pub fn is_empty(&self) -> bool {
    self.groups.is_empty()
  }

  /// Whether `slot` already has a prior recorded in the innermost group.
  pub fn is_recorded(&self, slot: &Slot) -> bool {
    self.groups.last().is_some_and(|g| g.slots.contains(slot))
  }

  pub fn push(&mut self) {
    self.groups.push(Group::default());
  }

  /// Records a prior in the innermost group. Only the first prior of a slot
  /// is kept; nothing is recorded while no group is open.
  pub fn record(&mut self, change: Change) {
    if let Some(group) = self.groups.last_mut() {
      group.record(change);
    }
  }

  /// Closes the innermost group and returns its priors newest first, ready to
  /// be written back. `None` when no group is open.
  pub fn pop(&mut self) -> Option<Vec<Change>> {
    let group = self.groups.pop()?;
    let mut changes = group.changes;
    changes.reverse();
    Some(changes)
  }

  /// Closes the innermost group keeping its changes. Priors the enclosing
  /// group has not seen yet move into it. Returns `false` when no group is open.
  pub fn forget(&mut self) -> bool {
    let Some(group) = self.groups.pop() else {
      return false;
    };
    if let Some(parent) = self.groups.last_mut() {
      for change in group.changes {
        parent.record(change);
      }
    }
    true
  }
}
