//! Step log fed by a post-hook on the process's `query` event.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};

use crate::types::{Command, StepEntry};

/// Shared, append-only list of recorded steps.
#[derive(Debug, Clone, Default)]
pub struct StepLog(Arc<Mutex<Vec<StepEntry>>>);

impl StepLog {
  pub fn push(&self, entry: StepEntry) {
    self
      .0
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(entry);
  }

  pub fn entries(&self) -> Vec<StepEntry> {
    self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  pub fn len(&self) -> usize {
    self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&self.entries())
  }

  /// One `step element direction -> reply` line per entry.
  pub fn render(&self) -> String {
    let mut out = String::new();
    for entry in self.entries() {
      let _ = writeln!(
        out,
        "{:>5} {} {} -> {}",
        entry.step,
        entry.element.as_deref().unwrap_or("-"),
        entry.direction,
        render_reply(&entry.reply),
      );
    }
    out
  }
}

fn render_reply(reply: &Command) -> String {
  match reply {
    Command::Sequence(items) => items
      .iter()
      .map(render_reply)
      .collect::<Vec<_>>()
      .join(", "),
    Command::Target(t) => t.to_string(),
    other => other.kind().to_string(),
  }
}
