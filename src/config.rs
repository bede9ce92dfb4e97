//! Process configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::Direction;

/// Per-process settings, fixed when the process is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessConfig {
  /// Directions that discard the rest of the active frame when applied.
  pub backward: BTreeSet<Direction>,
  /// Enables text consumption (`proceed`).
  #[serde(default)]
  pub parsing: bool,
  /// Ends the walk with `stop` after this many dispatch steps.
  #[serde(default)]
  pub max_steps: Option<usize>,
}

impl Default for ProcessConfig {
  fn default() -> Self {
    Self {
      backward: BTreeSet::from([Direction::Error, Direction::Break, Direction::Continue]),
      parsing: false,
      max_steps: None,
    }
  }
}

impl ProcessConfig {
  pub fn parsing() -> Self {
    Self {
      parsing: true,
      ..Self::default()
    }
  }

  pub fn with_backward(mut self, backward: impl IntoIterator<Item = Direction>) -> Self {
    self.backward = backward.into_iter().collect();
    self
  }

  pub fn with_max_steps(mut self, max_steps: usize) -> Self {
    self.max_steps = Some(max_steps);
    self
  }

  pub fn is_backward(&self, direction: Direction) -> bool {
    self.backward.contains(&direction)
  }
}
