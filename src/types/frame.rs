//! Call frame of a walk.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::{Command, Target};

/// One level of the walker's stack: the element being executed and the
/// message items still waiting to be processed for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
  pub current: Option<Target>,
  pub message: VecDeque<Command>,
}

impl Frame {
  /// Fresh frame that will query `target` first.
  pub fn entering(target: Target) -> Self {
    Self {
      current: Some(target),
      message: VecDeque::from([Command::Query]),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.message.is_empty()
  }
}
