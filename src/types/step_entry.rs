//! DTO for one recorded dispatch step of a walk.

use serde::{Deserialize, Serialize};

use super::{Command, Direction};

/// One element query recorded while a process runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEntry {
  /// 1-based step index.
  pub step: usize,
  /// Name of the queried element (unnamed elements record `None`).
  pub element: Option<String>,
  /// Direction the element was queried with.
  pub direction: Direction,
  /// What the element replied.
  pub reply: Command,
}
