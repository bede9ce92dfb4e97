//! Direction a walk is moving in.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Query token the walker hands to the current element.
///
/// `Next` moves forward; the others travel backward through the queued
/// elements until something with saved state reacts to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
  Next,
  Error,
  Break,
  Continue,
}

impl Direction {
  pub fn as_str(self) -> &'static str {
    match self {
      Direction::Next => "next",
      Direction::Error => "error",
      Direction::Break => "break",
      Direction::Continue => "continue",
    }
  }

  pub fn is_forward(self) -> bool {
    self == Direction::Next
  }
}

impl fmt::Display for Direction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
