//! Checkpoint for resumable walks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Context, Direction, Frame, Target};
use crate::journal::Journal;

/// Everything a walker needs to continue where it stopped.
///
/// The graph itself is not part of the checkpoint; it is supplied again on
/// restore and the element ids must refer to the same graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
  /// When the checkpoint was taken; serialized as RFC 3339.
  pub saved_at: DateTime<Utc>,
  pub frames: Vec<Frame>,
  pub context: Context,
  pub states: Vec<(Target, Value)>,
  pub journal: Journal,
  pub direction: Direction,
  /// Full source text of a parsing walk (empty otherwise).
  #[serde(default)]
  pub text: String,
  /// Byte offset of the unparsed remainder in `text`.
  #[serde(default)]
  pub offset: usize,
  /// Characters consumed so far.
  #[serde(default)]
  pub parsed_length: usize,
  #[serde(default)]
  pub last_parsed: String,
}
