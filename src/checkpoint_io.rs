//! Walk checkpoints on disk.
//!
//! A file holds one [`Checkpoint`] as pretty JSON: the frame stack with its
//! pending messages, the context, per-element states, open journal groups,
//! the walk direction and the text cursor. The graph is not stored; a walk is
//! restored against a graph built the same way as the one that was saved.

use std::io::{Error, ErrorKind};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::config::ProcessConfig;
use crate::graph::Graph;
use crate::process::Process;
use crate::types::Checkpoint;

/// Default filename for a checkpoint under a run directory.
pub const CHECKPOINT_FILENAME: &str = "walk.checkpoint.json";

fn invalid(e: impl std::error::Error + Send + Sync + 'static) -> Error {
  Error::new(ErrorKind::InvalidData, e)
}

/// Writes `cp` to `path`, creating parent directories.
#[instrument(level = "trace", skip(path, cp))]
pub fn save_checkpoint(path: &Path, cp: &Checkpoint) -> Result<(), Error> {
  let json = serde_json::to_string_pretty(cp).map_err(invalid)?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  debug!(path = %path.display(), frames = cp.frames.len(), "writing walk checkpoint");
  std::fs::write(path, json)
}

/// Reads a checkpoint. Missing files and malformed JSON are errors.
#[instrument(level = "trace", skip(path))]
pub fn load_checkpoint(path: &Path) -> Result<Checkpoint, Error> {
  let bytes = std::fs::read(path)?;
  serde_json::from_slice(&bytes).map_err(invalid)
}

/// Reads a checkpoint and rebuilds the paused process over `graph`.
///
/// A checkpoint naming elements `graph` does not have is `InvalidData`.
pub fn load_process(
  path: &Path,
  graph: Arc<Graph>,
  config: ProcessConfig,
) -> Result<Process, Error> {
  let cp = load_checkpoint(path)?;
  Process::restore(graph, config, cp).map_err(invalid)
}
