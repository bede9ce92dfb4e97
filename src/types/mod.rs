//! Value types shared by the graph, the walker and the process.
//!
//! Everything here is plain data and serializes with serde so a walk can be
//! checkpointed and resumed.

use std::collections::HashMap;

use serde_json::Value;

mod checkpoint;
#[cfg(test)]
mod checkpoint_test;
mod command;
mod direction;
mod frame;
mod step_entry;
mod target;

pub use checkpoint::Checkpoint;
pub use command::Command;
pub use direction::Direction;
pub use frame::Frame;
pub use step_entry::StepEntry;
pub use target::{NotionId, RelationId, Target};

/// Key-value context shared by every element of a walk.
pub type Context = HashMap<String, Value>;
