//! # notion-walker
//!
//! A graph walker for building parsers, interpreters and transducers.
//!
//! A client builds a [`Graph`] of named vertices ([`Notion`]s) connected by
//! guarded edges ([`Relation`]s) and hands a [`Process`] a starting element.
//! The process keeps a stack of frames; it asks the current element to react
//! to the walk direction and interprets the [`Command`]s it replies with.
//!
//! ## Architecture
//!
//! - [`condition`] / [`event`] / [`handler`]: ranked dispatch. The
//!   best-ranked active condition picks the event to run.
//! - [`elements`]: notion and relation kinds, including the selective notion
//!   (ranked alternation with rollback) and the loop relation (quantified
//!   repetition).
//! - [`walker`] / [`journal`]: frames, shared context, private states and the
//!   undo journal behind `push_context` / `pop_context` / `forget_context`.
//! - [`process`]: the walk loop and the process events.
//! - [`checkpoint_io`] and [`trace`]: paused walks on disk and step logs.
//! - [`brainfuck`]: an interpreter assembled from the pieces above.
//!
//! Set `RUST_LOG=notion_walker=trace` for span enter/exit of the walker
//! primitives.

pub mod brainfuck;
pub mod checkpoint_io;
pub mod condition;
pub mod config;
pub mod elements;
pub mod error;
pub mod event;
pub mod graph;
pub mod handler;
pub mod journal;
#[cfg(test)]
mod journal_test;
pub mod process;
#[cfg(test)]
mod process_test;
pub mod trace;
pub mod types;
pub mod walker;

pub use condition::{Condition, Matched, Probe, Subject};
pub use config::ProcessConfig;
pub use elements::{
  Bounds, Element, Limit, Notion, NotionKind, Quantifier, Query, Relation, RelationKind, Scope,
  Text, guard,
};
pub use error::GraphError;
pub use event::{Event, Protocol};
pub use graph::Graph;
pub use handler::{Handled, Handler};
pub use journal::Journal;
pub use process::{Outcome, Process};
pub use trace::StepLog;
pub use types::{
  Checkpoint, Command, Context, Direction, Frame, NotionId, RelationId, StepEntry, Target,
};
pub use walker::{Walk, Walker};
