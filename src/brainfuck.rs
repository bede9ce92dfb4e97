//! Brainfuck interpreter built as a notion graph.
//!
//! Each operator is a shared action notion; a program is a complex notion
//! with one relation per operator, and every `[...]` is a custom loop relation
//! over a nested complex notion that repeats while the current cell is set.
//! The tape, pointer, pending input and output live in the walk context.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::ProcessConfig;
use crate::elements::{Notion, Quantifier, Relation, Scope};
use crate::error::GraphError;
use crate::graph::Graph;
use crate::process::{Outcome, Process};
use crate::types::{Checkpoint, Command, Context, NotionId};

pub const TAPE: &str = "tape";
pub const POINTER: &str = "pointer";
pub const INPUT: &str = "input";
pub const OUTPUT: &str = "output";

#[derive(Debug, Error)]
pub enum BrainfuckError {
  #[error("unmatched `]` at byte {0}")]
  UnexpectedClose(usize),
  #[error("unclosed `[` at byte {0}")]
  Unclosed(usize),
  #[error("unknown cell format `{0}` (expected `ascii` or `parens`)")]
  UnknownFormat(String),
  #[error("program is not waiting for input")]
  NotWaiting,
  #[error(transparent)]
  Graph(#[from] GraphError),
}

/// How `.` renders a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellFormat {
  /// The cell as the character with the same code point (U+0000 to U+00FF).
  /// [`Run::bytes`] turns these back into the raw cell values.
  #[default]
  Ascii,
  /// Values below 10 as `(n)`, anything else as a character.
  Parens,
}

impl CellFormat {
  pub fn render(self, cell: u8) -> String {
    match self {
      CellFormat::Parens if cell < 10 => format!("({cell})"),
      _ => char::from(cell).to_string(),
    }
  }
}

impl FromStr for CellFormat {
  type Err = BrainfuckError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "ascii" => Ok(CellFormat::Ascii),
      "parens" => Ok(CellFormat::Parens),
      other => Err(BrainfuckError::UnknownFormat(other.to_string())),
    }
  }
}

impl fmt::Display for CellFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      CellFormat::Ascii => "ascii",
      CellFormat::Parens => "parens",
    })
  }
}

fn tape(scope: &Scope<'_>) -> Vec<u8> {
  scope
    .get(TAPE)
    .and_then(Value::as_array)
    .map(|cells| {
      cells
        .iter()
        .map(|v| v.as_u64().map_or(0, |n| (n % 256) as u8))
        .collect()
    })
    .unwrap_or_else(|| vec![0])
}

fn pointer(scope: &Scope<'_>) -> usize {
  scope
    .get(POINTER)
    .and_then(Value::as_u64)
    .and_then(|n| usize::try_from(n).ok())
    .unwrap_or(0)
}

fn cell(scope: &Scope<'_>) -> u8 {
  tape(scope).get(pointer(scope)).copied().unwrap_or(0)
}

fn write_cell(scope: &Scope<'_>, f: impl Fn(u8) -> u8) -> Command {
  let mut cells = tape(scope);
  let at = pointer(scope);
  if at >= cells.len() {
    cells.resize(at + 1, 0);
  }
  cells[at] = f(cells[at]);
  Command::update(TAPE, cells)
}

fn increment(scope: &Scope<'_>) -> Command {
  write_cell(scope, |c| c.wrapping_add(1))
}

fn decrement(scope: &Scope<'_>) -> Command {
  write_cell(scope, |c| c.wrapping_sub(1))
}

fn move_left(scope: &Scope<'_>) -> Command {
  match pointer(scope).checked_sub(1) {
    Some(at) => Command::update(POINTER, at),
    None => Command::error(),
  }
}

fn move_right(scope: &Scope<'_>) -> Command {
  let at = pointer(scope) + 1;
  let mut cells = tape(scope);
  if at < cells.len() {
    return Command::update(POINTER, at);
  }
  cells.resize(at + 1, 0);
  let mut update = Command::update(POINTER, at);
  if let Command::UpdateContext(map) = &mut update {
    map.insert(TAPE.to_string(), Value::from(cells));
  }
  update
}

fn read_input(scope: &Scope<'_>) -> Command {
  let pending = scope.get(INPUT).and_then(Value::as_str).unwrap_or_default();
  let mut chars = pending.chars();
  let Some(c) = chars.next() else {
    debug!("input exhausted, pausing");
    return Command::Stop;
  };
  let rest = chars.as_str().to_string();
  let byte = (u32::from(c) % 256) as u8;
  let mut update = write_cell(scope, |_| byte);
  if let Command::UpdateContext(map) = &mut update {
    map.insert(INPUT.to_string(), Value::from(rest));
  }
  update
}

struct Operators {
  increment: NotionId,
  decrement: NotionId,
  left: NotionId,
  right: NotionId,
  output: NotionId,
  input: NotionId,
}

impl Operators {
  fn add(graph: &mut Graph, format: CellFormat) -> Self {
    Self {
      increment: graph.add_notion(Notion::action("+", increment)),
      decrement: graph.add_notion(Notion::action("-", decrement)),
      left: graph.add_notion(Notion::action("<", move_left)),
      right: graph.add_notion(Notion::action(">", move_right)),
      output: graph.add_notion(Notion::action(".", move |scope: &Scope<'_>| {
        let printed = scope.get(OUTPUT).and_then(Value::as_str).unwrap_or_default();
        Command::update(OUTPUT, format!("{printed}{}", format.render(cell(scope))))
      })),
      input: graph.add_notion(Notion::action(",", read_input)),
    }
  }

  fn for_char(&self, c: char) -> Option<NotionId> {
    match c {
      '+' => Some(self.increment),
      '-' => Some(self.decrement),
      '<' => Some(self.left),
      '>' => Some(self.right),
      '.' => Some(self.output),
      ',' => Some(self.input),
      _ => None,
    }
  }
}

/// Builds the program graph for `source`. Characters other than the eight
/// operators are comments.
#[instrument(level = "trace", skip(source))]
pub fn build_graph(source: &str, format: CellFormat) -> Result<Graph, BrainfuckError> {
  let mut graph = Graph::new("brainfuck");
  let ops = Operators::add(&mut graph, format);
  let root = graph.add_notion(Notion::complex("program"));
  let mut open: Vec<(NotionId, usize)> = Vec::new();
  let mut current = root;
  for (at, c) in source.char_indices() {
    match c {
      '[' => {
        let body = graph.add_notion(Notion::complex(format!("loop@{at}")));
        graph.add_relation(
          current,
          Some(body),
          Relation::repeat(Quantifier::custom(|_, scope| Value::Bool(cell(scope) != 0))),
        )?;
        open.push((current, at));
        current = body;
      }
      ']' => {
        let (outer, _) = open.pop().ok_or(BrainfuckError::UnexpectedClose(at))?;
        current = outer;
      }
      c => {
        if let Some(op) = ops.for_char(c) {
          graph.add_relation(current, Some(op), Relation::next())?;
        }
      }
    }
  }
  if let Some((_, at)) = open.pop() {
    return Err(BrainfuckError::Unclosed(at));
  }
  graph.set_root(root)?;
  Ok(graph)
}

/// Compiles `source` into a runnable program.
pub fn compile(source: &str, format: CellFormat) -> Result<Program, BrainfuckError> {
  let graph = Arc::new(build_graph(source, format)?);
  Ok(Program {
    process: Process::new(graph),
    waiting: false,
  })
}

/// Result of running (or feeding) a program.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
  /// Everything printed so far.
  pub output: String,
  pub outcome: Outcome,
}

impl Run {
  /// The output with one byte per printed character, so cells above 127 come
  /// out as the raw byte instead of their UTF-8 encoding.
  pub fn bytes(&self) -> Vec<u8> {
    self
      .output
      .chars()
      .filter_map(|c| u8::try_from(c).ok())
      .collect()
  }

  /// The program paused on `,` with no input left.
  pub fn is_waiting(&self) -> bool {
    self.outcome.is_stopped() && !self.outcome.is_step_limited()
  }
}

pub struct Program {
  process: Process,
  waiting: bool,
}

impl Program {
  /// Replaces the process settings (for example a step limit).
  pub fn with_config(self, config: ProcessConfig) -> Self {
    let graph = Arc::clone(self.process.walker().graph());
    Self {
      process: Process::with_config(graph, config),
      waiting: false,
    }
  }

  /// Continues from a checkpoint of this program paused on `,`.
  ///
  /// The checkpoint must come from a program compiled from the same source.
  pub fn restored(self, checkpoint: Checkpoint) -> Result<Self, BrainfuckError> {
    let graph = Arc::clone(self.process.walker().graph());
    let config = self.process.walker().config().clone();
    Ok(Self {
      process: Process::restore(graph, config, checkpoint)?,
      waiting: true,
    })
  }

  pub fn process(&self) -> &Process {
    &self.process
  }

  pub fn process_mut(&mut self) -> &mut Process {
    &mut self.process
  }

  /// Runs from the start with `input` as the pending input.
  pub fn run(&mut self, input: &str) -> Result<Run, BrainfuckError> {
    let mut context = Context::new();
    context.insert(TAPE.to_string(), Value::from(vec![0u8]));
    context.insert(POINTER.to_string(), Value::from(0));
    context.insert(INPUT.to_string(), Value::from(input));
    context.insert(OUTPUT.to_string(), Value::from(""));
    let outcome = self.process.start_root(context)?;
    Ok(self.report(outcome))
  }

  /// Appends `input` and continues a program paused on `,`.
  pub fn feed(&mut self, input: &str) -> Result<Run, BrainfuckError> {
    if !self.waiting {
      return Err(BrainfuckError::NotWaiting);
    }
    let pending = format!(
      "{}{input}",
      self
        .process
        .context()
        .get(INPUT)
        .and_then(Value::as_str)
        .unwrap_or_default()
    );
    let outcome = self
      .process
      .resume(vec![Command::update(INPUT, pending), Command::Query]);
    Ok(self.report(outcome))
  }

  pub fn output(&self) -> &str {
    self
      .process
      .context()
      .get(OUTPUT)
      .and_then(Value::as_str)
      .unwrap_or_default()
  }

  pub fn tape(&self) -> Vec<u8> {
    self
      .process
      .context()
      .get(TAPE)
      .and_then(Value::as_array)
      .map(|cells| {
        cells
          .iter()
          .map(|v| v.as_u64().map_or(0, |n| (n % 256) as u8))
          .collect()
      })
      .unwrap_or_default()
  }

  fn report(&mut self, outcome: Outcome) -> Run {
    self.waiting = outcome.is_stopped() && !outcome.is_step_limited();
    Run {
      output: self.output().to_string(),
      outcome,
    }
  }
}
