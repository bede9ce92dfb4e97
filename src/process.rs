//! The process: dispatches every message item through a [`Handler`] of
//! walker primitives until the walk ends.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::condition::{Condition, Matched};
use crate::config::ProcessConfig;
use crate::error::GraphError;
use crate::event::Event;
use crate::graph::Graph;
use crate::handler::Handler;
use crate::trace::StepLog;
use crate::types::{Checkpoint, Command, Context, Direction, StepEntry, Target};
use crate::walker::{Walk, WalkCheckFn, Walker};

/// Activation tag of the text-consuming events.
pub const TEXT_TAG: &str = "text";

/// How a walk ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
  /// `Ok`, `Stop`, a backward direction that was never caught, or
  /// `Flag(false)` when the walk got stuck.
  pub reply: Command,
  /// Characters consumed.
  pub length: usize,
  /// Last element entered going forward.
  pub last: Option<Target>,
  /// The walk was stopped by `max_steps` with items still queued.
  pub step_limited: bool,
}

impl Outcome {
  pub fn is_ok(&self) -> bool {
    self.reply == Command::Ok
  }

  pub fn is_error(&self) -> bool {
    self.reply == Command::Direction(Direction::Error)
  }

  pub fn is_stopped(&self) -> bool {
    self.reply == Command::Stop
  }

  pub fn is_stuck(&self) -> bool {
    self.reply == Command::Flag(false)
  }

  /// Stopped by the process itself rather than by an element.
  pub fn is_step_limited(&self) -> bool {
    self.step_limited
  }
}

pub struct Process {
  handler: Handler<Walk>,
  walker: Walker,
}

impl Process {
  pub fn new(graph: Arc<Graph>) -> Self {
    Self::with_config(graph, ProcessConfig::default())
  }

  /// A process that consumes text.
  pub fn parsing(graph: Arc<Graph>) -> Self {
    Self::with_config(graph, ProcessConfig::parsing())
  }

  pub fn with_config(graph: Arc<Graph>, config: ProcessConfig) -> Self {
    let handler = default_handler(&config);
    Self {
      handler,
      walker: Walker::new(graph, config),
    }
  }

  pub fn id(&self) -> Uuid {
    self.walker.id()
  }

  pub fn walker(&self) -> &Walker {
    &self.walker
  }

  pub fn handler_mut(&mut self) -> &mut Handler<Walk> {
    &mut self.handler
  }

  pub fn context(&self) -> &Context {
    self.walker.context()
  }

  pub fn state(&self, target: impl Into<Target>) -> Option<&Value> {
    self.walker.state(target.into())
  }

  /// Unparsed remainder of the text.
  pub fn text(&self) -> &str {
    self.walker.text()
  }

  pub fn parsed_length(&self) -> usize {
    self.walker.parsed_length()
  }

  pub fn last_parsed(&self) -> &str {
    self.walker.last_parsed()
  }

  /// Starts a new walk at `target`.
  pub fn start(&mut self, target: impl Into<Target>, context: Context) -> Outcome {
    self.walker.reset(target.into(), context, String::new());
    self.run()
  }

  /// Starts a new walk at the graph's root.
  pub fn start_root(&mut self, context: Context) -> Result<Outcome, GraphError> {
    let root = self.walker.graph().require_root()?;
    Ok(self.start(root, context))
  }

  /// Starts a new walk at `target` over `text`.
  pub fn parse(
    &mut self,
    target: impl Into<Target>,
    text: impl Into<String>,
    context: Context,
  ) -> Outcome {
    self.walker.reset(target.into(), context, text.into());
    self.run()
  }

  /// Continues a paused walk with `message` placed in front of the active frame.
  pub fn resume(&mut self, message: Vec<Command>) -> Outcome {
    self.walker.enqueue(Command::Sequence(message));
    self.run()
  }

  pub fn checkpoint(&self) -> Checkpoint {
    self.walker.checkpoint()
  }

  /// Rebuilds a paused process over `graph`.
  pub fn restore(
    graph: Arc<Graph>,
    config: ProcessConfig,
    checkpoint: Checkpoint,
  ) -> Result<Self, GraphError> {
    let handler = default_handler(&config);
    let walker = Walker::restore(graph, config, checkpoint)?;
    Ok(Self { handler, walker })
  }

  /// Records every element query from now on.
  pub fn record_steps(&mut self) -> StepLog {
    let log = StepLog::default();
    let sink = log.clone();
    if let Some(event) = self.handler.event_mut("query") {
      event.set_post(move |_, walker, reply| {
        let element = walker
          .current()
          .and_then(|t| walker.graph().element(t))
          .and_then(|e| e.name().map(str::to_string));
        sink.push(StepEntry {
          step: walker.steps(),
          element,
          direction: walker.direction(),
          reply: reply.clone(),
        });
        reply
      });
    }
    log
  }

  #[instrument(level = "trace", skip(self), fields(process = %self.walker.id()))]
  fn run(&mut self) -> Outcome {
    info!(process = %self.walker.id(), current = ?self.walker.current(), "walk starting");
    loop {
      let Some(head) = self.walker.take_head() else {
        break;
      };
      if let Some(max) = self.walker.config().max_steps {
        if self.walker.steps() >= max {
          warn!(max_steps = max, "step limit reached, stopping walk");
          self.walker.enqueue(head);
          let mut outcome = self.finish(Command::Stop);
          outcome.step_limited = true;
          return outcome;
        }
      }
      self.walker.tick();
      let Some(handled) = self.handler.handle(&head, &mut self.walker) else {
        warn!(command = head.kind(), "no process event for command");
        return self.finish(Command::Flag(false));
      };
      let reply = handled.reply;
      if reply.is_terminal() {
        return self.finish(reply);
      }
      if reply.is_pass() {
        continue;
      }
      self.walker.enqueue(reply);
    }
    let reply = match self.walker.direction() {
      Direction::Next => Command::Ok,
      d => Command::Direction(d),
    };
    self.finish(reply)
  }

  fn finish(&self, reply: Command) -> Outcome {
    let outcome = Outcome {
      reply,
      length: self.walker.parsed_length(),
      last: self.walker.last(),
      step_limited: false,
    };
    info!(
      process = %self.walker.id(),
      reply = outcome.reply.kind(),
      length = outcome.length,
      steps = self.walker.steps(),
      "walk finished"
    );
    outcome
  }
}

/// Matches a built-in command of `kind`. Client `Value`s never match, even
/// when their text equals a built-in kind.
fn exact(kind: &'static str) -> Condition<Walk> {
  let check: Arc<WalkCheckFn> = Arc::new(move |head: &Command, _: &Walker| {
    (!matches!(head, Command::Value(_)) && head.kind() == kind)
      .then(|| Matched::new(kind.chars().count(), kind))
  });
  Condition::Func(check)
}

fn default_handler(config: &ProcessConfig) -> Handler<Walk> {
  let mut h = Handler::new();
  h.on(exact("query"), Event::<Walk>::named("query", |_, w| w.query()))
    .on(
      exact("element"),
      Event::<Walk>::named("push_frame", |head, w| match head {
        Command::Target(t) => w.push_frame(*t),
        _ => Command::Flag(false),
      }),
    )
    .on(exact("skip"), Event::<Walk>::named("skip", |_, w| w.skip()))
    .on(exact("ok"), Event::<Walk>::named("ok", |_, _| Command::Ok))
    .on(exact("stop"), Event::<Walk>::named("stop", |_, _| Command::Stop))
    .on(exact("true"), Event::<Walk>::named("true", |_, _| Command::Nothing))
    .on(exact("false"), Event::<Walk>::named("false", |_, _| Command::Nothing));
  for direction in [
    Direction::Next,
    Direction::Error,
    Direction::Break,
    Direction::Continue,
  ] {
    h.on(
      exact(direction.as_str()),
      Event::<Walk>::named(direction.as_str(), |head, w| match head {
        Command::Direction(d) => w.turn(*d),
        _ => Command::Flag(false),
      }),
    );
  }
  h.on(
    exact("add_context"),
    Event::<Walk>::named("add_context", |head, w| match head {
      Command::AddContext(entries) => w.add_context(entries),
      _ => Command::Flag(false),
    }),
  )
  .on(
    exact("update_context"),
    Event::<Walk>::named("update_context", |head, w| match head {
      Command::UpdateContext(entries) => w.update_context(entries),
      _ => Command::Flag(false),
    }),
  )
  .on(
    exact("delete_context"),
    Event::<Walk>::named("delete_context", |head, w| match head {
      Command::DeleteContext(keys) => w.delete_context(keys),
      _ => Command::Flag(false),
    }),
  )
  .on(
    exact("push_context"),
    Event::<Walk>::named("push_context", |_, w| w.push_context()),
  )
  .on(
    exact("pop_context"),
    Event::<Walk>::named("pop_context", |_, w| w.pop_context()),
  )
  .on(
    exact("forget_context"),
    Event::<Walk>::named("forget_context", |_, w| w.forget_context()),
  )
  .on(
    exact("set_state"),
    Event::<Walk>::named("set_state", |head, w| match head {
      Command::SetState(value) => w.set_state(value.clone()),
      _ => Command::Flag(false),
    }),
  )
  .on(
    exact("clear_state"),
    Event::<Walk>::named("clear_state", |_, w| w.clear_state()),
  )
  .on_tagged(
    exact("proceed"),
    Event::<Walk>::named("proceed", |head, w| match head {
      Command::Proceed(n) => w.proceed(*n),
      _ => Command::Flag(false),
    }),
    [TEXT_TAG],
  );
  if config.parsing {
    h.activate(TEXT_TAG);
  }
  h
}
