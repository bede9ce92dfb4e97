//! What an element sees while it is queried.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::condition::{Matched, Subject};
use crate::event::{Event, Protocol};
use crate::graph::Graph;
use crate::types::{Command, Context, Direction, Target};

/// Read-only view of the walk handed to element events and guards.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
  pub graph: &'a Graph,
  /// Element being queried.
  pub this: Target,
  pub context: &'a Context,
  pub states: &'a HashMap<Target, Value>,
  /// Unparsed remainder of the input text.
  pub text: &'a str,
  pub parsed_length: usize,
  pub last_parsed: &'a str,
  pub direction: Direction,
}

impl<'a> Scope<'a> {
  /// Private state of the queried element.
  pub fn state(&self) -> Option<&'a Value> {
    self.states.get(&self.this)
  }

  pub fn get(&self, key: &str) -> Option<&'a Value> {
    self.context.get(key)
  }

  /// Same view, pointed at another element.
  pub fn focus(&self, target: impl Into<Target>) -> Scope<'a> {
    Scope {
      this: target.into(),
      ..*self
    }
  }
}

pub type GuardFn = dyn Fn(&str, &Scope<'_>) -> Option<Matched> + Send + Sync;
pub type ActionFn = dyn Fn(&Scope<'_>) -> Command + Send + Sync;
pub type QueryCheckFn = dyn Fn(&Direction, &Scope<'_>) -> Option<Matched> + Send + Sync;
pub type QueryFn = dyn Fn(&Direction, &mut Scope<'_>) -> Command + Send + Sync;
pub type QueryPreFn = dyn Fn(&Direction, &Scope<'_>) -> Option<Command> + Send + Sync;
pub type QueryPostFn = dyn Fn(&Direction, &Scope<'_>, Command) -> Command + Send + Sync;

/// Relation guards: checked against the remaining text.
#[derive(Debug)]
pub struct Text;

impl Subject for Text {
  type Head = str;
  type Args<'a> = Scope<'a>;
  type Check = GuardFn;

  fn check(f: &GuardFn, head: &str, args: &Scope<'_>) -> Option<Matched> {
    f(head, args)
  }
}

/// Element events: dispatched on the walk direction.
#[derive(Debug)]
pub struct Query;

impl Subject for Query {
  type Head = Direction;
  type Args<'a> = Scope<'a>;
  type Check = QueryCheckFn;

  fn check(f: &QueryCheckFn, head: &Direction, args: &Scope<'_>) -> Option<Matched> {
    f(head, args)
  }
}

impl Protocol for Query {
  type Call = QueryFn;
  type Pre = QueryPreFn;
  type Post = QueryPostFn;

  fn call(f: &QueryFn, head: &Direction, args: &mut Scope<'_>) -> Command {
    f(head, args)
  }

  fn pre(f: &QueryPreFn, head: &Direction, args: &Scope<'_>) -> Option<Command> {
    f(head, args)
  }

  fn post(f: &QueryPostFn, head: &Direction, args: &Scope<'_>, reply: Command) -> Command {
    f(head, args, reply)
  }
}

impl Event<Query> {
  pub fn new(f: impl Fn(&Direction, &mut Scope<'_>) -> Command + Send + Sync + 'static) -> Self {
    let call: Arc<QueryFn> = Arc::new(f);
    Event::from_call(None, call)
  }

  pub fn named(
    name: impl Into<String>,
    f: impl Fn(&Direction, &mut Scope<'_>) -> Command + Send + Sync + 'static,
  ) -> Self {
    let call: Arc<QueryFn> = Arc::new(f);
    Event::from_call(Some(name.into()), call)
  }

  pub fn set_pre(
    &mut self,
    f: impl Fn(&Direction, &Scope<'_>) -> Option<Command> + Send + Sync + 'static,
  ) {
    let pre: Arc<QueryPreFn> = Arc::new(f);
    self.set_pre_hook(Some(pre));
  }

  pub fn set_post(
    &mut self,
    f: impl Fn(&Direction, &Scope<'_>, Command) -> Command + Send + Sync + 'static,
  ) {
    let post: Arc<QueryPostFn> = Arc::new(f);
    self.set_post_hook(Some(post));
  }
}

/// Wraps a guard closure as a [`Condition::Func`](crate::Condition::Func).
pub fn guard(
  f: impl Fn(&str, &Scope<'_>) -> Option<Matched> + Send + Sync + 'static,
) -> crate::condition::Condition<Text> {
  let f: Arc<GuardFn> = Arc::new(f);
  crate::condition::Condition::Func(f)
}
