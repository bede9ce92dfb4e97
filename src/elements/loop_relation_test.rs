//! Tests for loop bounds and loop relation replies.

use std::collections::HashMap;

use serde_json::{Value, json};

use crate::elements::{Bounds, Element, Limit, Notion, Quantifier, Relation, Scope, truthy};
use crate::graph::Graph;
use crate::types::{Command, Context, Direction, NotionId, RelationId, Target};

use Limit::{Finite, Infinite};

fn bounds(q: impl Into<Quantifier>) -> Option<(Limit, Limit)> {
  q.into().bounds().map(|Bounds { lower, upper }| (lower, upper))
}

#[test]
fn quantifier_bounds() {
  assert_eq!(bounds(3usize), Some((Finite(1), Finite(3))));
  assert_eq!(bounds(0usize), Some((Finite(0), Finite(0))));
  assert_eq!(bounds((2usize, 4usize)), Some((Finite(2), Finite(4))));
  assert_eq!(bounds((5usize, 2usize)), Some((Finite(2), Finite(5))));
  assert_eq!(bounds(Quantifier::Range(None, None)), Some((Finite(0), Infinite)));
  assert_eq!(bounds(Quantifier::Star), Some((Finite(0), Infinite)));
  assert_eq!(bounds(Quantifier::Plus), Some((Finite(1), Infinite)));
  assert_eq!(bounds(Quantifier::Optional), Some((Finite(0), Finite(1))));
  assert_eq!(bounds(true), Some((Infinite, Infinite)));
  assert_eq!(bounds(Quantifier::custom(|_, _| Value::Null)), None);
}

#[test]
fn only_exact_and_custom_loops_are_rigid() {
  assert!(!Quantifier::Exact(2).is_flexible());
  assert!(!Quantifier::custom(|_, _| Value::Null).is_flexible());
  assert!(Quantifier::Star.is_flexible());
  assert!(Quantifier::Forever.is_flexible());
  assert!(Quantifier::Range(Some(1), None).is_flexible());
}

#[test]
fn truthiness() {
  for falsy in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
    assert!(!truthy(&falsy), "{falsy} should be falsy");
  }
  for value in [json!(true), json!(-1), json!(0.5), json!("0"), json!([0]), json!({"a": 1})] {
    assert!(truthy(&value), "{value} should be truthy");
  }
}

struct Looped {
  graph: Graph,
  relation: RelationId,
  body: NotionId,
  context: Context,
}

impl Looped {
  fn new(q: impl Into<Quantifier>) -> Self {
    let mut graph = Graph::new("loop");
    let owner = graph.add_notion(Notion::complex("owner"));
    let body = graph.add_notion(Notion::plain("body"));
    let relation = graph
      .add_relation(owner, Some(body), Relation::repeat(q))
      .unwrap();
    Self {
      graph,
      relation,
      body,
      context: Context::new(),
    }
  }

  fn reply(&self, direction: Direction, state: Option<Value>) -> Command {
    let this = Target::Relation(self.relation);
    let mut states = HashMap::new();
    if let Some(state) = state {
      states.insert(this, state);
    }
    let mut scope = Scope {
      graph: &self.graph,
      this,
      context: &self.context,
      states: &states,
      text: "",
      parsed_length: 0,
      last_parsed: "",
      direction,
    };
    self
      .graph
      .element(this)
      .and_then(|e| e.handler().handle(&direction, &mut scope))
      .map(|h| h.reply)
      .unwrap_or(Command::Flag(false))
  }

  fn body(&self) -> Command {
    Command::Target(Target::Notion(self.body))
  }

  fn this(&self) -> Command {
    Command::Target(Target::Relation(self.relation))
  }
}

#[test]
fn flexible_loop_snapshots_each_iteration() {
  let l = Looped::new((2usize, 4usize));
  assert_eq!(
    l.reply(Direction::Next, None),
    Command::Sequence(vec![
      Command::PushContext,
      Command::SetState(json!(1)),
      l.body(),
      l.this(),
    ])
  );
  assert_eq!(
    l.reply(Direction::Next, Some(json!(1))),
    Command::Sequence(vec![
      Command::ForgetContext,
      Command::PushContext,
      Command::SetState(json!(2)),
      l.body(),
      l.this(),
    ])
  );
  assert_eq!(
    l.reply(Direction::Next, Some(json!(4))),
    Command::Sequence(vec![Command::ForgetContext, Command::ClearState])
  );
}

#[test]
fn failing_iteration_above_the_minimum_is_rolled_back() {
  let l = Looped::new((2usize, 4usize));
  assert_eq!(
    l.reply(Direction::Error, Some(json!(3))),
    Command::Sequence(vec![
      Command::PopContext,
      Command::ClearState,
      Command::Direction(Direction::Next),
    ])
  );
  assert_eq!(
    l.reply(Direction::Error, Some(json!(2))),
    Command::Sequence(vec![
      Command::PopContext,
      Command::ClearState,
      Command::error(),
    ])
  );
}

#[test]
fn error_passing_an_idle_loop_is_ignored() {
  let l = Looped::new(Quantifier::Star);
  assert_eq!(l.reply(Direction::Error, None), Command::Nothing);
  assert_eq!(l.reply(Direction::Break, None), Command::Nothing);
  assert_eq!(l.reply(Direction::Continue, None), Command::Nothing);
}

#[test]
fn exact_loop_does_not_snapshot() {
  let l = Looped::new(2usize);
  assert_eq!(
    l.reply(Direction::Next, None),
    Command::Sequence(vec![Command::SetState(json!(1)), l.body(), l.this()])
  );
  assert_eq!(
    l.reply(Direction::Next, Some(json!(1))),
    Command::Sequence(vec![Command::SetState(json!(2)), l.body(), l.this()])
  );
  assert_eq!(
    l.reply(Direction::Next, Some(json!(2))),
    Command::Sequence(vec![Command::ClearState])
  );
  assert_eq!(
    l.reply(Direction::Error, Some(json!(2))),
    Command::Sequence(vec![Command::ClearState, Command::error()])
  );
}

#[test]
fn zero_iterations_skip_the_body() {
  assert_eq!(Looped::new(0usize).reply(Direction::Next, None), Command::Nothing);
}

#[test]
fn break_and_continue_end_or_advance_the_loop() {
  let l = Looped::new(Quantifier::Forever);
  assert_eq!(
    l.reply(Direction::Break, Some(json!(7))),
    Command::Sequence(vec![
      Command::ForgetContext,
      Command::ClearState,
      Command::Direction(Direction::Next),
    ])
  );
  assert_eq!(
    l.reply(Direction::Continue, Some(json!(7))),
    Command::Sequence(vec![
      Command::Direction(Direction::Next),
      Command::Sequence(vec![
        Command::ForgetContext,
        Command::PushContext,
        Command::SetState(json!(8)),
        l.body(),
        l.this(),
      ]),
    ])
  );
}

#[test]
fn custom_loop_keeps_the_function_value_as_state() {
  let l = Looped::new(Quantifier::custom(|state, _| {
    let n = state.and_then(Value::as_u64).unwrap_or(0);
    if n < 2 { json!(n + 1) } else { json!(false) }
  }));
  assert_eq!(
    l.reply(Direction::Next, None),
    Command::Sequence(vec![Command::SetState(json!(1)), l.body(), l.this()])
  );
  assert_eq!(
    l.reply(Direction::Next, Some(json!(2))),
    Command::ClearState
  );
  assert_eq!(l.reply(Direction::Error, Some(json!(1))), Command::ClearState);
}

#[test]
fn custom_loop_that_never_starts_replies_nothing() {
  let l = Looped::new(Quantifier::custom(|_, _| json!(0)));
  assert_eq!(l.reply(Direction::Next, None), Command::Nothing);
}
