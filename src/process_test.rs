//! Tests for whole walks through `Process`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use crate::condition::Condition;
use crate::config::ProcessConfig;
use crate::elements::{Notion, Quantifier, Relation};
use crate::error::GraphError;
use crate::event::Event;
use crate::graph::Graph;
use crate::process::Process;
use crate::types::{Command, Context, Direction, NotionId, Target};
use crate::walker::Walk;

fn counter(key: &'static str) -> impl Fn(&crate::elements::Scope<'_>) -> Command + Send + Sync {
  move |scope: &crate::elements::Scope<'_>| {
    let n = scope.get(key).and_then(|v| v.as_u64()).unwrap_or(0);
    Command::update(key, n + 1)
  }
}

#[test]
fn relations_run_in_order() {
  let mut g = Graph::new("seq");
  let root = g.add_notion(Notion::complex("root"));
  let first = g.add_notion(Notion::action("first", |_| Command::update("trail", "a")));
  let second = g.add_notion(Notion::action("second", |scope| {
    let trail = scope.get("trail").and_then(|v| v.as_str()).unwrap_or_default();
    Command::update("trail", format!("{trail}b"))
  }));
  g.add_relation(root, Some(first), Relation::next()).unwrap();
  g.add_relation(root, Some(second), Relation::next()).unwrap();
  g.set_root(root).unwrap();

  let mut p = Process::new(Arc::new(g));
  let outcome = p.start_root(Context::new()).unwrap();
  assert!(outcome.is_ok());
  assert_eq!(p.context().get("trail"), Some(&json!("ab")));
  assert_eq!(outcome.last, Some(Target::Notion(second)));
}

#[test]
fn start_root_needs_a_root() {
  let mut p = Process::new(Arc::new(Graph::new("empty")));
  assert_eq!(
    p.start_root(Context::new()).unwrap_err(),
    GraphError::MissingRoot("empty".to_string())
  );
}

/// Selective `alt` over `a -> A` and `b -> B`.
fn alternation() -> (Arc<Graph>, NotionId, NotionId) {
  let mut g = Graph::new("alt");
  let alt = g.add_notion(Notion::selective("alt"));
  let a = g.add_notion(Notion::plain("A"));
  let b = g.add_notion(Notion::plain("B"));
  g.add_relation(alt, Some(a), Relation::parsing("a")).unwrap();
  g.add_relation(alt, Some(b), Relation::parsing("b")).unwrap();
  (Arc::new(g), alt, b)
}

#[test]
fn selective_takes_the_matching_branch() {
  let (g, alt, b) = alternation();
  let mut p = Process::parsing(g);
  let outcome = p.parse(alt, "b", Context::new());
  assert!(outcome.is_ok());
  assert_eq!(outcome.length, 1);
  assert_eq!(outcome.last, Some(Target::Notion(b)));
  assert_eq!(p.text(), "");
  assert_eq!(p.last_parsed(), "b");
}

#[test]
fn selective_without_a_match_fails() {
  let (g, alt, _) = alternation();
  let mut p = Process::parsing(g);
  let outcome = p.parse(alt, "xx", Context::new());
  assert!(outcome.is_error());
  assert_eq!(outcome.reply, Command::Direction(Direction::Error));
  assert_eq!(outcome.length, 0);
}

/// `alt` tries `a` then `b` for the first branch (`a` then `b`) and falls back
/// to the second (`a` then `c`). The first branch marks the context.
fn backtracking() -> (Arc<Graph>, NotionId, crate::types::RelationId) {
  let mut g = Graph::new("backtrack");
  let alt = g.add_notion(Notion::selective("alt"));
  let ab = g.add_notion(Notion::complex("ab"));
  let ac = g.add_notion(Notion::complex("ac"));
  g.add_relation(alt, Some(ab), Relation::parsing("a")).unwrap();
  g.add_relation(alt, Some(ac), Relation::parsing("a")).unwrap();
  g.add_relation(ab, None, Relation::action(|_| Command::update("path", "ab")))
    .unwrap();
  g.add_relation(ab, None, Relation::parsing("b")).unwrap();
  let c = g.add_relation(ac, None, Relation::parsing("c")).unwrap();
  (Arc::new(g), alt, c)
}

#[test]
fn selective_rolls_back_a_failed_branch() {
  let (g, alt, c) = backtracking();
  let mut p = Process::parsing(g);
  let outcome = p.parse(alt, "ac", Context::new());
  assert!(outcome.is_ok());
  assert_eq!(outcome.length, 2);
  assert_eq!(p.context().get("path"), None);
  assert_eq!(p.state(alt), None);
  assert!(p.walker().journal().is_empty());
  assert_eq!(outcome.last, Some(Target::Relation(c)));
}

#[test]
fn selective_keeps_the_first_branch_that_succeeds() {
  let (g, alt, _) = backtracking();
  let mut p = Process::parsing(g);
  let outcome = p.parse(alt, "ab", Context::new());
  assert!(outcome.is_ok());
  assert_eq!(p.context().get("path"), Some(&json!("ab")));
}

#[test]
fn selective_fails_when_every_branch_fails() {
  let (g, alt, _) = backtracking();
  let mut p = Process::parsing(g);
  let outcome = p.parse(alt, "ax", Context::new());
  assert!(outcome.is_error());
  assert_eq!(outcome.length, 0);
  assert_eq!(p.context().get("path"), None);
  assert!(p.walker().journal().is_empty());
}

fn repeated_a(q: impl Into<Quantifier>) -> (Arc<Graph>, NotionId) {
  let mut g = Graph::new("loop");
  let root = g.add_notion(Notion::complex("root"));
  let body = g.add_notion(Notion::complex("body"));
  g.add_relation(root, Some(body), Relation::repeat(q)).unwrap();
  g.add_relation(body, None, Relation::parsing("a")).unwrap();
  (Arc::new(g), root)
}

#[test]
fn bounded_loop_takes_as_many_iterations_as_fit() {
  let (g, root) = repeated_a((2usize, 4usize));
  for (text, length) in [("aa", 2), ("aaa", 3), ("aaaa", 4), ("aaaaa", 4), ("aab", 2)] {
    let mut p = Process::parsing(Arc::clone(&g));
    let outcome = p.parse(root, text, Context::new());
    assert!(outcome.is_ok(), "{text}: {:?}", outcome.reply);
    assert_eq!(outcome.length, length, "{text}");
    assert!(p.walker().journal().is_empty(), "{text}");
  }
}

#[test]
fn bounded_loop_below_the_minimum_fails() {
  let (g, root) = repeated_a((2usize, 4usize));
  for text in ["", "a", "ba"] {
    let mut p = Process::parsing(Arc::clone(&g));
    assert!(p.parse(root, text, Context::new()).is_error(), "{text}");
  }
}

#[test]
fn star_loop_accepts_nothing() {
  let (g, root) = repeated_a(Quantifier::Star);
  let mut p = Process::parsing(g);
  let outcome = p.parse(root, "bbb", Context::new());
  assert!(outcome.is_ok());
  assert_eq!(outcome.length, 0);
}

#[test]
fn exact_loop_needs_every_iteration() {
  let (g, root) = repeated_a(3usize);
  let mut p = Process::parsing(Arc::clone(&g));
  assert_eq!(p.parse(root, "aaaa", Context::new()).length, 3);
  let mut p = Process::parsing(g);
  assert!(p.parse(root, "aa", Context::new()).is_error());
}

#[test]
fn loop_iterations_that_fail_leave_no_trace_in_the_context() {
  let mut g = Graph::new("loop");
  let root = g.add_notion(Notion::complex("root"));
  let body = g.add_notion(Notion::complex("body"));
  g.add_relation(root, Some(body), Relation::repeat(Quantifier::Star))
    .unwrap();
  g.add_relation(body, None, Relation::action(counter("n"))).unwrap();
  g.add_relation(body, None, Relation::parsing("a")).unwrap();
  let mut p = Process::parsing(Arc::new(g));
  let outcome = p.parse(root, "aa", Context::new());
  assert!(outcome.is_ok());
  assert_eq!(p.context().get("n"), Some(&json!(2)));
}

#[test]
fn parsing_relation_consumes_its_match() {
  let mut g = Graph::new("p");
  let root = g.add_notion(Notion::complex("root"));
  g.add_relation(root, None, Relation::parsing("x")).unwrap();
  let mut p = Process::parsing(Arc::new(g));
  let outcome = p.parse(root, "x", Context::new());
  assert!(outcome.is_ok());
  assert_eq!(outcome.length, 1);
  assert_eq!(p.parsed_length(), 1);
  assert_eq!(p.last_parsed(), "x");
}

#[test]
fn parsing_relation_without_match() {
  let build = |optional: bool| {
    let mut g = Graph::new("p");
    let root = g.add_notion(Notion::complex("root"));
    let x = if optional {
      Relation::parsing("x").optional()
    } else {
      Relation::parsing("x")
    };
    g.add_relation(root, None, x).unwrap();
    g.add_relation(root, None, Relation::action(|_| Command::update("after", true)))
      .unwrap();
    (Arc::new(g), root)
  };

  let (g, root) = build(false);
  let mut p = Process::parsing(g);
  assert!(p.parse(root, "y", Context::new()).is_error());
  assert_eq!(p.context().get("after"), None);

  let (g, root) = build(true);
  let mut p = Process::parsing(g);
  let outcome = p.parse(root, "y", Context::new());
  assert!(outcome.is_ok());
  assert_eq!(outcome.length, 0);
  assert_eq!(p.context().get("after"), Some(&json!(true)));
}

#[test]
fn text_is_not_consumed_unless_parsing_is_enabled() {
  let (g, alt, _) = alternation();
  let mut p = Process::new(g);
  let outcome = p.parse(alt, "a", Context::new());
  assert!(outcome.is_stuck());
  assert_eq!(outcome.length, 0);
}

#[test]
fn break_leaves_the_loop_and_the_walk_goes_on() {
  let mut g = Graph::new("forever");
  let root = g.add_notion(Notion::complex("root"));
  let body = g.add_notion(Notion::complex("body"));
  g.add_relation(root, Some(body), Relation::repeat(Quantifier::Forever))
    .unwrap();
  g.add_relation(root, None, Relation::action(|_| Command::update("done", true)))
    .unwrap();
  g.add_relation(body, None, Relation::action(counter("n"))).unwrap();
  g.add_relation(
    body,
    None,
    Relation::action(|scope| {
      if scope.get("n") == Some(&json!(3)) {
        Command::Direction(Direction::Break)
      } else {
        Command::Nothing
      }
    }),
  )
  .unwrap();
  g.add_relation(body, None, Relation::action(counter("tail"))).unwrap();
  g.set_root(root).unwrap();

  let mut p = Process::new(Arc::new(g));
  let outcome = p.start_root(Context::new()).unwrap();
  assert!(outcome.is_ok());
  assert_eq!(p.context().get("n"), Some(&json!(3)));
  assert_eq!(p.context().get("tail"), Some(&json!(2)));
  assert_eq!(p.context().get("done"), Some(&json!(true)));
}

#[test]
fn uncaught_break_ends_the_walk() {
  let mut g = Graph::new("g");
  let root = g.add_notion(Notion::action("root", |_| {
    Command::Direction(Direction::Break)
  }));
  g.set_root(root).unwrap();
  let mut p = Process::new(Arc::new(g));
  let outcome = p.start_root(Context::new()).unwrap();
  assert_eq!(outcome.reply, Command::Direction(Direction::Break));
}

fn single_action(
  f: impl Fn(&crate::elements::Scope<'_>) -> Command + Send + Sync + 'static,
) -> Process {
  let mut g = Graph::new("one");
  let root = g.add_notion(Notion::action("root", f));
  g.set_root(root).unwrap();
  Process::new(Arc::new(g))
}

#[test]
fn context_groups() {
  let mut p = single_action(|_| {
    Command::Sequence(vec![
      Command::update("kept", 1),
      Command::PushContext,
      Command::update("kept", 2),
      Command::update("dropped", true),
      Command::PopContext,
      Command::PushContext,
      Command::update("forgotten", true),
      Command::ForgetContext,
      Command::add("kept", 3),
      Command::delete(["missing"]),
    ])
  });
  assert!(p.start_root(Context::new()).unwrap().is_ok());
  assert_eq!(p.context().get("kept"), Some(&json!(1)));
  assert_eq!(p.context().get("dropped"), None);
  assert_eq!(p.context().get("forgotten"), Some(&json!(true)));
}

#[test]
fn skip_drops_the_following_item() {
  let mut p = single_action(|_| {
    Command::Sequence(vec![
      Command::Skip,
      Command::update("a", 1),
      Command::update("b", 2),
    ])
  });
  assert!(p.start_root(Context::new()).unwrap().is_ok());
  assert_eq!(p.context().get("a"), None);
  assert_eq!(p.context().get("b"), Some(&json!(2)));
}

#[test]
fn unknown_commands_get_the_walk_stuck() {
  let mut p = single_action(|_| Command::Value(json!("custom")));
  assert!(p.start_root(Context::new()).unwrap().is_stuck());
}

#[test]
fn client_values_named_like_built_in_commands_are_not_dispatched_to_them() {
  for name in ["ok", "stop", "query", "error", "skip"] {
    let mut p = single_action(move |_| Command::Value(json!(name)));
    assert!(p.start_root(Context::new()).unwrap().is_stuck(), "{name}");
  }

  let mut p = single_action(|_| Command::Value(json!("ok")));
  p.handler_mut().on(
    Condition::<Walk>::exact("ok"),
    Event::<Walk>::named("client-ok", |_, w| {
      w.update_context(&BTreeMap::from([("seen".to_string(), json!(true))]))
    }),
  );
  assert!(p.start_root(Context::new()).unwrap().is_ok());
  assert_eq!(p.context().get("seen"), Some(&json!(true)));
}

#[test]
fn clients_can_register_process_events() {
  let mut p = single_action(|_| Command::Value(json!("custom")));
  p.handler_mut().on(
    Condition::<Walk>::exact("custom"),
    Event::<Walk>::named("custom", |_, w| {
      w.update_context(&BTreeMap::from([("seen".to_string(), json!(true))]))
    }),
  );
  assert!(p.start_root(Context::new()).unwrap().is_ok());
  assert_eq!(p.context().get("seen"), Some(&json!(true)));
}

#[test]
fn stop_and_resume() {
  let mut p = single_action(|scope| {
    if scope.get("go").is_some() {
      Command::Ok
    } else {
      Command::Stop
    }
  });
  let paused = p.start_root(Context::new()).unwrap();
  assert!(paused.is_stopped());
  assert!(!paused.is_step_limited());
  let outcome = p.resume(vec![Command::update("go", true), Command::Query]);
  assert!(outcome.is_ok());
}

#[test]
fn step_limit_stops_an_endless_walk() {
  let mut g = Graph::new("endless");
  let root = g.add_notion(Notion::complex("root"));
  let body = g.add_notion(Notion::complex("body"));
  g.add_relation(root, Some(body), Relation::repeat(Quantifier::Forever))
    .unwrap();
  g.set_root(root).unwrap();
  let mut p = Process::with_config(Arc::new(g), ProcessConfig::default().with_max_steps(50));
  let outcome = p.start_root(Context::new()).unwrap();
  assert!(outcome.is_stopped());
  assert!(outcome.is_step_limited());
  assert_eq!(p.walker().steps(), 50);
}

#[test]
fn walk_finishing_exactly_at_the_step_limit_is_ok() {
  let graph = || {
    let mut g = Graph::new("seq");
    let root = g.add_notion(Notion::complex("root"));
    let leaf = g.add_notion(Notion::action("leaf", |_| Command::update("x", 1)));
    g.add_relation(root, Some(leaf), Relation::next()).unwrap();
    g.set_root(root).unwrap();
    Arc::new(g)
  };
  let mut free = Process::new(graph());
  assert!(free.start_root(Context::new()).unwrap().is_ok());
  let needed = free.walker().steps();

  let config = ProcessConfig::default().with_max_steps(needed);
  let mut p = Process::with_config(graph(), config);
  assert!(p.start_root(Context::new()).unwrap().is_ok());
  assert_eq!(p.walker().steps(), needed);
  assert_eq!(p.context().get("x"), Some(&json!(1)));

  let config = ProcessConfig::default().with_max_steps(needed - 1);
  let mut p = Process::with_config(graph(), config);
  let outcome = p.start_root(Context::new()).unwrap();
  assert!(outcome.is_stopped());
  assert!(outcome.is_step_limited());
  assert_eq!(p.walker().steps(), needed - 1);
}

#[test]
fn recorded_steps_follow_every_query() {
  let mut g = Graph::new("seq");
  let root = g.add_notion(Notion::complex("root"));
  let leaf = g.add_notion(Notion::action("leaf", |_| Command::update("x", 1)));
  g.add_relation(root, Some(leaf), Relation::next().named("to-leaf"))
    .unwrap();
  g.set_root(root).unwrap();
  let mut p = Process::new(Arc::new(g));
  let log = p.record_steps();
  assert!(p.start_root(Context::new()).unwrap().is_ok());

  let entries = log.entries();
  let names: Vec<_> = entries.iter().map(|e| e.element.as_deref()).collect();
  assert_eq!(names, vec![Some("root"), Some("to-leaf"), Some("leaf")]);
  assert_eq!(entries[0].step, 1);
  assert_eq!(entries[2].reply, Command::update("x", 1));
  assert!(entries.iter().all(|e| e.direction == Direction::Next));
  assert_eq!(log.render().lines().count(), 3);
}
