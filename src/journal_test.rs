//! Tests for `journal`.

use std::collections::HashMap;

use proptest::prelude::*;
use serde_json::{Value, json};

use crate::journal::{Change, Journal, Slot};

/// Minimal stand-in for the walker: a context map that writes through the journal.
#[derive(Default)]
struct Store {
  map: HashMap<String, Value>,
  journal: Journal,
}

impl Store {
  fn set(&mut self, key: &str, value: Value) {
    let prior = self.map.get(key).cloned();
    self.journal.record(Change::Context {
      key: key.to_string(),
      prior,
    });
    self.map.insert(key.to_string(), value);
  }

  fn remove(&mut self, key: &str) {
    let prior = self.map.get(key).cloned();
    self.journal.record(Change::Context {
      key: key.to_string(),
      prior,
    });
    self.map.remove(key);
  }

  fn pop(&mut self) {
    for change in self.journal.pop().unwrap_or_default() {
      if let Change::Context { key, prior } = change {
        match prior {
          Some(v) => self.map.insert(key, v),
          None => self.map.remove(&key),
        };
      }
    }
  }
}

#[test]
fn nothing_is_recorded_without_a_group() {
  let mut j = Journal::new();
  j.record(Change::Context {
    key: "a".into(),
    prior: None,
  });
  assert!(j.is_empty());
  assert_eq!(j.pop(), None);
  assert!(!j.forget());
}

#[test]
fn first_prior_wins() {
  let mut s = Store::default();
  s.set("x", json!(1));
  s.journal.push();
  s.set("x", json!(2));
  s.set("x", json!(3));
  assert!(s.journal.is_recorded(&Slot::Context("x".into())));
  s.pop();
  assert_eq!(s.map.get("x"), Some(&json!(1)));
}

#[test]
fn pop_removes_keys_added_inside_the_group() {
  let mut s = Store::default();
  s.journal.push();
  s.set("fresh", json!("v"));
  s.pop();
  assert!(!s.map.contains_key("fresh"));
}

#[test]
fn forget_merges_into_parent() {
  let mut s = Store::default();
  s.set("a", json!(0));
  s.journal.push();
  s.journal.push();
  s.set("a", json!(1));
  s.set("b", json!(1));
  assert!(s.journal.forget());
  assert_eq!(s.journal.depth(), 1);
  assert_eq!(s.map.get("a"), Some(&json!(1)));
  s.pop();
  assert_eq!(s.map.get("a"), Some(&json!(0)));
  assert!(!s.map.contains_key("b"));
}

#[test]
fn forget_keeps_parents_older_prior() {
  let mut s = Store::default();
  s.set("a", json!("base"));
  s.journal.push();
  s.set("a", json!("outer"));
  s.journal.push();
  s.set("a", json!("inner"));
  s.journal.forget();
  s.pop();
  assert_eq!(s.map.get("a"), Some(&json!("base")));
}

#[test]
fn pop_returns_newest_first() {
  let mut j = Journal::new();
  j.push();
  j.record(Change::Context {
    key: "a".into(),
    prior: None,
  });
  j.record(Change::Cursor {
    offset: 0,
    parsed_length: 0,
    last_parsed: String::new(),
  });
  let changes = j.pop().unwrap();
  assert_eq!(changes[0].slot(), Slot::Cursor);
  assert_eq!(changes[1].slot(), Slot::Context("a".into()));
}

#[test]
fn journal_serializes() {
  let mut j = Journal::new();
  j.push();
  j.record(Change::Context {
    key: "k".into(),
    prior: Some(json!(5)),
  });
  let json = serde_json::to_string(&j).unwrap();
  let back: Journal = serde_json::from_str(&json).unwrap();
  assert_eq!(back, j);
}

#[derive(Debug, Clone)]
enum Op {
  Set(u8, i64),
  Remove(u8),
  Push,
  Pop,
  Forget,
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    (0u8..4, any::<i64>()).prop_map(|(k, v)| Op::Set(k, v)),
    (0u8..4).prop_map(Op::Remove),
    Just(Op::Push),
    Just(Op::Pop),
    Just(Op::Forget),
  ]
}

proptest! {
  #[test]
  fn outer_pop_restores_snapshot(seed in proptest::collection::vec((0u8..4, any::<i64>()), 0..4), ops in proptest::collection::vec(op(), 0..40)) {
    let mut s = Store::default();
    for (k, v) in seed {
      s.set(&k.to_string(), json!(v));
    }
    let snapshot = s.map.clone();
    s.journal.push();
    for op in ops {
      match op {
        Op::Set(k, v) => s.set(&k.to_string(), json!(v)),
        Op::Remove(k) => s.remove(&k.to_string()),
        Op::Push => s.journal.push(),
        Op::Pop if s.journal.depth() > 1 => s.pop(),
        Op::Forget if s.journal.depth() > 1 => {
          s.journal.forget();
        }
        Op::Pop | Op::Forget => {}
      }
    }
    while s.journal.depth() > 1 {
      s.journal.forget();
    }
    s.pop();
    prop_assert_eq!(s.map, snapshot);
  }
}
