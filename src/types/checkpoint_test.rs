//! Tests for `Checkpoint`.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use serde_json::json;

use super::{Checkpoint, Command, Direction, Frame, NotionId, Target};
use crate::journal::{Change, Journal};

fn sample() -> Checkpoint {
  let target = Target::Notion(NotionId(2));
  let mut ctx = HashMap::new();
  ctx.insert("goal".to_string(), json!("parse"));
  let mut journal = Journal::new();
  journal.push();
  journal.record(Change::Context {
    key: "goal".to_string(),
    prior: None,
  });
  Checkpoint {
    saved_at: Utc.with_ymd_and_hms(2026, 2, 14, 10, 0, 0).unwrap(),
    frames: vec![Frame::entering(target)],
    context: ctx,
    states: vec![(target, json!(3))],
    journal,
    direction: Direction::Error,
    text: "abc".to_string(),
    offset: 1,
    parsed_length: 1,
    last_parsed: "a".to_string(),
  }
}

#[test]
fn checkpoint_roundtrip_serde() {
  let cp = sample();
  let json = serde_json::to_string(&cp).unwrap();
  let cp2: Checkpoint = serde_json::from_str(&json).unwrap();
  assert_eq!(cp2, cp);
  assert_eq!(cp2.frames[0].message.front(), Some(&Command::Query));
  assert_eq!(cp2.context.get("goal"), Some(&json!("parse")));
}

#[test]
fn text_fields_default_when_absent() {
  let mut value = serde_json::to_value(sample()).unwrap();
  let obj = value.as_object_mut().unwrap();
  for key in ["text", "offset", "parsed_length", "last_parsed"] {
    obj.remove(key);
  }
  let cp: Checkpoint = serde_json::from_value(value).unwrap();
  assert_eq!(cp.text, "");
  assert_eq!(cp.offset, 0);
  assert_eq!(cp.parsed_length, 0);
}

#[test]
fn saved_at_is_an_rfc3339_timestamp() {
  let value = serde_json::to_value(sample()).unwrap();
  assert_eq!(value["saved_at"], json!("2026-02-14T10:00:00Z"));

  let mut value = value;
  value["saved_at"] = json!("not a time");
  assert!(serde_json::from_value::<Checkpoint>(value).is_err());
}
