//! Ranked conditions.
//!
//! A condition looks at the head of a message (plus whatever arguments the
//! caller passes along) and answers with a [`Matched`] rank, or `None` when it
//! does not apply. Longer, more specific matches rank higher.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::types::{Command, Direction};

/// A successful condition check.
#[derive(Debug, Clone, PartialEq)]
pub struct Matched {
  pub rank: usize,
  pub value: Value,
}

impl Matched {
  pub fn new(rank: usize, value: impl Into<Value>) -> Self {
    Self {
      rank,
      value: value.into(),
    }
  }
}

/// Textual view of a message head used by constant, string and pattern conditions.
pub trait Probe {
  fn probe(&self) -> Cow<'_, str>;
}

impl Probe for str {
  fn probe(&self) -> Cow<'_, str> {
    Cow::Borrowed(self)
  }
}

impl Probe for Direction {
  fn probe(&self) -> Cow<'_, str> {
    Cow::Borrowed(self.as_str())
  }
}

impl Probe for Command {
  fn probe(&self) -> Cow<'_, str> {
    match self {
      Command::Value(Value::String(s)) => Cow::Borrowed(s),
      Command::Value(v) => Cow::Owned(v.to_string()),
      other => Cow::Borrowed(other.kind()),
    }
  }
}

/// What a family of conditions is checked against.
///
/// `Head` is the message head, `Args` the extra (borrowed) arguments, and
/// `Check` the function type a [`Condition::Func`] wraps.
pub trait Subject: 'static {
  type Head: ?Sized + Probe;
  type Args<'a>;
  type Check: ?Sized + Send + Sync;

  fn check(f: &Self::Check, head: &Self::Head, args: &Self::Args<'_>) -> Option<Matched>;
}

/// A ranked predicate over a message head.
pub enum Condition<S: Subject> {
  /// Matches a head equal to the constant; ranks by the rendered length.
  Const(Value),
  /// Matches a head starting with the string; ranks by its length.
  Text(String),
  /// Matches a pattern anchored at the start of the head; ranks by match length.
  Pattern(Regex),
  /// Best-ranked member wins, earliest on ties.
  Any(Vec<Condition<S>>),
  /// `true` always matches with rank 0, `false` never does.
  Flag(bool),
  Func(Arc<S::Check>),
}

/// Renders a constant the way heads are probed.
pub(crate) fn render(value: &Value) -> Cow<'_, str> {
  match value {
    Value::String(s) => Cow::Borrowed(s),
    other => Cow::Owned(other.to_string()),
  }
}

impl<S: Subject> Condition<S> {
  /// Exact-match constant.
  pub fn exact(value: impl Into<Value>) -> Self {
    Condition::Const(value.into())
  }

  /// Compiles `pattern` into a [`Condition::Pattern`] anchored at the
  /// start of the probe.
  pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
    Ok(Condition::Pattern(anchored(pattern)?))
  }

  pub fn check(&self, head: &S::Head, args: &S::Args<'_>) -> Option<Matched> {
    match self {
      Condition::Const(value) => {
        let expected = render(value);
        (head.probe() == expected).then(|| Matched::new(expected.chars().count(), value.clone()))
      }
      Condition::Text(prefix) => {
        let probe = head.probe();
        probe
          .starts_with(prefix.as_str())
          .then(|| Matched::new(prefix.chars().count(), prefix.as_str()))
      }
      Condition::Pattern(regex) => {
        let probe = head.probe();
        regex
          .find(&probe)
          .filter(|m| m.start() == 0)
          .map(|m| Matched::new(m.as_str().chars().count(), m.as_str()))
      }
      Condition::Any(members) => {
        let mut best: Option<Matched> = None;
        for m in members.iter().filter_map(|member| member.check(head, args)) {
          if best.as_ref().is_none_or(|b| m.rank > b.rank) {
            best = Some(m);
          }
        }
        best
      }
      Condition::Flag(true) => Some(Matched::new(0, true)),
      Condition::Flag(false) => None,
      Condition::Func(f) => S::check(f, head, args),
    }
  }
}

impl<S: Subject> Clone for Condition<S> {
  fn clone(&self) -> Self {
    match self {
      Condition::Const(v) => Condition::Const(v.clone()),
      Condition::Text(s) => Condition::Text(s.clone()),
      Condition::Pattern(r) => Condition::Pattern(r.clone()),
      Condition::Any(members) => Condition::Any(members.clone()),
      Condition::Flag(b) => Condition::Flag(*b),
      Condition::Func(f) => Condition::Func(Arc::clone(f)),
    }
  }
}

impl<S: Subject> fmt::Debug for Condition<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Condition::Const(v) => f.debug_tuple("Const").field(v).finish(),
      Condition::Text(s) => f.debug_tuple("Text").field(s).finish(),
      Condition::Pattern(r) => f.debug_tuple("Pattern").field(&r.as_str()).finish(),
      Condition::Any(members) => f.debug_tuple("Any").field(members).finish(),
      Condition::Flag(b) => f.debug_tuple("Flag").field(b).finish(),
      Condition::Func(_) => f.write_str("Func(..)"),
    }
  }
}

impl<S: Subject> From<&str> for Condition<S> {
  fn from(s: &str) -> Self {
    Condition::Text(s.to_string())
  }
}

impl<S: Subject> From<String> for Condition<S> {
  fn from(s: String) -> Self {
    Condition::Text(s)
  }
}

impl<S: Subject> From<bool> for Condition<S> {
  fn from(b: bool) -> Self {
    Condition::Flag(b)
  }
}

impl<S: Subject> From<Regex> for Condition<S> {
  fn from(r: Regex) -> Self {
    Condition::Pattern(anchored(r.as_str()).unwrap_or(r))
  }
}

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
  Regex::new(&format!("^(?:{pattern})"))
}

impl<S: Subject> From<Direction> for Condition<S> {
  fn from(d: Direction) -> Self {
    Condition::Const(Value::String(d.as_str().to_string()))
  }
}

impl<S: Subject> From<Vec<Condition<S>>> for Condition<S> {
  fn from(members: Vec<Condition<S>>) -> Self {
    Condition::Any(members)
  }
}
