//! Ranked event dispatch.
//!
//! A [`Handler`] keeps `(condition, event)` pairs in registration order. On
//! every message it checks the pairs whose activation tags are all active and
//! runs the event of the strictly best-ranked one; the earliest registration
//! wins ties.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;
use tracing::trace;

use crate::condition::{Condition, Matched};
use crate::event::{Event, Protocol};
use crate::types::Command;

struct Entry<P: Protocol> {
  condition: Condition<P>,
  event: Event<P>,
  tags: BTreeSet<String>,
}

impl<P: Protocol> Clone for Entry<P> {
  fn clone(&self) -> Self {
    Self {
      condition: self.condition.clone(),
      event: self.event.clone(),
      tags: self.tags.clone(),
    }
  }
}

/// Result of a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Handled {
  pub reply: Command,
  /// Rank of the winning condition; `None` when the unknown event answered.
  pub rank: Option<usize>,
  pub matched: Option<Value>,
  /// Name of the event that ran.
  pub event: Option<String>,
}

pub struct Handler<P: Protocol> {
  entries: Vec<Entry<P>>,
  tags: BTreeSet<String>,
  unknown: Option<Event<P>>,
}

impl<P: Protocol> Default for Handler<P> {
  fn default() -> Self {
    Self {
      entries: Vec::new(),
      tags: BTreeSet::new(),
      unknown: None,
    }
  }
}

impl<P: Protocol> Clone for Handler<P> {
  fn clone(&self) -> Self {
    Self {
      entries: self.entries.clone(),
      tags: self.tags.clone(),
      unknown: self.unknown.clone(),
    }
  }
}

impl<P: Protocol> fmt::Debug for Handler<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Handler")
      .field(
        "conditions",
        &self.entries.iter().map(|e| &e.condition).collect::<Vec<_>>(),
      )
      .field("tags", &self.tags)
      .field("unknown", &self.unknown.is_some())
      .finish()
  }
}

impl<P: Protocol> Handler<P> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers an always-active pair.
  pub fn on(&mut self, condition: impl Into<Condition<P>>, event: Event<P>) -> &mut Self {
    self.on_tagged(condition, event, std::iter::empty::<String>())
  }

  /// Registers a pair that only takes part while all `tags` are active.
  pub fn on_tagged<I, T>(
    &mut self,
    condition: impl Into<Condition<P>>,
    event: Event<P>,
    tags: I,
  ) -> &mut Self
  where
    I: IntoIterator<Item = T>,
    T: Into<String>,
  {
    self.entries.push(Entry {
      condition: condition.into(),
      event,
      tags: tags.into_iter().map(Into::into).collect(),
    });
    self
  }

  /// Event run when no condition matches.
  pub fn on_unknown(&mut self, event: Event<P>) -> &mut Self {
    self.unknown = Some(event);
    self
  }

  pub fn activate(&mut self, tag: impl Into<String>) {
    self.tags.insert(tag.into());
  }

  pub fn deactivate(&mut self, tag: &str) {
    self.tags.remove(tag);
  }

  pub fn is_active(&self, tag: &str) -> bool {
    self.tags.contains(tag)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Every event registered under `name`, the unknown event included.
  pub fn events_mut(&mut self, name: &str) -> impl Iterator<Item = &mut Event<P>> {
    self
      .entries
      .iter_mut()
      .map(|e| &mut e.event)
      .chain(self.unknown.as_mut())
      .filter(move |e| e.name() == Some(name))
  }

  /// First event registered under `name`.
  pub fn event_mut(&mut self, name: &str) -> Option<&mut Event<P>> {
    self.events_mut(name).next()
  }

  /// Best active match for `head` without running anything.
  pub fn rank(&self, head: &P::Head, args: &P::Args<'_>) -> Option<Matched> {
    self.best(head, args).map(|(_, m)| m)
  }

  fn best(&self, head: &P::Head, args: &P::Args<'_>) -> Option<(usize, Matched)> {
    let mut best: Option<(usize, Matched)> = None;
    for (index, entry) in self.entries.iter().enumerate() {
      if !entry.tags.is_subset(&self.tags) {
        continue;
      }
      let Some(m) = entry.condition.check(head, args) else {
        continue;
      };
      if best.as_ref().is_none_or(|(_, b)| m.rank > b.rank) {
        best = Some((index, m));
      }
    }
    best
  }

  /// Runs the best-ranked active event, falling back to the unknown event.
  /// `None` when nothing can answer.
  pub fn handle(&self, head: &P::Head, args: &mut P::Args<'_>) -> Option<Handled> {
    match self.best(head, &*args) {
      Some((index, matched)) => {
        let event = &self.entries[index].event;
        trace!(rank = matched.rank, event = ?event.name(), "dispatch");
        let reply = event.run(head, args);
        Some(Handled {
          reply,
          rank: Some(matched.rank),
          matched: Some(matched.value),
          event: event.name().map(str::to_string),
        })
      }
      None => {
        let event = self.unknown.as_ref()?;
        let reply = event.run(head, args);
        Some(Handled {
          reply,
          rank: None,
          matched: None,
          event: event.name().map(str::to_string),
        })
      }
    }
  }
}
