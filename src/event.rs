//! Events: a callable plus optional pre/post hooks.

use std::fmt;
use std::sync::Arc;

use crate::condition::Subject;
use crate::types::Command;

/// Calling convention of a family of events.
///
/// `Call` is the main function, `Pre` may short-circuit it and `Post` sees
/// (and may replace) its reply.
pub trait Protocol: Subject {
  type Call: ?Sized + Send + Sync;
  type Pre: ?Sized + Send + Sync;
  type Post: ?Sized + Send + Sync;

  fn call(f: &Self::Call, head: &Self::Head, args: &mut Self::Args<'_>) -> Command;
  fn pre(f: &Self::Pre, head: &Self::Head, args: &Self::Args<'_>) -> Option<Command>;
  fn post(f: &Self::Post, head: &Self::Head, args: &Self::Args<'_>, reply: Command) -> Command;
}

pub struct Event<P: Protocol> {
  name: Option<String>,
  call: Arc<P::Call>,
  pre: Option<Arc<P::Pre>>,
  post: Option<Arc<P::Post>>,
}

impl<P: Protocol> Event<P> {
  pub fn from_call(name: Option<String>, call: Arc<P::Call>) -> Self {
    Self {
      name,
      call,
      pre: None,
      post: None,
    }
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  pub fn set_pre_hook(&mut self, pre: Option<Arc<P::Pre>>) {
    self.pre = pre;
  }

  pub fn set_post_hook(&mut self, post: Option<Arc<P::Post>>) {
    self.post = post;
  }

  pub fn has_hooks(&self) -> bool {
    self.pre.is_some() || self.post.is_some()
  }

  /// Pre-hook (may answer instead of the call), call, then post-hook.
  pub fn run(&self, head: &P::Head, args: &mut P::Args<'_>) -> Command {
    if let Some(reply) = self.pre.as_ref().and_then(|pre| P::pre(pre, head, &*args)) {
      return reply;
    }
    let reply = P::call(&self.call, head, args);
    match &self.post {
      Some(post) => P::post(post, head, &*args, reply),
      None => reply,
    }
  }
}

impl<P: Protocol> Clone for Event<P> {
  fn clone(&self) -> Self {
    Self {
      name: self.name.clone(),
      call: Arc::clone(&self.call),
      pre: self.pre.clone(),
      post: self.post.clone(),
    }
  }
}

impl<P: Protocol> fmt::Debug for Event<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Event")
      .field("name", &self.name)
      .field("pre", &self.pre.is_some())
      .field("post", &self.post.is_some())
      .finish()
  }
}
