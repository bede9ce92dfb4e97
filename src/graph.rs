//! Arena graph of notions and relations.
//!
//! Elements are addressed by [`NotionId`] / [`RelationId`]. A relation stores
//! its subject and object as ids and the subject keeps the relation in its
//! own list; every re-wiring goes through the graph so both sides agree.

use tracing::instrument;

use crate::elements::{Element, Notion, NotionKind, Relation};
use crate::error::GraphError;
use crate::types::{NotionId, RelationId, Target};

#[derive(Debug, Clone, Default)]
pub struct Graph {
  name: String,
  notions: Vec<Notion>,
  relations: Vec<Relation>,
  root: Option<NotionId>,
}

impl Graph {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn add_notion(&mut self, notion: Notion) -> NotionId {
    let id = NotionId(self.notions.len());
    self.notions.push(notion);
    id
  }

  /// Adds `relation` from `subject` to `object`. The subject must be a
  /// complex or selective notion.
  #[instrument(level = "trace", skip(self, relation))]
  pub fn add_relation(
    &mut self,
    subject: NotionId,
    object: Option<NotionId>,
    mut relation: Relation,
  ) -> Result<RelationId, GraphError> {
    self.check_subject(subject)?;
    if let Some(object) = object {
      self.try_notion(object)?;
    }
    let id = RelationId(self.relations.len());
    relation.subject = Some(subject);
    relation.object = object;
    self.relations.push(relation);
    self.notions[subject.0].relations.push(id);
    Ok(id)
  }

  pub fn set_root(&mut self, root: NotionId) -> Result<(), GraphError> {
    self.try_notion(root)?;
    self.root = Some(root);
    Ok(())
  }

  pub fn root(&self) -> Option<NotionId> {
    self.root
  }

  pub fn require_root(&self) -> Result<NotionId, GraphError> {
    self
      .root
      .ok_or_else(|| GraphError::MissingRoot(self.name.clone()))
  }

  pub fn notion(&self, id: NotionId) -> Option<&Notion> {
    self.notions.get(id.0)
  }

  pub fn notion_mut(&mut self, id: NotionId) -> Option<&mut Notion> {
    self.notions.get_mut(id.0)
  }

  pub fn relation(&self, id: RelationId) -> Option<&Relation> {
    self.relations.get(id.0)
  }

  pub fn relation_mut(&mut self, id: RelationId) -> Option<&mut Relation> {
    self.relations.get_mut(id.0)
  }

  pub fn element(&self, target: Target) -> Option<&dyn Element> {
    match target {
      Target::Notion(id) => self.notion(id).map(|n| n as &dyn Element),
      Target::Relation(id) => self.relation(id).map(|r| r as &dyn Element),
    }
  }

  pub fn element_mut(&mut self, target: Target) -> Option<&mut dyn Element> {
    match target {
      Target::Notion(id) => self.notion_mut(id).map(|n| n as &mut dyn Element),
      Target::Relation(id) => self.relation_mut(id).map(|r| r as &mut dyn Element),
    }
  }

  pub fn contains(&self, target: Target) -> bool {
    self.element(target).is_some()
  }

  /// Relations `notion` is the subject of; empty for unknown ids.
  pub fn relations_of(&self, notion: NotionId) -> &[RelationId] {
    self
      .notion(notion)
      .map(Notion::relations)
      .unwrap_or_default()
  }

  pub fn notions(&self) -> impl Iterator<Item = (NotionId, &Notion)> {
    self
      .notions
      .iter()
      .enumerate()
      .map(|(i, n)| (NotionId(i), n))
  }

  pub fn relations(&self) -> impl Iterator<Item = (RelationId, &Relation)> {
    self
      .relations
      .iter()
      .enumerate()
      .map(|(i, r)| (RelationId(i), r))
  }

  pub fn notion_count(&self) -> usize {
    self.notions.len()
  }

  pub fn relation_count(&self) -> usize {
    self.relations.len()
  }

  /// Moves `relation` to another subject (or detaches it with `None`).
  pub fn set_subject(
    &mut self,
    relation: RelationId,
    subject: Option<NotionId>,
  ) -> Result<(), GraphError> {
    let old = self.try_relation(relation)?.subject;
    if let Some(subject) = subject {
      self.check_subject(subject)?;
    }
    if let Some(old) = old {
      self.unlink(old, relation);
    }
    if let Some(subject) = subject {
      self.notions[subject.0].relations.push(relation);
    }
    self.relations[relation.0].subject = subject;
    Ok(())
  }

  pub fn set_object(
    &mut self,
    relation: RelationId,
    object: Option<NotionId>,
  ) -> Result<(), GraphError> {
    self.try_relation(relation)?;
    if let Some(object) = object {
      self.try_notion(object)?;
    }
    self.relations[relation.0].object = object;
    Ok(())
  }

  /// Detaches every relation of `notion`; the relations stay in the graph
  /// without a subject.
  #[instrument(level = "trace", skip(self))]
  pub fn remove_all(&mut self, notion: NotionId) -> Result<Vec<RelationId>, GraphError> {
    let n = self
      .notions
      .get_mut(notion.0)
      .ok_or(GraphError::UnknownNotion(notion))?;
    let detached = std::mem::take(&mut n.relations);
    if let NotionKind::Selective { default } = &mut n.kind {
      *default = None;
    }
    for id in &detached {
      self.relations[id.0].subject = None;
    }
    Ok(detached)
  }

  /// Sets the fallback relation of a selective notion. The relation must have
  /// that notion as its subject.
  pub fn set_default(
    &mut self,
    notion: NotionId,
    relation: Option<RelationId>,
  ) -> Result<(), GraphError> {
    let name = self.try_notion(notion)?.name.clone();
    if let Some(relation) = relation {
      if self.try_relation(relation)?.subject != Some(notion) {
        return Err(GraphError::ForeignDefault {
          notion: name,
          relation,
        });
      }
    }
    match &mut self.notions[notion.0].kind {
      NotionKind::Selective { default } => {
        *default = relation;
        Ok(())
      }
      _ => Err(GraphError::NotSelective(name)),
    }
  }

  pub fn find_notion(&self, name: &str) -> Option<NotionId> {
    self
      .notions()
      .find(|(_, n)| n.name() == name)
      .map(|(id, _)| id)
  }

  pub fn find_notions(&self, pred: impl Fn(&Notion) -> bool) -> Vec<NotionId> {
    self
      .notions()
      .filter(|(_, n)| pred(n))
      .map(|(id, _)| id)
      .collect()
  }

  pub fn find_relations(&self, pred: impl Fn(&Relation) -> bool) -> Vec<RelationId> {
    self
      .relations()
      .filter(|(_, r)| pred(r))
      .map(|(id, _)| id)
      .collect()
  }

  /// Embeds `other` into this graph and returns the new id of its root, so a
  /// relation can use the nested graph as its object.
  #[instrument(level = "trace", skip(self, other), fields(nested = %other.name))]
  pub fn nest(&mut self, other: Graph) -> Result<NotionId, GraphError> {
    let root = other.require_root()?;
    let notion_base = self.notions.len();
    let relation_base = self.relations.len();
    let shift_n = |id: NotionId| NotionId(id.0 + notion_base);
    let shift_r = |id: RelationId| RelationId(id.0 + relation_base);
    for mut notion in other.notions {
      for id in &mut notion.relations {
        *id = shift_r(*id);
      }
      if let NotionKind::Selective { default } = &mut notion.kind {
        *default = default.map(shift_r);
      }
      self.notions.push(notion);
    }
    for mut relation in other.relations {
      relation.subject = relation.subject.map(shift_n);
      relation.object = relation.object.map(shift_n);
      self.relations.push(relation);
    }
    Ok(shift_n(root))
  }

  fn try_notion(&self, id: NotionId) -> Result<&Notion, GraphError> {
    self.notion(id).ok_or(GraphError::UnknownNotion(id))
  }

  fn try_relation(&self, id: RelationId) -> Result<&Relation, GraphError> {
    self.relation(id).ok_or(GraphError::UnknownRelation(id))
  }

  fn check_subject(&self, subject: NotionId) -> Result<(), GraphError> {
    let notion = self.try_notion(subject)?;
    if notion.is_complex() {
      Ok(())
    } else {
      Err(GraphError::NotComplex(notion.name.clone()))
    }
  }

  fn unlink(&mut self, subject: NotionId, relation: RelationId) {
    let Some(notion) = self.notions.get_mut(subject.0) else {
      return;
    };
    notion.relations.retain(|&r| r != relation);
    if let NotionKind::Selective { default } = &mut notion.kind {
      if *default == Some(relation) {
        *default = None;
      }
    }
  }
}
