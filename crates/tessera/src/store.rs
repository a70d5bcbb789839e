//! The visual model store.
//!
//! A [`VisualModel`] owns every visual entity of one diagram in a single flat,
//! insertion-ordered identifier space, plus a reverse index from represented
//! semantic ids to the visual entities realizing them. One semantic entity can
//! be realized several times (duplicated nodes), so the index maps to a list.
//!
//! All mutation goes through [`VisualModel::add`], [`VisualModel::update`] and
//! [`VisualModel::delete`]. `add` and `update` refuse changes that would make
//! an edge or a group refer to something that does not exist; `delete` is a
//! bare primitive and does not cascade, see [`crate::removal`] for that.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::trace;

use tessera_core::{
    identifier::Id,
    visual::{VisualDiagramNode, VisualEntity, VisualGroup, VisualNode, VisualPatch},
};

use crate::error::TesseraError;

/// One diagram's visual entities.
///
/// # Examples
///
/// ```
/// use tessera::store::VisualModel;
/// use tessera_core::{identifier::Id, visual::{Position, VisualNode}};
///
/// let mut model = VisualModel::new(Id::new("main"));
/// let id = model.generate_id();
/// model
///     .add(VisualNode::new(id, Id::new("Person"), Id::new("vocabulary"), Position::new(0.0, 0.0)))
///     .unwrap();
///
/// assert_eq!(model.get_by_represented(Id::new("Person")).len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct VisualModel {
    id: Id,
    label: String,
    entities: IndexMap<Id, VisualEntity>,
    represented: HashMap<Id, Vec<Id>>,
    next_anonymous: usize,
}

impl VisualModel {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            label: id.to_string(),
            entities: IndexMap::new(),
            represented: HashMap::new(),
            next_anonymous: 0,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns an identifier not used by any entity of this model.
    pub fn generate_id(&mut self) -> Id {
        loop {
            let id = self
                .id
                .create_nested(Id::from_anonymous(self.next_anonymous));
            self.next_anonymous += 1;
            if !self.entities.contains_key(&id) {
                return id;
            }
        }
    }

    /// Adds an entity and returns its identifier.
    ///
    /// # Errors
    ///
    /// - [`TesseraError::DuplicateIdentifier`] if the id is taken.
    /// - [`TesseraError::DanglingReference`] if an edge end is not an existing
    ///   node or diagram node, or a group member is not an existing node,
    ///   diagram node or group.
    /// - [`TesseraError::InvalidGroupOperation`] if a group member already
    ///   belongs to another group.
    pub fn add(&mut self, entity: impl Into<VisualEntity>) -> Result<Id, TesseraError> {
        let entity = entity.into();
        let id = entity.id();
        if self.entities.contains_key(&id) {
            return Err(TesseraError::DuplicateIdentifier(id));
        }

        if let Some((source, target)) = entity.edge_ends() {
            self.check_endpoint(id, source)?;
            self.check_endpoint(id, target)?;
        }
        if let Some(content) = entity.group_content() {
            self.check_group_content(id, content)?;
        }

        if let Some(represented) = entity.represented() {
            self.represented.entry(represented).or_default().push(id);
        }
        trace!(model = self.id.to_string(), entity:% = entity; "Adding visual entity");
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Applies a partial update to an existing entity.
    ///
    /// Patch fields that do not apply to the entity kind are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::MissingReference`] if the entity does not exist,
    /// and the same reference errors as [`VisualModel::add`] for new edge ends
    /// or group members.
    pub fn update(&mut self, id: Id, patch: &VisualPatch) -> Result<(), TesseraError> {
        let entity = self
            .entities
            .get(&id)
            .ok_or(TesseraError::missing("visual entity", id))?;

        if entity.is_edge() {
            if let Some(source) = patch.source() {
                self.check_endpoint(id, source)?;
            }
            if let Some(target) = patch.target() {
                self.check_endpoint(id, target)?;
            }
        }
        if let Some(content) = patch.content().filter(|_| entity.is_group()) {
            self.check_group_content(id, content)?;
        }

        if let Some(entity) = self.entities.get_mut(&id) {
            entity.apply(patch);
            trace!(model = self.id.to_string(), entity:% = entity; "Updated visual entity");
        }
        Ok(())
    }

    /// Removes an entity without touching anything that refers to it.
    pub fn delete(&mut self, id: Id) -> Option<VisualEntity> {
        let entity = self.entities.shift_remove(&id)?;
        if let Some(represented) = entity.represented() {
            if let Some(ids) = self.represented.get_mut(&represented) {
                ids.retain(|other| *other != id);
                if ids.is_empty() {
                    self.represented.remove(&represented);
                }
            }
        }
        trace!(model = self.id.to_string(), entity:% = entity; "Deleted visual entity");
        Some(entity)
    }

    pub fn get(&self, id: Id) -> Option<&VisualEntity> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: Id) -> bool {
        self.entities.contains_key(&id)
    }

    /// Returns all entities in insertion order.
    pub fn entities(&self) -> impl Iterator<Item = &VisualEntity> {
        self.entities.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.entities.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns the entities realizing the semantic entity `represented`, in insertion order.
    pub fn get_by_represented(&self, represented: Id) -> Vec<&VisualEntity> {
        self.represented
            .get(&represented)
            .into_iter()
            .flatten()
            .filter_map(|id| self.entities.get(id))
            .collect()
    }

    pub fn node(&self, id: Id) -> Option<&VisualNode> {
        match self.entities.get(&id) {
            Some(VisualEntity::Node(node)) => Some(node),
            _ => None,
        }
    }

    pub fn diagram_node(&self, id: Id) -> Option<&VisualDiagramNode> {
        match self.entities.get(&id) {
            Some(VisualEntity::DiagramNode(node)) => Some(node),
            _ => None,
        }
    }

    pub fn group(&self, id: Id) -> Option<&VisualGroup> {
        match self.entities.get(&id) {
            Some(VisualEntity::Group(group)) => Some(group),
            _ => None,
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &VisualNode> {
        self.entities.values().filter_map(|entity| match entity {
            VisualEntity::Node(node) => Some(node),
            _ => None,
        })
    }

    pub fn diagram_nodes(&self) -> impl Iterator<Item = &VisualDiagramNode> {
        self.entities.values().filter_map(|entity| match entity {
            VisualEntity::DiagramNode(node) => Some(node),
            _ => None,
        })
    }

    pub fn groups(&self) -> impl Iterator<Item = &VisualGroup> {
        self.entities.values().filter_map(|entity| match entity {
            VisualEntity::Group(group) => Some(group),
            _ => None,
        })
    }

    /// Returns relationship and profile edges.
    pub fn edges(&self) -> impl Iterator<Item = &VisualEntity> {
        self.entities.values().filter(|entity| entity.is_edge())
    }

    /// Returns the ids of the edges with `endpoint` as source or target.
    pub fn edges_incident_to(&self, endpoint: Id) -> Vec<Id> {
        self.edges()
            .filter(|edge| {
                edge.edge_ends()
                    .is_some_and(|(source, target)| source == endpoint || target == endpoint)
            })
            .map(VisualEntity::id)
            .collect()
    }

    /// Checks every structural invariant of the model.
    ///
    /// - every edge end is an existing node or diagram node;
    /// - every group member is an existing node, diagram node or group;
    /// - no id is a member of two groups;
    /// - every top-level group has at least two members, nested groups at least one.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::Invariant`] describing the first violation found.
    pub fn verify(&self) -> Result<(), TesseraError> {
        let mut owners: HashMap<Id, Id> = HashMap::new();

        for entity in self.entities.values() {
            for reference in entity.references() {
                let Some(referenced) = self.entities.get(&reference) else {
                    return Err(TesseraError::Invariant(format!(
                        "{} `{}` refers to missing `{reference}`",
                        entity.kind_name(),
                        entity.id()
                    )));
                };
                let valid = if entity.is_edge() {
                    referenced.is_edge_endpoint()
                } else {
                    referenced.is_edge_endpoint() || referenced.is_group()
                };
                if !valid {
                    return Err(TesseraError::Invariant(format!(
                        "{} `{}` refers to {} `{reference}`",
                        entity.kind_name(),
                        entity.id(),
                        referenced.kind_name()
                    )));
                }
            }

            if let Some(content) = entity.group_content() {
                for member in content {
                    if let Some(owner) = owners.insert(*member, entity.id()) {
                        return Err(TesseraError::Invariant(format!(
                            "`{member}` is a member of both `{owner}` and `{}`",
                            entity.id()
                        )));
                    }
                }
            }
        }

        for group in self.groups() {
            let minimum = if owners.contains_key(&group.id()) { 1 } else { 2 };
            if group.content().len() < minimum {
                return Err(TesseraError::Invariant(format!(
                    "group `{}` has {} member(s)",
                    group.id(),
                    group.content().len()
                )));
            }
        }

        Ok(())
    }

    fn check_endpoint(&self, entity: Id, endpoint: Id) -> Result<(), TesseraError> {
        match self.entities.get(&endpoint) {
            Some(target) if target.is_edge_endpoint() => Ok(()),
            Some(_) => Err(TesseraError::DanglingReference {
                entity,
                reference: endpoint,
                reason: "edges may only connect nodes and diagram nodes",
            }),
            None => Err(TesseraError::DanglingReference {
                entity,
                reference: endpoint,
                reason: "no such entity",
            }),
        }
    }

    fn check_group_content(&self, group: Id, content: &[Id]) -> Result<(), TesseraError> {
        let mut seen = HashSet::new();
        for member in content {
            if *member == group {
                return Err(TesseraError::InvalidGroupOperation(format!(
                    "group `{group}` cannot contain itself"
                )));
            }
            if !seen.insert(*member) {
                return Err(TesseraError::InvalidGroupOperation(format!(
                    "`{member}` is listed twice in group `{group}`"
                )));
            }
            match self.entities.get(member) {
                Some(entity) if entity.is_edge_endpoint() || entity.is_group() => {}
                Some(_) => {
                    return Err(TesseraError::DanglingReference {
                        entity: group,
                        reference: *member,
                        reason: "groups may only contain nodes, diagram nodes and groups",
                    });
                }
                None => {
                    return Err(TesseraError::DanglingReference {
                        entity: group,
                        reference: *member,
                        reason: "no such entity",
                    });
                }
            }
            let owner = self
                .groups()
                .find(|other| other.id() != group && other.content().contains(member));
            if let Some(owner) = owner {
                return Err(TesseraError::InvalidGroupOperation(format!(
                    "`{member}` already belongs to group `{}`",
                    owner.id()
                )));
            }
        }
        Ok(())
    }
}
