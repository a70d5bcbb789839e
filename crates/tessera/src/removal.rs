//! Cascading removal.
//!
//! Removal runs in two phases. A *collect* phase computes the closure of what
//! has to go for a request, without touching the model:
//!
//! - [`collect_direct_visual_entities_to_remove`] starts from visual ids;
//! - [`collect_indirect_visual_entities_to_remove`] starts from semantic ids
//!   and also finds edges that only exist because a removed class is hidden
//!   behind a diagram node.
//!
//! The *commit* phase, [`remove_visual_entities_from_visual_model`], applies a
//! [`RemovalSet`] so that every intermediate state keeps edges and groups
//! pointing at existing entities: groups first, then edges, then endpoints.

use std::collections::HashSet;

use indexmap::IndexSet;
use log::{debug, info, trace};

use tessera_core::{
    identifier::Id,
    semantic::SemanticModelProvider,
    visual::VisualEntity,
};

use crate::{
    error::TesseraError,
    group::{group_mappings, remove_group, remove_part_of_group_content},
    registry::VisualModelRegistry,
    store::VisualModel,
};

/// What a removal request deletes from one visual model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalSet {
    entities: IndexSet<Id>,
    containing_groups: IndexSet<Id>,
}

impl RemovalSet {
    /// Entities to delete, in discovery order.
    pub fn entities(&self) -> impl Iterator<Item = Id> + '_ {
        self.entities.iter().copied()
    }

    /// Groups that survive but lose members.
    pub fn containing_groups(&self) -> impl Iterator<Item = Id> + '_ {
        self.containing_groups
            .iter()
            .copied()
            .filter(|group| !self.entities.contains(group))
    }

    pub fn contains(&self, id: Id) -> bool {
        self.entities.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn merge(&mut self, other: RemovalSet) {
        self.entities.extend(other.entities);
        self.containing_groups.extend(other.containing_groups);
    }

    fn insert_direct(&mut self, model: &VisualModel, id: Id) {
        if !self.entities.insert(id) {
            return;
        }
        for edge in model.edges_incident_to(id) {
            self.entities.insert(edge);
        }
        if let Some(parent) = group_mappings(model).parent_of(id) {
            self.containing_groups.insert(parent);
        }
    }
}

/// Collects `ids`, every edge attached to them and the groups containing them.
///
/// # Errors
///
/// Returns [`TesseraError::MissingReference`] for the first id that is not in the model.
pub fn collect_direct_visual_entities_to_remove(
    model: &VisualModel,
    ids: &[Id],
) -> Result<RemovalSet, TesseraError> {
    let mut set = RemovalSet::default();
    for id in ids {
        if !model.contains(*id) {
            return Err(TesseraError::missing("visual entity", *id));
        }
        set.insert_direct(model, *id);
    }
    trace!(model = model.id().to_string(), count = set.len(); "Collected direct removals");
    Ok(set)
}

/// Collects everything to remove from `model` when the semantic entities
/// `represented` disappear.
///
/// On top of the direct closure of every visual realization, an edge attached
/// to a diagram node is collected when the removed class is hidden behind
/// that diagram node (at any nesting depth) and is the semantic domain or
/// range of the edge.
///
/// # Errors
///
/// Returns [`TesseraError::MissingReference`] if `model` is not registered.
pub fn collect_indirect_visual_entities_to_remove(
    registry: &VisualModelRegistry,
    model: Id,
    semantic: &dyn SemanticModelProvider,
    represented: &[Id],
) -> Result<RemovalSet, TesseraError> {
    let visual_model = registry.model(model)?;
    let mut set = RemovalSet::default();

    for id in represented {
        let realizations: Vec<Id> = visual_model
            .get_by_represented(*id)
            .into_iter()
            .map(VisualEntity::id)
            .collect();
        for realization in realizations {
            set.insert_direct(visual_model, realization);
        }
    }

    let hidden = registry.diagram_node_index(model);
    for class in represented {
        let Some(diagram_nodes) = hidden.get(class) else {
            continue;
        };
        for diagram_node in diagram_nodes {
            for edge in visual_model.edges_incident_to(*diagram_node) {
                let Some(entity) = visual_model.get(edge) else {
                    continue;
                };
                if touches_class(entity, *class, semantic) {
                    debug!(
                        edge = edge.to_string(),
                        class = class.to_string(),
                        diagram_node = diagram_node.to_string();
                        "Edge loses its hidden end"
                    );
                    set.insert_direct(visual_model, edge);
                }
            }
        }
    }

    Ok(set)
}

/// Returns true if the semantic entity behind `edge` has `class` at one end.
fn touches_class(edge: &VisualEntity, class: Id, semantic: &dyn SemanticModelProvider) -> bool {
    match edge {
        VisualEntity::Relationship(edge) => semantic
            .relationship_ends(edge.represented_relationship())
            .is_some_and(|(domain, range)| domain == class || range == class),
        VisualEntity::ProfileRelationship(edge) => {
            edge.entity() == class
                || semantic
                    .class_profiles()
                    .iter()
                    .find(|profile| profile.id() == edge.entity())
                    .is_some_and(|profile| profile.profiling().contains(&class))
        }
        _ => false,
    }
}

/// Applies `set` to `model`.
///
/// Groups listed in the set are removed with [`remove_group`]; surviving
/// groups that lose members are shrunk with [`remove_part_of_group_content`],
/// each at most once. Edges are deleted before nodes and diagram nodes.
///
/// Returns how many entities left the model, dissolved groups included.
///
/// # Errors
///
/// Propagates store errors; on error the model may be partially updated and
/// callers are expected to restore a checkpoint.
pub fn remove_visual_entities_from_visual_model(
    model: &mut VisualModel,
    set: &RemovalSet,
) -> Result<usize, TesseraError> {
    let before = model.len();
    let mut processed: HashSet<Id> = HashSet::new();

    for id in set.entities() {
        if model.group(id).is_some() && processed.insert(id) {
            remove_group(model, id)?;
        }
    }

    for group in set.containing_groups() {
        if !processed.insert(group) {
            continue;
        }
        let Some(content) = model.group(group).map(|g| g.content().to_vec()) else {
            // Dissolved while processing another group.
            continue;
        };
        let doomed: Vec<Id> = content.into_iter().filter(|m| set.contains(*m)).collect();
        if doomed.is_empty() {
            continue;
        }
        if remove_part_of_group_content(model, group, &doomed)? {
            trace!(group = group.to_string(); "Group dissolved by removal");
        }
    }

    let (edges, endpoints): (Vec<Id>, Vec<Id>) = set
        .entities()
        .filter(|id| model.get(*id).is_some_and(|entity| !entity.is_group()))
        .partition(|id| model.get(*id).is_some_and(VisualEntity::is_edge));
    for id in edges.into_iter().chain(endpoints) {
        model.delete(id);
    }

    let removed = before - model.len();
    info!(model = model.id().to_string(), removed = removed; "Removed visual entities");
    Ok(removed)
}
