//! The group forest.
//!
//! Groups cluster nodes, diagram nodes and other groups. A group only knows
//! its members; parentage is reconstructed on demand by [`GroupMappings`].
//!
//! After every operation of this module:
//!
//! - an id is a member of at most one group;
//! - a top-level group has at least two members;
//! - a nested group has at least one member.
//!
//! A nested group reduced to one member is left alone: its parent still gives
//! it a reason to exist. When a group dissolves and one of its members is a
//! group, that member becomes top-level and is dissolved in turn if it has
//! fewer than two members.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::{debug, trace};

use tessera_core::{
    identifier::Id,
    visual::{VisualGroup, VisualPatch},
};

use crate::{error::TesseraError, store::VisualModel};

/// Derived view of the group forest of one visual model.
#[derive(Debug, Clone, Default)]
pub struct GroupMappings {
    groups: IndexMap<Id, Vec<Id>>,
    parents: HashMap<Id, Id>,
}

impl GroupMappings {
    /// Scans every group of `model`.
    pub fn new(model: &VisualModel) -> Self {
        let mut mappings = Self::default();
        for group in model.groups() {
            for member in group.content() {
                mappings.parents.insert(*member, group.id());
            }
            mappings.groups.insert(group.id(), group.content().to_vec());
        }
        mappings
    }

    /// Returns `(group, members)` for every group in model order.
    pub fn groups(&self) -> impl Iterator<Item = (Id, &[Id])> {
        self.groups.iter().map(|(id, content)| (*id, content.as_slice()))
    }

    pub fn content(&self, group: Id) -> Option<&[Id]> {
        self.groups.get(&group).map(Vec::as_slice)
    }

    /// Returns the group whose content lists `id` directly.
    pub fn parent_of(&self, id: Id) -> Option<Id> {
        self.parents.get(&id).copied()
    }

    /// Returns the outermost group containing `id`, or `None` if `id` is not
    /// a member of any group.
    pub fn top_level_group(&self, id: Id) -> Option<Id> {
        let mut visited = HashSet::new();
        let mut current = self.parent_of(id)?;
        while let Some(parent) = self.parent_of(current) {
            if !visited.insert(current) {
                break;
            }
            current = parent;
        }
        Some(current)
    }

    pub fn is_top_level(&self, group: Id) -> bool {
        self.groups.contains_key(&group) && !self.parents.contains_key(&group)
    }

    /// Returns every member of `group`, transitively, groups included.
    pub fn descendants(&self, group: Id) -> Vec<Id> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![group];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(content) = self.groups.get(&current) {
                for member in content.iter().rev() {
                    out.push(*member);
                    stack.push(*member);
                }
            }
        }
        out
    }
}

/// Shorthand for [`GroupMappings::new`].
pub fn group_mappings(model: &VisualModel) -> GroupMappings {
    GroupMappings::new(model)
}

/// Returns the outermost group containing `id`.
pub fn find_top_level_group(model: &VisualModel, id: Id) -> Option<Id> {
    group_mappings(model).top_level_group(id)
}

/// Creates a group over `members` and returns its id.
///
/// A member that already belongs to a group is replaced by its top-level
/// group, so grouping a node of an existing group wraps that whole group.
/// Duplicates are dropped, keeping the first occurrence.
///
/// # Errors
///
/// - [`TesseraError::MissingReference`] if a member does not exist.
/// - [`TesseraError::InvalidGroupOperation`] if a member is an edge or fewer
///   than two distinct members remain. The model is left untouched.
pub fn add_group(
    model: &mut VisualModel,
    members: &[Id],
    anchored: Option<bool>,
) -> Result<Id, TesseraError> {
    let mappings = group_mappings(model);

    let mut content = Vec::new();
    for member in members {
        let entity = model
            .get(*member)
            .ok_or(TesseraError::missing("visual entity", *member))?;
        if entity.is_edge() {
            return Err(TesseraError::InvalidGroupOperation(format!(
                "{} `{member}` cannot be grouped",
                entity.kind_name()
            )));
        }
        let top_level = mappings.top_level_group(*member).unwrap_or(*member);
        if !content.contains(&top_level) {
            content.push(top_level);
        }
    }

    if content.len() < 2 {
        return Err(TesseraError::InvalidGroupOperation(format!(
            "a group needs at least two distinct top-level members, got {}",
            content.len()
        )));
    }

    let id = model.generate_id();
    model.add(VisualGroup::new(id, content).with_anchored(anchored))?;
    debug!(model = model.id().to_string(), group = id.to_string(); "Created group");
    Ok(id)
}

/// Removes `ids` from the content of `group`.
///
/// The group dissolves when it is left empty, or with a single member while
/// top-level; a dissolved group is also removed from its parent, which may
/// dissolve in turn. Ids that are not members are ignored.
///
/// Returns whether `group` was dissolved.
///
/// # Errors
///
/// Returns [`TesseraError::MissingReference`] if `group` is not a group of the model.
pub fn remove_part_of_group_content(
    model: &mut VisualModel,
    group: Id,
    ids: &[Id],
) -> Result<bool, TesseraError> {
    let content = model
        .group(group)
        .ok_or(TesseraError::missing("group", group))?
        .content()
        .to_vec();
    let parent = group_mappings(model).parent_of(group);

    let (removed, kept): (Vec<Id>, Vec<Id>) =
        content.into_iter().partition(|member| ids.contains(member));

    let dissolve = kept.is_empty() || (kept.len() == 1 && parent.is_none());
    if dissolve {
        model.delete(group);
        trace!(group = group.to_string(), remaining = kept.len(); "Dissolved group");
        match parent {
            Some(parent) => {
                remove_part_of_group_content(model, parent, &[group])?;
            }
            None => {
                for member in &kept {
                    normalize_promoted(model, *member);
                }
            }
        }
    } else {
        model.update(group, &VisualPatch::new().with_content(kept))?;
    }

    for member in removed {
        normalize_promoted(model, member);
    }

    Ok(dissolve)
}

/// Deletes `group` whatever its content and detaches it from its parent.
///
/// The members of `group` stay in the model as top-level entities.
///
/// # Errors
///
/// - [`TesseraError::MissingReference`] if `group` does not exist.
/// - [`TesseraError::InvalidGroupOperation`] if `group` is not a group.
pub fn remove_group(model: &mut VisualModel, group: Id) -> Result<(), TesseraError> {
    let entity = model
        .get(group)
        .ok_or(TesseraError::missing("group", group))?;
    let Some(content) = entity.group_content().map(<[Id]>::to_vec) else {
        return Err(TesseraError::InvalidGroupOperation(format!(
            "`{group}` is a {}, not a group",
            entity.kind_name()
        )));
    };

    let owners: Vec<Id> = model
        .groups()
        .filter(|other| other.id() != group && other.content().contains(&group))
        .map(VisualGroup::id)
        .collect();

    model.delete(group);
    for owner in owners {
        if model.group(owner).is_some() {
            remove_part_of_group_content(model, owner, &[group])?;
        }
    }
    for member in content {
        normalize_promoted(model, member);
    }

    debug!(model = model.id().to_string(), group = group.to_string(); "Removed group");
    Ok(())
}

/// Dissolves every top-level group with fewer than two members.
///
/// Used after copying a partial forest into another model, where a nested
/// group can end up top-level.
pub(crate) fn normalize_forest(model: &mut VisualModel) {
    let groups: Vec<Id> = model.groups().map(VisualGroup::id).collect();
    for group in groups {
        normalize_promoted(model, group);
    }
}

/// Returns the groups of `model` ordered so that every group comes after all
/// the groups it contains.
pub(crate) fn groups_innermost_first(model: &VisualModel) -> Vec<Id> {
    let mappings = group_mappings(model);
    let mut ordered: Vec<(usize, Id)> = mappings
        .groups()
        .map(|(group, _)| {
            let mut depth = 0;
            let mut current = group;
            while let Some(parent) = mappings.parent_of(current) {
                depth += 1;
                if depth > mappings.groups.len() {
                    break;
                }
                current = parent;
            }
            (depth, group)
        })
        .collect();
    // Stable sort keeps model order among groups of the same depth.
    ordered.sort_by(|a, b| b.0.cmp(&a.0));
    ordered.into_iter().map(|(_, group)| group).collect()
}

/// Dissolves `id` if it is a top-level group with fewer than two members,
/// then does the same for whatever it leaves behind.
fn normalize_promoted(model: &mut VisualModel, id: Id) {
    let mappings = group_mappings(model);
    if !mappings.is_top_level(id) {
        return;
    }
    let Some(content) = mappings.content(id) else {
        return;
    };
    if content.len() >= 2 {
        return;
    }

    let leftover = content.to_vec();
    model.delete(id);
    trace!(group = id.to_string(); "Dissolved promoted group");
    for member in leftover {
        normalize_promoted(model, member);
    }
}
