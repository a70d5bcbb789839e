//! Neighborhood materializer.
//!
//! Derives the visual edges a node or diagram node should have from the
//! semantic model and adds the ones that are missing. Running it again adds
//! nothing; running it after an edge was deleted adds that edge back.
//!
//! Relationships, relationship profiles and generalizations become
//! [`VisualRelationship`]s, class profiles become [`VisualProfileRelationship`]s
//! towards every profiled class.

use std::collections::HashMap;

use log::{debug, trace};

use tessera_core::{
    geometry::Point,
    identifier::Id,
    semantic::{SemanticLink, SemanticModelProvider},
    visual::{Position, VisualNode, VisualProfileRelationship, VisualRelationship},
};

use crate::{
    config::EngineConfig, error::TesseraError, registry::VisualModelRegistry, store::VisualModel,
};

/// Adds every missing edge between `diagram_node` and the rest of `model`.
///
/// A semantic link is drawn when exactly one of its ends is hidden behind
/// the diagram node; the other end is attached to every node representing
/// it and every other diagram node hiding it. Links with both ends hidden
/// behind the diagram node are not drawn.
///
/// Returns the ids of the created edges.
///
/// # Errors
///
/// Returns [`TesseraError::MissingReference`] if the model or the diagram node
/// does not exist.
pub fn add_all_relationships_for_visual_diagram_node(
    registry: &mut VisualModelRegistry,
    semantic: &dyn SemanticModelProvider,
    model: Id,
    diagram_node: Id,
) -> Result<Vec<Id>, TesseraError> {
    let visual_model = registry.model(model)?;
    let represented_model = visual_model
        .diagram_node(diagram_node)
        .ok_or(TesseraError::missing("diagram node", diagram_node))?
        .represented_visual_model();
    let hidden = registry.represented_entities(represented_model);
    let index = registry.diagram_node_index(model);

    let mut wanted = Vec::new();
    for link in semantic.links() {
        let source_hidden = hidden.contains(&link.source);
        let target_hidden = hidden.contains(&link.target);
        if source_hidden == target_hidden {
            continue;
        }
        let outside = if source_hidden { link.target } else { link.source };
        for other in endpoints_for(visual_model, &index, outside) {
            if other == diagram_node {
                continue;
            }
            let ends = if source_hidden {
                (diagram_node, other)
            } else {
                (other, diagram_node)
            };
            wanted.push((link, ends));
        }
    }

    let visual_model = registry.model_mut(model)?;
    let created = add_missing_edges(visual_model, &wanted)?;
    debug!(
        model = model.to_string(),
        diagram_node = diagram_node.to_string(),
        created = created.len();
        "Materialized diagram node relationships"
    );
    Ok(created)
}

/// Adds the neighbourhood of the visual entity `entity`.
///
/// For a diagram node this is
/// [`add_all_relationships_for_visual_diagram_node`]. For a node, every class
/// linked to the represented class that has no visual realization in `model`
/// gets a node, placed in a row below the focused node and showing its
/// attributes; then every missing edge between the focused node and the
/// realizations of its neighbours is added.
///
/// Returns the ids of the created nodes and edges.
///
/// # Errors
///
/// Returns [`TesseraError::MissingReference`] if the model or the entity does
/// not exist, or if the entity is neither a node nor a diagram node.
pub fn add_entity_neighborhood(
    registry: &mut VisualModelRegistry,
    semantic: &dyn SemanticModelProvider,
    model: Id,
    entity: Id,
    config: &EngineConfig,
) -> Result<Vec<Id>, TesseraError> {
    let visual_model = registry.model(model)?;
    if visual_model.diagram_node(entity).is_some() {
        return add_all_relationships_for_visual_diagram_node(registry, semantic, model, entity);
    }
    let focus = visual_model
        .node(entity)
        .ok_or(TesseraError::missing("node", entity))?;
    let class = focus.represented_entity();
    let origin = focus.position().point();

    let links: Vec<SemanticLink> = semantic
        .links()
        .into_iter()
        .filter(|link| link.source == class || link.target == class)
        .collect();

    let index = registry.diagram_node_index(model);
    let mut missing_neighbours: Vec<(Id, Id)> = Vec::new();
    for link in &links {
        let neighbour = if link.source == class {
            link.target
        } else {
            link.source
        };
        let known = !endpoints_for(visual_model, &index, neighbour).is_empty()
            || missing_neighbours.iter().any(|(queued, _)| *queued == neighbour);
        if !known && semantic.is_class_like(neighbour) {
            let owner = semantic
                .find_source_model_of_entity(neighbour)
                .unwrap_or(link.model);
            missing_neighbours.push((neighbour, owner));
        }
    }

    let visual_model = registry.model_mut(model)?;
    let mut created = Vec::new();
    let sizes = config.sizes();
    let spacing = config.neighborhood().spacing();
    let count = missing_neighbours.len();
    for (idx, (neighbour, owner)) in missing_neighbours.into_iter().enumerate() {
        let step = sizes.node_width() + spacing;
        let x = origin.x() + (idx as f32 - (count as f32 - 1.0) / 2.0) * step;
        let y = origin.y() + sizes.node_height() + spacing;

        let id = visual_model.generate_id();
        visual_model.add(
            VisualNode::new(id, neighbour, owner, Position::from_point(Point::new(x, y)))
                .with_content(semantic.attributes_of(neighbour)),
        )?;
        trace!(node = id.to_string(), class = neighbour.to_string(); "Placed neighbour");
        created.push(id);
    }

    let mut wanted = Vec::new();
    for link in links {
        let forward = link.source == class;
        let backward = link.target == class;
        if forward {
            for other in endpoints_for(visual_model, &index, link.target) {
                wanted.push((link, (entity, other)));
            }
        }
        if backward {
            for other in endpoints_for(visual_model, &index, link.source) {
                if !(forward && other == entity) {
                    wanted.push((link, (other, entity)));
                }
            }
        }
    }
    created.extend(add_missing_edges(visual_model, &wanted)?);

    debug!(
        model = model.to_string(),
        entity = entity.to_string(),
        created = created.len();
        "Materialized entity neighbourhood"
    );
    Ok(created)
}

/// Nodes representing `class` and diagram nodes hiding it.
fn endpoints_for(model: &VisualModel, index: &HashMap<Id, Vec<Id>>, class: Id) -> Vec<Id> {
    let mut endpoints: Vec<Id> = model
        .get_by_represented(class)
        .into_iter()
        .filter(|entity| entity.is_edge_endpoint())
        .map(|entity| entity.id())
        .collect();
    if let Some(diagram_nodes) = index.get(&class) {
        endpoints.extend(diagram_nodes.iter().copied());
    }
    endpoints
}

fn add_missing_edges(
    model: &mut VisualModel,
    wanted: &[(SemanticLink, (Id, Id))],
) -> Result<Vec<Id>, TesseraError> {
    let mut created = Vec::new();
    for (link, (source, target)) in wanted {
        let exists = model
            .get_by_represented(link.id)
            .iter()
            .any(|edge| edge.is_edge() && edge.edge_ends() == Some((*source, *target)));
        if exists {
            continue;
        }

        let id = model.generate_id();
        if link.kind.is_profile_edge() {
            model.add(VisualProfileRelationship::new(
                id, link.id, link.model, *source, *target,
            ))?;
        } else {
            model.add(VisualRelationship::new(
                id, link.id, link.model, *source, *target,
            ))?;
        }
        trace!(edge = id.to_string(), represented = link.id.to_string(); "Added missing edge");
        created.push(id);
    }
    Ok(created)
}
