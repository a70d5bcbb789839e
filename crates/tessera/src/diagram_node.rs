//! Diagram nodes: collapsing part of a visual model into a nested one and
//! expanding it back.
//!
//! Collapsing moves a selection into a fresh visual model and leaves a
//! [`VisualDiagramNode`] in its place; edges crossing the selection boundary
//! are reattached to the diagram node. Expanding copies the content of the
//! nested model next to the diagram node and reattaches those edges to the
//! copies, using the semantic model to find the right copy:
//!
//! 1. a copy representing the class at that end of the edge;
//! 2. a copied diagram node hiding that class, at any depth;
//! 3. a copy representing a specialization of the class.
//!
//! An edge that cannot be reattached is deleted. When several copies qualify,
//! edges of the same relationship are spread over them round-robin.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use log::{debug, info, trace, warn};

use tessera_core::{
    geometry::Point,
    identifier::Id,
    semantic::SemanticModelProvider,
    visual::{Position, VisualDiagramNode, VisualEntity, VisualGroup, VisualPatch},
};

use crate::{
    alignment::{bounding_box, offset_between},
    config::EngineConfig,
    error::TesseraError,
    group::{group_mappings, groups_innermost_first, normalize_forest},
    hierarchy::GeneralizationHierarchy,
    layout::{LayoutEngine, SizeQuery, apply_layout_result},
    registry::VisualModelRegistry,
    removal::{collect_direct_visual_entities_to_remove, remove_visual_entities_from_visual_model},
    store::VisualModel,
};

/// Result of collapsing a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapseOutcome {
    diagram_node: Id,
    visual_model: Id,
    rerouted: usize,
}

impl CollapseOutcome {
    /// The diagram node left in place of the selection.
    pub fn diagram_node(&self) -> Id {
        self.diagram_node
    }

    /// The visual model created for the selection.
    pub fn visual_model(&self) -> Id {
        self.visual_model
    }

    /// Number of boundary-crossing edges reattached to the diagram node.
    pub fn rerouted(&self) -> usize {
        self.rerouted
    }
}

/// Result of expanding a diagram node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandOutcome {
    copies: IndexMap<Id, Id>,
    rerouted: usize,
    deleted_edges: Vec<Id>,
    layout_error: Option<String>,
}

impl ExpandOutcome {
    /// Maps ids of the nested model to the ids of their copies.
    pub fn copies(&self) -> &IndexMap<Id, Id> {
        &self.copies
    }

    pub fn rerouted(&self) -> usize {
        self.rerouted
    }

    /// Edges deleted because no copy could take their end.
    pub fn deleted_edges(&self) -> &[Id] {
        &self.deleted_edges
    }

    /// Set when the layout failed; the copies then keep their translated positions.
    pub fn layout_error(&self) -> Option<&str> {
        self.layout_error.as_deref()
    }
}

/// Moves `selection` of `model` into a new visual model and puts a diagram
/// node for it at `viewport_center`.
///
/// Selected groups bring their whole content. The new model receives copies
/// of the selected nodes and diagram nodes, of the edges between them and of
/// the groups lying entirely inside the selection.
///
/// # Errors
///
/// - [`TesseraError::MissingReference`] if `model` or a selected id does not exist.
/// - [`TesseraError::InvalidDiagramOperation`] if the selection has no node.
pub fn add_visual_diagram_node_for_new_model(
    registry: &mut VisualModelRegistry,
    model: Id,
    selection: &[Id],
    viewport_center: Point,
    config: &EngineConfig,
) -> Result<CollapseOutcome, TesseraError> {
    let new_model_id = registry.generate_model_id();
    let parent = registry.model(model)?;
    let mappings = group_mappings(parent);

    let mut endpoints: IndexSet<Id> = IndexSet::new();
    for id in selection {
        let entity = parent
            .get(*id)
            .ok_or(TesseraError::missing("visual entity", *id))?;
        if entity.is_edge_endpoint() {
            endpoints.insert(*id);
        } else if entity.is_group() {
            for member in mappings.descendants(*id) {
                if parent.get(member).is_some_and(VisualEntity::is_edge_endpoint) {
                    endpoints.insert(member);
                }
            }
        }
    }
    if endpoints.is_empty() {
        return Err(TesseraError::InvalidDiagramOperation(
            "the selection contains no node to collapse".to_string(),
        ));
    }

    let contained: Vec<Id> = mappings
        .groups()
        .map(|(group, _)| group)
        .filter(|group| {
            let members: Vec<Id> = mappings
                .descendants(*group)
                .into_iter()
                .filter(|member| parent.get(*member).is_some_and(VisualEntity::is_edge_endpoint))
                .collect();
            !members.is_empty() && members.iter().all(|member| endpoints.contains(member))
        })
        .collect();

    let mut internal = Vec::new();
    let mut crossing = Vec::new();
    for edge in parent.edges() {
        let Some((source, target)) = edge.edge_ends() else {
            continue;
        };
        match (endpoints.contains(&source), endpoints.contains(&target)) {
            (true, true) => internal.push(edge.id()),
            (false, false) => {}
            (source_inside, _) => crossing.push((edge.id(), source_inside)),
        }
    }

    let mut copied: IndexSet<Id> = endpoints.clone();
    copied.extend(internal.iter().copied());
    copied.extend(contained.iter().copied());

    let mut sub = VisualModel::new(new_model_id);
    copy_into(parent, &copied, &mut sub, Point::default())?;
    let label = sub.label().to_string();
    registry.insert(sub)?;

    let parent = registry.model_mut(model)?;
    let sizes = config.sizes();
    let top_left = viewport_center.sub_point(Point::new(
        sizes.diagram_node_width() / 2.0,
        sizes.diagram_node_height() / 2.0,
    ));
    let diagram_node = parent.generate_id();
    parent.add(
        VisualDiagramNode::new(diagram_node, new_model_id, Position::from_point(top_left))
            .with_label(label),
    )?;

    for (edge, source_inside) in &crossing {
        let patch = if *source_inside {
            VisualPatch::new().with_source(diagram_node)
        } else {
            VisualPatch::new().with_target(diagram_node)
        };
        parent.update(*edge, &patch)?;
        trace!(edge = edge.to_string(); "Reattached edge to diagram node");
    }

    let mut doomed: Vec<Id> = endpoints.into_iter().collect();
    doomed.extend(contained);
    let set = collect_direct_visual_entities_to_remove(parent, &doomed)?;
    remove_visual_entities_from_visual_model(parent, &set)?;

    info!(
        model = model.to_string(),
        visual_model = new_model_id.to_string(),
        diagram_node = diagram_node.to_string(),
        rerouted = crossing.len();
        "Collapsed selection into diagram node"
    );
    Ok(CollapseOutcome {
        diagram_node,
        visual_model: new_model_id,
        rerouted: crossing.len(),
    })
}

/// Places a diagram node for the existing visual model `represented` in `model`.
///
/// # Errors
///
/// - [`TesseraError::MissingReference`] if either model is not registered.
/// - [`TesseraError::InvalidDiagramOperation`] if `model` would end up
///   containing itself.
pub fn add_visual_diagram_node_for_existing_model(
    registry: &mut VisualModelRegistry,
    model: Id,
    represented: Id,
    position: Point,
) -> Result<Id, TesseraError> {
    let label = registry.model(represented)?.label().to_string();
    registry.model(model)?;
    if registry.would_create_cycle(model, represented) {
        return Err(TesseraError::InvalidDiagramOperation(format!(
            "visual model `{model}` cannot contain `{represented}`, which already contains it"
        )));
    }

    let parent = registry.model_mut(model)?;
    let id = parent.generate_id();
    parent.add(
        VisualDiagramNode::new(id, represented, Position::from_point(position)).with_label(label),
    )?;
    debug!(model = model.to_string(), diagram_node = id.to_string(); "Added diagram node");
    Ok(id)
}

/// Copies the content of the model behind `diagram_node` into `model`.
///
/// The copies are translated so that the top-left corner of the nested
/// content lands on the diagram node position. Edges attached to the diagram
/// node are reattached to the copies; overlap with the rest of the model is
/// then resolved by `layout`, keeping the copies fixed. The diagram node
/// itself stays.
///
/// # Errors
///
/// - [`TesseraError::MissingReference`] if the model, the diagram node or the
///   nested model does not exist.
/// - Store errors while copying; the registry may then be partially updated.
///
/// A failing layout is not an error: it is reported in the outcome.
pub fn put_visual_diagram_node_content_to_visual_model(
    registry: &mut VisualModelRegistry,
    semantic: &dyn SemanticModelProvider,
    model: Id,
    diagram_node: Id,
    layout: &dyn LayoutEngine,
    config: &EngineConfig,
    sizes: &dyn SizeQuery,
) -> Result<ExpandOutcome, TesseraError> {
    let parent = registry.model(model)?;
    let node = parent
        .diagram_node(diagram_node)
        .ok_or(TesseraError::missing("diagram node", diagram_node))?;
    let anchor = node.position().point();
    let sub = registry.model(node.represented_visual_model())?.clone();

    let hidden: HashMap<Id, IndexSet<Id>> = sub
        .diagram_nodes()
        .map(|nested| {
            (
                nested.id(),
                registry.represented_entities(nested.represented_visual_model()),
            )
        })
        .collect();
    let sub_ids: Vec<Id> = sub.ids().collect();
    let offset = bounding_box(&sub, &sub_ids, sizes)
        .map(|bounds| offset_between(bounds.min_point(), anchor))
        .unwrap_or_default();
    let hierarchy = GeneralizationHierarchy::new(semantic);

    let everything: IndexSet<Id> = sub_ids.into_iter().collect();
    let parent = registry.model_mut(model)?;
    let copies = copy_into(&sub, &everything, parent, offset)?;

    let targets = RerouteTargets::new(parent, &copies, &hidden);
    let (rerouted, deleted_edges) =
        reroute_edges(parent, semantic, &hierarchy, diagram_node, &targets)?;

    let layout_error = layout_copies(parent, semantic, &copies, layout, config, sizes)?;

    semantic.request_revalidation();
    info!(
        model = model.to_string(),
        diagram_node = diagram_node.to_string(),
        copied = copies.len(),
        rerouted = rerouted,
        deleted = deleted_edges.len();
        "Expanded diagram node"
    );
    Ok(ExpandOutcome {
        copies,
        rerouted,
        deleted_edges,
        layout_error,
    })
}

/// Expands `diagram_node` and then removes it.
///
/// # Errors
///
/// Same as [`put_visual_diagram_node_content_to_visual_model`].
pub fn dissolve_visual_diagram_node(
    registry: &mut VisualModelRegistry,
    semantic: &dyn SemanticModelProvider,
    model: Id,
    diagram_node: Id,
    layout: &dyn LayoutEngine,
    config: &EngineConfig,
    sizes: &dyn SizeQuery,
) -> Result<ExpandOutcome, TesseraError> {
    let outcome = put_visual_diagram_node_content_to_visual_model(
        registry,
        semantic,
        model,
        diagram_node,
        layout,
        config,
        sizes,
    )?;

    let parent = registry.model_mut(model)?;
    let set = collect_direct_visual_entities_to_remove(parent, &[diagram_node])?;
    remove_visual_entities_from_visual_model(parent, &set)?;
    debug!(model = model.to_string(), diagram_node = diagram_node.to_string(); "Dissolved diagram node");
    Ok(outcome)
}

/// Copies the entities `ids` of `source` into `target`, translating positions
/// and waypoints by `offset`.
///
/// Edges are copied only when both ends are copied, groups only when all
/// their members are. Returns the map from source ids to copy ids.
fn copy_into(
    source: &VisualModel,
    ids: &IndexSet<Id>,
    target: &mut VisualModel,
    offset: Point,
) -> Result<IndexMap<Id, Id>, TesseraError> {
    let mut mapping = IndexMap::new();

    let endpoints = source
        .entities()
        .filter(|entity| entity.is_edge_endpoint() && ids.contains(&entity.id()));
    for entity in endpoints {
        let id = target.generate_id();
        let mut copy = entity.with_id(id);
        if let Some(position) = entity.position() {
            copy.apply(&VisualPatch::new().with_position(position.translate(offset)));
        }
        target.add(copy)?;
        mapping.insert(entity.id(), id);
    }

    for entity in source.edges().filter(|edge| ids.contains(&edge.id())) {
        let Some((from, to)) = entity.edge_ends() else {
            continue;
        };
        let (Some(from), Some(to)) = (mapping.get(&from).copied(), mapping.get(&to).copied())
        else {
            continue;
        };
        let waypoints = entity
            .waypoints()
            .unwrap_or(&[])
            .iter()
            .map(|point| point.add_point(offset))
            .collect();

        let id = target.generate_id();
        let mut copy = entity.with_id(id);
        copy.apply(
            &VisualPatch::new()
                .with_source(from)
                .with_target(to)
                .with_waypoints(waypoints),
        );
        target.add(copy)?;
        mapping.insert(entity.id(), id);
    }

    for group in groups_innermost_first(source) {
        if !ids.contains(&group) {
            continue;
        }
        let Some(original) = source.group(group) else {
            continue;
        };
        let content: Option<Vec<Id>> = original
            .content()
            .iter()
            .map(|member| mapping.get(member).copied())
            .collect();
        let Some(content) = content else {
            continue;
        };

        let id = target.generate_id();
        target.add(VisualGroup::new(id, content).with_anchored(original.anchored()))?;
        mapping.insert(group, id);
    }

    normalize_forest(target);
    mapping.retain(|_, copy| target.contains(*copy));
    Ok(mapping)
}

/// Copies an edge end can be reattached to.
struct RerouteTargets {
    /// `(copy, represented class)` for every copied node.
    nodes: Vec<(Id, Id)>,
    /// `(copy, classes hidden behind it)` for every copied diagram node.
    diagram_nodes: Vec<(Id, IndexSet<Id>)>,
}

impl RerouteTargets {
    fn new(
        model: &VisualModel,
        copies: &IndexMap<Id, Id>,
        hidden: &HashMap<Id, IndexSet<Id>>,
    ) -> Self {
        let mut targets = Self {
            nodes: Vec::new(),
            diagram_nodes: Vec::new(),
        };
        for (original, copy) in copies {
            if let Some(node) = model.node(*copy) {
                targets.nodes.push((*copy, node.represented_entity()));
            } else if model.diagram_node(*copy).is_some() {
                let classes = hidden.get(original).cloned().unwrap_or_default();
                targets.diagram_nodes.push((*copy, classes));
            }
        }
        targets
    }

    /// Returns the copies qualifying for an end whose semantic entity is one
    /// of `classes`, best match first.
    fn candidates(&self, classes: &[Id], hierarchy: &GeneralizationHierarchy) -> Vec<Id> {
        let exact: Vec<Id> = self
            .nodes
            .iter()
            .filter(|(_, represented)| classes.contains(represented))
            .map(|(copy, _)| *copy)
            .collect();
        if !exact.is_empty() {
            return exact;
        }

        let nested: Vec<Id> = self
            .diagram_nodes
            .iter()
            .filter(|(_, hidden)| classes.iter().any(|class| hidden.contains(class)))
            .map(|(copy, _)| *copy)
            .collect();
        if !nested.is_empty() {
            return nested;
        }

        let mut specialized: IndexSet<Id> = IndexSet::new();
        for class in classes {
            for specialization in hierarchy.specializations_of(*class) {
                specialized.extend(
                    self.nodes
                        .iter()
                        .filter(|(_, represented)| *represented == specialization)
                        .map(|(copy, _)| *copy),
                );
            }
        }
        specialized.into_iter().collect()
    }
}

/// Semantic entities at the source and target end of a visual edge.
fn semantic_ends(
    edge: &VisualEntity,
    semantic: &dyn SemanticModelProvider,
) -> Option<(Vec<Id>, Vec<Id>)> {
    match edge {
        VisualEntity::Relationship(edge) => semantic
            .relationship_ends(edge.represented_relationship())
            .map(|(domain, range)| (vec![domain], vec![range])),
        VisualEntity::ProfileRelationship(edge) => {
            let profiled = semantic
                .class_profiles()
                .iter()
                .find(|profile| profile.id() == edge.entity())
                .map(|profile| profile.profiling().to_vec())
                .unwrap_or_default();
            Some((vec![edge.entity()], profiled))
        }
        _ => None,
    }
}

/// Reattaches every edge of `diagram_node` to a copy, or deletes it.
///
/// Returns the number of reattached edges and the ids of the deleted ones.
fn reroute_edges(
    model: &mut VisualModel,
    semantic: &dyn SemanticModelProvider,
    hierarchy: &GeneralizationHierarchy,
    diagram_node: Id,
    targets: &RerouteTargets,
) -> Result<(usize, Vec<Id>), TesseraError> {
    let mut counters: HashMap<Id, usize> = HashMap::new();
    let mut rerouted = 0;
    let mut deleted = Vec::new();

    for edge_id in model.edges_incident_to(diagram_node) {
        let Some(edge) = model.get(edge_id).cloned() else {
            continue;
        };
        let Some((source, target)) = edge.edge_ends() else {
            continue;
        };
        let represented = edge.represented().unwrap_or(edge_id);

        let mut pick = |classes: &[Id]| -> Option<Id> {
            let candidates = targets.candidates(classes, hierarchy);
            if candidates.is_empty() {
                return None;
            }
            let counter = counters.entry(represented).or_default();
            let choice = candidates[*counter % candidates.len()];
            *counter += 1;
            Some(choice)
        };

        let resolved = semantic_ends(&edge, semantic).and_then(|(source_classes, target_classes)| {
            let mut patch = VisualPatch::new();
            if source == diagram_node {
                patch = patch.with_source(pick(&source_classes)?);
            }
            if target == diagram_node {
                patch = patch.with_target(pick(&target_classes)?);
            }
            Some(patch)
        });

        match resolved {
            Some(patch) => {
                model.update(edge_id, &patch)?;
                rerouted += 1;
                trace!(edge = edge_id.to_string(); "Reattached edge to copy");
            }
            None => {
                model.delete(edge_id);
                debug!(edge = edge_id.to_string(); "Deleted edge with no copy to attach to");
                deleted.push(edge_id);
            }
        }
    }

    Ok((rerouted, deleted))
}

/// Wraps the copies in a throwaway anchored group and lets `layout` push the
/// rest of the model out of their way.
///
/// Returns the layout error message, if any.
fn layout_copies(
    model: &mut VisualModel,
    semantic: &dyn SemanticModelProvider,
    copies: &IndexMap<Id, Id>,
    layout: &dyn LayoutEngine,
    config: &EngineConfig,
    sizes: &dyn SizeQuery,
) -> Result<Option<String>, TesseraError> {
    let mappings = group_mappings(model);
    let top_level: Vec<Id> = copies
        .values()
        .copied()
        .filter(|copy| {
            model
                .get(*copy)
                .is_some_and(|entity| entity.is_edge_endpoint() || entity.is_group())
        })
        .filter(|copy| mappings.parent_of(*copy).is_none())
        .collect();
    if top_level.is_empty() {
        return Ok(None);
    }

    let wrapper = model.generate_id();
    model.add(VisualGroup::new(wrapper, top_level).with_anchored(Some(true)))?;

    let outcome = match layout.perform_layout(model, semantic, &[wrapper], config.layout(), sizes) {
        Ok(result) => apply_layout_result(model, &result),
        Err(err) => Err(err),
    };
    model.delete(wrapper);

    match outcome {
        Ok(()) => Ok(None),
        Err(err) => {
            warn!(model = model.id().to_string(), err:% = err; "Layout after expansion failed");
            Ok(Some(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::{
        semantic::SemanticCatalog,
        visual::{VisualNode, VisualRelationship},
    };

    use crate::{
        config::SizeConfig,
        layout::{FixedSizes, LayoutResult, OverlapRemoval},
    };

    use super::*;

    struct KeepPositions;

    impl LayoutEngine for KeepPositions {
        fn perform_layout(
            &self,
            _model: &VisualModel,
            _semantic: &dyn SemanticModelProvider,
            _selection: &[Id],
            _config: &crate::config::LayoutConfig,
            _sizes: &dyn SizeQuery,
        ) -> Result<LayoutResult, TesseraError> {
            Ok(LayoutResult::new())
        }
    }

    struct FailingLayout;

    impl LayoutEngine for FailingLayout {
        fn perform_layout(
            &self,
            _model: &VisualModel,
            _semantic: &dyn SemanticModelProvider,
            _selection: &[Id],
            _config: &crate::config::LayoutConfig,
            _sizes: &dyn SizeQuery,
        ) -> Result<LayoutResult, TesseraError> {
            Err(TesseraError::Layout("no room".to_string()))
        }
    }

    fn semantic() -> SemanticCatalog {
        let m = Id::new("m");
        SemanticCatalog::new()
            .with_class(Id::new("A"), m)
            .with_class(Id::new("B"), m)
            .with_class(Id::new("C"), m)
            .with_class(Id::new("Person"), m)
            .with_class(Id::new("Student"), m)
            .with_relationship(Id::new("AB"), m, Id::new("A"), Id::new("B"))
            .with_relationship(Id::new("BC"), m, Id::new("B"), Id::new("C"))
            .with_relationship(Id::new("knows"), m, Id::new("Person"), Id::new("C"))
            .with_generalization(Id::new("isa"), m, Id::new("Student"), Id::new("Person"))
    }

    fn add_node(model: &mut VisualModel, id: &str, class: &str, x: f32, y: f32) {
        model
            .add(VisualNode::new(
                Id::new(id),
                Id::new(class),
                Id::new("m"),
                Position::new(x, y),
            ))
            .unwrap();
    }

    fn add_edge(model: &mut VisualModel, id: &str, relationship: &str, source: &str, target: &str) {
        model
            .add(VisualRelationship::new(
                Id::new(id),
                Id::new(relationship),
                Id::new("m"),
                Id::new(source),
                Id::new(target),
            ))
            .unwrap();
    }

    fn registry_with_chain() -> VisualModelRegistry {
        let mut main = VisualModel::new(Id::new("main"));
        add_node(&mut main, "a", "A", 0.0, 0.0);
        add_node(&mut main, "b", "B", 300.0, 0.0);
        add_node(&mut main, "c", "C", 600.0, 0.0);
        add_edge(&mut main, "ab", "AB", "a", "b");
        add_edge(&mut main, "bc", "BC", "b", "c");

        let mut registry = VisualModelRegistry::new();
        registry.insert(main).unwrap();
        registry
    }

    fn sizes() -> FixedSizes {
        FixedSizes::new(SizeConfig::default())
    }

    #[test]
    fn test_collapse_moves_selection_into_new_model() {
        let mut registry = registry_with_chain();
        let outcome = add_visual_diagram_node_for_new_model(
            &mut registry,
            Id::new("main"),
            &[Id::new("a"), Id::new("b")],
            Point::new(300.0, 300.0),
            &EngineConfig::default(),
        )
        .unwrap();

        let main = registry.get(Id::new("main")).unwrap();
        assert_eq!(main.len(), 3);
        assert!(main.contains(Id::new("c")));
        assert_eq!(
            main.get(Id::new("bc")).and_then(VisualEntity::edge_ends),
            Some((outcome.diagram_node(), Id::new("c")))
        );
        let diagram_node = main.diagram_node(outcome.diagram_node()).unwrap();
        assert_eq!(diagram_node.position().point(), Point::new(200.0, 250.0));
        assert_eq!(outcome.rerouted(), 1);

        let sub = registry.get(outcome.visual_model()).unwrap();
        assert_eq!(sub.nodes().count(), 2);
        assert_eq!(sub.edges().count(), 1);
        assert_eq!(sub.get_by_represented(Id::new("AB")).len(), 1);
        assert!(registry.verify().is_ok());
    }

    #[test]
    fn test_collapse_copies_contained_groups_only() {
        let mut registry = registry_with_chain();
        let main = registry.get_mut(Id::new("main")).unwrap();
        let inner = crate::group::add_group(main, &[Id::new("a"), Id::new("b")], None).unwrap();
        let outer = crate::group::add_group(main, &[inner, Id::new("c")], None).unwrap();

        let outcome = add_visual_diagram_node_for_new_model(
            &mut registry,
            Id::new("main"),
            &[inner],
            Point::default(),
            &EngineConfig::default(),
        )
        .unwrap();

        let sub = registry.get(outcome.visual_model()).unwrap();
        assert_eq!(sub.groups().count(), 1);
        let main = registry.get(Id::new("main")).unwrap();
        assert!(!main.contains(inner));
        // The outer group lost its only other member and dissolved.
        assert!(!main.contains(outer));
        assert!(registry.verify().is_ok());
    }

    #[test]
    fn test_collapse_empty_selection() {
        let mut registry = registry_with_chain();
        let result = add_visual_diagram_node_for_new_model(
            &mut registry,
            Id::new("main"),
            &[Id::new("ab")],
            Point::default(),
            &EngineConfig::default(),
        );

        assert!(matches!(
            result,
            Err(TesseraError::InvalidDiagramOperation(_))
        ));
    }

    #[test]
    fn test_existing_model_cycle_is_rejected() {
        let mut registry = registry_with_chain();
        registry.insert(VisualModel::new(Id::new("other"))).unwrap();
        add_visual_diagram_node_for_existing_model(
            &mut registry,
            Id::new("main"),
            Id::new("other"),
            Point::default(),
        )
        .unwrap();

        let result = add_visual_diagram_node_for_existing_model(
            &mut registry,
            Id::new("other"),
            Id::new("main"),
            Point::default(),
        );
        assert!(matches!(
            result,
            Err(TesseraError::InvalidDiagramOperation(_))
        ));

        let result = add_visual_diagram_node_for_existing_model(
            &mut registry,
            Id::new("main"),
            Id::new("missing"),
            Point::default(),
        );
        assert!(result.is_err_and(|err| err.is_missing_reference()));
    }

    #[test]
    fn test_expand_translates_and_reroutes() {
        let semantic = semantic();
        let mut registry = registry_with_chain();
        let collapsed = add_visual_diagram_node_for_new_model(
            &mut registry,
            Id::new("main"),
            &[Id::new("a"), Id::new("b")],
            Point::new(1100.0, 1050.0),
            &EngineConfig::default(),
        )
        .unwrap();

        let outcome = put_visual_diagram_node_content_to_visual_model(
            &mut registry,
            &semantic,
            Id::new("main"),
            collapsed.diagram_node(),
            &KeepPositions,
            &EngineConfig::default(),
            &sizes(),
        )
        .unwrap();

        assert_eq!(outcome.copies().len(), 3);
        assert_eq!(outcome.rerouted(), 1);
        assert!(outcome.layout_error().is_none());

        let main = registry.get(Id::new("main")).unwrap();
        let copy_of_b = main.get_by_represented(Id::new("B"))[0];
        // Diagram node top-left is (1000, 1000); the nested content started at (0, 0).
        assert_eq!(
            copy_of_b.position().map(|p| p.point()),
            Some(Point::new(1300.0, 1000.0))
        );
        assert_eq!(
            main.get(Id::new("bc")).and_then(VisualEntity::edge_ends),
            Some((copy_of_b.id(), Id::new("c")))
        );
        assert!(main.contains(collapsed.diagram_node()));
        assert!(registry.verify().is_ok());
    }

    #[test]
    fn test_expand_spreads_duplicates_round_robin() {
        let semantic = semantic();
        let mut sub = VisualModel::new(Id::new("sub"));
        add_node(&mut sub, "b1", "B", 0.0, 0.0);
        add_node(&mut sub, "b2", "B", 0.0, 300.0);

        let mut main = VisualModel::new(Id::new("main"));
        add_node(&mut main, "c", "C", 900.0, 0.0);
        main.add(VisualDiagramNode::new(Id::new("dn"), Id::new("sub"), Position::default()))
            .unwrap();
        add_edge(&mut main, "e1", "BC", "dn", "c");
        add_edge(&mut main, "e2", "BC", "dn", "c");

        let mut registry = VisualModelRegistry::new();
        registry.insert(sub).unwrap();
        registry.insert(main).unwrap();

        let outcome = put_visual_diagram_node_content_to_visual_model(
            &mut registry,
            &semantic,
            Id::new("main"),
            Id::new("dn"),
            &KeepPositions,
            &EngineConfig::default(),
            &sizes(),
        )
        .unwrap();

        let main = registry.get(Id::new("main")).unwrap();
        let source = |edge: &str| main.get(Id::new(edge)).and_then(VisualEntity::edge_ends).map(|e| e.0);
        assert_eq!(source("e1"), outcome.copies().get(&Id::new("b1")).copied());
        assert_eq!(source("e2"), outcome.copies().get(&Id::new("b2")).copied());
    }

    #[test]
    fn test_expand_falls_back_to_specialization_and_deletes_unresolved() {
        let semantic = semantic();
        let mut sub = VisualModel::new(Id::new("sub"));
        add_node(&mut sub, "s", "Student", 0.0, 0.0);

        let mut main = VisualModel::new(Id::new("main"));
        add_node(&mut main, "c", "C", 900.0, 0.0);
        main.add(VisualDiagramNode::new(Id::new("dn"), Id::new("sub"), Position::default()))
            .unwrap();
        add_edge(&mut main, "knows", "knows", "dn", "c");
        add_edge(&mut main, "bc", "BC", "dn", "c");

        let mut registry = VisualModelRegistry::new();
        registry.insert(sub).unwrap();
        registry.insert(main).unwrap();

        let outcome = dissolve_visual_diagram_node(
            &mut registry,
            &semantic,
            Id::new("main"),
            Id::new("dn"),
            &KeepPositions,
            &EngineConfig::default(),
            &sizes(),
        )
        .unwrap();

        assert_eq!(outcome.deleted_edges(), &[Id::new("bc")]);
        let main = registry.get(Id::new("main")).unwrap();
        assert!(!main.contains(Id::new("dn")));
        assert_eq!(
            main.get(Id::new("knows")).and_then(VisualEntity::edge_ends),
            Some((outcome.copies()[&Id::new("s")], Id::new("c")))
        );
        assert!(registry.verify().is_ok());
    }

    #[test]
    fn test_expand_through_nested_diagram_node() {
        let semantic = semantic();
        let mut deepest = VisualModel::new(Id::new("deepest"));
        add_node(&mut deepest, "b", "B", 0.0, 0.0);
        let mut sub = VisualModel::new(Id::new("sub"));
        sub.add(VisualDiagramNode::new(Id::new("inner"), Id::new("deepest"), Position::default()))
            .unwrap();

        let mut main = VisualModel::new(Id::new("main"));
        add_node(&mut main, "c", "C", 900.0, 0.0);
        main.add(VisualDiagramNode::new(Id::new("dn"), Id::new("sub"), Position::default()))
            .unwrap();
        add_edge(&mut main, "bc", "BC", "dn", "c");

        let mut registry = VisualModelRegistry::new();
        registry.insert(deepest).unwrap();
        registry.insert(sub).unwrap();
        registry.insert(main).unwrap();

        let outcome = put_visual_diagram_node_content_to_visual_model(
            &mut registry,
            &semantic,
            Id::new("main"),
            Id::new("dn"),
            &KeepPositions,
            &EngineConfig::default(),
            &sizes(),
        )
        .unwrap();

        let main = registry.get(Id::new("main")).unwrap();
        assert_eq!(
            main.get(Id::new("bc")).and_then(VisualEntity::edge_ends),
            Some((outcome.copies()[&Id::new("inner")], Id::new("c")))
        );
    }

    #[test]
    fn test_layout_failure_keeps_copies() {
        let semantic = semantic();
        let mut registry = registry_with_chain();
        let collapsed = add_visual_diagram_node_for_new_model(
            &mut registry,
            Id::new("main"),
            &[Id::new("a"), Id::new("b")],
            Point::new(100.0, 500.0),
            &EngineConfig::default(),
        )
        .unwrap();

        let outcome = put_visual_diagram_node_content_to_visual_model(
            &mut registry,
            &semantic,
            Id::new("main"),
            collapsed.diagram_node(),
            &FailingLayout,
            &EngineConfig::default(),
            &sizes(),
        )
        .unwrap();

        assert!(outcome.layout_error().is_some_and(|msg| msg.contains("no room")));
        let main = registry.get(Id::new("main")).unwrap();
        assert_eq!(main.nodes().count(), 3);
        assert_eq!(main.groups().count(), 0);
    }

    #[test]
    fn test_overlap_removal_pushes_diagram_node_aside() {
        let semantic = semantic();
        let mut registry = registry_with_chain();
        let collapsed = add_visual_diagram_node_for_new_model(
            &mut registry,
            Id::new("main"),
            &[Id::new("a"), Id::new("b")],
            Point::new(100.0, 500.0),
            &EngineConfig::default(),
        )
        .unwrap();

        let outcome = put_visual_diagram_node_content_to_visual_model(
            &mut registry,
            &semantic,
            Id::new("main"),
            collapsed.diagram_node(),
            &OverlapRemoval,
            &EngineConfig::default(),
            &sizes(),
        )
        .unwrap();
        assert!(outcome.layout_error().is_none());

        let main = registry.get(Id::new("main")).unwrap();
        let copy_of_a = main.get_by_represented(Id::new("A"))[0];
        // Copies never move; the diagram node sitting under them does.
        assert_eq!(
            copy_of_a.position().map(|p| p.point()),
            Some(Point::new(0.0, 450.0))
        );
        let diagram_node = main.diagram_node(collapsed.diagram_node()).unwrap();
        assert_ne!(diagram_node.position().point(), Point::new(0.0, 450.0));
    }
}
