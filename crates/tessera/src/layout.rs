//! Layout adapter.
//!
//! The engine does not own a layout algorithm. A [`LayoutEngine`] receives a
//! read-only visual model plus a selection and answers with new positions and
//! waypoints; [`apply_layout_result`] writes them back through the store.
//!
//! Node sizes come from a [`SizeQuery`], since only the renderer knows how big
//! a node really is. [`FixedSizes`] answers from [`SizeConfig`] instead.
//!
//! [`OverlapRemoval`] is the built-in engine. It only moves boxes until none
//! overlap, which is what expanding a diagram node needs.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, trace, warn};

use tessera_core::{
    geometry::{Bounds, Point, Size},
    identifier::Id,
    semantic::SemanticModelProvider,
    visual::VisualPatch,
};

use crate::{
    config::{LayoutConfig, SizeConfig},
    error::TesseraError,
    group::group_mappings,
    store::VisualModel,
};

/// Measures nodes and diagram nodes.
pub trait SizeQuery {
    fn node_width(&self, model: &VisualModel, id: Id) -> f32;

    fn node_height(&self, model: &VisualModel, id: Id) -> f32;

    fn node_size(&self, model: &VisualModel, id: Id) -> Size {
        Size::new(self.node_width(model, id), self.node_height(model, id))
    }
}

/// Sizes taken from configuration: one size for nodes, one for diagram nodes.
#[derive(Debug, Clone, Default)]
pub struct FixedSizes {
    sizes: SizeConfig,
}

impl FixedSizes {
    pub fn new(sizes: SizeConfig) -> Self {
        Self { sizes }
    }
}

impl SizeQuery for FixedSizes {
    fn node_width(&self, model: &VisualModel, id: Id) -> f32 {
        if model.diagram_node(id).is_some() {
            self.sizes.diagram_node_width()
        } else {
            self.sizes.node_width()
        }
    }

    fn node_height(&self, model: &VisualModel, id: Id) -> f32 {
        if model.diagram_node(id).is_some() {
            self.sizes.diagram_node_height()
        } else {
            self.sizes.node_height()
        }
    }
}

/// New placement of one entity. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutedEntity {
    position: Option<Point>,
    waypoints: Option<Vec<Point>>,
}

impl LayoutedEntity {
    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_waypoints(mut self, waypoints: Vec<Point>) -> Self {
        self.waypoints = Some(waypoints);
        self
    }

    pub fn position(&self) -> Option<Point> {
        self.position
    }

    pub fn waypoints(&self) -> Option<&[Point]> {
        self.waypoints.as_deref()
    }
}

/// Output of a layout run, keyed by visual id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    entities: IndexMap<Id, LayoutedEntity>,
}

impl LayoutResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: Id, entity: LayoutedEntity) {
        self.entities.insert(id, entity);
    }

    pub fn get(&self, id: Id) -> Option<&LayoutedEntity> {
        self.entities.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id, &LayoutedEntity)> {
        self.entities.iter().map(|(id, entity)| (*id, entity))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// A layout algorithm.
pub trait LayoutEngine {
    /// Computes new positions for `selection` (entity ids, groups included).
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::Layout`] when no acceptable layout is found.
    fn perform_layout(
        &self,
        model: &VisualModel,
        semantic: &dyn SemanticModelProvider,
        selection: &[Id],
        config: &LayoutConfig,
        sizes: &dyn SizeQuery,
    ) -> Result<LayoutResult, TesseraError>;
}

/// Separates overlapping boxes by pushing them apart along the axis of least
/// penetration.
///
/// Entities with an anchored position never move. When the selection
/// contains an anchored group, its content stays where it is and every other
/// overlapping box is pushed out of its way; otherwise only the selection is
/// moved.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlapRemoval;

impl OverlapRemoval {
    pub fn new() -> Self {
        Self
    }
}

impl LayoutEngine for OverlapRemoval {
    fn perform_layout(
        &self,
        model: &VisualModel,
        _semantic: &dyn SemanticModelProvider,
        selection: &[Id],
        config: &LayoutConfig,
        sizes: &dyn SizeQuery,
    ) -> Result<LayoutResult, TesseraError> {
        let mappings = group_mappings(model);

        let mut selected = HashSet::new();
        let mut pinned = HashSet::new();
        let mut has_anchored_group = false;
        for id in selection {
            if !model.contains(*id) {
                return Err(TesseraError::missing("visual entity", *id));
            }
            let anchored_group = model
                .group(*id)
                .is_some_and(|group| group.anchored() == Some(true));
            has_anchored_group |= anchored_group;

            let mut members = mappings.descendants(*id);
            members.push(*id);
            for member in members {
                if model.get(member).is_some_and(|e| e.is_edge_endpoint()) {
                    selected.insert(member);
                    if anchored_group {
                        pinned.insert(member);
                    }
                }
            }
        }

        let mut boxes: IndexMap<Id, Bounds> = IndexMap::new();
        for entity in model.entities() {
            let Some(position) = entity.position() else {
                continue;
            };
            if position.anchored() {
                pinned.insert(entity.id());
            }
            boxes.insert(
                entity.id(),
                position.point().to_bounds(sizes.node_size(model, entity.id())),
            );
        }

        let movable: Vec<Id> = boxes
            .keys()
            .copied()
            .filter(|id| !pinned.contains(id))
            .filter(|id| selected.contains(id) != has_anchored_group)
            .collect();
        let margin = config.min_spacing() / 2.0;

        let mut moved = HashSet::new();
        let mut settled = false;
        for iteration in 0..config.max_iterations() {
            let mut changed = false;
            for id in &movable {
                let current = boxes[id];
                let blocker = boxes
                    .iter()
                    .filter(|(other, _)| *other != id)
                    .find(|(_, bounds)| current.expand(margin).intersects(&bounds.expand(margin)))
                    .map(|(other, bounds)| (*other, *bounds));
                let Some((other, other_bounds)) = blocker else {
                    continue;
                };

                let offset = separation(current, other_bounds, config.min_spacing());
                trace!(entity = id.to_string(), other = other.to_string(); "Separating boxes");
                boxes.insert(*id, current.translate(offset));
                moved.insert(*id);
                changed = true;
            }
            if !changed {
                debug!(iterations = iteration; "Overlap removal settled");
                settled = true;
                break;
            }
        }

        if !settled {
            warn!(max_iterations = config.max_iterations(); "Overlap removal did not settle");
            return Err(TesseraError::Layout(format!(
                "overlaps remain after {} iterations",
                config.max_iterations()
            )));
        }

        let mut result = LayoutResult::new();
        for id in boxes.keys().filter(|id| moved.contains(*id)) {
            result.insert(
                *id,
                LayoutedEntity::default().with_position(boxes[id].min_point()),
            );
            for edge in model.edges_incident_to(*id) {
                result.insert(edge, LayoutedEntity::default().with_waypoints(Vec::new()));
            }
        }
        Ok(result)
    }
}

/// Smallest translation of `moving` that clears `fixed` with `spacing` between them.
fn separation(moving: Bounds, fixed: Bounds, spacing: f32) -> Point {
    let moving_center = moving.center();
    let fixed_center = fixed.center();

    let push_right = fixed.max_x() + spacing - moving.min_x();
    let push_left = fixed.min_x() - spacing - moving.max_x();
    let push_down = fixed.max_y() + spacing - moving.min_y();
    let push_up = fixed.min_y() - spacing - moving.max_y();

    let dx = if moving_center.x() >= fixed_center.x() {
        push_right
    } else {
        push_left
    };
    let dy = if moving_center.y() >= fixed_center.y() {
        push_down
    } else {
        push_up
    };

    if dx.abs() <= dy.abs() {
        Point::new(dx, 0.0)
    } else {
        Point::new(0.0, dy)
    }
}

/// Writes a layout result back into `model`.
///
/// Ids the model no longer has are skipped, as are anchored positions.
///
/// # Errors
///
/// Propagates store errors.
pub fn apply_layout_result(
    model: &mut VisualModel,
    result: &LayoutResult,
) -> Result<(), TesseraError> {
    for (id, layouted) in result.iter() {
        let Some(entity) = model.get(id) else {
            debug!(entity = id.to_string(); "Layout result for missing entity");
            continue;
        };

        let mut patch = VisualPatch::new();
        if let Some(point) = layouted.position() {
            match entity.position() {
                Some(position) if !position.anchored() => {
                    patch = patch.with_position(position.moved_to(point));
                }
                _ => {}
            }
        }
        if let Some(waypoints) = layouted.waypoints() {
            patch = patch.with_waypoints(waypoints.to_vec());
        }
        model.update(id, &patch)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use tessera_core::{
        semantic::SemanticCatalog,
        visual::{Position, VisualGroup, VisualNode, VisualRelationship},
    };

    use super::*;

    fn node_at(model: &mut VisualModel, id: &str, x: f32, y: f32) {
        model
            .add(VisualNode::new(
                Id::new(id),
                Id::new(id),
                Id::new("m"),
                Position::new(x, y),
            ))
            .unwrap();
    }

    fn sizes() -> FixedSizes {
        FixedSizes::new(SizeConfig::new(100.0, 50.0, 150.0, 80.0))
    }

    fn overlapping(model: &VisualModel, a: &str, b: &str, sizes: &FixedSizes) -> bool {
        let bounds = |id: &str| {
            model
                .get(Id::new(id))
                .and_then(|e| e.position())
                .unwrap()
                .point()
                .to_bounds(sizes.node_size(model, Id::new(id)))
        };
        bounds(a).intersects(&bounds(b))
    }

    #[test]
    fn test_selection_moves_away_from_others() {
        let mut model = VisualModel::new(Id::new("v"));
        node_at(&mut model, "a", 0.0, 0.0);
        node_at(&mut model, "b", 10.0, 5.0);
        let semantic = SemanticCatalog::new();

        let result = OverlapRemoval
            .perform_layout(
                &model,
                &semantic,
                &[Id::new("b")],
                &LayoutConfig::new(20.0, 10),
                &sizes(),
            )
            .unwrap();

        assert!(result.get(Id::new("a")).is_none());
        // Pushing down is shorter than pushing right.
        let b = result.get(Id::new("b")).and_then(LayoutedEntity::position).unwrap();
        assert!(approx_eq!(f32, b.x(), 10.0, epsilon = 0.001));
        assert!(approx_eq!(f32, b.y(), 70.0, epsilon = 0.001));

        apply_layout_result(&mut model, &result).unwrap();
        assert!(!overlapping(&model, "a", "b", &sizes()));
    }

    #[test]
    fn test_anchored_group_pushes_others() {
        let mut model = VisualModel::new(Id::new("v"));
        node_at(&mut model, "a", 0.0, 0.0);
        node_at(&mut model, "b", 0.0, 200.0);
        node_at(&mut model, "outsider", 20.0, 10.0);
        model
            .add(
                VisualGroup::new(Id::new("g"), vec![Id::new("a"), Id::new("b")])
                    .with_anchored(Some(true)),
            )
            .unwrap();
        let semantic = SemanticCatalog::new();

        let result = OverlapRemoval
            .perform_layout(
                &model,
                &semantic,
                &[Id::new("g")],
                &LayoutConfig::default(),
                &sizes(),
            )
            .unwrap();

        assert!(result.get(Id::new("a")).is_none());
        assert!(result.get(Id::new("outsider")).is_some());
        apply_layout_result(&mut model, &result).unwrap();
        assert!(!overlapping(&model, "a", "outsider", &sizes()));
        assert!(!overlapping(&model, "b", "outsider", &sizes()));
    }

    #[test]
    fn test_anchored_position_never_moves() {
        let mut model = VisualModel::new(Id::new("v"));
        model
            .add(VisualNode::new(
                Id::new("a"),
                Id::new("A"),
                Id::new("m"),
                Position::new(0.0, 0.0).with_anchored(true),
            ))
            .unwrap();
        node_at(&mut model, "b", 0.0, 0.0);
        let semantic = SemanticCatalog::new();

        let result = OverlapRemoval
            .perform_layout(
                &model,
                &semantic,
                &[Id::new("a"), Id::new("b")],
                &LayoutConfig::default(),
                &sizes(),
            )
            .unwrap();

        assert!(result.get(Id::new("a")).is_none());
        assert!(result.get(Id::new("b")).is_some());
    }

    #[test]
    fn test_moved_edges_lose_waypoints() {
        let mut model = VisualModel::new(Id::new("v"));
        node_at(&mut model, "a", 0.0, 0.0);
        node_at(&mut model, "b", 0.0, 0.0);
        model
            .add(
                VisualRelationship::new(
                    Id::new("e"),
                    Id::new("r"),
                    Id::new("m"),
                    Id::new("a"),
                    Id::new("b"),
                )
                .with_waypoints(vec![Point::new(50.0, 50.0)]),
            )
            .unwrap();
        let semantic = SemanticCatalog::new();

        let result = OverlapRemoval
            .perform_layout(
                &model,
                &semantic,
                &[Id::new("b")],
                &LayoutConfig::default(),
                &sizes(),
            )
            .unwrap();
        apply_layout_result(&mut model, &result).unwrap();

        assert_eq!(model.get(Id::new("e")).and_then(|e| e.waypoints()), Some(&[][..]));
    }

    #[test]
    fn test_unsettled_layout_is_an_error() {
        let mut model = VisualModel::new(Id::new("v"));
        node_at(&mut model, "a", 0.0, 0.0);
        node_at(&mut model, "b", 0.0, 0.0);
        let semantic = SemanticCatalog::new();

        let result = OverlapRemoval.perform_layout(
            &model,
            &semantic,
            &[Id::new("a"), Id::new("b")],
            &LayoutConfig::new(20.0, 1),
            &sizes(),
        );

        assert!(matches!(result, Err(TesseraError::Layout(_))));
    }

    #[test]
    fn test_fixed_sizes_distinguish_diagram_nodes() {
        let mut model = VisualModel::new(Id::new("v"));
        node_at(&mut model, "a", 0.0, 0.0);
        model
            .add(tessera_core::visual::VisualDiagramNode::new(
                Id::new("d"),
                Id::new("other"),
                Position::default(),
            ))
            .unwrap();

        assert_eq!(sizes().node_size(&model, Id::new("a")), Size::new(100.0, 50.0));
        assert_eq!(sizes().node_size(&model, Id::new("d")), Size::new(150.0, 80.0));
    }
}
