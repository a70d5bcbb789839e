//! Coordinate helpers: bounding boxes and node alignment.

use log::debug;
use serde::Deserialize;

use tessera_core::{
    geometry::{Bounds, Point},
    identifier::Id,
    visual::VisualPatch,
};

use crate::{error::TesseraError, group::group_mappings, layout::SizeQuery, store::VisualModel};

/// Which edge or center line [`align_nodes`] lines nodes up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Top,
    Middle,
    Bottom,
}

/// Returns the canvas bounds of a node, a diagram node or a whole group.
///
/// Edges have no bounds of their own; groups without placed members neither.
pub fn entity_bounds(model: &VisualModel, id: Id, sizes: &dyn SizeQuery) -> Option<Bounds> {
    let entity = model.get(id)?;
    if let Some(position) = entity.position() {
        return Some(position.point().to_bounds(sizes.node_size(model, id)));
    }
    if entity.is_group() {
        return group_mappings(model)
            .descendants(id)
            .into_iter()
            .filter_map(|member| {
                let position = model.get(member)?.position()?;
                Some(position.point().to_bounds(sizes.node_size(model, member)))
            })
            .reduce(|acc, bounds| acc.merge(&bounds));
    }
    None
}

/// Returns the smallest box containing every entity of `ids` that has bounds.
///
/// Edge waypoints are included so that a collapsed or expanded selection
/// keeps its routed edges inside the box.
pub fn bounding_box(model: &VisualModel, ids: &[Id], sizes: &dyn SizeQuery) -> Option<Bounds> {
    let mut merged: Option<Bounds> = None;
    let mut include = |bounds: Bounds| {
        merged = Some(match merged {
            Some(current) => current.merge(&bounds),
            None => bounds,
        });
    };

    for id in ids {
        if let Some(bounds) = entity_bounds(model, *id, sizes) {
            include(bounds);
        }
        let waypoints = model.get(*id).and_then(|e| e.waypoints()).unwrap_or(&[]);
        for waypoint in waypoints {
            include(Bounds::new_from_top_left(*waypoint, Default::default()));
        }
    }
    merged
}

/// Lines up the nodes and diagram nodes of `ids` on a common edge or center line.
///
/// Anchored nodes are left where they are. Returns how many nodes moved.
///
/// # Errors
///
/// Returns [`TesseraError::MissingReference`] if an id is not in the model.
pub fn align_nodes(
    model: &mut VisualModel,
    ids: &[Id],
    alignment: Alignment,
    sizes: &dyn SizeQuery,
) -> Result<usize, TesseraError> {
    let mut placed = Vec::new();
    for id in ids {
        let entity = model
            .get(*id)
            .ok_or(TesseraError::missing("visual entity", *id))?;
        if let Some(position) = entity.position() {
            placed.push((*id, position, position.point().to_bounds(sizes.node_size(model, *id))));
        }
    }

    let Some(target) = placed
        .iter()
        .map(|(_, _, bounds)| *bounds)
        .reduce(|acc, bounds| acc.merge(&bounds))
    else {
        return Ok(0);
    };

    let mut moved = 0;
    for (id, position, bounds) in placed {
        if position.anchored() {
            continue;
        }
        let top_left = bounds.min_point();
        let destination = match alignment {
            Alignment::Left => top_left.with_x(target.min_x()),
            Alignment::Center => top_left.with_x(target.center().x() - bounds.width() / 2.0),
            Alignment::Right => top_left.with_x(target.max_x() - bounds.width()),
            Alignment::Top => top_left.with_y(target.min_y()),
            Alignment::Middle => top_left.with_y(target.center().y() - bounds.height() / 2.0),
            Alignment::Bottom => top_left.with_y(target.max_y() - bounds.height()),
        };
        if destination == top_left {
            continue;
        }
        model.update(id, &VisualPatch::new().with_position(position.moved_to(destination)))?;
        moved += 1;
    }

    debug!(model = model.id().to_string(), moved = moved; "Aligned nodes");
    Ok(moved)
}

/// Returns the offset that moves `from` onto `to`.
pub(crate) fn offset_between(from: Point, to: Point) -> Point {
    to.sub_point(from)
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use tessera_core::visual::{Position, VisualGroup, VisualNode, VisualRelationship};

    use crate::{config::SizeConfig, layout::FixedSizes};

    use super::*;

    fn sizes() -> FixedSizes {
        FixedSizes::new(SizeConfig::new(100.0, 40.0, 200.0, 80.0))
    }

    fn model() -> VisualModel {
        let mut model = VisualModel::new(Id::new("align"));
        for (id, x, y) in [("a", 0.0, 0.0), ("b", 300.0, 100.0), ("c", 50.0, 400.0)] {
            model
                .add(VisualNode::new(Id::new(id), Id::new(id), Id::new("m"), Position::new(x, y)))
                .unwrap();
        }
        model
    }

    fn x_of(model: &VisualModel, id: &str) -> f32 {
        model.get(Id::new(id)).and_then(|e| e.position()).unwrap().x()
    }

    fn y_of(model: &VisualModel, id: &str) -> f32 {
        model.get(Id::new(id)).and_then(|e| e.position()).unwrap().y()
    }

    #[test]
    fn test_group_bounds_cover_members() {
        let mut model = model();
        model
            .add(VisualGroup::new(Id::new("g"), vec![Id::new("a"), Id::new("b")]))
            .unwrap();

        let bounds = entity_bounds(&model, Id::new("g"), &sizes()).unwrap();
        assert_eq!(bounds.min_point(), Point::new(0.0, 0.0));
        assert!(approx_eq!(f32, bounds.max_x(), 400.0, epsilon = 0.001));
        assert!(approx_eq!(f32, bounds.max_y(), 140.0, epsilon = 0.001));
    }

    #[test]
    fn test_bounding_box_includes_waypoints() {
        let mut model = model();
        model
            .add(
                VisualRelationship::new(
                    Id::new("e"),
                    Id::new("r"),
                    Id::new("m"),
                    Id::new("a"),
                    Id::new("b"),
                )
                .with_waypoints(vec![Point::new(-50.0, 20.0)]),
            )
            .unwrap();

        let bounds = bounding_box(&model, &[Id::new("a"), Id::new("e")], &sizes()).unwrap();
        assert_eq!(bounds.min_x(), -50.0);
        assert_eq!(bounds.max_x(), 100.0);
    }

    #[test]
    fn test_bounding_box_of_nothing() {
        let model = model();
        assert!(bounding_box(&model, &[], &sizes()).is_none());
    }

    #[test]
    fn test_align_left_and_bottom() {
        let mut model = model();
        let ids = [Id::new("a"), Id::new("b"), Id::new("c")];

        let moved = align_nodes(&mut model, &ids, Alignment::Left, &sizes()).unwrap();
        assert_eq!(moved, 2);
        for id in ["a", "b", "c"] {
            assert_eq!(x_of(&model, id), 0.0);
        }

        align_nodes(&mut model, &ids, Alignment::Bottom, &sizes()).unwrap();
        for id in ["a", "b", "c"] {
            assert!(approx_eq!(f32, y_of(&model, id), 400.0, epsilon = 0.001));
        }
    }

    #[test]
    fn test_align_center_skips_anchored() {
        let mut model = model();
        model
            .update(
                Id::new("a"),
                &VisualPatch::new().with_position(Position::new(0.0, 0.0).with_anchored(true)),
            )
            .unwrap();

        align_nodes(
            &mut model,
            &[Id::new("a"), Id::new("b")],
            Alignment::Center,
            &sizes(),
        )
        .unwrap();

        assert_eq!(x_of(&model, "a"), 0.0);
        assert!(approx_eq!(f32, x_of(&model, "b"), 150.0, epsilon = 0.001));
    }

    #[test]
    fn test_align_missing_node() {
        let mut model = model();
        let result = align_nodes(&mut model, &[Id::new("nope")], Alignment::Top, &sizes());
        assert!(result.is_err());
    }
}
