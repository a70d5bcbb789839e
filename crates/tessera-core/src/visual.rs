//! Visual entities: everything that is directly rendered on a diagram canvas.
//!
//! A visual model holds five kinds of entities in one flat identifier space:
//!
//! - [`VisualNode`] - a semantic class or class profile placed on canvas
//! - [`VisualDiagramNode`] - a whole other visual model collapsed into one box
//! - [`VisualRelationship`] - an edge for a relationship, relationship profile or generalization
//! - [`VisualProfileRelationship`] - an edge from a class profile to a profiled class
//! - [`VisualGroup`] - a cluster of nodes, diagram nodes and other groups
//!
//! Nodes and diagram nodes are *edge endpoints*; edges may only connect edge
//! endpoints. Entities are only mutated through [`VisualPatch`], which the
//! visual model store validates before applying.

use std::fmt;

use crate::{geometry::Point, identifier::Id};

/// Canvas position of a node, its top-left corner.
///
/// Anchored positions are never moved by layout.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    point: Point,
    anchored: bool,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            point: Point::new(x, y),
            anchored: false,
        }
    }

    pub fn from_point(point: Point) -> Self {
        Self {
            point,
            anchored: false,
        }
    }

    pub fn with_anchored(mut self, anchored: bool) -> Self {
        self.anchored = anchored;
        self
    }

    pub fn point(self) -> Point {
        self.point
    }

    pub fn x(self) -> f32 {
        self.point.x()
    }

    pub fn y(self) -> f32 {
        self.point.y()
    }

    pub fn anchored(self) -> bool {
        self.anchored
    }

    /// Returns the position moved by `offset`, keeping the anchor flag.
    pub fn translate(self, offset: Point) -> Self {
        Self {
            point: self.point.add_point(offset),
            anchored: self.anchored,
        }
    }

    /// Returns the position moved to `point`, keeping the anchor flag.
    pub fn moved_to(self, point: Point) -> Self {
        Self {
            point,
            anchored: self.anchored,
        }
    }
}

/// A semantic class or class profile placed on canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualNode {
    id: Id,
    represented_entity: Id,
    model: Id,
    position: Position,
    content: Vec<Id>,
}

impl VisualNode {
    /// Creates a node for `represented_entity`, owned by the semantic model `model`.
    pub fn new(id: Id, represented_entity: Id, model: Id, position: Position) -> Self {
        Self {
            id,
            represented_entity,
            model,
            position,
            content: Vec::new(),
        }
    }

    /// Sets the attributes shown inside the node.
    pub fn with_content(mut self, content: Vec<Id>) -> Self {
        self.content = content;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn represented_entity(&self) -> Id {
        self.represented_entity
    }

    /// Returns the semantic model owning the represented entity.
    pub fn model(&self) -> Id {
        self.model
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Returns the attribute ids shown inside the node, in display order.
    pub fn content(&self) -> &[Id] {
        &self.content
    }
}

/// A node standing for another visual model.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualDiagramNode {
    id: Id,
    represented_visual_model: Id,
    position: Position,
    label: String,
    description: Option<String>,
}

impl VisualDiagramNode {
    pub fn new(id: Id, represented_visual_model: Id, position: Position) -> Self {
        Self {
            id,
            represented_visual_model,
            position,
            label: String::new(),
            description: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn represented_visual_model(&self) -> Id {
        self.represented_visual_model
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// An edge for a relationship, relationship profile or generalization.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualRelationship {
    id: Id,
    represented_relationship: Id,
    model: Id,
    source: Id,
    target: Id,
    waypoints: Vec<Point>,
}

impl VisualRelationship {
    pub fn new(id: Id, represented_relationship: Id, model: Id, source: Id, target: Id) -> Self {
        Self {
            id,
            represented_relationship,
            model,
            source,
            target,
            waypoints: Vec::new(),
        }
    }

    pub fn with_waypoints(mut self, waypoints: Vec<Point>) -> Self {
        self.waypoints = waypoints;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn represented_relationship(&self) -> Id {
        self.represented_relationship
    }

    pub fn model(&self) -> Id {
        self.model
    }

    pub fn source(&self) -> Id {
        self.source
    }

    pub fn target(&self) -> Id {
        self.target
    }

    pub fn waypoints(&self) -> &[Point] {
        &self.waypoints
    }
}

/// An edge from a class profile node to the node of a profiled class.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualProfileRelationship {
    id: Id,
    entity: Id,
    model: Id,
    source: Id,
    target: Id,
    waypoints: Vec<Point>,
}

impl VisualProfileRelationship {
    /// Creates a profile edge for the class profile `entity`.
    pub fn new(id: Id, entity: Id, model: Id, source: Id, target: Id) -> Self {
        Self {
            id,
            entity,
            model,
            source,
            target,
            waypoints: Vec::new(),
        }
    }

    pub fn with_waypoints(mut self, waypoints: Vec<Point>) -> Self {
        self.waypoints = waypoints;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// Returns the class profile this edge belongs to.
    pub fn entity(&self) -> Id {
        self.entity
    }

    pub fn model(&self) -> Id {
        self.model
    }

    pub fn source(&self) -> Id {
        self.source
    }

    pub fn target(&self) -> Id {
        self.target
    }

    pub fn waypoints(&self) -> &[Point] {
        &self.waypoints
    }
}

/// A cluster of entities that move together.
///
/// Groups do not know their parent group; parentage is derived by scanning
/// the content of every group.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualGroup {
    id: Id,
    content: Vec<Id>,
    anchored: Option<bool>,
}

impl VisualGroup {
    pub fn new(id: Id, content: Vec<Id>) -> Self {
        Self {
            id,
            content,
            anchored: None,
        }
    }

    pub fn with_anchored(mut self, anchored: Option<bool>) -> Self {
        self.anchored = anchored;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn content(&self) -> &[Id] {
        &self.content
    }

    /// Returns the anchor state: `None` when it was never set.
    pub fn anchored(&self) -> Option<bool> {
        self.anchored
    }
}

/// Any visual entity.
#[derive(Debug, Clone, PartialEq)]
pub enum VisualEntity {
    Node(VisualNode),
    DiagramNode(VisualDiagramNode),
    Relationship(VisualRelationship),
    ProfileRelationship(VisualProfileRelationship),
    Group(VisualGroup),
}

impl VisualEntity {
    pub fn id(&self) -> Id {
        match self {
            VisualEntity::Node(node) => node.id,
            VisualEntity::DiagramNode(node) => node.id,
            VisualEntity::Relationship(edge) => edge.id,
            VisualEntity::ProfileRelationship(edge) => edge.id,
            VisualEntity::Group(group) => group.id,
        }
    }

    /// Returns a short name for the entity kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            VisualEntity::Node(_) => "node",
            VisualEntity::DiagramNode(_) => "diagram node",
            VisualEntity::Relationship(_) => "relationship",
            VisualEntity::ProfileRelationship(_) => "profile relationship",
            VisualEntity::Group(_) => "group",
        }
    }

    /// Returns true for nodes and diagram nodes, the entities edges may connect.
    pub fn is_edge_endpoint(&self) -> bool {
        matches!(self, VisualEntity::Node(_) | VisualEntity::DiagramNode(_))
    }

    pub fn is_edge(&self) -> bool {
        matches!(
            self,
            VisualEntity::Relationship(_) | VisualEntity::ProfileRelationship(_)
        )
    }

    pub fn is_group(&self) -> bool {
        matches!(self, VisualEntity::Group(_))
    }

    /// Returns the semantic id this entity is a view of.
    ///
    /// Diagram nodes and groups represent no semantic entity.
    pub fn represented(&self) -> Option<Id> {
        match self {
            VisualEntity::Node(node) => Some(node.represented_entity),
            VisualEntity::Relationship(edge) => Some(edge.represented_relationship),
            VisualEntity::ProfileRelationship(edge) => Some(edge.entity),
            VisualEntity::DiagramNode(_) | VisualEntity::Group(_) => None,
        }
    }

    /// Returns `(source, target)` for edges.
    pub fn edge_ends(&self) -> Option<(Id, Id)> {
        match self {
            VisualEntity::Relationship(edge) => Some((edge.source, edge.target)),
            VisualEntity::ProfileRelationship(edge) => Some((edge.source, edge.target)),
            _ => None,
        }
    }

    /// Returns the position of nodes and diagram nodes.
    pub fn position(&self) -> Option<Position> {
        match self {
            VisualEntity::Node(node) => Some(node.position),
            VisualEntity::DiagramNode(node) => Some(node.position),
            _ => None,
        }
    }

    /// Returns the waypoints of edges.
    pub fn waypoints(&self) -> Option<&[Point]> {
        match self {
            VisualEntity::Relationship(edge) => Some(&edge.waypoints),
            VisualEntity::ProfileRelationship(edge) => Some(&edge.waypoints),
            _ => None,
        }
    }

    /// Returns the members of a group.
    pub fn group_content(&self) -> Option<&[Id]> {
        match self {
            VisualEntity::Group(group) => Some(&group.content),
            _ => None,
        }
    }

    /// Returns every visual id this entity refers to: edge ends and group members.
    pub fn references(&self) -> Vec<Id> {
        match self {
            VisualEntity::Relationship(edge) => vec![edge.source, edge.target],
            VisualEntity::ProfileRelationship(edge) => vec![edge.source, edge.target],
            VisualEntity::Group(group) => group.content.clone(),
            VisualEntity::Node(_) | VisualEntity::DiagramNode(_) => Vec::new(),
        }
    }

    /// Returns a copy of this entity under a new identifier.
    pub fn with_id(&self, id: Id) -> Self {
        let mut copy = self.clone();
        match &mut copy {
            VisualEntity::Node(node) => node.id = id,
            VisualEntity::DiagramNode(node) => node.id = id,
            VisualEntity::Relationship(edge) => edge.id = id,
            VisualEntity::ProfileRelationship(edge) => edge.id = id,
            VisualEntity::Group(group) => group.id = id,
        }
        copy
    }

    /// Applies the fields of `patch` that make sense for this entity kind.
    ///
    /// Fields that do not apply are ignored. Reference validation is the
    /// caller's responsibility.
    pub fn apply(&mut self, patch: &VisualPatch) {
        match self {
            VisualEntity::Node(node) => {
                if let Some(position) = patch.position {
                    node.position = position;
                }
                if let Some(content) = &patch.content {
                    node.content = content.clone();
                }
            }
            VisualEntity::DiagramNode(node) => {
                if let Some(position) = patch.position {
                    node.position = position;
                }
                if let Some(label) = &patch.label {
                    node.label = label.clone();
                }
                if let Some(description) = &patch.description {
                    node.description = description.clone();
                }
            }
            VisualEntity::Relationship(VisualRelationship {
                source,
                target,
                waypoints,
                ..
            })
            | VisualEntity::ProfileRelationship(VisualProfileRelationship {
                source,
                target,
                waypoints,
                ..
            }) => {
                if let Some(new_source) = patch.source {
                    *source = new_source;
                }
                if let Some(new_target) = patch.target {
                    *target = new_target;
                }
                if let Some(new_waypoints) = &patch.waypoints {
                    *waypoints = new_waypoints.clone();
                }
            }
            VisualEntity::Group(group) => {
                if let Some(content) = &patch.content {
                    group.content = content.clone();
                }
                if let Some(anchored) = patch.anchored {
                    group.anchored = anchored;
                }
            }
        }
    }
}

impl From<VisualNode> for VisualEntity {
    fn from(node: VisualNode) -> Self {
        VisualEntity::Node(node)
    }
}

impl From<VisualDiagramNode> for VisualEntity {
    fn from(node: VisualDiagramNode) -> Self {
        VisualEntity::DiagramNode(node)
    }
}

impl From<VisualRelationship> for VisualEntity {
    fn from(edge: VisualRelationship) -> Self {
        VisualEntity::Relationship(edge)
    }
}

impl From<VisualProfileRelationship> for VisualEntity {
    fn from(edge: VisualProfileRelationship) -> Self {
        VisualEntity::ProfileRelationship(edge)
    }
}

impl From<VisualGroup> for VisualEntity {
    fn from(group: VisualGroup) -> Self {
        VisualEntity::Group(group)
    }
}

impl fmt::Display for VisualEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisualEntity::Node(node) => write!(
                f,
                "node {} -> {} at ({}, {})",
                node.id,
                node.represented_entity,
                node.position.x(),
                node.position.y()
            ),
            VisualEntity::DiagramNode(node) => write!(
                f,
                "diagram node {} -> model {} at ({}, {})",
                node.id,
                node.represented_visual_model,
                node.position.x(),
                node.position.y()
            ),
            VisualEntity::Relationship(edge) => write!(
                f,
                "relationship {} -> {}: {} => {}",
                edge.id, edge.represented_relationship, edge.source, edge.target
            ),
            VisualEntity::ProfileRelationship(edge) => write!(
                f,
                "profile relationship {} -> {}: {} => {}",
                edge.id, edge.entity, edge.source, edge.target
            ),
            VisualEntity::Group(group) => {
                write!(f, "group {} [", group.id)?;
                for (idx, member) in group.content.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{member}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A partial update of a visual entity.
///
/// # Examples
///
/// ```
/// use tessera_core::{identifier::Id, visual::{Position, VisualEntity, VisualNode, VisualPatch}};
///
/// let mut entity: VisualEntity =
///     VisualNode::new(Id::new("n"), Id::new("Person"), Id::new("m"), Position::new(0.0, 0.0)).into();
/// entity.apply(&VisualPatch::new().with_position(Position::new(5.0, 5.0)));
///
/// assert_eq!(entity.position(), Some(Position::new(5.0, 5.0)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisualPatch {
    position: Option<Position>,
    content: Option<Vec<Id>>,
    source: Option<Id>,
    target: Option<Id>,
    waypoints: Option<Vec<Point>>,
    anchored: Option<Option<bool>>,
    label: Option<String>,
    description: Option<Option<String>>,
}

impl VisualPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Sets the attribute list of a node or the members of a group.
    pub fn with_content(mut self, content: Vec<Id>) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_source(mut self, source: Id) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_target(mut self, target: Id) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_waypoints(mut self, waypoints: Vec<Point>) -> Self {
        self.waypoints = Some(waypoints);
        self
    }

    pub fn with_anchored(mut self, anchored: Option<bool>) -> Self {
        self.anchored = Some(anchored);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn content(&self) -> Option<&[Id]> {
        self.content.as_deref()
    }

    pub fn source(&self) -> Option<Id> {
        self.source
    }

    pub fn target(&self) -> Option<Id> {
        self.target
    }
}
