//! Scene files.
//!
//! A scene is a TOML document describing a semantic catalog, the visual
//! models showing it and a list of editing actions to replay:
//!
//! ```toml
//! viewport = [800.0, 600.0]
//!
//! [[semantic.classes]]
//! id = "Person"
//!
//! [[models]]
//! id = "main"
//!
//! [[models.nodes]]
//! id = "person"
//! represents = "Person"
//! at = [0.0, 0.0]
//!
//! [[actions]]
//! action = "neighborhood"
//! model = "main"
//! entity = "person"
//! ```
//!
//! Semantic entities and visual nodes without a `model` belong to the
//! `vocabulary` semantic model.

use log::{debug, trace};
use serde::Deserialize;

use tessera::{
    Editor, TesseraError,
    alignment::Alignment,
    geometry::Point,
    identifier::Id,
    registry::VisualModelRegistry,
    semantic::{
        Class, ClassProfile, Generalization, Relationship, RelationshipProfile, SemanticCatalog,
    },
    store::VisualModel,
    visual::{
        Position, VisualDiagramNode, VisualGroup, VisualNode, VisualProfileRelationship,
        VisualRelationship,
    },
};

use crate::error::CliError;

fn default_semantic_model() -> Id {
    Id::new("vocabulary")
}

fn point([x, y]: [f32; 2]) -> Point {
    Point::new(x, y)
}

/// A parsed scene file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scene {
    viewport: Option<[f32; 2]>,
    semantic: SemanticSpec,
    models: Vec<ModelSpec>,
    actions: Vec<Action>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SemanticSpec {
    classes: Vec<ClassSpec>,
    class_profiles: Vec<ClassProfileSpec>,
    relationships: Vec<RelationshipSpec>,
    relationship_profiles: Vec<RelationshipProfileSpec>,
    generalizations: Vec<GeneralizationSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClassSpec {
    id: Id,
    #[serde(default = "default_semantic_model")]
    model: Id,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClassProfileSpec {
    id: Id,
    #[serde(default = "default_semantic_model")]
    model: Id,
    profiling: Vec<Id>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RelationshipSpec {
    id: Id,
    #[serde(default = "default_semantic_model")]
    model: Id,
    domain: Id,
    range: Id,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RelationshipProfileSpec {
    id: Id,
    #[serde(default = "default_semantic_model")]
    model: Id,
    profiling: Vec<Id>,
    domain: Option<Id>,
    range: Option<Id>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneralizationSpec {
    id: Id,
    #[serde(default = "default_semantic_model")]
    model: Id,
    child: Id,
    parent: Id,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelSpec {
    id: Id,
    label: Option<String>,
    #[serde(default)]
    nodes: Vec<NodeSpec>,
    #[serde(default)]
    diagram_nodes: Vec<DiagramNodeSpec>,
    #[serde(default)]
    relationships: Vec<EdgeSpec>,
    #[serde(default)]
    profile_relationships: Vec<EdgeSpec>,
    #[serde(default)]
    groups: Vec<GroupSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeSpec {
    id: Id,
    represents: Id,
    #[serde(default = "default_semantic_model")]
    model: Id,
    #[serde(default)]
    at: [f32; 2],
    #[serde(default)]
    anchored: bool,
    #[serde(default)]
    content: Vec<Id>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DiagramNodeSpec {
    id: Id,
    /// The visual model behind the diagram node.
    represents: Id,
    #[serde(default)]
    at: [f32; 2],
    #[serde(default)]
    anchored: bool,
    label: Option<String>,
    description: Option<String>,
}

/// A relationship edge, or a profile edge when listed under
/// `profile_relationships` (then `represents` is the class profile).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EdgeSpec {
    id: Id,
    represents: Id,
    #[serde(default = "default_semantic_model")]
    model: Id,
    source: Id,
    target: Id,
    #[serde(default)]
    waypoints: Vec<[f32; 2]>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GroupSpec {
    id: Id,
    content: Vec<Id>,
    anchored: Option<bool>,
}

/// An editing action replayed through the [`Editor`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Action {
    Viewport {
        center: [f32; 2],
    },
    Group {
        model: Id,
        members: Vec<Id>,
        #[serde(default)]
        anchored: Option<bool>,
    },
    RemoveGroup {
        model: Id,
        group: Id,
    },
    RemoveFromGroup {
        model: Id,
        group: Id,
        members: Vec<Id>,
    },
    RemoveEntities {
        model: Id,
        ids: Vec<Id>,
    },
    RemoveRepresented {
        model: Id,
        represented: Vec<Id>,
    },
    PurgeRepresented {
        represented: Vec<Id>,
    },
    Collapse {
        model: Id,
        selection: Vec<Id>,
    },
    AddDiagramNode {
        model: Id,
        represents: Id,
    },
    Expand {
        model: Id,
        diagram_node: Id,
    },
    Dissolve {
        model: Id,
        diagram_node: Id,
    },
    AddRelationships {
        model: Id,
        diagram_node: Id,
    },
    Neighborhood {
        model: Id,
        entity: Id,
    },
    Align {
        model: Id,
        ids: Vec<Id>,
        alignment: Alignment,
    },
    Layout {
        model: Id,
        selection: Vec<Id>,
    },
    DescribeDiagramNode {
        model: Id,
        diagram_node: Id,
        label: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Viewport { .. } => "viewport",
            Action::Group { .. } => "group",
            Action::RemoveGroup { .. } => "remove-group",
            Action::RemoveFromGroup { .. } => "remove-from-group",
            Action::RemoveEntities { .. } => "remove-entities",
            Action::RemoveRepresented { .. } => "remove-represented",
            Action::PurgeRepresented { .. } => "purge-represented",
            Action::Collapse { .. } => "collapse",
            Action::AddDiagramNode { .. } => "add-diagram-node",
            Action::Expand { .. } => "expand",
            Action::Dissolve { .. } => "dissolve",
            Action::AddRelationships { .. } => "add-relationships",
            Action::Neighborhood { .. } => "neighborhood",
            Action::Align { .. } => "align",
            Action::Layout { .. } => "layout",
            Action::DescribeDiagramNode { .. } => "describe-diagram-node",
        }
    }

    /// Replays the action. Returns whether it succeeded; failures have
    /// already been reported to the editor's notification sink.
    pub fn apply(&self, editor: &mut Editor<'_>) -> bool {
        debug!(action = self.name(); "Replaying action");
        match self {
            Action::Viewport { center } => {
                editor.set_viewport_center(point(*center));
                true
            }
            Action::Group {
                model,
                members,
                anchored,
            } => editor.add_group(*model, members, *anchored).is_some(),
            Action::RemoveGroup { model, group } => editor.remove_group(*model, *group).is_some(),
            Action::RemoveFromGroup {
                model,
                group,
                members,
            } => editor.remove_from_group(*model, *group, members).is_some(),
            Action::RemoveEntities { model, ids } => {
                editor.remove_visual_entities(*model, ids).is_some()
            }
            Action::RemoveRepresented { model, represented } => editor
                .remove_represented_entities(*model, represented)
                .is_some(),
            Action::PurgeRepresented { represented } => {
                editor.purge_represented_entities(represented);
                true
            }
            Action::Collapse { model, selection } => editor.collapse(*model, selection).is_some(),
            Action::AddDiagramNode { model, represents } => editor
                .add_diagram_node_for_existing_model(*model, *represents)
                .is_some(),
            Action::Expand {
                model,
                diagram_node,
            } => editor.expand(*model, *diagram_node).is_some(),
            Action::Dissolve {
                model,
                diagram_node,
            } => editor.dissolve(*model, *diagram_node).is_some(),
            Action::AddRelationships {
                model,
                diagram_node,
            } => editor
                .add_relationships_for_diagram_node(*model, *diagram_node)
                .is_some(),
            Action::Neighborhood { model, entity } => {
                editor.add_neighborhood(*model, *entity).is_some()
            }
            Action::Align {
                model,
                ids,
                alignment,
            } => editor.align(*model, ids, *alignment).is_some(),
            Action::Layout { model, selection } => editor.layout(*model, selection).is_some(),
            Action::DescribeDiagramNode {
                model,
                diagram_node,
                label,
                description,
            } => editor
                .describe_diagram_node(*model, *diagram_node, label, description.clone())
                .is_some(),
        }
    }
}

impl Scene {
    /// Parses a scene from TOML source.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Toml`] with the offending span when the source is
    /// not a valid scene.
    pub fn parse(source: &str) -> Result<Self, CliError> {
        toml::from_str(source).map_err(|err| CliError::new_toml_error(err, source))
    }

    pub fn viewport(&self) -> Option<Point> {
        self.viewport.map(point)
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Builds the semantic catalog described by the scene.
    pub fn semantic_catalog(&self) -> SemanticCatalog {
        let spec = &self.semantic;
        let mut catalog = SemanticCatalog::new();
        for class in &spec.classes {
            catalog.add_class(Class::new(class.id, class.model));
        }
        for profile in &spec.class_profiles {
            catalog.add_class_profile(ClassProfile::new(
                profile.id,
                profile.model,
                profile.profiling.clone(),
            ));
        }
        for relationship in &spec.relationships {
            catalog.add_relationship(Relationship::new(
                relationship.id,
                relationship.model,
                relationship.domain,
                relationship.range,
            ));
        }
        for profile in &spec.relationship_profiles {
            let mut relationship_profile =
                RelationshipProfile::new(profile.id, profile.model, profile.profiling.clone());
            if let Some(domain) = profile.domain {
                relationship_profile = relationship_profile.with_domain(domain);
            }
            if let Some(range) = profile.range {
                relationship_profile = relationship_profile.with_range(range);
            }
            catalog.add_relationship_profile(relationship_profile);
        }
        for generalization in &spec.generalizations {
            catalog.add_generalization(Generalization::new(
                generalization.id,
                generalization.model,
                generalization.child,
                generalization.parent,
            ));
        }
        debug!(entities = catalog.len(); "Built semantic catalog");
        catalog
    }

    /// Builds the visual models described by the scene.
    ///
    /// Groups may be listed in any order; a group is added once all of its
    /// members exist.
    ///
    /// # Errors
    ///
    /// Returns the store error for the first entity that cannot be added,
    /// and [`TesseraError::DuplicateIdentifier`] for a repeated model id.
    pub fn visual_models(&self) -> Result<VisualModelRegistry, TesseraError> {
        let mut registry = VisualModelRegistry::new();
        for spec in &self.models {
            registry.insert(spec.build()?)?;
        }
        Ok(registry)
    }
}

impl ModelSpec {
    fn build(&self) -> Result<VisualModel, TesseraError> {
        let mut model = VisualModel::new(self.id);
        if let Some(label) = &self.label {
            model = model.with_label(label.as_str());
        }

        for node in &self.nodes {
            model.add(
                VisualNode::new(
                    node.id,
                    node.represents,
                    node.model,
                    Position::from_point(point(node.at)).with_anchored(node.anchored),
                )
                .with_content(node.content.clone()),
            )?;
        }
        for node in &self.diagram_nodes {
            let mut diagram_node = VisualDiagramNode::new(
                node.id,
                node.represents,
                Position::from_point(point(node.at)).with_anchored(node.anchored),
            );
            if let Some(label) = &node.label {
                diagram_node = diagram_node.with_label(label.as_str());
            }
            if let Some(description) = &node.description {
                diagram_node = diagram_node.with_description(description.as_str());
            }
            model.add(diagram_node)?;
        }
        for edge in &self.relationships {
            model.add(
                VisualRelationship::new(edge.id, edge.represents, edge.model, edge.source, edge.target)
                    .with_waypoints(edge.waypoints.iter().copied().map(point).collect()),
            )?;
        }
        for edge in &self.profile_relationships {
            model.add(
                VisualProfileRelationship::new(
                    edge.id,
                    edge.represents,
                    edge.model,
                    edge.source,
                    edge.target,
                )
                .with_waypoints(edge.waypoints.iter().copied().map(point).collect()),
            )?;
        }

        let mut pending: Vec<&GroupSpec> = self.groups.iter().collect();
        while !pending.is_empty() {
            let ready = pending
                .iter()
                .position(|group| group.content.iter().all(|member| model.contains(*member)))
                .unwrap_or(0);
            let group = pending.remove(ready);
            model.add(VisualGroup::new(group.id, group.content.clone()).with_anchored(group.anchored))?;
            trace!(model = self.id.to_string(), group = group.id.to_string(); "Added group");
        }

        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use tessera::semantic::SemanticModelProvider;

    use super::*;

    const SCENE: &str = r#"
        viewport = [500.0, 400.0]

        [[semantic.classes]]
        id = "Person"

        [[semantic.classes]]
        id = "Address"
        model = "geo"

        [[semantic.relationships]]
        id = "livesAt"
        domain = "Person"
        range = "Address"

        [[models]]
        id = "main"
        label = "Main"

        [[models.nodes]]
        id = "p"
        represents = "Person"
        at = [10.0, 20.0]

        [[models.nodes]]
        id = "a"
        represents = "Address"
        model = "geo"
        at = [300.0, 20.0]
        anchored = true

        [[models.relationships]]
        id = "e"
        represents = "livesAt"
        source = "p"
        target = "a"
        waypoints = [[150.0, 50.0]]

        [[models.groups]]
        id = "outer"
        content = ["inner"]

        [[models.groups]]
        id = "inner"
        content = ["p", "a"]

        [[actions]]
        action = "remove-entities"
        model = "main"
        ids = ["e"]

        [[actions]]
        action = "align"
        model = "main"
        ids = ["p", "a"]
        alignment = "top"
    "#;

    #[test]
    fn test_parse_scene() {
        let scene = Scene::parse(SCENE).unwrap();

        assert_eq!(scene.viewport(), Some(Point::new(500.0, 400.0)));
        assert_eq!(scene.actions().len(), 2);
        assert_eq!(
            scene.actions()[0],
            Action::RemoveEntities {
                model: Id::new("main"),
                ids: vec![Id::new("e")],
            }
        );
        assert_eq!(scene.actions()[1].name(), "align");
    }

    #[test]
    fn test_build_catalog_and_models() {
        let scene = Scene::parse(SCENE).unwrap();

        let catalog = scene.semantic_catalog();
        assert_eq!(catalog.len(), 3);

        let registry = scene.visual_models().unwrap();
        let main = registry.get(Id::new("main")).unwrap();
        assert_eq!(main.label(), "Main");
        assert_eq!(main.len(), 5);
        assert_eq!(main.group(Id::new("outer")).unwrap().content(), &[Id::new("inner")]);
        assert!(main.get(Id::new("a")).and_then(|e| e.position()).unwrap().anchored());
        assert_eq!(
            main.get(Id::new("e")).and_then(|e| e.waypoints()),
            Some(&[Point::new(150.0, 50.0)][..])
        );
    }

    #[test]
    fn test_relationship_profile_keeps_single_end_override() {
        let source = r#"
            [[semantic.classes]]
            id = "Person"

            [[semantic.classes]]
            id = "Address"

            [[semantic.classes]]
            id = "HomeAddress"

            [[semantic.relationships]]
            id = "lives-at"
            domain = "Person"
            range = "Address"

            [[semantic.relationship_profiles]]
            id = "lives-at-home"
            profiling = ["lives-at"]
            range = "HomeAddress"
        "#;

        let catalog = Scene::parse(source).unwrap().semantic_catalog();

        assert_eq!(
            catalog.relationship_ends(Id::new("lives-at-home")),
            Some((Id::new("Person"), Id::new("HomeAddress")))
        );
    }

    #[test]
    fn test_invalid_scene_keeps_span() {
        let source = "viewport = \"center\"\n";

        let Err(CliError::Toml { span, src, .. }) = Scene::parse(source) else {
            panic!("expected a TOML error");
        };
        assert_eq!(src, source);
        assert!(span.is_some());
    }

    #[test]
    fn test_unknown_action() {
        let source = "[[actions]]\naction = \"explode\"\nmodel = \"main\"\n";
        assert!(matches!(Scene::parse(source), Err(CliError::Toml { .. })));
    }

    #[test]
    fn test_dangling_edge_is_rejected() {
        let source = r#"
            [[models]]
            id = "main"

            [[models.relationships]]
            id = "e"
            represents = "r"
            source = "nowhere"
            target = "nowhere"
        "#;

        let scene = Scene::parse(source).unwrap();
        assert!(matches!(
            scene.visual_models(),
            Err(TesseraError::DanglingReference { .. })
        ));
    }
}
