//! The editing facade.
//!
//! [`Editor`] owns the visual model registry and runs every user-facing
//! editing action against it. Actions never return errors: failures are
//! reported to the [`NotificationSink`] and the action is skipped. Actions
//! made of several steps run against a checkpoint of the registry, which is
//! restored when a step fails.

use log::{info, warn};

use tessera_core::{
    geometry::Point, identifier::Id, semantic::SemanticModelProvider, visual::VisualPatch,
};

use crate::{
    alignment::{Alignment, align_nodes},
    config::EngineConfig,
    diagram_node::{
        CollapseOutcome, ExpandOutcome, add_visual_diagram_node_for_existing_model,
        add_visual_diagram_node_for_new_model, dissolve_visual_diagram_node,
        put_visual_diagram_node_content_to_visual_model,
    },
    error::TesseraError,
    group::{add_group, remove_group, remove_part_of_group_content},
    layout::{FixedSizes, LayoutEngine, OverlapRemoval, SizeQuery, apply_layout_result},
    neighborhood::{add_all_relationships_for_visual_diagram_node, add_entity_neighborhood},
    notification::{LogNotifications, NotificationSink},
    registry::VisualModelRegistry,
    removal::{
        collect_direct_visual_entities_to_remove, collect_indirect_visual_entities_to_remove,
        remove_visual_entities_from_visual_model,
    },
};

/// Runs editing actions on a set of visual models.
///
/// # Examples
///
/// ```rust
/// use tessera::{
///     Editor,
///     identifier::Id,
///     notification::NotificationLog,
///     registry::VisualModelRegistry,
///     semantic::SemanticCatalog,
///     store::VisualModel,
///     visual::{Position, VisualNode},
/// };
///
/// let semantic = SemanticCatalog::new().with_class(Id::new("Person"), Id::new("vocabulary"));
///
/// let mut model = VisualModel::new(Id::new("main"));
/// model
///     .add(VisualNode::new(
///         Id::new("person"),
///         Id::new("Person"),
///         Id::new("vocabulary"),
///         Position::new(0.0, 0.0),
///     ))
///     .unwrap();
/// let mut registry = VisualModelRegistry::new();
/// registry.insert(model).unwrap();
///
/// let notifications = NotificationLog::new();
/// let mut editor = Editor::new(registry, &semantic).with_notifications(&notifications);
///
/// let removed = editor.remove_visual_entities(Id::new("main"), &[Id::new("person")]);
/// assert_eq!(removed, Some(1));
/// assert!(notifications.errors().is_empty());
/// ```
pub struct Editor<'a> {
    registry: VisualModelRegistry,
    semantic: &'a dyn SemanticModelProvider,
    config: EngineConfig,
    layout: Box<dyn LayoutEngine + 'a>,
    sizes: Box<dyn SizeQuery + 'a>,
    notifications: Box<dyn NotificationSink + 'a>,
    viewport_center: Point,
}

impl<'a> Editor<'a> {
    /// Creates an editor with the default configuration, [`OverlapRemoval`]
    /// as layout engine, [`FixedSizes`] and [`LogNotifications`].
    pub fn new(registry: VisualModelRegistry, semantic: &'a dyn SemanticModelProvider) -> Self {
        let config = EngineConfig::default();
        Self {
            registry,
            semantic,
            sizes: Box::new(FixedSizes::new(config.sizes().clone())),
            config,
            layout: Box::new(OverlapRemoval::new()),
            notifications: Box::new(LogNotifications),
            viewport_center: Point::default(),
        }
    }

    /// Replaces the configuration. Node sizes are answered from the new
    /// configuration unless a size query is set afterwards.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.sizes = Box::new(FixedSizes::new(config.sizes().clone()));
        self.config = config;
        self
    }

    pub fn with_layout_engine(mut self, layout: impl LayoutEngine + 'a) -> Self {
        self.layout = Box::new(layout);
        self
    }

    pub fn with_size_query(mut self, sizes: impl SizeQuery + 'a) -> Self {
        self.sizes = Box::new(sizes);
        self
    }

    pub fn with_notifications(mut self, notifications: impl NotificationSink + 'a) -> Self {
        self.notifications = Box::new(notifications);
        self
    }

    pub fn with_viewport_center(mut self, center: Point) -> Self {
        self.viewport_center = center;
        self
    }

    /// Sets where new diagram nodes are placed.
    pub fn set_viewport_center(&mut self, center: Point) {
        self.viewport_center = center;
    }

    pub fn viewport_center(&self) -> Point {
        self.viewport_center
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &VisualModelRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut VisualModelRegistry {
        &mut self.registry
    }

    pub fn into_registry(self) -> VisualModelRegistry {
        self.registry
    }

    /// Groups `members` of `model`. See [`add_group`].
    pub fn add_group(&mut self, model: Id, members: &[Id], anchored: Option<bool>) -> Option<Id> {
        let result = self
            .registry
            .model_mut(model)
            .and_then(|visual_model| add_group(visual_model, members, anchored));
        report(
            self.notifications.as_ref(),
            "Group nodes",
            result,
            |group| format!("Created group `{group}`"),
        )
    }

    /// Deletes `group`, leaving its members in the model.
    pub fn remove_group(&mut self, model: Id, group: Id) -> Option<()> {
        let result = self
            .registry
            .model_mut(model)
            .and_then(|visual_model| remove_group(visual_model, group));
        report(self.notifications.as_ref(), "Remove group", result, |_| {
            format!("Removed group `{group}`")
        })
    }

    /// Takes `members` out of `group`. Returns whether the group dissolved.
    pub fn remove_from_group(&mut self, model: Id, group: Id, members: &[Id]) -> Option<bool> {
        let result = self.registry.model_mut(model).and_then(|visual_model| {
            remove_part_of_group_content(visual_model, group, members)
        });
        report(
            self.notifications.as_ref(),
            "Remove from group",
            result,
            |dissolved| {
                if *dissolved {
                    format!("Group `{group}` dissolved")
                } else {
                    format!("Removed {} members from group `{group}`", members.len())
                }
            },
        )
    }

    /// Removes visual entities with the edges attached to them.
    ///
    /// Ids missing from `model` are reported and skipped; the others are
    /// still removed. Returns how many entities left the model.
    pub fn remove_visual_entities(&mut self, model: Id, ids: &[Id]) -> Option<usize> {
        let notifications = self.notifications.as_ref();
        checkpointed(
            &mut self.registry,
            notifications,
            "Remove entities",
            |registry| {
                let visual_model = registry.model_mut(model)?;
                let (present, missing): (Vec<Id>, Vec<Id>) =
                    ids.iter().copied().partition(|id| visual_model.contains(*id));
                for id in missing {
                    skip(
                        notifications,
                        "Remove entities",
                        TesseraError::missing("visual entity", id),
                    );
                }
                let set = collect_direct_visual_entities_to_remove(visual_model, &present)?;
                remove_visual_entities_from_visual_model(visual_model, &set)
            },
            |removed| format!("Removed {removed} visual entities"),
        )
    }

    /// Removes every visual realization of the semantic entities
    /// `represented` from `model`, including edges whose semantic end is
    /// hidden behind a diagram node.
    ///
    /// Ids unknown to the semantic model are reported and skipped.
    pub fn remove_represented_entities(&mut self, model: Id, represented: &[Id]) -> Option<usize> {
        let known = self.known_semantic_entities("Remove represented entities", represented);
        self.remove_known_represented_entities(model, &known)
    }

    /// Removes the realizations of `represented` from every visual model.
    ///
    /// Each model is its own unit of work: a failure in one model is
    /// reported and the others are still processed. Returns the total
    /// number of removed entities.
    pub fn purge_represented_entities(&mut self, represented: &[Id]) -> usize {
        let known = self.known_semantic_entities("Purge represented entities", represented);
        let models: Vec<Id> = self
            .registry
            .available_visual_models()
            .map(|model| model.id())
            .collect();
        models
            .into_iter()
            .filter_map(|model| self.remove_known_represented_entities(model, &known))
            .sum()
    }

    fn remove_known_represented_entities(&mut self, model: Id, represented: &[Id]) -> Option<usize> {
        let semantic = self.semantic;
        checkpointed(
            &mut self.registry,
            self.notifications.as_ref(),
            "Remove represented entities",
            |registry| {
                let set =
                    collect_indirect_visual_entities_to_remove(registry, model, semantic, represented)?;
                remove_visual_entities_from_visual_model(registry.model_mut(model)?, &set)
            },
            |removed| format!("Removed {removed} visual entities"),
        )
    }

    /// Keeps the ids the semantic model knows, reporting the others.
    fn known_semantic_entities(&self, action: &str, ids: &[Id]) -> Vec<Id> {
        let (known, unknown): (Vec<Id>, Vec<Id>) = ids
            .iter()
            .copied()
            .partition(|id| self.semantic.find_source_model_of_entity(*id).is_some());
        for id in unknown {
            skip(
                self.notifications.as_ref(),
                action,
                TesseraError::missing("semantic entity", id),
            );
        }
        known
    }

    /// Collapses `selection` into a new visual model behind a diagram node
    /// placed at the viewport center.
    pub fn collapse(&mut self, model: Id, selection: &[Id]) -> Option<CollapseOutcome> {
        let center = self.viewport_center;
        let config = &self.config;
        checkpointed(
            &mut self.registry,
            self.notifications.as_ref(),
            "Create diagram node",
            |registry| add_visual_diagram_node_for_new_model(registry, model, selection, center, config),
            |outcome| {
                format!(
                    "Collapsed {} entities into diagram node `{}`",
                    selection.len(),
                    outcome.diagram_node()
                )
            },
        )
    }

    /// Places a diagram node for the existing visual model `represented` at
    /// the viewport center and draws its relationships to the rest of `model`.
    pub fn add_diagram_node_for_existing_model(
        &mut self,
        model: Id,
        represented: Id,
    ) -> Option<Id> {
        let semantic = self.semantic;
        let sizes = self.config.sizes();
        let position = self.viewport_center.sub_point(Point::new(
            sizes.diagram_node_width() / 2.0,
            sizes.diagram_node_height() / 2.0,
        ));
        checkpointed(
            &mut self.registry,
            self.notifications.as_ref(),
            "Add diagram node",
            |registry| {
                let diagram_node =
                    add_visual_diagram_node_for_existing_model(registry, model, represented, position)?;
                add_all_relationships_for_visual_diagram_node(registry, semantic, model, diagram_node)?;
                Ok(diagram_node)
            },
            |diagram_node| format!("Added diagram node `{diagram_node}`"),
        )
    }

    /// Copies the content behind `diagram_node` into `model`.
    ///
    /// A failed layout is reported but keeps the expanded content.
    pub fn expand(&mut self, model: Id, diagram_node: Id) -> Option<ExpandOutcome> {
        let outcome = checkpointed(
            &mut self.registry,
            self.notifications.as_ref(),
            "Expand diagram node",
            |registry| {
                put_visual_diagram_node_content_to_visual_model(
                    registry,
                    self.semantic,
                    model,
                    diagram_node,
                    self.layout.as_ref(),
                    &self.config,
                    self.sizes.as_ref(),
                )
            },
            |outcome| format!("Expanded {} entities", outcome.copies().len()),
        )?;
        self.report_layout_error(&outcome);
        Some(outcome)
    }

    /// Expands `diagram_node` and removes it.
    pub fn dissolve(&mut self, model: Id, diagram_node: Id) -> Option<ExpandOutcome> {
        let outcome = checkpointed(
            &mut self.registry,
            self.notifications.as_ref(),
            "Dissolve diagram node",
            |registry| {
                dissolve_visual_diagram_node(
                    registry,
                    self.semantic,
                    model,
                    diagram_node,
                    self.layout.as_ref(),
                    &self.config,
                    self.sizes.as_ref(),
                )
            },
            |_| format!("Dissolved diagram node `{diagram_node}`"),
        )?;
        self.report_layout_error(&outcome);
        Some(outcome)
    }

    fn report_layout_error(&self, outcome: &ExpandOutcome) {
        if let Some(err) = outcome.layout_error() {
            self.notifications
                .error(&format!("Layout failed, expanded content kept in place: {err}"));
        }
    }

    /// Adds the missing edges of `diagram_node`.
    pub fn add_relationships_for_diagram_node(
        &mut self,
        model: Id,
        diagram_node: Id,
    ) -> Option<Vec<Id>> {
        let semantic = self.semantic;
        checkpointed(
            &mut self.registry,
            self.notifications.as_ref(),
            "Add relationships",
            |registry| {
                add_all_relationships_for_visual_diagram_node(registry, semantic, model, diagram_node)
            },
            |created| format!("Added {} relationships", created.len()),
        )
    }

    /// Adds the missing neighbours and edges of `entity`.
    pub fn add_neighborhood(&mut self, model: Id, entity: Id) -> Option<Vec<Id>> {
        let semantic = self.semantic;
        let config = &self.config;
        checkpointed(
            &mut self.registry,
            self.notifications.as_ref(),
            "Add neighborhood",
            |registry| add_entity_neighborhood(registry, semantic, model, entity, config),
            |created| format!("Added {} visual entities", created.len()),
        )
    }

    /// Lines up `ids` on a common edge or center line.
    pub fn align(&mut self, model: Id, ids: &[Id], alignment: Alignment) -> Option<usize> {
        let result = self
            .registry
            .model_mut(model)
            .and_then(|visual_model| align_nodes(visual_model, ids, alignment, self.sizes.as_ref()));
        report(self.notifications.as_ref(), "Align", result, |moved| {
            format!("Aligned {moved} nodes")
        })
    }

    /// Runs the layout engine over `selection` and applies the result.
    ///
    /// Returns how many entities received a new position or route.
    pub fn layout(&mut self, model: Id, selection: &[Id]) -> Option<usize> {
        checkpointed(
            &mut self.registry,
            self.notifications.as_ref(),
            "Layout",
            |registry| {
                let visual_model = registry.model_mut(model)?;
                let result = self.layout.perform_layout(
                    visual_model,
                    self.semantic,
                    selection,
                    self.config.layout(),
                    self.sizes.as_ref(),
                )?;
                apply_layout_result(visual_model, &result)?;
                Ok(result.len())
            },
            |changed| format!("Laid out {changed} entities"),
        )
    }

    /// Renames a visual model's diagram node or changes its description.
    pub fn describe_diagram_node(
        &mut self,
        model: Id,
        diagram_node: Id,
        label: &str,
        description: Option<String>,
    ) -> Option<()> {
        let result = self.registry.model_mut(model).and_then(|visual_model| {
            visual_model
                .diagram_node(diagram_node)
                .ok_or(TesseraError::missing("diagram node", diagram_node))?;
            visual_model.update(
                diagram_node,
                &VisualPatch::new()
                    .with_label(label)
                    .with_description(description),
            )
        });
        report(
            self.notifications.as_ref(),
            "Edit diagram node",
            result,
            |_| format!("Updated diagram node `{diagram_node}`"),
        )
    }
}

/// Turns `result` into a notification.
fn report<T>(
    notifications: &dyn NotificationSink,
    action: &str,
    result: Result<T, TesseraError>,
    success: impl FnOnce(&T) -> String,
) -> Option<T> {
    match result {
        Ok(value) => {
            let message = success(&value);
            info!(action = action, message = message.as_str(); "Action completed");
            notifications.success(&message);
            Some(value)
        }
        Err(err) => {
            warn!(action = action, err:% = err; "Action failed");
            notifications.error(&format!("{action}: {err}"));
            None
        }
    }
}

/// Reports a unit of work skipped while the rest of the action goes on.
fn skip(notifications: &dyn NotificationSink, action: &str, err: TesseraError) {
    warn!(action = action, err:% = err; "Skipped");
    notifications.error(&format!("{action}: {err}"));
}

/// Runs `run` against `registry`, restoring the registry if it fails.
fn checkpointed<T>(
    registry: &mut VisualModelRegistry,
    notifications: &dyn NotificationSink,
    action: &str,
    run: impl FnOnce(&mut VisualModelRegistry) -> Result<T, TesseraError>,
    success: impl FnOnce(&T) -> String,
) -> Option<T> {
    let checkpoint = registry.clone();
    let result = run(registry);
    if result.is_err() {
        *registry = checkpoint;
    }
    report(notifications, action, result, success)
}

#[cfg(test)]
mod tests {
    use tessera_core::{
        semantic::SemanticCatalog,
        visual::{Position, VisualDiagramNode, VisualNode},
    };

    use crate::{notification::NotificationLog, store::VisualModel};

    use super::*;

    fn registry() -> VisualModelRegistry {
        let mut main = VisualModel::new(Id::new("main"));
        for (id, class, x) in [("a", "A", 0.0), ("b", "B", 300.0)] {
            main.add(VisualNode::new(
                Id::new(id),
                Id::new(class),
                Id::new("m"),
                Position::new(x, 0.0),
            ))
            .unwrap();
        }
        let mut registry = VisualModelRegistry::new();
        registry.insert(main).unwrap();
        registry
    }

    fn catalog() -> SemanticCatalog {
        SemanticCatalog::new()
            .with_class(Id::new("A"), Id::new("m"))
            .with_class(Id::new("B"), Id::new("m"))
    }

    #[test]
    fn test_errors_become_notifications() {
        let semantic = catalog();
        let log = NotificationLog::new();
        let mut editor = Editor::new(registry(), &semantic).with_notifications(&log);

        assert!(editor.add_group(Id::new("main"), &[Id::new("a")], None).is_none());
        assert!(editor.remove_group(Id::new("main"), Id::new("a")).is_none());
        assert!(editor.remove_visual_entities(Id::new("nowhere"), &[]).is_none());

        assert_eq!(log.errors().len(), 3);
        assert_eq!(editor.registry().get(Id::new("main")).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_id_skips_only_itself() {
        let semantic = catalog();
        let log = NotificationLog::new();
        let mut editor = Editor::new(registry(), &semantic).with_notifications(&log);

        let removed =
            editor.remove_visual_entities(Id::new("main"), &[Id::new("a"), Id::new("ghost")]);

        assert_eq!(removed, Some(1));
        let main = editor.registry().get(Id::new("main")).unwrap();
        assert!(!main.contains(Id::new("a")));
        assert!(main.contains(Id::new("b")));
        assert_eq!(
            log.errors(),
            vec!["Remove entities: Missing visual entity `ghost`".to_string()]
        );
    }

    #[test]
    fn test_unknown_semantic_entity_is_reported() {
        let semantic = catalog();
        let log = NotificationLog::new();
        let mut editor = Editor::new(registry(), &semantic).with_notifications(&log);

        let removed = editor.remove_represented_entities(
            Id::new("main"),
            &[Id::new("NoSuchClass"), Id::new("B")],
        );

        assert_eq!(removed, Some(1));
        let main = editor.registry().get(Id::new("main")).unwrap();
        assert!(main.contains(Id::new("a")));
        assert!(!main.contains(Id::new("b")));
        assert_eq!(log.errors().len(), 1);
        assert!(log.errors()[0].contains("NoSuchClass"));
    }

    #[test]
    fn test_purge_reports_unknown_semantic_entity_once() {
        let semantic = catalog();
        let log = NotificationLog::new();
        let mut registry = registry();
        registry.insert(VisualModel::new(Id::new("other"))).unwrap();
        let mut editor = Editor::new(registry, &semantic).with_notifications(&log);

        assert_eq!(editor.purge_represented_entities(&[Id::new("NoSuchClass")]), 0);
        assert_eq!(log.errors().len(), 1);
    }

    #[test]
    fn test_collapse_uses_viewport_center() {
        let semantic = catalog();
        let log = NotificationLog::new();
        let mut editor = Editor::new(registry(), &semantic)
            .with_notifications(&log)
            .with_viewport_center(Point::new(500.0, 500.0));

        let outcome = editor
            .collapse(Id::new("main"), &[Id::new("a"), Id::new("b")])
            .unwrap();

        let main = editor.registry().get(Id::new("main")).unwrap();
        assert_eq!(main.len(), 1);
        let position = main.get(outcome.diagram_node()).and_then(|e| e.position()).unwrap();
        assert_eq!(position.point(), Point::new(400.0, 450.0));
        assert!(log.errors().is_empty());
    }

    #[test]
    fn test_cyclic_diagram_node_is_rejected() {
        let semantic = catalog();
        let log = NotificationLog::new();
        let mut registry = registry();
        let mut outer = VisualModel::new(Id::new("outer"));
        outer
            .add(VisualDiagramNode::new(Id::new("dn"), Id::new("main"), Position::default()))
            .unwrap();
        registry.insert(outer).unwrap();
        let mut editor = Editor::new(registry, &semantic).with_notifications(&log);

        let added = editor.add_diagram_node_for_existing_model(Id::new("main"), Id::new("outer"));

        assert!(added.is_none());
        assert_eq!(editor.registry().get(Id::new("main")).unwrap().len(), 2);
        assert_eq!(log.errors().len(), 1);
    }

    #[test]
    fn test_describe_diagram_node() {
        let semantic = catalog();
        let mut registry = registry();
        registry.insert(VisualModel::new(Id::new("sub"))).unwrap();
        registry
            .get_mut(Id::new("main"))
            .unwrap()
            .add(VisualDiagramNode::new(Id::new("dn"), Id::new("sub"), Position::default()))
            .unwrap();
        let mut editor = Editor::new(registry, &semantic);

        editor
            .describe_diagram_node(Id::new("main"), Id::new("dn"), "Core", Some("Core classes".into()))
            .unwrap();
        assert!(
            editor
                .describe_diagram_node(Id::new("main"), Id::new("a"), "Nope", None)
                .is_none()
        );

        let main = editor.registry().get(Id::new("main")).unwrap();
        let node = main.diagram_node(Id::new("dn")).unwrap();
        assert_eq!(node.label(), "Core");
        assert_eq!(node.description(), Some("Core classes"));
    }
}
