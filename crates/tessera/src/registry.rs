//! Registry of the visual models available to the editor.
//!
//! Diagram nodes refer to other visual models by id; the registry is where
//! those ids are resolved. It also answers the two recursive questions the
//! engine asks about nesting: which semantic classes are hidden behind a
//! diagram node, and whether adding a diagram node would make a model contain
//! itself.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use log::debug;
use petgraph::{algo::has_path_connecting, graph::DiGraph};

use tessera_core::identifier::Id;

use crate::{error::TesseraError, store::VisualModel};

/// The visual models an editor can open and reference.
#[derive(Debug, Clone, Default)]
pub struct VisualModelRegistry {
    models: IndexMap<Id, VisualModel>,
    next_anonymous: usize,
}

impl VisualModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all registered models in registration order.
    pub fn available_visual_models(&self) -> impl Iterator<Item = &VisualModel> {
        self.models.values()
    }

    pub fn get(&self, id: Id) -> Option<&VisualModel> {
        self.models.get(&id)
    }

    pub fn get_mut(&mut self, id: Id) -> Option<&mut VisualModel> {
        self.models.get_mut(&id)
    }

    /// Returns the model or a [`TesseraError::MissingReference`].
    pub fn model(&self, id: Id) -> Result<&VisualModel, TesseraError> {
        self.models
            .get(&id)
            .ok_or(TesseraError::missing("visual model", id))
    }

    /// Mutable counterpart of [`VisualModelRegistry::model`].
    pub fn model_mut(&mut self, id: Id) -> Result<&mut VisualModel, TesseraError> {
        self.models
            .get_mut(&id)
            .ok_or(TesseraError::missing("visual model", id))
    }

    /// Registers a model.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::DuplicateIdentifier`] if a model with the same id exists.
    pub fn insert(&mut self, model: VisualModel) -> Result<Id, TesseraError> {
        let id = model.id();
        if self.models.contains_key(&id) {
            return Err(TesseraError::DuplicateIdentifier(id));
        }
        debug!(model = id.to_string(); "Registering visual model");
        self.models.insert(id, model);
        Ok(id)
    }

    pub fn remove(&mut self, id: Id) -> Option<VisualModel> {
        self.models.shift_remove(&id)
    }

    /// Returns a model id not used by any registered model.
    pub fn generate_model_id(&mut self) -> Id {
        loop {
            let id = Id::new("visual-model").create_nested(Id::from_anonymous(self.next_anonymous));
            self.next_anonymous += 1;
            if !self.models.contains_key(&id) {
                return id;
            }
        }
    }

    /// Returns the semantic entities realized by nodes of `model`, including
    /// the ones hidden behind its diagram nodes, recursively.
    ///
    /// Missing models contribute nothing; nesting cycles are visited once.
    pub fn represented_entities(&self, model: Id) -> IndexSet<Id> {
        let mut represented = IndexSet::new();
        let mut visited = HashSet::new();
        self.collect_represented(model, &mut represented, &mut visited);
        represented
    }

    fn collect_represented(&self, model: Id, out: &mut IndexSet<Id>, visited: &mut HashSet<Id>) {
        if !visited.insert(model) {
            return;
        }
        let Some(model) = self.models.get(&model) else {
            return;
        };
        for node in model.nodes() {
            out.insert(node.represented_entity());
        }
        for diagram_node in model.diagram_nodes() {
            self.collect_represented(diagram_node.represented_visual_model(), out, visited);
        }
    }

    /// Maps each semantic entity hidden behind a diagram node of `model` to the
    /// diagram nodes hiding it, in model order.
    pub fn diagram_node_index(&self, model: Id) -> HashMap<Id, Vec<Id>> {
        let mut index: HashMap<Id, Vec<Id>> = HashMap::new();
        let Some(model) = self.models.get(&model) else {
            return index;
        };
        for diagram_node in model.diagram_nodes() {
            for represented in self.represented_entities(diagram_node.represented_visual_model()) {
                index.entry(represented).or_default().push(diagram_node.id());
            }
        }
        index
    }

    /// Returns true if a diagram node for `child` placed in `parent` would make
    /// `parent` (transitively) contain itself.
    pub fn would_create_cycle(&self, parent: Id, child: Id) -> bool {
        if parent == child {
            return true;
        }

        let mut graph = DiGraph::<Id, ()>::new();
        let mut indices = HashMap::new();
        for model in self.models.keys() {
            indices.insert(*model, graph.add_node(*model));
        }
        for model in self.models.values() {
            for diagram_node in model.diagram_nodes() {
                if let Some(target) = indices.get(&diagram_node.represented_visual_model()) {
                    graph.add_edge(indices[&model.id()], *target, ());
                }
            }
        }

        match (indices.get(&child), indices.get(&parent)) {
            (Some(child), Some(parent)) => has_path_connecting(&graph, *child, *parent, None),
            _ => false,
        }
    }

    /// Verifies every model and every diagram node reference.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn verify(&self) -> Result<(), TesseraError> {
        for model in self.models.values() {
            model.verify()?;
            for diagram_node in model.diagram_nodes() {
                if !self.models.contains_key(&diagram_node.represented_visual_model()) {
                    return Err(TesseraError::Invariant(format!(
                        "diagram node `{}` refers to missing visual model `{}`",
                        diagram_node.id(),
                        diagram_node.represented_visual_model()
                    )));
                }
            }
        }
        Ok(())
    }
}
