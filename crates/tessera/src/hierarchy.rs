//! Generalization hierarchy of the semantic classes.
//!
//! Used when an edge has to be reattached to a node representing a more
//! specific class than the one the edge points at.

use std::collections::HashMap;

use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::{Bfs, Walker},
};

use tessera_core::{identifier::Id, semantic::SemanticModelProvider};

/// Parent to child edges between classes, built from the generalizations of a
/// semantic model provider.
#[derive(Debug)]
pub struct GeneralizationHierarchy {
    graph: DiGraph<Id, Id>,
    indices: HashMap<Id, NodeIndex>,
}

impl GeneralizationHierarchy {
    pub fn new(semantic: &dyn SemanticModelProvider) -> Self {
        let mut hierarchy = Self {
            graph: DiGraph::new(),
            indices: HashMap::new(),
        };
        for generalization in semantic.generalizations() {
            let parent = hierarchy.index_of(generalization.parent());
            let child = hierarchy.index_of(generalization.child());
            hierarchy.graph.add_edge(parent, child, generalization.id());
        }
        hierarchy
    }

    fn index_of(&mut self, class: Id) -> NodeIndex {
        if let Some(idx) = self.indices.get(&class) {
            return *idx;
        }
        let idx = self.graph.add_node(class);
        self.indices.insert(class, idx);
        idx
    }

    /// Returns every class that (transitively) specializes `class`, nearest first.
    pub fn specializations_of(&self, class: Id) -> Vec<Id> {
        let Some(start) = self.indices.get(&class) else {
            return Vec::new();
        };
        Bfs::new(&self.graph, *start)
            .iter(&self.graph)
            .filter(|idx| idx != start)
            .map(|idx| self.graph[idx])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::semantic::SemanticCatalog;

    use super::*;

    fn catalog() -> SemanticCatalog {
        let m = Id::new("m");
        SemanticCatalog::new()
            .with_class(Id::new("Agent"), m)
            .with_class(Id::new("Person"), m)
            .with_class(Id::new("Student"), m)
            .with_class(Id::new("Organization"), m)
            .with_generalization(Id::new("g1"), m, Id::new("Person"), Id::new("Agent"))
            .with_generalization(Id::new("g2"), m, Id::new("Student"), Id::new("Person"))
            .with_generalization(Id::new("g3"), m, Id::new("Organization"), Id::new("Agent"))
    }

    #[test]
    fn test_specializations_nearest_first() {
        let hierarchy = GeneralizationHierarchy::new(&catalog());
        let specializations = hierarchy.specializations_of(Id::new("Agent"));

        assert_eq!(specializations.len(), 3);
        assert_eq!(specializations.last(), Some(&Id::new("Student")));
        assert!(specializations.contains(&Id::new("Organization")));
    }

    #[test]
    fn test_leaf_has_no_specializations() {
        let hierarchy = GeneralizationHierarchy::new(&catalog());
        assert!(hierarchy.specializations_of(Id::new("Student")).is_empty());
        assert!(hierarchy.specializations_of(Id::new("Unknown")).is_empty());
    }
}
