//! Read-only view of the semantic (domain) model.
//!
//! Visual entities are views of semantic entities: classes, class profiles,
//! relationships, relationship profiles and generalizations. The semantic
//! store itself lives outside Tessera; the engine only consumes it through
//! the [`SemanticModelProvider`] trait.
//!
//! [`SemanticCatalog`] is a plain in-memory implementation used by the CLI
//! scene loader and by tests.

use crate::identifier::Id;

/// A semantic class.
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    id: Id,
    model: Id,
}

impl Class {
    pub fn new(id: Id, model: Id) -> Self {
        Self { id, model }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// Returns the semantic model owning this class.
    pub fn model(&self) -> Id {
        self.model
    }
}

/// A profile of one or more classes.
///
/// On canvas a class profile is a node of its own, connected to each profiled
/// class by a profile edge.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassProfile {
    id: Id,
    model: Id,
    profiling: Vec<Id>,
}

impl ClassProfile {
    pub fn new(id: Id, model: Id, profiling: Vec<Id>) -> Self {
        Self {
            id,
            model,
            profiling,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn model(&self) -> Id {
        self.model
    }

    /// Returns the classes (or class profiles) this profile profiles.
    pub fn profiling(&self) -> &[Id] {
        &self.profiling
    }
}

/// A binary relationship from `domain` to `range`.
///
/// A relationship whose range is not a class or class profile is an
/// attribute: it is shown inside the domain's node instead of as an edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    id: Id,
    model: Id,
    domain: Id,
    range: Id,
}

impl Relationship {
    pub fn new(id: Id, model: Id, domain: Id, range: Id) -> Self {
        Self {
            id,
            model,
            domain,
            range,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn model(&self) -> Id {
        self.model
    }

    pub fn domain(&self) -> Id {
        self.domain
    }

    pub fn range(&self) -> Id {
        self.range
    }
}

/// A profile of one or more relationships.
///
/// Domain and range may be overridden by the profile; when they are not, they
/// are inherited from the first profiled relationship that defines them.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipProfile {
    id: Id,
    model: Id,
    profiling: Vec<Id>,
    domain: Option<Id>,
    range: Option<Id>,
}

impl RelationshipProfile {
    pub fn new(id: Id, model: Id, profiling: Vec<Id>) -> Self {
        Self {
            id,
            model,
            profiling,
            domain: None,
            range: None,
        }
    }

    /// Overrides the domain and range inherited from the profiled relationships.
    pub fn with_ends(self, domain: Id, range: Id) -> Self {
        self.with_domain(domain).with_range(range)
    }

    /// Overrides the domain only; the range is still inherited.
    pub fn with_domain(mut self, domain: Id) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn with_range(mut self, range: Id) -> Self {
        self.range = Some(range);
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn model(&self) -> Id {
        self.model
    }

    pub fn profiling(&self) -> &[Id] {
        &self.profiling
    }

    pub fn domain(&self) -> Option<Id> {
        self.domain
    }

    pub fn range(&self) -> Option<Id> {
        self.range
    }
}

/// `child` specializes `parent`.
#[derive(Debug, Clone, PartialEq)]
pub struct Generalization {
    id: Id,
    model: Id,
    child: Id,
    parent: Id,
}

impl Generalization {
    pub fn new(id: Id, model: Id, child: Id, parent: Id) -> Self {
        Self {
            id,
            model,
            child,
            parent,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn model(&self) -> Id {
        self.model
    }

    pub fn child(&self) -> Id {
        self.child
    }

    pub fn parent(&self) -> Id {
        self.parent
    }
}

/// Kind of semantic entity a [`SemanticLink`] is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Relationship,
    RelationshipProfile,
    Generalization,
    /// Link from a class profile to one of the classes it profiles.
    ClassProfile,
}

impl LinkKind {
    /// Returns true if the link is drawn as a profile edge rather than a relationship edge.
    pub fn is_profile_edge(self) -> bool {
        matches!(self, LinkKind::ClassProfile)
    }
}

/// Any semantic entity that is drawn as an edge, reduced to its two ends.
///
/// `source` is the domain (relationship), the child (generalization) or the
/// profile (class profile); `target` is the range, the parent or the profiled
/// class respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemanticLink {
    pub id: Id,
    pub model: Id,
    pub kind: LinkKind,
    pub source: Id,
    pub target: Id,
}

/// Read-only access to the semantic models the visual models are views of.
pub trait SemanticModelProvider {
    fn classes(&self) -> &[Class];

    fn class_profiles(&self) -> &[ClassProfile];

    fn relationships(&self) -> &[Relationship];

    fn relationship_profiles(&self) -> &[RelationshipProfile];

    fn generalizations(&self) -> &[Generalization];

    /// Returns the semantic model owning the entity with the given id.
    fn find_source_model_of_entity(&self, id: Id) -> Option<Id> {
        self.classes()
            .iter()
            .find(|e| e.id() == id)
            .map(Class::model)
            .or_else(|| {
                self.class_profiles()
                    .iter()
                    .find(|e| e.id() == id)
                    .map(ClassProfile::model)
            })
            .or_else(|| {
                self.relationships()
                    .iter()
                    .find(|e| e.id() == id)
                    .map(Relationship::model)
            })
            .or_else(|| {
                self.relationship_profiles()
                    .iter()
                    .find(|e| e.id() == id)
                    .map(RelationshipProfile::model)
            })
            .or_else(|| {
                self.generalizations()
                    .iter()
                    .find(|e| e.id() == id)
                    .map(Generalization::model)
            })
    }

    /// Asks the owner of the semantic models to re-derive anything that depends
    /// on the visual models. The default implementation does nothing.
    fn request_revalidation(&self) {}

    /// Returns true if `id` is a class or a class profile, i.e. something that
    /// can be placed on canvas as a node.
    fn is_class_like(&self, id: Id) -> bool {
        self.classes().iter().any(|c| c.id() == id)
            || self.class_profiles().iter().any(|p| p.id() == id)
    }

    /// Returns the ids of the attributes of `class`, in declaration order.
    fn attributes_of(&self, class: Id) -> Vec<Id> {
        self.relationships()
            .iter()
            .filter(|r| r.domain() == class && !self.is_class_like(r.range()))
            .map(Relationship::id)
            .collect()
    }

    /// Resolves the domain and range of a relationship or relationship profile,
    /// or the child and parent of a generalization.
    fn relationship_ends(&self, id: Id) -> Option<(Id, Id)> {
        resolve_ends(self, id, &mut Vec::new())
    }

    /// Returns every semantic entity that is drawn as an edge, reduced to its ends.
    ///
    /// Attributes and relationships whose ends cannot be resolved are skipped.
    fn links(&self) -> Vec<SemanticLink> {
        let mut links = Vec::new();

        for relationship in self.relationships() {
            if self.is_class_like(relationship.range()) {
                links.push(SemanticLink {
                    id: relationship.id(),
                    model: relationship.model(),
                    kind: LinkKind::Relationship,
                    source: relationship.domain(),
                    target: relationship.range(),
                });
            }
        }

        for profile in self.relationship_profiles() {
            let Some((source, target)) = self.relationship_ends(profile.id()) else {
                continue;
            };
            if self.is_class_like(target) {
                links.push(SemanticLink {
                    id: profile.id(),
                    model: profile.model(),
                    kind: LinkKind::RelationshipProfile,
                    source,
                    target,
                });
            }
        }

        for generalization in self.generalizations() {
            links.push(SemanticLink {
                id: generalization.id(),
                model: generalization.model(),
                kind: LinkKind::Generalization,
                source: generalization.child(),
                target: generalization.parent(),
            });
        }

        for profile in self.class_profiles() {
            for profiled in profile.profiling() {
                links.push(SemanticLink {
                    id: profile.id(),
                    model: profile.model(),
                    kind: LinkKind::ClassProfile,
                    source: profile.id(),
                    target: *profiled,
                });
            }
        }

        links
    }
}

/// Profiles may profile other profiles; `visiting` breaks profiling cycles.
fn resolve_ends<P>(provider: &P, id: Id, visiting: &mut Vec<Id>) -> Option<(Id, Id)>
where
    P: SemanticModelProvider + ?Sized,
{
    if let Some(relationship) = provider.relationships().iter().find(|r| r.id() == id) {
        return Some((relationship.domain(), relationship.range()));
    }
    if let Some(generalization) = provider.generalizations().iter().find(|g| g.id() == id) {
        return Some((generalization.child(), generalization.parent()));
    }
    if visiting.contains(&id) {
        return None;
    }
    visiting.push(id);

    let profile = provider
        .relationship_profiles()
        .iter()
        .find(|p| p.id() == id)?;
    let inherited = profile
        .profiling()
        .iter()
        .find_map(|profiled| resolve_ends(provider, *profiled, visiting));
    let domain = profile.domain().or(inherited.map(|(domain, _)| domain))?;
    let range = profile.range().or(inherited.map(|(_, range)| range))?;
    Some((domain, range))
}

/// In-memory semantic models.
///
/// # Examples
///
/// ```
/// use tessera_core::{identifier::Id, semantic::{SemanticCatalog, SemanticModelProvider}};
///
/// let model = Id::new("vocabulary");
/// let catalog = SemanticCatalog::new()
///     .with_class(Id::new("Person"), model)
///     .with_class(Id::new("Address"), model)
///     .with_relationship(Id::new("livesAt"), model, Id::new("Person"), Id::new("Address"));
///
/// assert_eq!(catalog.links().len(), 1);
/// assert_eq!(catalog.find_source_model_of_entity(Id::new("livesAt")), Some(model));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SemanticCatalog {
    classes: Vec<Class>,
    class_profiles: Vec<ClassProfile>,
    relationships: Vec<Relationship>,
    relationship_profiles: Vec<RelationshipProfile>,
    generalizations: Vec<Generalization>,
}

impl SemanticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, id: Id, model: Id) -> Self {
        self.add_class(Class::new(id, model));
        self
    }

    pub fn with_relationship(mut self, id: Id, model: Id, domain: Id, range: Id) -> Self {
        self.add_relationship(Relationship::new(id, model, domain, range));
        self
    }

    pub fn with_generalization(mut self, id: Id, model: Id, child: Id, parent: Id) -> Self {
        self.add_generalization(Generalization::new(id, model, child, parent));
        self
    }

    pub fn add_class(&mut self, class: Class) {
        self.classes.push(class);
    }

    pub fn add_class_profile(&mut self, profile: ClassProfile) {
        self.class_profiles.push(profile);
    }

    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    pub fn add_relationship_profile(&mut self, profile: RelationshipProfile) {
        self.relationship_profiles.push(profile);
    }

    pub fn add_generalization(&mut self, generalization: Generalization) {
        self.generalizations.push(generalization);
    }

    /// Returns the total number of semantic entities.
    pub fn len(&self) -> usize {
        self.classes.len()
            + self.class_profiles.len()
            + self.relationships.len()
            + self.relationship_profiles.len()
            + self.generalizations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SemanticModelProvider for SemanticCatalog {
    fn classes(&self) -> &[Class] {
        &self.classes
    }

    fn class_profiles(&self) -> &[ClassProfile] {
        &self.class_profiles
    }

    fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    fn relationship_profiles(&self) -> &[RelationshipProfile] {
        &self.relationship_profiles
    }

    fn generalizations(&self) -> &[Generalization] {
        &self.generalizations
    }
}
