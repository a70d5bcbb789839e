//! Error types for Tessera operations.
//!
//! [`TesseraError`] covers the three recoverable failure classes of editing
//! actions (missing references, invalid group operations, layout failures)
//! plus the store-level violations that would break model invariants and
//! invalid engine configuration.
//! Unresolvable edge reroutes are not errors: such edges are deleted.

use thiserror::Error;

use tessera_core::identifier::Id;

/// The main error type for Tessera operations.
#[derive(Debug, Error)]
pub enum TesseraError {
    /// A requested visual entity, visual model or semantic entity does not exist.
    #[error("Missing {kind} `{id}`")]
    MissingReference { kind: &'static str, id: Id },

    #[error("Visual entity `{0}` already exists")]
    DuplicateIdentifier(Id),

    /// An entity would refer to something that does not exist, or to an
    /// entity of the wrong kind.
    #[error("`{entity}` cannot refer to `{reference}`: {reason}")]
    DanglingReference {
        entity: Id,
        reference: Id,
        reason: &'static str,
    },

    #[error("Invalid group operation: {0}")]
    InvalidGroupOperation(String),

    /// A diagram node cannot be created or expanded, for example because the
    /// selection is empty or the nesting would become cyclic.
    #[error("Invalid diagram node operation: {0}")]
    InvalidDiagramOperation(String),

    #[error("Layout error: {0}")]
    Layout(String),

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TesseraError {
    pub(crate) fn missing(kind: &'static str, id: Id) -> Self {
        Self::MissingReference { kind, id }
    }

    /// Returns true for errors caused by an unresolvable identifier.
    pub fn is_missing_reference(&self) -> bool {
        matches!(self, Self::MissingReference { .. })
    }
}
