//! Tessera - A consistency engine for nested, grouped visual models.
//!
//! A visual model is the on-canvas view of one or more semantic models:
//! nodes for classes, edges for relationships, groups clustering nodes, and
//! diagram nodes standing for whole other visual models. Tessera keeps those
//! structures referentially valid while they are edited:
//!
//! - [`store`]: the visual model with its reverse index by represented id.
//! - [`group`]: the group forest and its dissolve rules.
//! - [`removal`]: cascading removal by visual or represented id.
//! - [`diagram_node`]: collapsing a selection into a nested model and
//!   expanding it back, with semantic edge rerouting.
//! - [`neighborhood`]: idempotent materialization of missing edges.
//! - [`alignment`] and [`layout`]: geometry helpers and overlap removal.
//!
//! [`Editor`] ties these together behind user-facing actions that report
//! failures as notifications instead of errors.

pub mod alignment;
pub mod config;
pub mod diagram_node;
pub mod group;
pub mod hierarchy;
pub mod layout;
pub mod neighborhood;
pub mod notification;
pub mod registry;
pub mod removal;
pub mod store;

mod editor;
mod error;

pub use tessera_core::{geometry, identifier, semantic, visual};

pub use editor::Editor;
pub use error::TesseraError;
