//! Tessera Core Types and Definitions
//!
//! This crate provides the foundational types shared by the Tessera visual
//! model engine. It includes:
//!
//! - **Identifiers**: Efficient string-interned identifiers ([`identifier::Id`])
//! - **Geometry**: Points, sizes and bounding boxes ([`geometry`] module)
//! - **Semantic**: The read-only view of the semantic model ([`semantic`] module)
//! - **Visual**: Visual entities placed on a diagram canvas ([`visual`] module)

pub mod geometry;
pub mod identifier;
pub mod semantic;
pub mod visual;
