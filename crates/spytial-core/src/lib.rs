//! Spytial Core Types and Definitions
//!
//! This crate provides the foundational types shared by the Spytial layout
//! pipeline. It includes:
//!
//! - **Instance**: The relational data model and its read interface ([`instance`] module)
//! - **Values**: Selector evaluation results ([`value::SelectorValue`])
//! - **Geometry**: Points, sizes and node bounds ([`geometry`] module)
//! - **Colors**: CSS color validation ([`color::Color`])

pub mod color;
pub mod geometry;
pub mod instance;
pub mod value;
