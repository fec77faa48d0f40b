//! Core scene-graph functionality
//!
//! Entities, transform components and the parent hierarchy.

pub mod entity;
