//! Selection model
//!
//! Selectable scopes are subtrees that own a selection list. Scopes nest;
//! a non-isolated scope mirrors its list into its parent scope and follows
//! removals made there, so the nearest isolated ancestor (or the root scope)
//! holds the combined selection that mode operations act on.

pub mod controls;

pub use controls::{ClickOutcome, SelectControls};

use crate::observable::ObservableList;
use hecs::Entity;
use serde::{Deserialize, Serialize};

/// Identity of a registered selectable scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

impl ScopeId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// How a click changes the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Clicked object becomes the only selected object
    #[default]
    Replace,
    /// Clicked object flips between selected and not selected
    Toggle,
    /// Clicked object joins the selection
    Add,
    /// Clicked object leaves the selection
    Remove,
}

/// Which list a selected-state query consults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The object's closest enclosing scope
    Local,
    /// The isolated scope (or root scope) above the closest enclosing one
    Global,
}

/// Registration options of a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectableOptions {
    /// Keep this scope's selection out of its parent scope
    pub isolate_selections: bool,
}

impl SelectableOptions {
    pub fn isolated() -> Self {
        Self {
            isolate_selections: true,
        }
    }
}

/// A registered scope
#[derive(Debug, Clone)]
pub struct SelectableInfo {
    pub id: ScopeId,
    /// Subtree root; the list only holds its descendants
    pub container: Entity,
    pub parent: Option<ScopeId>,
    pub isolate_selections: bool,
    pub selection: ObservableList<Entity>,
}
