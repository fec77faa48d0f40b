//! Declarative toolbar item lists
//!
//! The host's UI renders these and reports the picked value back as a
//! [`ToolbarChoice`].

use crate::geometry_edit::FeatureKind;
use crate::selection::SelectionMode;
use crate::transform::{CoordinateSpace, GizmoMode, TransformControlsPosition};
use serde::Serialize;

/// One toolbar entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolbarItem<T> {
    pub value: T,
    pub label: &'static str,
    pub icon: &'static str,
}

fn item<T>(value: T, label: &'static str, icon: &'static str) -> ToolbarItem<T> {
    ToolbarItem { value, label, icon }
}

/// A value picked from one of the toolbar lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarChoice {
    SelectionMode(SelectionMode),
    GizmoMode(GizmoMode),
    Space(CoordinateSpace),
    Position(TransformControlsPosition),
    Feature(FeatureKind),
    GeometryEditing(bool),
}

pub fn selection_mode_items() -> [ToolbarItem<SelectionMode>; 4] {
    [
        item(SelectionMode::Replace, "Replace", "cursor"),
        item(SelectionMode::Toggle, "Toggle", "cursor-toggle"),
        item(SelectionMode::Add, "Add", "cursor-plus"),
        item(SelectionMode::Remove, "Remove", "cursor-minus"),
    ]
}

pub fn gizmo_mode_items() -> [ToolbarItem<GizmoMode>; 3] {
    [
        item(GizmoMode::Translate, "Move", "move"),
        item(GizmoMode::Rotate, "Rotate", "rotate"),
        item(GizmoMode::Scale, "Scale", "scale"),
    ]
}

pub fn coordinate_space_items() -> [ToolbarItem<CoordinateSpace>; 2] {
    [
        item(CoordinateSpace::Global, "Global", "globe"),
        item(CoordinateSpace::Local, "Local", "cube"),
    ]
}

pub fn gizmo_position_items() -> [ToolbarItem<TransformControlsPosition>; 4] {
    [
        item(TransformControlsPosition::First, "First", "align-start"),
        item(TransformControlsPosition::Last, "Last", "align-end"),
        item(TransformControlsPosition::Each, "Each", "grid"),
        item(TransformControlsPosition::Average, "Average", "align-center"),
    ]
}

pub fn feature_items() -> [ToolbarItem<FeatureKind>; 3] {
    [
        item(FeatureKind::Vertex, "Vertex", "vertex"),
        item(FeatureKind::Edge, "Edge", "edge"),
        item(FeatureKind::Face, "Face", "face"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_cover_every_value_once() {
        let modes: Vec<SelectionMode> = selection_mode_items().iter().map(|entry| entry.value).collect();
        assert_eq!(
            modes,
            vec![SelectionMode::Replace, SelectionMode::Toggle, SelectionMode::Add, SelectionMode::Remove]
        );

        let labels: Vec<&str> = gizmo_position_items().iter().map(|entry| entry.label).collect();
        assert_eq!(labels, vec!["First", "Last", "Each", "Average"]);
    }

    #[test]
    fn test_items_serialize_for_the_ui() {
        let json = serde_json::to_value(feature_items()[2]).unwrap();
        assert_eq!(json["value"], "face");
        assert_eq!(json["label"], "Face");
    }
}
