//! End-to-end editing session

use glam::{Mat4, Vec3};
use scene_editor::prelude::*;
use scene_engine::core::entity::hierarchy::world_matrix;
use scene_engine::core::entity::{Entity, Name, Transform, World};
use std::cell::RefCell;
use std::rc::Rc;
use tempfile::NamedTempFile;

type Transitions = Rc<RefCell<Vec<(EventKind, Entity)>>>;

fn watch_transitions(editor: &mut Editor, entity: Entity) -> Transitions {
    let log = Transitions::default();
    for kind in [EventKind::Selected, EventKind::Deselected] {
        let log = Rc::clone(&log);
        editor.add_listener(entity, kind, ListenerPhase::Bubble, move |_, event| {
            log.borrow_mut().push((event.kind(), event.target()));
        });
    }
    log
}

#[test]
fn test_mode_switching_session() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut world = World::new();
    let root = world.spawn_with_transform((Name::new("scene"),));
    let container = world.spawn_child(root, Transform::default(), (Name::new("selectable"),));
    let o1 = world.spawn_child(container, Transform::default(), (Name::new("O1"),));
    let o2 = world.spawn_child(container, Transform::from_position(Vec3::X), (Name::new("O2"),));

    let mut editor = Editor::new(world, root).unwrap();
    editor
        .register_selectable(container, SelectableOptions::default())
        .unwrap();
    let log = watch_transitions(&mut editor, root);
    assert!(editor.selected().is_empty());

    editor
        .apply_toolbar_choice(ToolbarChoice::SelectionMode(SelectionMode::Replace))
        .unwrap();
    editor
        .handle_pointer(PointerInput::click(o1, Vec3::ZERO))
        .unwrap();
    assert_eq!(editor.selected(), vec![o1]);

    editor
        .apply_toolbar_choice(ToolbarChoice::SelectionMode(SelectionMode::Add))
        .unwrap();
    editor
        .handle_pointer(PointerInput::click(o2, Vec3::X))
        .unwrap();
    assert_eq!(editor.selected(), vec![o1, o2]);

    editor
        .apply_toolbar_choice(ToolbarChoice::SelectionMode(SelectionMode::Remove))
        .unwrap();
    editor
        .handle_pointer(PointerInput::click(o1, Vec3::ZERO))
        .unwrap();
    assert_eq!(editor.selected(), vec![o2]);

    editor.tick().unwrap();
    editor
        .handle_pointer(PointerInput::click_background())
        .unwrap();
    assert!(editor.selected().is_empty());

    assert_eq!(
        *log.borrow(),
        vec![
            (EventKind::Selected, o1),
            (EventKind::Selected, o2),
            (EventKind::Deselected, o1),
            (EventKind::Deselected, o2),
        ]
    );
}

#[test]
fn test_settings_drive_a_fresh_editor() {
    let mut settings = EditorSettings::default();
    settings.selection.default_mode = SelectionMode::Toggle;
    settings.transform.position = TransformControlsPosition::Each;

    let file = NamedTempFile::new().expect("Failed to create temp file");
    settings.save_to(file.path()).expect("Failed to save settings");
    let loaded = EditorSettings::load_from(file.path()).expect("Failed to load settings");

    let mut world = World::new();
    let root = world.spawn_with_transform((Name::new("scene"),));
    let container = world.spawn_child(root, Transform::default(), (Name::new("selectable"),));
    let a = world.spawn_child(container, Transform::default(), (Name::new("a"),));
    let b = world.spawn_child(container, Transform::from_position(Vec3::Y), (Name::new("b"),));

    let mut editor = Editor::with_settings(world, root, loaded).unwrap();
    editor
        .register_selectable(container, SelectableOptions::default())
        .unwrap();
    assert_eq!(editor.selection_mode(), SelectionMode::Toggle);

    editor.handle_pointer(PointerInput::click(a, Vec3::ZERO)).unwrap();
    editor.handle_pointer(PointerInput::click(b, Vec3::Y)).unwrap();
    assert_eq!(editor.selected(), vec![a, b]);

    let gizmo = editor.add_default_gizmo().unwrap();
    assert_eq!(editor.gizmo(gizmo).unwrap().handles().len(), 2);

    let helper = editor.gizmo(gizmo).unwrap().handle_for(b).unwrap().helper;
    editor.begin_gizmo_drag(gizmo, helper).unwrap();
    editor
        .end_gizmo_drag(gizmo, helper, Mat4::from_translation(Vec3::X))
        .unwrap();

    let moved = world_matrix(editor.world(), b).unwrap().w_axis.truncate();
    assert!(moved.abs_diff_eq(Vec3::X + Vec3::Y, 1e-5));
    let helper_position = world_matrix(editor.world(), helper).unwrap().w_axis.truncate();
    assert!(helper_position.abs_diff_eq(moved, 1e-5));
}
