//! Gizmo drags over the selection

use glam::{Mat4, Quat, Vec3};
use scene_editor::prelude::*;
use scene_engine::core::entity::hierarchy::world_matrix;
use scene_engine::core::entity::{Entity, Name, Transform, World};
use std::cell::RefCell;
use std::rc::Rc;

const EPSILON: f32 = 1e-4;

struct Scene {
    editor: Editor,
    container: Entity,
    objects: Vec<Entity>,
}

/// Two selected objects at x = 1 and x = -1 inside one selectable region
fn selected_pair() -> Scene {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut world = World::new();
    let root = world.spawn_with_transform((Name::new("scene"),));
    let container = world.spawn_child(root, Transform::default(), (Name::new("selectable"),));
    let objects: Vec<Entity> = [Vec3::X, -Vec3::X]
        .into_iter()
        .map(|position| world.spawn_child(container, Transform::from_position(position), (Name::new("object"),)))
        .collect();

    let mut editor = Editor::new(world, root).unwrap();
    editor
        .register_selectable(container, SelectableOptions::default())
        .unwrap();
    for object in &objects {
        editor.select(*object, SelectionMode::Add).unwrap();
    }
    Scene {
        editor,
        container,
        objects,
    }
}

fn position(editor: &Editor, entity: Entity) -> Vec3 {
    world_matrix(editor.world(), entity).unwrap().w_axis.truncate()
}

fn only_helper(editor: &Editor, gizmo: GizmoId) -> Entity {
    let handles = editor.gizmo(gizmo).unwrap().handles();
    assert_eq!(handles.len(), 1);
    handles[0].helper
}

#[test]
fn test_average_gizmo_sits_on_mean_position() {
    let Scene { mut editor, .. } = selected_pair();
    let gizmo = editor.add_gizmo(GizmoOptions::default()).unwrap();

    let pivot = editor.gizmo(gizmo).unwrap().pivot().unwrap();
    assert!(position(&editor, pivot).abs_diff_eq(Vec3::ZERO, EPSILON));

    let helper = only_helper(&editor, gizmo);
    assert!(editor.world().get::<GizmoHelper>(helper).is_ok());
}

#[test]
fn test_incremental_deltas_match_composed_delta() {
    let steps = [
        Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)),
        Mat4::from_rotation_y(0.4),
        Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)),
    ];
    let last = Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0));
    let composed = steps.iter().fold(Mat4::IDENTITY, |acc, step| *step * acc);
    let composed = last * composed;

    let Scene {
        editor: mut stepped,
        objects: stepped_objects,
        ..
    } = selected_pair();
    let gizmo = stepped.add_gizmo(GizmoOptions::default()).unwrap();
    let helper = only_helper(&stepped, gizmo);
    stepped.begin_gizmo_drag(gizmo, helper).unwrap();
    for step in steps {
        stepped.drag_gizmo(gizmo, helper, step).unwrap();
    }
    stepped.end_gizmo_drag(gizmo, helper, last).unwrap();

    let Scene {
        editor: mut direct,
        objects: direct_objects,
        ..
    } = selected_pair();
    let gizmo = direct.add_gizmo(GizmoOptions::default()).unwrap();
    let helper = only_helper(&direct, gizmo);
    direct.begin_gizmo_drag(gizmo, helper).unwrap();
    direct.end_gizmo_drag(gizmo, helper, composed).unwrap();

    for (a, b) in stepped_objects.iter().zip(&direct_objects) {
        let a = world_matrix(stepped.world(), *a).unwrap();
        let b = world_matrix(direct.world(), *b).unwrap();
        assert!(a.abs_diff_eq(b, EPSILON), "{a:?} != {b:?}");
    }
}

#[test]
fn test_global_translation_moves_every_island() {
    let Scene {
        mut editor, objects, ..
    } = selected_pair();
    let gizmo = editor.add_gizmo(GizmoOptions::default()).unwrap();
    let helper = only_helper(&editor, gizmo);
    let offset = Vec3::new(0.0, 1.5, -2.0);

    editor.begin_gizmo_drag(gizmo, helper).unwrap();
    editor
        .end_gizmo_drag(gizmo, helper, Mat4::from_translation(offset))
        .unwrap();

    assert!(position(&editor, objects[0]).abs_diff_eq(Vec3::X + offset, EPSILON));
    assert!(position(&editor, objects[1]).abs_diff_eq(-Vec3::X + offset, EPSILON));
    let pivot = editor.gizmo(gizmo).unwrap().pivot().unwrap();
    assert!(position(&editor, pivot).abs_diff_eq(offset, EPSILON));
}

#[test]
fn test_selected_descendant_moves_once() {
    let Scene {
        mut editor, objects, ..
    } = selected_pair();
    let nested = editor
        .world_mut()
        .spawn_child(objects[0], Transform::from_position(Vec3::Y), (Name::new("nested"),));
    editor.set_selected(nested, true).unwrap();

    let gizmo = editor
        .add_gizmo(GizmoOptions {
            position: TransformControlsPosition::Each,
            ..GizmoOptions::default()
        })
        .unwrap();
    assert_eq!(editor.gizmo(gizmo).unwrap().islands(), objects.as_slice());
    assert_eq!(editor.gizmo(gizmo).unwrap().handles().len(), 2);

    let helper = editor.gizmo(gizmo).unwrap().handle_for(objects[0]).unwrap().helper;
    editor.begin_gizmo_drag(gizmo, helper).unwrap();
    editor
        .end_gizmo_drag(gizmo, helper, Mat4::from_translation(Vec3::Z))
        .unwrap();

    assert!(position(&editor, objects[0]).abs_diff_eq(Vec3::X + Vec3::Z, EPSILON));
    assert!(position(&editor, nested).abs_diff_eq(Vec3::X + Vec3::Y + Vec3::Z, EPSILON));
    assert!(position(&editor, objects[1]).abs_diff_eq(-Vec3::X, EPSILON));
}

#[test]
fn test_local_space_rotation_turns_in_place() {
    let Scene {
        mut editor, objects, ..
    } = selected_pair();
    let gizmo = editor
        .add_gizmo(GizmoOptions {
            position: TransformControlsPosition::First,
            space: CoordinateSpace::Local,
            ..GizmoOptions::default()
        })
        .unwrap();
    let helper = only_helper(&editor, gizmo);
    let turn = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);

    editor.begin_gizmo_drag(gizmo, helper).unwrap();
    editor.end_gizmo_drag(gizmo, helper, turn).unwrap();

    for object in &objects {
        let transform = editor.world().local_transform(*object);
        assert!(transform
            .rotation
            .abs_diff_eq(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2), EPSILON));
    }
    assert!(position(&editor, objects[0]).abs_diff_eq(Vec3::X, EPSILON));
    assert!(position(&editor, objects[1]).abs_diff_eq(-Vec3::X, EPSILON));
}

#[test]
fn test_cancel_restores_start_transforms() {
    let Scene {
        mut editor, objects, ..
    } = selected_pair();
    let gizmo = editor.add_gizmo(GizmoOptions::default()).unwrap();
    let helper = only_helper(&editor, gizmo);

    editor.begin_gizmo_drag(gizmo, helper).unwrap();
    editor
        .drag_gizmo(gizmo, helper, Mat4::from_translation(Vec3::splat(4.0)))
        .unwrap();
    editor.cancel_gizmo_drag(gizmo, helper).unwrap();

    assert!(position(&editor, objects[0]).abs_diff_eq(Vec3::X, EPSILON));
    assert!(position(&editor, objects[1]).abs_diff_eq(-Vec3::X, EPSILON));
    assert!(!editor.gizmo(gizmo).unwrap().is_dragging());
    assert!(!editor.selection().is_disabled());
}

#[test]
fn test_object_selected_mid_drag_follows_later_steps() {
    let Scene {
        mut editor,
        container,
        objects,
    } = selected_pair();
    let late = editor
        .world_mut()
        .spawn_child(container, Transform::from_position(Vec3::Z * 5.0), (Name::new("late"),));
    let gizmo = editor.add_gizmo(GizmoOptions::default()).unwrap();
    let helper = only_helper(&editor, gizmo);

    editor.begin_gizmo_drag(gizmo, helper).unwrap();
    editor
        .drag_gizmo(gizmo, helper, Mat4::from_translation(Vec3::X))
        .unwrap();
    editor.select(late, SelectionMode::Add).unwrap();
    assert!(editor.gizmo(gizmo).unwrap().tracks(late));
    editor
        .drag_gizmo(gizmo, helper, Mat4::from_translation(Vec3::Y))
        .unwrap();
    editor
        .end_gizmo_drag(gizmo, helper, Mat4::from_translation(Vec3::Y))
        .unwrap();

    assert!(position(&editor, objects[0]).abs_diff_eq(Vec3::new(2.0, 2.0, 0.0), EPSILON));
    assert!(position(&editor, late).abs_diff_eq(Vec3::new(0.0, 2.0, 5.0), EPSILON));

    // The widget keeps its transformer, idle and following the group
    let gizmo = editor.gizmo(gizmo).unwrap();
    let transformer = gizmo.transformer(helper).unwrap();
    assert!(!transformer.is_dragging());
    assert_eq!(transformer.transformed().to_vec(), vec![objects[0], objects[1], late]);
}

#[test]
fn test_transform_events_reach_tracked_objects() {
    let Scene {
        mut editor,
        container,
        ..
    } = selected_pair();
    let kinds: Rc<RefCell<Vec<EventKind>>> = Rc::default();
    for kind in [
        EventKind::TransformStart,
        EventKind::Transform,
        EventKind::TransformComplete,
    ] {
        let kinds = Rc::clone(&kinds);
        editor.add_listener(container, kind, ListenerPhase::Bubble, move |_, event| {
            kinds.borrow_mut().push(event.kind());
        });
    }
    let gizmo = editor.add_gizmo(GizmoOptions::default()).unwrap();
    let helper = only_helper(&editor, gizmo);

    editor.begin_gizmo_drag(gizmo, helper).unwrap();
    editor.drag_gizmo(gizmo, helper, Mat4::IDENTITY).unwrap();
    editor.end_gizmo_drag(gizmo, helper, Mat4::IDENTITY).unwrap();

    // One event per selected object and step; the pivot sits outside the region
    assert_eq!(
        *kinds.borrow(),
        vec![
            EventKind::TransformStart,
            EventKind::TransformStart,
            EventKind::Transform,
            EventKind::Transform,
            EventKind::Transform,
            EventKind::Transform,
            EventKind::TransformComplete,
            EventKind::TransformComplete,
        ]
    );
}

#[test]
fn test_selection_follows_gizmo_group() {
    let Scene {
        mut editor, objects, ..
    } = selected_pair();
    let gizmo = editor
        .add_gizmo(GizmoOptions {
            position: TransformControlsPosition::Each,
            ..GizmoOptions::default()
        })
        .unwrap();

    editor.select(objects[0], SelectionMode::Remove).unwrap();

    let gizmo = editor.gizmo(gizmo).unwrap();
    assert_eq!(gizmo.islands(), &objects[1..]);
    assert_eq!(gizmo.handles().len(), 1);
    assert_eq!(gizmo.handles()[0].object, objects[1]);
}

#[test]
fn test_gizmo_click_never_selects() {
    let Scene {
        mut editor, objects, ..
    } = selected_pair();
    let gizmo = editor.add_gizmo(GizmoOptions::default()).unwrap();
    let helper = only_helper(&editor, gizmo);
    let heard: Rc<RefCell<usize>> = Rc::default();
    {
        let heard = Rc::clone(&heard);
        editor.add_listener(helper, EventKind::Click, ListenerPhase::Bubble, move |_, _| {
            *heard.borrow_mut() += 1;
        });
    }

    editor
        .handle_pointer(PointerInput::click(helper, Vec3::ZERO))
        .unwrap();

    assert_eq!(*heard.borrow(), 0);
    assert_eq!(editor.selected(), objects);
    assert!(editor.is_gizmo_node(helper));
}

#[test]
fn test_release_click_after_drag_is_swallowed() {
    let Scene {
        mut editor, objects, ..
    } = selected_pair();
    let gizmo = editor.add_gizmo(GizmoOptions::default()).unwrap();
    let helper = only_helper(&editor, gizmo);

    editor.begin_gizmo_drag(gizmo, helper).unwrap();
    assert!(editor.selection().is_disabled());
    editor.end_gizmo_drag(gizmo, helper, Mat4::IDENTITY).unwrap();

    // The release lands on an object and must not replace the selection
    editor
        .handle_pointer(PointerInput::click(objects[0], Vec3::ZERO))
        .unwrap();
    assert_eq!(editor.selected(), objects);

    editor.tick().unwrap();
    editor
        .handle_pointer(PointerInput::click(objects[0], Vec3::ZERO))
        .unwrap();
    assert_eq!(editor.selected(), vec![objects[0]]);
}

#[test]
fn test_overlapping_sessions_conflict() {
    let Scene { mut editor, .. } = selected_pair();
    let first = editor.add_gizmo(GizmoOptions::default()).unwrap();
    let second = editor.add_gizmo(GizmoOptions::default()).unwrap();
    let first_helper = only_helper(&editor, first);
    let second_helper = only_helper(&editor, second);

    editor.begin_gizmo_drag(first, first_helper).unwrap();
    let result = editor.begin_gizmo_drag(second, second_helper);

    assert!(matches!(result, Err(EditorError::SessionConflict(_))));
    assert!(!editor.gizmo(second).unwrap().is_dragging());
}

#[test]
fn test_removed_gizmo_despawns_helpers() {
    let Scene { mut editor, .. } = selected_pair();
    let gizmo = editor.add_gizmo(GizmoOptions::default()).unwrap();
    let helper = only_helper(&editor, gizmo);
    let pivot = editor.gizmo(gizmo).unwrap().pivot().unwrap();

    editor.remove_gizmo(gizmo).unwrap();

    assert!(!editor.world().contains(helper));
    assert!(!editor.world().contains(pivot));
    assert!(matches!(editor.gizmo(gizmo), Err(EditorError::UnknownGizmo(_))));
}

#[test]
fn test_unmount_hands_back_clean_world() {
    let Scene {
        mut editor,
        container,
        objects,
    } = selected_pair();
    editor.add_gizmo(GizmoOptions::default()).unwrap();
    let root = editor.scene_root();

    let world = editor.unmount();

    assert_eq!(world.children_of(root), vec![container]);
    assert_eq!(world.children_of(container).len(), objects.len());
}
