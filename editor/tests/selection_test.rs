//! Selection behavior driven through canvas pointer input

use glam::Vec3;
use scene_editor::prelude::*;
use scene_engine::core::entity::{Entity, Name, Transform, World};

struct Scene {
    editor: Editor,
    container: Entity,
    objects: Vec<Entity>,
}

fn scene(count: usize) -> Scene {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut world = World::new();
    let root = world.spawn_with_transform((Name::new("scene"),));
    let container = world.spawn_child(root, Transform::default(), (Name::new("selectable"),));
    let objects = (0..count)
        .map(|i| {
            world.spawn_child(
                container,
                Transform::from_position(Vec3::new(i as f32, 0.0, 0.0)),
                (Name::new(format!("object {i}")),),
            )
        })
        .collect();

    let mut editor = Editor::new(world, root).unwrap();
    editor
        .register_selectable(container, SelectableOptions::default())
        .unwrap();
    Scene {
        editor,
        container,
        objects,
    }
}

fn click(editor: &mut Editor, object: Entity) {
    editor
        .handle_pointer(PointerInput::click(object, Vec3::ZERO))
        .unwrap();
}

#[test]
fn test_replace_keeps_only_last_clicked() {
    let Scene {
        mut editor, objects, ..
    } = scene(3);

    for object in &objects {
        click(&mut editor, *object);
        assert_eq!(editor.selected(), vec![*object]);
    }
}

#[test]
fn test_toggle_twice_restores_selection() {
    let Scene {
        mut editor, objects, ..
    } = scene(2);
    editor.select(objects[0], SelectionMode::Add).unwrap();
    editor.set_selection_mode(SelectionMode::Toggle);

    click(&mut editor, objects[1]);
    assert_eq!(editor.selected(), vec![objects[0], objects[1]]);
    click(&mut editor, objects[1]);
    assert_eq!(editor.selected(), vec![objects[0]]);
}

#[test]
fn test_repeated_delivery_of_one_click_toggles_once() {
    let Scene {
        mut editor, objects, ..
    } = scene(1);
    editor.set_selection_mode(SelectionMode::Toggle);

    let input = PointerInput::click(objects[0], Vec3::ZERO);
    editor.handle_pointer(input.clone()).unwrap();
    editor.handle_pointer(input).unwrap();

    assert_eq!(editor.selected(), vec![objects[0]]);
}

#[test]
fn test_click_on_grandchild_selects_direct_child_of_container() {
    let Scene {
        mut editor, objects, ..
    } = scene(1);
    let part = editor
        .world_mut()
        .spawn_child(objects[0], Transform::default(), (Name::new("part"),));

    click(&mut editor, part);

    assert_eq!(editor.selected(), vec![objects[0]]);
    assert!(editor.is_selected(objects[0], Resolution::Global).unwrap());
    assert!(!editor.is_selected(part, Resolution::Global).unwrap());
}

#[test]
fn test_click_outside_registered_containers_is_ignored() {
    let Scene {
        mut editor, objects, ..
    } = scene(1);
    editor.select(objects[0], SelectionMode::Replace).unwrap();
    let root = editor.scene_root();
    let loose = editor
        .world_mut()
        .spawn_child(root, Transform::default(), (Name::new("loose"),));

    click(&mut editor, loose);

    assert_eq!(editor.selected(), vec![objects[0]]);
}

#[test]
fn test_background_click_clears_loose_programmatic_selection() {
    let Scene {
        mut editor, objects, ..
    } = scene(1);
    let root = editor.scene_root();
    let loose = editor
        .world_mut()
        .spawn_child(root, Transform::default(), (Name::new("loose"),));
    editor.select(objects[0], SelectionMode::Add).unwrap();
    editor.select(loose, SelectionMode::Add).unwrap();
    assert_eq!(editor.selected(), vec![objects[0], loose]);

    editor
        .handle_pointer(PointerInput::click_background())
        .unwrap();

    assert!(editor.selected().is_empty());
    assert!(!editor.is_selected(loose, Resolution::Global).unwrap());
}

#[test]
fn test_remove_mode_removes_from_every_scope() {
    let Scene {
        mut editor, objects, ..
    } = scene(2);
    editor.select(objects[0], SelectionMode::Add).unwrap();
    editor.select(objects[1], SelectionMode::Add).unwrap();
    editor.set_selection_mode(SelectionMode::Remove);

    click(&mut editor, objects[0]);

    assert_eq!(editor.selected(), vec![objects[1]]);
}

#[test]
fn test_background_click_clears_sibling_regions() {
    let mut world = World::new();
    let root = world.spawn_with_transform((Name::new("scene"),));
    let region_a = world.spawn_child(root, Transform::default(), (Name::new("A"),));
    let region_b = world.spawn_child(root, Transform::default(), (Name::new("B"),));
    let a1 = world.spawn_child(region_a, Transform::default(), (Name::new("a1"),));
    let b1 = world.spawn_child(region_b, Transform::default(), (Name::new("b1"),));

    let mut editor = Editor::new(world, root).unwrap();
    let scope_a = editor
        .register_selectable(region_a, SelectableOptions::default())
        .unwrap();
    let scope_b = editor
        .register_selectable(region_b, SelectableOptions::default())
        .unwrap();
    editor.select(a1, SelectionMode::Add).unwrap();
    editor.select(b1, SelectionMode::Add).unwrap();
    assert_eq!(editor.selected(), vec![a1, b1]);

    editor
        .handle_pointer(PointerInput::click_background())
        .unwrap();

    assert!(editor.selection_of(scope_a).unwrap().is_empty());
    assert!(editor.selection_of(scope_b).unwrap().is_empty());
    assert!(editor.selected().is_empty());
}

#[test]
fn test_background_click_clears_nested_region_through_its_parent() {
    let mut world = World::new();
    let root = world.spawn_with_transform((Name::new("scene"),));
    let region_a = world.spawn_child(root, Transform::default(), (Name::new("A"),));
    let region_c = world.spawn_child(region_a, Transform::default(), (Name::new("C"),));
    let c1 = world.spawn_child(region_c, Transform::default(), (Name::new("c1"),));

    let mut editor = Editor::new(world, root).unwrap();
    let scope_a = editor
        .register_selectable(region_a, SelectableOptions::default())
        .unwrap();
    let scope_c = editor
        .register_selectable(region_c, SelectableOptions::default())
        .unwrap();
    editor.select(c1, SelectionMode::Add).unwrap();
    assert_eq!(editor.selection_of(scope_a).unwrap(), vec![c1]);

    editor
        .handle_pointer(PointerInput::click_background())
        .unwrap();

    assert!(editor.selection_of(scope_c).unwrap().is_empty());
    assert!(editor.selection_of(scope_a).unwrap().is_empty());
}

#[test]
fn test_isolated_scope_keeps_selection_to_itself() {
    let mut world = World::new();
    let root = world.spawn_with_transform((Name::new("scene"),));
    let region_a = world.spawn_child(root, Transform::default(), (Name::new("A"),));
    let region_c = world.spawn_child(region_a, Transform::default(), (Name::new("C"),));
    let a1 = world.spawn_child(region_a, Transform::default(), (Name::new("a1"),));
    let c1 = world.spawn_child(region_c, Transform::default(), (Name::new("c1"),));

    let mut editor = Editor::new(world, root).unwrap();
    let scope_a = editor
        .register_selectable(region_a, SelectableOptions::default())
        .unwrap();
    let scope_c = editor
        .register_selectable(region_c, SelectableOptions::isolated())
        .unwrap();

    click(&mut editor, a1);
    click(&mut editor, c1);

    // Replace inside C only replaces within C
    assert_eq!(editor.selection_of(scope_c).unwrap(), vec![c1]);
    assert_eq!(editor.selection_of(scope_a).unwrap(), vec![a1]);
    assert_eq!(editor.selected(), vec![a1]);
    assert!(editor.is_selected(c1, Resolution::Local).unwrap());
}

#[test]
fn test_selected_events_fire_once_per_transition() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let Scene {
        mut editor,
        container,
        objects,
    } = scene(2);
    let log: Rc<RefCell<Vec<(EventKind, Entity)>>> = Rc::default();
    for kind in [EventKind::Selected, EventKind::Deselected] {
        let log = Rc::clone(&log);
        editor.add_listener(container, kind, ListenerPhase::Bubble, move |_, event| {
            log.borrow_mut().push((event.kind(), event.target()));
        });
    }

    click(&mut editor, objects[0]);
    click(&mut editor, objects[1]);

    assert_eq!(
        *log.borrow(),
        vec![
            (EventKind::Selected, objects[0]),
            (EventKind::Deselected, objects[0]),
            (EventKind::Selected, objects[1]),
        ]
    );
}

#[test]
fn test_declarative_membership_binding() {
    let Scene {
        mut editor, objects, ..
    } = scene(2);
    editor.select(objects[0], SelectionMode::Add).unwrap();

    editor.set_selected(objects[1], true).unwrap();
    assert_eq!(editor.selected(), vec![objects[0], objects[1]]);

    editor.set_selected(objects[1], false).unwrap();
    assert_eq!(editor.selected(), vec![objects[0]]);
}

#[test]
fn test_deferred_registration_waits_for_reference() {
    let mut world = World::new();
    let root = world.spawn_with_transform((Name::new("scene"),));
    let region = world.spawn_child(root, Transform::default(), (Name::new("late"),));
    let object = world.spawn_child(region, Transform::default(), (Name::new("object"),));
    let mut editor = Editor::new(world, root).unwrap();

    let reference = ObjectRef::new();
    editor
        .register_selectable_when(&reference, SelectableOptions::default())
        .unwrap();
    click(&mut editor, object);
    assert!(editor.selected().is_empty());
    assert_eq!(editor.pending_registrations(), 1);

    reference.resolve(region);
    editor.tick().unwrap();
    assert_eq!(editor.pending_registrations(), 0);
    click(&mut editor, object);
    assert_eq!(editor.selected(), vec![object]);
}

#[test]
fn test_unregister_clears_scope_selection() {
    let Scene {
        mut editor,
        container,
        objects,
    } = scene(1);
    click(&mut editor, objects[0]);
    let scope = editor.selection().scope_for_container(container).unwrap();

    editor.unregister_selectable(scope).unwrap();

    assert!(editor.selected().is_empty());
    click(&mut editor, objects[0]);
    assert!(editor.selected().is_empty());
}

#[test]
fn test_unregister_outer_scope_keeps_inner_selection() {
    let mut world = World::new();
    let root = world.spawn_with_transform((Name::new("scene"),));
    let outer = world.spawn_child(root, Transform::default(), (Name::new("outer"),));
    let inner = world.spawn_child(outer, Transform::default(), (Name::new("inner"),));
    let own = world.spawn_child(outer, Transform::default(), (Name::new("own"),));
    let object = world.spawn_child(inner, Transform::default(), (Name::new("object"),));

    let mut editor = Editor::new(world, root).unwrap();
    let outer_scope = editor
        .register_selectable(outer, SelectableOptions::default())
        .unwrap();
    let inner_scope = editor
        .register_selectable(inner, SelectableOptions::default())
        .unwrap();
    editor.select(object, SelectionMode::Replace).unwrap();
    editor.select(own, SelectionMode::Add).unwrap();
    assert_eq!(editor.selected(), vec![object, own]);

    editor.unregister_selectable(outer_scope).unwrap();

    assert_eq!(editor.selection_of(inner_scope).unwrap(), vec![object]);
    assert_eq!(editor.selected(), vec![object]);
    assert!(editor.is_selected(object, Resolution::Global).unwrap());

    // The inner scope now mirrors straight into the root list
    editor.select(object, SelectionMode::Remove).unwrap();
    assert!(editor.selected().is_empty());
    assert!(editor.selection_of(inner_scope).unwrap().is_empty());
}

#[test]
fn test_reparent_out_of_container_drops_selection() {
    let Scene {
        mut editor, objects, ..
    } = scene(2);
    editor.select(objects[0], SelectionMode::Add).unwrap();
    editor.select(objects[1], SelectionMode::Add).unwrap();

    let root = editor.scene_root();
    editor.reparent(objects[0], Some(root)).unwrap();

    assert_eq!(editor.selected(), vec![objects[1]]);
}

#[test]
fn test_reparent_into_own_descendant_is_rejected() {
    let Scene {
        mut editor,
        container,
        objects,
    } = scene(1);

    let result = editor.reparent(container, Some(objects[0]));

    assert!(matches!(result, Err(EditorError::Hierarchy(_))));
    assert_eq!(editor.world().parent_of(objects[0]), Some(container));
}
