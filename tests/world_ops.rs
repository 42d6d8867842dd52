use archon::prelude::*;
use archon::{EntityId, Fingerprint, QueryError};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Position {
    x: i32,
    y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Velocity {
    dx: i32,
    dy: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Health(i32);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Frozen;

#[test]
fn position_velocity_query_sees_one_entity_with_both_values() {
    let mut world = World::new();
    let e1 = world.spawn().unwrap();
    world.set(e1, Position { x: 1, y: 2 }).unwrap();
    world.set(e1, Velocity { dx: 3, dy: 4 }).unwrap();

    let query = world
        .query()
        .require::<Position>()
        .unwrap()
        .require::<Velocity>()
        .unwrap()
        .build();

    let mut seen = Vec::new();
    world
        .for_each2::<Position, Velocity>(&query, |entity, position, velocity| {
            seen.push((entity, *position, *velocity));
        })
        .unwrap();

    assert_eq!(
        seen,
        vec![(e1, Position { x: 1, y: 2 }, Velocity { dx: 3, dy: 4 })]
    );
}

#[test]
fn adding_velocity_narrows_the_velocity_query() {
    let mut world = World::new();
    let e1 = world.spawn().unwrap();
    let e2 = world.spawn().unwrap();
    world.set(e1, Position { x: 1, y: 0 }).unwrap();
    world.set(e2, Position { x: 2, y: 0 }).unwrap();
    world.add::<Velocity>(e2).unwrap();

    let positions = world.query().require::<Position>().unwrap().build();
    let mut with_position = Vec::new();
    world
        .for_each::<Position>(&positions, |entity, _| with_position.push(entity))
        .unwrap();
    with_position.sort();
    assert_eq!(with_position, vec![e1, e2]);

    let velocities = world.query().require::<Velocity>().unwrap().build();
    let mut with_velocity = Vec::new();
    world
        .for_each::<Velocity>(&velocities, |entity, velocity| {
            assert_eq!(*velocity, Velocity::default());
            with_velocity.push(entity);
        })
        .unwrap();
    assert_eq!(with_velocity, vec![e2]);
}

#[test]
fn removing_the_middle_component_preserves_the_others() {
    let mut world = World::new();
    let e1 = world.spawn().unwrap();
    world.set(e1, Position { x: 11, y: 12 }).unwrap();
    world.set(e1, Velocity { dx: 21, dy: 22 }).unwrap();
    world.set(e1, Health(99)).unwrap();

    world.remove::<Velocity>(e1).unwrap();

    let location = world.location(e1).unwrap();
    let archetype = world.archetype(location.archetype).unwrap();
    let expected = Fingerprint::from_ids(&[
        component_id_of::<Position>().unwrap(),
        component_id_of::<Health>().unwrap(),
    ]);
    assert_eq!(*archetype.fingerprint(), expected);

    assert_eq!(world.get::<Position>(e1).unwrap(), &Position { x: 11, y: 12 });
    assert_eq!(world.get::<Health>(e1).unwrap(), &Health(99));
    assert!(!world.has::<Velocity>(e1).unwrap());
}

#[test]
fn destroying_every_other_entity_keeps_the_rest_enumerable() {
    let mut world = World::new();
    let mut spawned = Vec::new();
    for index in 0..100 {
        let entity = world.spawn().unwrap();
        world.set(entity, Position { x: index, y: 0 }).unwrap();
        spawned.push(entity);
    }
    for entity in spawned.iter().step_by(2) {
        world.despawn(*entity).unwrap();
    }
    let survivors: Vec<EntityId> = spawned.iter().skip(1).step_by(2).copied().collect();
    assert_eq!(world.entity_count(), 50);

    // Every survivor's record points back at its row.
    for &entity in &survivors {
        let location = world.location(entity).unwrap();
        let archetype = world.archetype(location.archetype).unwrap();
        assert_eq!(archetype.entity_at(location.row), Some(entity));
    }

    let query = world.query().require::<Position>().unwrap().build();
    let mut seen = Vec::new();
    world
        .for_each::<Position>(&query, |entity, _| seen.push(entity))
        .unwrap();
    seen.sort();
    let mut expected = survivors.clone();
    expected.sort();
    assert_eq!(seen, expected, "no duplicates and no misses");
}

#[test]
fn component_ids_are_shared_across_worlds() {
    let position = register_component::<Position>().unwrap();
    let velocity = register_component::<Velocity>().unwrap();
    let health = register_component::<Health>().unwrap();

    // Re-consulting the registry, from the perspective of either world,
    // yields the same assignment.
    assert_eq!(component_id_of::<Position>().unwrap(), position);
    assert_eq!(component_id_of::<Velocity>().unwrap(), velocity);
    assert_eq!(component_id_of::<Health>().unwrap(), health);

    let mut world_a = World::new();
    let mut world_b = World::new();
    let a = world_a.spawn().unwrap();
    let b = world_b.spawn().unwrap();
    world_a.set(a, Position::default()).unwrap();
    world_b.set(b, Position::default()).unwrap();

    let fingerprint_a = *world_a
        .archetype(world_a.location(a).unwrap().archetype)
        .unwrap()
        .fingerprint();
    let fingerprint_b = *world_b
        .archetype(world_b.location(b).unwrap().archetype)
        .unwrap()
        .fingerprint();
    assert_eq!(fingerprint_a, fingerprint_b);
}

#[test]
fn add_on_an_owned_component_leaves_the_value_untouched() {
    let mut world = World::new();
    let e1 = world.spawn().unwrap();
    world.set(e1, Position { x: 7, y: 8 }).unwrap();
    let before = world.location(e1).unwrap();

    world.add::<Position>(e1).unwrap();

    // Structural no-op: same archetype, same row, same value.
    assert_eq!(world.location(e1), Some(before));
    assert_eq!(world.get::<Position>(e1).unwrap(), &Position { x: 7, y: 8 });
}

#[test]
fn add_then_remove_restores_the_original_archetype() {
    let mut world = World::new();
    let e1 = world.spawn().unwrap();
    world.set(e1, Position { x: 1, y: 2 }).unwrap();
    world.set(e1, Health(3)).unwrap();
    let original = *world
        .archetype(world.location(e1).unwrap().archetype)
        .unwrap()
        .fingerprint();

    world.add::<Velocity>(e1).unwrap();
    world.remove::<Velocity>(e1).unwrap();

    let restored = *world
        .archetype(world.location(e1).unwrap().archetype)
        .unwrap()
        .fingerprint();
    assert_eq!(restored, original);
    assert_eq!(world.get::<Position>(e1).unwrap(), &Position { x: 1, y: 2 });
    assert_eq!(world.get::<Health>(e1).unwrap(), &Health(3));
}

#[test]
fn removing_the_last_component_lands_in_the_empty_archetype() {
    let mut world = World::new();
    let e1 = world.spawn().unwrap();
    world.set(e1, Position { x: 1, y: 1 }).unwrap();

    world.remove::<Position>(e1).unwrap();

    assert!(world.contains(e1));
    let location = world.location(e1).unwrap();
    assert!(world.archetype(location.archetype).unwrap().fingerprint().is_empty());

    // Removing a component the entity lacks is success, not failure.
    world.remove::<Position>(e1).unwrap();
    world.remove::<Velocity>(e1).unwrap();
}

#[test]
fn despawned_ids_are_reused_fifo_and_start_empty() {
    let mut world = World::new();
    let first = world.spawn().unwrap();
    let second = world.spawn().unwrap();
    world.set(first, Position { x: 5, y: 5 }).unwrap();

    world.despawn(first).unwrap();
    world.despawn(second).unwrap();

    let reused_first = world.spawn().unwrap();
    let reused_second = world.spawn().unwrap();
    assert_eq!(reused_first, first);
    assert_eq!(reused_second, second);

    // The reused entity carries nothing over from its predecessor.
    assert!(!world.has::<Position>(reused_first).unwrap());
    let location = world.location(reused_first).unwrap();
    assert!(world.archetype(location.archetype).unwrap().fingerprint().is_empty());
}

#[test]
fn empty_query_visits_every_entity_exactly_once() {
    let mut world = World::new();
    let plain = world.spawn().unwrap();
    let carrier = world.spawn().unwrap();
    world.set(carrier, Position::default()).unwrap();

    let everything = world.query().build();
    let mut seen = Vec::new();
    world.for_each0(&everything, |entity| seen.push(entity)).unwrap();
    seen.sort();
    assert_eq!(seen, vec![plain, carrier]);
}

#[test]
fn queries_on_an_empty_world_are_a_no_op() {
    let mut world = World::new();
    let query = world.query().require::<Position>().unwrap().build();
    let mut calls = 0;
    world.for_each::<Position>(&query, |_, _| calls += 1).unwrap();
    assert_eq!(calls, 0);

    let everything = world.query().build();
    world.for_each0(&everything, |_| calls += 1).unwrap();
    assert_eq!(calls, 0);
}

#[test]
fn unknown_entities_and_missing_components_are_reported() {
    let mut world = World::new();
    let e1 = world.spawn().unwrap();
    world.set(e1, Position::default()).unwrap();

    let ghost = EntityId(4_000_000);
    assert!(matches!(world.get::<Position>(ghost), Err(EcsError::UnknownEntity(_))));
    assert!(matches!(world.despawn(ghost), Err(EcsError::UnknownEntity(_))));

    assert!(matches!(
        world.get::<Velocity>(e1),
        Err(EcsError::MissingComponent(_))
    ));

    world.despawn(e1).unwrap();
    assert!(matches!(world.despawn(e1), Err(EcsError::UnknownEntity(_))));
}

#[test]
fn aliased_and_mismatched_queries_are_rejected() {
    let world = World::new();
    let aliased = world
        .query()
        .require::<Position>()
        .unwrap()
        .require::<Position>();
    assert!(matches!(
        aliased.map(|_| ()),
        Err(EcsError::Query(QueryError::AliasedComponent { .. }))
    ));

    let mut world = World::new();
    let query = world.query().require::<Position>().unwrap().build();
    let result = world.for_each2::<Position, Velocity>(&query, |_, _, _| {});
    assert!(matches!(
        result,
        Err(EcsError::Query(QueryError::ArityMismatch { expected: 1, got: 2 }))
    ));
}

#[test]
fn without_filters_exclude_matching_archetypes() {
    let mut world = World::new();
    let warm = world.spawn().unwrap();
    world.set(warm, Position { x: 1, y: 0 }).unwrap();
    let frozen = world.spawn().unwrap();
    world.set(frozen, Position { x: 2, y: 0 }).unwrap();
    world.set(frozen, Frozen).unwrap();

    let query = world
        .query()
        .require::<Position>()
        .unwrap()
        .without::<Frozen>()
        .unwrap()
        .build();
    let mut seen = Vec::new();
    world
        .for_each::<Position>(&query, |entity, _| seen.push(entity))
        .unwrap();
    assert_eq!(seen, vec![warm]);
}

#[test]
fn spawn_with_writes_a_full_row() {
    let mut world = World::new();
    let bundle = Bundle::new()
        .with(Position { x: 3, y: 4 })
        .unwrap()
        .with(Velocity { dx: 5, dy: 6 })
        .unwrap();
    let entity = world.spawn_with(bundle).unwrap();

    assert_eq!(world.get::<Position>(entity).unwrap(), &Position { x: 3, y: 4 });
    assert_eq!(world.get::<Velocity>(entity).unwrap(), &Velocity { dx: 5, dy: 6 });
    assert_eq!(world.entity_count(), 1);
}

#[test]
fn entity_views_chain_mutations() {
    let mut world = World::new();
    let agent = world.spawn().unwrap();
    world
        .entity_mut(agent)
        .unwrap()
        .set(Position { x: 1, y: 1 })
        .unwrap()
        .set(Health(10))
        .unwrap()
        .remove::<Health>()
        .unwrap()
        .add::<Velocity>()
        .unwrap();

    let view = world.entity(agent).unwrap();
    assert!(view.has::<Position>().unwrap());
    assert!(view.has::<Velocity>().unwrap());
    assert!(!view.has::<Health>().unwrap());
    assert_eq!(view.get::<Position>().unwrap(), &Position { x: 1, y: 1 });

    world.entity_mut(agent).unwrap().despawn().unwrap();
    assert!(!world.contains(agent));
}

#[test]
fn command_buffers_defer_structural_change_past_dispatch() {
    let mut world = World::new();
    let mut spawned = Vec::new();
    for index in 0..4 {
        let entity = world.spawn().unwrap();
        world.set(entity, Health(index)).unwrap();
        spawned.push(entity);
    }

    let query = world.query().require::<Health>().unwrap().build();
    let mut commands = CommandBuffer::new();
    world
        .for_each::<Health>(&query, |entity, health| {
            if health.0 % 2 == 0 {
                commands.despawn(entity);
            } else {
                commands.insert(entity, Velocity { dx: 1, dy: 0 }).unwrap();
            }
        })
        .unwrap();
    commands
        .spawn(Bundle::new().with(Health(100)).unwrap());
    assert_eq!(commands.len(), 5);

    commands.apply(&mut world).unwrap();
    assert!(commands.is_empty());

    assert_eq!(world.entity_count(), 3);
    assert!(!world.contains(spawned[0]));
    assert!(!world.contains(spawned[2]));
    assert!(world.has::<Velocity>(spawned[1]).unwrap());
    assert!(world.has::<Velocity>(spawned[3]).unwrap());

    let mut healths = Vec::new();
    world
        .for_each::<Health>(&query, |_, health| healths.push(health.0))
        .unwrap();
    healths.sort();
    assert_eq!(healths, vec![1, 3, 100]);
}

#[test]
fn set_overwrites_in_place_without_migrating() {
    let mut world = World::new();
    let e1 = world.spawn().unwrap();
    world.set(e1, Position { x: 1, y: 1 }).unwrap();
    let location = world.location(e1).unwrap();

    world.set(e1, Position { x: 9, y: 9 }).unwrap();
    assert_eq!(world.location(e1), Some(location));
    assert_eq!(world.get::<Position>(e1).unwrap(), &Position { x: 9, y: 9 });

    *world.get_mut::<Position>(e1).unwrap() = Position { x: -1, y: -1 };
    assert_eq!(world.get::<Position>(e1).unwrap(), &Position { x: -1, y: -1 });
}
