//! Shared fixtures for the benchmark suite.

use archon::prelude::*;

pub const AGENTS_SMALL: usize = 1_000;
pub const AGENTS_LARGE: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Wealth {
    pub value: f32,
}

/// Spawns `count` moving agents; every fourth also carries `Wealth`.
pub fn populate(world: &mut World, count: usize) -> Vec<EntityId> {
    let mut entities = Vec::with_capacity(count);
    for index in 0..count {
        let mut bundle = Bundle::new()
            .with(Position { x: index as f32, y: 0.0 })
            .unwrap()
            .with(Velocity { dx: 1.0, dy: 0.5 })
            .unwrap();
        if index % 4 == 0 {
            bundle = bundle.with(Wealth { value: 100.0 }).unwrap();
        }
        entities.push(world.spawn_with(bundle).unwrap());
    }
    entities
}

pub fn make_world(count: usize) -> (World, Vec<EntityId>) {
    let mut world = World::new();
    let entities = populate(&mut world, count);
    (world, entities)
}
