//! Deferred structural commands.
//!
//! Query dispatch exclusively borrows the world, so a callback cannot
//! spawn, despawn, or reshape entities directly. A [`CommandBuffer`]
//! records those decisions while iterating and replays them against the
//! world afterwards, at a point where no dispatch borrow is live.
//!
//! Commands apply strictly in the order they were recorded; a command that
//! fails (for example despawning an entity twice) aborts the replay and
//! surfaces the error, leaving already-applied commands in effect.

use std::any::Any;

use crate::engine::component::{component_id_of, Bundle};
use crate::engine::entity::EntityId;
use crate::engine::error::EcsResult;
use crate::engine::types::ComponentId;
use crate::engine::world::World;

/// A single deferred structural mutation.
pub enum Command {
    /// Spawn a new entity from a bundle of component values.
    Spawn {
        /// Component values for the new entity.
        bundle: Bundle,
    },

    /// Despawn an entity.
    Despawn {
        /// Entity to destroy.
        entity: EntityId,
    },

    /// Insert or overwrite one component on an entity.
    Insert {
        /// Target entity.
        entity: EntityId,
        /// Component being written.
        component_id: ComponentId,
        /// Boxed component value.
        value: Box<dyn Any + Send>,
    },

    /// Remove one component from an entity.
    Remove {
        /// Target entity.
        entity: EntityId,
        /// Component being removed.
        component_id: ComponentId,
    },
}

/// Ordered queue of [`Command`]s.
#[derive(Default)]
pub struct CommandBuffer {
    queue: Vec<Command>,
}

impl CommandBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queues spawning an entity from `bundle`.
    pub fn spawn(&mut self, bundle: Bundle) {
        self.queue.push(Command::Spawn { bundle });
    }

    /// Queues despawning `entity`.
    pub fn despawn(&mut self, entity: EntityId) {
        self.queue.push(Command::Despawn { entity });
    }

    /// Queues inserting (or overwriting) a `T` on `entity`.
    pub fn insert<T: 'static + Send + Sync>(
        &mut self,
        entity: EntityId,
        value: T,
    ) -> EcsResult<()> {
        let component_id = component_id_of::<T>()?;
        self.queue.push(Command::Insert { entity, component_id, value: Box::new(value) });
        Ok(())
    }

    /// Queues removing `T` from `entity`.
    pub fn remove<T: 'static + Send + Sync>(&mut self, entity: EntityId) -> EcsResult<()> {
        let component_id = component_id_of::<T>()?;
        self.queue.push(Command::Remove { entity, component_id });
        Ok(())
    }

    /// Replays every queued command against `world`, in order, draining
    /// the buffer.
    ///
    /// On error the remaining commands are discarded along with the
    /// failing one; the world itself stays consistent.
    pub fn apply(&mut self, world: &mut World) -> EcsResult<()> {
        for command in self.queue.drain(..) {
            match command {
                Command::Spawn { bundle } => {
                    world.spawn_with(bundle)?;
                }
                Command::Despawn { entity } => {
                    world.despawn(entity)?;
                }
                Command::Insert { entity, component_id, value } => {
                    world.insert_boxed(entity, component_id, value)?;
                }
                Command::Remove { entity, component_id } => {
                    world.remove_by_id(entity, component_id)?;
                }
            }
        }
        Ok(())
    }
}
