//! Entity identity and borrow-checked entity views.
//!
//! An [`EntityId`] is an opaque integer naming one row somewhere in the
//! world's archetypes. Ids of despawned entities return to a FIFO free list
//! and may be reissued; a reissued entity starts over in the empty
//! archetype with none of its predecessor's components.
//!
//! [`EntityRef`] and [`EntityMut`] are thin views that bind an id to a
//! world borrow so component access reads like operations on the entity
//! itself. They hold no state beyond the pair and are invalidated, like
//! every component reference, by the next mutating world operation.

use std::fmt;

use crate::engine::error::EcsResult;
use crate::engine::types::{ArchetypeId, RowId};
use crate::engine::world::World;

/// Opaque identifier for an entity.
///
/// Cheap to copy, hash, and compare. Valid only against the world that
/// issued it.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Physical storage location of a live entity.
///
/// ## Invariants
/// - Always names a row `< len` of the archetype it points at.
/// - Updated in the same operation as any archetype row move, so it is the
///   single source of truth for where an entity's components live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityLocation {
    /// Archetype holding the entity's row.
    pub archetype: ArchetypeId,
    /// Row inside that archetype.
    pub row: RowId,
}

/// Read-only view of one entity.
pub struct EntityRef<'w> {
    world: &'w World,
    entity: EntityId,
}

impl<'w> EntityRef<'w> {
    pub(crate) fn new(world: &'w World, entity: EntityId) -> Self {
        Self { world, entity }
    }

    /// The entity this view addresses.
    pub fn id(&self) -> EntityId {
        self.entity
    }

    /// Returns `true` if the entity carries component `T`.
    pub fn has<T: 'static + Send + Sync>(&self) -> EcsResult<bool> {
        self.world.has::<T>(self.entity)
    }

    /// Reference to the entity's `T` cell.
    pub fn get<T: 'static + Send + Sync>(&self) -> EcsResult<&'w T> {
        self.world.get::<T>(self.entity)
    }
}

/// Mutable view of one entity.
///
/// Mutating methods return the view again so calls chain:
///
/// ```ignore
/// world
///     .entity_mut(agent)?
///     .set(Position { x: 0.0, y: 0.0 })?
///     .set(Velocity { dx: 1.0, dy: 0.0 })?;
/// ```
pub struct EntityMut<'w> {
    world: &'w mut World,
    entity: EntityId,
}

impl<'w> EntityMut<'w> {
    pub(crate) fn new(world: &'w mut World, entity: EntityId) -> Self {
        Self { world, entity }
    }

    /// The entity this view addresses.
    pub fn id(&self) -> EntityId {
        self.entity
    }

    /// Adds a default-constructed `T`; a no-op when already present.
    pub fn add<T: 'static + Send + Sync + Default>(&mut self) -> EcsResult<&mut Self> {
        self.world.add::<T>(self.entity)?;
        Ok(self)
    }

    /// Inserts or overwrites the entity's `T` cell.
    pub fn set<T: 'static + Send + Sync>(&mut self, value: T) -> EcsResult<&mut Self> {
        self.world.set(self.entity, value)?;
        Ok(self)
    }

    /// Removes `T` from the entity; a no-op when absent.
    pub fn remove<T: 'static + Send + Sync>(&mut self) -> EcsResult<&mut Self> {
        self.world.remove::<T>(self.entity)?;
        Ok(self)
    }

    /// Returns `true` if the entity carries component `T`.
    pub fn has<T: 'static + Send + Sync>(&self) -> EcsResult<bool> {
        self.world.has::<T>(self.entity)
    }

    /// Reference to the entity's `T` cell.
    pub fn get<T: 'static + Send + Sync>(&self) -> EcsResult<&T> {
        self.world.get::<T>(self.entity)
    }

    /// Mutable reference to the entity's `T` cell.
    pub fn get_mut<T: 'static + Send + Sync>(&mut self) -> EcsResult<&mut T> {
        self.world.get_mut::<T>(self.entity)
    }

    /// Despawns the entity, consuming the view.
    pub fn despawn(self) -> EcsResult<()> {
        self.world.despawn(self.entity)
    }
}
