//! The world: archetype ownership, entity records, and structural change.
//!
//! ## Purpose
//! A [`World`] owns every archetype ever observed, the entity-id to
//! location map, and the free-id queue. It is the single entry point for
//! structural mutation: spawning and despawning entities, adding and
//! removing components, and resolving fingerprints to archetypes.
//!
//! ## Design
//! - Archetypes live in a dense vector addressed by [`ArchetypeId`]; a
//!   fingerprint-keyed map provides the bijection `fingerprint <->
//!   archetype`. Archetypes are created on first reference and retained
//!   for the world's lifetime.
//! - Entity ids are reused FIFO: despawned ids queue in `removed` and are
//!   handed out before the monotonic counter grows.
//! - Component add/remove is a migration between two archetypes: shared
//!   cells move by value, the record of the migrated entity and of any
//!   entity displaced by swap-remove are rewritten in the same operation.
//!
//! ## Concurrency
//! A world is single-threaded by contract; callers serialize all access.
//! The only process-wide state is the component registry.

use std::collections::{HashMap, VecDeque};

use crate::engine::archetype::Archetype;
use crate::engine::component::{component_id_of, Bundle, DynamicBundle};
use crate::engine::entity::{EntityId, EntityLocation, EntityMut, EntityRef};
use crate::engine::error::{
    EcsError, EcsResult, MissingComponentError, UnknownEntityError,
};
use crate::engine::types::{ArchetypeId, ComponentId, Fingerprint, RowId};

/// The archetype store.
///
/// See the [module documentation](self) for the ownership model. All
/// operations take `&mut self` or `&self`; the borrow checker therefore
/// enforces the reference-lifetime rule that any component reference is
/// invalidated by the next mutating operation.
pub struct World {
    archetypes: Vec<Archetype>,
    by_fingerprint: HashMap<Fingerprint, ArchetypeId>,
    entities: HashMap<EntityId, EntityLocation>,
    removed: VecDeque<EntityId>,
    next_id: u32,
    in_dispatch: bool,
}

/// Index of the empty archetype, created with the world.
const EMPTY_ARCHETYPE: ArchetypeId = 0;

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates an empty world.
    ///
    /// The empty archetype (no components) is created eagerly so that
    /// spawning never needs a fallible lookup.
    pub fn new() -> Self {
        let empty = Archetype::new(EMPTY_ARCHETYPE, Fingerprint::empty())
            .expect("the empty archetype allocates no columns");
        let mut by_fingerprint = HashMap::new();
        by_fingerprint.insert(Fingerprint::empty(), EMPTY_ARCHETYPE);
        Self {
            archetypes: vec![empty],
            by_fingerprint,
            entities: HashMap::new(),
            removed: VecDeque::new(),
            next_id: 0,
            in_dispatch: false,
        }
    }

    #[inline]
    fn guard_structural(&self) -> EcsResult<()> {
        if self.in_dispatch {
            return Err(EcsError::ConcurrentModification);
        }
        Ok(())
    }

    pub(crate) fn begin_dispatch(&mut self) {
        self.in_dispatch = true;
    }

    pub(crate) fn end_dispatch(&mut self) {
        self.in_dispatch = false;
    }

    fn allocate_id(&mut self) -> EcsResult<EntityId> {
        if let Some(entity) = self.removed.pop_front() {
            return Ok(entity);
        }
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or(EcsError::Internal("entity id space exhausted"))?;
        Ok(EntityId(id))
    }

    /// Creates a new entity in the empty archetype.
    ///
    /// The id is reused from the despawn queue when one is available,
    /// otherwise freshly allocated.
    pub fn spawn(&mut self) -> EcsResult<EntityId> {
        self.spawn_with(Bundle::new())
    }

    /// Creates a new entity holding every component in `bundle`.
    ///
    /// The entity is written directly into the archetype matching the
    /// bundle's fingerprint, one row across all columns.
    pub fn spawn_with(&mut self, mut bundle: Bundle) -> EcsResult<EntityId> {
        self.guard_structural()?;
        let archetype_id = self.get_or_create_archetype(bundle.fingerprint())?;
        let entity = self.allocate_id()?;
        let row = match self.archetypes[archetype_id as usize].append(entity, &mut bundle) {
            Ok(row) => row,
            Err(error) => {
                // The row was rolled back; return the id so it is not leaked.
                self.removed.push_front(entity);
                return Err(error);
            }
        };
        self.entities.insert(entity, EntityLocation { archetype: archetype_id, row });
        Ok(entity)
    }

    /// Destroys an entity.
    ///
    /// Its row is swap-removed from the owning archetype (cells dropped in
    /// column order), its record erased, and its id queued for reuse.
    ///
    /// ## Errors
    /// `UnknownEntity` when the world has no record of `entity`.
    pub fn despawn(&mut self, entity: EntityId) -> EcsResult<()> {
        self.guard_structural()?;
        let location = self.location_of(entity)?;
        let moved = self.archetypes[location.archetype as usize].swap_remove(location.row)?;
        self.entities.remove(&entity);
        if let Some(moved) = moved {
            self.set_row(moved, location.row)?;
        }
        self.removed.push_back(entity);
        Ok(())
    }

    /// Adds a default-constructed `T` to the entity.
    ///
    /// When the entity already carries `T` this is a structural no-op and
    /// the existing value is left untouched.
    pub fn add<T: 'static + Send + Sync + Default>(&mut self, entity: EntityId) -> EcsResult<()> {
        let component_id = component_id_of::<T>()?;
        let location = self.location_of(entity)?;
        if self.archetypes[location.archetype as usize].has(component_id) {
            return Ok(());
        }
        self.insert_boxed(entity, component_id, Box::new(T::default()))
    }

    /// Inserts or overwrites the entity's `T` cell.
    ///
    /// Migrates the entity first when it does not carry `T`; either way the
    /// cell afterwards holds `value`, and any previous value was dropped
    /// exactly once.
    pub fn set<T: 'static + Send + Sync>(&mut self, entity: EntityId, value: T) -> EcsResult<()> {
        let component_id = component_id_of::<T>()?;
        let location = self.location_of(entity)?;
        if self.archetypes[location.archetype as usize].has(component_id) {
            *self.archetypes[location.archetype as usize].cell_mut(component_id, location.row)? =
                value;
            return Ok(());
        }
        self.insert_boxed(entity, component_id, Box::new(value))
    }

    /// Removes `T` from the entity.
    ///
    /// Success when the entity does not carry `T`. Removing the last
    /// component migrates the entity to the empty archetype; it stays
    /// placed and alive.
    pub fn remove<T: 'static + Send + Sync>(&mut self, entity: EntityId) -> EcsResult<()> {
        let component_id = component_id_of::<T>()?;
        self.remove_by_id(entity, component_id)
    }

    /// Returns `true` if the entity carries component `T`.
    pub fn has<T: 'static + Send + Sync>(&self, entity: EntityId) -> EcsResult<bool> {
        let component_id = component_id_of::<T>()?;
        let location = self.location_of(entity)?;
        Ok(self.archetypes[location.archetype as usize].has(component_id))
    }

    /// Reference to the entity's `T` cell.
    ///
    /// ## Errors
    /// `UnknownEntity` when the entity has no record;
    /// `ComponentNotOnEntity` when it does not carry `T`.
    pub fn get<T: 'static + Send + Sync>(&self, entity: EntityId) -> EcsResult<&T> {
        let component_id = component_id_of::<T>()?;
        let location = self.location_of(entity)?;
        let archetype = &self.archetypes[location.archetype as usize];
        if !archetype.has(component_id) {
            return Err(MissingComponentError { entity, component: std::any::type_name::<T>() }
                .into());
        }
        archetype.cell(component_id, location.row)
    }

    /// Mutable reference to the entity's `T` cell.
    pub fn get_mut<T: 'static + Send + Sync>(&mut self, entity: EntityId) -> EcsResult<&mut T> {
        let component_id = component_id_of::<T>()?;
        let location = self.location_of(entity)?;
        let archetype = &mut self.archetypes[location.archetype as usize];
        if !archetype.has(component_id) {
            return Err(MissingComponentError { entity, component: std::any::type_name::<T>() }
                .into());
        }
        archetype.cell_mut(component_id, location.row)
    }

    /// Read-only view of one entity.
    pub fn entity(&self, entity: EntityId) -> EcsResult<EntityRef<'_>> {
        self.location_of(entity)?;
        Ok(EntityRef::new(self, entity))
    }

    /// Mutable view of one entity.
    pub fn entity_mut(&mut self, entity: EntityId) -> EcsResult<EntityMut<'_>> {
        self.location_of(entity)?;
        Ok(EntityMut::new(self, entity))
    }

    /// Resolves `fingerprint` to its archetype, creating it on first
    /// reference with columns in ascending component-id order.
    pub fn get_or_create_archetype(&mut self, fingerprint: Fingerprint) -> EcsResult<ArchetypeId> {
        if let Some(&archetype_id) = self.by_fingerprint.get(&fingerprint) {
            return Ok(archetype_id);
        }
        if self.archetypes.len() > ArchetypeId::MAX as usize {
            return Err(EcsError::Internal("archetype id space exhausted"));
        }
        let archetype_id = self.archetypes.len() as ArchetypeId;
        let archetype = Archetype::new(archetype_id, fingerprint)?;
        self.archetypes.push(archetype);
        self.by_fingerprint.insert(fingerprint, archetype_id);
        tracing::debug!(archetype = archetype_id, fingerprint = ?fingerprint, "created archetype");
        Ok(archetype_id)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of archetypes ever created, the empty archetype included.
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Returns `true` if the world has a record for `entity`.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Storage location of a live entity.
    pub fn location(&self, entity: EntityId) -> Option<EntityLocation> {
        self.entities.get(&entity).copied()
    }

    /// The archetype at `archetype_id`, if created.
    pub fn archetype(&self, archetype_id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(archetype_id as usize)
    }

    /// Iterates over every archetype in creation order.
    pub fn archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    pub(crate) fn archetype_mut(&mut self, index: usize) -> &mut Archetype {
        &mut self.archetypes[index]
    }

    #[inline]
    fn location_of(&self, entity: EntityId) -> EcsResult<EntityLocation> {
        self.entities
            .get(&entity)
            .copied()
            .ok_or_else(|| UnknownEntityError { entity }.into())
    }

    fn set_row(&mut self, entity: EntityId, row: RowId) -> EcsResult<()> {
        let record = self
            .entities
            .get_mut(&entity)
            .ok_or(EcsError::Internal("displaced entity has no record"))?;
        record.row = row;
        Ok(())
    }

    /// Disjoint mutable references to two distinct archetypes.
    fn archetype_pair_mut(
        &mut self,
        a: ArchetypeId,
        b: ArchetypeId,
    ) -> (&mut Archetype, &mut Archetype) {
        assert!(a != b, "source and destination archetype must differ");
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.archetypes.split_at_mut(high as usize);
        let low_ref = &mut head[low as usize];
        let high_ref = &mut tail[0];
        if a < b {
            (low_ref, high_ref)
        } else {
            (high_ref, low_ref)
        }
    }

    /// Migrates `entity` into the archetype that additionally stores
    /// `component_id`, inserting `value` as the new cell.
    pub(crate) fn insert_boxed(
        &mut self,
        entity: EntityId,
        component_id: ComponentId,
        value: Box<dyn std::any::Any + Send>,
    ) -> EcsResult<()> {
        self.guard_structural()?;
        let location = self.location_of(entity)?;
        let source_id = location.archetype;
        let source_fingerprint = *self.archetypes[source_id as usize].fingerprint();

        if source_fingerprint.contains(component_id) {
            // Already present: overwrite in place via the type-erased path.
            return self.replace_boxed(entity, component_id, value);
        }

        let destination_id =
            self.get_or_create_archetype(source_fingerprint.with(component_id))?;
        tracing::trace!(
            entity = %entity,
            component = component_id,
            from = source_id,
            to = destination_id,
            "migrating entity (add)"
        );

        let (source, destination) = self.archetype_pair_mut(source_id, destination_id);
        let (destination_row, moved) =
            source.migrate_row_to(destination, location.row, Some((component_id, value)))?;

        self.entities.insert(
            entity,
            EntityLocation { archetype: destination_id, row: destination_row },
        );
        if let Some(moved) = moved {
            self.set_row(moved, location.row)?;
        }
        Ok(())
    }

    /// Overwrites an existing cell through the type-erased column.
    pub(crate) fn replace_boxed(
        &mut self,
        entity: EntityId,
        component_id: ComponentId,
        value: Box<dyn std::any::Any + Send>,
    ) -> EcsResult<()> {
        let location = self.location_of(entity)?;
        self.archetypes[location.archetype as usize]
            .replace_cell(component_id, location.row, value)
    }

    /// Migrates `entity` out of `component_id`; success when absent.
    pub(crate) fn remove_by_id(
        &mut self,
        entity: EntityId,
        component_id: ComponentId,
    ) -> EcsResult<()> {
        self.guard_structural()?;
        let location = self.location_of(entity)?;
        let source_id = location.archetype;
        let source_fingerprint = *self.archetypes[source_id as usize].fingerprint();

        if !source_fingerprint.contains(component_id) {
            return Ok(());
        }

        let destination_id =
            self.get_or_create_archetype(source_fingerprint.without(component_id))?;
        tracing::trace!(
            entity = %entity,
            component = component_id,
            from = source_id,
            to = destination_id,
            "migrating entity (remove)"
        );

        let (source, destination) = self.archetype_pair_mut(source_id, destination_id);
        let (destination_row, moved) = source.migrate_row_to(destination, location.row, None)?;

        self.entities.insert(
            entity,
            EntityLocation { archetype: destination_id, row: destination_row },
        );
        if let Some(moved) = moved {
            self.set_row(moved, location.row)?;
        }
        Ok(())
    }
}
