//! Archetypes: columnar storage buckets keyed by component fingerprint.
//!
//! One archetype exists per distinct [`Fingerprint`] the world has ever
//! observed. It owns one typed column per component id in the fingerprint
//! plus a parallel vector of entity ids; row *r* across every column and
//! the entity vector belongs to the same entity.
//!
//! ## Invariants
//! - `types` lists the fingerprint's component ids in ascending order and
//!   column *k* stores cells of component `types[k]`.
//! - Every column and the entity vector have identical length.
//! - Rows are dense: removal and migration compact by swap-with-last, and
//!   the caller repairs the displaced entity's record from the returned
//!   [`EntityId`].
//!
//! ## Migration
//! Moving a row to another archetype splits the component set three ways
//! with word-wise fingerprint arithmetic: cells present in both archetypes
//! are moved by value, the cell only the destination stores is inserted
//! from the supplied value, and cells only the source stores are dropped.
//! Every column must land the row at the same destination index; a
//! disagreement aborts with [`MoveError::RowMisalignment`].

use std::any::{Any, TypeId};

use crate::engine::component::{new_column_for, DynamicBundle};
use crate::engine::entity::EntityId;
use crate::engine::error::{ColumnError, EcsError, EcsResult, MissingColumnError, MoveError};
use crate::engine::storage::{Column, TypedColumn};
use crate::engine::types::{ArchetypeId, ComponentId, Fingerprint, RowId};

/// Storage bucket for every entity sharing one component fingerprint.
pub struct Archetype {
    id: ArchetypeId,
    fingerprint: Fingerprint,
    types: Vec<ComponentId>,
    columns: Vec<Box<dyn Column>>,
    entities: Vec<EntityId>,
}

impl Archetype {
    /// Creates an empty archetype with one column per fingerprint member,
    /// in ascending component-id order.
    ///
    /// ## Errors
    /// Fails when a fingerprint member has no registered column factory.
    pub(crate) fn new(id: ArchetypeId, fingerprint: Fingerprint) -> EcsResult<Self> {
        let mut types = Vec::with_capacity(fingerprint.len());
        let mut columns: Vec<Box<dyn Column>> = Vec::with_capacity(fingerprint.len());
        for component_id in fingerprint.iter() {
            types.push(component_id);
            columns.push(new_column_for(component_id)?);
        }
        Ok(Self { id, fingerprint, types, columns, entities: Vec::new() })
    }

    /// This archetype's index in the owning world.
    #[inline]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    /// The component set stored here.
    #[inline]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Component ids in ascending order; column *k* stores `types()[k]`.
    #[inline]
    pub fn types(&self) -> &[ComponentId] {
        &self.types
    }

    /// Entity ids by row.
    #[inline]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Entity occupying `row`, if in bounds.
    #[inline]
    pub fn entity_at(&self, row: RowId) -> Option<EntityId> {
        self.entities.get(row as usize).copied()
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the archetype holds no entities.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns `true` if `component_id` is part of this archetype.
    #[inline]
    pub fn has(&self, component_id: ComponentId) -> bool {
        self.fingerprint.contains(component_id)
    }

    /// Column index for `component_id`, if present.
    #[inline]
    fn position(&self, component_id: ComponentId) -> Option<usize> {
        self.types.binary_search(&component_id).ok()
    }

    /// Typed view over the column for component `T`.
    ///
    /// Fails with the missing-column kind when `T` is not part of this
    /// archetype.
    pub fn column<T: 'static + Send + Sync>(&self) -> EcsResult<&[T]> {
        let component_id = crate::engine::component::component_id_of::<T>()?;
        self.column_by_id(component_id)
    }

    /// Mutable typed view over the column for component `T`.
    pub fn column_mut<T: 'static + Send + Sync>(&mut self) -> EcsResult<&mut [T]> {
        let component_id = crate::engine::component::component_id_of::<T>()?;
        self.column_mut_by_id(component_id)
    }

    pub(crate) fn column_by_id<T: 'static + Send + Sync>(
        &self,
        component_id: ComponentId,
    ) -> EcsResult<&[T]> {
        let position = self
            .position(component_id)
            .ok_or(MissingColumnError { component_id })?;
        let actual = self.columns[position].element_type_id();
        let column = self.columns[position]
            .as_any()
            .downcast_ref::<TypedColumn<T>>()
            .ok_or(EcsError::Column(ColumnError::TypeMismatch {
                expected: TypeId::of::<T>(),
                actual,
            }))?;
        Ok(column.as_slice())
    }

    pub(crate) fn column_mut_by_id<T: 'static + Send + Sync>(
        &mut self,
        component_id: ComponentId,
    ) -> EcsResult<&mut [T]> {
        let position = self
            .position(component_id)
            .ok_or(MissingColumnError { component_id })?;
        let actual = self.columns[position].element_type_id();
        let column = self.columns[position]
            .as_any_mut()
            .downcast_mut::<TypedColumn<T>>()
            .ok_or(EcsError::Column(ColumnError::TypeMismatch {
                expected: TypeId::of::<T>(),
                actual,
            }))?;
        Ok(column.as_mut_slice())
    }

    /// Reference to the `T` cell at `row`.
    pub(crate) fn cell<T: 'static + Send + Sync>(
        &self,
        component_id: ComponentId,
        row: RowId,
    ) -> EcsResult<&T> {
        let column = self.column_by_id::<T>(component_id)?;
        let length = column.len();
        column
            .get(row as usize)
            .ok_or(EcsError::Column(ColumnError::OutOfBounds { row, length }))
    }

    /// Mutable reference to the `T` cell at `row`.
    pub(crate) fn cell_mut<T: 'static + Send + Sync>(
        &mut self,
        component_id: ComponentId,
        row: RowId,
    ) -> EcsResult<&mut T> {
        let column = self.column_mut_by_id::<T>(component_id)?;
        let length = column.len();
        column
            .get_mut(row as usize)
            .ok_or(EcsError::Column(ColumnError::OutOfBounds { row, length }))
    }

    /// Overwrites the cell at `row` through the type-erased column.
    ///
    /// The previous value is dropped exactly once before the slot holds
    /// the new one.
    pub(crate) fn replace_cell(
        &mut self,
        component_id: ComponentId,
        row: RowId,
        value: Box<dyn Any + Send>,
    ) -> EcsResult<()> {
        let position = self
            .position(component_id)
            .ok_or(MissingColumnError { component_id })?;
        self.columns[position]
            .replace(row, value)
            .map_err(|source| MoveError::Column { component_id, source })?;
        Ok(())
    }

    /// Base pointer of the `T` column for dispatch iteration.
    ///
    /// The pointer is valid until the next structural mutation of this
    /// archetype; the query dispatcher consumes it within one loop under an
    /// exclusive world borrow.
    pub(crate) fn column_ptr<T: 'static + Send + Sync>(
        &mut self,
        component_id: ComponentId,
    ) -> EcsResult<*mut T> {
        Ok(self.column_mut_by_id::<T>(component_id)?.as_mut_ptr())
    }

    /// Base pointer of the entity-id vector for dispatch iteration.
    pub(crate) fn entities_ptr(&self) -> *const EntityId {
        self.entities.as_ptr()
    }

    /// Writes one full row from `bundle` and records `entity` in it.
    ///
    /// ## Behavior
    /// Every component in the fingerprint must be supplied by the bundle,
    /// and every column must land the value at the same new row. On
    /// failure, cells already written for this row are removed again; the
    /// archetype is left exactly as before the call.
    pub(crate) fn append(
        &mut self,
        entity: EntityId,
        bundle: &mut dyn DynamicBundle,
    ) -> EcsResult<RowId> {
        let Self { types, columns, entities, .. } = self;
        let row = entities.len() as RowId;
        debug_assert!(columns.iter().all(|column| column.len() == entities.len()));

        let mut written = 0usize;
        let fail = |columns: &mut [Box<dyn Column>], written: usize, error: EcsError| {
            for column in columns[..written].iter_mut() {
                // Each written cell sits at the tail; removing it cannot
                // displace another row.
                let _ = column.swap_remove(row);
            }
            error
        };

        for (index, &component_id) in types.iter().enumerate() {
            let Some(value) = bundle.take(component_id) else {
                return Err(fail(
                    columns,
                    written,
                    MoveError::MissingValue { component_id }.into(),
                ));
            };
            let got = match columns[index].push_value(value) {
                Ok(got) => got,
                Err(source) => {
                    return Err(fail(
                        columns,
                        written,
                        MoveError::Column { component_id, source }.into(),
                    ));
                }
            };
            if got != row {
                return Err(fail(
                    columns,
                    written,
                    MoveError::RowMisalignment { component_id, expected: row, got }.into(),
                ));
            }
            written += 1;
        }

        entities.push(entity);
        Ok(row)
    }

    /// Removes `row`, dropping its cells in declared column order.
    ///
    /// Returns the entity that was relocated into `row` by the swap, if
    /// any, so the caller can repair its record.
    pub(crate) fn swap_remove(&mut self, row: RowId) -> EcsResult<Option<EntityId>> {
        let Self { types, columns, entities, .. } = self;
        let row_index = row as usize;
        if row_index >= entities.len() {
            return Err(EcsError::Internal("swap_remove addressed a row past the archetype"));
        }

        for (index, column) in columns.iter_mut().enumerate() {
            column
                .swap_remove(row)
                .map_err(|source| MoveError::Column { component_id: types[index], source })?;
        }

        entities.swap_remove(row_index);
        Ok(entities.get(row_index).copied())
    }

    /// Moves the row's entity into `destination`, reshaping its component
    /// set to the destination fingerprint.
    ///
    /// ## Behavior
    /// 1. Cells of components shared by both archetypes move by value into
    ///    the destination's new last row.
    /// 2. The component only the destination stores (an `add`) is inserted
    ///    from `added`.
    /// 3. Cells of components only the source stores (a `remove`) are
    ///    dropped.
    /// 4. Entity vectors are updated last; the source compacts by
    ///    swap-with-last.
    ///
    /// Returns the destination row and the entity displaced by the swap in
    /// the source, if any. The caller owns all record updates.
    ///
    /// No cell is ever duplicated: each live (entity, component) pair
    /// occupies exactly one slot in exactly one archetype throughout.
    pub(crate) fn migrate_row_to(
        &mut self,
        destination: &mut Archetype,
        row: RowId,
        added: Option<(ComponentId, Box<dyn Any + Send>)>,
    ) -> EcsResult<(RowId, Option<EntityId>)> {
        let row_index = row as usize;
        if row_index >= self.entities.len() {
            return Err(EcsError::Internal("migration addressed a row past the archetype"));
        }
        debug_assert!(self.id != destination.id, "migration within one archetype");

        let entity = self.entities[row_index];
        let destination_row = destination.entities.len() as RowId;

        let shared = self.fingerprint.intersection(&destination.fingerprint);
        let source_only = self.fingerprint.difference(&destination.fingerprint);
        let destination_only = destination.fingerprint.difference(&self.fingerprint);

        for component_id in shared.iter() {
            let source_position = self
                .position(component_id)
                .ok_or(MoveError::MissingColumn(MissingColumnError { component_id }))?;
            let destination_position = destination
                .position(component_id)
                .ok_or(MoveError::MissingColumn(MissingColumnError { component_id }))?;
            let got = destination.columns[destination_position]
                .take_row_from(&mut *self.columns[source_position], row)
                .map_err(|source| MoveError::Column { component_id, source })?;
            if got != destination_row {
                return Err(MoveError::RowMisalignment {
                    component_id,
                    expected: destination_row,
                    got,
                }
                .into());
            }
        }

        let mut added = added;
        for component_id in destination_only.iter() {
            let value = match added.take() {
                Some((added_id, value)) if added_id == component_id => value,
                _ => return Err(MoveError::MissingValue { component_id }.into()),
            };
            let destination_position = destination
                .position(component_id)
                .ok_or(MoveError::MissingColumn(MissingColumnError { component_id }))?;
            let got = destination.columns[destination_position]
                .push_value(value)
                .map_err(|source| MoveError::Column { component_id, source })?;
            if got != destination_row {
                return Err(MoveError::RowMisalignment {
                    component_id,
                    expected: destination_row,
                    got,
                }
                .into());
            }
        }
        debug_assert!(added.is_none(), "added value for a component the source already had");

        for component_id in source_only.iter() {
            let source_position = self
                .position(component_id)
                .ok_or(MoveError::MissingColumn(MissingColumnError { component_id }))?;
            self.columns[source_position]
                .swap_remove(row)
                .map_err(|source| MoveError::Column { component_id, source })?;
        }

        destination.entities.push(entity);
        self.entities.swap_remove(row_index);
        let moved = self.entities.get(row_index).copied();

        Ok((destination_row, moved))
    }
}
