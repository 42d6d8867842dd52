//! Type-erased component column storage.
//!
//! An archetype owns one column per component type in its fingerprint. The
//! archetype itself is generic over nothing: columns are held behind the
//! object-safe [`Column`] trait, and each concrete column is a
//! [`TypedColumn<T>`] wrapping a contiguous `Vec<T>`.
//!
//! Keeping the element type behind the trait, rather than storing opaque
//! per-cell pointers, preserves cache locality (a column is one allocation
//! iterated linearly) and makes destruction ownership-driven: a cell is
//! dropped exactly once, when its `Vec` slot is removed or the column is
//! dropped.
//!
//! ## Storage contract
//! - Growth is amortized O(1) per append (`Vec` semantics).
//! - A cell stays at its row until that row is swap-removed or migrated;
//!   reallocation on growth is permitted, so callers must not retain raw
//!   pointers across mutations.
//! - Cell transfer between columns ([`Column::take_row_from`]) is a
//!   by-value move. A live cell never exists in two columns at once.

use std::any::{type_name, Any, TypeId};

use crate::engine::error::ColumnError;
use crate::engine::types::RowId;

/// Object-safe interface over a single component column.
///
/// One implementation exists per registered component type, produced by the
/// registry's column factory. Rows across every column of an archetype are
/// parallel: the cell for entity row *r* lives at index *r* in each column.
pub trait Column: Any + Send + Sync {
    /// Number of initialized cells.
    fn len(&self) -> usize;

    /// Returns `true` if the column holds no cells.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `TypeId` of the element type.
    fn element_type_id(&self) -> TypeId;

    /// Element type name for diagnostics.
    fn element_type_name(&self) -> &'static str;

    /// Upcast for typed downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Appends a boxed value, returning the new row.
    ///
    /// Fails with [`ColumnError::TypeMismatch`] when the value's dynamic
    /// type is not the column's element type.
    fn push_value(&mut self, value: Box<dyn Any>) -> Result<RowId, ColumnError>;

    /// Overwrites the cell at `row` with a boxed value.
    ///
    /// The previous cell is dropped exactly once before the slot holds the
    /// new value.
    fn replace(&mut self, row: RowId, value: Box<dyn Any>) -> Result<(), ColumnError>;

    /// Moves the cell at `source[row]` to the end of this column.
    ///
    /// The source column is compacted by swap-remove, mirroring the row
    /// motion the owning archetype applies to its other columns. Returns
    /// the destination row.
    fn take_row_from(&mut self, source: &mut dyn Column, row: RowId) -> Result<RowId, ColumnError>;

    /// Removes the cell at `row` by overwriting it with the last cell and
    /// popping; the removed value is dropped.
    fn swap_remove(&mut self, row: RowId) -> Result<(), ColumnError>;
}

/// Concrete column storing `T` cells contiguously.
pub struct TypedColumn<T> {
    data: Vec<T>,
}

impl<T> Default for TypedColumn<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

impl<T> TypedColumn<T> {
    /// Creates an empty column.
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed view over all cells.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable typed view over all cells.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Appends a cell, returning its row.
    #[inline]
    pub fn push(&mut self, value: T) -> RowId {
        self.data.push(value);
        (self.data.len() - 1) as RowId
    }

    #[inline]
    fn check_row(&self, row: RowId) -> Result<(), ColumnError> {
        if (row as usize) < self.data.len() {
            Ok(())
        } else {
            Err(ColumnError::OutOfBounds { row, length: self.data.len() })
        }
    }
}

impl<T: 'static + Send + Sync> Column for TypedColumn<T> {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn element_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn element_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn push_value(&mut self, value: Box<dyn Any>) -> Result<RowId, ColumnError> {
        let actual = (*value).type_id();
        match value.downcast::<T>() {
            Ok(value) => Ok(self.push(*value)),
            Err(_) => Err(ColumnError::TypeMismatch { expected: TypeId::of::<T>(), actual }),
        }
    }

    fn replace(&mut self, row: RowId, value: Box<dyn Any>) -> Result<(), ColumnError> {
        self.check_row(row)?;
        let actual = (*value).type_id();
        match value.downcast::<T>() {
            Ok(value) => {
                self.data[row as usize] = *value;
                Ok(())
            }
            Err(_) => Err(ColumnError::TypeMismatch { expected: TypeId::of::<T>(), actual }),
        }
    }

    fn take_row_from(&mut self, source: &mut dyn Column, row: RowId) -> Result<RowId, ColumnError> {
        let actual = source.element_type_id();
        let source = source
            .as_any_mut()
            .downcast_mut::<TypedColumn<T>>()
            .ok_or(ColumnError::TypeMismatch { expected: TypeId::of::<T>(), actual })?;
        source.check_row(row)?;
        let value = source.data.swap_remove(row as usize);
        Ok(self.push(value))
    }

    fn swap_remove(&mut self, row: RowId) -> Result<(), ColumnError> {
        self.check_row(row)?;
        self.data.swap_remove(row as usize);
        Ok(())
    }
}
