//! Error types for the archetype store.
//!
//! Each failure mode is modeled by a small, dedicated type carrying enough
//! context to make the failure actionable, and every type implements
//! [`std::error::Error`] and [`fmt::Display`]. Higher layers aggregate them
//! into [`EcsError`] through `From` conversions so call sites can use `?`
//! and still return a single expressive type.
//!
//! ## Propagation policy
//! All errors abort only the operation that raised them. A world that
//! returns an error is still consistent: no partial migrations, no
//! half-dropped rows, no orphaned records.
//!
//! ## Display vs. Debug
//! * [`fmt::Display`] is a short, single-line message suitable for logs.
//! * [`fmt::Debug`] (derived) retains full structure for diagnostics.

use std::any::TypeId;
use std::fmt;

use crate::engine::entity::EntityId;
use crate::engine::types::{ComponentId, RowId};

/// Returned when an operation names an entity the world has no record of.
///
/// The entity was never spawned, or was despawned and its id has not been
/// reissued yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownEntityError {
    /// The offending entity id.
    pub entity: EntityId,
}

impl fmt::Display for UnknownEntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown entity {}", self.entity)
    }
}

impl std::error::Error for UnknownEntityError {}

/// Returned when a component is read from an entity that does not carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingComponentError {
    /// The entity that was addressed.
    pub entity: EntityId,
    /// Component type name for diagnostics.
    pub component: &'static str,
}

impl fmt::Display for MissingComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity {} has no {} component", self.entity, self.component)
    }
}

impl std::error::Error for MissingComponentError {}

/// Returned when a column is requested from an archetype that lacks it.
///
/// ## Context
/// This is an internal addressing failure: callers that check the archetype
/// fingerprint first never observe it. Surfacing it from a public operation
/// indicates a logic error, not a recoverable condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingColumnError {
    /// Component whose column was requested.
    pub component_id: ComponentId,
}

impl fmt::Display for MissingColumnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "archetype has no column for component {}", self.component_id)
    }
}

impl std::error::Error for MissingColumnError {}

/// Failures raised by the process-wide component registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Registering one more component type would exceed the capacity.
    CapacityExceeded {
        /// Maximum number of registrable component types.
        cap: usize,
    },

    /// No column factory is installed for the component id.
    ///
    /// Indicates the id was never issued by the registry.
    MissingFactory {
        /// The offending component id.
        component_id: ComponentId,
    },

    /// The registry lock was poisoned by a panic in another thread.
    PoisonedLock,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::CapacityExceeded { cap } => {
                write!(f, "component registry full ({cap} types)")
            }
            RegistryError::MissingFactory { component_id } => {
                write!(f, "no storage factory for component {component_id}")
            }
            RegistryError::PoisonedLock => f.write_str("component registry lock poisoned"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Failures raised by a single type-erased component column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnError {
    /// A value's dynamic type did not match the column's element type.
    TypeMismatch {
        /// Element type the column stores.
        expected: TypeId,
        /// Dynamic type of the provided value.
        actual: TypeId,
    },

    /// A row index addressed storage outside the initialized range.
    OutOfBounds {
        /// Row that was addressed.
        row: RowId,
        /// Number of initialized rows in the column.
        length: usize,
    },
}

impl fmt::Display for ColumnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnError::TypeMismatch { expected, actual } => {
                write!(f, "column type mismatch: expected {expected:?}, got {actual:?}")
            }
            ColumnError::OutOfBounds { row, length } => {
                write!(f, "row {row} out of bounds (column length {length})")
            }
        }
    }
}

impl std::error::Error for ColumnError {}

/// Errors that can occur while moving an entity's row between archetypes.
///
/// ## Context
/// Raised by archetype migration when component cells are transferred
/// during add/remove operations. These generally indicate violated internal
/// invariants rather than recoverable user-facing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    /// A component column required by the move was missing.
    MissingColumn(MissingColumnError),

    /// No value was supplied for a component the destination requires.
    MissingValue {
        /// Component the destination archetype stores but the source lacks.
        component_id: ComponentId,
    },

    /// A column operation failed while transferring a cell.
    Column {
        /// Component being transferred.
        component_id: ComponentId,
        /// Underlying column error.
        source: ColumnError,
    },

    /// Component columns disagreed on the destination row.
    RowMisalignment {
        /// Component whose column misplaced the cell.
        component_id: ComponentId,
        /// Row every column was expected to use.
        expected: RowId,
        /// Row the column actually used.
        got: RowId,
    },
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveError::MissingColumn(e) => write!(f, "{e}"),
            MoveError::MissingValue { component_id } => {
                write!(f, "no value supplied for added component {component_id}")
            }
            MoveError::Column { component_id, source } => {
                write!(f, "failed to move component {component_id}: {source}")
            }
            MoveError::RowMisalignment { component_id, expected, got } => {
                write!(
                    f,
                    "component {component_id} storage misaligned: expected row {expected}, got {got}"
                )
            }
        }
    }
}

impl std::error::Error for MoveError {}

impl From<MissingColumnError> for MoveError {
    fn from(e: MissingColumnError) -> Self {
        MoveError::MissingColumn(e)
    }
}

/// Failures raised while building or dispatching a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    /// The same component type was required twice.
    ///
    /// Two parameters naming one component would alias the same cell, so
    /// the builder rejects the query outright.
    AliasedComponent {
        /// Component type name for diagnostics.
        component: &'static str,
    },

    /// The dispatch type parameters do not match the query's arity.
    ArityMismatch {
        /// Number of components the query requires.
        expected: usize,
        /// Number of type parameters supplied at dispatch.
        got: usize,
    },

    /// A dispatch type parameter names a different component than the
    /// query required at the same position.
    ComponentMismatch {
        /// Zero-based position of the mismatched parameter.
        position: usize,
    },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::AliasedComponent { component } => {
                write!(f, "component {component} required twice in one query")
            }
            QueryError::ArityMismatch { expected, got } => {
                write!(f, "query requires {expected} components, dispatch supplied {got}")
            }
            QueryError::ComponentMismatch { position } => {
                write!(f, "dispatch type at position {position} does not match the query")
            }
        }
    }
}

impl std::error::Error for QueryError {}

/// Aggregate error type for every fallible store operation.
///
/// `From` conversions are implemented for each focused error so low-level
/// failures bubble up with `?` while preserving their structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Operation referred to an entity with no record.
    UnknownEntity(UnknownEntityError),

    /// Component read from an entity that does not carry it.
    MissingComponent(MissingComponentError),

    /// Column requested from an archetype that lacks it.
    MissingColumn(MissingColumnError),

    /// Process-wide registry failure.
    Registry(RegistryError),

    /// Component column failure.
    Column(ColumnError),

    /// Archetype migration failure.
    Move(MoveError),

    /// Query construction or dispatch failure.
    Query(QueryError),

    /// A structural mutation was attempted while a query dispatch was
    /// running on the same world.
    ConcurrentModification,

    /// An internal invariant was violated.
    Internal(&'static str),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::UnknownEntity(e) => write!(f, "{e}"),
            EcsError::MissingComponent(e) => write!(f, "{e}"),
            EcsError::MissingColumn(e) => write!(f, "{e}"),
            EcsError::Registry(e) => write!(f, "{e}"),
            EcsError::Column(e) => write!(f, "{e}"),
            EcsError::Move(e) => write!(f, "{e}"),
            EcsError::Query(e) => write!(f, "{e}"),
            EcsError::ConcurrentModification => {
                f.write_str("structural mutation during query dispatch")
            }
            EcsError::Internal(message) => write!(f, "internal invariant violated: {message}"),
        }
    }
}

impl std::error::Error for EcsError {}

impl From<UnknownEntityError> for EcsError {
    fn from(e: UnknownEntityError) -> Self {
        EcsError::UnknownEntity(e)
    }
}

impl From<MissingComponentError> for EcsError {
    fn from(e: MissingComponentError) -> Self {
        EcsError::MissingComponent(e)
    }
}

impl From<MissingColumnError> for EcsError {
    fn from(e: MissingColumnError) -> Self {
        EcsError::MissingColumn(e)
    }
}

impl From<RegistryError> for EcsError {
    fn from(e: RegistryError) -> Self {
        EcsError::Registry(e)
    }
}

impl From<ColumnError> for EcsError {
    fn from(e: ColumnError) -> Self {
        EcsError::Column(e)
    }
}

impl From<MoveError> for EcsError {
    fn from(e: MoveError) -> Self {
        EcsError::Move(e)
    }
}

impl From<QueryError> for EcsError {
    fn from(e: QueryError) -> Self {
        EcsError::Query(e)
    }
}

/// Result alias used throughout the crate.
pub type EcsResult<T> = Result<T, EcsError>;
