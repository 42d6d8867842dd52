//! # archon
//!
//! An archetype-based Entity-Component-System store: a data-oriented
//! in-memory database that groups entities by the exact set of component
//! types they carry, stores each component type in a dedicated contiguous
//! column per group, and dispatches callbacks over every entity whose
//! component set is a superset of a query's.
//!
//! ## Design goals
//! - Archetype storage for cache-efficient iteration
//! - O(1) entity indirection through per-entity records
//! - Safe, explicit structural mutation with swap-remove compaction
//! - Single-threaded, synchronous dispatch with no internal locking
//!
//! ## Example
//! ```
//! use archon::prelude::*;
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! struct Position { x: f32, y: f32 }
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! # fn main() -> archon::EcsResult<()> {
//! let mut world = World::new();
//! let mover = world.spawn()?;
//! world.set(mover, Position { x: 0.0, y: 0.0 })?;
//! world.set(mover, Velocity { dx: 1.0, dy: 2.0 })?;
//!
//! let query = world.query().require::<Position>()?.require::<Velocity>()?.build();
//! world.for_each2::<Position, Velocity>(&query, |_entity, position, velocity| {
//!     position.x += velocity.dx;
//!     position.y += velocity.dy;
//! })?;
//!
//! assert_eq!(world.get::<Position>(mover)?, &Position { x: 1.0, y: 2.0 });
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![deny(dead_code)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::archetype::Archetype;

pub use engine::commands::{Command, CommandBuffer};

pub use engine::component::{
    component_description, component_id_of, register_component, Bundle, ComponentDesc,
    ComponentRegistry, DynamicBundle,
};

pub use engine::entity::{EntityId, EntityLocation, EntityMut, EntityRef};

pub use engine::error::{
    ColumnError, EcsError, EcsResult, MissingColumnError, MissingComponentError, MoveError,
    QueryError, RegistryError, UnknownEntityError,
};

pub use engine::query::{BuiltQuery, QueryBuilder};

pub use engine::storage::{Column, TypedColumn};

pub use engine::types::{ArchetypeId, ComponentId, Fingerprint, RowId, MAX_COMPONENTS};

pub use engine::world::World;

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used types.
///
/// Import with:
/// ```rust
/// use archon::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        component_id_of, register_component, Bundle, BuiltQuery, CommandBuffer, EcsError,
        EcsResult, EntityId, QueryBuilder, World,
    };
}
