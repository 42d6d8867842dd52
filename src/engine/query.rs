//! Query construction and dispatch over matching archetypes.
//!
//! A query names the component set an entity must carry (and optionally a
//! set it must not). Dispatch scans every archetype, selects those whose
//! fingerprint is a superset of the required set, and invokes the callback
//! once per row in ascending row order with the row's entity id and
//! mutable references into the row's cells.
//!
//! ## Execution model
//! 1. Build a [`BuiltQuery`] with [`QueryBuilder`].
//! 2. Call the `for_each*` adapter matching the query's arity; the typed
//!    parameters must repeat the required components in declaration order.
//! 3. The callback runs synchronously on the calling thread. Archetype
//!    visit order is creation order, so iteration is deterministic within
//!    a run; row order inside an archetype is strictly ascending.
//!
//! ## Mutation rules
//! Dispatch exclusively borrows the world, so structural mutation during
//! iteration is rejected at compile time; callbacks may freely mutate the
//! component values they receive. Structural decisions made mid-iteration
//! belong in a [`CommandBuffer`](crate::engine::commands::CommandBuffer)
//! applied afterwards. A reentrancy flag additionally fails any structural
//! call that reaches the world while a dispatch is live.
//!
//! Requiring the same component twice would alias one cell through two
//! mutable references; the builder rejects it.

use std::any::type_name;

use crate::engine::component::component_id_of;
use crate::engine::entity::EntityId;
use crate::engine::error::{EcsResult, QueryError};
use crate::engine::types::{ComponentId, Fingerprint};
use crate::engine::world::World;

/// Incrementally builds a [`BuiltQuery`].
///
/// Methods consume and return the builder so construction chains; each
/// step is fallible because component ids are resolved (and registered on
/// first use) as the builder grows.
///
/// ```ignore
/// let query = QueryBuilder::new()
///     .require::<Position>()?
///     .require::<Velocity>()?
///     .without::<Frozen>()?
///     .build();
/// ```
pub struct QueryBuilder {
    require: Fingerprint,
    exclude: Fingerprint,
    ids: Vec<ComponentId>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// Creates an empty builder. Built as-is it matches every entity.
    pub fn new() -> Self {
        Self { require: Fingerprint::empty(), exclude: Fingerprint::empty(), ids: Vec::new() }
    }

    /// Requires component `T`.
    ///
    /// Declaration order is significant: the `for_each*` type parameters
    /// must repeat it.
    ///
    /// ## Errors
    /// `AliasedComponent` when `T` was already required.
    pub fn require<T: 'static + Send + Sync>(mut self) -> EcsResult<Self> {
        let component_id = component_id_of::<T>()?;
        if self.require.contains(component_id) {
            return Err(QueryError::AliasedComponent { component: type_name::<T>() }.into());
        }
        self.require.set(component_id);
        self.ids.push(component_id);
        Ok(self)
    }

    /// Excludes archetypes containing component `T`.
    pub fn without<T: 'static + Send + Sync>(mut self) -> EcsResult<Self> {
        let component_id = component_id_of::<T>()?;
        self.exclude.set(component_id);
        Ok(self)
    }

    /// Finalizes the query.
    pub fn build(self) -> BuiltQuery {
        BuiltQuery { require: self.require, exclude: self.exclude, ids: self.ids }
    }
}

/// Immutable, resolved form of a query.
///
/// Cheap to clone and reusable across dispatches and worlds.
#[derive(Clone)]
pub struct BuiltQuery {
    require: Fingerprint,
    exclude: Fingerprint,
    ids: Vec<ComponentId>,
}

impl BuiltQuery {
    /// Required components in declaration order.
    pub fn component_ids(&self) -> &[ComponentId] {
        &self.ids
    }

    /// Returns `true` if an archetype with `fingerprint` satisfies this
    /// query.
    #[inline]
    pub fn matches(&self, fingerprint: &Fingerprint) -> bool {
        fingerprint.is_superset_of(&self.require) && !fingerprint.intersects(&self.exclude)
    }

    fn check_components(&self, supplied: &[ComponentId]) -> EcsResult<()> {
        if self.ids.len() != supplied.len() {
            return Err(QueryError::ArityMismatch {
                expected: self.ids.len(),
                got: supplied.len(),
            }
            .into());
        }
        for (position, (required, given)) in self.ids.iter().zip(supplied.iter()).enumerate() {
            if required != given {
                return Err(QueryError::ComponentMismatch { position }.into());
            }
        }
        Ok(())
    }
}

impl World {
    /// Starts building a query against this world.
    ///
    /// Purely a convenience; queries are world-independent.
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Dispatches a zero-component query: the callback receives every
    /// entity in every matching archetype.
    ///
    /// With an empty required set this visits every live entity exactly
    /// once.
    pub fn for_each0(
        &mut self,
        query: &BuiltQuery,
        mut f: impl FnMut(EntityId),
    ) -> EcsResult<()> {
        query.check_components(&[])?;
        self.begin_dispatch();
        let result = (|| {
            for index in 0..self.archetype_count() {
                let archetype = self.archetype_mut(index);
                if !query.matches(archetype.fingerprint()) {
                    continue;
                }
                for &entity in archetype.entities() {
                    f(entity);
                }
            }
            Ok(())
        })();
        self.end_dispatch();
        result
    }

    /// Dispatches a one-component query.
    pub fn for_each<A>(
        &mut self,
        query: &BuiltQuery,
        mut f: impl FnMut(EntityId, &mut A),
    ) -> EcsResult<()>
    where
        A: 'static + Send + Sync,
    {
        let ids = [component_id_of::<A>()?];
        query.check_components(&ids)?;
        self.begin_dispatch();
        let result = (|| {
            for index in 0..self.archetype_count() {
                let archetype = self.archetype_mut(index);
                if !query.matches(archetype.fingerprint()) {
                    continue;
                }
                let length = archetype.len();
                if length == 0 {
                    continue;
                }
                let entities = archetype.entities_ptr();
                let column_a = archetype.column_ptr::<A>(ids[0])?;
                // SAFETY: the world is exclusively borrowed for the whole
                // loop, nothing reallocates the column, and `row < length`.
                for row in 0..length {
                    unsafe { f(*entities.add(row), &mut *column_a.add(row)) };
                }
            }
            Ok(())
        })();
        self.end_dispatch();
        result
    }

    /// Dispatches a two-component query.
    pub fn for_each2<A, B>(
        &mut self,
        query: &BuiltQuery,
        mut f: impl FnMut(EntityId, &mut A, &mut B),
    ) -> EcsResult<()>
    where
        A: 'static + Send + Sync,
        B: 'static + Send + Sync,
    {
        let ids = [component_id_of::<A>()?, component_id_of::<B>()?];
        query.check_components(&ids)?;
        self.begin_dispatch();
        let result = (|| {
            for index in 0..self.archetype_count() {
                let archetype = self.archetype_mut(index);
                if !query.matches(archetype.fingerprint()) {
                    continue;
                }
                let length = archetype.len();
                if length == 0 {
                    continue;
                }
                let entities = archetype.entities_ptr();
                let column_a = archetype.column_ptr::<A>(ids[0])?;
                let column_b = archetype.column_ptr::<B>(ids[1])?;
                // SAFETY: the builder guarantees the component ids are
                // pairwise distinct, so the pointers target disjoint
                // columns; the world is exclusively borrowed for the whole
                // loop, nothing reallocates the columns, and
                // `row < length`.
                for row in 0..length {
                    unsafe {
                        f(*entities.add(row), &mut *column_a.add(row), &mut *column_b.add(row))
                    };
                }
            }
            Ok(())
        })();
        self.end_dispatch();
        result
    }

    /// Dispatches a three-component query.
    pub fn for_each3<A, B, C>(
        &mut self,
        query: &BuiltQuery,
        mut f: impl FnMut(EntityId, &mut A, &mut B, &mut C),
    ) -> EcsResult<()>
    where
        A: 'static + Send + Sync,
        B: 'static + Send + Sync,
        C: 'static + Send + Sync,
    {
        let ids = [
            component_id_of::<A>()?,
            component_id_of::<B>()?,
            component_id_of::<C>()?,
        ];
        query.check_components(&ids)?;
        self.begin_dispatch();
        let result = (|| {
            for index in 0..self.archetype_count() {
                let archetype = self.archetype_mut(index);
                if !query.matches(archetype.fingerprint()) {
                    continue;
                }
                let length = archetype.len();
                if length == 0 {
                    continue;
                }
                let entities = archetype.entities_ptr();
                let column_a = archetype.column_ptr::<A>(ids[0])?;
                let column_b = archetype.column_ptr::<B>(ids[1])?;
                let column_c = archetype.column_ptr::<C>(ids[2])?;
                // SAFETY: as in `for_each2`; three pairwise distinct ids.
                for row in 0..length {
                    unsafe {
                        f(
                            *entities.add(row),
                            &mut *column_a.add(row),
                            &mut *column_b.add(row),
                            &mut *column_c.add(row),
                        )
                    };
                }
            }
            Ok(())
        })();
        self.end_dispatch();
        result
    }

    /// Dispatches a four-component query.
    pub fn for_each4<A, B, C, D>(
        &mut self,
        query: &BuiltQuery,
        mut f: impl FnMut(EntityId, &mut A, &mut B, &mut C, &mut D),
    ) -> EcsResult<()>
    where
        A: 'static + Send + Sync,
        B: 'static + Send + Sync,
        C: 'static + Send + Sync,
        D: 'static + Send + Sync,
    {
        let ids = [
            component_id_of::<A>()?,
            component_id_of::<B>()?,
            component_id_of::<C>()?,
            component_id_of::<D>()?,
        ];
        query.check_components(&ids)?;
        self.begin_dispatch();
        let result = (|| {
            for index in 0..self.archetype_count() {
                let archetype = self.archetype_mut(index);
                if !query.matches(archetype.fingerprint()) {
                    continue;
                }
                let length = archetype.len();
                if length == 0 {
                    continue;
                }
                let entities = archetype.entities_ptr();
                let column_a = archetype.column_ptr::<A>(ids[0])?;
                let column_b = archetype.column_ptr::<B>(ids[1])?;
                let column_c = archetype.column_ptr::<C>(ids[2])?;
                let column_d = archetype.column_ptr::<D>(ids[3])?;
                // SAFETY: as in `for_each2`; four pairwise distinct ids.
                for row in 0..length {
                    unsafe {
                        f(
                            *entities.add(row),
                            &mut *column_a.add(row),
                            &mut *column_b.add(row),
                            &mut *column_c.add(row),
                            &mut *column_d.add(row),
                        )
                    };
                }
            }
            Ok(())
        })();
        self.end_dispatch();
        result
    }
}
